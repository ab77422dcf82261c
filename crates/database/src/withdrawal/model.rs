use crate::serde_helpers::{flexible_datetime, serialize_i64_as_number};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 提现方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    BankTransfer,
    Paypal,
}

/// 提现状态：pending -> approved | rejected，两者均为终态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }

    /// 状态机允许的迁移
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved) | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
        )
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(WithdrawalStatus::Pending),
            "approved" => Ok(WithdrawalStatus::Approved),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(format!("Unknown withdrawal status: {}", other)),
        }
    }
}

/// 提现申请
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    #[serde(serialize_with = "serialize_i64_as_number")]
    pub amount: i64,
    pub payment_method: PaymentMethod,
    /// 收款账户信息，格式由前端决定
    #[serde(default)]
    pub account_details: serde_json::Value,
    #[serde(default)]
    pub status: WithdrawalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<ObjectId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "flexible_datetime::deserialize_option"
    )]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn new(user: ObjectId, amount: i64, payment_method: PaymentMethod, account_details: serde_json::Value) -> Self {
        Self {
            id: None,
            user,
            amount,
            payment_method,
            account_details,
            status: WithdrawalStatus::Pending,
            processed_by: None,
            processed_at: None,
            notes: None,
            created_at: Utc::now(),
        }
    }
}

/// 提现汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalStats {
    pub pending_count: u64,
    pub pending_amount: i64,
    pub approved_count: u64,
    pub approved_amount: i64,
    pub rejected_count: u64,
}
