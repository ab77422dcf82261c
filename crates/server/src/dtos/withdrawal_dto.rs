use chrono::{DateTime, Utc};
use database::withdrawal::model::{PaymentMethod, Withdrawal, WithdrawalStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// 提现申请
#[derive(Clone, Serialize, Deserialize, Debug, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalDto {
    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount: i64,

    pub payment_method: PaymentMethod,

    /// 收款账户信息，格式随支付方式而定
    #[validate(custom = "validate_account_details")]
    #[schema(value_type = Object)]
    pub account_details: serde_json::Value,
}

fn validate_account_details(details: &serde_json::Value) -> Result<(), ValidationError> {
    match details.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err(ValidationError::new("account_details_must_be_object")),
    }
}

/// 审批备注
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct ProcessWithdrawalDto {
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WithdrawalListQuery {
    /// pending | approved | rejected
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResponse {
    pub id: String,
    pub user: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    #[schema(value_type = Object)]
    pub account_details: serde_json::Value,
    pub status: WithdrawalStatus,
    pub processed_by: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(withdrawal: Withdrawal) -> Self {
        Self {
            id: withdrawal.id.map(|id| id.to_hex()).unwrap_or_default(),
            user: withdrawal.user.to_hex(),
            amount: withdrawal.amount,
            payment_method: withdrawal.payment_method,
            account_details: withdrawal.account_details,
            status: withdrawal.status,
            processed_by: withdrawal.processed_by.map(|id| id.to_hex()),
            processed_at: withdrawal.processed_at,
            notes: withdrawal.notes,
            created_at: withdrawal.created_at,
        }
    }
}
