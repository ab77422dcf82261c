use crate::serde_helpers::{flexible_datetime, serialize_i64_as_number};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// 已处理的支付网关交易，transactionId 唯一，用作激活的幂等凭据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub transaction_id: String,
    pub tx_ref: String,
    pub user: ObjectId,
    #[serde(serialize_with = "serialize_i64_as_number")]
    pub amount: i64,
    pub currency: String,
    pub status: String,
    /// 激活与推荐奖励均已完成；为false时重试会继续处理
    #[serde(default)]
    pub applied: bool,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
}
