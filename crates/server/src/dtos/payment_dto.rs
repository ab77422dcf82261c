use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::user_dto::UserResponse;

/// 发起激活支付的结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    /// 托管支付页地址
    pub payment_link: String,
    pub tx_ref: String,
    pub amount: i64,
    pub currency: String,
}

/// 支付校验结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub message: String,
    /// 该交易此前已处理过
    pub already_processed: bool,
    pub user: UserResponse,
}

/// Flutterwave webhook 请求体
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookPayload {
    pub event: String,
    pub data: PaymentWebhookData,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentWebhookData {
    pub id: u64,
    #[serde(default)]
    pub tx_ref: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }

    pub fn ignored() -> Self {
        Self {
            status: "ignored".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_payload_parsing() {
        let payload: PaymentWebhookPayload = serde_json::from_value(serde_json::json!({
            "event": "charge.completed",
            "data": {
                "id": 285959875,
                "tx_ref": "ACT-64b7f0c2a1b2c3d4e5f60718-1700000000000",
                "status": "successful",
                "amount": 5000,
                "currency": "NGN"
            }
        }))
        .unwrap();

        assert_eq!(payload.event, "charge.completed");
        assert_eq!(payload.data.id, 285959875);
        assert_eq!(payload.data.status.as_deref(), Some("successful"));
    }
}
