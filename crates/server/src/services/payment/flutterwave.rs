use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use utils::{AppError, AppResult};

pub type DynPaymentGateway = Arc<dyn PaymentGatewayTrait + Send + Sync>;

/// 支付网关：创建托管支付页、按交易id查询交易
#[async_trait]
pub trait PaymentGatewayTrait {
    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<String>;

    async fn verify_transaction(&self, transaction_id: &str) -> AppResult<GatewayTransaction>;
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCustomer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentCustomizations {
    pub title: String,
    pub description: String,
}

/// `/v3/payments` 请求体
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    pub tx_ref: String,
    pub amount: i64,
    pub currency: String,
    pub redirect_url: String,
    pub customer: PaymentCustomer,
    pub customizations: PaymentCustomizations,
}

/// 网关返回的交易详情
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GatewayTransaction {
    pub id: u64,
    pub tx_ref: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
}

impl GatewayTransaction {
    pub fn is_successful(&self) -> bool {
        self.status.eq_ignore_ascii_case("successful")
    }
}

/// Flutterwave 统一响应包装
#[derive(Debug, Deserialize)]
struct FlutterwaveEnvelope<T> {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct HostedLink {
    link: String,
}

/// Flutterwave v3 HTTP客户端
#[derive(Clone)]
pub struct FlutterwaveClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl FlutterwaveClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    async fn read_envelope<T: for<'de> Deserialize<'de>>(response: reqwest::Response, action: &str) -> AppResult<T> {
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!("❌ 读取Flutterwave响应失败: {}", e);
            AppError::BadGateway(format!("Payment gateway read error: {}", e))
        })?;

        let envelope = serde_json::from_str::<FlutterwaveEnvelope<T>>(&text);

        match envelope {
            Ok(envelope) if status.is_success() && envelope.status == "success" => envelope.data.ok_or_else(|| {
                error!("❌ Flutterwave {} 响应缺少data字段", action);
                AppError::BadGateway(format!("Payment gateway returned no data for {}", action))
            }),
            Ok(envelope) => {
                error!("❌ Flutterwave {} 失败 ({}): {}", action, status, envelope.message);
                Err(AppError::BadGateway(format!(
                    "Payment gateway {} failed ({}): {}",
                    action, status, envelope.message
                )))
            }
            Err(e) => {
                error!("❌ 解析Flutterwave {} 响应失败 ({}): {} | body: {}", action, status, e, text);
                Err(AppError::BadGateway(format!(
                    "Payment gateway {} failed ({})",
                    action, status
                )))
            }
        }
    }
}

#[async_trait]
impl PaymentGatewayTrait for FlutterwaveClient {
    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<String> {
        let url = format!("{}/v3/payments", self.base_url);
        info!("💳 创建支付: tx_ref={}, amount={} {}", request.tx_ref, request.amount, request.currency);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("❌ 发送支付请求失败: {}", e);
                AppError::BadGateway(format!("Payment gateway unreachable: {}", e))
            })?;

        let hosted: HostedLink = Self::read_envelope(response, "payment initiation").await?;

        Ok(hosted.link)
    }

    async fn verify_transaction(&self, transaction_id: &str) -> AppResult<GatewayTransaction> {
        let url = format!("{}/v3/transactions/{}/verify", self.base_url, transaction_id);
        info!("🔍 校验交易: {}", transaction_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| {
                error!("❌ 交易校验请求失败: {}", e);
                AppError::BadGateway(format!("Payment gateway unreachable: {}", e))
            })?;

        Self::read_envelope(response, "transaction verification").await
    }
}
