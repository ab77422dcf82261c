use super::flutterwave::{DynPaymentGateway, PaymentCustomer, PaymentCustomizations, PaymentRequest};
use crate::{
    dtos::{
        payment_dto::{InitiatePaymentResponse, PaymentWebhookPayload, VerifyPaymentResponse, WebhookAck},
        user_dto::UserResponse,
    },
    services::referral::DynReferralService,
};
use async_trait::async_trait;
use chrono::Utc;
use database::{
    payment::{model::PaymentTransaction, repository::DynPaymentTransactionRepository},
    user::{
        model::{PaymentStatus, User},
        repository::DynUserRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{error, info, warn};
use utils::{AppConfig, AppError, AppResult};

const TX_REF_PREFIX: &str = "ACT-";
const CHARGE_COMPLETED: &str = "charge.completed";

pub type DynPaymentService = Arc<dyn PaymentServiceTrait + Send + Sync>;

#[async_trait]
pub trait PaymentServiceTrait {
    async fn initiate_payment(&self, user: &ObjectId) -> AppResult<InitiatePaymentResponse>;

    /// 校验交易并激活用户；`requester` 为None时不校验交易归属（管理员、webhook）
    async fn verify_payment(&self, transaction_id: &str, requester: Option<&ObjectId>) -> AppResult<VerifyPaymentResponse>;

    async fn handle_webhook(&self, signature: Option<&str>, payload: PaymentWebhookPayload) -> AppResult<WebhookAck>;
}

/// 激活支付相关配置
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub activation_fee: i64,
    pub currency: String,
    pub redirect_url: String,
    pub webhook_hash: Option<String>,
}

impl From<&AppConfig> for PaymentSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            activation_fee: config.activation_fee,
            currency: config.payment_currency.clone(),
            redirect_url: format!("{}/payment/callback", config.frontend_url.trim_end_matches('/')),
            webhook_hash: config.flutterwave_webhook_hash.clone().filter(|h| !h.is_empty()),
        }
    }
}

/// `ACT-{userId}-{unixMillis}`
pub fn build_tx_ref(user: &ObjectId, unix_millis: i64) -> String {
    format!("{}{}-{}", TX_REF_PREFIX, user.to_hex(), unix_millis)
}

/// 从交易引用中解析用户id
pub fn parse_tx_ref(tx_ref: &str) -> AppResult<ObjectId> {
    let invalid = || AppError::BadRequest(format!("Invalid transaction reference: {}", tx_ref));

    let (user, millis) = tx_ref
        .strip_prefix(TX_REF_PREFIX)
        .and_then(|rest| rest.rsplit_once('-'))
        .ok_or_else(invalid)?;

    if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    ObjectId::parse_str(user).map_err(|_| invalid())
}

#[derive(Clone)]
pub struct PaymentService {
    users: DynUserRepository,
    transactions: DynPaymentTransactionRepository,
    gateway: DynPaymentGateway,
    referral: DynReferralService,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        users: DynUserRepository,
        transactions: DynPaymentTransactionRepository,
        gateway: DynPaymentGateway,
        referral: DynReferralService,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            users,
            transactions,
            gateway,
            referral,
            settings,
        }
    }

    /// 激活交易对应的用户并发放推荐奖励，完成后标记交易已处理
    ///
    /// 中途失败时交易保持未处理状态，重试会从这里继续：激活时记下的交易id
    /// 用来判断是否由本交易激活，推荐奖励按凭据只入账一次。
    async fn apply_activation(&self, record: &PaymentTransaction) -> AppResult<User> {
        let user_id = record.user;
        let activated_now = self
            .users
            .activate_if_pending(&user_id, &record.transaction_id)
            .await?;

        let user = self
            .users
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user_id)))?;

        if activated_now || user.activation_transaction.as_deref() == Some(record.transaction_id.as_str()) {
            if activated_now {
                info!("🟢 用户 {} 已激活", user.email);
            }
            self.referral.on_user_activated(&user).await?;
        } else {
            info!("ℹ️ 用户 {} 之前已激活，跳过推荐奖励", user.email);
        }

        self.transactions.mark_applied(&record.transaction_id).await?;

        Ok(user)
    }
}

#[async_trait]
impl PaymentServiceTrait for PaymentService {
    async fn initiate_payment(&self, user: &ObjectId) -> AppResult<InitiatePaymentResponse> {
        let account = self
            .users
            .get_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user)))?;

        if account.is_active || account.payment_status == PaymentStatus::Completed {
            return Err(AppError::BadRequest("Account is already activated.".to_string()));
        }

        let tx_ref = build_tx_ref(user, Utc::now().timestamp_millis());
        let request = PaymentRequest {
            tx_ref: tx_ref.clone(),
            amount: self.settings.activation_fee,
            currency: self.settings.currency.clone(),
            redirect_url: self.settings.redirect_url.clone(),
            customer: PaymentCustomer {
                email: account.email.clone(),
                name: account.full_name.clone(),
            },
            customizations: PaymentCustomizations {
                title: "Account Activation".to_string(),
                description: "One-time account activation fee".to_string(),
            },
        };

        let payment_link = self.gateway.create_payment(&request).await?;
        info!("💳 用户 {} 发起激活支付: {}", account.email, tx_ref);

        Ok(InitiatePaymentResponse {
            payment_link,
            tx_ref,
            amount: self.settings.activation_fee,
            currency: self.settings.currency.clone(),
        })
    }

    async fn verify_payment(&self, transaction_id: &str, requester: Option<&ObjectId>) -> AppResult<VerifyPaymentResponse> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() || !transaction_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(AppError::BadRequest(format!("Invalid transaction id: {}", transaction_id)));
        }

        if let Some(processed) = self.transactions.get_transaction(transaction_id).await? {
            if requester.is_some_and(|requester| requester != &processed.user) {
                return Err(AppError::Forbidden(
                    "This transaction does not belong to the current user.".to_string(),
                ));
            }

            if !processed.applied {
                warn!("🔄 交易 {} 已记录但激活未完成，继续处理", transaction_id);
                let user = self.apply_activation(&processed).await?;
                return Ok(VerifyPaymentResponse {
                    message: "Payment verified and account activated.".to_string(),
                    already_processed: false,
                    user: UserResponse::from(user),
                });
            }

            let user = self
                .users
                .get_user(&processed.user)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", processed.user)))?;

            info!("🔁 交易 {} 已处理过，跳过网关校验", transaction_id);
            return Ok(VerifyPaymentResponse {
                message: "Payment already verified.".to_string(),
                already_processed: true,
                user: UserResponse::from(user),
            });
        }

        let transaction = self.gateway.verify_transaction(transaction_id).await?;

        if !transaction.is_successful() {
            warn!("⚠️ 交易 {} 状态为 {}", transaction_id, transaction.status);
            return Err(AppError::BadRequest(format!(
                "Payment was not successful: {}",
                transaction.status
            )));
        }

        let user_id = parse_tx_ref(&transaction.tx_ref)?;
        if let Some(requester) = requester {
            if requester != &user_id {
                return Err(AppError::Forbidden(
                    "This transaction does not belong to the current user.".to_string(),
                ));
            }
        }

        if transaction.amount < self.settings.activation_fee as f64
            || !transaction.currency.eq_ignore_ascii_case(&self.settings.currency)
        {
            error!(
                "❌ 交易 {} 金额或币种不符: {} {} (需要 {} {})",
                transaction_id, transaction.amount, transaction.currency, self.settings.activation_fee, self.settings.currency
            );
            return Err(AppError::BadRequest("Payment amount or currency does not match.".to_string()));
        }

        let user = self
            .users
            .get_user(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user_id)))?;

        let record = PaymentTransaction {
            id: None,
            transaction_id: transaction.id.to_string(),
            tx_ref: transaction.tx_ref.clone(),
            user: user_id,
            amount: transaction.amount.round() as i64,
            currency: transaction.currency.clone(),
            status: transaction.status.clone(),
            applied: false,
            created_at: Utc::now(),
        };

        if !self.transactions.record_transaction(&record).await? {
            info!("🔁 交易 {} 已处理过，不再重复激活", transaction_id);
            return Ok(VerifyPaymentResponse {
                message: "Payment already verified.".to_string(),
                already_processed: true,
                user: UserResponse::from(user),
            });
        }

        let user = self.apply_activation(&record).await?;

        Ok(VerifyPaymentResponse {
            message: "Payment verified and account activated.".to_string(),
            already_processed: false,
            user: UserResponse::from(user),
        })
    }

    async fn handle_webhook(&self, signature: Option<&str>, payload: PaymentWebhookPayload) -> AppResult<WebhookAck> {
        let Some(expected) = self.settings.webhook_hash.as_deref() else {
            warn!("⚠️ 未配置 FLUTTERWAVE_WEBHOOK_HASH，拒绝webhook");
            return Err(AppError::Unauthorized("Webhook verification is not configured.".to_string()));
        };

        if signature != Some(expected) {
            warn!("🚫 webhook签名不匹配");
            return Err(AppError::Unauthorized("Invalid webhook signature.".to_string()));
        }

        if payload.event != CHARGE_COMPLETED {
            info!("📨 忽略webhook事件: {}", payload.event);
            return Ok(WebhookAck::ignored());
        }

        let transaction_id = payload.data.id.to_string();
        match self.verify_payment(&transaction_id, None).await {
            Ok(_) => Ok(WebhookAck::ok()),
            // 业务上无效的交易不需要网关重试
            Err(e @ (AppError::BadRequest(_) | AppError::NotFound(_))) => {
                warn!("⚠️ webhook交易 {} 未激活: {}", transaction_id, e);
                Ok(WebhookAck::ignored())
            }
            Err(e) => Err(e),
        }
    }
}
