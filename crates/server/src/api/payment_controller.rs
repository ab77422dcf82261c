use crate::{
    auth::AuthUser,
    dtos::payment_dto::{InitiatePaymentResponse, PaymentWebhookPayload, VerifyPaymentResponse, WebhookAck},
    services::Services,
};
use axum::{
    extract::Path,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use utils::AppResult;

/// Flutterwave 在回调中携带的签名头
pub const WEBHOOK_SIGNATURE_HEADER: &str = "verif-hash";

/// 发起激活费支付，返回托管支付页链接
#[utoipa::path(
    post,
    path = "/api/v1/payment/initiate",
    tag = "payment",
    responses(
        (status = 200, description = "支付链接", body = InitiatePaymentResponse),
        (status = 400, description = "账户已激活"),
        (status = 502, description = "支付网关异常")
    ),
    security(("bearer_auth" = []))
)]
pub async fn initiate_payment(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<InitiatePaymentResponse>> {
    let response = services.payment.initiate_payment(&auth.user_id).await?;

    Ok(Json(response))
}

/// 校验支付结果并激活账户
///
/// 同一笔交易重复校验时不会重复发放推荐奖励
#[utoipa::path(
    get,
    path = "/api/v1/payment/verify/{transaction_id}",
    tag = "payment",
    params(
        ("transaction_id" = String, Path, description = "Flutterwave 交易ID")
    ),
    responses(
        (status = 200, description = "账户已激活", body = VerifyPaymentResponse),
        (status = 400, description = "交易未成功或金额不符"),
        (status = 403, description = "交易不属于当前用户"),
        (status = 502, description = "支付网关异常")
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_payment(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    Path(transaction_id): Path<String>,
) -> AppResult<Json<VerifyPaymentResponse>> {
    // 管理员可代为校验任意用户的交易
    let requester = (!auth.is_admin()).then_some(&auth.user_id);
    let response = services.payment.verify_payment(&transaction_id, requester).await?;

    Ok(Json(response))
}

/// Flutterwave 支付回调
#[utoipa::path(
    post,
    path = "/api/v1/payment/webhook",
    tag = "payment",
    request_body = PaymentWebhookPayload,
    params(
        ("verif-hash" = String, Header, description = "后台配置的webhook密钥")
    ),
    responses(
        (status = 200, description = "已处理或忽略", body = WebhookAck),
        (status = 401, description = "签名不匹配")
    )
)]
pub async fn webhook(
    Extension(services): Extension<Services>,
    headers: HeaderMap,
    Json(payload): Json<PaymentWebhookPayload>,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = services.payment.handle_webhook(signature, payload).await?;

    Ok(Json(ack))
}

pub struct PaymentController;
impl PaymentController {
    /// 需要登录的路由
    pub fn app() -> Router {
        Router::new()
            .route("/initiate", post(initiate_payment))
            .route("/verify/:transaction_id", get(verify_payment))
    }

    /// 由支付网关调用，不经过JWT
    pub fn webhook() -> Router {
        Router::new().route("/webhook", post(webhook))
    }
}
