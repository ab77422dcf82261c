use crate::{
    auth::AuthUser,
    dtos::withdrawal_dto::{CreateWithdrawalDto, WithdrawalResponse},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use utils::AppResult;

/// 申请提现
///
/// 金额立即从余额中扣除，驳回后退回
#[utoipa::path(
    post,
    path = "/api/v1/withdrawals",
    tag = "withdrawals",
    request_body = CreateWithdrawalDto,
    responses(
        (status = 201, description = "提现申请已创建", body = WithdrawalResponse),
        (status = 400, description = "金额不合法或余额不足"),
        (status = 403, description = "账户未激活")
    ),
    security(("bearer_auth" = []))
)]
pub async fn request_withdrawal(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
    ValidationExtractor(req): ValidationExtractor<CreateWithdrawalDto>,
) -> AppResult<(StatusCode, Json<WithdrawalResponse>)> {
    let withdrawal = services.withdrawal.request_withdrawal(&auth.user_id, req).await?;

    Ok((StatusCode::CREATED, Json(withdrawal.into())))
}

/// 我的提现记录（按时间倒序）
#[utoipa::path(
    get,
    path = "/api/v1/withdrawals/me",
    tag = "withdrawals",
    responses(
        (status = 200, description = "提现记录", body = Vec<WithdrawalResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_withdrawals(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<WithdrawalResponse>>> {
    let withdrawals = services.withdrawal.my_withdrawals(&auth.user_id).await?;

    Ok(Json(withdrawals.into_iter().map(WithdrawalResponse::from).collect()))
}

pub struct WithdrawalController;
impl WithdrawalController {
    pub fn app() -> Router {
        Router::new()
            .route("/", post(request_withdrawal))
            .route("/me", get(my_withdrawals))
    }
}
