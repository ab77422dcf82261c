use crate::{
    auth::AuthUser,
    dtos::{
        earning_dto::{LevelPayoutsResponse, MyEarningsResponse},
        user_dto::{DashboardResponse, ReferralResponse, UserResponse},
    },
    services::Services,
};
use axum::{routing::get, Extension, Json, Router};
use utils::AppResult;

/// 当前登录用户
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "当前用户信息", body = UserResponse),
        (status = 401, description = "未登录")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<UserResponse>> {
    let user = services.user.get_user(&auth.user_id).await?;

    Ok(Json(user.into()))
}

/// 用户面板：积分、余额、推荐与提现汇总
#[utoipa::path(
    get,
    path = "/api/v1/users/dashboard",
    tag = "users",
    responses(
        (status = 200, description = "面板数据", body = DashboardResponse),
        (status = 401, description = "未登录")
    ),
    security(("bearer_auth" = []))
)]
pub async fn dashboard(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<DashboardResponse>> {
    let dashboard = services.user.dashboard(&auth.user_id).await?;

    Ok(Json(dashboard))
}

/// 直接推荐的下级
#[utoipa::path(
    get,
    path = "/api/v1/users/referrals",
    tag = "users",
    responses(
        (status = 200, description = "直接下级列表", body = Vec<ReferralResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn referrals(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Vec<ReferralResponse>>> {
    let referrals = services.user.referrals(&auth.user_id).await?;

    Ok(Json(referrals.into_iter().map(ReferralResponse::from).collect()))
}

/// 多级推荐收益
#[utoipa::path(
    get,
    path = "/api/v1/users/earnings",
    tag = "users",
    responses(
        (status = 200, description = "余额与三级收益明细", body = MyEarningsResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn earnings(
    Extension(services): Extension<Services>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<MyEarningsResponse>> {
    let user = services.user.get_user(&auth.user_id).await?;
    let record = services.referral.get_or_calculate(&auth.user_id).await?;
    let payouts = services.referral.payouts();

    Ok(Json(MyEarningsResponse {
        balance: user.earnings,
        multilevel: record.into(),
        payouts: LevelPayoutsResponse {
            level1: payouts.level1,
            level2: payouts.level2,
            level3: payouts.level3,
        },
    }))
}

pub struct UserController;
impl UserController {
    pub fn app() -> Router {
        Router::new()
            .route("/me", get(me))
            .route("/dashboard", get(dashboard))
            .route("/referrals", get(referrals))
            .route("/earnings", get(earnings))
    }
}
