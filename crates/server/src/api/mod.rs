pub mod admin_controller;
pub mod auth_controller;
pub mod payment_controller;
pub mod user_controller;
pub mod video_controller;
pub mod withdrawal_controller;

#[cfg(test)]
mod api_tests;

use crate::auth::{jwt_auth_middleware, require_admin, AuthState};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, Router},
};

/// 系统健康检查
///
/// 返回服务器运行状态
///
/// # 响应
///
/// 返回简单的状态消息字符串
#[utoipa::path(
    get,
    path = "/api/v1/",
    responses(
        (status = 200, description = "服务器运行正常", body = String)
    ),
    tag = "系统状态"
)]
pub async fn health() -> &'static str {
    "Server is running! 🚀"
}

pub fn app(auth_state: AuthState) -> Router {
    let authenticated = from_fn_with_state(auth_state, jwt_auth_middleware);

    Router::new()
        .route("/", get(health))
        .nest("/auth", auth_controller::AuthController::app())
        .nest(
            "/users",
            user_controller::UserController::app().route_layer(authenticated.clone()),
        )
        .nest(
            "/videos",
            video_controller::VideoController::app().route_layer(authenticated.clone()),
        )
        .nest(
            "/withdrawals",
            withdrawal_controller::WithdrawalController::app().route_layer(authenticated.clone()),
        )
        .nest(
            "/payment",
            payment_controller::PaymentController::app()
                .route_layer(authenticated.clone())
                .merge(payment_controller::PaymentController::webhook()),
        )
        // 后加的layer先执行：先认证，再检查管理员角色
        .nest(
            "/admin",
            admin_controller::AdminController::app()
                .route_layer(from_fn(require_admin))
                .route_layer(authenticated),
        )
}
