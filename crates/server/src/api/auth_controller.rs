use crate::{
    dtos::user_dto::{AuthResponse, LoginDto, RegisterDto},
    extractors::validation_extractor::ValidationExtractor,
    services::Services,
};
use axum::{http::StatusCode, routing::post, Extension, Json, Router};
use tracing::info;
use utils::AppResult;

/// 注册新用户
///
/// 可携带推荐码，推荐码无效时返回400
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterDto,
    responses(
        (status = 201, description = "注册成功", body = AuthResponse),
        (status = 400, description = "参数错误或推荐码无效"),
        (status = 409, description = "邮箱已被注册")
    )
)]
pub async fn register(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<RegisterDto>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    info!("📝 注册请求: {}", req.email);
    let response = services.user.register(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// 邮箱密码登录
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginDto,
    responses(
        (status = 200, description = "登录成功", body = AuthResponse),
        (status = 401, description = "邮箱或密码错误")
    )
)]
pub async fn login(
    Extension(services): Extension<Services>,
    ValidationExtractor(req): ValidationExtractor<LoginDto>,
) -> AppResult<Json<AuthResponse>> {
    let response = services.user.login(req).await?;

    Ok(Json(response))
}

pub struct AuthController;
impl AuthController {
    pub fn app() -> Router {
        Router::new()
            .route("/register", post(register))
            .route("/login", post(login))
    }
}
