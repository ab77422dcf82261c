use crate::auth::{AuthUser, JwtManager, TokenExtractor};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use utils::AppError;

/// 认证中间件状态
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: Arc<JwtManager>,
}

impl AuthState {
    pub fn new(jwt_manager: Arc<JwtManager>) -> Self {
        Self { jwt_manager }
    }
}

/// JWT认证中间件
pub async fn jwt_auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = TokenExtractor::extract_bearer_token(
        request
            .headers()
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
    );

    let Some(token) = token else {
        tracing::warn!("No authentication token provided");
        return Err(AppError::Unauthorized("Authentication token is missing.".to_string()));
    };

    match auth_state.jwt_manager.authenticate(&token) {
        Ok(auth_user) => {
            // 将认证用户信息添加到请求扩展中
            request.extensions_mut().insert(auth_user);
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::warn!("Token verification failed: {}", e);
            Err(AppError::Unauthorized("Invalid or expired token.".to_string()))
        }
    }
}

/// 管理员权限检查中间件
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    match request.extensions().get::<AuthUser>() {
        Some(auth_user) if auth_user.is_admin() => Ok(next.run(request).await),
        Some(auth_user) => {
            tracing::warn!("Non-admin user {} attempted admin operation", auth_user.user_id);
            Err(AppError::Forbidden("Admin access required.".to_string()))
        }
        None => {
            tracing::warn!("Unauthenticated request attempted admin operation");
            Err(AppError::Unauthorized("Authentication required.".to_string()))
        }
    }
}
