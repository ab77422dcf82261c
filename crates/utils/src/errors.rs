use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// 第三方服务（支付网关、媒体存储）调用失败
    #[error("{0}")]
    BadGateway(String),

    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    InternalServerErrorWithContext(String),

    #[error(transparent)]
    MongoError(#[from] mongodb::error::Error),

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerErrorWithContext(_)
            | AppError::MongoError(_)
            | AppError::AnyhowError(_)
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的错误信息列表，内部错误不暴露细节
    fn messages(&self) -> Vec<String> {
        match self {
            AppError::ValidationError(errors) => errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| match &e.message {
                        Some(message) => format!("{}: {}", field, message),
                        None => format!("{}: invalid value ({})", field, e.code),
                    })
                })
                .collect(),
            AppError::MongoError(_) | AppError::AnyhowError(_) | AppError::InternalServerError => {
                vec![String::from("Something went wrong, please try again later.")]
            }
            other => vec![other.to_string()],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!("❌ {}: {:?}", status, self);
        }

        let body = Json(json!({
            "errors": {
                "message": self.messages(),
            }
        }));

        (status, body).into_response()
    }
}
