use database::{user::model::UserStats, withdrawal::model::WithdrawalStats};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// 管理后台汇总
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatsResponse {
    pub users: UserStats,
    pub total_videos: u64,
    pub active_videos: u64,
    pub withdrawals: WithdrawalStats,
}

/// 上传媒体文件（data URI）
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct MediaUploadDto {
    /// `data:image/png;base64,...`
    #[validate(custom = "validate_data_uri")]
    pub file: String,

    #[validate(length(min = 1, max = 100))]
    pub folder: Option<String>,
}

fn validate_data_uri(file: &str) -> Result<(), ValidationError> {
    match file.strip_prefix("data:") {
        Some(rest) if rest.contains(";base64,") => Ok(()),
        _ => Err(ValidationError::new("file_must_be_data_uri")),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadResponse {
    pub public_id: String,
    pub secure_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaDeleteResponse {
    pub public_id: String,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
