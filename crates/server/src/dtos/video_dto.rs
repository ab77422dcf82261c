use chrono::{DateTime, Utc};
use database::video::model::{Video, VideoUpdate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(url(message = "youtubeUrl must be a valid URL"))]
    pub youtube_url: String,

    #[validate(range(min = 0))]
    pub points_reward: i64,

    /// 最短观看时长（秒）
    #[validate(range(min = 1))]
    pub minimum_watch_time: u32,

    #[serde(default)]
    pub is_active: Option<bool>,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    pub thumbnail_public_id: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(url)]
    pub youtube_url: Option<String>,
    #[validate(range(min = 0))]
    pub points_reward: Option<i64>,
    #[validate(range(min = 1))]
    pub minimum_watch_time: Option<u32>,
    pub is_active: Option<bool>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    pub thumbnail_public_id: Option<String>,
}

impl From<UpdateVideoDto> for VideoUpdate {
    fn from(dto: UpdateVideoDto) -> Self {
        Self {
            title: dto.title,
            youtube_url: dto.youtube_url,
            points_reward: dto.points_reward,
            minimum_watch_time: dto.minimum_watch_time,
            is_active: dto.is_active,
            thumbnail_url: dto.thumbnail_url,
            thumbnail_public_id: dto.thumbnail_public_id,
        }
    }
}

/// 上报观看完成
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVideoDto {
    /// 实际观看时长（秒）
    pub watched_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: String,
    pub title: String,
    pub youtube_url: String,
    pub points_reward: i64,
    pub minimum_watch_time: u32,
    pub is_active: bool,
    pub added_by: String,
    pub thumbnail_url: Option<String>,
    pub thumbnail_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Video> for VideoResponse {
    fn from(video: Video) -> Self {
        Self {
            id: video.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: video.title,
            youtube_url: video.youtube_url,
            points_reward: video.points_reward,
            minimum_watch_time: video.minimum_watch_time,
            is_active: video.is_active,
            added_by: video.added_by.to_hex(),
            thumbnail_url: video.thumbnail_url,
            thumbnail_public_id: video.thumbnail_public_id,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

/// 用户视角的视频：附带是否已观看
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserVideoResponse {
    #[serde(flatten)]
    pub video: VideoResponse,
    pub watched: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVideoResponse {
    pub video_id: String,
    pub points_earned: i64,
    pub total_points: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_video_validation() {
        let dto = CreateVideoDto {
            title: "Intro".into(),
            youtube_url: "https://www.youtube.com/watch?v=abc".into(),
            points_reward: 25,
            minimum_watch_time: 60,
            ..Default::default()
        };
        assert!(dto.validate().is_ok());

        let dto = CreateVideoDto {
            title: "".into(),
            youtube_url: "not a url".into(),
            points_reward: -5,
            minimum_watch_time: 0,
            ..Default::default()
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("youtube_url"));
        assert!(fields.contains_key("points_reward"));
        assert!(fields.contains_key("minimum_watch_time"));
    }

    #[test]
    fn test_user_video_response_is_flat() {
        let video = Video::new("Intro", "https://youtu.be/abc", 10, 30, mongodb::bson::oid::ObjectId::new());
        let value = serde_json::to_value(UserVideoResponse {
            video: video.into(),
            watched: true,
        })
        .unwrap();

        assert_eq!(value["title"], "Intro");
        assert_eq!(value["minimumWatchTime"], 30);
        assert_eq!(value["watched"], true);
    }
}
