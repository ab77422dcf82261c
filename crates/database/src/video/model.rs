use crate::serde_helpers::{flexible_datetime, serialize_i64_as_number};
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

/// 视频模型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub youtube_url: String,
    /// 看完后奖励的积分
    #[serde(serialize_with = "serialize_i64_as_number")]
    pub points_reward: i64,
    /// 最短观看时长（秒）
    pub minimum_watch_time: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub added_by: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Cloudinary public id，删除视频时一并删除
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_public_id: Option<String>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Video {
    pub fn new(
        title: &str,
        youtube_url: &str,
        points_reward: i64,
        minimum_watch_time: u32,
        added_by: ObjectId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            title: title.trim().to_string(),
            youtube_url: youtube_url.trim().to_string(),
            points_reward,
            minimum_watch_time,
            is_active: true,
            added_by,
            thumbnail_url: None,
            thumbnail_public_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 观看时长是否满足要求
    pub fn is_watch_sufficient(&self, watched_seconds: u32) -> bool {
        watched_seconds >= self.minimum_watch_time
    }
}

/// 视频可更新字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub youtube_url: Option<String>,
    pub points_reward: Option<i64>,
    pub minimum_watch_time: Option<u32>,
    pub is_active: Option<bool>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_public_id: Option<String>,
}

impl VideoUpdate {
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(title) = &self.title {
            set.insert("title", title.trim());
        }
        if let Some(url) = &self.youtube_url {
            set.insert("youtubeUrl", url.trim());
        }
        if let Some(points) = self.points_reward {
            set.insert("pointsReward", Bson::Int64(points));
        }
        if let Some(seconds) = self.minimum_watch_time {
            set.insert("minimumWatchTime", Bson::Int64(seconds as i64));
        }
        if let Some(is_active) = self.is_active {
            set.insert("isActive", is_active);
        }
        if let Some(url) = &self.thumbnail_url {
            set.insert("thumbnailUrl", url.as_str());
        }
        if let Some(public_id) = &self.thumbnail_public_id {
            set.insert("thumbnailPublicId", public_id.as_str());
        }
        set
    }

    pub fn apply(&self, video: &mut Video) {
        if let Some(title) = &self.title {
            video.title = title.trim().to_string();
        }
        if let Some(url) = &self.youtube_url {
            video.youtube_url = url.trim().to_string();
        }
        if let Some(points) = self.points_reward {
            video.points_reward = points;
        }
        if let Some(seconds) = self.minimum_watch_time {
            video.minimum_watch_time = seconds;
        }
        if let Some(is_active) = self.is_active {
            video.is_active = is_active;
        }
        if let Some(url) = &self.thumbnail_url {
            video.thumbnail_url = Some(url.clone());
        }
        if let Some(public_id) = &self.thumbnail_public_id {
            video.thumbnail_public_id = Some(public_id.clone());
        }
        video.updated_at = Utc::now();
    }
}
