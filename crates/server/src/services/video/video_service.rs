use crate::{
    dtos::video_dto::{CompleteVideoResponse, CreateVideoDto},
    services::media::DynMediaStorage,
};
use async_trait::async_trait;
use database::{
    user::repository::DynUserRepository,
    video::{
        model::{Video, VideoUpdate},
        repository::DynVideoRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynVideoService = Arc<dyn VideoServiceTrait + Send + Sync>;

#[async_trait]
pub trait VideoServiceTrait {
    /// 用户可见的视频（仅激活状态），附带是否已看过
    async fn list_for_user(&self, user: &ObjectId) -> AppResult<Vec<(Video, bool)>>;

    async fn get_for_user(&self, user: &ObjectId, id: &ObjectId) -> AppResult<(Video, bool)>;

    async fn list_videos(&self) -> AppResult<Vec<Video>>;

    async fn create_video(&self, added_by: &ObjectId, request: CreateVideoDto) -> AppResult<Video>;

    async fn update_video(&self, id: &ObjectId, update: VideoUpdate) -> AppResult<Video>;

    async fn delete_video(&self, id: &ObjectId) -> AppResult<Video>;

    async fn complete_video(&self, user: &ObjectId, id: &ObjectId, watched_seconds: u32) -> AppResult<CompleteVideoResponse>;
}

#[derive(Clone)]
pub struct VideoService {
    videos: DynVideoRepository,
    users: DynUserRepository,
    media: DynMediaStorage,
}

impl VideoService {
    pub fn new(videos: DynVideoRepository, users: DynUserRepository, media: DynMediaStorage) -> Self {
        Self { videos, users, media }
    }

    fn not_found(id: &ObjectId) -> AppError {
        AppError::NotFound(format!("Video with id {} not found.", id))
    }
}

#[async_trait]
impl VideoServiceTrait for VideoService {
    async fn list_for_user(&self, user: &ObjectId) -> AppResult<Vec<(Video, bool)>> {
        let user = self
            .users
            .get_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user)))?;

        let videos = self.videos.list_videos(true).await?;

        Ok(videos
            .into_iter()
            .map(|video| {
                let watched = video.id.map(|id| user.has_watched(&id)).unwrap_or(false);
                (video, watched)
            })
            .collect())
    }

    async fn get_for_user(&self, user: &ObjectId, id: &ObjectId) -> AppResult<(Video, bool)> {
        let video = self
            .videos
            .get_video(id)
            .await?
            .filter(|v| v.is_active)
            .ok_or_else(|| Self::not_found(id))?;

        let watched = self
            .users
            .get_user(user)
            .await?
            .map(|u| u.has_watched(id))
            .unwrap_or(false);

        Ok((video, watched))
    }

    async fn list_videos(&self) -> AppResult<Vec<Video>> {
        self.videos.list_videos(false).await
    }

    async fn create_video(&self, added_by: &ObjectId, request: CreateVideoDto) -> AppResult<Video> {
        let mut video = Video::new(
            &request.title,
            &request.youtube_url,
            request.points_reward,
            request.minimum_watch_time,
            *added_by,
        );
        video.is_active = request.is_active.unwrap_or(true);
        video.thumbnail_url = request.thumbnail_url;
        video.thumbnail_public_id = request.thumbnail_public_id;

        let video = self.videos.create_video(video).await?;
        info!("🎬 新视频已添加: {} ({} 积分)", video.title, video.points_reward);

        Ok(video)
    }

    async fn update_video(&self, id: &ObjectId, update: VideoUpdate) -> AppResult<Video> {
        let previous = self.videos.get_video(id).await?.ok_or_else(|| Self::not_found(id))?;

        let video = self
            .videos
            .update_video(id, &update)
            .await?
            .ok_or_else(|| Self::not_found(id))?;

        // 缩略图被替换时清理旧资源
        if let (Some(old), Some(new)) = (&previous.thumbnail_public_id, &update.thumbnail_public_id) {
            if old != new {
                if let Err(e) = self.media.destroy(old).await {
                    warn!("⚠️ 旧缩略图 {} 删除失败: {}", old, e);
                }
            }
        }

        Ok(video)
    }

    async fn delete_video(&self, id: &ObjectId) -> AppResult<Video> {
        let video = self.videos.delete_video(id).await?.ok_or_else(|| Self::not_found(id))?;

        if let Some(public_id) = &video.thumbnail_public_id {
            if let Err(e) = self.media.destroy(public_id).await {
                warn!("⚠️ 视频 {} 的缩略图 {} 删除失败: {}", id, public_id, e);
            }
        }

        info!("🗑️ 视频已删除: {}", video.title);
        Ok(video)
    }

    async fn complete_video(&self, user: &ObjectId, id: &ObjectId, watched_seconds: u32) -> AppResult<CompleteVideoResponse> {
        let account = self
            .users
            .get_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user)))?;

        if !account.is_active {
            return Err(AppError::Forbidden(
                "Please activate your account before watching videos.".to_string(),
            ));
        }

        let video = self.videos.get_video(id).await?.ok_or_else(|| Self::not_found(id))?;
        if !video.is_active {
            return Err(AppError::BadRequest("This video is no longer available.".to_string()));
        }

        if !video.is_watch_sufficient(watched_seconds) {
            return Err(AppError::BadRequest(format!(
                "You must watch at least {} seconds to earn points.",
                video.minimum_watch_time
            )));
        }

        if account.has_watched(id) || !self.users.record_video_watch(user, id, video.points_reward).await? {
            return Err(AppError::BadRequest("You have already watched this video.".to_string()));
        }

        let total_points = self
            .users
            .get_user(user)
            .await?
            .map(|u| u.points)
            .unwrap_or(account.points + video.points_reward);

        info!("📺 {} 看完视频 {}，获得 {} 积分", account.email, video.title, video.points_reward);

        Ok(CompleteVideoResponse {
            video_id: id.to_hex(),
            points_earned: video.points_reward,
            total_points,
        })
    }
}
