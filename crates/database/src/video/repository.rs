use crate::{
    video::model::{Video, VideoUpdate},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use std::sync::Arc;
use utils::AppResult;

pub type DynVideoRepository = Arc<dyn VideoRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait VideoRepositoryTrait {
    async fn create_video(&self, video: Video) -> AppResult<Video>;

    async fn get_video(&self, id: &ObjectId) -> AppResult<Option<Video>>;

    // active_only为true时只返回上架中的视频
    async fn list_videos(&self, active_only: bool) -> AppResult<Vec<Video>>;

    async fn update_video(&self, id: &ObjectId, update: &VideoUpdate) -> AppResult<Option<Video>>;

    // 返回被删除的视频，便于清理媒体资源
    async fn delete_video(&self, id: &ObjectId) -> AppResult<Option<Video>>;

    async fn count_videos(&self, active_only: bool) -> AppResult<u64>;
}

#[async_trait]
impl VideoRepositoryTrait for Database {
    async fn create_video(&self, mut video: Video) -> AppResult<Video> {
        let result = self.videos.insert_one(&video, None).await?;
        video.id = result.inserted_id.as_object_id();

        Ok(video)
    }

    async fn get_video(&self, id: &ObjectId) -> AppResult<Option<Video>> {
        let video = self.videos.find_one(doc! { "_id": id }, None).await?;

        Ok(video)
    }

    async fn list_videos(&self, active_only: bool) -> AppResult<Vec<Video>> {
        let filter = if active_only { doc! { "isActive": true } } else { doc! {} };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();

        let videos: Vec<Video> = self.videos.find(filter, options).await?.try_collect().await?;

        Ok(videos)
    }

    async fn update_video(&self, id: &ObjectId, update: &VideoUpdate) -> AppResult<Option<Video>> {
        let mut set = update.to_set_document();
        set.insert("updatedAt", BsonDateTime::now());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let video = self
            .videos
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await?;

        Ok(video)
    }

    async fn delete_video(&self, id: &ObjectId) -> AppResult<Option<Video>> {
        let video = self.videos.find_one_and_delete(doc! { "_id": id }, None).await?;

        Ok(video)
    }

    async fn count_videos(&self, active_only: bool) -> AppResult<u64> {
        let filter = if active_only { doc! { "isActive": true } } else { doc! {} };
        let count = self.videos.count_documents(filter, None).await?;

        Ok(count)
    }
}
