use crate::{
    is_duplicate_key_error,
    user::model::{ReferralNode, User, UserQuery, UserStats, UserUpdate},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use std::sync::Arc;
use tracing::info;
use utils::{AppError, AppResult};

pub type DynUserRepository = Arc<dyn UserRepositoryTrait + Send + Sync>;

// 主要用于Service中，表示提供了该Trait功能
#[async_trait]
pub trait UserRepositoryTrait {
    // 注册时创建用户，邮箱或推荐码冲突时返回Conflict
    async fn create_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>>;

    async fn get_users_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>>;

    async fn referral_code_exists(&self, code: &str) -> AppResult<bool>;

    // 分页查询用户，返回(当前页, 总数)
    async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, u64)>;

    // 获取某个用户的直接下级
    async fn list_referees(&self, referrer: &ObjectId) -> AppResult<Vec<User>>;

    async fn update_user(&self, id: &ObjectId, update: &UserUpdate) -> AppResult<Option<User>>;

    // 删除用户，并清除其下级的referredBy
    async fn delete_user(&self, id: &ObjectId) -> AppResult<bool>;

    // pending -> completed 的条件更新并记下激活交易，只有真正发生状态切换时返回true
    async fn activate_if_pending(&self, id: &ObjectId, transaction_id: &str) -> AppResult<bool>;

    // 余额增减
    async fn adjust_earnings(&self, id: &ObjectId, delta: i64) -> AppResult<bool>;

    // 按凭据一次性入账（推荐奖励、退款）；该凭据已入账过时返回false
    async fn credit_once(&self, id: &ObjectId, reference: &str, amount: i64) -> AppResult<bool>;

    // 余额充足时扣减，否则返回false
    async fn debit_earnings(&self, id: &ObjectId, amount: i64) -> AppResult<bool>;

    // 记录观看并增加积分；该视频已观看过时返回false
    async fn record_video_watch(&self, id: &ObjectId, video_id: &ObjectId, points: i64) -> AppResult<bool>;

    // 获取整个推荐关系图
    async fn referral_nodes(&self) -> AppResult<Vec<ReferralNode>>;

    async fn user_stats(&self) -> AppResult<UserStats>;
}

#[async_trait]
impl UserRepositoryTrait for Database {
    async fn create_user(&self, mut user: User) -> AppResult<User> {
        let existing_user = self.users.find_one(doc! { "email": &user.email }, None).await?;

        if existing_user.is_some() {
            return Err(AppError::Conflict(format!("User with email: {} already exists.", user.email)));
        }

        let result = match self.users.insert_one(&user, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key_error(&e) => {
                return Err(AppError::Conflict(format!(
                    "User with email {} or referral code {} already exists.",
                    user.email, user.referral_code
                )));
            }
            Err(e) => return Err(e.into()),
        };

        user.id = result.inserted_id.as_object_id();
        info!("👤 新用户已创建: {} ({})", user.email, user.id_hex());

        Ok(user)
    }

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>> {
        let user = self.users.find_one(doc! { "_id": id }, None).await?;

        Ok(user)
    }

    async fn get_users_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users: Vec<User> = self
            .users
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?
            .try_collect()
            .await?;

        Ok(users)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let filter = doc! { "email": email.trim().to_lowercase() };
        let user = self.users.find_one(filter, None).await?;

        Ok(user)
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let filter = doc! { "referralCode": code.trim().to_uppercase() };
        let user = self.users.find_one(filter, None).await?;

        Ok(user)
    }

    async fn referral_code_exists(&self, code: &str) -> AppResult<bool> {
        let count = self.users.count_documents(doc! { "referralCode": code }, None).await?;

        Ok(count > 0)
    }

    async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, u64)> {
        let filter = query.filter();
        let total = self.users.count_documents(filter.clone(), None).await?;

        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .skip(query.skip())
            .limit(query.limit as i64)
            .build();

        let users: Vec<User> = self.users.find(filter, options).await?.try_collect().await?;

        Ok((users, total))
    }

    async fn list_referees(&self, referrer: &ObjectId) -> AppResult<Vec<User>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let users: Vec<User> = self
            .users
            .find(doc! { "referredBy": referrer }, options)
            .await?
            .try_collect()
            .await?;

        Ok(users)
    }

    async fn update_user(&self, id: &ObjectId, update: &UserUpdate) -> AppResult<Option<User>> {
        let mut set = update.to_set_document();
        set.insert("updatedAt", BsonDateTime::now());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let user = self
            .users
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, options)
            .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: &ObjectId) -> AppResult<bool> {
        let result = self.users.delete_one(doc! { "_id": id }, None).await?;

        if result.deleted_count == 0 {
            return Ok(false);
        }

        let orphaned = self
            .users
            .update_many(doc! { "referredBy": id }, doc! { "$unset": { "referredBy": "" } }, None)
            .await?;

        info!("🗑️ 用户 {} 已删除，{} 个下级的推荐人已清除", id, orphaned.modified_count);

        Ok(true)
    }

    async fn activate_if_pending(&self, id: &ObjectId, transaction_id: &str) -> AppResult<bool> {
        let filter = doc! { "_id": id, "paymentStatus": "pending" };
        let update = doc! {
            "$set": {
                "paymentStatus": "completed",
                "isActive": true,
                "activationTransaction": transaction_id,
                "updatedAt": BsonDateTime::now(),
            }
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn adjust_earnings(&self, id: &ObjectId, delta: i64) -> AppResult<bool> {
        let update = doc! {
            "$inc": { "earnings": delta },
            "$set": { "updatedAt": BsonDateTime::now() },
        };

        let result = self.users.update_one(doc! { "_id": id }, update, None).await?;

        Ok(result.matched_count == 1)
    }

    async fn credit_once(&self, id: &ObjectId, reference: &str, amount: i64) -> AppResult<bool> {
        // 余额和凭据在同一次更新中写入
        let filter = doc! { "_id": id, "creditReferences": { "$ne": reference } };
        let update = doc! {
            "$inc": { "earnings": amount },
            "$push": { "creditReferences": reference },
            "$set": { "updatedAt": BsonDateTime::now() },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn debit_earnings(&self, id: &ObjectId, amount: i64) -> AppResult<bool> {
        let filter = doc! { "_id": id, "earnings": { "$gte": amount } };
        let update = doc! {
            "$inc": { "earnings": -amount },
            "$set": { "updatedAt": BsonDateTime::now() },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn record_video_watch(&self, id: &ObjectId, video_id: &ObjectId, points: i64) -> AppResult<bool> {
        let filter = doc! { "_id": id, "videosWatched.videoId": { "$ne": video_id } };
        let now = BsonDateTime::now();
        let update = doc! {
            "$push": { "videosWatched": { "videoId": video_id, "watchedAt": now } },
            "$inc": { "points": points },
            "$set": { "updatedAt": now },
        };

        let result = self.users.update_one(filter, update, None).await?;

        Ok(result.modified_count == 1)
    }

    async fn referral_nodes(&self) -> AppResult<Vec<ReferralNode>> {
        let options = FindOptions::builder()
            .projection(doc! { "_id": 1, "referredBy": 1, "isActive": 1 })
            .build();

        let nodes: Vec<ReferralNode> = self
            .users
            .clone_with_type::<ReferralNode>()
            .find(doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(nodes)
    }

    async fn user_stats(&self) -> AppResult<UserStats> {
        let pipeline = vec![doc! {
            "$group": {
                "_id": null,
                "totalUsers": { "$sum": 1 },
                "activeUsers": { "$sum": { "$cond": ["$isActive", 1, 0] } },
                "totalPoints": { "$sum": "$points" },
                "totalEarnings": { "$sum": "$earnings" },
            }
        }];

        let mut cursor = self.users.aggregate(pipeline, None).await?;
        let stats = match cursor.try_next().await? {
            Some(group) => UserStats {
                total_users: number_field(&group, "totalUsers") as u64,
                active_users: number_field(&group, "activeUsers") as u64,
                total_points: number_field(&group, "totalPoints"),
                total_earnings: number_field(&group, "totalEarnings"),
            },
            None => UserStats::default(),
        };

        Ok(stats)
    }
}

/// `$sum` 的结果可能是 Int32、Int64 或 Double
pub(crate) fn number_field(document: &Document, key: &str) -> i64 {
    match document.get(key) {
        Some(mongodb::bson::Bson::Int32(v)) => *v as i64,
        Some(mongodb::bson::Bson::Int64(v)) => *v,
        Some(mongodb::bson::Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}
