////////////////////////////////////////////////////////////////////////
//
// 1. 每个Domain(Entity)单独一个文件夹
// 2. 每个Domain由两部分组成:
//    - model: 定义Schema
//    - repository: 实际的数据库底层操作
//
//////////////////////////////////////////////////////////////////////

use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use std::sync::Arc;
use tracing::{error, info};
use utils::{AppConfig, AppError, AppResult};

pub mod payment;
pub mod referral_earning;
pub mod serde_helpers;
pub mod user;
pub mod video;
pub mod withdrawal;

#[derive(Clone, Debug)]
pub struct Database {
    pub users: Collection<user::model::User>,
    pub videos: Collection<video::model::Video>,
    pub withdrawals: Collection<withdrawal::model::Withdrawal>,
    pub referral_earnings: Collection<referral_earning::model::ReferralEarning>,
    pub payment_transactions: Collection<payment::model::PaymentTransaction>,
}

impl Database {
    pub async fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = Client::with_uri_str(&config.mongo_uri).await?;
        let db: mongodb::Database = client.database(&config.mongo_db);

        let users = db.collection("User");
        let videos = db.collection("Video");
        let withdrawals = db.collection("Withdrawal");
        let referral_earnings = db.collection("ReferralEarning");
        let payment_transactions = db.collection("PaymentTransaction");

        info!("🧱 database({:#}) connected.", &config.mongo_db);

        Ok(Database {
            users,
            videos,
            withdrawals,
            referral_earnings,
            payment_transactions,
        })
    }

    /// 初始化各集合索引（唯一约束是并发注册、重复验证支付时的最后防线）
    pub async fn init_indexes(&self) -> AppResult<()> {
        info!("🔧 初始化数据库索引...");

        let user_indexes = vec![
            unique_index(doc! { "email": 1 }, "email_unique"),
            unique_index(doc! { "referralCode": 1 }, "referralCode_unique"),
            index(doc! { "referredBy": 1 }, "referredBy"),
            index(doc! { "createdAt": -1 }, "createdAt_desc"),
        ];
        let video_indexes = vec![index(doc! { "isActive": 1, "createdAt": -1 }, "isActive_createdAt")];
        let withdrawal_indexes = vec![
            index(doc! { "user": 1, "createdAt": -1 }, "user_createdAt"),
            index(doc! { "status": 1 }, "status"),
        ];
        let earning_indexes = vec![
            unique_index(doc! { "user": 1 }, "user_unique"),
            index(doc! { "totalEarnings": -1 }, "totalEarnings_desc"),
        ];
        let transaction_indexes = vec![unique_index(doc! { "transactionId": 1 }, "transactionId_unique")];

        let results = [
            ("User", self.users.create_indexes(user_indexes, None).await.map(|r| r.index_names)),
            ("Video", self.videos.create_indexes(video_indexes, None).await.map(|r| r.index_names)),
            (
                "Withdrawal",
                self.withdrawals.create_indexes(withdrawal_indexes, None).await.map(|r| r.index_names),
            ),
            (
                "ReferralEarning",
                self.referral_earnings
                    .create_indexes(earning_indexes, None)
                    .await
                    .map(|r| r.index_names),
            ),
            (
                "PaymentTransaction",
                self.payment_transactions
                    .create_indexes(transaction_indexes, None)
                    .await
                    .map(|r| r.index_names),
            ),
        ];

        for (collection, result) in results {
            match result {
                Ok(names) => info!("✅ {} 索引创建成功: {:?}", collection, names),
                Err(e) => {
                    error!("❌ {} 索引创建失败: {}", collection, e);
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }
}

fn index(keys: mongodb::bson::Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}

fn unique_index(keys: mongodb::bson::Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).name(name.to_string()).build())
        .build()
}

/// 是否为唯一索引冲突（E11000）
pub fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

/// 解析路径参数中的ObjectId
pub fn parse_object_id(id: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", id)))
}
