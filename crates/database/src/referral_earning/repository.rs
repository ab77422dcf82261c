use crate::{
    referral_earning::model::{ReferralEarning, ReferralEarningOverride},
    Database,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    options::{FindOptions, ReplaceOptions, UpdateOptions},
};
use std::sync::Arc;
use utils::{AppError, AppResult};

pub type DynReferralEarningRepository = Arc<dyn ReferralEarningRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait ReferralEarningRepositoryTrait {
    async fn get_earning(&self, user: &ObjectId) -> AppResult<Option<ReferralEarning>>;

    async fn list_earnings(&self) -> AppResult<Vec<ReferralEarning>>;

    // 按user整体写入（重算结果）
    async fn upsert_earning(&self, record: &ReferralEarning) -> AppResult<()>;

    // 增量更新某一级别；include_earnings为false时只累加人数（手动修改过的记录）
    async fn increment_level(&self, user: &ObjectId, level: u8, amount: i64, include_earnings: bool) -> AppResult<()>;

    async fn apply_override(&self, user: &ObjectId, update: &ReferralEarningOverride) -> AppResult<Option<ReferralEarning>>;

    async fn delete_earning(&self, user: &ObjectId) -> AppResult<bool>;
}

fn level_fields(level: u8) -> AppResult<(&'static str, &'static str)> {
    match level {
        1 => Ok(("level1Count", "level1Earnings")),
        2 => Ok(("level2Count", "level2Earnings")),
        3 => Ok(("level3Count", "level3Earnings")),
        other => Err(AppError::InternalServerErrorWithContext(format!(
            "Referral level {} is out of range",
            other
        ))),
    }
}

#[async_trait]
impl ReferralEarningRepositoryTrait for Database {
    async fn get_earning(&self, user: &ObjectId) -> AppResult<Option<ReferralEarning>> {
        let record = self.referral_earnings.find_one(doc! { "user": user }, None).await?;

        Ok(record)
    }

    async fn list_earnings(&self) -> AppResult<Vec<ReferralEarning>> {
        let options = FindOptions::builder().sort(doc! { "totalEarnings": -1 }).build();
        let records: Vec<ReferralEarning> = self
            .referral_earnings
            .find(doc! {}, options)
            .await?
            .try_collect()
            .await?;

        Ok(records)
    }

    async fn upsert_earning(&self, record: &ReferralEarning) -> AppResult<()> {
        let mut replacement = record.clone();
        replacement.id = None;

        let options = ReplaceOptions::builder().upsert(true).build();
        self.referral_earnings
            .replace_one(doc! { "user": record.user }, replacement, options)
            .await?;

        Ok(())
    }

    async fn increment_level(&self, user: &ObjectId, level: u8, amount: i64, include_earnings: bool) -> AppResult<()> {
        let (count_field, earnings_field) = level_fields(level)?;

        let mut inc = Document::new();
        inc.insert(count_field, Bson::Int64(1));
        if include_earnings {
            inc.insert(earnings_field, Bson::Int64(amount));
            inc.insert("totalEarnings", Bson::Int64(amount));
        }

        let now = BsonDateTime::now();
        let update = doc! {
            "$inc": inc,
            "$set": { "updatedAt": now },
            "$setOnInsert": { "isManuallyEdited": false, "lastCalculatedAt": now },
        };

        let options = UpdateOptions::builder().upsert(true).build();
        self.referral_earnings
            .update_one(doc! { "user": user }, update, options)
            .await?;

        Ok(())
    }

    async fn apply_override(&self, user: &ObjectId, update: &ReferralEarningOverride) -> AppResult<Option<ReferralEarning>> {
        let Some(mut record) = self.get_earning(user).await? else {
            return Ok(None);
        };

        update.apply(&mut record);
        self.upsert_earning(&record).await?;

        Ok(Some(record))
    }

    async fn delete_earning(&self, user: &ObjectId) -> AppResult<bool> {
        let result = self.referral_earnings.delete_one(doc! { "user": user }, None).await?;

        Ok(result.deleted_count > 0)
    }
}
