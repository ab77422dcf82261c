use crate::{
    user::repository::number_field,
    withdrawal::model::{Withdrawal, WithdrawalStats, WithdrawalStatus},
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

pub type DynWithdrawalRepository = Arc<dyn WithdrawalRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait WithdrawalRepositoryTrait {
    async fn create_withdrawal(&self, withdrawal: Withdrawal) -> AppResult<Withdrawal>;

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>>;

    async fn list_by_user(&self, user: &ObjectId) -> AppResult<Vec<Withdrawal>>;

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<Withdrawal>>;

    // 仅当提现仍为pending时才处理，返回处理后的文档；已处理过返回None
    async fn process_withdrawal(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        processed_by: &ObjectId,
        notes: Option<String>,
    ) -> AppResult<Option<Withdrawal>>;

    async fn withdrawal_stats(&self) -> AppResult<WithdrawalStats>;
}

#[async_trait]
impl WithdrawalRepositoryTrait for Database {
    async fn create_withdrawal(&self, mut withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        let result = self.withdrawals.insert_one(&withdrawal, None).await?;
        withdrawal.id = result.inserted_id.as_object_id();

        Ok(withdrawal)
    }

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>> {
        let withdrawal = self.withdrawals.find_one(doc! { "_id": id }, None).await?;

        Ok(withdrawal)
    }

    async fn list_by_user(&self, user: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let withdrawals: Vec<Withdrawal> = self
            .withdrawals
            .find(doc! { "user": user }, options)
            .await?
            .try_collect()
            .await?;

        Ok(withdrawals)
    }

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<Withdrawal>> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();

        let withdrawals: Vec<Withdrawal> = self.withdrawals.find(filter, options).await?.try_collect().await?;

        Ok(withdrawals)
    }

    async fn process_withdrawal(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        processed_by: &ObjectId,
        notes: Option<String>,
    ) -> AppResult<Option<Withdrawal>> {
        let filter = doc! { "_id": id, "status": WithdrawalStatus::Pending.as_str() };
        let mut set = doc! {
            "status": status.as_str(),
            "processedBy": processed_by,
            "processedAt": BsonDateTime::now(),
        };
        if let Some(notes) = notes {
            set.insert("notes", notes);
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let withdrawal = self
            .withdrawals
            .find_one_and_update(filter, doc! { "$set": set }, options)
            .await?;

        Ok(withdrawal)
    }

    async fn withdrawal_stats(&self) -> AppResult<WithdrawalStats> {
        let pipeline = vec![doc! {
            "$group": {
                "_id": "$status",
                "count": { "$sum": 1 },
                "amount": { "$sum": "$amount" },
            }
        }];

        let mut stats = WithdrawalStats::default();
        let mut cursor = self.withdrawals.aggregate(pipeline, None).await?;

        while let Some(group) = cursor.try_next().await? {
            let count = number_field(&group, "count") as u64;
            let amount = number_field(&group, "amount");

            match group.get_str("_id").ok().and_then(|s| s.parse::<WithdrawalStatus>().ok()) {
                Some(WithdrawalStatus::Pending) => {
                    stats.pending_count = count;
                    stats.pending_amount = amount;
                }
                Some(WithdrawalStatus::Approved) => {
                    stats.approved_count = count;
                    stats.approved_amount = amount;
                }
                Some(WithdrawalStatus::Rejected) => stats.rejected_count = count,
                None => {}
            }
        }

        Ok(stats)
    }
}
