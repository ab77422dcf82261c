use crate::{is_duplicate_key_error, payment::model::PaymentTransaction, Database};
use async_trait::async_trait;
use mongodb::bson::doc;
use std::sync::Arc;
use tracing::info;
use utils::AppResult;

pub type DynPaymentTransactionRepository = Arc<dyn PaymentTransactionRepositoryTrait + Send + Sync>;

#[async_trait]
pub trait PaymentTransactionRepositoryTrait {
    // 记录交易；同一transactionId已记录过时返回false
    async fn record_transaction(&self, transaction: &PaymentTransaction) -> AppResult<bool>;

    async fn get_transaction(&self, transaction_id: &str) -> AppResult<Option<PaymentTransaction>>;

    async fn mark_applied(&self, transaction_id: &str) -> AppResult<()>;
}

#[async_trait]
impl PaymentTransactionRepositoryTrait for Database {
    async fn record_transaction(&self, transaction: &PaymentTransaction) -> AppResult<bool> {
        match self.payment_transactions.insert_one(transaction, None).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key_error(&e) => {
                info!("🔁 交易 {} 已处理过，跳过", transaction.transaction_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_transaction(&self, transaction_id: &str) -> AppResult<Option<PaymentTransaction>> {
        let transaction = self
            .payment_transactions
            .find_one(doc! { "transactionId": transaction_id }, None)
            .await?;

        Ok(transaction)
    }

    async fn mark_applied(&self, transaction_id: &str) -> AppResult<()> {
        self.payment_transactions
            .update_one(
                doc! { "transactionId": transaction_id },
                doc! { "$set": { "applied": true } },
                None,
            )
            .await?;

        Ok(())
    }
}
