use crate::dtos::withdrawal_dto::CreateWithdrawalDto;
use async_trait::async_trait;
use database::{
    user::{model::withdrawal_refund_reference, repository::DynUserRepository},
    withdrawal::{
        model::{Withdrawal, WithdrawalStatus},
        repository::DynWithdrawalRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tracing::{error, info, warn};
use utils::{AppError, AppResult};

pub type DynWithdrawalService = Arc<dyn WithdrawalServiceTrait + Send + Sync>;

#[async_trait]
pub trait WithdrawalServiceTrait {
    /// 申请提现，余额立即扣除
    async fn request_withdrawal(&self, user: &ObjectId, request: CreateWithdrawalDto) -> AppResult<Withdrawal>;

    async fn my_withdrawals(&self, user: &ObjectId) -> AppResult<Vec<Withdrawal>>;

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<Withdrawal>>;

    async fn approve(&self, id: &ObjectId, admin: &ObjectId, notes: Option<String>) -> AppResult<Withdrawal>;

    /// 驳回提现并退回余额
    async fn reject(&self, id: &ObjectId, admin: &ObjectId, notes: Option<String>) -> AppResult<Withdrawal>;
}

#[derive(Clone)]
pub struct WithdrawalService {
    withdrawals: DynWithdrawalRepository,
    users: DynUserRepository,
    min_amount: i64,
}

impl WithdrawalService {
    pub fn new(withdrawals: DynWithdrawalRepository, users: DynUserRepository, min_amount: i64) -> Self {
        Self {
            withdrawals,
            users,
            min_amount,
        }
    }

    async fn process(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        admin: &ObjectId,
        notes: Option<String>,
    ) -> AppResult<Withdrawal> {
        let current = self
            .withdrawals
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal with id {} not found.", id)))?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::BadRequest(format!(
                "Withdrawal already processed ({}).",
                current.status.as_str()
            )));
        }

        // 并发审批时只有一个请求能命中 pending 条件
        self.withdrawals
            .process_withdrawal(id, status, admin, notes)
            .await?
            .ok_or_else(|| AppError::BadRequest("Withdrawal already processed.".to_string()))
    }
}

#[async_trait]
impl WithdrawalServiceTrait for WithdrawalService {
    async fn request_withdrawal(&self, user: &ObjectId, request: CreateWithdrawalDto) -> AppResult<Withdrawal> {
        if request.amount <= 0 {
            return Err(AppError::BadRequest("Amount must be greater than zero.".to_string()));
        }
        if request.amount < self.min_amount {
            return Err(AppError::BadRequest(format!(
                "Minimum withdrawal amount is {}.",
                self.min_amount
            )));
        }

        let account = self
            .users
            .get_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user)))?;

        if !account.is_active {
            return Err(AppError::Forbidden(
                "Please activate your account before requesting a withdrawal.".to_string(),
            ));
        }

        if !self.users.debit_earnings(user, request.amount).await? {
            return Err(AppError::BadRequest("Insufficient balance.".to_string()));
        }

        let withdrawal = Withdrawal::new(*user, request.amount, request.payment_method, request.account_details);

        match self.withdrawals.create_withdrawal(withdrawal).await {
            Ok(withdrawal) => {
                info!("💸 提现申请已创建: {} 申请 {}", account.email, withdrawal.amount);
                Ok(withdrawal)
            }
            Err(e) => {
                error!("❌ 提现记录写入失败，退回余额 {}: {}", request.amount, e);
                if let Err(refund_error) = self.users.adjust_earnings(user, request.amount).await {
                    error!("❌ 退回余额失败 {} -> {}: {}", user, request.amount, refund_error);
                }
                Err(e)
            }
        }
    }

    async fn my_withdrawals(&self, user: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        self.withdrawals.list_by_user(user).await
    }

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<Withdrawal>> {
        self.withdrawals.list_withdrawals(status).await
    }

    async fn approve(&self, id: &ObjectId, admin: &ObjectId, notes: Option<String>) -> AppResult<Withdrawal> {
        let withdrawal = self.process(id, WithdrawalStatus::Approved, admin, notes).await?;
        info!("✅ 提现 {} 已批准 ({})", id, withdrawal.amount);

        Ok(withdrawal)
    }

    async fn reject(&self, id: &ObjectId, admin: &ObjectId, notes: Option<String>) -> AppResult<Withdrawal> {
        let reference = withdrawal_refund_reference(id);
        let current = self
            .withdrawals
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Withdrawal with id {} not found.", id)))?;

        let withdrawal = if current.status == WithdrawalStatus::Rejected {
            // 已驳回但退款未入账时允许再次驳回以补发退款
            let refunded = self
                .users
                .get_user(&current.user)
                .await?
                .map(|user| user.has_credit(&reference))
                .unwrap_or(true);
            if refunded {
                return Err(AppError::BadRequest("Withdrawal already processed (rejected).".to_string()));
            }
            warn!("🔄 提现 {} 已驳回但退款未入账，补发退款", id);
            current
        } else {
            self.process(id, WithdrawalStatus::Rejected, admin, notes).await?
        };

        if self
            .users
            .credit_once(&withdrawal.user, &reference, withdrawal.amount)
            .await?
        {
            info!("↩️ 提现 {} 已驳回，退回 {} 给 {}", id, withdrawal.amount, withdrawal.user);
        } else {
            warn!("⚠️ 提现 {} 已驳回，但用户 {} 已不存在或已退款", id, withdrawal.user);
        }

        Ok(withdrawal)
    }
}
