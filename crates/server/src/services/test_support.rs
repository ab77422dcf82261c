//! 测试用的内存仓储与外部服务替身，语义与MongoDB实现保持一致

use crate::{
    auth::{AuthConfig, JwtManager},
    dtos::admin_dto::{MediaDeleteResponse, MediaUploadResponse},
    services::{
        media::MediaStorageTrait,
        payment::flutterwave::{GatewayTransaction, PaymentGatewayTrait, PaymentRequest},
        Repositories, Services,
    },
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use database::{
    payment::{model::PaymentTransaction, repository::PaymentTransactionRepositoryTrait},
    referral_earning::{
        model::{ReferralEarning, ReferralEarningOverride},
        repository::ReferralEarningRepositoryTrait,
    },
    user::{
        model::{PaymentStatus, ReferralNode, User, UserQuery, UserRole, UserStats, UserUpdate, VideoWatch},
        repository::UserRepositoryTrait,
    },
    video::{
        model::{Video, VideoUpdate},
        repository::VideoRepositoryTrait,
    },
    withdrawal::{
        model::{Withdrawal, WithdrawalStats, WithdrawalStatus},
        repository::WithdrawalRepositoryTrait,
    },
};
use mongodb::bson::oid::ObjectId;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use utils::{AppConfig, AppError, AppResult};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<User>>,
    videos: Mutex<Vec<Video>>,
    withdrawals: Mutex<Vec<Withdrawal>>,
    earnings: Mutex<Vec<ReferralEarning>>,
    transactions: Mutex<Vec<PaymentTransaction>>,
    failures: Mutex<Vec<&'static str>>,
}

impl MemoryStore {
    /// 直接插入一个用户，返回其id
    pub async fn insert_user(&self, email: &str, referred_by: Option<ObjectId>, active: bool) -> ObjectId {
        let mut users = self.users.lock().unwrap();
        let id = ObjectId::new();
        let mut user = User::new(
            email,
            "not-a-real-hash".to_string(),
            email.split('@').next().unwrap_or(email),
            format!("R{:07}", users.len()),
            referred_by,
        );
        user.id = Some(id);
        user.is_active = active;
        if active {
            user.payment_status = PaymentStatus::Completed;
        }
        // 保证创建时间有先后
        user.created_at = Utc::now() + Duration::milliseconds(users.len() as i64);
        users.push(user);
        id
    }

    pub async fn insert_admin(&self, email: &str) -> ObjectId {
        let id = self.insert_user(email, None, true).await;
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == Some(id)) {
            user.role = UserRole::Admin;
        }
        id
    }

    pub async fn set_earnings(&self, user: &ObjectId, earnings: i64) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id.as_ref() == Some(user)) {
            user.earnings = earnings;
        }
    }

    pub async fn insert_video(&self, points_reward: i64, minimum_watch_time: u32, active: bool) -> ObjectId {
        let mut video = Video::new(
            "Test video",
            "https://www.youtube.com/watch?v=test",
            points_reward,
            minimum_watch_time,
            ObjectId::new(),
        );
        let id = ObjectId::new();
        video.id = Some(id);
        video.is_active = active;
        self.videos.lock().unwrap().push(video);
        id
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    pub fn transaction(&self, transaction_id: &str) -> Option<PaymentTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.transaction_id == transaction_id)
            .cloned()
    }

    /// 让指定操作的下一次调用返回存储错误
    pub fn fail_next(&self, operation: &'static str) {
        self.failures.lock().unwrap().push(operation);
    }

    fn injected_failure(&self, operation: &str) -> AppResult<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|f| *f == operation) {
            Some(index) => {
                failures.remove(index);
                Err(AppError::InternalServerErrorWithContext(format!(
                    "simulated storage failure in {}",
                    operation
                )))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryStore {
    async fn create_user(&self, mut user: User) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email == user.email || u.referral_code == user.referral_code)
        {
            return Err(AppError::Conflict(format!("User with email: {} already exists.", user.email)));
        }
        user.id = Some(ObjectId::new());
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: &ObjectId) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn get_users_by_ids(&self, ids: &[ObjectId]) -> AppResult<Vec<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.id.map(|id| ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let code = code.trim().to_uppercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn referral_code_exists(&self, code: &str) -> AppResult<bool> {
        Ok(self.users.lock().unwrap().iter().any(|u| u.referral_code == code))
    }

    async fn list_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, u64)> {
        let mut matched: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| query.matches(u))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(query.skip() as usize)
            .take(query.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn list_referees(&self, referrer: &ObjectId) -> AppResult<Vec<User>> {
        let mut referees: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.referred_by.as_ref() == Some(referrer))
            .cloned()
            .collect();
        referees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(referees)
    }

    async fn update_user(&self, id: &ObjectId, update: &UserUpdate) -> AppResult<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id.as_ref() == Some(id)).map(|user| {
            update.apply(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: &ObjectId) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id.as_ref() != Some(id));
        if users.len() == before {
            return Ok(false);
        }
        for user in users.iter_mut().filter(|u| u.referred_by.as_ref() == Some(id)) {
            user.referred_by = None;
        }
        Ok(true)
    }

    async fn activate_if_pending(&self, id: &ObjectId, transaction_id: &str) -> AppResult<bool> {
        self.injected_failure("activate_if_pending")?;
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id.as_ref() == Some(id) && u.payment_status == PaymentStatus::Pending)
        {
            Some(user) => {
                user.payment_status = PaymentStatus::Completed;
                user.is_active = true;
                user.activation_transaction = Some(transaction_id.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn adjust_earnings(&self, id: &ObjectId, delta: i64) -> AppResult<bool> {
        self.injected_failure("adjust_earnings")?;
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id.as_ref() == Some(id)) {
            Some(user) => {
                user.earnings += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn credit_once(&self, id: &ObjectId, reference: &str, amount: i64) -> AppResult<bool> {
        self.injected_failure("credit_once")?;
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id.as_ref() == Some(id) && !u.has_credit(reference))
        {
            Some(user) => {
                user.earnings += amount;
                user.credit_references.push(reference.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn debit_earnings(&self, id: &ObjectId, amount: i64) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id.as_ref() == Some(id) && u.earnings >= amount)
        {
            Some(user) => {
                user.earnings -= amount;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_video_watch(&self, id: &ObjectId, video_id: &ObjectId, points: i64) -> AppResult<bool> {
        let mut users = self.users.lock().unwrap();
        match users
            .iter_mut()
            .find(|u| u.id.as_ref() == Some(id) && !u.has_watched(video_id))
        {
            Some(user) => {
                user.videos_watched.push(VideoWatch {
                    video_id: *video_id,
                    watched_at: Utc::now(),
                });
                user.points += points;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn referral_nodes(&self) -> AppResult<Vec<ReferralNode>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter_map(|u| {
                u.id.map(|id| ReferralNode {
                    id,
                    referred_by: u.referred_by,
                    is_active: u.is_active,
                })
            })
            .collect())
    }

    async fn user_stats(&self) -> AppResult<UserStats> {
        let users = self.users.lock().unwrap();
        Ok(UserStats {
            total_users: users.len() as u64,
            active_users: users.iter().filter(|u| u.is_active).count() as u64,
            total_points: users.iter().map(|u| u.points).sum(),
            total_earnings: users.iter().map(|u| u.earnings).sum(),
        })
    }
}

#[async_trait]
impl VideoRepositoryTrait for MemoryStore {
    async fn create_video(&self, mut video: Video) -> AppResult<Video> {
        video.id = Some(ObjectId::new());
        self.videos.lock().unwrap().push(video.clone());
        Ok(video)
    }

    async fn get_video(&self, id: &ObjectId) -> AppResult<Option<Video>> {
        Ok(self.videos.lock().unwrap().iter().find(|v| v.id.as_ref() == Some(id)).cloned())
    }

    async fn list_videos(&self, active_only: bool) -> AppResult<Vec<Video>> {
        let mut videos: Vec<Video> = self
            .videos
            .lock()
            .unwrap()
            .iter()
            .filter(|v| !active_only || v.is_active)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn update_video(&self, id: &ObjectId, update: &VideoUpdate) -> AppResult<Option<Video>> {
        let mut videos = self.videos.lock().unwrap();
        Ok(videos.iter_mut().find(|v| v.id.as_ref() == Some(id)).map(|video| {
            update.apply(video);
            video.clone()
        }))
    }

    async fn delete_video(&self, id: &ObjectId) -> AppResult<Option<Video>> {
        let mut videos = self.videos.lock().unwrap();
        let position = videos.iter().position(|v| v.id.as_ref() == Some(id));
        Ok(position.map(|index| videos.remove(index)))
    }

    async fn count_videos(&self, active_only: bool) -> AppResult<u64> {
        Ok(self
            .videos
            .lock()
            .unwrap()
            .iter()
            .filter(|v| !active_only || v.is_active)
            .count() as u64)
    }
}

#[async_trait]
impl WithdrawalRepositoryTrait for MemoryStore {
    async fn create_withdrawal(&self, mut withdrawal: Withdrawal) -> AppResult<Withdrawal> {
        withdrawal.id = Some(ObjectId::new());
        self.withdrawals.lock().unwrap().push(withdrawal.clone());
        Ok(withdrawal)
    }

    async fn get_withdrawal(&self, id: &ObjectId) -> AppResult<Option<Withdrawal>> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id.as_ref() == Some(id))
            .cloned())
    }

    async fn list_by_user(&self, user: &ObjectId) -> AppResult<Vec<Withdrawal>> {
        let mut withdrawals: Vec<Withdrawal> = self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| &w.user == user)
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(withdrawals)
    }

    async fn list_withdrawals(&self, status: Option<WithdrawalStatus>) -> AppResult<Vec<Withdrawal>> {
        let mut withdrawals: Vec<Withdrawal> = self
            .withdrawals
            .lock()
            .unwrap()
            .iter()
            .filter(|w| status.map(|s| w.status == s).unwrap_or(true))
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(withdrawals)
    }

    async fn process_withdrawal(
        &self,
        id: &ObjectId,
        status: WithdrawalStatus,
        processed_by: &ObjectId,
        notes: Option<String>,
    ) -> AppResult<Option<Withdrawal>> {
        self.injected_failure("process_withdrawal")?;
        let mut withdrawals = self.withdrawals.lock().unwrap();
        Ok(withdrawals
            .iter_mut()
            .find(|w| w.id.as_ref() == Some(id) && w.status == WithdrawalStatus::Pending)
            .map(|withdrawal| {
                withdrawal.status = status;
                withdrawal.processed_by = Some(*processed_by);
                withdrawal.processed_at = Some(Utc::now());
                if notes.is_some() {
                    withdrawal.notes = notes;
                }
                withdrawal.clone()
            }))
    }

    async fn withdrawal_stats(&self) -> AppResult<WithdrawalStats> {
        let withdrawals = self.withdrawals.lock().unwrap();
        let mut stats = WithdrawalStats::default();
        for withdrawal in withdrawals.iter() {
            match withdrawal.status {
                WithdrawalStatus::Pending => {
                    stats.pending_count += 1;
                    stats.pending_amount += withdrawal.amount;
                }
                WithdrawalStatus::Approved => {
                    stats.approved_count += 1;
                    stats.approved_amount += withdrawal.amount;
                }
                WithdrawalStatus::Rejected => stats.rejected_count += 1,
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl ReferralEarningRepositoryTrait for MemoryStore {
    async fn get_earning(&self, user: &ObjectId) -> AppResult<Option<ReferralEarning>> {
        Ok(self.earnings.lock().unwrap().iter().find(|r| &r.user == user).cloned())
    }

    async fn list_earnings(&self) -> AppResult<Vec<ReferralEarning>> {
        let mut records = self.earnings.lock().unwrap().clone();
        records.sort_by(|a, b| b.total_earnings.cmp(&a.total_earnings));
        Ok(records)
    }

    async fn upsert_earning(&self, record: &ReferralEarning) -> AppResult<()> {
        let mut records = self.earnings.lock().unwrap();
        match records.iter_mut().find(|r| r.user == record.user) {
            Some(existing) => {
                let id = existing.id;
                *existing = record.clone();
                existing.id = id;
            }
            None => {
                let mut record = record.clone();
                record.id = Some(ObjectId::new());
                records.push(record);
            }
        }
        Ok(())
    }

    async fn increment_level(&self, user: &ObjectId, level: u8, amount: i64, include_earnings: bool) -> AppResult<()> {
        if !(1..=3).contains(&level) {
            return Err(AppError::BadRequest(format!("Invalid referral level: {}", level)));
        }
        self.injected_failure("increment_level")?;

        let mut records = self.earnings.lock().unwrap();
        if !records.iter().any(|r| &r.user == user) {
            let mut record = ReferralEarning::empty(*user);
            record.id = Some(ObjectId::new());
            records.push(record);
        }

        if let Some(record) = records.iter_mut().find(|r| &r.user == user) {
            match level {
                1 => record.level1_count += 1,
                2 => record.level2_count += 1,
                _ => record.level3_count += 1,
            }
            if include_earnings {
                match level {
                    1 => record.level1_earnings += amount,
                    2 => record.level2_earnings += amount,
                    _ => record.level3_earnings += amount,
                }
                record.total_earnings += amount;
            }
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn apply_override(&self, user: &ObjectId, update: &ReferralEarningOverride) -> AppResult<Option<ReferralEarning>> {
        let mut records = self.earnings.lock().unwrap();
        Ok(records.iter_mut().find(|r| &r.user == user).map(|record| {
            update.apply(record);
            record.clone()
        }))
    }

    async fn delete_earning(&self, user: &ObjectId) -> AppResult<bool> {
        let mut records = self.earnings.lock().unwrap();
        let before = records.len();
        records.retain(|r| &r.user != user);
        Ok(records.len() != before)
    }
}

#[async_trait]
impl PaymentTransactionRepositoryTrait for MemoryStore {
    async fn record_transaction(&self, transaction: &PaymentTransaction) -> AppResult<bool> {
        let mut transactions = self.transactions.lock().unwrap();
        if transactions
            .iter()
            .any(|t| t.transaction_id == transaction.transaction_id)
        {
            return Ok(false);
        }
        transactions.push(transaction.clone());
        Ok(true)
    }

    async fn get_transaction(&self, transaction_id: &str) -> AppResult<Option<PaymentTransaction>> {
        Ok(self.transaction(transaction_id))
    }

    async fn mark_applied(&self, transaction_id: &str) -> AppResult<()> {
        self.injected_failure("mark_applied")?;
        let mut transactions = self.transactions.lock().unwrap();
        if let Some(transaction) = transactions.iter_mut().find(|t| t.transaction_id == transaction_id) {
            transaction.applied = true;
        }
        Ok(())
    }
}

/// 支付网关替身：按交易id返回预置的交易
#[derive(Default)]
pub struct MockGateway {
    transactions: Mutex<HashMap<String, GatewayTransaction>>,
    pub requests: Mutex<Vec<PaymentRequest>>,
}

impl MockGateway {
    pub fn with_transaction(self, transaction: GatewayTransaction) -> Self {
        self.add_transaction(transaction);
        self
    }

    pub fn add_transaction(&self, transaction: GatewayTransaction) {
        self.transactions
            .lock()
            .unwrap()
            .insert(transaction.id.to_string(), transaction);
    }
}

#[async_trait]
impl PaymentGatewayTrait for MockGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> AppResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(format!("https://checkout.example.com/pay/{}", request.tx_ref))
    }

    async fn verify_transaction(&self, transaction_id: &str) -> AppResult<GatewayTransaction> {
        self.transactions
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| AppError::BadGateway(format!("No transaction was found for id {}", transaction_id)))
    }
}

/// 媒体存储替身
#[derive(Default)]
pub struct MockMedia {
    pub uploads: Mutex<Vec<String>>,
    pub destroyed: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaStorageTrait for MockMedia {
    async fn upload(&self, data_uri: &str, folder: Option<&str>) -> AppResult<MediaUploadResponse> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(data_uri.to_string());
        let public_id = format!("{}/asset{}", folder.unwrap_or("rewards"), uploads.len());
        Ok(MediaUploadResponse {
            secure_url: format!("https://res.cloudinary.com/demo/image/upload/{}.png", public_id),
            public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> AppResult<MediaDeleteResponse> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(MediaDeleteResponse {
            public_id: public_id.to_string(),
            result: "ok".to_string(),
        })
    }
}

/// 测试环境下的一整套服务
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub media: Arc<MockMedia>,
    pub config: AppConfig,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_gateway(MockGateway::default())
    }

    pub fn with_gateway(gateway: MockGateway) -> Self {
        let store = Arc::new(MemoryStore::default());
        let gateway = Arc::new(gateway);
        let media = Arc::new(MockMedia::default());
        let config = AppConfig::new_for_test();

        let repositories = Repositories {
            users: store.clone(),
            videos: store.clone(),
            withdrawals: store.clone(),
            earnings: store.clone(),
            transactions: store.clone(),
        };
        let jwt = Arc::new(JwtManager::new(AuthConfig::from(&config)));
        let services = Services::with_parts(repositories, gateway.clone(), media.clone(), &config, jwt);

        Self {
            store,
            gateway,
            media,
            config,
            services,
        }
    }

    /// 为已有用户签发令牌
    pub async fn token_for(&self, user: &ObjectId) -> String {
        let role = self
            .store
            .get_user(user)
            .await
            .unwrap()
            .map(|u| u.role)
            .unwrap_or_default();
        self.services.jwt.generate_token(user, role).unwrap()
    }
}
