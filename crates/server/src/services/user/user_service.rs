use crate::{
    auth::JwtManager,
    dtos::{
        admin_dto::AdminStatsResponse,
        earning_dto::ReferralEarningResponse,
        user_dto::{AuthResponse, DashboardResponse, LoginDto, RegisterDto, UserResponse},
    },
    services::referral::DynReferralService,
};
use async_trait::async_trait;
use database::{
    user::{
        model::{User, UserQuery, UserUpdate},
        repository::DynUserRepository,
    },
    video::repository::DynVideoRepository,
    withdrawal::{model::WithdrawalStatus, repository::DynWithdrawalRepository},
};
use mongodb::bson::oid::ObjectId;
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};
use utils::{hash_password, verify_password, AppError, AppResult};

const REFERRAL_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_CODE_LENGTH: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 10;

pub type DynUserService = Arc<dyn UserServiceTrait + Send + Sync>;

#[async_trait]
pub trait UserServiceTrait {
    async fn register(&self, request: RegisterDto) -> AppResult<AuthResponse>;

    async fn login(&self, request: LoginDto) -> AppResult<AuthResponse>;

    async fn get_user(&self, id: &ObjectId) -> AppResult<User>;

    async fn dashboard(&self, id: &ObjectId) -> AppResult<DashboardResponse>;

    async fn referrals(&self, id: &ObjectId) -> AppResult<Vec<User>>;

    async fn list_users(&self, query: UserQuery) -> AppResult<(Vec<User>, u64)>;

    async fn update_user(&self, id: &ObjectId, update: UserUpdate) -> AppResult<User>;

    async fn delete_user(&self, id: &ObjectId, acting_admin: &ObjectId) -> AppResult<()>;

    async fn stats(&self) -> AppResult<AdminStatsResponse>;
}

#[derive(Clone)]
pub struct UserService {
    users: DynUserRepository,
    videos: DynVideoRepository,
    withdrawals: DynWithdrawalRepository,
    referral: DynReferralService,
    jwt: Arc<JwtManager>,
}

/// 生成8位大写字母数字推荐码
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LENGTH)
        .map(|_| REFERRAL_CODE_CHARSET[rng.gen_range(0..REFERRAL_CODE_CHARSET.len())] as char)
        .collect()
}

impl UserService {
    pub fn new(
        users: DynUserRepository,
        videos: DynVideoRepository,
        withdrawals: DynWithdrawalRepository,
        referral: DynReferralService,
        jwt: Arc<JwtManager>,
    ) -> Self {
        Self {
            users,
            videos,
            withdrawals,
            referral,
            jwt,
        }
    }

    async fn unique_referral_code(&self) -> AppResult<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if !self.users.referral_code_exists(&code).await? {
                return Ok(code);
            }
            warn!("🔁 推荐码 {} 已存在，重新生成", code);
        }

        Err(AppError::InternalServerErrorWithContext(
            "Failed to generate a unique referral code".to_string(),
        ))
    }

    fn auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let id = user
            .id
            .ok_or_else(|| AppError::InternalServerErrorWithContext("User has no id".to_string()))?;
        let token = self.jwt.generate_token(&id, user.role)?;

        Ok(AuthResponse {
            token,
            expires_in: self.jwt.expires_in_seconds(),
            user: UserResponse::from(user),
        })
    }
}

#[async_trait]
impl UserServiceTrait for UserService {
    async fn register(&self, request: RegisterDto) -> AppResult<AuthResponse> {
        if self.users.get_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("User already exists with this email.".to_string()));
        }

        let referred_by = match request.referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let referrer = self
                    .users
                    .get_user_by_referral_code(code)
                    .await?
                    .ok_or_else(|| AppError::BadRequest("Invalid referral code.".to_string()))?;
                referrer.id
            }
            None => None,
        };

        let referral_code = self.unique_referral_code().await?;
        let password_hash = hash_password(&request.password)?;
        let user = User::new(&request.email, password_hash, &request.full_name, referral_code, referred_by);

        let user = self.users.create_user(user).await?;
        info!(
            "🎉 用户注册成功: {} (推荐码 {}, 推荐人 {:?})",
            user.email, user.referral_code, user.referred_by
        );

        self.auth_response(user)
    }

    async fn login(&self, request: LoginDto) -> AppResult<AuthResponse> {
        let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

        let user = self.users.get_user_by_email(&request.email).await?.ok_or_else(invalid)?;
        if !verify_password(&user.password, &request.password) {
            warn!("🔒 登录失败: {}", user.email);
            return Err(invalid());
        }

        info!("🔑 用户登录: {}", user.email);
        self.auth_response(user)
    }

    async fn get_user(&self, id: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", id)))
    }

    async fn dashboard(&self, id: &ObjectId) -> AppResult<DashboardResponse> {
        let user = self.get_user(id).await?;
        let referees = self.users.list_referees(id).await?;
        let multilevel = self.referral.get_or_calculate(id).await?;
        let available_videos = self.videos.count_videos(true).await?;

        let pending: Vec<_> = self
            .withdrawals
            .list_by_user(id)
            .await?
            .into_iter()
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .collect();

        Ok(DashboardResponse {
            points: user.points,
            earnings: user.earnings,
            videos_watched: user.videos_watched.len(),
            available_videos,
            direct_referrals: referees.len(),
            active_referrals: referees.iter().filter(|u| u.is_active).count(),
            multilevel: ReferralEarningResponse::from(multilevel),
            pending_withdrawals: pending.len(),
            pending_withdrawal_amount: pending.iter().map(|w| w.amount).sum(),
            user: UserResponse::from(user),
        })
    }

    async fn referrals(&self, id: &ObjectId) -> AppResult<Vec<User>> {
        self.get_user(id).await?;
        self.users.list_referees(id).await
    }

    async fn list_users(&self, query: UserQuery) -> AppResult<(Vec<User>, u64)> {
        self.users.list_users(&query).await
    }

    async fn update_user(&self, id: &ObjectId, update: UserUpdate) -> AppResult<User> {
        if update.is_empty() {
            return Err(AppError::BadRequest("No fields to update.".to_string()));
        }

        let user = self
            .users
            .update_user(id, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", id)))?;

        info!("🛠️ 管理员更新用户 {}: {:?}", user.email, update);
        Ok(user)
    }

    async fn delete_user(&self, id: &ObjectId, acting_admin: &ObjectId) -> AppResult<()> {
        if id == acting_admin {
            return Err(AppError::BadRequest("You cannot delete your own account.".to_string()));
        }

        if !self.users.delete_user(id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found.", id)));
        }

        self.referral.remove_user(id).await?;
        Ok(())
    }

    async fn stats(&self) -> AppResult<AdminStatsResponse> {
        Ok(AdminStatsResponse {
            users: self.users.user_stats().await?,
            total_videos: self.videos.count_videos(false).await?,
            active_videos: self.videos.count_videos(true).await?,
            withdrawals: self.withdrawals.withdrawal_stats().await?,
        })
    }
}
