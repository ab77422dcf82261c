////////////////////////////////////////////////////////////////////////
//
// 1. 每个业务域单独一个文件夹，对外暴露 DynXxxService
// 2. Service 只依赖 database 中的 DynXxxRepository，便于替换存储实现
//
//////////////////////////////////////////////////////////////////////

pub mod media;
pub mod payment;
pub mod referral;
pub mod user;
pub mod video;
pub mod withdrawal;

#[cfg(test)]
pub mod test_support;

use crate::auth::{AuthConfig, JwtManager};
use database::{
    payment::repository::DynPaymentTransactionRepository, referral_earning::repository::DynReferralEarningRepository,
    user::repository::DynUserRepository, video::repository::DynVideoRepository,
    withdrawal::repository::DynWithdrawalRepository, Database,
};
use media::{CloudinaryClient, DynMediaStorage};
use payment::{DynPaymentGateway, DynPaymentService, FlutterwaveClient, PaymentService, PaymentSettings};
use referral::{DynReferralService, LevelPayouts, ReferralService};
use std::sync::Arc;
use tracing::info;
use user::{DynUserService, UserService};
use utils::AppConfig;
use video::{DynVideoService, VideoService};
use withdrawal::{DynWithdrawalService, WithdrawalService};

/// 所有仓储的句柄
#[derive(Clone)]
pub struct Repositories {
    pub users: DynUserRepository,
    pub videos: DynVideoRepository,
    pub withdrawals: DynWithdrawalRepository,
    pub earnings: DynReferralEarningRepository,
    pub transactions: DynPaymentTransactionRepository,
}

impl Repositories {
    pub fn from_database(db: Database) -> Self {
        let database = Arc::new(db);

        Self {
            users: database.clone() as DynUserRepository,
            videos: database.clone() as DynVideoRepository,
            withdrawals: database.clone() as DynWithdrawalRepository,
            earnings: database.clone() as DynReferralEarningRepository,
            transactions: database as DynPaymentTransactionRepository,
        }
    }
}

#[derive(Clone)]
pub struct Services {
    pub user: DynUserService,
    pub video: DynVideoService,
    pub withdrawal: DynWithdrawalService,
    pub payment: DynPaymentService,
    pub referral: DynReferralService,
    pub media: DynMediaStorage,
    pub jwt: Arc<JwtManager>,
}

impl Services {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let repositories = Repositories::from_database(db);
        let gateway = Arc::new(FlutterwaveClient::new(
            &config.flutterwave_base_url,
            &config.flutterwave_secret_key,
        )) as DynPaymentGateway;
        let media = Arc::new(CloudinaryClient::new(config)) as DynMediaStorage;
        let jwt = Arc::new(JwtManager::new(AuthConfig::from(config)));

        let services = Self::with_parts(repositories, gateway, media, config, jwt);
        info!("🧠 Services initialized");

        services
    }

    /// 由外部提供仓储与第三方客户端组装服务
    pub fn with_parts(
        repositories: Repositories,
        gateway: DynPaymentGateway,
        media: DynMediaStorage,
        config: &AppConfig,
        jwt: Arc<JwtManager>,
    ) -> Self {
        let Repositories {
            users,
            videos,
            withdrawals,
            earnings,
            transactions,
        } = repositories;

        let referral = Arc::new(ReferralService::new(
            users.clone(),
            earnings,
            LevelPayouts::from(config),
        )) as DynReferralService;

        let user = Arc::new(UserService::new(
            users.clone(),
            videos.clone(),
            withdrawals.clone(),
            referral.clone(),
            jwt.clone(),
        )) as DynUserService;

        let video = Arc::new(VideoService::new(videos, users.clone(), media.clone())) as DynVideoService;

        let withdrawal = Arc::new(WithdrawalService::new(
            withdrawals,
            users.clone(),
            config.min_withdrawal_amount,
        )) as DynWithdrawalService;

        let payment = Arc::new(PaymentService::new(
            users,
            transactions,
            gateway,
            referral.clone(),
            PaymentSettings::from(config),
        )) as DynPaymentService;

        Self {
            user,
            video,
            withdrawal,
            payment,
            referral,
            media,
            jwt,
        }
    }
}
