use chrono::{DateTime, Utc};
use database::user::model::{PaymentStatus, User, UserQuery, UserRole, UserUpdate, MAX_PAGE};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::earning_dto::ReferralEarningResponse;

/// 注册请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDto {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Full name is required"))]
    pub full_name: String,

    /// 推荐人的推荐码（可选）
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// 登录请求
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
pub struct LoginDto {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// 观看记录
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoWatchResponse {
    pub video_id: String,
    pub watched_at: DateTime<Utc>,
}

/// 对外暴露的用户信息（不含密码）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub is_active: bool,
    pub points: i64,
    pub earnings: i64,
    pub videos_watched: Vec<VideoWatchResponse>,
    pub role: UserRole,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id_hex(),
            email: user.email,
            full_name: user.full_name,
            referral_code: user.referral_code,
            referred_by: user.referred_by.map(|id| id.to_hex()),
            is_active: user.is_active,
            points: user.points,
            earnings: user.earnings,
            videos_watched: user
                .videos_watched
                .into_iter()
                .map(|watch| VideoWatchResponse {
                    video_id: watch.video_id.to_hex(),
                    watched_at: watch.watched_at,
                })
                .collect(),
            role: user.role,
            payment_status: user.payment_status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// 登录/注册成功后的响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// 令牌有效期（秒）
    pub expires_in: u64,
    pub user: UserResponse,
}

/// 直接下级（只保留公开字段）
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
    pub payment_status: PaymentStatus,
    pub joined_at: DateTime<Utc>,
}

impl From<User> for ReferralResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id_hex(),
            full_name: user.full_name,
            email: user.email,
            is_active: user.is_active,
            payment_status: user.payment_status,
            joined_at: user.created_at,
        }
    }
}

/// 用户面板
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub user: UserResponse,
    pub points: i64,
    pub earnings: i64,
    pub videos_watched: usize,
    pub available_videos: u64,
    pub direct_referrals: usize,
    pub active_referrals: usize,
    pub multilevel: ReferralEarningResponse,
    pub pending_withdrawals: usize,
    pub pending_withdrawal_amount: i64,
}

/// 管理员编辑用户
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateUserDto {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    #[validate(range(min = 0))]
    pub points: Option<i64>,
    #[validate(range(min = 0))]
    pub earnings: Option<i64>,
    pub role: Option<UserRole>,
    pub payment_status: Option<PaymentStatus>,
}

impl From<AdminUpdateUserDto> for UserUpdate {
    fn from(dto: AdminUpdateUserDto) -> Self {
        Self {
            full_name: dto.full_name,
            is_active: dto.is_active,
            points: dto.points,
            earnings: dto.earnings,
            role: dto.role,
            payment_status: dto.payment_status,
        }
    }
}

/// 用户列表查询参数
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// 页码，从1开始
    pub page: Option<u64>,
    /// 每页数量，最大100
    pub limit: Option<u64>,
    /// 按邮箱或姓名搜索
    pub search: Option<String>,
}

impl From<UserListQuery> for UserQuery {
    fn from(query: UserListQuery) -> Self {
        let defaults = UserQuery::default();
        Self {
            page: query
                .page
                .filter(|p| *p > 0)
                .map(|p| p.min(MAX_PAGE))
                .unwrap_or(defaults.page),
            limit: query.limit.map(|l| l.clamp(1, 100)).unwrap_or(defaults.limit),
            search: query.search,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}
