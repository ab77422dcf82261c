use crate::serde_helpers::{flexible_datetime, serialize_i64_as_number};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 用户角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// 激活费支付状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

/// 观看记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoWatch {
    pub video_id: ObjectId,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub watched_at: DateTime<Utc>,
}

/// 用户模型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// MongoDB文档ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// 登录邮箱（唯一，小写存储）
    pub email: String,
    /// argon2 哈希后的密码
    pub password: String,
    pub full_name: String,
    /// 推荐码，创建时生成且不再变更
    pub referral_code: String,
    /// 直接推荐人
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<ObjectId>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub points: i64,
    /// 可提现余额
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub earnings: i64,
    #[serde(default)]
    pub videos_watched: Vec<VideoWatch>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// 激活该账户的支付交易id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_transaction: Option<String>,
    /// 已入账的一次性款项（推荐奖励、提现退款）
    #[serde(default)]
    pub credit_references: Vec<String>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// 注册时创建的新用户：未激活、待支付、零余额
    pub fn new(
        email: &str,
        password_hash: String,
        full_name: &str,
        referral_code: String,
        referred_by: Option<ObjectId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            email: email.trim().to_lowercase(),
            password: password_hash,
            full_name: full_name.trim().to_string(),
            referral_code,
            referred_by,
            is_active: false,
            points: 0,
            earnings: 0,
            videos_watched: Vec::new(),
            role: UserRole::User,
            payment_status: PaymentStatus::Pending,
            activation_transaction: None,
            credit_references: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn has_watched(&self, video_id: &ObjectId) -> bool {
        self.videos_watched.iter().any(|w| &w.video_id == video_id)
    }

    pub fn has_credit(&self, reference: &str) -> bool {
        self.credit_references.iter().any(|r| r == reference)
    }

    /// 文档ID的十六进制形式，未入库时为空串
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// 直接推荐奖励的入账凭据
pub fn referral_bonus_reference(referee: &ObjectId) -> String {
    format!("referral:{}", referee.to_hex())
}

/// 提现驳回退款的入账凭据
pub fn withdrawal_refund_reference(withdrawal: &ObjectId) -> String {
    format!("refund:{}", withdrawal.to_hex())
}

/// 推荐关系图中的一个节点（只投影需要的字段）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralNode {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub referred_by: Option<ObjectId>,
    #[serde(default)]
    pub is_active: bool,
}

/// 管理员可编辑的用户字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub points: Option<i64>,
    pub earnings: Option<i64>,
    pub role: Option<UserRole>,
    pub payment_status: Option<PaymentStatus>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self == &UserUpdate::default()
    }

    /// 生成 `$set` 内容
    pub fn to_set_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(full_name) = &self.full_name {
            set.insert("fullName", full_name.trim());
        }
        if let Some(is_active) = self.is_active {
            set.insert("isActive", is_active);
        }
        if let Some(points) = self.points {
            set.insert("points", Bson::Int64(points));
        }
        if let Some(earnings) = self.earnings {
            set.insert("earnings", Bson::Int64(earnings));
        }
        if let Some(role) = self.role {
            set.insert("role", role.as_str());
        }
        if let Some(payment_status) = self.payment_status {
            set.insert("paymentStatus", payment_status.as_str());
        }
        set
    }

    /// 将变更应用到内存中的用户
    pub fn apply(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
        if let Some(points) = self.points {
            user.points = points;
        }
        if let Some(earnings) = self.earnings {
            user.earnings = earnings;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(payment_status) = self.payment_status {
            user.payment_status = payment_status;
        }
        user.updated_at = Utc::now();
    }
}

/// 允许的最大页码
pub const MAX_PAGE: u64 = 100_000;

/// 用户列表查询条件
#[derive(Debug, Clone)]
pub struct UserQuery {
    pub page: u64,
    pub limit: u64,
    /// 按邮箱或姓名模糊搜索
    pub search: Option<String>,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            search: None,
        }
    }
}

impl UserQuery {
    pub fn skip(&self) -> u64 {
        self.page.min(MAX_PAGE).saturating_sub(1).saturating_mul(self.limit)
    }

    pub fn filter(&self) -> Document {
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                let pattern = escape_regex(search);
                doc! {
                    "$or": [
                        { "email": { "$regex": &pattern, "$options": "i" } },
                        { "fullName": { "$regex": &pattern, "$options": "i" } },
                    ]
                }
            }
            None => doc! {},
        }
    }

    /// 内存过滤，与 `filter()` 语义一致
    pub fn matches(&self, user: &User) -> bool {
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                let needle = search.to_lowercase();
                user.email.to_lowercase().contains(&needle) || user.full_name.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 用户汇总统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: u64,
    pub active_users: u64,
    pub total_points: i64,
    pub total_earnings: i64,
}
