use database::user::model::UserRole;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utils::AppConfig;

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户ID（ObjectId十六进制）
    pub sub: String,
    /// 签发时的角色
    pub role: UserRole,
    /// 过期时间
    pub exp: u64,
    /// 签发时间
    pub iat: u64,
    /// 签发者
    pub iss: String,
}

/// 认证用户信息，由认证中间件放入请求扩展
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 认证配置
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expires_in_hours: u64,
}

impl From<&AppConfig> for AuthConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            jwt_expires_in_hours: config.jwt_expires_in_hours,
        }
    }
}
