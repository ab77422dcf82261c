use crate::auth::models::{AuthConfig, AuthUser, Claims};
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use database::user::model::UserRole;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;

const ISSUER: &str = "rewards-api";

/// JWT令牌管理器
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: AuthConfig,
}

impl JwtManager {
    /// 创建新的JWT管理器
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_ref());

        Self {
            encoding_key,
            decoding_key,
            config,
        }
    }

    /// 令牌有效期（秒）
    pub fn expires_in_seconds(&self) -> u64 {
        self.config.jwt_expires_in_hours * 3600
    }

    /// 生成JWT令牌
    pub fn generate_token(&self, user_id: &ObjectId, role: UserRole) -> Result<String> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.jwt_expires_in_hours as i64);

        let claims = Claims {
            sub: user_id.to_hex(),
            role,
            exp: expires_at.timestamp() as u64,
            iat: now.timestamp() as u64,
            iss: ISSUER.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| anyhow!("Failed to generate JWT token: {}", e))
    }

    /// 验证JWT令牌
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| anyhow!("Invalid JWT token: {}", e))?;

        // 检查令牌是否过期
        let now = Utc::now().timestamp() as u64;
        if token_data.claims.exp < now {
            return Err(anyhow!("JWT token has expired"));
        }

        Ok(token_data.claims)
    }

    /// 验证令牌并转换为AuthUser
    pub fn authenticate(&self, token: &str) -> Result<AuthUser> {
        let claims = self.verify_token(token)?;
        let user_id = ObjectId::parse_str(&claims.sub).map_err(|e| anyhow!("Invalid subject in token: {}", e))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}

/// JWT令牌提取器
pub struct TokenExtractor;

impl TokenExtractor {
    /// 从Authorization头部提取Bearer令牌
    pub fn extract_bearer_token(auth_header: Option<&str>) -> Option<String> {
        auth_header
            .and_then(|header| header.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}
