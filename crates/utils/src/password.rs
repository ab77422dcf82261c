use crate::{AppError, AppResult};
use rand::RngCore;

/// 使用 argon2 对密码进行哈希，返回 PHC 编码字符串
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())
        .map_err(|e| AppError::InternalServerErrorWithContext(format!("Failed to hash password: {}", e)))
}

/// 校验密码；哈希格式错误视为校验失败
pub fn verify_password(hash: &str, password: &str) -> bool {
    argon2::verify_encoded(hash, password.as_bytes()).unwrap_or(false)
}
