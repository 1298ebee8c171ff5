//! 密码哈希
//!
//! bcrypt 计算较慢，在阻塞线程池中执行，避免占用异步工作线程。

use crate::error::{LoyaltyError, Result};

/// bcrypt 只使用前 72 字节
pub const MAX_PASSWORD_BYTES: usize = 72;

pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| LoyaltyError::Internal(format!("密码哈希任务失败: {}", e)))?
        .map_err(|e| LoyaltyError::Internal(format!("密码哈希失败: {}", e)))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| LoyaltyError::Internal(format!("密码校验任务失败: {}", e)))?
        .map_err(|e| LoyaltyError::Internal(format!("密码校验失败: {}", e)))
}
