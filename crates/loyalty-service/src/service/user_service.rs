//! 用户服务：注册与登录

use std::sync::Arc;

use tracing::{info, instrument};
use validator::Validate;

use super::dto::CredentialsRequest;
use crate::auth::{MAX_PASSWORD_BYTES, hash_password, verify_password};
use crate::error::{LoyaltyError, Result};
use crate::models::User;
use crate::repository::UserRepositoryTrait;

pub struct UserService {
    repo: Arc<dyn UserRepositoryTrait>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepositoryTrait>, bcrypt_cost: u32) -> Self {
        Self { repo, bcrypt_cost }
    }

    /// 注册新用户，登录名已存在时返回 `LoginTaken`
    #[instrument(skip(self, request), fields(login = %request.login))]
    pub async fn register(&self, request: &CredentialsRequest) -> Result<User> {
        validate_credentials(request)?;

        let hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = self.repo.create(&request.login, &hash).await?;

        info!(user_id = %user.id, "用户注册成功");
        Ok(user)
    }

    /// 校验登录凭证
    ///
    /// 用户不存在与密码错误返回同一个错误。
    #[instrument(skip(self, request), fields(login = %request.login))]
    pub async fn authenticate(&self, request: &CredentialsRequest) -> Result<User> {
        validate_credentials(request)?;

        let user = self
            .repo
            .get_by_login(&request.login)
            .await?
            .ok_or(LoyaltyError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash).await? {
            return Err(LoyaltyError::InvalidCredentials);
        }

        Ok(user)
    }
}

fn validate_credentials(request: &CredentialsRequest) -> Result<()> {
    request.validate()?;
    if request.password.len() > MAX_PASSWORD_BYTES {
        return Err(LoyaltyError::Validation(format!(
            "密码不能超过 {} 字节",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}
