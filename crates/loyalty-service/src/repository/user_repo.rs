//! 用户仓储（PostgreSQL）

use async_trait::async_trait;
use chrono::Utc;
use loyalty_shared::error::is_unique_violation;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::UserRepositoryTrait;
use crate::error::{LoyaltyError, Result};
use crate::models::User;

/// 用户仓储
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, login: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, login, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, login, password_hash, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(login)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LoyaltyError::LoginTaken(login.to_string())
            } else {
                LoyaltyError::Database(e)
            }
        })?;

        Ok(user)
    }

    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, password_hash, created_at FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, login, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> Result<User> {
        self.create(login, password_hash).await
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        self.get_by_login(login).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.get_by_id(id).await
    }
}
