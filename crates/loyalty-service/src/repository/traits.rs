//! 仓储 Trait 定义

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Balance, Order, OrderStatus, User};

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 写入新订单，订单号已存在时返回 `DuplicateOrder`
    async fn create(&self, order: &Order) -> Result<()>;

    async fn get(&self, number: &str) -> Result<Option<Order>>;

    /// 按状态分页查询，按创建时间升序
    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>>;

    /// 用户上传的订单（不含提现），按创建时间升序，最多 200 条
    ///
    /// 提现在截断之前就被排除，不会挤占名额。
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>>;

    /// 用户提现订单，按创建时间倒序，最多 200 条
    async fn list_withdrawals(&self, user_id: Uuid) -> Result<Vec<Order>>;

    /// 更新状态与金额，amount 为 None 时金额置 0
    ///
    /// 订单不存在返回 `OrderNotFound`；已处于终态的订单不会被修改，返回 false。
    async fn update(
        &self,
        number: &str,
        status: OrderStatus,
        amount: Option<Decimal>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// 一次读取中汇总正金额与负金额
    async fn sum_by_user(&self, user_id: Uuid) -> Result<Balance>;

    /// 在用户级锁内检查余额并写入提现订单
    ///
    /// 余额不足返回 `InsufficientFunds`，订单号冲突返回 `DuplicateOrder`，
    /// 任何失败都不会留下写入。
    async fn withdraw(
        &self,
        user_id: Uuid,
        number: &str,
        sum: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Order>;
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    /// 创建用户，登录名已存在时返回 `LoginTaken`
    async fn create(&self, login: &str, password_hash: &str) -> Result<User>;
    async fn get_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
