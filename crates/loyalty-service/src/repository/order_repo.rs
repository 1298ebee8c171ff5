//! 订单仓储（PostgreSQL）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loyalty_shared::error::is_unique_violation;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::USER_LIST_LIMIT;
use super::traits::OrderRepositoryTrait;
use crate::error::{LoyaltyError, Result};
use crate::lock::LockKey;
use crate::models::{Balance, Order, OrderStatus, OrderType};

const ORDER_COLUMNS: &str =
    "number, user_id, status, order_type, amount, created_at, updated_at";

/// 订单仓储
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 写入订单
    pub async fn create(&self, order: &Order) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::create_in_tx(&mut conn, order).await
    }

    /// 在事务中写入订单
    pub async fn create_in_tx(tx: &mut PgConnection, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (number, user_id, status, order_type, amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&order.number)
        .bind(order.user_id)
        .bind(order.status)
        .bind(order.order_type)
        .bind(order.amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LoyaltyError::DuplicateOrder(order.number.clone())
            } else {
                LoyaltyError::Database(e)
            }
        })?;

        Ok(())
    }

    pub async fn get(&self, number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE number = $1",
            ORDER_COLUMNS
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    pub async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE status = $1
            ORDER BY created_at ASC, number ASC
            LIMIT $2 OFFSET $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1 AND order_type = $2
            ORDER BY created_at ASC, number ASC
            LIMIT $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(OrderType::Replenishment)
        .bind(USER_LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    pub async fn list_withdrawals(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1 AND order_type = $2
            ORDER BY created_at DESC, number DESC
            LIMIT $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(OrderType::Withdrawal)
        .bind(USER_LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// 更新订单状态与金额
    ///
    /// 终态订单由 WHERE 条件排除，单行原子更新。
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        number: &str,
        status: OrderStatus,
        amount: Option<Decimal>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, amount = $3, updated_at = $4
            WHERE number = $1 AND status NOT IN ($5, $6)
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(amount.unwrap_or(Decimal::ZERO))
        .bind(updated_at)
        .bind(OrderStatus::Invalid)
        .bind(OrderStatus::Processed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // 区分订单不存在与已处于终态
        match self.get(number).await? {
            Some(order) => {
                debug!(current = %order.status, "订单已处于终态，忽略更新");
                Ok(false)
            }
            None => Err(LoyaltyError::OrderNotFound(number.to_string())),
        }
    }

    pub async fn sum_by_user(&self, user_id: Uuid) -> Result<Balance> {
        let mut conn = self.pool.acquire().await?;
        Self::sum_by_user_in_tx(&mut conn, user_id).await
    }

    /// 在事务中汇总用户余额
    pub async fn sum_by_user_in_tx(tx: &mut PgConnection, user_id: Uuid) -> Result<Balance> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(amount) FILTER (WHERE amount > 0), 0) AS current,
                COALESCE(-SUM(amount) FILTER (WHERE amount < 0), 0) AS withdrawn
            FROM orders
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(Balance::new(row.get("current"), row.get("withdrawn")))
    }

    /// 提现
    ///
    /// 事务内依次：获取 (提现, 用户) advisory lock -> 汇总余额 -> 写入提现订单 -> 提交。
    /// 任一步失败时事务回滚，锁随之释放。
    #[instrument(skip(self))]
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        number: &str,
        sum: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        LockKey::withdrawal(user_id).acquire_xact(&mut tx).await?;

        let available = Self::sum_by_user_in_tx(&mut tx, user_id).await?.spendable();
        if available < sum {
            tx.rollback().await?;
            return Err(LoyaltyError::InsufficientFunds {
                requested: sum,
                available,
            });
        }

        let order = Order::withdrawal(number, user_id, sum, created_at);
        Self::create_in_tx(&mut tx, &order).await?;

        tx.commit().await?;

        debug!(number, %sum, "提现订单已写入");
        Ok(order)
    }
}

#[async_trait]
impl OrderRepositoryTrait for OrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        self.create(order).await
    }

    async fn get(&self, number: &str) -> Result<Option<Order>> {
        self.get(number).await
    }

    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        self.list_by_status(status, limit, offset).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.list_by_user(user_id).await
    }

    async fn list_withdrawals(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.list_withdrawals(user_id).await
    }

    async fn update(
        &self,
        number: &str,
        status: OrderStatus,
        amount: Option<Decimal>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.update(number, status, amount, updated_at).await
    }

    async fn sum_by_user(&self, user_id: Uuid) -> Result<Balance> {
        self.sum_by_user(user_id).await
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        number: &str,
        sum: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Order> {
        self.withdraw(user_id, number, sum, created_at).await
    }
}
