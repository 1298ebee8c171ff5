//! 内存仓储
//!
//! 使用 DashMap 实现，契约与 PostgreSQL 仓储一致，适用于测试和本地开发。
//! 提现的用户级互斥由 [`KeyedLocks`] 提供。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::USER_LIST_LIMIT;
use super::traits::{OrderRepositoryTrait, UserRepositoryTrait};
use crate::error::{LoyaltyError, Result};
use crate::lock::{KeyedLocks, LockKey};
use crate::models::{Balance, Order, OrderStatus, OrderType, User};

/// 内存订单仓储
#[derive(Clone, Default)]
pub struct MemoryOrderRepository {
    orders: Arc<DashMap<String, Order>>,
    locks: Arc<KeyedLocks>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入订单（覆盖同号订单），用于准备测试数据
    pub fn insert(&self, order: Order) {
        self.orders.insert(order.number.clone(), order);
    }

    pub fn count(&self) -> usize {
        self.orders.len()
    }

    fn insert_new(&self, order: &Order) -> Result<()> {
        match self.orders.entry(order.number.clone()) {
            Entry::Occupied(_) => Err(LoyaltyError::DuplicateOrder(order.number.clone())),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(())
            }
        }
    }

    fn collect_sorted<F>(&self, predicate: F) -> Vec<Order>
    where
        F: Fn(&Order) -> bool,
    {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.number.cmp(&b.number))
        });
        orders
    }

    fn balance_of(&self, user_id: Uuid) -> Balance {
        let amounts: Vec<Decimal> = self
            .orders
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().amount)
            .collect();
        Balance::from_amounts(&amounts)
    }
}

#[async_trait]
impl OrderRepositoryTrait for MemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        self.insert_new(order)
    }

    async fn get(&self, number: &str) -> Result<Option<Order>> {
        Ok(self.orders.get(number).map(|entry| entry.value().clone()))
    }

    async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        Ok(self
            .collect_sorted(|o| o.status == status)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders = self
            .collect_sorted(|o| o.user_id == user_id && o.order_type == OrderType::Replenishment);
        orders.truncate(USER_LIST_LIMIT as usize);
        Ok(orders)
    }

    async fn list_withdrawals(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let mut orders =
            self.collect_sorted(|o| o.user_id == user_id && o.order_type == OrderType::Withdrawal);
        orders.reverse();
        orders.truncate(USER_LIST_LIMIT as usize);
        Ok(orders)
    }

    async fn update(
        &self,
        number: &str,
        status: OrderStatus,
        amount: Option<Decimal>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut entry = self
            .orders
            .get_mut(number)
            .ok_or_else(|| LoyaltyError::OrderNotFound(number.to_string()))?;

        let order = entry.value_mut();
        if order.status.is_terminal() {
            return Ok(false);
        }

        order.status = status;
        order.amount = amount.unwrap_or(Decimal::ZERO);
        order.updated_at = Some(updated_at);
        Ok(true)
    }

    async fn sum_by_user(&self, user_id: Uuid) -> Result<Balance> {
        Ok(self.balance_of(user_id))
    }

    async fn withdraw(
        &self,
        user_id: Uuid,
        number: &str,
        sum: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Order> {
        let _guard = self.locks.lock(LockKey::withdrawal(user_id)).await;

        let available = self.balance_of(user_id).spendable();
        if available < sum {
            return Err(LoyaltyError::InsufficientFunds {
                requested: sum,
                available,
            });
        }

        // 检查与写入之间让出调度点
        tokio::task::yield_now().await;

        let order = Order::withdrawal(number, user_id, sum, created_at);
        self.insert_new(&order)?;
        Ok(order)
    }
}

/// 内存用户仓储
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<DashMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepositoryTrait for MemoryUserRepository {
    async fn create(&self, login: &str, password_hash: &str) -> Result<User> {
        match self.users.entry(login.to_string()) {
            Entry::Occupied(_) => Err(LoyaltyError::LoginTaken(login.to_string())),
            Entry::Vacant(slot) => {
                let user = User {
                    id: Uuid::now_v7(),
                    login: login.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn get_by_login(&self, login: &str) -> Result<Option<User>> {
        Ok(self.users.get(login).map(|entry| entry.value().clone()))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn processed(number: &str, user_id: Uuid, amount: Decimal) -> Order {
        let mut order = Order::replenishment(number, user_id, Utc::now());
        order.status = OrderStatus::Processed;
        order.amount = amount;
        order
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let repo = MemoryOrderRepository::new();
        let order = Order::replenishment("79927398713", Uuid::new_v4(), Utc::now());

        repo.create(&order).await.unwrap();
        let err = repo.create(&order).await.unwrap_err();
        assert!(matches!(err, LoyaltyError::DuplicateOrder(n) if n == "79927398713"));
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let repo = MemoryOrderRepository::new();
        let err = repo
            .update("79927398713", OrderStatus::Processed, None, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_update_never_leaves_terminal_state() {
        let repo = MemoryOrderRepository::new();
        let user = Uuid::new_v4();
        repo.insert(processed("79927398713", user, dec!(500)));

        let applied = repo
            .update("79927398713", OrderStatus::Processing, None, Utc::now())
            .await
            .unwrap();

        assert!(!applied);
        let order = repo.get("79927398713").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.amount, dec!(500));
    }

    #[tokio::test]
    async fn test_update_without_amount_zeroes_it() {
        let repo = MemoryOrderRepository::new();
        let mut order = Order::replenishment("79927398713", Uuid::new_v4(), Utc::now());
        order.amount = dec!(7);
        repo.insert(order);

        repo.update("79927398713", OrderStatus::Invalid, None, Utc::now())
            .await
            .unwrap();

        let order = repo.get("79927398713").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Invalid);
        assert_eq!(order.amount, Decimal::ZERO);
        assert!(order.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_withdraw_checks_balance() {
        let repo = MemoryOrderRepository::new();
        let user = Uuid::new_v4();
        repo.insert(processed("79927398713", user, dec!(300)));

        let order = repo
            .withdraw(user, "2377225624", dec!(200), Utc::now())
            .await
            .unwrap();
        assert_eq!(order.amount, dec!(-200));

        let err = repo
            .withdraw(user, "12345678903", dec!(200), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LoyaltyError::InsufficientFunds { requested, available }
                if requested == dec!(200) && available == dec!(100)
        ));
        assert_eq!(repo.count(), 2);
    }

    #[tokio::test]
    async fn test_list_withdrawals_newest_first() {
        let repo = MemoryOrderRepository::new();
        let user = Uuid::new_v4();
        let t0 = Utc::now();
        repo.insert(Order::withdrawal("2377225624", user, dec!(1), t0));
        repo.insert(Order::withdrawal("12345678903", user, dec!(2), t0 + chrono::Duration::seconds(5)));
        repo.insert(processed("79927398713", user, dec!(10)));

        let withdrawals = repo.list_withdrawals(user).await.unwrap();
        let numbers: Vec<_> = withdrawals.iter().map(|o| o.number.as_str()).collect();
        assert_eq!(numbers, vec!["12345678903", "2377225624"]);
    }

    #[tokio::test]
    async fn test_user_repository_unique_login() {
        let repo = MemoryUserRepository::new();
        let user = repo.create("alice", "hash").await.unwrap();

        assert!(matches!(
            repo.create("alice", "other").await.unwrap_err(),
            LoyaltyError::LoginTaken(_)
        ));
        assert_eq!(repo.get_by_id(user.id).await.unwrap().unwrap().login, "alice");
        assert!(repo.get_by_login("bob").await.unwrap().is_none());
    }
}
