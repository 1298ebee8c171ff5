//! 订单服务

use std::sync::Arc;

use chrono::Utc;
use loyalty_shared::observability::metrics;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{ownership_conflict, resolve_duplicate};
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, order_number};
use crate::pipeline::NewOrderSignal;
use crate::repository::OrderRepositoryTrait;

/// 订单服务
///
/// 新订单写入后触发对账信号；信号合并且不阻塞，请求不会等待对账。
pub struct OrderService {
    repo: Arc<dyn OrderRepositoryTrait>,
    signal: NewOrderSignal,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepositoryTrait>, signal: NewOrderSignal) -> Self {
        Self { repo, signal }
    }

    /// 上传订单号
    ///
    /// 订单号已存在时按归属返回 `OrderOwnedByCurrentUser` 或 `OrderOwnedByAnotherUser`。
    #[instrument(skip(self))]
    pub async fn upload(&self, user_id: Uuid, number: &str) -> Result<Order> {
        let number = number.trim();
        if number.is_empty() {
            return Err(LoyaltyError::Validation("订单号不能为空".to_string()));
        }
        if !order_number::is_valid(number) {
            metrics::record_order_upload("invalid");
            return Err(LoyaltyError::InvalidOrderNumber(number.to_string()));
        }

        if let Some(existing) = self.repo.get(number).await? {
            metrics::record_order_upload("conflict");
            return Err(ownership_conflict(&existing, user_id));
        }

        let order = Order::replenishment(number, user_id, Utc::now());
        match self.repo.create(&order).await {
            Ok(()) => {}
            Err(LoyaltyError::DuplicateOrder(_)) => {
                metrics::record_order_upload("conflict");
                return Err(resolve_duplicate(self.repo.as_ref(), number, user_id).await?);
            }
            Err(e) => return Err(e),
        }

        self.signal.raise();
        metrics::record_order_upload("accepted");
        info!(number = %order.number, "订单已受理");
        Ok(order)
    }

    /// 用户上传的订单（不含提现），按上传时间升序
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.repo.list_by_user(user_id).await
    }
}
