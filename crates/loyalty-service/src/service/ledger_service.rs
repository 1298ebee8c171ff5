//! 积分账本服务
//!
//! 余额始终由订单实时汇总。提现的余额检查与写入在仓储内部
//! 同一把用户级锁下完成，见 [`OrderRepositoryTrait::withdraw`]。

use std::sync::Arc;

use chrono::Utc;
use loyalty_shared::observability::metrics;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{ownership_conflict, resolve_duplicate};
use crate::error::{LoyaltyError, Result};
use crate::models::{Balance, Order, order_number};
use crate::repository::OrderRepositoryTrait;

/// 金额最多两位小数
const MAX_SUM_SCALE: u32 = 2;

pub struct LedgerService {
    repo: Arc<dyn OrderRepositoryTrait>,
}

impl LedgerService {
    pub fn new(repo: Arc<dyn OrderRepositoryTrait>) -> Self {
        Self { repo }
    }

    /// 当前余额；没有订单时返回零
    pub async fn balance(&self, user_id: Uuid) -> Result<Balance> {
        self.repo.sum_by_user(user_id).await
    }

    /// 提现
    #[instrument(skip(self))]
    pub async fn withdraw(&self, user_id: Uuid, number: &str, sum: Decimal) -> Result<Order> {
        validate_sum(sum)?;

        let number = number.trim();
        if !order_number::is_valid(number) {
            metrics::record_withdrawal("invalid");
            return Err(LoyaltyError::InvalidOrderNumber(number.to_string()));
        }

        // 订单号与补充订单共享唯一性空间
        if let Some(existing) = self.repo.get(number).await? {
            metrics::record_withdrawal("conflict");
            return Err(ownership_conflict(&existing, user_id));
        }

        match self.repo.withdraw(user_id, number, sum, Utc::now()).await {
            Ok(order) => {
                metrics::record_withdrawal("ok");
                info!(%sum, "提现成功");
                Ok(order)
            }
            Err(LoyaltyError::DuplicateOrder(_)) => {
                metrics::record_withdrawal("conflict");
                Err(resolve_duplicate(self.repo.as_ref(), number, user_id).await?)
            }
            Err(e @ LoyaltyError::InsufficientFunds { .. }) => {
                metrics::record_withdrawal("insufficient_funds");
                warn!(error = %e, "提现被拒绝");
                Err(e)
            }
            Err(e) => {
                metrics::record_withdrawal("error");
                Err(e)
            }
        }
    }

    /// 提现记录，最新的在前
    pub async fn withdrawals(&self, user_id: Uuid) -> Result<Vec<Order>> {
        self.repo.list_withdrawals(user_id).await
    }
}

fn validate_sum(sum: Decimal) -> Result<()> {
    if sum <= Decimal::ZERO {
        metrics::record_withdrawal("invalid");
        return Err(LoyaltyError::InvalidAmount(format!("提现金额必须为正数: {}", sum)));
    }
    if sum.normalize().scale() > MAX_SUM_SCALE {
        metrics::record_withdrawal("invalid");
        return Err(LoyaltyError::InvalidAmount(format!(
            "提现金额最多两位小数: {}",
            sum
        )));
    }
    Ok(())
}
