//! 对账消费者
//!
//! 从交接队列逐个取出订单，查询积分计算系统并回写状态。
//! 单个订单失败只记录日志，不影响后续订单；未更新的订单保持原状态，
//! 由后续批次重新选中。交接队列关闭且取空后退出。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loyalty_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use super::handoff::HandoffReceiver;
use crate::accrual::{AccrualLookup, AccrualOracle, AccrualStatus};
use crate::error::Result;
use crate::models::{Order, OrderStatus};
use crate::repository::OrderRepositoryTrait;

/// 单个订单的对账结果
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// 状态已回写
    Updated(OrderStatus),
    /// 未做任何修改（未登记、REGISTERED 或订单已处于终态）
    Unchanged,
    /// 计算系统要求限流
    Throttled(Duration),
}

/// 对账消费者
pub struct ReconciliationConsumer {
    repo: Arc<dyn OrderRepositoryTrait>,
    oracle: Arc<dyn AccrualOracle>,
    max_throttle_wait: Duration,
}

impl ReconciliationConsumer {
    pub fn new(
        repo: Arc<dyn OrderRepositoryTrait>,
        oracle: Arc<dyn AccrualOracle>,
        max_throttle_wait: Duration,
    ) -> Self {
        Self {
            repo,
            oracle,
            max_throttle_wait,
        }
    }

    /// 消费循环
    ///
    /// shutdown 只用于打断限流等待，队列中剩余的订单仍会处理完。
    pub async fn run(self, mut handoff: HandoffReceiver, mut shutdown: watch::Receiver<bool>) {
        info!("对账消费者已启动");

        while let Some(order) = handoff.recv().await {
            match self.reconcile(&order).await {
                Ok(ReconcileOutcome::Updated(status)) => {
                    metrics::record_reconciliation_order("updated");
                    info!(number = %order.number, %status, "订单状态已更新");
                }
                Ok(ReconcileOutcome::Unchanged) => {
                    metrics::record_reconciliation_order("unchanged");
                    debug!(number = %order.number, "订单状态未变化");
                }
                Ok(ReconcileOutcome::Throttled(wait)) => {
                    metrics::record_reconciliation_order("throttled");
                    let wait = wait.min(self.max_throttle_wait);
                    warn!(
                        number = %order.number,
                        wait_ms = wait.as_millis() as u64,
                        "计算系统限流，暂停消费"
                    );
                    if !*shutdown.borrow() {
                        tokio::select! {
                            _ = tokio::time::sleep(wait) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                }
                Err(e) => {
                    metrics::record_reconciliation_order("error");
                    error!(number = %order.number, error = %e, "订单对账失败");
                }
            }
        }

        info!("交接队列已关闭，对账消费者已停止");
    }

    /// 对单个订单执行一次对账
    #[instrument(skip(self, order), fields(number = %order.number))]
    pub async fn reconcile(&self, order: &Order) -> Result<ReconcileOutcome> {
        let info = match self.oracle.fetch_status(&order.number).await? {
            AccrualLookup::Known(info) => info,
            AccrualLookup::Unknown => return Ok(ReconcileOutcome::Unchanged),
            AccrualLookup::Throttled(wait) => return Ok(ReconcileOutcome::Throttled(wait)),
        };

        let Some(status) = info.status.to_order_status() else {
            debug!("订单已登记，尚未开始计算");
            return Ok(ReconcileOutcome::Unchanged);
        };

        if !order.status.can_transition_to(status) {
            warn!(current = %order.status, next = %status, "忽略非法的状态流转");
            return Ok(ReconcileOutcome::Unchanged);
        }

        // 只有 PROCESSED 携带积分，其余状态金额置 0
        let amount = match info.status {
            AccrualStatus::Processed => info.accrual,
            _ => None,
        };

        let applied = self
            .repo
            .update(&order.number, status, amount, Utc::now())
            .await?;

        if applied {
            Ok(ReconcileOutcome::Updated(status))
        } else {
            Ok(ReconcileOutcome::Unchanged)
        }
    }
}
