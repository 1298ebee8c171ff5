//! 对账生产者
//!
//! 收到新订单信号后加载一批待对账订单，逐个通过交接队列交给消费者。
//! 收到停止信号后释放交接队列的发送端并退出，此后不再发出任何订单。
//!
//! 每种状态各有一个翻页偏移，批次逐页向后推进，读到不满一页时回到开头。
//! 计算系统长期不认识的订单因此不会一直占住批次。

use std::sync::Arc;

use loyalty_shared::config::PipelineConfig;
use loyalty_shared::observability::metrics;
use loyalty_shared::retry::{RetryPolicy, retry_with_policy};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::handoff::HandoffSender;
use super::signal::SignalListener;
use crate::error::{LoyaltyError, Result};
use crate::models::{Order, OrderStatus};
use crate::repository::OrderRepositoryTrait;

/// 单批次处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Continue,
    Stopped,
}

/// 按状态翻页的偏移
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PageCursor {
    offset: i64,
}

impl PageCursor {
    /// 满页继续向后，不满一页（包括空页）回到开头
    fn advance(&mut self, fetched: usize, limit: i64) {
        let fetched = fetched as i64;
        self.offset = if fetched < limit {
            0
        } else {
            self.offset + fetched
        };
    }
}

/// 对账生产者
pub struct ReconciliationProducer {
    repo: Arc<dyn OrderRepositoryTrait>,
    batch_limit: i64,
    repoll_processing: bool,
    retry: RetryPolicy,
    new_cursor: PageCursor,
    processing_cursor: PageCursor,
}

impl ReconciliationProducer {
    pub fn new(repo: Arc<dyn OrderRepositoryTrait>, config: &PipelineConfig) -> Self {
        Self {
            repo,
            batch_limit: config.batch_limit,
            repoll_processing: config.repoll_processing,
            retry: RetryPolicy::from(&config.fetch_retry),
            new_cursor: PageCursor::default(),
            processing_cursor: PageCursor::default(),
        }
    }

    /// 生产循环，直到收到停止信号或所有新订单信号端被释放
    pub async fn run(
        mut self,
        mut listener: SignalListener,
        mut shutdown: watch::Receiver<bool>,
        handoff: HandoffSender,
    ) {
        info!(batch_limit = self.batch_limit, "对账生产者已启动");

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("收到关闭信号，对账生产者退出");
                        break;
                    }
                }

                woke = listener.wait() => {
                    if woke.is_none() {
                        info!("新订单信号已全部释放，对账生产者退出");
                        break;
                    }
                    if self.dispatch_batch(&handoff, &mut shutdown).await == Dispatch::Stopped {
                        break;
                    }
                }
            }
        }

        drop(handoff);
        info!("对账生产者已停止，交接队列已关闭");
    }

    /// 加载一批待对账订单
    ///
    /// 先取 NEW，开启补充轮询时再用 PROCESSING 订单填满剩余名额。
    /// 终态订单不会被选中。
    pub async fn load_batch(&mut self) -> Result<Vec<Order>> {
        let limit = self.batch_limit;
        let mut batch = self
            .fetch(OrderStatus::New, limit, self.new_cursor.offset)
            .await?;
        self.new_cursor.advance(batch.len(), limit);

        let remaining = limit - batch.len() as i64;
        if self.repoll_processing && remaining > 0 {
            let offset = self.processing_cursor.offset;
            match self.fetch(OrderStatus::Processing, remaining, offset).await {
                Ok(processing) => {
                    self.processing_cursor.advance(processing.len(), remaining);
                    batch.extend(processing);
                }
                Err(e) => warn!(error = %e, "加载 PROCESSING 订单失败，本批次只处理 NEW 订单"),
            }
        }

        Ok(batch)
    }

    async fn fetch(&self, status: OrderStatus, limit: i64, offset: i64) -> Result<Vec<Order>> {
        retry_with_policy(
            &self.retry,
            "load_reconciliation_batch",
            LoyaltyError::is_retryable,
            || self.repo.list_by_status(status, limit, offset),
        )
        .await
    }

    async fn dispatch_batch(
        &mut self,
        handoff: &HandoffSender,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Dispatch {
        let batch = match self.load_batch().await {
            Ok(batch) => batch,
            Err(e) => {
                // 丢弃本批次，等待下一次触发
                error!(error = %e, "加载对账批次失败");
                return Dispatch::Continue;
            }
        };

        metrics::record_reconciliation_batch(batch.len());
        debug!(size = batch.len(), "已加载对账批次");

        for order in batch {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    info!("交接过程中收到关闭信号，放弃剩余订单");
                    return Dispatch::Stopped;
                }

                sent = handoff.send(order) => {
                    if let Err(e) = sent {
                        warn!(error = %e, "消费者已退出，停止生产");
                        return Dispatch::Stopped;
                    }
                }
            }
        }

        Dispatch::Continue
    }
}
