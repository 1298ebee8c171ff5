//! 订单对账流水线
//!
//! 结构：
//! - 上传订单后触发 [`NewOrderSignal`]（合并式、非阻塞）
//! - [`ReconciliationProducer`] 被唤醒后加载一批待对账订单
//! - 订单经会合式交接队列逐个交给 [`ReconciliationConsumer`]
//! - 消费者查询积分计算系统并回写订单状态
//!
//! 关闭顺序：发出停止信号 -> 生产者释放交接队列 -> 消费者取空后退出。

mod consumer;
mod handoff;
mod producer;
mod signal;

pub use consumer::{ReconcileOutcome, ReconciliationConsumer};
pub use handoff::{HandoffClosed, HandoffReceiver, HandoffSender, handoff};
pub use producer::ReconciliationProducer;
pub use signal::{NewOrderSignal, SignalListener, new_order_signal};

use std::sync::Arc;
use std::time::Duration;

use loyalty_shared::config::{AccrualConfig, PipelineConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::accrual::AccrualOracle;
use crate::repository::OrderRepositoryTrait;

/// 流水线入口
pub struct ReconciliationPipeline;

impl ReconciliationPipeline {
    /// 启动生产者、消费者以及可选的定时补扫任务
    ///
    /// 启动时立即触发一次信号，处理进程重启前遗留的 NEW 订单。
    pub fn spawn(
        repo: Arc<dyn OrderRepositoryTrait>,
        oracle: Arc<dyn AccrualOracle>,
        pipeline: &PipelineConfig,
        accrual: &AccrualConfig,
    ) -> PipelineHandle {
        let (signal, listener) = new_order_signal();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handoff_tx, handoff_rx) = handoff();

        let producer = ReconciliationProducer::new(repo.clone(), pipeline);
        let consumer = ReconciliationConsumer::new(
            repo,
            oracle,
            Duration::from_millis(accrual.max_throttle_wait_ms),
        );

        let producer_task = tokio::spawn(producer.run(listener, shutdown_rx.clone(), handoff_tx));
        let consumer_task = tokio::spawn(consumer.run(handoff_rx, shutdown_rx.clone()));

        let rescan_task = (pipeline.rescan_interval_secs > 0).then(|| {
            tokio::spawn(rescan_loop(
                signal.clone(),
                Duration::from_secs(pipeline.rescan_interval_secs),
                shutdown_rx,
            ))
        });

        signal.raise();
        info!(
            batch_limit = pipeline.batch_limit,
            rescan_interval_secs = pipeline.rescan_interval_secs,
            repoll_processing = pipeline.repoll_processing,
            "对账流水线已启动"
        );

        PipelineHandle {
            signal,
            shutdown_tx,
            producer_task,
            consumer_task,
            rescan_task,
        }
    }
}

/// 定时补扫：按固定间隔触发新订单信号
async fn rescan_loop(signal: NewOrderSignal, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    // 第一次 tick 立即完成，启动信号已单独触发
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                signal.raise();
            }
        }
    }
}

/// 运行中的流水线句柄
pub struct PipelineHandle {
    signal: NewOrderSignal,
    shutdown_tx: watch::Sender<bool>,
    producer_task: JoinHandle<()>,
    consumer_task: JoinHandle<()>,
    rescan_task: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    /// 新订单信号触发端，供上传订单的请求使用
    pub fn signal(&self) -> NewOrderSignal {
        self.signal.clone()
    }

    /// 停止流水线并等待所有任务退出
    ///
    /// 生产者不再发出订单；消费者处理完已交接的订单后退出。
    pub async fn shutdown(self) {
        info!("正在停止对账流水线");
        let _ = self.shutdown_tx.send(true);

        if let Some(task) = self.rescan_task {
            if let Err(e) = task.await {
                warn!(error = %e, "定时补扫任务异常退出");
            }
        }
        if let Err(e) = self.producer_task.await {
            warn!(error = %e, "对账生产者异常退出");
        }
        if let Err(e) = self.consumer_task.await {
            warn!(error = %e, "对账消费者异常退出");
        }

        info!("对账流水线已停止");
    }
}
