//! 新订单信号
//!
//! 容量为 1 的通道：已有待处理信号时再次触发会被丢弃，
//! 因此多次触发在被消费前只合并为一次唤醒，且待处理信号不会丢失。

use tokio::sync::mpsc::{self, error::TrySendError};

/// 触发端，可在请求处理任务间克隆共享
#[derive(Clone, Debug)]
pub struct NewOrderSignal {
    tx: mpsc::Sender<()>,
}

/// 监听端，由生产者独占
#[derive(Debug)]
pub struct SignalListener {
    rx: mpsc::Receiver<()>,
}

/// 创建一对信号端点
pub fn new_order_signal() -> (NewOrderSignal, SignalListener) {
    let (tx, rx) = mpsc::channel(1);
    (NewOrderSignal { tx }, SignalListener { rx })
}

impl NewOrderSignal {
    /// 触发信号，从不阻塞
    ///
    /// 返回 true 表示登记了新的唤醒；已有待处理信号或监听端已关闭时返回 false。
    pub fn raise(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(())) => false,
            Err(TrySendError::Closed(())) => false,
        }
    }
}

impl SignalListener {
    /// 等待下一次唤醒；所有触发端都已释放时返回 None
    pub async fn wait(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}
