//! 生产者与消费者之间的交接队列
//!
//! 会合语义：`send` 只有在消费者取走订单后才返回，生产者不会领先消费者。
//! 每个订单在任一时刻只属于一方，不会被复制。
//! 发送端释放即关闭队列，消费者取完剩余订单后 `recv` 返回 None。

use tokio::sync::{mpsc, oneshot};

use crate::models::Order;

struct Slot {
    order: Order,
    taken: oneshot::Sender<()>,
}

/// 接收端已关闭，订单未被取走
#[derive(Debug, thiserror::Error)]
#[error("交接队列已关闭: order={number}")]
pub struct HandoffClosed {
    pub number: String,
}

/// 发送端，由生产者独占
pub struct HandoffSender {
    tx: mpsc::Sender<Slot>,
}

/// 接收端，由消费者独占
pub struct HandoffReceiver {
    rx: mpsc::Receiver<Slot>,
}

/// 创建交接队列
pub fn handoff() -> (HandoffSender, HandoffReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl HandoffSender {
    /// 交出一个订单，阻塞直到消费者取走
    pub async fn send(&self, order: Order) -> Result<(), HandoffClosed> {
        let number = order.number.clone();
        let (taken, ack) = oneshot::channel();

        if self.tx.send(Slot { order, taken }).await.is_err() {
            return Err(HandoffClosed { number });
        }

        // 接收端在取走前被释放时 Slot 随之丢弃，ack 返回错误
        ack.await.map_err(|_| HandoffClosed { number })
    }
}

impl HandoffReceiver {
    /// 取出下一个订单
    pub async fn recv(&mut self) -> Option<Order> {
        let slot = self.rx.recv().await?;
        let _ = slot.taken.send(());
        Some(slot.order)
    }
}
