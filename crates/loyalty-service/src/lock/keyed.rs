use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::LockKey;

type LockMap = DashMap<LockKey, Arc<Mutex<()>>>;

/// 进程内按键分配的异步互斥锁
///
/// 最后一个持有者释放后，该键的条目随之移除，表的大小只取决于当前活跃的键。
#[derive(Default)]
pub struct KeyedLocks {
    locks: Arc<LockMap>,
}

/// 持有期间同键的其他调用方会等待，drop 时释放
pub struct KeyedLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
    key: LockKey,
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // 只剩表内一份引用说明没有等待者；判断与移除在同一分片锁内完成
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定键的锁
    pub async fn lock(&self, key: LockKey) -> KeyedLockGuard {
        // 先克隆出 Arc 再等待，避免持有 DashMap 分片锁时 await
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;
        debug!(key = %key, "已获取进程内锁");
        KeyedLockGuard {
            guard: Some(guard),
            locks: self.locks.clone(),
            key,
        }
    }

    /// 当前登记的锁数量
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
