//! 用户级互斥锁
//!
//! 提现必须在同一用户内串行：余额检查与写入提现订单处于同一把锁之下。
//! 锁键为 (操作类型, 用户 ID)，不同用户、不同操作互不阻塞。
//!
//! - [`LockKey::acquire_xact`]：PostgreSQL 事务级 advisory lock，提交或回滚时自动释放
//! - [`KeyedLocks`]：进程内按键分配的异步互斥锁，供内存存储使用

mod advisory;
mod keyed;

pub use keyed::{KeyedLocks, KeyedLockGuard};

use std::fmt;
use uuid::Uuid;

/// 需要加锁的操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Withdrawal,
}

impl OperationKind {
    /// advisory lock 的命名空间编号，发布后不可修改
    pub fn code(&self) -> i32 {
        match self {
            Self::Withdrawal => 1001,
        }
    }
}

/// 锁键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub kind: OperationKind,
    pub user_id: Uuid,
}

impl LockKey {
    pub fn new(kind: OperationKind, user_id: Uuid) -> Self {
        Self { kind, user_id }
    }

    pub fn withdrawal(user_id: Uuid) -> Self {
        Self::new(OperationKind::Withdrawal, user_id)
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.user_id)
    }
}
