//! 数据仓储层
//!
//! 订单表是余额与对账的唯一数据来源。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，提现的余额检查除外：检查与写入必须在同一把锁下完成
//! - PostgreSQL 实现使用 SQLx，内存实现使用 DashMap，两者契约一致
//! - 定义 trait 接口以支持 mock 测试

mod memory;
mod order_repo;
mod traits;
mod user_repo;

pub use memory::{MemoryOrderRepository, MemoryUserRepository};
pub use order_repo::OrderRepository;
pub use traits::*;
pub use user_repo::UserRepository;

/// 用户订单列表与提现列表的返回上限
pub const USER_LIST_LIMIT: i64 = 200;
