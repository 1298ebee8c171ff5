//! Mock 积分计算系统
//!
//! 开发和测试环境使用的积分计算系统模拟实现，协议与线上一致。
//!
//! - `store`: 已登记订单的内存存储与计算进度
//! - `service`: HTTP 路由
//! - `cli`: 命令行

pub mod cli;
pub mod service;
pub mod store;

pub use service::{MockAccrualState, RegisterOrderRequest, router};
pub use store::{AccrualResponse, AccrualStatus, AccrualStore};
