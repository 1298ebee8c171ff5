//! 积分服务
//!
//! 用户上传消费订单号，服务异步向积分计算系统查询每个订单的积分，
//! 用户可用累计积分提现。
//!
//! ## 核心功能
//!
//! - **订单对账**：新订单触发对账流水线，生产者分批加载待对账订单，经会合式队列交给消费者
//! - **积分账本**：余额由订单实时汇总；提现在用户级事务锁下完成余额检查与写入，不会透支
//! - **用户认证**：注册、登录，JWT 访问令牌
//!
//! ## 模块结构
//!
//! - `models`: 领域模型与订单号校验
//! - `error`: 错误类型定义
//! - `repository`: 订单与用户仓储（PostgreSQL / 内存）
//! - `lock`: 用户级提现锁
//! - `accrual`: 积分计算系统客户端
//! - `pipeline`: 对账流水线
//! - `service`: 业务服务层
//! - `auth`: JWT 与密码哈希
//! - `api`: HTTP 接口

pub mod accrual;
pub mod api;
pub mod auth;
pub mod error;
pub mod lock;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod service;

pub use error::{ErrorKind, LoyaltyError, Result};
