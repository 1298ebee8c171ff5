//! 积分计算系统（accrual oracle）客户端
//!
//! 对单个订单号查询计算状态。查询结果分三类：
//! - `Known`：拿到了状态（REGISTERED / PROCESSING / INVALID / PROCESSED）
//! - `Unknown`：系统尚未登记该订单，或响应无法解析
//! - `Throttled`：系统要求限流，附带建议等待时间
//!
//! 网络层失败以错误返回，由调用方决定如何处理。

mod client;

pub use client::HttpAccrualClient;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::OrderStatus;

/// 计算系统返回的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    /// 已登记，尚未开始计算
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl AccrualStatus {
    /// 映射为订单状态；REGISTERED 不产生状态变化，返回 None
    pub fn to_order_status(self) -> Option<OrderStatus> {
        match self {
            Self::Registered => None,
            Self::Processing => Some(OrderStatus::Processing),
            Self::Invalid => Some(OrderStatus::Invalid),
            Self::Processed => Some(OrderStatus::Processed),
        }
    }
}

/// 计算系统响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualInfo {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

/// 一次查询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualLookup {
    Known(AccrualInfo),
    Unknown,
    Throttled(Duration),
}

/// 积分计算系统接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualOracle: Send + Sync {
    async fn fetch_status(&self, number: &str) -> Result<AccrualLookup>;
}
