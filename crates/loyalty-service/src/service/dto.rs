//! 服务层数据传输对象
//!
//! 请求体带 `validator` 校验规则；响应体与内部 `Order` 模型解耦

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Balance, Order, OrderStatus};

/// 注册 / 登录请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1, max = 255, message = "登录名长度必须在 1-255 之间"))]
    pub login: String,
    #[validate(length(min = 1, message = "密码不能为空"))]
    pub password: String,
}

/// 提现请求
#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Decimal,
}

/// 用户上传的订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDto {
    pub number: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Order> for OrderDto {
    fn from(order: &Order) -> Self {
        Self {
            number: order.number.clone(),
            status: order.status,
            accrual: order.accrual(),
            uploaded_at: order.created_at,
        }
    }
}

/// 提现记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalDto {
    pub order: String,
    pub sum: Decimal,
    pub processed_at: DateTime<Utc>,
}

impl From<&Order> for WithdrawalDto {
    fn from(order: &Order) -> Self {
        Self {
            order: order.number.clone(),
            sum: order.amount.abs(),
            processed_at: order.created_at,
        }
    }
}

/// 余额；`current` 为可用余额
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceDto {
    pub current: Decimal,
    pub withdrawn: Decimal,
}

impl From<Balance> for BalanceDto {
    fn from(balance: Balance) -> Self {
        Self {
            current: balance.spendable(),
            withdrawn: balance.withdrawn,
        }
    }
}
