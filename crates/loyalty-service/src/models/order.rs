//! 订单与余额

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{OrderStatus, OrderType};

/// 订单
///
/// 订单号在全体用户间唯一，一经创建永久归属于同一用户。
/// amount 为有符号金额：正数为到账积分，负数为提现。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub order_type: OrderType,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// 新上传的补充订单：NEW，金额为 0
    pub fn replenishment(number: impl Into<String>, user_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            number: number.into(),
            user_id,
            status: OrderStatus::New,
            order_type: OrderType::Replenishment,
            amount: Decimal::ZERO,
            created_at,
            updated_at: None,
        }
    }

    /// 提现订单：直接为 PROCESSED，金额取负
    pub fn withdrawal(
        number: impl Into<String>,
        user_id: Uuid,
        sum: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number: number.into(),
            user_id,
            status: OrderStatus::Processed,
            order_type: OrderType::Withdrawal,
            amount: -sum,
            created_at,
            updated_at: None,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// 到账积分，仅对已完成计算的补充订单有意义
    pub fn accrual(&self) -> Option<Decimal> {
        (self.order_type == OrderType::Replenishment && self.status == OrderStatus::Processed)
            .then_some(self.amount)
    }
}

/// 用户余额（由订单实时汇总，不单独存储）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// 所有正金额之和
    pub current: Decimal,
    /// 所有负金额绝对值之和
    pub withdrawn: Decimal,
}

impl Balance {
    pub fn new(current: Decimal, withdrawn: Decimal) -> Self {
        Self { current, withdrawn }
    }

    /// 由订单金额汇总
    pub fn from_amounts<'a>(amounts: impl IntoIterator<Item = &'a Decimal>) -> Self {
        amounts
            .into_iter()
            .fold(Self::default(), |mut balance, amount| {
                if amount.is_sign_positive() {
                    balance.current += *amount;
                } else {
                    balance.withdrawn += amount.abs();
                }
                balance
            })
    }

    /// 可用余额
    pub fn spendable(&self) -> Decimal {
        self.current - self.withdrawn
    }
}
