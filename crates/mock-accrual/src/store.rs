//! 内存订单存储
//!
//! 使用 DashMap 保存已登记的订单，每次查询推进一次计算进度。

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 计算状态（与积分计算系统的线上协议一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

/// 查询响应体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    /// 没有积分的订单最终为 INVALID
    accrual: Option<Decimal>,
    polls: u32,
}

/// 订单存储
///
/// 进度：第一次查询返回 REGISTERED，随后 `processing_polls` 次返回 PROCESSING，
/// 之后固定返回终态。
#[derive(Debug, Clone)]
pub struct AccrualStore {
    orders: Arc<DashMap<String, OrderRecord>>,
    processing_polls: u32,
}

impl Default for AccrualStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl AccrualStore {
    pub fn new(processing_polls: u32) -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            processing_polls,
        }
    }

    /// 登记订单；已登记时返回 false
    pub fn register(&self, number: &str, accrual: Option<Decimal>) -> bool {
        match self.orders.entry(number.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(OrderRecord { accrual, polls: 0 });
                true
            }
        }
    }

    /// 查询并推进进度；未登记返回 None
    pub fn poll(&self, number: &str) -> Option<AccrualResponse> {
        let mut entry = self.orders.get_mut(number)?;
        let record = entry.value_mut();

        let polls = record.polls;
        record.polls = record.polls.saturating_add(1);

        let (status, accrual) = if polls == 0 {
            (AccrualStatus::Registered, None)
        } else if polls <= self.processing_polls {
            (AccrualStatus::Processing, None)
        } else {
            match record.accrual {
                Some(value) => (AccrualStatus::Processed, Some(value)),
                None => (AccrualStatus::Invalid, None),
            }
        };

        Some(AccrualResponse {
            order: number.to_string(),
            status,
            accrual,
        })
    }

    pub fn count(&self) -> usize {
        self.orders.len()
    }
}
