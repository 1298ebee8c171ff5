//! 集成测试公共工具

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use loyalty_service::accrual::{AccrualInfo, AccrualLookup, AccrualOracle, AccrualStatus};
use loyalty_service::error::Result;
use loyalty_shared::config::{AccrualConfig, PipelineConfig, RetryConfig};
use rust_decimal::Decimal;

/// 按订单号返回预设结果的计算系统，并记录每个订单的查询次数
#[derive(Default)]
pub struct ScriptedOracle {
    responses: DashMap<String, AccrualLookup>,
    calls: DashMap<String, usize>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, number: &str, lookup: AccrualLookup) {
        self.responses.insert(number.to_string(), lookup);
    }

    pub fn respond_status(&self, number: &str, status: AccrualStatus, accrual: Option<Decimal>) {
        self.respond(
            number,
            AccrualLookup::Known(AccrualInfo {
                order: number.to_string(),
                status,
                accrual,
            }),
        );
    }

    pub fn calls(&self, number: &str) -> usize {
        self.calls.get(number).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }
}

#[async_trait]
impl AccrualOracle for ScriptedOracle {
    async fn fetch_status(&self, number: &str) -> Result<AccrualLookup> {
        *self.calls.entry(number.to_string()).or_insert(0) += 1;
        Ok(self
            .responses
            .get(number)
            .map(|r| r.value().clone())
            .unwrap_or(AccrualLookup::Unknown))
    }
}

pub fn pipeline_config() -> PipelineConfig {
    PipelineConfig {
        batch_limit: 100,
        rescan_interval_secs: 0,
        repoll_processing: true,
        fetch_retry: RetryConfig {
            max_retries: 1,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            multiplier: 2.0,
        },
    }
}

pub fn accrual_config(base_url: &str) -> AccrualConfig {
    AccrualConfig {
        base_url: base_url.to_string(),
        timeout_ms: 2_000,
        max_throttle_wait_ms: 50,
    }
}

/// 轮询直到条件成立，超时返回 false
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
