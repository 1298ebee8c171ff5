use std::time::{Duration, Instant};

use async_trait::async_trait;
use loyalty_shared::config::AccrualConfig;
use loyalty_shared::observability::{metrics, tracing::inject_to_headers};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{debug, instrument, warn};

use super::{AccrualInfo, AccrualLookup, AccrualOracle};
use crate::error::{LoyaltyError, Result};

/// 429 未携带 Retry-After 时的默认等待时间
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// 基于 reqwest 的计算系统客户端
#[derive(Clone)]
pub struct HttpAccrualClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| LoyaltyError::Internal(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn lookup(&self, number: &str) -> Result<AccrualLookup> {
        let url = format!("{}/api/orders/{}", self.base_url, number);

        let mut trace_headers = HeaderMap::new();
        inject_to_headers(&mut trace_headers);

        let response = self
            .client
            .get(&url)
            .headers(trace_headers)
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            StatusCode::OK => match response.json::<AccrualInfo>().await {
                Ok(info) if info.order == number => Ok(AccrualLookup::Known(info)),
                Ok(info) => {
                    warn!(expected = number, actual = %info.order, "响应中的订单号不一致");
                    Ok(AccrualLookup::Unknown)
                }
                Err(e) if e.is_timeout() => Err(LoyaltyError::OracleTimeout),
                Err(e) => {
                    warn!(error = %e, "响应体无法解析");
                    Ok(AccrualLookup::Unknown)
                }
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                Ok(AccrualLookup::Throttled(retry_after))
            }
            StatusCode::NO_CONTENT => Ok(AccrualLookup::Unknown),
            status => {
                warn!(status = status.as_u16(), "计算系统返回非预期状态码");
                Ok(AccrualLookup::Unknown)
            }
        }
    }
}

#[async_trait]
impl AccrualOracle for HttpAccrualClient {
    #[instrument(skip(self))]
    async fn fetch_status(&self, number: &str) -> Result<AccrualLookup> {
        let start = Instant::now();
        let result = self.lookup(number).await;

        let outcome = match &result {
            Ok(AccrualLookup::Known(_)) => "known",
            Ok(AccrualLookup::Unknown) => "unknown",
            Ok(AccrualLookup::Throttled(_)) => "throttled",
            Err(_) => "error",
        };
        metrics::record_accrual_request(outcome, start.elapsed().as_secs_f64());
        debug!(outcome, elapsed_ms = start.elapsed().as_millis() as u64, "计算系统查询完成");

        result
    }
}

fn map_transport_error(err: reqwest::Error) -> LoyaltyError {
    if err.is_timeout() {
        LoyaltyError::OracleTimeout
    } else {
        LoyaltyError::Oracle(err.to_string())
    }
}

/// 去掉末尾斜杠，缺少协议时补 http://
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// 仅支持秒数形式的 Retry-After
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
