//! 有界的指数退避重试
//!
//! 对账批次加载等存储读取在瞬时故障（连接池耗尽、网络抖动）时按策略重试。
//! 哪些错误可以重试由调用方的 `is_retryable` 决定。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RetryConfig;

/// 退避策略：第 n 次重试前等待 `initial_delay * multiplier^n`，不超过 `max_delay`
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 不含首次执行
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
        }
    }
}

impl RetryPolicy {
    /// 第 `retry` 次重试（从 0 计）前的等待时间
    pub fn backoff(&self, retry: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(retry as i32);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64)
    }
}

/// 执行 `operation`，可重试的错误按策略退避后重来，其余错误立即返回
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    info!(operation = operation_name, retries, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable(&err) || retries >= policy.max_retries {
            warn!(
                operation = operation_name,
                retries,
                error = %err,
                "操作失败，不再重试"
            );
            return Err(err);
        }

        let delay = policy.backoff(retries);
        warn!(
            operation = operation_name,
            retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "操作失败，退避后重试"
        );
        tokio::time::sleep(delay).await;
        retries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SharedError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::from(&RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 4,
            multiplier: 2.0,
        })
    }

    /// 前 `failures` 次返回连接池超时，之后成功，返回值为调用序号
    async fn flaky(
        policy: &RetryPolicy,
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> Result<u32, SharedError> {
        retry_with_policy(policy, "load_batch", SharedError::is_retryable, || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    Err(SharedError::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(n)
                }
            }
        })
        .await
    }

    #[test]
    fn test_backoff_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_retries: 4,
            initial_delay_ms: 50,
            max_delay_ms: 400,
            multiplier: 3.0,
        });
        assert_eq!(policy.backoff(0), Duration::from_millis(50));
        assert_eq!(policy.backoff(1), Duration::from_millis(150));
        // 450ms 被截到上限
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(10), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = flaky(&fast_policy(3), 2, calls.clone()).await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = flaky(&fast_policy(2), u32::MAX, calls.clone()).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        assert!(flaky(&fast_policy(0), 1, calls.clone()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), SharedError> = retry_with_policy(
            &fast_policy(5),
            "load_batch",
            SharedError::is_retryable,
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(SharedError::Internal("broken".to_string()))
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
