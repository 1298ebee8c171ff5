//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "accrual_requests_total",
        "Total number of accrual system lookups"
    );
    metrics::describe_histogram!(
        "accrual_request_duration_seconds",
        "Accrual system lookup duration in seconds"
    );

    metrics::describe_counter!(
        "reconciliation_batches_total",
        "Total number of reconciliation batches loaded"
    );
    metrics::describe_counter!(
        "reconciliation_orders_total",
        "Total number of orders processed by the reconciliation consumer"
    );

    metrics::describe_counter!("orders_uploaded_total", "Total number of uploaded orders");
    metrics::describe_counter!("withdrawals_total", "Total number of withdrawal attempts");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次积分计算系统查询，outcome 取值如 known / unknown / throttled / error
#[inline]
pub fn record_accrual_request(outcome: &str, duration_secs: f64) {
    metrics::counter!(
        "accrual_requests_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!("accrual_request_duration_seconds").record(duration_secs);
}

/// 记录一次批次加载
#[inline]
pub fn record_reconciliation_batch(size: usize) {
    metrics::counter!("reconciliation_batches_total").increment(1);
    metrics::histogram!("reconciliation_batch_size").record(size as f64);
}

/// 记录单个订单的对账结果
#[inline]
pub fn record_reconciliation_order(outcome: &str) {
    metrics::counter!(
        "reconciliation_orders_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录订单上传
#[inline]
pub fn record_order_upload(status: &str) {
    metrics::counter!(
        "orders_uploaded_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录提现
#[inline]
pub fn record_withdrawal(status: &str) {
    metrics::counter!(
        "withdrawals_total",
        "status" => status.to_string()
    )
    .increment(1);
}
