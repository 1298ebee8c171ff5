//! Mock 积分计算系统 HTTP 接口
//!
//! - `GET /api/orders/{number}`：200 返回计算状态；未登记返回 204；限流时返回 429
//! - `POST /api/orders`：登记订单 `{order, accrual?}`，重复登记返回 409

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::store::AccrualStore;

/// 服务状态
#[derive(Debug)]
pub struct MockAccrualState {
    pub store: AccrualStore,
    /// 每 N 次查询返回一次 429，0 表示不限流
    throttle_every: u64,
    retry_after_secs: u64,
    requests: AtomicU64,
}

impl MockAccrualState {
    pub fn new(store: AccrualStore, throttle_every: u64, retry_after_secs: u64) -> Self {
        Self {
            store,
            throttle_every,
            retry_after_secs,
            requests: AtomicU64::new(0),
        }
    }

    fn should_throttle(&self) -> bool {
        if self.throttle_every == 0 {
            return false;
        }
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        n % self.throttle_every == 0
    }
}

impl Default for MockAccrualState {
    fn default() -> Self {
        Self::new(AccrualStore::default(), 0, 60)
    }
}

/// 登记订单请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOrderRequest {
    pub order: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Decimal>,
}

/// 构建路由
pub fn router(state: Arc<MockAccrualState>) -> Router {
    Router::new()
        .route("/api/orders/{number}", get(get_order))
        .route("/api/orders", post(register_order))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn get_order(
    State(state): State<Arc<MockAccrualState>>,
    Path(number): Path<String>,
) -> Response {
    if state.should_throttle() {
        debug!(number = %number, "触发限流");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, state.retry_after_secs.to_string())],
            format!("No more than {} requests per minute allowed", state.throttle_every),
        )
            .into_response();
    }

    match state.store.poll(&number) {
        Some(response) => {
            debug!(number = %number, status = ?response.status, "返回计算状态");
            Json(response).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn register_order(
    State(state): State<Arc<MockAccrualState>>,
    Json(request): Json<RegisterOrderRequest>,
) -> StatusCode {
    if state.store.register(&request.order, request.accrual) {
        info!(order = %request.order, accrual = ?request.accrual, "订单已登记");
        StatusCode::ACCEPTED
    } else {
        StatusCode::CONFLICT
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "mock-accrual"
    }))
}
