//! 路由配置

use axum::{
    Router, middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;

use super::{handlers, middleware::auth_middleware, state::AppState};

/// 公开路由：注册与登录
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/register", post(handlers::user::register))
        .route("/api/user/login", post(handlers::user::login))
}

/// 需要登录的路由
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/user/orders",
            post(handlers::orders::upload_order).get(handlers::orders::list_orders),
        )
        .route("/api/user/balance", get(handlers::balance::get_balance))
        .route(
            "/api/user/balance/withdraw",
            post(handlers::balance::withdraw),
        )
        .route(
            "/api/user/withdrawals",
            get(handlers::balance::list_withdrawals),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 构建完整应用
///
/// 请求体支持 gzip 压缩，响应按 `Accept-Encoding` 压缩。
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
