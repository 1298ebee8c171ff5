//! JWT 认证中间件
//!
//! 从 Authorization header 读取 Token（`Bearer <token>`，也接受不带前缀的裸 Token），
//! 校验后将 `Claims` 注入请求扩展。

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::state::AppState;
use crate::error::LoyaltyError;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(bearer_token)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return LoyaltyError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.jwt.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(header: &str) -> &str {
    let header = header.trim();
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}
