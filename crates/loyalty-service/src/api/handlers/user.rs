//! 注册与登录
//!
//! 成功时在 `Authorization` 响应头中返回 `Bearer <token>`，响应体同时携带 token。

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::state::AppState;
use crate::error::{LoyaltyError, Result};
use crate::models::User;
use crate::service::dto::CredentialsRequest;

pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let user = state.users.register(&request).await?;
    token_response(&state, &user)
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let user = state.users.authenticate(&request).await?;
    token_response(&state, &user)
}

fn token_response(state: &AppState, user: &User) -> Result<Response> {
    let token = state.jwt.generate_token(user.id, &user.login)?;
    let header = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| LoyaltyError::Internal(format!("无效的 Authorization 头: {}", e)))?;

    Ok(([(AUTHORIZATION, header)], Json(json!({ "token": token }))).into_response())
}
