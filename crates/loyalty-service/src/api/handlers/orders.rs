//! 订单上传与查询

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;
use crate::auth::Claims;
use crate::error::{LoyaltyError, Result};
use crate::service::dto::OrderDto;

/// 请求体为纯文本订单号
///
/// 202 新订单已受理；200 当前用户已上传过该订单。
pub async fn upload_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: String,
) -> Result<Response> {
    let user_id = claims.user_id()?;

    match state.orders.upload(user_id, &body).await {
        Ok(_) => Ok(StatusCode::ACCEPTED.into_response()),
        Err(LoyaltyError::OrderOwnedByCurrentUser(_)) => Ok(StatusCode::OK.into_response()),
        Err(e) => Err(e),
    }
}

/// 没有订单时返回 204
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let orders = state.orders.list(claims.user_id()?).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<OrderDto> = orders.iter().map(OrderDto::from).collect();
    Ok(Json(body).into_response())
}
