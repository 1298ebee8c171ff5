//! 余额与提现

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;
use crate::auth::Claims;
use crate::error::Result;
use crate::service::dto::{BalanceDto, WithdrawRequest, WithdrawalDto};

pub async fn get_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<BalanceDto>> {
    let balance = state.ledger.balance(claims.user_id()?).await?;
    Ok(Json(balance.into()))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(request) = payload?;
    state
        .ledger
        .withdraw(claims.user_id()?, &request.order, request.sum)
        .await?;
    Ok(StatusCode::OK)
}

/// 没有提现记录时返回 204
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response> {
    let withdrawals = state.ledger.withdrawals(claims.user_id()?).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<WithdrawalDto> = withdrawals.iter().map(WithdrawalDto::from).collect();
    Ok(Json(body).into_response())
}
