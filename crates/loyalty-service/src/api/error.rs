//! 错误到 HTTP 响应的映射
//!
//! 响应体统一为 `{code, message}`；存储与外部依赖错误只返回通用提示。

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loyalty_shared::observability::tracing::current_trace_id;
use serde_json::json;

use crate::error::{ErrorKind, LoyaltyError};

impl LoyaltyError {
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => match self {
                Self::InvalidOrderNumber(_) | Self::InvalidAmount(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::ExternalDependency | ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match self.kind() {
            ErrorKind::Store | ErrorKind::ExternalDependency => {
                // 与链路追踪关联，未启用追踪时为 None
                tracing::error!(error = %self, trace_id = ?current_trace_id(), "请求处理失败");
                "服务内部错误，请稍后重试".to_string()
            }
            _ => self.to_string(),
        };

        let body = json!({
            "code": self.error_code(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for LoyaltyError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LoyaltyError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                LoyaltyError::InvalidOrderNumber("1".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LoyaltyError::InvalidAmount("0".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                LoyaltyError::OrderOwnedByAnotherUser("1".into()),
                StatusCode::CONFLICT,
            ),
            (LoyaltyError::LoginTaken("a".into()), StatusCode::CONFLICT),
            (
                LoyaltyError::InsufficientFunds {
                    requested: dec!(2),
                    available: dec!(1),
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LoyaltyError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (
                LoyaltyError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = LoyaltyError::Internal("secret connection string".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert!(!json["message"].as_str().unwrap().contains("secret"));
    }
}
