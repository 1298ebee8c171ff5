//! 积分服务错误类型
//!
//! 每个变体归属到一个固定的错误类别（见 [`ErrorKind`]），
//! 各层边界按类别做穷尽匹配，而不是比较错误值。

use loyalty_shared::error::{SharedError, is_transient_sqlx_error};
use rust_decimal::Decimal;
use thiserror::Error;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 输入格式错误
    Validation,
    /// 引用的记录不存在
    NotFound,
    /// 订单号或登录名已被占用
    Conflict,
    /// 可用余额不足
    InsufficientFunds,
    /// 未登录或凭证无效
    Authentication,
    /// 积分计算系统调用失败
    ExternalDependency,
    /// 存储层故障
    Store,
}

/// 积分服务错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // === 参数校验 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("订单号格式错误: {0}")]
    InvalidOrderNumber(String),

    #[error("金额无效: {0}")]
    InvalidAmount(String),

    // === 记录不存在 ===
    #[error("订单不存在: {0}")]
    OrderNotFound(String),

    #[error("用户不存在: {0}")]
    UserNotFound(String),

    // === 冲突 ===
    #[error("订单已由当前用户上传: {0}")]
    OrderOwnedByCurrentUser(String),

    #[error("订单已由其他用户上传: {0}")]
    OrderOwnedByAnotherUser(String),

    /// 存储层发现订单号重复，尚未区分归属
    #[error("订单号重复: {0}")]
    DuplicateOrder(String),

    #[error("登录名已被占用: {0}")]
    LoginTaken(String),

    // === 余额 ===
    #[error("余额不足: 请求 {requested}, 可用 {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    // === 认证 ===
    #[error("用户名或密码错误")]
    InvalidCredentials,

    #[error("未授权: {0}")]
    Unauthorized(String),

    // === 外部依赖 ===
    #[error("积分计算系统调用失败: {0}")]
    Oracle(String),

    #[error("积分计算系统调用超时")]
    OracleTimeout,

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 积分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

impl LoyaltyError {
    /// 错误所属类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidOrderNumber(_) | Self::InvalidAmount(_) => {
                ErrorKind::Validation
            }
            Self::OrderNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::OrderOwnedByCurrentUser(_)
            | Self::OrderOwnedByAnotherUser(_)
            | Self::DuplicateOrder(_)
            | Self::LoginTaken(_) => ErrorKind::Conflict,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::InvalidCredentials | Self::Unauthorized(_) => ErrorKind::Authentication,
            Self::Oracle(_) | Self::OracleTimeout => ErrorKind::ExternalDependency,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Store,
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => is_transient_sqlx_error(e),
            Self::OracleTimeout => true,
            _ => false,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Store | ErrorKind::ExternalDependency
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::OrderOwnedByCurrentUser(_) => "ORDER_ALREADY_UPLOADED",
            Self::OrderOwnedByAnotherUser(_) => "ORDER_OWNED_BY_ANOTHER_USER",
            Self::DuplicateOrder(_) => "DUPLICATE_ORDER",
            Self::LoginTaken(_) => "LOGIN_TAKEN",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Oracle(_) => "ACCRUAL_ERROR",
            Self::OracleTimeout => "ACCRUAL_TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<SharedError> for LoyaltyError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(LoyaltyError, ErrorKind, &'static str)> {
        vec![
            (LoyaltyError::Validation("bad".into()), ErrorKind::Validation, "VALIDATION_ERROR"),
            (LoyaltyError::InvalidOrderNumber("12".into()), ErrorKind::Validation, "INVALID_ORDER_NUMBER"),
            (LoyaltyError::InvalidAmount("-1".into()), ErrorKind::Validation, "INVALID_AMOUNT"),
            (LoyaltyError::OrderNotFound("79927398713".into()), ErrorKind::NotFound, "ORDER_NOT_FOUND"),
            (LoyaltyError::UserNotFound("alice".into()), ErrorKind::NotFound, "USER_NOT_FOUND"),
            (LoyaltyError::OrderOwnedByCurrentUser("79927398713".into()), ErrorKind::Conflict, "ORDER_ALREADY_UPLOADED"),
            (LoyaltyError::OrderOwnedByAnotherUser("79927398713".into()), ErrorKind::Conflict, "ORDER_OWNED_BY_ANOTHER_USER"),
            (LoyaltyError::DuplicateOrder("79927398713".into()), ErrorKind::Conflict, "DUPLICATE_ORDER"),
            (LoyaltyError::LoginTaken("alice".into()), ErrorKind::Conflict, "LOGIN_TAKEN"),
            (
                LoyaltyError::InsufficientFunds {
                    requested: Decimal::new(200, 0),
                    available: Decimal::new(100, 0),
                },
                ErrorKind::InsufficientFunds,
                "INSUFFICIENT_FUNDS",
            ),
            (LoyaltyError::InvalidCredentials, ErrorKind::Authentication, "INVALID_CREDENTIALS"),
            (LoyaltyError::Unauthorized("missing token".into()), ErrorKind::Authentication, "UNAUTHORIZED"),
            (LoyaltyError::Oracle("connection refused".into()), ErrorKind::ExternalDependency, "ACCRUAL_ERROR"),
            (LoyaltyError::OracleTimeout, ErrorKind::ExternalDependency, "ACCRUAL_TIMEOUT"),
            (LoyaltyError::Database(sqlx::Error::RowNotFound), ErrorKind::Store, "DATABASE_ERROR"),
            (LoyaltyError::Internal("boom".into()), ErrorKind::Store, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_kind_and_code_for_every_variant() {
        for (err, kind, code) in all_error_variants() {
            assert_eq!(err.kind(), kind, "{:?}", err);
            assert_eq!(err.error_code(), code, "{:?}", err);
        }
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(LoyaltyError::OracleTimeout.is_retryable());
        assert!(LoyaltyError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!LoyaltyError::Database(sqlx::Error::RowNotFound).is_retryable());
        assert!(!LoyaltyError::OrderNotFound("1".into()).is_retryable());
        assert!(
            !LoyaltyError::InsufficientFunds {
                requested: Decimal::ONE,
                available: Decimal::ZERO
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_is_business_error() {
        assert!(LoyaltyError::OrderOwnedByAnotherUser("1".into()).is_business_error());
        assert!(LoyaltyError::InvalidCredentials.is_business_error());
        assert!(!LoyaltyError::Internal("x".into()).is_business_error());
        assert!(!LoyaltyError::Oracle("x".into()).is_business_error());
    }

    #[test]
    fn test_from_shared_error() {
        let err: LoyaltyError = SharedError::Database(sqlx::Error::PoolClosed).into();
        assert!(matches!(err, LoyaltyError::Database(_)));

        let err: LoyaltyError = SharedError::Internal("x".into()).into();
        assert!(matches!(err, LoyaltyError::Internal(_)));
    }
}
