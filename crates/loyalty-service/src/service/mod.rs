//! 应用服务层
//!
//! - [`OrderService`]：上传订单、查询用户订单
//! - [`LedgerService`]：余额、提现、提现记录
//! - [`UserService`]：注册与登录

pub mod dto;
mod ledger_service;
mod order_service;
mod user_service;

pub use ledger_service::LedgerService;
pub use order_service::OrderService;
pub use user_service::UserService;

use uuid::Uuid;

use crate::error::{LoyaltyError, Result};
use crate::models::Order;
use crate::repository::OrderRepositoryTrait;

/// 按归属把已存在的订单号转换为冲突错误
fn ownership_conflict(existing: &Order, user_id: Uuid) -> LoyaltyError {
    if existing.is_owned_by(user_id) {
        LoyaltyError::OrderOwnedByCurrentUser(existing.number.clone())
    } else {
        LoyaltyError::OrderOwnedByAnotherUser(existing.number.clone())
    }
}

/// 存储层报告订单号重复后重新查询归属
///
/// 用于预检查与写入之间被并发请求抢先写入的情况。
async fn resolve_duplicate(
    repo: &dyn OrderRepositoryTrait,
    number: &str,
    user_id: Uuid,
) -> Result<LoyaltyError> {
    Ok(match repo.get(number).await? {
        Some(existing) => ownership_conflict(&existing, user_id),
        None => LoyaltyError::DuplicateOrder(number.to_string()),
    })
}
