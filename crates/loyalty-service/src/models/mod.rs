//! 积分服务领域模型

pub mod enums;
pub mod order;
pub mod order_number;
pub mod user;

pub use enums::{OrderStatus, OrderType};
pub use order::{Balance, Order};
pub use user::User;
