//! 认证模块
//!
//! JWT 签发校验与密码哈希

mod jwt;
pub mod password;

pub use jwt::{Claims, JwtManager};
pub use password::{MAX_PASSWORD_BYTES, hash_password, verify_password};
