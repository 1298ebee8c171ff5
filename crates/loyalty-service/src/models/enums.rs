//! 积分服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 状态机：`NEW -> PROCESSING -> {PROCESSED, INVALID}`，
/// 也允许 NEW 直接进入 PROCESSED / INVALID。PROCESSED 与 INVALID 为终态。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已上传，尚未得到计算结果
    #[default]
    New,
    /// 计算系统正在处理
    Processing,
    /// 计算系统拒绝计算积分
    Invalid,
    /// 计算完成，积分已到账
    Processed,
}

impl OrderStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// 检查状态流转是否合法
    ///
    /// 同状态视为合法（重复查询到 PROCESSING 不算违规）。
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (Self::New, _) => true,
            (Self::Processing, Self::New) => false,
            (Self::Processing, _) => true,
            (Self::Invalid, _) | (Self::Processed, _) => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// 补充订单 - 用户上传的消费订单，等待计算积分
    #[default]
    Replenishment,
    /// 提现订单 - 创建即为 PROCESSED，金额为负
    Withdrawal,
}
