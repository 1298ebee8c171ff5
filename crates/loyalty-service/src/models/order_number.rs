//! 订单号校验（Luhn 算法）

/// 订单号最大长度
pub const MAX_ORDER_NUMBER_LEN: usize = 64;

/// 检查订单号是否为合法的 Luhn 数字串
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() || number.len() > MAX_ORDER_NUMBER_LEN {
        return false;
    }

    let mut sum = 0u32;
    for (i, c) in number.bytes().rev().enumerate() {
        if !c.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(c - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}
