//! 盤點數量的輸入正規化與比較

use crate::utils::error::{Result, StocktakeError};

/// 比較數量時容許的浮點誤差
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// 解析操作員輸入的數量。
///
/// - 空字串視為 0
/// - 逗號小數點轉成句點（`12,5` → `12.5`）
/// - 負數、非數字、多個小數點都回傳 `ValidationError`
pub fn parse_quantity(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if normalized.matches('.').count() > 1 {
        return Err(StocktakeError::validation(format!(
            "'{}' is not a valid quantity",
            input
        )));
    }

    let value: f64 = normalized.parse().map_err(|_| {
        StocktakeError::validation(format!("'{}' is not a valid quantity", input))
    })?;

    if !value.is_finite() {
        return Err(StocktakeError::validation(format!(
            "'{}' is not a valid quantity",
            input
        )));
    }
    if value < 0.0 {
        return Err(StocktakeError::validation(format!(
            "Quantity cannot be negative: {}",
            input
        )));
    }

    Ok(value)
}

pub fn differs(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() > QUANTITY_EPSILON
}
