use crate::executor::errors::ExecutionError;

/// UI数量转换为最小单位 (四舍五入)
pub fn ui_to_raw(amount: f64, decimals: u8) -> Result<u64, ExecutionError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ExecutionError::InvalidParams(format!("Invalid amount: {}", amount)));
    }

    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    // u64::MAX as f64 向上取整为 2^64
    if scaled >= u64::MAX as f64 {
        return Err(ExecutionError::InvalidParams(format!(
            "Amount {} overflows with {} decimals", amount, decimals
        )));
    }
    Ok(scaled as u64)
}
