use solana_sdk::{
    instruction::Instruction,
    compute_budget::ComputeBudgetInstruction,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// 交易类型，决定计算单元上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Swap,
    Position,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Swap => "swap",
            TransactionKind::Position => "position",
            TransactionKind::Transfer => "transfer",
        }
    }
}

/// 计算预算配置 - 从config.toml读取
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeBudgetConfig {
    pub swap_compute_units: u32,
    pub position_compute_units: u32,
    pub transfer_compute_units: u32,
    /// 优先费 (micro-lamports per CU), 0 表示不设置
    pub priority_fee_micro_lamports: u64,
}

impl Default for ComputeBudgetConfig {
    fn default() -> Self {
        Self {
            swap_compute_units: 400_000,
            position_compute_units: 300_000,
            transfer_compute_units: 60_000,
            priority_fee_micro_lamports: 10_000,
        }
    }
}

impl ComputeBudgetConfig {
    pub fn compute_units(&self, kind: TransactionKind) -> u32 {
        match kind {
            TransactionKind::Swap => self.swap_compute_units,
            TransactionKind::Position => self.position_compute_units,
            TransactionKind::Transfer => self.transfer_compute_units,
        }
    }

    /// 构建计算预算指令
    pub fn instructions_for(&self, kind: TransactionKind) -> Vec<Instruction> {
        let compute_units = self.compute_units(kind);

        debug!("📊 预算配置: CU={}, 优先费={} micro-lamports/CU, 类型={}",
               compute_units, self.priority_fee_micro_lamports, kind.as_str());

        let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_limit(compute_units)];
        if self.priority_fee_micro_lamports > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(self.priority_fee_micro_lamports));
        }
        instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_per_kind() {
        let config = ComputeBudgetConfig::default();
        let ixs = config.instructions_for(TransactionKind::Position);
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0], ComputeBudgetInstruction::set_compute_unit_limit(300_000));

        let no_fee = ComputeBudgetConfig { priority_fee_micro_lamports: 0, ..config };
        assert_eq!(no_fee.instructions_for(TransactionKind::Transfer).len(), 1, "优先费为0时只设置CU上限");
    }
}
