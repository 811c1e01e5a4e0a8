use log::info;
use solana_sdk::{hash::Hash, instruction::Instruction, pubkey::Pubkey, transaction::VersionedTransaction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};

use crate::executor::{
    compute_budget::{ComputeBudgetConfig, TransactionKind},
    errors::ExecutionError,
    traits::ChainClient,
    transaction_builder::compile_unsigned_transaction,
};
use crate::utils::ui_to_raw;

/// SPL 代币转账构建器
pub struct TokenTransferBuilder {
    compute_budget: ComputeBudgetConfig,
}

impl TokenTransferBuilder {
    pub fn new(compute_budget: ComputeBudgetConfig) -> Self {
        Self { compute_budget }
    }

    /// 构建转账交易, 接收方关联账户不存在时先创建
    #[allow(clippy::too_many_arguments)]
    pub async fn build(
        &self,
        chain: &dyn ChainClient,
        payer: &Pubkey,
        recipient: &Pubkey,
        mint: &Pubkey,
        decimals: u8,
        amount: f64,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        let raw_amount = ui_to_raw(amount, decimals)?;
        if raw_amount == 0 {
            return Err(ExecutionError::InvalidParams("Transfer amount cannot be zero".to_string()));
        }

        let source = get_associated_token_address(payer, mint);
        let destination = get_associated_token_address(recipient, mint);

        let mut instructions = self.compute_budget.instructions_for(TransactionKind::Transfer);
        if !chain.account_exists(&destination).await? {
            info!("🆕 [Transfer] 接收方代币账户不存在，附带创建: {}", destination);
            // 幂等创建, 并发创建时不会失败
            instructions.push(create_associated_token_account_idempotent(payer, recipient, mint, &spl_token::id()));
        }

        let transfer: Instruction = spl_token::instruction::transfer_checked(
            &spl_token::id(),
            &source,
            mint,
            &destination,
            payer,
            &[],
            raw_amount,
            decimals,
        )
        .map_err(|e| ExecutionError::Build(format!("Failed to build transfer instruction: {}", e)))?;
        instructions.push(transfer);

        let blockhash = match shared_blockhash {
            Some(hash) => hash,
            None => chain.get_latest_blockhash().await?.0,
        };

        info!("💸 [Transfer] {} {} -> {}", amount, mint, recipient);
        compile_unsigned_transaction(payer, &instructions, blockhash)
    }
}
