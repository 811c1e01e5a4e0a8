use log::debug;
use solana_sdk::{hash::Hash, pubkey::Pubkey, system_instruction, transaction::VersionedTransaction};

use crate::executor::{
    errors::ExecutionError,
    traits::ChainClient,
    transaction_builder::compile_unsigned_transaction,
};

/// 中继小费交易 (单条系统转账, 不附带计算预算指令)
pub struct TipBuilder;

impl TipBuilder {
    pub async fn build(
        &self,
        chain: &dyn ChainClient,
        payer: &Pubkey,
        tip_account: &Pubkey,
        lamports: u64,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        if lamports == 0 {
            return Err(ExecutionError::InvalidParams("Tip must be greater than 0".to_string()));
        }

        let blockhash = match shared_blockhash {
            Some(hash) => hash,
            None => chain.get_latest_blockhash().await?.0,
        };

        debug!("💰 [Tip] {} lamports -> {}", lamports, tip_account);
        let ix = system_instruction::transfer(payer, tip_account, lamports);
        compile_unsigned_transaction(payer, &[ix], blockhash)
    }
}
