use futures::future::{BoxFuture, FutureExt};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::future::Future;

use crate::executor::errors::ExecutionError;

type BuildFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<VersionedTransaction, ExecutionError>> + Send>;

/// 延迟构建的交易
///
/// 构建在执行时才发生，因此每笔交易都能拿到调用时刻的区块哈希。
/// 每次运行创建一次，只能消费一次。
pub struct TransactionBuilder {
    name: String,
    build: BuildFn,
}

impl TransactionBuilder {
    pub fn new<F, Fut>(name: impl Into<String>, build: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<VersionedTransaction, ExecutionError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            build: Box::new(move || build().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 执行构建
    pub async fn build(self) -> Result<VersionedTransaction, ExecutionError> {
        (self.build)().await
    }
}

impl std::fmt::Debug for TransactionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionBuilder").field("name", &self.name).finish()
    }
}

/// 编译未签名的 v0 交易 (不使用地址查找表)
///
/// 签名槽位按 `num_required_signatures` 预留为默认签名。
pub fn compile_unsigned_transaction(
    payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<VersionedTransaction, ExecutionError> {
    let message = v0::Message::try_compile(payer, instructions, &[], recent_blockhash)
        .map_err(|e| ExecutionError::Build(format!("Failed to compile message: {}", e)))?;

    let required = message.header.num_required_signatures as usize;

    Ok(VersionedTransaction {
        signatures: vec![Signature::default(); required],
        message: VersionedMessage::V0(message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::system_instruction;

    #[tokio::test]
    async fn test_builder_defers_until_build() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let payer = Pubkey::new_unique();

        let builder = TransactionBuilder::new("tip", move || async move {
            flag.store(true, Ordering::SeqCst);
            let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1);
            compile_unsigned_transaction(&payer, &[ix], Hash::new_unique())
        });

        assert_eq!(builder.name(), "tip");
        assert!(!called.load(Ordering::SeqCst), "构建前不应执行");

        let tx = builder.build().await.unwrap();
        assert!(called.load(Ordering::SeqCst));
        assert_eq!(tx.signatures.len(), 1);
    }

    #[test]
    fn test_compile_reserves_signature_slots() {
        let payer = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 5_000);

        let tx = compile_unsigned_transaction(&payer, &[ix], blockhash).unwrap();

        assert_eq!(tx.signatures, vec![Signature::default()]);
        assert_eq!(tx.message.recent_blockhash(), &blockhash);
        assert_eq!(tx.message.static_account_keys()[0], payer, "付款人应位于第一个账户");
        assert!(tx.message.address_table_lookups().map_or(true, |l| l.is_empty()));
    }
}
