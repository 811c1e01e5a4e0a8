use backoff::{future::retry, ExponentialBackoff};
use log::{error, info, warn};
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::executor::{
    config::SequentialSettings,
    errors::ExecutionError,
    progress::{ProgressStream, SequentialExecutionResult, TransactionProgress, TransactionStatus},
    traits::{ChainClient, SignatureOutcome, TransactionSigner},
    transaction_builder::TransactionBuilder,
};

/// 顺序执行器: 逐笔构建、签名、提交、确认, 首个失败即停止
pub struct SequentialExecutor {
    chain: Arc<dyn ChainClient>,
    settings: SequentialSettings,
}

impl SequentialExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, settings: SequentialSettings) -> Self {
        Self { chain, settings }
    }

    /// 执行一组交易
    ///
    /// 每个构建器对应一条进度记录, 顺序一致。失败后后续记录保持 pending。
    /// 每次状态变化都推送整个进度表的快照。
    pub async fn execute(
        &self,
        signer: &dyn TransactionSigner,
        builders: Vec<TransactionBuilder>,
        progress: &ProgressStream<Vec<TransactionProgress>>,
    ) -> SequentialExecutionResult {
        let mut ledger: Vec<TransactionProgress> = builders
            .iter()
            .enumerate()
            .map(|(index, builder)| TransactionProgress::pending(index, builder.name()))
            .collect();

        if builders.is_empty() {
            return SequentialExecutionResult {
                success: false,
                transactions: ledger,
                error: Some("No transactions to execute".to_string()),
                failed_at_index: None,
            };
        }

        info!("🚀 [Sequential] 开始执行 {} 笔交易", builders.len());

        for (index, builder) in builders.into_iter().enumerate() {
            match self.run_one(index, builder, signer, &mut ledger, progress).await {
                Ok(signature) => {
                    info!("✅ [Sequential] #{} {} 已确认: {}", index, ledger[index].name, signature);
                }
                Err(e) => {
                    error!("❌ [Sequential] #{} {} 失败: {}", index, ledger[index].name, e);
                    let message = e.to_string();
                    let entry = &mut ledger[index];
                    entry.status = TransactionStatus::Failed;
                    entry.error = Some(message.clone());
                    progress.emit(ledger.clone());

                    return SequentialExecutionResult {
                        success: false,
                        transactions: ledger,
                        error: Some(message),
                        failed_at_index: Some(index),
                    };
                }
            }
        }

        info!("🎉 [Sequential] 全部交易已确认");
        SequentialExecutionResult {
            success: true,
            transactions: ledger,
            error: None,
            failed_at_index: None,
        }
    }

    async fn run_one(
        &self,
        index: usize,
        builder: TransactionBuilder,
        signer: &dyn TransactionSigner,
        ledger: &mut [TransactionProgress],
        progress: &ProgressStream<Vec<TransactionProgress>>,
    ) -> Result<Signature, ExecutionError> {
        let mut advance = |status: TransactionStatus, signature: Option<Signature>| {
            let entry = &mut ledger[index];
            entry.status = status;
            if let Some(signature) = signature {
                entry.signature = Some(signature.to_string());
            }
            progress.emit(ledger.to_vec());
        };

        advance(TransactionStatus::Building, None);
        let transaction = builder.build().await?;

        advance(TransactionStatus::Signing, None);
        let signed = signer.sign_transaction(transaction).await?;

        advance(TransactionStatus::Submitting, None);
        let signature = self.submit_with_retry(&signed).await?;

        advance(TransactionStatus::Confirming, Some(signature));
        self.wait_for_confirmation(&signature).await?;

        advance(TransactionStatus::Confirmed, None);
        Ok(signature)
    }

    /// 提交交易, 仅对瞬时错误重试, 总次数不超过 max_send_retries
    async fn submit_with_retry(&self, transaction: &VersionedTransaction) -> Result<Signature, ExecutionError> {
        let max_attempts = self.settings.max_send_retries.max(1);
        let attempts = AtomicU32::new(0);
        let chain = self.chain.as_ref();

        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(self.settings.retry_base_delay_ms),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        retry(backoff, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                chain.send_transaction(transaction).await.map_err(|e| {
                    if !e.is_retryable() || attempt >= max_attempts {
                        return backoff::Error::permanent(e);
                    }
                    warn!("⚠️ 提交失败 (第{}/{}次): {}，准备重试", attempt, max_attempts, e);
                    match e.retry_after() {
                        Some(wait) => backoff::Error::retry_after(e, wait),
                        None => backoff::Error::transient(e),
                    }
                })
            }
        })
        .await
    }

    /// 轮询签名状态直到确认、区块哈希过期或超时
    async fn wait_for_confirmation(&self, signature: &Signature) -> Result<(), ExecutionError> {
        let (_, last_valid_block_height) = self.chain.get_latest_blockhash().await?;
        let timeout = self.settings.confirm_timeout();
        let deadline = Instant::now() + timeout;

        loop {
            match self.chain.get_signature_status(signature).await {
                Ok(Some(SignatureOutcome::Confirmed)) => return Ok(()),
                Ok(Some(SignatureOutcome::Failed(message))) => {
                    return Err(ExecutionError::TransactionFailed {
                        message,
                        signature: Some(signature.to_string()),
                    });
                }
                Ok(_) => {}
                Err(e) => warn!("⚠️ 查询签名状态失败: {}", e),
            }

            match self.chain.get_block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    return Err(ExecutionError::BlockhashExpired);
                }
                Ok(_) => {}
                Err(e) => warn!("⚠️ 查询区块高度失败: {}", e),
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExecutionError::ConfirmationTimeout { timeout_ms: timeout.as_millis() as u64 });
            }
            sleep(self.settings.confirm_poll_interval().min(remaining)).await;
        }
    }
}
