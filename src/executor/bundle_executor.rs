use log::{error, info};
use solana_sdk::{hash::Hash, transaction::VersionedTransaction};
use std::sync::Arc;

use crate::constant::limits::MAX_BUNDLE_SIZE;
use crate::executor::{
    compatibility::check_relay_compatibility,
    config::BundleSettings,
    errors::ExecutionError,
    progress::{BundleProgress, BundleResult, BundleStep, ProgressStream},
    relay_client::BundleRelay,
    traits::{ComboParams, ComboTransactionBuilders, TransactionSigner},
};

/// 单次bundle运行中需要带到后续阶段的状态
#[derive(Default)]
struct BundleRun {
    expected_swap_output: Option<u64>,
    bundle_id: Option<String>,
}

impl BundleRun {
    fn emit(&self, progress: &ProgressStream<BundleProgress>, step: BundleStep, error: Option<String>) {
        progress.emit(BundleProgress {
            step,
            expected_swap_output: self.expected_swap_output,
            bundle_id: self.bundle_id.clone(),
            error,
        });
    }
}

/// bundle执行器: 共享区块哈希、一次签名、原子提交
pub struct BundleExecutor {
    builders: Arc<dyn ComboTransactionBuilders>,
    relay: Arc<dyn BundleRelay>,
    settings: BundleSettings,
}

impl BundleExecutor {
    pub fn new(
        builders: Arc<dyn ComboTransactionBuilders>,
        relay: Arc<dyn BundleRelay>,
        settings: BundleSettings,
    ) -> Self {
        Self { builders, relay, settings }
    }

    /// 执行 swap -> short -> transfer -> tip 组合bundle
    pub async fn execute(
        &self,
        params: &ComboParams,
        signer: &dyn TransactionSigner,
        progress: &ProgressStream<BundleProgress>,
    ) -> BundleResult {
        let mut run = BundleRun::default();

        match self.run(params, signer, progress, &mut run).await {
            Ok(()) => {
                run.emit(progress, BundleStep::Success, None);
                info!("🎉 [Bundle] 执行成功: {:?}", run.bundle_id);
                BundleResult { bundle_id: run.bundle_id, success: true, error: None }
            }
            Err(e) => {
                error!("❌ [Bundle] 执行失败: {}", e);
                let message = e.to_string();
                run.emit(progress, BundleStep::Error, Some(message.clone()));
                BundleResult { bundle_id: run.bundle_id, success: false, error: Some(message) }
            }
        }
    }

    async fn run(
        &self,
        params: &ComboParams,
        signer: &dyn TransactionSigner,
        progress: &ProgressStream<BundleProgress>,
        run: &mut BundleRun,
    ) -> Result<(), ExecutionError> {
        let payer = signer.pubkey();
        let tip_lamports = self.settings.resolve_tip(params.tip_lamports)?;

        run.emit(progress, BundleStep::BuildingSwap, None);
        let swap = self.builders.build_swap(payer, params).await?;
        let shared_blockhash = *swap.transaction.message.recent_blockhash();
        run.expected_swap_output = Some(swap.expected_output);
        info!("🔗 [Bundle] 共享区块哈希: {}, 预期兑换输出: {}", shared_blockhash, swap.expected_output);

        run.emit(progress, BundleStep::BuildingShort, None);
        let short = self.builders.build_short(payer, params, Some(shared_blockhash)).await?;

        run.emit(progress, BundleStep::BuildingTransfer, None);
        let transfer = self.builders.build_transfer(payer, params, Some(shared_blockhash)).await?;

        run.emit(progress, BundleStep::BuildingTip, None);
        let tip_account = self.relay.select_tip_account().await?;
        let tip = self.builders
            .build_tip(payer, tip_account, tip_lamports, Some(shared_blockhash))
            .await?;

        let transactions = vec![
            ("swap", swap.transaction),
            ("short", short),
            ("transfer", transfer),
            ("tip", tip),
        ];
        let unsigned = verify_bundle(transactions, &shared_blockhash)?;

        run.emit(progress, BundleStep::Signing, None);
        let signed = signer.sign_all_transactions(unsigned).await?;
        if signed.len() != 4 {
            return Err(ExecutionError::Signature(format!(
                "wallet returned {} signed transactions, expected 4", signed.len()
            )));
        }

        run.emit(progress, BundleStep::Submitting, None);
        let bundle_id = self.relay.send_bundle(&signed).await?;
        run.bundle_id = Some(bundle_id.clone());

        run.emit(progress, BundleStep::Confirming, None);
        self.relay
            .wait_for_terminal(&bundle_id, self.settings.confirm_timeout(), self.settings.poll_interval())
            .await
    }
}

/// 签名前的校验: 所有交易共享同一区块哈希且满足中继限制
fn verify_bundle(
    transactions: Vec<(&'static str, VersionedTransaction)>,
    shared_blockhash: &Hash,
) -> Result<Vec<VersionedTransaction>, ExecutionError> {
    if transactions.len() > MAX_BUNDLE_SIZE {
        return Err(ExecutionError::BundleCreationFailed {
            reason: format!("bundle has {} transactions, max {}", transactions.len(), MAX_BUNDLE_SIZE),
        });
    }

    transactions
        .into_iter()
        .map(|(name, transaction)| {
            if transaction.message.recent_blockhash() != shared_blockhash {
                return Err(ExecutionError::Incompatible {
                    name: name.to_string(),
                    reason: "blockhash differs from the shared bundle blockhash".to_string(),
                });
            }

            let report = check_relay_compatibility(&transaction);
            if !report.compatible {
                return Err(ExecutionError::Incompatible {
                    name: name.to_string(),
                    reason: report.reason.unwrap_or_else(|| "unknown".to_string()),
                });
            }
            Ok(transaction)
        })
        .collect()
}
