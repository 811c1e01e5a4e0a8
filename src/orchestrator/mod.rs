use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::executor::{
    bundle_executor::BundleExecutor,
    errors::ExecutionError,
    progress::{BundleProgress, BundleResult, BundleStep, ProgressStream, SequentialExecutionResult, TransactionProgress},
    sequential_executor::SequentialExecutor,
    traits::{ComboParams, ComboTransactionBuilders, TransactionSigner},
    transaction_builder::TransactionBuilder,
};

/// 顺序模式的三笔交易
pub const SEQUENTIAL_STEPS: [&str; 3] = ["swap", "short", "transfer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Sequential,
    Bundle,
}

/// 最近一次执行的终态记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub mode: ExecutionMode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Default)]
struct TrackerState {
    in_flight: bool,
    last: Option<ExecutionRecord>,
}

/// 运行状态: 同一时刻只允许一次执行
#[derive(Default)]
pub struct ExecutionTracker {
    state: Mutex<TrackerState>,
}

impl ExecutionTracker {
    fn begin(&self) -> Result<RunGuard<'_>, ExecutionError> {
        let mut state = self.state.lock().map_err(|_| ExecutionError::Internal("tracker lock poisoned".to_string()))?;
        if state.in_flight {
            return Err(ExecutionError::InvalidParams("Another combo execution is in progress".to_string()));
        }
        state.in_flight = true;
        Ok(RunGuard { tracker: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().map(|state| state.in_flight).unwrap_or(false)
    }

    pub fn last(&self) -> Option<ExecutionRecord> {
        self.state.lock().ok().and_then(|state| state.last.clone())
    }

    /// 仅在没有进行中的执行时清空
    pub fn reset(&self) -> bool {
        match self.state.lock() {
            Ok(mut state) if !state.in_flight => {
                state.last = None;
                true
            }
            _ => false,
        }
    }
}

/// 执行期间持有, 结束或被丢弃时释放 in_flight
struct RunGuard<'a> {
    tracker: &'a ExecutionTracker,
}

impl RunGuard<'_> {
    fn finish(self, mode: ExecutionMode, success: bool, error: Option<String>) {
        if let Ok(mut state) = self.tracker.state.lock() {
            state.last = Some(ExecutionRecord { mode, success, error, finished_at: Utc::now() });
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.tracker.state.lock() {
            state.in_flight = false;
        }
    }
}

/// 组合交易编排器
///
/// 顺序模式: swap -> short -> transfer, 逐笔确认, 首个失败即停止。
/// bundle模式: swap -> short -> transfer -> tip, 共享区块哈希, 原子提交。
pub struct ComboOrchestrator {
    builders: Arc<dyn ComboTransactionBuilders>,
    sequential: SequentialExecutor,
    bundle: BundleExecutor,
    wallet: Option<Arc<dyn TransactionSigner>>,
    tracker: ExecutionTracker,
}

impl ComboOrchestrator {
    pub fn new(
        builders: Arc<dyn ComboTransactionBuilders>,
        sequential: SequentialExecutor,
        bundle: BundleExecutor,
        wallet: Option<Arc<dyn TransactionSigner>>,
    ) -> Self {
        Self { builders, sequential, bundle, wallet, tracker: ExecutionTracker::default() }
    }

    fn wallet(&self) -> Result<Arc<dyn TransactionSigner>, ExecutionError> {
        self.wallet.clone().ok_or(ExecutionError::WalletUnavailable)
    }

    fn sequential_builders(&self, payer: solana_sdk::pubkey::Pubkey, params: &ComboParams) -> Vec<TransactionBuilder> {
        let swap = {
            let (builders, params) = (self.builders.clone(), params.clone());
            TransactionBuilder::new(SEQUENTIAL_STEPS[0], move || async move {
                builders.build_swap(payer, &params).await.map(|swap| {
                    info!("📈 [Orchestrator] 预期兑换输出: {}", swap.expected_output);
                    swap.transaction
                })
            })
        };
        let short = {
            let (builders, params) = (self.builders.clone(), params.clone());
            TransactionBuilder::new(SEQUENTIAL_STEPS[1], move || async move {
                builders.build_short(payer, &params, None).await
            })
        };
        let transfer = {
            let (builders, params) = (self.builders.clone(), params.clone());
            TransactionBuilder::new(SEQUENTIAL_STEPS[2], move || async move {
                builders.build_transfer(payer, &params, None).await
            })
        };
        vec![swap, short, transfer]
    }

    /// 顺序执行 (非原子, 可能部分完成)
    pub async fn execute_sequential(
        &self,
        params: ComboParams,
        progress: ProgressStream<Vec<TransactionProgress>>,
    ) -> SequentialExecutionResult {
        let prepared = self.wallet().and_then(|wallet| {
            params.validate()?;
            Ok(wallet)
        });
        let wallet = match prepared {
            Ok(wallet) => wallet,
            Err(e) => {
                warn!("⚠️ [Orchestrator] 顺序执行未开始: {}", e);
                return SequentialExecutionResult::not_started(&SEQUENTIAL_STEPS, e.to_string());
            }
        };
        let guard = match self.tracker.begin() {
            Ok(guard) => guard,
            Err(e) => return SequentialExecutionResult::not_started(&SEQUENTIAL_STEPS, e.to_string()),
        };

        let builders = self.sequential_builders(wallet.pubkey(), &params);
        let result = self.sequential.execute(wallet.as_ref(), builders, &progress).await;

        guard.finish(ExecutionMode::Sequential, result.success, result.error.clone());
        result
    }

    /// bundle执行 (全部成功或全部失败)
    pub async fn execute_bundle(
        &self,
        params: ComboParams,
        progress: ProgressStream<BundleProgress>,
    ) -> BundleResult {
        let prepared = self.wallet().and_then(|wallet| {
            params.validate()?;
            Ok(wallet)
        });
        let wallet = match prepared {
            Ok(wallet) => wallet,
            Err(e) => return Self::bundle_not_started(&progress, e),
        };
        let guard = match self.tracker.begin() {
            Ok(guard) => guard,
            Err(e) => return Self::bundle_not_started(&progress, e),
        };

        let result = self.bundle.execute(&params, wallet.as_ref(), &progress).await;

        guard.finish(ExecutionMode::Bundle, result.success, result.error.clone());
        result
    }

    fn bundle_not_started(progress: &ProgressStream<BundleProgress>, error: ExecutionError) -> BundleResult {
        warn!("⚠️ [Orchestrator] bundle执行未开始: {}", error);
        let message = error.to_string();
        progress.emit(BundleProgress {
            step: BundleStep::Error,
            expected_swap_output: None,
            bundle_id: None,
            error: Some(message.clone()),
        });
        BundleResult { bundle_id: None, success: false, error: Some(message) }
    }

    /// 清空最近一次结果; 有执行进行中时返回 false
    pub fn reset(&self) -> bool {
        self.tracker.reset()
    }

    pub fn last_outcome(&self) -> Option<ExecutionRecord> {
        self.tracker.last()
    }

    pub fn is_running(&self) -> bool {
        self.tracker.is_in_flight()
    }
}
