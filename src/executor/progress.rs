use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// 单笔交易在顺序执行中的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Building,
    Signing,
    Submitting,
    Confirming,
    Confirmed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Confirmed | TransactionStatus::Failed)
    }
}

/// 顺序执行的进度记录 (每个构建器一条)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProgress {
    pub index: usize,
    pub name: String,
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionProgress {
    pub fn pending(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            status: TransactionStatus::Pending,
            signature: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialExecutionResult {
    pub success: bool,
    pub transactions: Vec<TransactionProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 运行中失败的位置; 为 None 且 success=false 表示什么都没有发生
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at_index: Option<usize>,
}

impl SequentialExecutionResult {
    /// 运行开始前就失败: 所有槽位保持 pending
    pub fn not_started(names: &[&str], error: impl Into<String>) -> Self {
        Self {
            success: false,
            transactions: names
                .iter()
                .enumerate()
                .map(|(index, name)| TransactionProgress::pending(index, *name))
                .collect(),
            error: Some(error.into()),
            failed_at_index: None,
        }
    }
}

/// bundle 执行阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStep {
    BuildingSwap,
    BuildingShort,
    BuildingTransfer,
    BuildingTip,
    Signing,
    Submitting,
    Confirming,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleProgress {
    pub step: BundleStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_swap_output: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 单向、有序的进度事件流
///
/// 执行器同步地推送快照; 发送端随执行结束而丢弃, 接收端随之关闭。
pub struct ProgressStream<T> {
    sender: Option<mpsc::UnboundedSender<T>>,
}

impl<T> ProgressStream<T> {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// 不关心进度时使用
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: T) {
        if let Some(sender) = &self.sender {
            // 接收端已关闭时忽略
            let _ = sender.send(event);
        }
    }
}
