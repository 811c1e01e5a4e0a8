use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use crate::executor::errors::ExecutionError;

/// 交易签名在链上的观测状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureOutcome {
    /// 已被处理但尚未达到 confirmed
    Processed,
    /// confirmed 或 finalized
    Confirmed,
    /// 链上执行失败
    Failed(String),
}

/// 链上RPC能力 (区块哈希、提交、状态查询)
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// 获取最新区块哈希及其最后有效区块高度
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), ExecutionError>;

    async fn get_block_height(&self) -> Result<u64, ExecutionError>;

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature, ExecutionError>;

    /// 无记录时返回 None
    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureOutcome>, ExecutionError>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, ExecutionError>;
}

/// 钱包签名能力
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// 签名单笔交易
    async fn sign_transaction(
        &self,
        transaction: VersionedTransaction,
    ) -> Result<VersionedTransaction, ExecutionError>;

    /// 一次性批量签名 (bundle模式只发起一次签名请求)
    async fn sign_all_transactions(
        &self,
        transactions: Vec<VersionedTransaction>,
    ) -> Result<Vec<VersionedTransaction>, ExecutionError>;
}

/// 组合执行参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboParams {
    /// 兑换输入数量 (UI单位)
    pub swap_amount: f64,
    /// 做空仓位大小 (基础资产单位)
    pub short_size: f64,
    /// 转账数量 (UI单位)
    pub transfer_amount: f64,
    /// 转账接收地址
    pub recipient: Pubkey,
    /// 可选的保证金存入 (0 表示跳过)
    pub collateral_deposit: Option<f64>,
    /// 可选滑点 (基点)
    pub slippage_bps: Option<u16>,
    /// 可选tip (lamports), 缺省时使用中继配置
    pub tip_lamports: Option<u64>,
}

impl ComboParams {
    /// 最小化的参数校验
    pub fn validate(&self) -> Result<(), ExecutionError> {
        let amounts = [
            ("swap amount", self.swap_amount),
            ("short size", self.short_size),
            ("transfer amount", self.transfer_amount),
        ];
        for (label, value) in amounts {
            if !value.is_finite() || value <= 0.0 {
                return Err(ExecutionError::InvalidParams(format!("{} must be greater than 0", label)));
            }
        }

        if let Some(deposit) = self.collateral_deposit {
            if !deposit.is_finite() || deposit < 0.0 {
                return Err(ExecutionError::InvalidParams("collateral deposit cannot be negative".to_string()));
            }
        }

        if self.slippage_bps.map_or(false, |bps| bps > 10_000) {
            return Err(ExecutionError::InvalidParams("Slippage cannot exceed 100%".to_string()));
        }

        Ok(())
    }

    /// 需要存入的保证金 (0 视为跳过)
    pub fn deposit_amount(&self) -> Option<f64> {
        self.collateral_deposit.filter(|amount| *amount > 0.0)
    }
}

/// 兑换构建结果
#[derive(Debug, Clone)]
pub struct SwapTransaction {
    pub transaction: VersionedTransaction,
    /// 聚合器报价的预期输出 (最小单位)
    pub expected_output: u64,
}

/// 组合交易的四类构建器
///
/// `shared_blockhash` 为 None 时由构建器自行获取最新区块哈希。
#[async_trait]
pub trait ComboTransactionBuilders: Send + Sync {
    async fn build_swap(
        &self,
        payer: Pubkey,
        params: &ComboParams,
    ) -> Result<SwapTransaction, ExecutionError>;

    async fn build_short(
        &self,
        payer: Pubkey,
        params: &ComboParams,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError>;

    async fn build_transfer(
        &self,
        payer: Pubkey,
        params: &ComboParams,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError>;

    async fn build_tip(
        &self,
        payer: Pubkey,
        tip_account: Pubkey,
        lamports: u64,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError>;
}
