use async_trait::async_trait;
use log::debug;
use solana_client::{
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use std::time::Duration;

use crate::executor::{
    errors::ExecutionError,
    traits::{ChainClient, SignatureOutcome},
};

/// 基于 nonblocking RpcClient 的链上客户端
pub struct RpcChainClient {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl RpcChainClient {
    pub fn new(rpc_endpoint: String, commitment: CommitmentConfig, timeout: Duration) -> Self {
        let rpc_client = RpcClient::new_with_timeout_and_commitment(rpc_endpoint, timeout, commitment);
        Self { rpc_client, commitment }
    }

    /// 解析配置中的确认级别
    pub fn parse_commitment(level: &str) -> Result<CommitmentConfig, ExecutionError> {
        match level.to_lowercase().as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(ExecutionError::Configuration(format!("Unknown commitment level: {}", other))),
        }
    }

    pub fn url(&self) -> String {
        self.rpc_client.url()
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), ExecutionError> {
        let (blockhash, last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await?;
        debug!("✅ Fetched blockhash={}, last_valid_block_height={}", blockhash, last_valid_block_height);
        Ok((blockhash, last_valid_block_height))
    }

    async fn get_block_height(&self) -> Result<u64, ExecutionError> {
        Ok(self.rpc_client.get_block_height_with_commitment(self.commitment).await?)
    }

    async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature, ExecutionError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            encoding: Some(UiTransactionEncoding::Base64),
            // 重试由执行器控制
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.rpc_client.send_transaction_with_config(transaction, config).await?)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureOutcome>, ExecutionError> {
        let response = self.rpc_client.get_signature_statuses(&[*signature]).await?;

        let outcome = response.value.into_iter().next().flatten().map(|status| {
            if let Some(err) = status.err {
                return SignatureOutcome::Failed(err.to_string());
            }
            match status.confirmation_status {
                Some(TransactionConfirmationStatus::Confirmed) | Some(TransactionConfirmationStatus::Finalized) => {
                    SignatureOutcome::Confirmed
                }
                _ => SignatureOutcome::Processed,
            }
        });

        Ok(outcome)
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, ExecutionError> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.is_some())
    }
}
