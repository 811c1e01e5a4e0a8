use thiserror::Error;
use solana_sdk::signature::SignerError;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use std::time::Duration;

/// 交易执行错误类型
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction failed on-chain: {message}")]
    TransactionFailed {
        message: String,
        signature: Option<String>
    },

    #[error("Service unavailable: {service} - {reason}")]
    ServiceUnavailable {
        service: String,
        reason: String
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Timeout occurred: operation took longer than {timeout_ms}ms")]
    Timeout {
        timeout_ms: u64
    },

    #[error("Rate limit exceeded for service: {service}, retry after {retry_after_seconds}s")]
    RateLimitExceeded {
        service: String,
        retry_after_seconds: u64
    },

    #[error("Transaction serialization error: {0}")]
    Serialization(String),

    #[error("Signing rejected: {0}")]
    Signature(String),

    #[error("Blockhash not found or expired")]
    BlockhashExpired,

    #[error("Bundle creation failed: {reason}")]
    BundleCreationFailed {
        reason: String
    },

    #[error("Bundle {bundle_id} failed: {reason}")]
    BundleFailed {
        bundle_id: String,
        reason: String,
    },

    #[error("Wallet not connected")]
    WalletUnavailable,

    /// 构建阶段的失败原样透出 (例如 "oracle unavailable")
    #[error("{0}")]
    Build(String),

    #[error("Transaction '{name}' is not relay compatible: {reason}")]
    Incompatible {
        name: String,
        reason: String,
    },

    #[error("Confirmation timeout after {timeout_ms}ms")]
    ConfirmationTimeout {
        timeout_ms: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ClientError> for ExecutionError {
    fn from(err: ClientError) -> Self {
        match err.kind() {
            ClientErrorKind::TransactionError(tx_err) => ExecutionError::TransactionFailed {
                message: tx_err.to_string(),
                signature: None,
            },
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                message,
                data: RpcResponseErrorData::SendTransactionPreflightFailure(_),
                ..
            }) => ExecutionError::TransactionFailed {
                message: message.clone(),
                signature: None,
            },
            _ => ExecutionError::Network(err.to_string()),
        }
    }
}

impl From<SignerError> for ExecutionError {
    fn from(err: SignerError) -> Self {
        ExecutionError::Signature(err.to_string())
    }
}

impl From<std::io::Error> for ExecutionError {
    fn from(err: std::io::Error) -> Self {
        ExecutionError::Network(format!("IO Error: {}", err))
    }
}

impl From<serde_json::Error> for ExecutionError {
    fn from(err: serde_json::Error) -> Self {
        ExecutionError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for ExecutionError {
    fn from(err: bincode::Error) -> Self {
        ExecutionError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ExecutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExecutionError::Timeout { timeout_ms: 30000 }
        } else if err.is_connect() {
            ExecutionError::Network(format!("Connection error: {}", err))
        } else {
            ExecutionError::Network(err.to_string())
        }
    }
}

impl ExecutionError {
    /// 检查错误是否可重试 (仅限瞬时的网络/服务错误)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::Network(_) |
            ExecutionError::Timeout { .. } |
            ExecutionError::ServiceUnavailable { .. } |
            ExecutionError::RateLimitExceeded { .. }
        )
    }

    /// 服务端给出的重试等待时间, 其余错误走指数退避
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ExecutionError::RateLimitExceeded { retry_after_seconds, .. } => {
                Some(Duration::from_secs(*retry_after_seconds))
            }
            _ => None,
        }
    }
}
