pub mod traits;
pub mod config;
pub mod errors;
pub mod progress;
pub mod compatibility;
pub mod compute_budget;
pub mod transaction_builder;
pub mod rpc_client;
pub mod relay_client;
pub mod sequential_executor;
pub mod bundle_executor;

#[cfg(test)]
pub(crate) mod testing;

pub use traits::{ChainClient, ComboParams, ComboTransactionBuilders, SignatureOutcome, SwapTransaction, TransactionSigner};
pub use config::{BundleSettings, ExecutorConfig, RelayConfig, SequentialSettings};
pub use errors::ExecutionError;
pub use progress::{
    BundleProgress, BundleResult, BundleStep, ProgressStream,
    SequentialExecutionResult, TransactionProgress, TransactionStatus,
};
pub use compatibility::{check_relay_compatibility, CompatibilityReport};
pub use transaction_builder::{compile_unsigned_transaction, TransactionBuilder};
pub use rpc_client::RpcChainClient;
pub use relay_client::{BundleRelay, BundleStatus, InflightBundleStatus, RelayClient};
pub use sequential_executor::SequentialExecutor;
pub use bundle_executor::BundleExecutor;
