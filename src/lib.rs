pub mod builders;
pub mod config;
pub mod constant;
pub mod executor;
pub mod orchestrator;
pub mod utils;
pub mod wallet;

// Re-export commonly used types
pub use builders::ProtocolBuilders;
pub use config::{AppConfig, ConfigManager};
pub use executor::{
    BundleExecutor, BundleProgress, BundleResult, ComboParams, ExecutionError, ExecutorConfig,
    ProgressStream, RelayClient, RpcChainClient, SequentialExecutionResult, SequentialExecutor,
    TransactionProgress,
};
pub use orchestrator::{ComboOrchestrator, ExecutionRecord};
pub use wallet::KeypairSigner;
