pub mod app_config;
pub mod config_manager;

pub use app_config::{
    AppConfig, GeneralConfig, RpcConfig, RelayTomlConfig, TipAccounts,
    SequentialConfig, SwapConfig, PositionConfig, PerpMarketConfig, SpotMarketConfig,
    TransferConfig, LoggingConfig, parse_pubkey,
};
pub use config_manager::ConfigManager;
