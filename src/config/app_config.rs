use serde::{Serialize, Deserialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::constant::{
    accounts::{DRIFT, SOL_PERP_ORACLE, USDC_MINT, USDC_SPOT_ORACLE, WSOL_MINT},
    jito::DEFAULT_TIP_ACCOUNTS,
};
use crate::executor::compute_budget::ComputeBudgetConfig;
use crate::executor::errors::ExecutionError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub rpc: RpcConfig,
    pub relay: RelayTomlConfig,
    pub sequential: SequentialConfig,
    pub swap: SwapConfig,
    pub position: PositionConfig,
    pub transfer: TransferConfig,
    #[serde(default)]
    pub compute_budget: ComputeBudgetConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub default_slippage_bps: u16,
    pub max_slippage_bps: u16,
    pub network_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub endpoint: String,
    pub commitment: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayTomlConfig {
    pub block_engine_url: String,
    pub default_tip_lamports: u64,
    pub max_tip_lamports: u64,
    pub poll_interval_ms: u64,
    pub confirm_timeout_ms: u64,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub fetch_tip_accounts: bool,
    pub tip_accounts: TipAccounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipAccounts {
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialConfig {
    pub max_send_retries: u32,
    pub retry_base_delay_ms: u64,
    pub confirm_poll_interval_ms: u64,
    pub confirm_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    pub api_url: String,
    pub input_mint: String,
    pub input_decimals: u8,
    pub output_mint: String,
    /// 路由账户上限, 保证交易不依赖查找表
    pub max_accounts: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    pub program_id: String,
    pub market_name: String,
    pub sub_account_id: u16,
    pub collateral: SpotMarketConfig,
    pub perp_markets: Vec<PerpMarketConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpMarketConfig {
    pub name: String,
    pub market_index: u16,
    pub oracle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarketConfig {
    pub market_index: u16,
    pub mint: String,
    pub decimals: u8,
    pub oracle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub mint: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// 解析配置中的地址字段
pub fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, ExecutionError> {
    Pubkey::from_str(value)
        .map_err(|e| ExecutionError::Configuration(format!("Invalid {} '{}': {}", field, value, e)))
}

impl AppConfig {
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ExecutionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    pub fn load_with_env_override<P: AsRef<std::path::Path>>(config_path: P) -> Result<Self, ExecutionError> {
        let mut config = Self::from_file(config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ExecutionError> {
        // 只处理非敏感配置的环境变量覆盖
        if let Ok(endpoint) = std::env::var("SOLANA_RPC_ENDPOINT") {
            self.rpc.endpoint = endpoint;
        }

        if let Ok(url) = std::env::var("RELAY_ENDPOINT") {
            self.relay.block_engine_url = url;
        }

        if let Ok(url) = std::env::var("JUPITER_API_URL") {
            self.swap.api_url = url;
        }

        if let Ok(tip) = std::env::var("RELAY_DEFAULT_TIP_LAMPORTS") {
            self.relay.default_tip_lamports = tip.parse()
                .map_err(|e| ExecutionError::Configuration(format!("Invalid RELAY_DEFAULT_TIP_LAMPORTS: {}", e)))?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.general.default_slippage_bps > self.general.max_slippage_bps {
            return Err(ExecutionError::Configuration(
                "Default slippage cannot be greater than max slippage".to_string()
            ));
        }

        if self.general.max_slippage_bps > 10000 {
            return Err(ExecutionError::Configuration(
                "Max slippage cannot exceed 100%".to_string()
            ));
        }

        if self.general.network_timeout_ms < 1000 {
            return Err(ExecutionError::Configuration(
                "Network timeout must be at least 1000ms".to_string()
            ));
        }

        match self.rpc.commitment.as_str() {
            "processed" | "confirmed" | "finalized" => {},
            other => return Err(ExecutionError::Configuration(
                format!("Invalid commitment '{}'. Must be one of: processed, confirmed, finalized", other)
            )),
        }

        if self.relay.default_tip_lamports == 0 {
            return Err(ExecutionError::Configuration(
                "Default tip must be greater than 0".to_string()
            ));
        }

        if self.relay.default_tip_lamports > self.relay.max_tip_lamports {
            return Err(ExecutionError::Configuration(
                "Relay default tip cannot exceed max tip".to_string()
            ));
        }

        if self.relay.tip_accounts.accounts.is_empty() {
            return Err(ExecutionError::Configuration(
                "Relay tip accounts cannot be empty".to_string()
            ));
        }

        if self.relay.poll_interval_ms == 0 || self.relay.poll_interval_ms > self.relay.confirm_timeout_ms {
            return Err(ExecutionError::Configuration(
                "Relay poll interval must be positive and below the confirmation timeout".to_string()
            ));
        }

        if self.sequential.max_send_retries == 0 {
            return Err(ExecutionError::Configuration(
                "max_send_retries must be at least 1".to_string()
            ));
        }

        parse_pubkey("swap.input_mint", &self.swap.input_mint)?;
        parse_pubkey("swap.output_mint", &self.swap.output_mint)?;
        parse_pubkey("position.program_id", &self.position.program_id)?;
        parse_pubkey("transfer.mint", &self.transfer.mint)?;

        if !self.position.perp_markets.iter().any(|m| m.name.eq_ignore_ascii_case(&self.position.market_name)) {
            return Err(ExecutionError::Configuration(format!(
                "Market '{}' is not in position.perp_markets", self.position.market_name
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {},
            _ => return Err(ExecutionError::Configuration(
                "Invalid log level. Must be one of: trace, debug, info, warn, error".to_string()
            )),
        }

        log::info!("✅ Configuration validation passed");
        Ok(())
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ExecutionError> {
        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_content)
            .map_err(|e| ExecutionError::Configuration(format!("Failed to write config file: {}", e)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                default_slippage_bps: 50,
                max_slippage_bps: 1000,
                network_timeout_ms: 30000,
            },
            rpc: RpcConfig {
                endpoint: "https://api.mainnet-beta.solana.com".to_string(),
                commitment: "confirmed".to_string(),
                timeout_seconds: 30,
            },
            relay: RelayTomlConfig {
                block_engine_url: "https://mainnet.block-engine.jito.wtf".to_string(),
                default_tip_lamports: 10_000,
                max_tip_lamports: 1_000_000,
                poll_interval_ms: 2000,
                confirm_timeout_ms: 60000,
                timeout_seconds: 30,
                fetch_tip_accounts: false,
                tip_accounts: TipAccounts {
                    accounts: DEFAULT_TIP_ACCOUNTS.iter().map(|s| s.to_string()).collect(),
                },
            },
            sequential: SequentialConfig {
                max_send_retries: 3,
                retry_base_delay_ms: 500,
                confirm_poll_interval_ms: 1000,
                confirm_timeout_ms: 60000,
            },
            swap: SwapConfig {
                api_url: "https://quote-api.jup.ag/v6".to_string(),
                input_mint: WSOL_MINT.to_string(),
                input_decimals: 9,
                output_mint: USDC_MINT.to_string(),
                max_accounts: 20,
            },
            position: PositionConfig {
                program_id: DRIFT.to_string(),
                market_name: "SOL-PERP".to_string(),
                sub_account_id: 0,
                collateral: SpotMarketConfig {
                    market_index: 0,
                    mint: USDC_MINT.to_string(),
                    decimals: 6,
                    oracle: USDC_SPOT_ORACLE.to_string(),
                },
                perp_markets: vec![PerpMarketConfig {
                    name: "SOL-PERP".to_string(),
                    market_index: 0,
                    oracle: SOL_PERP_ORACLE.to_string(),
                }],
            },
            transfer: TransferConfig {
                mint: USDC_MINT.to_string(),
                decimals: 6,
            },
            compute_budget: ComputeBudgetConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok(), "默认配置应通过验证");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed.position.perp_markets.len(), 1);
        assert_eq!(parsed.relay.tip_accounts.accounts.len(), 8);
        assert_eq!(parsed.compute_budget.swap_compute_units, 400_000);
    }

    #[test]
    fn test_missing_compute_budget_section_uses_default() {
        let mut value = toml::Value::try_from(AppConfig::default()).unwrap();
        value.as_table_mut().unwrap().remove("compute_budget");
        let parsed: AppConfig = toml::from_str(&toml::to_string(&value).unwrap()).unwrap();
        assert_eq!(parsed.compute_budget.priority_fee_micro_lamports, 10_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.general.default_slippage_bps = 2000;
        assert!(config.validate().is_err(), "默认滑点超过上限应报错");

        let mut config = AppConfig::default();
        config.position.market_name = "BTC-PERP".to_string();
        assert!(config.validate().is_err(), "未配置的市场应报错");

        let mut config = AppConfig::default();
        config.rpc.commitment = "recent".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.transfer.mint = "bad".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("solana-combo-config-{}.toml", std::process::id()));
        AppConfig::default().save_to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.swap.output_mint, USDC_MINT.to_string());

        std::fs::remove_file(&path).ok();
    }
}
