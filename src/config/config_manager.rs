use std::path::Path;
use crate::{
    config::AppConfig,
    executor::errors::ExecutionError,
};
use solana_sdk::{signature::Keypair, signer::Signer};

/// 配置管理器 - 统一配置加载入口
///
/// 职责分工：
/// - AppConfig: 处理TOML文件、数据结构、验证、非敏感环境变量
/// - ConfigManager: 处理敏感信息(中继认证、聚合器API key、私钥)
///
/// 使用方式：
/// ```rust,ignore
/// let config_manager = ConfigManager::load_from_file("config.toml")?;
/// let app_config = &config_manager.app_config;
/// let keypair = config_manager.clone_wallet_keypair()?;
/// ```
pub struct ConfigManager {
    pub app_config: AppConfig,
    pub relay_auth_uuid: Option<String>,
    pub jupiter_api_key: Option<String>,
    pub wallet_keypair: Option<Keypair>,
}

impl ConfigManager {
    /// 从配置文件和环境变量加载完整配置
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ExecutionError> {
        // 1. 加载主配置文件（处理非敏感环境变量覆盖）
        let app_config = AppConfig::load_with_env_override(config_path)?;

        // 2. 加载敏感信息
        let manager = Self {
            app_config,
            relay_auth_uuid: std::env::var("RELAY_AUTH_UUID").ok(),
            jupiter_api_key: std::env::var("JUPITER_API_KEY").ok(),
            wallet_keypair: Self::load_wallet_keypair()?,
        };

        if manager.wallet_keypair.is_none() {
            log::warn!("⚠️ WALLET_PRIVATE_KEY 未设置，执行组合交易将失败");
        }

        log::info!("✅ Configuration loaded successfully");
        Ok(manager)
    }

    /// 加载钱包密钥
    fn load_wallet_keypair() -> Result<Option<Keypair>, ExecutionError> {
        if let Ok(private_key_str) = std::env::var("WALLET_PRIVATE_KEY") {
            Ok(Some(Self::parse_wallet_keypair(private_key_str.trim())?))
        } else {
            Ok(None)
        }
    }

    /// 解析钱包密钥
    fn parse_wallet_keypair(private_key_str: &str) -> Result<Keypair, ExecutionError> {
        // 支持多种格式的私钥
        let bytes: Vec<u8> = if private_key_str.starts_with('[') && private_key_str.ends_with(']') {
            // JSON数组格式: [1,2,3,...]
            serde_json::from_str(private_key_str)
                .map_err(|e| ExecutionError::Configuration(format!("Invalid wallet key JSON format: {}", e)))?
        } else {
            // Base58格式
            bs58::decode(private_key_str)
                .into_vec()
                .map_err(|e| ExecutionError::Configuration(format!("Invalid base58 wallet key: {}", e)))?
        };

        if bytes.len() != 64 {
            return Err(ExecutionError::Configuration("Wallet private key must be 64 bytes".to_string()));
        }

        Keypair::from_bytes(&bytes)
            .map_err(|e| ExecutionError::Configuration(format!("Invalid wallet keypair: {}", e)))
    }

    /// 获取钱包密钥
    pub fn get_wallet_keypair(&self) -> Result<&Keypair, ExecutionError> {
        self.wallet_keypair.as_ref()
            .ok_or(ExecutionError::WalletUnavailable)
    }

    /// 克隆钱包密钥（用于多线程场景）
    pub fn clone_wallet_keypair(&self) -> Result<Keypair, ExecutionError> {
        let keypair = self.get_wallet_keypair()?;
        Keypair::from_bytes(&keypair.to_bytes())
            .map_err(|e| ExecutionError::Configuration(format!("Failed to clone wallet keypair: {}", e)))
    }

    /// 获取钱包公钥
    pub fn get_wallet_pubkey(&self) -> Result<solana_sdk::pubkey::Pubkey, ExecutionError> {
        Ok(self.get_wallet_keypair()?.pubkey())
    }

    /// 生成默认配置文件
    pub fn generate_default_config_file<P: AsRef<Path>>(path: P) -> Result<(), ExecutionError> {
        let default_config = AppConfig::default();
        default_config.save_to_file(path)?;
        log::info!("✅ Default configuration file generated");
        Ok(())
    }

    /// 获取配置摘要（不包含敏感信息）
    pub fn get_config_summary(&self) -> String {
        format!(
            "ConfigManager Summary:\n\
            - RPC: {} ({})\n\
            - Block Engine: {} (auth: {})\n\
            - Jupiter: {} (API key: {})\n\
            - Market: {} / sub-account {}\n\
            - Tip: default {} / max {} lamports\n\
            - Wallet: {}\n\
            - Log level: {}",
            self.app_config.rpc.endpoint,
            self.app_config.rpc.commitment,
            self.app_config.relay.block_engine_url,
            if self.relay_auth_uuid.is_some() { "set" } else { "none" },
            self.app_config.swap.api_url,
            if self.jupiter_api_key.is_some() { "set" } else { "none" },
            self.app_config.position.market_name,
            self.app_config.position.sub_account_id,
            self.app_config.relay.default_tip_lamports,
            self.app_config.relay.max_tip_lamports,
            match &self.wallet_keypair {
                Some(keypair) => keypair.pubkey().to_string(),
                None => "missing".to_string(),
            },
            self.app_config.logging.level,
        )
    }
}
