use serde::{Serialize, Deserialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::config::AppConfig;
use crate::constant::jito::DEFAULT_TIP_ACCOUNTS;
use crate::executor::errors::ExecutionError;

/// 执行器配置管理
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// 顺序执行配置
    pub sequential: SequentialSettings,
    /// bundle执行配置
    pub bundle: BundleSettings,
    /// 中继 (Jito Block Engine) 配置
    pub relay: RelayConfig,
}

/// 顺序执行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialSettings {
    /// 单笔交易最多提交次数 (仅瞬时错误重试)
    pub max_send_retries: u32,
    /// 重试延迟基数 (毫秒)
    pub retry_base_delay_ms: u64,
    /// 确认轮询间隔 (毫秒)
    pub confirm_poll_interval_ms: u64,
    /// 确认超时 (毫秒)
    pub confirm_timeout_ms: u64,
}

impl Default for SequentialSettings {
    fn default() -> Self {
        Self {
            max_send_retries: 3,
            retry_base_delay_ms: 500,
            confirm_poll_interval_ms: 1000,
            confirm_timeout_ms: 60_000,
        }
    }
}

impl SequentialSettings {
    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

/// bundle执行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSettings {
    /// 状态轮询间隔 (毫秒)
    pub poll_interval_ms: u64,
    /// 确认超时 (毫秒)
    pub confirm_timeout_ms: u64,
    /// 默认tip金额 (lamports)
    pub default_tip_lamports: u64,
    /// 最大tip金额 (lamports)
    pub max_tip_lamports: u64,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            confirm_timeout_ms: 60_000,
            default_tip_lamports: 10_000, // 0.00001 SOL
            max_tip_lamports: 1_000_000, // 0.001 SOL
        }
    }
}

impl BundleSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    /// 解析tip金额: 缺省使用默认值, 超过上限报错
    pub fn resolve_tip(&self, requested: Option<u64>) -> Result<u64, ExecutionError> {
        let lamports = requested.unwrap_or(self.default_tip_lamports);
        if lamports == 0 {
            return Err(ExecutionError::InvalidParams("Tip must be greater than 0".to_string()));
        }
        if lamports > self.max_tip_lamports {
            return Err(ExecutionError::InvalidParams(format!(
                "Tip {} lamports exceeds max {} lamports", lamports, self.max_tip_lamports
            )));
        }
        Ok(lamports)
    }
}

/// Jito中继配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Block Engine端点
    pub block_engine_url: String,
    /// Tip接收账户列表
    pub tip_accounts: Vec<String>,
    /// 是否从中继拉取tip账户 (失败时回退到本地列表)
    pub fetch_tip_accounts: bool,
    /// 连接超时 (秒)
    pub timeout_seconds: u64,
    /// 可选的认证UUID (来自环境变量)
    #[serde(skip)]
    pub auth_uuid: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            block_engine_url: "https://mainnet.block-engine.jito.wtf".to_string(),
            tip_accounts: DEFAULT_TIP_ACCOUNTS.iter().map(|s| s.to_string()).collect(),
            fetch_tip_accounts: false,
            timeout_seconds: 30,
            auth_uuid: None,
        }
    }
}

impl RelayConfig {
    /// 解析tip账户地址
    pub fn parsed_tip_accounts(&self) -> Result<Vec<Pubkey>, ExecutionError> {
        if self.tip_accounts.is_empty() {
            return Err(ExecutionError::Configuration("No tip accounts configured".to_string()));
        }
        self.tip_accounts
            .iter()
            .map(|account| {
                Pubkey::from_str(account)
                    .map_err(|e| ExecutionError::Configuration(format!("Invalid tip address '{}': {}", account, e)))
            })
            .collect()
    }
}

impl ExecutorConfig {
    /// 从应用配置创建执行器配置
    pub fn from_app_config(app_config: &AppConfig, auth_uuid: Option<String>) -> Result<Self, ExecutionError> {
        let config = Self {
            sequential: SequentialSettings {
                max_send_retries: app_config.sequential.max_send_retries,
                retry_base_delay_ms: app_config.sequential.retry_base_delay_ms,
                confirm_poll_interval_ms: app_config.sequential.confirm_poll_interval_ms,
                confirm_timeout_ms: app_config.sequential.confirm_timeout_ms,
            },
            bundle: BundleSettings {
                poll_interval_ms: app_config.relay.poll_interval_ms,
                confirm_timeout_ms: app_config.relay.confirm_timeout_ms,
                default_tip_lamports: app_config.relay.default_tip_lamports,
                max_tip_lamports: app_config.relay.max_tip_lamports,
            },
            relay: RelayConfig {
                block_engine_url: app_config.relay.block_engine_url.clone(),
                tip_accounts: app_config.relay.tip_accounts.accounts.clone(),
                fetch_tip_accounts: app_config.relay.fetch_tip_accounts,
                timeout_seconds: app_config.relay.timeout_seconds,
                auth_uuid,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.sequential.max_send_retries == 0 {
            return Err(ExecutionError::Configuration("max_send_retries must be at least 1".to_string()));
        }

        if self.bundle.default_tip_lamports > self.bundle.max_tip_lamports {
            return Err(ExecutionError::Configuration("Default tip cannot exceed max tip".to_string()));
        }

        if self.bundle.poll_interval_ms == 0 || self.bundle.poll_interval_ms > self.bundle.confirm_timeout_ms {
            return Err(ExecutionError::Configuration(
                "Bundle poll interval must be positive and below the confirmation timeout".to_string()
            ));
        }

        self.relay.parsed_tip_accounts()?;
        Ok(())
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sequential: SequentialSettings::default(),
            bundle: BundleSettings::default(),
            relay: RelayConfig::default(),
        }
    }
}
