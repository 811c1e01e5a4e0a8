use async_trait::async_trait;
use base64::prelude::*;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, transaction::VersionedTransaction};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::constant::jito::{
    BUNDLE_STATUSES_PATH, INFLIGHT_BUNDLE_STATUSES_PATH, SEND_BUNDLE_PATH, TIP_ACCOUNTS_PATH,
};
use crate::constant::limits::MAX_BUNDLE_SIZE;
use crate::executor::{config::RelayConfig, errors::ExecutionError};

/// getBundleStatuses 返回的落地状态
#[derive(Debug, Clone, Deserialize)]
pub struct BundleStatus {
    pub bundle_id: String,
    #[serde(default)]
    pub transactions: Vec<String>,
    #[serde(default)]
    pub slot: u64,
    #[serde(default)]
    pub confirmation_status: Option<String>,
    /// `{"Ok": null}` 或 `{"Err": ...}`
    #[serde(default)]
    pub err: Value,
}

impl BundleStatus {
    /// 链上错误 (若有)
    pub fn error(&self) -> Option<String> {
        match &self.err {
            Value::Object(map) => map
                .get("Err")
                .filter(|e| !e.is_null())
                .map(|e| e.to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InflightState {
    Invalid,
    Pending,
    Failed,
    Landed,
}

/// getInflightBundleStatuses 返回的中继侧状态
#[derive(Debug, Clone, Deserialize)]
pub struct InflightBundleStatus {
    pub bundle_id: String,
    pub status: InflightState,
    #[serde(default)]
    pub landed_slot: Option<u64>,
}

/// 单次轮询的判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    Landed,
    Failed(String),
    Pending,
}

/// 由两个状态端点的结果判定bundle是否终结
///
/// 只有 confirmed/finalized 才算成功; 中继报告 Landed 但状态尚未确认时继续等待。
pub fn classify(status: Option<&BundleStatus>, inflight: Option<&InflightBundleStatus>) -> BundleOutcome {
    if let Some(status) = status {
        if let Some(err) = status.error() {
            return BundleOutcome::Failed(format!("on-chain error: {}", err));
        }
        if matches!(status.confirmation_status.as_deref(), Some("confirmed") | Some("finalized")) {
            return BundleOutcome::Landed;
        }
    }

    if let Some(inflight) = inflight {
        if inflight.status == InflightState::Failed {
            return BundleOutcome::Failed("relay reported bundle failed".to_string());
        }
    }

    BundleOutcome::Pending
}

/// 中继 (Block Engine) 能力
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// 随机选择一个tip接收账户
    async fn select_tip_account(&self) -> Result<Pubkey, ExecutionError>;

    /// 提交已签名的有序交易, 返回 bundle id
    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<String, ExecutionError>;

    /// 无记录时返回 None (视为pending)
    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<BundleStatus>, ExecutionError>;

    async fn get_inflight_bundle_status(&self, bundle_id: &str) -> Result<Option<InflightBundleStatus>, ExecutionError>;

    /// 轮询直到终结或超时
    async fn wait_for_terminal(
        &self,
        bundle_id: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<(), ExecutionError> {
        let deadline = Instant::now() + timeout;

        loop {
            // 单次查询失败按pending处理, 由超时兜底
            let status = self.get_bundle_status(bundle_id).await.unwrap_or_else(|e| {
                warn!("⚠️ getBundleStatuses failed for {}: {}", bundle_id, e);
                None
            });
            let inflight = self.get_inflight_bundle_status(bundle_id).await.unwrap_or_else(|e| {
                warn!("⚠️ getInflightBundleStatuses failed for {}: {}", bundle_id, e);
                None
            });

            match classify(status.as_ref(), inflight.as_ref()) {
                BundleOutcome::Landed => {
                    info!("✅ Bundle {} landed at slot {}", bundle_id, status.map(|s| s.slot).unwrap_or_default());
                    return Ok(());
                }
                BundleOutcome::Failed(reason) => {
                    return Err(ExecutionError::BundleFailed { bundle_id: bundle_id.to_string(), reason });
                }
                BundleOutcome::Pending => {
                    debug!("⏳ Bundle {} pending", bundle_id);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExecutionError::ConfirmationTimeout { timeout_ms: timeout.as_millis() as u64 });
            }
            sleep(interval.min(remaining)).await;
        }
    }
}

/// 状态类接口的 result 包装
#[derive(Debug, Deserialize)]
struct ContextValue<T> {
    #[serde(default = "Vec::new")]
    value: Vec<Option<T>>,
}

/// Jito Block Engine JSON-RPC 客户端
pub struct RelayClient {
    config: RelayConfig,
    client: Client,
    tip_accounts: Vec<Pubkey>,
}

impl RelayClient {
    /// 创建新的中继客户端
    pub fn new(config: RelayConfig) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ExecutionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        let tip_accounts = config.parsed_tip_accounts()?;

        Ok(Self { config, client, tip_accounts })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.block_engine_url.trim_end_matches('/'), path)
    }

    /// 标准JSON-RPC 2.0调用
    async fn rpc_call<T: DeserializeOwned>(&self, path: &str, method: &str, params: Value) -> Result<T, ExecutionError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let mut request = self.client
            .post(self.endpoint(path))
            .header("Content-Type", "application/json")
            .json(&request_body);
        if let Some(uuid) = &self.config.auth_uuid {
            request = request.header("x-jito-auth", uuid);
        }

        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ExecutionError::RateLimitExceeded {
                service: "Jito".to_string(),
                retry_after_seconds: 1,
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExecutionError::ServiceUnavailable {
                service: "Jito".to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }

        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let reason = format!("RPC Error: {}", error);
            return Err(if method == "sendBundle" {
                ExecutionError::BundleCreationFailed { reason }
            } else {
                ExecutionError::ServiceUnavailable { service: "Jito".to_string(), reason }
            });
        }

        match body.get("result") {
            Some(result) => Ok(serde_json::from_value(result.clone())?),
            None => Err(ExecutionError::ServiceUnavailable {
                service: "Jito".to_string(),
                reason: "Unexpected response format".to_string(),
            }),
        }
    }

    /// 从中继拉取tip账户
    pub async fn fetch_tip_accounts(&self) -> Result<Vec<Pubkey>, ExecutionError> {
        let accounts: Vec<String> = self.rpc_call(TIP_ACCOUNTS_PATH, "getTipAccounts", json!([])).await?;
        accounts
            .iter()
            .map(|a| Pubkey::from_str(a).map_err(|e| ExecutionError::Serialization(format!("Invalid tip account '{}': {}", a, e))))
            .collect()
    }
}

fn pick_random(accounts: &[Pubkey]) -> Option<Pubkey> {
    accounts.choose(&mut rand::thread_rng()).copied()
}

#[async_trait]
impl BundleRelay for RelayClient {
    async fn select_tip_account(&self) -> Result<Pubkey, ExecutionError> {
        if self.config.fetch_tip_accounts {
            match self.fetch_tip_accounts().await {
                Ok(remote) if !remote.is_empty() => {
                    if let Some(account) = pick_random(&remote) {
                        return Ok(account);
                    }
                }
                Ok(_) => warn!("⚠️ Relay returned no tip accounts, using configured list"),
                Err(e) => warn!("⚠️ Failed to fetch tip accounts: {}, using configured list", e),
            }
        }

        pick_random(&self.tip_accounts)
            .ok_or_else(|| ExecutionError::Configuration("No tip addresses configured".to_string()))
    }

    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<String, ExecutionError> {
        if transactions.is_empty() || transactions.len() > MAX_BUNDLE_SIZE {
            return Err(ExecutionError::BundleCreationFailed {
                reason: format!("bundle must contain 1..={} transactions, got {}", MAX_BUNDLE_SIZE, transactions.len()),
            });
        }

        let encoded = transactions
            .iter()
            .map(|tx| bincode::serialize(tx).map(|bytes| BASE64_STANDARD.encode(bytes)))
            .collect::<Result<Vec<_>, _>>()?;

        info!("📦 [Jito] 提交bundle，交易数: {}", encoded.len());

        let bundle_id: String = self
            .rpc_call(SEND_BUNDLE_PATH, "sendBundle", json!([encoded, { "encoding": "base64" }]))
            .await?;

        info!("✅ [Jito] bundle已提交: {}", bundle_id);
        Ok(bundle_id)
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<BundleStatus>, ExecutionError> {
        let result: Option<ContextValue<BundleStatus>> = self
            .rpc_call(BUNDLE_STATUSES_PATH, "getBundleStatuses", json!([[bundle_id]]))
            .await?;
        Ok(result.and_then(|r| r.value.into_iter().next().flatten()))
    }

    async fn get_inflight_bundle_status(&self, bundle_id: &str) -> Result<Option<InflightBundleStatus>, ExecutionError> {
        let result: Option<ContextValue<InflightBundleStatus>> = self
            .rpc_call(INFLIGHT_BUNDLE_STATUSES_PATH, "getInflightBundleStatuses", json!([[bundle_id]]))
            .await?;
        Ok(result.and_then(|r| r.value.into_iter().next().flatten()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::transaction_builder::compile_unsigned_transaction;
    use mockito::Matcher;
    use solana_sdk::{hash::Hash, system_instruction};

    fn status(json: Value) -> BundleStatus {
        serde_json::from_value(json).unwrap()
    }

    fn inflight(state: &str) -> InflightBundleStatus {
        serde_json::from_value(json!({ "bundle_id": "b1", "status": state, "landed_slot": null })).unwrap()
    }

    fn config_for(url: String) -> RelayConfig {
        RelayConfig { block_engine_url: url, ..RelayConfig::default() }
    }

    fn sample_tx() -> VersionedTransaction {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 1_000);
        compile_unsigned_transaction(&payer, &[ix], Hash::new_unique()).unwrap()
    }

    #[test]
    fn test_classify_confirmed_bundle() {
        let landed = status(json!({
            "bundle_id": "b1",
            "transactions": ["sig1"],
            "slot": 242,
            "confirmation_status": "confirmed",
            "err": { "Ok": null }
        }));
        assert_eq!(classify(Some(&landed), None), BundleOutcome::Landed);
    }

    #[test]
    fn test_classify_on_chain_error() {
        let failed = status(json!({
            "bundle_id": "b1",
            "slot": 242,
            "confirmation_status": "processed",
            "err": { "Err": { "InstructionError": [1, { "Custom": 6001 }] } }
        }));
        match classify(Some(&failed), None) {
            BundleOutcome::Failed(reason) => assert!(reason.contains("6001")),
            other => panic!("应判定为失败: {:?}", other),
        }
    }

    #[test]
    fn test_classify_inflight_states() {
        assert!(matches!(classify(None, Some(&inflight("Failed"))), BundleOutcome::Failed(_)));
        assert_eq!(classify(None, Some(&inflight("Pending"))), BundleOutcome::Pending);
        assert_eq!(classify(None, Some(&inflight("Invalid"))), BundleOutcome::Pending, "Invalid视为尚未可见");
        assert_eq!(classify(None, Some(&inflight("Landed"))), BundleOutcome::Pending, "Landed需等待确认");
        assert_eq!(classify(None, None), BundleOutcome::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_terminal_stops_at_deadline() {
        let relay = crate::executor::testing::FakeRelay::new();
        relay.push_status(None);

        let start = Instant::now();
        let result = relay
            .wait_for_terminal("bundle-1", Duration::from_millis(1_000), Duration::from_millis(400))
            .await;
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(ExecutionError::ConfirmationTimeout { timeout_ms: 1_000 })));
        assert!(elapsed >= Duration::from_millis(1_000), "过早超时: {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(1_100), "超时不应多等一个轮询间隔: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_send_bundle_posts_base64_batch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/bundles")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({ "jsonrpc": "2.0", "method": "sendBundle" })),
                Matcher::Regex(r#""encoding":"base64""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"bundle-123"}"#)
            .create_async()
            .await;

        let client = RelayClient::new(config_for(server.url())).unwrap();
        let bundle_id = client.send_bundle(&[sample_tx(), sample_tx()]).await.unwrap();

        assert_eq!(bundle_id, "bundle-123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_bundle_rpc_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/bundles")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"bundle contains an expired blockhash"}}"#)
            .create_async()
            .await;

        let client = RelayClient::new(config_for(server.url())).unwrap();
        let err = client.send_bundle(&[sample_tx()]).await.unwrap_err();

        assert!(matches!(err, ExecutionError::BundleCreationFailed { .. }), "实际错误: {:?}", err);
    }

    #[tokio::test]
    async fn test_get_bundle_status_parses_value() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/getBundleStatuses")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":243},"value":[{"bundle_id":"b1","transactions":["s1"],"slot":242,"confirmation_status":"finalized","err":{"Ok":null}}]}}"#)
            .create_async()
            .await;

        let client = RelayClient::new(config_for(server.url())).unwrap();
        let status = client.get_bundle_status("b1").await.unwrap().expect("应有状态");

        assert_eq!(status.slot, 242);
        assert_eq!(status.error(), None);
        assert_eq!(classify(Some(&status), None), BundleOutcome::Landed);
    }

    #[tokio::test]
    async fn test_unknown_bundle_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/getInflightBundleStatuses")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":{"context":{"slot":243},"value":[null]}}"#)
            .create_async()
            .await;

        let client = RelayClient::new(config_for(server.url())).unwrap();
        assert!(client.get_inflight_bundle_status("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/getBundleStatuses")
            .with_status(429)
            .create_async()
            .await;

        let client = RelayClient::new(config_for(server.url())).unwrap();
        let err = client.get_bundle_status("b1").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_select_tip_account_from_configured_list() {
        let client = RelayClient::new(RelayConfig::default()).unwrap();
        let configured = RelayConfig::default().parsed_tip_accounts().unwrap();

        let account = client.select_tip_account().await.unwrap();
        assert!(configured.contains(&account));
    }

    #[tokio::test]
    async fn test_select_tip_account_from_relay() {
        let remote = Pubkey::new_unique();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/getTipAccounts")
            .with_status(200)
            .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":["{}"]}}"#, remote))
            .create_async()
            .await;

        let mut config = config_for(server.url());
        config.fetch_tip_accounts = true;
        let client = RelayClient::new(config).unwrap();

        assert_eq!(client.select_tip_account().await.unwrap(), remote);
    }
}
