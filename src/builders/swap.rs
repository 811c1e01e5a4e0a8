use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::time::Duration;

use crate::builders::instruction::{ApiInstruction, InstructionSpec};
use crate::executor::{
    compute_budget::{ComputeBudgetConfig, TransactionKind},
    errors::ExecutionError,
    traits::{ChainClient, SwapTransaction},
    transaction_builder::compile_unsigned_transaction,
};

/// Jupiter 报价摘要 (完整报价以原始JSON回传给 /swap-instructions)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub in_amount: String,
    pub out_amount: String,
    #[serde(default)]
    pub other_amount_threshold: String,
    #[serde(default)]
    pub slippage_bps: u16,
    #[serde(default)]
    pub price_impact_pct: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JupiterQuote {
    pub summary: QuoteSummary,
    pub raw: Value,
}

impl JupiterQuote {
    pub fn expected_output(&self) -> Result<u64, ExecutionError> {
        self.summary
            .out_amount
            .parse()
            .map_err(|e| ExecutionError::Serialization(format!("Invalid outAmount '{}': {}", self.summary.out_amount, e)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapInstructionsResponse {
    #[serde(default)]
    compute_budget_instructions: Vec<ApiInstruction>,
    #[serde(default)]
    setup_instructions: Vec<ApiInstruction>,
    swap_instruction: ApiInstruction,
    #[serde(default)]
    cleanup_instruction: Option<ApiInstruction>,
    #[serde(default)]
    other_instructions: Vec<ApiInstruction>,
    #[serde(default)]
    address_lookup_table_addresses: Vec<String>,
}

/// Jupiter 聚合器兑换构建器
///
/// 只请求不依赖地址查找表的路由, 并限制账户数量, 保证交易可以放进单个数据包。
pub struct JupiterSwapBuilder {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    max_accounts: u8,
    compute_budget: ComputeBudgetConfig,
}

impl JupiterSwapBuilder {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        max_accounts: u8,
        compute_budget: ComputeBudgetConfig,
        timeout: Duration,
    ) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            max_accounts,
            compute_budget,
        })
    }

    async fn check_response(response: reqwest::Response) -> Result<Value, ExecutionError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ExecutionError::ServiceUnavailable {
                service: "Jupiter".to_string(),
                reason: format!("HTTP {}: {}", status, error_text),
            });
        }
        Ok(response.json().await?)
    }

    /// 获取报价
    pub async fn get_quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<JupiterQuote, ExecutionError> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}&asLegacyTransaction=true&maxAccounts={}",
            self.api_url, input_mint, output_mint, amount, slippage_bps, self.max_accounts
        );

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let raw = Self::check_response(request.send().await?).await?;
        if let Some(error) = raw.get("error") {
            return Err(ExecutionError::Build(format!("Jupiter quote failed: {}", error)));
        }

        let summary: QuoteSummary = serde_json::from_value(raw.clone())?;
        debug!("📈 Jupiter quote: in={} out={} impact={:?}", summary.in_amount, summary.out_amount, summary.price_impact_pct);
        Ok(JupiterQuote { summary, raw })
    }

    /// 获取兑换指令 (拒绝需要查找表的路由)
    pub async fn get_swap_instructions(
        &self,
        quote: &JupiterQuote,
        user: &Pubkey,
    ) -> Result<Vec<Instruction>, ExecutionError> {
        let body = json!({
            "quoteResponse": quote.raw,
            "userPublicKey": user.to_string(),
            "wrapAndUnwrapSol": true,
            "asLegacyTransaction": true,
            "dynamicComputeUnitLimit": true,
        });

        let mut request = self.client
            .post(format!("{}/swap-instructions", self.api_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let raw = Self::check_response(request.send().await?).await?;
        if let Some(error) = raw.get("error") {
            return Err(ExecutionError::Build(format!("Jupiter swap-instructions failed: {}", error)));
        }
        let response: SwapInstructionsResponse = serde_json::from_value(raw)?;

        if !response.address_lookup_table_addresses.is_empty() {
            return Err(ExecutionError::Build(format!(
                "swap route requires {} address lookup tables",
                response.address_lookup_table_addresses.len()
            )));
        }

        let mut instructions: Vec<Instruction> = if response.compute_budget_instructions.is_empty() {
            self.compute_budget.instructions_for(TransactionKind::Swap)
        } else {
            convert(response.compute_budget_instructions)?
        };
        instructions.extend(convert(response.setup_instructions)?);
        instructions.push(InstructionSpec::try_from(response.swap_instruction)?.into());
        if let Some(cleanup) = response.cleanup_instruction {
            instructions.push(InstructionSpec::try_from(cleanup)?.into());
        }
        instructions.extend(convert(response.other_instructions)?);

        Ok(instructions)
    }

    /// 构建兑换交易, 总是使用调用时刻的最新区块哈希
    pub async fn build(
        &self,
        chain: &dyn ChainClient,
        payer: &Pubkey,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<SwapTransaction, ExecutionError> {
        if amount == 0 {
            return Err(ExecutionError::InvalidParams("Swap amount cannot be zero".to_string()));
        }

        let quote = self.get_quote(input_mint, output_mint, amount, slippage_bps).await?;
        let expected_output = quote.expected_output()?;
        let instructions = self.get_swap_instructions(&quote, payer).await?;

        let (blockhash, _) = chain.get_latest_blockhash().await?;
        let transaction = compile_unsigned_transaction(payer, &instructions, blockhash)?;

        info!("🔄 [Swap] {} -> {}，输入: {}，预期输出: {}", input_mint, output_mint, amount, expected_output);
        Ok(SwapTransaction { transaction, expected_output })
    }
}

fn convert(instructions: Vec<ApiInstruction>) -> Result<Vec<Instruction>, ExecutionError> {
    instructions
        .into_iter()
        .map(|ix| InstructionSpec::try_from(ix).map(Instruction::from))
        .collect()
}
