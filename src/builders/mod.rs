pub mod instruction;
pub mod swap;
pub mod position;
pub mod transfer;
pub mod tip;

use async_trait::async_trait;
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::VersionedTransaction};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{parse_pubkey, AppConfig};
use crate::executor::{
    errors::ExecutionError,
    traits::{ChainClient, ComboParams, ComboTransactionBuilders, SwapTransaction},
};
use crate::utils::ui_to_raw;

pub use instruction::{AccountRole, AccountSpec, InstructionSpec};
pub use swap::{JupiterQuote, JupiterSwapBuilder};
pub use position::{DriftPositionBuilder, OrderParams, PerpMarket, SpotMarket};
pub use transfer::TokenTransferBuilder;
pub use tip::TipBuilder;

/// 组合交易中兑换、仓位、转账的固定参数
#[derive(Debug, Clone)]
pub struct ComboSettings {
    pub input_mint: Pubkey,
    pub input_decimals: u8,
    pub output_mint: Pubkey,
    pub default_slippage_bps: u16,
    pub max_slippage_bps: u16,
    pub market_name: String,
    pub sub_account_id: u16,
    pub transfer_mint: Pubkey,
    pub transfer_decimals: u8,
}

/// 协议构建器集合: Jupiter 兑换, Drift 做空, SPL 转账, 中继小费
pub struct ProtocolBuilders {
    chain: Arc<dyn ChainClient>,
    swap: JupiterSwapBuilder,
    position: DriftPositionBuilder,
    transfer: TokenTransferBuilder,
    tip: TipBuilder,
    settings: ComboSettings,
}

impl ProtocolBuilders {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        swap: JupiterSwapBuilder,
        position: DriftPositionBuilder,
        transfer: TokenTransferBuilder,
        settings: ComboSettings,
    ) -> Self {
        Self { chain, swap, position, transfer, tip: TipBuilder, settings }
    }

    pub fn from_app_config(
        chain: Arc<dyn ChainClient>,
        config: &AppConfig,
        jupiter_api_key: Option<String>,
    ) -> Result<Self, ExecutionError> {
        let swap = JupiterSwapBuilder::new(
            config.swap.api_url.clone(),
            jupiter_api_key,
            config.swap.max_accounts,
            config.compute_budget.clone(),
            Duration::from_millis(config.general.network_timeout_ms),
        )?;

        let perp_markets = config
            .position
            .perp_markets
            .iter()
            .map(|market| {
                Ok(PerpMarket {
                    name: market.name.clone(),
                    market_index: market.market_index,
                    oracle: parse_pubkey("perp market oracle", &market.oracle)?,
                })
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        let collateral = &config.position.collateral;
        let position = DriftPositionBuilder::new(
            parse_pubkey("position.program_id", &config.position.program_id)?,
            perp_markets,
            SpotMarket {
                market_index: collateral.market_index,
                mint: parse_pubkey("collateral mint", &collateral.mint)?,
                decimals: collateral.decimals,
                oracle: parse_pubkey("collateral oracle", &collateral.oracle)?,
            },
            config.compute_budget.clone(),
        );

        let settings = ComboSettings {
            input_mint: parse_pubkey("swap.input_mint", &config.swap.input_mint)?,
            input_decimals: config.swap.input_decimals,
            output_mint: parse_pubkey("swap.output_mint", &config.swap.output_mint)?,
            default_slippage_bps: config.general.default_slippage_bps,
            max_slippage_bps: config.general.max_slippage_bps,
            market_name: config.position.market_name.clone(),
            sub_account_id: config.position.sub_account_id,
            transfer_mint: parse_pubkey("transfer.mint", &config.transfer.mint)?,
            transfer_decimals: config.transfer.decimals,
        };

        Ok(Self::new(chain, swap, position, TokenTransferBuilder::new(config.compute_budget.clone()), settings))
    }

    fn slippage_bps(&self, params: &ComboParams) -> Result<u16, ExecutionError> {
        let slippage = params.slippage_bps.unwrap_or(self.settings.default_slippage_bps);
        if slippage > self.settings.max_slippage_bps {
            return Err(ExecutionError::InvalidParams(format!(
                "Slippage {}bps exceeds max {}bps", slippage, self.settings.max_slippage_bps
            )));
        }
        Ok(slippage)
    }
}

#[async_trait]
impl ComboTransactionBuilders for ProtocolBuilders {
    async fn build_swap(&self, payer: Pubkey, params: &ComboParams) -> Result<SwapTransaction, ExecutionError> {
        let amount = ui_to_raw(params.swap_amount, self.settings.input_decimals)?;
        let slippage = self.slippage_bps(params)?;
        self.swap
            .build(
                self.chain.as_ref(),
                &payer,
                &self.settings.input_mint,
                &self.settings.output_mint,
                amount,
                slippage,
            )
            .await
    }

    async fn build_short(
        &self,
        payer: Pubkey,
        params: &ComboParams,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        self.position
            .build(
                self.chain.as_ref(),
                &payer,
                &self.settings.market_name,
                params.short_size,
                params.deposit_amount(),
                self.settings.sub_account_id,
                shared_blockhash,
            )
            .await
    }

    async fn build_transfer(
        &self,
        payer: Pubkey,
        params: &ComboParams,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        self.transfer
            .build(
                self.chain.as_ref(),
                &payer,
                &params.recipient,
                &self.settings.transfer_mint,
                self.settings.transfer_decimals,
                params.transfer_amount,
                shared_blockhash,
            )
            .await
    }

    async fn build_tip(
        &self,
        payer: Pubkey,
        tip_account: Pubkey,
        lamports: u64,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        self.tip
            .build(self.chain.as_ref(), &payer, &tip_account, lamports, shared_blockhash)
            .await
    }
}
