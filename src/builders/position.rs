use borsh::BorshSerialize;
use log::info;
use solana_sdk::{hash::Hash, pubkey::Pubkey, transaction::VersionedTransaction};
use spl_associated_token_account::get_associated_token_address;

use crate::builders::instruction::{AccountRole, AccountSpec, InstructionSpec};
use crate::constant::{
    accounts::TOKEN_PROGRAM,
    limits::BASE_PRECISION_DECIMALS,
    seeds::{DRIFT_STATE_SEED, PERP_MARKET_SEED, SPOT_MARKET_SEED, SPOT_MARKET_VAULT_SEED, USER_SEED, USER_STATS_SEED},
};
use crate::executor::{
    compute_budget::{ComputeBudgetConfig, TransactionKind},
    errors::ExecutionError,
    traits::ChainClient,
    transaction_builder::compile_unsigned_transaction,
};
use crate::utils::ui_to_raw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum OrderType {
    Market,
    Limit,
    TriggerMarket,
    TriggerLimit,
    Oracle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum MarketType {
    Spot,
    Perp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum PositionDirection {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum PostOnlyParam {
    None,
    MustPostOnly,
    TryPostOnly,
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub enum OrderTriggerCondition {
    Above,
    Below,
    TriggeredAbove,
    TriggeredBelow,
}

/// place_perp_order 参数 (字段顺序即链上布局)
#[derive(Debug, Clone, BorshSerialize)]
pub struct OrderParams {
    pub order_type: OrderType,
    pub market_type: MarketType,
    pub direction: PositionDirection,
    pub user_order_id: u8,
    pub base_asset_amount: u64,
    pub price: u64,
    pub market_index: u16,
    pub reduce_only: bool,
    pub post_only: PostOnlyParam,
    pub bit_flags: u8,
    pub max_ts: Option<i64>,
    pub trigger_price: Option<u64>,
    pub trigger_condition: OrderTriggerCondition,
    pub oracle_price_offset: Option<i32>,
    pub auction_duration: Option<u8>,
    pub auction_start_price: Option<i64>,
    pub auction_end_price: Option<i64>,
}

impl OrderParams {
    /// 市价做空
    pub fn market_short(market_index: u16, base_asset_amount: u64) -> Self {
        Self {
            order_type: OrderType::Market,
            market_type: MarketType::Perp,
            direction: PositionDirection::Short,
            user_order_id: 0,
            base_asset_amount,
            price: 0,
            market_index,
            reduce_only: false,
            post_only: PostOnlyParam::None,
            bit_flags: 0,
            max_ts: None,
            trigger_price: None,
            trigger_condition: OrderTriggerCondition::Above,
            oracle_price_offset: None,
            auction_duration: None,
            auction_start_price: None,
            auction_end_price: None,
        }
    }
}

#[derive(Debug, Clone, BorshSerialize)]
struct DepositArgs {
    market_index: u16,
    amount: u64,
    reduce_only: bool,
}

/// 永续市场
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerpMarket {
    pub name: String,
    pub market_index: u16,
    pub oracle: Pubkey,
}

/// 保证金现货市场
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotMarket {
    pub market_index: u16,
    pub mint: Pubkey,
    pub decimals: u8,
    pub oracle: Pubkey,
}

/// Anchor 指令标识符: sha256("global:<name>")[..8]
pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let hash = solana_sdk::hash::hash(format!("global:{}", name).as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash.to_bytes()[..8]);
    discriminator
}

fn instruction_data<T: BorshSerialize>(name: &str, args: &T) -> Result<Vec<u8>, ExecutionError> {
    let mut data = anchor_discriminator(name).to_vec();
    args.serialize(&mut data)
        .map_err(|e| ExecutionError::Serialization(format!("Failed to encode {} args: {}", name, e)))?;
    Ok(data)
}

/// Drift 永续合约开空构建器 (可选附带保证金存入)
pub struct DriftPositionBuilder {
    program_id: Pubkey,
    perp_markets: Vec<PerpMarket>,
    collateral: SpotMarket,
    compute_budget: ComputeBudgetConfig,
}

impl DriftPositionBuilder {
    pub fn new(
        program_id: Pubkey,
        perp_markets: Vec<PerpMarket>,
        collateral: SpotMarket,
        compute_budget: ComputeBudgetConfig,
    ) -> Self {
        Self { program_id, perp_markets, collateral, compute_budget }
    }

    fn pda(&self, seeds: &[&[u8]]) -> Pubkey {
        Pubkey::find_program_address(seeds, &self.program_id).0
    }

    pub fn state_address(&self) -> Pubkey {
        self.pda(&[DRIFT_STATE_SEED])
    }

    pub fn user_address(&self, authority: &Pubkey, sub_account_id: u16) -> Pubkey {
        self.pda(&[USER_SEED, authority.as_ref(), &sub_account_id.to_le_bytes()])
    }

    pub fn user_stats_address(&self, authority: &Pubkey) -> Pubkey {
        self.pda(&[USER_STATS_SEED, authority.as_ref()])
    }

    pub fn perp_market_address(&self, market_index: u16) -> Pubkey {
        self.pda(&[PERP_MARKET_SEED, &market_index.to_le_bytes()])
    }

    pub fn spot_market_address(&self, market_index: u16) -> Pubkey {
        self.pda(&[SPOT_MARKET_SEED, &market_index.to_le_bytes()])
    }

    pub fn spot_market_vault_address(&self, market_index: u16) -> Pubkey {
        self.pda(&[SPOT_MARKET_VAULT_SEED, &market_index.to_le_bytes()])
    }

    pub fn find_market(&self, name: &str) -> Result<&PerpMarket, ExecutionError> {
        self.perp_markets
            .iter()
            .find(|market| market.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ExecutionError::Build(format!("unknown perp market: {}", name)))
    }

    /// 市价做空指令
    pub fn place_short_instruction(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        market: &PerpMarket,
        base_asset_amount: u64,
    ) -> Result<InstructionSpec, ExecutionError> {
        let params = OrderParams::market_short(market.market_index, base_asset_amount);

        Ok(InstructionSpec {
            program_id: self.program_id,
            accounts: vec![
                AccountSpec::new(self.state_address(), AccountRole::Readonly),
                AccountSpec::new(self.user_address(authority, sub_account_id), AccountRole::Writable),
                AccountSpec::new(*authority, AccountRole::ReadonlySigner),
                // remaining accounts: 预言机, 现货市场, 永续市场
                AccountSpec::new(market.oracle, AccountRole::Readonly),
                AccountSpec::new(self.spot_market_address(self.collateral.market_index), AccountRole::Readonly),
                AccountSpec::new(self.perp_market_address(market.market_index), AccountRole::Readonly),
            ],
            data: instruction_data("place_perp_order", &params)?,
        })
    }

    /// 保证金存入指令
    pub fn deposit_instruction(
        &self,
        authority: &Pubkey,
        sub_account_id: u16,
        amount: u64,
    ) -> Result<InstructionSpec, ExecutionError> {
        let spot = &self.collateral;
        let args = DepositArgs { market_index: spot.market_index, amount, reduce_only: false };

        Ok(InstructionSpec {
            program_id: self.program_id,
            accounts: vec![
                AccountSpec::new(self.state_address(), AccountRole::Readonly),
                AccountSpec::new(self.user_address(authority, sub_account_id), AccountRole::Writable),
                AccountSpec::new(self.user_stats_address(authority), AccountRole::Writable),
                AccountSpec::new(*authority, AccountRole::ReadonlySigner),
                AccountSpec::new(self.spot_market_vault_address(spot.market_index), AccountRole::Writable),
                AccountSpec::new(get_associated_token_address(authority, &spot.mint), AccountRole::Writable),
                AccountSpec::new(TOKEN_PROGRAM, AccountRole::Readonly),
                AccountSpec::new(spot.oracle, AccountRole::Readonly),
                AccountSpec::new(self.spot_market_address(spot.market_index), AccountRole::Writable),
            ],
            data: instruction_data("deposit", &args)?,
        })
    }

    /// 构建开空交易
    #[allow(clippy::too_many_arguments)]
    pub async fn build(
        &self,
        chain: &dyn ChainClient,
        payer: &Pubkey,
        market_name: &str,
        size: f64,
        collateral_deposit: Option<f64>,
        sub_account_id: u16,
        shared_blockhash: Option<Hash>,
    ) -> Result<VersionedTransaction, ExecutionError> {
        let market = self.find_market(market_name)?;
        let base_asset_amount = ui_to_raw(size, BASE_PRECISION_DECIMALS)?;
        if base_asset_amount == 0 {
            return Err(ExecutionError::InvalidParams("Short size cannot be zero".to_string()));
        }

        let user = self.user_address(payer, sub_account_id);
        if !chain.account_exists(&user).await? {
            return Err(ExecutionError::Build(format!("drift user account not initialized: {}", user)));
        }
        if !chain.account_exists(&market.oracle).await? {
            return Err(ExecutionError::Build("oracle unavailable".to_string()));
        }

        let mut instructions = self.compute_budget.instructions_for(TransactionKind::Position);
        if let Some(deposit) = collateral_deposit.filter(|amount| *amount > 0.0) {
            let amount = ui_to_raw(deposit, self.collateral.decimals)?;
            instructions.push(self.deposit_instruction(payer, sub_account_id, amount)?.into());
        }
        instructions.push(self.place_short_instruction(payer, sub_account_id, market, base_asset_amount)?.into());

        let blockhash = match shared_blockhash {
            Some(hash) => hash,
            None => chain.get_latest_blockhash().await?.0,
        };

        info!("📉 [Position] {} 做空 {}，保证金存入: {:?}", market.name, size, collateral_deposit);
        compile_unsigned_transaction(payer, &instructions, blockhash)
    }
}
