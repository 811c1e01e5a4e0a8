pub mod seeds {
    pub const DRIFT_STATE_SEED: &[u8] = b"drift_state";

    pub const USER_SEED: &[u8] = b"user";

    pub const USER_STATS_SEED: &[u8] = b"user_stats";

    pub const PERP_MARKET_SEED: &[u8] = b"perp_market";

    pub const SPOT_MARKET_SEED: &[u8] = b"spot_market";

    pub const SPOT_MARKET_VAULT_SEED: &[u8] = b"spot_market_vault";
}

pub mod accounts {
    use solana_sdk::pubkey::Pubkey;

    pub const DRIFT: Pubkey = Pubkey::from_str_const("dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH");

    pub const TOKEN_PROGRAM: Pubkey = Pubkey::from_str_const("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

    pub const WSOL_MINT: Pubkey = Pubkey::from_str_const("So11111111111111111111111111111111111111112");

    pub const USDC_MINT: Pubkey = Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wNGGkZwyTDt1v");

    /// SOL-PERP 预言机 (Pyth pull)
    pub const SOL_PERP_ORACLE: Pubkey = Pubkey::from_str_const("BAtFj4kQttZRVep3UZS2aZRDixkGYgWsbqTBVDbnSsPF");

    /// USDC 现货市场预言机
    pub const USDC_SPOT_ORACLE: Pubkey = Pubkey::from_str_const("En8hkHLkRe9d9DraYmBTrus518BvmVH448YcvmrFM6Ce");
}

pub mod limits {
    /// 单笔交易序列化后的最大字节数 (与 PACKET_DATA_SIZE 一致)
    pub const MAX_TRANSACTION_SIZE: usize = solana_sdk::packet::PACKET_DATA_SIZE;

    /// 中继单个bundle最多包含的交易数
    pub const MAX_BUNDLE_SIZE: usize = 5;

    /// Drift 永续合约基础资产精度 (1e9)
    pub const BASE_PRECISION_DECIMALS: u8 = 9;
}

pub mod jito {
    pub const DEFAULT_TIP_ACCOUNTS: [&str; 8] = [
        "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5",
        "HFqU5x63VTqvQss8hp11i4wVV8bD44PvwucfZ2bU7gRe",
        "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY",
        "ADaUMid9yfUytqMBgopwjb2DTLSokTSzL1zt6iGPaS49",
        "DfXygSm4jCyNCybVYYK6DwvWqjKee8pbDmJGcLWNDXjh",
        "ADuUkR4vqLUMWXxW9gh6D6L8pMSawimctcNZ5pGwDcEt",
        "DttWaMuVvTiduZRnguLF7jNxTgiMBZ1hyAumKUiL2KRL",
        "3AVi9Tg9Uo68tJfuvoKvqKNWKkC5wPdSSdeBnizKZ6jT",
    ];

    pub const SEND_BUNDLE_PATH: &str = "/api/v1/bundles";

    pub const BUNDLE_STATUSES_PATH: &str = "/api/v1/getBundleStatuses";

    pub const INFLIGHT_BUNDLE_STATUSES_PATH: &str = "/api/v1/getInflightBundleStatuses";

    pub const TIP_ACCOUNTS_PATH: &str = "/api/v1/getTipAccounts";
}
