use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::{error, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use solana_combo::{
    config::{AppConfig, ConfigManager},
    executor::{
        compatibility::check_base64_transaction,
        progress::{BundleProgress, BundleStep, TransactionProgress, TransactionStatus},
        traits::TransactionSigner,
    },
    BundleExecutor, ComboOrchestrator, ComboParams, ExecutorConfig, KeypairSigner,
    ProgressStream, ProtocolBuilders, RelayClient, RpcChainClient, SequentialExecutor,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 顺序执行 swap -> short -> transfer (逐笔确认)
    Sequential(ComboArgs),
    /// 以原子bundle提交 swap -> short -> transfer -> tip
    Bundle(ComboArgs),
    /// 生成默认配置文件
    GenerateConfig,
    /// 验证配置文件
    ValidateConfig,
    /// 显示配置摘要
    ShowConfig,
    /// 检查base64交易是否满足中继限制
    CheckTx {
        transaction: String,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct ComboArgs {
    /// 兑换输入数量 (UI单位)
    #[arg(long)]
    swap_amount: f64,

    /// 做空仓位大小
    #[arg(long)]
    short_size: f64,

    /// 转账数量 (UI单位)
    #[arg(long)]
    transfer_amount: f64,

    /// 转账接收地址
    #[arg(long)]
    recipient: String,

    /// 保证金存入 (0 表示跳过)
    #[arg(long)]
    deposit: Option<f64>,

    #[arg(long)]
    slippage_bps: Option<u16>,

    /// bundle小费 (lamports)
    #[arg(long)]
    tip_lamports: Option<u64>,
}

impl ComboArgs {
    fn into_params(self) -> Result<ComboParams> {
        let recipient = Pubkey::from_str(&self.recipient)
            .map_err(|e| anyhow::anyhow!("Invalid recipient '{}': {}", self.recipient, e))?;
        Ok(ComboParams {
            swap_amount: self.swap_amount,
            short_size: self.short_size,
            transfer_amount: self.transfer_amount,
            recipient,
            collateral_deposit: self.deposit,
            slippage_bps: self.slippage_bps,
            tip_lamports: self.tip_lamports,
        })
    }
}

fn init_logging(level: &str) {
    // RUST_LOG 优先于配置文件
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn build_orchestrator(config_manager: &ConfigManager) -> Result<ComboOrchestrator> {
    let app_config = &config_manager.app_config;
    let executor_config = ExecutorConfig::from_app_config(app_config, config_manager.relay_auth_uuid.clone())?;

    let chain = Arc::new(RpcChainClient::new(
        app_config.rpc.endpoint.clone(),
        RpcChainClient::parse_commitment(&app_config.rpc.commitment)?,
        Duration::from_secs(app_config.rpc.timeout_seconds),
    ));
    info!("🔗 RPC端点: {}", chain.url());

    let builders = Arc::new(ProtocolBuilders::from_app_config(
        chain.clone(),
        app_config,
        config_manager.jupiter_api_key.clone(),
    )?);
    let relay = Arc::new(RelayClient::new(executor_config.relay.clone())?);
    info!("📦 Block Engine: {}", executor_config.relay.block_engine_url);

    let wallet: Option<Arc<dyn TransactionSigner>> = match config_manager.clone_wallet_keypair() {
        Ok(keypair) => {
            let signer = KeypairSigner::new(keypair);
            info!("👛 钱包: {}", signer.pubkey());
            Some(Arc::new(signer))
        }
        Err(_) => {
            warn!("⚠️ 未加载钱包");
            None
        }
    };

    Ok(ComboOrchestrator::new(
        builders.clone(),
        SequentialExecutor::new(chain, executor_config.sequential.clone()),
        BundleExecutor::new(builders, relay, executor_config.bundle.clone()),
        wallet,
    ))
}

async fn run_sequential(orchestrator: &ComboOrchestrator, params: ComboParams) -> Result<bool> {
    let (progress, mut rx) = ProgressStream::<Vec<TransactionProgress>>::channel();
    let reporter = tokio::spawn(async move {
        let mut previous: Vec<TransactionProgress> = Vec::new();
        while let Some(snapshot) = rx.recv().await {
            // 只打印与上一个快照不同的条目
            for entry in snapshot.iter().filter(|entry| entry.status != TransactionStatus::Pending) {
                if previous.get(entry.index) != Some(entry) {
                    report_transaction(entry);
                }
            }
            previous = snapshot;
        }
    });

    let result = orchestrator.execute_sequential(params, progress).await;
    reporter.await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

fn report_transaction(event: &TransactionProgress) {
    match event.status {
        TransactionStatus::Failed => error!(
            "❌ [{}] {} 失败: {}", event.index, event.name, event.error.as_deref().unwrap_or("unknown")
        ),
        TransactionStatus::Confirmed => info!(
            "✅ [{}] {} 已确认: {}", event.index, event.name, event.signature.as_deref().unwrap_or("-")
        ),
        status => info!("⏳ [{}] {} -> {:?}", event.index, event.name, status),
    }
}

async fn run_bundle(orchestrator: &ComboOrchestrator, params: ComboParams) -> Result<bool> {
    let (progress, mut rx) = ProgressStream::<BundleProgress>::channel();
    let reporter = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.step {
                BundleStep::Error => error!("❌ Bundle失败: {}", event.error.as_deref().unwrap_or("unknown")),
                BundleStep::Success => info!("🎉 Bundle已上链: {}", event.bundle_id.as_deref().unwrap_or("-")),
                step => info!(
                    "⏳ Bundle {:?} (预期输出: {:?}, bundle: {:?})",
                    step, event.expected_swap_output, event.bundle_id
                ),
            }
        }
    });

    let result = orchestrator.execute_bundle(params, progress).await;
    reporter.await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件
    if dotenvy::dotenv().is_err() {
        // .env 文件不存在或读取失败，继续执行（环境变量可能通过其他方式设置）
        eprintln!("Warning: Could not load .env file");
    }

    let args = Args::parse();

    let combo = match args.command {
        Command::GenerateConfig => {
            init_logging("info");
            ConfigManager::generate_default_config_file(&args.config)?;
            info!("默认配置文件已生成: {}", args.config);
            return Ok(());
        }
        Command::CheckTx { transaction } => {
            let report = check_base64_transaction(&transaction);
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
        Command::ValidateConfig => {
            init_logging("info");
            match AppConfig::load_with_env_override(&args.config) {
                Ok(_) => info!("配置文件验证通过"),
                Err(e) => {
                    error!("配置文件验证失败: {}", e);
                    return Err(e.into());
                }
            }
            return Ok(());
        }
        Command::ShowConfig => None,
        Command::Sequential(combo) => Some((false, combo)),
        Command::Bundle(combo) => Some((true, combo)),
    };

    // 加载配置
    let config_manager = ConfigManager::load_from_file(&args.config)?;
    init_logging(&config_manager.app_config.logging.level);

    let Some((as_bundle, combo)) = combo else {
        println!("{}", config_manager.get_config_summary());
        return Ok(());
    };

    let params = combo.into_params()?;
    let orchestrator = build_orchestrator(&config_manager)?;

    let success = if as_bundle {
        run_bundle(&orchestrator, params).await?
    } else {
        run_sequential(&orchestrator, params).await?
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
