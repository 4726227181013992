//! ledger-batch
//!
//! Drives batches of ledger transactions (mints, marketplace calls, funding
//! transfers) from a set of wallets.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI command ──▶ Planner ──▶ BatchPlan
//!                                  │
//!                                  ▼
//!                          DispatchScheduler ──▶ TransactionSigner
//!                           │   │   │
//!            PreflightValidator │   NonceSequencer
//!                               ▼
//!                          LedgerClient ──HTTP──▶ ledger API
//!                               │
//!                               ▼
//!                     ResultAggregator ──▶ report file + console summary
//! ```
//!
//! Exit status is non-zero only when a batch had operations and none of
//! them was submitted, or on a configuration error.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ledger_batch::batch::{BatchPlan, DispatchScheduler, Planner};
use ledger_batch::config::loader::{load_config, load_default};
use ledger_batch::config::{NetworkKind, OrchestratorConfig};
use ledger_batch::ledger::{Ledger, LedgerClient};
use ledger_batch::lifecycle::signals::spawn_ctrl_c_handler;
use ledger_batch::lifecycle::Shutdown;
use ledger_batch::observability::{logging, metrics};
use ledger_batch::report::{console, store, BatchReport};
use ledger_batch::wallet::{Account, LocalKeySigner, WalletSet};

#[derive(Parser)]
#[command(name = "ledger-batch")]
#[command(about = "Bulk transaction orchestrator for NFT and marketplace contracts", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured network
    #[arg(short, long)]
    network: Option<NetworkKind>,

    /// Override the wallet file
    #[arg(short, long)]
    wallets: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balance and next nonce of every wallet
    Balances,
    /// Show total minted supply and per-wallet holdings
    Status,
    /// Mint single tokens from every wallet
    Mint {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// One bulk-mint call per wallet
    BulkMint {
        #[arg(short = 'n', long)]
        count: u32,
    },
    /// List every held token on the marketplace
    List {
        /// Price per token in micro-units
        #[arg(short, long)]
        price: u64,
    },
    /// Buy a listed token with one wallet
    Buy {
        #[arg(long)]
        wallet: u32,
        #[arg(long)]
        token: u64,
        /// Listing price in micro-units
        #[arg(long)]
        price: u64,
    },
    /// Cancel a listing owned by one wallet
    Cancel {
        #[arg(long)]
        wallet: u32,
        #[arg(long)]
        token: u64,
    },
    /// Fund every wallet from the source account
    Distribute {
        /// Amount per wallet in micro-units
        #[arg(short, long)]
        amount: u64,
    },
    /// Print a saved batch report
    Replay { report: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path, cli.network)?,
        None => load_default(cli.network)?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(network = %config.network.kind, "ledger-batch v0.1.0 starting");

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let wallet_file = cli
        .wallets
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.wallets.file));
    let client = LedgerClient::from_config(&config)?;
    let planner = Planner::from_config(&config)?;

    let (wallets, plan) = match cli.command {
        Commands::Balances => {
            let wallets = WalletSet::load(&wallet_file)?;
            return show_balances(&client, &wallets).await;
        }
        Commands::Status => {
            let wallets = WalletSet::load(&wallet_file)?;
            return show_status(&client, &planner, &wallets, &config).await;
        }
        Commands::Mint { count } => {
            let wallets = WalletSet::load(&wallet_file)?;
            let plan = planner.mint_each(&wallets, count);
            (wallets, plan)
        }
        Commands::BulkMint { count } => {
            let wallets = WalletSet::load(&wallet_file)?;
            let plan = planner.bulk_mint_each(&wallets, count);
            (wallets, plan)
        }
        Commands::List { price } => {
            let wallets = WalletSet::load(&wallet_file)?;
            let asset = asset_identifier(&config);
            let mut holdings = Vec::with_capacity(wallets.len());
            for account in wallets.iter() {
                match client.fetch_nft_holdings(&account.address, &asset).await {
                    Ok(tokens) => holdings.push((account, tokens)),
                    Err(e) => tracing::warn!(
                        account_id = account.id,
                        error = %e,
                        "Could not read holdings; wallet left out of the batch"
                    ),
                }
            }
            let plan = planner.list_holdings(holdings, price);
            (wallets, plan)
        }
        Commands::Buy {
            wallet,
            token,
            price,
        } => {
            let wallets = WalletSet::load(&wallet_file)?;
            let account = find_wallet(&wallets, wallet)?;
            let plan = planner.buy(account, token, price);
            (wallets, plan)
        }
        Commands::Cancel { wallet, token } => {
            let wallets = WalletSet::load(&wallet_file)?;
            let account = find_wallet(&wallets, wallet)?;
            let plan = planner.cancel(account, token);
            (wallets, plan)
        }
        Commands::Distribute { amount } => {
            let recipients = WalletSet::load(&wallet_file)?;
            let source = Account::from_env(
                0,
                &config.wallets.source_key_env,
                &config.wallets.source_address_env,
            )?;
            let plan = planner.distribute(&source, &recipients, amount);
            (WalletSet::new(vec![source])?, plan)
        }
        Commands::Replay { report } => return replay(&report, &config),
    };

    let report = run_batch(&config, client, &wallets, plan).await?;
    finish(&report, &config)
}

async fn run_batch(
    config: &OrchestratorConfig,
    client: LedgerClient,
    wallets: &WalletSet,
    plan: BatchPlan,
) -> Result<BatchReport, Box<dyn std::error::Error>> {
    if plan.is_empty() {
        tracing::warn!("Nothing to do: the plan has no operations");
    }

    let shutdown = Arc::new(Shutdown::new());
    let _ctrl_c = spawn_ctrl_c_handler(shutdown.clone());

    let scheduler = DispatchScheduler::new(
        Arc::new(client),
        Arc::new(LocalKeySigner),
        config,
        shutdown.subscribe(),
    );
    Ok(scheduler.run(wallets, plan).await?)
}

fn finish(report: &BatchReport, config: &OrchestratorConfig) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", console::render(report, &config.network.explorer_url));

    if config.report.persist {
        match store::persist(report, Path::new(&config.report.dir)) {
            Ok(path) => println!("Report saved to {}", path.display()),
            Err(e) => tracing::error!(error = %e, "Failed to save batch report"),
        }
    }

    if report.summary().all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

fn replay(path: &Path, config: &OrchestratorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = store::load(path)?;
    let recomputed = report.summary();
    match store::load_summary_snapshot(path) {
        Ok(snapshot) if snapshot != recomputed => tracing::warn!(
            path = %path.display(),
            "Stored summary differs from the recorded outcomes"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Report has no summary snapshot"),
    }
    print!("{}", console::render(&report, &config.network.explorer_url));
    if recomputed.all_failed() {
        std::process::exit(1);
    }
    Ok(())
}

fn find_wallet(wallets: &WalletSet, id: u32) -> Result<&Account, Box<dyn std::error::Error>> {
    wallets
        .get(id)
        .ok_or_else(|| format!("no wallet with id {}", id).into())
}

fn asset_identifier(config: &OrchestratorConfig) -> String {
    format!("{}::{}", config.contracts.nft, config.contracts.nft_asset)
}

async fn show_balances(
    client: &LedgerClient,
    wallets: &WalletSet,
) -> Result<(), Box<dyn std::error::Error>> {
    for account in wallets.iter() {
        let balance = client.fetch_balance(&account.address).await;
        let nonce = client.fetch_nonce(&account.address).await;
        match (balance, nonce) {
            (Ok(balance), Ok(nonce)) => println!(
                "wallet {:>3}  {}  balance {:>14}  next nonce {}",
                account.id, account.address, balance, nonce
            ),
            (Err(e), _) | (_, Err(e)) => {
                println!("wallet {:>3}  {}  unavailable: {}", account.id, account.address, e)
            }
        }
    }
    Ok(())
}

async fn show_status(
    client: &LedgerClient,
    planner: &Planner,
    wallets: &WalletSet,
    config: &OrchestratorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match client.total_minted(planner.nft()).await {
        Ok(total) => println!("{} total minted: {}", planner.nft(), total),
        Err(e) => println!("{} total minted: unavailable ({})", planner.nft(), e),
    }

    let asset = asset_identifier(config);
    for account in wallets.iter() {
        match client.fetch_nft_holdings(&account.address, &asset).await {
            Ok(tokens) => println!(
                "wallet {:>3}  {}  holds {} token(s) {:?}",
                account.id,
                account.address.short(),
                tokens.len(),
                tokens
            ),
            Err(e) => println!(
                "wallet {:>3}  {}  holdings unavailable: {}",
                account.id,
                account.address.short(),
                e
            ),
        }
    }
    Ok(())
}
