//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the orchestrator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for a batch run.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Network selection and API endpoints.
    pub network: NetworkConfig,

    /// Contracts the operations call into.
    pub contracts: ContractsConfig,

    /// Fee schedule in micro-units.
    pub fees: FeeSchedule,

    /// Submission pacing.
    pub pacing: PacingConfig,

    /// Ledger HTTP transport settings.
    pub ledger: LedgerConfig,

    /// Read retry configuration.
    pub retries: RetryConfig,

    /// Batch report persistence.
    pub report: ReportConfig,

    /// Wallet sources.
    pub wallets: WalletsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which ledger network a batch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    #[default]
    Mainnet,
    Testnet,
}

impl NetworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
        }
    }

    /// Default public API for the network.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "https://api.mainnet.hiro.so",
            NetworkKind::Testnet => "https://api.testnet.hiro.so",
        }
    }
}

impl std::str::FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkKind::Mainnet),
            "testnet" => Ok(NetworkKind::Testnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// mainnet or testnet.
    pub kind: NetworkKind,

    /// Override for the ledger API base URL.
    pub api_url: Option<String>,

    /// Block explorer base used for report links.
    pub explorer_url: String,
}

impl NetworkConfig {
    /// The API base URL in effect (override or network default).
    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_url())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            kind: NetworkKind::Mainnet,
            api_url: None,
            explorer_url: "https://explorer.hiro.so".to_string(),
        }
    }
}

/// Contract identifiers in `ADDRESS.name` form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractsConfig {
    /// NFT contract exposing `mint`, `bulk-mint` and `get-total-minted`.
    pub nft: String,

    /// Asset name inside the NFT contract (used for holdings lookups).
    pub nft_asset: String,

    /// Marketplace contract exposing `list-nft`, `buy-nft`, `cancel-listing`.
    pub marketplace: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            nft: "SP31G2FZ5JN87BATZMP4ZRYE5F7WZQDNEXJ7G7X97.simple-nft-v4".to_string(),
            nft_asset: "simple-nft".to_string(),
            marketplace: "SP31G2FZ5JN87BATZMP4ZRYE5F7WZQDNEXJ7G7X97.nft-marketplace-v2"
                .to_string(),
        }
    }
}

/// Fee schedule, all values in micro-units.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeSchedule {
    /// Network fee attached to mint and cancel calls.
    pub contract_call_fee: u64,

    /// Network fee attached to marketplace list and buy calls.
    pub marketplace_call_fee: u64,

    /// Network fee attached to a plain token transfer.
    pub transfer_fee: u64,

    /// Price charged by the NFT contract per minted token.
    pub mint_price: u64,

    /// Listing fee charged by the marketplace.
    pub list_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            contract_call_fee: 10_000,
            marketplace_call_fee: 15_000,
            transfer_fee: 2_000,
            mint_price: 1_000,
            list_fee: 1_300,
        }
    }
}

/// Pacing between submissions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay between two operations of the same account.
    pub inter_operation_ms: u64,

    /// Delay between account groups.
    pub inter_account_ms: u64,

    /// Hard cap on submissions per second (token bucket). None disables it.
    pub max_submissions_per_second: Option<u32>,
}

impl PacingConfig {
    pub fn inter_operation(&self) -> Duration {
        Duration::from_millis(self.inter_operation_ms)
    }

    pub fn inter_account(&self) -> Duration {
        Duration::from_millis(self.inter_account_ms)
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            inter_operation_ms: 500,
            inter_account_ms: 300,
            max_submissions_per_second: None,
        }
    }
}

/// Ledger HTTP transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

/// Retry configuration for ledger reads. Submissions are never retried.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per read, including the first. 1 disables retries.
    pub max_read_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// A policy that performs exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_read_attempts: 1,
            ..Self::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_read_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 4_000,
        }
    }
}

/// Batch report persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Write a JSON report at the end of every batch.
    pub persist: bool,

    /// Directory for report files.
    pub dir: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            persist: true,
            dir: "reports".to_string(),
        }
    }
}

/// Wallet sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletsConfig {
    /// JSON file with `{ "wallets": [...] }`.
    pub file: String,

    /// Environment variable holding the distribution source key.
    pub source_key_env: String,

    /// Environment variable holding the distribution source address.
    pub source_address_env: String,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            file: "wallets.json".to_string(),
            source_key_env: "SOURCE_PRIVATE_KEY".to_string(),
            source_address_env: "SOURCE_ADDRESS".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
