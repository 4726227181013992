//! HTTP ledger client with timeout and error classification.
//!
//! # Responsibilities
//! - Query account state (next nonce, balance, NFT holdings)
//! - Evaluate read-only contract functions
//! - Broadcast signed transactions and classify the response
//! - Map network failures, timeouts and 5xx responses to `Transport`

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::{OrchestratorConfig, RetryConfig};
use crate::ledger::clarity::ClarityValue;
use crate::ledger::types::{
    Address, ContractId, LedgerError, LedgerResult, SignedTransaction, SubmitResponse,
    UNKNOWN_ERROR_CODE,
};
use crate::ledger::Ledger;
use crate::observability::metrics;
use crate::resilience::retries::with_retries;

#[derive(Debug, Deserialize)]
struct NoncesResponse {
    possible_next_nonce: u64,
}

#[derive(Debug, Deserialize)]
struct StxBalanceResponse {
    balance: String,
}

#[derive(Debug, Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BroadcastRejection {
    error: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HoldingsResponse {
    #[serde(default)]
    results: Vec<Holding>,
}

#[derive(Debug, Deserialize)]
struct Holding {
    value: HoldingValue,
}

#[derive(Debug, Deserialize)]
struct HoldingValue {
    repr: String,
}

/// Ledger HTTP API client.
#[derive(Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryConfig,
}

impl LedgerClient {
    /// Create a client for the given API base URL.
    ///
    /// Reads perform a single attempt until [`with_read_retries`](Self::with_read_retries)
    /// is called.
    pub fn new(base_url: &str, timeout: Duration) -> LedgerResult<Self> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| LedgerError::InvalidUrl(format!("'{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            retry: RetryConfig::single_attempt(),
        })
    }

    /// Build a client from the orchestrator configuration, including read retries.
    pub fn from_config(config: &OrchestratorConfig) -> LedgerResult<Self> {
        let client = Self::new(
            config.network.api_url(),
            Duration::from_secs(config.ledger.timeout_secs),
        )?;
        tracing::info!(
            api_url = %client.base_url,
            network = %config.network.kind,
            read_attempts = config.retries.max_read_attempts,
            "Ledger client initialized"
        );
        Ok(client.with_read_retries(config.retries.clone()))
    }

    /// Retry transport failures on reads with the given policy.
    pub fn with_read_retries(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> LedgerResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LedgerError::InvalidUrl(format!("{}: {}", path, e)))
    }

    async fn get_json<T>(&self, url: Url, call: &'static str) -> LedgerResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let started = Instant::now();
        let result: LedgerResult<T> = async {
            let response = self.http.get(url).send().await.map_err(transport)?;
            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Err(LedgerError::Transport(format!("HTTP {}", status)));
            }
            if !status.is_success() {
                return Err(LedgerError::Protocol(format!("HTTP {}", status)));
            }
            response
                .json::<T>()
                .await
                .map_err(|e| LedgerError::Protocol(format!("unexpected response body: {}", e)))
        }
        .await;
        metrics::record_ledger_call(call, result.is_ok(), started.elapsed());
        result
    }

    async fn fetch_nonce_once(&self, address: &Address) -> LedgerResult<u64> {
        let url = self.endpoint(&format!("extended/v1/address/{}/nonces", address))?;
        let body: NoncesResponse = self.get_json(url, "fetch_nonce").await?;
        Ok(body.possible_next_nonce)
    }

    async fn fetch_balance_once(&self, address: &Address) -> LedgerResult<u64> {
        let url = self.endpoint(&format!("extended/v1/address/{}/stx", address))?;
        let body: StxBalanceResponse = self.get_json(url, "fetch_balance").await?;
        body.balance.trim().parse::<u64>().map_err(|_| {
            LedgerError::Protocol(format!("balance '{}' is not an integer", body.balance))
        })
    }

    async fn read_view_once(
        &self,
        contract: &ContractId,
        function: &str,
        arguments: &[String],
    ) -> LedgerResult<ClarityValue> {
        let url = self.endpoint(&format!(
            "v2/contracts/call-read/{}/{}/{}",
            contract.address, contract.name, function
        ))?;
        let body = serde_json::json!({
            "sender": contract.address.as_str(),
            "arguments": arguments,
        });

        let started = Instant::now();
        let result: LedgerResult<ClarityValue> = async {
            let response = self.http.post(url).json(&body).send().await.map_err(transport)?;
            let status = response.status();
            if status.is_server_error() {
                return Err(LedgerError::Transport(format!("HTTP {}", status)));
            }
            let parsed: CallReadResponse = response
                .json()
                .await
                .map_err(|e| LedgerError::Protocol(format!("unexpected call-read body: {}", e)))?;
            if !parsed.okay {
                return Err(LedgerError::ViewFailed(
                    parsed.cause.unwrap_or_else(|| "no cause given".to_string()),
                ));
            }
            let hex = parsed
                .result
                .ok_or_else(|| LedgerError::Protocol("call-read result missing".to_string()))?;
            Ok(ClarityValue::from_hex(&hex)?)
        }
        .await;
        metrics::record_ledger_call("read_view", result.is_ok(), started.elapsed());
        result
    }

    /// List the token ids of `asset_identifier` (`ADDR.contract::asset`) held by `address`.
    pub async fn fetch_nft_holdings(
        &self,
        address: &Address,
        asset_identifier: &str,
    ) -> LedgerResult<Vec<u64>> {
        with_retries(&self.retry, "fetch_nft_holdings", move || async move {
            let mut url = self.endpoint("extended/v1/tokens/nft/holdings")?;
            url.query_pairs_mut()
                .append_pair("principal", address.as_str())
                .append_pair("asset_identifiers", asset_identifier);
            let body: HoldingsResponse = self.get_json(url, "fetch_nft_holdings").await?;
            body.results
                .iter()
                .map(|h| parse_token_repr(&h.value.repr))
                .collect()
        })
        .await
    }

    /// Read `get-total-minted` from the NFT contract.
    pub async fn total_minted(&self, nft: &ContractId) -> LedgerResult<u128> {
        let value = self.read_view(nft, "get-total-minted", &[]).await?;
        Ok(value.expect_uint()?)
    }
}

/// Parse a holdings `repr` such as `u12`.
fn parse_token_repr(repr: &str) -> LedgerResult<u64> {
    repr.strip_prefix('u')
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| LedgerError::Protocol(format!("unexpected token repr '{}'", repr)))
}

fn transport(e: reqwest::Error) -> LedgerError {
    if e.is_timeout() {
        LedgerError::Transport(format!("request timed out: {}", e))
    } else {
        LedgerError::Transport(e.to_string())
    }
}

/// Classify a broadcast response.
///
/// Server errors are transport failures: whether the node kept the
/// transaction is unknown. A success status with an unreadable body is a
/// protocol error for the same reason.
pub(crate) fn classify_submit(status: StatusCode, body: &str) -> LedgerResult<SubmitResponse> {
    if status.is_server_error() {
        return Err(LedgerError::Transport(format!("HTTP {}: {}", status, body.trim())));
    }

    if let Ok(rejection) = serde_json::from_str::<BroadcastRejection>(body) {
        return Ok(SubmitResponse::Rejected {
            code: rejection
                .reason
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string()),
            message: rejection.error,
        });
    }

    if status.is_success() {
        return match serde_json::from_str::<String>(body) {
            Ok(txid) if !txid.is_empty() => Ok(SubmitResponse::Accepted { txid }),
            _ => Err(LedgerError::Protocol(format!(
                "HTTP {} with unreadable broadcast body: {}",
                status,
                body.trim()
            ))),
        };
    }

    Ok(SubmitResponse::Rejected {
        code: UNKNOWN_ERROR_CODE.to_string(),
        message: body.trim().to_string(),
    })
}

#[async_trait::async_trait]
impl Ledger for LedgerClient {
    async fn fetch_nonce(&self, address: &Address) -> LedgerResult<u64> {
        with_retries(&self.retry, "fetch_nonce", move || self.fetch_nonce_once(address)).await
    }

    async fn fetch_balance(&self, address: &Address) -> LedgerResult<u64> {
        with_retries(&self.retry, "fetch_balance", move || self.fetch_balance_once(address)).await
    }

    async fn read_view(
        &self,
        contract: &ContractId,
        function: &str,
        args: &[ClarityValue],
    ) -> LedgerResult<ClarityValue> {
        let arguments = args
            .iter()
            .map(ClarityValue::to_hex)
            .collect::<Result<Vec<_>, _>>()?;
        let arguments = arguments.as_slice();
        with_retries(&self.retry, "read_view", move || {
            self.read_view_once(contract, function, arguments)
        })
        .await
    }

    async fn submit(&self, tx: &SignedTransaction) -> LedgerResult<SubmitResponse> {
        let url = self.endpoint("v2/transactions")?;
        let started = Instant::now();

        let result: LedgerResult<SubmitResponse> = async {
            let response = self
                .http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(tx.bytes.clone())
                .send()
                .await
                .map_err(transport)?;
            let status = response.status();
            let body = response.text().await.map_err(transport)?;
            classify_submit(status, &body)
        }
        .await;

        metrics::record_ledger_call("submit", result.is_ok(), started.elapsed());
        result
    }
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("base_url", &self.base_url.as_str())
            .field("read_attempts", &self.retry.max_read_attempts)
            .finish()
    }
}
