//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check contract identifiers and URLs parse
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: OrchestratorConfig → Result<(), Vec<ValidationError>>
//! - Runs before any batch work starts

use std::fmt;

use crate::config::schema::OrchestratorConfig;
use crate::ledger::ContractId;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(config.network.api_url()) {
        errors.push(ValidationError::new(
            "network.api_url",
            format!("invalid URL '{}': {}", config.network.api_url(), e),
        ));
    }
    if config.network.explorer_url.trim().is_empty() {
        errors.push(ValidationError::new("network.explorer_url", "must not be empty"));
    }

    for (field, value) in [
        ("contracts.nft", &config.contracts.nft),
        ("contracts.marketplace", &config.contracts.marketplace),
    ] {
        if let Err(e) = value.parse::<ContractId>() {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
    if config.contracts.nft_asset.trim().is_empty() {
        errors.push(ValidationError::new("contracts.nft_asset", "must not be empty"));
    }

    if config.fees.contract_call_fee == 0 {
        errors.push(ValidationError::new("fees.contract_call_fee", "must be > 0"));
    }
    if config.fees.marketplace_call_fee == 0 {
        errors.push(ValidationError::new("fees.marketplace_call_fee", "must be > 0"));
    }
    if config.fees.transfer_fee == 0 {
        errors.push(ValidationError::new("fees.transfer_fee", "must be > 0"));
    }

    if config.pacing.max_submissions_per_second == Some(0) {
        errors.push(ValidationError::new(
            "pacing.max_submissions_per_second",
            "must be > 0 when set",
        ));
    }

    if config.ledger.timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.timeout_secs", "must be > 0"));
    }

    if config.retries.max_read_attempts == 0 {
        errors.push(ValidationError::new("retries.max_read_attempts", "must be >= 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.report.persist && config.report.dir.trim().is_empty() {
        errors.push(ValidationError::new("report.dir", "must not be empty when persist = true"));
    }

    if config.wallets.file.trim().is_empty() {
        errors.push(ValidationError::new("wallets.file", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&OrchestratorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = OrchestratorConfig::default();
        config.contracts.nft = "no-dot-here".to_string();
        config.ledger.timeout_secs = 0;
        config.retries.max_read_attempts = 0;
        config.network.api_url = Some("not a url".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "network.api_url",
                "contracts.nft",
                "ledger.timeout_secs",
                "retries.max_read_attempts"
            ]
        );
    }

    #[test]
    fn test_zero_rate_cap_rejected() {
        let mut config = OrchestratorConfig::default();
        config.pacing.max_submissions_per_second = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "pacing.max_submissions_per_second");
    }
}
