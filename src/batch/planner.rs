//! Builds batch plans for the CLI commands.
//!
//! Required balances:
//! - mint: price + call fee
//! - bulk mint: price × count + call fee
//! - list: listing fee + marketplace call fee
//! - buy: price + marketplace call fee
//! - cancel: call fee
//! - transfer: amount + transfer fee

use crate::batch::operation::{BatchPlan, Operation, OperationKind};
use crate::config::validation::ValidationError;
use crate::config::{ConfigError, FeeSchedule, OrchestratorConfig};
use crate::ledger::{Address, ContractId};
use crate::wallet::{Account, WalletSet};

/// Turns commands into operations priced from the fee schedule.
#[derive(Debug, Clone)]
pub struct Planner {
    fees: FeeSchedule,
    nft: ContractId,
    marketplace: ContractId,
}

impl Planner {
    pub fn new(fees: FeeSchedule, nft: ContractId, marketplace: ContractId) -> Self {
        Self {
            fees,
            nft,
            marketplace,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, ConfigError> {
        let parse = |field: &'static str, value: &str| {
            value.parse::<ContractId>().map_err(|e| {
                ConfigError::Validation(vec![ValidationError::new(field, e.to_string())])
            })
        };
        Ok(Self::new(
            config.fees.clone(),
            parse("contracts.nft", &config.contracts.nft)?,
            parse("contracts.marketplace", &config.contracts.marketplace)?,
        ))
    }

    pub fn nft(&self) -> &ContractId {
        &self.nft
    }

    /// `count` single mints per wallet.
    pub fn mint_each(&self, wallets: &WalletSet, count: u32) -> BatchPlan {
        wallets
            .iter()
            .flat_map(|account| (0..count).map(move |_| self.mint(&account.address)))
            .collect()
    }

    pub fn mint(&self, account: &Address) -> Operation {
        Operation::new(
            account.clone(),
            OperationKind::Mint {
                contract: self.nft.clone(),
            },
            self.fees.contract_call_fee,
            self.fees.mint_price,
        )
    }

    /// One bulk mint of `count` per wallet, minted to itself.
    ///
    /// The contract caps `count` per call; out-of-range counts are sent anyway
    /// and come back as rejections.
    pub fn bulk_mint_each(&self, wallets: &WalletSet, count: u32) -> BatchPlan {
        wallets
            .iter()
            .map(|account| {
                Operation::new(
                    account.address.clone(),
                    OperationKind::BulkMint {
                        contract: self.nft.clone(),
                        count,
                        recipient: account.address.clone(),
                    },
                    self.fees.contract_call_fee,
                    self.fees.mint_price.saturating_mul(u64::from(count)),
                )
            })
            .collect()
    }

    /// List every held token at `price`.
    pub fn list_holdings<'a, I>(&self, holdings: I, price: u64) -> BatchPlan
    where
        I: IntoIterator<Item = (&'a Account, Vec<u64>)>,
    {
        holdings
            .into_iter()
            .flat_map(|(account, tokens)| {
                tokens.into_iter().map(move |token_id| {
                    Operation::new(
                        account.address.clone(),
                        OperationKind::List {
                            contract: self.marketplace.clone(),
                            token_id,
                            price,
                        },
                        self.fees.marketplace_call_fee,
                        self.fees.list_fee,
                    )
                })
            })
            .collect()
    }

    pub fn buy(&self, account: &Account, token_id: u64, price: u64) -> BatchPlan {
        std::iter::once(Operation::new(
            account.address.clone(),
            OperationKind::Buy {
                contract: self.marketplace.clone(),
                token_id,
                price,
            },
            self.fees.marketplace_call_fee,
            price,
        ))
        .collect()
    }

    pub fn cancel(&self, account: &Account, token_id: u64) -> BatchPlan {
        std::iter::once(Operation::new(
            account.address.clone(),
            OperationKind::Cancel {
                contract: self.marketplace.clone(),
                token_id,
            },
            self.fees.contract_call_fee,
            0,
        ))
        .collect()
    }

    /// One transfer of `amount` from `source` to each recipient.
    pub fn distribute(&self, source: &Account, recipients: &WalletSet, amount: u64) -> BatchPlan {
        recipients
            .iter()
            .filter(|recipient| recipient.address != source.address)
            .map(|recipient| {
                Operation::new(
                    source.address.clone(),
                    OperationKind::Transfer {
                        recipient: recipient.address.clone(),
                        amount,
                        memo: format!("Funding wallet {}", recipient.id),
                    },
                    self.fees.transfer_fee,
                    amount,
                )
            })
            .collect()
    }
}
