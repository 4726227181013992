//! Operations and batch plans.

use serde::{Deserialize, Serialize};

use crate::config::NetworkKind;
use crate::ledger::{Address, ContractId};
use crate::wallet::{ClarityArg, TransactionDraft, TransactionPayload};

/// What an operation does, with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    Mint {
        contract: ContractId,
    },
    BulkMint {
        contract: ContractId,
        count: u32,
        recipient: Address,
    },
    List {
        contract: ContractId,
        token_id: u64,
        price: u64,
    },
    Buy {
        contract: ContractId,
        token_id: u64,
        price: u64,
    },
    Cancel {
        contract: ContractId,
        token_id: u64,
    },
    Transfer {
        recipient: Address,
        amount: u64,
        #[serde(default)]
        memo: String,
    },
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Mint { .. } => "mint",
            OperationKind::BulkMint { .. } => "bulk_mint",
            OperationKind::List { .. } => "list",
            OperationKind::Buy { .. } => "buy",
            OperationKind::Cancel { .. } => "cancel",
            OperationKind::Transfer { .. } => "transfer",
        }
    }

    fn payload(&self) -> TransactionPayload {
        let call = |contract: &ContractId, function: &str, args: Vec<ClarityArg>| {
            TransactionPayload::ContractCall {
                contract: contract.clone(),
                function: function.to_string(),
                args,
            }
        };
        match self {
            OperationKind::Mint { contract } => call(contract, "mint", Vec::new()),
            OperationKind::BulkMint {
                contract,
                count,
                recipient,
            } => call(
                contract,
                "bulk-mint",
                vec![
                    ClarityArg::Uint(u128::from(*count)),
                    ClarityArg::Principal(recipient.clone()),
                ],
            ),
            OperationKind::List {
                contract,
                token_id,
                price,
            } => call(
                contract,
                "list-nft",
                vec![ClarityArg::Uint(u128::from(*token_id)), ClarityArg::Uint(u128::from(*price))],
            ),
            OperationKind::Buy {
                contract, token_id, ..
            } => call(contract, "buy-nft", vec![ClarityArg::Uint(u128::from(*token_id))]),
            OperationKind::Cancel { contract, token_id } => {
                call(contract, "cancel-listing", vec![ClarityArg::Uint(u128::from(*token_id))])
            }
            OperationKind::Transfer {
                recipient,
                amount,
                memo,
            } => TransactionPayload::TokenTransfer {
                recipient: recipient.clone(),
                amount: *amount,
                memo: memo.clone(),
            },
        }
    }
}

/// One transaction-producing unit of work. Immutable once planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Sending account.
    pub account: Address,
    #[serde(flatten)]
    pub kind: OperationKind,
    /// Network fee in micro-units.
    pub fee: u64,
    /// Value leaving the account besides the fee (prices, amounts).
    pub value: u64,
    /// Balance the account must hold for the operation to be attempted.
    pub min_required_balance: u64,
}

impl Operation {
    /// Operation whose required balance is exactly its spend.
    pub fn new(account: Address, kind: OperationKind, fee: u64, value: u64) -> Self {
        Self {
            account,
            kind,
            fee,
            value,
            min_required_balance: value.saturating_add(fee),
        }
    }

    pub fn with_min_required_balance(mut self, required: u64) -> Self {
        self.min_required_balance = required;
        self
    }

    /// Total debit if the operation is accepted.
    pub fn spend(&self) -> u64 {
        self.value.saturating_add(self.fee)
    }

    pub fn to_draft(&self, nonce: u64, network: NetworkKind) -> TransactionDraft {
        TransactionDraft {
            sender: self.account.clone(),
            nonce,
            fee: self.fee,
            network,
            payload: self.kind.payload(),
        }
    }
}

/// Operations of one account, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountGroup {
    pub address: Address,
    pub operations: Vec<Operation>,
}

/// Ordered operations grouped by account.
///
/// Groups appear in the order their account first appears; operations keep
/// their relative order within an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    groups: Vec<AccountGroup>,
}

impl BatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Operation) {
        match self
            .groups
            .iter_mut()
            .find(|group| group.address == operation.account)
        {
            Some(group) => group.operations.push(operation),
            None => self.groups.push(AccountGroup {
                address: operation.account.clone(),
                operations: vec![operation],
            }),
        }
    }

    pub fn groups(&self) -> &[AccountGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<AccountGroup> {
        self.groups
    }

    /// All operations in plan order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.groups.iter().flat_map(|group| group.operations.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.operations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Operation> for BatchPlan {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        let mut plan = BatchPlan::new();
        for operation in iter {
            plan.push(operation);
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nft() -> ContractId {
        "ST1NFT.simple-nft-v4".parse().unwrap()
    }

    fn mint(account: &str) -> Operation {
        Operation::new(account.parse().unwrap(), OperationKind::Mint { contract: nft() }, 10_000, 1_000)
    }

    #[test]
    fn test_plan_groups_by_first_appearance() {
        let plan: BatchPlan = vec![mint("ST1A"), mint("ST1B"), mint("ST1A"), mint("ST1C")]
            .into_iter()
            .collect();

        let order: Vec<_> = plan.groups().iter().map(|g| g.address.as_str()).collect();
        assert_eq!(order, vec!["ST1A", "ST1B", "ST1C"]);
        assert_eq!(plan.groups()[0].operations.len(), 2);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn test_spend_and_requirement() {
        let op = mint("ST1A");
        assert_eq!(op.spend(), 11_000);
        assert_eq!(op.min_required_balance, 11_000);
        assert_eq!(op.with_min_required_balance(11_001).min_required_balance, 11_001);
    }

    #[test]
    fn test_bulk_mint_draft() {
        let op = Operation::new(
            "ST1A".parse().unwrap(),
            OperationKind::BulkMint {
                contract: nft(),
                count: 15,
                recipient: "ST1A".parse().unwrap(),
            },
            10_000,
            15_000,
        );
        let draft = op.to_draft(9, NetworkKind::Mainnet);
        assert_eq!(draft.nonce, 9);
        match draft.payload {
            TransactionPayload::ContractCall { function, args, .. } => {
                assert_eq!(function, "bulk-mint");
                assert_eq!(args[0], ClarityArg::Uint(15));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_transfer_draft() {
        let op = Operation::new(
            "ST1SRC".parse().unwrap(),
            OperationKind::Transfer {
                recipient: "ST1DST".parse().unwrap(),
                amount: 500_000,
                memo: "Funding wallet 3".to_string(),
            },
            2_000,
            500_000,
        );
        assert!(matches!(
            op.to_draft(0, NetworkKind::Testnet).payload,
            TransactionPayload::TokenTransfer { amount: 500_000, .. }
        ));
    }

    #[test]
    fn test_operation_json_is_flat() {
        let json = serde_json::to_value(mint("ST1A")).unwrap();
        assert_eq!(json["kind"], "mint");
        assert_eq!(json["account"], "ST1A");
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, mint("ST1A"));
    }
}
