//! End-to-end batch scenarios with a scripted in-memory ledger.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use ledger_batch::batch::{
    AccountLocks, BatchError, BatchPlan, DispatchScheduler, Operation, OperationKind, Planner,
};
use ledger_batch::config::OrchestratorConfig;
use ledger_batch::ledger::{
    Address, ClarityValue, ContractId, Ledger, LedgerError, LedgerResult, SignedTransaction,
    SubmitResponse,
};
use ledger_batch::lifecycle::{Shutdown, ShutdownSignal};
use ledger_batch::report::{store, Outcome, SkipReason};
use ledger_batch::wallet::{
    Account, LocalKeySigner, SignError, SigningKey, TransactionDraft, TransactionSigner, WalletSet,
};

const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const ALICE: &str = "ST1ALICE";
const BOB: &str = "ST1BOB";

#[derive(Clone)]
enum Reply {
    Accept,
    Reject(&'static str, &'static str),
    Transport,
}

#[derive(Default)]
struct ScriptedLedger {
    balances: HashMap<Address, u64>,
    nonces: HashMap<Address, u64>,
    unreachable: HashSet<Address>,
    replies: Mutex<VecDeque<Reply>>,
    submitted: Mutex<Vec<(Address, u64)>>,
    cancel_after_submit: Option<(usize, Arc<Shutdown>)>,
    reject_bulk_over: Option<u32>,
}

impl ScriptedLedger {
    fn account(mut self, address: &str, balance: u64, nonce: u64) -> Self {
        self.balances.insert(addr(address), balance);
        self.nonces.insert(addr(address), nonce);
        self
    }

    fn replies(self, replies: Vec<Reply>) -> Self {
        *self.replies.lock().unwrap() = replies.into();
        self
    }

    fn submitted_nonces(&self, address: &str) -> Vec<u64> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a.as_str() == address)
            .map(|(_, n)| *n)
            .collect()
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    async fn fetch_nonce(&self, address: &Address) -> LedgerResult<u64> {
        if self.unreachable.contains(address) {
            return Err(LedgerError::Transport("connection reset".into()));
        }
        Ok(self.nonces.get(address).copied().unwrap_or(0))
    }

    async fn fetch_balance(&self, address: &Address) -> LedgerResult<u64> {
        if self.unreachable.contains(address) {
            return Err(LedgerError::Transport("connection reset".into()));
        }
        Ok(self.balances.get(address).copied().unwrap_or(0))
    }

    async fn read_view(
        &self,
        _contract: &ContractId,
        _function: &str,
        _args: &[ClarityValue],
    ) -> LedgerResult<ClarityValue> {
        Ok(ClarityValue::UInt(0))
    }

    async fn submit(&self, tx: &SignedTransaction) -> LedgerResult<SubmitResponse> {
        let count = {
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push((tx.sender.clone(), tx.nonce));
            submitted.len()
        };
        if let Some((after, shutdown)) = &self.cancel_after_submit {
            if count == *after {
                shutdown.trigger();
            }
        }

        if let Some(max) = self.reject_bulk_over {
            if let Some(requested) = bulk_count(&tx.bytes) {
                if requested > u64::from(max) {
                    return Ok(SubmitResponse::Rejected {
                        code: "(err u104)".to_string(),
                        message: "transaction rejected".to_string(),
                    });
                }
            }
        }

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Reply::Accept);
        match reply {
            Reply::Accept => Ok(SubmitResponse::Accepted {
                txid: format!("0x{}{:04}", tx.sender, tx.nonce),
            }),
            Reply::Reject(code, message) => Ok(SubmitResponse::Rejected {
                code: code.to_string(),
                message: message.to_string(),
            }),
            Reply::Transport => Err(LedgerError::Transport("timed out".into())),
        }
    }
}

/// Read the bulk-mint count out of a locally signed envelope.
fn bulk_count(bytes: &[u8]) -> Option<u64> {
    let draft_len = bytes.len().checked_sub(65)?;
    let draft: serde_json::Value = serde_json::from_slice(&bytes[..draft_len]).ok()?;
    if draft["payload"]["function"] != "bulk-mint" {
        return None;
    }
    draft["payload"]["args"][0]["value"].as_u64()
}

/// Signs with a fixed byte layout; optionally declines the first request.
#[derive(Default)]
struct TestSigner {
    decline_first: AtomicBool,
}

#[async_trait]
impl TransactionSigner for TestSigner {
    async fn sign(
        &self,
        _account: &Account,
        draft: &TransactionDraft,
    ) -> Result<SignedTransaction, SignError> {
        if self.decline_first.swap(false, Ordering::SeqCst) {
            return Err(SignError::UserCancelled);
        }
        Ok(SignedTransaction {
            sender: draft.sender.clone(),
            nonce: draft.nonce,
            bytes: draft.nonce.to_be_bytes().to_vec(),
        })
    }
}

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn wallets() -> WalletSet {
    WalletSet::new(vec![
        Account::new(1, addr(ALICE), SigningKey::parse(TEST_KEY).unwrap()),
        Account::new(2, addr(BOB), SigningKey::parse(TEST_KEY).unwrap()),
    ])
    .unwrap()
}

fn config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.pacing.inter_operation_ms = 0;
    config.pacing.inter_account_ms = 0;
    config
}

fn planner() -> Planner {
    Planner::from_config(&config()).unwrap()
}

fn scheduler(
    ledger: Arc<ScriptedLedger>,
    signer: Arc<dyn TransactionSigner>,
    signal: ShutdownSignal,
) -> DispatchScheduler {
    paced_scheduler(ledger, signer, signal, &config())
}

fn paced_scheduler(
    ledger: Arc<ScriptedLedger>,
    signer: Arc<dyn TransactionSigner>,
    signal: ShutdownSignal,
    config: &OrchestratorConfig,
) -> DispatchScheduler {
    DispatchScheduler::new(ledger, signer, config, signal).with_locks(AccountLocks::new())
}

fn mints(account: &str, n: usize) -> Vec<Operation> {
    (0..n).map(|_| planner().mint(&addr(account))).collect()
}

#[tokio::test]
async fn test_rejected_nonce_is_reissued() {
    let ledger = Arc::new(
        ScriptedLedger::default()
            .account(ALICE, 1_000_000, 5)
            .replies(vec![
                Reply::Accept,
                Reply::Reject("ConflictingNonceInMempool", "transaction rejected"),
                Reply::Accept,
            ]),
    );
    let plan: BatchPlan = mints(ALICE, 3).into_iter().collect();

    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    let rows: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.outcome.status(), o.nonce))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("submitted", Some(5)),
            ("rejected", Some(6)),
            ("submitted", Some(6)),
        ]
    );
    assert_eq!(ledger.submitted_nonces(ALICE), vec![5, 6, 6]);

    let confirmed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.outcome.is_success())
        .filter_map(|o| o.nonce)
        .collect();
    assert_eq!(confirmed, vec![5, 6]);
    assert!(matches!(
        &report.outcomes[1].outcome,
        Outcome::Rejected { code, .. } if code == "ConflictingNonceInMempool"
    ));
}

#[tokio::test]
async fn test_bulk_mint_over_limit_is_rejected_verbatim() {
    let ledger = Arc::new(ScriptedLedger {
        reject_bulk_over: Some(10),
        ..ScriptedLedger::default()
            .account(ALICE, 1_000_000, 0)
            .account(BOB, 1_000_000, 0)
    });

    let set = wallets();
    let plan = planner().bulk_mint_each(&set, 15);
    let mut followup = planner().bulk_mint_each(&set, 10).into_groups();
    let plan: BatchPlan = plan
        .operations()
        .cloned()
        .chain(followup.remove(0).operations)
        .collect();

    let report = scheduler(ledger.clone(), Arc::new(LocalKeySigner), ShutdownSignal::never())
        .run(&set, plan)
        .await
        .unwrap();

    // ALICE: count 15 rejected, then count 10 reuses nonce 0.
    let alice: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| o.address.as_str() == ALICE)
        .collect();
    assert!(matches!(
        &alice[0].outcome,
        Outcome::Rejected { code, .. } if code == "(err u104)"
    ));
    assert_eq!(alice[0].nonce, Some(0));
    assert!(alice[1].outcome.is_success());
    assert_eq!(alice[1].nonce, Some(0));
    assert_eq!(ledger.submitted_nonces(ALICE), vec![0, 0]);
}

#[tokio::test]
async fn test_preflight_boundary() {
    let ledger = Arc::new(
        ScriptedLedger::default()
            .account(ALICE, 11_000, 0)
            .account(BOB, 11_000, 0),
    );
    let plan: BatchPlan = vec![
        planner().mint(&addr(ALICE)),
        planner().mint(&addr(BOB)).with_min_required_balance(11_001),
    ]
    .into_iter()
    .collect();

    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    assert!(report.outcomes[0].outcome.is_success());
    assert_eq!(
        report.outcomes[1].outcome,
        Outcome::Skipped {
            reason: SkipReason::InsufficientFunds { shortfall: 1 }
        }
    );
    assert_eq!(report.outcomes[1].nonce, None);
    assert!(ledger.submitted_nonces(BOB).is_empty());
}

#[tokio::test]
async fn test_cached_balance_is_debited() {
    let ledger = Arc::new(ScriptedLedger::default().account(ALICE, 15_000, 2));
    let plan: BatchPlan = mints(ALICE, 2).into_iter().collect();

    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    assert!(report.outcomes[0].outcome.is_success());
    assert_eq!(
        report.outcomes[1].outcome,
        Outcome::Skipped {
            reason: SkipReason::InsufficientFunds { shortfall: 7_000 }
        }
    );
    assert_eq!(ledger.submitted_nonces(ALICE), vec![2]);
}

#[tokio::test]
async fn test_transport_failure_releases_nonce() {
    let ledger = Arc::new(
        ScriptedLedger::default()
            .account(ALICE, 1_000_000, 0)
            .replies(vec![Reply::Transport, Reply::Accept]),
    );
    let plan: BatchPlan = mints(ALICE, 2).into_iter().collect();

    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    assert!(matches!(report.outcomes[0].outcome, Outcome::TransportFailed { .. }));
    assert_eq!(report.outcomes[0].nonce, Some(0));
    assert!(report.outcomes[1].outcome.is_success());
    assert_eq!(report.outcomes[1].nonce, Some(0));
}

#[tokio::test]
async fn test_unreachable_account_does_not_block_others() {
    let mut ledger = ScriptedLedger::default()
        .account(ALICE, 1_000_000, 0)
        .account(BOB, 1_000_000, 3);
    ledger.unreachable.insert(addr(ALICE));
    let ledger = Arc::new(ledger);

    let plan: BatchPlan = mints(ALICE, 2).into_iter().chain(mints(BOB, 1)).collect();
    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    let summary = report.summary();
    assert_eq!(summary.transport_failed, 2);
    assert_eq!(summary.succeeded, 1);
    assert!(report.outcomes[..2].iter().all(|o| o.nonce.is_none()));
    assert_eq!(ledger.submitted_nonces(BOB), vec![3]);
}

#[tokio::test]
async fn test_signer_decline_keeps_nonce() {
    let ledger = Arc::new(ScriptedLedger::default().account(ALICE, 1_000_000, 4));
    let signer = TestSigner {
        decline_first: AtomicBool::new(true),
    };
    let plan: BatchPlan = mints(ALICE, 2).into_iter().collect();

    let report = scheduler(ledger.clone(), Arc::new(signer), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    assert_eq!(
        report.outcomes[0].outcome,
        Outcome::Skipped {
            reason: SkipReason::SigningCancelled
        }
    );
    assert_eq!(report.outcomes[1].nonce, Some(4));
    assert_eq!(ledger.submitted_nonces(ALICE), vec![4]);
}

#[tokio::test]
async fn test_cancellation_finishes_in_flight_and_skips_rest() {
    let shutdown = Arc::new(Shutdown::new());
    let ledger = Arc::new(ScriptedLedger {
        cancel_after_submit: Some((1, shutdown.clone())),
        ..ScriptedLedger::default()
            .account(ALICE, 1_000_000, 0)
            .account(BOB, 1_000_000, 0)
    });

    let plan: BatchPlan = mints(ALICE, 3).into_iter().chain(mints(BOB, 2)).collect();
    let report = scheduler(ledger.clone(), Arc::new(TestSigner::default()), shutdown.subscribe())
        .run(&wallets(), plan)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.outcomes.len(), 5);
    assert!(report.outcomes[0].outcome.is_success());
    assert!(report.outcomes[1..].iter().all(|o| o.outcome
        == Outcome::Skipped {
            reason: SkipReason::BatchCancelled
        }));
    assert_eq!(ledger.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_and_persisted_report_agree() {
    let ledger = Arc::new(
        ScriptedLedger::default()
            .account(ALICE, 1_000_000, 0)
            .account(BOB, 5_000, 0)
            .replies(vec![
                Reply::Accept,
                Reply::Reject("BadNonce", "bad nonce"),
                Reply::Transport,
            ]),
    );
    let plan: BatchPlan = mints(ALICE, 4).into_iter().chain(mints(BOB, 1)).collect();
    let report = scheduler(ledger, Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();

    let summary = report.summary();
    assert_eq!(summary.total, report.outcomes.len());
    assert_eq!(
        summary.succeeded + summary.skipped + summary.rejected + summary.transport_failed,
        summary.total
    );
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.total_value_moved, 2_000);
    assert_eq!(summary.total_fees, 20_000);

    let dir = tempfile::tempdir().unwrap();
    let path = store::persist(&report, dir.path()).unwrap();
    let loaded = store::load(&path).unwrap();
    assert_eq!(loaded.summary(), summary);
    assert_eq!(loaded.batch_id, report.batch_id);
}

#[tokio::test]
async fn test_unknown_account_fails_before_network() {
    let ledger = Arc::new(ScriptedLedger::default());
    let plan: BatchPlan = mints("ST1STRANGER", 1).into_iter().collect();

    let err = scheduler(ledger.clone(), Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::UnknownAccount(a) if a.as_str() == "ST1STRANGER"));
    assert!(ledger.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_busy_account_is_refused() {
    let locks = AccountLocks::new();
    let _other_batch = locks.acquire(Uuid::new_v4(), [&addr(BOB)]).unwrap();

    let ledger = Arc::new(ScriptedLedger::default().account(BOB, 1_000_000, 0));
    let plan: BatchPlan = mints(BOB, 1).into_iter().collect();
    let err = DispatchScheduler::new(
        ledger,
        Arc::new(TestSigner::default()),
        &config(),
        ShutdownSignal::never(),
    )
    .with_locks(locks)
    .run(&wallets(), plan)
    .await
    .unwrap_err();
    assert!(matches!(err, BatchError::AccountBusy(_)));
}

#[tokio::test]
async fn test_all_failed_batch() {
    let ledger = Arc::new(ScriptedLedger::default().account(ALICE, 0, 0));
    let plan: BatchPlan = mints(ALICE, 2).into_iter().collect();
    let report = scheduler(ledger, Arc::new(TestSigner::default()), ShutdownSignal::never())
        .run(&wallets(), plan)
        .await
        .unwrap();
    assert!(report.summary().all_failed());
}

#[tokio::test]
async fn test_transfer_distribution() {
    let ledger = Arc::new(ScriptedLedger::default().account("ST1SOURCE", 10_000_000, 12));
    let source = Account::new(0, addr("ST1SOURCE"), SigningKey::parse(TEST_KEY).unwrap());
    let plan = planner().distribute(&source, &wallets(), 1_000_000);
    let sources = WalletSet::new(vec![source]).unwrap();

    let report = scheduler(ledger.clone(), Arc::new(LocalKeySigner), ShutdownSignal::never())
        .run(&sources, plan)
        .await
        .unwrap();

    assert_eq!(report.summary().succeeded, 2);
    assert_eq!(report.summary().total_value_moved, 2_000_000);
    assert_eq!(ledger.submitted_nonces("ST1SOURCE"), vec![12, 13]);
    assert!(report.outcomes.iter().all(|o| matches!(
        o.operation.kind,
        OperationKind::Transfer { amount: 1_000_000, .. }
    )));
}

#[tokio::test]
async fn test_inter_operation_delay_spaces_submissions() {
    let ledger = Arc::new(ScriptedLedger::default().account(ALICE, 1_000_000, 0));
    let mut config = config();
    config.pacing.inter_operation_ms = 200;

    let plan: BatchPlan = mints(ALICE, 3).into_iter().collect();
    let start = Instant::now();
    let report = paced_scheduler(
        ledger.clone(),
        Arc::new(TestSigner::default()),
        ShutdownSignal::never(),
        &config,
    )
    .run(&wallets(), plan)
    .await
    .unwrap();

    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(report.summary().succeeded, 3);
    assert_eq!(ledger.submitted_nonces(ALICE), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_inter_account_delay_between_groups() {
    let ledger = Arc::new(
        ScriptedLedger::default()
            .account(ALICE, 1_000_000, 0)
            .account(BOB, 1_000_000, 0),
    );
    let mut config = config();
    config.pacing.inter_account_ms = 200;

    let plan: BatchPlan = mints(ALICE, 1).into_iter().chain(mints(BOB, 1)).collect();
    let start = Instant::now();
    let report = paced_scheduler(
        ledger,
        Arc::new(TestSigner::default()),
        ShutdownSignal::never(),
        &config,
    )
    .run(&wallets(), plan)
    .await
    .unwrap();

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(400));
    assert_eq!(report.summary().succeeded, 2);
}

#[tokio::test]
async fn test_cancel_while_waiting_for_submission_slot() {
    let shutdown = Arc::new(Shutdown::new());
    let ledger = Arc::new(ScriptedLedger::default().account(ALICE, 1_000_000, 0));
    let mut config = config();
    config.pacing.max_submissions_per_second = Some(1);

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.trigger();
    });

    let plan: BatchPlan = mints(ALICE, 3).into_iter().collect();
    let start = Instant::now();
    let report = paced_scheduler(
        ledger.clone(),
        Arc::new(TestSigner::default()),
        shutdown.subscribe(),
        &config,
    )
    .run(&wallets(), plan)
    .await
    .unwrap();

    assert!(start.elapsed() < Duration::from_millis(900));
    let rows: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.outcome.status(), o.nonce))
        .collect();
    assert_eq!(
        rows,
        vec![("submitted", Some(0)), ("skipped", None), ("skipped", None)]
    );
    assert!(report.outcomes[1..].iter().all(|o| o.outcome
        == Outcome::Skipped {
            reason: SkipReason::BatchCancelled
        }));
    assert!(report.cancelled);
    assert_eq!(ledger.submitted_nonces(ALICE), vec![0]);
}
