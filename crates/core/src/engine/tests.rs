//! Engine behavior tests against the in-memory store.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use prexo_shared::types::{AdminId, OwnerId, RuleId, SchemeId};

use crate::commission::{CommissionRule, CommissionSource, RateType, RuleScope};
use crate::error::EngineError;
use crate::lifecycle::{
    Decision, ProcessingMode, RefundStatus, TransactionKind, TransactionStatus,
};
use crate::memory::MemoryStore;
use crate::notify::{Notification, NotificationCategory, NotificationPriority, NotificationSink};
use crate::provider::{GatewayError, GatewayReply, GatewayStatus, ProviderGateway, SubmitRequest};
use crate::store::SettlementStore;

use super::{BulkItem, DecideOptions, SettlementEngine, SettlementPolicy, SpendRequest, TopupRequest};

// ============================================================================
// Test doubles
// ============================================================================

/// Gateway returning a scripted sequence of replies, then `Pending`.
#[derive(Default)]
struct ScriptedGateway {
    script: Mutex<VecDeque<Result<GatewayReply, GatewayError>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Result<GatewayReply, GatewayError>) {
        self.script.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn reply(status: GatewayStatus) -> GatewayReply {
    GatewayReply {
        status,
        provider_ref: Some("OP-REF-1".to_string()),
        message: match status {
            GatewayStatus::Failed => Some("operator rejected request".to_string()),
            _ => None,
        },
    }
}

#[async_trait]
impl ProviderGateway for ScriptedGateway {
    async fn submit(&self, _request: SubmitRequest) -> Result<GatewayReply, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(GatewayReply {
            status: GatewayStatus::Pending,
            provider_ref: None,
            message: None,
        }))
    }
}

/// Sink capturing every notification for assertions.
#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

type TestEngine = SettlementEngine<Arc<MemoryStore>, Arc<ScriptedGateway>, Arc<RecordingSink>>;

struct Harness {
    engine: Arc<TestEngine>,
    store: Arc<MemoryStore>,
    gateway: Arc<ScriptedGateway>,
    sink: Arc<RecordingSink>,
}

fn harness(policy: SettlementPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let sink = Arc::new(RecordingSink::default());
    let engine = Arc::new(SettlementEngine::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        Arc::clone(&sink),
        policy,
    ));
    Harness {
        engine,
        store,
        gateway,
        sink,
    }
}

fn spend(owner: OwnerId, amount: Decimal, mode: ProcessingMode) -> SpendRequest {
    SpendRequest {
        owner_id: owner,
        kind: TransactionKind::MobileRecharge,
        amount,
        operator_ref: "airtel".to_string(),
        mode,
        metadata: serde_json::json!({"subscriber": "9800000001"}),
    }
}

fn global_rule(rate_type: RateType, value: Decimal) -> CommissionRule {
    CommissionRule {
        id: RuleId::new(),
        scope: RuleScope::Global,
        operator: "airtel".to_string(),
        kind: TransactionKind::MobileRecharge,
        rate_type,
        value,
        min_fee: Decimal::ZERO,
        max_fee: None,
    }
}

// ============================================================================
// Spend lifecycle
// ============================================================================

/// The worked example: balance 1000, manual spend of 300, admin rejects,
/// balance is back to 1000 with a recorded refund of 300.
#[tokio::test]
async fn test_manual_spend_reject_refunds_in_full() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::AwaitingApproval);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));

    let decided = h
        .engine
        .decide(
            tx.id,
            Decision::Reject,
            AdminId::new(),
            Some("operator outage".to_string()),
            DecideOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(decided.status, TransactionStatus::Rejected);
    assert_eq!(decided.decision_notes.as_deref(), Some("operator outage"));
    let refund = decided.refund.expect("refund recorded");
    assert_eq!(refund.amount, dec!(300));
    assert_eq!(refund.status, RefundStatus::Completed);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_manual_spend_approve_settles_without_credit() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    let decided = h
        .engine
        .decide(tx.id, Decision::Approve, AdminId::new(), None, DecideOptions::default())
        .await
        .unwrap();

    assert_eq!(decided.status, TransactionStatus::Success);
    assert!(decided.refund.is_none());
    // The money was already taken at request time; approval does not move it.
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));
}

#[tokio::test]
async fn test_spend_validation_precedes_wallet_access() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let err = h
        .engine
        .request_spend(spend(owner, dec!(0), ProcessingMode::Manual))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = h
        .engine
        .request_spend(spend(owner, dec!(-5), ProcessingMode::Manual))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let mut req = spend(owner, dec!(100), ProcessingMode::Manual);
    req.kind = TransactionKind::Topup;
    let err = h.engine.request_spend(req).await.unwrap_err();
    assert!(matches!(err, EngineError::NotASpend(_)));

    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_insufficient_funds_creates_no_record() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(100));

    let err = h
        .engine
        .request_spend(spend(owner, dec!(500), ProcessingMode::Manual))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::InsufficientFunds {
            required,
            available
        } if required == dec!(500) && available == dec!(100)
    ));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(100));
}

#[tokio::test]
async fn test_spend_for_unknown_owner_fails() {
    let h = harness(SettlementPolicy::default());
    let err = h
        .engine
        .request_spend(spend(OwnerId::new(), dec!(100), ProcessingMode::Manual))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OwnerWalletNotFound(_)));
}

// ============================================================================
// No double-spend under concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spends_cannot_overdraw() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1));

    const RACERS: usize = 8;
    let barrier = Arc::new(Barrier::new(RACERS));

    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let engine = Arc::clone(&h.engine);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .request_spend(spend(owner, dec!(1), ProcessingMode::Manual))
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let refusals = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::InsufficientFunds { .. })))
        .count();

    assert_eq!(successes, 1, "exactly one racer may win the balance");
    assert_eq!(refusals, RACERS - 1);
    assert_eq!(
        h.store.wallet(wallet.id).await.unwrap().balance,
        Decimal::ZERO
    );
}

/// Conservation: final balance equals initial plus credits minus the
/// debits that were accepted, across a mixed sequence with refusals.
#[tokio::test]
async fn test_wallet_conservation_over_mixed_operations() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(500));

    let operations: &[(bool, Decimal)] = &[
        (true, dec!(100)),  // credit -> 600
        (false, dec!(250)), // debit  -> 350
        (false, dec!(400)), // refused, balance 350
        (true, dec!(50)),   // credit -> 400
        (false, dec!(400)), // debit  -> 0
        (false, dec!(0.01)),// refused, balance 0
    ];

    let mut expected = dec!(500);
    for &(is_credit, amount) in operations {
        if is_credit {
            h.store.credit(wallet.id, amount).await.unwrap();
            expected += amount;
        } else {
            match h.store.try_debit(wallet.id, amount).await {
                Ok(_) => expected -= amount,
                Err(EngineError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        let balance = h.store.wallet(wallet.id).await.unwrap().balance;
        assert_eq!(balance, expected);
        assert!(balance >= Decimal::ZERO);
    }
}

// ============================================================================
// Idempotent decisions
// ============================================================================

#[tokio::test]
async fn test_decide_twice_credits_once() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(0));

    let tx = h
        .engine
        .request_topup(TopupRequest {
            owner_id: owner,
            amount: dec!(500),
            metadata: serde_json::json!({"channel": "bank-deposit"}),
        })
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::AwaitingApproval);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(0));

    let admin = AdminId::new();
    let first = h
        .engine
        .decide(tx.id, Decision::Approve, admin, None, DecideOptions::default())
        .await
        .unwrap();
    assert_eq!(first.status, TransactionStatus::Success);
    assert_eq!(first.decided_by, Some(admin));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(500));

    let second = h
        .engine
        .decide(tx.id, Decision::Approve, admin, None, DecideOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(second, EngineError::AlreadyProcessed { .. }));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decides_serialize() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    const RACERS: usize = 4;
    let barrier = Arc::new(Barrier::new(RACERS));
    let tasks: Vec<_> = (0..RACERS)
        .map(|_| {
            let engine = Arc::clone(&h.engine);
            let barrier = Arc::clone(&barrier);
            let id = tx.id;
            tokio::spawn(async move {
                barrier.wait().await;
                engine
                    .decide(
                        id,
                        Decision::Reject,
                        AdminId::new(),
                        Some("duplicate request".to_string()),
                        DecideOptions::default(),
                    )
                    .await
            })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "only the first decision may land");
    // The refund was applied exactly once.
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

// ============================================================================
// Gateway settlement
// ============================================================================

#[tokio::test]
async fn test_automatic_spend_gateway_success() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));
    h.gateway.push(Ok(reply(GatewayStatus::Success)));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Success);
    assert_eq!(tx.provider_ref.as_deref(), Some("OP-REF-1"));
    assert_eq!(h.gateway.calls(), 1);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));
}

#[tokio::test]
async fn test_automatic_spend_gateway_failure_refunds() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));
    h.gateway.push(Ok(reply(GatewayStatus::Failed)));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.failure_reason.as_deref(), Some("operator rejected request"));
    assert_eq!(tx.refund.as_ref().unwrap().amount, dec!(300));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_gateway_pending_awaits_callback() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));

    // Callback settles it later.
    let settled = h
        .engine
        .apply_gateway_result(tx.id, reply(GatewayStatus::Success))
        .await
        .unwrap();
    assert_eq!(settled.status, TransactionStatus::Success);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));
}

#[tokio::test]
async fn test_gateway_unavailable_leaves_pending_not_failed() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));
    h.gateway
        .push(Err(GatewayError::Unavailable("connection refused".to_string())));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();

    // The debit stands and the transaction awaits retry or manual decision.
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.failure_reason.is_none());
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));
}

#[tokio::test]
async fn test_repeated_webhook_delivery_is_rejected() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();

    h.engine
        .apply_gateway_result(tx.id, reply(GatewayStatus::Failed))
        .await
        .unwrap();
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));

    // Same webhook delivered again: typed error, wallet untouched.
    let err = h
        .engine
        .apply_gateway_result(tx.id, reply(GatewayStatus::Failed))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_approve_with_provider_submission() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(1000));
    h.gateway.push(Ok(reply(GatewayStatus::Success)));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    let decided = h
        .engine
        .decide(
            tx.id,
            Decision::Approve,
            AdminId::new(),
            None,
            DecideOptions {
                submit_to_provider: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(decided.status, TransactionStatus::Success);
    assert_eq!(h.gateway.calls(), 1);
}

#[tokio::test]
async fn test_approve_parks_when_gateway_unreachable() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(1000));
    h.gateway
        .push(Err(GatewayError::Unavailable("dns failure".to_string())));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    let decided = h
        .engine
        .decide(
            tx.id,
            Decision::Approve,
            AdminId::new(),
            None,
            DecideOptions {
                submit_to_provider: true,
            },
        )
        .await
        .unwrap();

    // Approved but unsettled; resubmit succeeds later.
    assert_eq!(decided.status, TransactionStatus::Approved);

    h.gateway.push(Ok(reply(GatewayStatus::Success)));
    let settled = h.engine.resubmit(tx.id).await.unwrap();
    assert_eq!(settled.status, TransactionStatus::Success);
}

#[tokio::test]
async fn test_resubmit_surfaces_gateway_unavailable() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    h.gateway
        .push(Err(GatewayError::Unavailable("timeout".to_string())));
    let err = h.engine.resubmit(tx.id).await.unwrap_err();
    assert!(matches!(err, EngineError::GatewayUnavailable(_)));

    // State unchanged by the failed attempt.
    let current = h.store.transaction(tx.id).await.unwrap();
    assert_eq!(current.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn test_fail_stale_refunds_like_any_failure() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Automatic))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);

    let failed = h
        .engine
        .fail_stale(tx.id, "no provider response within window".to_string())
        .await
        .unwrap();

    assert_eq!(failed.status, TransactionStatus::Failed);
    assert_eq!(failed.refund.as_ref().unwrap().amount, dec!(300));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));

    let err = h
        .engine
        .fail_stale(tx.id, "again".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyProcessed { .. }));
}

// ============================================================================
// Commission resolution through the engine
// ============================================================================

#[tokio::test]
async fn test_commission_persisted_without_charging_by_default() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));
    h.store.insert_rule(global_rule(RateType::Percentage, dec!(3)));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    // Commission recorded for settlement, not taken from the wallet.
    assert_eq!(tx.commission.amount, dec!(9));
    assert_eq!(tx.commission.source, CommissionSource::Global);
    assert_eq!(tx.debited_total, dec!(300));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(700));
}

#[tokio::test]
async fn test_commission_charged_and_refunded_when_policy_enabled() {
    let h = harness(SettlementPolicy {
        charge_commission: true,
        refund_commission: true,
    });
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));
    h.store.insert_rule(global_rule(RateType::Percentage, dec!(3)));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();
    assert_eq!(tx.debited_total, dec!(309));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(691));

    let decided = h
        .engine
        .decide(
            tx.id,
            Decision::Reject,
            AdminId::new(),
            Some("wrong subscriber".to_string()),
            DecideOptions::default(),
        )
        .await
        .unwrap();

    // Net zero over the lifecycle, commission included.
    assert_eq!(decided.refund.as_ref().unwrap().amount, dec!(309));
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(1000));
}

#[tokio::test]
async fn test_commission_precedence_through_preview() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(1000));

    let scheme = SchemeId::new();
    h.store.set_default_scheme(scheme);

    let user_rule = CommissionRule {
        scope: RuleScope::User { owner_id: owner },
        ..global_rule(RateType::Fixed, dec!(5))
    };
    let user_rule_id = user_rule.id;
    let scheme_rule = CommissionRule {
        scope: RuleScope::Scheme { scheme_id: scheme },
        ..global_rule(RateType::Fixed, dec!(3))
    };
    let scheme_rule_id = scheme_rule.id;
    h.store.insert_rule(global_rule(RateType::Fixed, dec!(1)));
    h.store.insert_rule(scheme_rule);
    h.store.insert_rule(user_rule);

    let preview = |amount| {
        let engine = Arc::clone(&h.engine);
        async move {
            engine
                .preview_commission(owner, "airtel", TransactionKind::MobileRecharge, amount)
                .await
                .unwrap()
        }
    };

    // User override wins.
    let resolved = preview(dec!(100)).await;
    assert_eq!(resolved.amount, dec!(5));
    assert_eq!(resolved.source, CommissionSource::User);

    // Remove the user rule: the default scheme wins.
    h.store.remove_rule(user_rule_id);
    let resolved = preview(dec!(100)).await;
    assert_eq!(resolved.amount, dec!(3));
    assert_eq!(resolved.source, CommissionSource::Scheme);

    // Remove the scheme rule: global wins.
    h.store.remove_rule(scheme_rule_id);
    let resolved = preview(dec!(100)).await;
    assert_eq!(resolved.amount, dec!(1));
    assert_eq!(resolved.source, CommissionSource::Global);
}

// ============================================================================
// Bulk decisions
// ============================================================================

#[tokio::test]
async fn test_bulk_decide_partitions_outcomes() {
    let h = harness(SettlementPolicy::default());
    let admin = AdminId::new();

    let owner_a = OwnerId::new();
    let wallet_a = h.store.seed_wallet(owner_a, dec!(1000));
    let owner_b = OwnerId::new();
    let wallet_b = h.store.seed_wallet(owner_b, dec!(1000));

    let valid = h
        .engine
        .request_spend(spend(owner_a, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();

    let already_terminal = h
        .engine
        .request_spend(spend(owner_b, dec!(200), ProcessingMode::Manual))
        .await
        .unwrap();
    h.engine
        .decide(
            already_terminal.id,
            Decision::Approve,
            admin,
            None,
            DecideOptions::default(),
        )
        .await
        .unwrap();

    let unknown = prexo_shared::types::TransactionId::new();

    let outcome = h
        .engine
        .bulk_decide(
            vec![valid.id, already_terminal.id, unknown],
            Decision::Reject,
            admin,
            Some("batch cleanup".to_string()),
        )
        .await;

    assert_eq!(outcome.succeeded, vec![valid.id]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].id, already_terminal.id);
    assert!(outcome.skipped[0].reason.contains("already processed"));
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, unknown);
    assert!(outcome.failed[0].reason.contains("not found"));

    // Only the valid transaction's wallet moved: its 300 came back.
    assert_eq!(h.store.wallet(wallet_a.id).await.unwrap().balance, dec!(1000));
    // Owner B keeps the approved spend debited.
    assert_eq!(h.store.wallet(wallet_b.id).await.unwrap().balance, dec!(800));
}

#[tokio::test]
async fn test_bulk_decide_empty_input() {
    let h = harness(SettlementPolicy::default());
    let outcome = h
        .engine
        .bulk_decide(vec![], Decision::Approve, AdminId::new(), None)
        .await;
    assert!(outcome.succeeded.is_empty());
    assert!(outcome.skipped.is_empty());
    assert!(outcome.failed.is_empty());
}

// ============================================================================
// Top-ups and notifications
// ============================================================================

#[tokio::test]
async fn test_reject_topup_moves_no_money() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(100));

    let tx = h
        .engine
        .request_topup(TopupRequest {
            owner_id: owner,
            amount: dec!(500),
            metadata: serde_json::json!({}),
        })
        .await
        .unwrap();

    let decided = h
        .engine
        .decide(
            tx.id,
            Decision::Reject,
            AdminId::new(),
            Some("no matching deposit".to_string()),
            DecideOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(decided.status, TransactionStatus::Rejected);
    assert!(decided.refund.is_none());
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(100));
}

#[tokio::test]
async fn test_topup_requires_positive_amount() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(0));

    let err = h
        .engine
        .request_topup(TopupRequest {
            owner_id: owner,
            amount: dec!(-10),
            metadata: serde_json::json!({}),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn test_rejection_notification_reports_refund() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(300), ProcessingMode::Manual))
        .await
        .unwrap();
    h.engine
        .decide(
            tx.id,
            Decision::Reject,
            AdminId::new(),
            Some("operator outage".to_string()),
            DecideOptions::default(),
        )
        .await
        .unwrap();

    let sent = h.sink.sent();
    assert_eq!(sent.len(), 2, "one on record, one on decision");

    let decision_note = &sent[1];
    assert_eq!(decision_note.category, NotificationCategory::Refund);
    assert_eq!(decision_note.priority, NotificationPriority::High);
    assert_eq!(decision_note.transaction_id, Some(tx.id));
    assert!(decision_note.body.contains("300"));
    assert!(decision_note.body.contains("refunded"));
}

#[tokio::test]
async fn test_bulk_decide_unknown_then_valid_wallets_isolated() {
    let h = harness(SettlementPolicy::default());
    let owner = OwnerId::new();
    let wallet = h.store.seed_wallet(owner, dec!(1000));

    let tx = h
        .engine
        .request_spend(spend(owner, dec!(100), ProcessingMode::Manual))
        .await
        .unwrap();

    let outcome = h
        .engine
        .bulk_decide(
            vec![prexo_shared::types::TransactionId::new(), tx.id],
            Decision::Approve,
            AdminId::new(),
            None,
        )
        .await;

    // The bad id did not abort the batch.
    assert_eq!(outcome.succeeded, vec![tx.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(h.store.wallet(wallet.id).await.unwrap().balance, dec!(900));
}

#[test]
fn test_bulk_item_equality() {
    let id = prexo_shared::types::TransactionId::new();
    let a = BulkItem {
        id,
        reason: "x".to_string(),
    };
    let b = BulkItem {
        id,
        reason: "x".to_string(),
    };
    assert_eq!(a, b);
}
