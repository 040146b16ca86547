//! Settlement and approval orchestration.
//!
//! [`SettlementEngine`] drives the full control flow of a spend: resolve
//! commission, atomically debit and record, submit to the provider gateway
//! where the operator is automatic, and settle terminal states through
//! administrator decisions or gateway replies, refunding pre-debited funds
//! on rejection or failure.

use rust_decimal::Decimal;
use tracing::{info, warn};

use prexo_shared::types::{AdminId, OwnerId, TransactionId};

use crate::commission::{self, ResolvedCommission};
use crate::error::EngineError;
use crate::lifecycle::{
    Decision, LifecycleService, ProcessingMode, Transaction, TransactionKind, TransactionStatus,
};
use crate::notify::{Notification, NotificationCategory, NotificationPriority, NotificationSink};
use crate::provider::{GatewayError, GatewayReply, GatewayStatus, ProviderGateway, SubmitRequest};
use crate::store::{SettlementStore, TransactionDraft};
use crate::wallet::Wallet;

/// Settlement policy flags resolved from configuration.
///
/// Whether commission is debited from the wallet in addition to the spend
/// amount, or only recorded for downstream settlement, is a deployment
/// decision rather than fixed behavior.
#[derive(Debug, Clone, Copy)]
pub struct SettlementPolicy {
    /// Debit the resolved commission together with the spend amount.
    pub charge_commission: bool,
    /// Include the commission in refunds when it was debited.
    pub refund_commission: bool,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            charge_commission: false,
            refund_commission: true,
        }
    }
}

/// A spend request: recharge, bill payment, voucher purchase, or transfer.
#[derive(Debug, Clone)]
pub struct SpendRequest {
    /// The owner spending from their wallet.
    pub owner_id: OwnerId,
    /// What is being bought. Must be a spend kind.
    pub kind: TransactionKind,
    /// The face amount. Must be positive.
    pub amount: Decimal,
    /// The operator/provider to route to.
    pub operator_ref: String,
    /// Whether the operator settles automatically or needs human review.
    pub mode: ProcessingMode,
    /// Operator-specific attributes (subscriber number, biller id, ...).
    pub metadata: serde_json::Value,
}

/// A top-up request. Not pre-debited; approval is the credit.
#[derive(Debug, Clone)]
pub struct TopupRequest {
    /// The owner adding money.
    pub owner_id: OwnerId,
    /// The amount to add. Must be positive.
    pub amount: Decimal,
    /// Payment attributes (deposit slip reference, channel, ...).
    pub metadata: serde_json::Value,
}

/// Options for a single administrator decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecideOptions {
    /// On approval, submit the transaction to the provider gateway instead
    /// of settling immediately; the record parks in `Approved` until the
    /// gateway reports.
    pub submit_to_provider: bool,
}

/// One non-successful item of a bulk decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// The transaction the outcome belongs to.
    pub id: TransactionId,
    /// Why it was skipped or failed.
    pub reason: String,
}

/// Partitioned outcome of a bulk decision.
///
/// Every input id lands in exactly one bucket; one bad id never aborts the
/// batch.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Transactions decided by this call.
    pub succeeded: Vec<TransactionId>,
    /// Transactions someone already decided (`AlreadyProcessed`).
    pub skipped: Vec<BulkItem>,
    /// Transactions that failed for any other reason.
    pub failed: Vec<BulkItem>,
}

/// The wallet ledger and transaction approval engine.
///
/// Generic over its storage handle, provider gateway, and notification
/// sink; production wires Postgres-backed implementations while tests run
/// against [`crate::memory::MemoryStore`].
pub struct SettlementEngine<S, G, N> {
    store: S,
    gateway: G,
    sink: N,
    policy: SettlementPolicy,
}

impl<S, G, N> SettlementEngine<S, G, N>
where
    S: SettlementStore,
    G: ProviderGateway,
    N: NotificationSink,
{
    /// Creates an engine from its collaborators.
    pub const fn new(store: S, gateway: G, sink: N, policy: SettlementPolicy) -> Self {
        Self {
            store,
            gateway,
            sink,
            policy,
        }
    }

    /// The storage handle, for read-only query paths.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The active settlement policy.
    pub const fn policy(&self) -> &SettlementPolicy {
        &self.policy
    }

    /// Creates a wallet for an owner.
    pub async fn create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        let wallet = self.store.create_wallet(owner_id).await?;
        info!(owner_id = %owner_id, wallet_id = %wallet.id, "wallet created");
        Ok(wallet)
    }

    /// Resolves the commission a spend would incur, without side effects.
    pub async fn preview_commission(
        &self,
        owner_id: OwnerId,
        operator_ref: &str,
        kind: TransactionKind,
        amount: Decimal,
    ) -> Result<ResolvedCommission, EngineError> {
        ensure_positive(amount)?;
        let rules = self.store.commission_rules(owner_id, operator_ref, kind).await?;
        Ok(commission::resolve(&rules, amount))
    }

    /// Requests a spend from the owner's wallet.
    ///
    /// Resolves the commission, atomically debits the wallet and records
    /// the transaction, then submits to the provider gateway when the
    /// operator is automatic. Validation failures surface before the
    /// wallet is touched; an unreachable gateway leaves the debited
    /// transaction in `Pending` for retry or manual decision.
    pub async fn request_spend(&self, request: SpendRequest) -> Result<Transaction, EngineError> {
        if !request.kind.is_spend() {
            return Err(EngineError::NotASpend(request.kind));
        }
        ensure_positive(request.amount)?;

        let wallet = self.store.wallet_by_owner(request.owner_id).await?;

        let rules = self
            .store
            .commission_rules(request.owner_id, &request.operator_ref, request.kind)
            .await?;
        let resolved = commission::resolve(&rules, request.amount);

        let debit_total = if self.policy.charge_commission {
            request.amount + resolved.amount
        } else {
            request.amount
        };

        let status = match request.mode {
            ProcessingMode::Manual => TransactionStatus::AwaitingApproval,
            ProcessingMode::Automatic => TransactionStatus::Pending,
        };

        let draft = TransactionDraft {
            owner_id: request.owner_id,
            wallet_id: wallet.id,
            kind: request.kind,
            amount: request.amount,
            commission: resolved.into(),
            debit_total,
            status,
            operator_ref: Some(request.operator_ref),
            metadata: request.metadata,
        };

        let tx = self.store.debit_and_record(draft).await?;
        info!(
            transaction_id = %tx.id,
            owner_id = %tx.owner_id,
            kind = %tx.kind,
            amount = %tx.amount,
            debited = %tx.debited_total,
            status = %tx.status,
            "spend recorded"
        );

        self.notify_recorded(&tx).await;

        match request.mode {
            ProcessingMode::Manual => Ok(tx),
            ProcessingMode::Automatic => self.submit_to_gateway(tx).await,
        }
    }

    /// Requests a top-up of the owner's wallet.
    ///
    /// Nothing is debited or credited here; the record enters
    /// `AwaitingApproval` and the approval is the credit.
    pub async fn request_topup(&self, request: TopupRequest) -> Result<Transaction, EngineError> {
        ensure_positive(request.amount)?;

        let wallet = self.store.wallet_by_owner(request.owner_id).await?;

        let draft = TransactionDraft {
            owner_id: request.owner_id,
            wallet_id: wallet.id,
            kind: TransactionKind::Topup,
            amount: request.amount,
            commission: crate::commission::CommissionBreakdown::none(),
            debit_total: Decimal::ZERO,
            status: TransactionStatus::AwaitingApproval,
            operator_ref: None,
            metadata: request.metadata,
        };

        let tx = self.store.record(draft).await?;
        info!(
            transaction_id = %tx.id,
            owner_id = %tx.owner_id,
            amount = %tx.amount,
            "top-up requested"
        );
        self.notify_recorded(&tx).await;
        Ok(tx)
    }

    /// Applies a single administrator decision.
    ///
    /// Idempotent: a transaction already in a terminal state fails with
    /// `AlreadyProcessed` and mutates nothing, including under concurrent
    /// decisions on the same id. The status claim and any wallet credit
    /// (refund or top-up credit) land in one storage transaction.
    pub async fn decide(
        &self,
        transaction_id: TransactionId,
        decision: Decision,
        admin_id: AdminId,
        notes: Option<String>,
        options: DecideOptions,
    ) -> Result<Transaction, EngineError> {
        let tx = self.store.transaction(transaction_id).await?;

        let action = match decision {
            Decision::Approve => {
                let await_gateway = options.submit_to_provider
                    && tx.kind.is_spend()
                    && tx.operator_ref.is_some();
                LifecycleService::approve(&tx, admin_id, notes, await_gateway)?
            }
            Decision::Reject => {
                LifecycleService::reject(&tx, admin_id, notes.unwrap_or_default(), &self.policy)?
            }
        };

        let updated = self
            .store
            .apply_decision(
                transaction_id,
                &[TransactionStatus::AwaitingApproval, TransactionStatus::Pending],
                action,
            )
            .await?;

        info!(
            transaction_id = %updated.id,
            admin_id = %admin_id,
            decision = ?decision,
            status = %updated.status,
            "decision applied"
        );
        self.notify_decided(&updated).await;

        if updated.status == TransactionStatus::Approved {
            // Approval asked the gateway to settle; transport failures
            // leave the record parked in `Approved`.
            return self.submit_to_gateway(updated).await;
        }

        Ok(updated)
    }

    /// Applies one decision to many transactions, isolating failures per item.
    ///
    /// Refunds go through the per-wallet atomic credit primitive, so this
    /// is deliberately a loop over [`Self::decide`] rather than a
    /// multi-row update.
    pub async fn bulk_decide(
        &self,
        transaction_ids: Vec<TransactionId>,
        decision: Decision,
        admin_id: AdminId,
        notes: Option<String>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for id in transaction_ids {
            match self
                .decide(id, decision, admin_id, notes.clone(), DecideOptions::default())
                .await
            {
                Ok(tx) => outcome.succeeded.push(tx.id),
                Err(err @ EngineError::AlreadyProcessed { .. }) => outcome.skipped.push(BulkItem {
                    id,
                    reason: err.to_string(),
                }),
                Err(err) => outcome.failed.push(BulkItem {
                    id,
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            succeeded = outcome.succeeded.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            decision = ?decision,
            admin_id = %admin_id,
            "bulk decision applied"
        );
        outcome
    }

    /// Applies a provider gateway result delivered through a callback.
    ///
    /// Safe under repeated webhook delivery: a transaction already settled
    /// fails with `AlreadyProcessed` and the wallet is not touched again.
    /// A `Pending` reply keeps the current state.
    pub async fn apply_gateway_result(
        &self,
        transaction_id: TransactionId,
        reply: GatewayReply,
    ) -> Result<Transaction, EngineError> {
        let tx = self.store.transaction(transaction_id).await?;
        self.settle_from_reply(tx, reply).await
    }

    /// Fails a stale in-flight transaction, refunding pre-debited funds.
    ///
    /// Timeout detection is the calling scheduler's policy; this is the
    /// transition it invokes, identical in semantics to a gateway failure.
    pub async fn fail_stale(
        &self,
        transaction_id: TransactionId,
        reason: String,
    ) -> Result<Transaction, EngineError> {
        let tx = self.store.transaction(transaction_id).await?;
        let action = LifecycleService::fail(&tx, reason, None, &self.policy)?;
        let updated = self
            .store
            .apply_decision(
                transaction_id,
                &[TransactionStatus::Pending, TransactionStatus::Approved],
                action,
            )
            .await?;
        warn!(transaction_id = %updated.id, "stale transaction failed and refunded");
        self.notify_decided(&updated).await;
        Ok(updated)
    }

    /// Re-submits an in-flight transaction to the provider gateway.
    ///
    /// Unlike the submission inside [`Self::request_spend`], a transport
    /// failure here surfaces as [`EngineError::GatewayUnavailable`] so the
    /// caller can retry; the transaction state is unchanged either way.
    pub async fn resubmit(&self, transaction_id: TransactionId) -> Result<Transaction, EngineError> {
        let tx = self.store.transaction(transaction_id).await?;
        if tx.status.is_terminal() {
            return Err(EngineError::AlreadyProcessed {
                id: tx.id,
                status: tx.status,
            });
        }

        let request = submit_request(&tx);
        match self.gateway.submit(request).await {
            Ok(reply) => self.settle_from_reply(tx, reply).await,
            Err(GatewayError::Unavailable(message)) => {
                Err(EngineError::GatewayUnavailable(message))
            }
        }
    }

    // ========================================================================
    // Gateway plumbing
    // ========================================================================

    /// Submits a freshly debited or freshly approved transaction.
    ///
    /// No lock is held while the call is in flight; the wallet was already
    /// debited. Transport failures leave the record in its current state
    /// and are logged rather than surfaced, since the transaction itself
    /// was created successfully.
    async fn submit_to_gateway(&self, tx: Transaction) -> Result<Transaction, EngineError> {
        let request = submit_request(&tx);
        match self.gateway.submit(request).await {
            Ok(reply) => self.settle_from_reply(tx, reply).await,
            Err(GatewayError::Unavailable(message)) => {
                warn!(
                    transaction_id = %tx.id,
                    error = %message,
                    "gateway unreachable, leaving transaction for retry"
                );
                Ok(tx)
            }
        }
    }

    async fn settle_from_reply(
        &self,
        tx: Transaction,
        reply: GatewayReply,
    ) -> Result<Transaction, EngineError> {
        match reply.status {
            GatewayStatus::Pending => {
                if let Some(provider_ref) = reply.provider_ref {
                    self.store.set_provider_ref(tx.id, &provider_ref).await?;
                    return self.store.transaction(tx.id).await;
                }
                Ok(tx)
            }
            GatewayStatus::Success => {
                let action = LifecycleService::complete(&tx, reply.provider_ref)?;
                let updated = self
                    .store
                    .apply_decision(
                        tx.id,
                        &[TransactionStatus::Pending, TransactionStatus::Approved],
                        action,
                    )
                    .await?;
                info!(transaction_id = %updated.id, "gateway settled transaction");
                self.notify_decided(&updated).await;
                Ok(updated)
            }
            GatewayStatus::Failed => {
                let reason = reply
                    .message
                    .unwrap_or_else(|| "provider reported failure".to_string());
                let action =
                    LifecycleService::fail(&tx, reason, reply.provider_ref, &self.policy)?;
                let updated = self
                    .store
                    .apply_decision(
                        tx.id,
                        &[TransactionStatus::Pending, TransactionStatus::Approved],
                        action,
                    )
                    .await?;
                warn!(transaction_id = %updated.id, "gateway reported failure, refunded");
                self.notify_decided(&updated).await;
                Ok(updated)
            }
        }
    }

    // ========================================================================
    // Notifications (fire-and-forget)
    // ========================================================================

    async fn notify_recorded(&self, tx: &Transaction) {
        self.sink
            .notify(Notification {
                owner_id: tx.owner_id,
                title: format!("{} received", tx.kind),
                body: format!("{} of {} is {}", tx.kind, tx.amount, tx.status),
                category: NotificationCategory::Transaction,
                transaction_id: Some(tx.id),
                priority: NotificationPriority::Normal,
            })
            .await;
    }

    async fn notify_decided(&self, tx: &Transaction) {
        let (category, priority, body) = match (tx.status, &tx.refund) {
            (TransactionStatus::Success, _) => (
                NotificationCategory::Approval,
                NotificationPriority::Normal,
                format!("{} of {} completed", tx.kind, tx.amount),
            ),
            (_, Some(refund)) => (
                NotificationCategory::Refund,
                NotificationPriority::High,
                format!(
                    "{} of {} was {}; {} refunded to your wallet",
                    tx.kind, tx.amount, tx.status, refund.amount
                ),
            ),
            _ => (
                NotificationCategory::Approval,
                NotificationPriority::Normal,
                format!("{} of {} is {}", tx.kind, tx.amount, tx.status),
            ),
        };

        self.sink
            .notify(Notification {
                owner_id: tx.owner_id,
                title: format!("{} {}", tx.kind, tx.status),
                body,
                category,
                transaction_id: Some(tx.id),
                priority,
            })
            .await;
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), EngineError> {
    if amount <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

fn submit_request(tx: &Transaction) -> SubmitRequest {
    SubmitRequest {
        transaction_id: tx.id,
        kind: tx.kind,
        operator_ref: tx.operator_ref.clone().unwrap_or_default(),
        amount: tx.amount,
        attributes: tx.metadata.clone(),
    }
}

#[cfg(test)]
mod tests;
