//! Storage seam injected into the settlement engine.
//!
//! The engine never touches a database directly; it is constructed with a
//! [`SettlementStore`] handle, so production runs against Postgres while
//! unit tests run against the in-memory store with identical semantics.

use async_trait::async_trait;
use rust_decimal::Decimal;

use prexo_shared::types::{OwnerId, TransactionId, WalletId};

use crate::commission::{CommissionBreakdown, CommissionRule};
use crate::error::EngineError;
use crate::lifecycle::{DecisionAction, Transaction, TransactionKind, TransactionStatus};
use crate::wallet::Wallet;

/// Input for recording a new transaction.
#[derive(Debug, Clone)]
pub struct TransactionDraft {
    /// The owner the transaction belongs to.
    pub owner_id: OwnerId,
    /// The wallet debited/credited by this transaction.
    pub wallet_id: WalletId,
    /// What kind of action this is.
    pub kind: TransactionKind,
    /// The face amount. Always positive.
    pub amount: Decimal,
    /// Resolved commission and its provenance.
    pub commission: CommissionBreakdown,
    /// Total to debit from the wallet at request time (zero for top-ups).
    pub debit_total: Decimal,
    /// Initial status: `AwaitingApproval` for manual, `Pending` for automatic.
    pub status: TransactionStatus,
    /// Which external operator/provider handles this, if any.
    pub operator_ref: Option<String>,
    /// Free-form attributes: subscriber number, biller id, and so on.
    pub metadata: serde_json::Value,
}

/// Storage operations the settlement engine depends on.
///
/// Implementations must make `try_debit`/`credit` linearizable per wallet,
/// `debit_and_record` atomic as a pair, and `apply_decision` a conditional
/// claim: concurrent decisions on the same transaction serialize so exactly
/// one succeeds and the rest observe [`EngineError::AlreadyProcessed`].
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// Creates a zero-balance wallet for an owner.
    ///
    /// Fails with [`EngineError::DuplicateWallet`] if the owner already has one.
    async fn create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, EngineError>;

    /// Fetches a wallet by id.
    async fn wallet(&self, id: WalletId) -> Result<Wallet, EngineError>;

    /// Fetches the wallet belonging to an owner.
    async fn wallet_by_owner(&self, owner_id: OwnerId) -> Result<Wallet, EngineError>;

    /// Atomically decrements the balance only if it covers `amount`.
    ///
    /// A single conditional update: on [`EngineError::InsufficientFunds`]
    /// no mutation occurred. This is the sole primitive preventing
    /// double-spend.
    async fn try_debit(&self, wallet_id: WalletId, amount: Decimal)
    -> Result<Decimal, EngineError>;

    /// Atomically increments the balance. Returns the new balance.
    async fn credit(&self, wallet_id: WalletId, amount: Decimal) -> Result<Decimal, EngineError>;

    /// Loads the active commission rules matching (owner, operator, kind).
    ///
    /// Returns at most one rule per tier: the owner's user-specific
    /// override, the owner's assigned scheme's rule (falling back to the
    /// process-default scheme), and the global rule.
    async fn commission_rules(
        &self,
        owner_id: OwnerId,
        operator: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CommissionRule>, EngineError>;

    /// Debits the wallet and records the transaction in one atomic step.
    ///
    /// Either both happen or neither does; a crash in between must not
    /// leave a debited wallet without a record.
    async fn debit_and_record(&self, draft: TransactionDraft)
    -> Result<Transaction, EngineError>;

    /// Records a transaction with no wallet mutation (top-up requests).
    async fn record(&self, draft: TransactionDraft) -> Result<Transaction, EngineError>;

    /// Fetches a transaction by id.
    async fn transaction(&self, id: TransactionId) -> Result<Transaction, EngineError>;

    /// Applies a validated decision action atomically.
    ///
    /// In one storage transaction: claims the status (only if the current
    /// status is still in `expected_from`), stamps the audit fields, applies
    /// the action's wallet credit, and records the refund sub-record. A
    /// claim that matches nothing because the status moved resolves to
    /// [`EngineError::AlreadyProcessed`].
    async fn apply_decision(
        &self,
        id: TransactionId,
        expected_from: &[TransactionStatus],
        action: DecisionAction,
    ) -> Result<Transaction, EngineError>;

    /// Stores the provider's reference on a transaction without changing status.
    async fn set_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<(), EngineError>;
}

#[async_trait]
impl<T: SettlementStore + ?Sized> SettlementStore for std::sync::Arc<T> {
    async fn create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        (**self).create_wallet(owner_id).await
    }

    async fn wallet(&self, id: WalletId) -> Result<Wallet, EngineError> {
        (**self).wallet(id).await
    }

    async fn wallet_by_owner(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        (**self).wallet_by_owner(owner_id).await
    }

    async fn try_debit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        (**self).try_debit(wallet_id, amount).await
    }

    async fn credit(&self, wallet_id: WalletId, amount: Decimal) -> Result<Decimal, EngineError> {
        (**self).credit(wallet_id, amount).await
    }

    async fn commission_rules(
        &self,
        owner_id: OwnerId,
        operator: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CommissionRule>, EngineError> {
        (**self).commission_rules(owner_id, operator, kind).await
    }

    async fn debit_and_record(
        &self,
        draft: TransactionDraft,
    ) -> Result<Transaction, EngineError> {
        (**self).debit_and_record(draft).await
    }

    async fn record(&self, draft: TransactionDraft) -> Result<Transaction, EngineError> {
        (**self).record(draft).await
    }

    async fn transaction(&self, id: TransactionId) -> Result<Transaction, EngineError> {
        (**self).transaction(id).await
    }

    async fn apply_decision(
        &self,
        id: TransactionId,
        expected_from: &[TransactionStatus],
        action: DecisionAction,
    ) -> Result<Transaction, EngineError> {
        (**self).apply_decision(id, expected_from, action).await
    }

    async fn set_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<(), EngineError> {
        (**self).set_provider_ref(id, provider_ref).await
    }
}
