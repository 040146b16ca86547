//! Centralized transition validation for the transaction lifecycle.
//!
//! Both the single and bulk decision paths, the gateway callback path, and
//! the staleness path go through these functions; nothing else in the
//! system changes a transaction's status.

use chrono::Utc;
use rust_decimal::Decimal;

use prexo_shared::types::AdminId;

use crate::engine::SettlementPolicy;
use crate::error::EngineError;
use crate::lifecycle::types::{DecisionAction, Transaction, TransactionStatus};

/// Stateless service validating lifecycle transitions.
///
/// Methods take the current record, validate the requested transition, and
/// return a [`DecisionAction`] carrying the audit stamps and the wallet
/// credit the storage layer must apply atomically with the status change.
pub struct LifecycleService;

impl LifecycleService {
    /// Approve a transaction awaiting a decision.
    ///
    /// For top-ups the approval is the credit: nothing was pre-debited, so
    /// the action carries a wallet credit of the full amount and settles as
    /// `Success`. Pre-debited spend kinds settle as `Success` with no
    /// further wallet mutation, unless `await_gateway` is set, in which
    /// case the record parks in `Approved` until the gateway reports.
    ///
    /// # Errors
    ///
    /// * [`EngineError::AlreadyProcessed`] if the status is terminal
    /// * [`EngineError::InvalidTransition`] if the status is not decidable
    pub fn approve(
        tx: &Transaction,
        decided_by: AdminId,
        notes: Option<String>,
        await_gateway: bool,
    ) -> Result<DecisionAction, EngineError> {
        Self::ensure_decidable(tx, TransactionStatus::Approved)?;

        let (new_status, credit) = if tx.kind.is_spend() {
            if await_gateway {
                (TransactionStatus::Approved, None)
            } else {
                (TransactionStatus::Success, None)
            }
        } else {
            // Top-ups are not pre-debited; the approval is the credit.
            (TransactionStatus::Success, Some(tx.amount))
        };

        Ok(DecisionAction::Approve {
            new_status,
            decided_by,
            decided_at: Utc::now(),
            notes,
            credit,
        })
    }

    /// Reject a transaction awaiting a decision.
    ///
    /// Pre-debited funds are refunded per the settlement policy; top-ups
    /// refund nothing because nothing was taken.
    ///
    /// # Errors
    ///
    /// * [`EngineError::DecisionNotesRequired`] if `notes` is empty
    /// * [`EngineError::AlreadyProcessed`] if the status is terminal
    /// * [`EngineError::InvalidTransition`] if the status is not decidable
    pub fn reject(
        tx: &Transaction,
        decided_by: AdminId,
        notes: String,
        policy: &SettlementPolicy,
    ) -> Result<DecisionAction, EngineError> {
        if notes.trim().is_empty() {
            return Err(EngineError::DecisionNotesRequired);
        }

        Self::ensure_decidable(tx, TransactionStatus::Rejected)?;

        Ok(DecisionAction::Reject {
            new_status: TransactionStatus::Rejected,
            decided_by,
            decided_at: Utc::now(),
            notes,
            refund: Self::refund_amount(tx, policy),
        })
    }

    /// Settle a transaction the provider gateway reported successful.
    ///
    /// # Errors
    ///
    /// * [`EngineError::AlreadyProcessed`] if the status is terminal
    /// * [`EngineError::InvalidTransition`] from `AwaitingApproval`
    pub fn complete(
        tx: &Transaction,
        provider_ref: Option<String>,
    ) -> Result<DecisionAction, EngineError> {
        Self::ensure_gateway_settleable(tx, TransactionStatus::Success)?;

        Ok(DecisionAction::Complete {
            new_status: TransactionStatus::Success,
            provider_ref,
        })
    }

    /// Fail a transaction, refunding pre-debited funds.
    ///
    /// Used for gateway-reported failures and for stale `Pending`
    /// transactions a scheduler decides to time out; both take the same
    /// path and the same refund semantics.
    ///
    /// # Errors
    ///
    /// * [`EngineError::AlreadyProcessed`] if the status is terminal
    /// * [`EngineError::InvalidTransition`] from `AwaitingApproval`
    pub fn fail(
        tx: &Transaction,
        reason: String,
        provider_ref: Option<String>,
        policy: &SettlementPolicy,
    ) -> Result<DecisionAction, EngineError> {
        Self::ensure_gateway_settleable(tx, TransactionStatus::Failed)?;

        Ok(DecisionAction::Fail {
            new_status: TransactionStatus::Failed,
            reason,
            provider_ref,
            refund: Self::refund_amount(tx, policy),
        })
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - `AwaitingApproval` → `Approved`, `Success`, `Rejected`
    /// - `Pending` → `Approved`, `Success`, `Rejected`, `Failed`
    /// - `Approved` → `Success`, `Failed`
    #[must_use]
    pub fn is_valid_transition(from: TransactionStatus, to: TransactionStatus) -> bool {
        matches!(
            (from, to),
            (
                TransactionStatus::AwaitingApproval,
                TransactionStatus::Approved | TransactionStatus::Success | TransactionStatus::Rejected
            ) | (
                TransactionStatus::Pending,
                TransactionStatus::Approved
                    | TransactionStatus::Success
                    | TransactionStatus::Rejected
                    | TransactionStatus::Failed
            ) | (
                TransactionStatus::Approved,
                TransactionStatus::Success | TransactionStatus::Failed
            )
        )
    }

    /// The refund owed if this transaction is rejected or fails now.
    ///
    /// Uses the persisted debited total rather than recomputing from the
    /// current policy flags, so a policy change between debit and decision
    /// cannot over-refund. A transaction that debited nothing refunds
    /// nothing.
    #[must_use]
    pub fn refund_amount(tx: &Transaction, policy: &SettlementPolicy) -> Option<Decimal> {
        if tx.debited_total <= Decimal::ZERO {
            return None;
        }

        let amount = if policy.refund_commission {
            tx.debited_total
        } else {
            tx.amount.min(tx.debited_total)
        };
        Some(amount)
    }

    fn ensure_decidable(tx: &Transaction, to: TransactionStatus) -> Result<(), EngineError> {
        if tx.status.is_terminal() {
            return Err(EngineError::AlreadyProcessed {
                id: tx.id,
                status: tx.status,
            });
        }
        if !tx.status.is_decidable() {
            return Err(EngineError::InvalidTransition {
                from: tx.status,
                to,
            });
        }
        Ok(())
    }

    fn ensure_gateway_settleable(
        tx: &Transaction,
        to: TransactionStatus,
    ) -> Result<(), EngineError> {
        if tx.status.is_terminal() {
            return Err(EngineError::AlreadyProcessed {
                id: tx.id,
                status: tx.status,
            });
        }
        if !matches!(
            tx.status,
            TransactionStatus::Pending | TransactionStatus::Approved
        ) {
            return Err(EngineError::InvalidTransition {
                from: tx.status,
                to,
            });
        }
        Ok(())
    }
}
