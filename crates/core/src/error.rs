//! Error taxonomy for the settlement engine.
//!
//! Every failure mode of the wallet store, lifecycle state machine, and
//! approval engine is a variant here, so callers can distinguish "debit
//! refused" from "someone already decided this" without string matching.

use rust_decimal::Decimal;
use thiserror::Error;

use prexo_shared::types::{OwnerId, TransactionId, WalletId};

use crate::lifecycle::TransactionStatus;

/// Errors that can occur during settlement operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Debit refused because the wallet balance is too low. No mutation occurred.
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// The amount the debit asked for.
        required: Decimal,
        /// The balance at the time of refusal.
        available: Decimal,
    },

    /// Amount is non-positive or otherwise unusable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The transaction already reached a terminal state; no side effects occurred.
    #[error("Transaction {id} already processed (status {status})")]
    AlreadyProcessed {
        /// The transaction that was already decided.
        id: TransactionId,
        /// Its current terminal status.
        status: TransactionStatus,
    },

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: TransactionStatus,
        /// The attempted target status.
        to: TransactionStatus,
    },

    /// Rejection requires a non-empty decision note.
    #[error("Decision notes are required when rejecting")]
    DecisionNotesRequired,

    /// A spend was requested with a kind that does not debit the wallet.
    #[error("Transaction kind {0} is not a spend")]
    NotASpend(crate::lifecycle::TransactionKind),

    /// Wallet not found by id.
    #[error("Wallet {0} not found")]
    WalletNotFound(WalletId),

    /// No wallet exists for the owner.
    #[error("No wallet found for owner {0}")]
    OwnerWalletNotFound(OwnerId),

    /// Transaction not found.
    #[error("Transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// The owner already has a wallet.
    #[error("Owner {0} already has a wallet")]
    DuplicateWallet(OwnerId),

    /// Commission rule not found.
    #[error("Commission rule {0} not found")]
    RuleNotFound(prexo_shared::types::RuleId),

    /// Commission scheme not found.
    #[error("Commission scheme {0} not found")]
    SchemeNotFound(prexo_shared::types::SchemeId),

    /// An active rule already covers this (scope, operator, kind) tuple.
    #[error("An active commission rule already exists for this operator and kind")]
    DuplicateRule,

    /// The provider gateway could not be reached; transaction state is unchanged.
    #[error("Provider gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Storage error. Compound operations abort without partial commit.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InsufficientFunds { .. } => 422,
            Self::InvalidAmount(_) | Self::DecisionNotesRequired | Self::NotASpend(_) => 400,
            Self::AlreadyProcessed { .. } | Self::InvalidTransition { .. } => 409,
            Self::WalletNotFound(_)
            | Self::OwnerWalletNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::RuleNotFound(_)
            | Self::SchemeNotFound(_) => 404,
            Self::DuplicateWallet(_) | Self::DuplicateRule => 409,
            Self::GatewayUnavailable(_) => 503,
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DecisionNotesRequired => "DECISION_NOTES_REQUIRED",
            Self::NotASpend(_) => "INVALID_KIND",
            Self::WalletNotFound(_) | Self::OwnerWalletNotFound(_) => "WALLET_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::SchemeNotFound(_) => "SCHEME_NOT_FOUND",
            Self::DuplicateWallet(_) => "DUPLICATE_WALLET",
            Self::DuplicateRule => "DUPLICATE_RULE",
            Self::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}
