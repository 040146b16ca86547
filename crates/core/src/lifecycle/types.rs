//! Transaction domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use prexo_shared::types::{AdminId, OwnerId, TransactionId, WalletId};

use crate::commission::CommissionBreakdown;

/// Kind of monetary action a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    /// Money added to the wallet. Not pre-debited; approval is the credit.
    Topup,
    /// Prepaid mobile recharge.
    MobileRecharge,
    /// DTH/satellite TV recharge.
    DthRecharge,
    /// Utility bill payment.
    BillPayment,
    /// Voucher purchase.
    VoucherPurchase,
    /// Money transfer to another party.
    Transfer,
}

impl TransactionKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::MobileRecharge => "mobile-recharge",
            Self::DthRecharge => "dth-recharge",
            Self::BillPayment => "bill-payment",
            Self::VoucherPurchase => "voucher-purchase",
            Self::Transfer => "transfer",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "topup" => Some(Self::Topup),
            "mobile-recharge" => Some(Self::MobileRecharge),
            "dth-recharge" => Some(Self::DthRecharge),
            "bill-payment" => Some(Self::BillPayment),
            "voucher-purchase" => Some(Self::VoucherPurchase),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }

    /// Returns true for kinds that debit the wallet at request time.
    #[must_use]
    pub const fn is_spend(&self) -> bool {
        !matches!(self, Self::Topup)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status in the settlement lifecycle.
///
/// The valid transitions are:
/// - `AwaitingApproval` → `Approved`/`Success` (approve), `Rejected` (reject)
/// - `Pending` → `Approved`/`Success` (approve), `Rejected` (reject),
///   `Success` (gateway success), `Failed` (gateway failure or staleness)
/// - `Approved` → `Success` (gateway success), `Failed` (gateway failure)
///
/// `Rejected`, `Success`, and `Failed` are terminal; once reached, the
/// record is immutable except for its refund sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Manual operator; waiting for an administrator decision.
    AwaitingApproval,
    /// Automatic operator; waiting for the provider gateway to respond.
    Pending,
    /// Administrator accepted; terminal settlement still owed by the gateway.
    Approved,
    /// Administrator declined. Pre-debited funds were refunded.
    Rejected,
    /// Settled successfully.
    Success,
    /// Settlement failed. Pre-debited funds were refunded.
    Failed,
}

impl TransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingApproval => "awaiting_approval",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "awaiting_approval" => Some(Self::AwaitingApproval),
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once the transaction can never change status again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Success | Self::Failed)
    }

    /// Returns true while an administrator decision is still allowed.
    #[must_use]
    pub const fn is_decidable(&self) -> bool {
        matches!(self, Self::AwaitingApproval | Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an operator settles transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    /// Requires a human administrator decision.
    Manual,
    /// The provider gateway settles asynchronously.
    Automatic,
}

/// An administrator's decision on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Accept the transaction.
    Approve,
    /// Decline the transaction, refunding any pre-debited funds.
    Reject,
}

/// Status of a compensating refund credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    /// Refund credit recorded but not yet applied to the wallet.
    Pending,
    /// Refund credit applied to the wallet.
    Completed,
}

/// Compensating credit issued when a pre-debited transaction fails or is rejected.
///
/// A transaction is refunded at most once, and never for more than was debited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    /// The credited amount.
    pub amount: Decimal,
    /// Whether the credit has reached the wallet.
    pub status: RefundStatus,
    /// When the credit reached the wallet.
    pub completed_at: Option<DateTime<Utc>>,
}

/// One recorded monetary action, retained forever for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Globally unique, externally referenceable identifier.
    pub id: TransactionId,
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
    /// Total actually debited from the wallet at request time (zero for top-ups).
    pub debited_total: Decimal,
    /// Current lifecycle status.
    pub status: TransactionStatus,
    /// Which external operator/provider handles this, if any.
    pub operator_ref: Option<String>,
    /// Reference assigned by the provider gateway, if any.
    pub provider_ref: Option<String>,
    /// Free-form attributes: subscriber number, biller id, and so on.
    pub metadata: serde_json::Value,
    /// Why the transaction failed, when it did.
    pub failure_reason: Option<String>,
    /// The administrator who decided this transaction, if any.
    pub decided_by: Option<AdminId>,
    /// When the decision was made.
    pub decided_at: Option<DateTime<Utc>>,
    /// Notes attached to the decision.
    pub decision_notes: Option<String>,
    /// The compensating refund, if one was issued.
    pub refund: Option<Refund>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// A validated state transition with its audit stamps and wallet effect.
///
/// Produced by [`super::LifecycleService`]; the storage layer applies the
/// status update, stamps, and wallet credit in one transaction.
#[derive(Debug, Clone)]
pub enum DecisionAction {
    /// Administrator accepted the transaction.
    Approve {
        /// The resulting status (`Success`, or `Approved` when the gateway settles).
        new_status: TransactionStatus,
        /// The administrator who decided.
        decided_by: AdminId,
        /// When the decision was made.
        decided_at: DateTime<Utc>,
        /// Optional notes from the administrator.
        notes: Option<String>,
        /// Wallet credit owed by approval (top-ups only).
        credit: Option<Decimal>,
    },
    /// Administrator declined the transaction.
    Reject {
        /// The resulting status (`Rejected`).
        new_status: TransactionStatus,
        /// The administrator who decided.
        decided_by: AdminId,
        /// When the decision was made.
        decided_at: DateTime<Utc>,
        /// The reason for rejection.
        notes: String,
        /// Refund credit owed for pre-debited funds.
        refund: Option<Decimal>,
    },
    /// Provider gateway reported success.
    Complete {
        /// The resulting status (`Success`).
        new_status: TransactionStatus,
        /// Reference assigned by the provider.
        provider_ref: Option<String>,
    },
    /// Provider gateway reported failure, or the transaction went stale.
    Fail {
        /// The resulting status (`Failed`).
        new_status: TransactionStatus,
        /// Why settlement failed.
        reason: String,
        /// Reference assigned by the provider, if any.
        provider_ref: Option<String>,
        /// Refund credit owed for pre-debited funds.
        refund: Option<Decimal>,
    },
}

impl DecisionAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub const fn new_status(&self) -> TransactionStatus {
        match self {
            Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Complete { new_status, .. }
            | Self::Fail { new_status, .. } => *new_status,
        }
    }

    /// Wallet credit this action must apply atomically with the status change.
    #[must_use]
    pub const fn wallet_credit(&self) -> Option<Decimal> {
        match self {
            Self::Approve { credit, .. } => *credit,
            Self::Reject { refund, .. } | Self::Fail { refund, .. } => *refund,
            Self::Complete { .. } => None,
        }
    }

    /// The refund to record on the transaction, if any.
    #[must_use]
    pub const fn refund_amount(&self) -> Option<Decimal> {
        match self {
            Self::Reject { refund, .. } | Self::Fail { refund, .. } => *refund,
            Self::Approve { .. } | Self::Complete { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            TransactionKind::Topup,
            TransactionKind::MobileRecharge,
            TransactionKind::DthRecharge,
            TransactionKind::BillPayment,
            TransactionKind::VoucherPurchase,
            TransactionKind::Transfer,
        ] {
            assert_eq!(TransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TransactionKind::parse("unknown"), None);
    }

    #[test]
    fn test_only_topup_is_not_spend() {
        assert!(!TransactionKind::Topup.is_spend());
        assert!(TransactionKind::MobileRecharge.is_spend());
        assert!(TransactionKind::Transfer.is_spend());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            TransactionStatus::AwaitingApproval,
            TransactionStatus::Pending,
            TransactionStatus::Approved,
            TransactionStatus::Rejected,
            TransactionStatus::Success,
            TransactionStatus::Failed,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("draft"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(TransactionStatus::Success.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(!TransactionStatus::AwaitingApproval.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Approved.is_terminal());
    }

    #[test]
    fn test_decidable_statuses() {
        assert!(TransactionStatus::AwaitingApproval.is_decidable());
        assert!(TransactionStatus::Pending.is_decidable());
        assert!(!TransactionStatus::Approved.is_decidable());
        assert!(!TransactionStatus::Success.is_decidable());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(
            TransactionStatus::AwaitingApproval.to_string(),
            "awaiting_approval"
        );
        assert_eq!(TransactionKind::MobileRecharge.to_string(), "mobile-recharge");
    }

    #[test]
    fn test_action_wallet_credit() {
        let reject = DecisionAction::Reject {
            new_status: TransactionStatus::Rejected,
            decided_by: AdminId::new(),
            decided_at: Utc::now(),
            notes: "operator outage".to_string(),
            refund: Some(dec!(300)),
        };
        assert_eq!(reject.wallet_credit(), Some(dec!(300)));
        assert_eq!(reject.refund_amount(), Some(dec!(300)));

        let complete = DecisionAction::Complete {
            new_status: TransactionStatus::Success,
            provider_ref: Some("OP-1".to_string()),
        };
        assert_eq!(complete.wallet_credit(), None);
        assert_eq!(complete.refund_amount(), None);
    }
}
