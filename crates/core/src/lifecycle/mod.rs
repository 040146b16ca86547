//! Transaction lifecycle state machine.
//!
//! Every status transition in the system, whether from an administrator
//! decision, a provider callback, or a staleness policy, is validated by
//! [`LifecycleService`] and expressed as a [`DecisionAction`]. Single and
//! bulk decision paths share the same validation.

pub mod service;
pub mod types;

pub use service::LifecycleService;
pub use types::{
    Decision, DecisionAction, ProcessingMode, Refund, RefundStatus, Transaction, TransactionKind,
    TransactionStatus,
};
