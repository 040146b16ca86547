//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod commission;
pub mod settlement;
pub mod wallet;

pub use commission::{CommissionRepository, CreateRuleInput, SchemeRecord};
pub use settlement::{SettlementRepository, TransactionFilter};
pub use wallet::WalletRepository;

use prexo_core::error::EngineError;
use sea_orm::DbErr;

use crate::entities::sea_orm_active_enums as db_enums;
use prexo_core::commission::{CommissionSource, RateType};
use prexo_core::lifecycle::{RefundStatus, TransactionKind, TransactionStatus};

/// Maps a database error into the engine's storage error.
pub(crate) fn storage_err(err: DbErr) -> EngineError {
    EngineError::Storage(err.to_string())
}

// ============================================================================
// Enum conversions between database and core representations
// ============================================================================

pub(crate) const fn kind_to_db(kind: TransactionKind) -> db_enums::TransactionKind {
    match kind {
        TransactionKind::Topup => db_enums::TransactionKind::Topup,
        TransactionKind::MobileRecharge => db_enums::TransactionKind::MobileRecharge,
        TransactionKind::DthRecharge => db_enums::TransactionKind::DthRecharge,
        TransactionKind::BillPayment => db_enums::TransactionKind::BillPayment,
        TransactionKind::VoucherPurchase => db_enums::TransactionKind::VoucherPurchase,
        TransactionKind::Transfer => db_enums::TransactionKind::Transfer,
    }
}

pub(crate) const fn kind_from_db(kind: &db_enums::TransactionKind) -> TransactionKind {
    match kind {
        db_enums::TransactionKind::Topup => TransactionKind::Topup,
        db_enums::TransactionKind::MobileRecharge => TransactionKind::MobileRecharge,
        db_enums::TransactionKind::DthRecharge => TransactionKind::DthRecharge,
        db_enums::TransactionKind::BillPayment => TransactionKind::BillPayment,
        db_enums::TransactionKind::VoucherPurchase => TransactionKind::VoucherPurchase,
        db_enums::TransactionKind::Transfer => TransactionKind::Transfer,
    }
}

pub(crate) const fn status_to_db(status: TransactionStatus) -> db_enums::TransactionStatus {
    match status {
        TransactionStatus::AwaitingApproval => db_enums::TransactionStatus::AwaitingApproval,
        TransactionStatus::Pending => db_enums::TransactionStatus::Pending,
        TransactionStatus::Approved => db_enums::TransactionStatus::Approved,
        TransactionStatus::Rejected => db_enums::TransactionStatus::Rejected,
        TransactionStatus::Success => db_enums::TransactionStatus::Success,
        TransactionStatus::Failed => db_enums::TransactionStatus::Failed,
    }
}

pub(crate) const fn status_from_db(status: &db_enums::TransactionStatus) -> TransactionStatus {
    match status {
        db_enums::TransactionStatus::AwaitingApproval => TransactionStatus::AwaitingApproval,
        db_enums::TransactionStatus::Pending => TransactionStatus::Pending,
        db_enums::TransactionStatus::Approved => TransactionStatus::Approved,
        db_enums::TransactionStatus::Rejected => TransactionStatus::Rejected,
        db_enums::TransactionStatus::Success => TransactionStatus::Success,
        db_enums::TransactionStatus::Failed => TransactionStatus::Failed,
    }
}

pub(crate) const fn rate_type_to_db(rate_type: RateType) -> db_enums::CommissionRateType {
    match rate_type {
        RateType::Percentage => db_enums::CommissionRateType::Percentage,
        RateType::Fixed => db_enums::CommissionRateType::Fixed,
    }
}

pub(crate) const fn rate_type_from_db(rate_type: &db_enums::CommissionRateType) -> RateType {
    match rate_type {
        db_enums::CommissionRateType::Percentage => RateType::Percentage,
        db_enums::CommissionRateType::Fixed => RateType::Fixed,
    }
}

pub(crate) const fn source_to_db(source: CommissionSource) -> db_enums::CommissionSource {
    match source {
        CommissionSource::User => db_enums::CommissionSource::User,
        CommissionSource::Scheme => db_enums::CommissionSource::Scheme,
        CommissionSource::Global => db_enums::CommissionSource::Global,
        CommissionSource::None => db_enums::CommissionSource::None,
    }
}

pub(crate) const fn source_from_db(source: &db_enums::CommissionSource) -> CommissionSource {
    match source {
        db_enums::CommissionSource::User => CommissionSource::User,
        db_enums::CommissionSource::Scheme => CommissionSource::Scheme,
        db_enums::CommissionSource::Global => CommissionSource::Global,
        db_enums::CommissionSource::None => CommissionSource::None,
    }
}

pub(crate) const fn refund_status_from_db(status: &db_enums::RefundStatus) -> RefundStatus {
    match status {
        db_enums::RefundStatus::Pending => RefundStatus::Pending,
        db_enums::RefundStatus::Completed => RefundStatus::Completed,
    }
}
