//! Database enum definitions mapped to Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of monetary action a transaction records.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_kind")]
pub enum TransactionKind {
    /// Money added to the wallet.
    #[sea_orm(string_value = "topup")]
    Topup,
    /// Prepaid mobile recharge.
    #[sea_orm(string_value = "mobile-recharge")]
    MobileRecharge,
    /// DTH/satellite TV recharge.
    #[sea_orm(string_value = "dth-recharge")]
    DthRecharge,
    /// Utility bill payment.
    #[sea_orm(string_value = "bill-payment")]
    BillPayment,
    /// Voucher purchase.
    #[sea_orm(string_value = "voucher-purchase")]
    VoucherPurchase,
    /// Money transfer to another party.
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

/// Transaction status in the settlement lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Waiting for an administrator decision.
    #[sea_orm(string_value = "awaiting_approval")]
    AwaitingApproval,
    /// Waiting for the provider gateway.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved; gateway settlement outstanding.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Declined by an administrator.
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Settled successfully.
    #[sea_orm(string_value = "success")]
    Success,
    /// Settlement failed.
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// How a commission rule's value is interpreted.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "commission_rate_type")]
pub enum CommissionRateType {
    /// Percent of the transaction amount.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// Flat fee.
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Who a commission rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "rule_scope")]
pub enum RuleScope {
    /// Applies to everyone unless shadowed.
    #[sea_orm(string_value = "global")]
    Global,
    /// Applies to owners of one scheme.
    #[sea_orm(string_value = "scheme")]
    Scheme,
    /// Applies to one owner.
    #[sea_orm(string_value = "user")]
    User,
}

/// Which tier produced a transaction's commission.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "commission_source")]
pub enum CommissionSource {
    /// A user-specific override won.
    #[sea_orm(string_value = "user")]
    User,
    /// A scheme rule won.
    #[sea_orm(string_value = "scheme")]
    Scheme,
    /// The global rule won.
    #[sea_orm(string_value = "global")]
    Global,
    /// No rule matched.
    #[sea_orm(string_value = "none")]
    None,
}

/// Status of a compensating refund credit.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "refund_status")]
pub enum RefundStatus {
    /// Recorded but not yet applied.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Applied to the wallet.
    #[sea_orm(string_value = "completed")]
    Completed,
}
