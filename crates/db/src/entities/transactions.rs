//! `SeaORM` Entity for the transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{
    CommissionRateType, CommissionSource, RefundStatus, TransactionKind, TransactionStatus,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub commission_amount: Decimal,
    pub commission_rate_type: CommissionRateType,
    pub commission_rate_value: Decimal,
    pub commission_source: CommissionSource,
    pub commission_rule_id: Option<Uuid>,
    /// Total actually taken from the wallet at request time.
    pub debited_total: Decimal,
    pub status: TransactionStatus,
    pub operator_ref: Option<String>,
    pub provider_ref: Option<String>,
    pub metadata: Json,
    pub failure_reason: Option<String>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTimeWithTimeZone>,
    pub decision_notes: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub refund_status: Option<RefundStatus>,
    pub refund_completed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
