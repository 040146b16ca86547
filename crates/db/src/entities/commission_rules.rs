//! `SeaORM` Entity for the commission_rules table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{CommissionRateType, RuleScope, TransactionKind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commission_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scope: RuleScope,
    /// Set when scope = scheme.
    pub scheme_id: Option<Uuid>,
    /// Set when scope = user.
    pub owner_id: Option<Uuid>,
    pub operator: String,
    pub kind: TransactionKind,
    pub rate_type: CommissionRateType,
    pub value: Decimal,
    pub min_fee: Decimal,
    pub max_fee: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::commission_schemes::Entity",
        from = "Column::SchemeId",
        to = "super::commission_schemes::Column::Id"
    )]
    CommissionSchemes,
}

impl Related<super::commission_schemes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommissionSchemes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
