//! `SeaORM` Entity for the wallets table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub owner_id: Uuid,
    pub balance: Decimal,
    pub version: i64,
    /// Commission scheme assigned to this owner, shadowing the default.
    pub scheme_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(
        belongs_to = "super::commission_schemes::Entity",
        from = "Column::SchemeId",
        to = "super::commission_schemes::Column::Id"
    )]
    CommissionSchemes,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::commission_schemes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommissionSchemes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
