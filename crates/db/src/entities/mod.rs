//! `SeaORM` entity definitions.

pub mod commission_rules;
pub mod commission_schemes;
pub mod sea_orm_active_enums;
pub mod transactions;
pub mod wallets;
