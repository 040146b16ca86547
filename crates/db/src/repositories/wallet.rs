//! Wallet repository: the atomic balance primitives.
//!
//! The conditional debit is a single `UPDATE ... WHERE balance >= amount`;
//! two concurrent debits can both pass any prior read, but only one can
//! match the condition at execution time. There is deliberately no
//! read-then-write path to a balance anywhere in this crate.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, SqlErr,
};

use prexo_core::error::EngineError;
use prexo_core::wallet::Wallet;
use prexo_shared::types::{OwnerId, SchemeId, WalletId};

use crate::entities::wallets;
use crate::repositories::storage_err;

/// Repository for wallet balance records.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
}

impl WalletRepository {
    /// Creates a new wallet repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a zero-balance wallet for an owner.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateWallet`] when the owner already has
    /// one (enforced by the unique index, so concurrent creates cannot
    /// both succeed).
    pub async fn create(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        let now = Utc::now();
        let wallet = wallets::ActiveModel {
            id: Set(WalletId::new().into_inner()),
            owner_id: Set(owner_id.into_inner()),
            balance: Set(Decimal::ZERO),
            version: Set(0),
            scheme_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match wallet.insert(&self.db).await {
            Ok(model) => Ok(to_wallet(model)),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(EngineError::DuplicateWallet(owner_id))
                }
                _ => Err(storage_err(err)),
            },
        }
    }

    /// Fetches a wallet by id.
    pub async fn find(&self, id: WalletId) -> Result<Wallet, EngineError> {
        find_on(&self.db, id).await
    }

    /// Fetches the wallet belonging to an owner.
    pub async fn find_by_owner(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::OwnerWalletNotFound(owner_id))?;
        Ok(to_wallet(model))
    }

    /// Atomically decrements the balance only if it covers `amount`.
    pub async fn try_debit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        try_debit_on(&self.db, wallet_id, amount).await
    }

    /// Atomically increments the balance.
    pub async fn credit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        credit_on(&self.db, wallet_id, amount).await
    }

    /// Assigns an owner's wallet to a commission scheme.
    pub async fn assign_scheme(
        &self,
        owner_id: OwnerId,
        scheme_id: Option<SchemeId>,
    ) -> Result<Wallet, EngineError> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::OwnerWalletNotFound(owner_id))?;

        let mut active: wallets::ActiveModel = model.into();
        active.scheme_id = Set(scheme_id.map(SchemeId::into_inner));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await.map_err(storage_err)?;
        Ok(to_wallet(updated))
    }
}

// ============================================================================
// Connection-generic primitives, shared with the settlement repository so
// the same debit/credit runs inside its transactions
// ============================================================================

pub(crate) fn to_wallet(model: wallets::Model) -> Wallet {
    Wallet {
        id: WalletId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        balance: model.balance,
        version: model.version,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}

pub(crate) async fn find_on<C: ConnectionTrait>(
    conn: &C,
    id: WalletId,
) -> Result<Wallet, EngineError> {
    let model = wallets::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(storage_err)?
        .ok_or(EngineError::WalletNotFound(id))?;
    Ok(to_wallet(model))
}

/// The conditional debit: one `UPDATE ... WHERE id = ? AND balance >= ?`.
///
/// A zero-row result means either the wallet is missing or the balance was
/// insufficient; a follow-up read disambiguates, after the fact and with no
/// mutation either way.
pub(crate) async fn try_debit_on<C: ConnectionTrait>(
    conn: &C,
    wallet_id: WalletId,
    amount: Decimal,
) -> Result<Decimal, EngineError> {
    let result = wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Balance,
            Expr::col(wallets::Column::Balance).sub(amount),
        )
        .col_expr(
            wallets::Column::Version,
            Expr::col(wallets::Column::Version).add(1),
        )
        .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
        .filter(wallets::Column::Balance.gte(amount))
        .exec(conn)
        .await
        .map_err(storage_err)?;

    if result.rows_affected == 0 {
        let wallet = find_on(conn, wallet_id).await?;
        return Err(EngineError::InsufficientFunds {
            required: amount,
            available: wallet.balance,
        });
    }

    let wallet = find_on(conn, wallet_id).await?;
    Ok(wallet.balance)
}

/// The unconditional atomic credit: one `UPDATE ... SET balance = balance + ?`.
pub(crate) async fn credit_on<C: ConnectionTrait>(
    conn: &C,
    wallet_id: WalletId,
    amount: Decimal,
) -> Result<Decimal, EngineError> {
    let result = wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Balance,
            Expr::col(wallets::Column::Balance).add(amount),
        )
        .col_expr(
            wallets::Column::Version,
            Expr::col(wallets::Column::Version).add(1),
        )
        .col_expr(wallets::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(wallets::Column::Id.eq(wallet_id.into_inner()))
        .exec(conn)
        .await
        .map_err(storage_err)?;

    if result.rows_affected == 0 {
        return Err(EngineError::WalletNotFound(wallet_id));
    }

    let wallet = find_on(conn, wallet_id).await?;
    Ok(wallet.balance)
}
