//! Settlement repository: the engine's storage handle over Postgres.
//!
//! Implements [`SettlementStore`] with the compound atomic operations the
//! engine depends on. The debit + record pair shares one database
//! transaction, and decision claims take a row lock so concurrent
//! decisions on the same transaction serialize; the loser re-reads a
//! terminal status and resolves to `AlreadyProcessed`.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use prexo_core::commission::{CommissionBreakdown, CommissionRule};
use prexo_core::error::EngineError;
use prexo_core::lifecycle::{
    DecisionAction, Refund, Transaction, TransactionKind, TransactionStatus,
};
use prexo_core::store::{SettlementStore, TransactionDraft};
use prexo_core::wallet::Wallet;
use prexo_shared::types::{
    AdminId, OwnerId, PageRequest, RuleId, TransactionId, WalletId,
};

use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::transactions;
use crate::repositories::wallet::{credit_on, try_debit_on};
use crate::repositories::{
    kind_from_db, kind_to_db, rate_type_from_db, rate_type_to_db, refund_status_from_db,
    source_from_db, source_to_db, status_from_db, status_to_db, storage_err,
    CommissionRepository, WalletRepository,
};

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by owner.
    pub owner_id: Option<OwnerId>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Filter by kind.
    pub kind: Option<TransactionKind>,
    /// Filter by creation time range start.
    pub created_from: Option<chrono::DateTime<Utc>>,
    /// Filter by creation time range end.
    pub created_to: Option<chrono::DateTime<Utc>>,
}

/// Postgres-backed settlement store.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
    wallets: WalletRepository,
    commissions: CommissionRepository,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            wallets: WalletRepository::new(db.clone()),
            commissions: CommissionRepository::new(db.clone()),
            db,
        }
    }

    /// Lists transactions for the admin queue and owner history views.
    ///
    /// Returns the page of records plus the unfiltered total for the same
    /// filter, ordered newest first.
    pub async fn list(
        &self,
        filter: TransactionFilter,
        page: &PageRequest,
    ) -> Result<(Vec<Transaction>, u64), EngineError> {
        let mut query = transactions::Entity::find();

        if let Some(owner_id) = filter.owner_id {
            query = query.filter(transactions::Column::OwnerId.eq(owner_id.into_inner()));
        }
        if let Some(status) = filter.status {
            query = query.filter(transactions::Column::Status.eq(status_to_db(status)));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind_to_db(kind)));
        }
        if let Some(from) = filter.created_from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(transactions::Column::CreatedAt.lte(to));
        }

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(storage_err)?;

        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(storage_err)?;

        Ok((models.into_iter().map(to_transaction).collect(), total))
    }
}

#[async_trait]
impl SettlementStore for SettlementRepository {
    async fn create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        self.wallets.create(owner_id).await
    }

    async fn wallet(&self, id: WalletId) -> Result<Wallet, EngineError> {
        self.wallets.find(id).await
    }

    async fn wallet_by_owner(&self, owner_id: OwnerId) -> Result<Wallet, EngineError> {
        self.wallets.find_by_owner(owner_id).await
    }

    async fn try_debit(
        &self,
        wallet_id: WalletId,
        amount: Decimal,
    ) -> Result<Decimal, EngineError> {
        self.wallets.try_debit(wallet_id, amount).await
    }

    async fn credit(&self, wallet_id: WalletId, amount: Decimal) -> Result<Decimal, EngineError> {
        self.wallets.credit(wallet_id, amount).await
    }

    async fn commission_rules(
        &self,
        owner_id: OwnerId,
        operator: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CommissionRule>, EngineError> {
        self.commissions.rules_for(owner_id, operator, kind).await
    }

    async fn debit_and_record(
        &self,
        draft: TransactionDraft,
    ) -> Result<Transaction, EngineError> {
        let txn = self.db.begin().await.map_err(storage_err)?;

        // Debit inside the same transaction as the insert: either the
        // wallet loses the money and the record exists, or neither.
        if draft.debit_total > Decimal::ZERO {
            try_debit_on(&txn, draft.wallet_id, draft.debit_total).await?;
        }

        let model = insert_draft(&txn, draft).await?;

        txn.commit().await.map_err(storage_err)?;
        debug!(transaction_id = %model.id, wallet_id = %model.wallet_id, "debit and record committed");
        Ok(to_transaction(model))
    }

    async fn record(&self, draft: TransactionDraft) -> Result<Transaction, EngineError> {
        // Wallet existence check keeps records tied to a real wallet.
        crate::repositories::wallet::find_on(&self.db, draft.wallet_id).await?;

        let model = insert_draft(&self.db, draft).await?;
        Ok(to_transaction(model))
    }

    async fn transaction(&self, id: TransactionId) -> Result<Transaction, EngineError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::TransactionNotFound(id))?;
        Ok(to_transaction(model))
    }

    async fn apply_decision(
        &self,
        id: TransactionId,
        expected_from: &[TransactionStatus],
        action: DecisionAction,
    ) -> Result<Transaction, EngineError> {
        let txn = self.db.begin().await.map_err(storage_err)?;

        // Row lock serializes concurrent decisions; the second claimant
        // blocks here and then re-reads the committed terminal status.
        let model = transactions::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::TransactionNotFound(id))?;

        let current = status_from_db(&model.status);
        if !expected_from.contains(&current) {
            if current.is_terminal() {
                return Err(EngineError::AlreadyProcessed {
                    id,
                    status: current,
                });
            }
            return Err(EngineError::InvalidTransition {
                from: current,
                to: action.new_status(),
            });
        }

        let wallet_id = WalletId::from_uuid(model.wallet_id);
        if let Some(amount) = action.wallet_credit() {
            credit_on(&txn, wallet_id, amount).await?;
        }

        let now = Utc::now();
        let mut active: transactions::ActiveModel = model.into();
        active.status = Set(status_to_db(action.new_status()));
        active.updated_at = Set(now.into());

        match &action {
            DecisionAction::Approve {
                decided_by,
                decided_at,
                notes,
                ..
            } => {
                active.decided_by = Set(Some(decided_by.into_inner()));
                active.decided_at = Set(Some((*decided_at).into()));
                active.decision_notes = Set(notes.clone());
            }
            DecisionAction::Reject {
                decided_by,
                decided_at,
                notes,
                ..
            } => {
                active.decided_by = Set(Some(decided_by.into_inner()));
                active.decided_at = Set(Some((*decided_at).into()));
                active.decision_notes = Set(Some(notes.clone()));
            }
            DecisionAction::Complete { provider_ref, .. } => {
                if let Some(provider_ref) = provider_ref {
                    active.provider_ref = Set(Some(provider_ref.clone()));
                }
            }
            DecisionAction::Fail {
                reason,
                provider_ref,
                ..
            } => {
                active.failure_reason = Set(Some(reason.clone()));
                if let Some(provider_ref) = provider_ref {
                    active.provider_ref = Set(Some(provider_ref.clone()));
                }
            }
        }

        if let Some(refund) = action.refund_amount() {
            active.refund_amount = Set(Some(refund));
            active.refund_status = Set(Some(db_enums::RefundStatus::Completed));
            active.refund_completed_at = Set(Some(now.into()));
        }

        let updated = active.update(&txn).await.map_err(storage_err)?;
        txn.commit().await.map_err(storage_err)?;
        debug!(transaction_id = %updated.id, status = ?updated.status, "decision claim committed");

        Ok(to_transaction(updated))
    }

    async fn set_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<(), EngineError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::TransactionNotFound(id))?;

        let mut active: transactions::ActiveModel = model.into();
        active.provider_ref = Set(Some(provider_ref.to_string()));
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(storage_err)?;
        Ok(())
    }
}

// ============================================================================
// Model conversion
// ============================================================================

async fn insert_draft<C: ConnectionTrait>(
    conn: &C,
    draft: TransactionDraft,
) -> Result<transactions::Model, EngineError> {
    let now = Utc::now();
    let model = transactions::ActiveModel {
        id: Set(TransactionId::new().into_inner()),
        owner_id: Set(draft.owner_id.into_inner()),
        wallet_id: Set(draft.wallet_id.into_inner()),
        kind: Set(kind_to_db(draft.kind)),
        amount: Set(draft.amount),
        commission_amount: Set(draft.commission.amount),
        commission_rate_type: Set(rate_type_to_db(draft.commission.rate_type)),
        commission_rate_value: Set(draft.commission.rate_value),
        commission_source: Set(source_to_db(draft.commission.source)),
        commission_rule_id: Set(draft.commission.rule_id.map(RuleId::into_inner)),
        debited_total: Set(draft.debit_total),
        status: Set(status_to_db(draft.status)),
        operator_ref: Set(draft.operator_ref),
        provider_ref: Set(None),
        metadata: Set(draft.metadata),
        failure_reason: Set(None),
        decided_by: Set(None),
        decided_at: Set(None),
        decision_notes: Set(None),
        refund_amount: Set(None),
        refund_status: Set(None),
        refund_completed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    model.insert(conn).await.map_err(storage_err)
}

pub(crate) fn to_transaction(model: transactions::Model) -> Transaction {
    let refund = match (model.refund_amount, &model.refund_status) {
        (Some(amount), Some(status)) => Some(Refund {
            amount,
            status: refund_status_from_db(status),
            completed_at: model.refund_completed_at.map(Into::into),
        }),
        _ => None,
    };

    Transaction {
        id: TransactionId::from_uuid(model.id),
        owner_id: OwnerId::from_uuid(model.owner_id),
        wallet_id: WalletId::from_uuid(model.wallet_id),
        kind: kind_from_db(&model.kind),
        amount: model.amount,
        commission: CommissionBreakdown {
            amount: model.commission_amount,
            rate_type: rate_type_from_db(&model.commission_rate_type),
            rate_value: model.commission_rate_value,
            source: source_from_db(&model.commission_source),
            rule_id: model.commission_rule_id.map(RuleId::from_uuid),
        },
        debited_total: model.debited_total,
        status: status_from_db(&model.status),
        operator_ref: model.operator_ref,
        provider_ref: model.provider_ref,
        metadata: model.metadata,
        failure_reason: model.failure_reason,
        decided_by: model.decided_by.map(AdminId::from_uuid),
        decided_at: model.decided_at.map(Into::into),
        decision_notes: model.decision_notes,
        refund,
        created_at: model.created_at.into(),
        updated_at: model.updated_at.into(),
    }
}
