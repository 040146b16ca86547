//! Commission scheme and rule repository.
//!
//! Loads the rules feeding the resolver's precedence lookup and carries the
//! administrative CRUD surface for schemes and rules.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::Serialize;

use prexo_core::commission::{CommissionRule, RateType, RuleScope};
use prexo_core::error::EngineError;
use prexo_core::lifecycle::TransactionKind;
use prexo_shared::types::{OwnerId, RuleId, SchemeId};

use crate::entities::sea_orm_active_enums as db_enums;
use crate::entities::{commission_rules, commission_schemes, wallets};
use crate::repositories::{
    kind_from_db, kind_to_db, rate_type_from_db, rate_type_to_db, storage_err,
};

/// Input for creating a commission rule.
#[derive(Debug, Clone)]
pub struct CreateRuleInput {
    /// Who the rule applies to (carries the scheme/owner key).
    pub scope: RuleScope,
    /// The operator/provider the rule matches.
    pub operator: String,
    /// The transaction kind the rule matches.
    pub kind: TransactionKind,
    /// How `value` is interpreted.
    pub rate_type: RateType,
    /// Percentage or flat value.
    pub value: Decimal,
    /// Lower clamp on the computed fee.
    pub min_fee: Decimal,
    /// Upper clamp on the computed fee.
    pub max_fee: Option<Decimal>,
}

/// A commission scheme as stored.
#[derive(Debug, Clone, Serialize)]
pub struct SchemeRecord {
    /// Unique scheme identifier.
    pub id: SchemeId,
    /// Human-readable name.
    pub name: String,
    /// Whether this is the process-wide default.
    pub is_default: bool,
    /// Whether the scheme is active.
    pub is_active: bool,
}

/// Repository for commission schemes and rules.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    db: DatabaseConnection,
}

impl CommissionRepository {
    /// Creates a new commission repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the active rules matching (owner, operator, kind), one per tier.
    ///
    /// The scheme tier uses the owner's assigned scheme when set, otherwise
    /// the process-default scheme.
    pub async fn rules_for(
        &self,
        owner_id: OwnerId,
        operator: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CommissionRule>, EngineError> {
        let assigned = wallets::Entity::find()
            .filter(wallets::Column::OwnerId.eq(owner_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .and_then(|w| w.scheme_id);

        let scheme_id = match assigned {
            Some(id) => Some(id),
            None => self.default_scheme_id().await?,
        };

        let mut scopes = Condition::any()
            .add(
                Condition::all()
                    .add(commission_rules::Column::Scope.eq(db_enums::RuleScope::User))
                    .add(commission_rules::Column::OwnerId.eq(owner_id.into_inner())),
            )
            .add(commission_rules::Column::Scope.eq(db_enums::RuleScope::Global));
        if let Some(scheme) = scheme_id {
            scopes = scopes.add(
                Condition::all()
                    .add(commission_rules::Column::Scope.eq(db_enums::RuleScope::Scheme))
                    .add(commission_rules::Column::SchemeId.eq(scheme)),
            );
        }

        let models = commission_rules::Entity::find()
            .filter(commission_rules::Column::IsActive.eq(true))
            .filter(commission_rules::Column::Operator.eq(operator))
            .filter(commission_rules::Column::Kind.eq(kind_to_db(kind)))
            .filter(scopes)
            .all(&self.db)
            .await
            .map_err(storage_err)?;

        models.into_iter().map(to_rule).collect()
    }

    /// Creates a commission rule.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateRule`] when an active rule already
    /// covers the (scope key, operator, kind) tuple.
    pub async fn create_rule(&self, input: CreateRuleInput) -> Result<CommissionRule, EngineError> {
        if input.value < Decimal::ZERO {
            return Err(EngineError::InvalidAmount(
                "rule value must not be negative".to_string(),
            ));
        }

        let (scope, scheme_id, owner_id) = match input.scope {
            RuleScope::Global => (db_enums::RuleScope::Global, None, None),
            RuleScope::Scheme { scheme_id } => (
                db_enums::RuleScope::Scheme,
                Some(scheme_id.into_inner()),
                None,
            ),
            RuleScope::User { owner_id } => {
                (db_enums::RuleScope::User, None, Some(owner_id.into_inner()))
            }
        };

        let now = Utc::now();
        let rule = commission_rules::ActiveModel {
            id: Set(RuleId::new().into_inner()),
            scope: Set(scope),
            scheme_id: Set(scheme_id),
            owner_id: Set(owner_id),
            operator: Set(input.operator),
            kind: Set(kind_to_db(input.kind)),
            rate_type: Set(rate_type_to_db(input.rate_type)),
            value: Set(input.value),
            min_fee: Set(input.min_fee),
            max_fee: Set(input.max_fee),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match rule.insert(&self.db).await {
            Ok(model) => to_rule(model),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Err(EngineError::DuplicateRule),
                _ => Err(storage_err(err)),
            },
        }
    }

    /// Lists all active rules, most specific scope first.
    pub async fn list_rules(&self) -> Result<Vec<CommissionRule>, EngineError> {
        let models = commission_rules::Entity::find()
            .filter(commission_rules::Column::IsActive.eq(true))
            .order_by_desc(commission_rules::Column::Scope)
            .order_by_asc(commission_rules::Column::Operator)
            .all(&self.db)
            .await
            .map_err(storage_err)?;

        models.into_iter().map(to_rule).collect()
    }

    /// Deactivates a rule, freeing its (scope, operator, kind) tuple.
    pub async fn deactivate_rule(&self, rule_id: RuleId) -> Result<(), EngineError> {
        let model = commission_rules::Entity::find_by_id(rule_id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::RuleNotFound(rule_id))?;

        let mut active: commission_rules::ActiveModel = model.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await.map_err(storage_err)?;
        Ok(())
    }

    /// Creates a commission scheme.
    pub async fn create_scheme(
        &self,
        name: String,
        is_default: bool,
    ) -> Result<SchemeRecord, EngineError> {
        let id = SchemeId::new();
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(storage_err)?;

        if is_default {
            clear_default(&txn).await?;
        }

        let scheme = commission_schemes::ActiveModel {
            id: Set(id.into_inner()),
            name: Set(name),
            is_default: Set(is_default),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let model = scheme.insert(&txn).await.map_err(storage_err)?;

        txn.commit().await.map_err(storage_err)?;
        Ok(to_scheme(model))
    }

    /// Lists all schemes.
    pub async fn list_schemes(&self) -> Result<Vec<SchemeRecord>, EngineError> {
        let models = commission_schemes::Entity::find()
            .order_by_asc(commission_schemes::Column::Name)
            .all(&self.db)
            .await
            .map_err(storage_err)?;
        Ok(models.into_iter().map(to_scheme).collect())
    }

    /// Marks a scheme as the process-wide default, clearing any previous one.
    pub async fn set_default_scheme(&self, scheme_id: SchemeId) -> Result<(), EngineError> {
        let txn = self.db.begin().await.map_err(storage_err)?;

        let model = commission_schemes::Entity::find_by_id(scheme_id.into_inner())
            .one(&txn)
            .await
            .map_err(storage_err)?
            .ok_or(EngineError::SchemeNotFound(scheme_id))?;

        clear_default(&txn).await?;

        let mut active: commission_schemes::ActiveModel = model.into();
        active.is_default = Set(true);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await.map_err(storage_err)?;

        txn.commit().await.map_err(storage_err)
    }

    async fn default_scheme_id(&self) -> Result<Option<sea_orm::prelude::Uuid>, EngineError> {
        let model = commission_schemes::Entity::find()
            .filter(commission_schemes::Column::IsDefault.eq(true))
            .filter(commission_schemes::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(storage_err)?;
        Ok(model.map(|m| m.id))
    }
}

async fn clear_default<C: sea_orm::ConnectionTrait>(conn: &C) -> Result<(), EngineError> {
    use sea_orm::sea_query::Expr;

    commission_schemes::Entity::update_many()
        .col_expr(commission_schemes::Column::IsDefault, Expr::value(false))
        .col_expr(commission_schemes::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(commission_schemes::Column::IsDefault.eq(true))
        .exec(conn)
        .await
        .map_err(storage_err)?;
    Ok(())
}

fn to_scheme(model: commission_schemes::Model) -> SchemeRecord {
    SchemeRecord {
        id: SchemeId::from_uuid(model.id),
        name: model.name,
        is_default: model.is_default,
        is_active: model.is_active,
    }
}

fn to_rule(model: commission_rules::Model) -> Result<CommissionRule, EngineError> {
    let scope = match model.scope {
        db_enums::RuleScope::Global => RuleScope::Global,
        db_enums::RuleScope::Scheme => RuleScope::Scheme {
            scheme_id: SchemeId::from_uuid(model.scheme_id.ok_or_else(|| {
                EngineError::Storage(format!("scheme rule {} missing scheme_id", model.id))
            })?),
        },
        db_enums::RuleScope::User => RuleScope::User {
            owner_id: OwnerId::from_uuid(model.owner_id.ok_or_else(|| {
                EngineError::Storage(format!("user rule {} missing owner_id", model.id))
            })?),
        },
    };

    Ok(CommissionRule {
        id: RuleId::from_uuid(model.id),
        scope,
        operator: model.operator,
        kind: kind_from_db(&model.kind),
        rate_type: rate_type_from_db(&model.rate_type),
        value: model.value,
        min_fee: model.min_fee,
        max_fee: model.max_fee,
    })
}
