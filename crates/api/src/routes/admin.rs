//! Administrative routes: decisions, the approval queue, commission rules.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use prexo_core::commission::{CommissionRule, RateType, RuleScope};
use prexo_core::engine::DecideOptions;
use prexo_core::lifecycle::{Decision, TransactionKind, TransactionStatus};
use prexo_db::repositories::{CreateRuleInput, TransactionFilter, WalletRepository};
use prexo_shared::types::{
    AdminId, OwnerId, PageRequest, PageResponse, RuleId, SchemeId, TransactionId,
};

use crate::routes::{error_response, TransactionResponse};
use crate::AppState;

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/queue", get(approval_queue))
        .route(
            "/admin/transactions/{transaction_id}/decision",
            post(decide),
        )
        .route("/admin/transactions/decisions", post(bulk_decide))
        .route("/admin/transactions/{transaction_id}/fail", post(fail_stale))
        .route("/admin/commission/preview", post(preview_commission))
        .route("/admin/commission/rules", post(create_rule))
        .route("/admin/commission/rules", get(list_rules))
        .route("/admin/commission/rules/{rule_id}", delete(deactivate_rule))
        .route("/admin/commission/schemes", post(create_scheme))
        .route("/admin/commission/schemes", get(list_schemes))
        .route(
            "/admin/commission/schemes/{scheme_id}/default",
            post(set_default_scheme),
        )
        .route("/admin/owners/{owner_id}/scheme", post(assign_scheme))
}

// ============================================================================
// Request/response types
// ============================================================================

/// Query parameters for the approval queue.
#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// Status to scan; defaults to `awaiting_approval`.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

/// Request body for a single decision.
#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    /// "approve" or "reject".
    pub decision: Decision,
    /// The deciding administrator.
    pub admin_id: Uuid,
    /// Decision notes; required for rejections.
    pub notes: Option<String>,
    /// On approval, hand settlement to the provider gateway.
    #[serde(default)]
    pub submit_to_provider: bool,
}

/// Request body for a bulk decision.
#[derive(Debug, Deserialize)]
pub struct BulkDecisionBody {
    /// Transactions to decide.
    pub transaction_ids: Vec<Uuid>,
    /// "approve" or "reject".
    pub decision: Decision,
    /// The deciding administrator.
    pub admin_id: Uuid,
    /// Decision notes applied to every item.
    pub notes: Option<String>,
}

/// Request body for failing a stale transaction.
#[derive(Debug, Deserialize)]
pub struct FailBody {
    /// Why the transaction is being failed.
    pub reason: String,
}

/// Request body for a commission preview.
#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    /// The owner the spend would belong to.
    pub owner_id: Uuid,
    /// The operator the spend would route to.
    pub operator_ref: String,
    /// Transaction kind.
    pub kind: String,
    /// Face amount.
    pub amount: Decimal,
}

/// Request body for creating a commission rule.
#[derive(Debug, Deserialize)]
pub struct CreateRuleBody {
    /// "global", "scheme", or "user".
    pub scope: String,
    /// Scheme key, when scope is "scheme".
    pub scheme_id: Option<Uuid>,
    /// Owner key, when scope is "user".
    pub owner_id: Option<Uuid>,
    /// The operator the rule matches.
    pub operator: String,
    /// Transaction kind the rule matches.
    pub kind: String,
    /// "percentage" or "fixed".
    pub rate_type: String,
    /// Percentage or flat value.
    pub value: Decimal,
    /// Lower clamp on the computed fee.
    #[serde(default)]
    pub min_fee: Decimal,
    /// Upper clamp on the computed fee.
    pub max_fee: Option<Decimal>,
}

/// Request body for creating a scheme.
#[derive(Debug, Deserialize)]
pub struct CreateSchemeBody {
    /// Human-readable name.
    pub name: String,
    /// Make this the process-wide default.
    #[serde(default)]
    pub is_default: bool,
}

/// Request body for assigning an owner to a scheme.
#[derive(Debug, Deserialize)]
pub struct AssignSchemeBody {
    /// The scheme to assign, or null to fall back to the default.
    pub scheme_id: Option<Uuid>,
}

/// Response for a commission rule.
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    /// Rule ID.
    pub id: String,
    /// Scope: "global", "scheme", or "user".
    pub scope: String,
    /// Scheme key, for scheme rules.
    pub scheme_id: Option<String>,
    /// Owner key, for user rules.
    pub owner_id: Option<String>,
    /// Operator matched.
    pub operator: String,
    /// Kind matched.
    pub kind: String,
    /// Rate interpretation.
    pub rate_type: String,
    /// Rate value.
    pub value: Decimal,
    /// Fee floor.
    pub min_fee: Decimal,
    /// Fee ceiling.
    pub max_fee: Option<Decimal>,
}

impl From<CommissionRule> for RuleResponse {
    fn from(rule: CommissionRule) -> Self {
        let (scope, scheme_id, owner_id) = match rule.scope {
            RuleScope::Global => ("global", None, None),
            RuleScope::Scheme { scheme_id } => ("scheme", Some(scheme_id.to_string()), None),
            RuleScope::User { owner_id } => ("user", None, Some(owner_id.to_string())),
        };
        Self {
            id: rule.id.to_string(),
            scope: scope.to_string(),
            scheme_id,
            owner_id,
            operator: rule.operator,
            kind: rule.kind.as_str().to_string(),
            rate_type: rule.rate_type.as_str().to_string(),
            value: rule.value,
            min_fee: rule.min_fee,
            max_fee: rule.max_fee,
        }
    }
}

// ============================================================================
// Decision handlers
// ============================================================================

/// GET `/admin/queue` - Scan transactions waiting for review.
async fn approval_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
) -> impl IntoResponse {
    let status = match query.status.as_deref() {
        None => TransactionStatus::AwaitingApproval,
        Some(raw) => match TransactionStatus::parse(raw) {
            Some(status) => status,
            None => return bad_request(format!("unknown status: {raw}")),
        },
    };

    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    };

    let filter = TransactionFilter {
        status: Some(status),
        ..Default::default()
    };

    match state.engine.store().list(filter, &page).await {
        Ok((transactions, total)) => {
            let data: Vec<TransactionResponse> =
                transactions.into_iter().map(Into::into).collect();
            let response = PageResponse::new(data, page.page, page.per_page, total);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/transactions/{transaction_id}/decision` - Decide one transaction.
async fn decide(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> impl IntoResponse {
    match state
        .engine
        .decide(
            TransactionId::from_uuid(transaction_id),
            body.decision,
            AdminId::from_uuid(body.admin_id),
            body.notes,
            DecideOptions {
                submit_to_provider: body.submit_to_provider,
            },
        )
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/transactions/decisions` - Decide many transactions.
async fn bulk_decide(
    State(state): State<AppState>,
    Json(body): Json<BulkDecisionBody>,
) -> impl IntoResponse {
    let ids = body
        .transaction_ids
        .into_iter()
        .map(TransactionId::from_uuid)
        .collect();

    let outcome = state
        .engine
        .bulk_decide(
            ids,
            body.decision,
            AdminId::from_uuid(body.admin_id),
            body.notes,
        )
        .await;

    let item = |items: &[prexo_core::engine::BulkItem]| -> Vec<serde_json::Value> {
        items
            .iter()
            .map(|i| json!({ "id": i.id.to_string(), "reason": i.reason }))
            .collect()
    };

    (
        StatusCode::OK,
        Json(json!({
            "succeeded": outcome.succeeded.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "skipped": item(&outcome.skipped),
            "failed": item(&outcome.failed),
        })),
    )
        .into_response()
}

/// POST `/admin/transactions/{transaction_id}/fail` - Fail a stale transaction.
async fn fail_stale(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(body): Json<FailBody>,
) -> impl IntoResponse {
    match state
        .engine
        .fail_stale(TransactionId::from_uuid(transaction_id), body.reason)
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// Commission handlers
// ============================================================================

/// POST `/admin/commission/preview` - Resolve commission without side effects.
async fn preview_commission(
    State(state): State<AppState>,
    Json(body): Json<PreviewBody>,
) -> impl IntoResponse {
    let Some(kind) = TransactionKind::parse(&body.kind) else {
        return bad_request(format!("unknown transaction kind: {}", body.kind));
    };

    match state
        .engine
        .preview_commission(
            OwnerId::from_uuid(body.owner_id),
            &body.operator_ref,
            kind,
            body.amount,
        )
        .await
    {
        Ok(resolved) => (
            StatusCode::OK,
            Json(json!({
                "amount": resolved.amount,
                "source": resolved.source.as_str(),
                "rule_id": resolved.rule_id.map(|id| id.to_string()),
                "rate_type": resolved.rate_type.as_str(),
                "rate_value": resolved.rate_value,
            })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/commission/rules` - Create a commission rule.
async fn create_rule(
    State(state): State<AppState>,
    Json(body): Json<CreateRuleBody>,
) -> impl IntoResponse {
    let scope = match body.scope.as_str() {
        "global" => RuleScope::Global,
        "scheme" => match body.scheme_id {
            Some(id) => RuleScope::Scheme {
                scheme_id: SchemeId::from_uuid(id),
            },
            None => return bad_request("scheme rules require scheme_id".to_string()),
        },
        "user" => match body.owner_id {
            Some(id) => RuleScope::User {
                owner_id: OwnerId::from_uuid(id),
            },
            None => return bad_request("user rules require owner_id".to_string()),
        },
        other => return bad_request(format!("unknown scope: {other}")),
    };
    let Some(kind) = TransactionKind::parse(&body.kind) else {
        return bad_request(format!("unknown transaction kind: {}", body.kind));
    };
    let Some(rate_type) = RateType::parse(&body.rate_type) else {
        return bad_request(format!("unknown rate type: {}", body.rate_type));
    };

    let input = CreateRuleInput {
        scope,
        operator: body.operator,
        kind,
        rate_type,
        value: body.value,
        min_fee: body.min_fee,
        max_fee: body.max_fee,
    };

    match commissions(&state).create_rule(input).await {
        Ok(rule) => (StatusCode::CREATED, Json(RuleResponse::from(rule))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET `/admin/commission/rules` - List active rules.
async fn list_rules(State(state): State<AppState>) -> impl IntoResponse {
    match commissions(&state).list_rules().await {
        Ok(rules) => {
            let rules: Vec<RuleResponse> = rules.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(json!({ "rules": rules }))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// DELETE `/admin/commission/rules/{rule_id}` - Deactivate a rule.
async fn deactivate_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<Uuid>,
) -> impl IntoResponse {
    match commissions(&state)
        .deactivate_rule(RuleId::from_uuid(rule_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/commission/schemes` - Create a commission scheme.
async fn create_scheme(
    State(state): State<AppState>,
    Json(body): Json<CreateSchemeBody>,
) -> impl IntoResponse {
    match commissions(&state)
        .create_scheme(body.name, body.is_default)
        .await
    {
        Ok(scheme) => (StatusCode::CREATED, Json(scheme)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET `/admin/commission/schemes` - List schemes.
async fn list_schemes(State(state): State<AppState>) -> impl IntoResponse {
    match commissions(&state).list_schemes().await {
        Ok(schemes) => (StatusCode::OK, Json(json!({ "schemes": schemes }))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/commission/schemes/{scheme_id}/default` - Set the default scheme.
async fn set_default_scheme(
    State(state): State<AppState>,
    Path(scheme_id): Path<Uuid>,
) -> impl IntoResponse {
    match commissions(&state)
        .set_default_scheme(SchemeId::from_uuid(scheme_id))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/admin/owners/{owner_id}/scheme` - Assign an owner to a scheme.
async fn assign_scheme(
    State(state): State<AppState>,
    Path(owner_id): Path<Uuid>,
    Json(body): Json<AssignSchemeBody>,
) -> impl IntoResponse {
    let wallets = WalletRepository::new((*state.db).clone());
    match wallets
        .assign_scheme(
            OwnerId::from_uuid(owner_id),
            body.scheme_id.map(SchemeId::from_uuid),
        )
        .await
    {
        Ok(wallet) => (
            StatusCode::OK,
            Json(json!({
                "owner_id": wallet.owner_id.to_string(),
                "wallet_id": wallet.id.to_string(),
            })),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn commissions(state: &AppState) -> prexo_db::CommissionRepository {
    prexo_db::CommissionRepository::new((*state.db).clone())
}

fn bad_request(message: String) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "VALIDATION_ERROR", "message": message })),
    )
        .into_response()
}
