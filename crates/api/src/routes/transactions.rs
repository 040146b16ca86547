//! Transaction routes: spend/top-up requests, queries, provider callbacks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use prexo_core::engine::{SpendRequest, TopupRequest};
use prexo_core::lifecycle::{ProcessingMode, TransactionKind, TransactionStatus};
use prexo_core::provider::{GatewayReply, GatewayStatus};
use prexo_core::store::SettlementStore;
use prexo_db::repositories::TransactionFilter;
use prexo_shared::types::{OwnerId, PageRequest, PageResponse, TransactionId};

use crate::routes::{error_response, TransactionResponse};
use crate::AppState;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions/spend", post(request_spend))
        .route("/transactions/topup", post(request_topup))
        .route("/transactions", get(list_transactions))
        .route("/transactions/{transaction_id}", get(get_transaction))
        .route(
            "/transactions/{transaction_id}/provider-callback",
            post(provider_callback),
        )
        .route(
            "/transactions/{transaction_id}/resubmit",
            post(resubmit_transaction),
        )
}

// ============================================================================
// Request types
// ============================================================================

/// Request body for a spend.
#[derive(Debug, Deserialize)]
pub struct SpendBody {
    /// The owner spending from their wallet.
    pub owner_id: Uuid,
    /// Transaction kind (e.g. "mobile-recharge").
    pub kind: String,
    /// Face amount.
    pub amount: Decimal,
    /// The operator/provider to route to.
    pub operator_ref: String,
    /// "manual" or "automatic".
    pub mode: ProcessingMode,
    /// Operator-specific attributes.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Request body for a top-up.
#[derive(Debug, Deserialize)]
pub struct TopupBody {
    /// The owner adding money.
    pub owner_id: Uuid,
    /// Amount to add.
    pub amount: Decimal,
    /// Payment attributes.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Filter by owner.
    pub owner_id: Option<Uuid>,
    /// Filter by status.
    pub status: Option<String>,
    /// Filter by kind.
    pub kind: Option<String>,
    /// Filter by creation time range start (RFC 3339).
    pub from: Option<DateTime<Utc>>,
    /// Filter by creation time range end (RFC 3339).
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Items per page.
    pub per_page: Option<u32>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Request body for a provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    /// Reported outcome: "success", "pending", or "failed".
    pub status: GatewayStatus,
    /// Reference assigned by the provider.
    pub provider_ref: Option<String>,
    /// Provider message.
    pub message: Option<String>,
}

// ============================================================================
// Route handlers
// ============================================================================

/// POST `/transactions/spend` - Request a spend from a wallet.
async fn request_spend(
    State(state): State<AppState>,
    Json(body): Json<SpendBody>,
) -> impl IntoResponse {
    let Some(kind) = TransactionKind::parse(&body.kind) else {
        return bad_request(format!("unknown transaction kind: {}", body.kind));
    };

    let request = SpendRequest {
        owner_id: OwnerId::from_uuid(body.owner_id),
        kind,
        amount: body.amount,
        operator_ref: body.operator_ref,
        mode: body.mode,
        metadata: body.metadata,
    };

    match state.engine.request_spend(request).await {
        Ok(tx) => (StatusCode::CREATED, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/transactions/topup` - Request a wallet top-up.
async fn request_topup(
    State(state): State<AppState>,
    Json(body): Json<TopupBody>,
) -> impl IntoResponse {
    let request = TopupRequest {
        owner_id: OwnerId::from_uuid(body.owner_id),
        amount: body.amount,
        metadata: body.metadata,
    };

    match state.engine.request_topup(request).await {
        Ok(tx) => (StatusCode::CREATED, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET `/transactions` - List transactions with filters.
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let status = match parse_filter(query.status.as_deref(), TransactionStatus::parse, "status") {
        Ok(status) => status,
        Err(response) => return response,
    };
    let kind = match parse_filter(query.kind.as_deref(), TransactionKind::parse, "kind") {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    let filter = TransactionFilter {
        owner_id: query.owner_id.map(OwnerId::from_uuid),
        status,
        kind,
        created_from: query.from,
        created_to: query.to,
    };

    let page = query.page_request();
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

/// GET `/transactions/{transaction_id}` - Fetch one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .store()
        .transaction(TransactionId::from_uuid(transaction_id))
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/transactions/{transaction_id}/provider-callback` - Apply a
/// gateway result delivered by the provider.
async fn provider_callback(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
    Json(body): Json<CallbackBody>,
) -> impl IntoResponse {
    let reply = GatewayReply {
        status: body.status,
        provider_ref: body.provider_ref,
        message: body.message,
    };

    match state
        .engine
        .apply_gateway_result(TransactionId::from_uuid(transaction_id), reply)
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// POST `/transactions/{transaction_id}/resubmit` - Retry gateway submission.
async fn resubmit_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .resubmit(TransactionId::from_uuid(transaction_id))
        .await
    {
        Ok(tx) => (StatusCode::OK, Json(TransactionResponse::from(tx))).into_response(),
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn bad_request(message: String) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "VALIDATION_ERROR", "message": message })),
    )
        .into_response()
}

fn parse_filter<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
    field: &str,
) -> Result<Option<T>, axum::response::Response> {
    match raw {
        None => Ok(None),
        Some(value) => parse(value)
            .map(Some)
            .ok_or_else(|| bad_request(format!("unknown {field}: {value}"))),
    }
}
