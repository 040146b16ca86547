//! API route definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use prexo_core::error::EngineError;
use prexo_core::lifecycle::Transaction;

use crate::AppState;

pub mod admin;
pub mod health;
pub mod transactions;
pub mod wallets;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(wallets::routes())
        .merge(transactions::routes())
        .merge(admin::routes())
}

/// Maps an engine error onto the JSON error envelope.
pub(crate) fn error_response(err: &EngineError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }

    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

// ============================================================================
// Shared response types
// ============================================================================

/// Response for a transaction.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Owner ID.
    pub owner_id: String,
    /// Wallet ID.
    pub wallet_id: String,
    /// Transaction kind.
    pub kind: String,
    /// Face amount.
    pub amount: Decimal,
    /// Resolved commission amount.
    pub commission_amount: Decimal,
    /// Which tier produced the commission.
    pub commission_source: String,
    /// Total debited from the wallet at request time.
    pub debited_total: Decimal,
    /// Current status.
    pub status: String,
    /// Operator reference, if any.
    pub operator_ref: Option<String>,
    /// Provider reference, if any.
    pub provider_ref: Option<String>,
    /// Free-form attributes.
    pub metadata: serde_json::Value,
    /// Failure reason, when failed.
    pub failure_reason: Option<String>,
    /// Deciding administrator, if decided.
    pub decided_by: Option<String>,
    /// Decision timestamp.
    pub decided_at: Option<DateTime<Utc>>,
    /// Decision notes.
    pub decision_notes: Option<String>,
    /// Refund details, if refunded.
    pub refund: Option<RefundResponse>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Refund details on a transaction response.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Refunded amount.
    pub amount: Decimal,
    /// Refund status.
    pub status: String,
    /// When the credit reached the wallet.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            owner_id: tx.owner_id.to_string(),
            wallet_id: tx.wallet_id.to_string(),
            kind: tx.kind.as_str().to_string(),
            amount: tx.amount,
            commission_amount: tx.commission.amount,
            commission_source: tx.commission.source.as_str().to_string(),
            debited_total: tx.debited_total,
            status: tx.status.as_str().to_string(),
            operator_ref: tx.operator_ref,
            provider_ref: tx.provider_ref,
            metadata: tx.metadata,
            failure_reason: tx.failure_reason,
            decided_by: tx.decided_by.map(|id| id.to_string()),
            decided_at: tx.decided_at,
            decision_notes: tx.decision_notes,
            refund: tx.refund.map(|r| RefundResponse {
                amount: r.amount,
                status: match r.status {
                    prexo_core::lifecycle::RefundStatus::Pending => "pending".to_string(),
                    prexo_core::lifecycle::RefundStatus::Completed => "completed".to_string(),
                },
                completed_at: r.completed_at,
            }),
            created_at: tx.created_at,
        }
    }
}
