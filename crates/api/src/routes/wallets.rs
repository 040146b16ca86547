//! Wallet routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use prexo_core::store::SettlementStore;
use prexo_core::wallet::Wallet;
use prexo_shared::types::{OwnerId, WalletId};

use crate::routes::error_response;
use crate::AppState;

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{wallet_id}", get(get_wallet))
        .route("/owners/{owner_id}/wallet", get(get_owner_wallet))
}

/// Request body for creating a wallet.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// The owner to create a wallet for.
    pub owner_id: Uuid,
}

/// Response for wallet operations.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// Wallet ID.
    pub id: String,
    /// Owner ID.
    pub owner_id: String,
    /// Current balance.
    pub balance: Decimal,
    /// Update counter.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id.to_string(),
            owner_id: wallet.owner_id.to_string(),
            balance: wallet.balance,
            version: wallet.version,
            created_at: wallet.created_at,
        }
    }
}

/// POST `/wallets` - Create a wallet for an owner.
async fn create_wallet(
    State(state): State<AppState>,
    Json(body): Json<CreateWalletRequest>,
) -> impl IntoResponse {
    match state
        .engine
        .create_wallet(OwnerId::from_uuid(body.owner_id))
        .await
    {
        Ok(wallet) => {
            (StatusCode::CREATED, Json(WalletResponse::from(wallet))).into_response()
        }
        Err(err) => error_response(&err),
    }
}

/// GET `/wallets/{wallet_id}` - Fetch a wallet by id.
async fn get_wallet(
    State(state): State<AppState>,
    Path(wallet_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .store()
        .wallet(WalletId::from_uuid(wallet_id))
        .await
    {
        Ok(wallet) => (StatusCode::OK, Json(WalletResponse::from(wallet))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET `/owners/{owner_id}/wallet` - Fetch the wallet belonging to an owner.
async fn get_owner_wallet(
    State(state): State<AppState>,
    Path(owner_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .engine
        .store()
        .wallet_by_owner(OwnerId::from_uuid(owner_id))
        .await
    {
        Ok(wallet) => (StatusCode::OK, Json(WalletResponse::from(wallet))).into_response(),
        Err(err) => error_response(&err),
    }
}
