//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes (thin wrappers over the settlement engine)
//! - The HTTP provider gateway implementation
//! - Response types and error mapping

pub mod gateway;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use prexo_core::notify::TracingSink;
use prexo_core::{SettlementEngine, SettlementPolicy};
use prexo_db::SettlementRepository;
use prexo_shared::AppConfig;

use gateway::ConfiguredGateway;

/// The engine type wired for production: Postgres store, configured
/// gateway, tracing notification sink.
pub type AppEngine = SettlementEngine<SettlementRepository, ConfiguredGateway, TracingSink>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, for read-only query paths.
    pub db: Arc<DatabaseConnection>,
    /// The settlement engine.
    pub engine: Arc<AppEngine>,
}

impl AppState {
    /// Wires the engine and state from configuration and a connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        let policy = SettlementPolicy {
            charge_commission: config.wallet.charge_commission,
            refund_commission: config.wallet.refund_commission,
        };
        let engine = SettlementEngine::new(
            SettlementRepository::new(db.clone()),
            ConfiguredGateway::from_config(&config.provider),
            TracingSink,
            policy,
        );

        Self {
            db: Arc::new(db),
            engine: Arc::new(engine),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
