//! Provider gateway seam.
//!
//! A provider gateway is the external third-party service that can settle a
//! transaction automatically. The engine debits the wallet before
//! submission (pessimistic reservation) and holds no lock while the call is
//! in flight; the reply only transitions the already-debited record.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use prexo_shared::types::TransactionId;

use crate::lifecycle::TransactionKind;

/// A submission to the upstream provider.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    /// The transaction being settled; doubles as the idempotency key.
    pub transaction_id: TransactionId,
    /// What kind of action is being settled.
    pub kind: TransactionKind,
    /// The operator/provider to route to.
    pub operator_ref: String,
    /// The face amount.
    pub amount: Decimal,
    /// Operator-specific attributes (subscriber number, biller id, ...).
    pub attributes: serde_json::Value,
}

/// Outcome reported by the provider for a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    /// Settled; drive the transaction to `Success`.
    Success,
    /// Still processing; keep the current status and await a callback.
    Pending,
    /// Settlement failed; drive the transaction to `Failed` with refund.
    Failed,
}

/// A provider's reply to a submission or callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReply {
    /// The reported outcome.
    pub status: GatewayStatus,
    /// Reference assigned by the provider, if any.
    pub provider_ref: Option<String>,
    /// Human-readable message from the provider.
    pub message: Option<String>,
}

/// Transport-level gateway failures.
///
/// Distinct from a reported `Failed` outcome: an unreachable gateway leaves
/// the transaction in its current state for retry or manual decision, and
/// is never translated into a silent failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or did not answer in time.
    #[error("Provider gateway unavailable: {0}")]
    Unavailable(String),
}

/// Abstract capability to settle transactions with an upstream provider.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Attempts automatic settlement of a transaction.
    async fn submit(&self, request: SubmitRequest) -> Result<GatewayReply, GatewayError>;
}

#[async_trait]
impl<T: ProviderGateway + ?Sized> ProviderGateway for std::sync::Arc<T> {
    async fn submit(&self, request: SubmitRequest) -> Result<GatewayReply, GatewayError> {
        (**self).submit(request).await
    }
}

/// Gateway for deployments where every operator is manually processed.
///
/// Every submission is reported as pending, so transactions settle through
/// the callback endpoint or an administrator decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualGateway;

#[async_trait]
impl ProviderGateway for ManualGateway {
    async fn submit(&self, _request: SubmitRequest) -> Result<GatewayReply, GatewayError> {
        Ok(GatewayReply {
            status: GatewayStatus::Pending,
            provider_ref: None,
            message: Some("queued for manual processing".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_manual_gateway_always_pending() {
        let gateway = ManualGateway;
        let reply = gateway
            .submit(SubmitRequest {
                transaction_id: TransactionId::new(),
                kind: TransactionKind::MobileRecharge,
                operator_ref: "airtel".to_string(),
                amount: dec!(100),
                attributes: serde_json::json!({"subscriber": "9800000001"}),
            })
            .await
            .unwrap();
        assert_eq!(reply.status, GatewayStatus::Pending);
    }
}
