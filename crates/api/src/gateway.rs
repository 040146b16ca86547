//! Provider gateway implementations.
//!
//! The HTTP gateway posts submissions to the configured aggregator
//! endpoint and maps its JSON reply onto the engine's gateway contract.
//! Deployments without an endpoint fall back to manual-only processing.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use prexo_core::provider::{
    GatewayError, GatewayReply, GatewayStatus, ManualGateway, ProviderGateway, SubmitRequest,
};
use prexo_shared::config::ProviderConfig;

/// HTTP client for an upstream provider aggregator.
#[derive(Debug, Clone)]
pub struct HttpProviderGateway {
    client: reqwest::Client,
    endpoint: String,
}

/// Wire format of the aggregator's reply.
#[derive(Debug, Deserialize)]
struct WireReply {
    status: GatewayStatus,
    provider_ref: Option<String>,
    message: Option<String>,
}

impl HttpProviderGateway {
    /// Creates a gateway posting to `endpoint`.
    #[must_use]
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    async fn submit(&self, request: SubmitRequest) -> Result<GatewayReply, GatewayError> {
        debug!(
            transaction_id = %request.transaction_id,
            operator = %request.operator_ref,
            "submitting to provider"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status().is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let reply: WireReply = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("malformed provider reply: {e}")))?;

        Ok(GatewayReply {
            status: reply.status,
            provider_ref: reply.provider_ref,
            message: reply.message,
        })
    }
}

/// The gateway selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredGateway {
    /// Post submissions to the configured HTTP endpoint.
    Http(HttpProviderGateway),
    /// No endpoint configured; everything is manually processed.
    Manual(ManualGateway),
}

impl ConfiguredGateway {
    /// Selects the gateway from provider configuration.
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        match &config.endpoint {
            Some(endpoint) => Self::Http(HttpProviderGateway::new(
                endpoint.clone(),
                Duration::from_secs(config.timeout_secs),
            )),
            None => Self::Manual(ManualGateway),
        }
    }
}

#[async_trait]
impl ProviderGateway for ConfiguredGateway {
    async fn submit(&self, request: SubmitRequest) -> Result<GatewayReply, GatewayError> {
        match self {
            Self::Http(gateway) => gateway.submit(request).await,
            Self::Manual(gateway) => gateway.submit(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prexo_core::lifecycle::TransactionKind;
    use prexo_shared::types::TransactionId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gateway_selection_from_config() {
        let manual = ConfiguredGateway::from_config(&ProviderConfig::default());
        assert!(matches!(manual, ConfiguredGateway::Manual(_)));

        let http = ConfiguredGateway::from_config(&ProviderConfig {
            endpoint: Some("https://aggregator.example/submit".to_string()),
            timeout_secs: 10,
        });
        assert!(matches!(http, ConfiguredGateway::Http(_)));
    }

    #[tokio::test]
    async fn test_manual_fallback_reports_pending() {
        let gateway = ConfiguredGateway::from_config(&ProviderConfig::default());
        let reply = gateway
            .submit(SubmitRequest {
                transaction_id: TransactionId::new(),
                kind: TransactionKind::BillPayment,
                operator_ref: "mseb".to_string(),
                amount: dec!(450),
                attributes: serde_json::json!({"consumer": "MH-1234"}),
            })
            .await
            .unwrap();
        assert_eq!(reply.status, GatewayStatus::Pending);
    }
}
