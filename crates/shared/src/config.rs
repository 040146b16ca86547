//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Wallet settlement policy.
    #[serde(default)]
    pub wallet: WalletConfig,
    /// Provider gateway configuration.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Wallet settlement policy flags.
///
/// Whether commission is debited from the wallet together with the spend
/// amount, or only recorded for downstream settlement, is a deployment
/// decision. Refund behavior follows the same flags.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Debit the resolved commission together with the spend amount.
    #[serde(default)]
    pub charge_commission: bool,
    /// Include the commission in refunds when it was debited.
    #[serde(default = "default_refund_commission")]
    pub refund_commission: bool,
}

fn default_refund_commission() -> bool {
    true
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            charge_commission: false,
            refund_commission: default_refund_commission(),
        }
    }
}

/// Provider gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Submission endpoint of the upstream provider aggregator.
    ///
    /// When unset, every automatic submission is reported as pending and
    /// settles through the callback endpoint or an administrator decision.
    pub endpoint: Option<String>,
    /// Request timeout in seconds for gateway calls.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("PREXO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
