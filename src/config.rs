//! Process configuration
//!
//! Everything the flow needs is resolved once in `main` (command-line
//! flags backed by environment variables) and passed down explicitly.

use std::time::Duration;

use thiserror::Error;

use crate::chain::CommitmentLevel;
use crate::cosign::AssemblyPolicy;

/// Default wallet service base URL (staging)
pub const DEFAULT_GATEWAY_URL: &str = "https://staging.crossmint.com/api";

/// Default wallet service API version segment
pub const DEFAULT_API_VERSION: &str = "2025-06-09";

/// Default Solana RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CROSSMINT_API_KEY is not set")]
    MissingApiKey,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Wallet service connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_version: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Create a config for the default staging endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_key,
            timeout: Duration::from_secs(30),
        })
    }

    /// Use a custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(url));
        }
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Root of the versioned API, e.g. `https://host/api/2025-06-09`
    pub fn api_root(&self) -> String {
        format!("{}/{}", self.base_url, self.api_version)
    }
}

/// Solana RPC connection settings
#[derive(Debug, Clone)]
pub struct ChainClientConfig {
    pub rpc_url: String,
    pub commitment: CommitmentLevel,
    pub timeout: Duration,
}

impl Default for ChainClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: CommitmentLevel::Confirmed,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ChainClientConfig {
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(url));
        }
        self.rpc_url = url;
        Ok(self)
    }
}

/// How the assembled transaction is checked and broadcast
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    pub policy: AssemblyPolicy,
    /// Dry-run before sending
    pub simulate: bool,
    /// Retries the RPC node performs on its own
    pub max_retries: usize,
    /// Delay between confirmation polls
    pub poll_interval: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            policy: AssemblyPolicy::Strict,
            simulate: true,
            max_retries: 5,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Everything the `run` flow needs
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub chain: ChainClientConfig,
    pub broadcast: BroadcastConfig,
}
