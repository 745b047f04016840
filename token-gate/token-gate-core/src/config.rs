//! Environment backed configuration.

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60;
pub const DEFAULT_CLAIM_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct GateConfig {
    /// HS256 key shared by issuer and verifier.
    pub secret_key: Option<String>,
    /// Shared claim store address. `None` selects the in-memory store.
    pub redis_url: Option<String>,
    /// Value expected in the `X-API-Key` header when issuing tokens.
    pub api_key: Option<String>,
    pub token_ttl_secs: u64,
    pub claim_timeout: Duration,
    pub bind_addr: SocketAddr,
}

impl GateConfig {
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        Ok(Self {
            secret_key: non_empty_var("SECRET_KEY"),
            redis_url: non_empty_var("REDIS_URL"),
            api_key: non_empty_var("API_KEY"),
            token_ttl_secs: std::env::var("TOKEN_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(DEFAULT_TOKEN_TTL_SECS),
            claim_timeout: std::env::var("CLAIM_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CLAIM_TIMEOUT),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
                .parse()?,
        })
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            redis_url: None,
            api_key: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            claim_timeout: DEFAULT_CLAIM_TIMEOUT,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

/// Reads `name`, treating an empty or whitespace-only value as unset.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
