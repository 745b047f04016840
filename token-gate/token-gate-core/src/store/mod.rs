//! Single-use claim stores.
//!
//! A claim store answers one question: is this caller the first to claim `key` within the
//! next `ttl` seconds? Two backends exist, picked through [`StoreBackend`]:
//! - [`MemoryClaimStore`]: a mutex guarded map, one process only
//! - [`RedisClaimStore`]: `SET NX EX` against a shared Redis, safe across instances

pub mod memory;
pub mod provider;
pub mod redis;

use crate::error::StoreError;
use async_trait::async_trait;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

pub use self::redis::RedisClaimStore;
pub use memory::MemoryClaimStore;
pub use provider::StoreProvider;

/// Atomically records that `key` has been consumed.
///
/// Returns `Ok(true)` for the first caller within the key's lifetime and `Ok(false)` for
/// everyone after, until the record expires. Backend failures are reported as errors and
/// must never be read as either answer.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    async fn claim_once(&self, key: &str, ttl: NonZeroU64) -> Result<bool, StoreError>;
}

/// Which backend to build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String, timeout: Duration },
}

impl StoreBackend {
    /// A non-blank address selects Redis, anything else the in-memory store.
    pub fn select(url: Option<&str>, timeout: Duration) -> Self {
        match url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => StoreBackend::Redis {
                url: url.to_string(),
                timeout,
            },
            None => StoreBackend::Memory,
        }
    }

    pub fn build(&self) -> Result<Arc<dyn ClaimStore>, StoreError> {
        Ok(match self {
            StoreBackend::Memory => Arc::new(MemoryClaimStore::new()),
            StoreBackend::Redis { url, timeout } => Arc::new(RedisClaimStore::open(url, *timeout)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Redis { .. } => "redis",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_selects_memory() {
        let timeout = Duration::from_secs(1);
        assert_eq!(StoreBackend::select(None, timeout), StoreBackend::Memory);
        assert_eq!(StoreBackend::select(Some(""), timeout), StoreBackend::Memory);
        assert_eq!(StoreBackend::select(Some("   "), timeout), StoreBackend::Memory);
    }

    #[test]
    fn url_selects_redis() {
        let timeout = Duration::from_secs(1);
        let backend = StoreBackend::select(Some(" redis://localhost:6379 "), timeout);
        assert_eq!(
            backend,
            StoreBackend::Redis {
                url: "redis://localhost:6379".to_string(),
                timeout,
            }
        );
        assert_eq!(backend.name(), "redis");
    }

    #[test]
    fn malformed_url_fails_to_build() {
        let backend = StoreBackend::select(Some("not a url"), Duration::from_secs(1));
        let err = backend.build().err().unwrap();
        assert!(matches!(err, StoreError::InvalidUrl(_)));
        assert!(!err.is_unavailable());
    }
}
