use super::{ClaimStore, StoreBackend};
use crate::config::non_empty_var;
use crate::error::StoreError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

type UrlSource = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Owns the active claim store and rebuilds it when its configuration changes.
///
/// Held by the service context rather than a global, so each test can build its own.
pub struct StoreProvider {
    source: UrlSource,
    timeout: Duration,
    active: Mutex<Option<ActiveStore>>,
}

struct ActiveStore {
    url: Option<String>,
    store: Arc<dyn ClaimStore>,
}

impl StoreProvider {
    /// Reads the shared store address from `REDIS_URL` on every lookup.
    pub fn from_env(timeout: Duration) -> Self {
        Self::with_source(timeout, || non_empty_var("REDIS_URL"))
    }

    pub fn with_source<F>(timeout: Duration, source: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            timeout,
            active: Mutex::new(None),
        }
    }

    /// Returns the active store, building it on first use or when the address changed.
    ///
    /// If building fails the previous store stays cached and the next call retries.
    pub fn get_store(&self) -> Result<Arc<dyn ClaimStore>, StoreError> {
        let url = (self.source)()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            if current.url == url {
                return Ok(current.store.clone());
            }
        }

        let backend = StoreBackend::select(url.as_deref(), self.timeout);
        let store = backend.build()?;
        info!(backend = backend.name(), "claim store selected");

        *active = Some(ActiveStore {
            url,
            store: store.clone(),
        });
        Ok(store)
    }

    /// Forgets the cached store so the next lookup builds a fresh one.
    pub fn reset(&self) {
        *self.active.lock() = None;
    }
}
