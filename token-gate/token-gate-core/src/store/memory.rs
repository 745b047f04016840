use super::ClaimStore;
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::time::{Duration, Instant};

// Keeps `Instant + ttl` from overflowing on absurd lifetimes.
const MAX_TTL: Duration = Duration::from_secs(u32::MAX as u64);

/// In-process claim store.
///
/// Valid for single-instance deployments and tests only. Another process has its own map
/// and will accept a token this one already redeemed.
///
/// Expired records are dropped lazily on every claim; there is no background sweeper.
#[derive(Debug, Default)]
pub struct MemoryClaimStore {
    used: Mutex<HashMap<String, Instant>>,
}

impl MemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn claim_at(&self, key: &str, ttl: Duration, now: Instant) -> bool {
        let mut used = self.used.lock();
        used.retain(|_, expires_at| *expires_at > now);

        match used.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(now + ttl.min(MAX_TTL));
                true
            }
        }
    }
}

#[async_trait]
impl ClaimStore for MemoryClaimStore {
    async fn claim_once(&self, key: &str, ttl: NonZeroU64) -> Result<bool, StoreError> {
        Ok(self.claim_at(key, Duration::from_secs(ttl.get()), Instant::now()))
    }
}
