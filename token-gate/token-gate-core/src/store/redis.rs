use super::ClaimStore;
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::num::NonZeroU64;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Value written under a claimed key. Only the key's existence matters.
const CLAIMED: &str = "1";

/// Claim store backed by a shared Redis.
///
/// Each claim is a single `SET key 1 NX EX ttl`, so concurrent instances pointed at the same
/// server agree on exactly one winner per key and Redis expires the record on its own.
pub struct RedisClaimStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisClaimStore {
    /// Parses `url` without connecting. The connection is made on the first claim.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(StoreError::InvalidUrl)?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                ConnectionManager::new(self.client.clone())
                    .await
                    .map_err(StoreError::Connect)
            })
            .await?;
        Ok(conn.clone())
    }

    async fn set_if_absent(&self, key: &str, ttl: NonZeroU64) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        // nil when the key already exists, "OK" otherwise
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(CLAIMED)
            .arg("NX")
            .arg("EX")
            .arg(ttl.get())
            .query_async(&mut conn)
            .await
            .map_err(StoreError::Command)?;
        Ok(reply.is_some())
    }
}

#[async_trait]
impl ClaimStore for RedisClaimStore {
    async fn claim_once(&self, key: &str, ttl: NonZeroU64) -> Result<bool, StoreError> {
        match tokio::time::timeout(self.timeout, self.set_if_absent(key, ttl)).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_store() -> Option<RedisClaimStore> {
        let url = std::env::var("TEST_REDIS_URL").ok()?;
        Some(RedisClaimStore::open(&url, Duration::from_secs(2)).unwrap())
    }

    fn secs(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        // nothing listens on port 1
        let store = RedisClaimStore::open("redis://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let err = store.claim_once("jwt:x", secs(10)).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn set_nx_claims_once() {
        let Some(store) = test_store() else { return };
        let key = format!("test:{}", Uuid::new_v4());

        assert!(store.claim_once(&key, secs(10)).await.unwrap());
        assert!(!store.claim_once(&key, secs(10)).await.unwrap());

        let other = format!("test:{}", Uuid::new_v4());
        assert!(store.claim_once(&other, secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn record_expires_natively() {
        let Some(store) = test_store() else { return };
        let key = format!("test:{}", Uuid::new_v4());

        assert!(store.claim_once(&key, secs(1)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(store.claim_once(&key, secs(1)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_instances_share_one_winner() {
        let Ok(url) = std::env::var("TEST_REDIS_URL") else { return };
        let key = format!("test:{}", Uuid::new_v4());
        let mut handles = vec![];

        // one store per task stands in for one store per process
        for _ in 0..16 {
            let store = Arc::new(RedisClaimStore::open(&url, Duration::from_secs(2)).unwrap());
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store.claim_once(&key, secs(10)).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
