use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use token_gate_core::{issue, OneTimeTokens, StoreProvider, TokenError};

const KEY: &str = "s3cr3t";

fn user_claims() -> serde_json::Map<String, serde_json::Value> {
    json!({"user": "test"}).as_object().unwrap().clone()
}

fn memory_provider() -> StoreProvider {
    StoreProvider::with_source(Duration::from_secs(1), || None)
}

#[tokio::test]
async fn issue_verify_replay_scenario() {
    let provider = memory_provider();
    let tokens = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());

    let token = issue(&user_claims(), KEY, 60).unwrap();
    assert!(tokens.verify(&token).await.unwrap());
    assert!(!tokens.verify(&token).await.unwrap());
    assert!(!tokens.verify("invalid.token.value").await.unwrap());

    let unconfigured = OneTimeTokens::new(None, provider.get_store().unwrap());
    assert!(matches!(
        unconfigured.verify(&token).await,
        Err(TokenError::MissingSigningKey)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_redemptions_have_exactly_one_winner() {
    let provider = memory_provider();
    let tokens = Arc::new(OneTimeTokens::new(
        Some(KEY.to_string()),
        provider.get_store().unwrap(),
    ));

    for _ in 0..5 {
        let token = issue(&user_claims(), KEY, 60).unwrap();
        let attempts = (0..50).map(|_| {
            let tokens = tokens.clone();
            let token = token.clone();
            tokio::spawn(async move { tokens.verify(&token).await.unwrap() })
        });

        let successes = join_all(attempts)
            .await
            .into_iter()
            .filter(|result| *result.as_ref().unwrap())
            .count();
        assert_eq!(successes, 1);
    }
}

#[tokio::test]
async fn verifiers_sharing_a_provider_share_claims() {
    let provider = memory_provider();
    let first = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());
    let second = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());

    let token = issue(&user_claims(), KEY, 60).unwrap();
    assert!(first.verify(&token).await.unwrap());
    assert!(!second.verify(&token).await.unwrap());
}

#[tokio::test]
async fn reset_store_forgets_claims() {
    let provider = memory_provider();
    let token = issue(&user_claims(), KEY, 60).unwrap();

    let tokens = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());
    assert!(tokens.verify(&token).await.unwrap());

    provider.reset();
    let tokens = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());
    assert!(tokens.verify(&token).await.unwrap());
}

#[tokio::test]
async fn unreachable_shared_store_surfaces_as_error() {
    let provider = StoreProvider::with_source(Duration::from_millis(500), || {
        Some("redis://127.0.0.1:1".to_string())
    });
    let tokens = OneTimeTokens::new(Some(KEY.to_string()), provider.get_store().unwrap());
    let token = issue(&user_claims(), KEY, 60).unwrap();

    match tokens.verify(&token).await {
        Err(TokenError::Store(err)) => assert!(err.is_unavailable()),
        other => panic!("expected store error, got {:?}", other),
    }
}

#[tokio::test]
async fn shared_store_redeems_once_across_verifiers() {
    let Ok(url) = std::env::var("TEST_REDIS_URL") else { return };

    // two providers stand in for two processes
    let a = StoreProvider::with_source(Duration::from_secs(2), {
        let url = url.clone();
        move || Some(url.clone())
    });
    let b = StoreProvider::with_source(Duration::from_secs(2), move || Some(url.clone()));
    let first = OneTimeTokens::new(Some(KEY.to_string()), a.get_store().unwrap());
    let second = OneTimeTokens::new(Some(KEY.to_string()), b.get_store().unwrap());

    let token = issue(&user_claims(), KEY, 60).unwrap();
    assert!(second.verify(&token).await.unwrap());
    assert!(!first.verify(&token).await.unwrap());
}
