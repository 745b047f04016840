//! One-time HS256 bearer tokens.
//!
//! [`issue`] signs caller claims together with an expiry (`exp`) and a random identifier
//! (`jti`). [`OneTimeTokens::verify`] checks signature and expiry, then claims `jwt:<jti>` in
//! a [`ClaimStore`] for the token's remaining lifetime, so a token is accepted at most once.

use crate::error::TokenError;
use crate::store::ClaimStore;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Prefix of claim store keys guarding token identifiers.
pub const CLAIM_NAMESPACE: &str = "jwt:";

#[derive(Debug, Deserialize)]
struct OneTimeClaims {
    #[serde(default)]
    jti: Option<String>,
    #[serde(default)]
    exp: Option<u64>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

/// Signs `claims` into a token that expires `ttl_seconds` from now.
///
/// `exp` and `jti` in `claims` are overwritten.
pub fn issue(
    claims: &Map<String, Value>,
    signing_key: &str,
    ttl_seconds: u64,
) -> Result<String, TokenError> {
    if signing_key.is_empty() {
        return Err(TokenError::MissingSigningKey);
    }
    if ttl_seconds == 0 {
        return Err(TokenError::InvalidTtl);
    }

    let ttl = i64::try_from(ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or(TokenError::InvalidTtl)?;
    let exp = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(TokenError::InvalidTtl)?;

    let mut payload = claims.clone();
    payload.insert("exp".to_string(), Value::from(exp.timestamp()));
    payload.insert("jti".to_string(), Value::from(Uuid::new_v4().to_string()));

    encode(
        &Header::new(Algorithm::HS256),
        &payload,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
    .map_err(TokenError::Encode)
}

/// Issues and redeems single-use tokens against one claim store.
pub struct OneTimeTokens {
    signing_key: Option<String>,
    store: Arc<dyn ClaimStore>,
}

impl OneTimeTokens {
    pub fn new(signing_key: Option<String>, store: Arc<dyn ClaimStore>) -> Self {
        Self { signing_key, store }
    }

    fn signing_key(&self) -> Result<&str, TokenError> {
        self.signing_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(TokenError::MissingSigningKey)
    }

    /// [`issue`] with this verifier's key.
    pub fn issue(&self, claims: &Map<String, Value>, ttl_seconds: u64) -> Result<String, TokenError> {
        issue(claims, self.signing_key()?, ttl_seconds)
    }

    /// True exactly once per valid token.
    ///
    /// Every kind of rejection is `Ok(false)`. Errors mean a missing signing key or an
    /// unavailable claim store.
    pub async fn verify(&self, token: &str) -> Result<bool, TokenError> {
        Ok(self.redeem(token).await?.is_some())
    }

    /// Like [`verify`](Self::verify), returning the caller claims of a redeemed token.
    pub async fn redeem(&self, token: &str) -> Result<Option<Map<String, Value>>, TokenError> {
        let key = self.signing_key()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = match decode::<OneTimeClaims>(
            token,
            &DecodingKey::from_secret(key.as_bytes()),
            &validation,
        ) {
            Ok(data) => data.claims,
            Err(err) => {
                debug!(error = %err, "token rejected");
                return Ok(None);
            }
        };

        let (Some(jti), Some(exp)) = (claims.jti.filter(|jti| !jti.is_empty()), claims.exp) else {
            debug!("token rejected: missing jti or exp");
            return Ok(None);
        };

        let remaining = i64::try_from(exp)
            .unwrap_or(i64::MAX)
            .saturating_sub(Utc::now().timestamp());
        let Some(ttl) = u64::try_from(remaining).ok().and_then(NonZeroU64::new) else {
            debug!(%jti, "token rejected: expired");
            return Ok(None);
        };

        let claim_key = format!("{}{}", CLAIM_NAMESPACE, jti);
        match self.store.claim_once(&claim_key, ttl).await {
            Ok(true) => Ok(Some(claims.rest)),
            Ok(false) => {
                debug!(%jti, "token rejected: already redeemed");
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "claim store unavailable");
                Err(err.into())
            }
        }
    }
}
