use super::AppState;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Proof that the request carried the configured issuance API key.
#[derive(Clone, Copy, Debug)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // no configured key means issuance is closed, not open
        let Some(expected) = state.api_key.as_deref() else {
            return Err(StatusCode::UNAUTHORIZED);
        };
        match parts.headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
            Some(provided) if provided == expected => Ok(ApiKey),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}

/// Raw token from an `Authorization: Bearer` header.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers)
            .map(BearerToken)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
