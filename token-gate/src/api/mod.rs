//! HTTP surface for issuing and redeeming one-time tokens.

mod auth_middleware;

pub use auth_middleware::{bearer_token, ApiKey, BearerToken, API_KEY_HEADER};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use token_gate_core::{OneTimeTokens, TokenError};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Upper bound on `expires_in` accepted from clients.
pub const MAX_EXPIRES_IN: u64 = 24 * 60 * 60;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<OneTimeTokens>,
    pub api_key: Option<String>,
    pub default_ttl: u64,
}

#[derive(Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub claims: Map<String, Value>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Serialize, Deserialize)]
pub struct RedeemResponse {
    pub status: String,
    pub claims: Map<String, Value>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/tokens", post(generate_token))
        .route("/redeem", post(redeem_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_status(err: &TokenError) -> StatusCode {
    if err.is_configuration() {
        error!(error = %err, "token service misconfigured");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match err {
        TokenError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        TokenError::InvalidTtl => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn generate_token(
    State(state): State<AppState>,
    _key: ApiKey,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), StatusCode> {
    let expires_in = req.expires_in.unwrap_or(state.default_ttl);
    if expires_in == 0 || expires_in > MAX_EXPIRES_IN {
        return Err(StatusCode::BAD_REQUEST);
    }

    let token = state
        .tokens
        .issue(&req.claims, expires_in)
        .map_err(|err| error_status(&err))?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token, expires_in })))
}

async fn redeem_token(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<RedeemResponse>, StatusCode> {
    match state.tokens.redeem(&token).await {
        Ok(Some(claims)) => Ok(Json(RedeemResponse {
            status: "redeemed".to_string(),
            claims,
        })),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            warn!(error = %err, "redeem failed");
            Err(error_status(&err))
        }
    }
}
