use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use token_gate::api::{self, AppState};
use token_gate_core::{issue, GateConfig, OneTimeTokens, StoreProvider};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "token-gate")]
#[command(about = "Issues single-use bearer tokens and redeems each exactly once")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(short, long)]
        addr: Option<SocketAddr>,
    },

    /// Print a token signed with SECRET_KEY
    Issue {
        /// Claims as a JSON object
        #[arg(short, long, default_value = "{}")]
        claims: String,

        /// Lifetime in seconds, defaults to TOKEN_TTL_SECS
        #[arg(short, long)]
        ttl: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = GateConfig::from_env().context("invalid BIND_ADDR")?;

    match cli.command {
        Commands::Serve { addr } => serve(addr.unwrap_or(config.bind_addr), config).await,
        Commands::Issue { claims, ttl } => {
            let claims: Map<String, Value> =
                serde_json::from_str(&claims).context("claims must be a JSON object")?;
            let key = config
                .secret_key
                .as_deref()
                .ok_or_else(|| anyhow!("SECRET_KEY is not set"))?;
            println!("{}", issue(&claims, key, ttl.unwrap_or(config.token_ttl_secs))?);
            Ok(())
        }
    }
}

async fn serve(addr: SocketAddr, config: GateConfig) -> Result<()> {
    if config.secret_key.is_none() {
        warn!("SECRET_KEY is not set, issuing and redeeming will fail");
    }
    if config.api_key.is_none() {
        warn!("API_KEY is not set, token issuance is disabled");
    }

    let provider = StoreProvider::from_env(config.claim_timeout);
    let store = provider.get_store().context("failed to select claim store")?;

    let state = AppState {
        tokens: Arc::new(OneTimeTokens::new(config.secret_key.clone(), store)),
        api_key: config.api_key.clone(),
        default_ttl: config.token_ttl_secs,
    };
    let app = api::router(state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
