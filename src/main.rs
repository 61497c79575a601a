mod api;
mod config;
mod engine;
mod error;
mod fetcher;
mod keys;
mod normalizer;
mod state;
mod store;
mod types;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::OddsClient;
use crate::state::SessionState;
use crate::store::SnapshotStore;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        sport = %cfg.sport_key,
        bookmaker = %cfg.bookmaker_key,
        "line-movement scanner starting"
    );

    let session = SessionState::new();
    let odds = Arc::new(OddsClient::new(&cfg)?);
    let store = Arc::new(SnapshotStore::new(&cfg)?);

    let api_state = ApiState {
        cfg: cfg.clone(),
        session,
        odds,
        store,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("operator API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
