//! Highcast HTTP server.
//!
//! Wires the core service together at startup: transform registry,
//! one-shot artifact load, real HTTP transports for both upstream
//! feeds, then serves the axum router. An unusable artifact degrades
//! the process to fallback predictions; it never prevents startup.

mod routes;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use log::info;
use thiserror::Error;

use highcast_core::{
    load_startup_estimator, CoinGeckoSource, KrakenSource, ObservationFetcher,
    PredictionDispatcher, PredictionService, ReqwestHttpClient, TransformRegistry, ARTIFACT_PATH,
};

const BIND_ADDRESS: &str = "0.0.0.0:8000";

#[derive(Debug, Error)]
enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: &'static str,
        source: std::io::Error,
    },

    #[error("server terminated: {0}")]
    Serve(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let registry = TransformRegistry::with_builtins();
    let trained = load_startup_estimator(Path::new(ARTIFACT_PATH), &registry);

    let http_client = Arc::new(ReqwestHttpClient::new());
    let fetcher = ObservationFetcher::new(
        Arc::new(KrakenSource::new(http_client.clone())),
        Arc::new(CoinGeckoSource::new(http_client)),
    );
    let dispatcher = PredictionDispatcher::new(trained, registry);
    let service = Arc::new(PredictionService::new(fetcher, dispatcher));

    let app = routes::router(service);
    let listener = tokio::net::TcpListener::bind(BIND_ADDRESS)
        .await
        .map_err(|source| ServerError::Bind {
            address: BIND_ADDRESS,
            source,
        })?;

    info!("listening on {BIND_ADDRESS}");
    axum::serve(listener, app).await?;
    Ok(())
}
