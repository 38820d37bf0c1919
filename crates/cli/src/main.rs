//! hookfeed entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: command-line flags and environment variables
//!    layered over `.hookfeed/config.toml` (see [`config`]).
//! 2. **Wire observability**: `tracing-subscriber` with a JSON or pretty layer
//!    and, optionally, an OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Construct infrastructure**: build the configured [`events::EventStore`]
//!    once and inject it into the [`ingest::IngestionService`].
//! 4. **Serve**: bind the HTTP listener and run until Ctrl-C or SIGTERM.

mod config;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use config::{Cli, Settings, StoreKind};
use events::EventStore;
use ingest::IngestionService;
use store::{InMemoryEventStore, JsonlEventStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load(Cli::parse()).context("loading configuration")?;
    let tracing_guard = telemetry::init(settings.log_format, settings.otlp_endpoint.as_deref())?;

    let result = run(settings).await;
    if let Err(error) = &result {
        tracing::error!(error = %format!("{error:#}"), "hookfeed stopped with an error");
    }

    tracing_guard.shutdown();
    result
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let store: Arc<dyn EventStore> = match settings.store {
        StoreKind::Memory => {
            tracing::warn!("using the in-memory store; events are lost on restart");
            Arc::new(InMemoryEventStore::new())
        }
        StoreKind::Jsonl => {
            tracing::info!(path = %settings.store_path.display(), "using the jsonl store");
            Arc::new(JsonlEventStore::new(&settings.store_path))
        }
    };
    let service = Arc::new(IngestionService::new(store, settings.store_failure_policy));

    let tcp = TcpListener::bind(settings.bind)
        .await
        .with_context(|| format!("binding {}", settings.bind))?;

    listener::serve(tcp, service, shutdown_signal())
        .await
        .context("serving HTTP")?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
