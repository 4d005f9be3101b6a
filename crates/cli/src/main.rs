//! Relay entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** from flags and `RELAY_*` environment variables
//!    and validate it before anything else happens.
//! 2. **Wire observability**: a `tracing-subscriber` fmt layer plus an optional
//!    OpenTelemetry OTLP exporter. Spans and events from every crate in the
//!    workspace flow through it.
//! 3. **Construct infrastructure**: one shared `reqwest::Client` behind
//!    [`feed::HttpEventSource`] and [`webhook::HttpDeliveryTransport`], both
//!    injected into a [`controller::Controller`].
//! 4. **Run until signalled**: SIGINT or SIGTERM cancels the controller,
//!    interrupting any in-flight request or backoff wait.
//!
//! An invalid configuration exits non-zero without touching the network.

mod config;
mod observability;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use controller::Controller;
use feed::HttpEventSource;
use webhook::HttpDeliveryTransport;

use crate::config::{Cli, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().into_settings()?;
    let telemetry = observability::init(settings.log_format, settings.otlp_endpoint.as_deref())?;

    let result = run(settings).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "relay failed");
    }

    telemetry.shutdown();
    result
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    // ---------------------------------------------------------------
    // 1. Shared HTTP client
    // ---------------------------------------------------------------
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(settings.pool_max_idle_per_host)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .build()
        .context("failed to build HTTP client")?;

    // ---------------------------------------------------------------
    // 2. Adapters
    // ---------------------------------------------------------------
    let source = Arc::new(HttpEventSource::new(client.clone(), &settings.client_url)?);
    let transport = Arc::new(HttpDeliveryTransport::new(client, &settings.server_url)?);

    // ---------------------------------------------------------------
    // 3. Controller
    // ---------------------------------------------------------------
    let controller = Controller::new(source, transport, settings.controller);
    tracing::info!(
        run_id = %controller.run_id(),
        client_url = %settings.client_url,
        server_url = %settings.server_url,
        "starting relay"
    );
    let handle = controller.spawn();

    wait_for_shutdown().await?;

    let state = handle.stop().await.context("controller task panicked")?;
    tracing::info!(
        phase = ?state.phase(),
        last_death = ?state.last_death(),
        "relay stopped"
    );
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
async fn wait_for_shutdown() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("failed to register SIGTERM handler")?;
        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.context("failed to listen for ctrl-c")?;
        tracing::info!("received ctrl-c, shutting down");
    }

    Ok(())
}
