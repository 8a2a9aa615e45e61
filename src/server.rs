//! Service startup and lifecycle
//!
//! Startup order: content directory writability check (fatal), one
//! synchronous cycle when the directory is empty, background scheduler,
//! then HTTP serving until Ctrl+C.

use crate::api::build_app;
use crate::config::ScribeConfig;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::scheduler::{daily_job, DailyScheduler};
use std::net::SocketAddr;
use std::sync::Arc;

/// Overrides taken from the command line
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    /// Start the daily scheduler (also requires `schedule.enabled`)
    pub scheduler: bool,
}

impl ServeOptions {
    pub fn from_config(config: &ScribeConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            scheduler: config.schedule.enabled,
        }
    }
}

/// Pre-serving checks: the store must be writable, and an empty store is
/// seeded with one article so the home page has something to show.
pub async fn prepare(pipeline: &Pipeline) -> Result<()> {
    let store = pipeline.store();
    store.verify_writable().await.map_err(|e| {
        Error::Config(format!(
            "Content directory {} is not writable: {}",
            store.dir().display(),
            e
        ))
    })?;

    if store.is_empty().await {
        tracing::info!("No existing content found, generating initial content");
        daily_job(pipeline).await;
    }
    Ok(())
}

/// Run the service until Ctrl+C
pub async fn serve(config: ScribeConfig, pipeline: Arc<Pipeline>, options: ServeOptions) -> Result<()> {
    prepare(&pipeline).await?;

    let scheduler = if options.scheduler && config.schedule.enabled {
        let scheduler = DailyScheduler::from_config(&config.schedule)?;
        let handle = scheduler.spawn(pipeline.clone());
        tracing::info!(at = %scheduler.schedule().at(), "Scheduled daily generation");
        Some((scheduler, handle))
    } else {
        tracing::info!("Daily scheduler disabled");
        None
    };

    let app = build_app(pipeline, &config)?;
    let listener = tokio::net::TcpListener::bind((options.host.as_str(), options.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server listening. Press Ctrl+C to stop.");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Shutting down...");
    if let Some((scheduler, handle)) = scheduler {
        scheduler.stop();
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}
