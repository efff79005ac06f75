// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bmp_zoom::config::{self, DEFAULT_CONFIG_PATH};
use bmp_zoom::gateway::JobGateway;
use bmp_zoom::nats::{self, NatsJobBus};
use bmp_zoom::orchestrator::Orchestrator;
use bmp_zoom::web::{self, AppState};
use bmp_zoom::zoom;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Accept uploads over HTTP and track jobs
    Gateway {
        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,
    },
    /// Split, zoom, merge and store queued jobs
    Orchestrator,
    /// Serve zoom requests for one half of an image
    ZoomWorker {
        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bmp_zoom=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Gateway { port } => {
            let client = nats::create_nats_client(&config.nats.url, "bmp-zoom-gateway").await?;
            if config.gateway.max_upload_bytes > client.max_payload() {
                tracing::warn!(
                    max_upload_bytes = config.gateway.max_upload_bytes,
                    max_payload = client.max_payload(),
                    "Uploads above the NATS max_payload are refused with 413; raise max_payload on the server to accept them"
                );
            }
            let bus = NatsJobBus::new(
                client.clone(),
                config.nats.job_subject.clone(),
                config.nats.done_subject.clone(),
            );
            let gateway = JobGateway::new(Arc::new(bus), config.image_store.base_url.clone());

            let done_subject = config.nats.done_subject.clone();
            let listener_gateway = gateway.clone();
            let done_loop = tokio::spawn(async move {
                if let Err(e) =
                    nats::run_job_done_loop(client, &done_subject, listener_gateway).await
                {
                    tracing::error!("Job-done listener stopped: {:#}", e);
                }
            });

            let port = port.unwrap_or(config.gateway.port);
            let state = AppState::new(gateway, config.gateway.clone());
            let result = web::start_server(state, port).await;
            done_loop.abort();
            result?;
        }
        Commands::Orchestrator => {
            let client =
                nats::create_nats_client(&config.nats.url, "bmp-zoom-orchestrator").await?;
            let bus = NatsJobBus::new(
                client.clone(),
                config.nats.job_subject.clone(),
                config.nats.done_subject.clone(),
            );
            let orchestrator = Arc::new(Orchestrator::from_config(&config, Arc::new(bus))?);

            tracing::info!(
                top = %config.orchestrator.top_worker,
                bottom = %config.orchestrator.bottom_worker,
                image_store = %config.image_store.base_url,
                "Orchestrator starting"
            );

            tokio::select! {
                result = nats::run_job_request_loop(client, &config.nats.job_subject, orchestrator) => result?,
                _ = web::shutdown_signal() => {}
            }
        }
        Commands::ZoomWorker { port } => {
            let port = port.unwrap_or(config.zoom_worker.port);
            zoom::start_zoom_worker(port, config.zoom_worker.max_body_bytes).await?;
        }
    }

    Ok(())
}
