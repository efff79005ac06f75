// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;

use super::{JobDone, JobRequest, NatsClient};
use crate::gateway::JobGateway;
use crate::orchestrator::Orchestrator;

/// Consume job requests and hand each one to the orchestrator on its own task
pub async fn run_job_request_loop(
    nats_client: NatsClient,
    subject: &str,
    orchestrator: Arc<Orchestrator>,
) -> Result<()> {
    let mut sub = nats_client
        .inner()
        .subscribe(subject.to_string())
        .await
        .with_context(|| format!("Failed to subscribe to {}", subject))?;

    tracing::info!("Orchestrator subscribed to {}", subject);

    while let Some(msg) = sub.next().await {
        let request = match JobRequest::from_parts(msg.headers.as_ref(), &msg.payload) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!("Dropping malformed job request: {}", e);
                continue;
            }
        };

        tracing::info!(
            job_id = %request.job_id,
            percent = request.percent,
            zoom_in = request.zoom_in,
            bytes = request.bitmap.len(),
            "Received job"
        );

        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.handle(request).await;
        });
    }

    Ok(())
}

/// Consume job-done notices and complete the matching gateway records
pub async fn run_job_done_loop(
    nats_client: NatsClient,
    subject: &str,
    gateway: JobGateway,
) -> Result<()> {
    let mut sub = nats_client
        .inner()
        .subscribe(subject.to_string())
        .await
        .with_context(|| format!("Failed to subscribe to {}", subject))?;

    tracing::info!("Gateway subscribed to {}", subject);

    while let Some(msg) = sub.next().await {
        match JobDone::from_headers(msg.headers.as_ref()) {
            Ok(done) => {
                gateway.complete_job(&done);
            }
            Err(e) => tracing::warn!("Dropping malformed job-done message: {}", e),
        }
    }

    Ok(())
}
