// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Connection to the message bus shared by the gateway and the orchestrator.
//!
//! Connection events are only reported through the event callback, so they
//! are logged here. A server-side rejection such as a payload violation never
//! reaches the publisher.

use anyhow::{Context, Result};
use async_nats::{Client, ConnectOptions, Event};

/// Connected bus client for one pipeline process
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Largest message (headers plus body) the server accepts
    pub fn max_payload(&self) -> usize {
        self.client.server_info().max_payload
    }
}

async fn log_event(process: String, event: Event) {
    match event {
        Event::Connected => tracing::info!(process = %process, "NATS connection restored"),
        Event::Disconnected => tracing::warn!(process = %process, "NATS connection lost"),
        Event::ServerError(err) => {
            tracing::error!(process = %process, "NATS server error: {}", err)
        }
        Event::SlowConsumer(sid) => {
            tracing::warn!(process = %process, subscription = sid, "NATS slow consumer")
        }
        other => tracing::debug!(process = %process, "NATS event: {}", other),
    }
}

/// Connect as `process` (the name shown in the server's connection list)
pub async fn create_nats_client(nats_url: &str, process: &str) -> Result<NatsClient> {
    let name = process.to_string();
    let client = ConnectOptions::new()
        .name(process)
        .event_callback(move |event| log_event(name.clone(), event))
        .connect(nats_url)
        .await
        .with_context(|| format!("Failed to connect to NATS server at {}", nats_url))?;

    let client = NatsClient::new(client);
    tracing::info!(
        process,
        max_payload = client.max_payload(),
        "Connected to NATS server at {}",
        nats_url
    );

    Ok(client)
}
