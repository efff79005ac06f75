// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::Value;

use super::ZoomService;
use crate::config::WorkerAddress;
use crate::error::{Error, Result};

/// Calls a remote zoom worker over HTTP
#[derive(Debug, Clone)]
pub struct HttpZoomClient {
    address: WorkerAddress,
    client: Client,
}

impl HttpZoomClient {
    pub fn new(address: WorkerAddress, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { address, client })
    }

    pub fn address(&self) -> &WorkerAddress {
        &self.address
    }

    fn failure(&self, message: impl Into<String>) -> Error {
        Error::remote_call(self.address.to_string(), message)
    }
}

/// Pull `error.message` out of a JSON error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ZoomService for HttpZoomClient {
    async fn zoom(&self, bitmap: Vec<u8>, percent: i32, zoom_in: bool) -> Result<Vec<u8>> {
        let url = format!("{}/zoom", self.address.base_url());
        let zoom_in = if zoom_in { "true" } else { "false" };

        let response = self
            .client
            .post(&url)
            .query(&[("percent", percent.to_string().as_str()), ("zoomIn", zoom_in)])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bitmap)
            .send()
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.failure(format!("{}: {}", status, error_message(&body))));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.failure(format!("failed to read response: {}", e)))?;

        Ok(bytes.to_vec())
    }
}
