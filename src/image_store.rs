// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Client for the external image store.
//!
//! Results are written with `POST {base}/images?filename&mime&zoomIn&percent`
//! (raw bitmap body) and answered with `{"id": <n>}`. Browsers later fetch
//! them from `{base}/images/{id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_RESULT_FILENAME: &str = "result.bmp";
const BITMAP_MIME: &str = "image/bmp";

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist a result bitmap and return its store id
    async fn store(
        &self,
        bitmap: Vec<u8>,
        filename: &str,
        zoom_in: bool,
        percent: i32,
    ) -> Result<i64>;
}

/// Where a stored image can be downloaded
pub fn download_location(base_url: &str, image_id: i64) -> String {
    format!("{}/images/{}", base_url.trim_end_matches('/'), image_id)
}

#[derive(Debug, Deserialize)]
struct StoredImage {
    id: i64,
}

#[derive(Debug, Clone)]
pub struct HttpImageStore {
    base_url: String,
    client: Client,
}

impl HttpImageStore {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn store(
        &self,
        bitmap: Vec<u8>,
        filename: &str,
        zoom_in: bool,
        percent: i32,
    ) -> Result<i64> {
        let filename = if filename.trim().is_empty() {
            DEFAULT_RESULT_FILENAME
        } else {
            filename
        };
        let url = format!("{}/images", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[
                ("filename", filename.to_string()),
                ("mime", BITMAP_MIME.to_string()),
                ("zoomIn", zoom_in.to_string()),
                ("percent", percent.to_string()),
            ])
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bitmap)
            .send()
            .await
            .map_err(|e| Error::store(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::store(format!("{} answered {}", url, status)));
        }

        let stored: StoredImage = response
            .json()
            .await
            .map_err(|e| Error::store(format!("no image id in response: {}", e)))?;

        Ok(stored.id)
    }
}
