// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Fan-out/fan-in processing of one job: split, zoom both halves on their
//! workers, merge, store, then announce completion.
//!
//! Failures are logged and the job is abandoned. No retry, no dead letter,
//! no failure notice; the gateway keeps the job `PENDING`.

use std::sync::Arc;

use crate::bmp;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::image_store::{HttpImageStore, ImageStore};
use crate::nats::{DonePublisher, JobDone, JobRequest};
use crate::zoom::{HttpZoomClient, ZoomService};

/// Bytes of the bitmap header logged for each job
const LOGGED_HEADER_BYTES: usize = 16;

pub struct Orchestrator {
    top_worker: Arc<dyn ZoomService>,
    bottom_worker: Arc<dyn ZoomService>,
    image_store: Arc<dyn ImageStore>,
    done_publisher: Arc<dyn DonePublisher>,
}

impl Orchestrator {
    pub fn new(
        top_worker: Arc<dyn ZoomService>,
        bottom_worker: Arc<dyn ZoomService>,
        image_store: Arc<dyn ImageStore>,
        done_publisher: Arc<dyn DonePublisher>,
    ) -> Self {
        Self {
            top_worker,
            bottom_worker,
            image_store,
            done_publisher,
        }
    }

    /// HTTP workers and image store as configured
    pub fn from_config(config: &Config, done_publisher: Arc<dyn DonePublisher>) -> Result<Self> {
        let timeout = config.orchestrator.rpc_timeout();
        let top = HttpZoomClient::new(config.orchestrator.top_worker.clone(), timeout)?;
        let bottom = HttpZoomClient::new(config.orchestrator.bottom_worker.clone(), timeout)?;
        let store = HttpImageStore::new(
            config.image_store.base_url.clone(),
            config.image_store.timeout(),
        )?;

        Ok(Self::new(
            Arc::new(top),
            Arc::new(bottom),
            Arc::new(store),
            done_publisher,
        ))
    }

    /// Run the whole pipeline for one request and return the stored image id
    pub async fn process(&self, request: &JobRequest) -> Result<i64> {
        let job_id = request.job_id.as_str();
        tracing::debug!(
            job_id,
            header = %bmp::hex_prefix(&request.bitmap, LOGGED_HEADER_BYTES),
            "Job bitmap header"
        );

        if !bmp::has_signature(&request.bitmap) {
            return Err(Error::format("Not a BMP"));
        }

        let source = bmp::parse(&request.bitmap)?;
        let (top, bottom) = bmp::split_half(&source)?;
        drop(source);

        let (zoomed_top, zoomed_bottom) = tokio::try_join!(
            self.top_worker.zoom(top, request.percent, request.zoom_in),
            self.bottom_worker.zoom(bottom, request.percent, request.zoom_in),
        )?;

        let merged = bmp::merge_vertical(&zoomed_top, &zoomed_bottom)?;

        let result_image_id = self
            .image_store
            .store(merged, &request.filename, request.zoom_in, request.percent)
            .await?;

        self.done_publisher
            .publish_done(&JobDone {
                job_id: request.job_id.clone(),
                result_image_id,
            })
            .await?;

        Ok(result_image_id)
    }

    /// Message-handling boundary: never lets a job failure escape
    pub async fn handle(&self, request: JobRequest) {
        match self.process(&request).await {
            Ok(image_id) => tracing::info!(
                job_id = %request.job_id,
                image_id,
                "Job done"
            ),
            Err(e) => tracing::error!(
                job_id = %request.job_id,
                kind = e.kind(),
                "Job abandoned: {}",
                e
            ),
        }
    }
}
