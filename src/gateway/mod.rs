// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Front door of the pipeline: accepts uploads, tracks job status and pushes
//! completion events to live subscribers.

pub mod jobs;
pub mod subscribers;

use std::sync::Arc;

use uuid::Uuid;

use crate::bmp;
use crate::error::{Error, Result};
use crate::image_store::download_location;
use crate::nats::{JobDone, JobPublisher, JobRequest, ensure_fits};

pub use jobs::{Completion, JobRecord, JobState, JobStatus, JobStore, JobView};
pub use subscribers::{JobEvent, SubscriberSet, Subscription};

/// Filename recorded when the upload does not name one
pub const DEFAULT_UPLOAD_FILENAME: &str = "input.bmp";

/// Leading bytes quoted back when an upload is not a bitmap
const QUOTED_PREFIX_BYTES: usize = 8;

/// Answer to a download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    NotReady,
    Ready(String),
}

#[derive(Clone)]
pub struct JobGateway {
    jobs: JobStore,
    subscribers: SubscriberSet,
    publisher: Arc<dyn JobPublisher>,
    image_store_url: String,
}

impl JobGateway {
    pub fn new(publisher: Arc<dyn JobPublisher>, image_store_url: impl Into<String>) -> Self {
        Self {
            jobs: JobStore::new(),
            subscribers: SubscriberSet::new(),
            publisher,
            image_store_url: image_store_url.into(),
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subscribers
    }

    /// Validate, record as PENDING and publish. Returns without waiting for
    /// processing. An upload the bus cannot carry in one message is refused
    /// before any record exists.
    pub async fn submit_job(
        &self,
        file: Option<Vec<u8>>,
        filename: Option<String>,
        percent: i32,
        zoom_in: bool,
    ) -> Result<String> {
        let bitmap = file
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| Error::validation("missing file"))?;

        if !bmp::has_signature(&bitmap) {
            return Err(Error::validation(format!(
                "not a bitmap (first bytes: {})",
                bmp::hex_prefix(&bitmap, QUOTED_PREFIX_BYTES)
            )));
        }
        if percent <= 0 {
            return Err(Error::validation(format!(
                "percent must be > 0, got {}",
                percent
            )));
        }

        let filename = filename
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_FILENAME.to_string());

        let job_id = Uuid::new_v4().to_string();
        let request = JobRequest {
            job_id: job_id.clone(),
            bitmap,
            percent,
            zoom_in,
            filename,
        };

        if let Err(e) = ensure_fits(&request, self.publisher.max_payload()) {
            tracing::warn!(bytes = request.bitmap.len(), "Rejecting upload: {}", e);
            return Err(e);
        }

        self.jobs.create_pending(&job_id);

        if let Err(e) = self.publisher.publish_job(&request).await {
            self.jobs.remove(&job_id);
            tracing::error!(job_id = %job_id, "Publishing job failed: {}", e);
            return Err(e);
        }

        tracing::info!(
            job_id = %job_id,
            bytes = request.bitmap.len(),
            percent,
            zoom_in,
            "Job submitted"
        );

        Ok(job_id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobView> {
        self.jobs
            .get(job_id)
            .map(|record| record.view())
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
    }

    pub fn get_download(&self, job_id: &str) -> Result<Download> {
        let record = self
            .jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))?;

        Ok(match record.state {
            JobState::Pending => Download::NotReady,
            JobState::Done {
                download_location, ..
            } => Download::Ready(download_location),
        })
    }

    /// Apply a job-done notice. Only the PENDING -> DONE transition broadcasts.
    pub fn complete_job(&self, done: &JobDone) -> Option<JobEvent> {
        let location = download_location(&self.image_store_url, done.result_image_id);

        match self.jobs.complete(&done.job_id, done.result_image_id, location) {
            Completion::Completed(record) => {
                let JobState::Done {
                    result_image_id,
                    download_location,
                    ..
                } = record.state
                else {
                    return None;
                };
                let event = JobEvent {
                    job_id: record.job_id,
                    status: JobStatus::Done,
                    result_image_id,
                    download_location,
                };
                let delivered = self.subscribers.broadcast(&event);
                tracing::info!(
                    job_id = %event.job_id,
                    result_image_id,
                    subscribers = delivered,
                    "Job completed"
                );
                Some(event)
            }
            Completion::AlreadyDone => {
                tracing::warn!(
                    job_id = %done.job_id,
                    result_image_id = done.result_image_id,
                    "Ignoring repeated completion"
                );
                None
            }
            Completion::Unknown => {
                tracing::warn!(job_id = %done.job_id, "Ignoring completion for unknown job");
                None
            }
        }
    }
}
