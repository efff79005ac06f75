// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;

use super::{JobDone, JobRequest, NatsClient};
use crate::error::{Error, Result};

/// Sends job requests from the gateway towards the orchestrator
#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish_job(&self, request: &JobRequest) -> Result<()>;

    /// Largest request (headers plus body) one message may carry; `None` when
    /// unbounded
    fn max_payload(&self) -> Option<usize> {
        None
    }
}

/// Reject a request the bus would refuse. The server drops oversized messages
/// after the publish call has already succeeded, so this is the only place the
/// caller can learn about it.
pub fn ensure_fits(request: &JobRequest, max_payload: Option<usize>) -> Result<()> {
    let Some(max) = max_payload else {
        return Ok(());
    };
    let len = request.wire_len();
    if len > max {
        return Err(Error::TooLarge(format!(
            "upload of {} bytes exceeds the {} byte message limit",
            request.bitmap.len(),
            max
        )));
    }
    Ok(())
}

/// Sends completion notices from the orchestrator back to the gateway
#[async_trait]
pub trait DonePublisher: Send + Sync {
    async fn publish_done(&self, done: &JobDone) -> Result<()>;
}

/// Publish a job request; the bitmap is the message body
pub async fn publish_job_request(
    nats_client: &NatsClient,
    subject: &str,
    request: &JobRequest,
) -> Result<()> {
    nats_client
        .inner()
        .publish_with_headers(
            subject.to_string(),
            request.headers(),
            request.bitmap.clone().into(),
        )
        .await
        .map_err(|e| Error::bus(format!("failed to publish job {}: {}", request.job_id, e)))?;

    Ok(())
}

/// Publish a job-done notice with an empty body
pub async fn publish_job_done(nats_client: &NatsClient, subject: &str, done: &JobDone) -> Result<()> {
    nats_client
        .inner()
        .publish_with_headers(subject.to_string(), done.headers(), Vec::new().into())
        .await
        .map_err(|e| {
            Error::bus(format!(
                "failed to publish completion of job {}: {}",
                done.job_id, e
            ))
        })?;

    Ok(())
}

/// Both publishers backed by one NATS connection
#[derive(Clone)]
pub struct NatsJobBus {
    client: NatsClient,
    job_subject: String,
    done_subject: String,
}

impl NatsJobBus {
    pub fn new(
        client: NatsClient,
        job_subject: impl Into<String>,
        done_subject: impl Into<String>,
    ) -> Self {
        Self {
            client,
            job_subject: job_subject.into(),
            done_subject: done_subject.into(),
        }
    }
}

#[async_trait]
impl JobPublisher for NatsJobBus {
    async fn publish_job(&self, request: &JobRequest) -> Result<()> {
        ensure_fits(request, self.max_payload())?;
        publish_job_request(&self.client, &self.job_subject, request).await?;
        tracing::debug!(
            job_id = %request.job_id,
            subject = %self.job_subject,
            bytes = request.bitmap.len(),
            "Published job request"
        );
        Ok(())
    }

    fn max_payload(&self) -> Option<usize> {
        Some(self.client.max_payload())
    }
}

#[async_trait]
impl DonePublisher for NatsJobBus {
    async fn publish_done(&self, done: &JobDone) -> Result<()> {
        publish_job_done(&self.client, &self.done_subject, done).await?;
        tracing::debug!(
            job_id = %done.job_id,
            result_image_id = done.result_image_id,
            "Published job done"
        );
        Ok(())
    }
}
