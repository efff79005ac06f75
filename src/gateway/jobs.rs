// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Done,
}

/// Everything a completed job carries is set in one step
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Done {
        result_image_id: i64,
        download_location: String,
        completed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    pub submitted_at: DateTime<Utc>,
    pub state: JobState,
}

impl JobRecord {
    pub fn status(&self) -> JobStatus {
        match self.state {
            JobState::Pending => JobStatus::Pending,
            JobState::Done { .. } => JobStatus::Done,
        }
    }

    pub fn view(&self) -> JobView {
        let mut view = JobView {
            job_id: self.job_id.clone(),
            status: self.status(),
            submitted_at: self.submitted_at,
            result_image_id: None,
            download_location: None,
            completed_at: None,
        };
        if let JobState::Done {
            result_image_id,
            download_location,
            completed_at,
        } = &self.state
        {
            view.result_image_id = Some(*result_image_id);
            view.download_location = Some(download_location.clone());
            view.completed_at = Some(*completed_at);
        }
        view
    }
}

/// JSON shape returned by `GET /api/jobs/{jobId}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_image_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of applying a completion notice
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Completed(JobRecord),
    AlreadyDone,
    Unknown,
}

/// Concurrent job table keyed by job id
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<DashMap<String, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_pending(&self, job_id: &str) -> JobRecord {
        let record = JobRecord {
            job_id: job_id.to_string(),
            submitted_at: Utc::now(),
            state: JobState::Pending,
        };
        self.jobs.insert(job_id.to_string(), record.clone());
        record
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.remove(job_id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// PENDING -> DONE under the entry lock. A second completion keeps the first.
    pub fn complete(&self, job_id: &str, result_image_id: i64, download_location: String) -> Completion {
        match self.jobs.entry(job_id.to_string()) {
            Entry::Vacant(_) => Completion::Unknown,
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if matches!(record.state, JobState::Done { .. }) {
                    return Completion::AlreadyDone;
                }
                record.state = JobState::Done {
                    result_image_id,
                    download_location,
                    completed_at: Utc::now(),
                };
                Completion::Completed(record.clone())
            }
        }
    }
}
