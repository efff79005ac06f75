// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod client;
pub mod jobs;
pub mod models;
pub mod worker;

pub use client::{NatsClient, create_nats_client};
pub use jobs::{
    DonePublisher, JobPublisher, NatsJobBus, ensure_fits, publish_job_done, publish_job_request,
};
pub use models::{JobDone, JobRequest};
pub use worker::{run_job_done_loop, run_job_request_loop};
