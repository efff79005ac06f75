// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::gateway::JobEvent;
use crate::web::state::AppState;

/// Name of the SSE event carrying a completed job
pub const JOB_DONE_EVENT: &str = "job-done";

fn job_done_event(event: &JobEvent) -> Option<Event> {
    match Event::default().event(JOB_DONE_EVENT).json_data(event) {
        Ok(sse_event) => Some(sse_event),
        Err(e) => {
            tracing::warn!(job_id = %event.job_id, "Failed to encode job event: {}", e);
            None
        }
    }
}

/// Live push channel; one `job-done` event per completed job.
///
/// The subscription lives inside the stream, so the subscriber leaves the set
/// when the client disconnects.
pub async fn job_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.gateway.subscribers().subscribe();

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            if let Some(sse_event) = job_done_event(&event) {
                yield Ok::<Event, Infallible>(sse_event);
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
