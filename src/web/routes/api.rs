// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;

use crate::error::{Error, Result};
use crate::gateway::{Download, JobStatus, JobView};
use crate::web::state::AppState;

/// Fields of the upload form
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    filename: Option<String>,
    zoom_in: Option<String>,
    percent: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::validation(format!("failed to read file: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            "zoomIn" | "percent" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::validation(format!("failed to read {}: {}", name, e)))?;
                if name == "zoomIn" {
                    form.zoom_in = Some(text);
                } else {
                    form.percent = Some(text);
                }
            }
            other => tracing::debug!("Ignoring form field {:?}", other),
        }
    }

    Ok(form)
}

/// Blank or absent means the default
fn parse_zoom_in(raw: Option<&str>, default: bool) -> Result<bool> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(s) => Err(Error::validation(format!(
            "zoomIn must be true or false, got {:?}",
            s
        ))),
    }
}

fn parse_percent(raw: Option<&str>, default: i32) -> Result<i32> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| Error::validation(format!("percent must be an integer, got {:?}", s))),
    }
}

/// Accept an upload and queue it
pub async fn create_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let form = read_upload(multipart).await?;
    let zoom_in = parse_zoom_in(form.zoom_in.as_deref(), state.config.default_zoom_in)?;
    let percent = parse_percent(form.percent.as_deref(), state.config.default_percent)?;

    let job_id = state
        .gateway
        .submit_job(form.file, form.filename, percent, zoom_in)
        .await?;

    Ok(Json(json!({
        "jobId": job_id,
        "status": JobStatus::Pending,
    })))
}

/// Get job status
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>> {
    Ok(Json(state.gateway.get_status(&job_id)?))
}

/// Redirect to the stored result once the job is done
pub async fn download(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response> {
    Ok(match state.gateway.get_download(&job_id)? {
        Download::NotReady => (StatusCode::ACCEPTED, "Not ready").into_response(),
        Download::Ready(location) => Redirect::temporary(&location).into_response(),
    })
}
