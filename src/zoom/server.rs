// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP face of a zoom worker: `POST /zoom?percent=P&zoomIn=B` with the bitmap
//! as the request body, answered with the resized bitmap.

use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query},
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::{LocalZoom, ZoomService};
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct ZoomParams {
    pub percent: i32,
    #[serde(rename = "zoomIn")]
    pub zoom_in: bool,
}

/// Router for a zoom worker
pub fn create_zoom_app(max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/zoom", post(zoom_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn zoom_handler(Query(params): Query<ZoomParams>, body: Bytes) -> Result<impl IntoResponse> {
    tracing::debug!(
        percent = params.percent,
        zoom_in = params.zoom_in,
        bytes = body.len(),
        "Zoom request"
    );

    let zoomed = LocalZoom
        .zoom(body.to_vec(), params.percent, params.zoom_in)
        .await?;

    Ok(([(header::CONTENT_TYPE, "image/bmp")], zoomed))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Serve a zoom worker until Ctrl-C
pub async fn start_zoom_worker(port: u16, max_body_bytes: usize) -> anyhow::Result<()> {
    let app = create_zoom_app(max_body_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Zoom worker listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(crate::web::shutdown_signal())
        .await?;

    Ok(())
}
