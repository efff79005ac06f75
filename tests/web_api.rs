// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP surface of the gateway, driven in-process through the router

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bmp_zoom::config::GatewayConfig;
use bmp_zoom::gateway::JobGateway;
use bmp_zoom::nats::JobDone;
use bmp_zoom::web::{AppState, create_app};
use common::{MemoryBus, STORE_URL, bitmap};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "bmp-zoom-test-boundary";

fn setup() -> (Router, JobGateway, Arc<MemoryBus>) {
    setup_with_bus(MemoryBus::default())
}

fn setup_with_bus(bus: MemoryBus) -> (Router, JobGateway, Arc<MemoryBus>) {
    let bus = Arc::new(bus);
    let gateway = JobGateway::new(bus.clone(), STORE_URL);
    let app = create_app(AppState::new(gateway.clone(), GatewayConfig::default()));
    (app, gateway, bus)
}

/// multipart/form-data body with an optional file part and text fields
fn multipart_body(file: Option<(&str, &[u8])>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: image/bmp\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = setup();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_upload_creates_pending_job() {
    let (app, gateway, bus) = setup();
    let image = bitmap(4, 4, 24);

    let response = app
        .clone()
        .oneshot(upload(multipart_body(
            Some(("cat.bmp", image.as_slice())),
            &[("zoomIn", "false"), ("percent", "35")],
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "PENDING");
    let job_id = json["jobId"].as_str().unwrap().to_string();
    assert!(gateway.jobs().get(&job_id).is_some());

    let published = bus.jobs();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].job_id, job_id);
    assert_eq!(published[0].bitmap, image);
    assert_eq!(published[0].filename, "cat.bmp");
    assert_eq!(published[0].percent, 35);
    assert!(!published[0].zoom_in);

    let response = app
        .oneshot(get(&format!("/api/jobs/{}", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["jobId"], job_id.as_str());
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn test_upload_uses_form_defaults() {
    let (app, _, bus) = setup();
    let image = bitmap(2, 2, 24);

    let response = app
        .oneshot(upload(multipart_body(
            Some(("a.bmp", image.as_slice())),
            &[("zoomIn", ""), ("percent", " ")],
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let published = bus.jobs();
    assert_eq!(published[0].percent, 20);
    assert!(published[0].zoom_in);
}

#[tokio::test]
async fn test_non_bitmap_upload_is_rejected() {
    let (app, gateway, bus) = setup();

    let response = app
        .oneshot(upload(multipart_body(
            Some(("notes.txt", &b"just some text"[..])),
            &[("percent", "20")],
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["error"]["type"], "validation_error");
    assert!(
        json["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("not a bitmap")
    );
    assert!(gateway.jobs().is_empty());
    assert!(bus.jobs().is_empty());
}

#[tokio::test]
async fn test_upload_over_bus_limit_is_413() {
    let (app, gateway, bus) = setup_with_bus(MemoryBus::with_max_payload(64 * 1024));
    let image = bitmap(200, 200, 24);

    let response = app
        .oneshot(upload(multipart_body(
            Some(("big.bmp", image.as_slice())),
            &[("percent", "20")],
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let json = json_body(response).await;
    assert_eq!(json["error"]["type"], "payload_too_large");
    assert!(gateway.jobs().is_empty());
    assert!(bus.jobs().is_empty());
}

#[tokio::test]
async fn test_missing_file_is_rejected() {
    let (app, gateway, _) = setup();

    let response = app
        .oneshot(upload(multipart_body(None, &[("percent", "20")])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "missing file");
    assert!(gateway.jobs().is_empty());
}

#[tokio::test]
async fn test_bad_form_values_are_rejected() {
    let (app, gateway, _) = setup();
    let image = bitmap(2, 2, 24);

    for fields in [
        [("zoomIn", "maybe"), ("percent", "20")],
        [("zoomIn", "true"), ("percent", "lots")],
        [("zoomIn", "true"), ("percent", "-10")],
    ] {
        let response = app
            .clone()
            .oneshot(upload(multipart_body(Some(("a.bmp", image.as_slice())), &fields)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{:?}", fields);
    }
    assert!(gateway.jobs().is_empty());
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let (app, _, _) = setup();

    let response = app.clone().oneshot(get("/api/jobs/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["type"], "not_found");

    let response = app.oneshot(get("/api/download/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_waits_then_redirects() {
    let (app, gateway, _) = setup();
    let job_id = gateway
        .submit_job(Some(bitmap(2, 2, 24)), None, 20, true)
        .await
        .unwrap();
    let uri = format!("/api/download/{}", job_id);

    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Not ready");

    gateway.complete_job(&JobDone {
        job_id: job_id.clone(),
        result_image_id: 12,
    });

    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        format!("{}/images/12", STORE_URL).as_str()
    );

    let response = app
        .oneshot(get(&format!("/api/jobs/{}", job_id)))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["status"], "DONE");
    assert_eq!(json["resultImageId"], 12);
    assert_eq!(
        json["downloadLocation"],
        format!("{}/images/12", STORE_URL).as_str()
    );
}

#[tokio::test]
async fn test_events_endpoint_is_an_event_stream() {
    let (app, gateway, _) = setup();

    let response = app.oneshot(get("/api/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(gateway.subscribers().len(), 1);

    drop(response);
    assert!(gateway.subscribers().is_empty());
}
