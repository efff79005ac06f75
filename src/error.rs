// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types shared by the codec, the workers, the orchestrator and the gateway

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unsupported bitmap
    #[error("Bitmap format error: {0}")]
    Format(String),

    /// Two halves that cannot be stacked
    #[error("Cannot merge: {0}")]
    GeometryMismatch(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Bad upload request
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Upload larger than the message bus accepts in one message
    #[error("Too large: {0}")]
    TooLarge(String),

    /// A zoom worker was unreachable or answered with an error
    #[error("Zoom worker {worker} failed: {message}")]
    RemoteCall { worker: String, message: String },

    /// Image store write failed
    #[error("Image store error: {0}")]
    Store(String),

    /// Message bus publish or subscribe failed
    #[error("Message bus error: {0}")]
    Bus(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote_call(worker: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCall {
            worker: worker.into(),
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus(message.into())
    }

    /// Short machine-readable name used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Format(_) => "format_error",
            Error::GeometryMismatch(_) => "geometry_mismatch",
            Error::InvalidParameter(_) => "invalid_parameter",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::TooLarge(_) => "payload_too_large",
            Error::RemoteCall { .. } => "remote_call_error",
            Error::Store(_) => "store_error",
            Error::Bus(_) => "bus_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Format(_)
            | Error::GeometryMismatch(_)
            | Error::InvalidParameter(_)
            | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::RemoteCall { .. } | Error::Store(_) => StatusCode::BAD_GATEWAY,
            Error::Bus(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
