// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Messages exchanged between the gateway and the orchestrator.
//!
//! Both travel as NATS messages whose attributes are headers. A job request
//! carries the raw bitmap as its body; a job-done message has an empty body.

use async_nats::HeaderMap;

use crate::error::{Error, Result};

pub const JOB_ID_HEADER: &str = "jobId";
pub const PERCENT_HEADER: &str = "percent";
pub const ZOOM_IN_HEADER: &str = "zoomIn";
pub const FILENAME_HEADER: &str = "filename";
pub const RESULT_IMAGE_ID_HEADER: &str = "resultImageId";

/// Inbound job published by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub job_id: String,
    pub bitmap: Vec<u8>,
    pub percent: i32,
    pub zoom_in: bool,
    pub filename: String,
}

/// Completion published by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDone {
    pub job_id: String,
    pub result_image_id: i64,
}

/// Size of the encoded header block: `NATS/1.0\r\n`, one `name: value\r\n`
/// line per header, then a blank line
fn header_block_len(headers: &[(&str, &str)]) -> usize {
    let lines: usize = headers
        .iter()
        .map(|(name, value)| name.len() + 2 + value.len() + 2)
        .sum();
    "NATS/1.0\r\n".len() + lines + 2
}

fn header<'a>(headers: Option<&'a HeaderMap>, name: &str) -> Result<&'a str> {
    headers
        .and_then(|headers| headers.get(name))
        .map(|value| value.as_str())
        .ok_or_else(|| Error::bus(format!("message is missing the {} header", name)))
}

fn parsed_header<T: std::str::FromStr>(headers: Option<&HeaderMap>, name: &str) -> Result<T> {
    let raw = header(headers, name)?;
    raw.trim()
        .parse()
        .map_err(|_| Error::bus(format!("invalid {} header {:?}", name, raw)))
}

impl JobRequest {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(JOB_ID_HEADER, self.job_id.as_str());
        headers.insert(PERCENT_HEADER, self.percent.to_string().as_str());
        headers.insert(ZOOM_IN_HEADER, if self.zoom_in { "true" } else { "false" });
        headers.insert(FILENAME_HEADER, self.filename.as_str());
        headers
    }

    /// Bytes counted against the server's `max_payload`: headers plus body
    pub fn wire_len(&self) -> usize {
        let percent = self.percent.to_string();
        let zoom_in = if self.zoom_in { "true" } else { "false" };
        let block = header_block_len(&[
            (JOB_ID_HEADER, self.job_id.as_str()),
            (PERCENT_HEADER, percent.as_str()),
            (ZOOM_IN_HEADER, zoom_in),
            (FILENAME_HEADER, self.filename.as_str()),
        ]);
        block + self.bitmap.len()
    }

    /// Decode from message headers and body
    pub fn from_parts(headers: Option<&HeaderMap>, payload: &[u8]) -> Result<Self> {
        Ok(Self {
            job_id: header(headers, JOB_ID_HEADER)?.to_string(),
            percent: parsed_header(headers, PERCENT_HEADER)?,
            zoom_in: parsed_header(headers, ZOOM_IN_HEADER)?,
            filename: header(headers, FILENAME_HEADER)?.to_string(),
            bitmap: payload.to_vec(),
        })
    }
}

impl JobDone {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(JOB_ID_HEADER, self.job_id.as_str());
        headers.insert(
            RESULT_IMAGE_ID_HEADER,
            self.result_image_id.to_string().as_str(),
        );
        headers
    }

    pub fn from_headers(headers: Option<&HeaderMap>) -> Result<Self> {
        Ok(Self {
            job_id: header(headers, JOB_ID_HEADER)?.to_string(),
            result_image_id: parsed_header(headers, RESULT_IMAGE_ID_HEADER)?,
        })
    }
}
