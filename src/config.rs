// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "bmp-zoom.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nats: NatsConfig,
    pub gateway: GatewayConfig,
    pub orchestrator: OrchestratorConfig,
    pub zoom_worker: ZoomWorkerConfig,
    pub image_store: ImageStoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    pub url: String,
    /// Subject carrying job-request messages
    pub job_subject: String,
    /// Subject carrying job-done messages
    pub done_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            job_subject: "bmp.jobs".to_string(),
            done_subject: "bmp.jobs.done".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Used when the upload form omits `percent`
    pub default_percent: i32,
    /// Used when the upload form omits `zoomIn`
    pub default_zoom_in: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            max_upload_bytes: 200 * 1024 * 1024,
            default_percent: 20,
            default_zoom_in: true,
        }
    }
}

/// Network address of one zoom worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAddress {
    pub host: String,
    pub port: u16,
}

impl WorkerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Worker that zooms the top half
    pub top_worker: WorkerAddress,
    /// Worker that zooms the bottom half
    pub bottom_worker: WorkerAddress,
    /// No timeout when unset
    pub rpc_timeout_secs: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            top_worker: WorkerAddress::new("127.0.0.1", 1099),
            bottom_worker: WorkerAddress::new("127.0.0.1", 1100),
            rpc_timeout_secs: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomWorkerConfig {
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ZoomWorkerConfig {
    fn default() -> Self {
        Self {
            port: 1099,
            max_body_bytes: 200 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStoreConfig {
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for ImageStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: None,
        }
    }
}

impl ImageStoreConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Apply environment-style overrides on top of the file values.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = get("NATS_URL") {
            self.nats.url = url;
        }
        if let Some(subject) = get("JOB_SUBJECT") {
            self.nats.job_subject = subject;
        }
        if let Some(subject) = get("DONE_SUBJECT") {
            self.nats.done_subject = subject;
        }
        if let Some(url) = get("IMAGE_STORE_URL") {
            self.image_store.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(host) = get("TOP_WORKER_HOST") {
            self.orchestrator.top_worker.host = host;
        }
        if let Some(host) = get("BOTTOM_WORKER_HOST") {
            self.orchestrator.bottom_worker.host = host;
        }

        override_parsed(get("GATEWAY_PORT"), "GATEWAY_PORT", &mut self.gateway.port);
        override_parsed(get("ZOOM_WORKER_PORT"), "ZOOM_WORKER_PORT", &mut self.zoom_worker.port);
        override_parsed(
            get("TOP_WORKER_PORT"),
            "TOP_WORKER_PORT",
            &mut self.orchestrator.top_worker.port,
        );
        override_parsed(
            get("BOTTOM_WORKER_PORT"),
            "BOTTOM_WORKER_PORT",
            &mut self.orchestrator.bottom_worker.port,
        );

        let mut rpc_timeout = 0u64;
        if override_parsed(get("RPC_TIMEOUT_SECS"), "RPC_TIMEOUT_SECS", &mut rpc_timeout) {
            self.orchestrator.rpc_timeout_secs = Some(rpc_timeout);
        }
        let mut store_timeout = 0u64;
        if override_parsed(get("STORE_TIMEOUT_SECS"), "STORE_TIMEOUT_SECS", &mut store_timeout) {
            self.image_store.timeout_secs = Some(store_timeout);
        }
    }
}

/// Returns true when `target` was replaced
fn override_parsed<T: FromStr>(value: Option<String>, key: &str, target: &mut T) -> bool {
    let Some(value) = value else {
        return false;
    };
    match value.parse() {
        Ok(parsed) => {
            *target = parsed;
            true
        }
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", key, value);
            false
        }
    }
}

/// Read the TOML file (defaults when it does not exist), then apply
/// overrides from the process environment.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let mut config = if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config file {:?}", path))?
    } else {
        tracing::info!("No config file at {:?}, using defaults", path);
        Config::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
