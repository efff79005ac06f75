// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Common test utilities and helpers
//!
//! In-memory stand-ins for the message bus, the image store and the zoom
//! workers, plus a bitmap fixture.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bmp_zoom::error::{Error, Result};
use bmp_zoom::gateway::JobGateway;
use bmp_zoom::image_store::ImageStore;
use bmp_zoom::nats::{DonePublisher, JobDone, JobPublisher, JobRequest};
use bmp_zoom::orchestrator::Orchestrator;
use bmp_zoom::zoom::{LocalZoom, ZoomService};

pub const STORE_URL: &str = "http://store.test:3000";

/// Uncompressed bitmap whose first channel is the visual row and second the
/// column. Negative `height` gives a top-down file.
pub fn bitmap(width: usize, height: i32, bits: u16) -> Vec<u8> {
    let bpp = usize::from(bits / 8);
    let stride = (width * bpp).div_ceil(4) * 4;
    let rows = height.unsigned_abs() as usize;
    let data_len = stride * rows;

    let mut bytes = vec![0u8; 54 + data_len];
    bytes[..2].copy_from_slice(b"BM");
    bytes[2..6].copy_from_slice(&((54 + data_len) as u32).to_le_bytes());
    bytes[10..14].copy_from_slice(&54u32.to_le_bytes());
    bytes[14..18].copy_from_slice(&40u32.to_le_bytes());
    bytes[18..22].copy_from_slice(&(width as i32).to_le_bytes());
    bytes[22..26].copy_from_slice(&height.to_le_bytes());
    bytes[26..28].copy_from_slice(&1u16.to_le_bytes());
    bytes[28..30].copy_from_slice(&bits.to_le_bytes());
    bytes[34..38].copy_from_slice(&(data_len as u32).to_le_bytes());

    for visual in 0..rows {
        let file_row = if height < 0 { visual } else { rows - 1 - visual };
        for x in 0..width {
            let at = 54 + file_row * stride + x * bpp;
            bytes[at] = visual as u8;
            bytes[at + 1] = x as u8;
            bytes[at + 2] = 0xAA;
        }
    }
    bytes
}

/// Captures everything published instead of sending it
#[derive(Default)]
pub struct MemoryBus {
    pub jobs: Mutex<Vec<JobRequest>>,
    pub done: Mutex<Vec<JobDone>>,
    pub fail_publish: AtomicBool,
    pub max_payload: Option<usize>,
}

impl MemoryBus {
    pub fn failing() -> Self {
        let bus = Self::default();
        bus.fail_publish.store(true, Ordering::SeqCst);
        bus
    }

    /// Bus that, like a NATS server, refuses messages above `max_payload`
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload: Some(max_payload),
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<JobRequest> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn done(&self) -> Vec<JobDone> {
        self.done.lock().unwrap().clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(Error::bus("connection closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl JobPublisher for MemoryBus {
    async fn publish_job(&self, request: &JobRequest) -> Result<()> {
        self.check()?;
        bmp_zoom::nats::ensure_fits(request, self.max_payload)?;
        self.jobs.lock().unwrap().push(request.clone());
        Ok(())
    }

    fn max_payload(&self) -> Option<usize> {
        self.max_payload
    }
}

#[async_trait]
impl DonePublisher for MemoryBus {
    async fn publish_done(&self, done: &JobDone) -> Result<()> {
        self.check()?;
        self.done.lock().unwrap().push(done.clone());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub id: i64,
    pub bitmap: Vec<u8>,
    pub filename: String,
    pub zoom_in: bool,
    pub percent: i32,
}

/// Hands out ids 1, 2, 3, ...
pub struct MemoryImageStore {
    next_id: AtomicI64,
    pub images: Mutex<Vec<StoredImage>>,
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            images: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryImageStore {
    pub fn images(&self) -> Vec<StoredImage> {
        self.images.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(
        &self,
        bitmap: Vec<u8>,
        filename: &str,
        zoom_in: bool,
        percent: i32,
    ) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.images.lock().unwrap().push(StoredImage {
            id,
            bitmap,
            filename: filename.to_string(),
            zoom_in,
            percent,
        });
        Ok(id)
    }
}

/// Worker that is never reachable
pub struct UnreachableZoom;

#[async_trait]
impl ZoomService for UnreachableZoom {
    async fn zoom(&self, _bitmap: Vec<u8>, _percent: i32, _zoom_in: bool) -> Result<Vec<u8>> {
        Err(Error::remote_call("bottom.test:1099", "connection refused"))
    }
}

/// Worker with a bug: always answers with a bitmap one pixel wider
pub struct WideningZoom;

#[async_trait]
impl ZoomService for WideningZoom {
    async fn zoom(&self, bitmap: Vec<u8>, percent: i32, zoom_in: bool) -> Result<Vec<u8>> {
        let zoomed = LocalZoom.zoom(bitmap, percent, zoom_in).await?;
        let parsed = bmp_zoom::bmp::parse(&zoomed)?;
        let height = parsed.height();
        Ok(self::bitmap(parsed.width() as usize + 1, height, parsed.bits_per_pixel()))
    }
}

/// Gateway, orchestrator and their collaborators wired in memory
pub struct Pipeline {
    pub bus: Arc<MemoryBus>,
    pub store: Arc<MemoryImageStore>,
    pub gateway: JobGateway,
    pub orchestrator: Orchestrator,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_workers(Arc::new(LocalZoom), Arc::new(LocalZoom))
    }

    pub fn with_workers(top: Arc<dyn ZoomService>, bottom: Arc<dyn ZoomService>) -> Self {
        let bus = Arc::new(MemoryBus::default());
        let store = Arc::new(MemoryImageStore::default());
        let gateway = JobGateway::new(bus.clone(), STORE_URL);
        let orchestrator = Orchestrator::new(top, bottom, store.clone(), bus.clone());

        Self {
            bus,
            store,
            gateway,
            orchestrator,
        }
    }

    /// Deliver every queued request to the orchestrator, then every completion
    /// to the gateway, the way the two bus subscriptions would
    pub async fn drain(&self) {
        let requests: Vec<JobRequest> = self.bus.jobs.lock().unwrap().drain(..).collect();
        for request in requests {
            self.orchestrator.handle(request).await;
        }

        let completions: Vec<JobDone> = self.bus.done.lock().unwrap().drain(..).collect();
        for done in completions {
            self.gateway.complete_job(&done);
        }
    }
}
