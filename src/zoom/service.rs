// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;

use crate::bmp;
use crate::error::{Error, Result};

/// Resize one complete bitmap. Implemented in-process and over the network.
#[async_trait]
pub trait ZoomService: Send + Sync {
    async fn zoom(&self, bitmap: Vec<u8>, percent: i32, zoom_in: bool) -> Result<Vec<u8>>;
}

/// Runs the resize on the blocking pool of the current runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalZoom;

#[async_trait]
impl ZoomService for LocalZoom {
    async fn zoom(&self, bitmap: Vec<u8>, percent: i32, zoom_in: bool) -> Result<Vec<u8>> {
        tokio::task::spawn_blocking(move || bmp::zoom_bytes(&bitmap, percent, zoom_in))
            .await
            .map_err(|e| Error::Internal(format!("zoom task failed: {}", e)))?
    }
}
