// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod client;
pub mod server;
pub mod service;

pub use client::HttpZoomClient;
pub use server::{create_zoom_app, start_zoom_worker};
pub use service::{LocalZoom, ZoomService};
