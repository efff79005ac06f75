// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod bmp;
pub mod config;
pub mod error;
pub mod gateway;
pub mod image_store;
pub mod nats;
pub mod orchestrator;
pub mod web;
pub mod zoom;

pub use error::{Error, Result};
