// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod codec;
pub mod zoom;

pub use codec::{Bitmap, build, has_signature, hex_prefix, merge_vertical, parse, split_half};
pub use zoom::{scale_factor, zoom_bytes, zoom_nearest};
