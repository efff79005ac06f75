// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::bmp::codec::{self, Bitmap, file_row_index, row_stride};
use crate::error::{Error, Result};

/// Scale factors never drop below this, whatever the shrink percentage
pub const MIN_SCALE_FACTOR: f64 = 0.05;

/// `1 + percent/100` when enlarging, `1 - percent/100` when shrinking
pub fn scale_factor(percent: i32, zoom_in: bool) -> f64 {
    let delta = f64::from(percent) / 100.0;
    let factor = if zoom_in { 1.0 + delta } else { 1.0 - delta };
    factor.max(MIN_SCALE_FACTOR)
}

fn scaled_dimension(len: usize, factor: f64) -> usize {
    ((len as f64 * factor).round() as usize).max(1)
}

fn source_index(dst: usize, factor: f64, src_len: usize) -> usize {
    ((dst as f64 / factor).floor() as usize).min(src_len - 1)
}

/// Nearest-neighbour resize of a parsed bitmap.
///
/// Pixels are copied byte for byte, orientation follows the source and row
/// padding stays zero. A bitmap with no rows resizes to one with no rows.
pub fn zoom_nearest(src: &Bitmap, percent: i32, zoom_in: bool) -> Result<Vec<u8>> {
    if percent <= 0 {
        return Err(Error::InvalidParameter(format!(
            "percent must be > 0, got {}",
            percent
        )));
    }

    let factor = scale_factor(percent, zoom_in);
    let bpp = src.bytes_per_pixel();
    let src_width = src.width() as usize;
    let src_height = src.abs_height();
    let top_down = src.is_top_down();

    let dst_width = scaled_dimension(src_width, factor);
    let dst_height = if src_height == 0 {
        0
    } else {
        scaled_dimension(src_height, factor)
    };
    let dst_stride = row_stride(dst_width, bpp);
    let width = i32::try_from(dst_width)
        .map_err(|_| Error::InvalidParameter(format!("zoomed width {} is too large", dst_width)))?;
    let dst_len = dst_stride
        .checked_mul(dst_height)
        .filter(|len| len.saturating_add(src.data_offset()) <= u32::MAX as usize)
        .ok_or_else(|| {
            Error::InvalidParameter(format!(
                "zoomed image {}x{} is too large",
                dst_width, dst_height
            ))
        })?;

    let mut pixels = vec![0u8; dst_len];
    for y in 0..dst_height {
        let src_row = src.visual_row(source_index(y, factor, src_height));
        let file_row = file_row_index(y, dst_height, top_down);
        let dst_row = &mut pixels[file_row * dst_stride..file_row * dst_stride + dst_width * bpp];

        for (x, dst_pixel) in dst_row.chunks_exact_mut(bpp).enumerate() {
            let sx = source_index(x, factor, src_width);
            dst_pixel.copy_from_slice(&src_row[sx * bpp..(sx + 1) * bpp]);
        }
    }

    codec::build(src.header(), width, dst_height, top_down, &pixels, dst_stride)
}

/// Parse and resize in one step, the shape of a zoom worker request
pub fn zoom_bytes(bitmap: &[u8], percent: i32, zoom_in: bool) -> Result<Vec<u8>> {
    if percent <= 0 {
        return Err(Error::InvalidParameter(format!(
            "percent must be > 0, got {}",
            percent
        )));
    }
    let src = codec::parse(bitmap)?;
    zoom_nearest(&src, percent, zoom_in)
}
