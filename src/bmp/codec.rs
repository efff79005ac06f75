// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Parsing, rebuilding, splitting and merging of uncompressed 24/32-bit bitmaps.
//!
//! Rows are addressed two ways. A *file* row is the position of the row in the
//! pixel array; a *visual* row counts from the top of the picture. Bottom-up
//! bitmaps (positive height) store the visual bottom row first.

use crate::error::{Error, Result};

/// Two-byte magic at the start of every bitmap file
pub const SIGNATURE: &[u8; 2] = b"BM";

pub const FILE_HEADER_LEN: usize = 14;
pub const MIN_INFO_HEADER_LEN: usize = 40;
/// File header plus the smallest supported info header
pub const MIN_HEADER_LEN: usize = FILE_HEADER_LEN + MIN_INFO_HEADER_LEN;

const FILE_SIZE_OFFSET: usize = 2;
const DATA_OFFSET_OFFSET: usize = 10;
const INFO_SIZE_OFFSET: usize = 14;
const WIDTH_OFFSET: usize = 18;
const HEIGHT_OFFSET: usize = 22;
const PLANES_OFFSET: usize = 26;
const BITS_PER_PIXEL_OFFSET: usize = 28;
const COMPRESSION_OFFSET: usize = 30;
const IMAGE_SIZE_OFFSET: usize = 34;

/// A parsed bitmap. Header and pixel buffers are owned copies of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    header: Vec<u8>,
    width: i32,
    height: i32,
    abs_height: usize,
    bits_per_pixel: u16,
    row_stride: usize,
    pixels: Vec<u8>,
}

impl Bitmap {
    /// Everything before the pixel array, palette and masks included
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn data_offset(&self) -> usize {
        self.header.len()
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    /// Signed height as stored in the file
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn abs_height(&self) -> usize {
        self.abs_height
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel / 8)
    }

    /// Bytes per row including the padding to a 4-byte boundary
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_top_down(&self) -> bool {
        self.height < 0
    }

    /// Full row (padding included) at the given visual position
    pub(crate) fn visual_row(&self, visual_row: usize) -> &[u8] {
        let file_row = file_row_index(visual_row, self.abs_height, self.is_top_down());
        &self.pixels[file_row * self.row_stride..(file_row + 1) * self.row_stride]
    }

    /// Serialize back into a complete bitmap file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        build(
            &self.header,
            self.width,
            self.abs_height,
            self.is_top_down(),
            &self.pixels,
            self.row_stride,
        )
    }
}

/// True when the buffer starts with the `BM` magic
pub fn has_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(SIGNATURE)
}

/// First `n` bytes as space-separated hex, for logs and error messages
pub fn hex_prefix(bytes: &[u8], n: usize) -> String {
    bytes
        .iter()
        .take(n)
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Row size in bytes, rounded up to a multiple of four
pub fn row_stride(width: usize, bytes_per_pixel: usize) -> usize {
    (width * bytes_per_pixel).div_ceil(4) * 4
}

/// Map a visual row (0 = top of the picture) to its position in the pixel array
pub(crate) fn file_row_index(visual_row: usize, abs_height: usize, top_down: bool) -> usize {
    if top_down {
        visual_row
    } else {
        abs_height - 1 - visual_row
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    i32::from_le_bytes(buf)
}

fn write_u32(bytes: &mut [u8], offset: usize, value: u32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Parse a bitmap file into header and pixel buffer
pub fn parse(bytes: &[u8]) -> Result<Bitmap> {
    if bytes.len() < MIN_HEADER_LEN {
        return Err(Error::format(format!(
            "buffer of {} bytes is shorter than the {}-byte minimum header",
            bytes.len(),
            MIN_HEADER_LEN
        )));
    }
    if !has_signature(bytes) {
        return Err(Error::format("missing BM signature"));
    }

    let data_offset = read_u32(bytes, DATA_OFFSET_OFFSET) as usize;
    let info_size = read_u32(bytes, INFO_SIZE_OFFSET) as usize;
    if info_size < MIN_INFO_HEADER_LEN {
        return Err(Error::format(format!(
            "unsupported info header size {}",
            info_size
        )));
    }
    if data_offset < FILE_HEADER_LEN + info_size {
        return Err(Error::format(format!(
            "pixel data offset {} overlaps the {}-byte header",
            data_offset,
            FILE_HEADER_LEN + info_size
        )));
    }

    let width = read_i32(bytes, WIDTH_OFFSET);
    let height = read_i32(bytes, HEIGHT_OFFSET);
    let planes = read_u16(bytes, PLANES_OFFSET);
    let bits_per_pixel = read_u16(bytes, BITS_PER_PIXEL_OFFSET);
    let compression = read_u32(bytes, COMPRESSION_OFFSET);

    if planes != 1 {
        return Err(Error::format(format!("invalid plane count {}", planes)));
    }
    if bits_per_pixel != 24 && bits_per_pixel != 32 {
        return Err(Error::format(format!(
            "unsupported bits per pixel {}",
            bits_per_pixel
        )));
    }
    if compression != 0 {
        return Err(Error::format(format!(
            "unsupported compression {}",
            compression
        )));
    }
    if width <= 0 {
        return Err(Error::format(format!("invalid width {}", width)));
    }

    let abs_height = height.unsigned_abs() as usize;
    let bytes_per_pixel = usize::from(bits_per_pixel / 8);
    let stride = (width as usize)
        .checked_mul(bytes_per_pixel)
        .map(|row| row.div_ceil(4) * 4)
        .ok_or_else(|| Error::format("row size overflows"))?;
    let pixel_len = stride
        .checked_mul(abs_height)
        .ok_or_else(|| Error::format("pixel array size overflows"))?;
    let end = data_offset
        .checked_add(pixel_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| {
            Error::format(format!(
                "pixel data ({} bytes at offset {}) extends past the {}-byte buffer",
                pixel_len,
                data_offset,
                bytes.len()
            ))
        })?;

    Ok(Bitmap {
        header: bytes[..data_offset].to_vec(),
        width,
        height,
        abs_height,
        bits_per_pixel,
        row_stride: stride,
        pixels: bytes[data_offset..end].to_vec(),
    })
}

/// Assemble a bitmap file from a template header and a new pixel array.
///
/// Only the file size, width, height and image size fields are rewritten;
/// every other header byte is copied from `base_header` unchanged.
pub fn build(
    base_header: &[u8],
    width: i32,
    abs_height: usize,
    top_down: bool,
    pixels: &[u8],
    row_stride: usize,
) -> Result<Vec<u8>> {
    if base_header.len() < MIN_HEADER_LEN {
        return Err(Error::format(format!(
            "template header of {} bytes is too short",
            base_header.len()
        )));
    }
    if row_stride.checked_mul(abs_height) != Some(pixels.len()) {
        return Err(Error::format(format!(
            "pixel buffer of {} bytes does not hold {} rows of {} bytes",
            pixels.len(),
            abs_height,
            row_stride
        )));
    }

    let height = i32::try_from(abs_height)
        .map_err(|_| Error::format(format!("height {} does not fit the header", abs_height)))?;
    let image_size = u32::try_from(pixels.len())
        .map_err(|_| Error::format("pixel array larger than 4 GiB"))?;
    let file_size = u32::try_from(base_header.len() + pixels.len())
        .map_err(|_| Error::format("bitmap file larger than 4 GiB"))?;

    let mut out = Vec::with_capacity(base_header.len() + pixels.len());
    out.extend_from_slice(base_header);
    write_u32(&mut out, FILE_SIZE_OFFSET, file_size);
    write_i32(&mut out, WIDTH_OFFSET, width);
    write_i32(&mut out, HEIGHT_OFFSET, if top_down { -height } else { height });
    write_u32(&mut out, IMAGE_SIZE_OFFSET, image_size);
    out.extend_from_slice(pixels);

    Ok(out)
}

/// Cut a bitmap into a top and a bottom half, each a complete bitmap file.
///
/// The top half gets `abs_height / 2` rows, the bottom half the rest. Both keep
/// the orientation of the source.
pub fn split_half(bitmap: &Bitmap) -> Result<(Vec<u8>, Vec<u8>)> {
    let stride = bitmap.row_stride;
    let top_down = bitmap.is_top_down();
    let top_height = bitmap.abs_height / 2;
    let bottom_height = bitmap.abs_height - top_height;

    let mut top = vec![0u8; stride * top_height];
    let mut bottom = vec![0u8; stride * bottom_height];

    for visual_row in 0..bitmap.abs_height {
        let (dst, half_row, half_height) = if visual_row < top_height {
            (&mut top, visual_row, top_height)
        } else {
            (&mut bottom, visual_row - top_height, bottom_height)
        };
        let file_row = file_row_index(half_row, half_height, top_down);
        dst[file_row * stride..(file_row + 1) * stride]
            .copy_from_slice(bitmap.visual_row(visual_row));
    }

    let top = build(&bitmap.header, bitmap.width, top_height, top_down, &top, stride)?;
    let bottom = build(
        &bitmap.header,
        bitmap.width,
        bottom_height,
        top_down,
        &bottom,
        stride,
    )?;

    Ok((top, bottom))
}

/// Stack `top` above `bottom` into one bitmap.
///
/// A zero-row half carries no orientation (its height field is 0), so the
/// orientation check only applies when both halves have rows.
pub fn merge_vertical(top: &[u8], bottom: &[u8]) -> Result<Vec<u8>> {
    let top = parse(top)?;
    let bottom = parse(bottom)?;

    if top.width != bottom.width {
        return Err(Error::GeometryMismatch(format!(
            "different widths ({} vs {})",
            top.width, bottom.width
        )));
    }
    if top.bits_per_pixel != bottom.bits_per_pixel {
        return Err(Error::GeometryMismatch(format!(
            "different bits per pixel ({} vs {})",
            top.bits_per_pixel, bottom.bits_per_pixel
        )));
    }
    if top.row_stride != bottom.row_stride {
        return Err(Error::GeometryMismatch(format!(
            "different row strides ({} vs {})",
            top.row_stride, bottom.row_stride
        )));
    }
    if top.abs_height > 0
        && bottom.abs_height > 0
        && top.is_top_down() != bottom.is_top_down()
    {
        return Err(Error::GeometryMismatch("different orientation".to_string()));
    }

    let stride = top.row_stride;
    let merged_height = top.abs_height + bottom.abs_height;
    let top_down = if top.abs_height > 0 {
        top.is_top_down()
    } else {
        bottom.is_top_down()
    };

    let mut pixels = vec![0u8; stride * merged_height];
    for visual_row in 0..merged_height {
        let src = if visual_row < top.abs_height {
            top.visual_row(visual_row)
        } else {
            bottom.visual_row(visual_row - top.abs_height)
        };
        let file_row = file_row_index(visual_row, merged_height, top_down);
        pixels[file_row * stride..(file_row + 1) * stride].copy_from_slice(src);
    }

    build(&top.header, top.width, merged_height, top_down, &pixels, stride)
}
