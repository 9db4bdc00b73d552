//! Bitmap container decoding and text rendering
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! 0..14   file header: "BM", file size, reserved, pixel data offset
//! 14..54  info header: size, width (i32), height (i32), planes, bpp,
//!         compression, image size, resolution, colors
//! offset  pixel rows, each padded to a 4-byte boundary
//! ```
//!
//! A positive height means rows are stored bottom-up; a negative height means
//! top-down. Only uncompressed rasters are rendered.

use thiserror::Error;

use crate::constants::ROW_INDENT;
use crate::palette::Palette;

/// File header size in bytes
pub const FILE_HEADER_SIZE: usize = 14;

/// BITMAPINFOHEADER size in bytes
pub const INFO_HEADER_SIZE: usize = 40;

/// Smallest buffer that can hold both headers
pub const MIN_BITMAP_SIZE: usize = FILE_HEADER_SIZE + INFO_HEADER_SIZE;

/// "BM" read as a little-endian u16
pub const BMP_SIGNATURE: u16 = 0x4D42;

/// Uncompressed RGB / indexed raster
pub const BI_RGB: u32 = 0;

/// Uncompressed raster with channel masks (only accepted at 32 bpp)
pub const BI_BITFIELDS: u32 = 3;

/// Structural decode failures. Any of these aborts the whole render.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    #[error("BMP data too short: need 54 bytes, got {actual}")]
    TooShort { actual: usize },

    #[error("invalid BMP signature: 0x{actual:04x}")]
    BadSignature { actual: u16 },

    #[error("unsupported bits per pixel: {0}")]
    UnsupportedDepth(u16),

    #[error("unsupported compression {compression} at {bits_per_pixel} bits per pixel")]
    UnsupportedCompression { compression: u32, bits_per_pixel: u16 },

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("BMP data incomplete: need {required} bytes, got {actual}")]
    TruncatedData { required: u64, actual: usize },
}

/// Supported pixel depths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    One,
    Four,
    Eight,
    TwentyFour,
    ThirtyTwo,
}

impl BitDepth {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            1 => Some(BitDepth::One),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            24 => Some(BitDepth::TwentyFour),
            32 => Some(BitDepth::ThirtyTwo),
            _ => None,
        }
    }

    pub fn bits(&self) -> u16 {
        match self {
            BitDepth::One => 1,
            BitDepth::Four => 4,
            BitDepth::Eight => 8,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
        }
    }
}

/// Order in which pixel rows are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Negative height: first stored row is the top of the image
    TopDown,
    /// Positive height: first stored row is the bottom of the image
    BottomUp,
}

/// File header plus BITMAPINFOHEADER
///
/// Use `to_bytes()` and `from_bytes()` for serialization. Resolution and
/// color-count fields are not needed for rendering and are written as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapHeader {
    pub signature: u16,
    pub file_size: u32,
    pub data_offset: u32,
    pub info_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
}

impl BitmapHeader {
    /// Header for an uncompressed image whose pixel data directly follows it
    pub fn new(width: i32, height: i32, bits_per_pixel: u16, pixel_bytes: u32) -> Self {
        Self {
            signature: BMP_SIGNATURE,
            file_size: MIN_BITMAP_SIZE as u32 + pixel_bytes,
            data_offset: MIN_BITMAP_SIZE as u32,
            info_size: INFO_HEADER_SIZE as u32,
            width,
            height,
            planes: 1,
            bits_per_pixel,
            compression: BI_RGB,
            image_size: pixel_bytes,
        }
    }

    /// Serialize both headers to bytes
    pub fn to_bytes(&self) -> [u8; MIN_BITMAP_SIZE] {
        let mut buf = [0u8; MIN_BITMAP_SIZE];
        buf[0..2].copy_from_slice(&self.signature.to_le_bytes());
        buf[2..6].copy_from_slice(&self.file_size.to_le_bytes());
        buf[10..14].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[14..18].copy_from_slice(&self.info_size.to_le_bytes());
        buf[18..22].copy_from_slice(&self.width.to_le_bytes());
        buf[22..26].copy_from_slice(&self.height.to_le_bytes());
        buf[26..28].copy_from_slice(&self.planes.to_le_bytes());
        buf[28..30].copy_from_slice(&self.bits_per_pixel.to_le_bytes());
        buf[30..34].copy_from_slice(&self.compression.to_le_bytes());
        buf[34..38].copy_from_slice(&self.image_size.to_le_bytes());
        buf
    }

    /// Parse both headers, checking length and signature only
    pub fn from_bytes(data: &[u8]) -> Result<Self, BitmapError> {
        if data.len() < MIN_BITMAP_SIZE {
            return Err(BitmapError::TooShort { actual: data.len() });
        }

        let signature = le_u16(data, 0);
        if signature != BMP_SIGNATURE {
            return Err(BitmapError::BadSignature { actual: signature });
        }

        Ok(Self {
            signature,
            file_size: le_u32(data, 2),
            data_offset: le_u32(data, 10),
            info_size: le_u32(data, 14),
            width: le_u32(data, 18) as i32,
            height: le_u32(data, 22) as i32,
            planes: le_u16(data, 26),
            bits_per_pixel: le_u16(data, 28),
            compression: le_u32(data, 30),
            image_size: le_u32(data, 34),
        })
    }
}

fn le_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Perceptual luminance on a 0-255 scale
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

/// One pixel as seen by the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sample {
    Bit(u8),
    Luma(u8),
}

/// A validated view over a bitmap buffer
#[derive(Debug, Clone, Copy)]
pub struct DecodedImage<'a> {
    pub width: u32,
    /// Always positive; the sign of the stored height lives in `order`
    pub height: u32,
    pub depth: BitDepth,
    /// Bytes per stored row, including padding
    pub stride: usize,
    /// Byte offset of the first stored row
    pub offset: usize,
    pub order: RowOrder,
    data: &'a [u8],
}

impl<'a> DecodedImage<'a> {
    /// Validate the headers and the buffer length
    pub fn decode(data: &'a [u8]) -> Result<Self, BitmapError> {
        let header = BitmapHeader::from_bytes(data)?;

        let depth = BitDepth::from_bits(header.bits_per_pixel)
            .ok_or(BitmapError::UnsupportedDepth(header.bits_per_pixel))?;

        match (header.compression, depth) {
            (BI_RGB, _) | (BI_BITFIELDS, BitDepth::ThirtyTwo) => {}
            (compression, _) => {
                return Err(BitmapError::UnsupportedCompression {
                    compression,
                    bits_per_pixel: header.bits_per_pixel,
                })
            }
        }

        if header.width <= 0 || header.height == 0 {
            return Err(BitmapError::InvalidDimensions {
                width: header.width,
                height: header.height,
            });
        }

        let order = if header.height < 0 {
            RowOrder::TopDown
        } else {
            RowOrder::BottomUp
        };
        let width = header.width.unsigned_abs();
        let height = header.height.unsigned_abs();

        let stride = (u64::from(width) * u64::from(depth.bits()) + 31) / 32 * 4;
        let required = stride
            .checked_mul(u64::from(height))
            .and_then(|pixels| pixels.checked_add(u64::from(header.data_offset)));

        match required {
            Some(required) if required <= data.len() as u64 => {}
            required => {
                return Err(BitmapError::TruncatedData {
                    required: required.unwrap_or(u64::MAX),
                    actual: data.len(),
                })
            }
        }

        Ok(Self {
            width,
            height,
            depth,
            stride: stride as usize,
            offset: header.data_offset as usize,
            order,
            data,
        })
    }

    /// Render one line per visual row, top row first
    pub fn render(&self, palette: &Palette) -> String {
        let mut out = String::new();

        for visual_row in 0..self.height as usize {
            let row_start = self.offset + self.stored_row(visual_row) * self.stride;
            out.push_str(ROW_INDENT);

            for x in 0..self.width as usize {
                // Out-of-range pixels emit nothing
                match self.sample(row_start, x) {
                    Some(Sample::Bit(bit)) => out.push_str(palette.for_bit(bit)),
                    Some(Sample::Luma(luma)) => out.push_str(palette.for_luminance(luma)),
                    None => {}
                }
            }

            out.push('\n');
        }

        out
    }

    fn stored_row(&self, visual_row: usize) -> usize {
        match self.order {
            RowOrder::TopDown => visual_row,
            RowOrder::BottomUp => self.height as usize - 1 - visual_row,
        }
    }

    fn sample(&self, row_start: usize, x: usize) -> Option<Sample> {
        match self.depth {
            BitDepth::One => {
                let byte = *self.data.get(row_start + x / 8)?;
                Some(Sample::Bit((byte >> (7 - x % 8)) & 1))
            }
            BitDepth::Four => {
                let byte = *self.data.get(row_start + x / 2)?;
                let nibble = if x % 2 == 0 { byte >> 4 } else { byte & 0x0f };
                Some(Sample::Luma(nibble * 17))
            }
            BitDepth::Eight => self.data.get(row_start + x).map(|&luma| Sample::Luma(luma)),
            BitDepth::TwentyFour | BitDepth::ThirtyTwo => {
                let bytes_per_pixel = usize::from(self.depth.bits() / 8);
                let start = row_start + x * bytes_per_pixel;
                let px = self.data.get(start..start + bytes_per_pixel)?;
                Some(Sample::Luma(luminance(px[2], px[1], px[0])))
            }
        }
    }
}

/// Decode `data` and render it with `palette`
pub fn render(data: &[u8], palette: &Palette) -> Result<String, BitmapError> {
    Ok(DecodedImage::decode(data)?.render(palette))
}
