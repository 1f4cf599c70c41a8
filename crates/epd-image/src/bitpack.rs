//! 1-bit packing for e-paper frame buffers.
//!
//! Pixels are packed MSB-first in row-major scan order with no per-row
//! padding: pixel `(x, y)` lives at linear index `y * width + x`, byte
//! `index / 8`, bit `7 - index % 8`. Only the final byte of the whole buffer
//! may carry unused (zero) low-order bits.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::{ImageError, Result};

/// Default binarization threshold: values strictly above it become white.
pub const DEFAULT_THRESHOLD: u8 = 127;

/// Number of bytes needed to hold `width * height` packed pixels.
pub fn packed_len(width: u32, height: u32) -> usize {
    (width as usize * height as usize).div_ceil(8)
}

/// A packed 1-bpp bitmap whose length always equals `packed_len(width, height)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PackedBitmap {
    /// Wrap an existing buffer, failing unless its length is exact.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = packed_len(width, height);
        if data.len() != expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Copy the leading `packed_len(width, height)` bytes of `data`.
    ///
    /// Accepts buffers that are longer than needed (trailing bytes are not
    /// part of the frame) but rejects shorter ones.
    pub fn from_prefix(data: &[u8], width: u32, height: u32) -> Result<Self> {
        let expected = packed_len(width, height);
        if data.len() < expected {
            return Err(ImageError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data: data[..expected].to_vec(),
        })
    }

    /// An all-zero (all-black) bitmap.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; packed_len(width, height)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the bit at linear pixel index `idx`.
    ///
    /// # Panics
    /// Panics if `idx` lies beyond the buffer.
    pub fn bit(&self, idx: usize) -> bool {
        (self.data[idx / 8] >> (7 - idx % 8)) & 1 == 1
    }

    /// Write the bit at linear pixel index `idx`.
    ///
    /// # Panics
    /// Panics if `idx` lies beyond the buffer.
    pub fn set_bit(&mut self, idx: usize, value: bool) {
        let mask = 0x80u8 >> (idx % 8);
        if value {
            self.data[idx / 8] |= mask;
        } else {
            self.data[idx / 8] &= !mask;
        }
    }

    /// Read pixel `(x, y)`; `true` is white.
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        self.bit(y as usize * self.width as usize + x as usize)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, value: bool) {
        self.set_bit(y as usize * self.width as usize + x as usize, value);
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Pack a grayscale image: a pixel becomes 1 when `value > threshold`.
pub fn pack(img: &GrayImage, threshold: u8) -> PackedBitmap {
    let (width, height) = img.dimensions();
    debug!(width, height, threshold, "Packing image to 1bpp");

    let mut data = vec![0u8; packed_len(width, height)];
    for (byte, chunk) in data.iter_mut().zip(img.as_raw().chunks(8)) {
        for (i, &value) in chunk.iter().enumerate() {
            if value > threshold {
                *byte |= 0x80 >> i;
            }
        }
    }

    PackedBitmap {
        width,
        height,
        data,
    }
}

/// Expand a packed bitmap into a 0/255 grayscale image.
pub fn unpack(bitmap: &PackedBitmap) -> GrayImage {
    GrayImage::from_fn(bitmap.width, bitmap.height, |x, y| {
        Luma([if bitmap.pixel(x, y) { 255 } else { 0 }])
    })
}

/// Validate and expand a raw packed buffer.
pub fn unpack_bytes(data: &[u8], width: u32, height: u32) -> Result<GrayImage> {
    let bitmap = PackedBitmap::new(data.to_vec(), width, height)?;
    Ok(unpack(&bitmap))
}
