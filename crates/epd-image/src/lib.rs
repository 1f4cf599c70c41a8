//! Image processing for monochrome e-paper panels.
//!
//! Converts decoded raster images into the 1-bit, MSB-first, row-packed
//! buffers an EPD controller consumes: scaling to the panel size,
//! grayscale conversion, error-diffusion dithering, bit packing, and
//! geometric transforms applied directly to packed data.

pub mod bitpack;
pub mod decode;
pub mod dither;
pub mod params;
pub mod scale;
pub mod transform;

use std::path::PathBuf;

// Re-exports for convenience
pub use bitpack::{DEFAULT_THRESHOLD, PackedBitmap, pack, packed_len, unpack};
pub use decode::{is_format_supported, load_image, supported_extensions};
pub use dither::{dither, rgb_to_gray, threshold_convert, to_grayscale};
pub use params::{ArtifactFormat, ConversionParams, DitheringMethod, Rotation, ScalingMethod};
pub use scale::scale_image;
pub use transform::{Transform, TransformSet};

/// Errors produced by the conversion stages.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Source image not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Unsupported image format for {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Packed buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Unknown dithering method: {0}")]
    UnknownDitheringMethod(String),

    #[error("Unknown transform operation: {0}")]
    UnknownTransformOperation(String),

    #[error("Unknown scaling method: {0}")]
    UnknownScalingMethod(String),

    #[error("Unknown rotation: {0}")]
    UnknownRotation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;
