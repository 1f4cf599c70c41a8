//! Source image decoding.

use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::debug;

use crate::{ImageError, Result};

/// File extensions the bundled decoders handle (lowercase, no dot).
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp", "ico", "pbm", "pgm", "ppm", "pam",
    "tga", "dds",
];

pub fn supported_extensions() -> &'static [&'static str] {
    SUPPORTED_EXTENSIONS
}

/// Whether `path` has an extension one of the decoders recognises.
/// Only the name is inspected; the file need not exist.
pub fn is_format_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Decode the image at `path`.
///
/// The format is sniffed from the content, so a mislabelled extension still
/// decodes. Missing files map to [`ImageError::SourceNotFound`]; anything the
/// decoder rejects maps to [`ImageError::UnsupportedFormat`].
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(ImageError::SourceNotFound(path.to_path_buf()));
    }

    let unsupported = |reason: String| ImageError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| unsupported(e.to_string()))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(ImageError::InvalidDimensions {
            width: img.width(),
            height: img.height(),
        });
    }

    debug!(
        path = %path.display(),
        width = img.width(),
        height = img.height(),
        color = ?img.color(),
        "Decoded source image"
    );
    Ok(img)
}
