//! Fitting decoded images to the panel resolution.
//!
//! All three policies resample with Lanczos3, which is deterministic for a
//! given `image` release, so identical requests always produce identical
//! pixels.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::params::ScalingMethod;
use crate::{ImageError, Result};

const FILTER: FilterType = FilterType::Lanczos3;

/// Paper white, used for letterbox borders.
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Resize `img` to exactly `target_width`x`target_height`.
///
/// `crop_x` / `crop_y` only apply to [`ScalingMethod::CropCenter`]; an
/// explicit origin is clamped into the valid range, `None` centers.
pub fn scale_image(
    img: &DynamicImage,
    target_width: u32,
    target_height: u32,
    method: ScalingMethod,
    crop_x: Option<u32>,
    crop_y: Option<u32>,
) -> Result<DynamicImage> {
    let (orig_w, orig_h) = (img.width(), img.height());
    if orig_w == 0 || orig_h == 0 {
        return Err(ImageError::InvalidDimensions {
            width: orig_w,
            height: orig_h,
        });
    }
    if target_width == 0 || target_height == 0 {
        return Err(ImageError::InvalidDimensions {
            width: target_width,
            height: target_height,
        });
    }

    debug!(
        orig_w,
        orig_h,
        target_width,
        target_height,
        %method,
        "Scaling image"
    );

    let scaled = match method {
        ScalingMethod::Stretch => resize(img, target_width, target_height),
        ScalingMethod::Letterbox => letterbox(img, target_width, target_height),
        ScalingMethod::CropCenter => crop_center(img, target_width, target_height, crop_x, crop_y),
    };
    Ok(scaled)
}

/// Exact resize that skips the resampler when nothing changes.
fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.width() == width && img.height() == height {
        debug!(width, height, "Image already at target size, skipping resize");
        return img.clone();
    }
    img.resize_exact(width, height, FILTER)
}

/// Scaled size for a uniform factor, truncated and kept within `1..=limit`.
fn scaled_dim(orig: u32, scale: f64, limit: u32) -> u32 {
    ((f64::from(orig) * scale) as u32).clamp(1, limit)
}

fn letterbox(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (orig_w, orig_h) = (img.width(), img.height());
    let scale = (f64::from(target_width) / f64::from(orig_w))
        .min(f64::from(target_height) / f64::from(orig_h));

    let new_width = scaled_dim(orig_w, scale, target_width);
    let new_height = scaled_dim(orig_h, scale, target_height);
    let scaled = resize(img, new_width, new_height).to_rgba8();

    let paste_x = (target_width - new_width) / 2;
    let paste_y = (target_height - new_height) / 2;
    debug!(new_width, new_height, paste_x, paste_y, "Letterboxing");

    let mut canvas = RgbaImage::from_pixel(target_width, target_height, BACKGROUND);
    imageops::overlay(&mut canvas, &scaled, i64::from(paste_x), i64::from(paste_y));
    DynamicImage::ImageRgba8(canvas)
}

fn crop_center(
    img: &DynamicImage,
    target_width: u32,
    target_height: u32,
    crop_x: Option<u32>,
    crop_y: Option<u32>,
) -> DynamicImage {
    let (orig_w, orig_h) = (img.width(), img.height());
    let scale = (f64::from(target_width) / f64::from(orig_w))
        .max(f64::from(target_height) / f64::from(orig_h));

    // Never smaller than the target, even if the float product rounds down.
    let new_width = scaled_dim(orig_w, scale, u32::MAX).max(target_width);
    let new_height = scaled_dim(orig_h, scale, u32::MAX).max(target_height);
    let scaled = resize(img, new_width, new_height);

    let max_left = new_width - target_width;
    let max_top = new_height - target_height;
    let left = crop_x.map_or(max_left / 2, |x| x.min(max_left));
    let top = crop_y.map_or(max_top / 2, |y| y.min(max_top));
    debug!(new_width, new_height, left, top, "Cropping");

    scaled.crop_imm(left, top, target_width, target_height)
}
