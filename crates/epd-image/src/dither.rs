//! Dithering algorithms for converting grayscale images to black-and-white.
//!
//! Provides fixed-point RGB to grayscale conversion, plain threshold
//! conversion, and the Floyd-Steinberg / Sierra family of error-diffusion
//! kernels. All arithmetic is integer so output is bit-identical across
//! platforms.

use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::params::DitheringMethod;

/// Threshold for plain conversion: values strictly above become white.
const THRESHOLD: u8 = 127;

/// Error-diffusion quantization point: values at or above become white.
const DIFFUSION_THRESHOLD: i32 = 127;

/// Fixed-point luma: `(77 R + 151 G + 30 B) >> 8`.
///
/// The weights sum to 258, so near-white input can reach 256; the result
/// saturates at 255 instead of wrapping to black.
pub fn rgb_to_gray(r: u8, g: u8, b: u8) -> u8 {
    let luma = (77 * u32::from(r) + 151 * u32::from(g) + 30 * u32::from(b)) >> 8;
    luma.min(255) as u8
}

/// Convert any decoded image to 8-bit grayscale.
///
/// Grayscale input is used as-is. Color input goes through [`rgb_to_gray`];
/// alpha is composited over white first so transparent areas stay paper-white.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = img {
        return gray.clone();
    }

    let rgba = img.to_rgba8();
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let over_white = |c: u8| -> u8 {
            let a = u32::from(a);
            ((u32::from(c) * a + 255 * (255 - a)) / 255) as u8
        };
        Luma([rgb_to_gray(over_white(r), over_white(g), over_white(b))])
    })
}

/// A causal error-diffusion kernel.
///
/// Each tap is `(dx, dy, weight)`; the diffused share is
/// `(err * weight) >> shift` using arithmetic shift.
struct Kernel {
    shift: u32,
    taps: &'static [(isize, usize, i32)],
}

/// Right 7, below-left 3, below 5, below-right 1 (/16).
const FLOYD_STEINBERG: Kernel = Kernel {
    shift: 4,
    taps: &[(1, 0, 7), (-1, 1, 3), (0, 1, 5), (1, 1, 1)],
};

/// Three-row Sierra (/32).
const SIERRA: Kernel = Kernel {
    shift: 5,
    taps: &[
        (1, 0, 5),
        (2, 0, 3),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 5),
        (1, 1, 4),
        (2, 1, 2),
        (-1, 2, 2),
        (0, 2, 3),
        (1, 2, 2),
    ],
};

/// Two-row Sierra (/16).
const SIERRA_2ROW: Kernel = Kernel {
    shift: 4,
    taps: &[
        (1, 0, 4),
        (2, 0, 3),
        (-2, 1, 1),
        (-1, 1, 2),
        (0, 1, 3),
        (1, 1, 2),
        (2, 1, 1),
    ],
};

/// Sierra Lite (/4).
const SIERRA_LITE: Kernel = Kernel {
    shift: 2,
    taps: &[(1, 0, 2), (-1, 1, 1), (0, 1, 1)],
};

/// Convert a grayscale image to 0/255 with the requested method.
pub fn dither(img: &GrayImage, method: DitheringMethod) -> GrayImage {
    match method {
        DitheringMethod::Threshold => threshold_convert(img, THRESHOLD),
        DitheringMethod::FloydSteinberg => diffuse(img, &FLOYD_STEINBERG, method),
        DitheringMethod::Sierra => diffuse(img, &SIERRA, method),
        DitheringMethod::Sierra2Row => diffuse(img, &SIERRA_2ROW, method),
        DitheringMethod::SierraLite => diffuse(img, &SIERRA_LITE, method),
    }
}

/// Simple threshold conversion without dithering.
///
/// Pixels with values > `threshold` become white (255), others become black (0).
pub fn threshold_convert(img: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, threshold, "Applying threshold conversion");

    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
    }
    output
}

/// Row-major, strictly causal error diffusion.
fn diffuse(img: &GrayImage, kernel: &Kernel, method: DitheringMethod) -> GrayImage {
    let (width, height) = img.dimensions();
    debug!(width, height, %method, "Applying error-diffusion dithering");

    let (w, h) = (width as usize, height as usize);
    // Signed working buffer so diffused error can push values out of 0..=255.
    let mut buffer: Vec<i32> = img.as_raw().iter().map(|&v| i32::from(v)).collect();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let old_pixel = buffer[idx];
            let new_pixel = if old_pixel >= DIFFUSION_THRESHOLD { 255 } else { 0 };
            let error = old_pixel - new_pixel;
            buffer[idx] = new_pixel;

            for &(dx, dy, weight) in kernel.taps {
                let ny = y + dy;
                let Some(nx) = x.checked_add_signed(dx) else {
                    continue;
                };
                if nx >= w || ny >= h {
                    continue;
                }
                buffer[ny * w + nx] += (error * weight) >> kernel.shift;
            }
        }
    }

    let mut output = GrayImage::new(width, height);
    for (dst, &value) in output.iter_mut().zip(&buffer) {
        *dst = value.clamp(0, 255) as u8;
    }

    debug!(%method, "Dithering complete");
    output
}
