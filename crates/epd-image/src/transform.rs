//! Geometric transforms on packed 1bpp bitmaps.
//!
//! Operates on packed data directly instead of round-tripping through an
//! unpacked image. Rotations by 90 degrees swap the output dimensions.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::bitpack::PackedBitmap;
use crate::params::Rotation;
use crate::{ImageError, Result};

/// A single packed-buffer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    RotateCw,
    RotateCcw,
    Rotate180,
    FlipHorizontal,
    FlipVertical,
    Invert,
}

impl FromStr for Transform {
    type Err = ImageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "rotate-cw" | "cw" | "rotate90" => Ok(Self::RotateCw),
            "rotate-ccw" | "ccw" | "rotate270" => Ok(Self::RotateCcw),
            "rotate-180" | "rotate180" => Ok(Self::Rotate180),
            "flip-horizontal" | "flip-h" | "fliph" => Ok(Self::FlipHorizontal),
            "flip-vertical" | "flip-v" | "flipv" => Ok(Self::FlipVertical),
            "invert" => Ok(Self::Invert),
            _ => Err(ImageError::UnknownTransformOperation(s.to_string())),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RotateCw => "rotate-cw",
            Self::RotateCcw => "rotate-ccw",
            Self::Rotate180 => "rotate-180",
            Self::FlipHorizontal => "flip-horizontal",
            Self::FlipVertical => "flip-vertical",
            Self::Invert => "invert",
        })
    }
}

impl Rotation {
    /// The packed-buffer operation for this rotation, if any.
    pub fn as_transform(&self) -> Option<Transform> {
        match self {
            Rotation::None => None,
            Rotation::Rotate90 => Some(Transform::RotateCw),
            Rotation::Rotate180 => Some(Transform::Rotate180),
            Rotation::Rotate270 => Some(Transform::RotateCcw),
        }
    }
}

/// A combination of transforms, always applied as
/// horizontal flip, vertical flip, rotation, then invert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformSet {
    pub h_flip: bool,
    pub v_flip: bool,
    pub rotation: Rotation,
    pub invert: bool,
}

impl TransformSet {
    /// The operations in application order.
    pub fn operations(&self) -> Vec<Transform> {
        let mut ops = Vec::with_capacity(4);
        if self.h_flip {
            ops.push(Transform::FlipHorizontal);
        }
        if self.v_flip {
            ops.push(Transform::FlipVertical);
        }
        if let Some(rotate) = self.rotation.as_transform() {
            ops.push(rotate);
        }
        if self.invert {
            ops.push(Transform::Invert);
        }
        ops
    }

    pub fn is_identity(&self) -> bool {
        self.operations().is_empty()
    }

    pub fn apply(&self, bitmap: &PackedBitmap) -> PackedBitmap {
        self.operations()
            .into_iter()
            .fold(bitmap.clone(), |acc, op| apply(&acc, op))
    }
}

/// Apply one operation, returning a new bitmap.
pub fn apply(bitmap: &PackedBitmap, op: Transform) -> PackedBitmap {
    let (w, h) = bitmap.dimensions();
    debug!(width = w, height = h, %op, "Transforming packed bitmap");

    match op {
        Transform::RotateCw => remap(bitmap, h, w, |sx, sy| (h - 1 - sy, sx)),
        Transform::RotateCcw => remap(bitmap, h, w, |sx, sy| (sy, w - 1 - sx)),
        Transform::Rotate180 => remap(bitmap, w, h, |sx, sy| (w - 1 - sx, h - 1 - sy)),
        Transform::FlipHorizontal => remap(bitmap, w, h, |sx, sy| (w - 1 - sx, sy)),
        Transform::FlipVertical => remap(bitmap, w, h, |sx, sy| (sx, h - 1 - sy)),
        Transform::Invert => invert(bitmap),
    }
}

/// Apply one operation to a raw buffer of a `width`x`height` frame.
///
/// Fails with [`ImageError::SizeMismatch`] when `data` is shorter than the
/// frame; any trailing bytes beyond the frame are ignored.
pub fn apply_bytes(data: &[u8], width: u32, height: u32, op: Transform) -> Result<PackedBitmap> {
    let bitmap = PackedBitmap::from_prefix(data, width, height)?;
    Ok(apply(&bitmap, op))
}

/// Bitwise complement of every byte.
///
/// Padding bits past the last pixel stay zero, so the result matches what
/// [`pack`](crate::pack) would produce for the inverted image.
pub fn invert(bitmap: &PackedBitmap) -> PackedBitmap {
    let mut out = bitmap.clone();
    let pixels = bitmap.width() as usize * bitmap.height() as usize;
    let data = out.data_mut();
    for byte in data.iter_mut() {
        *byte = !*byte;
    }
    let tail = pixels % 8;
    if tail != 0 {
        if let Some(last) = data.last_mut() {
            *last &= 0xFFu8 << (8 - tail);
        }
    }
    out
}

fn remap<F>(src: &PackedBitmap, dst_width: u32, dst_height: u32, map: F) -> PackedBitmap
where
    F: Fn(u32, u32) -> (u32, u32),
{
    let mut dst = PackedBitmap::blank(dst_width, dst_height);
    for sy in 0..src.height() {
        for sx in 0..src.width() {
            if src.pixel(sx, sy) {
                let (dx, dy) = map(sx, sy);
                dst.set_pixel(dx, dy, true);
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a bitmap from rows of '1' (white) / '0' (black).
    fn bitmap(rows: &[&str]) -> PackedBitmap {
        let width = rows[0].len() as u32;
        let height = rows.len() as u32;
        let mut out = PackedBitmap::blank(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                out.set_pixel(x as u32, y as u32, c == '1');
            }
        }
        out
    }

    /// Top-left pixel set on a 3x2 frame.
    fn corner() -> PackedBitmap {
        bitmap(&["100", "000"])
    }

    #[test]
    fn test_rotate_cw_mapping() {
        let out = apply(&corner(), Transform::RotateCw);
        assert_eq!(out, bitmap(&["01", "00", "00"]));
        assert_eq!(out.dimensions(), (2, 3));
    }

    #[test]
    fn test_rotate_ccw_mapping() {
        let out = apply(&corner(), Transform::RotateCcw);
        assert_eq!(out, bitmap(&["00", "00", "10"]));
        assert_eq!(out.dimensions(), (2, 3));
    }

    #[test]
    fn test_rotate_180_and_flips_mapping() {
        assert_eq!(apply(&corner(), Transform::Rotate180), bitmap(&["000", "001"]));
        assert_eq!(apply(&corner(), Transform::FlipHorizontal), bitmap(&["001", "000"]));
        assert_eq!(apply(&corner(), Transform::FlipVertical), bitmap(&["000", "100"]));
    }

    #[test]
    fn test_four_clockwise_rotations_restore_original() {
        let original = bitmap(&["11010", "00111", "10001"]);
        let mut current = original.clone();
        for _ in 0..4 {
            current = apply(&current, Transform::RotateCw);
        }
        assert_eq!(current, original);

        let mut current = original.clone();
        for _ in 0..4 {
            current = apply(&current, Transform::RotateCcw);
        }
        assert_eq!(current, original);
    }

    #[test]
    fn test_double_flips_and_inverts_cancel() {
        let original = bitmap(&["1101001", "0011100", "1000101"]);
        for op in [Transform::FlipHorizontal, Transform::FlipVertical, Transform::Rotate180] {
            assert_eq!(apply(&apply(&original, op), op), original, "{op}");
        }

        let raw = PackedBitmap::new(vec![0x12, 0xF7, 0x0F], 3, 8).unwrap();
        assert_eq!(invert(&invert(&raw)), raw);
    }

    #[test]
    fn test_invert_complements_every_byte() {
        let raw = PackedBitmap::new(vec![0x00, 0xFF, 0xA5], 4, 6).unwrap();
        assert_eq!(apply(&raw, Transform::Invert).as_bytes(), &[0xFF, 0x00, 0x5A]);
    }

    #[test]
    fn test_invert_keeps_padding_bits_clear() {
        // 3x3 = 9 pixels: the second byte holds one pixel and seven padding bits.
        let raw = PackedBitmap::new(vec![0x00, 0x00], 3, 3).unwrap();
        let inverted = invert(&raw);
        assert_eq!(inverted.as_bytes(), &[0xFF, 0x80]);
        assert_eq!(invert(&inverted), raw);

        let repacked = crate::pack(&crate::unpack(&inverted), crate::DEFAULT_THRESHOLD);
        assert_eq!(repacked, inverted);
    }

    #[test]
    fn test_transform_set_uses_fixed_order() {
        let set = TransformSet {
            h_flip: true,
            rotation: Rotation::Rotate90,
            ..Default::default()
        };
        assert_eq!(
            set.operations(),
            vec![Transform::FlipHorizontal, Transform::RotateCw]
        );

        // Flip first: (0,0) -> (2,0) -> rotate -> (1,2).
        let out = set.apply(&corner());
        assert_eq!(out.dimensions(), (2, 3));
        assert!(out.pixel(1, 2));

        // The reverse order would land on (0,0) instead.
        let reversed = apply(&apply(&corner(), Transform::RotateCw), Transform::FlipHorizontal);
        assert!(reversed.pixel(0, 0));
        assert_ne!(out, reversed);
    }

    #[test]
    fn test_full_transform_set_order() {
        let set = TransformSet {
            h_flip: true,
            v_flip: true,
            rotation: Rotation::Rotate270,
            invert: true,
        };
        assert_eq!(
            set.operations(),
            vec![
                Transform::FlipHorizontal,
                Transform::FlipVertical,
                Transform::RotateCcw,
                Transform::Invert
            ]
        );
        assert!(TransformSet::default().is_identity());
    }

    #[test]
    fn test_apply_bytes_rejects_short_buffer() {
        let err = apply_bytes(&[0u8; 3], 8, 4, Transform::RotateCw).unwrap_err();
        assert!(matches!(
            err,
            ImageError::SizeMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_apply_bytes_landscape_to_portrait() {
        // 250x128 landscape frame rotated to the 128x250 panel layout.
        let mut data = vec![0u8; 4000];
        data[0] = 0x80;
        let out = apply_bytes(&data, 250, 128, Transform::RotateCcw).unwrap();
        assert_eq!(out.dimensions(), (128, 250));
        assert_eq!(out.len(), 4000);
        assert!(out.pixel(0, 249));
    }

    #[test]
    fn test_transform_names() {
        assert_eq!("flip_h".parse::<Transform>().unwrap(), Transform::FlipHorizontal);
        assert_eq!("rotate-cw".parse::<Transform>().unwrap(), Transform::RotateCw);
        assert!(matches!(
            "shear".parse::<Transform>(),
            Err(ImageError::UnknownTransformOperation(_))
        ));
    }
}
