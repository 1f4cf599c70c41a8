//! The native driver capability.

use std::fmt;
use std::str::FromStr;

use epd_image::PackedBitmap;
use serde::{Deserialize, Serialize};

use crate::spec::DisplaySpec;
use crate::{PanelError, Result};

/// Refresh strategy for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Full refresh with the flashing clear cycle.
    #[default]
    Full,
    /// Partial refresh; faster, may ghost.
    Partial,
}

impl FromStr for DisplayMode {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            other => Err(PanelError::Driver(format!("unknown display mode: {other}"))),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Partial => "partial",
        })
    }
}

/// A panel that accepts packed 1bpp frames.
///
/// Implementations wrap whatever native binding drives the controller. The
/// pipeline only guarantees that every frame is exactly
/// [`DisplaySpec::array_size`] bytes.
pub trait NativePanelDriver: Send {
    /// Human-readable driver name.
    fn name(&self) -> &str;

    /// Geometry of the attached panel.
    fn spec(&self) -> DisplaySpec;

    /// Power up and reset the controller.
    fn initialize(&mut self) -> Result<()>;

    /// Push a packed frame of exactly `spec().array_size()` bytes.
    fn display_raw(&mut self, data: &[u8], mode: DisplayMode) -> Result<()>;

    /// Blank the panel to white.
    fn clear(&mut self) -> Result<()>;

    /// Enter deep sleep.
    fn sleep(&mut self) -> Result<()>;

    /// Push a bitmap after checking it matches the panel geometry.
    fn display_bitmap(&mut self, bitmap: &PackedBitmap, mode: DisplayMode) -> Result<()> {
        let spec = self.spec();
        if bitmap.dimensions() != (spec.width, spec.height) || bitmap.len() != spec.array_size() {
            return Err(PanelError::FrameSize {
                expected: spec.array_size(),
                actual: bitmap.len(),
            });
        }
        self.display_raw(bitmap.as_bytes(), mode)
    }
}
