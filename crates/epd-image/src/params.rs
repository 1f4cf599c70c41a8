//! Conversion parameters.
//!
//! A [`ConversionParams`] value fully determines the output produced from a
//! given source image, which is what makes it usable as part of a cache
//! fingerprint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ImageError;
use crate::transform::TransformSet;

/// How a source image is fitted to the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalingMethod {
    /// Preserve aspect ratio, pad with white.
    #[default]
    Letterbox = 0,
    /// Preserve aspect ratio, fill and crop the overflow.
    CropCenter = 1,
    /// Resize each axis independently.
    Stretch = 2,
}

impl ScalingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Letterbox => "letterbox",
            Self::CropCenter => "crop-center",
            Self::Stretch => "stretch",
        }
    }
}

impl FromStr for ScalingMethod {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "letterbox" | "0" => Ok(Self::Letterbox),
            "crop-center" | "crop" | "1" => Ok(Self::CropCenter),
            "stretch" | "2" => Ok(Self::Stretch),
            _ => Err(ImageError::UnknownScalingMethod(s.to_string())),
        }
    }
}

impl fmt::Display for ScalingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-bit conversion algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DitheringMethod {
    /// Plain threshold, no error diffusion.
    Threshold = 0,
    #[default]
    FloydSteinberg = 1,
    Sierra = 2,
    Sierra2Row = 3,
    SierraLite = 4,
}

impl DitheringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::FloydSteinberg => "floyd-steinberg",
            Self::Sierra => "sierra",
            Self::Sierra2Row => "sierra2-row",
            Self::SierraLite => "sierra-lite",
        }
    }
}

impl TryFrom<u8> for DitheringMethod {
    type Error = ImageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            // 5 is the legacy "simple" method, which was a plain threshold.
            0 | 5 => Ok(Self::Threshold),
            1 => Ok(Self::FloydSteinberg),
            2 => Ok(Self::Sierra),
            3 => Ok(Self::Sierra2Row),
            4 => Ok(Self::SierraLite),
            other => Err(ImageError::UnknownDitheringMethod(other.to_string())),
        }
    }
}

impl FromStr for DitheringMethod {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        if let Ok(n) = normalized.parse::<u8>() {
            return Self::try_from(n);
        }
        match normalized.as_str() {
            "threshold" | "none" | "simple" => Ok(Self::Threshold),
            "floyd-steinberg" | "floydsteinberg" | "fs" => Ok(Self::FloydSteinberg),
            "sierra" => Ok(Self::Sierra),
            "sierra2-row" | "sierra-2row" | "sierra-2-row" | "sierra2row" => Ok(Self::Sierra2Row),
            "sierra-lite" | "sierralite" => Ok(Self::SierraLite),
            _ => Err(ImageError::UnknownDitheringMethod(s.to_string())),
        }
    }
}

impl fmt::Display for DitheringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clockwise rotation applied before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rotation {
    #[default]
    None,
    /// 90 degrees clockwise.
    Rotate90,
    Rotate180,
    /// 270 degrees clockwise, i.e. 90 degrees counter-clockwise.
    Rotate270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Self::None => 0,
            Self::Rotate90 => 90,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
        }
    }

    pub fn from_degrees(degrees: u16) -> Result<Self, ImageError> {
        match degrees {
            0 => Ok(Self::None),
            90 => Ok(Self::Rotate90),
            180 => Ok(Self::Rotate180),
            270 => Ok(Self::Rotate270),
            other => Err(ImageError::UnknownRotation(other.to_string())),
        }
    }
}

impl FromStr for Rotation {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        if let Ok(degrees) = normalized.parse::<u16>() {
            return Self::from_degrees(degrees);
        }
        match normalized.as_str() {
            "none" => Ok(Self::None),
            "rotate90" | "cw" => Ok(Self::Rotate90),
            "rotate180" => Ok(Self::Rotate180),
            "rotate270" | "ccw" => Ok(Self::Rotate270),
            _ => Err(ImageError::UnknownRotation(s.to_string())),
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// On-disk form of a finished conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactFormat {
    /// Single-channel PNG with 0/255 pixels at panel dimensions.
    #[default]
    Png,
    /// Packed 1bpp frame buffer.
    Raw,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Raw => "bin",
        }
    }
}

impl FromStr for ArtifactFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "raw" | "bin" => Ok(Self::Raw),
            _ => Err(ImageError::UnsupportedFormat {
                path: s.into(),
                reason: "expected 'png' or 'raw'".into(),
            }),
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Raw => "raw",
        })
    }
}

/// Everything besides the source image that influences the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionParams {
    pub target_width: u32,
    pub target_height: u32,
    pub scaling: ScalingMethod,
    pub dithering: DitheringMethod,
    pub rotation: Rotation,
    pub h_flip: bool,
    pub v_flip: bool,
    pub crop_x: Option<u32>,
    pub crop_y: Option<u32>,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub format: ArtifactFormat,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self::new(128, 250)
    }
}

impl ConversionParams {
    /// Parameters for a `width`x`height` panel with default processing.
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
            scaling: ScalingMethod::default(),
            dithering: DitheringMethod::default(),
            rotation: Rotation::default(),
            h_flip: false,
            v_flip: false,
            crop_x: None,
            crop_y: None,
            invert: false,
            format: ArtifactFormat::default(),
        }
    }

    /// Builder: set scaling method.
    pub fn with_scaling(mut self, scaling: ScalingMethod) -> Self {
        self.scaling = scaling;
        self
    }

    /// Builder: set dithering method.
    pub fn with_dithering(mut self, dithering: DitheringMethod) -> Self {
        self.dithering = dithering;
        self
    }

    /// Builder: set rotation.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set horizontal / vertical mirroring.
    pub fn with_flip(mut self, h_flip: bool, v_flip: bool) -> Self {
        self.h_flip = h_flip;
        self.v_flip = v_flip;
        self
    }

    /// Builder: set explicit crop origin for [`ScalingMethod::CropCenter`].
    pub fn with_crop(mut self, crop_x: Option<u32>, crop_y: Option<u32>) -> Self {
        self.crop_x = crop_x;
        self.crop_y = crop_y;
        self
    }

    /// Builder: set color inversion of the packed output.
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Builder: set artifact format.
    pub fn with_format(mut self, format: ArtifactFormat) -> Self {
        self.format = format;
        self
    }

    /// The packed-buffer transforms equivalent to these parameters.
    pub fn transforms(&self) -> TransformSet {
        TransformSet {
            h_flip: self.h_flip,
            v_flip: self.v_flip,
            rotation: self.rotation,
            invert: self.invert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ConversionParams::default();
        assert_eq!((params.target_width, params.target_height), (128, 250));
        assert_eq!(params.scaling, ScalingMethod::Letterbox);
        assert_eq!(params.dithering, DitheringMethod::FloydSteinberg);
        assert_eq!(params.rotation, Rotation::None);
        assert!(!params.h_flip && !params.v_flip && !params.invert);
        assert_eq!(params.format, ArtifactFormat::Png);
    }

    #[test]
    fn test_builder_chain() {
        let params = ConversionParams::new(240, 416)
            .with_scaling(ScalingMethod::CropCenter)
            .with_dithering(DitheringMethod::SierraLite)
            .with_rotation(Rotation::Rotate270)
            .with_flip(true, false)
            .with_crop(Some(10), None)
            .with_invert(true)
            .with_format(ArtifactFormat::Raw);

        assert_eq!(params.scaling, ScalingMethod::CropCenter);
        assert_eq!(params.dithering, DitheringMethod::SierraLite);
        assert_eq!(params.rotation, Rotation::Rotate270);
        assert!(params.h_flip && !params.v_flip);
        assert_eq!(params.crop_x, Some(10));
        assert_eq!(params.crop_y, None);
        assert!(params.invert);
        assert_eq!(params.format, ArtifactFormat::Raw);
    }

    #[test]
    fn test_dithering_from_number() {
        assert_eq!(DitheringMethod::try_from(0).unwrap(), DitheringMethod::Threshold);
        assert_eq!(DitheringMethod::try_from(3).unwrap(), DitheringMethod::Sierra2Row);
        assert_eq!(DitheringMethod::try_from(5).unwrap(), DitheringMethod::Threshold);
        assert!(matches!(
            DitheringMethod::try_from(6),
            Err(ImageError::UnknownDitheringMethod(_))
        ));
    }

    #[test]
    fn test_dithering_from_name() {
        assert_eq!("none".parse::<DitheringMethod>().unwrap(), DitheringMethod::Threshold);
        assert_eq!(
            "Floyd_Steinberg".parse::<DitheringMethod>().unwrap(),
            DitheringMethod::FloydSteinberg
        );
        assert_eq!("sierra-2row".parse::<DitheringMethod>().unwrap(), DitheringMethod::Sierra2Row);
        assert!("bayer".parse::<DitheringMethod>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for method in [
            DitheringMethod::Threshold,
            DitheringMethod::FloydSteinberg,
            DitheringMethod::Sierra,
            DitheringMethod::Sierra2Row,
            DitheringMethod::SierraLite,
        ] {
            assert_eq!(method.to_string().parse::<DitheringMethod>().unwrap(), method);
        }
        for scaling in [ScalingMethod::Letterbox, ScalingMethod::CropCenter, ScalingMethod::Stretch] {
            assert_eq!(scaling.to_string().parse::<ScalingMethod>().unwrap(), scaling);
        }
    }

    #[test]
    fn test_rotation_parsing() {
        assert_eq!("90".parse::<Rotation>().unwrap(), Rotation::Rotate90);
        assert_eq!("ccw".parse::<Rotation>().unwrap(), Rotation::Rotate270);
        assert_eq!(Rotation::from_degrees(180).unwrap().degrees(), 180);
        assert!(matches!(
            "45".parse::<Rotation>(),
            Err(ImageError::UnknownRotation(_))
        ));
    }

    #[test]
    fn test_serde_names_and_defaults() {
        let json = serde_json::to_value(ConversionParams::default()).unwrap();
        assert_eq!(json["scaling"], "letterbox");
        assert_eq!(json["dithering"], "floyd-steinberg");
        assert_eq!(json["crop_x"], serde_json::Value::Null);

        // Older snapshots carry neither `invert` nor `format`.
        let legacy = serde_json::json!({
            "target_width": 128,
            "target_height": 250,
            "scaling": "stretch",
            "dithering": "sierra",
            "rotation": "none",
            "h_flip": false,
            "v_flip": true,
            "crop_x": null,
            "crop_y": 4
        });
        let params: ConversionParams = serde_json::from_value(legacy).unwrap();
        assert!(!params.invert);
        assert_eq!(params.format, ArtifactFormat::Png);
        assert_eq!(params.crop_y, Some(4));
    }
}
