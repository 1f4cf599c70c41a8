//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use epd_image::{ArtifactFormat, ConversionParams, DitheringMethod, Rotation, ScalingMethod};

/// Convert images into e-paper frame buffers
#[derive(Parser)]
#[command(name = "epd-convert", version, about)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert one or more images into display-ready artifacts
    Convert {
        /// Source images
        #[arg(required = true)]
        images: Vec<PathBuf>,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Copy each artifact into this directory as <stem>.<png|bin>
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transform a raw packed frame
    Transform {
        /// Raw 1bpp input file
        raw: PathBuf,

        /// Width of the input frame in pixels
        #[arg(long)]
        width: u32,

        /// Height of the input frame in pixels
        #[arg(long)]
        height: u32,

        /// Mirror left-right
        #[arg(long)]
        flip_h: bool,

        /// Mirror top-bottom
        #[arg(long)]
        flip_v: bool,

        /// Clockwise rotation in degrees (0, 90, 180, 270)
        #[arg(long)]
        rotate: Option<Rotation>,

        /// Invert black and white
        #[arg(long)]
        invert: bool,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Convert an image and push it to the panel driver
    Display {
        /// Source image
        image: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Use a partial refresh
        #[arg(long)]
        partial: bool,

        /// Write every frame sent to the panel into this directory
        #[arg(long)]
        frames: Option<PathBuf>,
    },

    /// Inspect or reset the conversion cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show panel, format and configuration details
    Info,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Print cache statistics as JSON
    Stats,
    /// Remove every cached artifact and the index
    Clear,
}

/// Per-invocation overrides of the configured conversion defaults.
#[derive(Args, Debug, Clone)]
pub struct ConversionArgs {
    /// letterbox, crop-center or stretch
    #[arg(long)]
    pub scaling: Option<ScalingMethod>,

    /// threshold, floyd-steinberg, sierra, sierra2-row or sierra-lite
    #[arg(long)]
    pub dithering: Option<DitheringMethod>,

    /// Clockwise rotation in degrees (0, 90, 180, 270)
    #[arg(long)]
    pub rotate: Option<Rotation>,

    /// Mirror left-right
    #[arg(long)]
    pub flip_h: bool,

    /// Mirror top-bottom
    #[arg(long)]
    pub flip_v: bool,

    /// Invert the packed output
    #[arg(long)]
    pub invert: bool,

    /// Crop window left edge (crop-center only)
    #[arg(long)]
    pub crop_x: Option<u32>,

    /// Crop window top edge (crop-center only)
    #[arg(long)]
    pub crop_y: Option<u32>,

    /// png or raw
    #[arg(long)]
    pub format: Option<ArtifactFormat>,
}

impl ConversionArgs {
    pub fn apply(&self, base: ConversionParams) -> ConversionParams {
        let mut params = base
            .with_flip(self.flip_h, self.flip_v)
            .with_invert(self.invert)
            .with_crop(self.crop_x, self.crop_y);
        if let Some(scaling) = self.scaling {
            params = params.with_scaling(scaling);
        }
        if let Some(dithering) = self.dithering {
            params = params.with_dithering(dithering);
        }
        if let Some(rotation) = self.rotate {
            params = params.with_rotation(rotation);
        }
        if let Some(format) = self.format {
            params = params.with_format(format);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_args_parse() {
        let cli = Cli::try_parse_from([
            "epd-convert",
            "convert",
            "a.png",
            "b.jpg",
            "--dithering",
            "sierra-lite",
            "--rotate",
            "90",
            "--flip-h",
            "--format",
            "raw",
        ])
        .unwrap();

        let Command::Convert {
            images, conversion, ..
        } = cli.command
        else {
            panic!("expected convert");
        };
        assert_eq!(images.len(), 2);

        let params = conversion.apply(ConversionParams::default());
        assert_eq!(params.dithering, DitheringMethod::SierraLite);
        assert_eq!(params.rotation, Rotation::Rotate90);
        assert!(params.h_flip && !params.v_flip);
        assert_eq!(params.format, ArtifactFormat::Raw);
        assert_eq!(params.scaling, ScalingMethod::Letterbox);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["epd-convert", "convert", "a.png", "--rotate", "45"]).is_err());
        assert!(Cli::try_parse_from(["epd-convert", "convert"]).is_err());
        assert!(Cli::try_parse_from(["epd-convert", "cache", "stats"]).is_ok());
    }
}
