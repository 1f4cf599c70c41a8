//! Conversion pipeline: cache check, decode, orient, scale, dither, pack.
//!
//! Artifacts are written through `tempfile` so a failure anywhere before the
//! cache takes ownership removes the half-written file.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use epd_cache::{CacheError, CacheKey, ImageCache, PathPolicy};
use epd_image::{
    ArtifactFormat, ConversionParams, DEFAULT_THRESHOLD, DitheringMethod, ImageError,
    PackedBitmap, Rotation, TransformSet, dither, load_image, pack, scale_image, threshold_convert,
    to_grayscale, transform, unpack,
};
use epd_panel::{DisplayMode, NativePanelDriver, PanelError};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

/// Prefix of every artifact file the pipeline creates.
pub const ARTIFACT_PREFIX: &str = "eink_auto_";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Panel(#[from] PanelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Outcome of [`Pipeline::convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub path: PathBuf,
    pub cache_hit: bool,
}

/// Converts source images into display-ready artifacts, reusing cached ones.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct Pipeline {
    cache: Option<ImageCache>,
    policy: PathPolicy,
    artifact_dir: PathBuf,
}

impl Pipeline {
    /// A pipeline writing artifacts to the system temp directory. Sources are
    /// checked against [`PathPolicy::sources`].
    pub fn new(cache: Option<ImageCache>) -> Self {
        Self {
            cache,
            policy: PathPolicy::sources(),
            artifact_dir: std::env::temp_dir(),
        }
    }

    /// Builder: write new artifacts into `dir`.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Builder: replace the source path policy.
    pub fn with_source_policy(mut self, policy: PathPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache(&self) -> Option<&ImageCache> {
        self.cache.as_ref()
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// Produce the artifact for `source` under `params`.
    ///
    /// On a cache hit no file is written. On a miss exactly one artifact is
    /// created and registered; if an identical entry appeared meanwhile, the
    /// new file is discarded and the existing path returned.
    pub fn convert(&self, source: &Path, params: &ConversionParams) -> Result<Conversion> {
        let source = self.policy.check(source)?;
        let key = CacheKey::for_source(&source, params);

        if let Some(cache) = &self.cache {
            if let Some(path) = cache.get(&key)? {
                info!(source = %source.display(), path = %path.display(), "Cache hit");
                return Ok(Conversion {
                    path,
                    cache_hit: true,
                });
            }
        }

        let bitmap = convert_to_bitmap(&source, params)?;
        let mut artifact = self.create_artifact(params.format)?;
        write_artifact(&bitmap, params.format, artifact.as_file_mut())?;
        let candidate = std::path::absolute(artifact.path())?;

        let Some(cache) = &self.cache else {
            let (_, path) = artifact.keep().map_err(|e| PipelineError::Io(e.error))?;
            info!(source = %source.display(), path = %path.display(), "Converted");
            return Ok(Conversion {
                path,
                cache_hit: false,
            });
        };

        // The cache rejects paths outside its roots; the artifact is still
        // ours here and is removed when `artifact` drops.
        let registered = cache.put(key.clone(), &candidate, &source, params)?;
        if registered != candidate {
            debug!(path = %registered.display(), "Identical conversion already cached");
            return Ok(Conversion {
                path: registered,
                cache_hit: true,
            });
        }

        if let Err(e) = artifact.keep() {
            cache.remove(&key)?;
            return Err(PipelineError::Io(e.error));
        }
        info!(source = %source.display(), path = %registered.display(), "Converted");
        Ok(Conversion {
            path: registered,
            cache_hit: false,
        })
    }

    /// Convert `source` and push it to `driver`.
    pub fn display(
        &self,
        driver: &mut dyn NativePanelDriver,
        source: &Path,
        params: &ConversionParams,
        mode: DisplayMode,
    ) -> Result<Conversion> {
        let spec = driver.spec();
        if (params.target_width, params.target_height) != (spec.width, spec.height) {
            return Err(PipelineError::Config(format!(
                "parameters target {}x{} but {} is {}x{}",
                params.target_width, params.target_height, spec.name, spec.width, spec.height
            )));
        }

        let conversion = self.convert(source, params)?;
        let bitmap = load_artifact(
            &conversion.path,
            params.format,
            params.target_width,
            params.target_height,
        )?;
        driver.display_bitmap(&bitmap, mode)?;
        Ok(conversion)
    }

    fn create_artifact(&self, format: ArtifactFormat) -> Result<tempfile::NamedTempFile> {
        std::fs::create_dir_all(&self.artifact_dir)?;
        let suffix = format!(".{}", format.extension());
        let file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.artifact_dir)?;
        Ok(file)
    }
}

/// Run the whole conversion in memory.
pub fn convert_to_bitmap(source: &Path, params: &ConversionParams) -> Result<PackedBitmap> {
    let img = load_image(source)?;
    process_image(&img, params)
}

/// Orient, scale, binarize and pack a decoded image.
pub fn process_image(img: &DynamicImage, params: &ConversionParams) -> Result<PackedBitmap> {
    let oriented = orient(img, params);
    let scaled = scale_image(
        &oriented,
        params.target_width,
        params.target_height,
        params.scaling,
        params.crop_x,
        params.crop_y,
    )?;

    let gray = to_grayscale(&scaled);
    let binary = match params.dithering {
        DitheringMethod::Threshold => threshold_convert(&gray, DEFAULT_THRESHOLD),
        method => dither(&gray, method),
    };

    let packed = pack(&binary, DEFAULT_THRESHOLD);
    Ok(if params.invert {
        transform::invert(&packed)
    } else {
        packed
    })
}

/// Flips then rotation, applied before scaling so the result fills the panel.
fn orient(img: &DynamicImage, params: &ConversionParams) -> DynamicImage {
    let mut out = img.clone();
    if params.h_flip {
        out = out.fliph();
    }
    if params.v_flip {
        out = out.flipv();
    }
    match params.rotation {
        Rotation::None => out,
        Rotation::Rotate90 => out.rotate90(),
        Rotation::Rotate180 => out.rotate180(),
        Rotation::Rotate270 => out.rotate270(),
    }
}

/// Apply `transforms` to a raw packed frame of `width`x`height`.
///
/// Bytes beyond the frame are ignored; a short buffer is a size mismatch.
pub fn transform_packed(
    data: &[u8],
    width: u32,
    height: u32,
    transforms: TransformSet,
) -> Result<PackedBitmap> {
    let bitmap = PackedBitmap::from_prefix(data, width, height)?;
    Ok(transforms.apply(&bitmap))
}

/// Serialize a bitmap as a 0/255 grayscale PNG or raw packed bytes.
pub fn write_artifact<W>(bitmap: &PackedBitmap, format: ArtifactFormat, writer: W) -> Result<()>
where
    W: Write + std::io::Seek,
{
    let mut writer = BufWriter::new(writer);
    match format {
        ArtifactFormat::Raw => writer.write_all(bitmap.as_bytes())?,
        ArtifactFormat::Png => DynamicImage::ImageLuma8(unpack(bitmap))
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(|e| ImageError::UnsupportedFormat {
                path: PathBuf::from("<png artifact>"),
                reason: e.to_string(),
            })?,
    }
    writer.flush()?;
    Ok(())
}

/// Read an artifact back into a bitmap of the expected size.
pub fn load_artifact(
    path: &Path,
    format: ArtifactFormat,
    width: u32,
    height: u32,
) -> Result<PackedBitmap> {
    match format {
        ArtifactFormat::Raw => {
            let data = std::fs::read(path)?;
            Ok(PackedBitmap::new(data, width, height)?)
        }
        ArtifactFormat::Png => {
            let gray = load_image(path)?.to_luma8();
            if gray.dimensions() != (width, height) {
                return Err(ImageError::InvalidDimensions {
                    width: gray.width(),
                    height: gray.height(),
                }
                .into());
            }
            Ok(pack(&gray, DEFAULT_THRESHOLD))
        }
    }
}
