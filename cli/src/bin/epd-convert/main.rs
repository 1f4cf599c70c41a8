//! `epd-convert`: turn images into frames for monochrome e-paper panels.

mod args;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use args::{CacheAction, Cli, Command, ConversionArgs};
use epd_convert_lib::services::pipeline::transform_packed;
use epd_convert_lib::{AppConfig, Pipeline};
use epd_image::{ConversionParams, TransformSet, packed_len, supported_extensions};
use epd_panel::{DisplayMode, DryRunDriver, NativePanelDriver};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, pipeline) = epd_convert_lib::init_foundation()?;

    match cli.command {
        Command::Convert {
            images,
            conversion,
            output,
        } => {
            let params = conversion.apply(config.default_params());
            run_convert(&pipeline, params, images, output).await
        }
        Command::Transform {
            raw,
            width,
            height,
            flip_h,
            flip_v,
            rotate,
            invert,
            output,
        } => {
            let transforms = TransformSet {
                h_flip: flip_h,
                v_flip: flip_v,
                rotation: rotate.unwrap_or_default(),
                invert,
            };
            run_transform(&raw, width, height, transforms, &output)
        }
        Command::Display {
            image,
            conversion,
            partial,
            frames,
        } => run_display(&config, &pipeline, &image, &conversion, partial, frames),
        Command::Cache { action } => run_cache(&pipeline, action),
        Command::Info => {
            print_info(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Convert every image on the blocking pool, sharing one cache.
async fn run_convert(
    pipeline: &Pipeline,
    params: ConversionParams,
    images: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(dir) = &output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    } else if pipeline.cache().is_some_and(|c| !c.is_persistent()) {
        tracing::warn!("Cache is not persistent; artifacts are removed on exit. Use --output to keep them.");
    }

    let total = images.len();
    let mut names = export_names(&images, params.format.extension()).into_iter();
    let handles: Vec<_> = images
        .into_iter()
        .map(|image| {
            let pipeline = pipeline.clone();
            tokio::task::spawn_blocking(move || {
                let result = pipeline.convert(&image, &params);
                (image, result)
            })
        })
        .collect();

    let mut failures = 0usize;
    for handle in handles {
        let (image, result) = handle.await?;
        let name = names.next().unwrap_or_default();
        match result {
            Ok(conversion) => {
                let path = match &output {
                    Some(dir) => export(&conversion.path, &dir.join(&name))?,
                    None => conversion.path,
                };
                let status = if conversion.cache_hit { "hit" } else { "new" };
                println!("{}\t{}\t{status}", image.display(), path.display());
            }
            Err(e) => {
                tracing::error!(image = %image.display(), error = %e, "Conversion failed");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {total} conversions failed");
    }
    Ok(())
}

/// Output file names `<stem>.<ext>`, one per image in order.
///
/// Repeated stems (`a/x.png`, `b/x.jpg`) get `-2`, `-3`, ... suffixes so no
/// export overwrites another.
fn export_names(images: &[PathBuf], extension: &str) -> Vec<String> {
    let mut used = HashSet::new();
    images
        .iter()
        .map(|image| {
            let stem = image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let mut name = format!("{stem}.{extension}");
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{stem}-{n}.{extension}");
                n += 1;
            }
            name
        })
        .collect()
}

/// Copy a cached artifact to `dest`.
fn export(artifact: &Path, dest: &Path) -> anyhow::Result<PathBuf> {
    std::fs::copy(artifact, dest)
        .with_context(|| format!("copying {} to {}", artifact.display(), dest.display()))?;
    Ok(dest.to_path_buf())
}

fn run_transform(
    raw: &Path,
    width: u32,
    height: u32,
    transforms: TransformSet,
    output: &Path,
) -> anyhow::Result<()> {
    let data = std::fs::read(raw).with_context(|| format!("reading {}", raw.display()))?;
    let bitmap = transform_packed(&data, width, height, transforms)?;
    std::fs::write(output, bitmap.as_bytes())
        .with_context(|| format!("writing {}", output.display()))?;

    let (w, h) = bitmap.dimensions();
    println!("{}\t{w}x{h}\t{} bytes", output.display(), bitmap.len());
    Ok(())
}

fn run_display(
    config: &AppConfig,
    pipeline: &Pipeline,
    image: &Path,
    conversion: &ConversionArgs,
    partial: bool,
    frames: Option<PathBuf>,
) -> anyhow::Result<()> {
    let params = conversion.apply(config.default_params());
    let mode = if partial {
        DisplayMode::Partial
    } else {
        DisplayMode::Full
    };

    let mut driver = DryRunDriver::new(config.firmware);
    if let Some(dir) = frames {
        driver = driver.with_frame_dir(dir);
    }
    driver.initialize()?;
    let result = pipeline.display(&mut driver, image, &params, mode);
    driver.sleep()?;

    let conversion = result?;
    println!(
        "{}\t{}\t{mode}",
        conversion.path.display(),
        driver.spec().name
    );
    Ok(())
}

fn run_cache(pipeline: &Pipeline, action: CacheAction) -> anyhow::Result<()> {
    let Some(cache) = pipeline.cache() else {
        bail!("cache is disabled (EPD_CACHE_ENABLED=false)");
    };
    match action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        CacheAction::Clear => {
            let entries = cache.len()?;
            cache.clear()?;
            println!("Cleared {entries} cached conversions");
        }
    }
    Ok(())
}

fn print_info(config: &AppConfig) {
    let spec = config.display_spec();
    println!("Firmware:     {}", config.firmware);
    println!("Resolution:   {}x{}", spec.width, spec.height);
    println!("Frame size:   {} bytes", packed_len(spec.width, spec.height));
    println!("Formats:      {}", supported_extensions().join(", "));
    println!();
    println!("Settings:");
    for setting in config.settings() {
        println!(
            "  {:<24} {:<28} ({})",
            setting.key,
            setting.value,
            setting.source.as_str()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_names_disambiguate_shared_stems() {
        let images = [
            PathBuf::from("a/x.png"),
            PathBuf::from("b/x.jpg"),
            PathBuf::from("x-2.bmp"),
            PathBuf::from("c/y.gif"),
            PathBuf::from("d/x.webp"),
        ];
        assert_eq!(
            export_names(&images, "bin"),
            vec!["x.bin", "x-2.bin", "x-2-2.bin", "y.bin", "x-3.bin"]
        );
    }

    #[test]
    fn test_export_names_keep_unique_stems() {
        let images = [PathBuf::from("/srv/a.png"), PathBuf::from("/srv/b.png")];
        assert_eq!(export_names(&images, "png"), vec!["a.png", "b.png"]);
    }
}
