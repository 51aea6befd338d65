#![allow(clippy::uninlined_format_args)]
use std::{
    fs::File,
    io::{BufWriter, Cursor, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::Context;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::{ZipWriter, write::SimpleFileOptions};

pub mod cluster;
pub mod config;
pub mod dominant;
pub mod error;
pub mod ocr;
pub mod recolor;
pub mod sample;

pub use cluster::{Pixel, RefColor};
pub use config::{Config, MeanMode, SampleWidth};
pub use error::{OcrError, PrepError};
pub use ocr::{BaiduOcr, Credentials, OcrMode, Params, Recognize};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Reference colors found in the scan region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colors {
    pub background: RefColor,
    pub noise: RefColor,
}

/// Finds background and noise colors in the left edge of `image`.
pub fn find_colors(image: &RgbImage, config: &Config) -> Result<Colors, PrepError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PrepError::MalformedImage { width, height });
    }

    let len = sample::region_width(image, config.sample_width);
    let clusters = cluster::cluster_pixels(
        sample::sample_columns(image, len),
        config.cluster_threshold,
        len,
    )?;
    let (background, noise) = dominant::dominant_colors(clusters, config.mean, len)?;
    Ok(Colors { background, noise })
}

/// Erases interference lines and blackens text in place.
pub fn denoise(image: &mut RgbImage, config: &Config) -> Result<Colors, PrepError> {
    let colors = find_colors(image, config)?;
    let fill = if config.legacy_packing {
        recolor::legacy_packed(colors.background)
    } else {
        colors.background.pixel()
    };
    recolor::recolor_with_fill(image, colors.background, colors.noise, config.limit_d, fill);
    debug!(?colors, "recolored {}x{} image", image.width(), image.height());
    Ok(colors)
}

pub fn denoise_image(image: DynamicImage, config: &Config) -> Result<RgbImage, PrepError> {
    let mut image = image.into_rgb8();
    denoise(&mut image, config)?;
    Ok(image)
}

pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    ImageReader::open(path)
        .with_context(|| format!("Reading image {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("Reading image {}", path.display()))?
        .decode()
        .with_context(|| format!("Decoding image {}", path.display()))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> anyhow::Result<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), format)
        .with_context(|| format!("Encoding image as {:?}", format))?;
    Ok(buf)
}

/// Denoises `input` and saves it to `output`, format chosen by extension.
pub fn clean_file(input: &Path, output: &Path, config: &Config) -> anyhow::Result<Colors> {
    let mut image = open_image(input)?.into_rgb8();
    let colors =
        denoise(&mut image, config).with_context(|| format!("Cleaning {}", input.display()))?;
    image
        .save(output)
        .with_context(|| format!("Saving image: {}", output.display()))?;
    Ok(colors)
}

/// Denoises `image`, sends it to `ocr` as PNG and returns the text found.
pub fn recognize_image(
    image: DynamicImage,
    config: &Config,
    ocr: &impl Recognize,
    params: &Params,
) -> anyhow::Result<Vec<String>> {
    let image = denoise_image(image, config)?;
    let png = encode(&image, ImageFormat::Png)?;
    Ok(ocr.recognize(&png, params)?)
}

#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    pub cleaned: usize,
    /// Files left out, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Denoises every image below `input_dir` into the directory `out_name`, or
/// into `out_name.zip` when `zip` is set. Relative paths are kept.
///
/// Images that fail to decode or have too few colors are skipped and listed
/// in the summary; write failures abort the batch.
pub fn process_dir(
    input_dir: impl AsRef<Path>,
    out_name: impl AsRef<str>,
    zip: bool,
    config: &Config,
) -> anyhow::Result<BatchSummary> {
    let start = Instant::now();
    let input_dir = input_dir.as_ref();
    let out_name = out_name.as_ref();
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut writer = if zip {
        let path = format!("{}.zip", out_name);
        let f = File::create(&path).with_context(|| format!("Creating file {}", &path))?;
        let f = BufWriter::new(f);
        Some(ZipWriter::new(f))
    } else {
        None
    };

    let mut summary = BatchSummary::default();
    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.path().is_dir() || !is_image(entry.path()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(input_dir)
            .with_context(|| {
                format!(
                    "{} is outside {}",
                    entry.path().display(),
                    input_dir.display()
                )
            })?
            .to_path_buf();

        let image = match open_image(entry.path()) {
            Ok(image) => image,
            Err(e) => {
                warn!("skipping {}: {:#}", rel.display(), e);
                summary.skipped.push((rel, format!("{:#}", e)));
                continue;
            }
        };
        let image = match denoise_image(image, config) {
            Ok(image) => image,
            Err(e) => {
                warn!("skipping {}: {}", rel.display(), e);
                summary.skipped.push((rel, e.to_string()));
                continue;
            }
        };

        if let Some(ref mut writer) = writer {
            let format = ImageFormat::from_path(&rel)
                .with_context(|| format!("No image format for {}", rel.display()))?;
            let name = rel.to_string_lossy().replace('\\', "/");
            writer.start_file(name, options)?;
            writer.write_all(&encode(&image, format)?)?;
        } else {
            let path = Path::new(out_name).join(&rel);
            let parent = path
                .parent()
                .with_context(|| format!("path contains no parent: {}", path.display()))?;
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Making dir {}", parent.display()))?;

            image
                .save(&path)
                .with_context(|| format!("Saving image: {}", path.display()))?;
        }
        summary.cleaned += 1;
    }

    if let Some(writer) = writer {
        writer.finish()?;
    }

    info!(
        cleaned = summary.cleaned,
        skipped = summary.skipped.len(),
        "finished \"{}\" in {}ms",
        out_name,
        start.elapsed().as_millis()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    use crate::cluster::BLACK;

    const A: Pixel = Rgb([200, 200, 200]);
    const B: Pixel = Rgb([10, 10, 10]);

    /// Column 0 is the scan region: three background pixels above one noise
    /// pixel. The rest mixes near-noise, near-background and text colors.
    fn scenario() -> RgbImage {
        let rows: [[Pixel; 4]; 4] = [
            [A, Rgb([30, 30, 30]), Rgb([190, 190, 190]), Rgb([90, 40, 160])],
            [A, Rgb([200, 0, 0]), A, Rgb([180, 210, 200])],
            [A, Rgb([0, 0, 200]), Rgb([35, 35, 35]), Rgb([100, 100, 100])],
            [B, Rgb([170, 170, 170]), Rgb([55, 10, 10]), Rgb([10, 10, 60])],
        ];
        RgbImage::from_fn(4, 4, |x, y| rows[y as usize][x as usize])
    }

    #[test]
    fn scenario_colors() {
        let colors = find_colors(&scenario(), &Config::default()).unwrap();
        assert_eq!(
            colors,
            Colors {
                background: A.into(),
                noise: B.into()
            }
        );
    }

    #[test]
    fn scenario_output_grid() {
        let mut image = scenario();
        denoise(&mut image, &Config::default()).unwrap();

        let expected: [[Pixel; 4]; 4] = [
            [A, A, Rgb([190, 190, 190]), BLACK],
            [A, BLACK, A, Rgb([180, 210, 200])],
            [A, BLACK, A, BLACK],
            [A, BLACK, A, A],
        ];
        for (x, y, px) in image.enumerate_pixels() {
            assert_eq!(*px, expected[y as usize][x as usize], "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn uniform_image_is_too_small() {
        let image = RgbImage::from_pixel(4, 4, Rgb([120, 130, 140]));
        let err = find_colors(&image, &Config::default()).unwrap_err();
        assert_eq!(err, PrepError::RegionTooSmall { clusters: 1, width: 1 });
    }

    #[test]
    fn short_image_has_no_region() {
        let image = RgbImage::from_pixel(40, 3, A);
        let err = find_colors(&image, &Config::default()).unwrap_err();
        assert_eq!(err, PrepError::RegionTooSmall { clusters: 0, width: 0 });
    }

    #[test]
    fn empty_image_is_malformed() {
        let mut image = RgbImage::new(0, 8);
        let err = denoise(&mut image, &Config::default()).unwrap_err();
        assert_eq!(err, PrepError::MalformedImage { width: 0, height: 8 });
    }

    #[test]
    fn repeated_runs_match() {
        let image = RgbImage::from_fn(60, 24, |_, _| {
            Rgb([rand::random(), rand::random(), rand::random()])
        });
        let config = Config {
            sample_width: SampleWidth::Columns(20),
            ..Config::default()
        };
        let first = denoise_image(DynamicImage::ImageRgb8(image.clone()), &config);
        let second = denoise_image(DynamicImage::ImageRgb8(image), &config);
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_packing_paints_shifted_color() {
        let mut image = scenario();
        let config = Config {
            legacy_packing: true,
            ..Config::default()
        };
        denoise(&mut image, &config).unwrap();
        // A packs to black; noise at (1, 0) and (0, 3) goes black too.
        assert_eq!(*image.get_pixel(1, 0), BLACK);
        assert_eq!(*image.get_pixel(0, 3), BLACK);
        assert_eq!(*image.get_pixel(0, 0), A);
    }

    #[test]
    fn legacy_mean_compares_against_unclamped_white() {
        // Two scan columns of white crossed by a dark line at y = 3.
        let mut image = RgbImage::from_fn(8, 8, |x, y| match (x, y) {
            (0..2, 3) => Rgb([10, 10, 10]),
            (5, 5) => Rgb([227, 227, 227]),
            _ => Rgb([255, 255, 255]),
        });
        let config = Config {
            mean: MeanMode::Legacy,
            ..Config::default()
        };
        let colors = denoise(&mut image, &config).unwrap();

        // 255 * 14 / 13 + 1 and 20 / 1 + 1.
        assert_eq!(colors.background, RefColor([275, 275, 275]));
        assert_eq!(colors.noise, RefColor([21, 21, 21]));
        assert_eq!(*image.get_pixel(5, 5), BLACK);
        assert_eq!(*image.get_pixel(0, 3), Rgb([255, 255, 255]));
        assert_eq!(*image.get_pixel(7, 7), Rgb([255, 255, 255]));
    }

    struct Echo;

    impl Recognize for Echo {
        fn recognize(&self, image: &[u8], params: &Params) -> Result<Vec<String>, OcrError> {
            let image = image::load_from_memory_with_format(image, ImageFormat::Png)
                .expect("payload is a PNG");
            let mut out = vec![format!("{}x{}", image.width(), image.height())];
            out.extend(params.values().cloned());
            Ok(out)
        }
    }

    #[test]
    fn recognize_sends_cleaned_png() {
        let mut params = Params::new();
        params.insert("language_type".into(), "ENG".into());
        let words = recognize_image(
            DynamicImage::ImageRgb8(scenario()),
            &Config::default(),
            &Echo,
            &params,
        )
        .unwrap();
        assert_eq!(words, vec!["4x4", "ENG"]);
    }

    #[test]
    fn recognize_stops_on_too_small() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, A));
        let err = recognize_image(image, &Config::default(), &Echo, &Params::new()).unwrap_err();
        assert!(err.downcast_ref::<PrepError>().is_some());
    }
}
