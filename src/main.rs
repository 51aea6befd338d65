#![allow(clippy::uninlined_format_args)]
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use captcha_denoise::{
    BaiduOcr, Config, Credentials, MeanMode, OcrMode, Params, SampleWidth, clean_file, open_image,
    process_dir, recognize_image,
};

#[derive(Parser)]
#[command(name = "captcha-denoise")]
#[command(about = "Strip interference lines from captcha images before OCR")]
struct Cli {
    #[command(flatten)]
    tuning: Tuning,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Tuning {
    /// JSON config file; flags below override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Scan this many leftmost columns instead of a quarter of the height
    #[arg(long, global = true)]
    columns: Option<u32>,

    /// Max RGB distance for sampled pixels to share a cluster
    #[arg(long, global = true)]
    cluster_threshold: Option<f64>,

    /// Max RGB distance when repainting the image
    #[arg(long, global = true)]
    limit_d: Option<f64>,

    /// Reproduce the older tool's mean color arithmetic
    #[arg(long, global = true)]
    legacy_mean: bool,

    /// Reproduce the older tool's background color packing
    #[arg(long, global = true)]
    legacy_packing: bool,
}

impl Tuning {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(n) = self.columns {
            config.sample_width = SampleWidth::Columns(n);
        }
        if let Some(d) = self.cluster_threshold {
            config.cluster_threshold = d;
        }
        if let Some(d) = self.limit_d {
            config.limit_d = d;
        }
        if self.legacy_mean {
            config.mean = MeanMode::Legacy;
        }
        if self.legacy_packing {
            config.legacy_packing = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Clean a single image
    Clean {
        input: PathBuf,

        /// Output path; the extension picks the format
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Clean every image below a directory
    Batch {
        dir: PathBuf,

        /// Output directory name, or archive name with --zip
        #[arg(short, long, default_value = "cleaned")]
        output: String,

        /// Write a zip archive instead of a directory
        #[arg(long)]
        zip: bool,
    },
    /// Clean an image and run it through Baidu OCR
    Ocr {
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OcrMode::Basic)]
        mode: OcrMode,

        /// Extra request parameter, e.g. language_type=ENG
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Defaults to $BAIDU_OCR_API_KEY
        #[arg(long, requires = "secret_key")]
        api_key: Option<String>,

        /// Defaults to $BAIDU_OCR_SECRET_KEY
        #[arg(long, requires = "api_key")]
        secret_key: Option<String>,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;
    Ok((k.to_owned(), v.to_owned()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "captcha_denoise=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let cli = Cli::parse();
    let config = cli.tuning.config()?;

    match cli.command {
        Command::Clean { input, output } => {
            let colors = clean_file(&input, &output, &config)?;
            println!(
                "background {:?}, noise {:?} -> {}",
                colors.background.0,
                colors.noise.0,
                output.display()
            );
        }
        Command::Batch { dir, output, zip } => {
            let summary = process_dir(&dir, &output, zip, &config)?;
            println!("Cleaned {} image(s)", summary.cleaned);
            for (path, reason) in &summary.skipped {
                eprintln!("skipped {}: {}", path.display(), reason);
            }
        }
        Command::Ocr {
            input,
            mode,
            params,
            api_key,
            secret_key,
        } => {
            let credentials = match (api_key, secret_key) {
                (Some(api_key), Some(secret_key)) => Credentials {
                    api_key,
                    secret_key,
                },
                _ => Credentials::from_env()?,
            };
            let ocr = BaiduOcr::connect(&credentials, mode).context("Connecting to Baidu OCR")?;
            let params = params.into_iter().collect::<Params>();
            let words = recognize_image(open_image(&input)?, &config, &ocr, &params)?;
            for w in words {
                println!("{}", w);
            }
        }
    }

    Ok(())
}
