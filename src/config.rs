use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 50.;

/// How many leftmost columns are scanned for background and noise colors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleWidth {
    /// `height / 4` columns.
    #[default]
    QuarterHeight,
    Columns(u32),
}

/// Rounding used when a selected cluster is reduced to one color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeanMode {
    /// `(rep + sum(members)) / (members + 1)`, rounded down.
    #[default]
    Exact,
    /// `(rep + sum(members)) / members + 1`, as the older tool computed it.
    /// Channels may exceed 255 and are compared unclamped.
    Legacy,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub sample_width: SampleWidth,
    /// Max RGB distance for a sampled pixel to join a cluster.
    pub cluster_threshold: f64,
    /// Max RGB distance used when repainting the full image.
    pub limit_d: f64,
    pub mean: MeanMode,
    /// Paint background with the channel-shifted color the older tool wrote
    /// instead of the background color itself.
    pub legacy_packing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_width: SampleWidth::default(),
            cluster_threshold: DEFAULT_THRESHOLD,
            limit_d: DEFAULT_THRESHOLD,
            mean: MeanMode::default(),
            legacy_packing: false,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.cluster_threshold.is_finite() && self.cluster_threshold >= 0.,
            "cluster_threshold must be a non-negative number, got {}",
            self.cluster_threshold
        );
        anyhow::ensure!(
            self.limit_d.is_finite() && self.limit_d >= 0.,
            "limit_d must be a non-negative number, got {}",
            self.limit_d
        );
        Ok(())
    }
}
