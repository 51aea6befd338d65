use image::Rgb;
use tracing::debug;

use crate::error::PrepError;

pub type Pixel = Rgb<u8>;

pub const BLACK: Pixel = Rgb([0, 0, 0]);

pub fn dist_sq(p1: Pixel, p2: Pixel) -> f64 {
    (p1[0] as f64 - p2[0] as f64).powi(2)
        + (p1[1] as f64 - p2[1] as f64).powi(2)
        + (p1[2] as f64 - p2[2] as f64).powi(2)
}

pub fn dist(p1: Pixel, p2: Pixel) -> f64 {
    dist_sq(p1, p2).sqrt()
}

/// Two pixels are similar when their RGB distance is at most `d`.
pub fn is_similar(p1: Pixel, p2: Pixel, d: f64) -> bool {
    dist(p1, p2) <= d
}

/// A color the image is compared against.
///
/// Channels are wider than a pixel's because [`MeanMode::Legacy`] means can
/// go past 255; comparisons use the raw value and only [`RefColor::pixel`]
/// saturates.
///
/// [`MeanMode::Legacy`]: crate::config::MeanMode::Legacy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefColor(pub [u32; 3]);

impl RefColor {
    pub fn dist(self, p: Pixel) -> f64 {
        self.0
            .iter()
            .zip(p.0)
            .map(|(&r, c)| (r as f64 - c as f64).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    pub fn is_similar(self, p: Pixel, d: f64) -> bool {
        self.dist(p) <= d
    }

    /// The color as written into an image.
    pub fn pixel(self) -> Pixel {
        Rgb(self.0.map(|c| c.min(u8::MAX as u32) as u8))
    }
}

impl From<Pixel> for RefColor {
    fn from(p: Pixel) -> Self {
        RefColor(p.0.map(u32::from))
    }
}

/// A group of sampled pixels that matched the same representative.
///
/// The representative is the first pixel that opened the cluster and is never
/// moved while sampling. It is counted in `population` but not stored in
/// `members`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cluster {
    pub representative: Pixel,
    pub members: Vec<Pixel>,
    pub population: usize,
}

impl Cluster {
    fn new(representative: Pixel) -> Self {
        Self {
            representative,
            members: Vec::new(),
            population: 1,
        }
    }

    fn absorb(&mut self, pixel: Pixel) {
        self.population += 1;
        self.members.push(pixel);
    }
}

/// Clusters in creation order.
///
/// Lookups scan front to back, so a pixel close to two representatives always
/// lands in the older cluster.
#[derive(Clone, Debug, Default)]
pub struct Clusters {
    clusters: Vec<Cluster>,
}

impl Clusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pixel: Pixel, threshold: f64) {
        match self
            .clusters
            .iter_mut()
            .find(|c| is_similar(c.representative, pixel, threshold))
        {
            Some(cluster) => cluster.absorb(pixel),
            None => self.clusters.push(Cluster::new(pixel)),
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn into_vec(self) -> Vec<Cluster> {
        self.clusters
    }
}

/// Greedily groups `pixels` by similarity to each cluster's first pixel.
///
/// `sample_width` only feeds the error report when nothing was sampled.
pub fn cluster_pixels(
    pixels: impl IntoIterator<Item = Pixel>,
    threshold: f64,
    sample_width: u32,
) -> Result<Clusters, PrepError> {
    let mut clusters = Clusters::new();
    for pixel in pixels {
        clusters.insert(pixel, threshold);
    }

    if clusters.is_empty() {
        return Err(PrepError::RegionTooSmall {
            clusters: 0,
            width: sample_width,
        });
    }

    debug!(clusters = clusters.len(), threshold, "clustered sample region");
    Ok(clusters)
}
