use tracing::debug;

use crate::{
    cluster::{Cluster, Clusters, RefColor},
    config::MeanMode,
    error::PrepError,
};

/// Clusters by descending population. Equal populations keep creation order.
pub fn ranked(clusters: Clusters) -> Vec<Cluster> {
    let mut clusters = clusters.into_vec();
    clusters.sort_by(|a, b| b.population.cmp(&a.population));
    clusters
}

/// Reduces a cluster to one color. Clusters without members keep their
/// representative.
pub fn mean(cluster: &Cluster, mode: MeanMode) -> RefColor {
    if cluster.members.is_empty() {
        return cluster.representative.into();
    }

    let mut sum = cluster.representative.0.map(u32::from);
    for p in &cluster.members {
        for (s, c) in sum.iter_mut().zip(p.0) {
            *s += c as u32;
        }
    }

    let n = cluster.members.len() as u32;
    RefColor(sum.map(|s| match mode {
        MeanMode::Exact => s / (n + 1),
        MeanMode::Legacy => s / n + 1,
    }))
}

/// Picks `(background, noise)` from the two most populated clusters.
///
/// `sample_width` only feeds the error report when fewer than two clusters
/// formed.
pub fn dominant_colors(
    clusters: Clusters,
    mode: MeanMode,
    sample_width: u32,
) -> Result<(RefColor, RefColor), PrepError> {
    let count = clusters.len();
    let ranked = ranked(clusters);
    let [background, noise, ..] = ranked.as_slice() else {
        return Err(PrepError::RegionTooSmall {
            clusters: count,
            width: sample_width,
        });
    };

    let background = mean(background, mode);
    let noise = mean(noise, mode);
    debug!(?background, ?noise, clusters = count, "selected dominant colors");
    Ok((background, noise))
}
