//! Fusion of pair estimates into one bearing per window
//!
//! The fused confidence is the plain mean of the pair confidences. The fused
//! bearing is a confidence-weighted mean of the pair bearings, computed one of two
//! ways:
//!
//! - [`FusionMethod::Circular`] sums unit vectors `w·(cos θ, sin θ)` and takes
//!   `atan2` of the resultant. Correct everywhere on the circle. When the weighted
//!   resultant is negligible (pairs pointing in opposing directions, e.g. four
//!   identical channels giving 0°, 90°, 180° and 270°) the bearing is undefined and
//!   collapses to 0°.
//! - [`FusionMethod::Linear`] averages the degree values directly. Estimates that
//!   straddle North average to South (350° and 10° give 180°). Kept for
//!   compatibility with recordings already analyzed that way.

use super::angle::normalize_degrees;
use super::PairEstimate;
use crate::analysis::result::DirectionLabel;
use serde::{Deserialize, Serialize};

/// Resultant length (relative to total weight) below which the bearing is undefined
const MIN_RESULTANT: f64 = 1e-6;

/// How pair bearings are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FusionMethod {
    /// Weighted vector (circular) mean
    #[default]
    Circular,
    /// Weighted arithmetic mean of degree values
    Linear,
}

/// Fused bearing for one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedDirection {
    /// Bearing in degrees, [0, 360)
    pub angle_degrees: f32,
    /// Mean pair confidence, [0, 1]
    pub confidence: f32,
    /// Coarse direction label
    pub direction: DirectionLabel,
    /// Number of pairs that contributed
    pub pair_count: usize,
}

/// Fuse up to four pair estimates
///
/// # Arguments
///
/// * `estimates` - Pair estimates from one window
/// * `method` - Bearing averaging method
/// * `confidence_threshold` - Confidence at or below which the label is `Unknown`
///
/// # Returns
///
/// `None` if there are no estimates.
///
/// # Example
///
/// ```
/// use stratum_doa::features::doa::fusion::{fuse, FusionMethod};
/// use stratum_doa::features::doa::{PairEstimate, SensorPair};
/// use stratum_doa::DirectionLabel;
///
/// let estimates = [
///     PairEstimate { pair: SensorPair::ADJACENT[0], lag_samples: 0, angle_degrees: 350.0, confidence: 0.9 },
///     PairEstimate { pair: SensorPair::ADJACENT[3], lag_samples: 0, angle_degrees: 10.0, confidence: 0.9 },
/// ];
/// let fused = fuse(&estimates, FusionMethod::Circular, 0.3).unwrap();
/// assert!(fused.angle_degrees < 1e-3 || fused.angle_degrees > 359.999);
/// assert_eq!(fused.direction, DirectionLabel::North);
/// ```
pub fn fuse(
    estimates: &[PairEstimate],
    method: FusionMethod,
    confidence_threshold: f32,
) -> Option<FusedDirection> {
    if estimates.is_empty() {
        return None;
    }

    let count = estimates.len() as f64;
    let confidence =
        (estimates.iter().map(|e| e.confidence as f64).sum::<f64>() / count).clamp(0.0, 1.0) as f32;

    let angle_degrees = match method {
        FusionMethod::Circular => circular_weighted_mean(estimates),
        FusionMethod::Linear => linear_weighted_mean(estimates),
    };

    Some(FusedDirection {
        angle_degrees,
        confidence,
        direction: DirectionLabel::classify(angle_degrees, confidence, confidence_threshold),
        pair_count: estimates.len(),
    })
}

fn circular_weighted_mean(estimates: &[PairEstimate]) -> f32 {
    let (mut sum_sin, mut sum_cos, mut total_weight) = (0.0f64, 0.0f64, 0.0f64);
    for estimate in estimates {
        let weight = estimate.confidence as f64;
        let radians = (estimate.angle_degrees as f64).to_radians();
        sum_sin += weight * radians.sin();
        sum_cos += weight * radians.cos();
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return 0.0;
    }

    let resultant = (sum_sin * sum_sin + sum_cos * sum_cos).sqrt() / total_weight;
    if resultant < MIN_RESULTANT {
        log::trace!(
            "Pair bearings cancel out (resultant {:.2e}), bearing undefined",
            resultant
        );
        return 0.0;
    }

    normalize_degrees(sum_sin.atan2(sum_cos).to_degrees() as f32)
}

fn linear_weighted_mean(estimates: &[PairEstimate]) -> f32 {
    let total_weight: f64 = estimates.iter().map(|e| e.confidence as f64).sum();

    let mean = if total_weight > 0.0 {
        estimates
            .iter()
            .map(|e| e.confidence as f64 * e.angle_degrees as f64)
            .sum::<f64>()
            / total_weight
    } else {
        estimates.iter().map(|e| e.angle_degrees as f64).sum::<f64>() / estimates.len() as f64
    };

    normalize_degrees(mean as f32)
}
