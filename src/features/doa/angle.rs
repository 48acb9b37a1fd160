//! Lag → bearing conversion for a sensor pair
//!
//! ```text
//! delay      = lag / sample_rate
//! ratio      = clamp(delay * sound_speed / (2 * radius), -1, 1)
//! pair_angle = degrees(asin(ratio))
//! bearing    = (base_angle + orientation_sign * pair_angle) mod 360
//! confidence = |c[peak]| / max |c|
//! ```
//!
//! The ratio is clamped because an admissible lag rounded up to a whole sample can
//! still land marginally past the ring diameter.

use super::correlation::CrossCorrelation;
use super::geometry::ArrayContext;
use super::peak_picking::find_admissible_peak;
use super::{PairEstimate, SensorPair};

/// Wrap an angle in degrees into [0, 360)
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Angle of incidence on the pair axis, in degrees within [-90, 90]
pub fn pair_angle_degrees(lag_samples: isize, context: &ArrayContext) -> f32 {
    let geometry = context.geometry;
    let delay_seconds = lag_samples as f64 / context.sample_rate as f64;
    let ratio = (delay_seconds * geometry.sound_speed() as f64) / (2.0 * geometry.radius() as f64);
    ratio.clamp(-1.0, 1.0).asin().to_degrees() as f32
}

/// Bearing in [0, 360) implied by a pair's lag
pub fn lag_to_bearing(pair: SensorPair, lag_samples: isize, context: &ArrayContext) -> f32 {
    let raw = pair.base_angle_degrees()
        + pair.orientation_sign() * pair_angle_degrees(lag_samples, context);
    normalize_degrees(raw)
}

/// Turn a pair's correlation into a bearing candidate
///
/// # Returns
///
/// `None` if the correlation never rises above its noise floor (a silent channel,
/// or sensors with no overlap at any lag) or has no admissible local maximum.
pub fn estimate_pair(
    pair: SensorPair,
    correlation: &CrossCorrelation,
    context: &ArrayContext,
) -> Option<PairEstimate> {
    let max_abs = correlation.max_abs();
    if !(max_abs > correlation.noise_floor()) {
        log::trace!("Pair {:?}: correlation is within the noise floor", pair);
        return None;
    }

    let peak = find_admissible_peak(correlation, context.max_delay_samples())?;
    let confidence = (peak.value.abs() / max_abs).clamp(0.0, 1.0);
    let angle_degrees = lag_to_bearing(pair, peak.lag, context);

    log::trace!(
        "Pair {:?}: lag={}, angle={:.1}°, confidence={:.3}",
        pair,
        peak.lag,
        angle_degrees,
        confidence
    );

    Some(PairEstimate {
        pair,
        lag_samples: peak.lag,
        angle_degrees,
        confidence,
    })
}
