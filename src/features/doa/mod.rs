//! Direction-of-arrival estimation
//!
//! Per analysis window, every adjacent microphone pair on the ring is
//! cross-correlated, the strongest physically admissible lag is converted into a
//! candidate bearing, and the (up to four) candidates are fused into one bearing
//! with a confidence score:
//!
//! ```text
//! window → spectra → {cross-correlation → admissible peak → angle + confidence} × 4 → fusion
//! ```
//!
//! - [`geometry`]: ring radius, speed of sound, maximum delay
//! - [`correlation`]: FFT cross-correlation of a sensor pair
//! - [`peak_picking`]: local-maximum search inside the admissible lag range
//! - [`angle`]: lag → bearing and confidence
//! - [`fusion`]: confidence-weighted combination and direction label

pub mod angle;
pub mod correlation;
pub mod fusion;
pub mod geometry;
pub mod peak_picking;

/// Two adjacent sensors on the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorPair {
    first: usize,
    second: usize,
}

impl SensorPair {
    /// The four adjacent pairs around the ring: (0,1), (1,2), (2,3), (3,0)
    pub const ADJACENT: [SensorPair; 4] = [
        SensorPair { first: 0, second: 1 },
        SensorPair { first: 1, second: 2 },
        SensorPair { first: 2, second: 3 },
        SensorPair { first: 3, second: 0 },
    ];

    /// Sensor the lag is measured from
    pub fn first(&self) -> usize {
        self.first
    }

    /// Sensor the lag is measured to
    pub fn second(&self) -> usize {
        self.second
    }

    /// Bearing the pair's estimate is anchored to: `first * 90`
    pub fn base_angle_degrees(&self) -> f32 {
        (self.first * 90) as f32
    }

    /// +1 for the front-back class (even `first`), -1 for the left-right class (odd `first`)
    pub fn orientation_sign(&self) -> f32 {
        if self.first % 2 == 0 {
            1.0
        } else {
            -1.0
        }
    }
}

/// Candidate bearing from one sensor pair in one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEstimate {
    /// Pair the estimate comes from
    pub pair: SensorPair,

    /// Selected lag in samples; positive when the second sensor hears the wavefront later
    pub lag_samples: isize,

    /// Candidate bearing in degrees, [0, 360)
    pub angle_degrees: f32,

    /// Peak dominance in [0, 1]
    pub confidence: f32,
}
