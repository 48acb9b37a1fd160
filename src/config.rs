//! Configuration parameters for direction-of-arrival analysis

use crate::error::AnalysisError;
use crate::features::doa::fusion::FusionMethod;
use crate::features::doa::geometry::ArrayGeometry;
use crate::io::window_source::WindowPlan;
use serde::{Deserialize, Serialize};

/// Analysis configuration parameters
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Windowing
    /// Analysis window length in samples (default: 4096)
    pub window_length: usize,

    /// Fraction of each window shared with the next one, in [0, 1) (default: 0.5)
    pub overlap: f32,

    // Gating and classification
    /// Total squared-sample energy (all four channels) a window must exceed to be
    /// analyzed (default: 1e-6)
    pub energy_threshold: f32,

    /// Fused confidence at or below which the direction label is `Unknown` (default: 0.3)
    pub confidence_threshold: f32,

    // Array geometry
    /// Radius of the microphone ring in meters (default: 0.032, ReSpeaker v2.0)
    pub radius: f32,

    /// Speed of sound in m/s (default: 343.0)
    pub sound_speed: f32,

    // Fusion
    /// How pair angles are averaged (default: Circular)
    pub fusion: FusionMethod,

    /// Dispatch windows to the rayon thread pool (default: false)
    ///
    /// Output is identical either way; estimates always come back in window order.
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_length: 4096,
            overlap: 0.5,
            energy_threshold: 1e-6,
            confidence_threshold: 0.3,
            radius: 0.032,
            sound_speed: 343.0,
            fusion: FusionMethod::Circular,
            parallel: false,
        }
    }
}

impl AnalysisConfig {
    /// Window plan described by this configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfiguration` under the same conditions as
    /// [`WindowPlan::new`].
    pub fn window_plan(&self) -> Result<WindowPlan, AnalysisError> {
        WindowPlan::new(self.window_length, self.overlap)
    }

    /// Hop size between consecutive windows: `round(window_length * (1 - overlap))`
    ///
    /// 0 when the window length or overlap is invalid.
    pub fn hop_size(&self) -> usize {
        self.window_plan().map(|plan| plan.hop_size()).unwrap_or(0)
    }

    /// Array geometry described by this configuration
    pub fn geometry(&self) -> Result<ArrayGeometry, AnalysisError> {
        ArrayGeometry::new(self.radius, self.sound_speed)
    }

    /// Check every parameter that does not depend on the signal
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfiguration` if the window length is 0, the
    /// overlap is outside [0, 1), the hop size rounds to 0, the geometry is not
    /// physical, or a threshold is negative / non-finite.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.window_plan()?;

        if !self.energy_threshold.is_finite() || self.energy_threshold < 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Energy threshold must be finite and >= 0, got {}",
                self.energy_threshold
            )));
        }

        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Confidence threshold must be finite and >= 0, got {}",
                self.confidence_threshold
            )));
        }

        self.geometry()?;

        Ok(())
    }
}
