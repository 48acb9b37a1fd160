//! Microphone array geometry
//!
//! Four sensors sit on a ring of fixed radius. The largest delay any two sensors
//! can observe is the time sound needs to cross the ring's diameter:
//! `max_delay = 2 * radius / sound_speed`.
//!
//! Sensors are numbered clockwise starting at the array front:
//!
//! ```text
//!            0 (front, 0°)
//!   3 (270°)       1 (90°)
//!            2 (180°)
//! ```

use crate::error::AnalysisError;

/// Fixed description of the circular array
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayGeometry {
    radius: f32,
    sound_speed: f32,
}

impl ArrayGeometry {
    /// Create a geometry from a ring radius (meters) and speed of sound (m/s)
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfiguration` if either value is not a
    /// finite positive number.
    pub fn new(radius: f32, sound_speed: f32) -> Result<Self, AnalysisError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Array radius must be > 0, got {}",
                radius
            )));
        }

        if !sound_speed.is_finite() || sound_speed <= 0.0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Speed of sound must be > 0, got {}",
                sound_speed
            )));
        }

        Ok(Self {
            radius,
            sound_speed,
        })
    }

    /// Ring radius in meters
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Speed of sound in m/s
    pub fn sound_speed(&self) -> f32 {
        self.sound_speed
    }

    /// Largest physically possible inter-sensor delay in seconds
    pub fn max_delay_seconds(&self) -> f64 {
        2.0 * self.radius as f64 / self.sound_speed as f64
    }
}

impl Default for ArrayGeometry {
    /// ReSpeaker v2.0: 32 mm radius, 343 m/s
    fn default() -> Self {
        Self {
            radius: 0.032,
            sound_speed: 343.0,
        }
    }
}

/// Geometry and sample rate travelling together through the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrayContext {
    /// Array geometry
    pub geometry: ArrayGeometry,
    /// Sample rate of the analyzed signal in Hz
    pub sample_rate: u32,
}

impl ArrayContext {
    /// Bind a geometry to a sample rate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate is 0.
    pub fn new(geometry: ArrayGeometry, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        Ok(Self {
            geometry,
            sample_rate,
        })
    }

    /// Largest admissible correlation lag: `floor(max_delay_seconds * sample_rate)`
    pub fn max_delay_samples(&self) -> usize {
        (self.geometry.max_delay_seconds() * self.sample_rate as f64).floor() as usize
    }

    /// Shortest window that still holds the whole admissible lag range
    pub fn min_window_length(&self) -> usize {
        2 * self.max_delay_samples() + 1
    }
}
