//! Analysis result types

use super::metadata::AnalysisMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse compass direction relative to the array front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionLabel {
    /// [315°, 360°) ∪ [0°, 45°): array front
    North,
    /// [45°, 135°)
    East,
    /// [135°, 225°)
    South,
    /// [225°, 315°)
    West,
    /// Confidence too low to name a direction
    Unknown,
}

impl DirectionLabel {
    /// Classify a bearing
    ///
    /// A confidence at or below `confidence_threshold` gives `Unknown`; otherwise the
    /// quadrant centred on each compass point decides.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_doa::DirectionLabel;
    ///
    /// assert_eq!(DirectionLabel::classify(44.9, 0.9, 0.3), DirectionLabel::North);
    /// assert_eq!(DirectionLabel::classify(45.0, 0.9, 0.3), DirectionLabel::East);
    /// assert_eq!(DirectionLabel::classify(300.0, 0.9, 0.3), DirectionLabel::West);
    /// assert_eq!(DirectionLabel::classify(180.0, 0.3, 0.3), DirectionLabel::Unknown);
    /// ```
    pub fn classify(angle_degrees: f32, confidence: f32, confidence_threshold: f32) -> Self {
        if confidence <= confidence_threshold {
            return DirectionLabel::Unknown;
        }

        if (45.0..135.0).contains(&angle_degrees) {
            DirectionLabel::East
        } else if (135.0..225.0).contains(&angle_degrees) {
            DirectionLabel::South
        } else if (225.0..315.0).contains(&angle_degrees) {
            DirectionLabel::West
        } else {
            DirectionLabel::North
        }
    }

    /// Label name ("North", "East", "South", "West", "Unknown")
    pub fn name(&self) -> &'static str {
        match self {
            DirectionLabel::North => "North",
            DirectionLabel::East => "East",
            DirectionLabel::South => "South",
            DirectionLabel::West => "West",
            DirectionLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction estimate for one analysis window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoaEstimate {
    /// Position of the window in the window sequence
    pub window_index: usize,

    /// Start of the window in seconds
    pub timestamp_seconds: f32,

    /// Bearing in degrees, [0, 360), 0 = array front, clockwise
    pub angle_degrees: f32,

    /// Mean pair confidence (0.0-1.0)
    pub confidence: f32,

    /// Coarse direction label
    pub direction: DirectionLabel,

    /// Number of sensor pairs that contributed (1-4)
    pub pair_count: usize,
}

/// Estimates for a whole signal plus run metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoaAnalysis {
    /// One estimate per non-silent window with at least one pair estimate, in
    /// timestamp order
    pub estimates: Vec<DoaEstimate>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}
