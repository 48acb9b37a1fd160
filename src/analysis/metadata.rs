//! Analysis metadata structures

use crate::features::doa::fusion::FusionMethod;
use serde::{Deserialize, Serialize};

/// What happened to the windows of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Windows read from the source
    pub windows_total: usize,

    /// Windows skipped by the energy gate
    pub windows_silent: usize,

    /// Windows that passed the gate but yielded no pair estimate
    pub windows_without_estimate: usize,

    /// Estimates emitted
    pub estimates_emitted: usize,
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Signal duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Analysis window length in samples
    pub window_length: usize,

    /// Hop between windows in samples
    pub hop_size: usize,

    /// Largest admissible correlation lag in samples
    pub max_delay_samples: usize,

    /// Bearing averaging method
    pub fusion: FusionMethod,

    /// Window accounting
    pub windows: WindowStats,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            window_length: 0,
            hop_size: 0,
            max_delay_samples: 0,
            fusion: FusionMethod::default(),
            windows: WindowStats::default(),
        }
    }
}
