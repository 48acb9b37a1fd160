//! Energy gating of analysis windows
//!
//! A window whose total squared-sample energy (summed over all four channels) does
//! not exceed the threshold carries no usable direction information and is skipped
//! outright: it produces no estimate at all, not a zero-confidence one.

use crate::io::window_source::AnalysisWindow;

/// Sum of squared samples
pub fn signal_energy(samples: &[f32]) -> f32 {
    samples.iter().map(|&x| x * x).sum()
}

/// Total energy of a window across all four channels
pub fn window_energy(window: &AnalysisWindow<'_>) -> f32 {
    window.channels().iter().map(|ch| signal_energy(ch)).sum()
}

/// Energy gate configuration
#[derive(Debug, Clone, Copy)]
pub struct EnergyGate {
    /// Energy a window must exceed to be analyzed (default: 1e-6)
    pub threshold: f32,
}

impl Default for EnergyGate {
    fn default() -> Self {
        Self { threshold: 1e-6 }
    }
}

impl EnergyGate {
    /// True if the window carries enough energy to analyze
    ///
    /// Returns the measured energy alongside the decision for logging.
    pub fn admit(&self, window: &AnalysisWindow<'_>) -> (bool, f32) {
        let energy = window_energy(window);
        (energy > self.threshold, energy)
    }
}
