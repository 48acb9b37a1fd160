//! Error types for the direction-of-arrival engine

use std::fmt;

/// Errors that can occur during direction-of-arrival analysis
///
/// Only structural problems abort a run. Per-window degeneracies (silent windows,
/// zero-energy pairs, missing correlation peaks) are recovered locally and never
/// surface as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input signal (wrong channel count, empty, bad sample rate)
    InvalidInput(String),

    /// Invalid configuration (window, overlap, hop, geometry, thresholds)
    InvalidConfiguration(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}
