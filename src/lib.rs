//! # Stratum DOA
//!
//! Direction-of-arrival estimation for a four-microphone circular array
//! (ReSpeaker-style ring), from time differences of arrival between adjacent
//! microphone pairs.
//!
//! ## Features
//!
//! - **Windowing**: overlapping fixed-length windows over a complete recording or a
//!   live feed
//! - **Pair correlation**: FFT cross-correlation of the four adjacent pairs
//! - **Peak picking**: strongest local maximum inside the physically admissible lag range
//! - **Fusion**: confidence-weighted circular mean and a coarse compass label
//! - **Parallelism**: windows dispatched to rayon with ordered output
//!
//! ## Quick Start
//!
//! ```
//! use stratum_doa::{analyze_doa, AnalysisConfig, Signal};
//!
//! // Interleaved four-channel samples, normalized to [-1.0, 1.0]
//! let samples = vec![0.0f32; 4 * 16000];
//! let signal = Signal::from_interleaved(&samples, 4, 16000)?;
//!
//! let analysis = analyze_doa(&signal, AnalysisConfig::default())?;
//! for estimate in &analysis.estimates {
//!     println!(
//!         "{:.3}s {:6.1}° {:.2} {}",
//!         estimate.timestamp_seconds, estimate.angle_degrees, estimate.confidence, estimate.direction
//!     );
//! }
//! // Silence yields nothing
//! assert!(analysis.estimates.is_empty());
//! # Ok::<(), stratum_doa::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal → Windows → Energy gate → Pair correlation ×4 → Peak → Angle → Fusion → Estimate
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use analysis::driver::{DoaAnalyzer, DriverState, ReorderBuffer, StreamingAnalyzer};
pub use analysis::metadata::{AnalysisMetadata, WindowStats};
pub use analysis::result::{DirectionLabel, DoaAnalysis, DoaEstimate};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use features::doa::fusion::FusionMethod;
pub use features::doa::geometry::{ArrayContext, ArrayGeometry};
pub use io::signal::Signal;
pub use io::window_source::{WindowPlan, WindowSource};
pub use preprocessing::channel_mixer::CaptureLayout;

/// Main analysis function
///
/// Slices the signal into overlapping windows and returns one direction estimate
/// per window that is not silent and yields at least one pair estimate.
///
/// # Arguments
///
/// * `signal` - Four-channel signal, microphones in ring order
/// * `config` - Analysis configuration parameters
///
/// # Returns
///
/// `DoaAnalysis` with estimates in timestamp order and run metadata. A signal
/// shorter than one window gives an empty estimate list.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfiguration` if the configuration is invalid or
/// the window cannot hold the admissible lag range at the signal's sample rate.
///
/// # Example
///
/// ```
/// use stratum_doa::{analyze_doa, AnalysisConfig, DirectionLabel, Signal};
///
/// // Same noise on every microphone: zero lag on every pair
/// let mut state = 12345u32;
/// let noise: Vec<f32> = (0..8192)
///     .map(|_| {
///         state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
///         (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
///     })
///     .collect();
/// let signal = Signal::from_planar(vec![noise.clone(), noise.clone(), noise.clone(), noise], 16000)?;
///
/// let analysis = analyze_doa(&signal, AnalysisConfig::default())?;
/// assert_eq!(analysis.estimates.len(), 3);
/// assert!(analysis.estimates.iter().all(|e| e.direction == DirectionLabel::North));
/// # Ok::<(), stratum_doa::AnalysisError>(())
/// ```
pub fn analyze_doa(signal: &Signal, config: AnalysisConfig) -> Result<DoaAnalysis, AnalysisError> {
    use std::time::Instant;
    let start_time = Instant::now();

    log::debug!(
        "Starting DOA analysis: {} samples x 4 channels at {} Hz (window={}, overlap={}, fusion={:?})",
        signal.len(),
        signal.sample_rate(),
        config.window_length,
        config.overlap,
        config.fusion
    );

    let plan = config.window_plan()?;
    let mut analyzer = DoaAnalyzer::new(&config, signal.sample_rate())?;

    if signal.len() < plan.window_length() {
        log::warn!(
            "Signal of {} samples is shorter than one window ({}), no estimates",
            signal.len(),
            plan.window_length()
        );
    }

    let estimates = if config.parallel {
        analyzer.analyze_signal_parallel(signal, plan)?
    } else {
        analyzer.analyze_signal(signal, plan)?
    };

    let stats = analyzer.stats();
    let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::debug!(
        "DOA analysis done: {} estimates from {} windows ({} silent, {} without estimate) in {:.1} ms",
        estimates.len(),
        stats.windows_total,
        stats.windows_silent,
        stats.windows_without_estimate,
        processing_time_ms
    );

    Ok(DoaAnalysis {
        estimates,
        metadata: AnalysisMetadata {
            duration_seconds: signal.duration_seconds(),
            sample_rate: signal.sample_rate(),
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            window_length: plan.window_length(),
            hop_size: plan.hop_size(),
            max_delay_samples: analyzer.processor().context().max_delay_samples(),
            fusion: config.fusion,
            windows: stats,
        },
    })
}
