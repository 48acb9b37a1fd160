//! Analysis driver
//!
//! Runs the per-window pipeline over a window source and collects estimates in
//! window order.
//!
//! # State machine
//!
//! ```text
//! Idle → Windowing → ┬→ Correlating → Estimating → Fusing → Emitting ┐→ Done
//!                    │        (energy gate failed: skip)              │
//!                    └────────────────────────────────────────────────┘
//! ```
//!
//! Windows never depend on each other, so [`DoaAnalyzer::analyze_signal_parallel`]
//! hands them to rayon. Results come back in window order either way; producers
//! that complete windows out of order can restore the order through a
//! [`ReorderBuffer`].

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::features::doa::angle::estimate_pair;
use crate::features::doa::correlation::PairCorrelator;
use crate::features::doa::fusion::{fuse, FusionMethod};
use crate::features::doa::geometry::ArrayContext;
use crate::features::doa::{PairEstimate, SensorPair};
use crate::io::signal::{Signal, NUM_CHANNELS};
use crate::io::window_source::{AnalysisWindow, StreamingWindows, WindowPlan, WindowSource};
use crate::preprocessing::silence::EnergyGate;
use rayon::prelude::*;
use std::collections::BTreeMap;

use super::metadata::WindowStats;
use super::result::DoaEstimate;

/// Driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Nothing processed yet
    Idle,
    /// Pulling the next window from the source
    Windowing,
    /// Cross-correlating sensor pairs
    Correlating,
    /// Converting correlation peaks into pair bearings
    Estimating,
    /// Combining pair bearings
    Fusing,
    /// Handing the estimate to the caller
    Emitting,
    /// Source exhausted
    Done,
}

/// What became of one window
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// Energy at or below the gate threshold; no estimate
    Silent {
        /// Measured window energy
        energy: f32,
    },
    /// No sensor pair produced an admissible peak
    NoEstimate,
    /// Fused estimate
    Estimate(DoaEstimate),
}

impl WindowOutcome {
    /// The estimate, if any
    pub fn into_estimate(self) -> Option<DoaEstimate> {
        match self {
            WindowOutcome::Estimate(estimate) => Some(estimate),
            _ => None,
        }
    }
}

/// Stateless per-window pipeline
///
/// Shared read-only by every worker; holds the array context, the FFT plans and the
/// thresholds.
#[derive(Debug, Clone)]
pub struct WindowProcessor {
    context: ArrayContext,
    correlator: PairCorrelator,
    gate: EnergyGate,
    fusion: FusionMethod,
    confidence_threshold: f32,
}

impl WindowProcessor {
    /// Build the pipeline for a configuration and a sample rate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfiguration` if the configuration is invalid
    /// or the window is shorter than `2 * max_delay_samples + 1`, and
    /// `AnalysisError::InvalidInput` if the sample rate is 0.
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self, AnalysisError> {
        config.validate()?;
        let context = ArrayContext::new(config.geometry()?, sample_rate)?;

        if config.window_length < context.min_window_length() {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Window of {} samples cannot hold the admissible lag range ±{} (need >= {})",
                config.window_length,
                context.max_delay_samples(),
                context.min_window_length()
            )));
        }

        Ok(Self {
            context,
            correlator: PairCorrelator::new(config.window_length),
            gate: EnergyGate {
                threshold: config.energy_threshold,
            },
            fusion: config.fusion,
            confidence_threshold: config.confidence_threshold,
        })
    }

    /// Geometry and sample rate in use
    pub fn context(&self) -> &ArrayContext {
        &self.context
    }

    /// Process one window
    pub fn process(&self, window: &AnalysisWindow<'_>) -> WindowOutcome {
        self.process_with(window, &mut |_| {})
    }

    fn process_with(
        &self,
        window: &AnalysisWindow<'_>,
        on_stage: &mut dyn FnMut(DriverState),
    ) -> WindowOutcome {
        let (admitted, energy) = self.gate.admit(window);
        if !admitted {
            log::trace!(
                "Window {} at {:.3}s skipped: energy {:.3e} <= {:.3e}",
                window.index(),
                window.timestamp_seconds(),
                energy,
                self.gate.threshold
            );
            return WindowOutcome::Silent { energy };
        }

        on_stage(DriverState::Correlating);
        let Some(spectra) = self.correlator.spectra(window) else {
            return WindowOutcome::NoEstimate;
        };
        let correlations: Vec<_> = SensorPair::ADJACENT
            .iter()
            .filter(|&&pair| {
                let live = spectra.pair_has_energy(pair);
                if !live {
                    log::trace!("Window {}: pair {:?} has a silent channel", window.index(), pair);
                }
                live
            })
            .map(|&pair| (pair, self.correlator.correlate(&spectra, pair)))
            .collect();

        on_stage(DriverState::Estimating);
        let estimates: Vec<PairEstimate> = correlations
            .iter()
            .filter_map(|(pair, correlation)| estimate_pair(*pair, correlation, &self.context))
            .collect();

        on_stage(DriverState::Fusing);
        let Some(fused) = fuse(&estimates, self.fusion, self.confidence_threshold) else {
            log::trace!("Window {}: no pair estimate", window.index());
            return WindowOutcome::NoEstimate;
        };

        on_stage(DriverState::Emitting);
        WindowOutcome::Estimate(DoaEstimate {
            window_index: window.index(),
            timestamp_seconds: window.timestamp_seconds(),
            angle_degrees: fused.angle_degrees,
            confidence: fused.confidence,
            direction: fused.direction,
            pair_count: fused.pair_count,
        })
    }
}

/// Sequential / parallel driver over window sources
#[derive(Debug, Clone)]
pub struct DoaAnalyzer {
    processor: WindowProcessor,
    window_length: usize,
    state: DriverState,
    stats: WindowStats,
}

impl DoaAnalyzer {
    /// Create a driver for signals at `sample_rate`
    ///
    /// # Errors
    ///
    /// Same as [`WindowProcessor::new`].
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self, AnalysisError> {
        Ok(Self {
            processor: WindowProcessor::new(config, sample_rate)?,
            window_length: config.window_length,
            state: DriverState::Idle,
            stats: WindowStats::default(),
        })
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Window accounting since construction
    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// The per-window pipeline
    pub fn processor(&self) -> &WindowProcessor {
        &self.processor
    }

    fn enter(&mut self, state: DriverState) {
        log::trace!("Driver {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn record(&mut self, outcome: &WindowOutcome) {
        self.stats.windows_total += 1;
        match outcome {
            WindowOutcome::Silent { .. } => self.stats.windows_silent += 1,
            WindowOutcome::NoEstimate => self.stats.windows_without_estimate += 1,
            WindowOutcome::Estimate(_) => self.stats.estimates_emitted += 1,
        }
    }

    /// Run one window through the pipeline, updating state and counters
    pub fn process_window(&mut self, window: &AnalysisWindow<'_>) -> Option<DoaEstimate> {
        self.enter(DriverState::Windowing);

        let mut stages = Vec::with_capacity(4);
        let outcome = self
            .processor
            .process_with(window, &mut |stage| stages.push(stage));
        for stage in stages {
            self.enter(stage);
        }

        self.record(&outcome);
        outcome.into_estimate()
    }

    fn check_source(&self, sample_rate: u32, window_length: usize) -> Result<(), AnalysisError> {
        if sample_rate != self.processor.context().sample_rate {
            return Err(AnalysisError::InvalidInput(format!(
                "Source sample rate {} Hz does not match analyzer rate {} Hz",
                sample_rate,
                self.processor.context().sample_rate
            )));
        }
        if window_length != self.window_length {
            return Err(AnalysisError::InvalidInput(format!(
                "Source window length {} does not match analyzer window length {}",
                window_length, self.window_length
            )));
        }
        Ok(())
    }

    /// Drain a window source sequentially
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the source's sample rate or window
    /// length differs from the analyzer's.
    pub fn analyze_source<S: WindowSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<DoaEstimate>, AnalysisError> {
        self.check_source(source.sample_rate(), source.window_length())?;

        let mut estimates = Vec::new();
        loop {
            self.enter(DriverState::Windowing);
            let Some(window) = source.next_window() else {
                break;
            };
            if let Some(estimate) = self.process_window(&window) {
                estimates.push(estimate);
            }
        }

        self.enter(DriverState::Done);
        Ok(estimates)
    }

    /// Analyze a complete signal on the current thread
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the plan or the signal does not match the analyzer.
    pub fn analyze_signal(
        &mut self,
        signal: &Signal,
        plan: WindowPlan,
    ) -> Result<Vec<DoaEstimate>, AnalysisError> {
        let mut windows = plan.windows(signal);
        self.analyze_source(&mut windows)
    }

    /// Analyze a complete signal with windows spread over the rayon thread pool
    ///
    /// Produces exactly the same estimates, in the same order, as
    /// [`analyze_signal`](Self::analyze_signal).
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError` if the plan or the signal does not match the analyzer.
    pub fn analyze_signal_parallel(
        &mut self,
        signal: &Signal,
        plan: WindowPlan,
    ) -> Result<Vec<DoaEstimate>, AnalysisError> {
        self.check_source(signal.sample_rate(), plan.window_length())?;
        self.enter(DriverState::Windowing);

        let windows = plan.windows(signal);
        let processor = &self.processor;
        let outcomes: Vec<(usize, WindowOutcome)> = (0..windows.len())
            .into_par_iter()
            .filter_map(|index| {
                windows
                    .get(index)
                    .map(|window| (index, processor.process(&window)))
            })
            .collect();

        let mut reorder = ReorderBuffer::new();
        let mut estimates = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes {
            self.record(&outcome);
            reorder.push(index, outcome.into_estimate());
            estimates.extend(reorder.drain_ready());
        }

        self.enter(DriverState::Done);
        Ok(estimates)
    }
}

/// Restores window order for results that complete out of order
///
/// Every window index must be reported exactly once, with `None` for windows that
/// produced no estimate, so the buffer knows when a gap is final.
#[derive(Debug, Clone, Default)]
pub struct ReorderBuffer {
    next_index: usize,
    pending: BTreeMap<usize, Option<DoaEstimate>>,
}

impl ReorderBuffer {
    /// Empty buffer expecting window 0 first
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the result of window `index`
    ///
    /// Duplicate or already released indices are ignored.
    pub fn push(&mut self, index: usize, result: Option<DoaEstimate>) {
        if index < self.next_index || self.pending.contains_key(&index) {
            log::warn!("Window {} reported twice, ignoring", index);
            return;
        }
        self.pending.insert(index, result);
    }

    /// Next estimate whose predecessors have all been reported
    pub fn pop_ready(&mut self) -> Option<DoaEstimate> {
        while let Some(result) = self.pending.remove(&self.next_index) {
            self.next_index += 1;
            if result.is_some() {
                return result;
            }
        }
        None
    }

    /// All estimates that can be released now, in window order
    pub fn drain_ready(&mut self) -> Vec<DoaEstimate> {
        std::iter::from_fn(|| self.pop_ready()).collect()
    }

    /// Windows waiting for a predecessor
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Release everything still held, in window order, skipping missing windows
    pub fn finish(self) -> Vec<DoaEstimate> {
        if !self.pending.is_empty() {
            log::debug!(
                "Reorder buffer finished with {} windows past a gap at {}",
                self.pending.len(),
                self.next_index
            );
        }
        self.pending.into_values().flatten().collect()
    }
}

/// Merge `(window_index, result)` pairs reported in any order into window order
pub fn merge_out_of_order<I>(results: I) -> Vec<DoaEstimate>
where
    I: IntoIterator<Item = (usize, Option<DoaEstimate>)>,
{
    let mut buffer = ReorderBuffer::new();
    let mut merged = Vec::new();
    for (index, result) in results {
        buffer.push(index, result);
        merged.extend(buffer.drain_ready());
    }
    merged.extend(buffer.finish());
    merged
}

/// Incremental analysis of a live four-channel feed
///
/// Memory stays bounded by one window per channel regardless of how much audio is
/// pushed. Timestamps count from the first frame pushed.
#[derive(Debug, Clone)]
pub struct StreamingAnalyzer {
    analyzer: DoaAnalyzer,
    windows: StreamingWindows,
}

impl StreamingAnalyzer {
    /// Create a streaming analyzer for a feed at `sample_rate`
    ///
    /// # Errors
    ///
    /// Same as [`DoaAnalyzer::new`].
    pub fn new(config: &AnalysisConfig, sample_rate: u32) -> Result<Self, AnalysisError> {
        let analyzer = DoaAnalyzer::new(config, sample_rate)?;
        let plan = config.window_plan()?;
        Ok(Self {
            analyzer,
            windows: StreamingWindows::new(plan, sample_rate)?,
        })
    }

    /// Feed frames; returns the estimates of every window completed by them
    pub fn push_frames(&mut self, frames: &[[f32; NUM_CHANNELS]]) -> Vec<DoaEstimate> {
        let mut estimates = Vec::new();
        let mut rest = frames;
        loop {
            let taken = self.windows.push(rest);
            rest = &rest[taken..];

            while let Some(window) = self.windows.next_window() {
                if let Some(estimate) = self.analyzer.process_window(&window) {
                    estimates.push(estimate);
                }
            }

            if rest.is_empty() {
                break;
            }
        }
        estimates
    }

    /// Feed interleaved four-channel samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the buffer is not a whole number of
    /// four-channel frames.
    pub fn push_interleaved(&mut self, samples: &[f32]) -> Result<Vec<DoaEstimate>, AnalysisError> {
        if samples.len() % NUM_CHANNELS != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Interleaved buffer of {} samples is not a whole number of {}-channel frames",
                samples.len(),
                NUM_CHANNELS
            )));
        }

        let frames: Vec<[f32; NUM_CHANNELS]> = samples
            .chunks_exact(NUM_CHANNELS)
            .map(|frame| [frame[0], frame[1], frame[2], frame[3]])
            .collect();
        Ok(self.push_frames(&frames))
    }

    /// Window accounting so far
    pub fn stats(&self) -> WindowStats {
        self.analyzer.stats()
    }

    /// Driver state after the last window
    pub fn state(&self) -> DriverState {
        self.analyzer.state()
    }

    /// Frames waiting for the next window to complete
    pub fn buffered(&self) -> usize {
        self.windows.buffered()
    }
}
