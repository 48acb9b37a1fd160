//! FFT cross-correlation of sensor pairs
//!
//! For a pair `(first, second)` and window length `N`:
//!
//! `c[lag] = Σ_n x_first[n] · x_second[n + lag]`,  `lag ∈ [-(N-1), N-1]`
//!
//! so the full correlation has `2N - 1` values and a positive lag means the second
//! sensor receives the wavefront `lag` samples after the first.
//!
//! # Algorithm
//!
//! 1. Zero-pad each channel to `M = next_pow2(2N - 1)` (no circular wrap-around)
//! 2. Forward FFT of each channel, once per window, shared by all pairs
//! 3. `r = IFFT(conj(X_first) · X_second) / M`
//! 4. Reorder `r` so negative lags come first
//!
//! Complexity is O(M log M) per channel and per pair instead of O(N²).
//!
//! # Noise floor
//!
//! Lags where the exact correlation is zero come back from the f32 transforms as
//! rounding residue, around `1e-9 · ‖x_first‖ · ‖x_second‖`. Each correlation
//! carries a floor of `NOISE_FLOOR · ‖x_first‖ · ‖x_second‖`; values at or below it
//! are treated as zero by the peak search.

use super::SensorPair;
use crate::io::signal::NUM_CHANNELS;
use crate::io::window_source::AnalysisWindow;
use crate::preprocessing::silence::signal_energy;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Correlation floor relative to `sqrt(E_first · E_second)`
///
/// Well above f32 FFT rounding for the window lengths in use, well below any
/// correlation a real signal produces.
pub const NOISE_FLOOR: f32 = 1e-5;

/// Full cross-correlation of one pair, indexed by signed lag
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCorrelation {
    values: Vec<f32>,
    max_lag: usize,
    noise_floor: f32,
}

impl CrossCorrelation {
    /// Wrap a correlation array of odd length `2 * max_lag + 1`, ordered from lag
    /// `-max_lag` to `+max_lag`
    ///
    /// Returns `None` if the length is even or zero. The noise floor is 0.
    pub fn from_values(values: Vec<f32>) -> Option<Self> {
        if values.len() % 2 == 0 {
            return None;
        }
        let max_lag = values.len() / 2;
        Some(Self {
            values,
            max_lag,
            noise_floor: 0.0,
        })
    }

    /// Replace the noise floor (negative or NaN floors become 0)
    pub fn with_noise_floor(mut self, noise_floor: f32) -> Self {
        self.noise_floor = noise_floor.max(0.0);
        self
    }

    /// Magnitude at or below which a value is indistinguishable from zero
    pub fn noise_floor(&self) -> f32 {
        self.noise_floor
    }

    /// Largest representable lag, `N - 1`
    pub fn max_lag(&self) -> usize {
        self.max_lag
    }

    /// Number of lags, `2N - 1`
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the correlation holds no lags
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values from lag `-(N-1)` to `N-1`
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Array index of a signed lag
    pub fn index_of(&self, lag: isize) -> Option<usize> {
        let index = lag.checked_add(self.max_lag as isize)?;
        usize::try_from(index).ok().filter(|&i| i < self.values.len())
    }

    /// Correlation value at a signed lag
    pub fn at(&self, lag: isize) -> Option<f32> {
        self.index_of(lag).map(|i| self.values[i])
    }

    /// Largest absolute correlation value over all lags
    pub fn max_abs(&self) -> f32 {
        self.values.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()))
    }
}

/// Spectra of the four channels of one window
#[derive(Debug, Clone)]
pub struct ChannelSpectra {
    spectra: [Vec<Complex<f32>>; NUM_CHANNELS],
    energies: [f32; NUM_CHANNELS],
    window_length: usize,
}

impl ChannelSpectra {
    /// Energy of one channel in the window
    pub fn energy(&self, channel: usize) -> f32 {
        self.energies[channel]
    }

    /// True if both channels of the pair carry signal
    pub fn pair_has_energy(&self, pair: SensorPair) -> bool {
        self.energies[pair.first()] > 0.0 && self.energies[pair.second()] > 0.0
    }

    /// Window length the spectra were computed from
    pub fn window_length(&self) -> usize {
        self.window_length
    }
}

/// Cross-correlator planned for one window length
///
/// FFT plans are built once and shared; the correlator is `Send + Sync` and can
/// serve windows from several threads at once.
#[derive(Clone)]
pub struct PairCorrelator {
    window_length: usize,
    fft_size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for PairCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairCorrelator")
            .field("window_length", &self.window_length)
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

impl PairCorrelator {
    /// Plan forward and inverse FFTs for windows of up to `window_length` samples
    pub fn new(window_length: usize) -> Self {
        let fft_size = (2 * window_length.max(1) - 1).next_power_of_two();
        log::debug!(
            "Planning pair correlator: window={}, fft_size={}",
            window_length,
            fft_size
        );

        let mut planner = FftPlanner::new();
        Self {
            window_length,
            fft_size,
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
        }
    }

    /// Longest window this correlator accepts
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// FFT size in use
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Zero-padded spectrum of one channel
    fn spectrum(&self, samples: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> =
            samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));
        self.forward.process(&mut buffer);
        buffer
    }

    /// Forward transforms of all four channels of a window
    ///
    /// Returns `None` if the window is longer than the planned length.
    pub fn spectra(&self, window: &AnalysisWindow<'_>) -> Option<ChannelSpectra> {
        if window.len() > self.window_length {
            log::warn!(
                "Window of {} samples exceeds planned correlator length {}",
                window.len(),
                self.window_length
            );
            return None;
        }

        let channels = window.channels();
        Some(ChannelSpectra {
            spectra: std::array::from_fn(|ch| self.spectrum(channels[ch])),
            energies: std::array::from_fn(|ch| signal_energy(channels[ch])),
            window_length: window.len(),
        })
    }

    /// Full cross-correlation of one pair from precomputed spectra
    pub fn correlate(&self, spectra: &ChannelSpectra, pair: SensorPair) -> CrossCorrelation {
        let first = &spectra.spectra[pair.first()];
        let second = &spectra.spectra[pair.second()];

        let mut product: Vec<Complex<f32>> = first
            .iter()
            .zip(second)
            .map(|(a, b)| a.conj() * b)
            .collect();
        self.inverse.process(&mut product);

        let floor = noise_floor(spectra.energies[pair.first()], spectra.energies[pair.second()]);
        self.unwrap_lags(&product, spectra.window_length, floor)
    }

    /// Full cross-correlation of two equal-length slices
    ///
    /// Convenience for one-off use; the driver goes through [`spectra`](Self::spectra)
    /// so each channel is transformed once per window. Returns `None` if the slices
    /// differ in length or exceed the planned length.
    pub fn correlate_slices(&self, first: &[f32], second: &[f32]) -> Option<CrossCorrelation> {
        if first.len() != second.len() || first.len() > self.window_length {
            return None;
        }

        let a = self.spectrum(first);
        let b = self.spectrum(second);
        let mut product: Vec<Complex<f32>> =
            a.iter().zip(&b).map(|(x, y)| x.conj() * y).collect();
        self.inverse.process(&mut product);

        let floor = noise_floor(signal_energy(first), signal_energy(second));
        Some(self.unwrap_lags(&product, first.len(), floor))
    }

    /// Circular IFFT output → values ordered from lag `-(n-1)` to `n-1`, scaled by 1/M
    fn unwrap_lags(&self, circular: &[Complex<f32>], n: usize, noise_floor: f32) -> CrossCorrelation {
        let scale = 1.0 / self.fft_size as f32;
        let max_lag = n.saturating_sub(1);

        let mut values = Vec::with_capacity(2 * max_lag + 1);
        // Negative lags live at the end of the circular buffer
        values.extend(
            circular[self.fft_size - max_lag..]
                .iter()
                .map(|c| c.re * scale),
        );
        values.extend(circular[..=max_lag].iter().map(|c| c.re * scale));

        CrossCorrelation {
            values,
            max_lag,
            noise_floor,
        }
    }
}

fn noise_floor(energy_first: f32, energy_second: f32) -> f32 {
    NOISE_FLOOR * ((energy_first as f64 * energy_second as f64).sqrt() as f32)
}
