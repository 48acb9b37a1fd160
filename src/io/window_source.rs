//! Analysis windows and the sources that produce them
//!
//! A window is a borrowed, four-channel, fixed-length slice of audio with a known
//! position in the stream. Two sources produce windows:
//!
//! - [`SignalWindows`]: lazy, finite, restartable slicing of a complete [`Signal`]
//! - [`StreamingWindows`]: bounded ring buffer fed with live frames, emitting a window
//!   each time one is complete
//!
//! Both step by `hop_size = round(window_length * (1 - overlap))` and implement
//! [`WindowSource`], so the driver does not care which one it is reading.
//!
//! # Example
//!
//! ```
//! use stratum_doa::io::signal::Signal;
//! use stratum_doa::io::window_source::WindowPlan;
//!
//! let signal = Signal::from_frames(&vec![[0.0f32; 4]; 10_000], 16000)?;
//! let plan = WindowPlan::new(4096, 0.5)?;
//! let windows = plan.windows(&signal);
//! // floor((10000 - 4096) / 2048) + 1
//! assert_eq!(windows.len(), 3);
//! # Ok::<(), stratum_doa::AnalysisError>(())
//! ```

use super::signal::{Signal, NUM_CHANNELS};
use crate::error::AnalysisError;
use std::collections::VecDeque;

/// Borrowed view of one analysis window
#[derive(Debug, Clone, Copy)]
pub struct AnalysisWindow<'a> {
    index: usize,
    start_sample: u64,
    sample_rate: u32,
    channels: [&'a [f32]; NUM_CHANNELS],
}

impl<'a> AnalysisWindow<'a> {
    pub(crate) fn new(
        index: usize,
        start_sample: u64,
        sample_rate: u32,
        channels: [&'a [f32]; NUM_CHANNELS],
    ) -> Self {
        Self {
            index,
            start_sample,
            sample_rate,
            channels,
        }
    }

    /// Position of this window in the window sequence (0-based)
    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the window's first sample in the whole stream
    pub fn start_sample(&self) -> u64 {
        self.start_sample
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window length in samples
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True if the window holds no samples
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    /// Samples of one channel
    ///
    /// # Panics
    ///
    /// Panics if `index >= 4`.
    pub fn channel(&self, index: usize) -> &'a [f32] {
        self.channels[index]
    }

    /// All four channels
    pub fn channels(&self) -> &[&'a [f32]; NUM_CHANNELS] {
        &self.channels
    }

    /// `start_sample / sample_rate`
    pub fn timestamp_seconds(&self) -> f32 {
        (self.start_sample as f64 / self.sample_rate as f64) as f32
    }
}

/// Window length and hop, validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    window_length: usize,
    hop_size: usize,
}

impl WindowPlan {
    /// Plan windows of `window_length` samples overlapping by `overlap`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfiguration` if the window length is 0, the
    /// overlap is outside [0, 1), or the hop size rounds to 0.
    pub fn new(window_length: usize, overlap: f32) -> Result<Self, AnalysisError> {
        if window_length == 0 {
            return Err(AnalysisError::InvalidConfiguration(
                "Window length must be > 0".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&overlap) {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Overlap must be in [0, 1), got {}",
                overlap
            )));
        }

        let hop_size = (window_length as f64 * (1.0 - overlap as f64)).round() as usize;
        if hop_size == 0 {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Hop size resolves to 0 (window length {}, overlap {})",
                window_length, overlap
            )));
        }

        Ok(Self {
            window_length,
            hop_size,
        })
    }

    /// Window length in samples
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Samples between consecutive window starts
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Number of complete windows in `num_samples` samples
    ///
    /// `floor((num_samples - window_length) / hop_size) + 1`, or 0 when the signal is
    /// shorter than one window.
    pub fn window_count(&self, num_samples: usize) -> usize {
        if num_samples < self.window_length {
            0
        } else {
            (num_samples - self.window_length) / self.hop_size + 1
        }
    }

    /// First sample of window number `index`
    pub fn window_start(&self, index: usize) -> usize {
        index * self.hop_size
    }

    /// Lazily slice a signal into windows
    pub fn windows<'a>(&self, signal: &'a Signal) -> SignalWindows<'a> {
        SignalWindows {
            signal,
            plan: *self,
            next: 0,
            count: self.window_count(signal.len()),
        }
    }
}

/// Anything that hands out analysis windows one at a time
pub trait WindowSource {
    /// Sample rate of the windows produced
    fn sample_rate(&self) -> u32;

    /// Window length in samples
    fn window_length(&self) -> usize;

    /// Next complete window, or `None` when none is available (yet)
    fn next_window(&mut self) -> Option<AnalysisWindow<'_>>;
}

/// Windows over a complete signal
#[derive(Debug, Clone)]
pub struct SignalWindows<'a> {
    signal: &'a Signal,
    plan: WindowPlan,
    next: usize,
    count: usize,
}

impl<'a> SignalWindows<'a> {
    /// Start again from the first window
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Window number `index`, independent of the iteration position
    pub fn get(&self, index: usize) -> Option<AnalysisWindow<'a>> {
        if index >= self.count {
            return None;
        }
        self.signal
            .window(index, self.plan.window_start(index), self.plan.window_length())
    }

    /// Total number of windows in the signal
    pub fn count_total(&self) -> usize {
        self.count
    }
}

impl<'a> Iterator for SignalWindows<'a> {
    type Item = AnalysisWindow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let window = self.get(self.next)?;
        self.next += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SignalWindows<'_> {}

impl WindowSource for SignalWindows<'_> {
    fn sample_rate(&self) -> u32 {
        self.signal.sample_rate()
    }

    fn window_length(&self) -> usize {
        self.plan.window_length()
    }

    fn next_window(&mut self) -> Option<AnalysisWindow<'_>> {
        self.next()
    }
}

/// Incremental window source backed by a bounded ring buffer
///
/// Holds at most `window_length` frames. Feed it with [`push`](Self::push) and drain
/// it with [`next_window`](WindowSource::next_window); the hop is released lazily on
/// the next call so the emitted window can borrow the buffer.
#[derive(Debug, Clone)]
pub struct StreamingWindows {
    plan: WindowPlan,
    sample_rate: u32,
    buffers: [VecDeque<f32>; NUM_CHANNELS],
    /// Stream position of the first buffered frame
    buffer_start: u64,
    next_index: usize,
    release_pending: bool,
}

impl StreamingWindows {
    /// Create an empty streaming source
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate is 0.
    pub fn new(plan: WindowPlan, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        let capacity = plan.window_length();
        Ok(Self {
            plan,
            sample_rate,
            buffers: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
            buffer_start: 0,
            next_index: 0,
            release_pending: false,
        })
    }

    /// Maximum number of buffered frames
    pub fn capacity(&self) -> usize {
        self.plan.window_length()
    }

    /// Frames currently buffered
    pub fn buffered(&self) -> usize {
        self.buffers[0].len()
    }

    /// Number of windows emitted so far
    pub fn windows_emitted(&self) -> usize {
        self.next_index
    }

    /// Append as many frames as fit, returning how many were taken
    ///
    /// Returns 0 only when a complete window is waiting to be drained.
    pub fn push(&mut self, frames: &[[f32; NUM_CHANNELS]]) -> usize {
        self.release();

        let free = self.capacity() - self.buffered();
        let taken = frames.len().min(free);
        for frame in &frames[..taken] {
            for (buffer, &sample) in self.buffers.iter_mut().zip(frame) {
                buffer.push_back(sample);
            }
        }
        taken
    }

    fn release(&mut self) {
        if !self.release_pending {
            return;
        }
        let hop = self.plan.hop_size().min(self.buffered());
        for buffer in self.buffers.iter_mut() {
            buffer.drain(..hop);
        }
        self.buffer_start += hop as u64;
        self.release_pending = false;
    }
}

impl WindowSource for StreamingWindows {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn window_length(&self) -> usize {
        self.plan.window_length()
    }

    fn next_window(&mut self) -> Option<AnalysisWindow<'_>> {
        self.release();

        let length = self.plan.window_length();
        if self.buffered() < length {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        self.release_pending = true;

        let [b0, b1, b2, b3] = &mut self.buffers;
        Some(AnalysisWindow::new(
            index,
            self.buffer_start,
            self.sample_rate,
            [
                &b0.make_contiguous()[..length],
                &b1.make_contiguous()[..length],
                &b2.make_contiguous()[..length],
                &b3.make_contiguous()[..length],
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_signal(frames: usize, sample_rate: u32) -> Signal {
        let frames: Vec<[f32; 4]> = (0..frames)
            .map(|i| {
                let v = i as f32;
                [v, v + 0.25, v + 0.5, v + 0.75]
            })
            .collect();
        Signal::from_frames(&frames, sample_rate).unwrap()
    }

    #[test]
    fn test_plan_rejects_bad_parameters() {
        assert!(matches!(
            WindowPlan::new(0, 0.5),
            Err(AnalysisError::InvalidConfiguration(_))
        ));
        assert!(WindowPlan::new(16, 1.0).is_err());
        assert!(WindowPlan::new(16, -0.25).is_err());
        assert!(WindowPlan::new(1, 0.6).is_err());
        assert!(WindowPlan::new(1, 0.0).is_ok());
    }

    #[test]
    fn test_window_count() {
        let plan = WindowPlan::new(4096, 0.75).unwrap();
        assert_eq!(plan.hop_size(), 1024);
        assert_eq!(plan.window_count(4095), 0);
        assert_eq!(plan.window_count(4096), 1);
        assert_eq!(plan.window_count(5119), 1);
        assert_eq!(plan.window_count(5120), 2);
        assert_eq!(plan.window_count(16000), (16000 - 4096) / 1024 + 1);
    }

    #[test]
    fn test_signal_windows_positions() {
        let signal = ramp_signal(100, 10);
        let plan = WindowPlan::new(40, 0.5).unwrap();
        let windows: Vec<_> = plan.windows(&signal).collect();

        // floor((100 - 40) / 20) + 1
        assert_eq!(windows.len(), 4);
        for (i, window) in windows.iter().enumerate() {
            assert_eq!(window.index(), i);
            assert_eq!(window.start_sample(), (i * 20) as u64);
            assert_eq!(window.len(), 40);
            assert_eq!(window.channel(0)[0], (i * 20) as f32);
            assert_eq!(window.channel(2)[0], (i * 20) as f32 + 0.5);
        }
        assert!((windows[3].timestamp_seconds() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_signal_shorter_than_window() {
        let signal = ramp_signal(10, 10);
        let plan = WindowPlan::new(16, 0.0).unwrap();
        let mut windows = plan.windows(&signal);
        assert_eq!(windows.len(), 0);
        assert!(windows.next_window().is_none());
    }

    #[test]
    fn test_signal_windows_restartable() {
        let signal = ramp_signal(64, 8);
        let plan = WindowPlan::new(16, 0.25).unwrap();
        let mut windows = plan.windows(&signal);

        let first: Vec<u64> = windows.clone().map(|w| w.start_sample()).collect();
        let drained: Vec<u64> = windows.by_ref().map(|w| w.start_sample()).collect();
        assert_eq!(first, drained);
        assert!(windows.next().is_none());

        windows.reset();
        let again: Vec<u64> = windows.map(|w| w.start_sample()).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let signal = ramp_signal(257, 100);
        let plan = WindowPlan::new(32, 0.6).unwrap();
        let batch: Vec<(usize, u64, Vec<f32>)> = plan
            .windows(&signal)
            .map(|w| (w.index(), w.start_sample(), w.channel(3).to_vec()))
            .collect();

        let frames: Vec<[f32; 4]> = (0..signal.len())
            .map(|i| std::array::from_fn(|ch| signal.channel(ch)[i]))
            .collect();

        let mut streaming = StreamingWindows::new(plan, 100).unwrap();
        let mut streamed = Vec::new();
        // Odd chunk size so window boundaries fall mid-chunk
        for chunk in frames.chunks(7) {
            let mut rest = chunk;
            while !rest.is_empty() {
                let taken = streaming.push(rest);
                rest = &rest[taken..];
                while let Some(w) = streaming.next_window() {
                    streamed.push((w.index(), w.start_sample(), w.channel(3).to_vec()));
                }
                assert!(streaming.buffered() <= streaming.capacity());
            }
        }

        assert_eq!(batch.len(), plan.window_count(257));
        assert_eq!(streamed, batch);
        assert_eq!(streaming.windows_emitted(), batch.len());
    }

    #[test]
    fn test_streaming_push_refuses_when_full() {
        let plan = WindowPlan::new(4, 0.5).unwrap();
        let mut streaming = StreamingWindows::new(plan, 8).unwrap();

        assert_eq!(streaming.push(&[[1.0; 4]; 6]), 4);
        assert_eq!(streaming.push(&[[1.0; 4]; 2]), 0);

        assert!(streaming.next_window().is_some());
        assert!(streaming.next_window().is_none());
        // Hop of 2 released on the next push
        assert_eq!(streaming.push(&[[1.0; 4]; 6]), 2);
        let window = streaming.next_window().unwrap();
        assert_eq!(window.start_sample(), 2);
        assert_eq!(window.index(), 1);
    }
}
