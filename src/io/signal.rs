//! Four-channel microphone signal

use super::window_source::AnalysisWindow;
use crate::error::AnalysisError;

/// Number of microphone channels the estimator works on
pub const NUM_CHANNELS: usize = 4;

/// Immutable four-channel signal, stored planar
///
/// Built once by the caller (typically from a decoder's interleaved output) and only
/// read afterwards. Windows borrow directly from the channel buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    channels: [Vec<f32>; NUM_CHANNELS],
    sample_rate: u32,
}

impl Signal {
    /// Build a signal from four planar channel buffers
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if there are not exactly four channels,
    /// the channels differ in length, the signal is empty, or the sample rate is 0.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AnalysisError> {
        let count = channels.len();
        let channels: [Vec<f32>; NUM_CHANNELS] = channels.try_into().map_err(|_| {
            AnalysisError::InvalidInput(format!(
                "Expected {} microphone channels, got {}",
                NUM_CHANNELS, count
            ))
        })?;

        let len = channels[0].len();
        if channels.iter().any(|ch| ch.len() != len) {
            return Err(AnalysisError::InvalidInput(
                "Channel buffers differ in length".to_string(),
            ));
        }

        Self::checked(channels, sample_rate)
    }

    /// Build a signal from interleaved samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `num_channels` is not 4, the buffer is
    /// not a whole number of frames, the signal is empty, or the sample rate is 0.
    /// Wider captures go through
    /// [`extract_mic_channels`](crate::preprocessing::channel_mixer::extract_mic_channels) first.
    pub fn from_interleaved(
        samples: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if num_channels != NUM_CHANNELS {
            return Err(AnalysisError::InvalidInput(format!(
                "Expected {} microphone channels, got {}",
                NUM_CHANNELS, num_channels
            )));
        }

        if samples.len() % NUM_CHANNELS != 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Interleaved buffer of {} samples is not a whole number of {}-channel frames",
                samples.len(),
                NUM_CHANNELS
            )));
        }

        let frames = samples.len() / NUM_CHANNELS;
        let mut channels: [Vec<f32>; NUM_CHANNELS] = Default::default();
        for ch in channels.iter_mut() {
            ch.reserve_exact(frames);
        }
        for frame in samples.chunks_exact(NUM_CHANNELS) {
            for (ch, &sample) in channels.iter_mut().zip(frame) {
                ch.push(sample);
            }
        }

        Self::checked(channels, sample_rate)
    }

    /// Build a signal from a slice of four-sample frames
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if there are no frames or the sample rate is 0.
    pub fn from_frames(frames: &[[f32; NUM_CHANNELS]], sample_rate: u32) -> Result<Self, AnalysisError> {
        let mut channels: [Vec<f32>; NUM_CHANNELS] = Default::default();
        for (index, ch) in channels.iter_mut().enumerate() {
            *ch = frames.iter().map(|frame| frame[index]).collect();
        }
        Self::checked(channels, sample_rate)
    }

    fn checked(channels: [Vec<f32>; NUM_CHANNELS], sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }

        if channels[0].is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty audio signal".to_string(),
            ));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Number of sample frames
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Always false: empty signals are rejected on construction
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples of one channel
    ///
    /// # Panics
    ///
    /// Panics if `index >= 4`.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    /// Borrow `length` frames starting at `start` as analysis window number `index`
    ///
    /// Returns `None` if the range runs past the end of the signal.
    pub fn window(&self, index: usize, start: usize, length: usize) -> Option<AnalysisWindow<'_>> {
        let end = start.checked_add(length)?;
        if end > self.len() {
            return None;
        }
        let [c0, c1, c2, c3] = &self.channels;
        Some(AnalysisWindow::new(
            index,
            start as u64,
            self.sample_rate,
            [&c0[start..end], &c1[start..end], &c2[start..end], &c3[start..end]],
        ))
    }
}
