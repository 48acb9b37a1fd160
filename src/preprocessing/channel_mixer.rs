//! Microphone channel extraction from wider captures
//!
//! Array firmware often records more channels than it has microphones. The
//! ReSpeaker v2.0 USB array delivers six channels: 0 is the on-board processed
//! output, 1 is the playback reference, and 2..=5 are the raw microphones in ring
//! order. The estimator only sees the four raw microphones.

use crate::error::AnalysisError;
use crate::io::signal::{Signal, NUM_CHANNELS};

/// Where the four ring microphones live inside an interleaved capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLayout {
    /// Channels per interleaved frame in the capture
    pub num_channels: usize,
    /// Capture channel of ring microphones 0..=3, in ring order
    pub mic_channels: [usize; NUM_CHANNELS],
}

impl CaptureLayout {
    /// ReSpeaker v2.0 six-channel firmware: microphones on channels 2, 3, 4, 5
    pub const RESPEAKER_V2: CaptureLayout = CaptureLayout {
        num_channels: 6,
        mic_channels: [2, 3, 4, 5],
    };

    /// Capture that already holds exactly the four microphones in ring order
    pub const MICS_ONLY: CaptureLayout = CaptureLayout {
        num_channels: NUM_CHANNELS,
        mic_channels: [0, 1, 2, 3],
    };

    fn validate(&self) -> Result<(), AnalysisError> {
        if self.num_channels < NUM_CHANNELS {
            return Err(AnalysisError::InvalidInput(format!(
                "Capture has {} channels, need at least {} microphones",
                self.num_channels, NUM_CHANNELS
            )));
        }

        if let Some(&bad) = self.mic_channels.iter().find(|&&ch| ch >= self.num_channels) {
            return Err(AnalysisError::InvalidInput(format!(
                "Microphone channel {} out of range for a {}-channel capture",
                bad, self.num_channels
            )));
        }

        Ok(())
    }
}

/// Pull the four microphone channels out of an interleaved capture
///
/// # Arguments
///
/// * `interleaved` - Capture samples, `layout.num_channels` per frame
/// * `layout` - Which capture channels are the ring microphones
///
/// # Returns
///
/// Interleaved four-channel samples in ring order
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the layout does not fit the capture or
/// the buffer is not a whole number of frames.
pub fn extract_mic_channels(
    interleaved: &[f32],
    layout: CaptureLayout,
) -> Result<Vec<f32>, AnalysisError> {
    log::debug!(
        "Extracting microphone channels {:?} from {}-channel capture ({} samples)",
        layout.mic_channels,
        layout.num_channels,
        interleaved.len()
    );

    layout.validate()?;

    if interleaved.len() % layout.num_channels != 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Capture of {} samples is not a whole number of {}-channel frames",
            interleaved.len(),
            layout.num_channels
        )));
    }

    let frames = interleaved.len() / layout.num_channels;
    let mut mics = Vec::with_capacity(frames * NUM_CHANNELS);
    for frame in interleaved.chunks_exact(layout.num_channels) {
        mics.extend(layout.mic_channels.iter().map(|&ch| frame[ch]));
    }

    Ok(mics)
}

/// Build a [`Signal`] straight from an interleaved capture
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` under the same conditions as
/// [`extract_mic_channels`] and [`Signal::from_interleaved`].
pub fn signal_from_capture(
    interleaved: &[f32],
    layout: CaptureLayout,
    sample_rate: u32,
) -> Result<Signal, AnalysisError> {
    let mics = extract_mic_channels(interleaved, layout)?;
    Signal::from_interleaved(&mics, NUM_CHANNELS, sample_rate)
}
