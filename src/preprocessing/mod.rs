//! Signal preparation ahead of direction estimation
//!
//! - Microphone channel extraction from wider captures
//! - Energy gating of silent windows

pub mod channel_mixer;
pub mod silence;
