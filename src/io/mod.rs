//! Signal containers and windowing
//!
//! The four-channel signal the estimator reads, and the window sources that slice it
//! (batch) or buffer it from a live feed (streaming).

pub mod signal;
pub mod window_source;
