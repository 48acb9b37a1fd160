//! Feature extraction modules
//!
//! - Direction of arrival from time differences between microphone pairs

pub mod doa;
