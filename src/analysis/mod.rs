//! Analysis driver and result aggregation
//!
//! - Window-by-window driver (sequential, parallel, streaming)
//! - Result types
//! - Metadata

pub mod driver;
pub mod metadata;
pub mod result;
