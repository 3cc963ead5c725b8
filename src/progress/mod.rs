//! Progress reporting module
//!
//! Provides progress visualization for sequence loading and
//! variant streaming, with ETA and throughput display.

mod reporter;

pub use reporter::*;
