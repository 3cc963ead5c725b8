//! Content hashing
//!
//! Provides SHA-256 fingerprints of input files and loading parameters
//! used to address cached arrays.

mod fingerprint;

pub use fingerprint::*;
