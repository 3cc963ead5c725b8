//! Sequence datasets
//!
//! Loads reference genomes or sequence collections into genomic arrays
//! and serves one-hot tensors for sample indices.

mod bioseq;
mod loader;

pub use bioseq::*;
pub use loader::*;
