//! Storage of encoded genomes
//!
//! Provides genomic arrays backed by memory or memory-mapped files.

mod garray;

pub use garray::*;
