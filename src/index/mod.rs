//! Genomic region indexing
//!
//! Provides the mapping from dataset sample indices to genomic bins.

mod indexer;

pub use indexer::*;
