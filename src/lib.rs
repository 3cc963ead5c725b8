//! # Beluga - Genomic Sequence Datasets for Deep Learning
//!
//! Beluga loads reference genomes, region annotations and variant calls
//! and turns them into one-hot encoded tensors for sequence models.
//!
//! ## Features
//!
//! - **File Formats**: FASTA, BED and VCF readers
//! - **Region Binning**: Tile regions of interest with binsize, stepsize and flank
//! - **Higher-order Encoding**: k-mer one-hot tensors, strand aware
//! - **Storage**: In-memory or memory-mapped arrays
//! - **Caching**: SHA-256 addressed cache that skips parsing on reuse
//! - **Variant Contexts**: Reference/alternative batches around SNVs
//!
//! ## Quick Start
//!
//! ```no_run
//! use beluga::config::BelugaConfig;
//! use beluga::dataset::{Bioseq, RefGenomeOptions};
//! use beluga::index::BinningOptions;
//! use std::path::{Path, PathBuf};
//!
//! let options = RefGenomeOptions {
//!     roi: Some(PathBuf::from("peaks.bed")),
//!     binning: BinningOptions::with_binsize(200),
//!     order: 2,
//!     ..Default::default()
//! };
//!
//! let dna = Bioseq::from_refgenome("dna", Path::new("genome.fa"), &options, &BelugaConfig::default()).unwrap();
//! let batch = dna.get_range(0..32).unwrap();
//! println!("{} samples, batch shape {:?}", dna.len(), batch.shape());
//! ```
//!
//! ## Variant Effects
//!
//! ```no_run
//! use beluga::config::BelugaConfig;
//! use beluga::dataset::{Bioseq, RefGenomeOptions};
//! use beluga::variants::VariantStreamer;
//! use std::path::Path;
//!
//! let options = RefGenomeOptions {
//!     store_whole_genome: true,
//!     ..Default::default()
//! };
//! let dna = Bioseq::from_refgenome("dna", Path::new("genome.fa"), &options, &BelugaConfig::default()).unwrap();
//!
//! let streamer = VariantStreamer::new(&dna, Path::new("calls.vcf"), 500, 64).unwrap();
//! for batch in streamer.batches().unwrap() {
//!     let batch = batch.unwrap();
//!     println!("{} variants, first {}", batch.len(), batch.names[0]);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod genome;
pub mod hash;
pub mod index;
pub mod output;
pub mod progress;
pub mod storage;
pub mod variants;

// Re-export commonly used types
pub use config::{BelugaConfig, SeqType, StorageMode};
pub use dataset::{Bioseq, RefGenomeOptions, SeqOptions};
pub use error::{BelugaError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use beluga::prelude::*;
    //! ```

    pub use crate::cache::CacheStore;
    pub use crate::config::{BelugaConfig, SeqType, StorageMode};
    pub use crate::dataset::{Bioseq, RefGenomeOptions, SeqOptions};
    pub use crate::encoding::{Alphabet, OneHot};
    pub use crate::error::{BelugaError, Result};
    pub use crate::genome::{GenomicInterval, Strand};
    pub use crate::index::{BinningOptions, GenomicIndexer};
    pub use crate::output::write_npy;
    pub use crate::progress::ProgressReporter;
    pub use crate::variants::{VariantBatch, VariantStreamer};
}
