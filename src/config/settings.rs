//! Configuration settings for Beluga
//!
//! Defines the CLI arguments, the enums shared between the CLI and the
//! library, and the runtime configuration derived from them.

use crate::genome::GenomicInterval;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Beluga - reproducible sequence datasets for deep learning
#[derive(Parser, Debug, Clone)]
#[command(name = "beluga")]
#[command(author = "Beluga Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Genomic sequence loading and one-hot encoding for deep learning")]
#[command(long_about = r#"
Beluga turns reference genomes and region annotations into one-hot encoded
arrays ready to be consumed by sequence models.

Features:
  - FASTA, BED and VCF input
  - Binning of regions of interest with step size and flanks
  - Higher-order (k-mer) one-hot encoding, strand aware
  - In-memory or memory-mapped storage with content-addressed caching
  - Reference/alternative context batches for variant effect prediction

Examples:
  beluga info genome.fa
  beluga regions --roi peaks.bed --binsize 200 --flank 100
  beluga encode --refgenome genome.fa --roi peaks.bed --binsize 200 -o x.npy
  beluga encode-seq seqs.fa --order 2 -o x.npy
  beluga variants --refgenome genome.fa --vcf calls.vcf --binsize 500 -o calls
"#)]
pub struct CliArgs {
    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars and summaries)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Number of worker threads (0 = auto-detect)
    #[arg(short = 't', long, default_value = "0", value_name = "NUM", global = true)]
    pub threads: usize,

    /// Directory holding cached arrays
    #[arg(long, env = "BELUGA_CACHE_DIR", value_name = "PATH", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Options controlling how regions of interest are split into bins
#[derive(Args, Debug, Clone, Default)]
pub struct BinningArgs {
    /// Bin size in basepairs (default: length of the BED regions, which must be equal)
    #[arg(long, value_name = "BP")]
    pub binsize: Option<usize>,

    /// Step size in basepairs (default: binsize)
    #[arg(long, value_name = "BP")]
    pub stepsize: Option<usize>,

    /// Flanking basepairs added up- and downstream of each bin
    #[arg(long, default_value = "0", value_name = "BP")]
    pub flank: usize,

    /// Seed used to shuffle the bins
    #[arg(long, value_name = "SEED")]
    pub random_state: Option<u64>,

    /// Drop region remainders shorter than binsize instead of padding them
    #[arg(long)]
    pub no_zero_padding: bool,
}

impl BinningArgs {
    /// Binning options for the indexer
    pub fn to_options(&self) -> crate::index::BinningOptions {
        crate::index::BinningOptions {
            binsize: self.binsize,
            stepsize: self.stepsize,
            flank: self.flank,
            zero_padding: !self.no_zero_padding,
            random_state: self.random_state,
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Summarize the sequences of a FASTA file
    #[command(name = "info")]
    Info {
        /// FASTA file
        fasta: PathBuf,
    },

    /// List the bins derived from a BED file
    #[command(name = "regions")]
    Regions {
        /// BED file with regions of interest
        #[arg(long, value_name = "BED")]
        roi: PathBuf,

        #[command(flatten)]
        binning: BinningArgs,

        /// Chromosome glob patterns to keep
        #[arg(long, value_name = "PATTERN")]
        include: Vec<String>,

        /// Chromosome glob patterns to drop
        #[arg(long, value_name = "PATTERN")]
        exclude: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// One-hot encode a reference genome over regions of interest
    #[command(name = "encode")]
    Encode {
        /// Reference genome FASTA
        #[arg(long, value_name = "FASTA")]
        refgenome: PathBuf,

        /// BED file with regions of interest
        #[arg(long, value_name = "BED")]
        roi: Option<PathBuf>,

        #[command(flatten)]
        binning: BinningArgs,

        #[command(flatten)]
        encoding: EncodingArgs,

        /// Load the whole genome instead of only the regions of interest
        #[arg(long)]
        store_whole_genome: bool,

        /// Write a single interval of the whole genome instead of the regions
        #[arg(long, value_name = "CHROM:START-END[:STRAND]", requires = "store_whole_genome", conflicts_with = "roi")]
        interval: Option<GenomicInterval>,

        /// Output .npy file
        #[arg(short = 'o', long, value_name = "PATH")]
        output: PathBuf,
    },

    /// One-hot encode a set of equally long sequences
    #[command(name = "encode-seq")]
    EncodeSeq {
        /// FASTA files
        #[arg(required = true)]
        fasta: Vec<PathBuf>,

        /// Sequence type
        #[arg(long, value_enum, default_value = "dna")]
        seqtype: SeqType,

        /// Truncate or pad all sequences to this length
        #[arg(long, value_name = "LEN")]
        fixedlen: Option<usize>,

        #[command(flatten)]
        encoding: EncodingArgs,

        /// Output .npy file
        #[arg(short = 'o', long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Build reference/alternative context batches for SNVs in a VCF file
    #[command(name = "variants")]
    Variants {
        /// Reference genome FASTA
        #[arg(long, value_name = "FASTA")]
        refgenome: PathBuf,

        /// VCF file with variants
        #[arg(long, value_name = "VCF")]
        vcf: PathBuf,

        /// Context size around each variant
        #[arg(long, value_name = "BP")]
        binsize: usize,

        /// Number of variants per batch
        #[arg(long, default_value = "32", value_name = "NUM")]
        batch_size: usize,

        #[command(flatten)]
        encoding: EncodingArgs,

        /// Only count admissible variants
        #[arg(long)]
        count_only: bool,

        /// Output prefix (writes PREFIX.ref.npy, PREFIX.alt.npy, PREFIX.tsv)
        #[arg(short = 'o', long, value_name = "PREFIX")]
        output: Option<PathBuf>,
    },

    /// Inspect or clear the array cache
    #[command(name = "cache")]
    Cache {
        /// Cache action
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Options shared by the encoding subcommands
#[derive(Args, Debug, Clone)]
pub struct EncodingArgs {
    /// Dataset name (used for cache directories)
    #[arg(long, default_value = "dna", value_name = "NAME")]
    pub name: String,

    /// Order of the one-hot representation (k-mer length)
    #[arg(long, default_value = "1", value_name = "K")]
    pub order: usize,

    /// Storage backend for the encoded genome
    #[arg(long, value_enum, default_value = "memory")]
    pub storage: StorageMode,

    /// Cache the encoded array keyed by input content and parameters
    #[arg(long)]
    pub cache: bool,

    /// Emit channel-first tensors (n, 4^k, L, 1) instead of (n, L, 1, 4^k)
    #[arg(long)]
    pub channel_first: bool,
}

/// Cache maintenance actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// List cached arrays
    List,
    /// Remove cached arrays
    Clear {
        /// Only clear entries of this dataset
        #[arg(long)]
        dataset: Option<String>,
    },
}

/// Biological sequence type
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeqType {
    /// Nucleotide sequence (ACGT)
    #[default]
    Dna,
    /// Amino acid sequence
    Protein,
}

impl SeqType {
    /// Letter used for unknown or padded residues
    pub fn unknown_letter(&self) -> u8 {
        match self {
            Self::Dna => b'N',
            Self::Protein => b'X',
        }
    }
}

/// Storage backend for genomic arrays
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Keep the encoded genome in memory
    #[default]
    Memory,
    /// Write the encoded genome to disk and memory-map it
    File,
}

impl StorageMode {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
        }
    }
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BelugaConfig {
    /// Cache root directory
    pub cache_dir: PathBuf,
    /// Thread count (0 = auto-detect)
    pub threads: usize,
    /// Show progress bars
    pub progress: bool,
}

impl Default for BelugaConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            threads: 0,
            progress: true,
        }
    }
}

impl BelugaConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Self {
        Self {
            cache_dir: args.cache_dir.clone().unwrap_or_else(default_cache_dir),
            threads: args.threads,
            progress: !args.quiet,
        }
    }

    /// Effective number of worker threads
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get()
        } else {
            self.threads
        }
    }

    /// Build a rayon pool honoring the configured thread count
    pub fn thread_pool(&self) -> crate::error::Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.effective_threads())
            .build()
            .map_err(|e| crate::error::BelugaError::ThreadPool(e.to_string()))
    }
}

/// `$HOME/.beluga/cache`, or `./.beluga/cache` without a home directory
pub fn default_cache_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".beluga").join("cache")
}
