//! Genomic indexer
//!
//! Maps an integer sample index to a genomic bin. Regions of interest are
//! tiled into bins of `binsize` every `stepsize` basepairs; each bin is
//! returned extended by `flank` on both sides.

use crate::error::{BelugaError, Result};
use crate::genome::{read_bed, BedRecord, GenomicInterval, Strand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;

/// Options for tiling regions into bins
#[derive(Debug, Clone, Default)]
pub struct BinningOptions {
    /// Bin size (None = use the common region length)
    pub binsize: Option<usize>,
    /// Step size (None = binsize)
    pub stepsize: Option<usize>,
    /// Flank added on both sides of each bin
    pub flank: usize,
    /// Keep a padded bin for region remainders shorter than binsize
    pub zero_padding: bool,
    /// Seed for shuffling the bins
    pub random_state: Option<u64>,
}

impl BinningOptions {
    /// Binning with the given binsize and default everything else
    pub fn with_binsize(binsize: usize) -> Self {
        Self {
            binsize: Some(binsize),
            zero_padding: true,
            ..Default::default()
        }
    }
}

/// Integer index to genomic bin mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomicIndexer {
    binsize: usize,
    stepsize: usize,
    flank: usize,
    zero_padding: bool,
    bins: Vec<GenomicInterval>,
}

impl GenomicIndexer {
    /// Create an empty indexer
    pub fn new(binsize: usize, stepsize: usize, flank: usize, zero_padding: bool) -> Self {
        Self {
            binsize,
            stepsize: stepsize.max(1),
            flank,
            zero_padding,
            bins: Vec::new(),
        }
    }

    /// Create an indexer from a BED file
    pub fn create_from_file(path: &Path, options: &BinningOptions) -> Result<Self> {
        let records = read_bed(path)?;
        if records.is_empty() {
            return Err(BelugaError::invalid(format!("No regions found in {:?}", path)));
        }
        let indexer = Self::create_from_regions(&records, options)?;
        tracing::info!(
            "Indexed {} bins of {} bp from {} regions in {:?}",
            indexer.len(),
            indexer.binsize,
            records.len(),
            path
        );
        Ok(indexer)
    }

    /// Create an indexer by tiling the given regions
    pub fn create_from_regions(records: &[BedRecord], options: &BinningOptions) -> Result<Self> {
        let binsize = match options.binsize {
            Some(0) => return Err(BelugaError::invalid("binsize must be positive")),
            Some(binsize) => binsize,
            None => {
                let first = records
                    .first()
                    .map(|r| r.interval.len())
                    .ok_or_else(|| BelugaError::invalid("No regions to index"))?;
                if let Some(other) = records.iter().find(|r| r.interval.len() != first) {
                    return Err(BelugaError::invalid(format!(
                        "Without binsize all regions must be equally long ({} has {} bp, expected {})",
                        other.interval,
                        other.interval.len(),
                        first
                    )));
                }
                if first == 0 {
                    return Err(BelugaError::invalid("Regions must not be empty"));
                }
                first
            }
        };

        let stepsize = match options.stepsize {
            Some(0) => return Err(BelugaError::invalid("stepsize must be positive")),
            Some(stepsize) => stepsize,
            None => binsize,
        };

        let mut indexer = Self::new(binsize, stepsize, options.flank, options.zero_padding);
        for record in records {
            indexer.add_region(&record.interval);
        }

        if let Some(seed) = options.random_state {
            let mut rng = StdRng::seed_from_u64(seed);
            indexer.bins.shuffle(&mut rng);
        }

        Ok(indexer)
    }

    /// Tile a region into bins and append them
    fn add_region(&mut self, region: &GenomicInterval) {
        let reglen = region.len();
        let binsize = self.binsize;
        let stepsize = self.stepsize;

        let full_bins = if reglen >= binsize {
            (reglen - binsize) / stepsize + 1
        } else {
            0
        };

        for i in 0..full_bins {
            let start = region.start + (i * stepsize) as i64;
            self.add_interval(&region.chrom, start, start + binsize as i64, region.strand);
        }

        if self.zero_padding {
            let covered = if full_bins == 0 {
                0
            } else {
                (full_bins - 1) * stepsize + binsize
            };
            if covered < reglen {
                let start = region.start + (full_bins * stepsize) as i64;
                self.add_interval(&region.chrom, start, start + binsize as i64, region.strand);
            }
        }
    }

    /// Append a single bin
    pub fn add_interval(&mut self, chrom: &str, start: i64, end: i64, strand: Strand) {
        self.bins
            .push(GenomicInterval::new(chrom, start, end).with_strand(strand));
    }

    /// Bin size in basepairs
    pub fn binsize(&self) -> usize {
        self.binsize
    }

    /// Step size in basepairs
    pub fn stepsize(&self) -> usize {
        self.stepsize
    }

    /// Flank in basepairs
    pub fn flank(&self) -> usize {
        self.flank
    }

    /// Length of every returned interval (`binsize + 2 * flank`)
    pub fn interval_len(&self) -> usize {
        self.binsize + 2 * self.flank
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether there are no bins
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin `idx`, extended by the flank
    pub fn get(&self, idx: usize) -> Result<GenomicInterval> {
        self.bins
            .get(idx)
            .map(|bin| bin.extend(self.flank as i64))
            .ok_or(BelugaError::IndexOutOfRange {
                index: idx,
                len: self.bins.len(),
            })
    }

    /// Iterate over all bins, extended by the flank
    pub fn iter(&self) -> impl Iterator<Item = GenomicInterval> + '_ {
        let flank = self.flank as i64;
        self.bins.iter().map(move |bin| bin.extend(flank))
    }

    /// Chromosomes referenced by the bins
    pub fn chromosomes(&self) -> BTreeSet<&str> {
        self.bins.iter().map(|b| b.chrom.as_str()).collect()
    }

    /// Keep only bins on chromosomes matching `include` (all if empty)
    /// and not matching `exclude`
    pub fn filter_chromosomes(&mut self, include: &[String], exclude: &[String]) -> Result<()> {
        let include = build_globset(include)?;
        let exclude = build_globset(exclude)?;

        let before = self.bins.len();
        self.bins.retain(|bin| {
            let included = include.is_empty() || include.is_match(&bin.chrom);
            included && !exclude.is_match(&bin.chrom)
        });
        tracing::debug!("Chromosome filter kept {} of {} bins", self.bins.len(), before);
        Ok(())
    }

    /// Short description of the layout, used in cache keys
    pub fn describe(&self) -> String {
        let mut hasher = Sha256::new();
        for bin in &self.bins {
            hasher.update(bin.to_string().as_bytes());
            hasher.update(b"\n");
        }
        format!(
            "indexer:{}:{}:{}:{}:{}",
            self.binsize,
            self.stepsize,
            self.flank,
            self.bins.len(),
            hex::encode(hasher.finalize())
        )
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| BelugaError::config(format!("Invalid glob pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BelugaError::config(format!("Failed to build glob set: {}", e)))
}
