//! Bioseq dataset
//!
//! A [`Bioseq`] holds encoded nucleotide or amino acid sequences together
//! with a [`GenomicIndexer`] and serves one-hot tensors for batches of
//! sample indices. Bins on the minus strand are returned as reverse
//! complements.

use super::loader::{load_regions, load_whole_genome};
use crate::cache::CacheStore;
use crate::config::{BelugaConfig, SeqType, StorageMode};
use crate::encoding::{as_onehot, complement_index, kmer_labels, Alphabet, OneHot, NO_LETTER};
use crate::error::{BelugaError, Result};
use crate::genome::{read_fasta, sequence_padding, GenomicInterval, SeqRecord};
use crate::hash::{create_sha256_cache, digest_records};
use crate::index::{BinningOptions, GenomicIndexer};
use crate::storage::{ArraySpec, GenomicArray};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Layout description used in cache keys of whole-genome arrays
const WHOLE_GENOME_LAYOUT: &str = "full_genome_lazy_loading";

/// Options for [`Bioseq::from_refgenome`]
#[derive(Debug, Clone)]
pub struct RefGenomeOptions {
    /// BED file with regions of interest
    pub roi: Option<PathBuf>,
    /// Binning of the regions of interest
    pub binning: BinningOptions,
    /// k-mer order
    pub order: usize,
    /// Storage backend
    pub storage: StorageMode,
    /// Cache the encoded genome
    pub cache: bool,
    /// Emit `(n, L, 1, C)` instead of `(n, C, L, 1)`
    pub channel_last: bool,
    /// Load every chromosome instead of only the regions of interest
    pub store_whole_genome: bool,
}

impl Default for RefGenomeOptions {
    fn default() -> Self {
        Self {
            roi: None,
            binning: BinningOptions {
                zero_padding: true,
                ..Default::default()
            },
            order: 1,
            storage: StorageMode::Memory,
            cache: false,
            channel_last: true,
            store_whole_genome: false,
        }
    }
}

/// Options for [`Bioseq::from_seq`]
#[derive(Debug, Clone)]
pub struct SeqOptions {
    /// Nucleotide or amino acid sequences
    pub seqtype: SeqType,
    /// k-mer order
    pub order: usize,
    /// Truncate or pad sequences to this length
    pub fixedlen: Option<usize>,
    /// Storage backend
    pub storage: StorageMode,
    /// Cache the encoded sequences
    pub cache: bool,
    /// Emit `(n, L, 1, C)` instead of `(n, C, L, 1)`
    pub channel_last: bool,
}

impl Default for SeqOptions {
    fn default() -> Self {
        Self {
            seqtype: SeqType::Dna,
            order: 1,
            fixedlen: None,
            storage: StorageMode::Memory,
            cache: false,
            channel_last: true,
        }
    }
}

/// One-hot encoded biological sequences indexed by genomic bins
pub struct Bioseq {
    name: String,
    garray: GenomicArray,
    indexer: Option<GenomicIndexer>,
    alphabet: Alphabet,
    channel_last: bool,
    from_cache: bool,
}

impl fmt::Debug for Bioseq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bioseq(\"{}\")", self.name)
    }
}

impl Bioseq {
    fn new(
        name: &str,
        garray: GenomicArray,
        indexer: Option<GenomicIndexer>,
        alphabet: Alphabet,
        channel_last: bool,
        from_cache: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            garray,
            indexer,
            alphabet,
            channel_last,
            from_cache,
        }
    }

    /// Load nucleotide sequences from a reference genome.
    ///
    /// With regions of interest only the covered sub-sequences are encoded
    /// unless `store_whole_genome` is set. On a cache hit the FASTA file is
    /// not read at all.
    pub fn from_refgenome(
        name: &str,
        refgenome: &Path,
        options: &RefGenomeOptions,
        config: &BelugaConfig,
    ) -> Result<Self> {
        validate_order(options.order, &Alphabet::dna())?;

        let indexer = match &options.roi {
            Some(roi) => Some(GenomicIndexer::create_from_file(roi, &options.binning)?),
            None => None,
        };

        if !options.store_whole_genome && indexer.is_none() {
            return Err(BelugaError::invalid(
                "Either roi must be supplied or store_whole_genome must be set",
            ));
        }

        let layout = match (&indexer, options.store_whole_genome) {
            (Some(indexer), false) => indexer.describe(),
            _ => WHOLE_GENOME_LAYOUT.to_string(),
        };

        let cache_key = if options.cache {
            let parameters = vec![
                layout,
                options.storage.name().to_string(),
                "i32".to_string(),
                options.order.to_string(),
                options.store_whole_genome.to_string(),
                crate::VERSION.to_string(),
                format!("{:?}", options.binning.random_state),
            ];
            Some(create_sha256_cache(&[refgenome], &parameters)?)
        } else {
            None
        };

        let alphabet = Alphabet::dna();
        let store = CacheStore::new(&config.cache_dir);
        let spec = ArraySpec {
            dataset: name,
            order: options.order,
            whole_genome: options.store_whole_genome,
            storage: options.storage,
            cache_key,
            store: &store,
        };

        let (garray, from_cache) = GenomicArray::create(spec, || {
            tracing::info!("Reading reference genome {:?}", refgenome);
            let records = read_fasta(refgenome)?;
            match (&indexer, options.store_whole_genome) {
                (Some(indexer), false) => load_regions(&records, indexer.iter(), &alphabet, options.order, config),
                _ => load_whole_genome(records, &alphabet, options.order, config),
            }
        })?;

        Ok(Self::new(name, garray, indexer, alphabet, options.channel_last, from_cache))
    }

    /// Load a set of equally long sequences, one sample per record
    pub fn from_seq(name: &str, fastafiles: &[PathBuf], options: &SeqOptions, config: &BelugaConfig) -> Result<Self> {
        let mut records = Vec::new();
        for fasta in fastafiles {
            records.extend(read_fasta(fasta)?);
        }
        Self::from_records(name, records, options, config)
    }

    /// Load from in-memory records. The cache key covers the record content.
    pub fn from_records(
        name: &str,
        records: Vec<SeqRecord>,
        options: &SeqOptions,
        config: &BelugaConfig,
    ) -> Result<Self> {
        validate_order(options.order, &Alphabet::for_seqtype(options.seqtype))?;

        if records.is_empty() {
            return Err(BelugaError::invalid("No sequences to load"));
        }

        let records = match options.fixedlen {
            Some(fixedlen) => sequence_padding(records, fixedlen, options.seqtype.unknown_letter()),
            None => records,
        };

        let reglen = records[0].len();
        if let Some(other) = records.iter().find(|r| r.len() != reglen) {
            return Err(BelugaError::invalid(format!(
                "Input sequences must be of equal length ('{}' has {}, expected {}); use fixedlen to pad or truncate",
                other.id,
                other.len(),
                reglen
            )));
        }
        if reglen < options.order {
            return Err(BelugaError::invalid(format!(
                "Sequences of length {} are shorter than order {}",
                reglen, options.order
            )));
        }

        let mut ids = HashSet::new();
        if let Some(dup) = records.iter().find(|r| !ids.insert(r.id.as_str())) {
            return Err(BelugaError::invalid(format!("Sequence IDs must be unique ('{}' repeats)", dup.id)));
        }

        let mut indexer = GenomicIndexer::new(reglen, 1, 0, false);
        for record in &records {
            indexer.add_interval(&record.id, 0, reglen as i64, Default::default());
        }

        let cache_key = if options.cache {
            let parameters = vec![
                digest_records(&records),
                indexer.describe(),
                options.storage.name().to_string(),
                "i32".to_string(),
                options.order.to_string(),
                format!("{:?}", options.seqtype),
                format!("{:?}", options.fixedlen),
                crate::VERSION.to_string(),
            ];
            Some(create_sha256_cache(&[], &parameters)?)
        } else {
            None
        };

        let alphabet = Alphabet::for_seqtype(options.seqtype);
        let store = CacheStore::new(&config.cache_dir);
        let spec = ArraySpec {
            dataset: name,
            order: options.order,
            whole_genome: false,
            storage: options.storage,
            cache_key,
            store: &store,
        };

        let (garray, from_cache) = GenomicArray::create(spec, || {
            load_regions(&records, indexer.iter(), &alphabet, options.order, config)
        })?;

        Ok(Self::new(name, garray, Some(indexer), alphabet, options.channel_last, from_cache))
    }

    /// Dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the encoded array was served from the cache
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Sequence alphabet
    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// k-mer order
    pub fn order(&self) -> usize {
        self.garray.order()
    }

    /// Number of one-hot channels (`alphabet size ^ order`)
    pub fn channels(&self) -> usize {
        self.alphabet.size().pow(self.order() as u32)
    }

    /// Whether tensors are laid out as `(n, L, 1, C)`
    pub fn channel_last(&self) -> bool {
        self.channel_last
    }

    /// Underlying genomic array
    pub fn garray(&self) -> &GenomicArray {
        &self.garray
    }

    /// Names of the one-hot channels
    pub fn conditions(&self) -> Vec<String> {
        kmer_labels(&self.alphabet, self.order())
    }

    /// Attached indexer
    pub fn indexer(&self) -> Result<&GenomicIndexer> {
        self.indexer
            .as_ref()
            .ok_or_else(|| BelugaError::invalid("GenomicIndexer has not been set yet. Please specify an indexer."))
    }

    /// Attach (or detach) an indexer.
    ///
    /// Region arrays only hold the bins they were loaded with, so a new
    /// indexer is only accepted for whole-genome arrays.
    pub fn set_indexer(&mut self, indexer: Option<GenomicIndexer>) -> Result<()> {
        if indexer.is_some() && !self.garray.whole_genome() {
            return Err(BelugaError::invalid(
                "A different indexer can only be attached when the whole genome was loaded",
            ));
        }
        self.indexer = indexer;
        Ok(())
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.indexer.as_ref().map_or(0, GenomicIndexer::len)
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of k-mer positions per sample
    pub fn sequence_len(&self) -> Result<usize> {
        let indexer = self.indexer()?;
        Ok((indexer.interval_len() + 1).saturating_sub(self.order()))
    }

    /// Shape of the full dataset
    pub fn shape(&self) -> Result<[usize; 4]> {
        let n = self.len();
        let l = self.sequence_len()?;
        let c = self.channels();
        Ok(if self.channel_last {
            [n, l, 1, c]
        } else {
            [n, c, l, 1]
        })
    }

    /// k-mer indices of an interval, reverse complemented on the minus strand
    pub fn iseq_for_interval(&self, interval: &GenomicInterval) -> Result<Vec<i32>> {
        let values = self.garray.fetch(interval)?;
        if !interval.strand.is_reverse() {
            return Ok(values);
        }

        if !self.alphabet.has_complement() {
            return Err(BelugaError::invalid(format!(
                "Reverse complement is undefined for {:?} sequences ({})",
                self.alphabet.seqtype(),
                interval
            )));
        }

        let order = self.order();
        Ok(values
            .into_iter()
            .rev()
            .map(|v| if v >= 0 { complement_index(v, order) } else { v })
            .collect())
    }

    /// k-mer index rows for a set of sample indices, padded with [`NO_LETTER`]
    pub fn iseq_for(&self, indices: &[usize]) -> Result<Vec<Vec<i32>>> {
        let indexer = self.indexer()?;
        let width = self.sequence_len()?;

        indices
            .iter()
            .map(|&idx| {
                let interval = indexer.get(idx)?;
                let mut row = self.iseq_for_interval(&interval)?;
                row.resize(width, NO_LETTER);
                Ok(row)
            })
            .collect()
    }

    fn finish(&self, onehot: OneHot) -> OneHot {
        if self.channel_last {
            onehot
        } else {
            onehot.to_channel_first()
        }
    }

    /// One-hot tensor for a set of sample indices
    pub fn get(&self, indices: &[usize]) -> Result<OneHot> {
        let rows = self.iseq_for(indices)?;
        let mut onehot = as_onehot(&rows, self.order(), self.alphabet.size());
        if rows.is_empty() {
            let width = self.sequence_len()?;
            onehot = OneHot::zeros([0, width, 1, self.channels()]);
        }
        Ok(self.finish(onehot))
    }

    /// One-hot tensor for a range of sample indices
    pub fn get_range(&self, range: Range<usize>) -> Result<OneHot> {
        let indices: Vec<usize> = range.collect();
        self.get(&indices)
    }

    /// One-hot tensor for an arbitrary interval (whole-genome arrays only)
    pub fn get_interval(&self, interval: &GenomicInterval) -> Result<OneHot> {
        if !self.garray.whole_genome() {
            return Err(BelugaError::invalid(
                "Indexing with an interval is only possible when the whole genome was loaded",
            ));
        }
        if interval.len() < self.order() {
            return Err(BelugaError::invalid(format!(
                "Interval {} is shorter than order {}",
                interval,
                self.order()
            )));
        }
        let row = self.iseq_for_interval(interval)?;
        Ok(self.finish(as_onehot(&[row], self.order(), self.alphabet.size())))
    }
}

fn validate_order(order: usize, alphabet: &Alphabet) -> Result<()> {
    if order == 0 {
        return Err(BelugaError::invalid("order must be at least 1"));
    }
    // k-mer indices are stored as i32
    let fits = alphabet
        .size()
        .checked_pow(order as u32)
        .map_or(false, |n| n <= i32::MAX as usize);
    if !fits {
        return Err(BelugaError::invalid(format!(
            "order {} is too large for the {:?} alphabet",
            order,
            alphabet.seqtype()
        )));
    }
    Ok(())
}
