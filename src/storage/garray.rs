//! Genomic arrays
//!
//! A [`GenomicArray`] stores k-mer indices for a set of blocks. A block is
//! either a whole chromosome (whole-genome arrays) or one region of
//! interest. Values live in memory or in a memory-mapped file, and may be
//! persisted to the [`CacheStore`] so later runs skip encoding.

use crate::cache::{CacheStore, EntryPaths};
use crate::config::StorageMode;
use crate::encoding::NO_LETTER;
use crate::error::{BelugaError, IoResultExt, Result};
use crate::genome::GenomicInterval;
use crate::hash::CacheKey;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Encoded values of one block, as produced by a loader
#[derive(Debug, Clone)]
pub struct BlockData {
    /// Chromosome the block lives on
    pub chrom: String,
    /// Genomic coordinate of the first value
    pub start: i64,
    /// Lookup name (chromosome for whole-genome arrays, region key otherwise)
    pub name: String,
    /// k-mer indices
    pub values: Vec<i32>,
}

/// Placement of a block inside the value buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Lookup name
    pub name: String,
    /// Chromosome
    pub chrom: String,
    /// Genomic coordinate of the first value
    pub start: i64,
    /// Offset into the value buffer
    pub offset: usize,
    /// Number of values
    pub len: usize,
}

/// Block table persisted next to cached values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayLayout {
    /// Layout format version
    pub version: u32,
    /// k-mer order of the stored values
    pub order: usize,
    /// Whether blocks are whole chromosomes
    pub whole_genome: bool,
    /// Blocks in buffer order
    pub blocks: Vec<Block>,
}

impl ArrayLayout {
    /// Current layout version
    pub const VERSION: u32 = 1;

    /// Total number of stored values
    pub fn total_len(&self) -> usize {
        self.blocks.iter().map(|b| b.len).sum()
    }
}

enum Backend {
    Memory(Vec<i32>),
    Mapped(Mmap),
}

/// How an array should be stored and where it may be cached
#[derive(Debug, Clone)]
pub struct ArraySpec<'a> {
    /// Dataset name (cache subdirectory)
    pub dataset: &'a str,
    /// k-mer order
    pub order: usize,
    /// Whether blocks are whole chromosomes
    pub whole_genome: bool,
    /// Storage backend
    pub storage: StorageMode,
    /// Cache key, if caching is enabled
    pub cache_key: Option<CacheKey>,
    /// Cache root
    pub store: &'a CacheStore,
}

/// k-mer indices organized by genomic block
pub struct GenomicArray {
    layout: ArrayLayout,
    lookup: HashMap<String, usize>,
    backend: Backend,
}

impl std::fmt::Debug for GenomicArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenomicArray")
            .field("order", &self.layout.order)
            .field("whole_genome", &self.layout.whole_genome)
            .field("blocks", &self.layout.blocks.len())
            .field("storage", &self.storage_mode())
            .finish()
    }
}

impl GenomicArray {
    /// Build an array held in memory
    pub fn in_memory(order: usize, whole_genome: bool, blocks: Vec<BlockData>) -> Self {
        let (layout, values) = Self::assemble(order, whole_genome, blocks);
        Self::from_parts(layout, Backend::Memory(values))
    }

    /// Load from cache when possible, else run `loader` and store the result.
    ///
    /// Returns the array and whether it came from the cache.
    pub fn create<F>(spec: ArraySpec<'_>, loader: F) -> Result<(Self, bool)>
    where
        F: FnOnce() -> Result<Vec<BlockData>>,
    {
        let paths = spec
            .store
            .entry_paths(spec.dataset, spec.cache_key.as_ref(), spec.storage)?;

        if spec.cache_key.is_some() && paths.exists() {
            match Self::load(&paths, spec.storage) {
                Ok(array) if array.layout.order == spec.order && array.layout.whole_genome == spec.whole_genome => {
                    tracing::info!("Loaded '{}' from cache {:?}", spec.dataset, paths.meta);
                    return Ok((array, true));
                }
                Ok(_) => tracing::warn!("Cache entry {:?} does not match request, rebuilding", paths.meta),
                Err(e) => tracing::warn!("Ignoring unreadable cache entry {:?}: {}", paths.meta, e),
            }
        }

        let blocks = loader()?;
        let (layout, values) = Self::assemble(spec.order, spec.whole_genome, blocks);

        let persist = spec.cache_key.is_some() || spec.storage == StorageMode::File;
        if !persist {
            return Ok((Self::from_parts(layout, Backend::Memory(values)), false));
        }

        spec.store.ensure_dataset_dir(spec.dataset)?;
        Self::save(&paths, spec.storage, &layout, &values)?;
        tracing::debug!("Stored '{}' at {:?}", spec.dataset, paths.data);

        let backend = match spec.storage {
            StorageMode::Memory => Backend::Memory(values),
            StorageMode::File => {
                drop(values);
                Backend::Mapped(Self::map(&paths)?)
            }
        };
        Ok((Self::from_parts(layout, backend), false))
    }

    fn assemble(order: usize, whole_genome: bool, blocks: Vec<BlockData>) -> (ArrayLayout, Vec<i32>) {
        let total = blocks.iter().map(|b| b.values.len()).sum();
        let mut values = Vec::with_capacity(total);
        let mut table = Vec::with_capacity(blocks.len());

        for block in blocks {
            table.push(Block {
                name: block.name,
                chrom: block.chrom,
                start: block.start,
                offset: values.len(),
                len: block.values.len(),
            });
            values.extend_from_slice(&block.values);
        }

        let layout = ArrayLayout {
            version: ArrayLayout::VERSION,
            order,
            whole_genome,
            blocks: table,
        };
        (layout, values)
    }

    fn from_parts(layout: ArrayLayout, backend: Backend) -> Self {
        let lookup = layout
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Self {
            layout,
            lookup,
            backend,
        }
    }

    /// Write both files of an entry under temporary names and rename them
    /// into place, so arrays still mapping an older entry keep their inode.
    fn save(paths: &EntryPaths, mode: StorageMode, layout: &ArrayLayout, values: &[i32]) -> Result<()> {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        let data = match mode {
            StorageMode::Memory => lz4_flex::compress_prepend_size(&bytes),
            StorageMode::File => bytes,
        };
        replace_file(&paths.data, &data)?;

        let meta = bincode::serialize(layout)?;
        replace_file(&paths.meta, &meta)?;
        Ok(())
    }

    fn load(paths: &EntryPaths, mode: StorageMode) -> Result<Self> {
        let meta = std::fs::read(&paths.meta).with_path(&paths.meta)?;
        let layout: ArrayLayout = bincode::deserialize(&meta)?;
        if layout.version != ArrayLayout::VERSION {
            return Err(BelugaError::Cache(format!(
                "unsupported layout version {}",
                layout.version
            )));
        }

        let backend = match mode {
            StorageMode::Memory => {
                let compressed = std::fs::read(&paths.data).with_path(&paths.data)?;
                let bytes = lz4_flex::decompress_size_prepended(&compressed)
                    .map_err(|e| BelugaError::Cache(e.to_string()))?;
                Backend::Memory(decode_values(&bytes))
            }
            StorageMode::File => Backend::Mapped(Self::map(paths)?),
        };

        let array = Self::from_parts(layout, backend);
        if array.stored_len() != array.layout.total_len() {
            return Err(BelugaError::Cache(format!(
                "entry {:?} holds {} values, layout expects {}",
                paths.data,
                array.stored_len(),
                array.layout.total_len()
            )));
        }
        Ok(array)
    }

    fn map(paths: &EntryPaths) -> Result<Mmap> {
        let file = File::open(&paths.data).with_path(&paths.data)?;
        // Entries are only ever replaced by rename, never rewritten in place.
        unsafe { Mmap::map(&file) }.map_err(|e| BelugaError::io(&paths.data, e))
    }

    fn stored_len(&self) -> usize {
        match &self.backend {
            Backend::Memory(values) => values.len(),
            Backend::Mapped(mmap) => mmap.len() / 4,
        }
    }

    fn values(&self, block: &Block, from: usize, to: usize) -> Vec<i32> {
        let lo = block.offset + from;
        let hi = block.offset + to;
        match &self.backend {
            Backend::Memory(values) => values[lo..hi].to_vec(),
            Backend::Mapped(mmap) => decode_values(&mmap[lo * 4..hi * 4]),
        }
    }

    /// k-mer order of the stored values
    pub fn order(&self) -> usize {
        self.layout.order
    }

    /// Whether whole chromosomes are stored
    pub fn whole_genome(&self) -> bool {
        self.layout.whole_genome
    }

    /// Storage backend in use
    pub fn storage_mode(&self) -> StorageMode {
        match self.backend {
            Backend::Memory(_) => StorageMode::Memory,
            Backend::Mapped(_) => StorageMode::File,
        }
    }

    /// Block table
    pub fn layout(&self) -> &ArrayLayout {
        &self.layout
    }

    /// Values of the k-mers starting in `interval`.
    ///
    /// Whole-genome arrays return `interval.len() - order + 1` values and
    /// pad positions outside the chromosome with [`NO_LETTER`]. Region
    /// arrays return the block registered for exactly this interval.
    pub fn fetch(&self, interval: &GenomicInterval) -> Result<Vec<i32>> {
        if self.layout.whole_genome {
            let block = self
                .lookup
                .get(&interval.chrom)
                .map(|&i| &self.layout.blocks[i])
                .ok_or_else(|| BelugaError::UnknownChromosome(interval.chrom.clone()))?;

            let count = (interval.len() + 1).saturating_sub(self.layout.order);
            let first = interval.start - block.start;
            let lo = first.clamp(0, block.len as i64) as usize;
            let hi = (first + count as i64).clamp(0, block.len as i64) as usize;

            let mut out = Vec::with_capacity(count);
            let lead = (lo as i64 - first).clamp(0, count as i64) as usize;
            out.resize(lead, NO_LETTER);
            if hi > lo {
                out.extend(self.values(block, lo, hi));
            }
            out.resize(count, NO_LETTER);
            Ok(out)
        } else {
            let key = interval.key();
            let block = self
                .lookup
                .get(&key)
                .map(|&i| &self.layout.blocks[i])
                .ok_or(BelugaError::UnknownChromosome(key))?;
            Ok(self.values(block, 0, block.len))
        }
    }
}

fn replace_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let file = File::create(&temp_path).with_path(&temp_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(content).with_path(&temp_path)?;
    writer.flush().with_path(&temp_path)?;
    drop(writer);

    std::fs::rename(&temp_path, path).with_path(path)
}

fn decode_values(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn chrom_block(name: &str, values: Vec<i32>) -> BlockData {
        BlockData {
            chrom: name.to_string(),
            start: 0,
            name: name.to_string(),
            values,
        }
    }

    #[test]
    fn test_whole_genome_fetch_pads_outside() {
        let array = GenomicArray::in_memory(1, true, vec![chrom_block("chr1", vec![0, 1, 2, 3])]);

        let iv = GenomicInterval::new("chr1", 1, 3);
        assert_eq!(array.fetch(&iv).unwrap(), vec![1, 2]);

        let iv = GenomicInterval::new("chr1", -2, 2);
        assert_eq!(array.fetch(&iv).unwrap(), vec![NO_LETTER, NO_LETTER, 0, 1]);

        let iv = GenomicInterval::new("chr1", 3, 6);
        assert_eq!(array.fetch(&iv).unwrap(), vec![3, NO_LETTER, NO_LETTER]);

        let iv = GenomicInterval::new("chr9", 0, 2);
        assert!(matches!(array.fetch(&iv), Err(BelugaError::UnknownChromosome(_))));
    }

    #[test]
    fn test_higher_order_window_count() {
        // chromosome of 5 bp at order 2 stores 4 values
        let array = GenomicArray::in_memory(2, true, vec![chrom_block("chr1", vec![1, 6, 11, 12])]);
        let iv = GenomicInterval::new("chr1", 0, 5);
        assert_eq!(array.fetch(&iv).unwrap(), vec![1, 6, 11, 12]);
        let iv = GenomicInterval::new("chr1", 2, 7);
        assert_eq!(array.fetch(&iv).unwrap(), vec![11, 12, NO_LETTER, NO_LETTER]);
    }

    #[test]
    fn test_region_fetch_by_key() {
        let iv = GenomicInterval::new("chr1", 10, 14);
        let array = GenomicArray::in_memory(
            1,
            false,
            vec![BlockData {
                chrom: "chr1".into(),
                start: 10,
                name: iv.key(),
                values: vec![3, 2, 1, 0],
            }],
        );
        assert_eq!(array.fetch(&iv).unwrap(), vec![3, 2, 1, 0]);
        assert!(array.fetch(&GenomicInterval::new("chr1", 11, 15)).is_err());
    }

    #[test]
    fn test_cache_roundtrip_skips_loader() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let key = crate::hash::create_sha256_cache(&[], &["test".to_string()]).unwrap();

        for mode in [StorageMode::Memory, StorageMode::File] {
            let spec = ArraySpec {
                dataset: "dna",
                order: 1,
                whole_genome: true,
                storage: mode,
                cache_key: Some(key.clone()),
                store: &store,
            };

            let (first, cached) =
                GenomicArray::create(spec.clone(), || Ok(vec![chrom_block("chr1", vec![0, 1, 2, 3])])).unwrap();
            assert!(!cached);
            assert_eq!(first.storage_mode(), mode);

            let (second, cached) = GenomicArray::create(spec, || {
                Err(BelugaError::invalid("loader must not run on a cache hit"))
            })
            .unwrap();
            assert!(cached);
            assert_eq!(
                second.fetch(&GenomicInterval::new("chr1", 0, 4)).unwrap(),
                vec![0, 1, 2, 3]
            );
        }
    }

    #[test]
    fn test_reloading_uncached_file_keeps_earlier_mapping() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let spec = ArraySpec {
            dataset: "dna",
            order: 1,
            whole_genome: true,
            storage: StorageMode::File,
            cache_key: None,
            store: &store,
        };
        let iv = GenomicInterval::new("chr1", 0, 4);

        let (first, _) =
            GenomicArray::create(spec.clone(), || Ok(vec![chrom_block("chr1", vec![0, 1, 2, 3])])).unwrap();
        let (second, _) = GenomicArray::create(spec.clone(), || Ok(vec![chrom_block("chr1", vec![3, 3])])).unwrap();
        let (third, _) =
            GenomicArray::create(spec, || Ok(vec![chrom_block("chr1", vec![2, 2, 2, 2, 2, 2])])).unwrap();

        assert_eq!(first.fetch(&iv).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(second.fetch(&iv).unwrap(), vec![3, 3, NO_LETTER, NO_LETTER]);
        assert_eq!(third.fetch(&iv).unwrap(), vec![2, 2, 2, 2]);
        assert!(!dir.path().join("dna/uncached.bin.tmp").exists());
    }

    #[test]
    fn test_file_storage_without_cache() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());
        let spec = ArraySpec {
            dataset: "dna",
            order: 1,
            whole_genome: true,
            storage: StorageMode::File,
            cache_key: None,
            store: &store,
        };

        let (array, cached) =
            GenomicArray::create(spec, || Ok(vec![chrom_block("chr1", vec![-1024, 2])])).unwrap();
        assert!(!cached);
        assert_eq!(array.storage_mode(), StorageMode::File);
        assert!(dir.path().join("dna/uncached.bin").is_file());
        assert_eq!(array.fetch(&GenomicInterval::new("chr1", 0, 2)).unwrap(), vec![-1024, 2]);
    }
}
