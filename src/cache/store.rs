//! On-disk cache of encoded genomic arrays
//!
//! Layout: `<root>/<dataset>/<key>.meta` holds the block table,
//! `<key>.bin` (raw, memory-mapped) or `<key>.lz4` (compressed, loaded
//! into memory) holds the encoded values.

use crate::config::StorageMode;
use crate::error::{BelugaError, IoResultExt, Result};
use crate::hash::CacheKey;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

/// Entry name used for file-backed arrays that are not cached
pub const UNCACHED_ENTRY: &str = "uncached";

/// Paths of a single cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    /// Block table
    pub meta: PathBuf,
    /// Encoded values
    pub data: PathBuf,
}

impl EntryPaths {
    /// Whether both files of the entry exist
    pub fn exists(&self) -> bool {
        self.meta.is_file() && self.data.is_file()
    }
}

/// Summary of a cached entry
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    /// Dataset name
    pub dataset: String,
    /// Entry name (cache key or `uncached`)
    pub entry: String,
    /// Total size of the entry's files in bytes
    pub size: u64,
    /// Last modification (Unix timestamp)
    pub modified: u64,
}

/// Cache rooted at a directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root` (created lazily)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a dataset
    pub fn dataset_dir(&self, dataset: &str) -> Result<PathBuf> {
        if dataset.is_empty() || dataset.contains(['/', '\\']) || dataset.starts_with('.') {
            return Err(BelugaError::invalid(format!("Invalid dataset name '{}'", dataset)));
        }
        Ok(self.root.join(dataset))
    }

    /// Paths of the entry for `key` (or the shared uncached entry)
    pub fn entry_paths(&self, dataset: &str, key: Option<&CacheKey>, mode: StorageMode) -> Result<EntryPaths> {
        let dir = self.dataset_dir(dataset)?;
        let stem = key.map(CacheKey::as_str).unwrap_or(UNCACHED_ENTRY);
        let ext = match mode {
            StorageMode::Memory => "lz4",
            StorageMode::File => "bin",
        };
        Ok(EntryPaths {
            meta: dir.join(format!("{}.meta", stem)),
            data: dir.join(format!("{}.{}", stem, ext)),
        })
    }

    /// Make sure the dataset directory exists
    pub fn ensure_dataset_dir(&self, dataset: &str) -> Result<PathBuf> {
        let dir = self.dataset_dir(dataset)?;
        std::fs::create_dir_all(&dir).with_path(&dir)?;
        Ok(dir)
    }

    /// List all entries, grouped by dataset and entry name
    pub fn list(&self) -> Result<Vec<CacheEntryInfo>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries: Vec<CacheEntryInfo> = Vec::new();
        for item in WalkDir::new(&self.root).min_depth(2).max_depth(2).sort_by_file_name() {
            let item = item.map_err(|e| BelugaError::Cache(e.to_string()))?;
            if !item.file_type().is_file() {
                continue;
            }

            let path = item.path();
            let dataset = match path.parent().and_then(|p| p.file_name()) {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };
            let entry = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().to_string(),
                None => continue,
            };

            let metadata = item.metadata().map_err(|e| BelugaError::Cache(e.to_string()))?;
            let modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);

            match entries
                .iter_mut()
                .find(|e| e.dataset == dataset && e.entry == entry)
            {
                Some(existing) => {
                    existing.size += metadata.len();
                    existing.modified = existing.modified.max(modified);
                }
                None => entries.push(CacheEntryInfo {
                    dataset,
                    entry,
                    size: metadata.len(),
                    modified,
                }),
            }
        }

        Ok(entries)
    }

    /// Remove all entries, or only those of `dataset`. Returns the number of entries removed.
    pub fn clear(&self, dataset: Option<&str>) -> Result<usize> {
        let entries = self.list()?;
        let removed = entries
            .iter()
            .filter(|e| dataset.map_or(true, |d| e.dataset == d))
            .count();

        let target = match dataset {
            Some(dataset) => self.dataset_dir(dataset)?,
            None => self.root.clone(),
        };
        if target.exists() {
            std::fs::remove_dir_all(&target).with_path(&target)?;
            tracing::info!("Removed {} cache entries under {:?}", removed, target);
        }
        Ok(removed)
    }

    /// Print a table of cached entries
    pub fn print_summary(&self) -> Result<()> {
        let entries = self.list()?;
        println!("=== Cache: {} ===", self.root.display());
        if entries.is_empty() {
            println!("(empty)");
            return Ok(());
        }

        let total: u64 = entries.iter().map(|e| e.size).sum();
        for entry in &entries {
            println!(
                "{:<16} {:<64} {:>10}  {}",
                entry.dataset,
                entry.entry,
                humansize::format_size(entry.size, humansize::BINARY),
                format_timestamp(entry.modified)
            );
        }
        println!(
            "{} entries, {}",
            entries.len(),
            humansize::format_size(total, humansize::BINARY)
        );
        Ok(())
    }
}

fn format_timestamp(ts: u64) -> String {
    chrono::DateTime::from_timestamp(ts as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_entry_paths() {
        let store = CacheStore::new("/cache");
        let paths = store.entry_paths("dna", None, StorageMode::File).unwrap();
        assert_eq!(paths.meta, PathBuf::from("/cache/dna/uncached.meta"));
        assert_eq!(paths.data, PathBuf::from("/cache/dna/uncached.bin"));
        assert!(store.entry_paths("../etc", None, StorageMode::File).is_err());
    }

    #[test]
    fn test_list_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = CacheStore::new(dir.path());

        touch(&dir.path().join("dna/abc.meta"), b"meta");
        touch(&dir.path().join("dna/abc.lz4"), b"123456");
        touch(&dir.path().join("prot/def.meta"), b"m");
        touch(&dir.path().join("prot/def.bin"), b"12");

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);
        let dna = entries.iter().find(|e| e.dataset == "dna").unwrap();
        assert_eq!(dna.entry, "abc");
        assert_eq!(dna.size, 10);

        assert_eq!(store.clear(Some("dna")).unwrap(), 1);
        assert_eq!(store.list().unwrap().len(), 1);

        assert_eq!(store.clear(None).unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }
}
