//! Content fingerprints for cache keys
//!
//! A cache key is the SHA-256 digest over the bytes of every input file
//! followed by the loading parameters, so an entry is reused only when
//! both the data and the way it was encoded are unchanged.

use crate::error::{IoResultExt, Result};
use crate::genome::SeqRecord;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Read buffer used while hashing input files
const HASH_BUFFER_SIZE: usize = 1024 * 1024;

/// Hex-encoded SHA-256 cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 digest of a file's content
pub fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let file = File::open(path).with_path(path)?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).with_path(path)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// Build a cache key from input files and loading parameters.
///
/// Files are hashed in parallel; their digests are combined in the given
/// order so the key does not depend on scheduling.
pub fn create_sha256_cache(files: &[&Path], parameters: &[String]) -> Result<CacheKey> {
    let digests: Vec<Result<[u8; 32]>> = files.par_iter().map(|path| hash_file(path)).collect();

    let mut hasher = Sha256::new();
    for digest in digests {
        hasher.update(digest?);
    }
    for parameter in parameters {
        hasher.update(parameter.as_bytes());
        hasher.update([0u8]);
    }

    let key = CacheKey(hex::encode(hasher.finalize()));
    tracing::debug!("Cache key {} for {} files", key, files.len());
    Ok(key)
}

/// SHA-256 over the ids and residues of in-memory records
pub fn digest_records(records: &[SeqRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.id.as_bytes());
        hasher.update([0u8]);
        hasher.update((record.seq.len() as u64).to_le_bytes());
        hasher.update(&record.seq);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_depends_on_content_and_parameters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genome.fa");
        std::fs::write(&path, ">chr1\nACGT\n").unwrap();

        let params = vec!["order=1".to_string()];
        let a = create_sha256_cache(&[&path], &params).unwrap();
        let b = create_sha256_cache(&[&path], &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);

        let c = create_sha256_cache(&[&path], &["order=2".to_string()]).unwrap();
        assert_ne!(a, c);

        std::fs::write(&path, ">chr1\nACGA\n").unwrap();
        let d = create_sha256_cache(&[&path], &params).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_parameter_boundaries_matter() {
        let a = create_sha256_cache(&[], &["ab".to_string(), "c".to_string()]).unwrap();
        let b = create_sha256_cache(&[], &["a".to_string(), "bc".to_string()]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_digest_covers_residues() {
        let a = digest_records(&[SeqRecord::new("a", "AAAA")]);
        let t = digest_records(&[SeqRecord::new("a", "TTTT")]);
        assert_ne!(a, t);
        assert_eq!(a, digest_records(&[SeqRecord::new("a", "aaaa")]));
        assert_ne!(
            digest_records(&[SeqRecord::new("a", "AC"), SeqRecord::new("b", "GT")]),
            digest_records(&[SeqRecord::new("a", "ACG"), SeqRecord::new("b", "T")])
        );
    }

    #[test]
    fn test_missing_file() {
        let err = create_sha256_cache(&[Path::new("/nonexistent/genome.fa")], &[]);
        assert!(err.is_err());
    }
}
