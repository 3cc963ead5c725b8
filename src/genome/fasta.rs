//! FASTA reader
//!
//! Streams multi-record FASTA files into [`SeqRecord`]s. Residues are
//! uppercased on load so downstream encoders only deal with one case.

use crate::error::{BelugaError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A named biological sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    /// Identifier (first token of the header line)
    pub id: String,
    /// Remainder of the header line
    pub description: String,
    /// Uppercased residues
    pub seq: Vec<u8>,
}

impl SeqRecord {
    /// Create a record from an id and residues
    pub fn new(id: impl Into<String>, seq: impl AsRef<[u8]>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            seq: seq.as_ref().to_ascii_uppercase(),
        }
    }

    /// Number of residues
    pub fn len(&self) -> usize {
        self.seq.len()
    }

    /// Whether the record has no residues
    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    /// Extract `[start, end)` clipped to the record, padding with `pad`
    /// where the range reaches outside of it.
    pub fn padded_slice(&self, start: i64, end: i64, pad: u8) -> Vec<u8> {
        let len = self.seq.len() as i64;
        let mut out = Vec::with_capacity((end - start).max(0) as usize);

        let lead = (-start).clamp(0, (end - start).max(0));
        out.extend(std::iter::repeat(pad).take(lead as usize));

        let from = start.clamp(0, len);
        let to = end.clamp(0, len);
        if to > from {
            out.extend_from_slice(&self.seq[from as usize..to as usize]);
        }

        let want = (end - start).max(0) as usize;
        if out.len() < want {
            out.resize(want, pad);
        }
        out
    }
}

/// Read all records from a FASTA file
pub fn read_fasta(path: &Path) -> Result<Vec<SeqRecord>> {
    let file = File::open(path).with_path(path)?;
    parse_fasta(BufReader::new(file), path)
}

/// Parse FASTA records from a reader; `origin` is used for error messages
pub fn parse_fasta<R: BufRead>(reader: R, origin: &Path) -> Result<Vec<SeqRecord>> {
    let mut records = Vec::new();
    let mut current: Option<SeqRecord> = None;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_path(origin)?;
        let line = line.trim_end();

        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let header = header.trim();
            let (id, description) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim()),
                None => (header, ""),
            };
            if id.is_empty() {
                return Err(BelugaError::parse(origin, lineno + 1, "empty sequence id"));
            }
            current = Some(SeqRecord {
                id: id.to_string(),
                description: description.to_string(),
                seq: Vec::new(),
            });
        } else if line.starts_with(';') {
            // legacy comment line
            continue;
        } else {
            match current.as_mut() {
                Some(record) => record
                    .seq
                    .extend(line.bytes().filter(|b| !b.is_ascii_whitespace()).map(|b| b.to_ascii_uppercase())),
                None => {
                    return Err(BelugaError::parse(
                        origin,
                        lineno + 1,
                        "sequence data before the first '>' header",
                    ))
                }
            }
        }
    }

    if let Some(record) = current {
        records.push(record);
    }

    tracing::debug!("Read {} sequences from {:?}", records.len(), origin);
    Ok(records)
}

/// Truncate or right-pad every record to exactly `fixedlen` residues
pub fn sequence_padding(records: Vec<SeqRecord>, fixedlen: usize, pad: u8) -> Vec<SeqRecord> {
    records
        .into_iter()
        .map(|mut record| {
            record.seq.resize(fixedlen, pad);
            record
        })
        .collect()
}
