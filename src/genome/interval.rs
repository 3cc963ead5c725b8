//! Genomic intervals and strands

use crate::error::{BelugaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strand of a genomic feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Strand {
    /// Plus strand (`+`)
    Forward,
    /// Minus strand (`-`)
    Reverse,
    /// No strand information (`.`)
    #[default]
    Unstranded,
}

impl Strand {
    /// Single-character representation used in BED files
    pub fn as_char(&self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
            Self::Unstranded => '.',
        }
    }

    /// Whether sequences on this strand must be reverse complemented
    pub fn is_reverse(&self) -> bool {
        matches!(self, Self::Reverse)
    }
}

impl FromStr for Strand {
    type Err = BelugaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "+" => Ok(Self::Forward),
            "-" => Ok(Self::Reverse),
            "." | "" => Ok(Self::Unstranded),
            other => Err(BelugaError::invalid(format!("Invalid strand: '{}'", other))),
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Half-open, 0-based genomic interval.
///
/// `start` is signed because flanking can push a bin past the
/// beginning of a chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicInterval {
    /// Chromosome (or sequence id)
    pub chrom: String,
    /// Start position (inclusive)
    pub start: i64,
    /// End position (exclusive)
    pub end: i64,
    /// Strand
    pub strand: Strand,
}

impl GenomicInterval {
    /// Create an unstranded interval
    pub fn new(chrom: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            strand: Strand::Unstranded,
        }
    }

    /// Set the strand
    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    /// Length in basepairs
    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    /// Whether the interval covers no basepairs
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Extend the interval by `flank` basepairs on both sides
    pub fn extend(&self, flank: i64) -> Self {
        Self {
            chrom: self.chrom.clone(),
            start: self.start - flank,
            end: self.end + flank,
            strand: self.strand,
        }
    }

    /// Key identifying exactly this interval (strand-independent)
    pub fn key(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start, self.end)
    }
}

impl fmt::Display for GenomicInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)?;
        if self.strand != Strand::Unstranded {
            write!(f, ":{}", self.strand)?;
        }
        Ok(())
    }
}

impl FromStr for GenomicInterval {
    type Err = BelugaError;

    /// Parse `chrom:start-end` or `chrom:start-end:strand`
    fn from_str(s: &str) -> Result<Self> {
        let bad = || BelugaError::invalid(format!("Invalid interval '{}', expected chrom:start-end[:strand]", s));

        let (chrom, rest) = s.split_once(':').ok_or_else(bad)?;
        let (range, strand) = match rest.split_once(':') {
            Some((range, strand)) => (range, strand.parse()?),
            None => (rest, Strand::Unstranded),
        };
        let (start, end) = range.split_once('-').ok_or_else(bad)?;
        let start: i64 = start.replace(',', "").parse().map_err(|_| bad())?;
        let end: i64 = end.replace(',', "").parse().map_err(|_| bad())?;

        if chrom.is_empty() || end < start {
            return Err(bad());
        }

        Ok(Self::new(chrom, start, end).with_strand(strand))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval() {
        let iv: GenomicInterval = "chr1:100-200".parse().unwrap();
        assert_eq!(iv, GenomicInterval::new("chr1", 100, 200));
        assert_eq!(iv.len(), 100);

        let iv: GenomicInterval = "chr2:1,000-1,010:-".parse().unwrap();
        assert_eq!(iv.start, 1000);
        assert_eq!(iv.strand, Strand::Reverse);
        assert_eq!(iv.to_string(), "chr2:1000-1010:-");

        assert!("chr1:200-100".parse::<GenomicInterval>().is_err());
        assert!("chr1".parse::<GenomicInterval>().is_err());
    }

    #[test]
    fn test_extend_can_go_negative() {
        let iv = GenomicInterval::new("chr1", 2, 6).extend(3);
        assert_eq!(iv.start, -1);
        assert_eq!(iv.end, 9);
        assert_eq!(iv.len(), 10);
    }
}
