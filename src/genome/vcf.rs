//! Minimal VCF reader
//!
//! Only the fixed columns needed for variant effect prediction are
//! parsed (CHROM, POS, ID, REF, ALT). Records are streamed so large call
//! sets never have to be held in memory.

use crate::error::{BelugaError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// A single VCF data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRecord {
    /// Chromosome
    pub chrom: String,
    /// 1-based position
    pub pos: i64,
    /// Variant id (`None` for `.`)
    pub id: Option<String>,
    /// Reference allele
    pub reference: String,
    /// Alternative alleles (empty for `.`)
    pub alts: Vec<String>,
}

/// Streaming VCF reader
pub struct VcfReader<R: BufRead> {
    lines: Lines<R>,
    origin: PathBuf,
    lineno: usize,
}

impl VcfReader<BufReader<File>> {
    /// Open a plain-text VCF file
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_path(path)?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> VcfReader<R> {
    /// Wrap a reader; `origin` is used for error messages
    pub fn new(reader: R, origin: &Path) -> Self {
        Self {
            lines: reader.lines(),
            origin: origin.to_path_buf(),
            lineno: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Result<VariantRecord> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(BelugaError::parse(
                &self.origin,
                self.lineno,
                format!("expected at least 5 columns, found {}", fields.len()),
            ));
        }

        let pos = fields[1].parse::<i64>().map_err(|_| {
            BelugaError::parse(&self.origin, self.lineno, format!("invalid position '{}'", fields[1]))
        })?;

        let id = match fields[2] {
            "." | "" => None,
            id => Some(id.to_string()),
        };

        let alts = match fields[4] {
            "." | "" => Vec::new(),
            alts => alts.split(',').map(str::to_string).collect(),
        };

        Ok(VariantRecord {
            chrom: fields[0].to_string(),
            pos,
            id,
            reference: fields[3].to_string(),
            alts,
        })
    }
}

impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(BelugaError::io(&self.origin, e))),
            };
            self.lineno += 1;

            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(self.parse_line(line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const VCF: &str = "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr1\t5\trs1\tA\tG\t.\tPASS\t.\n\
chr1\t9\t.\tC\tT,G\t.\tPASS\t.\n\
chr2\t3\t.\tG\t.\t.\tPASS\t.\n";

    #[test]
    fn test_stream_records() {
        let records: Vec<_> = VcfReader::new(Cursor::new(VCF), Path::new("v.vcf"))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id.as_deref(), Some("rs1"));
        assert_eq!(records[0].pos, 5);
        assert_eq!(records[1].id, None);
        assert_eq!(records[1].alts, vec!["T", "G"]);
        assert!(records[2].alts.is_empty());
    }

    #[test]
    fn test_bad_position_reports_line() {
        let text = "#header\nchr1\tx\t.\tA\tG\n";
        let err = VcfReader::new(Cursor::new(text), Path::new("v.vcf"))
            .next()
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, BelugaError::Parse { line: 2, .. }));
    }
}
