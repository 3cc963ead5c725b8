//! BED reader

use super::interval::{GenomicInterval, Strand};
use crate::error::{BelugaError, IoResultExt, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A single BED record
#[derive(Debug, Clone, PartialEq)]
pub struct BedRecord {
    /// Region (strand taken from column 6 if present)
    pub interval: GenomicInterval,
    /// Optional name (column 4)
    pub name: Option<String>,
    /// Optional score (column 5)
    pub score: Option<f64>,
}

/// Read all records from a BED file
pub fn read_bed(path: &Path) -> Result<Vec<BedRecord>> {
    let file = File::open(path).with_path(path)?;
    parse_bed(BufReader::new(file), path)
}

/// Parse BED records from a reader
pub fn parse_bed<R: BufRead>(reader: R, origin: &Path) -> Result<Vec<BedRecord>> {
    let mut records = Vec::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_path(origin)?;
        let line = line.trim_end();

        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with("track")
            || line.starts_with("browser")
        {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(BelugaError::parse(
                origin,
                lineno + 1,
                format!("expected at least 3 tab-separated columns, found {}", fields.len()),
            ));
        }

        let coord = |s: &str, what: &str| -> Result<i64> {
            s.trim().parse::<i64>().map_err(|_| {
                BelugaError::parse(origin, lineno + 1, format!("invalid {} '{}'", what, s))
            })
        };

        let start = coord(fields[1], "start")?;
        let end = coord(fields[2], "end")?;
        if start < 0 || end < start {
            return Err(BelugaError::parse(
                origin,
                lineno + 1,
                format!("invalid region {}-{}", start, end),
            ));
        }

        let name = fields
            .get(3)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != ".")
            .map(str::to_string);
        let score = fields.get(4).and_then(|s| s.trim().parse::<f64>().ok());
        let strand = match fields.get(5) {
            Some(s) => s
                .trim()
                .parse::<Strand>()
                .map_err(|e| BelugaError::parse(origin, lineno + 1, e.to_string()))?,
            None => Strand::Unstranded,
        };

        records.push(BedRecord {
            interval: GenomicInterval::new(fields[0].trim(), start, end).with_strand(strand),
            name,
            score,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_bed_columns() {
        let text = "track name=peaks\n# comment\nchr1\t10\t20\nchr2\t5\t15\tpeak1\t3.5\t-\n";
        let records = parse_bed(Cursor::new(text), Path::new("roi.bed")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].interval, GenomicInterval::new("chr1", 10, 20));
        assert_eq!(records[0].name, None);
        assert_eq!(records[1].name.as_deref(), Some("peak1"));
        assert_eq!(records[1].score, Some(3.5));
        assert_eq!(records[1].interval.strand, Strand::Reverse);
    }

    #[test]
    fn test_parse_bed_rejects_bad_rows() {
        let err = parse_bed(Cursor::new("chr1\t20\t10\n"), Path::new("roi.bed")).unwrap_err();
        assert!(matches!(err, BelugaError::Parse { line: 1, .. }));

        let err = parse_bed(Cursor::new("chr1\t20\n"), Path::new("roi.bed")).unwrap_err();
        assert!(matches!(err, BelugaError::Parse { .. }));
    }
}
