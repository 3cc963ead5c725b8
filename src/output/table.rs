//! Tabular output

use crate::config::OutputFormat;
use crate::error::{IoResultExt, Result};
use crate::genome::GenomicInterval;
use crate::variants::VariantBatch;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of a region listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRow {
    /// Sample index
    pub index: usize,
    /// Chromosome
    pub chrom: String,
    /// 0-based start
    pub start: i64,
    /// Exclusive end
    pub end: i64,
    /// Strand character
    pub strand: char,
}

impl RegionRow {
    /// Row for the `index`-th interval
    pub fn new(index: usize, interval: &GenomicInterval) -> Self {
        Self {
            index,
            chrom: interval.chrom.clone(),
            start: interval.start,
            end: interval.end,
            strand: interval.strand.as_char(),
        }
    }
}

/// Write a region listing as TSV (text), CSV or JSON
pub fn write_regions<W, I>(mut out: W, regions: I, format: OutputFormat) -> std::io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = GenomicInterval>,
{
    let rows = regions.into_iter().enumerate().map(|(i, iv)| RegionRow::new(i, &iv));

    match format {
        OutputFormat::Json => {
            let rows: Vec<RegionRow> = rows.collect();
            serde_json::to_writer_pretty(&mut out, &rows)?;
            writeln!(out)?;
        }
        OutputFormat::Text | OutputFormat::Csv => {
            let sep = if format == OutputFormat::Csv { "," } else { "\t" };
            writeln!(out, "{}", ["index", "chrom", "start", "end", "strand"].join(sep))?;
            for row in rows {
                writeln!(
                    out,
                    "{}{sep}{}{sep}{}{sep}{}{sep}{}",
                    row.index,
                    row.chrom,
                    row.start,
                    row.end,
                    row.strand,
                    sep = sep
                )?;
            }
        }
    }
    out.flush()
}

/// Streams variant metadata into a TSV file
pub struct VariantTableWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl VariantTableWriter {
    /// Create the file and write the header
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_path(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "name\tchrom\tposition\tref\talt").with_path(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    /// Append one row per variant in `batch`
    pub fn write_batch(&mut self, batch: &VariantBatch) -> Result<()> {
        for i in 0..batch.len() {
            writeln!(
                self.writer,
                "{}\t{}\t{}\t{}\t{}",
                batch.names[i], batch.chroms[i], batch.positions[i], batch.ref_alleles[i], batch.alt_alleles[i]
            )
            .with_path(&self.path)?;
        }
        self.rows += batch.len();
        Ok(())
    }

    /// Flush the file, returning the number of rows written
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().with_path(&self.path)?;
        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::OneHot;
    use crate::genome::Strand;
    use tempfile::TempDir;

    fn regions() -> Vec<GenomicInterval> {
        vec![
            GenomicInterval::new("chr1", 0, 10),
            GenomicInterval::new("chr2", 5, 15).with_strand(Strand::Reverse),
        ]
    }

    #[test]
    fn test_regions_text_and_csv() {
        let mut text = Vec::new();
        write_regions(&mut text, regions(), OutputFormat::Text).unwrap();
        assert_eq!(
            String::from_utf8(text).unwrap(),
            "index\tchrom\tstart\tend\tstrand\n0\tchr1\t0\t10\t.\n1\tchr2\t5\t15\t-\n"
        );

        let mut csv = Vec::new();
        write_regions(&mut csv, regions(), OutputFormat::Csv).unwrap();
        assert!(String::from_utf8(csv).unwrap().ends_with("1,chr2,5,15,-\n"));
    }

    #[test]
    fn test_regions_json() {
        let mut json = Vec::new();
        write_regions(&mut json, regions(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value[1]["chrom"], "chr2");
        assert_eq!(value[1]["strand"], "-");
    }

    #[test]
    fn test_variant_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("v.tsv");
        let batch = VariantBatch {
            names: vec!["rs1".into(), "".into()],
            chroms: vec!["chr1".into(), "chr2".into()],
            positions: vec![4, 99],
            ref_alleles: vec!["A".into(), "C".into()],
            alt_alleles: vec!["G".into(), "T".into()],
            refs: OneHot::zeros([2, 1, 1, 4]),
            alts: OneHot::zeros([2, 1, 1, 4]),
        };

        let mut writer = VariantTableWriter::create(&path).unwrap();
        writer.write_batch(&batch).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "name\tchrom\tposition\tref\talt");
        assert_eq!(lines[2], "\tchr2\t99\tC\tT");
    }
}
