//! Variant streamer
//!
//! Reads SNVs from a VCF file and returns batches of one-hot sequence
//! contexts around each variant, once with the reference allele and once
//! with the alternative allele substituted.

use crate::config::SeqType;
use crate::dataset::Bioseq;
use crate::encoding::{as_onehot, OneHot};
use crate::error::{BelugaError, Result};
use crate::genome::{GenomicInterval, VariantRecord, VcfReader};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A batch of variants with their sequence contexts
#[derive(Debug, Clone, Serialize)]
pub struct VariantBatch {
    /// Variant ids (empty when the VCF has none)
    pub names: Vec<String>,
    /// Chromosomes
    pub chroms: Vec<String>,
    /// 0-based positions
    pub positions: Vec<i64>,
    /// Reference alleles (upper case)
    pub ref_alleles: Vec<String>,
    /// Alternative alleles (upper case)
    pub alt_alleles: Vec<String>,
    /// Contexts carrying the reference allele
    #[serde(skip)]
    pub refs: OneHot,
    /// Contexts carrying the alternative allele
    #[serde(skip)]
    pub alts: OneHot,
}

impl VariantBatch {
    /// Number of variants in the batch
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Streams variant contexts from a whole-genome [`Bioseq`]
#[derive(Debug)]
pub struct VariantStreamer<'a> {
    bioseq: &'a Bioseq,
    vcf: PathBuf,
    binsize: usize,
    batch_size: usize,
}

impl<'a> VariantStreamer<'a> {
    /// Create a streamer over `vcf` with contexts of `binsize` basepairs
    pub fn new(bioseq: &'a Bioseq, vcf: &Path, binsize: usize, batch_size: usize) -> Result<Self> {
        if bioseq.alphabet().seqtype() != SeqType::Dna {
            return Err(BelugaError::invalid("Variant contexts require a DNA reference genome"));
        }
        if !bioseq.garray().whole_genome() {
            return Err(BelugaError::invalid(
                "Variant contexts require the reference genome to be loaded with store_whole_genome",
            ));
        }
        // every k-mer window covering the variant must lie inside the context
        if center_offset(binsize) < bioseq.order() {
            return Err(BelugaError::invalid(format!(
                "binsize {} is too small for order {}",
                binsize,
                bioseq.order()
            )));
        }
        if batch_size == 0 {
            return Err(BelugaError::invalid("batch_size must be positive"));
        }

        Ok(Self {
            bioseq,
            vcf: vcf.to_path_buf(),
            binsize,
            batch_size,
        })
    }

    /// Context size in basepairs
    pub fn binsize(&self) -> usize {
        self.binsize
    }

    /// Whether a record is a biallelic SNV over ACGT
    pub fn is_compatible(record: &VariantRecord) -> bool {
        if record.alts.len() != 1 {
            return false;
        }
        is_nucleotide(&record.reference) && is_nucleotide(&record.alts[0])
    }

    /// Context window of a record, or `None` when it starts before the chromosome
    pub fn context(&self, record: &VariantRecord) -> Option<GenomicInterval> {
        let half = (self.binsize / 2) as i64;
        let even = if self.binsize % 2 == 0 { 1 } else { 0 };
        let start = record.pos - half + even - 1;
        let end = record.pos + half;
        if start < 0 {
            return None;
        }
        Some(GenomicInterval::new(record.chrom.clone(), start, end))
    }

    /// Number of records that will be streamed
    pub fn variant_count(&self) -> Result<usize> {
        let mut count = 0;
        for record in VcfReader::open(&self.vcf)? {
            let record = record?;
            if Self::is_compatible(&record) && self.context(&record).is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Iterate over batches of variant contexts
    pub fn batches(&self) -> Result<VariantBatches<'_>> {
        Ok(VariantBatches {
            streamer: self,
            records: VcfReader::open(&self.vcf)?,
            done: false,
        })
    }

    /// k-mer rows for the reference and the substituted allele
    fn mutate(&self, record: &VariantRecord, interval: &GenomicInterval) -> Result<(Vec<i32>, Vec<i32>)> {
        let reference = self.bioseq.iseq_for_interval(interval)?;
        let mut alternative = reference.clone();

        let alphabet = self.bioseq.alphabet();
        let size = alphabet.size() as i32;
        let order = self.bioseq.order();
        let ref_letter = alphabet.index(record.reference.as_bytes()[0].to_ascii_uppercase());
        let alt_letter = alphabet.index(record.alts[0].as_bytes()[0].to_ascii_uppercase());

        let center = center_offset(self.binsize);
        for o in 0..order {
            // window whose o-th least significant digit is the variant
            let pos = center + o - order;
            let weight = size.pow(o as u32);
            let window = reference[pos];
            if window < 0 {
                continue;
            }

            let genome_letter = (window / weight) % size;
            if genome_letter != ref_letter {
                tracing::info!(
                    "VCF reference and reference genome not compatible. Expected reference {}, but VCF indicates {}. \
                     VCF-Record: {}:{}-{}>{};{}. Skipped.",
                    genome_letter,
                    ref_letter,
                    record.chrom,
                    record.pos,
                    record.reference,
                    record.alts[0],
                    record.id.as_deref().unwrap_or(".")
                );
                continue;
            }
            alternative[pos] += (alt_letter - ref_letter) * weight;
        }

        Ok((reference, alternative))
    }

    /// Tensor shape of `n` contexts
    pub fn batch_shape(&self, n: usize) -> [usize; 4] {
        let width = self.binsize + 1 - self.bioseq.order();
        let channels = self.bioseq.channels();
        if self.bioseq.channel_last() {
            [n, width, 1, channels]
        } else {
            [n, channels, width, 1]
        }
    }

    fn onehot(&self, rows: &[Vec<i32>]) -> OneHot {
        if rows.is_empty() {
            return OneHot::zeros(self.batch_shape(0));
        }
        let onehot = as_onehot(rows, self.bioseq.order(), self.bioseq.alphabet().size());
        if self.bioseq.channel_last() {
            onehot
        } else {
            onehot.to_channel_first()
        }
    }
}

/// Offset just past the variant inside its context
fn center_offset(binsize: usize) -> usize {
    binsize / 2 + binsize % 2
}

fn is_nucleotide(allele: &str) -> bool {
    matches!(allele.as_bytes(), [b] if b"ACGT".contains(&b.to_ascii_uppercase()))
}

/// Iterator over [`VariantBatch`]es
pub struct VariantBatches<'a> {
    streamer: &'a VariantStreamer<'a>,
    records: VcfReader<BufReader<File>>,
    done: bool,
}

impl<'a> VariantBatches<'a> {
    fn next_batch(&mut self) -> Result<Option<VariantBatch>> {
        let streamer = self.streamer;
        let mut names = Vec::new();
        let mut chroms = Vec::new();
        let mut positions = Vec::new();
        let mut ref_alleles = Vec::new();
        let mut alt_alleles = Vec::new();
        let mut ref_rows = Vec::new();
        let mut alt_rows = Vec::new();

        while names.len() < streamer.batch_size {
            let record = match self.records.next() {
                Some(record) => record?,
                None => {
                    self.done = true;
                    break;
                }
            };

            if !VariantStreamer::is_compatible(&record) {
                continue;
            }
            let interval = match streamer.context(&record) {
                Some(interval) => interval,
                None => continue,
            };

            let (reference, alternative) = streamer.mutate(&record, &interval)?;
            names.push(record.id.clone().unwrap_or_default());
            chroms.push(record.chrom.clone());
            positions.push(record.pos - 1);
            ref_alleles.push(record.reference.to_ascii_uppercase());
            alt_alleles.push(record.alts[0].to_ascii_uppercase());
            ref_rows.push(reference);
            alt_rows.push(alternative);
        }

        if names.is_empty() {
            return Ok(None);
        }

        Ok(Some(VariantBatch {
            names,
            chroms,
            positions,
            ref_alleles,
            alt_alleles,
            refs: streamer.onehot(&ref_rows),
            alts: streamer.onehot(&alt_rows),
        }))
    }
}

impl<'a> Iterator for VariantBatches<'a> {
    type Item = Result<VariantBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_batch() {
            Ok(batch) => batch.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BelugaConfig;
    use crate::dataset::{RefGenomeOptions, SeqOptions};
    use crate::genome::SeqRecord;
    use tempfile::TempDir;

    const VCF: &str = "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr1\t1\tedge\tA\tG\t.\tPASS\t.\n\
chr1\t5\trs1\tA\tG\t.\tPASS\t.\n\
chr1\t6\tbad\tA\tT\t.\tPASS\t.\n\
chr1\t7\tmulti\tG\tA,T\t.\tPASS\t.\n\
chr1\t7\tindel\tG\tGA\t.\tPASS\t.\n\
chr1\t9\t.\ta\tc\t.\tPASS\t.\n";

    struct Fixture {
        dir: TempDir,
        vcf: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("genome.fa"), ">chr1\nACGTACGTAC\n").unwrap();
            let vcf = dir.path().join("calls.vcf");
            std::fs::write(&vcf, VCF).unwrap();
            Self { dir, vcf }
        }

        fn bioseq(&self, order: usize) -> Bioseq {
            let options = RefGenomeOptions {
                store_whole_genome: true,
                order,
                ..Default::default()
            };
            let config = BelugaConfig {
                cache_dir: self.dir.path().join("cache"),
                threads: 1,
                progress: false,
            };
            Bioseq::from_refgenome("dna", &self.dir.path().join("genome.fa"), &options, &config).unwrap()
        }
    }

    fn argmax_row(onehot: &OneHot, sample: usize) -> Vec<Option<usize>> {
        let [_, l, _, c] = onehot.shape();
        (0..l)
            .map(|j| (0..c).find(|&k| onehot.get([sample, j, 0, k]) == 1))
            .collect()
    }

    fn record(reference: &str, alts: &[&str]) -> VariantRecord {
        VariantRecord {
            chrom: "chr1".into(),
            pos: 10,
            id: None,
            reference: reference.into(),
            alts: alts.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_is_compatible() {
        assert!(VariantStreamer::is_compatible(&record("A", &["g"])));
        assert!(!VariantStreamer::is_compatible(&record("A", &["G", "T"])));
        assert!(!VariantStreamer::is_compatible(&record("A", &[])));
        assert!(!VariantStreamer::is_compatible(&record("AT", &["A"])));
        assert!(!VariantStreamer::is_compatible(&record("N", &["A"])));
    }

    #[test]
    fn test_context_window() {
        let fx = Fixture::new();
        let bioseq = fx.bioseq(1);

        let even = VariantStreamer::new(&bioseq, &fx.vcf, 4, 2).unwrap();
        let mut rec = record("A", &["G"]);
        rec.pos = 5;
        assert_eq!(even.context(&rec), Some(GenomicInterval::new("chr1", 3, 7)));

        let odd = VariantStreamer::new(&bioseq, &fx.vcf, 5, 2).unwrap();
        assert_eq!(odd.context(&rec), Some(GenomicInterval::new("chr1", 2, 7)));

        rec.pos = 1;
        assert_eq!(even.context(&rec), None);
    }

    #[test]
    fn test_batches_order1() {
        let fx = Fixture::new();
        let bioseq = fx.bioseq(1);
        let streamer = VariantStreamer::new(&bioseq, &fx.vcf, 4, 2).unwrap();
        assert_eq!(streamer.variant_count().unwrap(), 3);

        let batches: Vec<_> = streamer.batches().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[0].names, vec!["rs1", "bad"]);
        assert_eq!(batches[0].positions, vec![4, 5]);
        assert_eq!(batches[1].names, vec![""]);
        assert_eq!(batches[1].ref_alleles, vec!["A"]);
        assert_eq!(batches[1].alt_alleles, vec!["C"]);

        // chr1:3-7 is TACG, the A becomes G
        let first = &batches[0];
        assert_eq!(first.refs.shape(), [2, 4, 1, 4]);
        assert_eq!(argmax_row(&first.refs, 0), vec![Some(3), Some(0), Some(1), Some(2)]);
        assert_eq!(argmax_row(&first.alts, 0), vec![Some(3), Some(2), Some(1), Some(2)]);

        // reference mismatch leaves the context untouched
        assert_eq!(argmax_row(&first.refs, 1), argmax_row(&first.alts, 1));

        // chr1:7-11 runs past the end of the chromosome
        let last = &batches[1];
        assert_eq!(argmax_row(&last.refs, 0), vec![Some(3), Some(0), Some(1), None]);
        assert_eq!(argmax_row(&last.alts, 0), vec![Some(3), Some(1), Some(1), None]);
    }

    #[test]
    fn test_batches_order2_mutates_every_covering_window() {
        let fx = Fixture::new();
        let bioseq = fx.bioseq(2);
        let streamer = VariantStreamer::new(&bioseq, &fx.vcf, 4, 8).unwrap();
        let batch = streamer.batches().unwrap().next().unwrap().unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.refs.shape(), [3, 3, 1, 16]);
        assert_eq!(streamer.batch_shape(3), batch.alts.shape());

        // TACG -> TGCG: TA, AC, CG become TG, GC, CG
        assert_eq!(argmax_row(&batch.refs, 0), vec![Some(12), Some(1), Some(6)]);
        assert_eq!(argmax_row(&batch.alts, 0), vec![Some(14), Some(9), Some(6)]);
    }

    #[test]
    fn test_exact_batch_multiple_has_no_empty_tail() {
        let fx = Fixture::new();
        let bioseq = fx.bioseq(1);
        let streamer = VariantStreamer::new(&bioseq, &fx.vcf, 4, 3).unwrap();
        let batches: Vec<_> = streamer.batches().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_requires_whole_genome_dna() {
        let fx = Fixture::new();
        let config = BelugaConfig {
            cache_dir: fx.dir.path().join("cache"),
            threads: 1,
            progress: false,
        };
        let records = vec![SeqRecord::new("s1", "ACGT")];
        let bioseq = Bioseq::from_records("seqs", records, &SeqOptions::default(), &config).unwrap();
        assert!(matches!(
            VariantStreamer::new(&bioseq, &fx.vcf, 4, 2),
            Err(BelugaError::InvalidInput(_))
        ));

        let genome = fx.bioseq(1);
        assert!(VariantStreamer::new(&genome, &fx.vcf, 4, 0).is_err());

        let order2 = fx.bioseq(2);
        assert!(VariantStreamer::new(&order2, &fx.vcf, 2, 2).is_err());
        assert!(VariantStreamer::new(&order2, &fx.vcf, 3, 2).is_ok());
    }
}
