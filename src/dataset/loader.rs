//! Sequence loading
//!
//! Turns FASTA records into encoded [`BlockData`] for a genomic array,
//! either one block per chromosome or one block per indexed region.
//! Encoding runs on a rayon pool.

use crate::config::BelugaConfig;
use crate::encoding::{encode_sequence, Alphabet};
use crate::error::{BelugaError, Result};
use crate::genome::{GenomicInterval, SeqRecord};
use crate::progress::ProgressReporter;
use crate::storage::BlockData;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Encode every record as a whole-chromosome block
pub fn load_whole_genome(
    records: Vec<SeqRecord>,
    alphabet: &Alphabet,
    order: usize,
    config: &BelugaConfig,
) -> Result<Vec<BlockData>> {
    let progress = ProgressReporter::with_enabled(config.progress, "Loading sequences", records.len() as u64);
    let pool = config.thread_pool()?;

    let blocks = pool.install(|| {
        records
            .into_par_iter()
            .map(|record| {
                let values = encode_sequence(&record.seq, alphabet, order);
                progress.inc(1);
                BlockData {
                    chrom: record.id.clone(),
                    start: 0,
                    name: record.id,
                    values,
                }
            })
            .collect::<Vec<_>>()
    });

    progress.finish_success(&format!("{} sequences", blocks.len()));
    Ok(blocks)
}

/// Encode the sub-sequence of every region, padding outside the
/// chromosome with the alphabet's unknown letter.
///
/// Regions appearing more than once are stored once.
pub fn load_regions<I>(
    records: &[SeqRecord],
    regions: I,
    alphabet: &Alphabet,
    order: usize,
    config: &BelugaConfig,
) -> Result<Vec<BlockData>>
where
    I: IntoIterator<Item = GenomicInterval>,
{
    let by_id: HashMap<&str, &SeqRecord> = records.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for region in regions {
        if !by_id.contains_key(region.chrom.as_str()) {
            return Err(BelugaError::UnknownChromosome(region.chrom));
        }
        if seen.insert(region.key()) {
            unique.push(region);
        }
    }

    let pad = alphabet.seqtype().unknown_letter();
    let progress = ProgressReporter::with_enabled(config.progress, "Loading regions", unique.len() as u64);
    let pool = config.thread_pool()?;

    let blocks = pool.install(|| {
        unique
            .into_par_iter()
            .map(|region| {
                let record = by_id[region.chrom.as_str()];
                let seq = record.padded_slice(region.start, region.end, pad);
                let values = encode_sequence(&seq, alphabet, order);
                progress.inc(1);
                BlockData {
                    name: region.key(),
                    chrom: region.chrom,
                    start: region.start,
                    values,
                }
            })
            .collect::<Vec<_>>()
    });

    progress.finish_success(&format!("{} regions", blocks.len()));
    Ok(blocks)
}
