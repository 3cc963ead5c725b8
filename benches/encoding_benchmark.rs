//! Performance benchmarks for Beluga
//!
//! Run with: cargo bench

use beluga::config::BelugaConfig;
use beluga::dataset::{Bioseq, RefGenomeOptions};
use beluga::encoding::{as_onehot, encode_sequence, Alphabet};
use beluga::index::BinningOptions;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic pseudo-random DNA
fn random_dna(len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..len).map(|_| *b"ACGT".choose(&mut rng).unwrap()).collect()
}

/// Write a single-chromosome genome and a BED file tiling it
fn create_genome(dir: &Path, len: usize) -> (PathBuf, PathBuf) {
    let genome = dir.join("genome.fa");
    let mut file = File::create(&genome).unwrap();
    writeln!(file, ">chr1").unwrap();
    for line in random_dna(len).chunks(60) {
        file.write_all(line).unwrap();
        writeln!(file).unwrap();
    }

    let roi = dir.join("roi.bed");
    std::fs::write(&roi, format!("chr1\t0\t{}\n", len)).unwrap();
    (genome, roi)
}

fn bench_encode_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_sequence");
    let seq = random_dna(1024 * 1024);
    let alphabet = Alphabet::dna();

    group.throughput(Throughput::Bytes(seq.len() as u64));
    for order in [1, 2, 3] {
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, &order| {
            b.iter(|| black_box(encode_sequence(&seq, &alphabet, order)));
        });
    }
    group.finish();
}

fn bench_onehot(c: &mut Criterion) {
    let alphabet = Alphabet::dna();
    let rows: Vec<Vec<i32>> = (0..64)
        .map(|_| encode_sequence(&random_dna(1000), &alphabet, 1))
        .collect();

    c.bench_function("onehot_64x1000", |b| {
        b.iter(|| black_box(as_onehot(&rows, 1, 4)));
    });
}

fn bench_bioseq_batches(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let (genome, roi) = create_genome(dir.path(), 200_000);
    let config = BelugaConfig {
        cache_dir: dir.path().join("cache"),
        threads: 4,
        progress: false,
    };
    let options = RefGenomeOptions {
        roi: Some(roi),
        binning: BinningOptions::with_binsize(200),
        order: 2,
        ..Default::default()
    };
    let bioseq = Bioseq::from_refgenome("bench", &genome, &options, &config).unwrap();

    c.bench_function("bioseq_batch_32", |b| {
        b.iter(|| black_box(bioseq.get_range(0..32).unwrap()));
    });

    c.bench_function("bioseq_load_regions", |b| {
        b.iter(|| black_box(Bioseq::from_refgenome("bench", &genome, &options, &config).unwrap()));
    });
}

criterion_group!(benches, bench_encode_sequence, bench_onehot, bench_bioseq_batches);

criterion_main!(benches);
