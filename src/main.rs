//! Beluga CLI - Genomic sequence datasets for deep learning
//!
//! Encodes reference genomes, sequence collections and variant contexts
//! into one-hot `.npy` arrays.

use anyhow::Context;
use beluga::cache::CacheStore;
use beluga::config::{BelugaConfig, CacheAction, CliArgs, Commands, EncodingArgs, LogFormat, OutputFormat, SeqType};
use beluga::dataset::{Bioseq, RefGenomeOptions, SeqOptions};
use beluga::error::BelugaError;
use beluga::genome::{read_fasta, GenomicInterval};
use beluga::index::GenomicIndexer;
use beluga::output::{write_npy, write_regions, NpyWriter, VariantTableWriter};
use beluga::progress::ProgressReporter;
use beluga::variants::VariantStreamer;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Samples encoded per write when streaming arrays to disk
const WRITE_CHUNK: usize = 1024;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_logging(&args);

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// 2 for bad input, 1 for everything else
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BelugaError>() {
        Some(err) if err.is_user_error() => 2,
        _ => 1,
    }
}

fn init_logging(args: &CliArgs) {
    let level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    // RUST_LOG takes precedence over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = BelugaConfig::from_cli(&args);
    tracing::debug!("Configuration: {:?}", config);

    match &args.command {
        Commands::Info { fasta } => cmd_info(fasta, args.quiet),
        Commands::Regions {
            roi,
            binning,
            include,
            exclude,
            format,
        } => {
            let mut indexer = GenomicIndexer::create_from_file(roi, &binning.to_options())?;
            indexer.filter_chromosomes(include, exclude)?;
            cmd_regions(&indexer, *format, args.quiet)
        }
        Commands::Encode {
            refgenome,
            roi,
            binning,
            encoding,
            store_whole_genome,
            interval,
            output,
        } => {
            let options = RefGenomeOptions {
                roi: roi.clone(),
                binning: binning.to_options(),
                order: encoding.order,
                storage: encoding.storage,
                cache: encoding.cache,
                channel_last: !encoding.channel_first,
                store_whole_genome: *store_whole_genome,
            };
            match interval {
                Some(interval) => cmd_encode_interval(&encoding.name, refgenome, &options, interval, output, &config),
                None => cmd_encode(&encoding.name, refgenome, &options, output, &config),
            }
        }
        Commands::EncodeSeq {
            fasta,
            seqtype,
            fixedlen,
            encoding,
            output,
        } => cmd_encode_seq(fasta, *seqtype, *fixedlen, encoding, output, &config),
        Commands::Variants {
            refgenome,
            vcf,
            binsize,
            batch_size,
            encoding,
            count_only,
            output,
        } => {
            let options = RefGenomeOptions {
                order: encoding.order,
                storage: encoding.storage,
                cache: encoding.cache,
                channel_last: !encoding.channel_first,
                store_whole_genome: true,
                ..Default::default()
            };
            let bioseq = Bioseq::from_refgenome(&encoding.name, refgenome, &options, &config)?;
            let streamer = VariantStreamer::new(&bioseq, vcf, *binsize, *batch_size)?;

            if *count_only {
                println!("{}", streamer.variant_count()?);
                return Ok(());
            }
            let prefix = output
                .as_deref()
                .ok_or_else(|| BelugaError::invalid("--output is required unless --count-only is given"))?;
            cmd_variants(&streamer, prefix, &config, args.quiet)
        }
        Commands::Cache { action } => cmd_cache(action, &config),
    }
}

fn cmd_info(fasta: &Path, quiet: bool) -> anyhow::Result<()> {
    let records = read_fasta(fasta)?;
    let total: usize = records.iter().map(|r| r.len()).sum();

    for record in &records {
        println!("{}\t{}", record.id, record.len());
    }
    if !quiet {
        eprintln!(
            "{} sequences, {} bp in {}",
            records.len(),
            total,
            fasta.display()
        );
    }
    Ok(())
}

fn cmd_regions(indexer: &GenomicIndexer, format: OutputFormat, quiet: bool) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    write_regions(stdout.lock(), indexer.iter(), format).context("Failed to write region listing")?;
    if !quiet {
        eprintln!(
            "{} bins (binsize {}, stepsize {}, flank {})",
            indexer.len(),
            indexer.binsize(),
            indexer.stepsize(),
            indexer.flank()
        );
    }
    Ok(())
}

fn cmd_encode(
    name: &str,
    refgenome: &Path,
    options: &RefGenomeOptions,
    output: &Path,
    config: &BelugaConfig,
) -> anyhow::Result<()> {
    if options.roi.is_none() {
        return Err(BelugaError::invalid("encode needs --roi to define the samples to write").into());
    }

    let start = Instant::now();
    let bioseq = Bioseq::from_refgenome(name, refgenome, options, config)?;
    write_dataset(&bioseq, output, config)?;

    if config.progress {
        print_summary(&bioseq, output, start)?;
    }
    Ok(())
}

/// Encode one interval of the whole genome
fn cmd_encode_interval(
    name: &str,
    refgenome: &Path,
    options: &RefGenomeOptions,
    interval: &GenomicInterval,
    output: &Path,
    config: &BelugaConfig,
) -> anyhow::Result<()> {
    let bioseq = Bioseq::from_refgenome(name, refgenome, options, config)?;
    let onehot = bioseq.get_interval(interval)?;
    write_npy(output, &onehot).with_context(|| format!("Failed to write {} to {}", interval, output.display()))?;

    if config.progress {
        eprintln!("Wrote {} with shape {:?} to {}", interval, onehot.shape(), output.display());
    }
    Ok(())
}

fn cmd_encode_seq(
    fasta: &[PathBuf],
    seqtype: SeqType,
    fixedlen: Option<usize>,
    encoding: &EncodingArgs,
    output: &Path,
    config: &BelugaConfig,
) -> anyhow::Result<()> {
    let options = SeqOptions {
        seqtype,
        order: encoding.order,
        fixedlen,
        storage: encoding.storage,
        cache: encoding.cache,
        channel_last: !encoding.channel_first,
    };

    let start = Instant::now();
    let bioseq = Bioseq::from_seq(&encoding.name, fasta, &options, config)?;
    write_dataset(&bioseq, output, config)?;

    if config.progress {
        print_summary(&bioseq, output, start)?;
    }
    Ok(())
}

/// Stream all samples of a dataset into a `.npy` file
fn write_dataset(bioseq: &Bioseq, output: &Path, config: &BelugaConfig) -> anyhow::Result<()> {
    let shape = bioseq.shape()?;
    let mut writer = NpyWriter::create(output, shape)?;
    let progress = ProgressReporter::with_enabled(config.progress, "Writing", bioseq.len() as u64);

    let mut from = 0;
    while from < bioseq.len() {
        let to = (from + WRITE_CHUNK).min(bioseq.len());
        writer.write(&bioseq.get_range(from..to)?)?;
        progress.inc((to - from) as u64);
        from = to;
    }

    let path = writer.finish()?;
    progress.finish_success(&format!("{}", path.display()));
    Ok(())
}

fn print_summary(bioseq: &Bioseq, output: &Path, start: Instant) -> anyhow::Result<()> {
    let size = std::fs::metadata(output)
        .with_context(|| format!("Failed to stat {}", output.display()))?
        .len();

    println!("=== Encoding Summary ===");
    println!("Dataset:     {}", bioseq.name());
    println!("Samples:     {}", bioseq.len());
    println!("Shape:       {:?}", bioseq.shape()?);
    println!("Order:       {}", bioseq.order());
    println!("Storage:     {}", bioseq.garray().storage_mode().name());
    println!("Blocks:      {}", bioseq.garray().layout().blocks.len());
    println!("From cache:  {}", if bioseq.from_cache() { "yes" } else { "no" });
    println!("Output:      {} ({})", output.display(), humansize::format_size(size, humansize::BINARY));
    println!("Duration:    {}", humantime::format_duration(round_millis(start)));
    Ok(())
}

fn cmd_variants(streamer: &VariantStreamer<'_>, prefix: &Path, config: &BelugaConfig, quiet: bool) -> anyhow::Result<()> {
    let count = streamer.variant_count()?;
    tracing::info!("{} admissible variants", count);

    let ref_path = with_suffix(prefix, "ref.npy");
    let alt_path = with_suffix(prefix, "alt.npy");
    let tsv_path = with_suffix(prefix, "tsv");

    let mut refs = NpyWriter::create(&ref_path, streamer.batch_shape(count))?;
    let mut alts = NpyWriter::create(&alt_path, streamer.batch_shape(count))?;
    let mut table = VariantTableWriter::create(&tsv_path)?;
    let progress = ProgressReporter::with_enabled(config.progress, "Variants", count as u64);

    for batch in streamer.batches()? {
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                progress.finish_error(&format!("{} ({:.1}% done)", e, progress.summary().percentage()));
                return Err(e.into());
            }
        };
        refs.write(&batch.refs)?;
        alts.write(&batch.alts)?;
        table.write_batch(&batch)?;
        progress.inc(batch.len() as u64);
    }

    refs.finish()?;
    alts.finish()?;
    let rows = table.finish()?;
    progress.finish_success(&format!("{} variants", rows));

    if !quiet {
        println!("=== Variant Summary ===");
        println!("Variants:    {}", rows);
        println!("Context:     {} bp", streamer.binsize());
        println!("References:  {}", ref_path.display());
        println!("Alternates:  {}", alt_path.display());
        println!("Metadata:    {}", tsv_path.display());
        let summary = progress.summary();
        println!("Duration:    {} ({:.0} variants/s)", summary.elapsed_human(), summary.throughput);
    }
    Ok(())
}

fn cmd_cache(action: &CacheAction, config: &BelugaConfig) -> anyhow::Result<()> {
    let store = CacheStore::new(&config.cache_dir);
    match action {
        CacheAction::List => store.print_summary()?,
        CacheAction::Clear { dataset } => {
            let removed = store.clear(dataset.as_deref())?;
            println!("Removed {} cache entries from {}", removed, store.root().display());
        }
    }
    Ok(())
}

/// `calls` + `ref.npy` -> `calls.ref.npy`
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn round_millis(start: Instant) -> std::time::Duration {
    std::time::Duration::from_millis(start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_user_error() {
        let err = anyhow::Error::from(BelugaError::invalid("binsize must be positive")).context("loading regions");
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::Error::from(BelugaError::UnknownChromosome("chr9".into()));
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_exit_code_for_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = anyhow::Error::from(BelugaError::io("/data/genome.fa", io_err)).context("reading genome");
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("unexpected")), 1);
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix(Path::new("out/calls"), "ref.npy"), PathBuf::from("out/calls.ref.npy"));
    }
}
