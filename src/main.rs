//! overlap: report which tracks overlap a genomic region
//!
//! Usage: overlap <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use track_overlap::config::DEFAULT_MAX_TRACKS;
use track_overlap::output::ReportWriter;
use track_overlap::store::parsing::{should_skip_line, Fields};
use track_overlap::{
    CancelToken, EngineConfig, EngineError, QueryEngine, QueryOutcome, QueryRegion, Result,
    TrackFilter, TsvStore,
};

#[derive(Parser)]
#[command(name = "overlap")]
#[command(version)]
#[command(about = "Report which genomic tracks overlap a region, and by how much", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Compare chromosome names exactly instead of normalizing `chr1` to `1`
    #[arg(long, global = true)]
    exact_chrom: bool,

    /// Apply tissue/source filters per row instead of while scanning
    #[arg(long, global = true)]
    no_pushdown: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a single region
    Query {
        /// Track interval file: chrom, start, end, track_id[, tissue, source]
        #[arg(short, long)]
        input: PathBuf,

        /// Chromosome of the query region
        #[arg(short, long)]
        chrom: String,

        /// 0-based start of the query region
        #[arg(short, long, allow_negative_numbers = true)]
        start: i64,

        /// Exclusive end of the query region
        #[arg(short, long, allow_negative_numbers = true)]
        end: i64,

        /// Only report tracks from this tissue
        #[arg(long)]
        tissue: Option<String>,

        /// Only report tracks from this data source
        #[arg(long)]
        source: Option<String>,

        /// Report at most this many tracks (0 reports every track)
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_TRACKS)]
        max_tracks: usize,

        /// Abort the query after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print query statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Query every region of a BED file in parallel
    Batch {
        /// Track interval file: chrom, start, end, track_id[, tissue, source]
        #[arg(short, long)]
        input: PathBuf,

        /// Regions to query (BED3)
        #[arg(short, long)]
        regions: PathBuf,

        /// Only report tracks from this tissue
        #[arg(long)]
        tissue: Option<String>,

        /// Only report tracks from this data source
        #[arg(long)]
        source: Option<String>,

        /// Report at most this many tracks per region (0 reports every track)
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_TRACKS)]
        max_tracks: usize,

        /// Number of threads to use (default: number of CPUs)
        #[arg(long, short = 't')]
        threads: Option<usize>,

        /// Print per-region statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = EngineConfig::new().with_pushdown_filters(!cli.no_pushdown);
    let normalize = !cli.exact_chrom;

    let result = match cli.command {
        Commands::Query {
            input,
            chrom,
            start,
            end,
            tissue,
            source,
            max_tracks,
            timeout_ms,
            stats,
        } => run_query(
            input,
            &chrom,
            start,
            end,
            build_filter(tissue, source),
            config.with_max_tracks(track_cap(max_tracks)),
            normalize,
            timeout_ms,
            stats,
        ),
        Commands::Batch {
            input,
            regions,
            tissue,
            source,
            max_tracks,
            threads,
            stats,
        } => run_batch(
            input,
            &regions,
            build_filter(tissue, source),
            config.with_max_tracks(track_cap(max_tracks)),
            normalize,
            threads,
            stats,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// `0` on the command line lifts the cap.
fn track_cap(max_tracks: usize) -> Option<usize> {
    (max_tracks > 0).then_some(max_tracks)
}

fn build_filter(tissue: Option<String>, source: Option<String>) -> TrackFilter {
    TrackFilter {
        tissue,
        source,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_query(
    input: PathBuf,
    chrom: &str,
    start: i64,
    end: i64,
    filter: TrackFilter,
    config: EngineConfig,
    normalize: bool,
    timeout_ms: Option<u64>,
    stats: bool,
) -> Result<()> {
    // Validate before opening anything
    let region = QueryRegion::new(chrom, start, end)?.with_filter(filter);

    let store = TsvStore::new(input).with_normalize_chrom(normalize);
    let engine = QueryEngine::with_config(store, config);
    let cancel = match timeout_ms {
        Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
        None => CancelToken::new(),
    };

    let outcome = engine.run_with_cancel(&region, &cancel)?;
    report_stats(&outcome, stats);

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_header(false)?;
    writer.write_outcome(&outcome, false)?;
    writer.flush()?;
    Ok(())
}

fn run_batch(
    input: PathBuf,
    regions_path: &Path,
    filter: TrackFilter,
    config: EngineConfig,
    normalize: bool,
    threads: Option<usize>,
    stats: bool,
) -> Result<()> {
    if let Some(n) = threads {
        // Only fails if a global pool already exists
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    }

    let regions: Vec<QueryRegion> = read_regions(regions_path)?
        .into_iter()
        .map(|r| r.with_filter(filter.clone()))
        .collect();
    info!(regions = regions.len(), "running batch");

    let store = TsvStore::new(input).with_normalize_chrom(normalize);
    let engine = QueryEngine::with_config(store, config);
    let outcomes = engine.run_batch(&regions);

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_header(true)?;
    for outcome in outcomes {
        let outcome = outcome?;
        report_stats(&outcome, stats);
        writer.write_outcome(&outcome, true)?;
    }
    writer.flush()?;
    Ok(())
}

fn report_stats(outcome: &QueryOutcome, stats: bool) {
    if stats {
        eprintln!("{} stats: {}", outcome.region, outcome.stats);
    }
    if outcome.is_partial() {
        warn!(
            region = %outcome.region,
            skipped = outcome.stats.skipped(),
            "result is partial: some rows were skipped"
        );
    }
}

/// Read BED3 query regions. Header and comment lines are skipped.
fn read_regions(path: &Path) -> Result<Vec<QueryRegion>> {
    let reader = BufReader::new(File::open(path)?);
    let mut regions = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if should_skip_line(line.as_bytes()) {
            continue;
        }
        let fields = Fields::split(line.as_bytes());
        if fields.len() < 3 {
            return Err(EngineError::Parse {
                line: idx + 1,
                message: format!("Expected at least 3 fields, got {}", fields.len()),
            });
        }
        let text = |i: usize| {
            fields
                .get(i)
                .and_then(|f| std::str::from_utf8(f).ok())
                .unwrap_or_default()
        };
        let position = |i: usize, name: &str| {
            text(i).parse::<i64>().map_err(|_| EngineError::Parse {
                line: idx + 1,
                message: format!("Invalid {} position: '{}'", name, text(i)),
            })
        };
        regions.push(QueryRegion::new(
            text(0),
            position(1, "start")?,
            position(2, "end")?,
        )?);
    }

    Ok(regions)
}
