//! slabkit command-line harness
//!
//! Exercises the library's containers in bulk and prints the resulting
//! statistics.
//!
//! # Examples
//!
//! ```bash
//! # Allocate one million 16-byte slots
//! slabkit pool --items 1000000 --item-size 16
//!
//! # Fill a hash set and print bucket statistics as JSON
//! slabkit --json hash-set --items 100000
//!
//! # Write every third bit of a 4096-bit vector to a file and read it back
//! slabkit bits --bits 4096 --output bits.txt
//!
//! # Show effective settings
//! slabkit --config slabkit.toml config
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use slabkit::{BitVector, ChainedHashSet, FixedSlabPool, Settings, SlabBackend};
use std::path::PathBuf;
use std::ptr::NonNull;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// slabkit - bit vectors, slab pools and chained hash sets
#[derive(Parser, Debug)]
#[command(name = "slabkit")]
#[command(version = slabkit::VERSION)]
#[command(about = "Bit vectors, slab pools and chained hash sets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "SLABKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Allocate and free slots in a fixed-size pool
    Pool(PoolArgs),

    /// Insert, look up and remove integers in a hash set
    HashSet(HashSetArgs),

    /// Save and reload a bit vector
    Bits(BitsArgs),

    /// Print the effective settings as TOML
    Config,
}

#[derive(Args, Debug)]
struct PoolArgs {
    /// Number of slots to allocate
    #[arg(short = 'n', long, default_value = "100000")]
    items: usize,

    /// Override the configured item size in bytes
    #[arg(long)]
    item_size: Option<usize>,

    /// Free every other slot and allocate them again
    #[arg(long)]
    churn: bool,
}

#[derive(Args, Debug)]
struct HashSetArgs {
    /// Number of items to insert
    #[arg(short = 'n', long, default_value = "100000")]
    items: u64,
}

#[derive(Args, Debug)]
struct BitsArgs {
    /// Bit vector length
    #[arg(long, default_value = "1024")]
    bits: usize,

    /// Set every n-th bit
    #[arg(long, default_value = "3")]
    stride: usize,

    /// Where to write the bit string
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Serialize)]
struct HashSetReport {
    items: usize,
    bins: usize,
    longest_chain: usize,
    empty_buckets: usize,
    found: usize,
    removed: usize,
    elapsed_ms: f64,
    pool: slabkit::PoolStats,
}

#[derive(Serialize)]
struct BitsReport {
    bits: usize,
    ones: usize,
    first_set: usize,
    last_set: usize,
    path: PathBuf,
    reloaded_equal: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli);

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    debug!(?settings, "Effective settings");

    match cli.command {
        Commands::Pool(args) => pool_command(&settings, args, cli.json),
        Commands::HashSet(args) => hash_set_command(&settings, args, cli.json),
        Commands::Bits(args) => bits_command(args, cli.json),
        Commands::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

/// Console logging to stderr, filtered by `RUST_LOG` and `--log-level`
fn setup_logging(cli: &Cli) {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::WARN);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();
}

fn pool_command(settings: &Settings, args: PoolArgs, json: bool) -> anyhow::Result<()> {
    let mut config = settings.pool.clone();
    if let Some(size) = args.item_size {
        config.item_size = size;
    }
    let mut pool = FixedSlabPool::with_config(config)?;
    info!(items = args.items, item_size = pool.item_size(), "Starting pool run");

    let start = Instant::now();
    let mut slots: Vec<NonNull<u8>> = Vec::with_capacity(args.items);
    for _ in 0..args.items {
        let slot = pool
            .alloc()
            .with_context(|| format!("pool exhausted after {} slots", slots.len()))?;
        slots.push(slot);
    }

    if args.churn {
        for slot in slots.iter().step_by(2) {
            pool.free(*slot);
        }
        for slot in slots.iter_mut().step_by(2) {
            *slot = pool.alloc().context("pool exhausted during churn")?;
        }
    }

    let stats = pool.stats();
    let elapsed = start.elapsed();
    for slot in slots {
        pool.free(slot);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Slab pool ({} items in {:.2?})", args.items, elapsed);
        println!("───────────────────────────────");
        println!("  item size:     {} bytes", stats.item_size);
        println!("  alignment:     {}", stats.alignment);
        println!("  blocks:        {}", stats.blocks.len());
        println!("  slots:         {} ({} free)", stats.total_slots, stats.free_slots);
        println!("  bytes:         {}", stats.total_bytes);
        println!("  growth events: {}", stats.growth_events);
    }
    Ok(())
}

fn hash_set_command(settings: &Settings, args: HashSetArgs, json: bool) -> anyhow::Result<()> {
    let mut set: ChainedHashSet<u64, SlabBackend> = ChainedHashSet::with_config(&settings.hash_set);
    info!(items = args.items, bins = set.bins(), "Starting hash set run");

    let start = Instant::now();
    for i in 0..args.items {
        set.add(i).context("node pool exhausted")?;
    }
    let found = (0..args.items * 2).filter(|i| set.contains(i)).count();
    let bucket_lengths = set.bucket_lengths();
    let items = set.len();
    let removed = (0..args.items).step_by(2).filter(|i| set.remove(i)).count();

    let report = HashSetReport {
        items,
        bins: set.bins(),
        longest_chain: set.longest_chain(),
        empty_buckets: bucket_lengths.iter().filter(|&&len| len == 0).count(),
        found,
        removed,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        pool: set.backend().pool().stats(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Chained hash set ({:.2} ms)", report.elapsed_ms);
        println!("───────────────────────────────");
        println!("  items:         {}", report.items);
        println!("  buckets:       {} ({} empty)", report.bins, report.empty_buckets);
        println!("  longest chain: {}", report.longest_chain);
        println!("  found:         {}", report.found);
        println!("  removed:       {}", report.removed);
        println!("  pool blocks:   {}", report.pool.blocks.len());
        println!("  donations:     {}", report.pool.donations);
    }
    Ok(())
}

fn bits_command(args: BitsArgs, json: bool) -> anyhow::Result<()> {
    anyhow::ensure!(args.stride > 0, "--stride must be at least 1");

    let mut bits = BitVector::with_bits(args.bits);
    for i in (0..args.bits).step_by(args.stride) {
        bits.set(i);
    }
    bits.save_to_path(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let mut reloaded = BitVector::new();
    reloaded
        .load_from_path(&args.output)
        .with_context(|| format!("reading {}", args.output.display()))?;

    let report = BitsReport {
        bits: bits.bits(),
        ones: bits.count_ones(),
        first_set: bits.first_set(),
        last_set: bits.last_set(),
        path: args.output,
        reloaded_equal: reloaded == bits,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Bit vector");
        println!("───────────────────────────────");
        println!("  bits:      {}", report.bits);
        println!("  ones:      {}", report.ones);
        println!("  first set: {}", report.first_set);
        println!("  last set:  {}", report.last_set);
        println!("  file:      {}", report.path.display());
        println!("  reloaded:  {}", if report.reloaded_equal { "identical" } else { "DIFFERENT" });
    }
    Ok(())
}
