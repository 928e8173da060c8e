//! Operator CLI: runs synthetic workloads against a region map and reports its state.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regionmap::storage::serializer::{StringSerializer, U64Serializer};
use regionmap::storage::{Backing, MapConfig, MapOptions, MapStats, RegionMap};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "regionmap",
    version,
    about = "Exercise and inspect a region-backed hash map",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    map: MapArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct MapArgs {
    #[arg(long, value_name = "FILE", env = "REGIONMAP_CONFIG", help = "TOML map config")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 64, help = "Bytes per slot (ignored with --config)")]
    record_size: u32,

    #[arg(long, default_value_t = 1024, help = "Slot count (ignored with --config)")]
    slots: u32,

    #[arg(
        long,
        value_enum,
        default_value_t = Backing::Heap,
        help = "Region backing (ignored with --config)"
    )]
    backing: Backing,
}

impl MapArgs {
    fn config(&self) -> regionmap::Result<MapConfig> {
        match &self.config {
            Some(path) => MapConfig::load(path),
            None => Ok(MapConfig {
                record_size: self.record_size,
                total_elements: self.slots,
                backing: self.backing,
                max_region_bytes: None,
            }),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert random keys, optionally delete and resize, then report.
    Fill(FillCmd),
    /// Validate the map configuration without allocating.
    CheckConfig,
}

#[derive(Args, Debug)]
struct FillCmd {
    #[arg(long, default_value_t = 512, help = "Keys to insert")]
    count: u32,

    #[arg(long, value_name = "K", help = "Delete every K-th inserted key")]
    delete_every: Option<u32>,

    #[arg(long, value_name = "FACTOR", help = "Resize by FACTOR after the workload")]
    resize: Option<u32>,

    #[arg(long, default_value_t = 0x5EED, help = "Workload RNG seed")]
    seed: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.map.config()?;
    match cli.command {
        Command::CheckConfig => {
            let options = config.clone().into_options()?;
            report_config(cli.format, &config, &options)?;
        }
        Command::Fill(cmd) => {
            let options = config.into_options()?;
            let stats = fill(options, &cmd)?;
            report_stats(cli.format, &stats)?;
        }
    }
    Ok(())
}

fn fill(options: MapOptions, cmd: &FillCmd) -> Result<MapStats, Box<dyn Error>> {
    let mut map = RegionMap::with_options(options, StringSerializer, U64Serializer)?;
    let mut rng = StdRng::seed_from_u64(cmd.seed);
    let mut keys = Vec::with_capacity(cmd.count as usize);

    let start = Instant::now();
    for _ in 0..cmd.count {
        let key = format!("key-{:016x}", rng.gen::<u64>());
        let value: u64 = rng.gen();
        map.put(&key, &value)?;
        keys.push(key);
    }
    info!(
        inserted = keys.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "fill complete"
    );

    if let Some(every) = cmd.delete_every.filter(|&k| k > 0) {
        let mut removed = 0u32;
        for key in keys.iter().step_by(every as usize) {
            if map.delete(key)?.is_some() {
                removed += 1;
            }
        }
        info!(removed, "deletes complete");
    }

    if let Some(factor) = cmd.resize {
        map = map.resize(factor)?;
    }
    Ok(map.stats()?)
}

fn report_stats(format: OutputFormat, stats: &MapStats) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Text => {
            println!("{:<16} {:>12}", "slots", stats.total_elements);
            println!("{:<16} {:>12}", "record_size", stats.record_size);
            println!("{:<16} {:>12}", "live", stats.num_elements);
            println!("{:<16} {:>12}", "spots", stats.num_spots);
            println!("{:<16} {:>12}", "tombstones", stats.tombstones);
            println!("{:<16} {:>12.3}", "load_factor", stats.load_factor);
            println!("{:<16} {:>12}", "backing", stats.backing);
        }
    }
    Ok(())
}

fn report_config(
    format: OutputFormat,
    config: &MapConfig,
    options: &MapOptions,
) -> Result<(), Box<dyn Error>> {
    let region_bytes = u64::from(options.record_size) * u64::from(options.total_elements);
    match format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "config": config,
                "region_bytes": region_bytes,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            print!("{}", config.to_toml_string()?);
            println!("# region_bytes = {region_bytes}");
        }
    }
    Ok(())
}
