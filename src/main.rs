//! Floorplan Synth CLI
//!
//! Usage:
//!   floorplan-synth [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>         Generator configuration (TOML format)
//!   -n, --samples <N>           Number of layouts to generate
//!   -s, --seed <SEED>           Base seed for per-sample seeds
//!   -o, --output-dir <DIR>      Directory for layout_{i}.json files
//!   --print-default-config      Print the default configuration and exit
//!   -h, --help                  Print help

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use floorplan_synth::{generate, GeneratorConfig, LayoutRecord};

#[derive(Parser)]
#[command(name = "floorplan-synth")]
#[command(about = "Generate synthetic floorplan layouts with pins and netlists")]
struct Cli {
    /// Generator configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of layouts to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    samples: usize,

    /// Base seed; overrides the seed in the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Directory the layout files are written to
    #[arg(short, long, default_value = "layouts")]
    output_dir: PathBuf,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

/// One output file
#[derive(Serialize)]
struct Sample<'a> {
    seed: u64,
    generation_params: &'a GeneratorConfig,
    layout_data: LayoutRecord,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("floorplan_synth=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.print_default_config {
        match GeneratorConfig::default().to_toml_string() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let config = match &cli.config {
        Some(path) => match GeneratorConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => GeneratorConfig::default(),
    };
    if let Err(e) = fs::create_dir_all(&cli.output_dir) {
        eprintln!(
            "Error creating output directory '{}': {}",
            cli.output_dir.display(),
            e
        );
        std::process::exit(1);
    }

    let base_seed = cli
        .seed
        .or(config.seed)
        .unwrap_or_else(|| rand::thread_rng().gen());
    info!(base_seed, samples = cli.samples, "starting batch");
    let mut seeds = StdRng::seed_from_u64(base_seed);

    let mut failures = 0;
    for i in 0..cli.samples {
        let seed: u64 = seeds.gen();
        let path = cli.output_dir.join(format!("layout_{}.json", i));
        if let Err(e) = run_sample(&config, seed, &path) {
            error!(sample = i, seed, "{}", e);
            failures += 1;
            continue;
        }
        info!(sample = i, seed, path = %path.display(), "layout written");
    }

    if failures > 0 {
        eprintln!("Error: {} of {} samples failed", failures, cli.samples);
        std::process::exit(1);
    }
}

fn run_sample(config: &GeneratorConfig, seed: u64, path: &Path) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let generation = generate(config, &mut rng).map_err(|e| e.to_string())?;

    let sample = Sample {
        seed,
        generation_params: config,
        layout_data: generation.record(),
    };
    let json = serde_json::to_string_pretty(&sample).map_err(|e| e.to_string())?;
    fs::write(path, json).map_err(|e| format!("failed to write '{}': {}", path.display(), e))
}
