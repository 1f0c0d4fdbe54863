//! hydroerode CLI - hydraulic erosion on a square height grid.
//!
//! Seeds a terrain, runs erosion cycles and reports how rock, water and
//! sediment ended up distributed.

use clap::{Parser, Subcommand, ValueEnum};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::time::Instant;

use hydroerode::erosion::{EngineBuilder, ErosionConfig};
use hydroerode::pipeline::PassId;
use hydroerode::random::seeded;

/// Grid-based hydraulic erosion simulator.
#[derive(Parser)]
#[command(name = "hydroerode")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Erode a terrain and print the resulting mass budget.
    Run {
        /// Grid side length in cells.
        #[arg(long)]
        size: Option<usize>,

        /// Number of erosion cycles.
        #[arg(short, long, default_value = "100")]
        cycles: u32,

        /// Random seed for reproducible runs.
        #[arg(short, long)]
        seed: Option<u64>,

        /// JSON configuration file; flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start from a parameter preset instead of the defaults.
        #[arg(long)]
        preset: Option<Preset>,

        /// Initial terrain shape.
        #[arg(short, long, default_value = "random")]
        terrain: TerrainShape,

        /// Probability that a cell receives rain each cycle (0-1).
        #[arg(long)]
        chance_of_rain: Option<f64>,

        /// Water added per rained-on cell.
        #[arg(long)]
        amount_of_rain: Option<f64>,

        /// Fraction of rain splashed onto each neighbor (0-1).
        #[arg(long)]
        rain_splash: Option<f64>,

        /// Sediment produced per unit of water per cycle.
        #[arg(long)]
        dissolve_rate: Option<f64>,

        /// Fraction of water evaporated per cycle (0-1).
        #[arg(long)]
        evaporation_rate: Option<f64>,

        /// Chance of sending a cell's outflow to one random lower neighbor (0-1).
        #[arg(long)]
        randomness: Option<f64>,

        /// Send all outflow to the lowest neighbor.
        #[arg(long)]
        fast_drop: bool,

        /// Log progress every N cycles (0 disables).
        #[arg(long, default_value = "10")]
        report_every: u32,

        /// Write final total heights to this JSON file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default configuration as JSON.
    Defaults {
        /// Print a preset instead of the plain defaults.
        #[arg(long)]
        preset: Option<Preset>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// Light rain, slow dissolution.
    Gentle,
    /// Heavy splashing rain, fast dissolution.
    Aggressive,
}

#[derive(Clone, Copy, ValueEnum)]
enum TerrainShape {
    /// Uniform noise in [100, 200).
    Random,
    /// Plane rising from one corner to the opposite one.
    Slope,
    /// Single central peak.
    Peak,
    /// Basin with raised rim.
    Bowl,
    /// Ridge along the main diagonal.
    Ridge,
}

impl TerrainShape {
    /// Height at `(i, j)` on a `size x size` grid, or `None` for random terrain.
    fn height(self, size: usize, i: usize, j: usize) -> Option<f64> {
        let span = (size.max(2) - 1) as f64;
        let x = i as f64 / span;
        let y = j as f64 / span;
        let r = ((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt() / 0.5_f64.sqrt();

        match self {
            TerrainShape::Random => None,
            TerrainShape::Slope => Some(100.0 + 100.0 * (x + y) / 2.0),
            TerrainShape::Peak => Some(100.0 + 100.0 * (1.0 - r).max(0.0)),
            TerrainShape::Bowl => Some(100.0 + 100.0 * r),
            TerrainShape::Ridge => Some(100.0 + 100.0 * (1.0 - (x - y).abs())),
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            size,
            cycles,
            seed,
            config,
            preset,
            terrain,
            chance_of_rain,
            amount_of_rain,
            rain_splash,
            dissolve_rate,
            evaporation_rate,
            randomness,
            fast_drop,
            report_every,
            output,
        } => {
            let config = build_config(
                size,
                config,
                preset,
                chance_of_rain,
                amount_of_rain,
                rain_splash,
                dissolve_rate,
                evaporation_rate,
                randomness,
                fast_drop,
            );
            run_erosion(config, cycles, seed, terrain, report_every, output);
        }
        Commands::Defaults { preset } => {
            let config = preset_config(preset, ErosionConfig::default().size);
            match serde_json::to_string_pretty(&config) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing configuration: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn preset_config(preset: Option<Preset>, size: usize) -> ErosionConfig {
    match preset {
        Some(Preset::Gentle) => ErosionConfig::gentle(size),
        Some(Preset::Aggressive) => ErosionConfig::aggressive(size),
        None => ErosionConfig::with_size(size),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    size: Option<usize>,
    path: Option<PathBuf>,
    preset: Option<Preset>,
    chance_of_rain: Option<f64>,
    amount_of_rain: Option<f64>,
    rain_splash: Option<f64>,
    dissolve_rate: Option<f64>,
    evaporation_rate: Option<f64>,
    randomness: Option<f64>,
    fast_drop: bool,
) -> ErosionConfig {
    let mut config = match path {
        Some(path) => match ErosionConfig::load_json(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => preset_config(preset, ErosionConfig::default().size),
    };

    if let Some(size) = size {
        config.size = size;
    }
    if let Some(v) = chance_of_rain {
        config.chance_of_rain = v;
    }
    if let Some(v) = amount_of_rain {
        config.amount_of_rain = v;
    }
    if let Some(v) = rain_splash {
        config.rain_splash = v;
    }
    if let Some(v) = dissolve_rate {
        config.dissolve_rate = v;
    }
    if let Some(v) = evaporation_rate {
        config.evaporation_rate = v;
    }
    if let Some(v) = randomness {
        config.randomness = v;
    }
    if fast_drop {
        config.fast_drop = true;
    }

    config
}

fn run_erosion(
    config: ErosionConfig,
    cycles: u32,
    seed: Option<u64>,
    terrain: TerrainShape,
    report_every: u32,
    output: Option<PathBuf>,
) {
    let seed = seed.unwrap_or_else(rand::random);
    let size = config.size;

    println!("hydroerode - Hydraulic Erosion");
    println!("==============================");
    println!("Grid: {}x{}", size, size);
    println!("Cycles: {}", cycles);
    println!("Seed: {}", seed);
    println!(
        "Rain: chance={} amount={} splash={}",
        config.chance_of_rain, config.amount_of_rain, config.rain_splash
    );
    println!(
        "Dissolve rate: {}  Evaporation: {}  Randomness: {}  Fast drop: {}",
        config.dissolve_rate, config.evaporation_rate, config.randomness, config.fast_drop
    );

    let mut builder = EngineBuilder::new(config);
    if !matches!(terrain, TerrainShape::Random) {
        builder = builder.height_fn(move |i, j| terrain.height(size, i, j).unwrap_or(100.0));
    }

    let mut engine = match builder.build(seeded(seed)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let initial = engine.budget();
    let (min_h, max_h) = engine.grid().height_range();
    println!("Initial height range: [{:.4}, {:.4}]", min_h, max_h);

    println!("\nEroding...");
    let start = Instant::now();

    let result = engine.cycle_with_callbacks(cycles, |p| {
        if p.pass == PassId::Evaporate && report_every > 0 && p.cycle % report_every == 0 {
            log::info!("[{}/{}] cycles complete", p.cycle, p.cycles);
        }
        ControlFlow::Continue(())
    });
    if let Err(e) = result {
        eprintln!("Error during erosion: {}", e);
        std::process::exit(1);
    }

    println!("Erosion completed in {:.2?}", start.elapsed());

    let budget = engine.budget();
    let (min_h, max_h) = engine.grid().height_range();
    println!("\nMass budget:");
    println!("  Rock:     {:>14.4} ({:+.4})", budget.rock, budget.rock - initial.rock);
    println!("  Sediment: {:>14.4}", budget.sediment);
    println!("  Water:    {:>14.4}", budget.water);
    println!(
        "  Material: {:>14.4} ({:+.4})",
        budget.material(),
        budget.material() - initial.material()
    );
    println!("Final height range: [{:.4}, {:.4}]", min_h, max_h);

    if let Some(path) = output {
        let json = match serde_json::to_string(&engine.heights()) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error serializing heights: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            eprintln!("Error writing {}: {}", path.display(), e);
            std::process::exit(1);
        }
        println!("Heights written to {}", path.display());
    }
}
