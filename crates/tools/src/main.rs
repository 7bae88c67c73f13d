use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use monster_ai::{AiConfig, NullServices, Scenario, Scheduler, SeededRandom, snapshot_hash};
use tracing::Level;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Runs a monster scenario for a number of ticks", long_about = None)]
struct Args {
    /// Path to the scenario JSON file
    #[arg(short, long)]
    scenario: PathBuf,
    /// Optional TOML file overriding engine tunables
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, default_value_t = 100)]
    ticks: u64,
    /// Replaces the seed stored in the scenario
    #[arg(long)]
    seed: Option<u64>,
    /// Print one JSON tick report per line instead of a summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AiConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AiConfig::default(),
    };
    let scenario = Scenario::load(&args.scenario)
        .with_context(|| format!("Failed to load scenario {}", args.scenario.display()))?;
    let mut built = scenario.build().context("Failed to build scenario world")?;
    let seed = args.seed.unwrap_or(built.seed);
    info!(seed, ticks = args.ticks, objects = built.world.objects.len(), "running scenario");

    let mut rng = SeededRandom::new(seed);
    let mut services = NullServices;
    let mut scheduler = Scheduler::new();
    let mut acted = 0;
    let mut destroyed = 0;
    for _ in 0..args.ticks {
        let report = scheduler.run_tick(&mut built.world, &mut rng, &mut services, &config);
        acted += report.acted;
        destroyed += report.destroyed;
        if args.json {
            println!("{}", serde_json::to_string(&report).context("Failed to encode tick report")?);
        }
    }

    if !args.json {
        println!("Scenario complete.");
        println!("Ticks: {}", scheduler.tick());
        println!("Monster turns: {acted}");
        println!("Destroyed: {destroyed}");
    }
    println!("Snapshot Hash: {}", snapshot_hash(&built.world));
    Ok(())
}
