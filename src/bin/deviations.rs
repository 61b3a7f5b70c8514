//! Deviation Census Binary
//!
//! For one strategy profile, counts across the grid how often each
//! unilateral switch pays for the deviating player.
//!
//! ## Usage
//! ```bash
//! cargo run --bin deviations --release -- --profile CC,SS [--tau T] [--step S]
//!     [--workers N] [--batch-size N] [--sample N] [--seed S] [--config FILE]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use strategic_equilibrium::config::{parse_count, SampleConfig, SweepConfig};
use strategic_equilibrium::evaluator::ParallelEvaluator;
use strategic_equilibrium::grid::Axis;
use strategic_equilibrium::logging;
use strategic_equilibrium::StrategyProfile;

const USAGE: &str = "Usage: deviations --profile P1,P2 [--tau T] [--step S] [--workers N] \
[--batch-size N] [--sample N] [--seed S] [--config FILE]";

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .with_context(|| format!("{} expects a value", flag))
}

fn main() -> Result<()> {
    logging::init();
    let args: Vec<String> = std::env::args().collect();

    let mut config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = PathBuf::from(value(&args, i + 1, "--config")?);
            SweepConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => SweepConfig::default(),
    };
    config.apply_env()?;

    let mut profile: StrategyProfile = "CC,SS".parse()?;
    let mut sample_count: Option<usize> = None;
    let mut seed = 0u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
            }
            "--profile" => {
                i += 1;
                profile = value(&args, i, "--profile")?.parse()?;
            }
            "--tau" => {
                i += 1;
                let raw = value(&args, i, "--tau")?;
                config.grid.tau =
                    Axis::Fixed(raw.parse().with_context(|| format!("invalid --tau `{}`", raw))?);
            }
            "--step" => {
                i += 1;
                let raw = value(&args, i, "--step")?;
                config
                    .grid
                    .set_b_step(raw.parse().with_context(|| format!("invalid --step `{}`", raw))?);
            }
            "--workers" => {
                i += 1;
                config.evaluator.worker_count = parse_count("--workers", value(&args, i, "--workers")?)?;
            }
            "--batch-size" => {
                i += 1;
                config.evaluator.batch_size =
                    parse_count("--batch-size", value(&args, i, "--batch-size")?)?;
            }
            "--sample" => {
                i += 1;
                sample_count = Some(parse_count("--sample", value(&args, i, "--sample")?)?);
            }
            "--seed" => {
                i += 1;
                let raw = value(&args, i, "--seed")?;
                seed = raw.parse().with_context(|| format!("invalid --seed `{}`", raw))?;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}\n{}", other, USAGE),
        }
        i += 1;
    }
    if let Some(count) = sample_count {
        config.sample = Some(SampleConfig { count, seed });
    }

    println!("=======================================================");
    println!("  Deviation Census");
    println!("  Profile {} (payoff class {})", profile, profile.class());
    println!("=======================================================");
    println!();

    let evaluator = ParallelEvaluator::new(config.evaluator)?;
    let report = evaluator.tally_deviations(config.points()?, profile);

    report.tally.print();
    println!();
    println!("Anomalies:");
    println!("  Skipped points:          {}", report.anomalies.len());

    if report.tally.stable_points > 0 {
        println!();
        println!(
            "{} is an equilibrium at {} of {} points.",
            profile, report.tally.stable_points, report.tally.points_evaluated
        );
    }

    Ok(())
}
