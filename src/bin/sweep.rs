//! Equilibrium Sweep Binary
//!
//! Sweeps the parameter grid, prints a per-profile summary and exports the
//! witnessing points of the target profiles.
//!
//! ## Usage
//! ```bash
//! cargo run --bin sweep --release -- [--config FILE] [--tau T] [--step S]
//!     [--workers N] [--batch-size N] [--target P1,P2]... [--first CLASS]
//!     [--sample N] [--seed S] [--output FILE] [--no-tau-column] [--json FILE]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use strategic_equilibrium::config::{parse_count, SampleConfig, SweepConfig};
use strategic_equilibrium::equilibrium::EquilibriumRecord;
use strategic_equilibrium::evaluator::ParallelEvaluator;
use strategic_equilibrium::grid::Axis;
use strategic_equilibrium::logging;
use strategic_equilibrium::params::Dimension;
use strategic_equilibrium::report::CsvSink;
use strategic_equilibrium::sweep::{self, ReportMode};
use strategic_equilibrium::PayoffClass;

const USAGE: &str = "Usage: sweep [--config FILE] [--tau T] [--step S] [--workers N] \
[--batch-size N] [--target P1,P2]... [--first CLASS] [--sample N] [--seed S] \
[--output FILE] [--no-tau-column] [--json FILE]";

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .with_context(|| format!("{} expects a value", flag))
}

fn parse_f64(args: &[String], i: usize, flag: &str) -> Result<f64> {
    let raw = value(args, i, flag)?;
    raw.parse().with_context(|| format!("invalid {} `{}`", flag, raw))
}

fn parse_args(args: &[String]) -> Result<SweepConfig> {
    // The config file is the base layer, so find it first.
    let mut config = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = PathBuf::from(value(args, i + 1, "--config")?);
            SweepConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => SweepConfig::default(),
    };
    config.apply_env()?;

    let mut targets: Vec<String> = Vec::new();
    let mut sample_count: Option<usize> = None;
    let mut seed: Option<u64> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
            }
            "--tau" => {
                i += 1;
                config.grid.tau = Axis::Fixed(parse_f64(args, i, "--tau")?);
            }
            "--step" => {
                i += 1;
                config.grid.set_b_step(parse_f64(args, i, "--step")?);
            }
            "--workers" => {
                i += 1;
                config.evaluator.worker_count = parse_count("--workers", value(args, i, "--workers")?)?;
            }
            "--batch-size" => {
                i += 1;
                config.evaluator.batch_size =
                    parse_count("--batch-size", value(args, i, "--batch-size")?)?;
            }
            "--target" => {
                i += 1;
                targets.push(value(args, i, "--target")?.to_string());
            }
            "--first" => {
                i += 1;
                let class: PayoffClass = value(args, i, "--first")?.parse()?;
                config.mode = ReportMode::EarlyExit { class };
            }
            "--sample" => {
                i += 1;
                sample_count = Some(parse_count("--sample", value(args, i, "--sample")?)?);
            }
            "--seed" => {
                i += 1;
                let raw = value(args, i, "--seed")?;
                seed = Some(raw.parse().with_context(|| format!("invalid --seed `{}`", raw))?);
            }
            "--output" => {
                i += 1;
                config.output = Some(PathBuf::from(value(args, i, "--output")?));
            }
            "--json" => {
                i += 1;
                config.summary_json = Some(PathBuf::from(value(args, i, "--json")?));
            }
            "--no-tau-column" => {
                config.tau_column = false;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}\n{}", other, USAGE),
        }
        i += 1;
    }

    if !targets.is_empty() {
        config.targets = targets;
    }
    if let Some(count) = sample_count {
        let seed = seed.or(config.sample.map(|s| s.seed)).unwrap_or(0);
        config.sample = Some(SampleConfig { count, seed });
    } else if let (Some(seed), Some(sample)) = (seed, config.sample.as_mut()) {
        sample.seed = seed;
    }
    Ok(config)
}

fn main() -> Result<()> {
    logging::init();
    let args: Vec<String> = std::env::args().collect();
    let config = parse_args(&args)?;
    config.validate()?;

    println!("=======================================================");
    println!("  Strategic Equilibrium Sweep");
    println!("  {}", config.mode.name());
    println!("=======================================================");
    println!();
    println!("Parameters:");
    for dim in Dimension::all() {
        let axis = config.grid.axis(dim);
        match axis {
            Axis::Fixed(v) => println!("  {:<24} {}", format!("{}:", dim), v),
            Axis::Range(r) => println!(
                "  {:<24} [{}, {}) step {}",
                format!("{}:", dim),
                r.start,
                r.end,
                r.step
            ),
        }
    }
    println!("  Grid cells:              {}", config.grid.cell_count());
    if let Some(sample) = config.sample {
        println!("  Random probe:            {} points, seed {}", sample.count, sample.seed);
    }
    println!("  Workers:                 {}", config.evaluator.worker_count);
    println!("  Batch size:              {}", config.evaluator.batch_size);
    println!();

    let report = match &config.output {
        Some(path) => {
            let mut sink = CsvSink::create(path, config.writes_tau_column())
                .with_context(|| format!("creating {}", path.display()))?;
            sweep::run(&config, &mut sink)?
        }
        None => {
            let mut kept: Vec<EquilibriumRecord> = Vec::new();
            sweep::run(&config, &mut kept)?
        }
    };

    println!("=======================================================");
    println!("  Results");
    println!("=======================================================");
    println!();
    report.print();

    if let ReportMode::EarlyExit { .. } = config.mode {
        if report.witnesses.is_empty() {
            // No witness: show what breaks the first target instead.
            let target = config.target_set()?.profiles()[0];
            let evaluator = ParallelEvaluator::new(config.evaluator)?;
            let census = evaluator.tally_deviations(config.points()?, target);
            println!();
            println!("Deviation analysis:");
            println!("{}", "-".repeat(50));
            census.tally.print();
        }
    }

    if let Some(path) = &config.output {
        println!();
        println!("Witnesses written to {}", path.display());
    }
    if let Some(path) = &config.summary_json {
        report
            .summary
            .save_json(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Summary written to {}", path.display());
    }

    Ok(())
}
