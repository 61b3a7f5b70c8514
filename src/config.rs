//! Sweep Configuration
//!
//! A sweep is described by a JSON file, every field optional:
//!
//! ```json
//! {
//!   "grid": { "tau": 0.001, "b_ss": { "start": 0.01, "end": 1.0, "step": 0.01 } },
//!   "evaluator": { "worker_count": 8, "batch_size": 1024 },
//!   "targets": ["CC,SS", "CS,SS"],
//!   "mode": { "kind": "early_exit", "class": "D" },
//!   "output": "equilibria.csv",
//!   "tau_column": true,
//!   "summary_json": "summary.json",
//!   "sample": { "count": 10000, "seed": 42 }
//! }
//! ```
//!
//! ## Environment
//! - `SWEEP_WORKERS` (fallback `RAYON_NUM_THREADS`): worker count
//! - `SWEEP_BATCH_SIZE`: points per batch

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SweepError};
use crate::evaluator::EvaluatorConfig;
use crate::grid::{GridConfig, GridPoints, SampledPoints};
use crate::params::ParameterPoint;
use crate::strategy::TargetSet;
use crate::sweep::ReportMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleConfig {
    pub count: usize,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub grid: GridConfig,
    pub evaluator: EvaluatorConfig,
    pub targets: Vec<String>,
    pub mode: ReportMode,
    pub output: Option<PathBuf>,
    pub tau_column: bool,
    pub summary_json: Option<PathBuf>,
    pub sample: Option<SampleConfig>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            evaluator: EvaluatorConfig::default(),
            targets: TargetSet::default_targets()
                .profiles()
                .iter()
                .map(|p| format!("{},{}", p.player1, p.player2))
                .collect(),
            mode: ReportMode::default(),
            output: None,
            tau_column: true,
            summary_json: None,
            sample: None,
        }
    }
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self, SweepError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SweepError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Apply `SWEEP_WORKERS` / `RAYON_NUM_THREADS` and `SWEEP_BATCH_SIZE`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let workers = lookup("SWEEP_WORKERS")
            .map(|v| ("SWEEP_WORKERS", v))
            .or_else(|| lookup("RAYON_NUM_THREADS").map(|v| ("RAYON_NUM_THREADS", v)));
        if let Some((key, value)) = workers {
            self.evaluator.worker_count = parse_count(key, &value)?;
        }
        if let Some(value) = lookup("SWEEP_BATCH_SIZE") {
            self.evaluator.batch_size = parse_count("SWEEP_BATCH_SIZE", &value)?;
        }
        Ok(())
    }

    pub fn target_set(&self) -> Result<TargetSet, SweepError> {
        let targets = TargetSet::parse(&self.targets)?;
        if targets.is_empty() {
            return Err(ConfigError::NoTargets.into());
        }
        Ok(targets)
    }

    pub fn validate(&self) -> Result<(), SweepError> {
        self.grid.validate()?;
        self.evaluator.validate()?;
        self.target_set()?;
        Ok(())
    }

    /// Whether exported rows carry `tau`. Always true when `tau` is swept.
    pub fn writes_tau_column(&self) -> bool {
        self.tau_column || !self.grid.tau_is_fixed()
    }

    pub fn points(&self) -> Result<PointSource, ConfigError> {
        match self.sample {
            Some(SampleConfig { count, seed }) => Ok(PointSource::Sample(self.grid.sample(count, seed)?)),
            None => Ok(PointSource::Grid(self.grid.points()?)),
        }
    }
}

/// Parse a positive integer option value.
pub fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidOption { key: key.to_string(), value: value.to_string() })
}

/// Either the full grid or a random probe of it.
#[derive(Clone, Debug)]
pub enum PointSource {
    Grid(GridPoints),
    Sample(SampledPoints),
}

impl Iterator for PointSource {
    type Item = ParameterPoint;

    fn next(&mut self) -> Option<ParameterPoint> {
        match self {
            Self::Grid(points) => points.next(),
            Self::Sample(points) => points.next(),
        }
    }
}
