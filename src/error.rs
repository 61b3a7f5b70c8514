//! Error Taxonomy
//!
//! Two kinds of failure:
//! - Run-fatal errors (`DomainError`, `ConfigError`, I/O) abort the sweep and
//!   are returned through `SweepError`.
//! - Per-point anomalies (`RangeAnomaly`, `WorkerFailure`) never abort. They
//!   are collected next to the findings and counted in the final report.

use serde::Serialize;
use thiserror::Error;

use crate::params::{Dimension, ParameterPoint};
use crate::strategy::StrategyProfile;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown strategy `{0}` (expected one of SS, SC, CS, CC)")]
    UnknownStrategy(String),

    #[error("malformed strategy profile `{0}` (expected `P1,P2`)")]
    MalformedProfile(String),

    #[error("unknown payoff class `{0}` (expected one of A, B, C, D)")]
    UnknownClass(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{dim}: step must be positive and finite, got {step}")]
    NonPositiveStep { dim: Dimension, step: f64 },

    #[error("{dim}: step {step} is finer than the minimum {min}")]
    StepTooSmall { dim: Dimension, step: f64, min: f64 },

    #[error("{dim}: range would produce {count} values, more than {max}")]
    TooManySteps { dim: Dimension, count: f64, max: f64 },

    #[error("{dim}: range [{start}, {end}) is empty")]
    EmptyRange { dim: Dimension, start: f64, end: f64 },

    #[error("{dim}: value {value} lies outside {allowed}")]
    OutOfBounds { dim: Dimension, value: f64, allowed: &'static str },

    #[error("{high} > {low} can never hold within the configured ranges")]
    UnsatisfiableOrdering { high: Dimension, low: Dimension },

    #[error("parameter point {point} is invalid: {reason}")]
    InvalidPoint { point: ParameterPoint, reason: String },

    #[error("worker_count must be at least 1")]
    ZeroWorkers,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("no target profiles configured")]
    NoTargets,

    #[error("invalid value `{value}` for {key}")]
    InvalidOption { key: String, value: String },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

/// A payoff outside `[0, 1]` (or not finite).
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("payoff {value} out of range for {profile} at {point}")]
pub struct RangeAnomaly {
    pub profile: StrategyProfile,
    pub point: ParameterPoint,
    pub value: f64,
}

/// An evaluation that panicked. Only the point is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("evaluation failed at {point}: {cause}")]
pub struct WorkerFailure {
    pub point: ParameterPoint,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    PayoffOutOfRange(RangeAnomaly),
    WorkerFailure(WorkerFailure),
}

impl Anomaly {
    pub fn point(&self) -> &ParameterPoint {
        match self {
            Self::PayoffOutOfRange(a) => &a.point,
            Self::WorkerFailure(f) => &f.point,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::WorkerFailure(_))
    }
}

impl From<RangeAnomaly> for Anomaly {
    fn from(a: RangeAnomaly) -> Self {
        Self::PayoffOutOfRange(a)
    }
}

impl From<WorkerFailure> for Anomaly {
    fn from(f: WorkerFailure) -> Self {
        Self::WorkerFailure(f)
    }
}
