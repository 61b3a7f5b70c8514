//! Strategic Equilibrium Search Library
//!
//! This library sweeps the parameter space of a repeated two-player game
//! with noisy detection and locates regions where pure strategy profiles are
//! one-shot-deviation equilibria.
//!
//! ## Modules
//!
//! - `strategy`: strategies, profiles, payoff classes, target sets
//! - `params`: parameter points and their validity rules
//! - `payoff`: stationary payoff model
//! - `equilibrium`: equilibrium test and deviation analysis
//! - `grid`: lazy grid enumeration and random probes
//! - `evaluator`: parallel evaluation with per-point failure isolation
//! - `aggregate`: order-independent result tallies
//! - `report`: console and JSON summaries, CSV export
//! - `sweep`: exhaustive and early-exit report modes
//! - `config`: JSON configuration and environment overrides
//! - `error`: error types and the anomaly channel
//! - `logging`: tracing subscriber set-up
//!
//! ## Usage
//!
//! ```bash
//! # Exhaustive sweep over the default grid, witnesses to CSV
//! cargo run --bin sweep --release -- --output equilibria.csv
//!
//! # Stop at the first class-D equilibrium on a coarse grid
//! cargo run --bin sweep --release -- --step 0.05 --first D
//!
//! # Which deviations break (CC, SS)?
//! cargo run --bin deviations --release -- --profile CC,SS --step 0.05
//! ```

pub mod aggregate;
pub mod config;
pub mod equilibrium;
pub mod error;
pub mod evaluator;
pub mod grid;
pub mod logging;
pub mod params;
pub mod payoff;
pub mod report;
pub mod strategy;
pub mod sweep;

pub use config::SweepConfig;
pub use error::{Anomaly, ConfigError, DomainError, SweepError};
pub use evaluator::{EvaluatorConfig, ParallelEvaluator};
pub use params::ParameterPoint;
pub use strategy::{PayoffClass, Strategy, StrategyProfile, TargetSet};
