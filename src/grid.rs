//! Parameter Grid Enumeration
//!
//! Each of the five dimensions is either held fixed or swept over an
//! end-exclusive range of `start + i * step` values. Points breaking the
//! detection ordering (`b_Cs > b_Ss`, `b_Cc > b_Sc`) are dropped before they
//! ever reach an evaluator.
//!
//! ## Modes
//! - `points()`: full Cartesian sweep, lazy and restartable
//! - `sample(count, seed)`: uniform random probe of the same box

use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::params::{Dimension, ParameterPoint};

/// Axis values are rounded to this many decimals to keep exports tidy.
const VALUE_DECIMALS: i32 = 12;

/// Slack when counting range steps, so `(1.0 - 0.1) / 0.1` stays 9.
const STEP_TOLERANCE: f64 = 1e-9;

/// Smallest accepted step; finer steps would collide after rounding.
const MIN_STEP: f64 = 1e-10;

/// Values a single ranged axis may produce.
const MAX_AXIS_VALUES: f64 = 1e6;

/// Random draws allowed per requested sample before giving up.
const MAX_DRAWS_PER_SAMPLE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axis {
    Fixed(f64),
    Range(AxisRange),
}

impl Axis {
    pub fn range(start: f64, end: f64, step: f64) -> Self {
        Self::Range(AxisRange { start, end, step })
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    pub fn values(&self) -> Vec<f64> {
        match *self {
            Self::Fixed(v) => vec![v],
            Self::Range(AxisRange { start, end, step }) => {
                let n = ((end - start) / step - STEP_TOLERANCE).ceil().max(0.0) as usize;
                (0..n)
                    .map(|i| round_value(start + i as f64 * step))
                    .filter(|v| *v < end)
                    .collect()
            }
        }
    }

    /// (min, max) over the axis values.
    fn bounds(&self) -> Option<(f64, f64)> {
        let values = self.values();
        Some((*values.first()?, *values.last()?))
    }

    fn validate(&self, dim: Dimension) -> Result<(), ConfigError> {
        if let Self::Range(AxisRange { start, end, step }) = *self {
            if !(step.is_finite() && step > 0.0) {
                return Err(ConfigError::NonPositiveStep { dim, step });
            }
            if step < MIN_STEP {
                return Err(ConfigError::StepTooSmall { dim, step, min: MIN_STEP });
            }
            if !(start.is_finite() && end.is_finite() && start < end) {
                return Err(ConfigError::EmptyRange { dim, start, end });
            }
            let count = ((end - start) / step).ceil();
            if count > MAX_AXIS_VALUES {
                return Err(ConfigError::TooManySteps { dim, count, max: MAX_AXIS_VALUES });
            }
        }
        let (lo, hi) = self
            .bounds()
            .ok_or(ConfigError::EmptyRange { dim, start: f64::NAN, end: f64::NAN })?;

        for value in [lo, hi] {
            if !in_domain(dim, value) {
                return Err(ConfigError::OutOfBounds { dim, value, allowed: allowed(dim) });
            }
        }
        Ok(())
    }

    /// A random draw covers all of `[start, end)`, not only the stepped values.
    fn validate_draws(&self, dim: Dimension) -> Result<(), ConfigError> {
        if let Self::Range(AxisRange { start, end, .. }) = *self {
            if !in_domain(dim, start) {
                return Err(ConfigError::OutOfBounds { dim, value: start, allowed: allowed(dim) });
            }
            if end > 1.0 {
                return Err(ConfigError::OutOfBounds { dim, value: end, allowed: allowed(dim) });
            }
        }
        Ok(())
    }

    fn draw(&self, rng: &mut impl Rng) -> f64 {
        match *self {
            Self::Fixed(v) => v,
            Self::Range(AxisRange { start, end, .. }) => rng.gen_range(start..end),
        }
    }
}

fn in_domain(dim: Dimension, v: f64) -> bool {
    match dim {
        Dimension::Tau => (0.0..=1.0).contains(&v),
        _ => v > 0.0 && v < 1.0,
    }
}

fn allowed(dim: Dimension) -> &'static str {
    if dim == Dimension::Tau {
        "[0, 1]"
    } else {
        "(0, 1)"
    }
}

fn round_value(v: f64) -> f64 {
    let scale = 10f64.powi(VALUE_DECIMALS);
    (v * scale).round() / scale
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub tau: Axis,
    pub b_ss: Axis,
    pub b_sc: Axis,
    pub b_cs: Axis,
    pub b_cc: Axis,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::uniform(0.001, 0.01)
    }
}

impl GridConfig {
    /// Fixed `tau`, every `b` axis over `[step, 1)`.
    pub fn uniform(tau: f64, step: f64) -> Self {
        let b = Axis::range(step, 1.0, step);
        Self { tau: Axis::Fixed(tau), b_ss: b, b_sc: b, b_cs: b, b_cc: b }
    }

    pub fn axis(&self, dim: Dimension) -> &Axis {
        match dim {
            Dimension::Tau => &self.tau,
            Dimension::BSs => &self.b_ss,
            Dimension::BSc => &self.b_sc,
            Dimension::BCs => &self.b_cs,
            Dimension::BCc => &self.b_cc,
        }
    }

    pub fn axis_mut(&mut self, dim: Dimension) -> &mut Axis {
        match dim {
            Dimension::Tau => &mut self.tau,
            Dimension::BSs => &mut self.b_ss,
            Dimension::BSc => &mut self.b_sc,
            Dimension::BCs => &mut self.b_cs,
            Dimension::BCc => &mut self.b_cc,
        }
    }

    /// Replace the step of every ranged `b` axis.
    pub fn set_b_step(&mut self, step: f64) {
        for dim in &Dimension::all()[1..] {
            if let Axis::Range(r) = self.axis_mut(*dim) {
                r.step = step;
            }
        }
    }

    pub fn tau_is_fixed(&self) -> bool {
        self.tau.is_fixed()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for dim in Dimension::all() {
            self.axis(dim).validate(dim)?;
        }
        for (high, low) in Dimension::ordering_constraints() {
            let high_max = self.axis(high).bounds().map(|(_, hi)| hi);
            let low_min = self.axis(low).bounds().map(|(lo, _)| lo);
            match (high_max, low_min) {
                (Some(h), Some(l)) if h > l => {}
                _ => return Err(ConfigError::UnsatisfiableOrdering { high, low }),
            }
        }
        Ok(())
    }

    /// Cells in the unfiltered Cartesian product.
    pub fn cell_count(&self) -> u64 {
        Dimension::all()
            .iter()
            .map(|d| self.axis(*d).values().len() as u64)
            .product()
    }

    pub fn points(&self) -> Result<GridPoints, ConfigError> {
        self.validate()?;
        Ok(GridPoints::new(Dimension::all().map(|d| self.axis(d).values())))
    }

    pub fn sample(&self, count: usize, seed: u64) -> Result<SampledPoints, ConfigError> {
        self.validate()?;
        for dim in Dimension::all() {
            self.axis(dim).validate_draws(dim)?;
        }
        Ok(SampledPoints {
            axes: Dimension::all().map(|d| *self.axis(d)),
            rng: StdRng::seed_from_u64(seed),
            remaining: count,
            draws_left: count.saturating_mul(MAX_DRAWS_PER_SAMPLE),
        })
    }
}

/// Odometer over the five axes, last dimension fastest.
#[derive(Clone, Debug)]
pub struct GridPoints {
    axes: [Vec<f64>; 5],
    idx: [usize; 5],
    exhausted: bool,
}

impl GridPoints {
    fn new(axes: [Vec<f64>; 5]) -> Self {
        let exhausted = axes.iter().any(|a| a.is_empty());
        Self { axes, idx: [0; 5], exhausted }
    }

    fn current(&self) -> ParameterPoint {
        ParameterPoint::from_values([0, 1, 2, 3, 4].map(|d| self.axes[d][self.idx[d]]))
    }

    fn advance(&mut self) {
        for d in (0..5).rev() {
            self.idx[d] += 1;
            if self.idx[d] < self.axes[d].len() {
                return;
            }
            self.idx[d] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for GridPoints {
    type Item = ParameterPoint;

    fn next(&mut self) -> Option<ParameterPoint> {
        while !self.exhausted {
            let point = self.current();
            self.advance();
            if point.respects_ordering() {
                return Some(point);
            }
        }
        None
    }
}

/// Seeded uniform draws, rejection-filtered on point validity.
#[derive(Clone, Debug)]
pub struct SampledPoints {
    axes: [Axis; 5],
    rng: StdRng,
    remaining: usize,
    draws_left: usize,
}

impl Iterator for SampledPoints {
    type Item = ParameterPoint;

    fn next(&mut self) -> Option<ParameterPoint> {
        while self.remaining > 0 && self.draws_left > 0 {
            self.draws_left -= 1;
            let values = self.axes.map(|a| a.draw(&mut self.rng));
            let point = ParameterPoint::from_values(values);
            if point.validate().is_ok() {
                self.remaining -= 1;
                return Some(point);
            }
        }
        None
    }
}
