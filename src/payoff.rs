//! Stationary Payoff Model
//!
//! The payoff of a profile is the absorption probability of a two-state
//! Markov chain. With detection parameter `b` for the profile's class and
//! continuation term `F = tau + (1 - tau) * b'`:
//!
//! ```text
//! payoff = (tau + (1-tau)(1-b)F) / (tau + (1-tau)(b + (1-b)F))
//! ```
//!
//! The value is read as the probability of the outcome player 1 prefers.
//! Player 1 maximizes it, player 2 minimizes it.

use crate::error::RangeAnomaly;
use crate::params::ParameterPoint;
use crate::strategy::{Disposition, PayoffClass, StrategyProfile};

/// One-step continuation probability `F(state, report)`.
pub fn continuation(state: Disposition, report: Disposition, point: &ParameterPoint) -> f64 {
    point.tau + (1.0 - point.tau) * point.detection(state, report)
}

/// Payoff shared by every profile of `class`. Unchecked.
pub fn class_payoff(class: PayoffClass, point: &ParameterPoint) -> f64 {
    let tau = point.tau;
    let (state, report) = class.detection_key();
    let b = point.detection(state, report);
    let (f_state, f_report) = class.continuation_key();
    let f = continuation(f_state, f_report, point);

    (tau + (1.0 - tau) * (1.0 - b) * f) / (tau + (1.0 - tau) * (b + (1.0 - b) * f))
}

/// Raw payoff; may be anomalous for out-of-domain points.
pub fn payoff(profile: StrategyProfile, point: &ParameterPoint) -> f64 {
    class_payoff(profile.class(), point)
}

/// Payoff guaranteed to lie in `[0, 1]`.
pub fn checked_payoff(
    profile: StrategyProfile,
    point: &ParameterPoint,
) -> Result<f64, RangeAnomaly> {
    let value = payoff(profile, point);
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(RangeAnomaly { profile, point: *point, value })
    }
}

/// The four class payoffs of one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PayoffTable {
    pub point: ParameterPoint,
    values: [f64; 4],
}

impl PayoffTable {
    pub fn compute(point: &ParameterPoint) -> Result<Self, RangeAnomaly> {
        let mut values = [0.0; 4];
        for class in PayoffClass::all() {
            values[class.index()] = checked_payoff(class.representative(), point)?;
        }
        Ok(Self { point: *point, values })
    }

    pub fn class_value(&self, class: PayoffClass) -> f64 {
        self.values[class.index()]
    }

    pub fn payoff(&self, profile: StrategyProfile) -> f64 {
        self.class_value(profile.class())
    }
}
