//! Parameter Points
//!
//! A point fixes the noise rate `tau` and the four detection probabilities
//! `b_{state}{report}`. Capital letter is the true state, lower-case the
//! report: `b_Cs` is the chance a careless state reported as disciplined
//! leads to continuation.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::strategy::Disposition;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "tau")]
    Tau,
    #[serde(rename = "b_Ss")]
    BSs,
    #[serde(rename = "b_Sc")]
    BSc,
    #[serde(rename = "b_Cs")]
    BCs,
    #[serde(rename = "b_Cc")]
    BCc,
}

impl Dimension {
    pub fn all() -> [Self; 5] {
        [Self::Tau, Self::BSs, Self::BSc, Self::BCs, Self::BCc]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tau => "tau",
            Self::BSs => "b_Ss",
            Self::BSc => "b_Sc",
            Self::BCs => "b_Cs",
            Self::BCc => "b_Cc",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Tau => 0,
            Self::BSs => 1,
            Self::BSc => 2,
            Self::BCs => 3,
            Self::BCc => 4,
        }
    }

    /// Dimension holding `b_{state}{report}`.
    pub fn detection(state: Disposition, report: Disposition) -> Self {
        use Disposition::{Careless, Disciplined};
        match (state, report) {
            (Disciplined, Disciplined) => Self::BSs,
            (Disciplined, Careless) => Self::BSc,
            (Careless, Disciplined) => Self::BCs,
            (Careless, Careless) => Self::BCc,
        }
    }

    /// Pairs (high, low) that every evaluated point must order strictly.
    pub fn ordering_constraints() -> [(Self, Self); 2] {
        [(Self::BCs, Self::BSs), (Self::BCc, Self::BSc)]
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub tau: f64,
    #[serde(rename = "b_Ss")]
    pub b_ss: f64,
    #[serde(rename = "b_Sc")]
    pub b_sc: f64,
    #[serde(rename = "b_Cs")]
    pub b_cs: f64,
    #[serde(rename = "b_Cc")]
    pub b_cc: f64,
}

impl ParameterPoint {
    pub fn new(tau: f64, b_ss: f64, b_sc: f64, b_cs: f64, b_cc: f64) -> Self {
        Self { tau, b_ss, b_sc, b_cs, b_cc }
    }

    pub fn from_values(values: [f64; 5]) -> Self {
        Self::new(values[0], values[1], values[2], values[3], values[4])
    }

    pub fn values(&self) -> [f64; 5] {
        [self.tau, self.b_ss, self.b_sc, self.b_cs, self.b_cc]
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        self.values()[dim.index()]
    }

    pub fn detection(&self, state: Disposition, report: Disposition) -> f64 {
        self.get(Dimension::detection(state, report))
    }

    /// `b_Cs > b_Ss` and `b_Cc > b_Sc`, strictly.
    pub fn respects_ordering(&self) -> bool {
        Dimension::ordering_constraints()
            .iter()
            .all(|&(high, low)| self.get(high) > self.get(low))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidPoint { point: *self, reason };

        if !(0.0..=1.0).contains(&self.tau) {
            return Err(invalid(format!("tau = {} outside [0, 1]", self.tau)));
        }
        for dim in &Dimension::all()[1..] {
            let v = self.get(*dim);
            if !(v > 0.0 && v < 1.0) {
                return Err(invalid(format!("{} = {} outside (0, 1)", dim, v)));
            }
        }
        for (high, low) in Dimension::ordering_constraints() {
            if self.get(high) <= self.get(low) {
                return Err(invalid(format!("{} must exceed {}", high, low)));
            }
        }
        Ok(())
    }

    /// Lexicographic total order over (tau, b_Ss, b_Sc, b_Cs, b_Cc).
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.values()
            .iter()
            .zip(other.values().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tau={}, b_Ss={}, b_Sc={}, b_Cs={}, b_Cc={}",
            self.tau, self.b_ss, self.b_sc, self.b_cs, self.b_cc
        )
    }
}
