//! One-Shot Deviation Equilibrium Test
//!
//! A profile is a pure equilibrium when neither player gains from a
//! unilateral switch:
//! - player 1 has no replacement with a strictly greater payoff
//! - player 2 has no replacement with a strictly lower payoff
//!
//! Ties are not deviations.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::RangeAnomaly;
use crate::params::ParameterPoint;
use crate::payoff::{checked_payoff, PayoffTable};
use crate::strategy::{Strategy, StrategyProfile};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub fn number(&self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

/// Witness that `profile` is an equilibrium at `point`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EquilibriumRecord {
    pub profile: StrategyProfile,
    pub point: ParameterPoint,
}

/// A unilateral switch that breaks a profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Deviation {
    pub player: Player,
    pub to: Strategy,
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player {} to {}", self.player.number(), self.to)
    }
}

impl PayoffTable {
    pub fn is_equilibrium(&self, profile: StrategyProfile) -> bool {
        self.deviations(profile).next().is_none()
    }

    /// Every profitable unilateral switch away from `profile`.
    pub fn deviations(&self, profile: StrategyProfile) -> impl Iterator<Item = Deviation> + '_ {
        let v = self.payoff(profile);
        let p1 = Strategy::all()
            .into_iter()
            .filter(move |&s| self.payoff(profile.with_player1(s)) > v)
            .map(|to| Deviation { player: Player::One, to });
        let p2 = Strategy::all()
            .into_iter()
            .filter(move |&s| self.payoff(profile.with_player2(s)) < v)
            .map(|to| Deviation { player: Player::Two, to });
        p1.chain(p2)
    }

    pub fn equilibria(&self) -> Vec<StrategyProfile> {
        StrategyProfile::all()
            .into_iter()
            .filter(|p| self.is_equilibrium(*p))
            .collect()
    }
}

/// Direct check, recomputing each payoff it compares.
pub fn is_equilibrium(
    profile: StrategyProfile,
    point: &ParameterPoint,
) -> Result<bool, RangeAnomaly> {
    let v = checked_payoff(profile, point)?;

    for s in Strategy::all() {
        if checked_payoff(profile.with_player1(s), point)? > v {
            return Ok(false);
        }
    }
    for s in Strategy::all() {
        if checked_payoff(profile.with_player2(s), point)? < v {
            return Ok(false);
        }
    }
    Ok(true)
}

/// All sixteen profiles that are equilibria at `point`.
pub fn find_equilibria(point: &ParameterPoint) -> Result<Vec<StrategyProfile>, RangeAnomaly> {
    Ok(PayoffTable::compute(point)?.equilibria())
}

pub fn profitable_deviations(
    profile: StrategyProfile,
    point: &ParameterPoint,
) -> Result<Vec<Deviation>, RangeAnomaly> {
    let table = PayoffTable::compute(point)?;
    Ok(table.deviations(profile).collect())
}

/// Count of points at which each deviation pays. Merge is commutative.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DeviationTally {
    pub profile: Option<StrategyProfile>,
    pub counts: BTreeMap<Deviation, u64>,
    pub points_evaluated: u64,
    pub stable_points: u64,
}

impl DeviationTally {
    pub fn new(profile: StrategyProfile) -> Self {
        Self { profile: Some(profile), ..Self::default() }
    }

    pub fn record(&mut self, deviations: &[Deviation]) {
        self.points_evaluated += 1;
        if deviations.is_empty() {
            self.stable_points += 1;
        }
        for d in deviations {
            *self.counts.entry(*d).or_insert(0) += 1;
        }
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.profile = self.profile.or(other.profile);
        self.points_evaluated += other.points_evaluated;
        self.stable_points += other.stable_points;
        for (d, n) in other.counts {
            *self.counts.entry(d).or_insert(0) += n;
        }
        self
    }

    pub fn count(&self, deviation: &Deviation) -> u64 {
        self.counts.get(deviation).copied().unwrap_or(0)
    }

    pub fn print(&self) {
        if let Some(profile) = self.profile {
            println!("  Profile:                 {}", profile);
        }
        println!("  Points evaluated:        {}", self.points_evaluated);
        println!("  Points with no deviation: {}", self.stable_points);
        for player in [Player::One, Player::Two] {
            for to in Strategy::all() {
                let d = Deviation { player, to };
                let is_own = self.profile.map_or(false, |p| match player {
                    Player::One => p.player1 == to,
                    Player::Two => p.player2 == to,
                });
                if !is_own {
                    println!("  {:<24} {}", d.to_string() + ":", self.count(&d));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::class_payoff;
    use crate::strategy::PayoffClass;

    fn profile(s: &str) -> StrategyProfile {
        s.parse().unwrap()
    }

    fn sample_points() -> Vec<ParameterPoint> {
        let mut points = Vec::new();
        for &tau in &[0.0, 0.001, 0.05, 0.3] {
            for &(b_ss, b_cs) in &[(0.1, 0.2), (0.3, 0.9), (0.5, 0.55), (0.8, 0.95)] {
                for &(b_sc, b_cc) in &[(0.05, 0.4), (0.2, 0.25), (0.6, 0.9)] {
                    points.push(ParameterPoint::new(tau, b_ss, b_sc, b_cs, b_cc));
                }
            }
        }
        points
    }

    #[test]
    fn test_table_and_direct_checks_agree() {
        for point in sample_points() {
            let table = PayoffTable::compute(&point).unwrap();
            for p in StrategyProfile::all() {
                assert_eq!(table.is_equilibrium(p), is_equilibrium(p, &point).unwrap(), "{p} at {point}");
            }
        }
    }

    #[test]
    fn test_ties_are_not_deviations() {
        // Every class pays 1 at full noise, so every profile survives.
        let point = ParameterPoint::new(1.0, 0.2, 0.3, 0.4, 0.5);
        assert_eq!(find_equilibria(&point).unwrap().len(), 16);
    }

    #[test]
    fn test_cc_ss_condition_is_asymmetric() {
        // (CC,SS): column SS holds classes {A, A, D, D}, row CC holds {D, B, D, B}.
        // Player 1 needs D >= A, player 2 needs B >= D.
        for point in sample_points() {
            let a = class_payoff(PayoffClass::A, &point);
            let b = class_payoff(PayoffClass::B, &point);
            let d = class_payoff(PayoffClass::D, &point);
            let expected = d >= a && b >= d;
            assert_eq!(is_equilibrium(profile("CC,SS"), &point).unwrap(), expected, "{point}");
        }
    }

    #[test]
    fn test_ss_ss_condition() {
        // Column SS {A, A, D, D} and row SS {A, A, C, C}.
        for point in sample_points() {
            let a = class_payoff(PayoffClass::A, &point);
            let c = class_payoff(PayoffClass::C, &point);
            let d = class_payoff(PayoffClass::D, &point);
            let expected = a >= d && c >= a;
            assert_eq!(is_equilibrium(profile("SS,SS"), &point).unwrap(), expected, "{point}");
        }
    }

    #[test]
    fn test_deviations_explain_failure() {
        for point in sample_points() {
            let table = PayoffTable::compute(&point).unwrap();
            for p in StrategyProfile::all() {
                let devs = profitable_deviations(p, &point).unwrap();
                assert_eq!(devs.is_empty(), table.is_equilibrium(p));
                for d in devs {
                    match d.player {
                        Player::One => assert!(table.payoff(p.with_player1(d.to)) > table.payoff(p)),
                        Player::Two => assert!(table.payoff(p.with_player2(d.to)) < table.payoff(p)),
                    }
                }
            }
        }
    }

    #[test]
    fn test_anomalous_point_propagates() {
        let point = ParameterPoint::new(0.0, 1.5, 0.2, 1.6, 0.8);
        assert!(is_equilibrium(profile("SS,SS"), &point).is_err());
        assert!(find_equilibria(&point).is_err());
    }

    #[test]
    fn test_deviation_tally_merge_is_commutative() {
        let target = profile("CC,SS");
        let points = sample_points();
        let (left, right) = points.split_at(points.len() / 3);

        let tally = |pts: &[ParameterPoint]| {
            let mut t = DeviationTally::new(target);
            for p in pts {
                t.record(&profitable_deviations(target, p).unwrap());
            }
            t
        };

        let ab = tally(left).merge(tally(right));
        let ba = tally(right).merge(tally(left));
        assert_eq!(ab, ba);
        assert_eq!(ab, tally(&points));
        assert_eq!(ab.points_evaluated, points.len() as u64);
    }
}
