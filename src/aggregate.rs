//! Result Aggregation
//!
//! Per-point findings are folded into per-profile counts and parameter
//! extents. Every merge here is commutative and associative, so partial
//! tallies from any number of workers can be combined in any order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::equilibrium::EquilibriumRecord;
use crate::error::Anomaly;
use crate::params::{Dimension, ParameterPoint};
use crate::strategy::{StrategyProfile, TargetSet};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    fn point(v: f64) -> Self {
        Self { min: v, max: v }
    }

    fn union(self, other: Self) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }
}

/// Bounding box of the witnessing points, one span per dimension.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Extents {
    spans: [Span; 5],
}

impl Extents {
    pub fn of(point: &ParameterPoint) -> Self {
        Self { spans: point.values().map(Span::point) }
    }

    pub fn union(self, other: Self) -> Self {
        let mut spans = self.spans;
        for (s, o) in spans.iter_mut().zip(other.spans) {
            *s = s.union(o);
        }
        Self { spans }
    }

    pub fn span(&self, dim: Dimension) -> Span {
        self.spans[dim.index()]
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AggregateEntry {
    pub count: u64,
    /// `None` until the first witness.
    pub extents: Option<Extents>,
}

impl AggregateEntry {
    pub fn record(&mut self, point: &ParameterPoint) {
        let e = Extents::of(point);
        self.count += 1;
        self.extents = Some(self.extents.map_or(e, |x| x.union(e)));
    }

    pub fn merge(self, other: Self) -> Self {
        let extents = match (self.extents, other.extents) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        Self { count: self.count + other.count, extents }
    }

    pub fn span(&self, dim: Dimension) -> Option<Span> {
        self.extents.map(|e| e.span(dim))
    }
}

/// Mapping profile -> entry. Absent profiles read as empty entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Aggregate {
    entries: BTreeMap<StrategyProfile, AggregateEntry>,
}

impl Aggregate {
    pub fn record(&mut self, profile: StrategyProfile, point: &ParameterPoint) {
        self.entries.entry(profile).or_default().record(point);
    }

    pub fn merge(mut self, other: Self) -> Self {
        for (profile, entry) in other.entries {
            let merged = self.entries.remove(&profile).unwrap_or_default().merge(entry);
            self.entries.insert(profile, merged);
        }
        self
    }

    pub fn entry(&self, profile: &StrategyProfile) -> AggregateEntry {
        self.entries.get(profile).copied().unwrap_or_default()
    }

    pub fn count(&self, profile: &StrategyProfile) -> u64 {
        self.entry(profile).count
    }

    /// Profiles with at least one witness, in profile order.
    pub fn witnessed(&self) -> impl Iterator<Item = (&StrategyProfile, &AggregateEntry)> {
        self.entries.iter().filter(|(_, e)| e.count > 0)
    }

    pub fn total_witnesses(&self) -> u64 {
        self.entries.values().map(|e| e.count).sum()
    }
}

/// Equilibria found at one point, or why none could be determined.
#[derive(Clone, Debug, PartialEq)]
pub struct PointOutcome {
    pub point: ParameterPoint,
    pub equilibria: Vec<StrategyProfile>,
    pub anomaly: Option<Anomaly>,
}

impl PointOutcome {
    pub fn records(&self) -> impl Iterator<Item = EquilibriumRecord> + '_ {
        self.equilibria
            .iter()
            .map(|&profile| EquilibriumRecord { profile, point: self.point })
    }
}

/// Partial result of a sweep: one per batch, merged into one per run.
#[derive(Clone, Debug, Default)]
pub struct SweepTally {
    pub aggregate: Aggregate,
    /// Witnesses of the target profiles, kept for export.
    pub witnesses: Vec<EquilibriumRecord>,
    pub anomalies: Vec<Anomaly>,
    pub points_evaluated: u64,
}

impl SweepTally {
    pub fn absorb(&mut self, outcome: PointOutcome, targets: &TargetSet) {
        self.points_evaluated += 1;
        for record in outcome.records() {
            self.aggregate.record(record.profile, &record.point);
            if targets.contains(&record.profile) {
                self.witnesses.push(record);
            }
        }
        if let Some(anomaly) = outcome.anomaly {
            self.anomalies.push(anomaly);
        }
    }

    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = PointOutcome>,
        targets: &TargetSet,
    ) -> Self {
        let mut tally = Self::default();
        for outcome in outcomes {
            tally.absorb(outcome, targets);
        }
        tally
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.aggregate = self.aggregate.merge(other.aggregate);
        self.witnesses.extend(other.witnesses);
        self.anomalies.extend(other.anomalies);
        self.points_evaluated += other.points_evaluated;
        self
    }

    /// Put witnesses in target order then grid order, anomalies in grid order.
    pub fn finalize(mut self, targets: &TargetSet) -> Self {
        self.witnesses.sort_by(|a, b| {
            targets
                .position(&a.profile)
                .cmp(&targets.position(&b.profile))
                .then_with(|| a.point.total_cmp(&b.point))
        });
        self.anomalies.sort_by(|a, b| {
            a.point()
                .total_cmp(b.point())
                .then_with(|| a.is_failure().cmp(&b.is_failure()))
        });
        self
    }

    pub fn range_anomalies(&self) -> usize {
        self.anomalies.iter().filter(|a| !a.is_failure()).count()
    }

    pub fn worker_failures(&self) -> usize {
        self.anomalies.iter().filter(|a| a.is_failure()).count()
    }
}
