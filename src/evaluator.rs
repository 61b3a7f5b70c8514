//! Parallel Point Evaluation
//!
//! Points are pulled from the grid in waves of `worker_count * batch_size`,
//! split into batches, and evaluated on a dedicated rayon pool. Each batch
//! folds into its own `SweepTally`; the tallies are reduced at the end of
//! the wave and merged into the running total.
//!
//! A panic while evaluating one point is caught and recorded as a
//! `WorkerFailure` for that point only. Out-of-range payoffs become
//! `RangeAnomaly` records. Neither stops the sweep.

use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::aggregate::{PointOutcome, SweepTally};
use crate::equilibrium::{find_equilibria, DeviationTally, EquilibriumRecord};
use crate::error::{Anomaly, ConfigError, RangeAnomaly, WorkerFailure};
use crate::params::ParameterPoint;
use crate::payoff::PayoffTable;
use crate::strategy::{PayoffClass, StrategyProfile, TargetSet};

pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Cores left free for the rest of the machine.
const RESERVED_CORES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    pub worker_count: usize,
    pub batch_size: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().saturating_sub(RESERVED_CORES).max(1),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}

/// Result of an early-exit search.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirstWitness {
    pub witness: Option<EquilibriumRecord>,
    /// Points up to and including the witness, in grid order.
    pub points_evaluated: u64,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviationReport {
    pub tally: DeviationTally,
    pub anomalies: Vec<Anomaly>,
}

impl DeviationReport {
    fn merge(mut self, other: Self) -> Self {
        self.tally = self.tally.merge(other.tally);
        self.anomalies.extend(other.anomalies);
        self
    }
}

pub struct ParallelEvaluator {
    config: EvaluatorConfig,
    pool: rayon::ThreadPool,
}

impl ParallelEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count)
            .thread_name(|i| format!("sweep-worker-{i}"))
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> EvaluatorConfig {
        self.config
    }

    fn wave_size(&self) -> usize {
        self.config.worker_count.saturating_mul(self.config.batch_size)
    }

    fn next_wave(&self, points: &mut impl Iterator<Item = ParameterPoint>) -> Vec<ParameterPoint> {
        points.by_ref().take(self.wave_size()).collect()
    }

    /// Outcome of every point, in input order.
    pub fn evaluate(&self, points: impl IntoIterator<Item = ParameterPoint>) -> Vec<PointOutcome> {
        let points: Vec<ParameterPoint> = points.into_iter().collect();
        self.pool.install(|| {
            points
                .par_chunks(self.config.batch_size)
                .flat_map_iter(|batch| batch.iter().map(evaluate_point))
                .collect()
        })
    }

    /// Exhaustive sweep with the standard equilibrium kernel.
    pub fn sweep(
        &self,
        points: impl IntoIterator<Item = ParameterPoint>,
        targets: &TargetSet,
    ) -> SweepTally {
        self.sweep_with(points, targets, find_equilibria)
    }

    /// Exhaustive sweep with a caller-supplied per-point kernel.
    pub fn sweep_with<F>(
        &self,
        points: impl IntoIterator<Item = ParameterPoint>,
        targets: &TargetSet,
        kernel: F,
    ) -> SweepTally
    where
        F: Fn(&ParameterPoint) -> Result<Vec<StrategyProfile>, RangeAnomaly> + Sync,
    {
        let mut points = points.into_iter();
        let mut total = SweepTally::default();
        let mut wave_index = 0usize;

        loop {
            let wave = self.next_wave(&mut points);
            if wave.is_empty() {
                break;
            }
            let partial = self.pool.install(|| {
                wave.par_chunks(self.config.batch_size)
                    .map(|batch| {
                        SweepTally::from_outcomes(
                            batch.iter().map(|p| evaluate_with(p, &kernel)),
                            targets,
                        )
                    })
                    .reduce(SweepTally::default, SweepTally::merge)
            });
            debug!(
                wave = wave_index,
                points = wave.len(),
                witnesses = partial.witnesses.len(),
                anomalies = partial.anomalies.len(),
                "wave complete"
            );
            total = total.merge(partial);
            wave_index += 1;
        }

        let total = total.finalize(targets);
        info!(
            points = total.points_evaluated,
            witnesses = total.witnesses.len(),
            anomalies = total.range_anomalies(),
            failures = total.worker_failures(),
            "sweep complete"
        );
        total
    }

    /// Stop at the first point, in grid order, where any member of `class`
    /// is an equilibrium.
    pub fn find_first(
        &self,
        points: impl IntoIterator<Item = ParameterPoint>,
        class: PayoffClass,
    ) -> FirstWitness {
        self.find_first_with(points, &TargetSet::class(class), find_equilibria)
    }

    pub fn find_first_with<F>(
        &self,
        points: impl IntoIterator<Item = ParameterPoint>,
        targets: &TargetSet,
        kernel: F,
    ) -> FirstWitness
    where
        F: Fn(&ParameterPoint) -> Result<Vec<StrategyProfile>, RangeAnomaly> + Sync,
    {
        let mut points = points.into_iter();
        let mut result = FirstWitness::default();

        loop {
            let wave = self.next_wave(&mut points);
            if wave.is_empty() {
                break;
            }
            let outcomes: Vec<PointOutcome> = self.pool.install(|| {
                wave.par_chunks(self.config.batch_size)
                    .flat_map_iter(|batch| batch.iter().map(|p| evaluate_with(p, &kernel)))
                    .collect()
            });

            for outcome in outcomes {
                result.points_evaluated += 1;
                if let Some(anomaly) = outcome.anomaly {
                    result.anomalies.push(anomaly);
                    continue;
                }
                let hit = targets
                    .profiles()
                    .iter()
                    .find(|t| outcome.equilibria.contains(t));
                if let Some(&profile) = hit {
                    info!(%profile, point = %outcome.point, "witness found");
                    result.witness = Some(EquilibriumRecord { profile, point: outcome.point });
                    return result;
                }
            }
            debug!(points = result.points_evaluated, "no witness yet");
        }

        info!(points = result.points_evaluated, "no witness in grid");
        result
    }

    /// Count, over all points, which unilateral switches break `profile`.
    pub fn tally_deviations(
        &self,
        points: impl IntoIterator<Item = ParameterPoint>,
        profile: StrategyProfile,
    ) -> DeviationReport {
        let mut points = points.into_iter();
        let mut total = DeviationReport { tally: DeviationTally::new(profile), anomalies: Vec::new() };

        loop {
            let wave = self.next_wave(&mut points);
            if wave.is_empty() {
                break;
            }
            let partial = self.pool.install(|| {
                wave.par_chunks(self.config.batch_size)
                    .map(|batch| {
                        let mut report = DeviationReport {
                            tally: DeviationTally::new(profile),
                            anomalies: Vec::new(),
                        };
                        for point in batch {
                            let found = isolate(point, || {
                                let table = PayoffTable::compute(point)?;
                                Ok(table.deviations(profile).collect::<Vec<_>>())
                            });
                            match found {
                                Ok(devs) => report.tally.record(&devs),
                                Err(anomaly) => report.anomalies.push(anomaly),
                            }
                        }
                        report
                    })
                    .reduce(DeviationReport::default, DeviationReport::merge)
            });
            total = total.merge(partial);
        }

        total.anomalies.sort_by(|a, b| a.point().total_cmp(b.point()));
        total
    }
}

/// Equilibria at one point, with failures captured instead of raised.
pub fn evaluate_point(point: &ParameterPoint) -> PointOutcome {
    evaluate_with(point, &find_equilibria)
}

fn evaluate_with<F>(point: &ParameterPoint, kernel: &F) -> PointOutcome
where
    F: Fn(&ParameterPoint) -> Result<Vec<StrategyProfile>, RangeAnomaly>,
{
    match isolate(point, || kernel(point)) {
        Ok(equilibria) => PointOutcome { point: *point, equilibria, anomaly: None },
        Err(anomaly) => PointOutcome { point: *point, equilibria: Vec::new(), anomaly: Some(anomaly) },
    }
}

/// Run `kernel` for `point`, turning a range error or a panic into an anomaly.
pub(crate) fn isolate<T, F>(point: &ParameterPoint, kernel: F) -> Result<T, Anomaly>
where
    F: FnOnce() -> Result<T, RangeAnomaly>,
{
    match panic::catch_unwind(AssertUnwindSafe(kernel)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(anomaly)) => {
            warn!(%anomaly, "payoff out of range");
            Err(anomaly.into())
        }
        Err(payload) => {
            let cause = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(point = %point, %cause, "evaluation panicked");
            Err(WorkerFailure { point: *point, cause }.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridConfig;

    fn evaluator(workers: usize, batch: usize) -> ParallelEvaluator {
        ParallelEvaluator::new(EvaluatorConfig { worker_count: workers, batch_size: batch }).unwrap()
    }

    fn small_points() -> Vec<ParameterPoint> {
        GridConfig::uniform(0.01, 0.1).points().unwrap().collect()
    }

    #[test]
    fn test_zero_workers_or_batch_rejected() {
        let err = ParallelEvaluator::new(EvaluatorConfig { worker_count: 0, batch_size: 8 }).err();
        assert_eq!(err, Some(ConfigError::ZeroWorkers));
        let err = ParallelEvaluator::new(EvaluatorConfig { worker_count: 2, batch_size: 0 }).err();
        assert_eq!(err, Some(ConfigError::ZeroBatchSize));
    }

    #[test]
    fn test_default_config_has_a_worker() {
        let config = EvaluatorConfig::default();
        assert!(config.worker_count >= 1);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let points = small_points();
        let targets = TargetSet::default_targets();

        let sequential =
            SweepTally::from_outcomes(points.iter().map(evaluate_point), &targets).finalize(&targets);
        let parallel = evaluator(3, 7).sweep(points.iter().copied(), &targets);

        assert_eq!(parallel.points_evaluated, points.len() as u64);
        assert_eq!(parallel.aggregate, sequential.aggregate);
        assert_eq!(parallel.witnesses, sequential.witnesses);
        assert!(parallel.anomalies.is_empty());
    }

    #[test]
    fn test_evaluate_keeps_input_order() {
        let points = small_points();
        let outcomes = evaluator(4, 5).evaluate(points.iter().copied());
        let seen: Vec<ParameterPoint> = outcomes.iter().map(|o| o.point).collect();
        assert_eq!(seen, points);
    }

    #[test]
    fn test_panic_becomes_worker_failure() {
        let points = small_points();
        let bad = points[10];
        let targets = TargetSet::default_targets();

        let tally = evaluator(2, 4).sweep_with(points.iter().copied(), &targets, |p| {
            if *p == bad {
                panic!("kernel exploded");
            }
            find_equilibria(p)
        });

        assert_eq!(tally.points_evaluated, points.len() as u64);
        assert_eq!(tally.worker_failures(), 1);
        match &tally.anomalies[0] {
            Anomaly::WorkerFailure(f) => {
                assert_eq!(f.point, bad);
                assert_eq!(f.cause, "kernel exploded");
            }
            other => panic!("unexpected anomaly {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_point_does_not_abort() {
        let mut points = small_points();
        points.insert(3, ParameterPoint::new(0.0, 1.5, 0.2, 1.6, 0.8));
        let targets = TargetSet::default_targets();

        let tally = evaluator(2, 2).sweep(points.iter().copied(), &targets);
        assert_eq!(tally.points_evaluated, points.len() as u64);
        assert_eq!(tally.range_anomalies(), 1);
        assert_eq!(tally.anomalies[0].point().b_ss, 1.5);
    }

    #[test]
    fn test_first_witness_is_first_in_grid_order() {
        let points = small_points();
        let targets = TargetSet::class(PayoffClass::A);

        let expected = points.iter().enumerate().find_map(|(i, p)| {
            let eqs = find_equilibria(p).unwrap();
            targets
                .profiles()
                .iter()
                .find(|t| eqs.contains(t))
                .map(|&profile| (i as u64 + 1, EquilibriumRecord { profile, point: *p }))
        });

        for (workers, batch) in [(1, 1), (3, 4), (8, 64)] {
            let found = evaluator(workers, batch).find_first(points.iter().copied(), PayoffClass::A);
            match expected {
                Some((n, record)) => {
                    assert_eq!(found.witness, Some(record));
                    assert_eq!(found.points_evaluated, n);
                }
                None => {
                    assert_eq!(found.witness, None);
                    assert_eq!(found.points_evaluated, points.len() as u64);
                }
            }
        }
    }

    #[test]
    fn test_deviation_tally_covers_every_point() {
        let points = small_points();
        let profile: StrategyProfile = "CC,SS".parse().unwrap();
        let report = evaluator(3, 16).tally_deviations(points.iter().copied(), profile);

        assert_eq!(report.tally.points_evaluated, points.len() as u64);
        assert!(report.anomalies.is_empty());

        let stable = points
            .iter()
            .filter(|p| crate::equilibrium::is_equilibrium(profile, p).unwrap())
            .count() as u64;
        assert_eq!(report.tally.stable_points, stable);
    }
}
