//! Property-based tests for the payoff model, grid and aggregation.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use strategic_equilibrium::aggregate::{PointOutcome, SweepTally};
use strategic_equilibrium::equilibrium::is_equilibrium;
use strategic_equilibrium::evaluator::{evaluate_point, EvaluatorConfig, ParallelEvaluator};
use strategic_equilibrium::grid::GridConfig;
use strategic_equilibrium::payoff::{checked_payoff, payoff};
use strategic_equilibrium::{ParameterPoint, StrategyProfile, TargetSet};

/// Strategy: a point inside the valid domain, ordering included.
fn valid_point() -> impl Strategy<Value = ParameterPoint> {
    (
        0.0..=1.0f64,
        0.001..0.999f64,
        0.001..0.999f64,
        0.001..0.999f64,
        0.001..0.999f64,
    )
        .prop_filter("detections must differ", |(_, a, b, c, d)| a != c && b != d)
        .prop_map(|(tau, a, b, c, d)| {
            let (b_ss, b_cs) = if a < c { (a, c) } else { (c, a) };
            let (b_sc, b_cc) = if b < d { (b, d) } else { (d, b) };
            ParameterPoint::new(tau, b_ss, b_sc, b_cs, b_cc)
        })
}

fn grid_step() -> impl Strategy<Value = f64> {
    prop::sample::select(vec![0.05, 0.1, 0.125, 0.2, 0.25])
}

fn outcomes(points: &[ParameterPoint]) -> Vec<PointOutcome> {
    points.iter().map(evaluate_point).collect()
}

proptest! {
    // 1. Payoffs of valid points stay in [0, 1]
    #[test]
    fn payoff_in_unit_interval(point in valid_point()) {
        prop_assert!(point.validate().is_ok());
        for profile in StrategyProfile::all() {
            let v = payoff(profile, &point);
            prop_assert!((0.0..=1.0).contains(&v), "payoff={v} for {profile} at {point}");
            prop_assert!(checked_payoff(profile, &point).is_ok());
        }
    }

    // 2. Payoff and equilibrium verdicts are deterministic
    #[test]
    fn verdicts_deterministic(point in valid_point()) {
        for profile in StrategyProfile::all() {
            prop_assert_eq!(payoff(profile, &point).to_bits(), payoff(profile, &point).to_bits());
            prop_assert_eq!(
                is_equilibrium(profile, &point).unwrap(),
                is_equilibrium(profile, &point).unwrap()
            );
        }
    }

    // 3. Every emitted grid point respects the ordering, none is lost
    #[test]
    fn grid_respects_ordering(tau in 0.0..=1.0f64, step in grid_step()) {
        let grid = GridConfig::uniform(tau, step);
        let points: Vec<ParameterPoint> = grid.points().unwrap().collect();
        for p in &points {
            prop_assert!(p.b_cs > p.b_ss && p.b_cc > p.b_sc, "{p}");
        }
        // With k values per axis, each constraint keeps k(k-1)/2 pairs.
        let k = grid.b_ss.values().len();
        let pairs = k * (k - 1) / 2;
        prop_assert_eq!(points.len(), pairs * pairs);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // 4. Sequential and parallel paths agree
    #[test]
    fn parallel_matches_sequential(
        workers in 1..5usize,
        batch in 1..40usize,
        step in grid_step(),
    ) {
        let points: Vec<ParameterPoint> = GridConfig::uniform(0.01, step).points().unwrap().collect();
        let evaluator = ParallelEvaluator::new(EvaluatorConfig { worker_count: workers, batch_size: batch }).unwrap();
        prop_assert_eq!(evaluator.evaluate(points.iter().copied()), outcomes(&points));
    }

    // 5. Merging partial tallies in any grouping gives the same result
    #[test]
    fn aggregation_order_independent(seed in any::<u64>(), parts in 1..12usize) {
        let points: Vec<ParameterPoint> = GridConfig::uniform(0.001, 0.125).points().unwrap().collect();
        let targets = TargetSet::new(StrategyProfile::all());
        let reference = SweepTally::from_outcomes(outcomes(&points), &targets).finalize(&targets);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut shuffled = outcomes(&points);
        shuffled.shuffle(&mut rng);

        let mut chunks: Vec<Vec<PointOutcome>> = vec![Vec::new(); parts];
        for outcome in shuffled {
            let k = rng.gen_range(0..parts);
            chunks[k].push(outcome);
        }
        let mut partials: Vec<SweepTally> = chunks
            .into_iter()
            .map(|c| SweepTally::from_outcomes(c, &targets))
            .collect();
        partials.shuffle(&mut rng);

        let merged = partials
            .into_iter()
            .fold(SweepTally::default(), |acc, t| t.merge(acc))
            .finalize(&targets);

        prop_assert_eq!(merged.points_evaluated, reference.points_evaluated);
        prop_assert_eq!(&merged.aggregate, &reference.aggregate);
        prop_assert_eq!(&merged.witnesses, &reference.witnesses);
    }
}
