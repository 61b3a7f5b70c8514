//! Sweep Orchestration
//!
//! Ties the grid, the evaluator and the exporters together in one of two
//! report modes:
//! - exhaustive: evaluate the whole grid and export every target witness
//! - early exit: stop at the first point where any profile of a payoff
//!   class is an equilibrium and export that single witness

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::Aggregate;
use crate::config::SweepConfig;
use crate::equilibrium::EquilibriumRecord;
use crate::error::SweepError;
use crate::evaluator::ParallelEvaluator;
use crate::params::ParameterPoint;
use crate::payoff::payoff;
use crate::report::{export_witnesses, RecordSink, SweepSummary};
use crate::strategy::{PayoffClass, TargetSet};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportMode {
    #[default]
    Exhaustive,
    EarlyExit { class: PayoffClass },
}

impl ReportMode {
    pub fn name(&self) -> String {
        match self {
            Self::Exhaustive => "exhaustive".to_string(),
            Self::EarlyExit { class } => format!("early exit (class {})", class),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SweepReport {
    pub mode: ReportMode,
    pub summary: SweepSummary,
    pub witnesses: Vec<EquilibriumRecord>,
    pub rows_written: usize,
}

impl SweepReport {
    pub fn print(&self) {
        self.summary.print();
        if let ReportMode::EarlyExit { .. } = self.mode {
            println!();
            match self.witnesses.first() {
                Some(w) => {
                    println!("First witness:");
                    println!("  Profile:                 {}", w.profile);
                    println!("  Parameters:              {}", w.point);
                    println!("  Payoff:                  {:.6}", payoff(w.profile, &w.point));
                }
                None => println!("No witness found."),
            }
        }
        println!();
        println!("Rows exported:             {}", self.rows_written);
    }
}

/// Run the sweep a configuration describes, sending witnesses to `sink`.
pub fn run(config: &SweepConfig, sink: &mut dyn RecordSink) -> Result<SweepReport, SweepError> {
    config.validate()?;
    let targets = config.target_set()?;
    let evaluator = ParallelEvaluator::new(config.evaluator)?;
    let points = config.points()?;

    info!(
        mode = %config.mode.name(),
        cells = config.grid.cell_count(),
        workers = config.evaluator.worker_count,
        batch_size = config.evaluator.batch_size,
        sampled = config.sample.is_some(),
        "starting sweep"
    );

    match config.mode {
        ReportMode::Exhaustive => run_exhaustive(&evaluator, points, &targets, sink),
        ReportMode::EarlyExit { class } => run_early_exit(&evaluator, points, class, sink),
    }
}

pub fn run_exhaustive(
    evaluator: &ParallelEvaluator,
    points: impl IntoIterator<Item = ParameterPoint>,
    targets: &TargetSet,
    sink: &mut dyn RecordSink,
) -> Result<SweepReport, SweepError> {
    let tally = evaluator.sweep(points, targets);
    let rows_written = export_witnesses(&tally.witnesses, sink)?;
    let summary = SweepSummary::new(
        ReportMode::Exhaustive.name(),
        tally.points_evaluated,
        &tally.aggregate,
        targets,
        &tally.anomalies,
    );
    Ok(SweepReport {
        mode: ReportMode::Exhaustive,
        summary,
        witnesses: tally.witnesses,
        rows_written,
    })
}

pub fn run_early_exit(
    evaluator: &ParallelEvaluator,
    points: impl IntoIterator<Item = ParameterPoint>,
    class: PayoffClass,
    sink: &mut dyn RecordSink,
) -> Result<SweepReport, SweepError> {
    let found = evaluator.find_first(points, class);
    let witnesses: Vec<EquilibriumRecord> = found.witness.into_iter().collect();

    let mut aggregate = Aggregate::default();
    for w in &witnesses {
        aggregate.record(w.profile, &w.point);
    }
    let rows_written = export_witnesses(&witnesses, sink)?;
    let mode = ReportMode::EarlyExit { class };
    let summary = SweepSummary::new(
        mode.name(),
        found.points_evaluated,
        &aggregate,
        &TargetSet::class(class),
        &found.anomalies,
    );
    Ok(SweepReport { mode, summary, witnesses, rows_written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equilibrium::is_equilibrium;
    use crate::evaluator::EvaluatorConfig;
    use crate::grid::GridConfig;
    use crate::report::CsvSink;
    use crate::strategy::{Strategy, StrategyProfile};

    fn evaluator() -> ParallelEvaluator {
        ParallelEvaluator::new(EvaluatorConfig { worker_count: 4, batch_size: 32 }).unwrap()
    }

    fn grids() -> Vec<GridConfig> {
        vec![GridConfig::uniform(0.001, 0.1), GridConfig::uniform(0.0, 0.125), GridConfig::uniform(0.2, 0.1)]
    }

    #[test]
    fn test_early_exit_agrees_with_exhaustive() {
        let ev = evaluator();
        for grid in grids() {
            for class in PayoffClass::all() {
                let targets = TargetSet::class(class);
                let mut early_rows: Vec<EquilibriumRecord> = Vec::new();
                let early = run_early_exit(&ev, grid.points().unwrap(), class, &mut early_rows).unwrap();
                let mut all_rows: Vec<EquilibriumRecord> = Vec::new();
                let full = run_exhaustive(&ev, grid.points().unwrap(), &targets, &mut all_rows).unwrap();

                match early.witnesses.first() {
                    Some(w) => {
                        let summary = full.summary.targets.iter().find(|s| s.profile == w.profile).unwrap();
                        assert!(summary.count > 0, "class {class} witness {} missing", w.profile);
                    }
                    None => assert!(full.witnesses.is_empty(), "class {class}"),
                }
                assert_eq!(early.rows_written, early_rows.len());
            }
        }
    }

    #[test]
    fn test_csv_export_matches_checker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equilibria.csv");
        let grid = GridConfig::uniform(0.001, 0.1);
        let targets = TargetSet::new(StrategyProfile::all());

        let mut sink = CsvSink::create(&path, true).unwrap();
        let report = run_exhaustive(&evaluator(), grid.points().unwrap(), &targets, &mut sink).unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Player1_Strategy,Player2_Strategy,tau,b_Ss,b_Sc,b_Cs,b_Cc"));

        let mut rows = 0usize;
        for line in lines {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 7);
            let p1: Strategy = fields[0].parse().unwrap();
            let p2: Strategy = fields[1].parse().unwrap();
            let values: Vec<f64> = fields[2..].iter().map(|v| v.parse().unwrap()).collect();
            let point = ParameterPoint::from_values([values[0], values[1], values[2], values[3], values[4]]);
            let profile = StrategyProfile::new(p1, p2);
            assert!(is_equilibrium(profile, &point).unwrap(), "{profile} at {point}");
            assert_eq!(report.witnesses[rows], EquilibriumRecord { profile, point });
            rows += 1;
        }

        assert_eq!(rows, report.rows_written);
        let expected: u64 = report.summary.targets.iter().map(|s| s.count).sum();
        assert_eq!(rows as u64, expected);
    }

    #[test]
    fn test_run_from_config() {
        let mut config = SweepConfig::default();
        config.grid = GridConfig::uniform(0.001, 0.1);
        config.evaluator = EvaluatorConfig { worker_count: 2, batch_size: 50 };
        config.mode = ReportMode::EarlyExit { class: PayoffClass::A };

        let mut rows: Vec<EquilibriumRecord> = Vec::new();
        let report = run(&config, &mut rows).unwrap();
        assert_eq!(report.witnesses, rows);
        assert!(report.summary.points_evaluated > 0);
        assert_eq!(report.summary.mode, "early exit (class A)");
    }
}
