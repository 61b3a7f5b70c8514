//! Reporting and Export
//!
//! Console summaries per target profile, a JSON form of the same summary,
//! and the flat CSV export of witnessing records.
//!
//! ## Export format
//! ```text
//! Player1_Strategy,Player2_Strategy,tau,b_Ss,b_Sc,b_Cs,b_Cc
//! CC,SS,0.001,0.01,0.02,0.03,0.04
//! ```
//! The `tau` column is dropped when the sweep holds `tau` fixed and the
//! caller asks for it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::aggregate::{Aggregate, AggregateEntry};
use crate::equilibrium::EquilibriumRecord;
use crate::error::{Anomaly, SweepError};
use crate::params::Dimension;
use crate::strategy::{StrategyProfile, TargetSet};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DimensionRange {
    pub dimension: Dimension,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DimensionRange {
    fn describe(&self) -> String {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => format!("[{}, {}]", lo, hi),
            _ => "-".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub profile: StrategyProfile,
    pub exists: bool,
    pub count: u64,
    pub ranges: Vec<DimensionRange>,
}

impl ProfileSummary {
    pub fn from_entry(profile: StrategyProfile, entry: &AggregateEntry) -> Self {
        let ranges = Dimension::all()
            .into_iter()
            .map(|dimension| {
                let span = entry.span(dimension);
                DimensionRange {
                    dimension,
                    min: span.map(|s| s.min),
                    max: span.map(|s| s.max),
                }
            })
            .collect();
        Self { profile, exists: entry.count > 0, count: entry.count, ranges }
    }

    pub fn print(&self) {
        println!("  Profile {}", self.profile);
        println!("    Equilibrium exists:    {}", if self.exists { "yes" } else { "no" });
        println!("    Witnesses:             {}", self.count);
        for range in &self.ranges {
            println!("    {:<22} {}", format!("{}:", range.dimension), range.describe());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepSummary {
    pub mode: String,
    pub points_evaluated: u64,
    pub targets: Vec<ProfileSummary>,
    /// Every profile that was an equilibrium somewhere, in profile order.
    pub equilibria: Vec<ProfileSummary>,
    pub range_anomalies: usize,
    pub worker_failures: usize,
    pub anomalies: Vec<Anomaly>,
}

impl SweepSummary {
    pub fn new(
        mode: impl Into<String>,
        points_evaluated: u64,
        aggregate: &Aggregate,
        targets: &TargetSet,
        anomalies: &[Anomaly],
    ) -> Self {
        let targets = targets
            .profiles()
            .iter()
            .map(|p| ProfileSummary::from_entry(*p, &aggregate.entry(p)))
            .collect();
        let equilibria = aggregate
            .witnessed()
            .map(|(p, entry)| ProfileSummary::from_entry(*p, entry))
            .collect();
        Self {
            mode: mode.into(),
            points_evaluated,
            targets,
            equilibria,
            range_anomalies: anomalies.iter().filter(|a| !a.is_failure()).count(),
            worker_failures: anomalies.iter().filter(|a| a.is_failure()).count(),
            anomalies: anomalies.to_vec(),
        }
    }

    pub fn print(&self) {
        println!("Mode:                      {}", self.mode);
        println!("Points evaluated:          {}", self.points_evaluated);
        println!();
        println!("Target profiles:");
        println!("{}", "-".repeat(50));
        for summary in &self.targets {
            summary.print();
        }
        println!();

        println!("Equilibria found anywhere:");
        println!("{}", "-".repeat(50));
        if self.equilibria.is_empty() {
            println!("  (none)");
        }
        for summary in &self.equilibria {
            println!("  {:<12} {:>12} points", summary.profile.to_string(), summary.count);
        }
        println!();

        println!("Anomalies:");
        println!("  Payoff out of range:     {}", self.range_anomalies);
        println!("  Worker failures:         {}", self.worker_failures);
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), SweepError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn save_json(&self, path: &Path) -> Result<(), SweepError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// Destination for witnessing records. The sweep never knows where they go.
pub trait RecordSink {
    fn append(&mut self, record: &EquilibriumRecord) -> io::Result<()>;

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RecordSink for Vec<EquilibriumRecord> {
    fn append(&mut self, record: &EquilibriumRecord) -> io::Result<()> {
        self.push(*record);
        Ok(())
    }
}

pub const CSV_HEADER: [&str; 7] =
    ["Player1_Strategy", "Player2_Strategy", "tau", "b_Ss", "b_Sc", "b_Cs", "b_Cc"];

pub struct CsvSink<W: Write> {
    writer: W,
    tau_column: bool,
    header_written: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W, tau_column: bool) -> Self {
        Self { writer, tau_column, header_written: false }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> io::Result<()> {
        if self.header_written {
            return Ok(());
        }
        let columns: Vec<&str> = CSV_HEADER
            .iter()
            .copied()
            .filter(|c| self.tau_column || *c != "tau")
            .collect();
        writeln!(self.writer, "{}", columns.join(","))?;
        self.header_written = true;
        Ok(())
    }
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: &Path, tau_column: bool) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?), tau_column))
    }
}

impl<W: Write> RecordSink for CsvSink<W> {
    fn append(&mut self, record: &EquilibriumRecord) -> io::Result<()> {
        self.write_header()?;
        let p = &record.point;
        write!(self.writer, "{},{}", record.profile.player1, record.profile.player2)?;
        if self.tau_column {
            write!(self.writer, ",{}", p.tau)?;
        }
        writeln!(self.writer, ",{},{},{},{}", p.b_ss, p.b_sc, p.b_cs, p.b_cc)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.writer.flush()
    }
}

/// Append every record to `sink` and close it. Returns the row count.
pub fn export_witnesses(
    records: &[EquilibriumRecord],
    sink: &mut dyn RecordSink,
) -> io::Result<usize> {
    for record in records {
        sink.append(record)?;
    }
    sink.finish()?;
    Ok(records.len())
}
