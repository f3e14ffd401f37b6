//! Run output records and their CSV rendering.
//!
//! A report is assembled in memory and written only after the run has
//! finished, so a failed run never leaves partial output behind.

use std::io::{self, Write};

use numbersim_lang::MarkerIndex;

/// One trial's row in full mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRow {
    /// Marker of the drawn cardinality.
    pub marker: MarkerIndex,
    /// Flat `[cue * num_markers + marker]` compound sums after the update.
    pub sums: Vec<f64>,
    /// Per-cardinality correctness flags after the update.
    pub correct: Vec<bool>,
}

/// Full-mode report: header plus one row per trial.
#[derive(Debug, Clone, PartialEq)]
pub struct FullReport {
    pub markers: Vec<String>,
    pub max_cardinality: usize,
    pub seed1: u64,
    pub seed2: u64,
    pub rows: Vec<TrialRow>,
}

/// Summary-mode report: convergence trial indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub per_cardinality: Vec<u64>,
    pub aggregate: u64,
    /// Continuation seeds drawn after the final trial; feeding them back as
    /// `(seed1, seed2)` continues the deterministic stream.
    pub continuation: (u64, u64),
}

/// Range-summary report: inclusive trial spans of continuous correctness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeReport {
    pub per_cardinality: Vec<Vec<(u64, u64)>>,
    pub aggregate: Vec<(u64, u64)>,
    pub continuation: (u64, u64),
}

/// Everything a finished run can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    Full(FullReport),
    Summary(SummaryReport),
    RangeSummary(RangeReport),
}

impl RunReport {
    /// Render the report as CSV records.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Self::Full(report) => report.write(out),
            Self::Summary(report) => report.write(out),
            Self::RangeSummary(report) => report.write(out),
        }
    }

    /// The whole report as a string, mainly for tests and batch diffing.
    ///
    /// # Panics
    ///
    /// Panics if the report renders non-UTF-8 bytes, which it never does.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut buffer = Vec::new();
        self.write(&mut buffer)
            .expect("writing to a Vec cannot fail");
        String::from_utf8(buffer).expect("CSV output is ASCII")
    }
}

impl FullReport {
    fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "marker")?;
        for cardinality in 1..=self.max_cardinality {
            for marker in &self.markers {
                write!(out, ",{marker}@{cardinality}")?;
            }
        }
        for cardinality in 1..=self.max_cardinality {
            write!(out, ",correct@{cardinality}")?;
        }
        writeln!(out, ",seed1,seed2")?;

        for row in &self.rows {
            write!(out, "{}", self.markers[row.marker.as_usize()])?;
            for sum in &row.sums {
                write!(out, ",{sum}")?;
            }
            for flag in &row.correct {
                write!(out, ",{}", u8::from(*flag))?;
            }
            writeln!(out, ",{},{}", self.seed1, self.seed2)?;
        }
        Ok(())
    }
}

impl SummaryReport {
    fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for value in &self.per_cardinality {
            write!(out, "{value},")?;
        }
        writeln!(
            out,
            "{},{},{}",
            self.aggregate, self.continuation.0, self.continuation.1
        )
    }
}

impl RangeReport {
    fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for spans in &self.per_cardinality {
            write!(out, "{},", render_spans(spans))?;
        }
        writeln!(
            out,
            "{},{},{}",
            render_spans(&self.aggregate),
            self.continuation.0,
            self.continuation.1
        )
    }
}

fn render_spans(spans: &[(u64, u64)]) -> String {
    let rendered: Vec<String> = spans
        .iter()
        .map(|(start, end)| format!("{start}-{end}"))
        .collect();
    rendered.join(":")
}
