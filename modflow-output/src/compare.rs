//! Record-by-record comparison of two head files.

use crate::error::{OutputError, Result};
use crate::headfile::HeadFile;
use modflow_core::CellIndex;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareOptions {
    /// Largest absolute difference accepted per cell.
    pub tolerance: f64,
    /// Cells holding one of these values in either file are skipped
    /// (dry and inactive markers such as `1e30` or `-999.99`).
    pub exclude_values: Vec<f64>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            exclude_values: Vec::new(),
        }
    }
}

impl CompareOptions {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    fn excluded(&self, value: f64) -> bool {
        self.exclude_values.iter().any(|&x| x == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordComparison {
    pub index: usize,
    pub kstp: i32,
    pub kper: i32,
    pub totim: f64,
    pub ilay: i32,
    pub max_diff: f64,
    /// Cell holding `max_diff`; `None` when every cell was excluded.
    pub cell: Option<CellIndex>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadComparison {
    pub tolerance: f64,
    pub records: Vec<RecordComparison>,
    /// Structural problems: differing record counts, shapes or times.
    pub failures: Vec<String>,
    pub passed: bool,
}

impl HeadComparison {
    pub fn max_diff(&self) -> f64 {
        self.records.iter().map(|r| r.max_diff).fold(0.0, f64::max)
    }

    pub fn failed_records(&self) -> impl Iterator<Item = &RecordComparison> {
        self.records.iter().filter(|r| !r.passed)
    }

    pub fn write_summary<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "Head comparison (tolerance {:e})", self.tolerance)?;
        writeln!(
            out,
            "{:>6} {:>5} {:>5} {:>14} {:>5} {:>14}  {:<16} {}",
            "record", "kstp", "kper", "totim", "layer", "max diff", "cell", "status"
        )?;
        for record in &self.records {
            let cell = record.cell.map_or_else(
                || "-".to_string(),
                |c| {
                    let (l, r, c) = c.to_one_based();
                    format!("({}, {}, {})", l, r, c)
                },
            );
            writeln!(
                out,
                "{:>6} {:>5} {:>5} {:>14.6} {:>5} {:>14.6e}  {:<16} {}",
                record.index + 1,
                record.kstp,
                record.kper,
                record.totim,
                record.ilay,
                record.max_diff,
                cell,
                if record.passed { "ok" } else { "FAIL" }
            )?;
        }
        for failure in &self.failures {
            writeln!(out, "failure: {}", failure)?;
        }
        writeln!(
            out,
            "maximum difference {:e}: {}",
            self.max_diff(),
            if self.passed { "PASSED" } else { "FAILED" }
        )?;
        Ok(())
    }
}

pub fn compare_heads(a: &HeadFile, b: &HeadFile, options: &CompareOptions) -> Result<HeadComparison> {
    let mut failures = Vec::new();
    if a.records().len() != b.records().len() {
        failures.push(format!(
            "record count differs: {} vs {}",
            a.records().len(),
            b.records().len()
        ));
    }

    let mut records = Vec::new();
    for (index, (ra, rb)) in a.records().iter().zip(b.records()).enumerate() {
        if (ra.nrow, ra.ncol) != (rb.nrow, rb.ncol) {
            failures.push(
                OutputError::ShapeMismatch {
                    index,
                    nrow: rb.nrow,
                    ncol: rb.ncol,
                    expected_nrow: ra.nrow,
                    expected_ncol: ra.ncol,
                }
                .to_string(),
            );
            continue;
        }
        if ra.kstpkper() != rb.kstpkper() || ra.ilay != rb.ilay {
            failures.push(format!(
                "record {} is kstp {} kper {} layer {} in one file and kstp {} kper {} layer {} in the other",
                index + 1,
                ra.kstp,
                ra.kper,
                ra.ilay,
                rb.kstp,
                rb.kper,
                rb.ilay
            ));
        }

        let da = a.record_data(index)?;
        let db = b.record_data(index)?;
        let mut max_diff = 0.0;
        let mut cell = None;
        for (n, (va, vb)) in da.values().iter().zip(db.values()).enumerate() {
            if options.excluded(*va) || options.excluded(*vb) {
                continue;
            }
            let diff = (va - vb).abs();
            if cell.is_none() || diff > max_diff {
                max_diff = diff;
                let layer = (ra.ilay.max(1) - 1) as usize;
                cell = Some(CellIndex::new(layer, n / ra.ncol, n % ra.ncol));
            }
        }

        records.push(RecordComparison {
            index,
            kstp: ra.kstp,
            kper: ra.kper,
            totim: ra.totim,
            ilay: ra.ilay,
            max_diff,
            cell,
            passed: max_diff <= options.tolerance,
        });
    }

    let passed = failures.is_empty() && records.iter().all(|r| r.passed);
    tracing::info!(
        records = records.len(),
        failures = failures.len(),
        passed,
        "compared head files"
    );
    Ok(HeadComparison {
        tolerance: options.tolerance,
        records,
        failures,
        passed,
    })
}

pub fn compare_head_files<P: AsRef<Path>, Q: AsRef<Path>>(
    a: P,
    b: Q,
    options: &CompareOptions,
) -> Result<HeadComparison> {
    let a = HeadFile::open(a)?;
    let b = HeadFile::open(b)?;
    compare_heads(&a, &b, options)
}
