//! Discretization (DIS): grid geometry and stress-period timing.

use crate::error::{Error, Result};
use crate::package::PackageData;
use modflow_core::format::wrap_values;
use modflow_core::tokens::{parse_field, require_fields};
use modflow_core::{Array2d, Array3d, ArrayContext, GridShape, LineReader};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

pub const DEFAULT_UNIT: i32 = 11;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressPeriod {
    pub perlen: f64,
    pub nstp: usize,
    pub tsmult: f64,
    pub steady: bool,
}

impl Default for StressPeriod {
    fn default() -> Self {
        Self {
            perlen: 1.0,
            nstp: 1,
            tsmult: 1.0,
            steady: true,
        }
    }
}

impl StressPeriod {
    pub fn new(perlen: f64, nstp: usize, tsmult: f64, steady: bool) -> Self {
        Self {
            perlen,
            nstp,
            tsmult,
            steady,
        }
    }

    /// Length of every time step, growing geometrically by `tsmult`.
    pub fn step_lengths(&self) -> Vec<f64> {
        let nstp = self.nstp.max(1);
        let first = if (self.tsmult - 1.0).abs() < f64::EPSILON {
            self.perlen / nstp as f64
        } else {
            self.perlen * (self.tsmult - 1.0) / (self.tsmult.powi(nstp as i32) - 1.0)
        };
        let mut lengths = Vec::with_capacity(nstp);
        let mut dt = first;
        for _ in 0..nstp {
            lengths.push(dt);
            dt *= self.tsmult;
        }
        lengths
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dis {
    pub unit: i32,
    pub nlay: usize,
    pub nrow: usize,
    pub ncol: usize,
    pub itmuni: i32,
    pub lenuni: i32,
    pub laycbd: Vec<i32>,
    pub delr: Array2d<f64>,
    pub delc: Array2d<f64>,
    pub top: Array2d<f64>,
    /// One array per model layer plus one per quasi-3D confining bed.
    pub botm: Array3d<f64>,
    pub periods: Vec<StressPeriod>,
}

impl Dis {
    /// Unit-spaced grid with a flat top at 1.0, bottoms at 0.0 and `nper`
    /// one-day steady-state periods.
    pub fn new(nlay: usize, nrow: usize, ncol: usize, nper: usize) -> Self {
        Self {
            unit: DEFAULT_UNIT,
            nlay,
            nrow,
            ncol,
            itmuni: 4,
            lenuni: 2,
            laycbd: vec![0; nlay],
            delr: Array2d::constant(1, ncol, 1.0),
            delc: Array2d::constant(1, nrow, 1.0),
            top: Array2d::constant(nrow, ncol, 1.0),
            botm: Array3d::constant(nlay, nrow, ncol, 0.0),
            periods: vec![StressPeriod::default(); nper],
        }
    }

    pub fn with_periods(mut self, periods: Vec<StressPeriod>) -> Self {
        self.periods = periods;
        self
    }

    pub fn nper(&self) -> usize {
        self.periods.len()
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.nlay, self.nrow, self.ncol)
    }

    /// Simulation time at the start of stress period `kper` (zero-based).
    pub fn period_start(&self, kper: usize) -> f64 {
        self.periods.iter().take(kper).map(|p| p.perlen).sum()
    }

    pub fn total_time(&self) -> f64 {
        self.periods.iter().map(|p| p.perlen).sum()
    }

    /// Total time of an offset into zero-based stress period `kper`.
    pub fn totim_from_period(&self, kper: usize, toffset: f64) -> Result<f64> {
        if kper >= self.nper() {
            return Err(Error::PeriodOutOfRange {
                kper: kper + 1,
                nper: self.nper(),
            });
        }
        Ok(self.period_start(kper) + toffset)
    }

    /// Stress period holding `totim` and the offset from its start. A time
    /// on a period boundary belongs to the period that ends there; times
    /// past the end of the simulation fall in the last period.
    pub fn period_offset_from_totim(&self, totim: f64) -> (usize, f64) {
        let mut start = 0.0;
        for (kper, period) in self.periods.iter().enumerate() {
            let end = start + period.perlen;
            if totim <= end {
                return (kper, totim - start);
            }
            start = end;
        }
        let last = self.periods.len().saturating_sub(1);
        (last, totim - self.period_start(last))
    }

    /// Simulation time at the end of every time step.
    pub fn step_times(&self) -> Vec<f64> {
        let mut times = Vec::new();
        let mut totim = 0.0;
        for period in &self.periods {
            for dt in period.step_lengths() {
                totim += dt;
                times.push(totim);
            }
        }
        times
    }

    pub fn load<R: BufRead>(reader: &mut LineReader<R>, unit: i32, ctx: &mut ArrayContext) -> Result<Self> {
        tracing::debug!("loading dis dataset 1");
        let tokens = reader.expect_record("DIS dataset 1")?;
        require_fields(&tokens, 4, "DIS dataset 1", reader.line_number())?;
        let nlay: usize = parse_field(&tokens[0], "NLAY")?;
        let nrow: usize = parse_field(&tokens[1], "NROW")?;
        let ncol: usize = parse_field(&tokens[2], "NCOL")?;
        let nper: usize = parse_field(&tokens[3], "NPER")?;
        let itmuni = match tokens.get(4) {
            Some(t) => parse_field(t, "ITMUNI")?,
            None => 4,
        };
        let lenuni = match tokens.get(5) {
            Some(t) => parse_field(t, "LENUNI")?,
            None => 2,
        };

        tracing::debug!("loading dis dataset 2");
        let laycbd: Vec<i32> = reader.read_values(nlay, "LAYCBD")?;
        // LAYCBD on the bottom layer is ignored by the simulator.
        let nbotm = nlay + laycbd.iter().take(nlay.saturating_sub(1)).filter(|&&c| c != 0).count();

        tracing::debug!("loading dis datasets 3 to 6");
        let delr = Array2d::load(reader, 1, ncol, "delr", ctx)?;
        let delc = Array2d::load(reader, 1, nrow, "delc", ctx)?;
        let top = Array2d::load(reader, nrow, ncol, "model_top", ctx)?;
        let botm = Array3d::load(reader, nbotm, nrow, ncol, "botm", ctx)?;

        tracing::debug!(nper, "loading dis dataset 7");
        let mut periods = Vec::with_capacity(nper);
        for kper in 0..nper {
            let what = format!("DIS dataset 7 for stress period {}", kper + 1);
            let tokens = reader.expect_record(&what)?;
            require_fields(&tokens, 4, &what, reader.line_number())?;
            let steady = match tokens[3].to_uppercase().as_str() {
                "SS" => true,
                "TR" => false,
                other => {
                    return Err(Error::package(
                        "DIS",
                        format!("stress period {}: expected SS or TR, got {}", kper + 1, other),
                    ))
                }
            };
            periods.push(StressPeriod {
                perlen: parse_field(&tokens[0], "PERLEN")?,
                nstp: parse_field(&tokens[1], "NSTP")?,
                tsmult: parse_field(&tokens[2], "TSMULT")?,
                steady,
            });
        }

        Ok(Self {
            unit,
            nlay,
            nrow,
            ncol,
            itmuni,
            lenuni,
            laycbd,
            delr,
            delc,
            top,
            botm,
            periods,
        })
    }
}

impl PackageData for Dis {
    fn ftype(&self) -> &str {
        "DIS"
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        "dis"
    }

    fn to_text(&self, _dis: Option<&Dis>) -> Result<String> {
        let mut out = String::new();
        out.push_str(&self.heading());
        out.push('\n');
        out.push_str(&format!(
            "{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}\n",
            self.nlay,
            self.nrow,
            self.ncol,
            self.nper(),
            self.itmuni,
            self.lenuni
        ));
        wrap_values(self.laycbd.iter(), 40, &mut out);
        out.push_str(&self.delr.to_file_entry("delr"));
        out.push_str(&self.delc.to_file_entry("delc"));
        out.push_str(&self.top.to_file_entry("model_top"));
        for (k, layer) in self.botm.layers().iter().enumerate() {
            out.push_str(&layer.to_file_entry(&format!("botm layer {}", k + 1)));
        }
        for period in &self.periods {
            out.push_str(&format!(
                " {:>14} {:>9} {:>9} {}\n",
                modflow_core::format::fortran_general(period.perlen),
                period.nstp,
                modflow_core::format::fortran_general(period.tsmult),
                if period.steady { "SS" } else { "TR" }
            ));
        }
        Ok(out)
    }

    fn check(&self, _dis: &Dis) -> Vec<String> {
        let mut issues = Vec::new();
        let Some(first) = self.botm.layer(0) else {
            return issues;
        };
        let thin = self
            .top
            .values()
            .iter()
            .zip(first.values())
            .filter(|(top, bot)| top <= bot)
            .count();
        if thin > 0 {
            issues.push(format!("DIS: {} cells in layer 1 have top at or below bottom", thin));
        }
        for (k, pair) in self.botm.layers().windows(2).enumerate() {
            let thin = pair[0]
                .values()
                .iter()
                .zip(pair[1].values())
                .filter(|(upper, lower)| upper <= lower)
                .count();
            if thin > 0 {
                issues.push(format!(
                    "DIS: {} cells below bottom {} have non-positive thickness",
                    thin,
                    k + 1
                ));
            }
        }
        issues
    }
}
