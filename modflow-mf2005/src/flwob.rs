//! Flow observations at head-dependent boundaries (CHOB, DROB, GBOB, RVOB).

use crate::dis::Dis;
use crate::error::{Error, Result};
use crate::package::{OutputFile, PackageData};
use modflow_core::format::fortran_general;
use modflow_core::grid::to_zero_based;
use modflow_core::tokens::{parse_field, require_fields};
use modflow_core::{CellIndex, LineReader};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKind {
    Chd,
    Drn,
    Ghb,
    Riv,
}

impl FlowKind {
    pub const ALL: [FlowKind; 4] = [FlowKind::Chd, FlowKind::Drn, FlowKind::Ghb, FlowKind::Riv];

    pub fn ftype(self) -> &'static str {
        match self {
            FlowKind::Chd => "CHOB",
            FlowKind::Drn => "DROB",
            FlowKind::Ghb => "GBOB",
            FlowKind::Riv => "RVOB",
        }
    }

    pub fn from_ftype(ftype: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.ftype().eq_ignore_ascii_case(ftype))
    }

    pub fn default_unit(self) -> i32 {
        match self {
            FlowKind::Chd => 40,
            FlowKind::Drn => 41,
            FlowKind::Ghb => 42,
            FlowKind::Riv => 43,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            FlowKind::Chd => "chob",
            FlowKind::Drn => "drob",
            FlowKind::Ghb => "gbob",
            FlowKind::Riv => "rvob",
        }
    }

    fn output_extension(self) -> &'static str {
        match self {
            FlowKind::Chd => "chob.out",
            FlowKind::Drn => "drob.out",
            FlowKind::Ghb => "gbob.out",
            FlowKind::Riv => "rvob.out",
        }
    }
}

/// One observed flow: stress period (zero-based), offset and value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTime {
    pub obsnam: String,
    pub irefsp: usize,
    pub toffset: f64,
    pub flwobs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCell {
    pub cell: CellIndex,
    pub factor: f64,
}

/// Cells whose summed boundary flow is observed at the listed times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowGroup {
    pub times: Vec<FlowTime>,
    pub cells: Vec<FlowCell>,
    /// Written as a negative `NQCLFB`: every factor is taken as 1.0.
    pub unit_factors: bool,
}

impl FlowGroup {
    pub fn new(times: Vec<FlowTime>, cells: Vec<FlowCell>) -> Self {
        Self {
            times,
            cells,
            unit_factors: false,
        }
    }

    pub fn factor(&self, index: usize) -> Option<f64> {
        let cell = self.cells.get(index)?;
        Some(if self.unit_factors { 1.0 } else { cell.factor })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flwob {
    pub kind: FlowKind,
    pub unit: i32,
    pub iufbobsv: i32,
    pub tomultfb: f64,
    pub noprint: bool,
    pub groups: Vec<FlowGroup>,
}

impl Flwob {
    pub fn new(kind: FlowKind, iufbobsv: i32, groups: Vec<FlowGroup>) -> Self {
        Self {
            kind,
            unit: kind.default_unit(),
            iufbobsv,
            tomultfb: 1.0,
            noprint: false,
            groups,
        }
    }

    pub fn with_noprint(mut self, noprint: bool) -> Self {
        self.noprint = noprint;
        self
    }

    pub fn nqfb(&self) -> usize {
        self.groups.len()
    }

    pub fn nqcfb(&self) -> usize {
        self.groups.iter().map(|g| g.cells.len()).sum()
    }

    pub fn nqtfb(&self) -> usize {
        self.groups.iter().map(|g| g.times.len()).sum()
    }

    pub fn obsnam(&self) -> Vec<&str> {
        self.groups
            .iter()
            .flat_map(|g| g.times.iter().map(|t| t.obsnam.as_str()))
            .collect()
    }

    pub fn load<R: BufRead>(reader: &mut LineReader<R>, kind: FlowKind, unit: i32) -> Result<Self> {
        let ftype = kind.ftype();
        tracing::debug!("loading {} dataset 1", ftype.to_lowercase());
        let tokens = reader.expect_record("flow observation dataset 1")?;
        require_fields(&tokens, 4, "flow observation dataset 1", reader.line_number())?;
        let nqfb: usize = parse_field(&tokens[0], "NQFB")?;
        let nqcfb: usize = parse_field(&tokens[1], "NQCFB")?;
        let nqtfb: usize = parse_field(&tokens[2], "NQTFB")?;
        let iufbobsv: i32 = parse_field(&tokens[3], "IUFBOBSV")?;
        let noprint = tokens.iter().skip(4).any(|t| t.eq_ignore_ascii_case("NOPRINT"));

        let tokens = reader.expect_record("flow observation dataset 2")?;
        require_fields(&tokens, 1, "flow observation dataset 2", reader.line_number())?;
        let tomultfb: f64 = parse_field(&tokens[0], "TOMULTFB")?;

        let mut groups = Vec::with_capacity(nqfb);
        for group in 0..nqfb {
            tracing::debug!(group = group + 1, "loading {} dataset 3", ftype.to_lowercase());
            let tokens = reader.expect_record("flow observation dataset 3")?;
            require_fields(&tokens, 2, "flow observation dataset 3", reader.line_number())?;
            let nqobfb: usize = parse_field(&tokens[0], "NQOBFB")?;
            let nqclfb: i64 = parse_field(&tokens[1], "NQCLFB")?;

            let mut times = Vec::with_capacity(nqobfb);
            for _ in 0..nqobfb {
                let tokens = reader.expect_record("flow observation dataset 4")?;
                require_fields(&tokens, 4, "flow observation dataset 4", reader.line_number())?;
                times.push(FlowTime {
                    obsnam: tokens[0].clone(),
                    irefsp: to_zero_based(parse_field(&tokens[1], "IREFSP")?, "IREFSP")?,
                    toffset: parse_field(&tokens[2], "TOFFSET")?,
                    flwobs: parse_field(&tokens[3], "FLWOBS")?,
                });
            }

            let ncells = nqclfb.unsigned_abs() as usize;
            let mut cells = Vec::with_capacity(ncells);
            for _ in 0..ncells {
                let tokens = reader.expect_record("flow observation dataset 5")?;
                require_fields(&tokens, 4, "flow observation dataset 5", reader.line_number())?;
                cells.push(FlowCell {
                    cell: CellIndex::from_one_based(
                        parse_field(&tokens[0], "Layer")?,
                        parse_field(&tokens[1], "Row")?,
                        parse_field(&tokens[2], "Column")?,
                    )?,
                    factor: parse_field(&tokens[3], "Factor")?,
                });
            }
            groups.push(FlowGroup {
                times,
                cells,
                unit_factors: nqclfb < 0,
            });
        }

        let flwob = Self {
            kind,
            unit,
            iufbobsv,
            tomultfb,
            noprint,
            groups,
        };
        if flwob.nqcfb() != nqcfb || flwob.nqtfb() != nqtfb {
            return Err(Error::package(
                ftype,
                format!(
                    "dataset 1 declares {} cells and {} times, groups hold {} and {}",
                    nqcfb,
                    nqtfb,
                    flwob.nqcfb(),
                    flwob.nqtfb()
                ),
            ));
        }
        Ok(flwob)
    }
}

impl PackageData for Flwob {
    fn ftype(&self) -> &str {
        self.kind.ftype()
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        self.kind.extension()
    }

    fn output_files(&self) -> Vec<OutputFile> {
        if self.iufbobsv > 0 {
            vec![OutputFile::text(self.iufbobsv, self.kind.output_extension())]
        } else {
            Vec::new()
        }
    }

    fn to_text(&self, _dis: Option<&Dis>) -> Result<String> {
        let mut out = String::new();
        out.push_str(&self.heading());
        out.push('\n');
        out.push_str(&format!(
            "{:>10}{:>10}{:>10}{:>10}",
            self.nqfb(),
            self.nqcfb(),
            self.nqtfb(),
            self.iufbobsv
        ));
        if self.noprint {
            out.push_str(" NOPRINT");
        }
        out.push('\n');
        out.push_str(&format!("{:>10}\n", fortran_general(self.tomultfb)));

        for group in &self.groups {
            let nqclfb = if group.unit_factors {
                -(group.cells.len() as i64)
            } else {
                group.cells.len() as i64
            };
            out.push_str(&format!("{:>10}{:>10}\n", group.times.len(), nqclfb));
            for time in &group.times {
                out.push_str(&format!(
                    "{:<12} {:>6} {:>14} {:>14}\n",
                    time.obsnam,
                    time.irefsp + 1,
                    fortran_general(time.toffset),
                    fortran_general(time.flwobs)
                ));
            }
            for cell in &group.cells {
                let (layer, row, column) = cell.cell.to_one_based();
                out.push_str(&format!(
                    "{:>6} {:>6} {:>6} {:>14}\n",
                    layer,
                    row,
                    column,
                    fortran_general(cell.factor)
                ));
            }
        }
        Ok(out)
    }

    fn check(&self, dis: &Dis) -> Vec<String> {
        let shape = dis.shape();
        let mut issues = Vec::new();
        for cell in self.groups.iter().flat_map(|g| &g.cells) {
            if !shape.contains(cell.cell) {
                issues.push(format!("{}: cell {} is outside the grid", self.ftype(), cell.cell));
            }
        }
        for time in self.groups.iter().flat_map(|g| &g.times) {
            if time.irefsp >= dis.nper() {
                issues.push(format!(
                    "{}: observation {} refers to stress period {} of {}",
                    self.ftype(),
                    time.obsnam,
                    time.irefsp + 1,
                    dis.nper()
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> LineReader<Cursor<Vec<u8>>> {
        LineReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    fn drain_observations() -> Flwob {
        let groups = [("drob_1", 5, -5.678), ("drob_2", 8, -6.874)]
            .into_iter()
            .map(|(name, rc, flow)| {
                FlowGroup::new(
                    vec![FlowTime {
                        obsnam: name.to_string(),
                        irefsp: 0,
                        toffset: 0.0,
                        flwobs: flow,
                    }],
                    vec![FlowCell {
                        cell: CellIndex::new(0, rc, rc),
                        factor: 1.0,
                    }],
                )
            })
            .collect();
        Flwob::new(FlowKind::Drn, 0, groups).with_noprint(true)
    }

    #[test]
    fn ftype_lookup() {
        assert_eq!(FlowKind::from_ftype("drob"), Some(FlowKind::Drn));
        assert_eq!(FlowKind::from_ftype("HOB"), None);
        assert_eq!(FlowKind::Riv.ftype(), "RVOB");
    }

    #[test]
    fn derived_counts() {
        let drob = drain_observations();
        assert_eq!((drob.nqfb(), drob.nqcfb(), drob.nqtfb()), (2, 2, 2));
        assert_eq!(drob.obsnam(), vec!["drob_1", "drob_2"]);
    }

    #[test]
    fn write_then_load() {
        let drob = drain_observations();
        let text = drob.to_text(None).unwrap();
        let back = Flwob::load(&mut reader(&text), FlowKind::Drn, drob.unit).unwrap();
        assert_eq!(back, drob);
    }

    #[test]
    fn negative_cell_count_means_unit_factors() {
        let text = "\
1 1 1 33
1.0
1 -1
ch1 1 0.0 -10.0
1 2 3 0.25
";
        let chob = Flwob::load(&mut reader(text), FlowKind::Chd, 40).unwrap();
        let group = &chob.groups[0];
        assert!(group.unit_factors);
        assert_eq!(group.factor(0), Some(1.0));
        assert_eq!(group.cells[0].cell, CellIndex::new(0, 1, 2));
        assert_eq!(chob.output_files()[0].unit, 33);
        let rewritten = chob.to_text(None).unwrap();
        assert!(rewritten.lines().any(|l| l.split_whitespace().collect::<Vec<_>>() == ["1", "-1"]));
    }

    #[test]
    fn inconsistent_counts_rejected() {
        let text = "1 2 1 0\n1.0\n1 1\nch1 1 0.0 -10.0\n1 1 1 1.0\n";
        let err = Flwob::load(&mut reader(text), FlowKind::Chd, 40).unwrap_err();
        assert!(err.to_string().contains("CHOB"));
    }

    #[test]
    fn check_flags_bad_period() {
        let mut drob = drain_observations();
        drob.groups[0].times[0].irefsp = 4;
        let dis = Dis::new(1, 11, 11, 1);
        assert_eq!(drob.check(&dis).len(), 1);
    }
}
