//! SUB-WT: subsidence and aquifer-system compaction for water-table
//! aquifers.
//!
//! Dataset layout:
//!
//! | dataset | contents                                             |
//! |---------|------------------------------------------------------|
//! | 1       | `IPAKCB ISWTOC NSYSTM ITHK IVOID ISTPCS ICRCC`       |
//! | 2       | `LNWT(NSYSTM)`, one-based                            |
//! | 3       | ten print flags                                      |
//! | 4–6     | `GL0`, `SGM`, `SGS`                                  |
//! | 7–13    | per system `THICK`, `SSE SSV` or `CR CC`, `VOID SUB` |
//! | 14/15   | per layer `PCSOFF` or `PCS`                          |
//! | 16      | 26 output format/unit codes                          |
//! | 17      | `ISWTOC` rows of 30 output flags                     |

use crate::dis::Dis;
use crate::error::{Error, Result};
use crate::package::{OutputFile, PackageData};
use modflow_core::tokens::{parse_field, require_fields};
use modflow_core::{Array2d, Array3d, ArrayContext, LineReader};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

pub const DEFAULT_UNIT: i32 = 35;

/// First unit of the default dataset-16 output files.
pub const FIRST_OUTPUT_UNIT: i32 = 2052;

pub const OUTPUT_EXTENSIONS: [&str; 13] = [
    "swt_subsidence.hds",
    "swt_total_comp.hds",
    "swt_inter_comp.hds",
    "swt_vert_disp.hds",
    "swt_precon_stress.hds",
    "swt_precon_stress_delta.hds",
    "swt_geostatic_stress.hds",
    "swt_geostatic_stress_delta.hds",
    "swt_eff_stress.hds",
    "swt_eff_stress_delta.hds",
    "swt_void_ratio.hds",
    "swt_thick.hds",
    "swt_lay_center.hds",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwtPrintFlags {
    pub izcfl: i32,
    pub izcfm: i32,
    pub iglfl: i32,
    pub iglfm: i32,
    pub iestfl: i32,
    pub iestfm: i32,
    pub ipcsfl: i32,
    pub ipcsfm: i32,
    pub istfl: i32,
    pub istfm: i32,
}

impl SwtPrintFlags {
    fn from_values(v: &[i32]) -> Self {
        Self {
            izcfl: v[0],
            izcfm: v[1],
            iglfl: v[2],
            iglfm: v[3],
            iestfl: v[4],
            iestfm: v[5],
            ipcsfl: v[6],
            ipcsfm: v[7],
            istfl: v[8],
            istfm: v[9],
        }
    }

    fn values(&self) -> [i32; 10] {
        [
            self.izcfl,
            self.izcfm,
            self.iglfl,
            self.iglfm,
            self.iestfl,
            self.iestfm,
            self.ipcsfl,
            self.ipcsfm,
            self.istfl,
            self.istfm,
        ]
    }
}

/// Interbed compressibility, selected by `ICRCC`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Compressibility {
    /// `ICRCC ≠ 0`: elastic and inelastic skeletal specific storage.
    Storage { sse: Array3d<f32>, ssv: Array3d<f32> },
    /// `ICRCC = 0`: recompression and compression indices.
    Index { cr: Array3d<f32>, cc: Array3d<f32> },
}

impl Compressibility {
    pub fn icrcc(&self) -> i32 {
        match self {
            Compressibility::Storage { .. } => 1,
            Compressibility::Index { .. } => 0,
        }
    }
}

/// Starting preconsolidation stress, selected by `ISTPCS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Preconsolidation {
    /// `ISTPCS ≠ 0`: offset from the initial effective stress.
    Offset(Array3d<f32>),
    /// `ISTPCS = 0`: the stress itself.
    Stress(Array3d<f32>),
}

impl Preconsolidation {
    pub fn istpcs(&self) -> i32 {
        match self {
            Preconsolidation::Offset(_) => 1,
            Preconsolidation::Stress(_) => 0,
        }
    }

    pub fn arrays(&self) -> &Array3d<f32> {
        match self {
            Preconsolidation::Offset(a) | Preconsolidation::Stress(a) => a,
        }
    }
}

/// Datasets 16 and 17. The first four entries of every dataset-17 row
/// (period and step bounds) are zero-based here and one-based on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwtOutputControl {
    pub ids16: [i32; 26],
    pub ids17: Vec<[i32; 30]>,
}

impl Default for SwtOutputControl {
    fn default() -> Self {
        let mut ids16 = [0; 26];
        for (i, unit) in (FIRST_OUTPUT_UNIT..).take(OUTPUT_EXTENSIONS.len()).enumerate() {
            ids16[2 * i + 1] = unit;
        }
        let mut row = [1; 30];
        row[0] = 0;
        row[1] = 9999;
        row[2] = 0;
        row[3] = 9999;
        Self {
            ids16,
            ids17: vec![row],
        }
    }
}

impl SwtOutputControl {
    /// `(unit, extension)` for every output file with a positive unit.
    pub fn output_units(&self) -> Vec<(i32, &'static str)> {
        OUTPUT_EXTENSIONS
            .iter()
            .enumerate()
            .map(|(i, ext)| (self.ids16[2 * i + 1], *ext))
            .filter(|(unit, _)| *unit > 0)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swt {
    pub unit: i32,
    pub ipakcb: i32,
    pub ithk: i32,
    pub ivoid: i32,
    /// Zero-based model layer of each interbed system.
    pub lnwt: Vec<usize>,
    pub print_flags: SwtPrintFlags,
    pub gl0: Array2d<f32>,
    pub sgm: Array2d<f32>,
    pub sgs: Array2d<f32>,
    pub thick: Array3d<f32>,
    pub compressibility: Compressibility,
    pub void: Array3d<f32>,
    pub sub: Array3d<f32>,
    pub preconsolidation: Preconsolidation,
    pub output: Option<SwtOutputControl>,
}

impl Swt {
    /// One interbed system per entry of `lnwt`, with uniform default
    /// properties sized from `dis`.
    pub fn new(dis: &Dis, lnwt: Vec<usize>) -> Self {
        let (nrow, ncol) = (dis.nrow, dis.ncol);
        let nsystm = lnwt.len();
        Self {
            unit: DEFAULT_UNIT,
            ipakcb: 0,
            ithk: 0,
            ivoid: 0,
            lnwt,
            print_flags: SwtPrintFlags::default(),
            gl0: Array2d::constant(nrow, ncol, 0.0),
            sgm: Array2d::constant(nrow, ncol, 1.7),
            sgs: Array2d::constant(nrow, ncol, 2.0),
            thick: Array3d::constant(nsystm, nrow, ncol, 1.0),
            compressibility: Compressibility::Index {
                cr: Array3d::constant(nsystm, nrow, ncol, 0.01),
                cc: Array3d::constant(nsystm, nrow, ncol, 0.25),
            },
            void: Array3d::constant(nsystm, nrow, ncol, 0.82),
            sub: Array3d::constant(nsystm, nrow, ncol, 0.0),
            preconsolidation: Preconsolidation::Offset(Array3d::constant(dis.nlay, nrow, ncol, 0.0)),
            output: None,
        }
    }

    pub fn with_ipakcb(mut self, ipakcb: i32) -> Self {
        self.ipakcb = ipakcb;
        self
    }

    pub fn with_output_control(mut self, output: SwtOutputControl) -> Self {
        self.output = Some(output);
        self
    }

    pub fn nsystm(&self) -> usize {
        self.lnwt.len()
    }

    pub fn iswtoc(&self) -> usize {
        self.output.as_ref().map_or(0, |o| o.ids17.len())
    }

    pub fn load<R: BufRead>(
        reader: &mut LineReader<R>,
        unit: i32,
        dis: &Dis,
        ctx: &mut ArrayContext,
    ) -> Result<Self> {
        let (nrow, ncol, nlay) = (dis.nrow, dis.ncol, dis.nlay);

        tracing::debug!("loading swt dataset 1");
        let tokens = reader.expect_record("SWT dataset 1")?;
        require_fields(&tokens, 7, "SWT dataset 1", reader.line_number())?;
        let ipakcb: i32 = parse_field(&tokens[0], "IPAKCB")?;
        let iswtoc: usize = parse_field(&tokens[1], "ISWTOC")?;
        let nsystm: usize = parse_field(&tokens[2], "NSYSTM")?;
        let ithk: i32 = parse_field(&tokens[3], "ITHK")?;
        let ivoid: i32 = parse_field(&tokens[4], "IVOID")?;
        let istpcs: i32 = parse_field(&tokens[5], "ISTPCS")?;
        let icrcc: i32 = parse_field(&tokens[6], "ICRCC")?;

        let mut lnwt = Vec::with_capacity(nsystm);
        if nsystm > 0 {
            tracing::debug!("loading swt dataset 2");
            for layer in reader.read_values::<i64>(nsystm, "LNWT")? {
                lnwt.push(modflow_core::grid::to_zero_based(layer, "LNWT")?);
            }
        }

        tracing::debug!("loading swt dataset 3");
        let flags: Vec<i32> = reader.read_values(10, "SWT dataset 3")?;
        let print_flags = SwtPrintFlags::from_values(&flags);

        tracing::debug!("loading swt datasets 4 to 6");
        let gl0 = Array2d::load(reader, nrow, ncol, "gl0", ctx)?;
        let sgm = Array2d::load(reader, nrow, ncol, "sgm", ctx)?;
        let sgs = Array2d::load(reader, nrow, ncol, "sgs", ctx)?;

        let mut thick = Vec::with_capacity(nsystm);
        let mut first = Vec::with_capacity(nsystm);
        let mut second = Vec::with_capacity(nsystm);
        let mut void = Vec::with_capacity(nsystm);
        let mut sub = Vec::with_capacity(nsystm);
        let (first_name, second_name) = if icrcc != 0 { ("sse", "ssv") } else { ("cr", "cc") };
        for (k, layer) in lnwt.iter().enumerate() {
            tracing::debug!(system = k + 1, layer = layer + 1, "loading swt datasets 7 to 13");
            thick.push(Array2d::load(reader, nrow, ncol, &format!("thick system {}", k + 1), ctx)?);
            first.push(Array2d::load(reader, nrow, ncol, &format!("{} system {}", first_name, k + 1), ctx)?);
            second.push(Array2d::load(reader, nrow, ncol, &format!("{} system {}", second_name, k + 1), ctx)?);
            void.push(Array2d::load(reader, nrow, ncol, &format!("void system {}", k + 1), ctx)?);
            sub.push(Array2d::load(reader, nrow, ncol, &format!("sub system {}", k + 1), ctx)?);
        }
        let compressibility = if icrcc != 0 {
            Compressibility::Storage {
                sse: Array3d::from_layers(first, "sse")?,
                ssv: Array3d::from_layers(second, "ssv")?,
            }
        } else {
            Compressibility::Index {
                cr: Array3d::from_layers(first, "cr")?,
                cc: Array3d::from_layers(second, "cc")?,
            }
        };

        tracing::debug!("loading swt datasets 14 and 15");
        let preconsolidation = if istpcs != 0 {
            Preconsolidation::Offset(Array3d::load(reader, nlay, nrow, ncol, "pcsoff", ctx)?)
        } else {
            Preconsolidation::Stress(Array3d::load(reader, nlay, nrow, ncol, "pcs", ctx)?)
        };

        let output = if iswtoc > 0 {
            tracing::debug!("loading swt dataset 16");
            let values: Vec<i32> = reader.read_values(26, "SWT dataset 16")?;
            let mut ids16 = [0; 26];
            ids16.copy_from_slice(&values);

            let mut ids17 = Vec::with_capacity(iswtoc);
            for k in 0..iswtoc {
                tracing::debug!(row = k + 1, "loading swt dataset 17");
                let values: Vec<i32> = reader.read_values(30, "SWT dataset 17")?;
                let mut row = [0; 30];
                row.copy_from_slice(&values);
                for bound in row.iter_mut().take(4) {
                    *bound -= 1;
                }
                ids17.push(row);
            }
            Some(SwtOutputControl { ids16, ids17 })
        } else {
            None
        };

        Ok(Self {
            unit,
            ipakcb,
            ithk,
            ivoid,
            lnwt,
            print_flags,
            gl0,
            sgm,
            sgs,
            thick: Array3d::from_layers(thick, "thick")?,
            compressibility,
            void: Array3d::from_layers(void, "void")?,
            sub: Array3d::from_layers(sub, "sub")?,
            preconsolidation,
            output,
        })
    }
}

impl PackageData for Swt {
    fn ftype(&self) -> &str {
        "SWT"
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        "swt"
    }

    fn output_files(&self) -> Vec<OutputFile> {
        let mut files = Vec::new();
        if self.ipakcb > 0 {
            files.push(OutputFile::binary(self.ipakcb, "cbc"));
        }
        if let Some(output) = &self.output {
            files.extend(
                output
                    .output_units()
                    .into_iter()
                    .map(|(unit, ext)| OutputFile::binary(unit, ext)),
            );
        }
        files
    }

    fn to_text(&self, dis: Option<&Dis>) -> Result<String> {
        let nsystm = self.nsystm();
        let (first, second) = match &self.compressibility {
            Compressibility::Storage { sse, ssv } => (("sse", sse), ("ssv", ssv)),
            Compressibility::Index { cr, cc } => (("cr", cr), ("cc", cc)),
        };
        for (name, arrays) in [("thick", &self.thick), first, second, ("void", &self.void), ("sub", &self.sub)] {
            if arrays.nlay() != nsystm {
                return Err(Error::package(
                    "SWT",
                    format!("{} has {} systems, LNWT lists {}", name, arrays.nlay(), nsystm),
                ));
            }
        }
        let pcs_layers = self.preconsolidation.arrays().nlay();
        if let Some(dis) = dis.filter(|dis| dis.nlay != pcs_layers) {
            return Err(Error::package(
                "SWT",
                format!("{} preconsolidation arrays for {} layers", pcs_layers, dis.nlay),
            ));
        }

        let mut out = String::new();
        out.push_str(&self.heading());
        out.push('\n');
        out.push_str(&format!(
            "{} {} {} {} {} {} {}\n",
            self.ipakcb,
            self.iswtoc(),
            nsystm,
            self.ithk,
            self.ivoid,
            self.preconsolidation.istpcs(),
            self.compressibility.icrcc()
        ));
        let lnwt: Vec<String> = self.lnwt.iter().map(|k| (k + 1).to_string()).collect();
        out.push_str(&lnwt.join(" "));
        out.push('\n');
        let flags: Vec<String> = self.print_flags.values().iter().map(i32::to_string).collect();
        out.push_str(&flags.join(" "));
        out.push('\n');

        out.push_str(&self.gl0.to_file_entry("gl0"));
        out.push_str(&self.sgm.to_file_entry("sgm"));
        out.push_str(&self.sgs.to_file_entry("sgs"));

        for k in 0..nsystm {
            let system = k + 1;
            push_layer(&mut out, &self.thick, k, &format!("thick system {}", system))?;
            match &self.compressibility {
                Compressibility::Storage { sse, ssv } => {
                    push_layer(&mut out, sse, k, &format!("sse system {}", system))?;
                    push_layer(&mut out, ssv, k, &format!("ssv system {}", system))?;
                }
                Compressibility::Index { cr, cc } => {
                    push_layer(&mut out, cr, k, &format!("cr system {}", system))?;
                    push_layer(&mut out, cc, k, &format!("cc system {}", system))?;
                }
            }
            push_layer(&mut out, &self.void, k, &format!("void system {}", system))?;
            push_layer(&mut out, &self.sub, k, &format!("sub system {}", system))?;
        }

        let (name, arrays) = match &self.preconsolidation {
            Preconsolidation::Offset(a) => ("pcsoff", a),
            Preconsolidation::Stress(a) => ("pcs", a),
        };
        for (k, layer) in arrays.layers().iter().enumerate() {
            out.push_str(&layer.to_file_entry(&format!("{} layer {}", name, k + 1)));
        }

        if let Some(output) = &self.output {
            let ids16: Vec<String> = output.ids16.iter().map(i32::to_string).collect();
            out.push_str(&format!("{}  #dataset 16\n", ids16.join(" ")));
            for (k, row) in output.ids17.iter().enumerate() {
                let values: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let value = if i < 4 { v + 1 } else { *v };
                        value.to_string()
                    })
                    .collect();
                out.push_str(&format!("{}  #dataset 17 iswtoc {}\n", values.join(" "), k + 1));
            }
        }
        Ok(out)
    }

    fn check(&self, dis: &Dis) -> Vec<String> {
        let mut issues = Vec::new();
        for (k, layer) in self.lnwt.iter().enumerate() {
            if *layer >= dis.nlay {
                issues.push(format!(
                    "SWT: system {} is assigned to layer {} of a {}-layer model",
                    k + 1,
                    layer + 1,
                    dis.nlay
                ));
            }
        }
        let pcs_layers = self.preconsolidation.arrays().nlay();
        if pcs_layers != dis.nlay {
            issues.push(format!(
                "SWT: {} preconsolidation arrays for {} layers",
                pcs_layers, dis.nlay
            ));
        }
        if self.gl0.nrow() != dis.nrow || self.gl0.ncol() != dis.ncol {
            issues.push(format!(
                "SWT: arrays are {}x{}, grid is {}x{}",
                self.gl0.nrow(),
                self.gl0.ncol(),
                dis.nrow,
                dis.ncol
            ));
        }
        issues
    }
}

fn push_layer(out: &mut String, arrays: &Array3d<f32>, k: usize, name: &str) -> Result<()> {
    let layer = arrays
        .layer(k)
        .ok_or_else(|| Error::package("SWT", format!("{} is missing", name)))?;
    out.push_str(&layer.to_file_entry(name));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> LineReader<Cursor<Vec<u8>>> {
        LineReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    fn load(text: &str, dis: &Dis) -> Result<Swt> {
        let mut ctx = ArrayContext::new(".").with_package_unit(DEFAULT_UNIT);
        Swt::load(&mut reader(text), DEFAULT_UNIT, dis, &mut ctx)
    }

    #[test]
    fn defaults() {
        let dis = Dis::new(2, 3, 3, 1);
        let swt = Swt::new(&dis, vec![0]);
        assert_eq!(swt.nsystm(), 1);
        assert_eq!(swt.iswtoc(), 0);
        assert_eq!(swt.preconsolidation.istpcs(), 1);
        assert_eq!(swt.compressibility.icrcc(), 0);
        assert_eq!(swt.void.layer(0).unwrap().get(0, 0), Some(0.82));
        assert_eq!(swt.preconsolidation.arrays().nlay(), 2);
    }

    #[test]
    fn default_output_units() {
        let control = SwtOutputControl::default();
        let units = control.output_units();
        assert_eq!(units.len(), 13);
        assert_eq!(units[0], (2052, "swt_subsidence.hds"));
        assert_eq!(units[12], (2064, "swt_lay_center.hds"));
        assert_eq!(&control.ids17[0][..4], &[0, 9999, 0, 9999]);
    }

    #[test]
    fn round_trip_with_output_control() {
        let dis = Dis::new(2, 3, 3, 1);
        let swt = Swt::new(&dis, vec![0, 1])
            .with_ipakcb(53)
            .with_output_control(SwtOutputControl::default());
        let text = swt.to_text(Some(&dis)).unwrap();
        assert!(text.contains("1 10000 1 10000"));

        let back = load(&text, &dis).unwrap();
        assert_eq!(back, swt);
        assert_eq!(back.output_files().len(), 14);
    }

    #[test]
    fn storage_coefficients_when_icrcc_set() {
        let text = "\
# SWT test
0 0 1 0 0 0 1
2
0 0 0 0 0 0 0 0 0 0
CONSTANT 0.0
CONSTANT 1.7
CONSTANT 2.0
CONSTANT 5.0
CONSTANT 1.0E-05
CONSTANT 2.0E-04
CONSTANT 0.5
CONSTANT 0.0
CONSTANT 10.0
CONSTANT 20.0
";
        let dis = Dis::new(2, 1, 1, 1);
        let swt = load(text, &dis).unwrap();
        assert_eq!(swt.lnwt, vec![1]);
        match &swt.compressibility {
            Compressibility::Storage { ssv, .. } => {
                assert_eq!(ssv.layer(0).unwrap().get(0, 0), Some(2.0e-4));
            }
            other => panic!("expected storage coefficients, got {:?}", other),
        }
        assert!(matches!(swt.preconsolidation, Preconsolidation::Stress(_)));
    }

    #[test]
    fn truncated_file_is_error() {
        let dis = Dis::new(1, 1, 1, 1);
        assert!(load("0 0 1 0 0 1 0\n1\n0 0 0 0 0 0 0 0 0 0\nCONSTANT 0.0\n", &dis).is_err());
    }

    #[test]
    fn short_compressibility_arrays_refused() {
        let dis = Dis::new(1, 2, 2, 1);
        let mut swt = Swt::new(&dis, vec![0, 0]);
        swt.compressibility = Compressibility::Index {
            cr: Array3d::constant(2, 2, 2, 0.01),
            cc: Array3d::constant(1, 2, 2, 0.25),
        };
        let err = swt.to_text(Some(&dis)).unwrap_err();
        assert!(err.to_string().contains("cc has 1 systems"), "{err}");
    }

    #[test]
    fn preconsolidation_layers_match_grid() {
        let dis = Dis::new(2, 2, 2, 1);
        let mut swt = Swt::new(&dis, vec![0]);
        swt.preconsolidation = Preconsolidation::Stress(Array3d::constant(1, 2, 2, 10.0));
        assert!(swt.to_text(Some(&dis)).is_err());
    }

    #[test]
    fn check_flags_system_below_grid() {
        let dis = Dis::new(1, 2, 2, 1);
        let swt = Swt::new(&dis, vec![3]);
        assert_eq!(swt.check(&dis).len(), 1);
    }
}
