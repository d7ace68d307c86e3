//! Head observations (HOB).
//!
//! Each observation names a cell and one or more observed heads. Heads
//! observed across several layers carry a proportion per layer; the
//! simulated equivalent is the weighted sum, so the proportions must add
//! up to one.

use crate::dis::Dis;
use crate::error::{Error, Result};
use crate::package::{OutputFile, PackageData};
use modflow_core::format::fortran_general;
use modflow_core::tokens::{parse_field, parse_optional, require_fields};
use modflow_core::{CellIndex, LineReader};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

pub const DEFAULT_UNIT: i32 = 39;
pub const LAYER_WEIGHT_TOLERANCE: f64 = 1e-8;

/// Proportion of a multilayer observation assigned to each layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerWeights {
    weights: Vec<(usize, f64)>,
}

impl LayerWeights {
    /// Layers are zero-based. Every proportion must be finite and
    /// non-negative, each layer may appear once, and the proportions must
    /// sum to one.
    pub fn new(obsname: &str, weights: Vec<(usize, f64)>) -> Result<Self> {
        for (i, &(layer, pr)) in weights.iter().enumerate() {
            if !pr.is_finite() || pr < 0.0 {
                return Err(Error::InvalidLayerProportion {
                    obsname: obsname.to_string(),
                    layer,
                    proportion: pr,
                });
            }
            if weights[..i].iter().any(|&(k, _)| k == layer) {
                return Err(Error::DuplicateLayer {
                    obsname: obsname.to_string(),
                    layer,
                });
            }
        }
        let sum: f64 = weights.iter().map(|(_, pr)| pr).sum();
        if !sum.is_finite() || (sum - 1.0).abs() > LAYER_WEIGHT_TOLERANCE {
            return Err(Error::InvalidLayerWeights {
                obsname: obsname.to_string(),
                sum,
            });
        }
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &[(usize, f64)] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn deepest_layer(&self) -> Option<usize> {
        self.weights.iter().map(|(k, _)| *k).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTime {
    pub name: String,
    pub totim: f64,
    pub hobs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadObservation {
    pub obsname: String,
    /// Layer of a single-layer observation; ignored when `layer_weights`
    /// is set.
    pub layer: usize,
    pub row: usize,
    pub column: usize,
    pub roff: f64,
    pub coff: f64,
    /// 1 for heads, 2 for head changes.
    pub itt: i32,
    pub layer_weights: Option<LayerWeights>,
    pub time_series: Vec<ObservationTime>,
}

impl HeadObservation {
    /// `times` are `(totim, observed head)` pairs. A single time takes the
    /// observation's own name, several are named `<obsname>.<n>`.
    pub fn new(obsname: &str, cell: CellIndex, times: &[(f64, f64)]) -> Self {
        let time_series = times
            .iter()
            .enumerate()
            .map(|(i, &(totim, hobs))| ObservationTime {
                name: if times.len() == 1 {
                    obsname.to_string()
                } else {
                    format!("{}.{}", obsname, i + 1)
                },
                totim,
                hobs,
            })
            .collect();
        Self {
            obsname: obsname.to_string(),
            layer: cell.layer,
            row: cell.row,
            column: cell.column,
            roff: 0.0,
            coff: 0.0,
            itt: 1,
            layer_weights: None,
            time_series,
        }
    }

    pub fn with_names(mut self, names: &[&str]) -> Result<Self> {
        if names.len() != self.time_series.len() {
            return Err(Error::package(
                "HOB",
                format!(
                    "observation {}: {} names for {} times",
                    self.obsname,
                    names.len(),
                    self.time_series.len()
                ),
            ));
        }
        for (time, name) in self.time_series.iter_mut().zip(names) {
            time.name = name.to_string();
        }
        Ok(self)
    }

    pub fn with_offsets(mut self, roff: f64, coff: f64) -> Self {
        self.roff = roff;
        self.coff = coff;
        self
    }

    /// Spread the observation over several layers. `nlay` is the model's
    /// layer count; every weighted layer must exist.
    pub fn with_layer_weights(mut self, weights: &[(usize, f64)], nlay: usize) -> Result<Self> {
        let weights = LayerWeights::new(&self.obsname, weights.to_vec())?;
        if let Some(layer) = weights.deepest_layer().filter(|&k| k >= nlay) {
            return Err(Error::LayerOutOfRange {
                obsname: self.obsname.clone(),
                layer,
                nlay,
            });
        }
        self.layer = weights.weights().first().map_or(0, |(k, _)| *k);
        self.layer_weights = Some(weights);
        Ok(self)
    }

    pub fn is_multilayer(&self) -> bool {
        self.layer_weights.is_some()
    }

    pub fn nlayers(&self) -> usize {
        self.layer_weights.as_ref().map_or(1, LayerWeights::len)
    }

    pub fn cell(&self) -> CellIndex {
        CellIndex::new(self.layer, self.row, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hob {
    pub unit: i32,
    /// Unit of the simulated-versus-observed table; 0 writes none.
    pub iuhobsv: i32,
    pub hobdry: f64,
    pub tomulth: f64,
    pub noprint: bool,
    pub observations: Vec<HeadObservation>,
}

impl Hob {
    pub fn new(iuhobsv: i32, hobdry: f64, observations: Vec<HeadObservation>) -> Self {
        Self {
            unit: DEFAULT_UNIT,
            iuhobsv,
            hobdry,
            tomulth: 1.0,
            noprint: false,
            observations,
        }
    }

    pub fn with_noprint(mut self, noprint: bool) -> Self {
        self.noprint = noprint;
        self
    }

    /// Total number of observed heads.
    pub fn nh(&self) -> usize {
        self.observations.iter().map(|o| o.time_series.len()).sum()
    }

    /// Observed heads that belong to multilayer observations.
    pub fn mobs(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.is_multilayer())
            .map(|o| o.time_series.len())
            .sum()
    }

    /// Largest number of layers of any multilayer observation.
    pub fn maxm(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.is_multilayer())
            .map(HeadObservation::nlayers)
            .max()
            .unwrap_or(0)
    }

    pub fn observation(&self, obsname: &str) -> Option<&HeadObservation> {
        self.observations
            .iter()
            .find(|o| o.obsname.eq_ignore_ascii_case(obsname))
    }

    pub fn load<R: BufRead>(reader: &mut LineReader<R>, unit: i32, dis: &Dis) -> Result<Self> {
        tracing::debug!("loading hob dataset 1");
        let tokens = reader.expect_record("HOB dataset 1")?;
        require_fields(&tokens, 3, "HOB dataset 1", reader.line_number())?;
        let nh: usize = parse_field(&tokens[0], "NH")?;
        let iuhobsv: i32 = parse_optional(&tokens, 3, "IUHOBSV", 0)?;
        let hobdry: f64 = parse_optional(&tokens, 4, "HOBDRY", -9999.0)?;
        let noprint = tokens.iter().any(|t| t.eq_ignore_ascii_case("NOPRINT"));

        tracing::debug!("loading hob dataset 2");
        let tokens = reader.expect_record("HOB dataset 2")?;
        require_fields(&tokens, 1, "HOB dataset 2", reader.line_number())?;
        let tomulth: f64 = parse_field(&tokens[0], "TOMULTH")?;

        let mut observations = Vec::new();
        let mut loaded = 0;
        while loaded < nh {
            let obs = load_observation(reader, dis, tomulth)?;
            loaded += obs.time_series.len();
            observations.push(obs);
        }
        tracing::debug!(observations = observations.len(), nh, "loaded hob observations");

        Ok(Self {
            unit,
            iuhobsv,
            hobdry,
            tomulth,
            noprint,
            observations,
        })
    }
}

fn load_observation<R: BufRead>(reader: &mut LineReader<R>, dis: &Dis, tomulth: f64) -> Result<HeadObservation> {
    tracing::debug!("loading hob dataset 3");
    let tokens = reader.expect_record("HOB dataset 3")?;
    let line = reader.line_number();
    require_fields(&tokens, 9, "HOB dataset 3", line)?;
    let obsname = tokens[0].clone();
    let layer: i64 = parse_field(&tokens[1], "LAYER")?;
    let row: i64 = parse_field(&tokens[2], "ROW")?;
    let column: i64 = parse_field(&tokens[3], "COLUMN")?;
    let irefsp: i64 = parse_field(&tokens[4], "IREFSP")?;
    let toffset: f64 = parse_field(&tokens[5], "TOFFSET")?;
    let roff: f64 = parse_field(&tokens[6], "ROFF")?;
    let coff: f64 = parse_field(&tokens[7], "COFF")?;
    let hobs: f64 = parse_field(&tokens[8], "HOBS")?;

    let layer_weights = if layer < 0 {
        tracing::debug!("loading hob dataset 4");
        let nlayers = layer.unsigned_abs() as usize;
        let pairs = reader.read_tokens(2 * nlayers, "HOB dataset 4")?;
        let mut weights = Vec::with_capacity(nlayers);
        for pair in pairs.chunks(2) {
            let mlay: i64 = parse_field(&pair[0], "MLAY")?;
            let pr: f64 = parse_field(&pair[1], "PR")?;
            weights.push((modflow_core::grid::to_zero_based(mlay, "MLAY")?, pr));
        }
        Some(weights)
    } else {
        None
    };

    let cell = CellIndex::from_one_based(layer.max(1), row, column)?;
    let mut time_series = Vec::new();
    let mut itt = 1;
    if irefsp < 0 {
        tracing::debug!("loading hob dataset 5");
        let tokens = reader.expect_record("HOB dataset 5")?;
        require_fields(&tokens, 1, "HOB dataset 5", reader.line_number())?;
        itt = parse_field(&tokens[0], "ITT")?;
        for _ in 0..irefsp.unsigned_abs() {
            tracing::debug!("loading hob dataset 6");
            let tokens = reader.expect_record("HOB dataset 6")?;
            require_fields(&tokens, 4, "HOB dataset 6", reader.line_number())?;
            let kper: i64 = parse_field(&tokens[1], "IREFSP")?;
            let toffset: f64 = parse_field(&tokens[2], "TOFFSET")?;
            time_series.push(ObservationTime {
                name: tokens[0].clone(),
                totim: observation_totim(dis, &tokens[0], kper, toffset * tomulth)?,
                hobs: parse_field(&tokens[3], "HOBS")?,
            });
        }
    } else {
        time_series.push(ObservationTime {
            name: obsname.clone(),
            totim: observation_totim(dis, &obsname, irefsp, toffset * tomulth)?,
            hobs,
        });
    }

    let mut observation = HeadObservation {
        obsname,
        layer: cell.layer,
        row: cell.row,
        column: cell.column,
        roff,
        coff,
        itt,
        layer_weights: None,
        time_series,
    };
    if let Some(weights) = layer_weights {
        observation = observation.with_layer_weights(&weights, dis.nlay)?;
    }
    Ok(observation)
}

/// Total time of a one-based `IREFSP` and offset; periods past NPER are
/// rejected.
fn observation_totim(dis: &Dis, name: &str, irefsp: i64, toffset: f64) -> Result<f64> {
    let kper = modflow_core::grid::to_zero_based(irefsp, "IREFSP")?;
    dis.totim_from_period(kper, toffset)
        .map_err(|err| Error::package("HOB", format!("observation {}: {}", name, err)))
}

impl PackageData for Hob {
    fn ftype(&self) -> &str {
        "HOB"
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        "hob"
    }

    fn output_files(&self) -> Vec<OutputFile> {
        if self.iuhobsv > 0 {
            vec![OutputFile::text(self.iuhobsv, "hob.out")]
        } else {
            Vec::new()
        }
    }

    fn to_text(&self, dis: Option<&Dis>) -> Result<String> {
        let dis = dis.ok_or(Error::MissingDis)?;
        let mut out = String::new();
        out.push_str(&self.heading());
        out.push('\n');
        out.push_str(&format!(
            "{:>10}{:>10}{:>10}{:>10}{:>10}",
            self.nh(),
            self.mobs(),
            self.maxm(),
            self.iuhobsv,
            fortran_general(self.hobdry)
        ));
        if self.noprint {
            out.push_str(" NOPRINT");
        }
        out.push('\n');
        out.push_str(&format!("{:>10}\n", fortran_general(self.tomulth)));

        for obs in &self.observations {
            let (layer, row, column) = obs.cell().to_one_based();
            let layer = if obs.is_multilayer() {
                -(obs.nlayers() as i64)
            } else {
                layer as i64
            };
            let single = match obs.time_series.as_slice() {
                [time] => Some(time),
                _ => None,
            };
            let (irefsp, toffset, hobs) = match single {
                Some(time) => {
                    let (kper, offset) = dis.period_offset_from_totim(time.totim);
                    (kper as i64 + 1, offset / self.tomulth, time.hobs)
                }
                None => (-(obs.time_series.len() as i64), 0.0, 0.0),
            };
            // A single time carries its own name on dataset 3.
            let name = single.map_or(obs.obsname.as_str(), |time| time.name.as_str());
            out.push_str(&format!(
                "{:<12} {:>4} {:>6} {:>6} {:>6} {:>14} {:>10} {:>10} {:>14}\n",
                name,
                layer,
                row,
                column,
                irefsp,
                fortran_general(toffset),
                fortran_general(obs.roff),
                fortran_general(obs.coff),
                fortran_general(hobs)
            ));

            if let Some(weights) = &obs.layer_weights {
                let pairs: Vec<String> = weights
                    .weights()
                    .iter()
                    .map(|(k, pr)| format!("{} {}", k + 1, fortran_general(*pr)))
                    .collect();
                out.push_str(&pairs.join("  "));
                out.push('\n');
            }

            if single.is_none() {
                out.push_str(&format!("{:>10}\n", obs.itt));
                for time in &obs.time_series {
                    let (kper, offset) = dis.period_offset_from_totim(time.totim);
                    out.push_str(&format!(
                        "{:<12} {:>6} {:>14} {:>14}\n",
                        time.name,
                        kper + 1,
                        fortran_general(offset / self.tomulth),
                        fortran_general(time.hobs)
                    ));
                }
            }
        }
        Ok(out)
    }

    fn check(&self, dis: &Dis) -> Vec<String> {
        let shape = dis.shape();
        let mut issues = Vec::new();
        for obs in &self.observations {
            if obs.row >= shape.nrow || obs.column >= shape.ncol || obs.layer >= shape.nlay {
                issues.push(format!("HOB: observation {} at {} is outside the grid", obs.obsname, obs.cell()));
            }
            if obs.roff.abs() > 0.5 || obs.coff.abs() > 0.5 {
                issues.push(format!("HOB: observation {} offsets exceed half a cell", obs.obsname));
            }
            let end = dis.total_time();
            for time in obs.time_series.iter().filter(|t| t.totim > end) {
                issues.push(format!(
                    "HOB: observation time {} ({}) is after the end of the simulation ({})",
                    time.name, time.totim, end
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dis::StressPeriod;
    use approx::assert_abs_diff_eq;
    use std::io::Cursor;

    fn reader(text: &str) -> LineReader<Cursor<Vec<u8>>> {
        LineReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn layer_weights_summing_to_one_accepted() {
        let obs = HeadObservation::new("h1", CellIndex::new(0, 0, 0), &[(1.0, 0.0)])
            .with_layer_weights(&[(0, 0.19), (1, 0.69), (2, 0.12)], 3)
            .unwrap();
        assert_eq!(obs.nlayers(), 3);
    }

    #[test]
    fn layer_weights_not_summing_to_one_rejected() {
        let err = HeadObservation::new("h1", CellIndex::new(0, 0, 0), &[(1.0, 0.0)])
            .with_layer_weights(&[(0, 0.50), (1, 0.50), (2, 0.01)], 3)
            .unwrap_err();
        match err {
            Error::InvalidLayerWeights { sum, .. } => assert_abs_diff_eq!(sum, 1.01, epsilon = 1e-12),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn layer_weight_outside_grid_rejected() {
        let err = HeadObservation::new("h1", CellIndex::new(0, 0, 0), &[(1.0, 0.0)])
            .with_layer_weights(&[(0, 0.5), (3, 0.5)], 3)
            .unwrap_err();
        assert!(matches!(err, Error::LayerOutOfRange { layer: 3, nlay: 3, .. }));
    }

    #[test]
    fn default_time_names() {
        let obs = HeadObservation::new("o2", CellIndex::new(0, 3, 3), &[(0.0, 1.0), (5.0, 2.0)]);
        let names: Vec<&str> = obs.time_series.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["o2.1", "o2.2"]);
        let single = HeadObservation::new("o3", CellIndex::new(0, 0, 0), &[(0.0, 1.0)]);
        assert_eq!(single.time_series[0].name, "o3");
    }

    #[test]
    fn multiline_layer_pairs_load() {
        let text = "\
2 4 7
1 1
A19E1_1 -2 140 91 1 1 -0.28321 -0.05389 69 1 1 1  # A19E1 8/13/1975
3 0.954
4 0.046
A19E1_2 -2 140 91 1 1 -0.28321 -0.05389 72 1 1 1  # A19E1 10/9/1975
3 0.954
4 0.046
";
        let dis = Dis::new(4, 200, 200, 100).with_periods(vec![StressPeriod::new(10.0, 4, 1.0, false); 100]);
        let hob = Hob::load(&mut reader(text), DEFAULT_UNIT, &dis).unwrap();
        assert_eq!(hob.observations.len(), 2);
        let first = &hob.observations[0];
        assert_eq!((first.row, first.column), (139, 90));
        assert_eq!(first.layer_weights.as_ref().unwrap().weights()[1].0, 3);
        assert_abs_diff_eq!(first.time_series[0].totim, 1.0);
        assert_abs_diff_eq!(hob.observations[1].time_series[0].hobs, 72.0);
    }

    #[test]
    fn missing_trailing_dataset1_items_default() {
        let text = "1 0 0\n1.0\nh1 1 1 1 1 0.0 0.0 0.0 5.0\n";
        let dis = Dis::new(1, 1, 1, 1);
        let hob = Hob::load(&mut reader(text), DEFAULT_UNIT, &dis).unwrap();
        assert_eq!(hob.iuhobsv, 0);
        assert_eq!(hob.hobdry, -9999.0);
        assert!(hob.output_files().is_empty());
    }

    #[test]
    fn time_series_written_and_reloaded() {
        let dis = Dis::new(1, 11, 11, 2);
        let obs = HeadObservation::new("hob1", CellIndex::new(0, 5, 5), &[(1.0, 54.4), (2.0, 55.2)]);
        let hob = Hob::new(51, -9999.0, vec![obs]).with_noprint(true);
        let text = hob.to_text(Some(&dis)).unwrap();
        assert!(text.lines().nth(1).unwrap().trim_end().ends_with("NOPRINT"));

        let back = Hob::load(&mut reader(&text), DEFAULT_UNIT, &dis).unwrap();
        assert_eq!(back.nh(), 2);
        assert!(back.noprint);
        let times: Vec<f64> = back.observations[0].time_series.iter().map(|t| t.totim).collect();
        assert_eq!(times, vec![1.0, 2.0]);
        assert_eq!(back.observations[0].time_series[1].name, "hob1.2");
    }

    #[test]
    fn derived_counts() {
        let single = HeadObservation::new("a", CellIndex::new(0, 0, 0), &[(1.0, 1.0)]);
        let multi = HeadObservation::new("b", CellIndex::new(0, 0, 0), &[(1.0, 1.0), (2.0, 2.0)])
            .with_layer_weights(&[(0, 0.25), (1, 0.75)], 2)
            .unwrap();
        let hob = Hob::new(51, -9999.0, vec![single, multi]);
        assert_eq!((hob.nh(), hob.mobs(), hob.maxm()), (3, 2, 2));
    }

    #[test]
    fn non_finite_proportions_rejected() {
        for weights in [vec![(0, 1.0), (1, f64::NAN)], vec![(0, f64::NAN)], vec![(0, f64::INFINITY)]] {
            let err = LayerWeights::new("h1", weights).unwrap_err();
            assert!(matches!(err, Error::InvalidLayerProportion { .. }), "{err}");
        }
    }

    #[test]
    fn negative_proportion_rejected() {
        let err = LayerWeights::new("h1", vec![(0, 2.0), (1, -1.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidLayerProportion { layer: 1, .. }));
    }

    #[test]
    fn repeated_layer_rejected() {
        let err = LayerWeights::new("h1", vec![(0, 0.5), (0, 0.5)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLayer { layer: 0, .. }));
    }

    #[test]
    fn nan_proportion_in_file_rejected() {
        let text = "1 1 2\n1.0\nh1 -2 1 1 1 0.0 0.0 0.0 5.0\n1 NaN 2 1.0\n";
        let dis = Dis::new(2, 1, 1, 1);
        assert!(Hob::load(&mut reader(text), DEFAULT_UNIT, &dis).is_err());
    }

    #[test]
    fn irefsp_past_nper_rejected() {
        let dis = Dis::new(1, 1, 1, 2);
        let single = "1 0 0\n1.0\nh1 1 1 1 3 0.0 0.0 0.0 5.0\n";
        let err = Hob::load(&mut reader(single), DEFAULT_UNIT, &dis).unwrap_err();
        assert!(err.to_string().contains("beyond NPER 2"), "{err}");

        let series = "2 0 0\n1.0\nh2 1 1 1 -2 0.0 0.0 0.0 0.0\n1\nh2.1 1 0.5 1.0\nh2.2 5 0.5 2.0\n";
        assert!(Hob::load(&mut reader(series), DEFAULT_UNIT, &dis).is_err());
    }

    #[test]
    fn single_time_keeps_custom_name() {
        let dis = Dis::new(1, 2, 2, 1);
        let obs = HeadObservation::new("well", CellIndex::new(0, 1, 1), &[(0.5, 3.0)])
            .with_names(&["well_jan"])
            .unwrap();
        let text = Hob::new(0, -9999.0, vec![obs]).to_text(Some(&dis)).unwrap();
        let back = Hob::load(&mut reader(&text), DEFAULT_UNIT, &dis).unwrap();
        assert_eq!(back.observations[0].time_series[0].name, "well_jan");
    }

    #[test]
    fn writing_needs_dis() {
        let hob = Hob::new(51, -9999.0, Vec::new());
        assert!(matches!(hob.to_text(None), Err(Error::MissingDis)));
    }

    #[test]
    fn check_flags_cells_outside_grid() {
        let dis = Dis::new(1, 2, 2, 1);
        let obs = HeadObservation::new("far", CellIndex::new(0, 5, 0), &[(0.5, 1.0)]);
        let hob = Hob::new(0, 0.0, vec![obs]);
        assert_eq!(hob.check(&dis).len(), 1);
    }
}
