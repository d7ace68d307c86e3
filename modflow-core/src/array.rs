//! Array control records and two-dimensional grid arrays.
//!
//! Every array in a MODFLOW-2005 package is preceded by a control record
//! telling the reader where the values live. Two spellings exist:
//!
//! * free format: `CONSTANT 1.0`, `INTERNAL 1.0 (FREE) -1`,
//!   `EXTERNAL 31 1.0 (FREE) -1`, `OPEN/CLOSE top.ref 1.0 (FREE) -1`
//! * fixed format: `LOCAT(I10) CNSTNT(F10) FMTIN(A20) IPRN(I10)` where
//!   `LOCAT = 0` is a constant and a positive `LOCAT` names the unit the
//!   values are read from.
//!
//! Arrays are always written back in free format, constant when uniform
//! and internal otherwise.

use crate::errors::{CoreError, Result};
use crate::format::fortran_general;
use crate::tokens::{fixed_fields, parse_field, split_free, FromField, LineReader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const VALUES_PER_LINE: usize = 10;

/// Element type of an array read from a MODFLOW file.
pub trait ArrayValue: FromField + Copy + PartialEq + fmt::Debug + Default {
    fn scaled(self, mult: f64) -> Self;
    fn to_text(self) -> String;
}

impl ArrayValue for f32 {
    fn scaled(self, mult: f64) -> Self {
        (self as f64 * mult) as f32
    }

    fn to_text(self) -> String {
        fortran_general(self)
    }
}

impl ArrayValue for f64 {
    fn scaled(self, mult: f64) -> Self {
        self * mult
    }

    fn to_text(self) -> String {
        fortran_general(self)
    }
}

impl ArrayValue for i32 {
    fn scaled(self, mult: f64) -> Self {
        (self as f64 * mult).round() as i32
    }

    fn to_text(self) -> String {
        self.to_string()
    }
}

/// Where the values of an array are stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayControl {
    Constant(f64),
    Internal {
        mult: f64,
        fmtin: String,
        iprn: i32,
    },
    External {
        unit: i32,
        mult: f64,
        fmtin: String,
        iprn: i32,
    },
    OpenClose {
        path: String,
        mult: f64,
        fmtin: String,
        iprn: i32,
    },
}

impl ArrayControl {
    /// Parse a control record. `package_unit` is the unit of the file being
    /// read; a fixed-format `LOCAT` equal to it means "internal".
    pub fn parse(line: &str, package_unit: Option<i32>) -> Result<Self> {
        let tokens = split_free(line);
        let Some(first) = tokens.first() else {
            return Err(CoreError::InvalidControlRecord("empty record".to_string()));
        };

        match first.to_uppercase().as_str() {
            "CONSTANT" => {
                let value = tokens
                    .get(1)
                    .ok_or_else(|| CoreError::InvalidControlRecord(line.to_string()))?;
                Ok(ArrayControl::Constant(parse_field(value, "CNSTNT")?))
            }
            "INTERNAL" => Ok(ArrayControl::Internal {
                mult: optional_real(&tokens, 1)?,
                fmtin: tokens.get(2).cloned().unwrap_or_else(|| "(FREE)".to_string()),
                iprn: optional_int(&tokens, 3)?,
            }),
            "EXTERNAL" => {
                let unit = tokens
                    .get(1)
                    .ok_or_else(|| CoreError::InvalidControlRecord(line.to_string()))?;
                Ok(ArrayControl::External {
                    unit: parse_field(unit, "external unit")?,
                    mult: optional_real(&tokens, 2)?,
                    fmtin: tokens.get(3).cloned().unwrap_or_else(|| "(FREE)".to_string()),
                    iprn: optional_int(&tokens, 4)?,
                })
            }
            "OPEN/CLOSE" => {
                let path = tokens
                    .get(1)
                    .ok_or_else(|| CoreError::InvalidControlRecord(line.to_string()))?;
                Ok(ArrayControl::OpenClose {
                    path: path.clone(),
                    mult: optional_real(&tokens, 2)?,
                    fmtin: tokens.get(3).cloned().unwrap_or_else(|| "(FREE)".to_string()),
                    iprn: optional_int(&tokens, 4)?,
                })
            }
            _ => Self::parse_fixed(line, &tokens, package_unit),
        }
    }

    fn parse_fixed(line: &str, tokens: &[String], package_unit: Option<i32>) -> Result<Self> {
        let fields = fixed_fields(line, &[10, 10, 20, 10]);
        let fixed = i32::from_field(fields[0]).and_then(|locat| {
            let cnstnt = if fields[1].is_empty() {
                Some(0.0)
            } else {
                f64::from_field(fields[1])
            };
            cnstnt.map(|c| (locat, c, fields[2].to_string(), fields[3].to_string()))
        });

        let (locat, cnstnt, fmtin, iprn) = match fixed {
            Some(parsed) => parsed,
            None => {
                let locat = parse_field(&tokens[0], "LOCAT")?;
                let cnstnt = optional_real(tokens, 1)?;
                let fmtin = tokens.get(2).cloned().unwrap_or_default();
                let iprn = tokens.get(3).cloned().unwrap_or_default();
                (locat, cnstnt, fmtin, iprn)
            }
        };
        let iprn = if iprn.is_empty() {
            0
        } else {
            parse_field(&iprn, "IPRN")?
        };
        let fmtin = if fmtin.is_empty() {
            "(FREE)".to_string()
        } else {
            fmtin
        };

        match locat {
            0 => Ok(ArrayControl::Constant(cnstnt)),
            l if l < 0 => Err(CoreError::InvalidControlRecord(format!(
                "binary array on unit {} is not supported",
                -l
            ))),
            l if Some(l) == package_unit => Ok(ArrayControl::Internal {
                mult: cnstnt,
                fmtin,
                iprn,
            }),
            l => Ok(ArrayControl::External {
                unit: l,
                mult: cnstnt,
                fmtin,
                iprn,
            }),
        }
    }

    /// Multiplier applied to the values read. A zero multiplier leaves the
    /// values unchanged, as MODFLOW does.
    pub fn multiplier(&self) -> f64 {
        let mult = match self {
            ArrayControl::Constant(_) => 1.0,
            ArrayControl::Internal { mult, .. }
            | ArrayControl::External { mult, .. }
            | ArrayControl::OpenClose { mult, .. } => *mult,
        };
        if mult == 0.0 {
            1.0
        } else {
            mult
        }
    }
}

fn optional_real(tokens: &[String], index: usize) -> Result<f64> {
    match tokens.get(index) {
        Some(token) => parse_field(token, "CNSTNT"),
        None => Ok(1.0),
    }
}

fn optional_int(tokens: &[String], index: usize) -> Result<i32> {
    match tokens.get(index) {
        Some(token) => parse_field(token, "IPRN"),
        None => Ok(-1),
    }
}

/// Resolves external units and relative paths while a package is loaded.
pub struct ArrayContext {
    workspace: PathBuf,
    package_unit: Option<i32>,
    external_units: HashMap<i32, PathBuf>,
    open_units: HashMap<i32, LineReader<BufReader<File>>>,
}

impl ArrayContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            package_unit: None,
            external_units: HashMap::new(),
            open_units: HashMap::new(),
        }
    }

    pub fn with_package_unit(mut self, unit: i32) -> Self {
        self.package_unit = Some(unit);
        self
    }

    pub fn with_external_unit(mut self, unit: i32, path: impl Into<PathBuf>) -> Self {
        self.external_units.insert(unit, path.into());
        self
    }

    pub fn set_package_unit(&mut self, unit: Option<i32>) {
        self.package_unit = unit;
    }

    pub fn package_unit(&self) -> Option<i32> {
        self.package_unit
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace.join(candidate)
        }
    }

    fn external_reader(&mut self, unit: i32) -> Result<&mut LineReader<BufReader<File>>> {
        if !self.open_units.contains_key(&unit) {
            let path = self
                .external_units
                .get(&unit)
                .ok_or(CoreError::UnknownUnit(unit))?;
            let resolved = self.resolve(&path.to_string_lossy());
            let file = File::open(resolved)?;
            self.open_units
                .insert(unit, LineReader::new(BufReader::new(file)));
        }
        self.open_units
            .get_mut(&unit)
            .ok_or(CoreError::UnknownUnit(unit))
    }
}

/// Row-major `nrow × ncol` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array2d<T> {
    nrow: usize,
    ncol: usize,
    values: Vec<T>,
}

impl<T: ArrayValue> Array2d<T> {
    pub fn constant(nrow: usize, ncol: usize, value: T) -> Self {
        Self {
            nrow,
            ncol,
            values: vec![value; nrow * ncol],
        }
    }

    pub fn from_vec(nrow: usize, ncol: usize, values: Vec<T>, name: &str) -> Result<Self> {
        if values.len() != nrow * ncol {
            return Err(CoreError::DimensionMismatch {
                name: name.to_string(),
                expected: nrow * ncol,
                actual: values.len(),
            });
        }
        Ok(Self { nrow, ncol, values })
    }

    /// A single-row array, used for vectors such as `DELR`.
    pub fn row_vector(values: Vec<T>) -> Self {
        Self {
            nrow: 1,
            ncol: values.len(),
            values,
        }
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.nrow || col >= self.ncol {
            return None;
        }
        self.values.get(row * self.ncol + col).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.nrow || col >= self.ncol {
            return Err(CoreError::CellOutOfRange(format!(
                "({}, {}) outside {}x{} array",
                row, col, self.nrow, self.ncol
            )));
        }
        self.values[row * self.ncol + col] = value;
        Ok(())
    }

    pub fn is_constant(&self) -> bool {
        match self.values.first() {
            Some(first) => self.values.iter().all(|v| v == first),
            None => true,
        }
    }

    /// Read a control record and the values it refers to.
    pub fn load<R: BufRead>(
        reader: &mut LineReader<R>,
        nrow: usize,
        ncol: usize,
        name: &str,
        ctx: &mut ArrayContext,
    ) -> Result<Self> {
        let line = reader.expect_data_line(name)?;
        let control = ArrayControl::parse(&line, ctx.package_unit())?;
        let count = nrow * ncol;
        tracing::trace!(array = name, ?control, "array control record");

        let values: Vec<T> = match &control {
            ArrayControl::Constant(value) => {
                let token = fortran_general(*value);
                let parsed = T::from_field(&token)
                    .or_else(|| T::from_field(&format!("{}", value.round() as i64)))
                    .ok_or_else(|| CoreError::invalid_field(name, token))?;
                vec![parsed; count]
            }
            ArrayControl::Internal { .. } => reader.read_values(count, name)?,
            ArrayControl::External { unit, .. } => {
                let unit = *unit;
                if Some(unit) == ctx.package_unit() {
                    reader.read_values(count, name)?
                } else {
                    ctx.external_reader(unit)?.read_values(count, name)?
                }
            }
            ArrayControl::OpenClose { path, .. } => {
                let file = File::open(ctx.resolve(path))?;
                let mut external = LineReader::new(BufReader::new(file));
                external.read_values(count, name)?
            }
        };

        let mult = control.multiplier();
        let values = if mult != 1.0 {
            values.into_iter().map(|v| v.scaled(mult)).collect()
        } else {
            values
        };

        Self::from_vec(nrow, ncol, values, name)
    }

    /// Free-format text for this array, control record included.
    pub fn to_file_entry(&self, name: &str) -> String {
        let mut out = String::new();
        if self.is_constant() {
            let value = self.values.first().copied().unwrap_or_default();
            out.push_str(&format!("CONSTANT {:>15}  #{}\n", value.to_text(), name));
            return out;
        }

        out.push_str(&format!("INTERNAL 1.0 (FREE) -1  #{}\n", name));
        for row in self.values.chunks(self.ncol.max(1)) {
            crate::format::wrap_values(row.iter().map(|v| v.to_text()), VALUES_PER_LINE, &mut out);
        }
        out
    }
}

/// A stack of equally shaped 2-D arrays, one per layer or interbed system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array3d<T> {
    layers: Vec<Array2d<T>>,
}

impl<T: ArrayValue> Array3d<T> {
    pub fn constant(nlay: usize, nrow: usize, ncol: usize, value: T) -> Self {
        Self {
            layers: (0..nlay).map(|_| Array2d::constant(nrow, ncol, value)).collect(),
        }
    }

    pub fn from_layers(layers: Vec<Array2d<T>>, name: &str) -> Result<Self> {
        if let Some(first) = layers.first() {
            let (nrow, ncol) = (first.nrow(), first.ncol());
            for layer in &layers {
                if layer.nrow() != nrow || layer.ncol() != ncol {
                    return Err(CoreError::DimensionMismatch {
                        name: name.to_string(),
                        expected: nrow * ncol,
                        actual: layer.len(),
                    });
                }
            }
        }
        Ok(Self { layers })
    }

    pub fn nlay(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, k: usize) -> Option<&Array2d<T>> {
        self.layers.get(k)
    }

    pub fn layers(&self) -> &[Array2d<T>] {
        &self.layers
    }

    /// Load `nlay` arrays in sequence.
    pub fn load<R: BufRead>(
        reader: &mut LineReader<R>,
        nlay: usize,
        nrow: usize,
        ncol: usize,
        name: &str,
        ctx: &mut ArrayContext,
    ) -> Result<Self> {
        let mut layers = Vec::with_capacity(nlay);
        for k in 0..nlay {
            let label = format!("{} layer {}", name, k + 1);
            layers.push(Array2d::load(reader, nrow, ncol, &label, ctx)?);
        }
        Ok(Self { layers })
    }
}
