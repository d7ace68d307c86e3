//! GRIDDATA arrays.
//!
//! An array starts with a header record naming it, optionally `LAYERED`,
//! followed by one control record (per layer when layered):
//!
//! * `CONSTANT <value>`
//! * `INTERNAL [FACTOR f] [IPRN n]`, values on the following records
//! * `OPEN/CLOSE <path> [FACTOR f] [(BINARY)] [IPRN n]`

use crate::error::{Error, Result};
use modflow_core::tokens::expand_repeats;
use modflow_core::{parse_field, split_free, ArrayValue, CoreError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const VALUES_PER_RECORD: usize = 10;

/// Sequential access to the records of a block.
#[derive(Debug)]
pub struct RecordCursor<'a> {
    records: &'a [Vec<String>],
    position: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(records: &'a [Vec<String>]) -> Self {
        Self { records, position: 0 }
    }

    pub fn next_record(&mut self) -> Option<&'a [String]> {
        let record = self.records.get(self.position)?;
        self.position += 1;
        Some(record.as_slice())
    }
}

/// Number of layers and cells per layer an array covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayShape {
    pub nlay: usize,
    pub ncpl: usize,
}

impl ArrayShape {
    pub fn new(nlay: usize, ncpl: usize) -> Self {
        Self { nlay, ncpl }
    }

    /// A single unlayered vector of `len` values.
    pub fn flat(len: usize) -> Self {
        Self { nlay: 1, ncpl: len }
    }

    pub fn len(&self) -> usize {
        self.nlay * self.ncpl
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridArray<T> {
    values: Vec<T>,
    ncpl: usize,
    layered: bool,
}

impl<T: ArrayValue> GridArray<T> {
    pub fn constant(shape: ArrayShape, value: T) -> Self {
        Self {
            values: vec![value; shape.len()],
            ncpl: shape.ncpl,
            layered: false,
        }
    }

    pub fn from_vec(shape: ArrayShape, values: Vec<T>, name: &str) -> Result<Self> {
        if values.len() != shape.len() {
            return Err(CoreError::DimensionMismatch {
                name: name.to_string(),
                expected: shape.len(),
                actual: values.len(),
            }
            .into());
        }
        Ok(Self {
            values,
            ncpl: shape.ncpl,
            layered: false,
        })
    }

    /// Write one control record per layer.
    pub fn with_layered(mut self, layered: bool) -> Self {
        self.layered = layered;
        self
    }

    pub fn is_layered(&self) -> bool {
        self.layered
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.values.get(index).copied()
    }

    pub fn layer(&self, k: usize) -> Option<&[T]> {
        let start = k.checked_mul(self.ncpl)?;
        self.values.get(start..start + self.ncpl)
    }

    /// Read the array whose header record (`NAME [LAYERED]`) was just
    /// taken from `cursor`.
    pub fn read(header: &[String], cursor: &mut RecordCursor<'_>, shape: ArrayShape, workspace: &Path) -> Result<Self> {
        let name = header
            .first()
            .map(|n| n.to_ascii_lowercase())
            .unwrap_or_default();
        let layered = header.iter().skip(1).any(|t| t.eq_ignore_ascii_case("LAYERED"));
        let (count, controls) = if layered {
            (shape.ncpl, shape.nlay)
        } else {
            (shape.len(), 1)
        };

        let mut values = Vec::with_capacity(shape.len());
        for _ in 0..controls {
            values.extend(read_control::<T>(&name, cursor, count, workspace)?);
        }
        Ok(Self {
            values,
            ncpl: shape.ncpl,
            layered,
        })
    }

    /// Header, control and value records, constant where possible.
    pub fn to_records(&self, name: &str) -> Vec<Vec<String>> {
        let mut header = vec![name.to_ascii_lowercase()];
        if self.layered {
            header.push("LAYERED".to_string());
        }
        let mut records = vec![header];

        let size = if self.layered { self.ncpl.max(1) } else { self.values.len().max(1) };
        for chunk in self.values.chunks(size) {
            match chunk.split_first() {
                Some((first, rest)) if rest.iter().all(|v| v == first) => {
                    records.push(vec!["CONSTANT".to_string(), first.to_text()]);
                }
                _ => {
                    records.push(vec!["INTERNAL".to_string()]);
                    for row in chunk.chunks(VALUES_PER_RECORD) {
                        records.push(row.iter().map(|v| v.to_text()).collect());
                    }
                }
            }
        }
        records
    }
}

fn keyword_value<'a>(control: &'a [String], keyword: &str) -> Option<&'a String> {
    let index = control.iter().position(|t| t.eq_ignore_ascii_case(keyword))?;
    control.get(index + 1)
}

fn read_control<T: ArrayValue>(
    name: &str,
    cursor: &mut RecordCursor<'_>,
    count: usize,
    workspace: &Path,
) -> Result<Vec<T>> {
    let control = cursor
        .next_record()
        .ok_or_else(|| Error::package(name, "missing array control record"))?;
    let factor: f64 = match keyword_value(control, "FACTOR") {
        Some(token) => parse_field(token, "FACTOR")?,
        None => 1.0,
    };

    let keyword = control.first().map(|k| k.to_ascii_uppercase()).unwrap_or_default();
    let values = match keyword.as_str() {
        "CONSTANT" => {
            let token = control
                .get(1)
                .ok_or_else(|| Error::package(name, "CONSTANT without a value"))?;
            let value: T = parse_field(token, name)?;
            return Ok(vec![value; count]);
        }
        "INTERNAL" => {
            let mut values = Vec::with_capacity(count);
            while values.len() < count {
                let record = cursor.next_record().ok_or_else(|| {
                    Error::package(name, format!("expected {} values, found {}", count, values.len()))
                })?;
                push_values(&mut values, record.iter().map(String::as_str), name)?;
            }
            values
        }
        "OPEN/CLOSE" => {
            let path = control
                .get(1)
                .ok_or_else(|| Error::package(name, "OPEN/CLOSE without a file name"))?;
            if control.iter().any(|t| t.eq_ignore_ascii_case("(BINARY)")) {
                return Err(Error::package(name, format!("binary array file {} is not supported", path)));
            }
            let text = fs::read_to_string(workspace.join(path))?;
            let mut values = Vec::with_capacity(count);
            for line in text.lines() {
                push_values(&mut values, split_free(line).iter().map(String::as_str), name)?;
            }
            values
        }
        other => {
            return Err(Error::package(name, format!("unknown array control {}", other)));
        }
    };

    if values.len() != count {
        return Err(CoreError::DimensionMismatch {
            name: name.to_string(),
            expected: count,
            actual: values.len(),
        }
        .into());
    }
    Ok(if factor == 1.0 {
        values
    } else {
        values.into_iter().map(|v| v.scaled(factor)).collect()
    })
}

fn push_values<'a, T: ArrayValue>(values: &mut Vec<T>, tokens: impl Iterator<Item = &'a str>, name: &str) -> Result<()> {
    for token in tokens {
        for expanded in expand_repeats(token)? {
            values.push(parse_field(&expanded, name)?);
        }
    }
    Ok(())
}
