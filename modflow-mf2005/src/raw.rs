//! Packages without a typed reader, carried as text.

use crate::dis::Dis;
use crate::error::Result;
use crate::package::PackageData;
use modflow_core::split_free;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPackage {
    ftype: String,
    pub unit: i32,
    extension: String,
    pub text: String,
}

impl RawPackage {
    pub fn new(ftype: &str, unit: i32, text: impl Into<String>) -> Self {
        let ftype = ftype.to_ascii_uppercase();
        Self {
            extension: ftype.to_ascii_lowercase(),
            ftype,
            unit,
            text: text.into(),
        }
    }

    pub fn read(path: &Path, ftype: &str, unit: i32) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut package = Self::new(ftype, unit, text);
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            package.extension = ext.to_string();
        }
        Ok(package)
    }

    /// Files the text reads through `OPEN/CLOSE` array controls.
    pub fn external_files(&self) -> Vec<String> {
        self.keyword_arguments("OPEN/CLOSE").collect()
    }

    /// Units the text reads through `EXTERNAL` array controls.
    pub fn external_units(&self) -> Vec<i32> {
        self.keyword_arguments("EXTERNAL")
            .filter_map(|unit| unit.parse().ok())
            .collect()
    }

    fn keyword_arguments<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = String> + 'a {
        self.text.lines().filter_map(move |line| {
            let mut tokens = split_free(line).into_iter();
            match tokens.next() {
                Some(first) if first.eq_ignore_ascii_case(keyword) => tokens.next(),
                _ => None,
            }
        })
    }
}

impl PackageData for RawPackage {
    fn ftype(&self) -> &str {
        &self.ftype
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn to_text(&self, _dis: Option<&Dis>) -> Result<String> {
        Ok(self.text.clone())
    }
}
