//! Legacy MODFLOW name files (`.nam`).
//!
//! Each record binds a file type and unit number to a file name:
//!
//! ```text
//! # Name file for hob_simple
//! LIST          2  hob_simple.list
//! DIS          11  hob_simple.dis
//! HOB          39  hob_simple.hob
//! DATA         51  hob_simple.hob.out
//! DATA(BINARY) 53  hob_simple.cbc  REPLACE
//! ```

use crate::errors::{CoreError, Result};
use crate::tokens::{parse_field, split_free};
use crate::units::{FileRole, UnitRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameFileEntry {
    pub ftype: String,
    pub unit: i32,
    pub fname: String,
    pub status: Option<String>,
}

impl NameFileEntry {
    pub fn new(ftype: &str, unit: i32, fname: &str) -> Self {
        Self {
            ftype: ftype.to_uppercase(),
            unit,
            fname: fname.to_string(),
            status: None,
        }
    }

    pub fn is_data(&self) -> bool {
        self.ftype == "DATA" || self.ftype == "DATA(BINARY)"
    }

    pub fn is_binary(&self) -> bool {
        self.ftype == "DATA(BINARY)"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameFile {
    pub comments: Vec<String>,
    entries: Vec<NameFileEntry>,
}

impl NameFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut namefile = NameFile::new();

        for (index, line) in content.lines().enumerate() {
            let line_number = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                namefile.comments.push(comment.trim().to_string());
                continue;
            }

            let tokens = split_free(trimmed);
            if tokens.len() < 3 {
                return Err(CoreError::parse(
                    line_number,
                    format!("name file record needs FTYPE UNIT FNAME: {:?}", trimmed),
                ));
            }
            let unit: i32 = parse_field(&tokens[1], "unit number")?;
            let entry = NameFileEntry {
                ftype: tokens[0].to_uppercase(),
                unit,
                fname: tokens[2].clone(),
                status: tokens.get(3).map(|s| s.to_uppercase()),
            };
            namefile.push(entry).map_err(|e| match e {
                CoreError::UnitConflict { .. } => CoreError::parse(
                    line_number,
                    format!("unit {} appears more than once", unit),
                ),
                other => other,
            })?;
        }

        Ok(namefile)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn push(&mut self, entry: NameFileEntry) -> Result<()> {
        if let Some(existing) = self.entries.iter().find(|e| e.unit == entry.unit) {
            return Err(CoreError::UnitConflict {
                unit: entry.unit,
                existing: existing.fname.clone(),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[NameFileEntry] {
        &self.entries
    }

    /// Unit → entry, the "external unit dictionary" used while loading.
    pub fn by_unit(&self) -> HashMap<i32, &NameFileEntry> {
        self.entries.iter().map(|e| (e.unit, e)).collect()
    }

    pub fn by_ftype(&self, ftype: &str) -> Option<&NameFileEntry> {
        self.entries
            .iter()
            .find(|e| e.ftype.eq_ignore_ascii_case(ftype))
    }

    pub fn list_entry(&self) -> Option<&NameFileEntry> {
        self.by_ftype("LIST")
    }

    /// Build a name file from a unit registry, LIST record first.
    pub fn from_registry(list_unit: i32, list_name: &str, units: &UnitRegistry) -> Self {
        let mut namefile = NameFile::new();
        namefile.comments.push(format!("Name file for {}", units.model_name()));
        namefile
            .entries
            .push(NameFileEntry::new("LIST", list_unit, list_name));
        for entry in units.entries() {
            if entry.unit == list_unit {
                continue;
            }
            let mut record = NameFileEntry::new(&entry.name_file_type(), entry.unit, &entry.fname);
            if entry.role == FileRole::Output {
                record.status = Some("REPLACE".to_string());
            }
            namefile.entries.push(record);
        }
        namefile
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for comment in &self.comments {
            out.push_str(&format!("# {}\n", comment));
        }
        for entry in &self.entries {
            out.push_str(&format!("{:<14} {:>5}  {}", entry.ftype, entry.unit, entry.fname));
            if let Some(status) = &entry.status {
                out.push_str(&format!("  {}", status));
            }
            out.push('\n');
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }
}
