//! Unit-number bookkeeping.
//!
//! Legacy MODFLOW cross-references every file through a Fortran unit
//! number: the name file binds unit → file name, packages refer to output
//! files by unit (`IUHOBSV`, `IPAKCB`, …). [`UnitRegistry`] keeps that
//! table consistent: one file per unit, with default file names derived
//! from the model name.

use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileRole {
    Input,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub ftype: String,
    pub unit: i32,
    pub fname: String,
    pub role: FileRole,
    pub binary: bool,
    /// Package that owns an output file, e.g. `HOB` for `IUHOBSV`.
    pub package: Option<String>,
    /// Whether `fname` was derived from the model name.
    pub defaulted: bool,
}

impl UnitEntry {
    /// Name-file type of the entry (`DATA`, `DATA(BINARY)` for outputs).
    pub fn name_file_type(&self) -> String {
        match self.role {
            FileRole::Input => self.ftype.clone(),
            FileRole::Output if self.binary => "DATA(BINARY)".to_string(),
            FileRole::Output => "DATA".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRegistry {
    model_name: String,
    entries: Vec<UnitEntry>,
}

impl UnitRegistry {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            entries: Vec::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Rename the model; file names that were derived from the old model
    /// name follow.
    pub fn set_model_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        for entry in self.entries.iter_mut().filter(|e| e.defaulted) {
            let prefix = format!("{}.", self.model_name);
            if let Some(rest) = entry.fname.strip_prefix(&prefix) {
                let renamed = format!("{}.{}", name, rest);
                entry.fname = renamed;
            }
        }
        self.model_name = name;
    }

    /// Register a package input file.
    pub fn add_input(&mut self, ftype: &str, unit: i32, fname: Option<&str>, extension: &str) -> Result<&UnitEntry> {
        let (fname, defaulted) = self.resolve_name(fname, extension);
        self.insert(UnitEntry {
            ftype: ftype.to_uppercase(),
            unit,
            fname,
            role: FileRole::Input,
            binary: false,
            package: None,
            defaulted,
        })
    }

    /// Register an output file written by the simulator.
    pub fn add_output(
        &mut self,
        unit: i32,
        fname: Option<&str>,
        extension: &str,
        binary: bool,
        package: Option<&str>,
    ) -> Result<&UnitEntry> {
        let (fname, defaulted) = self.resolve_name(fname, extension);
        self.insert(UnitEntry {
            ftype: if binary { "DATA(BINARY)" } else { "DATA" }.to_string(),
            unit,
            fname,
            role: FileRole::Output,
            binary,
            package: package.map(str::to_uppercase),
            defaulted,
        })
    }

    fn resolve_name(&self, fname: Option<&str>, extension: &str) -> (String, bool) {
        match fname {
            Some(name) => (name.to_string(), false),
            None => (format!("{}.{}", self.model_name, extension), true),
        }
    }

    fn insert(&mut self, entry: UnitEntry) -> Result<&UnitEntry> {
        if let Some(index) = self.entries.iter().position(|e| e.unit == entry.unit) {
            let existing = &self.entries[index];
            if existing.fname != entry.fname || existing.role != entry.role {
                return Err(CoreError::UnitConflict {
                    unit: entry.unit,
                    existing: existing.fname.clone(),
                });
            }
            return Ok(&self.entries[index]);
        }
        tracing::trace!(unit = entry.unit, fname = %entry.fname, "registering unit");
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn get(&self, unit: i32) -> Option<&UnitEntry> {
        self.entries.iter().find(|e| e.unit == unit)
    }

    /// File name bound to an output unit.
    pub fn output_name(&self, unit: i32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.unit == unit && e.role == FileRole::Output)
            .map(|e| e.fname.as_str())
    }

    pub fn input_by_ftype(&self, ftype: &str) -> Option<&UnitEntry> {
        self.entries
            .iter()
            .find(|e| e.role == FileRole::Input && e.ftype.eq_ignore_ascii_case(ftype))
    }

    pub fn remove(&mut self, unit: i32) -> Option<UnitEntry> {
        let index = self.entries.iter().position(|e| e.unit == unit)?;
        Some(self.entries.remove(index))
    }

    pub fn remove_output(&mut self, unit: i32) -> Option<UnitEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.unit == unit && e.role == FileRole::Output)?;
        Some(self.entries.remove(index))
    }

    /// Mark an already registered output as written by `package`.
    /// Returns false when `unit` is not an output.
    pub fn claim_output(&mut self, unit: i32, package: &str) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.unit == unit && e.role == FileRole::Output)
        {
            Some(entry) => {
                entry.package = Some(package.to_uppercase());
                true
            }
            None => false,
        }
    }

    /// Drop every output file registered by a package.
    pub fn remove_package_outputs(&mut self, package: &str) {
        self.entries.retain(|e| {
            !(e.role == FileRole::Output
                && e.package
                    .as_deref()
                    .is_some_and(|p| p.eq_ignore_ascii_case(package)))
        });
    }

    pub fn is_used(&self, unit: i32) -> bool {
        self.entries.iter().any(|e| e.unit == unit)
    }

    /// Lowest unused unit number at or above `from`.
    pub fn next_unused(&self, from: i32) -> i32 {
        let mut unit = from.max(1);
        while self.is_used(unit) {
            unit += 1;
        }
        unit
    }

    /// Inputs in registration order, then outputs in registration order.
    pub fn entries(&self) -> Vec<&UnitEntry> {
        let inputs = self.entries.iter().filter(|e| e.role == FileRole::Input);
        let outputs = self.entries.iter().filter(|e| e.role == FileRole::Output);
        inputs.chain(outputs).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_name_uses_model_name() {
        let mut units = UnitRegistry::new("hob_simple");
        units.add_output(51, None, "hob.out", false, Some("hob")).unwrap();
        assert_eq!(units.output_name(51), Some("hob_simple.hob.out"));
    }

    #[test]
    fn explicit_output_name_kept() {
        let mut units = UnitRegistry::new("hob_simple");
        units
            .add_output(51, Some("hob_simple_custom_fname.hob.out"), "hob.out", false, None)
            .unwrap();
        assert_eq!(units.output_name(51), Some("hob_simple_custom_fname.hob.out"));
    }

    #[test]
    fn conflicting_unit_rejected() {
        let mut units = UnitRegistry::new("m");
        units.add_input("DIS", 11, None, "dis").unwrap();
        let err = units.add_output(11, None, "cbc", true, None).unwrap_err();
        assert!(matches!(err, CoreError::UnitConflict { unit: 11, .. }));
    }

    #[test]
    fn re_registering_same_file_is_idempotent() {
        let mut units = UnitRegistry::new("m");
        units.add_output(53, None, "cbc", true, None).unwrap();
        units.add_output(53, None, "cbc", true, Some("swt")).unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn next_unused_skips_taken_units() {
        let mut units = UnitRegistry::new("m");
        units.add_input("DIS", 11, None, "dis").unwrap();
        units.add_input("BAS6", 12, None, "bas").unwrap();
        assert_eq!(units.next_unused(11), 13);
        assert_eq!(units.next_unused(20), 20);
    }

    #[test]
    fn entries_list_inputs_before_outputs() {
        let mut units = UnitRegistry::new("m");
        units.add_output(51, None, "hob.out", false, None).unwrap();
        units.add_input("HOB", 39, None, "hob").unwrap();
        let order: Vec<i32> = units.entries().iter().map(|e| e.unit).collect();
        assert_eq!(order, vec![39, 51]);
    }

    #[test]
    fn renaming_model_renames_defaulted_files() {
        let mut units = UnitRegistry::new("old");
        units.add_input("DIS", 11, None, "dis").unwrap();
        units.add_input("BAS6", 12, Some("custom.bas"), "bas").unwrap();
        units.set_model_name("new");
        assert_eq!(units.get(11).unwrap().fname, "new.dis");
        assert_eq!(units.get(12).unwrap().fname, "custom.bas");
    }

    #[test]
    fn removing_package_outputs() {
        let mut units = UnitRegistry::new("m");
        units.add_output(2052, None, "swt_subsidence.hds", true, Some("SWT")).unwrap();
        units.add_output(51, None, "hob.out", false, Some("HOB")).unwrap();
        units.remove_package_outputs("swt");
        assert!(!units.is_used(2052));
        assert!(units.is_used(51));
    }

    #[test]
    fn claimed_output_removed_with_package() {
        let mut units = UnitRegistry::new("m");
        units.add_output(51, Some("tc1-true.hob.out"), "hob.out", false, None).unwrap();
        assert!(units.claim_output(51, "hob"));
        assert!(!units.claim_output(52, "hob"));
        units.remove_package_outputs("HOB");
        assert!(units.is_empty());
    }

    #[test]
    fn output_entries_report_data_type() {
        let mut units = UnitRegistry::new("m");
        let entry = units.add_output(53, None, "cbc", true, None).unwrap().clone();
        assert_eq!(entry.name_file_type(), "DATA(BINARY)");
    }
}
