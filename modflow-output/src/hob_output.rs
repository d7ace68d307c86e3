//! The text table the head-observation package writes to `IUHOBSV`.
//!
//! ```text
//!  "SIMULATED EQUIVALENT"   "OBSERVED VALUE"    "OBSERVATION NAME"
//!    1.0197185       1.0000000       HOB1.1
//! ```

use crate::error::{OutputError, Result};
use modflow_core::parse_field;
use modflow_core::tokens::split_free;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HobOutputRow {
    pub simulated: f64,
    pub observed: f64,
    pub name: String,
}

impl HobOutputRow {
    /// Observed minus simulated.
    pub fn residual(&self) -> f64 {
        self.observed - self.simulated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HobOutput {
    pub rows: Vec<HobOutputRow>,
}

impl HobOutput {
    pub fn parse(content: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (index, line) in content.lines().enumerate().skip(1) {
            let tokens = split_free(line);
            if tokens.is_empty() {
                continue;
            }
            if tokens.len() < 3 {
                return Err(OutputError::Parse {
                    line: index + 1,
                    message: format!("expected SIMULATED OBSERVED NAME, got {:?}", line.trim()),
                });
            }
            rows.push(HobOutputRow {
                simulated: parse_field(&tokens[0], "simulated equivalent")?,
                observed: parse_field(&tokens[1], "observed value")?,
                name: tokens[2].clone(),
            });
        }
        Ok(Self { rows })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn get(&self, name: &str) -> Option<&HobOutputRow> {
        self.rows.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn residuals(&self) -> Vec<(&str, f64)> {
        self.rows.iter().map(|r| (r.name.as_str(), r.residual())).collect()
    }

    /// Root mean square residual; `None` for an empty table.
    pub fn rmse(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        let sum: f64 = self.rows.iter().map(|r| r.residual().powi(2)).sum();
        Some((sum / self.rows.len() as f64).sqrt())
    }

    pub fn max_abs_residual(&self) -> Option<&HobOutputRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.residual().abs().total_cmp(&b.residual().abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const TABLE: &str = "\
 \"SIMULATED EQUIVALENT\"   \"OBSERVED VALUE\"    \"OBSERVATION NAME\"
   1.0197185       1.0000000       HOB1.1
   2.5000000       3.0000000       HOB1.2

";

    #[test]
    fn parses_rows_after_header() {
        let output = HobOutput::parse(TABLE).unwrap();
        assert_eq!(output.rows.len(), 2);
        assert_eq!(output.rows[1].name, "HOB1.2");
        assert_abs_diff_eq!(output.rows[0].simulated, 1.0197185);
    }

    #[test]
    fn residual_is_observed_minus_simulated() {
        let output = HobOutput::parse(TABLE).unwrap();
        let residuals = output.residuals();
        assert_eq!(residuals[1].0, "HOB1.2");
        assert_abs_diff_eq!(residuals[1].1, 0.5);
        assert_eq!(output.max_abs_residual().unwrap().name, "HOB1.2");
    }

    #[test]
    fn rmse_of_empty_table() {
        let output = HobOutput::parse("header only\n").unwrap();
        assert!(output.rmse().is_none());
    }

    #[test]
    fn short_row_is_error() {
        let err = HobOutput::parse("header\n1.0 2.0\n").unwrap_err();
        assert!(matches!(err, OutputError::Parse { line: 2, .. }));
    }
}
