//! Geometric multigrid solver input.

use crate::dis::Dis;
use crate::error::{Error, Result};
use crate::package::{OutputFile, PackageData};
use modflow_core::format::fortran_general;
use modflow_core::tokens::{parse_field, parse_optional, require_fields};
use modflow_core::LineReader;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

pub const DEFAULT_UNIT: i32 = 27;

/// Outer-iteration damping, selected by `IADAMP`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Damping {
    /// `IADAMP = 0`: constant factor.
    Fixed,
    /// `IADAMP = 1`: Cooley's adaptive damping.
    Adaptive,
    /// `IADAMP = 2`: relative-reduction damping bounded by `dup`/`dlow`
    /// with a head-change limit.
    Bounded { dup: f64, dlow: f64, chglimit: f64 },
}

impl Damping {
    pub fn iadamp(&self) -> i32 {
        match self {
            Damping::Fixed => 0,
            Damping::Adaptive => 1,
            Damping::Bounded { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gmg {
    pub unit: i32,
    pub mxiter: i32,
    pub iiter: i32,
    pub hclose: f64,
    pub rclose: f64,
    pub damp: f64,
    pub damping: Damping,
    pub ioutgmg: i32,
    /// Unit of the head-change summary; written only when positive.
    pub iunitmhc: i32,
    /// Smoother: 0 ILU(0), 1 symmetric Gauss-Seidel.
    pub ism: i32,
    /// Semi-coarsening option; 4 enables `relax`.
    pub isc: i32,
    pub relax: f64,
}

impl Default for Gmg {
    fn default() -> Self {
        Self {
            unit: DEFAULT_UNIT,
            mxiter: 50,
            iiter: 30,
            hclose: 1e-5,
            rclose: 1e-5,
            damp: 1.0,
            damping: Damping::Fixed,
            ioutgmg: 0,
            iunitmhc: 0,
            ism: 0,
            isc: 0,
            relax: 1.0,
        }
    }
}

impl Gmg {
    pub fn load<R: BufRead>(reader: &mut LineReader<R>, unit: i32) -> Result<Self> {
        let tokens = reader.expect_record("GMG dataset 1")?;
        require_fields(&tokens, 4, "GMG dataset 1", reader.line_number())?;
        let rclose = parse_field(&tokens[0], "RCLOSE")?;
        let iiter = parse_field(&tokens[1], "IITER")?;
        let hclose = parse_field(&tokens[2], "HCLOSE")?;
        let mxiter = parse_field(&tokens[3], "MXITER")?;

        let tokens = reader.expect_record("GMG dataset 2")?;
        require_fields(&tokens, 3, "GMG dataset 2", reader.line_number())?;
        let damp = parse_field(&tokens[0], "DAMP")?;
        let iadamp: i32 = parse_field(&tokens[1], "IADAMP")?;
        let ioutgmg = parse_field(&tokens[2], "IOUTGMG")?;
        let iunitmhc = parse_optional(&tokens, 3, "IUNITMHC", 0)?;

        let tokens = reader.expect_record("GMG dataset 3")?;
        require_fields(&tokens, 2, "GMG dataset 3", reader.line_number())?;
        let ism = parse_field(&tokens[0], "ISM")?;
        let isc: i32 = parse_field(&tokens[1], "ISC")?;

        let damping = match iadamp {
            0 => Damping::Fixed,
            1 => Damping::Adaptive,
            2 => {
                let tokens = reader.expect_record("GMG dataset 4")?;
                require_fields(&tokens, 3, "GMG dataset 4", reader.line_number())?;
                Damping::Bounded {
                    dup: parse_field(&tokens[0], "DUP")?,
                    dlow: parse_field(&tokens[1], "DLOW")?,
                    chglimit: parse_field(&tokens[2], "CHGLIMIT")?,
                }
            }
            other => {
                return Err(Error::package("GMG", format!("IADAMP must be 0, 1 or 2, found {}", other)));
            }
        };

        let relax = if isc == 4 {
            let tokens = reader.expect_record("GMG dataset 5")?;
            require_fields(&tokens, 1, "GMG dataset 5", reader.line_number())?;
            parse_field(&tokens[0], "RELAX")?
        } else {
            1.0
        };

        Ok(Self {
            unit,
            mxiter,
            iiter,
            hclose,
            rclose,
            damp,
            damping,
            ioutgmg,
            iunitmhc,
            ism,
            isc,
            relax,
        })
    }
}

impl PackageData for Gmg {
    fn ftype(&self) -> &str {
        "GMG"
    }

    fn unit(&self) -> i32 {
        self.unit
    }

    fn set_unit(&mut self, unit: i32) {
        self.unit = unit;
    }

    fn extension(&self) -> &str {
        "gmg"
    }

    fn output_files(&self) -> Vec<OutputFile> {
        if self.iunitmhc > 0 {
            vec![OutputFile::text(self.iunitmhc, "gmg.summary")]
        } else {
            Vec::new()
        }
    }

    fn to_text(&self, _dis: Option<&Dis>) -> Result<String> {
        let mut out = String::new();
        out.push_str(&self.heading());
        out.push('\n');
        out.push_str(&format!(
            "{} {} {} {}\n",
            fortran_general(self.rclose),
            self.iiter,
            fortran_general(self.hclose),
            self.mxiter
        ));
        out.push_str(&format!(
            "{} {} {}",
            fortran_general(self.damp),
            self.damping.iadamp(),
            self.ioutgmg
        ));
        if self.iunitmhc > 0 {
            out.push_str(&format!(" {}", self.iunitmhc));
        }
        out.push('\n');
        out.push_str(&format!("{} {}\n", self.ism, self.isc));
        if let Damping::Bounded { dup, dlow, chglimit } = self.damping {
            out.push_str(&format!(
                "{} {} {}\n",
                fortran_general(dup),
                fortran_general(dlow),
                fortran_general(chglimit)
            ));
        }
        if self.isc == 4 {
            out.push_str(&format!("{}\n", fortran_general(self.relax)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(text: &str) -> Result<Gmg> {
        let mut reader = LineReader::new(Cursor::new(text.as_bytes().to_vec()));
        Gmg::load(&mut reader, DEFAULT_UNIT)
    }

    #[test]
    fn default_has_no_optional_datasets() {
        let text = Gmg::default().to_text(None).unwrap();
        let lines: Vec<&str> = text.lines().skip(1).collect();
        assert_eq!(lines, ["1.0E-05 30 1.0E-05 50", "1.0 0 0", "0 0"]);
    }

    #[test]
    fn bounded_damping_and_relax_round_trip() {
        let gmg = Gmg {
            damping: Damping::Bounded {
                dup: 0.75,
                dlow: 0.01,
                chglimit: 1.0,
            },
            isc: 4,
            relax: 0.8,
            iunitmhc: 1000,
            ..Gmg::default()
        };
        let text = gmg.to_text(None).unwrap();
        assert_eq!(load(&text).unwrap(), gmg);
        assert_eq!(gmg.output_files(), vec![OutputFile::text(1000, "gmg.summary")]);
    }

    #[test]
    fn optional_unit_defaults_to_zero() {
        let gmg = load("1e-4 20 1e-4 30\n0.9 1 0\n1 0\n").unwrap();
        assert_eq!(gmg.damping, Damping::Adaptive);
        assert_eq!(gmg.iunitmhc, 0);
        assert!(gmg.output_files().is_empty());
    }

    #[test]
    fn bad_iadamp_is_error() {
        assert!(load("1e-4 20 1e-4 30\n0.9 5 0\n1 0\n").is_err());
    }
}
