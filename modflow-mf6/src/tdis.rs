//! Time discretization (`TDIS6`).

use crate::blocks::{Block, BlockFile};
use crate::error::{Error, Result};
use modflow_core::format::fortran_general;
use modflow_core::parse_field;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodData {
    pub perlen: f64,
    pub nstp: u32,
    pub tsmult: f64,
}

impl Default for PeriodData {
    fn default() -> Self {
        Self {
            perlen: 1.0,
            nstp: 1,
            tsmult: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tdis {
    pub time_units: Option<String>,
    pub start_date_time: Option<String>,
    pub periods: Vec<PeriodData>,
}

impl Default for Tdis {
    /// One steady period of unit length.
    fn default() -> Self {
        Self {
            time_units: None,
            start_date_time: None,
            periods: vec![PeriodData::default()],
        }
    }
}

impl Tdis {
    pub fn nper(&self) -> usize {
        self.periods.len()
    }

    /// Simulated time at the end of the last period.
    pub fn total_time(&self) -> f64 {
        self.periods.iter().map(|p| p.perlen).sum()
    }

    pub fn from_block_file(file: &BlockFile) -> Result<Self> {
        let (time_units, start_date_time) = match file.block("OPTIONS") {
            Some(options) => (
                options.value("TIME_UNITS").map(str::to_string),
                options.value("START_DATE_TIME").map(str::to_string),
            ),
            None => (None, None),
        };
        let nper: usize = file.require_block("DIMENSIONS")?.require("NPER")?;

        let rows = &file.require_block("PERIODDATA")?.records;
        if rows.len() != nper {
            return Err(Error::package(
                "TDIS",
                format!("NPER is {} but PERIODDATA has {} rows", nper, rows.len()),
            ));
        }
        let periods = rows
            .iter()
            .map(|row| {
                let [perlen, nstp, tsmult, ..] = row.as_slice() else {
                    return Err(Error::package("TDIS", format!("incomplete PERIODDATA row {:?}", row)));
                };
                Ok(PeriodData {
                    perlen: parse_field(perlen, "PERLEN")?,
                    nstp: parse_field(nstp, "NSTP")?,
                    tsmult: parse_field(tsmult, "TSMULT")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time_units,
            start_date_time,
            periods,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Self::from_block_file(&BlockFile::parse(text)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_block_file(&BlockFile::read(path)?).map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn to_block_file(&self) -> BlockFile {
        let mut file = BlockFile::new();
        let mut options = Block::new("OPTIONS");
        if let Some(units) = &self.time_units {
            options.push_value("TIME_UNITS", units);
        }
        if let Some(start) = &self.start_date_time {
            options.push_value("START_DATE_TIME", start);
        }
        file.push(options);

        let mut dimensions = Block::new("DIMENSIONS");
        dimensions.push_value("NPER", self.nper());
        file.push(dimensions);

        let mut perioddata = Block::new("PERIODDATA");
        for period in &self.periods {
            perioddata.push_record([
                fortran_general(period.perlen),
                period.nstp.to_string(),
                fortran_general(period.tsmult),
            ]);
        }
        file.push(perioddata);
        file
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_block_file().write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TDIS: &str = "\
BEGIN options
  TIME_UNITS days
  START_DATE_TIME 2024-01-01T00:00:00
END options
BEGIN dimensions
  NPER 2
END dimensions
BEGIN perioddata
  1.0 1 1.0
  365.25 12 1.2
END perioddata
";

    #[test]
    fn reads_periods() {
        let tdis = Tdis::parse(TDIS).unwrap();
        assert_eq!(tdis.time_units.as_deref(), Some("days"));
        assert_eq!(tdis.start_date_time.as_deref(), Some("2024-01-01T00:00:00"));
        assert_eq!(tdis.nper(), 2);
        assert_eq!(tdis.periods[1].nstp, 12);
        assert_relative_eq!(tdis.total_time(), 366.25);
    }

    #[test]
    fn nper_must_match_rows() {
        let err = Tdis::parse(&TDIS.replace("NPER 2", "NPER 3")).unwrap_err();
        assert!(err.to_string().contains("NPER is 3 but PERIODDATA has 2 rows"));
    }

    #[test]
    fn default_is_single_unit_period() {
        let tdis = Tdis::default();
        assert_eq!(tdis.periods, vec![PeriodData { perlen: 1.0, nstp: 1, tsmult: 1.0 }]);
        assert_eq!(Tdis::parse(&tdis.to_block_file().to_text()).unwrap(), tdis);
    }

    #[test]
    fn written_text_reads_back() {
        let tdis = Tdis::parse(TDIS).unwrap();
        assert_eq!(Tdis::parse(&tdis.to_block_file().to_text()).unwrap(), tdis);
    }
}
