//! Package types a MODFLOW 6 simulation accepts.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Simulation-level files listed in `mfsim.nam`.
    Simulation,
    /// Utility files attached to other packages (time series, observations).
    Utility,
    /// Groundwater flow.
    Gwf,
    /// Groundwater transport.
    Gwt,
}

impl ModelKind {
    /// Parse a model type as written in the MODELS block, e.g. `gwf6`.
    pub fn from_mtype(mtype: &str) -> Option<Self> {
        match mtype.to_ascii_uppercase().as_str() {
            "GWF6" | "GWF" => Some(ModelKind::Gwf),
            "GWT6" | "GWT" => Some(ModelKind::Gwt),
            _ => None,
        }
    }

    pub fn mtype(self) -> &'static str {
        match self {
            ModelKind::Simulation => "SIM6",
            ModelKind::Utility => "UTL6",
            ModelKind::Gwf => "GWF6",
            ModelKind::Gwt => "GWT6",
        }
    }

    fn packages(self) -> &'static [&'static str] {
        match self {
            ModelKind::Simulation => SIMULATION,
            ModelKind::Utility => UTILITY,
            ModelKind::Gwf => GWF,
            ModelKind::Gwt => GWT,
        }
    }
}

const SIMULATION: &[&str] = &["NAM", "TDIS", "GWF-GWF", "IMS", "MVR", "GNC", "GWF-GWT"];

const UTILITY: &[&str] = &[
    "OBS", "TS", "TAS", "ATS", "LAKTAB", "SFRTAB", "SPC", "SPCA", "TVK", "TVS",
];

const GWF: &[&str] = &[
    "NAM", "DIS", "DISV", "DISU", "IC", "NPF", "STO", "HFB", "CHD", "WEL", "DRN", "RIV", "GHB", "RCH", "RCHA",
    "EVT", "EVTA", "MAW", "SFR", "LAK", "UZF", "MVR", "GNC", "OC", "API", "BUY", "CSUB",
];

const GWT: &[&str] = &[
    "NAM", "ADV", "API", "CNC", "DIS", "DISU", "DISV", "DSP", "FMI", "IC", "IST", "LKT", "MST", "MVT", "MWT",
    "OC", "SFT", "SRC", "SSM", "UZT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PackageType {
    model: ModelKind,
    name: &'static str,
}

impl PackageType {
    /// Look up a file type from a name file, e.g. `DIS6` in a GWF model
    /// or `GWF6-GWF6` in `mfsim.nam`. Utility types are accepted
    /// everywhere.
    pub fn from_ftype(model: ModelKind, ftype: &str) -> Option<Self> {
        let name = normalize(ftype);
        [model, ModelKind::Utility].into_iter().find_map(|kind| {
            kind.packages()
                .iter()
                .find(|p| **p == name)
                .map(|p| PackageType { model: kind, name: *p })
        })
    }

    /// Every package type, grouped by model kind.
    pub fn all() -> impl Iterator<Item = PackageType> {
        [ModelKind::Simulation, ModelKind::Utility, ModelKind::Gwf, ModelKind::Gwt]
            .into_iter()
            .flat_map(|kind| {
                kind.packages()
                    .iter()
                    .map(move |p| PackageType { model: kind, name: *p })
            })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model
    }

    /// File type as written in name files: `DIS6`, `GWF6-GWF6`.
    pub fn ftype(&self) -> String {
        self.name
            .split('-')
            .map(|part| format!("{}6", part))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// `dis`, `gwfgwf`, …
    pub fn default_extension(&self) -> String {
        self.name.replace('-', "").to_ascii_lowercase()
    }
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ftype())
    }
}

fn normalize(ftype: &str) -> String {
    ftype
        .to_ascii_uppercase()
        .split('-')
        .map(|part| part.strip_suffix('6').unwrap_or(part))
        .collect::<Vec<_>>()
        .join("-")
}
