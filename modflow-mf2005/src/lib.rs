//! MODFLOW-2005 model input: read a model from its name file, edit it,
//! write it back.
//!
//! Packages with a typed representation are parsed into Rust structures;
//! every other package is carried as raw text so a model always
//! round-trips. Output files are bound to packages through the unit
//! table, so removing a package also drops the files it would write.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`model`] | [`Model`] container: load, add/remove packages, write |
//! | [`dis`] | Grid and stress-period discretization, time conversions |
//! | [`hob`] | Head observations, including multilayer weights |
//! | [`flwob`] | Flow observations at constant-head, drain, GHB and river cells |
//! | [`swt`] | SUB-WT subsidence |
//! | [`gmg`] | Geometric multigrid solver |
//! | [`raw`] | Pass-through for everything else |
//!
//! # Quick Start
//!
//! ```ignore
//! use modflow_mf2005::{LoadOptions, Model};
//!
//! let mut model = Model::load("tc1-true.nam", &LoadOptions::default())?;
//! model.remove_package("HOB")?;
//! model.change_workspace("out");
//! model.write_input()?;
//! ```
//!
//! # Features
//!
//! - **`cli`** enables the `mfdeck` binary.

pub mod config;
pub mod dis;
pub mod error;
pub mod flwob;
pub mod gmg;
pub mod hob;
pub mod model;
pub mod package;
pub mod raw;
pub mod swt;

pub use config::LoadOptions;
pub use dis::{Dis, StressPeriod};
pub use error::{Error, Result};
pub use flwob::{FlowCell, FlowGroup, FlowKind, FlowTime, Flwob};
pub use gmg::{Damping, Gmg};
pub use hob::{HeadObservation, Hob, LayerWeights, ObservationTime};
pub use model::{LoadFailure, Model};
pub use package::{OutputFile, Package, PackageData, PackageKind};
pub use raw::RawPackage;
pub use swt::{Compressibility, Preconsolidation, Swt, SwtOutputControl, SwtPrintFlags};
