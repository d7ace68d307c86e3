//! MODFLOW 6 input: keyword block files, the package catalog, name files
//! and discretization packages.
//!
//! Every MODFLOW 6 file is parsed into a [`BlockFile`]. Name files, time
//! and grid discretization get typed structures on top; all other packages
//! stay as blocks so a simulation always writes back what it read.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`blocks`] | `BEGIN`/`END` block parsing and writing |
//! | [`catalog`] | Package types per model kind |
//! | [`array`] | GRIDDATA arrays (`CONSTANT`, `INTERNAL`, `OPEN/CLOSE`) |
//! | [`namefile`] | `mfsim.nam` and model name files |
//! | [`tdis`] | Stress periods |
//! | [`dis`], [`disv`], [`disu`] | Structured, vertex and unstructured grids |
//! | [`simulation`] | Load and write a whole simulation directory |
//!
//! # Quick Start
//!
//! ```ignore
//! use modflow_mf6::Simulation;
//!
//! let sim = Simulation::load("ex-gwf-disv")?;
//! let gwf = sim.model("gwf").unwrap();
//! println!("{} cells", gwf.discretization().and_then(|d| d.nodes()).unwrap_or(0));
//! sim.write("out")?;
//! ```

pub mod array;
pub mod blocks;
pub mod catalog;
pub mod dis;
pub mod disu;
pub mod disv;
pub mod error;
pub mod namefile;
pub mod simulation;
pub mod tdis;

pub use array::{ArrayShape, GridArray, RecordCursor};
pub use blocks::{Block, BlockFile};
pub use catalog::{ModelKind, PackageType};
pub use dis::{Dis, GridOptions};
pub use disu::Disu;
pub use disv::{Cell2d, Disv, Vertex};
pub use error::{Error, Result};
pub use namefile::{
    ExchangeRecord, ModelNameFile, ModelRecord, PackageRecord, SimulationNameFile, SolutionGroup, SolutionRecord,
};
pub use simulation::{ExternalFile, Model, ModelPackage, PackageContent, Simulation, SimulationFile, SIMULATION_NAME_FILE};
pub use tdis::{PeriodData, Tdis};
