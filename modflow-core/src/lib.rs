pub mod array;
pub mod errors;
pub mod format;
pub mod grid;
pub mod namefile;
pub mod tokens;
pub mod units;

pub use array::{Array2d, Array3d, ArrayContext, ArrayControl, ArrayValue};
pub use errors::{CoreError, Result};
pub use grid::{CellIndex, GridShape};
pub use namefile::{NameFile, NameFileEntry};
pub use tokens::{parse_field, parse_optional, split_free, LineReader};
pub use units::{FileRole, UnitEntry, UnitRegistry};
