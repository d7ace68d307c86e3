pub mod compare;
pub mod error;
pub mod headfile;
pub mod hob_output;

pub use compare::{compare_head_files, compare_heads, CompareOptions, HeadComparison, RecordComparison};
pub use error::{OutputError, Result};
pub use headfile::{HeadFile, HeadFileWriter, HeadRecord, Precision, Selector};
pub use hob_output::{HobOutput, HobOutputRow};
