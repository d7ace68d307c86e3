#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid value for {field}: {value:?}")]
    InvalidField { field: String, value: String },

    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(String),

    #[error("invalid array control record: {0}")]
    InvalidControlRecord(String),

    #[error("{name}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("unit {unit} is already assigned to {existing}")]
    UnitConflict { unit: i32, existing: String },

    #[error("unit {0} is not registered")]
    UnknownUnit(i32),

    #[error("cell index out of range: {0}")]
    CellOutOfRange(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        CoreError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, value: impl Into<String>) -> Self {
        CoreError::InvalidField {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
