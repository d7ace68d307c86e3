use modflow_core::CoreError;
use modflow_output::OutputError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("{package}: {message}")]
    Package { package: String, message: String },

    #[error("observation {obsname}: layer proportions sum to {sum}, expected 1.0")]
    InvalidLayerWeights { obsname: String, sum: f64 },

    #[error("observation {obsname}: layer {layer} is outside a {nlay}-layer grid")]
    LayerOutOfRange {
        obsname: String,
        layer: usize,
        nlay: usize,
    },

    #[error("observation {obsname}: layer {layer} proportion {proportion} is not a finite non-negative number")]
    InvalidLayerProportion {
        obsname: String,
        layer: usize,
        proportion: f64,
    },

    #[error("observation {obsname}: layer {layer} is weighted twice")]
    DuplicateLayer { obsname: String, layer: usize },

    #[error("stress period {kper} is beyond NPER {nper}")]
    PeriodOutOfRange { kper: usize, nper: usize },

    #[error("model has no DIS package")]
    MissingDis,

    #[error("package {0} is not part of the model")]
    PackageNotFound(String),

    #[error("failed to load {ftype} from {fname}: {source}")]
    Load {
        ftype: String,
        fname: String,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn package(package: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Package {
            package: package.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
