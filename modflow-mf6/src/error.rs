use modflow_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing {0} block")]
    MissingBlock(String),

    #[error("{block} block: missing {keyword}")]
    MissingKeyword { block: String, keyword: String },

    #[error("{package}: {message}")]
    Package { package: String, message: String },

    #[error("{model}: unknown package type {ftype}")]
    UnknownPackage { model: String, ftype: String },

    #[error("model {0} is not part of the simulation")]
    UnknownModel(String),

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn package(package: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Package {
            package: package.into(),
            message: message.into(),
        }
    }

    pub fn missing_keyword(block: &str, keyword: &str) -> Self {
        Error::MissingKeyword {
            block: block.to_string(),
            keyword: keyword.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_names_line() {
        let err = Error::syntax(12, "END without BEGIN");
        assert_eq!(err.to_string(), "line 12: END without BEGIN");
    }

    #[test]
    fn load_error_names_file() {
        let err = Error::Load {
            path: PathBuf::from("sim/model.disv"),
            source: Box::new(Error::MissingBlock("DIMENSIONS".to_string())),
        };
        assert_eq!(err.to_string(), "failed to load sim/model.disv: missing DIMENSIONS block");
    }

    #[test]
    fn missing_keyword_display() {
        let err = Error::missing_keyword("DIMENSIONS", "NCPL");
        assert_eq!(err.to_string(), "DIMENSIONS block: missing NCPL");
    }
}
