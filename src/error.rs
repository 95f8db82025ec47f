use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the config file. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure reported by an evaluator while running a statement
#[derive(Debug, Error)]
pub enum EvalError {
    /// The statement raised; carries the formatted traceback
    #[error("{traceback}")]
    Raised { traceback: String },

    /// The statement asked the interpreter to exit with this status
    #[error("exit requested with status {0}")]
    Exit(i32),
}

impl EvalError {
    pub fn raised(traceback: impl Into<String>) -> Self {
        EvalError::Raised {
            traceback: traceback.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LineEditingUnavailable {
    #[error("stdin is not a terminal")]
    NotATerminal,
}
