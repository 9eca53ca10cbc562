use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the extraction/normalization core.
///
/// Not-found conditions are deliberately absent: a function that cannot be
/// located or a module that does not resolve locally is an `Option::None`,
/// never an error. Errors here are the cases where the input is unusable or
/// an external collaborator failed.
#[derive(Debug, Error)]
pub enum Error {
    /// The source text is not syntactically valid Python. Terminal for the
    /// file in question; callers report it and stop, they do not retry.
    #[error("failed to parse {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// A module or namespace name was empty or contained whitespace.
    #[error("invalid module name: {0:?}")]
    InvalidName(String),

    /// An import could not be placed in any of local/pip/system. The
    /// classifier falls back to `system`, so reaching this means a broken
    /// invariant, and it propagates rather than being swallowed.
    #[error("no classification applies to import: {0}")]
    Classification(String),

    /// The analysis endpoint or the package index could not be reached, or
    /// answered with a non-success status. Reported to the user, aborted,
    /// never retried.
    #[error("analysis service error: {0}")]
    Service(String),

    /// Filesystem failure while reading a source file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a `Parse` error from the parser's own message.
    pub fn parse(file: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.to_string(),
        }
    }
}

/// Result alias used throughout the library modules.
pub type Result<T> = std::result::Result<T, Error>;
