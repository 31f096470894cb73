use thiserror::Error;

use crate::domain::DatasetKind;

/// Failure of a live fetch.
///
/// These never reach callers of the pipeline: the source adapter absorbs them
/// and switches the dataset to synthetic rows. They are kept as values so the
/// degraded status can be shown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("warehouse unreachable: {0}")]
    Connectivity(String),
    #[error("warehouse rejected credentials: {0}")]
    Authentication(String),
    #[error("warehouse request timed out after {0}s")]
    Timeout(u64),
    #[error("unexpected warehouse response: {0}")]
    MalformedResponse(String),
    #[error("warehouse returned no {0} rows")]
    EmptyResultSet(DatasetKind),
}

/// CLI-level error with an exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
