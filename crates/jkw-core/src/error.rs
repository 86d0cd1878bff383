use thiserror::Error;

/// Failures surfaced by the tree and project-list operations.
///
/// A cancelled fetch is not an error: it resolves to an empty listing. A move or
/// delete whose target is absent is a no-op, never an error.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("job source unavailable: {0}")]
    RemoteUnavailable(String),
    /// The in-memory copy is not rolled back; reload before retrying.
    #[error("failed to persist tracked projects: {0}")]
    PersistenceFailure(String),
    /// A local browser could not be launched. The job source was not involved.
    #[error("failed to open browser: {0}")]
    BrowserLaunch(String),
}

impl TreeError {
    pub(crate) fn remote(report: &color_eyre::eyre::Report) -> Self {
        Self::RemoteUnavailable(format!("{report:#}"))
    }

    pub(crate) fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceFailure(message.into())
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
