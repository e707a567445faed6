pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The ways in which talking to the remote spreadsheet can fail. Callers can tell "there is no
/// data yet" (an `Ok` with nothing in it) apart from "the spreadsheet could not be used".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The credentials were missing, expired beyond refresh, or rejected by Google.
    #[error("Not authorized to use the spreadsheet: {0}")]
    Unauthorized(String),

    /// The request did not make it to the spreadsheet, or the service failed to answer.
    #[error("Unable to reach the spreadsheet: {0}")]
    Unreachable(String),

    /// The spreadsheet answered, but what it holds (or the range we asked for) cannot be used.
    #[error("The spreadsheet data is malformed: {0}")]
    Malformed(String),
}

impl SyncError {
    /// Wraps an `anyhow` error chain, keeping every context message.
    pub(crate) fn unauthorized(e: &Error) -> Self {
        SyncError::Unauthorized(format!("{e:#}"))
    }
}
