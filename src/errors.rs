// errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request to {url} failed with status: {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response contained no usable entries")]
    NoData,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// How a fetch cycle failed, as far as the display cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Could not get a usable response at all.
    Network,
    /// Got a response but could not decode it.
    Parse,
}

impl FetchError {
    /// A well-formed response that simply had nothing in it.
    pub fn is_no_data(&self) -> bool {
        matches!(self, FetchError::NoData)
    }

    /// `None` for `NoData`, which is not a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            FetchError::NoData => None,
            FetchError::Parse(_) => Some(FailureKind::Parse),
            FetchError::Transport(_) | FetchError::Status { .. } | FetchError::Client(_) => {
                Some(FailureKind::Network)
            }
        }
    }
}
