use std::path::PathBuf;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("listings request failed with status {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("listings request could not be completed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("listings response is not valid JSON: {0}")]
    InvalidBody(#[source] reqwest::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("batch is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("cannot parse {field} `{value}` ({context}): {source}")]
    TimestampParse {
        field: &'static str,
        value: String,
        context: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("cannot parse snapshot file {} at line {line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read snapshot file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write snapshot file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of one ingestion run. Nothing is written to the store when the
/// run fails before the store stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
