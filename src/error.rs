//! Error types for gbcds.

use thiserror::Error;

/// Errors raised while retrieving or processing one genome record.
///
/// Coordinate and bounds errors are fatal for the record being processed;
/// the batch driver logs them and continues with the next accession.
#[derive(Error, Debug)]
pub enum CdsError {
    /// A location fragment could not be turned into valid range(s)
    #[error("Malformed coordinate fragment '{fragment}': {reason}")]
    MalformedCoordinate { fragment: String, reason: String },

    /// A range falls outside `1..=length`
    #[error("Range {start}..{end} is outside the genome bounds 1..{length}")]
    RangeOutOfBounds { start: u64, end: u64, length: u64 },

    /// Genes were reached, or the stream ended, before the genome length
    #[error("Genome length was not established before {0}")]
    MissingLength(&'static str),

    /// The genome length text is not a positive integer
    #[error("Invalid genome length '{0}'")]
    InvalidLength(String),

    /// The upstream repository returned no data for an accession
    #[error("Empty result for accession {0}")]
    EmptyUpstreamResult(String),

    /// The upstream response did not carry the fields we need
    #[error("Unexpected upstream response: {0}")]
    UpstreamProtocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CdsError {
    /// Shorthand for a malformed coordinate error.
    pub fn malformed(fragment: &str, reason: impl Into<String>) -> Self {
        CdsError::MalformedCoordinate {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error only means the accession had nothing to process.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, CdsError::EmptyUpstreamResult(_))
    }
}

pub type Result<T> = std::result::Result<T, CdsError>;
