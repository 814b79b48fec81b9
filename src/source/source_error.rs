use std::error::Error;
use std::fmt;

/// Classified failures from the Flashfood API boundary.
///
/// Nothing here is fatal: the scheduler logs the error, skips the locality
/// for this cycle and tries again on the next tick.
#[derive(Debug)]
pub enum SourceError {
    /// Network/connect failure. Retryable next cycle; never retried
    /// within a cycle.
    Unavailable(String),
    /// The API answered with a non-2xx status.
    Rejected(u16),
    /// The body was not decodable as the expected JSON shape.
    Malformed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "Source unavailable: {msg}"),
            SourceError::Rejected(status) => write!(f, "Source returned status {status}"),
            SourceError::Malformed(msg) => write!(f, "Malformed source payload: {msg}"),
        }
    }
}

impl Error for SourceError {}
