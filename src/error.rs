use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum GeneScoutError {
    /// Empty, non-DNA, or too-short input rejected before any work is done.
    InvalidInput(String),
    /// A provider could not be set up (missing credentials, database, tool).
    ProviderUnavailable(String),
    /// A network round trip or external command failed.
    Network(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
    Http(reqwest::Error),
}

impl Error for GeneScoutError {}

impl fmt::Display for GeneScoutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GeneScoutError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            GeneScoutError::ProviderUnavailable(msg) => write!(f, "Provider unavailable: {msg}"),
            GeneScoutError::Network(msg) => write!(f, "Network error: {msg}"),
            GeneScoutError::Io(e) => write!(f, "IO error: {e}"),
            GeneScoutError::Serde(e) => write!(f, "JSON error: {e}"),
            GeneScoutError::Http(e) => write!(f, "HTTP error: {e}"),
        }
    }
}

impl From<std::io::Error> for GeneScoutError {
    fn from(err: std::io::Error) -> Self {
        GeneScoutError::Io(err)
    }
}

impl From<serde_json::Error> for GeneScoutError {
    fn from(err: serde_json::Error) -> Self {
        GeneScoutError::Serde(err)
    }
}

impl From<reqwest::Error> for GeneScoutError {
    fn from(err: reqwest::Error) -> Self {
        GeneScoutError::Http(err)
    }
}
