use thiserror::Error;

/// Why no video could be located. Always recoverable: callers treat it as
/// "no video" and leave their state untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocateError {
    #[error("No video found for '{0}'")]
    NoResults(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("YouTube API key is not configured")]
    MissingApiKey,
}

impl From<reqwest::Error> for LocateError {
    fn from(err: reqwest::Error) -> Self {
        LocateError::Transport(err.to_string())
    }
}
