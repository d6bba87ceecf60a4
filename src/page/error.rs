use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("No active tab")]
    NoActiveTab,

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Probe returned no result")]
    NoResult,
}
