use serde::Serialize;
use thiserror::Error;

use crate::page::ExtractionError;
use crate::spotify::CatalogError;
use crate::youtube::LocateError;

/// Crate-wide error surfaced to the extension.
///
/// Component errors convert into this at their boundary; nothing here is
/// fatal to the process.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    AuthScope(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::AuthScope { .. } => AppError::AuthScope(e.to_string()),
            CatalogError::NotFound(msg) => AppError::NotFound(msg),
            CatalogError::Transport(msg) | CatalogError::Parse(msg) => AppError::Transport(msg),
        }
    }
}

impl From<LocateError> for AppError {
    fn from(e: LocateError) -> Self {
        match e {
            LocateError::NoResults(query) => AppError::NotFound(format!("No video for '{}'", query)),
            LocateError::MissingApiKey => AppError::Config(e.to_string()),
            LocateError::Transport(msg) => AppError::Transport(msg),
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        AppError::Extraction(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization error: {}", e))
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::Internal(e)
    }
}
