//! Error types for Lumen.

use thiserror::Error;

use crate::theme::LintReport;

/// Core error type for all Lumen operations.
///
/// The theme-generation variants map onto distinct HTTP statuses and
/// user-facing messages at the API boundary: `Validation`,
/// `ProviderDisabled`, `ParseContract`, `SecurityRejection`, and
/// `EmptyTheme` are 400s; everything else is a 500.
#[derive(Error, Debug)]
pub enum LumenError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Provider '{0}' is not configured — missing API key or settings")]
    ProviderDisabled(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Model reply did not match the theme contract: {0}")]
    ParseContract(String),

    #[error("Rejected potentially dangerous CSS: {0}")]
    SecurityRejection(String),

    #[error("No valid theme properties survived validation")]
    EmptyTheme { report: LintReport },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LumenError>;
