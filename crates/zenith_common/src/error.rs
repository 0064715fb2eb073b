//! Error types for Zenith.
//!
//! Every failure in the diagnostic pipeline ends in exactly one of four kinds.
//! Each kind marks the stage where the fault first became detectable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZenithError {
    /// Required configuration (the API key) is missing or unusable.
    #[error("{0}")]
    Configuration(String),

    /// Caller-supplied telemetry is incomplete.
    #[error("{0}")]
    Validation(String),

    /// The reasoning service failed, timed out or answered with nothing.
    #[error("{0}")]
    ExternalService(String),

    /// The reasoning service answered with something we could not read.
    #[error("{0}")]
    DataParsing(String),
}

/// Discriminant of [`ZenithError`], used where only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZenithErrorKind {
    Configuration,
    Validation,
    ExternalService,
    DataParsing,
}

impl ZenithErrorKind {
    pub const ALL: [ZenithErrorKind; 4] = [
        Self::Configuration,
        Self::Validation,
        Self::ExternalService,
        Self::DataParsing,
    ];

    /// Stable name shown at the boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Validation => "ValidationError",
            Self::ExternalService => "ExternalServiceError",
            Self::DataParsing => "DataParsingError",
        }
    }

    /// Configuration and validation failures ask the user to fix something.
    /// The other two are operational and worth a manual retry.
    pub fn is_corrective(&self) -> bool {
        matches!(self, Self::Configuration | Self::Validation)
    }
}

impl std::fmt::Display for ZenithErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ZenithError {
    pub fn kind(&self) -> ZenithErrorKind {
        match self {
            ZenithError::Configuration(_) => ZenithErrorKind::Configuration,
            ZenithError::Validation(_) => ZenithErrorKind::Validation,
            ZenithError::ExternalService(_) => ZenithErrorKind::ExternalService,
            ZenithError::DataParsing(_) => ZenithErrorKind::DataParsing,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ZenithError::Configuration(m)
            | ZenithError::Validation(m)
            | ZenithError::ExternalService(m)
            | ZenithError::DataParsing(m) => m,
        }
    }

    pub fn is_corrective(&self) -> bool {
        self.kind().is_corrective()
    }
}

pub type Result<T> = std::result::Result<T, ZenithError>;
