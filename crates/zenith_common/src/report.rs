//! Boundary error pair
//!
//! What a front end receives when a diagnosis fails: a kind name and a
//! human-readable message. The four domain kinds map one to one. Anything
//! else becomes the catch-all `UNHANDLED_SYSTEM_FAULT`.

use serde::{Deserialize, Serialize};

use crate::error::ZenithError;

pub const UNHANDLED_FAULT_CODE: &str = "UNHANDLED_SYSTEM_FAULT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Kind name, e.g. `ValidationError`
    pub code: String,
    pub message: String,
    /// True when the user has to fix input or setup before retrying
    pub corrective: bool,
}

impl ErrorReport {
    /// Catch-all for faults outside the domain taxonomy
    pub fn unhandled(fault: impl std::fmt::Display) -> Self {
        Self {
            code: UNHANDLED_FAULT_CODE.to_string(),
            message: format!("A critical unhandled error occurred: {}", fault),
            corrective: false,
        }
    }

    pub fn is_unhandled(&self) -> bool {
        self.code == UNHANDLED_FAULT_CODE
    }
}

impl From<&ZenithError> for ErrorReport {
    fn from(err: &ZenithError) -> Self {
        Self {
            code: err.kind().as_str().to_string(),
            message: err.message().to_string(),
            corrective: err.is_corrective(),
        }
    }
}

impl From<ZenithError> for ErrorReport {
    fn from(err: ZenithError) -> Self {
        Self::from(&err)
    }
}
