//! Shared library for Zenith.
//!
//! Packages hardware telemetry into a prompt, asks a reasoning service for a
//! bottleneck diagnosis and turns the JSON reply into typed records.

pub mod config;
pub mod error;
pub mod llm_client;
pub mod model;
pub mod prompt;
pub mod report;
pub mod service;

pub use config::{ZenithConfig, APP_VERSION, GEMINI_MODEL};
pub use error::{ZenithError, ZenithErrorKind};
pub use llm_client::{FakeReasoningClient, GeminiClient, ReasoningClient};
pub use model::{
    Compatibility, CompatibilityBand, DiagnosticResponse, Diagnosis, DoNotDo, OperatingSystem,
    SafetyLevel, SeverityBand, StorageClass, TelemetryInput, Tweak,
};
pub use report::ErrorReport;
pub use service::DiagnosticsService;
