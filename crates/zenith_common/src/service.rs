//! Diagnostics service
//!
//! The single use case: validate telemetry, format the prompt, ask the
//! reasoning service, hydrate the reply. A strict linear pipeline with no
//! retries, no caching and no partial results. Any failure aborts the run
//! with exactly one [`ZenithError`].

use serde_json::Value;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::{ZenithConfig, API_KEY_ENV};
use crate::error::{Result, ZenithError};
use crate::llm_client::{GeminiClient, ReasoningClient};
use crate::model::{DiagnosticResponse, TelemetryInput};

pub struct DiagnosticsService<C: ReasoningClient = GeminiClient> {
    client: C,
}

impl DiagnosticsService<GeminiClient> {
    /// Build from the process environment (and optional config file).
    pub fn from_env() -> Result<Self> {
        let config = ZenithConfig::from_env()?;
        Self::from_config(&config)
    }

    /// Build from an explicit configuration.
    ///
    /// A blank key is a `Configuration` error and the HTTP client is never
    /// constructed.
    pub fn from_config(config: &ZenithConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            error!(
                "Failed to initialise DiagnosticsService: {} is not set",
                API_KEY_ENV
            );
            return Err(ZenithError::Configuration(format!(
                "{} environment variable is not set.",
                API_KEY_ENV
            )));
        }

        let client = GeminiClient::new(config)?;
        Ok(Self { client })
    }
}

impl<C: ReasoningClient> DiagnosticsService<C> {
    /// Use a specific client, e.g. a scripted one in tests
    pub fn with_client(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run the diagnostic sequence for one submission.
    ///
    /// Errors:
    /// - `Validation` if required telemetry is missing (no call is made)
    /// - `ExternalService` if the reasoning service fails or answers empty
    /// - `DataParsing` if the answer is not JSON or not a JSON object
    pub fn run_diagnostics(&self, telemetry: &TelemetryInput) -> Result<DiagnosticResponse> {
        let span = info_span!("diagnose", req_id = %Uuid::new_v4());
        let _guard = span.enter();

        validate_telemetry(telemetry)?;

        let prompt = telemetry.format_prompt();
        let raw = self.client.fetch_diagnosis(&prompt).map_err(|e| {
            error!("{} during diagnosis: {}", e.kind(), e);
            e
        })?;

        let response = hydrate(raw)?;
        info!(
            "Diagnosis complete: {} bottleneck, severity {}, {} tweak(s)",
            response.diagnosis.bottleneck_type,
            response.diagnosis.severity,
            response.tweaks.len()
        );
        Ok(response)
    }
}

/// Names of required fields that are blank or unselected
pub fn missing_fields(input: &TelemetryInput) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if input.cpu.trim().is_empty() {
        missing.push("cpu");
    }
    if input.gpu.trim().is_empty() {
        missing.push("gpu");
    }
    if input.application.trim().is_empty() {
        missing.push("application");
    }
    if input.os_name.is_none() {
        missing.push("os_name");
    }
    if input.storage.is_none() {
        missing.push("storage");
    }
    missing
}

/// `cpu`, `gpu` and `application` must be non-blank; `os_name` and
/// `storage` must be selected. `ram` and `symptoms` are never checked.
pub fn validate_telemetry(input: &TelemetryInput) -> Result<()> {
    let missing = missing_fields(input);
    if missing.is_empty() {
        return Ok(());
    }

    warn!("Telemetry validation failed, missing: {}", missing.join(", "));
    Err(ZenithError::Validation(format!(
        "Missing arguments. Please fill in all required telemetry fields ({}).",
        missing.join(", ")
    )))
}

/// Turn the raw reply into a response. Only a JSON object can be hydrated.
pub fn hydrate(raw: Value) -> Result<DiagnosticResponse> {
    if let Value::Object(map) = &raw {
        return Ok(DiagnosticResponse::from_map(map));
    }

    let shape = json_shape(&raw);
    error!("Failed to hydrate domain models: payload is {}", shape);
    Err(ZenithError::DataParsing(format!(
        "Failed to hydrate domain models from payload: expected a JSON object, got {}",
        shape
    )))
}

fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
