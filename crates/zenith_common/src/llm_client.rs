//! Reasoning service client
//!
//! One outbound call per diagnosis: the formatted telemetry prompt goes out
//! with the fixed system instruction, and the reply text comes back parsed as
//! generic JSON. Turning that JSON into domain records is the model's job,
//! so "did the service answer" stays separate from "is the answer usable".
//!
//! Failure mapping:
//! - transport error, HTTP error, timeout, empty reply: `ExternalService`
//! - reply text that is not JSON: `DataParsing`

use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ZenithConfig;
use crate::error::{Result, ZenithError};
use crate::prompt::SYSTEM_PROMPT;

/// Anything that can answer a structured diagnostic prompt with JSON
pub trait ReasoningClient: Send + Sync {
    /// Send the Markdown prompt and return the reply parsed as JSON.
    ///
    /// Exactly one attempt, no retry.
    fn fetch_diagnosis(&self, structured_prompt: &str) -> Result<Value>;
}

impl<C: ReasoningClient + ?Sized> ReasoningClient for Arc<C> {
    fn fetch_diagnosis(&self, structured_prompt: &str) -> Result<Value> {
        (**self).fetch_diagnosis(structured_prompt)
    }
}

impl<C: ReasoningClient + ?Sized> ReasoningClient for Box<C> {
    fn fetch_diagnosis(&self, structured_prompt: &str) -> Result<Value> {
        (**self).fetch_diagnosis(structured_prompt)
    }
}

/// Validate and parse raw reply text.
///
/// Shared by every client so the empty/invalid handling cannot drift.
pub fn parse_reply(text: Option<&str>) -> Result<Value> {
    let text = match text {
        Some(t) if !t.is_empty() => t,
        _ => {
            error!("Gemini API returned an empty response.");
            return Err(ZenithError::ExternalService(
                "Gemini API returned an empty response.".to_string(),
            ));
        }
    };

    info!("Gemini API returned {} characters.", text.chars().count());

    serde_json::from_str(text).map_err(|e| {
        error!("Failed to parse Gemini response as JSON: {}", e);
        ZenithError::DataParsing(format!("Failed to parse Gemini response as JSON: {}", e))
    })
}

// ============================================================================
// Gemini REST client
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(text)
    }
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
    timeout_secs: u64,
    temperature: f32,
}

impl GeminiClient {
    /// Fails with `ExternalService` if the key is empty. Mapping missing
    /// configuration to `Configuration` is the service's responsibility.
    pub fn new(config: &ZenithConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ZenithError::ExternalService(
                "Gemini API key is required but was not provided.".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("zenith/{}", crate::config::APP_VERSION))
            .build()
            .map_err(|e| {
                ZenithError::ExternalService(format!("Failed to create HTTP client: {}", e))
            })?;

        info!("GeminiClient initialised (model={}).", config.model);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, structured_prompt: &str) -> Value {
        serde_json::json!({
            "systemInstruction": {
                "parts": [{"text": SYSTEM_PROMPT}],
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": structured_prompt}],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.temperature,
            },
        })
    }
}

impl ReasoningClient for GeminiClient {
    fn fetch_diagnosis(&self, structured_prompt: &str) -> Result<Value> {
        info!(
            "Sending diagnostic prompt to Gemini API (model={}, {} bytes).",
            self.model,
            structured_prompt.len()
        );

        let url = self.url();
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(structured_prompt))
            .send()
            .map_err(|e| {
                error!("Gemini API call failed: {}", e);
                if e.is_timeout() {
                    ZenithError::ExternalService(format!(
                        "Gemini API generation failed: request timed out after {} seconds",
                        self.timeout_secs
                    ))
                } else {
                    ZenithError::ExternalService(format!("Gemini API generation failed: {}", e))
                }
            })?;

        let status = response.status();
        debug!("Gemini API responded with HTTP {}", status);

        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            error!("Gemini API call failed: HTTP {}", status);
            return Err(ZenithError::ExternalService(format!(
                "Gemini API generation failed: HTTP {}{}",
                status,
                error_detail(&detail)
            )));
        }

        let envelope: GenerateContentResponse = response.json().map_err(|e| {
            error!("Gemini API returned an unreadable envelope: {}", e);
            ZenithError::ExternalService(format!(
                "Gemini API generation failed: unreadable response: {}",
                e
            ))
        })?;

        if let Some(reason) = envelope
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            warn!("Gemini API blocked the prompt: {}", reason);
        }
        if let Some(reason) = envelope
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            debug!("Gemini finish reason: {}", reason);
        }

        parse_reply(envelope.text().as_deref())
    }
}

/// Pull the `error.message` out of a Gemini error body, if there is one
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .map(|msg| format!(": {}", msg))
        .unwrap_or_default()
}

// ============================================================================
// Scripted client for tests
// ============================================================================

/// One scripted reply: raw text (or nothing), or a transport failure
pub type FakeReply = std::result::Result<Option<String>, ZenithError>;

/// Replays scripted replies through [`parse_reply`] and counts calls.
///
/// With a single reply left it is returned repeatedly; otherwise replies are
/// consumed in order.
pub struct FakeReasoningClient {
    replies: Mutex<Vec<FakeReply>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeReasoningClient {
    pub fn new(replies: Vec<FakeReply>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the given JSON
    pub fn always_valid(json: Value) -> Self {
        Self::new(vec![Ok(Some(json.to_string()))])
    }

    /// Always answers with the given raw text
    pub fn always_text(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(Some(text.into()))])
    }

    /// Always answers with no body at all
    pub fn always_empty() -> Self {
        Self::new(vec![Ok(None)])
    }

    /// Always fails at the transport level
    pub fn always_error(error: ZenithError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ReasoningClient for FakeReasoningClient {
    fn fetch_diagnosis(&self, structured_prompt: &str) -> Result<Value> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(structured_prompt.to_string());

        let reply = {
            let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
            match replies.len() {
                0 => Ok(None),
                1 => replies[0].clone(),
                _ => replies.remove(0),
            }
        };

        let text = reply?;
        parse_reply(text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZenithErrorKind;
    use serde_json::json;

    #[test]
    fn test_parse_reply_empty_is_external_service() {
        for text in [None, Some("")] {
            let err = parse_reply(text).unwrap_err();
            assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
            assert_eq!(err.message(), "Gemini API returned an empty response.");
        }
    }

    #[test]
    fn test_parse_reply_invalid_json_is_data_parsing() {
        let err = parse_reply(Some("Sure! Here is your diagnosis:")).unwrap_err();
        assert_eq!(err.kind(), ZenithErrorKind::DataParsing);
        assert!(err.message().starts_with("Failed to parse Gemini response as JSON:"));
    }

    #[test]
    fn test_parse_reply_returns_untyped_json() {
        let value = parse_reply(Some(r#"{"diagnosis": {"severity": "high"}}"#)).unwrap();
        assert_eq!(value["diagnosis"]["severity"], "high");

        let value = parse_reply(Some("[1, 2]")).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_gemini_client_requires_key() {
        let err = GeminiClient::new(&ZenithConfig::default()).err().unwrap();
        assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
        assert_eq!(err.message(), "Gemini API key is required but was not provided.");
    }

    #[test]
    fn test_gemini_request_shape() {
        let client = GeminiClient::new(&ZenithConfig::with_api_key("k")).unwrap();
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let body = client.request_body("## System Specs\n");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], SYSTEM_PROMPT);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "## System Specs\n");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_envelope_text_concatenates_parts() {
        let envelope: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": " 1}"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(envelope.text().as_deref(), Some("{\"a\": 1}"));

        let blocked: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(blocked.text().is_none());
        let err = parse_reply(blocked.text().as_deref()).unwrap_err();
        assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
    }

    #[test]
    fn test_error_detail_extraction() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_detail(body), ": API key not valid.");
        assert_eq!(error_detail("<html>502</html>"), "");
    }

    #[test]
    fn test_fake_client_sequence() {
        let client = FakeReasoningClient::new(vec![
            Ok(Some(json!({"n": 1}).to_string())),
            Err(ZenithError::ExternalService("connection reset".into())),
            Ok(Some("not json".into())),
        ]);

        assert_eq!(client.fetch_diagnosis("a").unwrap()["n"], 1);
        assert_eq!(
            client.fetch_diagnosis("b").unwrap_err().kind(),
            ZenithErrorKind::ExternalService
        );
        assert_eq!(
            client.fetch_diagnosis("c").unwrap_err().kind(),
            ZenithErrorKind::DataParsing
        );
        // last reply repeats
        assert_eq!(
            client.fetch_diagnosis("d").unwrap_err().kind(),
            ZenithErrorKind::DataParsing
        );
        assert_eq!(client.call_count(), 4);
        assert_eq!(client.prompts(), vec!["a", "b", "c", "d"]);
    }

    /// Serve one canned HTTP response on a local port.
    ///
    /// Returns the endpoint and a handle yielding the raw request text.
    fn serve_once(status: &str, body: &str) -> (String, std::thread::JoinHandle<String>) {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (endpoint, handle)
    }

    fn client_for(endpoint: &str) -> GeminiClient {
        let config = ZenithConfig {
            endpoint: endpoint.to_string(),
            timeout_secs: 5,
            ..ZenithConfig::with_api_key("test-key")
        };
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn test_gemini_unreachable_endpoint_is_external_service() {
        let err = client_for("http://127.0.0.1:1/v1beta")
            .fetch_diagnosis("## System Specs\n")
            .unwrap_err();
        assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
        assert!(err.message().starts_with("Gemini API generation failed:"));
    }

    #[test]
    fn test_gemini_http_error_carries_detail() {
        let (endpoint, server) = serve_once(
            "400 Bad Request",
            r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#,
        );
        let err = client_for(&endpoint).fetch_diagnosis("prompt").unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
        assert!(err.message().contains("400"));
        assert!(err.message().ends_with(": API key not valid."));
    }

    #[test]
    fn test_gemini_no_candidates_is_external_service() {
        let (endpoint, server) = serve_once("200 OK", r#"{"candidates": []}"#);
        let err = client_for(&endpoint).fetch_diagnosis("prompt").unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind(), ZenithErrorKind::ExternalService);
        assert_eq!(err.message(), "Gemini API returned an empty response.");
    }

    #[test]
    fn test_gemini_reply_round_trip() {
        let reply = json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"diagnosis\": {\"severity\": 7}}"}]},
                "finishReason": "STOP"
            }]
        });
        let (endpoint, server) = serve_once("200 OK", &reply.to_string());
        let value = client_for(&endpoint).fetch_diagnosis("## System Specs\n").unwrap();
        let request = server.join().unwrap();

        assert_eq!(value["diagnosis"]["severity"], 7);
        assert!(request.starts_with("POST /v1beta/models/gemini-2.0-flash:generateContent"));
        assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains("## System Specs"));
    }

    #[test]
    fn test_gemini_non_json_text_is_data_parsing() {
        let reply = json!({"candidates": [{"content": {"parts": [{"text": "I think it's the GPU."}]}}]});
        let (endpoint, server) = serve_once("200 OK", &reply.to_string());
        let err = client_for(&endpoint).fetch_diagnosis("prompt").unwrap_err();
        server.join().unwrap();

        assert_eq!(err.kind(), ZenithErrorKind::DataParsing);
    }

    #[test]
    fn test_fake_client_through_arc() {
        let client = Arc::new(FakeReasoningClient::always_empty());
        let shared: Arc<FakeReasoningClient> = Arc::clone(&client);
        assert!(shared.fetch_diagnosis("x").is_err());
        assert_eq!(client.call_count(), 1);
    }
}
