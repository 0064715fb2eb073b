//! Diagnostic domain model
//!
//! Telemetry submitted by the user, the records parsed out of the reasoning
//! service's reply, and the hydration rules that turn an untrusted JSON map
//! into those records.
//!
//! Hydration never fails. Missing or wrong-shaped fields degrade to the
//! defaults documented on each record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::ZenithError;

/// Sentinel stored in optional free-text fields left blank by the user
pub const NOT_SPECIFIED: &str = "Not specified";

/// Bottleneck classification used when the reply does not provide one
pub const UNKNOWN_BOTTLENECK: &str = "Unknown";

/// Number of tweaks a consumer shows, regardless of how many were returned
pub const MAX_DISPLAYED_TWEAKS: usize = 3;

pub const SEVERITY_MAX: i64 = 10;
pub const COMPATIBILITY_MAX: i64 = 100;

/// Operating systems the telemetry form offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatingSystem {
    #[serde(rename = "Windows 10")]
    Windows10,
    #[serde(rename = "Windows 11")]
    Windows11,
    #[serde(rename = "Linux")]
    Linux,
    #[serde(rename = "macOS")]
    MacOs,
}

impl OperatingSystem {
    pub const ALL: [OperatingSystem; 4] = [
        Self::Windows10,
        Self::Windows11,
        Self::Linux,
        Self::MacOs,
    ];

    /// Label as it appears in the prompt
    pub fn label(&self) -> &'static str {
        match self {
            Self::Windows10 => "Windows 10",
            Self::Windows11 => "Windows 11",
            Self::Linux => "Linux",
            Self::MacOs => "macOS",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Windows10 => "windows-10",
            Self::Windows11 => "windows-11",
            Self::Linux => "linux",
            Self::MacOs => "macos",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OperatingSystem {
    type Err = ZenithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|os| os.label().eq_ignore_ascii_case(wanted) || os.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ZenithError::Validation(format!(
                    "Unknown operating system '{}'. Expected one of: Windows 10, Windows 11, Linux, macOS",
                    wanted
                ))
            })
    }
}

/// Storage classes the telemetry form offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    #[serde(rename = "NVMe SSD")]
    NvmeSsd,
    #[serde(rename = "SATA SSD")]
    SataSsd,
    #[serde(rename = "HDD")]
    Hdd,
}

impl StorageClass {
    pub const ALL: [StorageClass; 3] = [Self::NvmeSsd, Self::SataSsd, Self::Hdd];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NvmeSsd => "NVMe SSD",
            Self::SataSsd => "SATA SSD",
            Self::Hdd => "HDD",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::NvmeSsd => "nvme-ssd",
            Self::SataSsd => "sata-ssd",
            Self::Hdd => "hdd",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StorageClass {
    type Err = ZenithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|st| st.label().eq_ignore_ascii_case(wanted) || st.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ZenithError::Validation(format!(
                    "Unknown storage class '{}'. Expected one of: NVMe SSD, SATA SSD, HDD",
                    wanted
                ))
            })
    }
}

/// Hardware and software context declared by the user.
///
/// The record may hold an incomplete state (blank CPU, no OS selected).
/// Completeness is checked by the diagnostics service before a prompt is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryInput {
    pub cpu: String,
    pub gpu: String,
    pub ram: String,
    pub storage: Option<StorageClass>,
    pub os_name: Option<OperatingSystem>,
    pub application: String,
    pub symptoms: String,
}

impl TelemetryInput {
    /// Build telemetry from raw form values.
    ///
    /// `ram` and `symptoms` are trimmed and fall back to [`NOT_SPECIFIED`]
    /// when blank. Required fields are stored as given.
    pub fn new(
        cpu: impl Into<String>,
        gpu: impl Into<String>,
        ram: Option<&str>,
        storage: Option<StorageClass>,
        os_name: Option<OperatingSystem>,
        application: impl Into<String>,
        symptoms: Option<&str>,
    ) -> Self {
        Self {
            cpu: cpu.into(),
            gpu: gpu.into(),
            ram: or_not_specified(ram),
            storage,
            os_name,
            application: application.into(),
            symptoms: or_not_specified(symptoms),
        }
    }

    /// Render the Markdown prompt handed to the reasoning service.
    ///
    /// Section order and labels are fixed: System Specs, Target Application,
    /// Reported Symptoms.
    pub fn format_prompt(&self) -> String {
        let storage = self.storage.map(|s| s.label()).unwrap_or(NOT_SPECIFIED);
        let os_name = self.os_name.map(|o| o.label()).unwrap_or(NOT_SPECIFIED);

        format!(
            "## System Specs\n\
             - **CPU**: {}\n\
             - **GPU**: {}\n\
             - **RAM**: {}\n\
             - **Storage**: {}\n\
             - **OS**: {}\n\
             \n\
             ## Target Application\n\
             {}\n\
             \n\
             ## Reported Symptoms\n\
             {}\n",
            self.cpu, self.gpu, self.ram, storage, os_name, self.application, self.symptoms
        )
    }
}

fn or_not_specified(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_SPECIFIED.to_string(),
    }
}

/// Primary finding of the reasoning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Usually CPU, GPU, RAM, Storage, Thermal, Software or Mixed.
    /// Not enforced; defaults to "Unknown".
    pub bottleneck_type: String,
    /// 0..=10
    pub severity: u8,
    pub plain_english: String,
    pub reasoning: String,
    pub secondary_bottleneck: Option<String>,
}

/// Coarse severity grouping used for colouring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Low,
    Moderate,
    High,
}

impl Diagnosis {
    pub fn severity_band(&self) -> SeverityBand {
        match self.severity {
            0..=3 => SeverityBand::Low,
            4..=6 => SeverityBand::Moderate,
            _ => SeverityBand::High,
        }
    }

    fn from_section(section: Option<&Map<String, Value>>) -> Self {
        Self {
            bottleneck_type: string_field(section, "bottleneck_type", UNKNOWN_BOTTLENECK),
            severity: clamp(coerce_int(field(section, "severity")), 0, SEVERITY_MAX) as u8,
            plain_english: string_field(section, "plain_english", ""),
            reasoning: string_field(section, "reasoning", ""),
            secondary_bottleneck: optional_string(field(section, "secondary_bottleneck")),
        }
    }
}

/// How well the target application fits the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    /// 0..=100
    pub score: u8,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompatibilityBand {
    Good,
    Fair,
    Poor,
}

impl Compatibility {
    pub fn band(&self) -> CompatibilityBand {
        match self.score {
            70..=u8::MAX => CompatibilityBand::Good,
            40..=69 => CompatibilityBand::Fair,
            _ => CompatibilityBand::Poor,
        }
    }

    /// Only a non-empty object counts as an assessment.
    fn from_value(value: Option<&Value>) -> Option<Self> {
        let section = value.and_then(Value::as_object).filter(|m| !m.is_empty())?;
        Some(Self {
            score: clamp(coerce_int(section.get("score")), 0, COMPATIBILITY_MAX) as u8,
            note: string_field(Some(section), "note", ""),
        })
    }
}

/// Risk level of a tweak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Advanced,
}

impl SafetyLevel {
    /// Case-insensitive; anything unrecognised is presented as safe.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "caution" => Self::Caution,
            "advanced" => Self::Advanced,
            _ => Self::Safe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Caution => "caution",
            Self::Advanced => "advanced",
        }
    }
}

/// One recommended, reversible action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweak {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw safety label as returned; see [`Tweak::safety_level`]
    pub safety: String,
    pub steps: Vec<String>,
    /// Raw command list. Use [`Tweak::usable_commands`] for display.
    pub commands: Vec<String>,
    pub rationale: String,
    /// Empty when no revert guidance was supplied
    pub revert: String,
}

impl Tweak {
    pub fn safety_level(&self) -> SafetyLevel {
        SafetyLevel::parse_lenient(&self.safety)
    }

    /// Commands with empty entries and the literal string "null" removed.
    ///
    /// The reasoning service has been seen emitting "null" as a string in
    /// place of a missing command.
    pub fn usable_commands(&self) -> Vec<&str> {
        self.commands
            .iter()
            .map(String::as_str)
            .filter(|c| !c.is_empty() && *c != "null")
            .collect()
    }

    pub fn has_revert(&self) -> bool {
        !self.revert.trim().is_empty()
    }

    fn from_value(value: &Value) -> Self {
        let section = value.as_object();
        Self {
            title: string_field(section, "title", ""),
            kind: string_field(section, "type", ""),
            safety: string_field(section, "safety", ""),
            steps: string_list(field(section, "steps")),
            commands: string_list(field(section, "commands")),
            rationale: string_field(section, "rationale", ""),
            revert: string_field(section, "revert", ""),
        }
    }
}

/// Something the user is explicitly warned against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoNotDo {
    pub action: String,
    pub reason: String,
}

impl DoNotDo {
    fn from_value(value: &Value) -> Self {
        let section = value.as_object();
        Self {
            action: string_field(section, "action", ""),
            reason: string_field(section, "reason", ""),
        }
    }
}

/// Complete, typed diagnostic result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticResponse {
    pub diagnosis: Diagnosis,
    /// Absent when the reply offered no assessment, as opposed to a score of 0
    pub compatibility: Option<Compatibility>,
    /// Every tweak returned, in order. Consumers show [`Self::displayed_tweaks`].
    pub tweaks: Vec<Tweak>,
    pub do_not_do: Vec<DoNotDo>,
}

impl DiagnosticResponse {
    /// Hydrate a response from the reasoning service's JSON object.
    ///
    /// Total over every map: absent keys and wrong shapes take defaults,
    /// and a malformed tweak or warning only defaults its own fields.
    pub fn from_map(data: &Map<String, Value>) -> Self {
        let diagnosis = Diagnosis::from_section(data.get("diagnosis").and_then(Value::as_object));
        let compatibility = Compatibility::from_value(data.get("compatibility"));

        let tweaks = elements(data.get("tweaks")).map(Tweak::from_value).collect();
        let do_not_do = elements(data.get("do_not_do")).map(DoNotDo::from_value).collect();

        Self {
            diagnosis,
            compatibility,
            tweaks,
            do_not_do,
        }
    }

    /// The tweaks a consumer should show: at most the first three
    pub fn displayed_tweaks(&self) -> &[Tweak] {
        let end = self.tweaks.len().min(MAX_DISPLAYED_TWEAKS);
        &self.tweaks[..end]
    }
}

// ============================================================================
// Coercion helpers
// ============================================================================

fn field<'a>(section: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Value> {
    section.and_then(|m| m.get(key))
}

fn elements(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

/// Strings as-is, numbers and booleans stringified, anything else `None`
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn string_field(section: Option<&Map<String, Value>>, key: &str, default: &str) -> String {
    field(section, key)
        .and_then(scalar_string)
        .unwrap_or_else(|| default.to_string())
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(scalar_string)
        .filter(|s| !s.trim().is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    elements(value).filter_map(scalar_string).collect()
}

/// Best-effort integer conversion. Anything unconvertible becomes 0.
pub fn coerce_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                i
            } else if n.as_u64().is_some() {
                i64::MAX
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
                    .unwrap_or(0)
            }
        }
        Some(Value::String(s)) => parse_int_saturating(s.trim()),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Decimal integer text, saturating at the `i64` bounds when out of range
fn parse_int_saturating(text: &str) -> i64 {
    if let Ok(i) = text.parse::<i64>() {
        return i;
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    if negative {
        i64::MIN
    } else {
        i64::MAX
    }
}

pub fn clamp(value: i64, min: i64, max: i64) -> i64 {
    value.clamp(min, max)
}
