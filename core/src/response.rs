//! Response DTOs returned by the conversion service.
//!
//! # Design
//! Every field is optional or defaulted so that partial payloads still parse,
//! and unknown fields are ignored. Wire names are lower-case; the camelCase
//! spellings some deployments emit are accepted as aliases. `code` always
//! holds the HTTP status of the exchange and is filled in by the client after
//! parsing.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server-reported lifecycle stage of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStep {
    /// The input file is being fetched.
    Input,
    /// Queued; only happens in special cases.
    Wait,
    Convert,
    /// The result is being uploaded to its destination.
    Output,
    Finished,
    /// Terminal failure; `message` describes it.
    Error,
}

impl ConversionStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, ConversionStep::Finished | ConversionStep::Error)
    }

    fn rank(self) -> u8 {
        match self {
            ConversionStep::Input => 0,
            ConversionStep::Wait => 1,
            ConversionStep::Convert => 2,
            ConversionStep::Output => 3,
            ConversionStep::Finished => 4,
            ConversionStep::Error => u8::MAX,
        }
    }

    /// Whether a job observed in `self` may later be observed in `next`.
    ///
    /// Steps only move forward (polling may skip stages), `Error` is reachable
    /// from any non-terminal step, and nothing leaves `Finished` or `Error`.
    pub fn can_advance_to(self, next: ConversionStep) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == ConversionStep::Error || next.rank() > self.rank()
    }
}

/// Result of process negotiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessResponse {
    pub code: u16,
    /// Protocol-relative URL (`//host/process/id`) for the follow-up requests.
    pub url: String,
    pub id: Option<String>,
    pub host: Option<String>,
    pub expires: Option<String>,
    pub maxtime: Option<i64>,
    pub minutes: Option<i64>,
}

/// A conversion job as reported by the convert and status endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertResponse {
    pub code: u16,
    pub id: Option<String>,
    pub url: Option<String>,
    #[serde(deserialize_with = "percent")]
    pub percent: Option<f64>,
    pub message: Option<String>,
    pub step: Option<ConversionStep>,
    #[serde(rename = "starttime", alias = "startTime")]
    pub start_time: Option<i64>,
    #[serde(rename = "endtime", alias = "endTime")]
    pub end_time: Option<i64>,
    pub expire: Option<i64>,
    pub input: Option<InputStatus>,
    pub converter: Option<ConverterStatus>,
    pub output: Option<OutputStatus>,
    /// Failure text some deployments attach to an otherwise successful reply.
    pub error: Option<String>,
}

impl ConvertResponse {
    pub fn is_finished(&self) -> bool {
        self.step == Some(ConversionStep::Finished)
    }

    pub fn is_failed(&self) -> bool {
        self.step == Some(ConversionStep::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputStatus {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub name: Option<String>,
    pub ext: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterStatus {
    pub format: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub options: BTreeMap<String, Value>,
    /// Seconds spent converting.
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputStatus {
    pub filename: Option<String>,
    pub ext: Option<String>,
    pub files: Vec<String>,
    pub size: Option<u64>,
    pub url: Option<String>,
    pub downloads: Option<u32>,
}

/// Confirmation returned by the delete endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteResponse {
    pub code: u16,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Body of every non-success response.
///
/// `code` is kept untyped: the HTTP status is authoritative and some
/// deployments send it as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub code: Option<Value>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorResponse {
    /// The service's description of the failure, preferring `error`.
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// Accepts `42`, `42.5`, `"42"` or `null`.
fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(t)) if t.trim().is_empty() => Ok(None),
        Some(Raw::Text(t)) => t.trim().parse().map(Some).map_err(de::Error::custom),
    }
}
