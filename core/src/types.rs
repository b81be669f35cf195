//! Request model: the three caller-facing parameter groups and the merged
//! wire request.
//!
//! # Design
//! Callers describe a job as three independent groups. `InputParameters`
//! says where the source file comes from, `OutputParameters` says what happens
//! to the result, and `ConversionParameters` says what to produce. The mapper
//! folds them into one `ConvertRequest`, which is also used (with only the
//! format pair set) for process negotiation.
//!
//! Format names, input methods and storage identifiers are opaque strings
//! passed through to the service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConvertError;

/// Where the source file comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputParameters {
    /// Source format, e.g. `md`. Required for process negotiation.
    pub input_format: String,
    /// Acquisition method: `download`, `upload`, or a remote storage name.
    pub input_method: String,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub tag: Option<String>,
}

/// How the service should hand over the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadMethod {
    #[default]
    False,
    True,
    /// Serve the file for inline display instead of as an attachment.
    Inline,
}

/// What happens to the converted file. Every field is optional; unset values
/// never reach the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputParameters {
    pub email: bool,
    /// Remote storage identifier such as `onedrive`, `dropbox` or `s3`.
    pub output_storage: Option<String>,
    pub callback_url: Option<String>,
    /// Block until the conversion has finished.
    pub wait: bool,
    pub download_method: DownloadMethod,
    pub save_to_server: bool,
}

/// What to produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionParameters {
    pub output_format: String,
    pub converter_options: Option<ConverterOptions>,
    pub preset_id: Option<String>,
    /// Remote-side timeout in seconds; zero or negative means unset.
    pub timeout: i64,
}

/// Converter-specific options, either captured from a typed options struct or
/// given as an open key/value map. Both normalize to the same JSON object.
#[derive(Debug, Clone, PartialEq)]
pub enum ConverterOptions {
    Typed(Map<String, Value>),
    Open(BTreeMap<String, Value>),
}

impl ConverterOptions {
    /// Capture a typed options value. It must serialize to a JSON object.
    pub fn typed<T: Serialize>(options: &T) -> Result<Self, ConvertError> {
        match serde_json::to_value(options) {
            Ok(Value::Object(map)) => Ok(ConverterOptions::Typed(map)),
            Ok(other) => Err(ConvertError::invalid(format!(
                "converter options must serialize to a JSON object, got {other}"
            ))),
            Err(e) => Err(ConvertError::invalid(format!("converter options: {e}"))),
        }
    }

    pub fn open<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        ConverterOptions::Open(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The canonical wire representation: a key-sorted JSON object with
    /// null-valued entries dropped.
    pub fn normalize(&self) -> Map<String, Value> {
        let entries: Box<dyn Iterator<Item = (&String, &Value)>> = match self {
            ConverterOptions::Typed(map) => Box::new(map.iter()),
            ConverterOptions::Open(map) => Box::new(map.iter()),
        };
        entries
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Markdown dialect understood by the markdown converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownSyntax {
    #[default]
    Auto,
    Commonmark,
    Github,
    Multimarkdown,
    Pandoc,
    Strict,
}

/// Typed options for markdown input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownConverterOptions {
    pub input_markdown_syntax: MarkdownSyntax,
}

/// The merged, serialization-ready conversion job.
///
/// Each field is contributed by exactly one parameter group. `None` means the
/// field is omitted from the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertRequest {
    pub api_key: Option<String>,
    pub input_format: Option<String>,
    pub input_method: Option<String>,
    pub file_path: Option<String>,
    pub file_name: Option<String>,
    pub tag: Option<String>,
    pub email: Option<bool>,
    pub output_storage: Option<String>,
    pub callback_url: Option<String>,
    pub wait: Option<bool>,
    pub download_method: Option<DownloadSelector>,
    pub save_to_server: Option<bool>,
    pub output_format: Option<String>,
    pub converter_options: Option<ConverterOptions>,
    pub preset_id: Option<String>,
    pub timeout: Option<i64>,
}

impl ConvertRequest {
    /// The minimal request used for process negotiation.
    pub fn process(input_format: &str, output_format: &str) -> Self {
        ConvertRequest {
            input_format: Some(input_format.to_string()),
            output_format: Some(output_format.to_string()),
            ..Default::default()
        }
    }
}

/// Wire form of a truthy `DownloadMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadSelector {
    /// Serialized as boolean `true`.
    Attachment,
    /// Serialized as the literal string `"inline"`.
    Inline,
}

impl DownloadSelector {
    pub fn to_value(self) -> Value {
        match self {
            DownloadSelector::Attachment => Value::Bool(true),
            DownloadSelector::Inline => Value::from("inline"),
        }
    }
}

impl Serialize for DownloadSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
