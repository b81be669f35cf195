//! JSON wire format.
//!
//! # Design
//! Wire names come from one table, `FIELDS`, instead of per-field serde
//! attributes. Every wire name is the in-memory field name lower-cased with
//! the word separators removed (`input_method` becomes `inputmethod`). The
//! serializer walks the table in order and skips absent fields, so `null`
//! never appears in emitted text.
//!
//! Deserialization is type-targeted and tolerant of unknown fields; the
//! response types carry their own lower-case names.

use serde::de::DeserializeOwned;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::error::ConvertError;
use crate::types::{ConvertRequest, DownloadSelector};

/// Fields of `ConvertRequest`, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ApiKey,
    InputFormat,
    InputMethod,
    FilePath,
    FileName,
    Tag,
    OutputFormat,
    ConverterOptions,
    PresetId,
    Timeout,
    Email,
    OutputStorage,
    CallbackUrl,
    Wait,
    DownloadMethod,
    SaveToServer,
}

/// In-memory name and wire name of every request field.
pub const FIELDS: &[(Field, &str, &str)] = &[
    (Field::ApiKey, "api_key", "apikey"),
    (Field::InputFormat, "input_format", "inputformat"),
    (Field::InputMethod, "input_method", "inputmethod"),
    (Field::FilePath, "file_path", "filepath"),
    (Field::FileName, "file_name", "filename"),
    (Field::Tag, "tag", "tag"),
    (Field::OutputFormat, "output_format", "outputformat"),
    (Field::ConverterOptions, "converter_options", "converteroptions"),
    (Field::PresetId, "preset_id", "presetid"),
    (Field::Timeout, "timeout", "timeout"),
    (Field::Email, "email", "email"),
    (Field::OutputStorage, "output_storage", "outputstorage"),
    (Field::CallbackUrl, "callback_url", "callbackurl"),
    (Field::Wait, "wait", "wait"),
    (Field::DownloadMethod, "download_method", "downloadmethod"),
    (Field::SaveToServer, "save_to_server", "savetoserver"),
];

/// Wire name for a request field.
pub fn wire_name(field: Field) -> &'static str {
    FIELDS
        .iter()
        .find(|(f, _, _)| *f == field)
        .map(|(_, _, wire)| *wire)
        .unwrap_or_default()
}

impl ConvertRequest {
    fn field_value(&self, field: Field) -> Option<Value> {
        let string = |v: &Option<String>| v.as_ref().map(|s| Value::String(s.clone()));
        let boolean = |v: &Option<bool>| v.map(Value::Bool);
        match field {
            Field::ApiKey => string(&self.api_key),
            Field::InputFormat => string(&self.input_format),
            Field::InputMethod => string(&self.input_method),
            Field::FilePath => string(&self.file_path),
            Field::FileName => string(&self.file_name),
            Field::Tag => string(&self.tag),
            Field::OutputFormat => string(&self.output_format),
            Field::ConverterOptions => self
                .converter_options
                .as_ref()
                .map(|options| Value::Object(options.normalize())),
            Field::PresetId => string(&self.preset_id),
            Field::Timeout => self.timeout.map(Value::from),
            Field::Email => boolean(&self.email),
            Field::OutputStorage => string(&self.output_storage),
            Field::CallbackUrl => string(&self.callback_url),
            Field::Wait => boolean(&self.wait),
            Field::DownloadMethod => self.download_method.map(DownloadSelector::to_value),
            Field::SaveToServer => boolean(&self.save_to_server),
        }
    }
}

impl Serialize for ConvertRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let present: Vec<(&str, Value)> = FIELDS
            .iter()
            .filter_map(|(field, _, wire)| self.field_value(*field).map(|v| (*wire, v)))
            .collect();
        let mut map = serializer.serialize_map(Some(present.len()))?;
        for (name, value) in &present {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Serialize a request to compact JSON text.
///
/// Every field is already a `serde_json::Value` keyed by a static name, so
/// encoding does not fail in practice. If it ever does, nothing was sent and
/// the error is reported as a transport failure without a status.
pub fn serialize(request: &ConvertRequest) -> Result<String, ConvertError> {
    serde_json::to_string(request).map_err(encode_failure)
}

fn encode_failure(e: serde_json::Error) -> ConvertError {
    ConvertError::TransportError {
        status: None,
        body: format!("request could not be encoded: {e}"),
    }
}

/// Parse response text into the requested shape.
pub fn deserialize<T: DeserializeOwned>(text: &str) -> Result<T, ConvertError> {
    serde_json::from_str(text).map_err(|e| ConvertError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ConversionStep, ConvertResponse};
    use crate::error::ErrorKind;
    use crate::types::{ConverterOptions, MarkdownConverterOptions};

    #[test]
    fn wire_names_follow_one_rule() {
        for (_, rust_name, wire) in FIELDS {
            assert_eq!(rust_name.replace('_', "").to_lowercase(), *wire);
        }
    }

    #[test]
    fn absent_fields_are_omitted() {
        let text = serialize(&ConvertRequest::process("md", "docx")).unwrap();
        assert_eq!(text, r#"{"inputformat":"md","outputformat":"docx"}"#);
        assert!(!text.contains("null"));
    }

    #[test]
    fn every_present_field_is_emitted() {
        let request = ConvertRequest {
            api_key: Some("k".into()),
            input_format: Some("md".into()),
            input_method: Some("download".into()),
            file_path: Some("https://example.com/a.md".into()),
            file_name: Some("a.md".into()),
            tag: Some("batch-1".into()),
            email: Some(true),
            output_storage: Some("dropbox".into()),
            callback_url: Some("https://example.com/hook".into()),
            wait: Some(true),
            download_method: Some(DownloadSelector::Inline),
            save_to_server: Some(true),
            output_format: Some("docx".into()),
            converter_options: Some(ConverterOptions::open([("quality", 80)])),
            preset_id: Some("p-1".into()),
            timeout: Some(60),
        };
        let value: Value = serde_json::from_str(&serialize(&request).unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FIELDS.len());
        assert_eq!(value["downloadmethod"], "inline");
        assert_eq!(value["timeout"], 60);
        assert_eq!(value["converteroptions"]["quality"], 80);
        assert_eq!(value[wire_name(Field::SaveToServer)], true);
    }

    #[test]
    fn attachment_download_is_boolean_true() {
        let request = ConvertRequest {
            download_method: Some(DownloadSelector::Attachment),
            ..Default::default()
        };
        assert_eq!(serialize(&request).unwrap(), r#"{"downloadmethod":true}"#);
    }

    #[test]
    fn encode_failure_is_not_blamed_on_the_caller() {
        let cause = serde_json::from_str::<Value>("{").unwrap_err();
        let err = encode_failure(cause);
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("request could not be encoded"));
    }

    #[test]
    fn download_selector_values() {
        assert_eq!(DownloadSelector::Attachment.to_value(), Value::Bool(true));
        assert_eq!(DownloadSelector::Inline.to_value(), "inline");
    }

    #[test]
    fn typed_and_open_options_serialize_identically() {
        let mut typed = ConvertRequest::process("md", "docx");
        typed.converter_options =
            Some(ConverterOptions::typed(&MarkdownConverterOptions::default()).unwrap());
        let mut open = ConvertRequest::process("md", "docx");
        open.converter_options = Some(ConverterOptions::open([("input_markdown_syntax", "auto")]));

        let a = serialize(&typed).unwrap();
        let b = serialize(&open).unwrap();
        assert_eq!(a, b);
        assert!(a.contains("input_markdown_syntax"));
    }

    #[test]
    fn deserialize_tolerates_unknown_fields() {
        let parsed: ConvertResponse =
            deserialize(r#"{"id":"abc","step":"convert","brand_new_field":{"x":1}}"#).unwrap();
        assert_eq!(parsed.id.as_deref(), Some("abc"));
        assert_eq!(parsed.step, Some(ConversionStep::Convert));
    }

    #[test]
    fn structurally_invalid_payload_is_malformed() {
        let err = deserialize::<ConvertResponse>(r#"{"step":42}"#).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedResponse(_)));
        let err = deserialize::<ConvertResponse>("not json").unwrap_err();
        assert!(matches!(err, ConvertError::MalformedResponse(_)));
    }
}
