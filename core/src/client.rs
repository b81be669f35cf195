//! Conversion client: drives process negotiation, submission, status polling
//! and deletion.
//!
//! # Design
//! `ConversionClient` holds only its settings and a `Transport`; no state is
//! carried between calls, so one client can serve any number of concurrent
//! conversions. Every step is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! driven operations (`negotiate_process`, `convert`, `get_status`,
//! `delete_conversion`) glue the halves together through the transport.
//!
//! All steps share one post-response rule: a non-2xx status is handed to
//! `translate` and returned as an error, a 2xx body is parsed into the step's
//! response type and stamped with the HTTP status. Nothing is retried.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{AuthMode, ClientSettings};
use crate::error::{translate, ConvertError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::mapper::{self, require};
use crate::response::{ConvertResponse, DeleteResponse, ProcessResponse};
use crate::types::{ConversionParameters, ConvertRequest, InputParameters, OutputParameters};
use crate::wire;

/// Stateless client for the conversion service.
#[derive(Debug, Clone)]
pub struct ConversionClient<T = UreqTransport> {
    settings: ClientSettings,
    transport: T,
}

impl ConversionClient<UreqTransport> {
    /// Client using the default blocking transport.
    pub fn new(settings: ClientSettings) -> Result<Self, ConvertError> {
        Self::with_transport(settings, UreqTransport)
    }
}

impl<T: Transport> ConversionClient<T> {
    pub fn with_transport(settings: ClientSettings, transport: T) -> Result<Self, ConvertError> {
        settings.validate()?;
        Ok(Self {
            settings,
            transport,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Driven operations
    // -----------------------------------------------------------------------

    /// Ask the service which host should run a conversion from `input_format`
    /// to `output_format`.
    pub fn negotiate_process(
        &self,
        input_format: &str,
        output_format: &str,
    ) -> Result<ProcessResponse, ConvertError> {
        let request = self.build_process_request(input_format, output_format)?;
        debug!(input_format, output_format, "negotiating process");
        self.parse_process_response(self.transport.execute(request)?)
    }

    /// Merge the parameter groups, negotiate a process and submit the job to it.
    pub fn convert(
        &self,
        input: &InputParameters,
        output: &OutputParameters,
        conversion: &ConversionParameters,
    ) -> Result<ConvertResponse, ConvertError> {
        let request = mapper::merge(input, output, conversion)?;
        let process = self.negotiate_process(&input.input_format, &conversion.output_format)?;
        if process.url.trim().is_empty() {
            return Err(ConvertError::MalformedResponse(
                "process negotiation returned no url".to_string(),
            ));
        }
        self.convert_with_url(&request, &process.url)
    }

    /// Submit an already-merged request to a known process URL.
    pub fn convert_with_url(
        &self,
        request: &ConvertRequest,
        process_url: &str,
    ) -> Result<ConvertResponse, ConvertError> {
        let http = self.build_convert_request(request, process_url)?;
        debug!(url = %http.url, "submitting conversion");
        self.parse_convert_response(self.transport.execute(http)?)
    }

    /// Poll the status URL returned by `convert`.
    pub fn get_status(&self, status_url: &str) -> Result<ConvertResponse, ConvertError> {
        let http = self.build_status_request(status_url)?;
        debug!(url = %http.url, "polling conversion status");
        self.parse_status_response(self.transport.execute(http)?)
    }

    /// Remove a conversion job from the service.
    pub fn delete_conversion(&self, delete_url: &str) -> Result<DeleteResponse, ConvertError> {
        let http = self.build_delete_request(delete_url)?;
        debug!(url = %http.url, "deleting conversion");
        self.parse_delete_response(self.transport.execute(http)?)
    }
}

impl<T> ConversionClient<T> {
    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_process_request(
        &self,
        input_format: &str,
        output_format: &str,
    ) -> Result<HttpRequest, ConvertError> {
        require("input_format", input_format)?;
        require("output_format", output_format)?;

        let mut request = ConvertRequest::process(input_format, output_format);
        let mut headers = json_headers();
        match self.settings.auth_mode {
            AuthMode::Header => headers.push((
                "authorization".to_string(),
                format!("Bearer {}", self.settings.api_key),
            )),
            AuthMode::Body => request.api_key = Some(self.settings.api_key.clone()),
        }

        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.settings.process_url.clone(),
            headers,
            body: Some(wire::serialize(&request)?),
        })
    }

    pub fn build_convert_request(
        &self,
        request: &ConvertRequest,
        process_url: &str,
    ) -> Result<HttpRequest, ConvertError> {
        require("process_url", process_url)?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.qualify_url(process_url),
            headers: json_headers(),
            body: Some(wire::serialize(request)?),
        })
    }

    pub fn build_status_request(&self, status_url: &str) -> Result<HttpRequest, ConvertError> {
        require("status_url", status_url)?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: self.qualify_url(status_url),
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn build_delete_request(&self, delete_url: &str) -> Result<HttpRequest, ConvertError> {
        require("delete_url", delete_url)?;
        Ok(HttpRequest {
            method: HttpMethod::Delete,
            url: self.qualify_url(delete_url),
            headers: Vec::new(),
            body: None,
        })
    }

    /// Prefix protocol-relative (`//host/...`) or scheme-less URLs with the
    /// configured scheme. Absolute URLs pass through.
    pub fn qualify_url(&self, url: &str) -> String {
        let url = url.trim();
        if has_scheme(url) {
            url.to_string()
        } else if url.starts_with("//") {
            format!("{}:{url}", self.settings.scheme)
        } else {
            format!("{}://{url}", self.settings.scheme)
        }
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_process_response(
        &self,
        response: HttpResponse,
    ) -> Result<ProcessResponse, ConvertError> {
        let (code, mut parsed) = parse_success::<ProcessResponse>(response)?;
        parsed.code = code;
        Ok(parsed)
    }

    pub fn parse_convert_response(
        &self,
        response: HttpResponse,
    ) -> Result<ConvertResponse, ConvertError> {
        let (code, mut parsed) = parse_success::<ConvertResponse>(response)?;
        parsed.code = code;
        Ok(parsed)
    }

    pub fn parse_status_response(
        &self,
        response: HttpResponse,
    ) -> Result<ConvertResponse, ConvertError> {
        let parsed = self.parse_convert_response(response)?;
        debug!(step = ?parsed.step, percent = ?parsed.percent, "conversion status");
        Ok(parsed)
    }

    pub fn parse_delete_response(
        &self,
        response: HttpResponse,
    ) -> Result<DeleteResponse, ConvertError> {
        if response.is_success() && response.body.trim().is_empty() {
            return Ok(DeleteResponse {
                code: response.status,
                ..Default::default()
            });
        }
        let (code, mut parsed) = parse_success::<DeleteResponse>(response)?;
        parsed.code = code;
        Ok(parsed)
    }
}

/// Whether `url` starts with `scheme://`, where the scheme is a letter
/// followed by letters, digits, `+`, `-` or `.`.
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

/// Apply the shared post-response rule.
fn parse_success<R: DeserializeOwned>(response: HttpResponse) -> Result<(u16, R), ConvertError> {
    if !response.is_success() {
        let err = translate(response.status, &response.body);
        warn!(status = response.status, error = %err, "conversion service returned an error");
        return Err(err);
    }
    Ok((response.status, wire::deserialize(&response.body)?))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::error::ErrorKind;
    use crate::response::ConversionStep;

    /// Transport that replays canned responses and records every request.
    #[derive(Debug, Default)]
    struct Scripted {
        responses: RefCell<VecDeque<HttpResponse>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn with(responses: Vec<(u16, &str)>) -> Self {
            Self {
                responses: RefCell::new(
                    responses
                        .into_iter()
                        .map(|(status, body)| HttpResponse {
                            status,
                            headers: Vec::new(),
                            body: body.to_string(),
                        })
                        .collect(),
                ),
                sent: RefCell::default(),
            }
        }
    }

    impl Transport for Scripted {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ConvertError> {
            self.sent.borrow_mut().push(request);
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ConvertError::TransportError {
                    status: None,
                    body: "no scripted response".to_string(),
                })
        }
    }

    fn settings() -> ClientSettings {
        ClientSettings::new("test-key").with_process_url("https://api.example.com/process")
    }

    fn client(transport: &Scripted) -> ConversionClient<&Scripted> {
        ConversionClient::with_transport(settings(), transport).unwrap()
    }

    fn input() -> InputParameters {
        InputParameters {
            input_format: "md".to_string(),
            input_method: "download".to_string(),
            file_path: Some("https://example.com/a.md".to_string()),
            ..Default::default()
        }
    }

    fn output() -> OutputParameters {
        OutputParameters {
            output_storage: Some("onedrive".to_string()),
            ..Default::default()
        }
    }

    fn conversion() -> ConversionParameters {
        ConversionParameters {
            output_format: "docx".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn process_request_uses_bearer_header() {
        let transport = Scripted::default();
        let req = client(&transport).build_process_request("md", "docx").unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://api.example.com/process");
        assert!(req
            .headers
            .contains(&("authorization".to_string(), "Bearer test-key".to_string())));
        assert_eq!(
            req.body.as_deref(),
            Some(r#"{"inputformat":"md","outputformat":"docx"}"#)
        );
    }

    #[test]
    fn process_request_body_auth_embeds_key() {
        let transport = Scripted::default();
        let client =
            ConversionClient::with_transport(settings().with_auth_mode(AuthMode::Body), &transport)
                .unwrap();
        let req = client.build_process_request("md", "docx").unwrap();
        assert!(req.headers.iter().all(|(k, _)| k != "authorization"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["apikey"], "test-key");
    }

    #[test]
    fn blank_formats_fail_before_any_network_call() {
        let transport = Scripted::default();
        let client = client(&transport);
        let err = client.negotiate_process(" ", "docx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = client.negotiate_process("md", "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn empty_urls_fail_before_any_network_call() {
        let transport = Scripted::default();
        let client = client(&transport);
        assert_eq!(client.get_status("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            client.delete_conversion("").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let mut bad = conversion();
        bad.output_format = String::new();
        assert_eq!(
            client.convert(&input(), &output(), &bad).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn convert_posts_to_negotiated_host() {
        let transport = Scripted::with(vec![
            (200, r#"{"url":"//host/process/abc","id":"abc"}"#),
            (200, r#"{"id":"abc","url":"//host/process/abc","step":"input","percent":0}"#),
        ]);
        let response = client(&transport)
            .convert(&input(), &output(), &conversion())
            .unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.step, Some(ConversionStep::Input));

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url, "https://api.example.com/process");
        assert_eq!(sent[1].method, HttpMethod::Post);
        assert_eq!(sent[1].url, "https://host/process/abc");

        let body: serde_json::Value = serde_json::from_str(sent[1].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["inputmethod"], "download");
        assert_eq!(body["outputstorage"], "onedrive");
        assert_eq!(body["outputformat"], "docx");
        assert!(body.get("email").is_none());
        assert!(body.get("wait").is_none());
        assert!(body.get("downloadmethod").is_none());
    }

    #[test]
    fn negotiation_failure_stops_conversion() {
        let transport = Scripted::with(vec![(401, r#"{"code":401,"error":"Invalid API key"}"#)]);
        let err = client(&transport)
            .convert(&input(), &output(), &conversion())
            .unwrap_err();
        match err {
            ConvertError::ServiceError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("expected ServiceError, got {other:?}"),
        }
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[test]
    fn negotiation_without_url_is_malformed() {
        let transport = Scripted::with(vec![(200, r#"{"id":"abc"}"#)]);
        let err = client(&transport)
            .convert(&input(), &output(), &conversion())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(transport.sent.borrow().len(), 1);
    }

    #[test]
    fn status_polls_report_step_and_message() {
        let transport = Scripted::with(vec![
            (200, r#"{"step":"finished","percent":"100","endtime":1700000100}"#),
            (200, r#"{"step":"error","message":"Conversion failed: corrupt input"}"#),
        ]);
        let client = client(&transport);

        let first = client.get_status("//host/process/abc").unwrap();
        assert!(first.is_finished());
        assert!(first.end_time.is_some());
        assert_eq!(first.code, 200);

        let second = client.get_status("https://host/process/abc").unwrap();
        assert!(second.is_failed());
        assert!(second.message.is_some());

        let sent = transport.sent.borrow();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "https://host/process/abc");
        assert_eq!(sent[1].url, "https://host/process/abc");
    }

    #[test]
    fn unparseable_error_body_is_transport_error() {
        let transport = Scripted::with(vec![(500, "Internal Server Error")]);
        let err = client(&transport).get_status("//host/process/abc").unwrap_err();
        assert!(matches!(err, ConvertError::TransportError { status: Some(500), .. }));
    }

    #[test]
    fn wrong_shape_on_success_is_malformed() {
        let transport = Scripted::with(vec![(200, "<html>ok</html>")]);
        let err = client(&transport).get_status("//host/process/abc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn delete_uses_delete_method() {
        let transport = Scripted::with(vec![(200, r#"{"message":"Process deleted"}"#)]);
        let response = client(&transport)
            .delete_conversion("//host/process/abc")
            .unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.message.as_deref(), Some("Process deleted"));
        assert_eq!(transport.sent.borrow()[0].method, HttpMethod::Delete);
    }

    #[test]
    fn delete_accepts_empty_body() {
        let transport = Scripted::with(vec![(204, "")]);
        let response = client(&transport)
            .delete_conversion("//host/process/abc")
            .unwrap();
        assert_eq!(response.code, 204);
    }

    #[test]
    fn delete_not_found_is_service_error() {
        let transport = Scripted::with(vec![(404, r#"{"error":"Process not found"}"#)]);
        let err = client(&transport)
            .delete_conversion("//host/process/gone")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServiceError);
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn transport_failure_propagates() {
        let transport = Scripted::default();
        let err = client(&transport).get_status("//host/process/abc").unwrap_err();
        assert!(matches!(err, ConvertError::TransportError { status: None, .. }));
    }

    #[test]
    fn qualify_url_variants() {
        let transport = Scripted::default();
        let client = client(&transport);
        assert_eq!(client.qualify_url("//h/p"), "https://h/p");
        assert_eq!(client.qualify_url("h/p"), "https://h/p");
        assert_eq!(client.qualify_url("http://h/p"), "http://h/p");
    }

    #[test]
    fn embedded_url_does_not_count_as_a_scheme() {
        let transport = Scripted::default();
        let client = client(&transport);
        assert_eq!(
            client.qualify_url("host/process/abc?callback=https://example.com/hook"),
            "https://host/process/abc?callback=https://example.com/hook"
        );
        assert_eq!(
            client.qualify_url("//host/process/abc?next=http://x/y"),
            "https://host/process/abc?next=http://x/y"
        );
        assert_eq!(
            client.qualify_url("HTTPS://host/process/abc?next=http://x/y"),
            "HTTPS://host/process/abc?next=http://x/y"
        );
    }

    #[test]
    fn success_payload_error_text_is_surfaced() {
        let transport = Scripted::with(vec![(
            200,
            r#"{"id":"abc","step":"error","error":"input unreachable"}"#,
        )]);
        let status = client(&transport).get_status("//host/process/abc").unwrap();
        assert_eq!(status.code, 200);
        assert!(status.is_failed());
        assert_eq!(status.error.as_deref(), Some("input unreachable"));
    }

    #[test]
    fn repeated_merge_serializes_identically() {
        let transport = Scripted::default();
        let client = client(&transport);
        let a = mapper::merge(&input(), &output(), &conversion()).unwrap();
        let b = mapper::merge(&input(), &output(), &conversion()).unwrap();
        let ra = client.build_convert_request(&a, "//host/process/abc").unwrap();
        let rb = client.build_convert_request(&b, "//host/process/abc").unwrap();
        assert_eq!(ra.body, rb.body);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let transport = Scripted::default();
        let err = ConversionClient::with_transport(ClientSettings::new(""), &transport).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
