//! Client core for a remote file-conversion service.
//!
//! # Overview
//! A conversion runs in up to four HTTP steps: negotiate a processing host,
//! submit the job to it, poll its status, and optionally delete it.
//! `ConversionClient` exposes each step as one call, and also as a
//! `build_*` / `parse_*` pair so hosts can execute the HTTP exchange
//! themselves (async runtimes, custom TLS, cancellation).
//!
//! # Design
//! - The caller describes a job as three parameter groups (`InputParameters`,
//!   `OutputParameters`, `ConversionParameters`); `merge` folds them into one
//!   `ConvertRequest` with per-field ownership.
//! - `wire` owns the JSON format: a fixed lower-case field-name table, absent
//!   fields omitted, lenient type-targeted parsing.
//! - Every failure is a `ConvertError`; non-success responses go through
//!   `translate`.
//! - The client keeps no state between calls and never retries.
//!
//! ```no_run
//! use convert_core::{
//!     ClientSettings, ConversionClient, ConversionParameters, InputParameters, OutputParameters,
//! };
//!
//! # fn main() -> Result<(), convert_core::ConvertError> {
//! let client = ConversionClient::new(ClientSettings::from_env()?)?;
//! let job = client.convert(
//!     &InputParameters {
//!         input_format: "md".into(),
//!         input_method: "download".into(),
//!         file_path: Some("https://example.com/README.md".into()),
//!         ..Default::default()
//!     },
//!     &OutputParameters::default(),
//!     &ConversionParameters {
//!         output_format: "docx".into(),
//!         ..Default::default()
//!     },
//! )?;
//! if let Some(url) = job.url.as_deref() {
//!     let status = client.get_status(url)?;
//!     println!("{:?}", status.step);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mapper;
pub mod response;
pub mod types;
pub mod wire;

pub use client::ConversionClient;
pub use config::{AuthMode, ClientSettings};
pub use error::{translate, ConvertError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use mapper::merge;
pub use response::{
    ConversionStep, ConvertResponse, ConverterStatus, DeleteResponse, ErrorResponse, InputStatus,
    OutputStatus, ProcessResponse,
};
pub use types::{
    ConversionParameters, ConvertRequest, ConverterOptions, DownloadMethod, DownloadSelector,
    InputParameters, MarkdownConverterOptions, MarkdownSyntax, OutputParameters,
};
