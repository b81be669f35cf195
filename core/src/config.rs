//! Client settings.
//!
//! Settings are plain values handed to `ConversionClient::new`; the client
//! never reloads or mutates them. `ClientSettings::from_env` is a convenience
//! for binaries and tests that keep credentials in the environment.

use std::fmt;

use crate::error::ConvertError;

pub const DEFAULT_PROCESS_URL: &str = "https://api.cloudconvert.com/process";
pub const DEFAULT_SCHEME: &str = "https";

pub const ENV_API_KEY: &str = "CONVERT_API_KEY";
pub const ENV_PROCESS_URL: &str = "CONVERT_PROCESS_URL";
pub const ENV_AUTH_MODE: &str = "CONVERT_AUTH_MODE";
pub const ENV_URL_SCHEME: &str = "CONVERT_URL_SCHEME";

/// How the API key reaches the service during process negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// `authorization: Bearer <key>` header.
    #[default]
    Header,
    /// `apikey` field in the request body.
    Body,
}

impl std::str::FromStr for AuthMode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(AuthMode::Header),
            "body" => Ok(AuthMode::Body),
            other => Err(ConvertError::invalid(format!(
                "unknown auth mode '{other}', expected 'header' or 'body'"
            ))),
        }
    }
}

/// Connection settings for `ConversionClient`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_key: String,
    /// Fixed endpoint for process negotiation.
    pub process_url: String,
    pub auth_mode: AuthMode,
    /// Scheme used to qualify protocol-relative URLs returned by the service.
    pub scheme: String,
}

impl ClientSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            process_url: DEFAULT_PROCESS_URL.to_string(),
            auth_mode: AuthMode::default(),
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }

    pub fn with_process_url(mut self, url: impl Into<String>) -> Self {
        self.process_url = url.into();
        self
    }

    pub fn with_auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = mode;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into().trim_end_matches(':').to_string();
        self
    }

    /// Read settings from `CONVERT_*` environment variables.
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConvertError> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConvertError::invalid(format!("{ENV_API_KEY} is not set")))?;

        let mut settings = ClientSettings::new(api_key);
        if let Some(url) = lookup(ENV_PROCESS_URL).filter(|u| !u.trim().is_empty()) {
            settings = settings.with_process_url(url);
        }
        if let Some(mode) = lookup(ENV_AUTH_MODE) {
            settings = settings.with_auth_mode(mode.parse()?);
        }
        if let Some(scheme) = lookup(ENV_URL_SCHEME).filter(|s| !s.trim().is_empty()) {
            settings = settings.with_scheme(scheme);
        }
        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn validate(&self) -> Result<(), ConvertError> {
        if self.api_key.trim().is_empty() {
            return Err(ConvertError::invalid("api key must not be empty"));
        }
        if self.process_url.trim().is_empty() {
            return Err(ConvertError::invalid("process url must not be empty"));
        }
        if self.scheme.trim().is_empty() {
            return Err(ConvertError::invalid("url scheme must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("api_key", &"<redacted>")
            .field("process_url", &self.process_url)
            .field("auth_mode", &self.auth_mode)
            .field("scheme", &self.scheme)
            .finish()
    }
}
