//! Connection settings for `ProjectClient`.
//!
//! Both inputs are optional at this layer so that a missing value surfaces as
//! `ApiError::MissingCredential` from construction rather than from whatever
//! code assembled the config.

use std::fmt;

/// Environment variable holding the project token.
pub const TOKEN_ENV: &str = "REDCAP_API_TOKEN";
/// Environment variable holding the API endpoint URL.
pub const HOST_ENV: &str = "REDCAP_API_URL";

#[derive(Clone, Default)]
pub struct ClientConfig {
    pub api_token: Option<String>,
    pub api_host: Option<String>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `REDCAP_API_TOKEN` and `REDCAP_API_URL`. Unset variables stay `None`.
    pub fn from_env() -> Self {
        Self {
            api_token: std::env::var(TOKEN_ENV).ok(),
            api_host: std::env::var(HOST_ENV).ok(),
        }
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn api_host(mut self, host: impl Into<String>) -> Self {
        self.api_host = Some(host.into());
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("api_host", &self.api_host)
            .finish()
    }
}
