use anyhow::{Context, Result};
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde::Deserialize;
use std::time::Duration;

use crate::http::Headers;

pub const DEFAULT_USER_AGENT: &str = "http-driver";

/// Settings for building a reqwest-backed [`HttpDriver`](crate::HttpDriver).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverConfig {
    pub base_url: Option<String>,
    pub user_agent: String,
    /// Whole-request timeout applied by the client to every call.
    pub timeout_secs: Option<u64>,
    /// Headers sent with every request, on top of per-call headers.
    pub default_headers: Headers,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            default_headers: Headers::new(),
        }
    }
}

impl DriverConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse driver config")
    }

    pub fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid default header name '{}'", name))?;
            let mut value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for default header '{}'", name))?;
            if name == AUTHORIZATION {
                value.set_sensitive(true);
                debug!("Sending an Authorization header with every request");
            }
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(headers);
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        builder.build().context("Failed to build HTTP client")
    }
}
