//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use reqwest::Url;
use std::env;

use crate::streaming::UpstreamShape;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Upstream inference endpoint (full URL, not a base)
    pub upstream_url: String,
    /// Bearer token for the upstream, omitted from requests when absent
    pub upstream_token: Option<String>,
    /// Model identifier forwarded verbatim
    pub upstream_model: String,
    /// Frame shape the upstream speaks
    pub upstream_shape: UpstreamShape,

    /// Connect timeout for upstream calls (in seconds)
    pub connect_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `from_env` is the production entry point; this exists so parsing can
    /// be exercised without touching process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstream_url = lookup("OLLAMA_URL").context("OLLAMA_URL must be set")?;
        let parsed_url = Url::parse(&upstream_url)
            .with_context(|| format!("Invalid OLLAMA_URL: {}", upstream_url))?;

        let upstream_shape = match lookup("UPSTREAM_SHAPE") {
            Some(value) => value.parse().context("Invalid UPSTREAM_SHAPE")?,
            None => UpstreamShape::detect(&parsed_url),
        };

        Ok(Self {
            host: lookup("RELAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("RELAY_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            upstream_url,
            upstream_token: lookup("OLLAMA_TOKEN").filter(|token| !token.is_empty()),
            upstream_model: lookup("OLLAMA_MODEL").context("OLLAMA_MODEL must be set")?,
            upstream_shape,

            connect_timeout_seconds: lookup("UPSTREAM_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or_else(|| "10".to_string())
                .parse()
                .context("Invalid UPSTREAM_CONNECT_TIMEOUT_SECONDS")?,
        })
    }
}
