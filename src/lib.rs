//! Chat Relay - streaming relay between chat clients and an inference upstream
//!
//! This library provides the core functionality for the relay server. It
//! forwards a conversation to the configured upstream and re-streams the
//! upstream's incremental output as cumulative `{"finalMessage": ...}`
//! objects.

pub mod config;
pub mod conversation;
pub mod error;
pub mod routes;
pub mod streaming;
pub mod upstream;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::Config;
pub use crate::streaming::UpstreamShape;
pub use crate::upstream::{ChatUpstream, UpstreamClient};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Upstream every chat is forwarded to
    pub upstream: Arc<dyn ChatUpstream>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // Connect timeout only; streamed bodies have no overall deadline
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()?;

        let upstream: Arc<dyn ChatUpstream> = Arc::new(UpstreamClient::new(http_client, &config)?);

        Ok(Self::with_upstream(config, upstream))
    }

    /// Create an application state around an existing upstream
    pub fn with_upstream(config: Config, upstream: Arc<dyn ChatUpstream>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            upstream,
        }
    }
}
