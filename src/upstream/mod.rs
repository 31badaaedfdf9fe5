//! Upstream module
//!
//! Handles request forwarding to the inference upstream.

pub mod client;
pub mod headers;
pub mod logging;

pub use client::{ByteStream, ChatUpstream, UpstreamClient};
pub use logging::RequestContext;
