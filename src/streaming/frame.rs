//! Upstream frame decoding
//!
//! Upstreams stream one JSON document per line, optionally prefixed with
//! `data: `. Two document shapes are understood; which one applies is fixed
//! per session by [`UpstreamShape`].

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Literal marker ending the upstream stream, independent of transport EOF
pub const SENTINEL: &str = "[DONE]";

/// Optional prefix some upstream variants put in front of every frame
pub const DATA_PREFIX: &str = "data: ";

/// Frame shape spoken by the configured upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamShape {
    /// Hosted completions style: `choices[0].delta.content`
    HostedCompletions,
    /// Native chat style: `message.content`
    NativeChat,
}

impl UpstreamShape {
    /// Pick the shape from the endpoint URL.
    ///
    /// Hosted providers live on `.com` hosts (including country variants such
    /// as `.com.cn`); everything else is assumed to be a local native-chat
    /// service.
    pub fn detect(url: &Url) -> Self {
        match url.host_str() {
            Some(host) if host.contains(".com") => UpstreamShape::HostedCompletions,
            _ => UpstreamShape::NativeChat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamShape::HostedCompletions => "hosted-completions",
            UpstreamShape::NativeChat => "native-chat",
        }
    }

    /// Decode one frame and extract its text delta.
    ///
    /// `Ok(None)` means the frame was well formed but carried no usable
    /// text (role-only or finish frames, or a frame of the other shape).
    pub fn extract_delta(&self, text: &str) -> Result<Option<String>, serde_json::Error> {
        let delta = match self {
            UpstreamShape::HostedCompletions => serde_json::from_str::<CompletionsFrame>(text)?
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content),
            UpstreamShape::NativeChat => serde_json::from_str::<NativeChatFrame>(text)?
                .message
                .and_then(|message| message.content),
        };

        Ok(delta.filter(|content| !content.is_empty()))
    }
}

impl fmt::Display for UpstreamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown upstream shape '{0}', expected 'hosted-completions' or 'native-chat'")]
pub struct ParseShapeError(String);

impl FromStr for UpstreamShape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hosted-completions" | "hosted" | "completions" => Ok(UpstreamShape::HostedCompletions),
            "native-chat" | "native" | "chat" => Ok(UpstreamShape::NativeChat),
            other => Err(ParseShapeError(other.to_string())),
        }
    }
}

/// One upstream line after prefix stripping
#[derive(Debug, PartialEq, Eq)]
pub enum FrameLine<'a> {
    /// The end-of-stream sentinel
    Done,
    /// A frame payload still to be decoded
    Payload(&'a str),
}

impl<'a> FrameLine<'a> {
    /// Classify a complete line; the sentinel check happens before any JSON
    /// decoding since the sentinel is not valid JSON.
    pub fn classify(line: &'a str) -> Self {
        let text = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
        if text == SENTINEL {
            FrameLine::Done
        } else {
            FrameLine::Payload(text)
        }
    }
}

/// Hosted completions chunk
#[derive(Debug, Deserialize)]
struct CompletionsFrame {
    #[serde(default)]
    choices: Vec<CompletionsChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionsChoice {
    #[serde(default)]
    delta: ContentDelta,
}

/// Native chat chunk
#[derive(Debug, Deserialize)]
struct NativeChatFrame {
    #[serde(default)]
    message: Option<ContentDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDelta {
    #[serde(default)]
    content: Option<String>,
}
