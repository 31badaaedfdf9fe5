//! Streaming relay
//!
//! Reassembles upstream lines, decodes frames of either supported shape and
//! re-emits the accumulated text as cumulative `{"finalMessage": ...}`
//! objects.

pub mod frame;
pub mod line_buffer;
pub mod translator;

pub use frame::{FrameLine, UpstreamShape, SENTINEL};
pub use line_buffer::LineBuffer;
pub use translator::{relay_stream, OutboundFrame, StreamTranslator, Termination, TranslationStats};
