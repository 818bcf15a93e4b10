//! Transcript ingestion — streaming JSONL decode and message normalization.
//!
//! A session transcript is newline-delimited JSON, one message object per
//! line. The parser keeps the four message shapes the pipeline understands,
//! silently discards everything else, and fingerprints the raw bytes so
//! callers can detect transcript changes without re-reading them.

mod message;
mod parser;

pub use message::{ContentLimit, MessageKind, ToolCall, TranscriptMessage, TRUNCATION_SUFFIX};
pub use parser::{
    LineError, LineErrorKind, ParseError, ParseResult, ParserConfig, TranscriptParser,
    MAX_LINE_BYTES, STREAM_CHANNEL_CAPACITY,
};
