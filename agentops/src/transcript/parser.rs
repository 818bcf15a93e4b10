//! Streaming JSONL transcript parser.
//!
//! Two modes: a synchronous bulk `parse` that returns a complete
//! [`ParseResult`], and a cooperative `parse_stream` that hands messages
//! over a bounded channel one at a time. Both are deterministic: the same
//! input bytes yield the same messages and the same checksum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Read};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::message::{normalize_content, parse_timestamp, ContentLimit};
use super::{MessageKind, TranscriptMessage};

/// Scanner buffer limit: one line may be at most 1 MiB.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Bounded capacity of the streaming message channel.
pub const STREAM_CHANNEL_CAPACITY: usize = 100;

/// Raw-sample cap carried in per-line errors.
const ERROR_SAMPLE_CHARS: usize = 100;

/// Classification of a recoverable per-line failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineErrorKind {
    /// JSON syntax failure.
    Json,
    /// Valid JSON with the wrong shape.
    Schema,
    /// Byte sequence that is not valid UTF-8.
    Encoding,
}

impl std::fmt::Display for LineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Schema => write!(f, "schema"),
            Self::Encoding => write!(f, "encoding"),
        }
    }
}

/// A recoverable per-line failure, kept when `skip_malformed` is off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineError {
    /// 1-based line number.
    pub line: usize,
    pub kind: LineErrorKind,
    pub message: String,
    /// Raw line sample, at most 100 chars.
    pub sample: String,
}

/// Fatal parser failure. Per-line JSON/schema/encoding problems are not
/// fatal; they are recorded in [`ParseResult::errors`].
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A line exceeded the scanner buffer. Carries everything parsed up to
    /// that point.
    #[error("line {line} exceeds the {limit}-byte line buffer")]
    LineTooLong {
        line: usize,
        limit: usize,
        partial: Box<ParseResult>,
    },

    /// The underlying reader failed. Carries the partial result.
    #[error("read error at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
        partial: Box<ParseResult>,
    },

    /// The caller cancelled a streaming parse.
    #[error("parse cancelled at line {line}")]
    Cancelled { line: usize },
}

/// Complete output of a bulk parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub messages: Vec<TranscriptMessage>,
    /// Every physical line read, including empty and discarded ones.
    pub total_lines: usize,
    pub malformed_lines: usize,
    /// Populated only when `skip_malformed` is off.
    pub errors: Vec<LineError>,
    /// First 16 hex chars of SHA-256 over each raw line plus `\n`.
    pub checksum: String,
    pub file_path: String,
    pub parsed_at: DateTime<Utc>,
}

impl Default for ParseResult {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            total_lines: 0,
            malformed_lines: 0,
            errors: Vec::new(),
            checksum: String::new(),
            file_path: String::new(),
            parsed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Parser knobs.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Truncate text content beyond this many bytes; 0 disables.
    pub max_content_length: usize,
    /// Count malformed lines without returning them (default on).
    pub skip_malformed: bool,
    /// Scanner line buffer limit.
    pub max_line_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_content_length: 0,
            skip_malformed: true,
            max_line_bytes: MAX_LINE_BYTES,
        }
    }
}

/// The transcript parser. Pure: no filesystem or environment dependencies
/// beyond the reader handed in.
#[derive(Debug, Clone, Default)]
pub struct TranscriptParser {
    config: ParserConfig,
}

impl TranscriptParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a whole reader synchronously.
    pub fn parse<R: Read>(&self, reader: R) -> Result<ParseResult, ParseError> {
        self.parse_named(reader, "")
    }

    /// Parse a file from disk, recording its path in the result.
    pub fn parse_file(&self, path: impl AsRef<std::path::Path>) -> Result<ParseResult, ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ParseError::Io {
            line: 0,
            source,
            partial: Box::new(ParseResult::default()),
        })?;
        self.parse_named(file, &path.to_string_lossy())
    }

    /// Parse with an explicit `file_path` label.
    pub fn parse_named<R: Read>(
        &self,
        reader: R,
        file_path: &str,
    ) -> Result<ParseResult, ParseError> {
        let mut state = ParseState::new(&self.config, file_path);
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(4096);

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| ParseError::Io {
                    line: state.line,
                    source,
                    partial: Box::new(state.snapshot()),
                })?;
            if read == 0 {
                break;
            }
            state.line += 1;
            if let Err(fatal) = state.consume_line(&buf) {
                return Err(fatal);
            }
        }

        let result = state.finish();
        debug!(
            messages = result.messages.len(),
            malformed = result.malformed_lines,
            checksum = %result.checksum,
            "transcript parsed"
        );
        Ok(result)
    }

    /// Streaming mode: messages arrive one at a time over a bounded channel
    /// (capacity [`STREAM_CHANNEL_CAPACITY`]); the one-slot error channel
    /// carries at most the first fatal error. Both channels close on EOF,
    /// on the first fatal error, or on cancellation.
    pub fn parse_stream<R: Read + Send + 'static>(
        &self,
        reader: R,
        cancel: CancellationToken,
    ) -> (
        mpsc::Receiver<TranscriptMessage>,
        mpsc::Receiver<ParseError>,
    ) {
        let (msg_tx, msg_rx) = mpsc::channel::<TranscriptMessage>(STREAM_CHANNEL_CAPACITY);
        let (err_tx, err_rx) = mpsc::channel::<ParseError>(1);
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            let mut state = ParseState::new(&config, "");
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::with_capacity(4096);

            loop {
                if cancel.is_cancelled() {
                    let _ = err_tx.try_send(ParseError::Cancelled { line: state.line });
                    break;
                }
                buf.clear();
                let read = match reader.read_until(b'\n', &mut buf) {
                    Ok(n) => n,
                    Err(source) => {
                        let _ = err_tx.try_send(ParseError::Io {
                            line: state.line,
                            source,
                            partial: Box::new(state.snapshot()),
                        });
                        break;
                    }
                };
                if read == 0 {
                    break;
                }
                state.line += 1;
                let before = state.messages.len();
                if let Err(fatal) = state.consume_line(&buf) {
                    let _ = err_tx.try_send(fatal);
                    break;
                }
                if state.messages.len() > before {
                    let message = state.messages.last().expect("just pushed").clone();
                    if msg_tx.blocking_send(message).is_err() {
                        // Receiver dropped; stop at the record boundary.
                        break;
                    }
                }
            }
            // Dropping the senders closes the message channel first, then
            // the error channel.
            drop(msg_tx);
            drop(err_tx);
        });

        (msg_rx, err_rx)
    }
}

/// Accumulator shared by the bulk and streaming paths.
struct ParseState {
    limit: ContentLimit,
    skip_malformed: bool,
    max_line_bytes: usize,
    file_path: String,
    line: usize,
    messages: Vec<TranscriptMessage>,
    malformed: usize,
    errors: Vec<LineError>,
    hasher: Sha256,
}

impl ParseState {
    fn new(config: &ParserConfig, file_path: &str) -> Self {
        Self {
            limit: ContentLimit(config.max_content_length),
            skip_malformed: config.skip_malformed,
            max_line_bytes: config.max_line_bytes,
            file_path: file_path.to_string(),
            line: 0,
            messages: Vec::new(),
            malformed: 0,
            errors: Vec::new(),
            hasher: Sha256::new(),
        }
    }

    /// Process one raw line, newline included. Returns a fatal error for
    /// scanner-level failures only.
    fn consume_line(&mut self, raw: &[u8]) -> Result<(), ParseError> {
        let body = strip_line_ending(raw);
        if body.len() > self.max_line_bytes {
            return Err(ParseError::LineTooLong {
                line: self.line,
                limit: self.max_line_bytes,
                partial: Box::new(self.snapshot()),
            });
        }

        // The checksum covers every scanned line, one separator each,
        // whether or not the trailing newline was present in the input.
        self.hasher.update(body);
        self.hasher.update(b"\n");

        if body.is_empty() {
            return Ok(());
        }

        let text = match std::str::from_utf8(body) {
            Ok(t) => t,
            Err(e) => {
                self.record_error(LineErrorKind::Encoding, e.to_string(), body);
                return Ok(());
            }
        };

        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                let kind = classify_decode_error(&e.to_string());
                self.record_error(kind, e.to_string(), body);
                return Ok(());
            }
        };

        let Some(object) = value.as_object() else {
            self.record_error(
                LineErrorKind::Schema,
                "expected a message object".to_string(),
                body,
            );
            return Ok(());
        };

        let wire_type = object.get("type").and_then(Value::as_str).unwrap_or("");
        let Some(kind) = MessageKind::from_wire(wire_type) else {
            // Unknown types are discarded silently; they are not malformed.
            return Ok(());
        };

        // Content lives either at the top level or nested under `message`.
        let nested = object.get("message").and_then(Value::as_object);
        let content = object
            .get("content")
            .or_else(|| nested.and_then(|m| m.get("content")))
            .cloned()
            .unwrap_or(Value::String(String::new()));

        let Some((text, tools)) = normalize_content(&content, self.limit) else {
            self.record_error(
                LineErrorKind::Schema,
                "tool_use block missing name".to_string(),
                body,
            );
            return Ok(());
        };

        let role = object
            .get("role")
            .or_else(|| nested.and_then(|m| m.get("role")))
            .and_then(Value::as_str)
            .unwrap_or(wire_type)
            .to_string();

        let session_id = object
            .get("session_id")
            .or_else(|| object.get("sessionId"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let timestamp = parse_timestamp(object.get("timestamp").and_then(Value::as_str));

        self.messages.push(TranscriptMessage {
            kind,
            timestamp,
            role,
            content: text,
            session_id,
            message_index: self.messages.len(),
            tools,
        });
        Ok(())
    }

    fn record_error(&mut self, kind: LineErrorKind, message: String, raw: &[u8]) {
        self.malformed += 1;
        if !self.skip_malformed {
            let sample: String = String::from_utf8_lossy(raw)
                .chars()
                .take(ERROR_SAMPLE_CHARS)
                .collect();
            self.errors.push(LineError {
                line: self.line,
                kind,
                message,
                sample,
            });
        }
    }

    /// Result as of now, checksum over the lines scanned so far.
    fn snapshot(&self) -> ParseResult {
        ParseResult {
            messages: self.messages.clone(),
            total_lines: self.line,
            malformed_lines: self.malformed,
            errors: self.errors.clone(),
            checksum: hex_prefix(self.hasher.clone().finalize().as_slice()),
            file_path: self.file_path.clone(),
            parsed_at: Utc::now(),
        }
    }

    fn finish(self) -> ParseResult {
        ParseResult {
            messages: self.messages,
            total_lines: self.line,
            malformed_lines: self.malformed,
            errors: self.errors,
            checksum: hex_prefix(self.hasher.finalize().as_slice()),
            file_path: self.file_path,
            parsed_at: Utc::now(),
        }
    }
}

fn strip_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

/// First 8 bytes of the digest as 16 hex chars.
fn hex_prefix(digest: &[u8]) -> String {
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Sort a decoder failure into the error taxonomy by message inspection.
fn classify_decode_error(message: &str) -> LineErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("utf-8") || lower.contains("utf8") {
        return LineErrorKind::Encoding;
    }
    if lower.contains("invalid type")
        || lower.contains("missing field")
        || lower.contains("unknown variant")
        || lower.contains("invalid value")
    {
        return LineErrorKind::Schema;
    }
    LineErrorKind::Json
}
