//! Memory packets — one-shot handoff files between sessions.
//!
//! A hook drops a packet into `handoff/pending/`; the next session consumes
//! it exactly once. Valid packets are marked consumed and moved to
//! `handoff/consumed/`; malformed packets are quarantined so the pending
//! queue cannot accumulate poison files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::layout::AgentsLayout;

/// Current packet schema version.
pub const PACKET_SCHEMA_VERSION: u32 = 1;

/// One handoff packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPacket {
    pub schema_version: u32,
    pub packet_type: String,
    pub handoff_file: String,
    pub payload: Value,
    #[serde(default)]
    pub consumed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl MemoryPacket {
    pub fn new(packet_type: impl Into<String>, payload: Value) -> Self {
        Self {
            schema_version: PACKET_SCHEMA_VERSION,
            packet_type: packet_type.into(),
            handoff_file: String::new(),
            payload,
            consumed: false,
            consumed_at: None,
        }
    }

    /// Structural validity: versioned and tagged.
    fn is_valid(&self) -> bool {
        self.schema_version >= 1 && !self.packet_type.is_empty()
    }
}

/// Handoff failures.
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("packet not found: {name}")]
    NotFound { name: String },

    /// The packet failed to decode or validate and was moved to
    /// quarantine.
    #[error("packet {name} is malformed and was quarantined")]
    Quarantined { name: String },

    /// The packet was already consumed; one-shot means one shot.
    #[error("packet {name} was already consumed")]
    AlreadyConsumed { name: String },

    #[error("handoff I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("handoff JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The pending/consumed/quarantined packet directories for one repo.
pub struct HandoffQueue {
    pending: PathBuf,
    consumed: PathBuf,
    quarantined: PathBuf,
}

impl HandoffQueue {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let layout = AgentsLayout::new(base);
        Self {
            pending: layout.handoff_pending(),
            consumed: layout.handoff_consumed(),
            quarantined: layout.handoff_quarantined(),
        }
    }

    /// Write a packet into `pending/` under `<name>.json`.
    pub fn enqueue(&self, name: &str, packet: &MemoryPacket) -> Result<PathBuf, HandoffError> {
        std::fs::create_dir_all(&self.pending)?;
        let path = self.pending.join(format!("{name}.json"));
        let mut packet = packet.clone();
        packet.handoff_file = path.to_string_lossy().to_string();

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&packet)?)?;
        std::fs::rename(&tmp, &path)?;
        debug!(name, packet_type = %packet.packet_type, "packet enqueued");
        Ok(path)
    }

    /// Names of packets waiting in `pending/`, sorted.
    pub fn list_pending(&self) -> Result<Vec<String>, HandoffError> {
        if !self.pending.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = std::fs::read_dir(&self.pending)?
            .filter_map(Result::ok)
            .map(|d| d.path())
            .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Consume one packet by name: validate, mark consumed, move to
    /// `consumed/`. Malformed packets move to `quarantined/` instead and
    /// the caller gets [`HandoffError::Quarantined`].
    pub fn consume(&self, name: &str) -> Result<MemoryPacket, HandoffError> {
        let path = self.pending.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(HandoffError::NotFound {
                name: name.to_string(),
            });
        }

        let text = std::fs::read_to_string(&path)?;
        let packet: Option<MemoryPacket> = serde_json::from_str(&text).ok();
        let Some(mut packet) = packet.filter(MemoryPacket::is_valid) else {
            std::fs::create_dir_all(&self.quarantined)?;
            std::fs::rename(&path, self.quarantined.join(format!("{name}.json")))?;
            warn!(name, "malformed handoff packet quarantined");
            return Err(HandoffError::Quarantined {
                name: name.to_string(),
            });
        };

        if packet.consumed {
            return Err(HandoffError::AlreadyConsumed {
                name: name.to_string(),
            });
        }

        packet.consumed = true;
        packet.consumed_at = Some(Utc::now());

        std::fs::create_dir_all(&self.consumed)?;
        let dest = self.consumed.join(format!("{name}.json"));
        let tmp = dest.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&packet)?)?;
        std::fs::rename(&tmp, &dest)?;
        std::fs::remove_file(&path)?;

        debug!(name, packet_type = %packet.packet_type, "packet consumed");
        Ok(packet)
    }

    /// Consume everything pending, collecting the valid packets and
    /// quarantining the rest.
    pub fn consume_all(&self) -> Result<Vec<MemoryPacket>, HandoffError> {
        let mut packets = Vec::new();
        for name in self.list_pending()? {
            match self.consume(&name) {
                Ok(packet) => packets.push(packet),
                Err(HandoffError::Quarantined { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(packets)
    }
}
