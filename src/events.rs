use std::collections::VecDeque;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::constants::EVENT_LOG_CAP;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerJoined,
    PlayerDied,
    RoomCreated,
    RoomClosed,
    Kick,
    Ban,
    InputSpoof,
    SessionEvicted,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventEntry {
    pub seq: u64,
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub at: String,
    pub kind: EventKind,
    #[serde(rename = "roomId", skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(rename = "playerId", skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub message: String,
}

/// Bounded, sequence-numbered ring of recent moderation/lifecycle events.
/// Sequence numbers let spectators resume from where they left off.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<EventEntry>,
    next_seq: u64,
    cap: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAP)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(cap.min(64)),
            next_seq: 1,
            cap,
        }
    }

    pub fn push(
        &mut self,
        now_ms: u64,
        kind: EventKind,
        room_id: Option<&str>,
        player_id: Option<&str>,
        message: impl Into<String>,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        while self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(EventEntry {
            seq,
            at_ms: now_ms,
            at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            room_id: room_id.map(str::to_string),
            player_id: player_id.map(str::to_string),
            message: message.into(),
        });
        seq
    }

    pub fn recent(&self, limit: usize) -> Vec<EventEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries with seq strictly greater than `cursor`, oldest first.
    pub fn since(&self, cursor: u64) -> Vec<EventEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.seq > cursor)
            .cloned()
            .collect()
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
