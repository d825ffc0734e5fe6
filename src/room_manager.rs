use std::collections::BTreeMap;

use crate::config::{ConfigValidationError, RoomConfig, RoomConfigPatch};
use crate::engine::Room;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Manual,
    TimeoutEmpty,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Manual => "manual",
            CloseReason::TimeoutEmpty => "timeout_empty",
        }
    }
}

/// What a close left behind: the sessions that still need their goodbye
/// frames. The caller owns delivery; the manager only owns room state.
#[derive(Debug)]
pub struct ClosedRoom {
    pub id: String,
    pub reason: CloseReason,
    pub session_ids: Vec<String>,
}

/// Owns every room in the process. Rooms are keyed in a BTreeMap so that
/// slot scans and the GC sweep walk them in one reproducible order.
#[derive(Debug)]
pub struct RoomManager {
    rooms: BTreeMap<String, Room>,
    default_config: RoomConfig,
    next_room_seq: u64,
    seed_state: u32,
}

impl RoomManager {
    pub fn new(default_config: RoomConfig, master_seed: u32) -> Self {
        Self {
            rooms: BTreeMap::new(),
            default_config,
            next_room_seq: 1,
            seed_state: master_seed,
        }
    }

    fn next_seed(&mut self) -> u32 {
        self.seed_state = self
            .seed_state
            .wrapping_mul(747_796_405)
            .wrapping_add(2_891_336_453);
        self.seed_state
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Room> {
        self.rooms.values_mut()
    }

    pub fn default_config(&self) -> &RoomConfig {
        &self.default_config
    }

    /// Replaces the template used by subsequent creates. Existing rooms
    /// keep the configuration they were stamped with.
    pub fn set_default(&mut self, patch: &RoomConfigPatch) -> Result<RoomConfig, ConfigValidationError> {
        let merged = patch.apply(&self.default_config)?;
        self.default_config = merged.clone();
        Ok(merged)
    }

    /// First open room with a free slot wins; otherwise a fresh room from
    /// the current default. Returns the room id and whether it was created.
    pub fn find_or_create_with_slot(&mut self, now_ms: u64) -> (String, bool) {
        for room in self.rooms.values() {
            if room.has_slot() {
                return (room.id.clone(), false);
            }
        }
        let room = self.create_from(self.default_config.clone(), now_ms);
        (room, true)
    }

    pub fn create(
        &mut self,
        patch: &RoomConfigPatch,
        now_ms: u64,
    ) -> Result<String, ConfigValidationError> {
        let config = patch.apply(&self.default_config)?;
        Ok(self.create_from(config, now_ms))
    }

    fn create_from(&mut self, config: RoomConfig, now_ms: u64) -> String {
        let seq = self.next_room_seq;
        self.next_room_seq += 1;
        let id = format!("room_{seq}");
        let seed = self.next_seed();
        self.rooms
            .insert(id.clone(), Room::new(id.clone(), config, seed, now_ms));
        id
    }

    /// Marks closed and removes the room, handing back the sessions that
    /// were still bound to it. A second close of the same id is not found.
    pub fn close(&mut self, id: &str, reason: CloseReason) -> Option<ClosedRoom> {
        let mut room = self.rooms.remove(id)?;
        room.closed = true;
        let session_ids = room
            .players()
            .map(|player| player.session_id.clone())
            .collect();
        Some(ClosedRoom {
            id: room.id,
            reason,
            session_ids,
        })
    }

    /// Empty-room GC, run once per tick. Stamps `empty_since` the first
    /// time a room is seen empty, clears it when occupied again, and
    /// closes rooms whose TTL elapsed. TTL 0 disables the timer.
    pub fn sweep_empty(&mut self, now_ms: u64) -> Vec<ClosedRoom> {
        let mut expired: Vec<String> = Vec::new();
        for room in self.rooms.values_mut() {
            if room.player_count() > 0 {
                room.empty_since = None;
                continue;
            }
            let since = *room.empty_since.get_or_insert(now_ms);
            let ttl = room.config.empty_room_ttl_seconds;
            if ttl > 0 && now_ms.saturating_sub(since) >= ttl * 1_000 {
                expired.push(room.id.clone());
            }
        }
        expired
            .iter()
            .filter_map(|id| self.close(id, CloseReason::TimeoutEmpty))
            .collect()
    }
}
