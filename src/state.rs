use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ConfigValidationError, RoomConfig, RoomConfigPatch};
use crate::constants::MAX_NAME_LEN;
use crate::events::{EventKind, EventLog};
use crate::geometry::normalize_angle;
use crate::metrics::{inc, Metrics};
use crate::protocol::{parse_client_message, ClientMessage};
use crate::room_manager::{CloseReason, ClosedRoom, RoomManager};
use crate::session::{
    OutboundMessage, Session, CLOSE_BANNED, CLOSE_INACTIVE, CLOSE_KICKED, CLOSE_NORMAL,
};
use crate::types::{PlayerAdminView, RoomSummary};

pub type SharedState = Arc<tokio::sync::Mutex<ServerState>>;

/// Monotonic process clock; everything stateful takes explicit
/// millisecond timestamps derived from it, which keeps `serverNow`
/// non-decreasing and tests free to drive time by hand.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// An admin dashboard connection watching one room.
#[derive(Debug)]
pub struct AdminSpectator {
    pub id: String,
    pub tx: mpsc::Sender<OutboundMessage>,
    pub room_id: Option<String>,
    pub event_cursor: u64,
}

/// Everything the process mutates lives here, behind one coarse lock at
/// the call site. Handlers never suspend while working on it.
pub struct ServerState {
    pub sessions: HashMap<String, Session>,
    pub rooms: RoomManager,
    pub banned_names: HashSet<String>,
    pub events: EventLog,
    pub metrics: Arc<Metrics>,
    pub spectators: HashMap<String, AdminSpectator>,
    pub broadcast_rate_hz: u32,
    next_session_seq: u64,
    next_spectator_seq: u64,
}

impl ServerState {
    pub fn new(
        default_config: RoomConfig,
        master_seed: u32,
        broadcast_rate_hz: u32,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            rooms: RoomManager::new(default_config, master_seed),
            banned_names: HashSet::new(),
            events: EventLog::new(),
            metrics,
            spectators: HashMap::new(),
            broadcast_rate_hz,
            next_session_seq: 1,
            next_spectator_seq: 1,
        }
    }

    // ---- session lifecycle ------------------------------------------------

    pub fn open_session(&mut self, tx: mpsc::Sender<OutboundMessage>, now_ms: u64) -> String {
        let seq = self.next_session_seq;
        self.next_session_seq += 1;
        let id = format!("session_{seq}");
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), tx, now_ms));
        inc(&self.metrics.sessions_opened);
        self.send_to_session(
            &id,
            &json!({
                "type": "welcome",
                "sessionId": id,
                "serverNow": now_ms,
            }),
        );
        id
    }

    /// Transport-level disconnect. The bound player, if any, is freed by
    /// the room; no death drops for a plain disconnect.
    pub fn close_session(&mut self, session_id: &str, now_ms: u64) {
        let Some(session) = self.sessions.remove(session_id) else {
            return;
        };
        inc(&self.metrics.sessions_closed);
        if let (Some(room_id), Some(player_id)) = (session.room_id, session.player_id) {
            if let Some(room) = self.rooms.get_mut(&room_id) {
                room.remove_player(&player_id, now_ms);
            }
        }
    }

    // ---- inbound frames ---------------------------------------------------

    pub fn handle_message(&mut self, session_id: &str, raw: &str, now_ms: u64) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        session.touch(now_ms);
        let Some(message) = parse_client_message(raw) else {
            return;
        };
        match message {
            ClientMessage::Hello { name } => self.handle_hello(session_id, &name, now_ms),
            ClientMessage::Input {
                player_id,
                direction_rad,
                boosting,
            } => self.handle_input(session_id, &player_id, direction_rad, boosting, now_ms),
            ClientMessage::Ping { ping_id } => {
                self.send_to_session(
                    session_id,
                    &json!({
                        "type": "pong",
                        "now": now_ms,
                        "pingId": ping_id,
                    }),
                );
            }
            ClientMessage::Pong { ping_id } => self.handle_pong(session_id, ping_id, now_ms),
            ClientMessage::Unknown => {}
        }
    }

    fn handle_hello(&mut self, session_id: &str, raw_name: &str, now_ms: u64) {
        let already_bound = self
            .sessions
            .get(session_id)
            .map(|session| session.is_bound())
            .unwrap_or(true);
        if already_bound {
            return;
        }

        let name: String = raw_name.trim().chars().take(MAX_NAME_LEN).collect();
        if name.is_empty() {
            self.send_error(session_id, "INVALID_NAME");
            return;
        }
        if self.banned_names.contains(&name.to_lowercase()) {
            self.send_error(session_id, "BANNED");
            return;
        }

        let (room_id, created) = self.rooms.find_or_create_with_slot(now_ms);
        if created {
            inc(&self.metrics.rooms_created);
            self.events.push(
                now_ms,
                EventKind::RoomCreated,
                Some(&room_id),
                None,
                "room opened for join",
            );
        }
        let player_id = {
            let room = self
                .rooms
                .get_mut(&room_id)
                .expect("room was just found or created");
            room.add_player(&name, session_id).id.clone()
        };
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.bind(&room_id, &player_id);
        }
        inc(&self.metrics.players_joined);
        self.events.push(
            now_ms,
            EventKind::PlayerJoined,
            Some(&room_id),
            Some(&player_id),
            format!("{name} joined"),
        );
        info!(room = %room_id, player = %player_id, "player joined");
        self.send_to_session(
            session_id,
            &json!({
                "type": "joined",
                "roomId": room_id,
                "playerId": player_id,
            }),
        );
    }

    fn handle_input(
        &mut self,
        session_id: &str,
        player_id: &str,
        direction_rad: Option<f64>,
        boosting: Option<bool>,
        now_ms: u64,
    ) {
        let bound_room = self
            .sessions
            .get(session_id)
            .and_then(|session| session.room_id.clone());
        let owns_player = bound_room
            .as_deref()
            .and_then(|room_id| self.rooms.get(room_id))
            .and_then(|room| room.player(player_id))
            .map(|player| player.session_id == session_id)
            .unwrap_or(false);
        if !owns_player {
            inc(&self.metrics.input_spoof_rejected);
            warn!(
                session = %session_id,
                player = %player_id,
                "input addressed to a player this session does not own"
            );
            self.events.push(
                now_ms,
                EventKind::InputSpoof,
                bound_room.as_deref(),
                Some(player_id),
                "input rejected: session/player mismatch",
            );
            return;
        }

        let session = self
            .sessions
            .get_mut(session_id)
            .expect("ownership check found the session");
        if !session.bucket.try_take(now_ms) {
            inc(&self.metrics.input_throttled);
            return;
        }

        if let Some(direction) = direction_rad {
            if !direction.is_finite() {
                inc(&self.metrics.input_invalid);
                warn!(session = %session_id, "non-finite steering direction");
                return;
            }
        }

        let room_id = bound_room.expect("ownership check implies a bound room");
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.apply_input(player_id, direction_rad.map(normalize_angle), boosting);
        }
        inc(&self.metrics.input_accepted);
    }

    fn handle_pong(&mut self, session_id: &str, ping_id: u64, now_ms: u64) {
        let rtt = self
            .sessions
            .get_mut(session_id)
            .and_then(|session| session.note_pong(ping_id, now_ms));
        if let Some(rtt) = rtt {
            self.send_to_session(
                session_id,
                &json!({
                    "type": "latency",
                    "rttMs": rtt,
                }),
            );
        }
    }

    // ---- periodic drivers -------------------------------------------------

    /// One simulation step for every room, death delivery, then the
    /// empty-room GC.
    pub fn tick_all(&mut self, now_ms: u64, dt: f64) {
        let mut deaths = Vec::new();
        for room_id in self.rooms.ids() {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };
            let started = Instant::now();
            let report = room.step(now_ms, dt);
            room.record_tick_duration(started.elapsed().as_secs_f64() * 1_000.0);
            for death in report.deaths {
                deaths.push((room_id.clone(), death));
            }
        }

        for (room_id, death) in deaths {
            inc(&self.metrics.players_died);
            self.events.push(
                now_ms,
                EventKind::PlayerDied,
                Some(&room_id),
                Some(&death.player_id),
                format!("{} died with score {}", death.name, death.score.round()),
            );
            self.send_to_session(
                &death.session_id,
                &json!({
                    "type": "dead",
                    "playerId": death.player_id,
                    "score": death.score,
                }),
            );
            if let Some(session) = self.sessions.get_mut(&death.session_id) {
                session.unbind();
            }
        }

        for closed in self.rooms.sweep_empty(now_ms) {
            inc(&self.metrics.rooms_closed_timeout);
            self.finish_room_close(closed, now_ms);
        }
    }

    /// Per-recipient fan-out for every open room. The caller decides the
    /// cadence; anything from 5 to 20 Hz is in spec.
    pub fn broadcast_all(&mut self, now_ms: u64) {
        let mut outbound: Vec<(String, Value)> = Vec::new();
        for room_id in self.rooms.ids() {
            let Some(room) = self.rooms.get_mut(&room_id) else {
                continue;
            };
            if room.closed {
                continue;
            }
            let recipients: Vec<(String, String)> = room
                .players()
                .map(|player| (player.id.clone(), player.session_id.clone()))
                .collect();
            for (player_id, session_id) in recipients {
                if let Some(snapshot) = room.build_state_snapshot(&player_id, now_ms) {
                    outbound.push((
                        session_id,
                        json!({
                            "type": "state",
                            "snapshot": snapshot,
                        }),
                    ));
                }
            }
            room.last_broadcast_at = now_ms;
        }
        for (session_id, frame) in outbound {
            self.send_to_session(&session_id, &frame);
        }
    }

    /// Server-initiated ping to every session; the id doubles as the send
    /// timestamp.
    pub fn heartbeat(&mut self, now_ms: u64) {
        let session_ids: Vec<String> = self.sessions.keys().cloned().collect();
        for session_id in session_ids {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.note_ping_sent(now_ms);
            }
            self.send_to_session(
                &session_id,
                &json!({
                    "type": "ping",
                    "id": now_ms,
                }),
            );
        }
    }

    /// Evicts sessions that stopped answering pings or went silent for
    /// too long.
    pub fn sweep_idle(&mut self, now_ms: u64) -> Vec<String> {
        let stale: Vec<String> = self
            .sessions
            .values()
            .filter(|session| session.is_inactive(now_ms))
            .map(|session| session.id.clone())
            .collect();
        for session_id in &stale {
            debug!(session = %session_id, "evicting inactive session");
            self.events.push(
                now_ms,
                EventKind::SessionEvicted,
                None,
                None,
                format!("{session_id} evicted as inactive"),
            );
            self.send_close(session_id, CLOSE_INACTIVE, "inactive");
            self.close_session(session_id, now_ms);
        }
        stale
    }

    /// Pushes roster snapshots and fresh log entries to subscribed admin
    /// spectators.
    pub fn push_spectator_updates(&mut self, now_ms: u64) {
        let mut outbound: Vec<(String, Value)> = Vec::new();
        let spectator_ids: Vec<String> = self.spectators.keys().cloned().collect();
        for spectator_id in spectator_ids {
            let (room_id, cursor) = {
                let spectator = &self.spectators[&spectator_id];
                (spectator.room_id.clone(), spectator.event_cursor)
            };
            if let Some(room_id) = room_id {
                if let Some(room) = self.rooms.get(&room_id) {
                    outbound.push((
                        spectator_id.clone(),
                        json!({
                            "type": "snapshot",
                            "roomId": room_id,
                            "serverNow": now_ms,
                            "players": self.room_players(&room_id),
                            "foodCount": room.food_count(),
                            "config": room.config,
                        }),
                    ));
                }
            }
            let fresh = self.events.since(cursor);
            if let Some(last) = fresh.last() {
                if let Some(spectator) = self.spectators.get_mut(&spectator_id) {
                    spectator.event_cursor = last.seq;
                }
            }
            for entry in fresh {
                outbound.push((spectator_id.clone(), json!({ "type": "log", "entry": entry })));
            }
        }
        for (spectator_id, frame) in outbound {
            self.send_to_spectator(&spectator_id, &frame);
        }
    }

    // ---- moderation and admin ---------------------------------------------

    pub fn close_room(&mut self, room_id: &str, reason: CloseReason, now_ms: u64) -> bool {
        let Some(closed) = self.rooms.close(room_id, reason) else {
            return false;
        };
        match reason {
            CloseReason::Manual => inc(&self.metrics.rooms_closed_manual),
            CloseReason::TimeoutEmpty => inc(&self.metrics.rooms_closed_timeout),
        }
        self.finish_room_close(closed, now_ms);
        true
    }

    fn finish_room_close(&mut self, closed: ClosedRoom, now_ms: u64) {
        self.events.push(
            now_ms,
            EventKind::RoomClosed,
            Some(&closed.id),
            None,
            format!("room closed ({})", closed.reason.as_str()),
        );
        info!(room = %closed.id, reason = closed.reason.as_str(), "room closed");
        for session_id in &closed.session_ids {
            self.send_close(session_id, CLOSE_NORMAL, "room closed");
            if let Some(session) = self.sessions.get_mut(session_id) {
                session.unbind();
            }
        }
        let watching: Vec<String> = self
            .spectators
            .values()
            .filter(|spectator| spectator.room_id.as_deref() == Some(closed.id.as_str()))
            .map(|spectator| spectator.id.clone())
            .collect();
        for spectator_id in watching {
            self.send_to_spectator(
                &spectator_id,
                &json!({
                    "type": "room_closed",
                    "roomId": closed.id,
                }),
            );
            self.send_spectator_close(&spectator_id, CLOSE_NORMAL, "room closed");
            self.spectators.remove(&spectator_id);
        }
    }

    pub fn kick(&mut self, room_id: &str, player_id: &str, now_ms: u64) -> bool {
        let removed = self
            .rooms
            .get_mut(room_id)
            .and_then(|room| room.remove_player(player_id, now_ms));
        let Some(player) = removed else {
            return false;
        };
        inc(&self.metrics.kicks);
        self.events.push(
            now_ms,
            EventKind::Kick,
            Some(room_id),
            Some(player_id),
            format!("{} kicked", player.name),
        );
        self.send_close(&player.session_id, CLOSE_KICKED, "kicked");
        if let Some(session) = self.sessions.get_mut(&player.session_id) {
            session.unbind();
        }
        true
    }

    /// Adds the name to the process-wide ban set (idempotent) and kicks
    /// every currently-connected player with that name.
    pub fn ban(&mut self, name: &str, now_ms: u64) -> usize {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return 0;
        }
        self.banned_names.insert(needle.clone());
        inc(&self.metrics.bans);

        let mut matches: Vec<(String, String)> = Vec::new();
        for room in self.rooms.iter() {
            for player in room.players() {
                if player.name.to_lowercase() == needle {
                    matches.push((room.id.clone(), player.id.clone()));
                }
            }
        }
        let mut kicked = 0;
        for (room_id, player_id) in matches {
            let removed = self
                .rooms
                .get_mut(&room_id)
                .and_then(|room| room.remove_player(&player_id, now_ms));
            if let Some(player) = removed {
                self.send_close(&player.session_id, CLOSE_BANNED, "banned");
                if let Some(session) = self.sessions.get_mut(&player.session_id) {
                    session.unbind();
                }
                kicked += 1;
            }
        }
        self.events.push(
            now_ms,
            EventKind::Ban,
            None,
            None,
            format!("{needle} banned ({kicked} online)"),
        );
        kicked
    }

    pub fn create_room(
        &mut self,
        patch: &RoomConfigPatch,
        now_ms: u64,
    ) -> Result<String, ConfigValidationError> {
        let room_id = self.rooms.create(patch, now_ms)?;
        inc(&self.metrics.rooms_created);
        self.events.push(
            now_ms,
            EventKind::RoomCreated,
            Some(&room_id),
            None,
            "room opened by admin",
        );
        Ok(room_id)
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|room| RoomSummary {
                id: room.id.clone(),
                player_count: room.player_count(),
                food_count: room.food_count(),
                max_players: room.config.max_players,
                closed: room.closed,
                empty_since_ms: room.empty_since,
            })
            .collect()
    }

    pub fn room_players(&self, room_id: &str) -> Vec<PlayerAdminView> {
        self.rooms
            .get(room_id)
            .map(|room| {
                room.players()
                    .map(|player| PlayerAdminView {
                        id: player.id.clone(),
                        name: player.name.clone(),
                        score: player.score.round() as i64,
                        x: player.pos.x.round() as i64,
                        y: player.pos.y.round() as i64,
                        body_points: player.body.len(),
                        session_id: player.session_id.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // ---- spectator sockets ------------------------------------------------

    pub fn open_spectator(&mut self, tx: mpsc::Sender<OutboundMessage>, _now_ms: u64) -> String {
        let seq = self.next_spectator_seq;
        self.next_spectator_seq += 1;
        let id = format!("spectator_{seq}");
        self.spectators.insert(
            id.clone(),
            AdminSpectator {
                id: id.clone(),
                tx,
                room_id: None,
                event_cursor: self.events.last_seq(),
            },
        );
        id
    }

    pub fn close_spectator(&mut self, spectator_id: &str) {
        self.spectators.remove(spectator_id);
    }

    /// Spectators only speak one frame: `subscribe {roomId}`.
    pub fn handle_spectator_message(&mut self, spectator_id: &str, raw: &str) {
        let Ok(value) = serde_json::from_str::<Value>(raw) else {
            return;
        };
        if value.get("type").and_then(Value::as_str) != Some("subscribe") {
            return;
        }
        let Some(room_id) = value.get("roomId").and_then(Value::as_str) else {
            return;
        };
        if self.rooms.get(room_id).is_none() {
            self.send_to_spectator(
                spectator_id,
                &json!({
                    "type": "error",
                    "error": "NOT_FOUND",
                }),
            );
            return;
        }
        if let Some(spectator) = self.spectators.get_mut(spectator_id) {
            spectator.room_id = Some(room_id.to_string());
        }
    }

    // ---- delivery ---------------------------------------------------------

    fn send_error(&mut self, session_id: &str, error: &str) {
        self.send_to_session(
            session_id,
            &json!({
                "type": "error",
                "error": error,
            }),
        );
    }

    /// Best-effort delivery: a full or dead channel drops the frame and
    /// the idle sweep eventually reaps the session.
    fn send_to_session(&self, session_id: &str, frame: &Value) {
        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        if session
            .tx
            .try_send(OutboundMessage::Text(frame.to_string()))
            .is_ok()
        {
            inc(&self.metrics.frames_sent);
        } else {
            inc(&self.metrics.frames_dropped);
        }
    }

    fn send_close(&self, session_id: &str, code: u16, reason: &str) {
        let Some(session) = self.sessions.get(session_id) else {
            return;
        };
        let _ = session.tx.try_send(OutboundMessage::Close {
            code,
            reason: reason.to_string(),
        });
    }

    fn send_to_spectator(&self, spectator_id: &str, frame: &Value) {
        let Some(spectator) = self.spectators.get(spectator_id) else {
            return;
        };
        if spectator
            .tx
            .try_send(OutboundMessage::Text(frame.to_string()))
            .is_ok()
        {
            inc(&self.metrics.frames_sent);
        } else {
            inc(&self.metrics.frames_dropped);
        }
    }

    fn send_spectator_close(&self, spectator_id: &str, code: u16, reason: &str) {
        let Some(spectator) = self.spectators.get(spectator_id) else {
            return;
        };
        let _ = spectator.tx.try_send(OutboundMessage::Close {
            code,
            reason: reason.to_string(),
        });
    }
}
