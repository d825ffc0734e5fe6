use tokio::sync::mpsc;

use crate::constants::{IDLE_TIMEOUT_MS, PONG_TIMEOUT_MS};
use crate::rate_limit::TokenBucket;

/// A frame headed for one transport. `Close` ends the writer after the
/// close frame goes out.
#[derive(Clone, Debug)]
pub enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

pub const CLOSE_NORMAL: u16 = 1000;
pub const CLOSE_UNAUTHORIZED: u16 = 1008;
pub const CLOSE_KICKED: u16 = 4000;
pub const CLOSE_BANNED: u16 = 4001;
pub const CLOSE_INACTIVE: u16 = 4002;

/// Server-side record of one connected client. Binding to a player is a
/// pair of lookup handles; the room owns the player itself.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub tx: mpsc::Sender<OutboundMessage>,
    pub room_id: Option<String>,
    pub player_id: Option<String>,
    pub last_ping_sent_at: u64,
    pub last_ping_id: Option<u64>,
    pub last_pong_at: u64,
    pub rtt_ms: Option<u64>,
    pub last_message_at: u64,
    pub bucket: TokenBucket,
}

impl Session {
    pub fn new(id: String, tx: mpsc::Sender<OutboundMessage>, now_ms: u64) -> Self {
        Self {
            id,
            tx,
            room_id: None,
            player_id: None,
            last_ping_sent_at: 0,
            last_ping_id: None,
            last_pong_at: now_ms,
            rtt_ms: None,
            last_message_at: now_ms,
            bucket: TokenBucket::new(now_ms),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.room_id.is_some()
    }

    pub fn bind(&mut self, room_id: &str, player_id: &str) {
        self.room_id = Some(room_id.to_string());
        self.player_id = Some(player_id.to_string());
    }

    pub fn unbind(&mut self) {
        self.room_id = None;
        self.player_id = None;
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_message_at = now_ms;
    }

    pub fn note_ping_sent(&mut self, now_ms: u64) {
        self.last_ping_sent_at = now_ms;
        self.last_ping_id = Some(now_ms);
    }

    /// Records a matching pong and yields the measured round trip.
    pub fn note_pong(&mut self, ping_id: u64, now_ms: u64) -> Option<u64> {
        if self.last_ping_id != Some(ping_id) {
            return None;
        }
        let rtt = now_ms.saturating_sub(self.last_ping_sent_at);
        self.rtt_ms = Some(rtt);
        self.last_pong_at = now_ms;
        Some(rtt)
    }

    /// Whether the idle sweep should evict this session: the client has
    /// ignored pings for too long, or sent nothing at all for ten minutes.
    pub fn is_inactive(&self, now_ms: u64) -> bool {
        if self.last_ping_sent_at > 0
            && self.last_ping_sent_at.saturating_sub(self.last_pong_at) > PONG_TIMEOUT_MS
        {
            return true;
        }
        now_ms.saturating_sub(self.last_message_at) > IDLE_TIMEOUT_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now_ms: u64) -> (Session, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (Session::new("session_1".to_string(), tx, now_ms), rx)
    }

    #[test]
    fn bind_and_unbind_round_trip() {
        let (mut session, _rx) = session(0);
        assert!(!session.is_bound());
        session.bind("room_1", "player_1");
        assert!(session.is_bound());
        assert_eq!(session.player_id.as_deref(), Some("player_1"));
        session.unbind();
        assert!(!session.is_bound());
        assert!(session.player_id.is_none());
    }

    #[test]
    fn pong_with_matching_id_measures_rtt() {
        let (mut session, _rx) = session(0);
        session.note_ping_sent(1_000);
        assert_eq!(session.note_pong(1_000, 1_042), Some(42));
        assert_eq!(session.rtt_ms, Some(42));
        assert_eq!(session.last_pong_at, 1_042);
    }

    #[test]
    fn pong_with_stale_id_is_ignored() {
        let (mut session, _rx) = session(0);
        session.note_ping_sent(1_000);
        session.note_ping_sent(3_000);
        assert_eq!(session.note_pong(1_000, 3_050), None);
        assert_eq!(session.rtt_ms, None);
    }

    #[test]
    fn silence_after_pings_marks_inactive() {
        let (mut session, _rx) = session(0);
        session.touch(0);
        // pings keep going out, pongs stopped at t=0
        session.note_ping_sent(31_000);
        assert!(session.is_inactive(31_000));
    }

    #[test]
    fn responsive_session_is_not_inactive() {
        let (mut session, _rx) = session(0);
        session.note_ping_sent(10_000);
        session.note_pong(10_000, 10_020);
        session.touch(10_020);
        assert!(!session.is_inactive(12_000));
    }

    #[test]
    fn long_message_silence_marks_inactive() {
        let (mut session, _rx) = session(0);
        session.touch(0);
        assert!(!session.is_inactive(600_000));
        assert!(session.is_inactive(600_001));
    }
}
