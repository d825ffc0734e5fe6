use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::{json, Value};

/// Process-wide counter registry. Counters only ever move forward; they
/// reset at process start and never in between.
#[derive(Debug)]
pub struct Metrics {
    pub sessions_opened: AtomicU64,
    pub sessions_closed: AtomicU64,
    pub players_joined: AtomicU64,
    pub players_died: AtomicU64,
    pub input_accepted: AtomicU64,
    pub input_throttled: AtomicU64,
    pub input_spoof_rejected: AtomicU64,
    pub input_invalid: AtomicU64,
    pub frames_sent: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub rooms_created: AtomicU64,
    pub rooms_closed_manual: AtomicU64,
    pub rooms_closed_timeout: AtomicU64,
    pub kicks: AtomicU64,
    pub bans: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            players_joined: AtomicU64::new(0),
            players_died: AtomicU64::new(0),
            input_accepted: AtomicU64::new(0),
            input_throttled: AtomicU64::new(0),
            input_spoof_rejected: AtomicU64::new(0),
            input_invalid: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
            rooms_created: AtomicU64::new(0),
            rooms_closed_manual: AtomicU64::new(0),
            rooms_closed_timeout: AtomicU64::new(0),
            kicks: AtomicU64::new(0),
            bans: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn to_json(&self) -> Value {
        json!({
            "uptimeSeconds": self.uptime_seconds(),
            "sessions": {
                "opened": self.sessions_opened.load(Ordering::Relaxed),
                "closed": self.sessions_closed.load(Ordering::Relaxed),
            },
            "players": {
                "joined": self.players_joined.load(Ordering::Relaxed),
                "died": self.players_died.load(Ordering::Relaxed),
            },
            "input": {
                "accepted": self.input_accepted.load(Ordering::Relaxed),
                "throttled": self.input_throttled.load(Ordering::Relaxed),
                "spoofRejected": self.input_spoof_rejected.load(Ordering::Relaxed),
                "invalid": self.input_invalid.load(Ordering::Relaxed),
            },
            "frames": {
                "sent": self.frames_sent.load(Ordering::Relaxed),
                "dropped": self.frames_dropped.load(Ordering::Relaxed),
            },
            "rooms": {
                "created": self.rooms_created.load(Ordering::Relaxed),
                "closedManual": self.rooms_closed_manual.load(Ordering::Relaxed),
                "closedTimeout": self.rooms_closed_timeout.load(Ordering::Relaxed),
            },
            "moderation": {
                "kicks": self.kicks.load(Ordering::Relaxed),
                "bans": self.bans.load(Ordering::Relaxed),
            },
        })
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Relaxed increment; every counter is independent.
pub fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn load(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new();
        assert_eq!(load(&metrics.input_accepted), 0);
        assert_eq!(load(&metrics.rooms_closed_timeout), 0);
    }

    #[test]
    fn inc_moves_counters_forward() {
        let metrics = Metrics::new();
        inc(&metrics.input_throttled);
        inc(&metrics.input_throttled);
        assert_eq!(load(&metrics.input_throttled), 2);
    }

    #[test]
    fn json_view_carries_counter_values() {
        let metrics = Metrics::new();
        inc(&metrics.players_joined);
        inc(&metrics.input_spoof_rejected);
        let value = metrics.to_json();
        assert_eq!(value["players"]["joined"], 1);
        assert_eq!(value["input"]["spoofRejected"], 1);
        assert_eq!(value["input"]["throttled"], 0);
    }
}
