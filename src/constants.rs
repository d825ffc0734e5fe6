pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const DEFAULT_BROADCAST_RATE_HZ: u32 = 20;
pub const MIN_BROADCAST_RATE_HZ: u32 = 5;
pub const MAX_BROADCAST_RATE_HZ: u32 = 20;

pub const HEARTBEAT_INTERVAL_MS: u64 = 2_000;
pub const IDLE_SWEEP_INTERVAL_MS: u64 = 5_000;
pub const PONG_TIMEOUT_MS: u64 = 30_000;
pub const IDLE_TIMEOUT_MS: u64 = 600_000;
pub const SPECTATOR_SNAPSHOT_INTERVAL_MS: u64 = 1_000;

pub const INPUT_BUCKET_CAPACITY: f64 = 45.0;
pub const INPUT_BUCKET_REFILL_PER_SECOND: f64 = 30.0;

pub const MAX_NAME_LEN: usize = 20;

pub const BASE_SPEED: f64 = 220.0;
pub const BOOST_SPEED_MULTIPLIER: f64 = 1.55;
pub const BOOST_MIN_SCORE: f64 = 1.0;
pub const BOOST_DROP_PROBABILITY: f32 = 0.3;
pub const BOOST_DROP_VALUE: f64 = 0.5;
pub const BOOST_DROP_JITTER: f64 = 4.0;

pub const SPAWN_CANDIDATES: usize = 20;
pub const SPAWN_EDGE_MARGIN: f64 = 200.0;
pub const SPAWN_CLEARANCE: f64 = 900.0;

pub const COLLISION_QUICK_REJECT_PAD: f64 = 200.0;
pub const COLLISION_HEAD_SKIP: usize = 12;
pub const COLLISION_STRIDE: usize = 3;
pub const BODY_MIN_THICKNESS: f64 = 3.0;
pub const BODY_THICKNESS_FACTOR: f64 = 0.6;
pub const HEAD_TO_HEAD_FACTOR: f64 = 0.5;

pub const DEATH_DROP_STRIDE: usize = 4;
pub const DEATH_DROP_JITTER: f64 = 6.0;
pub const DEATH_DROP_MIN_VALUE: f64 = 0.5;

pub const FOOD_DENSITY_BASE: f64 = 2_000.0;
pub const FOOD_CLUSTER_MIN: i32 = 15;
pub const FOOD_CLUSTER_MAX: i32 = 55;
pub const FOOD_CLUSTER_RADIUS_MIN: f64 = 20.0;
pub const FOOD_CLUSTER_RADIUS_MAX: f64 = 100.0;
pub const FOOD_CLUSTER_JITTER: f64 = 4.0;
pub const NEAR_FOOD_RADIUS: f64 = 1_500.0;
pub const NEAR_FOOD_RING_MIN: f64 = 900.0;
pub const NEAR_FOOD_RING_MAX: f64 = 1_500.0;

pub const FOOD_VIEW_RADIUS: f64 = 1_800.0;
pub const FOOD_VIEW_CAP: usize = 250;
pub const PLAYER_VIEW_RADIUS: f64 = 2_600.0;
pub const PLAYER_VIEW_CAP: usize = 40;
pub const BODY_VIEW_WINDOW: usize = 180;
pub const BODY_VIEW_STRIDE: usize = 3;
pub const LEADERBOARD_SIZE: usize = 10;

pub const MINIMAP_REFRESH_MS: u64 = 500;
pub const MINIMAP_CELL_SIZE: f64 = 600.0;
pub const MINIMAP_CELL_CAP: usize = 200;

pub const TICK_RING_CAP: usize = 200;
pub const EVENT_LOG_CAP: usize = 512;

/// Turn rate in rad/s: nimble at score 0, sluggish once sqrt(score)/80
/// saturates.
pub fn turn_rate(score: f64) -> f64 {
    let t = (score.max(0.0).sqrt() / 80.0).clamp(0.0, 1.0);
    7.0 + (2.2 - 7.0) * t
}

pub fn move_speed(score: f64, boosting: bool) -> f64 {
    let base = BASE_SPEED / (1.0 + 0.004 * score.max(0.0));
    if boosting {
        base * BOOST_SPEED_MULTIPLIER
    } else {
        base
    }
}

pub fn target_length(score: f64, body_length_multiplier: f64) -> f64 {
    (120.0 + 2.5 * score.max(0.0)) * body_length_multiplier
}

pub fn body_radius(score: f64, body_radius_multiplier: f64) -> f64 {
    (6.0 + 0.6 * score.max(0.0).sqrt()) * body_radius_multiplier
}

/// Suction reach; disabled entirely when the multiplier is not positive.
pub fn suction_radius(score: f64, suction_radius_multiplier: f64) -> f64 {
    if suction_radius_multiplier <= 0.0 {
        return 0.0;
    }
    let base = (120.0 + 14.0 * score.max(0.0).sqrt()).min(600.0);
    (base * suction_radius_multiplier).min(2_000.0)
}

pub fn suction_pull(score: f64, suction_strength_multiplier: f64) -> f64 {
    (140.0 + 6.0 * score.max(0.0).sqrt()).min(220.0) * suction_strength_multiplier
}

pub fn boost_drain(score: f64) -> f64 {
    (0.002 * score).clamp(0.1, 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_rate_interpolates_between_bounds() {
        assert!((turn_rate(0.0) - 7.0).abs() < 1e-9);
        // sqrt(6400)/80 == 1.0, fully saturated
        assert!((turn_rate(6_400.0) - 2.2).abs() < 1e-9);
        assert!((turn_rate(100_000.0) - 2.2).abs() < 1e-9);
        let mid = turn_rate(1_600.0);
        assert!(mid < 7.0 && mid > 2.2);
    }

    #[test]
    fn move_speed_decays_with_score_and_boosts() {
        assert!((move_speed(0.0, false) - 220.0).abs() < 1e-9);
        assert!(move_speed(100.0, false) < 220.0);
        assert!((move_speed(10.0, true) / move_speed(10.0, false) - 1.55).abs() < 1e-9);
    }

    #[test]
    fn suction_radius_zero_when_disabled() {
        assert_eq!(suction_radius(100.0, 0.0), 0.0);
        assert_eq!(suction_radius(100.0, -1.0), 0.0);
        assert!(suction_radius(100.0, 1.0) > 0.0);
    }

    #[test]
    fn suction_radius_is_capped() {
        assert!(suction_radius(1_000_000.0, 5.0) <= 2_000.0);
    }

    #[test]
    fn boost_drain_is_clamped() {
        assert!((boost_drain(1.0) - 0.1).abs() < 1e-9);
        assert!((boost_drain(10_000.0) - 1.5).abs() < 1e-9);
        assert!((boost_drain(100.0) - 0.2).abs() < 1e-9);
    }
}
