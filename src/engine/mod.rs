use std::collections::VecDeque;

use crate::config::RoomConfig;
use crate::constants::{
    boost_drain, move_speed, target_length, turn_rate, BOOST_DROP_JITTER, BOOST_DROP_PROBABILITY,
    BOOST_DROP_VALUE, BOOST_MIN_SCORE, TICK_RING_CAP,
};
use crate::geometry::{rotate_towards, trim_tail_to_arc_length};
use crate::rng::Rng;
use crate::types::{RoomTickStats, Vec2};

mod collision_system;
mod food_system;
mod spawn_system;

pub use collision_system::DeathRecord;

#[derive(Clone, Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub session_id: String,
    pub score: f64,
    pub pos: Vec2,
    pub direction: f64,
    pub target_direction: f64,
    pub boosting: bool,
    pub body: VecDeque<Vec2>,
    pub(crate) dead: bool,
}

#[derive(Clone, Debug)]
pub struct Food {
    pub id: u64,
    pub pos: Vec2,
    pub value: f64,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub deaths: Vec<DeathRecord>,
}

/// One isolated game world. All mutation happens on the owning worker;
/// the struct itself is free of interior locking.
#[derive(Clone, Debug)]
pub struct Room {
    pub id: String,
    pub config: RoomConfig,
    pub closed: bool,
    pub created_at_ms: u64,
    pub empty_since: Option<u64>,
    pub last_broadcast_at: u64,
    pub(crate) rng: Rng,
    pub(crate) players: Vec<Player>,
    pub(crate) foods: Vec<Food>,
    pub(crate) minimap_cache: Option<crate::types::MinimapView>,
    next_player_seq: u64,
    next_food_seq: u64,
    tick_durations: VecDeque<f64>,
}

impl Room {
    pub fn new(id: String, config: RoomConfig, seed: u32, now_ms: u64) -> Self {
        Self {
            id,
            config,
            closed: false,
            created_at_ms: now_ms,
            empty_since: Some(now_ms),
            last_broadcast_at: 0,
            rng: Rng::new(seed),
            players: Vec::new(),
            foods: Vec::new(),
            minimap_cache: None,
            next_player_seq: 1,
            next_food_seq: 1,
            tick_durations: VecDeque::with_capacity(TICK_RING_CAP),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn food_count(&self) -> usize {
        self.foods.len()
    }

    pub fn has_slot(&self) -> bool {
        !self.closed && self.players.len() < self.config.max_players
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|player| player.id == player_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn foods(&self) -> impl Iterator<Item = &Food> {
        self.foods.iter()
    }

    pub(crate) fn make_player_id(&mut self) -> String {
        let seq = self.next_player_seq;
        self.next_player_seq += 1;
        format!("player_{seq}")
    }

    pub(crate) fn make_food_id(&mut self) -> u64 {
        let seq = self.next_food_seq;
        self.next_food_seq += 1;
        seq
    }

    /// Joins a player at a safe spawn point with a random heading.
    pub fn add_player(&mut self, name: &str, session_id: &str) -> &Player {
        let spawn = self.pick_spawn_position();
        let heading = self.rng.heading();
        let id = self.make_player_id();
        self.players.push(Player {
            id,
            name: name.to_string(),
            session_id: session_id.to_string(),
            score: 0.0,
            pos: spawn,
            direction: heading,
            target_direction: heading,
            boosting: false,
            body: VecDeque::from([spawn]),
            dead: false,
        });
        self.empty_since = None;
        self.players.last().expect("player was just pushed")
    }

    /// Removes a player without death drops (disconnects, kicks).
    pub fn remove_player(&mut self, player_id: &str, now_ms: u64) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == player_id)?;
        let removed = self.players.remove(idx);
        if self.players.is_empty() {
            self.empty_since = Some(now_ms);
        }
        Some(removed)
    }

    /// Applies an already-validated steering input.
    pub fn apply_input(
        &mut self,
        player_id: &str,
        target_direction: Option<f64>,
        boosting: Option<bool>,
    ) {
        if let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) {
            if let Some(direction) = target_direction {
                player.target_direction = direction;
            }
            if let Some(boosting) = boosting {
                player.boosting = boosting;
            }
        }
    }

    /// One fixed-timestep step: motion, food interaction, collisions,
    /// death resolution, replenishment. Empty rooms skip everything (the
    /// TTL bookkeeping lives in the room manager's sweep).
    pub fn step(&mut self, now_ms: u64, dt: f64) -> TickReport {
        if self.players.is_empty() {
            return TickReport::default();
        }
        self.update_motion(dt);
        self.apply_food_interaction(dt);
        self.resolve_collisions();
        let deaths = self.reap_dead(now_ms);
        self.replenish_food();
        TickReport { deaths }
    }

    fn update_motion(&mut self, dt: f64) {
        let map_size = self.config.map_size;
        let length_multiplier = self.config.body_length_multiplier;

        for idx in 0..self.players.len() {
            let (score, boosting) = {
                let player = &self.players[idx];
                (player.score, player.boosting)
            };

            let max_turn = turn_rate(score) * dt;
            let speed = move_speed(score, boosting);

            let player = &mut self.players[idx];
            player.direction = rotate_towards(player.direction, player.target_direction, max_turn);
            player.pos.x = (player.pos.x + player.direction.cos() * speed * dt)
                .clamp(-map_size, map_size);
            player.pos.y = (player.pos.y + player.direction.sin() * speed * dt)
                .clamp(-map_size, map_size);
            let head = player.pos;
            player.body.push_back(head);
            trim_tail_to_arc_length(&mut player.body, target_length(score, length_multiplier));

            if boosting && score > BOOST_MIN_SCORE {
                self.players[idx].score = (score - boost_drain(score)).max(0.0);
                if self.rng.chance(BOOST_DROP_PROBABILITY) {
                    let x = head.x + self.rng.range_f64(-BOOST_DROP_JITTER, BOOST_DROP_JITTER);
                    let y = head.y + self.rng.range_f64(-BOOST_DROP_JITTER, BOOST_DROP_JITTER);
                    self.push_food(Vec2 { x, y }, BOOST_DROP_VALUE);
                }
            }
        }
    }

    /// Turns the players marked dead this tick into food and death
    /// records, in room order.
    fn reap_dead(&mut self, now_ms: u64) -> Vec<DeathRecord> {
        if !self.players.iter().any(|p| p.dead) {
            return Vec::new();
        }
        let mut deaths = Vec::new();
        let mut idx = 0;
        while idx < self.players.len() {
            if !self.players[idx].dead {
                idx += 1;
                continue;
            }
            self.drop_death_remains(idx);
            let player = self.players.remove(idx);
            deaths.push(DeathRecord {
                player_id: player.id,
                session_id: player.session_id,
                name: player.name,
                score: player.score,
            });
        }
        if self.players.is_empty() {
            self.empty_since = Some(now_ms);
        }
        deaths
    }

    pub fn record_tick_duration(&mut self, millis: f64) {
        while self.tick_durations.len() >= TICK_RING_CAP {
            self.tick_durations.pop_front();
        }
        self.tick_durations.push_back(millis);
    }

    pub fn tick_stats(&self) -> RoomTickStats {
        let samples = self.tick_durations.len();
        if samples == 0 {
            return RoomTickStats {
                samples: 0,
                avg_ms: 0.0,
                p95_ms: 0.0,
                max_ms: 0.0,
            };
        }
        let mut sorted: Vec<f64> = self.tick_durations.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("durations are finite"));
        let avg = sorted.iter().sum::<f64>() / samples as f64;
        let p95_idx = ((samples as f64 * 0.95) as usize).min(samples - 1);
        RoomTickStats {
            samples,
            avg_ms: avg,
            p95_ms: sorted[p95_idx],
            max_ms: *sorted.last().expect("samples is non-zero"),
        }
    }
}
