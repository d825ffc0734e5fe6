use std::collections::HashMap;

use crate::constants::{
    BODY_VIEW_STRIDE, BODY_VIEW_WINDOW, FOOD_VIEW_CAP, FOOD_VIEW_RADIUS, LEADERBOARD_SIZE,
    MINIMAP_CELL_CAP, MINIMAP_CELL_SIZE, MINIMAP_REFRESH_MS, PLAYER_VIEW_CAP, PLAYER_VIEW_RADIUS,
};
use crate::engine::{Player, Room};
use crate::geometry::{decimate_trailing, dist2};
use crate::types::{
    FoodView, LeaderboardEntry, MinimapCell, MinimapPlayer, MinimapView, PlayerStateView,
    SizeMultipliers, StateSnapshot,
};

impl Room {
    /// Top players by score. The sort is stable, so equal scores keep
    /// room insertion order.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("scores are finite"));
        ranked
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .map(|player| LeaderboardEntry {
                player_id: player.id.clone(),
                name: player.name.clone(),
                score: player.score.round() as i64,
            })
            .collect()
    }

    /// Coarse world overview, recomputed at most every 500 ms and shared
    /// by every recipient in the room.
    pub fn minimap(&mut self, now_ms: u64) -> MinimapView {
        if let Some(cached) = &self.minimap_cache {
            if now_ms.saturating_sub(cached.generated_at_ms) < MINIMAP_REFRESH_MS {
                return cached.clone();
            }
        }
        let view = self.build_minimap(now_ms);
        self.minimap_cache = Some(view.clone());
        view
    }

    fn build_minimap(&self, now_ms: u64) -> MinimapView {
        struct CellAcc {
            sum_x: f64,
            sum_y: f64,
            sum_value: f64,
            count: u32,
        }

        let mut cells: HashMap<(i64, i64), CellAcc> = HashMap::new();
        for food in &self.foods {
            let key = (
                (food.pos.x / MINIMAP_CELL_SIZE).floor() as i64,
                (food.pos.y / MINIMAP_CELL_SIZE).floor() as i64,
            );
            let acc = cells.entry(key).or_insert(CellAcc {
                sum_x: 0.0,
                sum_y: 0.0,
                sum_value: 0.0,
                count: 0,
            });
            acc.sum_x += food.pos.x;
            acc.sum_y += food.pos.y;
            acc.sum_value += food.value;
            acc.count += 1;
        }

        let mut ranked: Vec<MinimapCell> = cells
            .into_values()
            .map(|acc| MinimapCell {
                x: (acc.sum_x / acc.count as f64).round() as i64,
                y: (acc.sum_y / acc.count as f64).round() as i64,
                value: acc.sum_value,
                count: acc.count,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .expect("cell values are finite")
                .then(a.x.cmp(&b.x))
                .then(a.y.cmp(&b.y))
        });
        ranked.truncate(MINIMAP_CELL_CAP);

        let players = self
            .players
            .iter()
            .map(|player| MinimapPlayer {
                id: player.id.clone(),
                name: player.name.clone(),
                score: player.score.round() as i64,
                x: player.pos.x.round() as i64,
                y: player.pos.y.round() as i64,
            })
            .collect();

        MinimapView {
            generated_at_ms: now_ms,
            cells: ranked,
            players,
        }
    }

    /// Assembles the interest-managed payload one recipient is allowed to
    /// see. Returns None when the recipient is not (or no longer) in the
    /// room.
    pub fn build_state_snapshot(&mut self, recipient_id: &str, now_ms: u64) -> Option<StateSnapshot> {
        let recipient_idx = self
            .players
            .iter()
            .position(|player| player.id == recipient_id)?;
        let minimap = self.minimap(now_ms);
        let leaderboard = self.leaderboard();
        let recipient_pos = self.players[recipient_idx].pos;

        let food_radius2 = FOOD_VIEW_RADIUS * FOOD_VIEW_RADIUS;
        let mut foods = Vec::new();
        for food in &self.foods {
            if foods.len() >= FOOD_VIEW_CAP {
                break;
            }
            if dist2(food.pos, recipient_pos) <= food_radius2 {
                foods.push(FoodView {
                    id: food.id,
                    x: food.pos.x,
                    y: food.pos.y,
                    value: food.value,
                });
            }
        }

        let player_radius2 = PLAYER_VIEW_RADIUS * PLAYER_VIEW_RADIUS;
        let mut players = Vec::with_capacity(PLAYER_VIEW_CAP.min(self.players.len()));
        players.push(player_state_view(&self.players[recipient_idx]));
        for (idx, player) in self.players.iter().enumerate() {
            if players.len() >= PLAYER_VIEW_CAP {
                break;
            }
            if idx == recipient_idx {
                continue;
            }
            if dist2(player.pos, recipient_pos) <= player_radius2 {
                players.push(player_state_view(player));
            }
        }

        Some(StateSnapshot {
            server_now: now_ms,
            foods,
            players,
            leaderboard,
            minimap,
            multipliers: SizeMultipliers {
                body_radius: self.config.body_radius_multiplier,
                body_length: self.config.body_length_multiplier,
            },
        })
    }
}

fn player_state_view(player: &Player) -> PlayerStateView {
    PlayerStateView {
        id: player.id.clone(),
        name: player.name.clone(),
        x: player.pos.x,
        y: player.pos.y,
        direction_rad: player.direction,
        score: player.score,
        boosting: player.boosting,
        body: decimate_trailing(&player.body, BODY_VIEW_WINDOW, BODY_VIEW_STRIDE),
    }
}
