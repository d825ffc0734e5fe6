use super::*;
use crate::constants::{
    body_radius, suction_pull, suction_radius, DEATH_DROP_JITTER, DEATH_DROP_MIN_VALUE,
    DEATH_DROP_STRIDE, FOOD_CLUSTER_JITTER, FOOD_CLUSTER_MAX, FOOD_CLUSTER_MIN,
    FOOD_CLUSTER_RADIUS_MAX, FOOD_CLUSTER_RADIUS_MIN, FOOD_DENSITY_BASE, NEAR_FOOD_RADIUS,
    NEAR_FOOD_RING_MAX, NEAR_FOOD_RING_MIN,
};
use crate::geometry::dist2;

impl Room {
    pub(crate) fn push_food(&mut self, pos: Vec2, value: f64) -> u64 {
        let id = self.make_food_id();
        self.foods.push(Food { id, pos, value });
        id
    }

    /// Consumption and suction. Foods are scanned in insertion order,
    /// players in room order; the first player whose eat radius covers a
    /// food takes it and ends that food's scan.
    pub(crate) fn apply_food_interaction(&mut self, dt: f64) {
        let radius_multiplier = self.config.body_radius_multiplier;
        let suction_radius_multiplier = self.config.suction_radius_multiplier;
        let suction_strength_multiplier = self.config.suction_strength_multiplier;
        let value_multiplier = self.config.food_value_multiplier;

        let mut food_idx = 0;
        'foods: while food_idx < self.foods.len() {
            let mut pos = self.foods[food_idx].pos;
            for player_idx in 0..self.players.len() {
                let (score, head) = {
                    let player = &self.players[player_idx];
                    (player.score, player.pos)
                };
                let eat_radius = body_radius(score, radius_multiplier);
                let d2 = dist2(pos, head);
                if d2 <= eat_radius * eat_radius {
                    let gained = self.foods[food_idx].value * value_multiplier;
                    self.players[player_idx].score += gained;
                    self.foods.remove(food_idx);
                    continue 'foods;
                }
                let reach = suction_radius(score, suction_radius_multiplier);
                if reach > 0.0 && d2 <= reach * reach {
                    let distance = d2.sqrt().max(1e-6);
                    let pull = suction_pull(score, suction_strength_multiplier);
                    let factor = pull * dt / distance;
                    pos.x += (head.x - pos.x) * factor;
                    pos.y += (head.y - pos.y) * factor;
                }
            }
            self.foods[food_idx].pos = pos;
            food_idx += 1;
        }
    }

    /// Keeps global density near the configured coverage and makes sure
    /// nobody stares at an empty screen.
    pub(crate) fn replenish_food(&mut self) {
        let desired =
            ((self.config.food_coverage_percent / 100.0) * FOOD_DENSITY_BASE).floor() as usize;
        if self.foods.len() < desired {
            self.spawn_food_cluster();
        }
        self.top_up_near_players();
    }

    fn spawn_food_cluster(&mut self) {
        let map_size = self.config.map_size;
        let count = self.rng.int(FOOD_CLUSTER_MIN, FOOD_CLUSTER_MAX);
        let center = Vec2 {
            x: self.rng.range_f64(-map_size, map_size),
            y: self.rng.range_f64(-map_size, map_size),
        };
        for _ in 0..count {
            let angle = self.rng.heading();
            let radius = self
                .rng
                .range_f64(FOOD_CLUSTER_RADIUS_MIN, FOOD_CLUSTER_RADIUS_MAX);
            let pos = Vec2 {
                x: center.x
                    + angle.cos() * radius
                    + self.rng.range_f64(-FOOD_CLUSTER_JITTER, FOOD_CLUSTER_JITTER),
                y: center.y
                    + angle.sin() * radius
                    + self.rng.range_f64(-FOOD_CLUSTER_JITTER, FOOD_CLUSTER_JITTER),
            };
            let value = 1.0 + self.rng.range_f64(0.0, 3.0);
            self.push_food(pos, value);
        }
    }

    fn top_up_near_players(&mut self) {
        let target = self.config.food_near_player_target;
        if target == 0 {
            return;
        }
        let map_size = self.config.map_size;
        let near2 = NEAR_FOOD_RADIUS * NEAR_FOOD_RADIUS;

        for player_idx in 0..self.players.len() {
            let head = self.players[player_idx].pos;
            let nearby = self
                .foods
                .iter()
                .filter(|food| dist2(food.pos, head) <= near2)
                .count();
            if nearby >= target {
                continue;
            }
            for _ in 0..(target - nearby) {
                let angle = self.rng.heading();
                let distance = self.rng.range_f64(NEAR_FOOD_RING_MIN, NEAR_FOOD_RING_MAX);
                let pos = Vec2 {
                    x: (head.x + angle.cos() * distance).clamp(-map_size, map_size),
                    y: (head.y + angle.sin() * distance).clamp(-map_size, map_size),
                };
                self.push_food(pos, 1.0);
            }
        }
    }

    /// Scatters a dead body as food, one pellet per fourth body point.
    pub(crate) fn drop_death_remains(&mut self, player_idx: usize) {
        let (points, score, body_len): (Vec<Vec2>, f64, usize) = {
            let player = &self.players[player_idx];
            (
                player
                    .body
                    .iter()
                    .copied()
                    .step_by(DEATH_DROP_STRIDE)
                    .collect(),
                player.score,
                player.body.len(),
            )
        };
        let value = (score / (body_len.max(10) as f64)).max(DEATH_DROP_MIN_VALUE);
        for point in points {
            let pos = Vec2 {
                x: point.x + self.rng.range_f64(-DEATH_DROP_JITTER, DEATH_DROP_JITTER),
                y: point.y + self.rng.range_f64(-DEATH_DROP_JITTER, DEATH_DROP_JITTER),
            };
            self.push_food(pos, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::constants::TICK_MS;

    fn room_with(config: RoomConfig, seed: u32) -> Room {
        Room::new("room_1".to_string(), config, seed, 0)
    }

    fn dt() -> f64 {
        TICK_MS as f64 / 1_000.0
    }

    #[test]
    fn food_inside_eat_radius_is_consumed_once() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 0.0;
        let mut room = room_with(config, 1);
        room.add_player("Eater", "session_1");
        room.add_player("Rival", "session_2");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.players[1].pos = Vec2 { x: 2.0, y: 0.0 };
        room.push_food(Vec2 { x: 1.0, y: 0.0 }, 2.0);

        room.apply_food_interaction(dt());

        // first player in room order wins the food
        assert_eq!(room.players[0].score, 2.0);
        assert_eq!(room.players[1].score, 0.0);
        assert_eq!(room.food_count(), 0);
    }

    #[test]
    fn food_value_multiplier_scales_gain() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 0.0;
        config.food_value_multiplier = 3.0;
        let mut room = room_with(config, 2);
        room.add_player("Eater", "session_1");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.push_food(Vec2 { x: 0.0, y: 1.0 }, 2.0);
        room.apply_food_interaction(dt());
        assert_eq!(room.players[0].score, 6.0);
    }

    #[test]
    fn suction_pulls_food_towards_the_head() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 0.0;
        let mut room = room_with(config, 3);
        room.add_player("Sucker", "session_1");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.players[0].score = 0.0;
        // inside the 120-unit base suction ring, outside the eat radius
        room.push_food(Vec2 { x: 100.0, y: 0.0 }, 1.0);

        room.apply_food_interaction(dt());

        let food = &room.foods[0];
        assert!(food.pos.x < 100.0);
        assert!(food.pos.x > 0.0);
        assert_eq!(food.pos.y, 0.0);
    }

    #[test]
    fn suction_disabled_by_zero_multiplier() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 0.0;
        config.suction_radius_multiplier = 0.0;
        let mut room = room_with(config, 4);
        room.add_player("NoPull", "session_1");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.push_food(Vec2 { x: 100.0, y: 0.0 }, 1.0);
        room.apply_food_interaction(dt());
        assert_eq!(room.foods[0].pos, Vec2 { x: 100.0, y: 0.0 });
    }

    #[test]
    fn cluster_spawns_when_below_density_target() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 10.0; // desired = 200
        let mut room = room_with(config, 5);
        room.add_player("Lonely", "session_1");
        room.replenish_food();
        let spawned = room.food_count();
        assert!((15..=55).contains(&spawned));
        assert!(room.foods.iter().all(|food| food.value >= 1.0 && food.value <= 4.0));
    }

    #[test]
    fn no_cluster_when_density_is_met() {
        let mut config = RoomConfig::default();
        config.food_near_player_target = 0;
        config.food_coverage_percent = 0.0; // desired = 0
        let mut room = room_with(config, 6);
        room.add_player("Full", "session_1");
        room.replenish_food();
        assert_eq!(room.food_count(), 0);
    }

    #[test]
    fn near_player_top_up_fills_the_deficit() {
        let mut config = RoomConfig::default();
        config.food_coverage_percent = 0.0;
        config.food_near_player_target = 25;
        let mut room = room_with(config, 7);
        room.add_player("Hungry", "session_1");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.replenish_food();
        let near = room
            .foods
            .iter()
            .filter(|food| dist2(food.pos, Vec2 { x: 0.0, y: 0.0 }) <= 1_500.0 * 1_500.0)
            .count();
        assert_eq!(near, 25);
        // ring distance is at least 900 when no clamping applies
        assert!(room
            .foods
            .iter()
            .all(|food| dist2(food.pos, Vec2 { x: 0.0, y: 0.0 }) >= 899.0 * 899.0));
    }

    #[test]
    fn top_up_points_are_clamped_to_the_map() {
        let mut config = RoomConfig::default();
        config.food_coverage_percent = 0.0;
        config.food_near_player_target = 40;
        config.map_size = 1_000.0;
        let mut room = room_with(config, 8);
        room.add_player("Corner", "session_1");
        room.players[0].pos = Vec2 { x: 1_000.0, y: 1_000.0 };
        room.replenish_food();
        assert!(room
            .foods
            .iter()
            .all(|food| food.pos.x.abs() <= 1_000.0 && food.pos.y.abs() <= 1_000.0));
    }

    #[test]
    fn death_remains_scale_with_score_and_body() {
        let mut config = RoomConfig::default();
        config.food_coverage_percent = 0.0;
        config.food_near_player_target = 0;
        let mut room = room_with(config, 9);
        room.add_player("Doomed", "session_1");
        {
            let player = &mut room.players[0];
            player.score = 100.0;
            player.body = (0..40)
                .map(|i| Vec2 {
                    x: i as f64 * 5.0,
                    y: 0.0,
                })
                .collect();
        }
        room.drop_death_remains(0);
        // every 4th of 40 points
        assert_eq!(room.food_count(), 10);
        let expected_value: f64 = 100.0 / 40.0;
        assert!(room
            .foods
            .iter()
            .all(|food| (food.value - expected_value).abs() < 1e-9));
        // jitter keeps pellets near the body line
        assert!(room.foods.iter().all(|food| food.pos.y.abs() <= 6.0));
    }

    #[test]
    fn death_remains_have_a_value_floor() {
        let mut config = RoomConfig::default();
        config.food_coverage_percent = 0.0;
        config.food_near_player_target = 0;
        let mut room = room_with(config, 10);
        room.add_player("Small", "session_1");
        room.players[0].score = 1.0;
        room.drop_death_remains(0);
        assert!(room.foods.iter().all(|food| food.value == 0.5));
    }
}
