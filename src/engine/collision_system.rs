use super::*;
use crate::constants::{
    body_radius, BODY_MIN_THICKNESS, BODY_THICKNESS_FACTOR, COLLISION_HEAD_SKIP,
    COLLISION_QUICK_REJECT_PAD, COLLISION_STRIDE, HEAD_TO_HEAD_FACTOR,
};
use crate::geometry::{dist2, point_segment_dist2};

#[derive(Clone, Debug)]
pub struct DeathRecord {
    pub player_id: String,
    pub session_id: String,
    pub name: String,
    pub score: f64,
}

impl Room {
    /// Head-versus-body and head-versus-head checks over every ordered
    /// pair. Marks losers dead; the reaper turns them into food afterwards.
    /// Running into your own body never kills.
    pub(crate) fn resolve_collisions(&mut self) {
        let radius_multiplier = self.config.body_radius_multiplier;

        for a_idx in 0..self.players.len() {
            if self.players[a_idx].dead {
                continue;
            }
            for b_idx in 0..self.players.len() {
                if a_idx == b_idx || self.players[b_idx].dead {
                    continue;
                }
                let a_head = self.players[a_idx].pos;
                let a_score = self.players[a_idx].score;
                let b_head = self.players[b_idx].pos;
                let b_score = self.players[b_idx].score;
                let r_a = body_radius(a_score, radius_multiplier);
                let r_b = body_radius(b_score, radius_multiplier);

                let reject = r_a + r_b + COLLISION_QUICK_REJECT_PAD;
                let head_d2 = dist2(a_head, b_head);
                if head_d2 > reject * reject {
                    continue;
                }

                if self.head_hits_body(a_idx, b_idx, r_a, r_b) {
                    self.players[a_idx].dead = true;
                    break;
                }

                let head_on = HEAD_TO_HEAD_FACTOR * (r_a + r_b) * (r_a + r_b);
                if head_d2 < head_on {
                    if a_score <= b_score {
                        self.players[a_idx].dead = true;
                        break;
                    }
                    self.players[b_idx].dead = true;
                }
            }
        }
    }

    /// Walks b's body from the tail in a coarse stride, skipping the
    /// points adjacent to b's head so grazing past a head is settled by
    /// the head-to-head rule instead.
    fn head_hits_body(&self, a_idx: usize, b_idx: usize, r_a: f64, r_b: f64) -> bool {
        let body = &self.players[b_idx].body;
        let len = body.len();
        if len <= COLLISION_HEAD_SKIP {
            return false;
        }
        let usable = len - COLLISION_HEAD_SKIP;
        let a_head = self.players[a_idx].pos;
        let thickness = (r_b * BODY_THICKNESS_FACTOR).max(BODY_MIN_THICKNESS);
        let kill = (r_a + thickness) * (r_a + thickness);

        let mut k = 0;
        while k < usable {
            let end = (k + 1).min(usable - 1);
            if point_segment_dist2(a_head, body[k], body[end]) < kill {
                return true;
            }
            k += COLLISION_STRIDE;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::constants::TICK_MS;
    use std::collections::VecDeque;

    fn quiet_config() -> RoomConfig {
        let mut config = RoomConfig::default();
        config.food_coverage_percent = 0.0;
        config.food_near_player_target = 0;
        config
    }

    fn room_with(seed: u32) -> Room {
        Room::new("room_1".to_string(), quiet_config(), seed, 0)
    }

    fn dt() -> f64 {
        TICK_MS as f64 / 1_000.0
    }

    fn set_body_line(room: &mut Room, idx: usize, from: Vec2, to: Vec2, points: usize) {
        let body: VecDeque<Vec2> = (0..points)
            .map(|i| {
                let t = i as f64 / (points - 1) as f64;
                Vec2 {
                    x: from.x + (to.x - from.x) * t,
                    y: from.y + (to.y - from.y) * t,
                }
            })
            .collect();
        room.players[idx].pos = *body.back().unwrap();
        room.players[idx].body = body;
    }

    #[test]
    fn head_into_body_kills_the_runner() {
        let mut room = room_with(1);
        room.add_player("Runner", "session_1");
        room.add_player("Wall", "session_2");
        // wall lies along y = 0, tail to the right, head at (-200, 0)
        set_body_line(
            &mut room,
            1,
            Vec2 { x: 200.0, y: 0.0 },
            Vec2 { x: -200.0, y: 0.0 },
            80,
        );
        // runner's head rests on the wall's mid-body
        room.players[0].pos = Vec2 { x: -100.0, y: 2.0 };
        room.players[0].body = VecDeque::from([room.players[0].pos]);

        room.resolve_collisions();
        assert!(room.players[0].dead);
        assert!(!room.players[1].dead);
    }

    #[test]
    fn self_collision_never_kills() {
        let mut room = room_with(2);
        room.add_player("Loop", "session_1");
        // a tight loop crossing itself; head sits on its own tail
        set_body_line(
            &mut room,
            0,
            Vec2 { x: -100.0, y: 0.0 },
            Vec2 { x: 100.0, y: 0.0 },
            60,
        );
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        let head_pos = room.players[0].pos;
        room.players[0].body.push_back(head_pos);
        room.resolve_collisions();
        assert!(!room.players[0].dead);
    }

    #[test]
    fn points_near_the_head_do_not_count_as_body() {
        let mut room = room_with(3);
        room.add_player("A", "session_1");
        room.add_player("B", "session_2");
        // B has a short body: every point is within the head-adjacent skip
        set_body_line(
            &mut room,
            1,
            Vec2 { x: 0.0, y: 500.0 },
            Vec2 { x: 0.0, y: 560.0 },
            12,
        );
        // A's head touches B's tail, but B's whole body is "head"
        room.players[0].pos = Vec2 { x: 0.0, y: 500.0 };
        room.players[0].body = VecDeque::from([room.players[0].pos]);
        room.resolve_collisions();
        assert!(!room.players[0].dead);
    }

    #[test]
    fn head_to_head_lower_score_dies() {
        let mut room = room_with(4);
        room.add_player("Big", "session_1");
        room.add_player("Small", "session_2");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.players[0].body = VecDeque::from([room.players[0].pos]);
        room.players[0].score = 50.0;
        room.players[1].pos = Vec2 { x: 1.0, y: 0.0 };
        room.players[1].body = VecDeque::from([room.players[1].pos]);
        room.players[1].score = 10.0;

        room.resolve_collisions();
        assert!(!room.players[0].dead);
        assert!(room.players[1].dead);
    }

    #[test]
    fn equal_score_head_to_head_kills_exactly_one() {
        let mut room = room_with(5);
        room.add_player("First", "session_1");
        room.add_player("Second", "session_2");
        for idx in 0..2 {
            room.players[idx].pos = Vec2 { x: 0.0, y: 0.0 };
            room.players[idx].body = VecDeque::from([Vec2 { x: 0.0, y: 0.0 }]);
            room.players[idx].score = 10.0;
        }
        room.resolve_collisions();
        let dead: Vec<bool> = room.players.iter().map(|p| p.dead).collect();
        assert_eq!(dead, vec![true, false]);
    }

    #[test]
    fn boundary_tick_with_boosting_equal_pair() {
        // two boosting equal-score players, opposite headings, converging
        // on the origin; their heads overlap after this tick's motion
        let mut config = quiet_config();
        config.food_value_multiplier = 0.0;
        let mut room = Room::new("room_1".to_string(), config, 6, 0);
        room.add_player("First", "session_1");
        room.add_player("Second", "session_2");
        let travel = crate::constants::move_speed(10.0, true) * dt();
        for (idx, heading) in [(0usize, 0.0f64), (1usize, std::f64::consts::PI)] {
            let player = &mut room.players[idx];
            player.pos = Vec2 {
                x: -heading.cos() * travel,
                y: 0.0,
            };
            player.body = VecDeque::from([player.pos]);
            player.score = 10.0;
            player.boosting = true;
            player.direction = heading;
            player.target_direction = heading;
        }

        let report = room.step(TICK_MS, dt());

        assert_eq!(report.deaths.len(), 1);
        assert_eq!(report.deaths[0].player_id, "player_1");
        assert_eq!(room.player_count(), 1);
        let survivor = &room.players[0];
        assert_eq!(survivor.id, "player_2");
        // survivor lost only the boost drain this tick
        assert!((survivor.score - (10.0 - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn distant_players_are_quick_rejected() {
        let mut room = room_with(7);
        room.add_player("A", "session_1");
        room.add_player("B", "session_2");
        room.players[0].pos = Vec2 { x: 0.0, y: 0.0 };
        room.players[1].pos = Vec2 { x: 3_000.0, y: 0.0 };
        for idx in 0..2 {
            let pos = room.players[idx].pos;
            room.players[idx].body = VecDeque::from([pos]);
        }
        room.resolve_collisions();
        assert!(!room.players[0].dead);
        assert!(!room.players[1].dead);
    }

    #[test]
    fn dead_players_emit_remains_and_leave_the_room() {
        let mut room = room_with(8);
        room.add_player("Victim", "session_1");
        room.add_player("Wall", "session_2");
        set_body_line(
            &mut room,
            1,
            Vec2 { x: 200.0, y: 0.0 },
            Vec2 { x: -200.0, y: 0.0 },
            80,
        );
        room.players[0].pos = Vec2 { x: -100.0, y: 0.0 };
        room.players[0].body = VecDeque::from([room.players[0].pos]);
        room.players[0].score = 40.0;

        let report = room.step(TICK_MS, dt());
        assert_eq!(report.deaths.len(), 1);
        assert_eq!(report.deaths[0].session_id, "session_1");
        assert_eq!(room.player_count(), 1);
        assert!(room.food_count() > 0);
    }
}
