use super::*;
use crate::constants::{SPAWN_CANDIDATES, SPAWN_CLEARANCE, SPAWN_EDGE_MARGIN};
use crate::geometry::dist2;

impl Room {
    /// Tries a handful of random points away from the map edge and takes
    /// the first one with comfortable clearance from every head. When the
    /// room is crowded enough that no candidate clears, the least-bad one
    /// wins.
    pub(crate) fn pick_spawn_position(&mut self) -> Vec2 {
        let margin = (self.config.map_size - SPAWN_EDGE_MARGIN).max(0.0);
        let clearance2 = SPAWN_CLEARANCE * SPAWN_CLEARANCE;

        let mut best: Option<(Vec2, f64)> = None;
        for _ in 0..SPAWN_CANDIDATES {
            let candidate = Vec2 {
                x: self.rng.range_f64(-margin, margin),
                y: self.rng.range_f64(-margin, margin),
            };
            let min_d2 = self
                .players
                .iter()
                .map(|player| dist2(candidate, player.pos))
                .fold(f64::INFINITY, f64::min);
            if min_d2 > clearance2 {
                return candidate;
            }
            if best.map(|(_, d)| min_d2 > d).unwrap_or(true) {
                best = Some((candidate, min_d2));
            }
        }
        best.expect("at least one candidate was generated").0
    }
}
