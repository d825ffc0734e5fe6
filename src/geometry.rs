use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

use crate::types::Vec2;

/// Wraps an angle into (-PI, PI].
pub fn normalize_angle(value: f64) -> f64 {
    let mut angle = value % TAU;
    if angle <= -PI {
        angle += TAU;
    }
    if angle > PI {
        angle -= TAU;
    }
    angle
}

/// Shortest signed arc from `from` to `to`, in (-PI, PI].
pub fn angle_diff(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}

/// Rotates `current` towards `target` by at most `max_step` radians along
/// the shorter arc.
pub fn rotate_towards(current: f64, target: f64, max_step: f64) -> f64 {
    let diff = angle_diff(current, target);
    let step = diff.clamp(-max_step.abs(), max_step.abs());
    normalize_angle(current + step)
}

pub fn dist2(a: Vec2, b: Vec2) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Squared distance from `p` to the segment (a, b). Degenerate segments
/// collapse to a point distance.
pub fn point_segment_dist2(p: Vec2, a: Vec2, b: Vec2) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len2 = abx * abx + aby * aby;
    if len2 <= f64::EPSILON {
        return dist2(p, a);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len2).clamp(0.0, 1.0);
    let closest = Vec2 {
        x: a.x + abx * t,
        y: a.y + aby * t,
    };
    dist2(p, closest)
}

pub fn arc_length(points: &VecDeque<Vec2>) -> f64 {
    let mut total = 0.0;
    for idx in 1..points.len() {
        total += dist2(points[idx - 1], points[idx]).sqrt();
    }
    total
}

/// Drops whole points from the tail (front) until the polyline arc length
/// is at most `max_arc`. Always leaves at least one point.
pub fn trim_tail_to_arc_length(points: &mut VecDeque<Vec2>, max_arc: f64) {
    let mut total = arc_length(points);
    while points.len() > 1 && total > max_arc {
        let tail = points[0];
        let next = points[1];
        total -= dist2(tail, next).sqrt();
        points.pop_front();
    }
}

/// Takes every `stride`-th point of the trailing `window` points, walking
/// back from the head so the head itself is always kept. Result is ordered
/// tail -> head.
pub fn decimate_trailing(points: &VecDeque<Vec2>, window: usize, stride: usize) -> Vec<Vec2> {
    let len = points.len();
    if len == 0 || stride == 0 {
        return Vec::new();
    }
    let start = len.saturating_sub(window);
    let mut out = Vec::new();
    let mut idx = len as i64 - 1;
    while idx >= start as i64 {
        out.push(points[idx as usize]);
        idx -= stride as i64;
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vec2 {
        Vec2 { x, y }
    }

    #[test]
    fn normalize_angle_wraps_into_half_open_interval() {
        assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-9);
        assert!((normalize_angle(-3.0 * PI) - PI).abs() < 1e-9);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-9);
        assert!((normalize_angle(PI) - PI).abs() < 1e-9);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-12);
        let wrapped = normalize_angle(TAU + 0.25);
        assert!((wrapped - 0.25).abs() < 1e-9);
    }

    #[test]
    fn rotate_towards_clamps_to_max_step() {
        let turned = rotate_towards(0.0, PI / 2.0, 0.1);
        assert!((turned - 0.1).abs() < 1e-12);
        let turned = rotate_towards(0.0, -PI / 2.0, 0.1);
        assert!((turned + 0.1).abs() < 1e-12);
    }

    #[test]
    fn rotate_towards_reaches_target_within_step() {
        let turned = rotate_towards(1.0, 1.2, 0.5);
        assert!((turned - 1.2).abs() < 1e-12);
    }

    #[test]
    fn rotate_towards_takes_shorter_arc_across_the_seam() {
        // 170deg -> -170deg should go through 180deg, not back through 0.
        let current = 170.0_f64.to_radians();
        let target = -170.0_f64.to_radians();
        let turned = rotate_towards(current, target, 0.1);
        assert!(turned > current || turned <= -(170.0_f64.to_radians()));
        assert!((angle_diff(current, turned).abs() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn point_segment_dist2_projects_and_clamps() {
        let a = v(0.0, 0.0);
        let b = v(10.0, 0.0);
        assert!((point_segment_dist2(v(5.0, 3.0), a, b) - 9.0).abs() < 1e-9);
        assert!((point_segment_dist2(v(-4.0, 0.0), a, b) - 16.0).abs() < 1e-9);
        assert!((point_segment_dist2(v(13.0, 4.0), a, b) - 25.0).abs() < 1e-9);
        // degenerate segment
        assert!((point_segment_dist2(v(1.0, 1.0), a, a) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn trim_keeps_arc_length_under_target() {
        let mut body: VecDeque<Vec2> = (0..100).map(|i| v(i as f64 * 10.0, 0.0)).collect();
        trim_tail_to_arc_length(&mut body, 300.0);
        assert!(arc_length(&body) <= 300.0);
        assert_eq!(*body.back().unwrap(), v(990.0, 0.0));
        assert!(body.len() > 1);
    }

    #[test]
    fn trim_never_drops_the_last_point() {
        let mut body: VecDeque<Vec2> = vec![v(0.0, 0.0), v(1_000.0, 0.0)].into();
        trim_tail_to_arc_length(&mut body, 1.0);
        assert_eq!(body.len(), 1);
        assert_eq!(body[0], v(1_000.0, 0.0));
    }

    #[test]
    fn decimate_keeps_head_and_bounds_count() {
        let body: VecDeque<Vec2> = (0..500).map(|i| v(i as f64, 0.0)).collect();
        let out = decimate_trailing(&body, 180, 3);
        assert!(out.len() <= 60);
        assert_eq!(*out.last().unwrap(), v(499.0, 0.0));
        // all points come from the trailing window
        assert!(out.iter().all(|p| p.x >= 320.0));
    }

    #[test]
    fn decimate_short_body_returns_everything_reachable() {
        let body: VecDeque<Vec2> = (0..4).map(|i| v(i as f64, 0.0)).collect();
        let out = decimate_trailing(&body, 180, 3);
        assert_eq!(out, vec![v(0.0, 0.0), v(3.0, 0.0)]);
    }
}
