//! Screen/world transforms and the connection curve shared by painting and
//! hit-testing.

use egui::{pos2, Pos2, Rect, Vec2};

/// Pan/zoom of the canvas. `screen = world * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub zoom: f32,
    pub pan: Vec2,
}

impl View {
    pub fn new(zoom: f32) -> Self {
        Self {
            zoom,
            pan: Vec2::ZERO,
        }
    }

    pub fn world_to_screen(&self, world: Pos2) -> Pos2 {
        pos2(world.x * self.zoom + self.pan.x, world.y * self.zoom + self.pan.y)
    }

    pub fn screen_to_world(&self, screen: Pos2) -> Pos2 {
        pos2(
            (screen.x - self.pan.x) / self.zoom,
            (screen.y - self.pan.y) / self.zoom,
        )
    }

    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.world_to_screen(rect.min), self.world_to_screen(rect.max))
    }

    /// Zooms by `factor` around `anchor` (screen space), keeping the world
    /// point under the anchor where it is.
    pub fn zoom_around(&mut self, anchor: Pos2, factor: f32, min: f32, max: f32) {
        let world = self.screen_to_world(anchor);
        self.zoom = (self.zoom * factor).clamp(min, max);
        self.pan = Vec2::new(anchor.x - world.x * self.zoom, anchor.y - world.y * self.zoom);
    }
}

/// Control points of a connection: horizontal tangents at both ends, pulled
/// out by half the horizontal span.
pub fn connection_curve(start: Pos2, end: Pos2) -> [Pos2; 4] {
    let pull = (end.x - start.x).abs() * 0.5;
    [
        start,
        pos2(start.x + pull, start.y),
        pos2(end.x - pull, end.y),
        end,
    ]
}

pub fn compute_cubic_bezier_points(points: [Pos2; 4], segments: usize) -> Vec<Pos2> {
    let [p0, p1, p2, p3] = points;
    let segments = segments.max(1);
    let mut out = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let one_minus_t = 1.0 - t;
        let a = one_minus_t.powi(3);
        let b = 3.0 * t * one_minus_t.powi(2);
        let c = 3.0 * t.powi(2) * one_minus_t;
        let d = t.powi(3);
        let x = a * p0.x + b * p1.x + c * p2.x + d * p3.x;
        let y = a * p0.y + b * p1.y + c * p2.y + d * p3.y;
        out.push(pos2(x, y));
    }
    out
}

/// True when any sample of the connection curve lies within `threshold` of
/// `point`.
pub fn is_point_near_connection(
    point: Pos2,
    start: Pos2,
    end: Pos2,
    threshold: f32,
    samples: usize,
) -> bool {
    compute_cubic_bezier_points(connection_curve(start, end), samples)
        .into_iter()
        .any(|p| p.distance(point) < threshold)
}

/// True when any sample of the connection curve falls inside `rect`.
pub fn connection_touches_rect(start: Pos2, end: Pos2, rect: Rect, samples: usize) -> bool {
    compute_cubic_bezier_points(connection_curve(start, end), samples)
        .into_iter()
        .any(|p| rect.contains(p))
}

/// Normalized rectangle spanned by two corners.
pub fn rect_from_corners(a: Pos2, b: Pos2) -> Rect {
    Rect::from_two_pos(a, b)
}

/// Closed-interval overlap; rectangles that merely touch still overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    !(b.min.x > a.max.x || b.max.x < a.min.x || b.min.y > a.max.y || b.max.y < a.min.y)
}

/// Distance from `point` to the nearest point of `rect`, zero inside it.
pub fn distance_to_rect(point: Pos2, rect: Rect) -> f32 {
    let dx = (rect.min.x - point.x).max(0.0).max(point.x - rect.max.x);
    let dy = (rect.min.y - point.y).max(0.0).max(point.y - rect.max.y);
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_world_round_trip() {
        let view = View {
            zoom: 0.5,
            pan: Vec2::new(40.0, -20.0),
        };
        let world = pos2(100.0, 300.0);
        let screen = view.world_to_screen(world);
        assert_eq!(screen, pos2(90.0, 130.0));
        assert_eq!(view.screen_to_world(screen), world);
    }

    #[test]
    fn test_zoom_around_keeps_anchor_fixed() {
        let mut view = View::new(1.0);
        let anchor = pos2(200.0, 150.0);
        let before = view.screen_to_world(anchor);
        view.zoom_around(anchor, 1.1, 0.05, 2.0);
        let after = view.screen_to_world(anchor);
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((before.y - after.y).abs() < 1e-3);
        assert!((view.zoom - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = View::new(1.9);
        view.zoom_around(Pos2::ZERO, 1.1, 0.05, 2.0);
        assert_eq!(view.zoom, 2.0);
    }

    #[test]
    fn test_curve_endpoints_and_tangents() {
        let [p0, p1, p2, p3] = connection_curve(pos2(0.0, 0.0), pos2(100.0, 50.0));
        assert_eq!(p0, pos2(0.0, 0.0));
        assert_eq!(p1, pos2(50.0, 0.0));
        assert_eq!(p2, pos2(50.0, 50.0));
        assert_eq!(p3, pos2(100.0, 50.0));
        let samples = compute_cubic_bezier_points([p0, p1, p2, p3], 20);
        assert_eq!(samples.len(), 21);
        assert_eq!(samples[0], p0);
        assert_eq!(samples[20], p3);
    }

    #[test]
    fn test_point_near_connection() {
        let start = pos2(0.0, 0.0);
        let end = pos2(200.0, 0.0);
        assert!(is_point_near_connection(pos2(100.0, 2.0), start, end, 5.0, 20));
        assert!(!is_point_near_connection(pos2(100.0, 30.0), start, end, 5.0, 20));
    }

    #[test]
    fn test_rect_helpers() {
        let a = rect_from_corners(pos2(10.0, 10.0), pos2(0.0, 0.0));
        assert_eq!(a.min, pos2(0.0, 0.0));
        let touching = Rect::from_min_max(pos2(10.0, 0.0), pos2(20.0, 10.0));
        assert!(rects_overlap(a, touching));
        let apart = Rect::from_min_max(pos2(11.0, 0.0), pos2(20.0, 10.0));
        assert!(!rects_overlap(a, apart));
        assert_eq!(distance_to_rect(pos2(5.0, 5.0), a), 0.0);
        assert_eq!(distance_to_rect(pos2(13.0, 14.0), a), 5.0);
    }
}
