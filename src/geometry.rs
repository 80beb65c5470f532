//! 2D primitives shared by every other module: points, segment projection,
//! and heading arithmetic in degrees.

use serde::{Deserialize, Serialize};

/// A point in the plan frame, meters. Origin is the floorplan top-left,
/// `+x` right, `+y` down.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Point2 { x, y }
    }

    pub fn distance_to(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Wrap a heading in degrees into `[0, 360)`.
pub fn wrap_heading(deg: f64) -> f64 {
    let wrapped = deg % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// Shortest signed angular difference `a - b`, normalized to `(-180, 180]`.
pub fn heading_diff(a: f64, b: f64) -> f64 {
    let mut d = wrap_heading(a) - wrap_heading(b);
    d = ((d + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
    if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// Nudge `prev` toward `next` by fraction `alpha`, wrapping the result.
pub fn low_pass_heading(prev: f64, next: f64, alpha: f64) -> f64 {
    wrap_heading(prev + heading_diff(next, prev) * alpha)
}

/// Bearing from `a` to `b` in the plan frame: `0°` is `-y` ("up"),
/// `90°` is `+x`.
pub fn bearing(a: &Point2, b: &Point2) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    wrap_heading(dx.atan2(-dy).to_degrees())
}

/// Result of projecting a point onto a segment `a -> b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub t: f64,
    pub q: Point2,
    pub d: f64,
}

/// Project `p` onto segment `a -> b`, clamped to the segment.
pub fn project_point_to_segment(p: &Point2, a: &Point2, b: &Point2) -> Projection {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq <= 1e-9 {
        0.0
    } else {
        let apx = p.x - a.x;
        let apy = p.y - a.y;
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    };

    let q = Point2::new(a.x + t * abx, a.y + t * aby);
    let d = p.distance_to(&q);
    Projection { t, q, d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wrap_heading_into_range() {
        assert_relative_eq!(wrap_heading(370.0), 10.0, epsilon = 1e-9);
        assert_relative_eq!(wrap_heading(-10.0), 350.0, epsilon = 1e-9);
        assert_relative_eq!(wrap_heading(0.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn wrap_heading_idempotent() {
        for x in [-400.0, -1.0, 0.0, 359.9, 721.0] {
            let once = wrap_heading(x);
            let twice = wrap_heading(once);
            assert_relative_eq!(once, twice, epsilon = 1e-9);
        }
    }

    #[test]
    fn heading_diff_range_and_identity() {
        assert_relative_eq!(heading_diff(10.0, 10.0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(heading_diff(350.0, 10.0), -20.0, epsilon = 1e-9);
        assert_relative_eq!(heading_diff(10.0, 350.0), 20.0, epsilon = 1e-9);
        // boundary: exactly 180 must map to +180, not -180.
        assert_relative_eq!(heading_diff(180.0, 0.0), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn project_point_onto_segment_clamped() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        let mid = project_point_to_segment(&Point2::new(5.0, 3.0), &a, &b);
        assert_relative_eq!(mid.t, 0.5, epsilon = 1e-9);
        assert_relative_eq!(mid.d, 3.0, epsilon = 1e-9);

        let before = project_point_to_segment(&Point2::new(-5.0, 0.0), &a, &b);
        assert_relative_eq!(before.t, 0.0, epsilon = 1e-9);

        let after = project_point_to_segment(&Point2::new(15.0, 0.0), &a, &b);
        assert_relative_eq!(after.t, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn project_point_equal_to_endpoint() {
        let a = Point2::new(1.0, 1.0);
        let b = Point2::new(4.0, 5.0);
        let proj = project_point_to_segment(&a, &a, &b);
        assert_relative_eq!(proj.t, 0.0, epsilon = 1e-9);
        assert_relative_eq!(proj.d, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn project_degenerate_segment() {
        let a = Point2::new(2.0, 2.0);
        let b = Point2::new(2.0, 2.0 + 1e-6);
        let proj = project_point_to_segment(&Point2::new(5.0, 5.0), &a, &b);
        assert_relative_eq!(proj.t, 0.0, epsilon = 1e-9);
    }
}
