//! Planar geometry on (lng, lat) coordinates.
//!
//! The flight area is small enough that longitude/latitude are treated
//! as Euclidean coordinates. Headings are measured in degrees
//! counter-clockwise from east (0 = east, 90 = north).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Decimal scale used when hashing positions (10 decimal places).
const KEY_SCALE: f64 = 1e10;

/// Tolerance for orientation tests.
const ORIENT_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lng: f64,
    pub lat: f64,
}

impl Point {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.lng - other.lng).hypot(self.lat - other.lat)
    }

    /// Bearing from `self` to `other` in degrees, normalized to [0, 360).
    pub fn bearing_to(self, other: Point) -> f64 {
        let deg = (other.lat - self.lat).atan2(other.lng - self.lng).to_degrees();
        normalize_degrees(deg)
    }

    /// Position after travelling `length` along `heading_deg`.
    pub fn step(self, heading_deg: f64, length: f64) -> Point {
        let rad = heading_deg.to_radians();
        Point {
            lng: self.lng + length * rad.cos(),
            lat: self.lat + length * rad.sin(),
        }
    }

    /// Strictly within `radius` of `other`.
    pub fn within(self, other: Point, radius: f64) -> bool {
        self.distance(other) < radius
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point {
            lng: self.lng + dx,
            lat: self.lat + dy,
        }
    }

    pub fn is_finite(self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }

    pub fn key(self) -> PointKey {
        PointKey::from(self)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lng, self.lat)
    }
}

/// Hashable position rounded to a fixed decimal precision, absorbing
/// floating-point jitter between positions reached along different paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(i64, i64);

impl From<Point> for PointKey {
    fn from(p: Point) -> Self {
        PointKey(
            (p.lng * KEY_SCALE).round() as i64,
            (p.lat * KEY_SCALE).round() as i64,
        )
    }
}

pub fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Round a bearing to the nearest multiple of `granularity` degrees,
/// returned as an integer heading in [0, 360).
pub fn quantize_heading(deg: f64, granularity: u16) -> u16 {
    let g = granularity as f64;
    let rounded = (normalize_degrees(deg) / g).round() * g;
    (rounded as u32 % 360) as u16
}

/// Unit vector from `from` towards `to`, or `None` when they coincide.
pub fn direction(from: Point, to: Point) -> Option<(f64, f64)> {
    let dx = to.lng - from.lng;
    let dy = to.lat - from.lat;
    let len = dx.hypot(dy);
    if len <= 0.0 {
        None
    } else {
        Some((dx / len, dy / len))
    }
}

/// Unit direction bisecting the angle between `origin -> a` and
/// `origin -> b`.
///
/// When the two directions are opposite the bisector is the left
/// perpendicular of `origin -> a`. Returns `None` if either direction
/// is degenerate.
pub fn bisector(origin: Point, a: Point, b: Point) -> Option<(f64, f64)> {
    let (ax, ay) = direction(origin, a)?;
    let (bx, by) = direction(origin, b)?;
    Some(bisect_directions((ax, ay), (bx, by)))
}

/// Unit bisector of two unit directions.
pub fn bisect_directions(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    let sx = a.0 + b.0;
    let sy = a.1 + b.1;
    let len = sx.hypot(sy);
    if len < 1e-12 {
        return (-a.1, a.0);
    }
    (sx / len, sy / len)
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.lng - a.lng) * (c.lat - a.lat) - (b.lat - a.lat) * (c.lng - a.lng)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.lng >= a.lng.min(b.lng) - ORIENT_EPS
        && p.lng <= a.lng.max(b.lng) + ORIENT_EPS
        && p.lat >= a.lat.min(b.lat) - ORIENT_EPS
        && p.lat <= a.lat.max(b.lat) + ORIENT_EPS
}

/// True if segments `p1-p2` and `q1-q2` share any point, touching included.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > ORIENT_EPS && d2 < -ORIENT_EPS) || (d1 < -ORIENT_EPS && d2 > ORIENT_EPS))
        && ((d3 > ORIENT_EPS && d4 < -ORIENT_EPS) || (d3 < -ORIENT_EPS && d4 > ORIENT_EPS))
    {
        return true;
    }

    (d1.abs() <= ORIENT_EPS && on_segment(q1, q2, p1))
        || (d2.abs() <= ORIENT_EPS && on_segment(q1, q2, p2))
        || (d3.abs() <= ORIENT_EPS && on_segment(p1, p2, q1))
        || (d4.abs() <= ORIENT_EPS && on_segment(p1, p2, q2))
}

/// Ray-casting point-in-polygon test over an implicitly closed ring.
pub fn point_in_polygon(p: Point, ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lng, ring[i].lat);
        let (xj, yj) = (ring[j].lng, ring[j].lat);
        if (yi > p.lat) != (yj > p.lat) {
            let intersect_x = (xj - xi) * (p.lat - yi) / (yj - yi) + xi;
            if p.lng < intersect_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Total length of a polyline.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bearing_cardinal_directions() {
        let o = Point::new(0.0, 0.0);
        assert_abs_diff_eq!(o.bearing_to(Point::new(1.0, 0.0)), 0.0);
        assert_abs_diff_eq!(o.bearing_to(Point::new(0.0, 1.0)), 90.0);
        assert_abs_diff_eq!(o.bearing_to(Point::new(-1.0, 0.0)), 180.0);
        assert_abs_diff_eq!(o.bearing_to(Point::new(0.0, -1.0)), 270.0);
    }

    #[test]
    fn step_keeps_length() {
        let o = Point::new(-3.19, 55.94);
        for h in (0..360).step_by(10) {
            let p = o.step(h as f64, 0.0003);
            assert_abs_diff_eq!(o.distance(p), 0.0003, epsilon = 1e-12);
        }
    }

    #[test]
    fn quantize_wraps_to_zero() {
        assert_eq!(quantize_heading(356.0, 10), 0);
        assert_eq!(quantize_heading(-4.0, 10), 0);
        assert_eq!(quantize_heading(14.9, 10), 10);
        assert_eq!(quantize_heading(185.0, 10), 190);
    }

    #[test]
    fn bisector_of_right_angle() {
        let (x, y) = bisector(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        )
        .unwrap();
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_abs_diff_eq!(x, s, epsilon = 1e-12);
        assert_abs_diff_eq!(y, s, epsilon = 1e-12);
    }

    #[test]
    fn bisector_of_opposite_directions_is_perpendicular() {
        let (x, y) = bisector(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(-1.0, 0.0),
        )
        .unwrap();
        assert_abs_diff_eq!(x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
            Point::new(2.0, 0.0),
        ));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(2.0, 1.0),
        ));
    }

    #[test]
    fn touching_endpoint_counts() {
        assert!(segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
        ));
    }

    #[test]
    fn point_inside_square() {
        let sq = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(point_in_polygon(Point::new(0.5, 0.5), &sq));
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &sq));
    }

    #[test]
    fn nearby_points_share_key() {
        let a = Point::new(-3.1884, 55.9444);
        let b = Point::new(-3.1884 + 1e-15, 55.9444 - 1e-15);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Point::new(-3.1884, 55.9445).key());
    }
}
