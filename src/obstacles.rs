//! No-fly zone model: confinement rectangle, obstacle polygons and
//! collision queries.
//!
//! An `ObstacleSet` is immutable once built and is shared read-only by
//! every worker of a planning session.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::geometry::{bisect_directions, direction, point_in_polygon, segments_intersect, Point};

/// Outward offset applied to polygon vertices when they become
/// visibility-graph vertices.
pub const OUTLINE_MARGIN: f64 = 1e-5;

/// Rectangular permitted flight region. Its boundary is excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Confinement {
    pub min: Point,
    pub max: Point,
}

impl Confinement {
    pub fn new(min: Point, max: Point) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min.lng >= max.lng || min.lat >= max.lat {
            return Err(PlanError::InvalidConfinement { min, max });
        }
        Ok(Self { min, max })
    }

    /// Strictly inside the rectangle.
    pub fn contains(&self, p: Point) -> bool {
        self.min.lng < p.lng && p.lng < self.max.lng && self.min.lat < p.lat && p.lat < self.max.lat
    }
}

impl Default for Confinement {
    fn default() -> Self {
        Self {
            min: Point::new(-3.192473, 55.942617),
            max: Point::new(-3.184319, 55.946233),
        }
    }
}

/// Immutable obstacle ring with a cached bounding box.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Point>,
    bbox_min: Point,
    bbox_max: Point,
}

impl Polygon {
    /// Build a polygon from an implicitly closed ring. A duplicated
    /// closing vertex (GeoJSON style) is dropped.
    pub fn new(index: usize, mut vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(PlanError::InvalidPolygon {
                index,
                reason: format!("{} distinct vertices, need at least 3", vertices.len()),
            });
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PlanError::InvalidPolygon {
                index,
                reason: "non-finite coordinate".into(),
            });
        }
        let mut bbox_min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut bbox_max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &vertices {
            bbox_min.lng = bbox_min.lng.min(v.lng);
            bbox_min.lat = bbox_min.lat.min(v.lat);
            bbox_max.lng = bbox_max.lng.max(v.lng);
            bbox_max.lat = bbox_max.lat.max(v.lat);
        }
        Ok(Self {
            vertices,
            bbox_min,
            bbox_max,
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Edges of the closed ring as (start, end) pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn contains(&self, p: Point) -> bool {
        self.bbox_contains(p) && point_in_polygon(p, &self.vertices)
    }

    fn bbox_contains(&self, p: Point) -> bool {
        self.bbox_min.lng <= p.lng
            && p.lng <= self.bbox_max.lng
            && self.bbox_min.lat <= p.lat
            && p.lat <= self.bbox_max.lat
    }

    /// Cheap rejection: does the segment's bounding box overlap ours?
    fn bbox_overlaps_segment(&self, a: Point, b: Point) -> bool {
        a.lng.max(b.lng) >= self.bbox_min.lng
            && a.lng.min(b.lng) <= self.bbox_max.lng
            && a.lat.max(b.lat) >= self.bbox_min.lat
            && a.lat.min(b.lat) <= self.bbox_max.lat
    }

    pub fn crossed_by(&self, a: Point, b: Point) -> bool {
        if !self.bbox_overlaps_segment(a, b) {
            return false;
        }
        self.edges().any(|(p, q)| segments_intersect(a, b, p, q))
    }

    /// Ring offset outward by `margin` along each vertex's edge bisector.
    ///
    /// For a convex vertex the bisector of the two incident edges points
    /// into the polygon, for a reflex vertex it points out, so the side is
    /// chosen by testing which candidate lies outside.
    pub fn outline(&self, margin: f64) -> Vec<Point> {
        let vertices = self.vertices();
        let n = vertices.len();
        let mut out = Vec::with_capacity(n);
        for (i, &v) in vertices.iter().enumerate() {
            let prev = vertices[(i + n - 1) % n];
            let next = vertices[(i + 1) % n];
            let to_prev = direction(v, prev).unwrap_or((0.0, 0.0));
            let to_next = direction(v, next).unwrap_or((0.0, 0.0));
            let (bx, by) = bisect_directions(to_prev, to_next);

            let forward = v.offset(bx * margin, by * margin);
            let backward = v.offset(-bx * margin, -by * margin);
            let chosen = match (self.contains(forward), self.contains(backward)) {
                (false, true) => forward,
                (true, false) => backward,
                // Ambiguous at this scale: keep the candidate farther
                // from the centroid.
                _ => {
                    let c = self.centroid();
                    if forward.distance(c) >= backward.distance(c) {
                        forward
                    } else {
                        backward
                    }
                }
            };
            out.push(chosen);
        }
        out
    }

    fn centroid(&self) -> Point {
        let vertices = self.vertices();
        let n = vertices.len() as f64;
        let lng = vertices.iter().map(|v| v.lng).sum::<f64>() / n;
        let lat = vertices.iter().map(|v| v.lat).sum::<f64>() / n;
        Point::new(lng, lat)
    }
}

/// Static set of no-fly zones inside a confinement rectangle.
#[derive(Debug, Clone)]
pub struct ObstacleSet {
    confinement: Confinement,
    polygons: Vec<Polygon>,
}

impl ObstacleSet {
    pub fn new(confinement: Confinement, polygons: Vec<Polygon>) -> Self {
        Self {
            confinement,
            polygons,
        }
    }

    /// Build from raw vertex rings, validating each one.
    pub fn from_rings(confinement: Confinement, rings: &[Vec<Point>]) -> Result<Self> {
        let polygons = rings
            .iter()
            .enumerate()
            .map(|(i, ring)| Polygon::new(i, ring.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(confinement, polygons))
    }

    pub fn in_confinement(&self, p: Point) -> bool {
        self.confinement.contains(p)
    }

    /// True if the segment leaves the confinement area or crosses any
    /// obstacle edge.
    pub fn line_collision(&self, a: Point, b: Point) -> bool {
        if !self.in_confinement(a) || !self.in_confinement(b) {
            return true;
        }
        self.polygons.iter().any(|poly| poly.crossed_by(a, b))
    }

    /// True if the point is outside confinement or inside any obstacle.
    pub fn point_in_obstacle(&self, p: Point) -> bool {
        !self.in_confinement(p) || self.polygons.iter().any(|poly| poly.contains(p))
    }

    /// Outline points of every polygon that are usable as free-space
    /// vertices: inside confinement and not inside another obstacle.
    pub fn outline_points(&self, margin: f64) -> Vec<Point> {
        self.polygons
            .iter()
            .flat_map(|poly| poly.outline(margin))
            .filter(|&p| !self.point_in_obstacle(p))
            .collect()
    }
}
