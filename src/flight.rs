//! Flight assembly: turning a tour into quantized moves.
//!
//! Each leg flies from the current position to one stop. The route is
//! the visibility-graph shortest path to an aim point, which for sensors
//! is shifted towards the following stop when that shortens the flight
//! (corner cutting). The leg ends on the first move that enters the
//! stop's capture radius, measured from the stop's true location.
//!
//! Stop 0 is the start point and doubles as the final return target.

use log::trace;

use crate::cache::{FlightLengthCache, LegKey, LegSummary};
use crate::error::{PlanError, Result};
use crate::geometry::{bisect_directions, direction, Point};
use crate::navigator::{Capture, Navigator};
use crate::tour::TourCost;
use crate::types::{Move, PlannerParams, Target, TargetRole};
use crate::visibility::VisibilityGraph;

/// Aim point for a sensor between `prev` and `next`.
///
/// Candidates are shifted by `fraction * radius` from `target` along the
/// bisector of the corner and along the bisectors of each half-angle.
/// The candidate giving the shortest collision-free `prev -> p -> next`
/// wins; if none beats going through `target` itself, `target` is kept.
pub fn corner_cut(
    graph: &VisibilityGraph<'_>,
    prev: Point,
    target: Point,
    next: Point,
    radius: f64,
    fraction: f64,
) -> Point {
    let (Some(to_prev), Some(to_next)) = (direction(target, prev), direction(target, next)) else {
        return target;
    };
    let shift = fraction * radius;
    if shift <= 0.0 {
        return target;
    }
    let mid = bisect_directions(to_prev, to_next);
    let candidates = [
        mid,
        bisect_directions(mid, to_prev),
        bisect_directions(mid, to_next),
    ];

    let obstacles = graph.obstacles();
    let mut best = target;
    let mut best_length = prev.distance(target) + target.distance(next);
    for (dx, dy) in candidates {
        let p = target.offset(dx * shift, dy * shift);
        let length = prev.distance(p) + p.distance(next);
        if length < best_length
            && !obstacles.line_collision(prev, p)
            && !obstacles.line_collision(p, next)
        {
            best = p;
            best_length = length;
        }
    }
    best
}

/// Everything needed to fly legs within one planning session.
pub struct FlightBuilder<'a> {
    graph: &'a VisibilityGraph<'a>,
    navigator: Navigator<'a>,
    stops: &'a [Target],
    params: &'a PlannerParams,
    cache: &'a FlightLengthCache,
}

impl<'a> FlightBuilder<'a> {
    /// `stops[0]` must be the start/return point.
    pub fn new(
        graph: &'a VisibilityGraph<'a>,
        stops: &'a [Target],
        params: &'a PlannerParams,
        cache: &'a FlightLengthCache,
    ) -> Self {
        Self {
            graph,
            navigator: Navigator::new(graph.obstacles(), params.move_length, params.move_slack),
            stops,
            params,
            cache,
        }
    }

    fn aim_point(&self, from: Point, target: usize, next: Option<usize>) -> Point {
        let stop = &self.stops[target];
        match (stop.role, next) {
            (TargetRole::Sensor, Some(next)) => corner_cut(
                self.graph,
                from,
                stop.location,
                self.stops[next].location,
                self.params.sensor_radius,
                self.params.corner_cut_fraction,
            ),
            _ => stop.location,
        }
    }

    /// Fly from `from` to stop `target`; `next` is the stop after it.
    pub fn plan_leg(&self, from: Point, target: usize, next: Option<usize>) -> Result<Vec<Move>> {
        let stop = &self.stops[target];
        let aim = self.aim_point(from, target, next);
        let route = self
            .graph
            .get_path(from, aim)
            .ok_or(PlanError::NoRoute { from, to: aim })?;

        let capture = Capture {
            center: stop.location,
            radius: stop.capture_radius(self.params),
        };
        let mut moves = self
            .navigator
            .navigate(&route, capture)
            .map_err(|failure| PlanError::Navigation {
                target: stop.label.clone(),
                failure,
            })?;
        trace!("leg to {} in {} moves", stop.label, moves.len());

        if stop.role == TargetRole::Sensor {
            if let Some(last) = moves.last_mut() {
                last.captured = Some(stop.label.clone());
            }
        }
        Ok(moves)
    }

    /// Move count and end position of a leg, served from the cache.
    pub fn leg_summary(&self, from: Point, target: usize, next: Option<usize>) -> Result<LegSummary> {
        self.cache
            .get_or_compute(LegKey::new(from, target, next), || {
                let moves = self.plan_leg(from, target, next)?;
                Ok(LegSummary {
                    moves: moves.len(),
                    end: moves.last().map_or(from, |m| m.after),
                })
            })
    }

    /// Total moves for a closed tour, using cached leg summaries.
    pub fn move_count(&self, closed_tour: &[usize]) -> Result<usize> {
        let Some(&first) = closed_tour.first() else {
            return Ok(0);
        };
        let mut position = self.stops[first].location;
        let mut total = 0;
        for k in 1..closed_tour.len() {
            let leg = self.leg_summary(position, closed_tour[k], closed_tour.get(k + 1).copied())?;
            total += leg.moves;
            position = leg.end;
        }
        Ok(total)
    }

    /// Full move list for a closed tour, computed without the cache.
    pub fn build_moves(&self, closed_tour: &[usize]) -> Result<Vec<Move>> {
        let Some(&first) = closed_tour.first() else {
            return Ok(Vec::new());
        };
        let mut position = self.stops[first].location;
        let mut moves = Vec::new();
        for k in 1..closed_tour.len() {
            let leg = self.plan_leg(position, closed_tour[k], closed_tour.get(k + 1).copied())?;
            if let Some(last) = leg.last() {
                position = last.after;
            }
            moves.extend(leg);
        }
        Ok(moves)
    }
}

impl TourCost for FlightBuilder<'_> {
    fn tour_moves(&self, closed_tour: &[usize]) -> Option<usize> {
        self.move_count(closed_tour).ok()
    }
}
