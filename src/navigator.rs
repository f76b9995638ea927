//! Quantized waypoint navigation.
//!
//! Turns an obstacle-evading waypoint chain into a sequence of
//! fixed-length moves whose headings are multiples of 10 degrees, using
//! a bounded depth-first search over headings with an explicit stack.

use std::collections::HashSet;

use log::trace;

use crate::error::NavigationFailure;
use crate::geometry::{path_length, quantize_heading, Point, PointKey};
use crate::obstacles::ObstacleSet;
use crate::types::Move;

/// Heading granularity in degrees.
pub const HEADING_STEP: u16 = 10;

/// Hard ceiling on heading attempts per navigation call.
pub const MAX_NAVIGATION_CALLS: usize = 50_000;

/// Offsets tried around the ideal heading: 0, +10, -10, ..., +170, -170, 180.
const HEADING_OFFSETS: [i32; 36] = {
    let mut out = [0i32; 36];
    let mut k = 1;
    while k < 18 {
        out[2 * k - 1] = 10 * k as i32;
        out[2 * k] = -(10 * k as i32);
        k += 1;
    }
    out[35] = 180;
    out
};

/// Where a navigation call terminates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capture {
    pub center: Point,
    pub radius: f64,
}

/// One level of the depth-first search.
#[derive(Debug, Clone, Copy)]
struct Frame {
    position: Point,
    waypoint: usize,
    base_heading: u16,
    next_offset: usize,
    moves_left: usize,
}

pub struct Navigator<'a> {
    obstacles: &'a ObstacleSet,
    move_length: f64,
    slack: usize,
}

impl<'a> Navigator<'a> {
    pub fn new(obstacles: &'a ObstacleSet, move_length: f64, slack: usize) -> Self {
        Self {
            obstacles,
            move_length,
            slack,
        }
    }

    /// Move budget for a chain: straight-line estimate plus slack.
    pub fn budget(&self, waypoints: &[Point]) -> usize {
        (path_length(waypoints) / self.move_length).ceil() as usize + self.slack
    }

    /// Navigate from `waypoints[0]` along the chain until a move ends
    /// strictly within `capture.radius` of `capture.center`.
    ///
    /// Intermediate waypoints count as rounded as soon as the following
    /// waypoint is in line of sight. Returned moves are in flight order
    /// and carry no captured label.
    pub fn navigate(
        &self,
        waypoints: &[Point],
        capture: Capture,
    ) -> Result<Vec<Move>, NavigationFailure> {
        let Some(&start) = waypoints.first() else {
            return Err(NavigationFailure::HeadingsExhausted);
        };
        let budget = self.budget(waypoints);
        let first = self.advance_waypoint(waypoints, 1.min(waypoints.len() - 1), start);

        let mut visited: HashSet<PointKey> = HashSet::new();
        visited.insert(start.key());

        let mut stack = vec![Frame {
            position: start,
            waypoint: first,
            base_heading: quantize_heading(start.bearing_to(waypoints[first]), HEADING_STEP),
            next_offset: 0,
            moves_left: budget,
        }];
        let mut moves: Vec<Move> = Vec::with_capacity(budget);
        let mut calls = 0usize;

        while let Some(frame) = stack.last_mut() {
            if frame.moves_left == 0 || frame.next_offset >= HEADING_OFFSETS.len() {
                trace!(
                    "backtrack at depth {} from {}",
                    moves.len(),
                    frame.position
                );
                stack.pop();
                moves.pop();
                continue;
            }

            calls += 1;
            if calls > MAX_NAVIGATION_CALLS {
                return Err(NavigationFailure::CallLimit);
            }

            let offset = HEADING_OFFSETS[frame.next_offset];
            frame.next_offset += 1;
            let heading = (frame.base_heading as i32 + offset).rem_euclid(360) as u16;
            let from = frame.position;
            let to = from.step(heading as f64, self.move_length);

            if self.obstacles.line_collision(from, to) || !visited.insert(to.key()) {
                continue;
            }

            let mv = Move {
                before: from,
                after: to,
                heading,
                captured: None,
            };
            if to.within(capture.center, capture.radius) {
                moves.push(mv);
                return Ok(moves);
            }

            let waypoint = self.advance_waypoint(waypoints, frame.waypoint, to);
            let moves_left = frame.moves_left - 1;
            moves.push(mv);
            stack.push(Frame {
                position: to,
                waypoint,
                base_heading: quantize_heading(to.bearing_to(waypoints[waypoint]), HEADING_STEP),
                next_offset: 0,
                moves_left,
            });
        }

        Err(NavigationFailure::HeadingsExhausted)
    }

    /// Skip corners that no longer need to be reached exactly: the next
    /// waypoint is in line of sight, or the corner is less than one move
    /// away.
    fn advance_waypoint(&self, waypoints: &[Point], mut idx: usize, position: Point) -> usize {
        let last = waypoints.len() - 1;
        while idx < last {
            let rounded = !self.obstacles.line_collision(position, waypoints[idx + 1])
                || position.distance(waypoints[idx]) < self.move_length;
            if !rounded {
                break;
            }
            idx += 1;
        }
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacles::Confinement;
    use crate::visibility::VisibilityGraph;
    use approx::assert_abs_diff_eq;

    const L: f64 = 0.3;

    fn area() -> Confinement {
        Confinement::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)).unwrap()
    }

    fn check_moves(set: &ObstacleSet, moves: &[Move], start: Point) {
        assert_eq!(moves[0].before, start);
        for w in moves.windows(2) {
            assert_eq!(w[0].after, w[1].before);
        }
        for m in moves {
            assert_abs_diff_eq!(m.before.distance(m.after), L, epsilon = 1e-9);
            assert_eq!(m.heading % 10, 0);
            assert!(m.heading < 360);
            assert!(!set.line_collision(m.before, m.after));
        }
    }

    #[test]
    fn offsets_cover_every_heading_once() {
        let mut seen: Vec<i32> = HEADING_OFFSETS.iter().map(|o| o.rem_euclid(360)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 36);
        assert_eq!(HEADING_OFFSETS[0], 0);
        assert_eq!(&HEADING_OFFSETS[1..3], &[10, -10]);
    }

    #[test]
    fn straight_line_in_open_space() {
        let set = ObstacleSet::from_rings(area(), &[]).unwrap();
        let nav = Navigator::new(&set, L, 4);
        let start = Point::new(1.0, 5.0);
        let target = Point::new(4.0, 5.0);
        let moves = nav
            .navigate(&[start, target], Capture { center: target, radius: 0.2 })
            .unwrap();
        check_moves(&set, &moves, start);
        assert!(moves.iter().all(|m| m.heading == 0));
        assert!(moves.last().unwrap().after.within(target, 0.2));
        assert_eq!(moves.len(), 10);
    }

    #[test]
    fn routes_around_triangle() {
        let set = ObstacleSet::from_rings(
            area(),
            &[vec![
                Point::new(4.0, 2.0),
                Point::new(6.0, 2.0),
                Point::new(5.0, 7.0),
            ]],
        )
        .unwrap();
        let graph = VisibilityGraph::new(&set);
        let start = Point::new(2.0, 6.0);
        let target = Point::new(8.0, 6.0);
        let route = graph.get_path(start, target).unwrap();
        let nav = Navigator::new(&set, L, 8);
        let moves = nav
            .navigate(&route, Capture { center: target, radius: 0.2 })
            .unwrap();
        check_moves(&set, &moves, start);
        assert!(moves.last().unwrap().after.within(target, 0.2));
        assert!(moves.len() <= nav.budget(&route));
    }

    #[test]
    fn blocked_start_exhausts_headings() {
        // Confinement narrower than a single move.
        let tight = Confinement::new(Point::new(0.0, 0.0), Point::new(0.2, 0.2)).unwrap();
        let set = ObstacleSet::new(tight, Vec::new());
        let nav = Navigator::new(&set, L, 2);
        let start = Point::new(0.1, 0.1);
        let target = Point::new(0.15, 0.15);
        let err = nav
            .navigate(&[start, target], Capture { center: target, radius: 0.01 })
            .unwrap_err();
        assert_eq!(err, NavigationFailure::HeadingsExhausted);
    }

    #[test]
    fn unreachable_precision_hits_call_limit() {
        let set = ObstacleSet::from_rings(area(), &[]).unwrap();
        let start = Point::new(1.0, 1.0);
        let target = Point::new(3.05, 2.13);
        for slack in [0, 2, 8] {
            let nav = Navigator::new(&set, L, slack);
            let err = nav
                .navigate(&[start, target], Capture { center: target, radius: 0.001 })
                .unwrap_err();
            assert_eq!(err, NavigationFailure::CallLimit);
        }
    }

    #[test]
    fn move_budget_ends_search() {
        // Two moves cannot land within 0.001 of a point 0.55 away at 5 degrees,
        // and the budget allows no third move.
        let set = ObstacleSet::from_rings(area(), &[]).unwrap();
        let nav = Navigator::new(&set, L, 0);
        let start = Point::new(1.0, 1.0);
        let target = start.step(5.0, 0.55);
        assert_eq!(nav.budget(&[start, target]), 2);
        let err = nav
            .navigate(&[start, target], Capture { center: target, radius: 0.001 })
            .unwrap_err();
        assert_eq!(err, NavigationFailure::HeadingsExhausted);
    }

    #[test]
    fn backs_out_of_dead_end() {
        // Corridor with a box that can only be passed along its top; flying
        // straight first leaves no way over it.
        let corridor = Confinement::new(Point::new(0.0, 0.8), Point::new(10.0, 1.2)).unwrap();
        let set = ObstacleSet::from_rings(
            corridor,
            &[vec![
                Point::new(1.35, 0.82),
                Point::new(1.6, 0.82),
                Point::new(1.6, 1.08),
                Point::new(1.35, 1.08),
            ]],
        )
        .unwrap();
        let nav = Navigator::new(&set, L, 0);
        let start = Point::new(1.0, 1.0);
        let target = Point::new(1.85, 1.0);
        assert!(!set.line_collision(start, start.step(0.0, L)));

        let moves = nav
            .navigate(&[start, target], Capture { center: target, radius: 0.1 })
            .unwrap();
        check_moves(&set, &moves, start);
        let headings: Vec<u16> = moves.iter().map(|m| m.heading).collect();
        assert_eq!(headings, vec![20, 0, 340]);
        assert!(moves.last().unwrap().after.within(target, 0.1));
    }

    #[test]
    fn corner_within_one_move_is_rounded() {
        let set = ObstacleSet::from_rings(
            area(),
            &[vec![
                Point::new(4.5, 1.5),
                Point::new(4.9, 1.5),
                Point::new(4.9, 2.0),
                Point::new(4.5, 2.0),
            ]],
        )
        .unwrap();
        let nav = Navigator::new(&set, L, 4);
        let wps = [Point::new(1.0, 1.0), Point::new(5.0, 1.0), Point::new(5.0, 5.0)];
        // Next waypoint hidden in both cases; only the near one is rounded.
        let near = Point::new(4.8, 1.0);
        let far = Point::new(4.6, 0.5);
        assert!(set.line_collision(near, wps[2]));
        assert!(set.line_collision(far, wps[2]));
        assert_eq!(nav.advance_waypoint(&wps, 1, near), 2);
        assert_eq!(nav.advance_waypoint(&wps, 1, far), 1);
    }

    #[test]
    fn corner_rounded_once_next_waypoint_visible() {
        let set = ObstacleSet::from_rings(area(), &[]).unwrap();
        let nav = Navigator::new(&set, L, 4);
        let wps = [Point::new(1.0, 1.0), Point::new(5.0, 1.0), Point::new(5.0, 5.0)];
        // With nothing in the way the corner is skipped immediately.
        assert_eq!(nav.advance_waypoint(&wps, 1, wps[0]), 2);
    }
}
