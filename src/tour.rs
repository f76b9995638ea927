//! Tour construction over the start point and every target.
//!
//! Edge weights are obstacle-evading path lengths. A seeded random
//! permutation is improved with best-improvement 2-opt; several passes
//! with independent PCG streams keep the shortest result. An optional
//! refinement stage then re-ranks near-optimal swaps by the true number
//! of quantized moves they need.
//!
//! Tours are index orders into the stop table with the start at index 0.

use log::debug;
use rayon::prelude::*;

use crate::geometry::Point;
use crate::prng::Pcg32;
use crate::types::PlannerParams;
use crate::visibility::VisibilityGraph;

/// Weight standing in for a pair with no obstacle-free route, large
/// enough that 2-opt removes such edges whenever it can.
pub const UNREACHABLE_COST: f64 = 1e6;

/// Minimum weight reduction for a 2-opt swap to count as an improvement.
const IMPROVEMENT_EPS: f64 = 1e-12;

/// Scores a closed tour by flight moves. `None` marks an infeasible tour.
pub trait TourCost {
    fn tour_moves(&self, closed_tour: &[usize]) -> Option<usize>;
}

/// Complete graph on the stops with symmetric obstacle-evading weights.
#[derive(Debug, Clone)]
pub struct TourGraph {
    weights: Vec<Vec<f64>>,
}

impl TourGraph {
    pub fn build(graph: &VisibilityGraph<'_>, points: &[Point]) -> Self {
        let n = points.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i + 1..n)
                    .map(|j| {
                        graph
                            .get_path_length(points[i], points[j])
                            .unwrap_or(f64::INFINITY)
                    })
                    .collect()
            })
            .collect();

        let mut weights = vec![vec![0.0; n]; n];
        for i in 0..n {
            for (k, &w) in upper[i].iter().enumerate() {
                let j = i + 1 + k;
                weights[i][j] = w;
                weights[j][i] = w;
            }
        }
        Self { weights }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn is_reachable(&self, i: usize, j: usize) -> bool {
        self.weights[i][j].is_finite()
    }

    /// Edge weight with unreachable pairs replaced by `UNREACHABLE_COST`.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        let w = self.weights[i][j];
        if w.is_finite() {
            w
        } else {
            UNREACHABLE_COST
        }
    }

    /// Length of the cycle visiting `order` and returning to its head.
    pub fn tour_length(&self, order: &[usize]) -> f64 {
        let m = order.len();
        if m < 2 {
            return 0.0;
        }
        (0..m).map(|k| self.weight(order[k], order[(k + 1) % m])).sum()
    }

    /// Weight change from replacing edges (i,i+1),(j,j+1) with
    /// (i,j),(i+1,j+1) on the cycle.
    fn swap_delta(&self, order: &[usize], i: usize, j: usize) -> f64 {
        let m = order.len();
        let (a, b) = (order[i], order[i + 1]);
        let (c, d) = (order[j], order[(j + 1) % m]);
        self.weight(a, c) + self.weight(b, d) - self.weight(a, b) - self.weight(c, d)
    }
}

/// Non-adjacent edge pairs of a cycle of length `m`.
fn swap_pairs(m: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..m.saturating_sub(1)).flat_map(move |i| {
        (i + 2..m)
            .filter(move |&j| !(i == 0 && j == m - 1))
            .map(move |j| (i, j))
    })
}

/// Best-improvement 2-opt until a local optimum or `max_rounds` swaps.
/// Returns the number of swaps applied.
pub fn two_opt(graph: &TourGraph, order: &mut [usize], max_rounds: u32) -> u32 {
    let m = order.len();
    if m < 4 {
        return 0;
    }
    let mut rounds = 0;
    while rounds < max_rounds {
        let mut best_delta = -IMPROVEMENT_EPS;
        let mut best_pair = None;
        for (i, j) in swap_pairs(m) {
            let delta = graph.swap_delta(order, i, j);
            if delta < best_delta {
                best_delta = delta;
                best_pair = Some((i, j));
            }
        }
        match best_pair {
            Some((i, j)) => order[i + 1..=j].reverse(),
            None => break,
        }
        rounds += 1;
    }
    rounds
}

/// Rotate the cycle so the start (index 0) comes first.
pub fn rotate_to_start(order: &mut [usize]) {
    if let Some(pos) = order.iter().position(|&s| s == 0) {
        order.rotate_left(pos);
    }
}

/// Closed form of an open tour: start first and last.
pub fn closed_tour(order: &[usize]) -> Vec<usize> {
    let mut closed = order.to_vec();
    if let Some(&first) = order.first() {
        closed.push(first);
    }
    closed
}

/// Best tour over `params.two_opt_passes` seeded restarts. The result
/// is open, with the start first. Pass `k` always draws from stream `k`
/// of `seed`, so adding passes never makes the result longer.
pub fn build_tour(graph: &TourGraph, seed: u64, params: &PlannerParams) -> Vec<usize> {
    let n = graph.len();
    let mut best: Option<(f64, Vec<usize>)> = None;

    for pass in 0..params.two_opt_passes.max(1) {
        let mut rng = Pcg32::new(seed, pass as u64);
        let mut order: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut order);
        two_opt(graph, &mut order, params.max_two_opt_rounds);
        rotate_to_start(&mut order);

        let length = graph.tour_length(&order);
        if best.as_ref().map_or(true, |(b, _)| length < *b) {
            best = Some((length, order));
        }
    }

    let (length, order) = best.unwrap_or((0.0, Vec::new()));
    debug!("seed {seed}: tour length {length:.6} over {n} stops");
    order
}

/// Second-stage 2-opt ranked by flight moves instead of distance.
///
/// Only swaps whose tour length stays within `refine_tolerance` of the
/// current length are evaluated, since move counting is far more
/// expensive than summing weights. Returns the move count of the final
/// order, or `None` if the starting order is itself infeasible.
pub fn refine_tour(
    graph: &TourGraph,
    order: &mut Vec<usize>,
    params: &PlannerParams,
    cost: &impl TourCost,
) -> Option<usize> {
    let mut best_moves = cost.tour_moves(&closed_tour(order))?;
    let mut best_length = graph.tour_length(order);
    let m = order.len();
    if m < 4 {
        return Some(best_moves);
    }

    for _ in 0..params.max_refine_rounds {
        let limit = best_length * (1.0 + params.refine_tolerance);
        let mut improvement: Option<(Vec<usize>, usize, f64)> = None;

        for (i, j) in swap_pairs(m) {
            let length = best_length + graph.swap_delta(order, i, j);
            if length > limit {
                continue;
            }
            let mut candidate = order.clone();
            candidate[i + 1..=j].reverse();
            let Some(moves) = cost.tour_moves(&closed_tour(&candidate)) else {
                continue;
            };
            let to_beat = improvement.as_ref().map_or(best_moves, |(_, mv, _)| *mv);
            if moves < to_beat {
                improvement = Some((candidate, moves, length));
            }
        }

        match improvement {
            Some((candidate, moves, length)) => {
                debug!("refinement: {best_moves} -> {moves} moves");
                *order = candidate;
                best_moves = moves;
                best_length = length;
            }
            None => break,
        }
    }
    Some(best_moves)
}
