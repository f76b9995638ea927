//! Multi-seed planning orchestrator.
//!
//! A planning session builds the static structures once (obstacle set,
//! visibility graph, tour distance matrix, leg cache) and then hands out
//! seeds from a shared atomic counter to a pool of workers. Each seed
//! yields an independent tour and flight; the plan with the fewest moves
//! wins, ties going to the earliest seed handed out, so the result does
//! not depend on how many threads ran or in which order seeds finished.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::cache::FlightLengthCache;
use crate::error::{PlanError, Result};
use crate::flight::FlightBuilder;
use crate::geometry::Point;
use crate::obstacles::ObstacleSet;
use crate::tour::{self, TourGraph};
use crate::types::{FlightPlan, Move, PlanRequest, PlannerParams, Target, TargetRole};
use crate::visibility::VisibilityGraph;

/// Label given to the start point when it is the final target.
const HOME_LABEL: &str = "home";

/// Monotone seed source shared by all workers of a session.
#[derive(Debug)]
pub struct SeedSequence {
    base: u64,
    issued: AtomicU64,
}

impl SeedSequence {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            issued: AtomicU64::new(0),
        }
    }

    /// Next (index, seed) pair. Indices are unique and dense.
    pub fn next(&self) -> (u64, u64) {
        let index = self.issued.fetch_add(1, Ordering::SeqCst);
        (index, self.base.wrapping_add(index))
    }

    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Candidate {
    /// Position in the seed sequence.
    index: u64,
    seed: u64,
    moves: Vec<Move>,
}

/// Fewest moves wins; ties go to the earliest index.
fn select_best(mut candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.sort_by_key(|c| c.index);
    let best = candidates
        .iter()
        .enumerate()
        .min_by_key(|(i, c)| (c.moves.len(), *i))
        .map(|(i, _)| i)?;
    Some(candidates.swap_remove(best))
}

/// Static state for one planning request.
pub struct PlanningSession<'a> {
    params: &'a PlannerParams,
    graph: VisibilityGraph<'a>,
    stops: Vec<Target>,
    tour_graph: TourGraph,
    cache: FlightLengthCache,
}

impl<'a> PlanningSession<'a> {
    pub fn new(
        obstacles: &'a ObstacleSet,
        start: Point,
        targets: &[Target],
        params: &'a PlannerParams,
    ) -> Result<Self> {
        if obstacles.point_in_obstacle(start) {
            return Err(PlanError::InvalidParams(format!(
                "start {start} is outside the confinement area or inside a no-fly zone"
            )));
        }
        let mut labels = HashSet::new();
        for t in targets {
            if !labels.insert(t.label.as_str()) {
                return Err(PlanError::DuplicateLabel(t.label.clone()));
            }
            if t.role == TargetRole::End {
                return Err(PlanError::InvalidParams(format!(
                    "target {} uses the end role, which is reserved for the return point",
                    t.label
                )));
            }
            if !t.location.is_finite() {
                return Err(PlanError::InvalidParams(format!(
                    "target {} has a non-finite location",
                    t.label
                )));
            }
        }

        let mut stops = Vec::with_capacity(targets.len() + 1);
        stops.push(Target {
            label: HOME_LABEL.into(),
            location: start,
            role: TargetRole::End,
        });
        stops.extend(targets.iter().cloned());

        let graph = VisibilityGraph::new(obstacles);
        let points: Vec<Point> = stops.iter().map(|s| s.location).collect();
        let tour_graph = TourGraph::build(&graph, &points);
        for (i, stop) in stops.iter().enumerate().skip(1) {
            if !tour_graph.is_reachable(0, i) {
                warn!("no obstacle-free route from the start to {}", stop.label);
            }
        }

        Ok(Self {
            params,
            graph,
            stops,
            tour_graph,
            cache: FlightLengthCache::new(),
        })
    }

    fn flight_builder(&self) -> FlightBuilder<'_> {
        FlightBuilder::new(&self.graph, &self.stops, self.params, &self.cache)
    }

    /// Tour and flight for a single seed.
    pub fn evaluate_seed(&self, seed: u64) -> Result<Vec<Move>> {
        let builder = self.flight_builder();
        let mut order = tour::build_tour(&self.tour_graph, seed, self.params);
        if self.params.refine_with_moves {
            tour::refine_tour(&self.tour_graph, &mut order, self.params, &builder);
        }
        builder.build_moves(&tour::closed_tour(&order))
    }

    /// Evaluate seeds in parallel and return the best plan.
    pub fn run(&self) -> Result<FlightPlan> {
        let params = self.params;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.threads)
            .build()?;
        let workers = pool.current_num_threads();

        let deadline = (params.time_budget_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(params.time_budget_ms));
        let limit = deadline.is_none().then_some(params.iterations);

        info!(
            "planning {} targets: {} workers, seed base {}, {}",
            self.stops.len() - 1,
            workers,
            params.seed,
            match deadline {
                Some(_) => format!("{} ms budget", params.time_budget_ms),
                None => format!("{} seeds", params.iterations),
            }
        );

        let seeds = SeedSequence::new(params.seed);
        let evaluated = AtomicU64::new(0);
        let candidates: Mutex<Vec<Candidate>> = Mutex::new(Vec::new());

        pool.scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| self.worker(&seeds, limit, deadline, &evaluated, &candidates));
            }
        });

        let seeds_evaluated = evaluated.load(Ordering::SeqCst);
        let candidates = candidates.into_inner();
        debug!(
            "leg cache: {} entries, {} hits, {} misses",
            self.cache.len(),
            self.cache.hits(),
            self.cache.misses()
        );

        let candidate_count = candidates.len();
        let Some(Candidate {
            seed, mut moves, ..
        }) = select_best(candidates)
        else {
            if deadline.is_some() {
                warn!("time budget ran out with no complete flight");
            }
            return Err(PlanError::NoFeasiblePlan {
                seeds_tried: seeds_evaluated,
            });
        };

        let truncated = moves.len() > params.max_moves;
        if truncated {
            warn!(
                "best flight needs {} moves, truncating to {}",
                moves.len(),
                params.max_moves
            );
            moves.truncate(params.max_moves);
        }

        info!(
            "selected seed {seed} with {} moves ({candidate_count} candidates, {seeds_evaluated} seeds)",
            moves.len()
        );
        Ok(FlightPlan {
            seed,
            moves,
            truncated,
            seeds_evaluated,
            candidates: candidate_count,
        })
    }

    fn worker(
        &self,
        seeds: &SeedSequence,
        limit: Option<u64>,
        deadline: Option<Instant>,
        evaluated: &AtomicU64,
        candidates: &Mutex<Vec<Candidate>>,
    ) {
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            let (index, seed) = seeds.next();
            if limit.is_some_and(|l| index >= l) {
                break;
            }

            let outcome = self.evaluate_seed(seed);
            if deadline.is_some_and(|d| Instant::now() > d) {
                debug!("seed {seed} finished after the deadline, discarded");
                break;
            }
            evaluated.fetch_add(1, Ordering::SeqCst);

            match outcome {
                Ok(moves) => {
                    debug!("seed {seed}: {} moves", moves.len());
                    candidates.lock().push(Candidate { index, seed, moves });
                }
                Err(e) => debug!("seed {seed} failed: {e}"),
            }
        }
    }
}

/// Plan a flight for `request`.
pub fn plan(request: &PlanRequest) -> Result<FlightPlan> {
    let params = &request.params;
    params.validate()?;
    let obstacles = ObstacleSet::from_rings(params.confinement, &request.no_fly_zones)?;
    let session = PlanningSession::new(&obstacles, request.start, &request.targets, params)?;
    session.run()
}

/// JSON-in, JSON-out wrapper around [`plan`].
pub fn plan_json(request_json: &str) -> Result<String> {
    let request: PlanRequest = serde_json::from_str(request_json)?;
    let plan = plan(&request)?;
    Ok(serde_json::to_string(&plan)?)
}
