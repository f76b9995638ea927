//! Planner data model.
//!
//! Every struct here derives Serialize + Deserialize so callers can move
//! requests and plans through whatever interchange format they use.

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::geometry::Point;
use crate::obstacles::Confinement;

// -- Targets -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetRole {
    /// Pass-through point; captured within `end_radius`, no label recorded.
    Waypoint,
    /// Sensor to read; captured within `sensor_radius`.
    #[default]
    Sensor,
    /// Final return point; captured within `end_radius`.
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub label: String,
    pub location: Point,
    #[serde(default)]
    pub role: TargetRole,
}

impl Target {
    pub fn sensor(label: impl Into<String>, location: Point) -> Self {
        Self {
            label: label.into(),
            location,
            role: TargetRole::Sensor,
        }
    }

    pub fn waypoint(label: impl Into<String>, location: Point) -> Self {
        Self {
            label: label.into(),
            location,
            role: TargetRole::Waypoint,
        }
    }

    pub fn capture_radius(&self, params: &PlannerParams) -> f64 {
        match self.role {
            TargetRole::Sensor => params.sensor_radius,
            TargetRole::Waypoint | TargetRole::End => params.end_radius,
        }
    }
}

// -- Moves / plans -------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub before: Point,
    pub after: Point,
    /// Heading in degrees, a multiple of 10 in [0, 360).
    pub heading: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPlan {
    pub seed: u64,
    pub moves: Vec<Move>,
    /// True when the move list was cut at `max_moves`.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub seeds_evaluated: u64,
    #[serde(default)]
    pub candidates: usize,
}

impl FlightPlan {
    /// Fitness is the number of moves, lower is better.
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Labels in capture order.
    pub fn captured_labels(&self) -> Vec<&str> {
        self.moves
            .iter()
            .filter_map(|m| m.captured.as_deref())
            .collect()
    }
}

// -- Parameters ----------------------------------------------------

fn default_move_length() -> f64 {
    0.0003
}

fn default_sensor_radius() -> f64 {
    0.0002
}

fn default_end_radius() -> f64 {
    0.0003
}

fn default_max_moves() -> usize {
    150
}

fn default_iterations() -> u64 {
    16
}

fn default_two_opt_passes() -> u32 {
    4
}

fn default_max_two_opt_rounds() -> u32 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_refine_tolerance() -> f64 {
    0.10
}

fn default_max_refine_rounds() -> u32 {
    8
}

fn default_corner_cut_fraction() -> f64 {
    0.5
}

fn default_move_slack() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerParams {
    /// Fixed length of every move.
    #[serde(default = "default_move_length")]
    pub move_length: f64,
    #[serde(default = "default_sensor_radius")]
    pub sensor_radius: f64,
    #[serde(default = "default_end_radius")]
    pub end_radius: f64,
    /// Hard cap on the returned move list.
    #[serde(default = "default_max_moves")]
    pub max_moves: usize,
    #[serde(default)]
    pub confinement: Confinement,
    /// First seed of the sequence handed to workers.
    #[serde(default)]
    pub seed: u64,
    /// Seeds evaluated when `time_budget_ms` is 0.
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Wall-clock budget in milliseconds, 0 disables it.
    #[serde(default)]
    pub time_budget_ms: u64,
    /// Worker threads, 0 = rayon default.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_two_opt_passes")]
    pub two_opt_passes: u32,
    #[serde(default = "default_max_two_opt_rounds")]
    pub max_two_opt_rounds: u32,
    /// Re-rank near-optimal 2-opt swaps by true move count.
    #[serde(default = "default_true")]
    pub refine_with_moves: bool,
    /// Relative distance slack for swaps considered during refinement.
    #[serde(default = "default_refine_tolerance")]
    pub refine_tolerance: f64,
    #[serde(default = "default_max_refine_rounds")]
    pub max_refine_rounds: u32,
    /// Corner-cut shift as a fraction of `sensor_radius`.
    #[serde(default = "default_corner_cut_fraction")]
    pub corner_cut_fraction: f64,
    /// Extra moves allowed per leg beyond the straight-line estimate.
    #[serde(default = "default_move_slack")]
    pub move_slack: usize,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            move_length: default_move_length(),
            sensor_radius: default_sensor_radius(),
            end_radius: default_end_radius(),
            max_moves: default_max_moves(),
            confinement: Confinement::default(),
            seed: 0,
            iterations: default_iterations(),
            time_budget_ms: 0,
            threads: 0,
            two_opt_passes: default_two_opt_passes(),
            max_two_opt_rounds: default_max_two_opt_rounds(),
            refine_with_moves: true,
            refine_tolerance: default_refine_tolerance(),
            max_refine_rounds: default_max_refine_rounds(),
            corner_cut_fraction: default_corner_cut_fraction(),
            move_slack: default_move_slack(),
        }
    }
}

impl PlannerParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_time_budget(mut self, ms: u64) -> Self {
        self.time_budget_ms = ms;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_confinement(mut self, confinement: Confinement) -> Self {
        self.confinement = confinement;
        self
    }

    /// Sets move length and both capture radii together.
    pub fn with_scale(mut self, move_length: f64, sensor_radius: f64, end_radius: f64) -> Self {
        self.move_length = move_length;
        self.sensor_radius = sensor_radius;
        self.end_radius = end_radius;
        self
    }

    pub fn with_max_moves(mut self, max_moves: usize) -> Self {
        self.max_moves = max_moves;
        self
    }

    pub fn with_two_opt_passes(mut self, passes: u32) -> Self {
        self.two_opt_passes = passes.max(1);
        self
    }

    pub fn with_refinement(mut self, enabled: bool) -> Self {
        self.refine_with_moves = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.move_length) {
            return Err(PlanError::InvalidParams(format!(
                "move_length must be positive, got {}",
                self.move_length
            )));
        }
        if !positive(self.sensor_radius) || !positive(self.end_radius) {
            return Err(PlanError::InvalidParams(
                "capture radii must be positive".into(),
            ));
        }
        if self.time_budget_ms == 0 && self.iterations == 0 {
            return Err(PlanError::InvalidParams(
                "iterations must be non-zero when no time budget is set".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.corner_cut_fraction) {
            return Err(PlanError::InvalidParams(format!(
                "corner_cut_fraction must be in [0, 1), got {}",
                self.corner_cut_fraction
            )));
        }
        if self.refine_tolerance < 0.0 {
            return Err(PlanError::InvalidParams(
                "refine_tolerance must not be negative".into(),
            ));
        }
        Confinement::new(self.confinement.min, self.confinement.max)?;
        Ok(())
    }
}

// -- Requests ------------------------------------------------------

/// One planning session's static inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub start: Point,
    #[serde(default)]
    pub targets: Vec<Target>,
    /// No-fly zones as implicitly closed vertex rings.
    #[serde(default)]
    pub no_fly_zones: Vec<Vec<Point>>,
    #[serde(default)]
    pub params: PlannerParams,
}
