//! Error types for flight planning.

use thiserror::Error;

use crate::geometry::Point;

/// Why a single navigation call gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationFailure {
    #[error("every heading was blocked or the move budget ran out")]
    HeadingsExhausted,

    #[error("search exceeded the call ceiling")]
    CallLimit,
}

/// Errors surfaced by the planner.
///
/// Only `NoFeasiblePlan` and the input-validation variants are fatal for a
/// whole session; `NoRoute` and `Navigation` abort a single seed.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid no-fly zone {index}: {reason}")]
    InvalidPolygon { index: usize, reason: String },

    #[error("invalid confinement area {min} .. {max}")]
    InvalidConfinement { min: Point, max: Point },

    #[error("duplicate target label: {0}")]
    DuplicateLabel(String),

    #[error("invalid planner parameters: {0}")]
    InvalidParams(String),

    #[error("no obstacle-free route from {from} to {to}")]
    NoRoute { from: Point, to: Point },

    #[error("navigation towards {target} failed: {failure}")]
    Navigation {
        target: String,
        failure: NavigationFailure,
    },

    #[error("no seed produced a complete flight plan ({seeds_tried} tried)")]
    NoFeasiblePlan { seeds_tried: u64 },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanError>;
