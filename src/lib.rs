//! Quantized drone flight planner.
//!
//! Plans a closed flight from a start point through a set of sensor
//! targets and back, avoiding no-fly zones, where every move has the
//! same length and a heading that is a multiple of 10 degrees. Seeds are
//! evaluated in parallel and the flight with the fewest moves is kept.
//!
//! With the `python` feature the crate also builds as a Python extension
//! exposing `plan_json`, which takes a JSON plan request and returns a
//! JSON flight plan.

pub mod cache;
pub mod error;
pub mod flight;
pub mod geometry;
pub mod navigator;
pub mod obstacles;
pub mod planner;
pub mod prng;
pub mod tour;
pub mod types;
pub mod visibility;

pub use error::{PlanError, Result};
pub use geometry::Point;
pub use planner::{plan, plan_json};
pub use types::{FlightPlan, Move, PlanRequest, PlannerParams, Target, TargetRole};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;

    /// Plan a flight.
    ///
    /// Takes a JSON string matching `PlanRequest` and returns a JSON
    /// string matching `FlightPlan`.
    #[pyfunction]
    fn plan_json(request_json: &str) -> PyResult<String> {
        crate::planner::plan_json(request_json).map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Flight planning failed: {e}"))
        })
    }

    /// Flight planner, importable from Python.
    #[pymodule]
    fn flight_planner(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(plan_json, m)?)?;
        Ok(())
    }
}
