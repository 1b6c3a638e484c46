//! rackplan thermal evaluator — lightweight airflow and heat model.
//!
//! Given a rack and a concrete placement, estimates a per-unit temperature
//! profile, flags hotspots and airflow conflicts, and checks the heat load
//! against the rack's cooling rating. This is a deterministic approximation
//! for ranking layouts and flagging hazards, not a CFD model.
//!
//! # Components
//!
//! - **`model`** — Vertical heat accumulation per unit
//! - **`airflow`** — Opposing-airflow detection between neighbours
//! - **`evaluator`** — Validation plus report assembly
//! - **`report`** — Serializable report types
//! - **`config`** — Model coefficients

pub mod airflow;
pub mod config;
pub mod evaluator;
pub mod model;
pub mod report;

pub use config::ThermalConfig;
pub use evaluator::{ThermalEvaluator, evaluate};
pub use report::{AirflowConflict, CoolingVerdict, PowerSummary, ThermalReport};
