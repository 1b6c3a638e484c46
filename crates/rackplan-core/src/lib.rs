//! rackplan core — shared types for rack layout planning.
//!
//! Racks, devices, cabling, placement values and their invariants, the
//! error taxonomy, and the `rackplan.toml` configuration file. The thermal
//! evaluator and layout optimizer crates build on these.

pub mod config;
pub mod error;
pub mod inventory;
pub mod placement;
pub mod types;

pub use config::PlannerConfig;
pub use error::{ConstraintViolation, InfeasibleRequest, RackError, RackResult, ValidationError};
pub use inventory::{Inventory, RackSnapshot};
pub use placement::{Placement, UnitRange, free_gaps};
pub use types::*;
