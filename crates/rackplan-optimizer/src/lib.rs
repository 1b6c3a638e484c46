//! rackplan layout optimizer — multi-objective search over rack placements.
//!
//! Given a rack snapshot, a lock set, and a weight vector over four
//! objectives, finds a placement of the unlocked devices that scores well
//! on cabling, weight distribution, thermal safety, and service access.
//!
//! # Components
//!
//! - **`problem`** — Lock resolution and occupancy checks
//! - **`seed`** — Feasibility checks and the starting placement (with repair)
//! - **`moves`** — Swap and relocate proposals
//! - **`scorer`** — The four objectives and their weighting
//! - **`search`** — Annealing loop, budgets, and cancellation
//! - **`optimizer`** — Entry point tying the above together
//! - **`request`** — Request shapes resolved against an inventory

pub mod moves;
pub mod optimizer;
pub mod problem;
pub mod request;
pub mod scorer;
pub mod search;
pub mod seed;

pub use optimizer::{OptimizationResult, Optimizer, OptimizerConfig, optimize};
pub use request::{OptimizeRequest, ThermalQuery, WeightsInput};
pub use scorer::{ObjectiveWeights, ScoreBreakdown, ScoringConfig};
pub use search::{CancelFlag, SearchConfig, SearchStats, StopReason};
pub use seed::SeedSource;
