//! Evolution engine for molecular optimization.
//!
//! # Overview
//!
//! The engine consists of:
//!
//! - **Genome Operations** (`genome`): random molecule generation and
//!   structural mutation
//! - **Fitness Functions** (`fitness`): one scoring rule per target property
//! - **Search** (`search`): tournament selection with elitism, the
//!   generation loop, and the run state machine
//! - **Driver** (`driver`): cancellable periodic scheduling and the
//!   command/snapshot surface for external hosts
//!
//! # Example
//!
//! ```rust,no_run
//! use evomol::engine::{EvolutionEngine, RunStatus};
//! use evomol::schema::EvolutionConfig;
//!
//! let mut engine = EvolutionEngine::new(EvolutionConfig::default());
//! engine.start();
//! while engine.status() == RunStatus::Running {
//!     engine.step_generation();
//!     if let Some(record) = engine.history().last() {
//!         println!(
//!             "generation {}: best fitness = {:.3}",
//!             record.generation, record.best
//!         );
//!     }
//! }
//! ```

mod driver;
mod fitness;
mod genome;
mod search;

pub use driver::{DEFAULT_TICK, EvolutionDriver, ProgressCallback};
pub use fitness::{FITNESS_MAX, FITNESS_MIN, FitnessEvaluator, connected_components};
pub use genome::MoleculeRng;
pub use search::{
    EvolutionEngine, EvolutionSnapshot, FitnessRecord, RunStatus, TOURNAMENT_SIZE, select_parents,
};
