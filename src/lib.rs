//! evomol - Evolutionary optimization over graph-structured molecules.
//!
//! This crate evolves a population of small molecular graphs (typed atom
//! nodes, undirected bond edges) toward a user-selected chemical-property
//! objective using random generation, fitness evaluation, tournament
//! selection with elitism, and validity-preserving structural mutation.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Molecule data model, the element catalog, and run
//!   configuration
//! - `engine`: Generation, fitness, selection/mutation, and the
//!   run/pause/resume/reset controller
//!
//! # Example
//!
//! ```rust,no_run
//! use evomol::{EvolutionConfig, EvolutionEngine, RunStatus, TargetProperty};
//!
//! let mut config = EvolutionConfig::default();
//! config.target = TargetProperty::TargetWeight { goal: 60.0 };
//!
//! let mut engine = EvolutionEngine::new(config);
//! engine.start();
//! while engine.status() == RunStatus::Running {
//!     engine.step_generation();
//! }
//!
//! if let Some(best) = engine.best() {
//!     println!("best: {} (fitness {:.2})", best.formula(), best.fitness);
//! }
//! ```

pub mod engine;
pub mod schema;

// Re-export commonly used types
pub use engine::{
    EvolutionDriver, EvolutionEngine, EvolutionSnapshot, FitnessEvaluator, FitnessRecord,
    MoleculeRng, ProgressCallback, RunStatus,
};
pub use schema::{
    Atom, Bond, Element, EvolutionConfig, EvolutionParams, Molecule, ParamUpdate, TargetProperty,
};
