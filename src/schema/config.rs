//! Configuration types for evolution runs: parameters and target properties.

use serde::{Deserialize, Serialize};

/// Tunable parameters of one evolution run.
///
/// Supplied externally and immutable for the duration of a run except via an
/// explicit reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvolutionParams {
    /// Number of molecules in the population.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Probability in [0, 1] applied independently per mutation-operator trial.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Generation index at which the run completes.
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,
    /// Number of top individuals copied unmutated into the next generation.
    #[serde(default = "default_elitism_count")]
    pub elitism_count: usize,
    /// Maximum atoms per molecule.
    #[serde(default = "default_max_atoms")]
    pub max_atoms: usize,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
            max_generations: default_max_generations(),
            elitism_count: default_elitism_count(),
            max_atoms: default_max_atoms(),
        }
    }
}

fn default_population_size() -> usize {
    30
}
fn default_mutation_rate() -> f64 {
    0.3
}
fn default_max_generations() -> u64 {
    100
}
fn default_elitism_count() -> usize {
    2
}
fn default_max_atoms() -> usize {
    15
}

/// Single-parameter update command.
///
/// Applied by the controller only while no run is active; during a run,
/// parameters change exclusively through a reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "param", content = "value")]
pub enum ParamUpdate {
    PopulationSize(usize),
    MutationRate(f64),
    MaxGenerations(u64),
    ElitismCount(usize),
    MaxAtoms(usize),
}

impl EvolutionParams {
    /// Apply a single-parameter update in place.
    pub fn apply(&mut self, update: ParamUpdate) {
        match update {
            ParamUpdate::PopulationSize(v) => self.population_size = v,
            ParamUpdate::MutationRate(v) => self.mutation_rate = v,
            ParamUpdate::MaxGenerations(v) => self.max_generations = v,
            ParamUpdate::ElitismCount(v) => self.elitism_count = v,
            ParamUpdate::MaxAtoms(v) => self.max_atoms = v,
        }
    }
}

/// Chemical property the fitness function rewards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TargetProperty {
    /// Count of Carbon atoms.
    MaximizeCarbon,
    /// Count of Oxygen atoms.
    MaximizeOxygen,
    /// Count of Nitrogen atoms.
    MaximizeNitrogen,
    /// Total atom count.
    MaximizeAtoms,
    /// Total bond count.
    MaximizeBonds,
    /// Atom count divided by connected-component count; rewards both
    /// connectivity and size.
    MinimizeFragments,
    /// Point target on molecular weight: 100 / (1 + |weight - goal|).
    TargetWeight { goal: f64 },
    /// Range target on molecular weight: 100 inside [min, max], otherwise
    /// 100 minus the distance outside the nearest bound, floored at 0.
    WeightRange { min: f64, max: f64 },
    /// Valence satisfaction score: exact match +2, under-valent +0.5,
    /// over-valent -2 per excess bond; averaged, shifted +5, floored at 0.
    Stability,
    /// Count of terminal oxygens (-OH-like pattern).
    HydroxylGroups,
    /// Count of partially saturated nitrogens.
    AmineGroups,
    /// Lipinski-like drug-likeness score, integer 0-3.
    DrugLikeness,
}

impl Default for TargetProperty {
    fn default() -> Self {
        Self::Stability
    }
}

/// Top-level configuration for an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Run parameters.
    #[serde(default)]
    pub params: EvolutionParams,
    /// Fitness target property.
    #[serde(default)]
    pub target: TargetProperty,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            params: EvolutionParams::default(),
            target: TargetProperty::default(),
            random_seed: None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 1")]
    PopulationTooSmall,
    #[error("Mutation rate {0} is outside [0, 1]")]
    InvalidMutationRate(f64),
    #[error("Molecules need room for at least 2 atoms, got {0}")]
    MaxAtomsTooSmall(usize),
    #[error("Elitism count {elitism} exceeds population size {population}")]
    ElitismExceedsPopulation { elitism: usize, population: usize },
    #[error("Target weight goal must be finite, got {0}")]
    InvalidWeightGoal(f64),
    #[error("Weight range min ({min}) must not exceed max ({max})")]
    InvalidWeightRange { min: f64, max: f64 },
}

impl EvolutionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.params.population_size < 1 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if !(0.0..=1.0).contains(&self.params.mutation_rate) {
            return Err(ConfigError::InvalidMutationRate(self.params.mutation_rate));
        }
        if self.params.max_atoms < 2 {
            return Err(ConfigError::MaxAtomsTooSmall(self.params.max_atoms));
        }
        if self.params.elitism_count > self.params.population_size {
            return Err(ConfigError::ElitismExceedsPopulation {
                elitism: self.params.elitism_count,
                population: self.params.population_size,
            });
        }
        match self.target {
            TargetProperty::TargetWeight { goal } if !goal.is_finite() => {
                return Err(ConfigError::InvalidWeightGoal(goal));
            }
            TargetProperty::WeightRange { min, max } if !(min <= max) => {
                return Err(ConfigError::InvalidWeightRange { min, max });
            }
            _ => {}
        }
        Ok(())
    }
}
