//! Evolution controller: selection, the generation loop, and the run state
//! machine.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::fitness::FitnessEvaluator;
use super::genome::MoleculeRng;
use crate::schema::{EvolutionConfig, EvolutionParams, Molecule, ParamUpdate, TargetProperty};

/// Individuals sampled per tournament round.
pub const TOURNAMENT_SIZE: usize = 3;

/// Run status of the evolution controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// No run in progress.
    #[default]
    Idle,
    /// Generation steps are being produced.
    Running,
    /// Run suspended; resumable.
    Paused,
    /// Generation limit reached.
    Completed,
}

/// One completed generation's fitness summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FitnessRecord {
    /// Generation index the record describes.
    pub generation: u64,
    /// Best fitness in that generation.
    pub best: f64,
    /// Average fitness across the population.
    pub average: f64,
}

/// Read-only snapshot of controller state for external observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionSnapshot {
    /// Active run parameters.
    pub params: EvolutionParams,
    /// Active target property.
    pub target: TargetProperty,
    /// Current population with up-to-date fitness.
    pub population: Vec<Molecule>,
    /// Current generation index.
    pub generation: u64,
    /// Best individual seen so far in this run.
    pub best: Option<Molecule>,
    /// Per-generation fitness history.
    pub history: Vec<FitnessRecord>,
    /// Run status.
    pub status: RunStatus,
}

/// Select a parent list from an evaluated population.
///
/// The top `elitism_count` individuals by descending fitness (stable order)
/// come first; 3-way tournament selection with replacement fills the list to
/// the population's length. An empty population yields an empty list.
pub fn select_parents(
    population: &[Molecule],
    elitism_count: usize,
    rng: &mut MoleculeRng,
) -> Vec<Molecule> {
    if population.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<&Molecule> = population.iter().collect();
    ranked.sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));

    let mut parents: Vec<Molecule> = ranked
        .iter()
        .take(elitism_count)
        .map(|m| (*m).clone())
        .collect();

    while parents.len() < population.len() {
        let mut winner = ranked[rng.pick(ranked.len())];
        for _ in 1..TOURNAMENT_SIZE {
            let challenger = ranked[rng.pick(ranked.len())];
            if challenger.fitness > winner.fitness {
                winner = challenger;
            }
        }
        parents.push(winner.clone());
    }

    parents
}

/// Evolution controller owning all mutable simulation state.
///
/// All external interaction goes through the defined commands plus the
/// [`snapshot`](EvolutionEngine::snapshot) read surface; there is no direct
/// mutation from outside. The engine is fully synchronous; cooperative
/// scheduling lives in [`super::EvolutionDriver`].
pub struct EvolutionEngine {
    params: EvolutionParams,
    evaluator: FitnessEvaluator,
    rng: MoleculeRng,
    population: Vec<Molecule>,
    generation: u64,
    best: Option<Molecule>,
    history: Vec<FitnessRecord>,
    status: RunStatus,
}

impl EvolutionEngine {
    /// Create a new controller in the Idle state.
    pub fn new(config: EvolutionConfig) -> Self {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        Self {
            params: config.params,
            evaluator: FitnessEvaluator::new(config.target),
            rng: MoleculeRng::new(seed),
            population: Vec::new(),
            generation: 0,
            best: None,
            history: Vec::new(),
            status: RunStatus::Idle,
        }
    }

    /// Current run status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Current generation index.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active run parameters.
    pub fn params(&self) -> &EvolutionParams {
        &self.params
    }

    /// Active target property.
    pub fn target(&self) -> &TargetProperty {
        self.evaluator.target()
    }

    /// Current population.
    pub fn population(&self) -> &[Molecule] {
        &self.population
    }

    /// Best individual seen so far in this run.
    pub fn best(&self) -> Option<&Molecule> {
        self.best.as_ref()
    }

    /// Per-generation fitness history.
    pub fn history(&self) -> &[FitnessRecord] {
        &self.history
    }

    /// Clone out a read-only snapshot of the full controller state.
    pub fn snapshot(&self) -> EvolutionSnapshot {
        EvolutionSnapshot {
            params: self.params,
            target: self.evaluator.target().clone(),
            population: self.population.clone(),
            generation: self.generation,
            best: self.best.clone(),
            history: self.history.clone(),
            status: self.status,
        }
    }

    /// Whether a run is active (running or paused).
    pub fn run_active(&self) -> bool {
        matches!(self.status, RunStatus::Running | RunStatus::Paused)
    }

    /// Start a fresh run with a random population.
    ///
    /// Resets the generation counter, history, and best individual.
    pub fn start(&mut self) {
        self.clear_run_state();
        self.spawn_random_population();
        self.evaluate_population();
        self.status = RunStatus::Running;
        log::info!(
            "run started: population={} target={:?}",
            self.population.len(),
            self.evaluator.target()
        );
    }

    /// Start a fresh run seeded from one template molecule.
    ///
    /// The population is the seed itself plus mutated copies produced at a
    /// doubled mutation rate for stronger initial diversity. A zero-atom
    /// seed is silently ignored.
    pub fn start_from_seed(&mut self, seed: &Molecule) {
        if seed.atoms.is_empty() {
            log::debug!("ignoring seeded start with a zero-atom molecule");
            return;
        }

        self.clear_run_state();
        let size = self.params.population_size;
        let rate = (self.params.mutation_rate * 2.0).min(1.0);

        let mut population = Vec::with_capacity(size);
        if size > 0 {
            population.push(seed.duplicate());
        }
        while population.len() < size {
            population.push(self.rng.mutate(seed, rate, self.params.max_atoms));
        }

        self.population = population;
        self.evaluate_population();
        self.status = RunStatus::Running;
        log::info!(
            "seeded run started: population={} seed_atoms={}",
            self.population.len(),
            seed.atoms.len()
        );
    }

    /// Suspend a running simulation.
    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Paused;
        }
    }

    /// Resume a paused simulation, completing immediately if the generation
    /// limit was already reached.
    pub fn resume(&mut self) {
        if self.status != RunStatus::Paused {
            return;
        }
        if self.generation >= self.params.max_generations {
            self.status = RunStatus::Completed;
        } else {
            self.status = RunStatus::Running;
        }
    }

    /// Return to Idle, installing new parameters and target property and
    /// discarding the population, history, and best individual.
    pub fn reset(&mut self, params: EvolutionParams, target: TargetProperty) {
        self.params = params;
        self.evaluator = FitnessEvaluator::new(target);
        self.clear_run_state();
        self.status = RunStatus::Idle;
        log::info!("controller reset");
    }

    /// Apply a single-parameter update outside an active run.
    ///
    /// Parameters are immutable for the duration of a run; updates issued
    /// while running or paused are ignored.
    pub fn update_params(&mut self, update: ParamUpdate) {
        if self.run_active() {
            log::warn!("ignoring parameter update during an active run: {update:?}");
            return;
        }
        self.params.apply(update);
    }

    /// Swap the target property outside an active run.
    pub fn update_target_property(&mut self, target: TargetProperty) {
        if self.run_active() {
            log::warn!("ignoring target update during an active run: {target:?}");
            return;
        }
        self.evaluator = FitnessEvaluator::new(target);
    }

    /// Perform one generation step.
    ///
    /// Records the current generation in the history, advances the best
    /// individual, and either completes the run (once the generation index
    /// reaches the limit) or breeds, mutates, and evaluates the next
    /// generation. No-op unless Running.
    pub fn step_generation(&mut self) {
        if self.status != RunStatus::Running {
            return;
        }

        if self.population.is_empty() {
            log::warn!("population empty while running; reseeding a fresh random population");
            self.spawn_random_population();
            self.evaluate_population();
        }

        // Stable descending sort keeps tie order reproducible.
        self.population
            .sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap_or(Ordering::Equal));

        let generation_best = self.population.first().map(|m| m.fitness).unwrap_or(0.0);

        // The stored best never regresses; replace only on strict improvement.
        if let Some(top) = self.population.first() {
            let improved = self.best.as_ref().is_none_or(|b| top.fitness > b.fitness);
            if improved {
                self.best = Some(top.duplicate());
            }
        }

        let average = if self.population.is_empty() {
            0.0
        } else {
            let sum: f64 = self.population.iter().map(|m| m.fitness).sum();
            let mean = sum / self.population.len() as f64;
            if mean.is_finite() { mean } else { 0.0 }
        };

        self.history.push(FitnessRecord {
            generation: self.generation,
            best: generation_best,
            average,
        });

        if self.generation >= self.params.max_generations {
            self.status = RunStatus::Completed;
            log::info!(
                "run completed at generation {} with best fitness {:?}",
                self.generation,
                self.best.as_ref().map(|m| m.fitness)
            );
            return;
        }

        let parents = select_parents(&self.population, self.params.elitism_count, &mut self.rng);
        let size = self.params.population_size;

        let mut next = Vec::with_capacity(size);
        for parent in parents.iter().take(self.params.elitism_count.min(size)) {
            next.push(parent.duplicate());
        }
        while next.len() < size {
            let parent = &parents[self.rng.pick(parents.len())];
            next.push(
                self.rng
                    .mutate(parent, self.params.mutation_rate, self.params.max_atoms),
            );
        }

        self.population = next;
        self.evaluate_population();
        self.generation += 1;
    }

    fn clear_run_state(&mut self) {
        self.generation = 0;
        self.history.clear();
        self.best = None;
        self.population.clear();
    }

    fn spawn_random_population(&mut self) {
        let size = self.params.population_size;
        let max_atoms = self.params.max_atoms;
        self.population = (0..size).map(|_| self.rng.random_molecule(max_atoms)).collect();
    }

    /// Recompute fitness for the whole population in parallel.
    fn evaluate_population(&mut self) {
        let evaluator = &self.evaluator;
        self.population.par_iter_mut().for_each(|molecule| {
            molecule.fitness = evaluator.evaluate(molecule);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Element;

    fn test_config(population_size: usize, max_generations: u64) -> EvolutionConfig {
        EvolutionConfig {
            params: EvolutionParams {
                population_size,
                mutation_rate: 0.3,
                max_generations,
                elitism_count: 2,
                max_atoms: 8,
            },
            target: TargetProperty::MaximizeBonds,
            random_seed: Some(42),
        }
    }

    fn molecule_with_fitness(fitness: f64) -> Molecule {
        let mut m = Molecule::new();
        m.push_atom(Element::Carbon);
        m.push_atom(Element::Carbon);
        m.fitness = fitness;
        m
    }

    #[test]
    fn test_select_parents_keeps_elite() {
        let population: Vec<Molecule> =
            [3.0, 9.0, 1.0, 7.0, 5.0].iter().map(|&f| molecule_with_fitness(f)).collect();
        let mut rng = MoleculeRng::new(1);

        let parents = select_parents(&population, 2, &mut rng);

        assert_eq!(parents.len(), population.len());
        assert_eq!(parents[0].fitness, 9.0);
        assert_eq!(parents[1].fitness, 7.0);
        // Tournament winners all come from the population.
        for parent in &parents {
            assert!(population.iter().any(|m| m.id == parent.id));
        }
    }

    #[test]
    fn test_select_parents_stable_ties() {
        let population: Vec<Molecule> =
            [5.0, 5.0, 3.0].iter().map(|&f| molecule_with_fitness(f)).collect();
        let mut rng = MoleculeRng::new(1);

        let parents = select_parents(&population, 2, &mut rng);

        // Equal-fitness individuals keep their relative order.
        assert_eq!(parents[0].id, population[0].id);
        assert_eq!(parents[1].id, population[1].id);
    }

    #[test]
    fn test_select_parents_empty_population() {
        let mut rng = MoleculeRng::new(1);
        assert!(select_parents(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_start_builds_evaluated_population() {
        let mut engine = EvolutionEngine::new(test_config(10, 50));
        assert_eq!(engine.status(), RunStatus::Idle);

        engine.start();

        assert_eq!(engine.status(), RunStatus::Running);
        assert_eq!(engine.population().len(), 10);
        assert_eq!(engine.generation(), 0);
        assert!(engine.history().is_empty());
        for molecule in engine.population() {
            assert!(molecule.is_consistent());
            assert_eq!(molecule.fitness, molecule.bonds.len() as f64);
        }
    }

    #[test]
    fn test_generation_steps_until_completed() {
        let mut engine = EvolutionEngine::new(test_config(6, 3));
        engine.start();

        let mut steps = 0;
        while engine.status() == RunStatus::Running && steps < 100 {
            let before = engine.generation();
            engine.step_generation();
            steps += 1;
            if engine.status() == RunStatus::Running {
                assert_eq!(engine.generation(), before + 1);
            }
        }

        assert_eq!(engine.status(), RunStatus::Completed);
        assert_eq!(engine.generation(), 3);
        // Generations 0..=3 each get one history record.
        assert_eq!(engine.history().len(), 4);
        for (i, record) in engine.history().iter().enumerate() {
            assert_eq!(record.generation, i as u64);
        }
        // One more step must not produce an extra generation.
        engine.step_generation();
        assert_eq!(engine.generation(), 3);
        assert_eq!(engine.history().len(), 4);
    }

    #[test]
    fn test_best_fitness_never_regresses() {
        let mut engine = EvolutionEngine::new(test_config(8, 20));
        engine.start();

        let mut previous = f64::NEG_INFINITY;
        while engine.status() == RunStatus::Running {
            engine.step_generation();
            let best = engine.best().map(|m| m.fitness).unwrap_or(f64::NEG_INFINITY);
            assert!(best >= previous);
            previous = best;
        }
        assert!(engine.best().is_some());
    }

    #[test]
    fn test_population_invariants_after_steps() {
        let mut engine = EvolutionEngine::new(test_config(12, 10));
        engine.start();
        while engine.status() == RunStatus::Running {
            engine.step_generation();
            for molecule in engine.population() {
                assert!(molecule.is_consistent());
                assert!(molecule.within_valence_limits());
            }
        }
    }

    #[test]
    fn test_pause_and_resume() {
        let mut engine = EvolutionEngine::new(test_config(5, 10));
        engine.start();
        engine.step_generation();

        engine.pause();
        assert_eq!(engine.status(), RunStatus::Paused);

        let generation = engine.generation();
        engine.step_generation();
        assert_eq!(engine.generation(), generation);

        engine.resume();
        assert_eq!(engine.status(), RunStatus::Running);
    }

    #[test]
    fn test_resume_past_limit_completes() {
        let mut engine = EvolutionEngine::new(test_config(5, 1));
        engine.start();
        engine.step_generation();
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.status(), RunStatus::Running);

        engine.pause();
        engine.resume();
        assert_eq!(engine.status(), RunStatus::Completed);
    }

    #[test]
    fn test_zero_generation_limit_completes_immediately() {
        let mut engine = EvolutionEngine::new(test_config(4, 0));
        engine.start();
        engine.step_generation();

        assert_eq!(engine.status(), RunStatus::Completed);
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.history().len(), 1);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut engine = EvolutionEngine::new(test_config(6, 10));
        engine.start();
        engine.step_generation();
        engine.step_generation();

        engine.reset(EvolutionParams::default(), TargetProperty::Stability);

        assert_eq!(engine.status(), RunStatus::Idle);
        assert!(engine.population().is_empty());
        assert_eq!(engine.generation(), 0);
        assert!(engine.history().is_empty());
        assert!(engine.best().is_none());
        assert_eq!(engine.target(), &TargetProperty::Stability);
    }

    #[test]
    fn test_seeded_start() {
        let mut seed = Molecule::new();
        let a = seed.push_atom(Element::Carbon);
        let b = seed.push_atom(Element::Carbon);
        seed.add_bond(a, b);

        let mut engine = EvolutionEngine::new(test_config(8, 10));
        engine.start_from_seed(&seed);

        assert_eq!(engine.status(), RunStatus::Running);
        assert_eq!(engine.population().len(), 8);
        // First member is an unmutated copy of the seed.
        assert_eq!(engine.population()[0].atoms, seed.atoms);
        assert_eq!(engine.population()[0].bonds, seed.bonds);
        assert_ne!(engine.population()[0].id, seed.id);
    }

    #[test]
    fn test_seeded_start_ignores_empty_molecule() {
        let mut engine = EvolutionEngine::new(test_config(8, 10));
        engine.start_from_seed(&Molecule::new());

        assert_eq!(engine.status(), RunStatus::Idle);
        assert!(engine.population().is_empty());
    }

    #[test]
    fn test_updates_ignored_during_run() {
        let mut engine = EvolutionEngine::new(test_config(5, 10));
        engine.start();

        engine.update_params(ParamUpdate::PopulationSize(99));
        engine.update_target_property(TargetProperty::MaximizeCarbon);
        assert_eq!(engine.params().population_size, 5);
        assert_eq!(engine.target(), &TargetProperty::MaximizeBonds);

        let params = engine.params;
        engine.reset(params, TargetProperty::MaximizeBonds);
        engine.update_params(ParamUpdate::PopulationSize(99));
        engine.update_target_property(TargetProperty::MaximizeCarbon);
        assert_eq!(engine.params().population_size, 99);
        assert_eq!(engine.target(), &TargetProperty::MaximizeCarbon);
    }

    #[test]
    fn test_empty_population_self_heals() {
        let mut engine = EvolutionEngine::new(test_config(7, 10));
        engine.start();
        engine.population.clear();

        engine.step_generation();

        assert_eq!(engine.status(), RunStatus::Running);
        assert_eq!(engine.population().len(), 7);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut engine = EvolutionEngine::new(test_config(5, 10));
        engine.start();
        engine.step_generation();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.status, RunStatus::Running);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.population.len(), 5);
        assert_eq!(snapshot.history.len(), 1);
        assert!(snapshot.best.is_some());

        // Snapshots serialize for external consumers.
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: EvolutionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.generation, snapshot.generation);
    }
}
