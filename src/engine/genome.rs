//! Molecule generation and mutation operators.
//!
//! Provides random construction of valid molecules and the structural
//! mutation pass used to produce offspring. All operators preserve graph
//! validity: bonds always join two distinct existing atoms and no atom is
//! left above its element's bond limit once a mutation pass completes.

use rand::prelude::*;

use crate::schema::{Element, Molecule};

/// Random number generator wrapper for molecule operations.
pub struct MoleculeRng {
    rng: StdRng,
}

impl MoleculeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform random index below `len`.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// One Bernoulli trial at the given rate.
    fn trial(&mut self, rate: f64) -> bool {
        self.rng.gen_bool(rate)
    }

    /// Uniform random element from the generation pool.
    fn random_element(&mut self) -> Element {
        Element::RANDOM_POOL[self.rng.gen_range(0..Element::RANDOM_POOL.len())]
    }

    /// Two distinct uniform random indices below `len` (requires `len >= 2`).
    fn distinct_pair(&mut self, len: usize) -> (usize, usize) {
        let i = self.rng.gen_range(0..len);
        let mut j = self.rng.gen_range(0..len);
        while j == i {
            j = self.rng.gen_range(0..len);
        }
        (i, j)
    }

    /// Build a random valid molecule with between 2 and `max_atoms` atoms.
    ///
    /// Bond construction is best-effort: `round(atom_count * 1.5)` random
    /// pair insertions, skipping duplicate pairs and saturated endpoints.
    /// The result may be disconnected and has fitness 0 pending evaluation.
    pub fn random_molecule(&mut self, max_atoms: usize) -> Molecule {
        let atom_count = self.rng.gen_range(2..=max_atoms.max(2));

        let mut molecule = Molecule::new();
        for _ in 0..atom_count {
            let element = self.random_element();
            molecule.push_atom(element);
        }

        let attempts = (atom_count as f64 * 1.5).round() as usize;
        for _ in 0..attempts {
            let (i, j) = self.distinct_pair(atom_count);
            let a = molecule.atoms[i].id;
            let b = molecule.atoms[j].id;
            molecule.add_bond(a, b);
        }

        molecule
    }

    /// Produce a mutated offspring of `parent`.
    ///
    /// Operates on a deep copy with a fresh identity and fitness reset to 0;
    /// the parent is never touched. Five independent Bernoulli trials at
    /// `mutation_rate` gate the operators, applied in fixed order against
    /// the evolving copy so later operators see earlier edits:
    ///
    /// 1. retype one random atom, shedding oldest bonds past the new limit
    /// 2. add one atom (below `max_atoms`), 50% chance of an initial bond
    /// 3. remove one random atom with its incident bonds
    /// 4. add one bond between two distinct unsaturated atoms
    /// 5. remove one random bond
    ///
    /// Each operator no-ops when its precondition fails.
    pub fn mutate(&mut self, parent: &Molecule, mutation_rate: f64, max_atoms: usize) -> Molecule {
        let rate = if mutation_rate.is_finite() {
            mutation_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let mut molecule = parent.duplicate();
        molecule.fitness = 0.0;

        // 1. Retype a random atom.
        if self.trial(rate) && !molecule.atoms.is_empty() {
            let idx = self.pick(molecule.atoms.len());
            let element = self.random_element();
            if element != molecule.atoms[idx].element {
                molecule.atoms[idx].element = element;
                let atom_id = molecule.atoms[idx].id;
                while molecule.bond_count(atom_id) > element.max_bonds() {
                    molecule.remove_oldest_bond_of(atom_id);
                }
            }
        }

        // 2. Add a new atom, maybe bonded to an existing one.
        if self.trial(rate) && molecule.atoms.len() < max_atoms {
            let existing = molecule.atoms.len();
            let element = self.random_element();
            let new_id = molecule.push_atom(element);
            if existing > 0 && self.trial(0.5) {
                let partner = molecule.atoms[self.pick(existing)].id;
                molecule.add_bond(new_id, partner);
            }
        }

        // 3. Remove a random atom and its bonds.
        if self.trial(rate) && molecule.atoms.len() > 1 {
            let idx = self.pick(molecule.atoms.len());
            let atom_id = molecule.atoms[idx].id;
            molecule.remove_atom(atom_id);
        }

        // 4. Add a bond between two random atoms.
        if self.trial(rate) && molecule.atoms.len() >= 2 {
            let (i, j) = self.distinct_pair(molecule.atoms.len());
            let a = molecule.atoms[i].id;
            let b = molecule.atoms[j].id;
            molecule.add_bond(a, b);
        }

        // 5. Remove a random bond.
        if self.trial(rate) && !molecule.bonds.is_empty() {
            let idx = self.pick(molecule.bonds.len());
            molecule.bonds.remove(idx);
        }

        molecule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_random_molecule_size_bounds() {
        let mut rng = MoleculeRng::new(42);
        for _ in 0..100 {
            let m = rng.random_molecule(8);
            assert!(m.atoms.len() >= 2);
            assert!(m.atoms.len() <= 8);
        }
    }

    #[test]
    fn test_random_molecule_is_valid() {
        let mut rng = MoleculeRng::new(7);
        for _ in 0..100 {
            let m = rng.random_molecule(12);
            assert!(m.is_consistent());
            assert!(m.within_valence_limits());
            assert_eq!(m.fitness, 0.0);
        }
    }

    #[test]
    fn test_random_molecule_draws_from_pool() {
        let mut rng = MoleculeRng::new(3);
        for _ in 0..50 {
            let m = rng.random_molecule(6);
            assert!(
                m.atoms
                    .iter()
                    .all(|a| Element::RANDOM_POOL.contains(&a.element))
            );
        }
    }

    #[test]
    fn test_mutate_zero_rate_copies_structure() {
        let mut rng = MoleculeRng::new(42);
        let mut parent = Molecule::new();
        let a = parent.push_atom(Element::Carbon);
        let b = parent.push_atom(Element::Carbon);
        parent.add_bond(a, b);
        parent.fitness = 12.5;

        let child = rng.mutate(&parent, 0.0, 2);

        assert_ne!(child.id, parent.id);
        assert_eq!(child.atoms, parent.atoms);
        assert_eq!(child.bonds, parent.bonds);
        assert_eq!(child.fitness, 0.0);
        assert_eq!(parent.fitness, 12.5);
    }

    #[test]
    fn test_mutate_never_exceeds_max_atoms() {
        let mut rng = MoleculeRng::new(11);
        let mut m = rng.random_molecule(4);
        for _ in 0..200 {
            m = rng.mutate(&m, 1.0, 4);
            assert!(m.atoms.len() <= 4);
            assert!(!m.atoms.is_empty());
        }
    }

    #[test]
    fn test_mutate_preserves_invariants_at_full_rate() {
        for seed in 0..20 {
            let mut rng = MoleculeRng::new(seed);
            let mut m = rng.random_molecule(10);
            for _ in 0..50 {
                m = rng.mutate(&m, 1.0, 10);
                assert!(m.is_consistent());
                assert!(m.within_valence_limits());
            }
        }
    }

    proptest! {
        #[test]
        fn prop_mutation_chain_preserves_validity(
            seed in any::<u64>(),
            max_atoms in 2usize..16,
            rate in 0.0f64..=1.0,
            rounds in 1usize..25,
        ) {
            let mut rng = MoleculeRng::new(seed);
            let mut m = rng.random_molecule(max_atoms);
            prop_assert!(m.is_consistent());
            prop_assert!(m.within_valence_limits());

            for _ in 0..rounds {
                m = rng.mutate(&m, rate, max_atoms);
                prop_assert!(m.is_consistent());
                prop_assert!(m.within_valence_limits());
                prop_assert!(!m.atoms.is_empty());
                prop_assert!(m.atoms.len() <= max_atoms);
            }
        }
    }
}
