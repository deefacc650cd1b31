//! Fitness routines: one evaluation rule per target property.
//!
//! Evaluation is a pure function of (molecule, target property): no side
//! effects, no randomness, and identical inputs always score identically.
//! Raw scores are clamped to [`FITNESS_MIN`, `FITNESS_MAX`]; non-finite
//! intermediate results degrade to 0.

use std::collections::HashMap;

use crate::schema::{Element, Molecule, TargetProperty};

/// Lower clamp for fitness scores.
pub const FITNESS_MIN: f64 = -1000.0;
/// Upper clamp for fitness scores.
pub const FITNESS_MAX: f64 = 1000.0;

/// Scores molecules against a configured target property.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    target: TargetProperty,
}

impl FitnessEvaluator {
    /// Create a new evaluator for the given target.
    pub fn new(target: TargetProperty) -> Self {
        Self { target }
    }

    /// The configured target property.
    pub fn target(&self) -> &TargetProperty {
        &self.target
    }

    /// Score a molecule. Deterministic, clamped to [-1000, 1000].
    pub fn evaluate(&self, molecule: &Molecule) -> f64 {
        let raw = match self.target {
            TargetProperty::MaximizeCarbon => element_count(molecule, Element::Carbon) as f64,
            TargetProperty::MaximizeOxygen => element_count(molecule, Element::Oxygen) as f64,
            TargetProperty::MaximizeNitrogen => element_count(molecule, Element::Nitrogen) as f64,
            TargetProperty::MaximizeAtoms => molecule.atoms.len() as f64,
            TargetProperty::MaximizeBonds => molecule.bonds.len() as f64,
            TargetProperty::MinimizeFragments => fragment_score(molecule),
            TargetProperty::TargetWeight { goal } => weight_point_score(molecule, goal),
            TargetProperty::WeightRange { min, max } => weight_range_score(molecule, min, max),
            TargetProperty::Stability => stability_score(molecule),
            TargetProperty::HydroxylGroups => hydroxyl_count(molecule) as f64,
            TargetProperty::AmineGroups => amine_count(molecule) as f64,
            TargetProperty::DrugLikeness => drug_likeness_score(molecule) as f64,
        };

        if raw.is_finite() {
            raw.clamp(FITNESS_MIN, FITNESS_MAX)
        } else {
            0.0
        }
    }
}

/// Number of atoms of the given element.
fn element_count(molecule: &Molecule, element: Element) -> usize {
    molecule.atoms.iter().filter(|a| a.element == element).count()
}

/// Number of connected components in the bond graph.
///
/// Isolated atoms each count as their own component.
pub fn connected_components(molecule: &Molecule) -> usize {
    if molecule.atoms.is_empty() {
        return 0;
    }

    let index_of: HashMap<u64, usize> = molecule
        .atoms
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id, i))
        .collect();

    let mut adjacency = vec![Vec::new(); molecule.atoms.len()];
    for bond in &molecule.bonds {
        if let (Some(&i), Some(&j)) = (index_of.get(&bond.a), index_of.get(&bond.b)) {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
    }

    let mut visited = vec![false; molecule.atoms.len()];
    let mut components = 0;
    let mut stack = Vec::new();

    for start in 0..molecule.atoms.len() {
        if visited[start] {
            continue;
        }
        components += 1;
        visited[start] = true;
        stack.push(start);
        while let Some(node) = stack.pop() {
            for &next in &adjacency[node] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }
    }

    components
}

/// Atom count over component count; rewards connectivity and size.
fn fragment_score(molecule: &Molecule) -> f64 {
    molecule.atoms.len() as f64 / connected_components(molecule).max(1) as f64
}

/// Point target: peaks at 100 when weight matches the goal exactly.
fn weight_point_score(molecule: &Molecule, goal: f64) -> f64 {
    100.0 / (1.0 + (molecule.molecular_weight() - goal).abs())
}

/// Range target: 100 inside [min, max], linear falloff outside, floor 0.
fn weight_range_score(molecule: &Molecule, min: f64, max: f64) -> f64 {
    let weight = molecule.molecular_weight();
    if weight >= min && weight <= max {
        100.0
    } else {
        let distance = if weight < min { min - weight } else { weight - max };
        (100.0 - distance).max(0.0)
    }
}

/// Average valence satisfaction: exact match +2, under-valent +0.5,
/// over-valent -2 per excess bond; shifted +5, floored at 0.
fn stability_score(molecule: &Molecule) -> f64 {
    if molecule.atoms.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for atom in &molecule.atoms {
        let bonds = molecule.bond_count(atom.id);
        let limit = atom.element.max_bonds();
        total += if bonds == limit {
            2.0
        } else if bonds < limit {
            0.5
        } else {
            -2.0 * (bonds - limit) as f64
        };
    }

    (total / molecule.atoms.len() as f64 + 5.0).max(0.0)
}

/// Oxygens with exactly one bond: the -OH-like terminal pattern under the
/// implicit-hydrogen model.
fn hydroxyl_count(molecule: &Molecule) -> usize {
    molecule
        .atoms
        .iter()
        .filter(|a| {
            a.element == Element::Oxygen
                && a.element.max_bonds() == 2
                && molecule.bond_count(a.id) == 1
        })
        .count()
}

/// Nitrogens with at least one bond but remaining valence headroom.
fn amine_count(molecule: &Molecule) -> usize {
    molecule
        .atoms
        .iter()
        .filter(|a| {
            if a.element != Element::Nitrogen {
                return false;
            }
            let bonds = molecule.bond_count(a.id);
            bonds > 0 && bonds < a.element.max_bonds()
        })
        .count()
}

/// Estimated hydrogen-bond donors: hydroxyl-pattern oxygens plus each
/// under-valent nitrogen's valence deficit.
fn hydrogen_donor_estimate(molecule: &Molecule) -> usize {
    let mut donors = hydroxyl_count(molecule);
    for atom in &molecule.atoms {
        if atom.element == Element::Nitrogen {
            let bonds = molecule.bond_count(atom.id);
            let limit = atom.element.max_bonds();
            if bonds < limit {
                donors += limit - bonds;
            }
        }
    }
    donors
}

/// Estimated hydrogen-bond acceptors: all oxygen and nitrogen atoms.
fn hydrogen_acceptor_estimate(molecule: &Molecule) -> usize {
    molecule
        .atoms
        .iter()
        .filter(|a| matches!(a.element, Element::Oxygen | Element::Nitrogen))
        .count()
}

/// Lipinski-like score: one point each for weight <= 500, estimated
/// donors <= 5, estimated acceptors <= 10.
fn drug_likeness_score(molecule: &Molecule) -> u32 {
    let mut score = 0;
    if molecule.molecular_weight() <= 500.0 {
        score += 1;
    }
    if hydrogen_donor_estimate(molecule) <= 5 {
        score += 1;
    }
    if hydrogen_acceptor_estimate(molecule) <= 10 {
        score += 1;
    }
    score
}
