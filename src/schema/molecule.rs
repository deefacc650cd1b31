//! Molecule data model: typed atoms, undirected bonds, and the element catalog.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Fresh process-wide identity for atoms, bonds, and molecules.
fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Chemical element of an atom.
///
/// The catalog is a closed set; per-element metadata (bond limit, mass,
/// display color) is static and never changes at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Element {
    Carbon,
    Hydrogen,
    Oxygen,
    Nitrogen,
}

impl Element {
    /// Elements eligible for random generation and mutation.
    ///
    /// Hydrogen is excluded (implicit-hydrogen model) but still contributes
    /// to weight and formula when present in a molecule.
    pub const RANDOM_POOL: [Element; 3] = [Element::Carbon, Element::Oxygen, Element::Nitrogen];

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Element::Carbon => "Carbon",
            Element::Hydrogen => "Hydrogen",
            Element::Oxygen => "Oxygen",
            Element::Nitrogen => "Nitrogen",
        }
    }

    /// Element symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Element::Carbon => "C",
            Element::Hydrogen => "H",
            Element::Oxygen => "O",
            Element::Nitrogen => "N",
        }
    }

    /// Maximum number of bonds (valence limit).
    pub const fn max_bonds(self) -> usize {
        match self {
            Element::Carbon => 4,
            Element::Hydrogen => 1,
            Element::Oxygen => 2,
            Element::Nitrogen => 3,
        }
    }

    /// Atomic mass.
    pub const fn mass(self) -> f64 {
        match self {
            Element::Carbon => 12.0,
            Element::Hydrogen => 1.0,
            Element::Oxygen => 16.0,
            Element::Nitrogen => 14.0,
        }
    }

    /// Display color used by the external renderer.
    pub const fn color(self) -> &'static str {
        match self {
            Element::Carbon => "#333333",
            Element::Hydrogen => "#ffffff",
            Element::Oxygen => "#e53935",
            Element::Nitrogen => "#3949ab",
        }
    }
}

/// A typed node in the molecular graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Atom {
    /// Unique identity.
    pub id: u64,
    /// Element type, which fixes mass and bond limit via the catalog.
    pub element: Element,
}

/// An undirected edge between two distinct atoms of the same molecule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bond {
    /// Unique identity.
    pub id: u64,
    /// One endpoint atom id.
    pub a: u64,
    /// The other endpoint atom id.
    pub b: u64,
}

impl Bond {
    /// Whether this bond touches the given atom.
    pub fn is_incident_to(&self, atom_id: u64) -> bool {
        self.a == atom_id || self.b == atom_id
    }

    /// Whether this bond joins the given unordered pair.
    pub fn joins(&self, x: u64, y: u64) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

/// A small molecular graph with a derived fitness value.
///
/// Atoms are kept in insertion order. Fitness is recomputed by the evaluator
/// after every structural change; it is 0 only as a transient placeholder
/// between mutation and re-evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Molecule {
    /// Unique identity.
    pub id: u64,
    /// Atoms in insertion order.
    pub atoms: Vec<Atom>,
    /// Bonds between atoms of this molecule.
    pub bonds: Vec<Bond>,
    /// Derived fitness score.
    pub fitness: f64,
}

impl Molecule {
    /// Create an empty molecule with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: next_id(),
            atoms: Vec::new(),
            bonds: Vec::new(),
            fitness: 0.0,
        }
    }

    /// Append a new atom and return its id.
    pub fn push_atom(&mut self, element: Element) -> u64 {
        let id = next_id();
        self.atoms.push(Atom { id, element });
        id
    }

    /// Look up an atom by id.
    pub fn atom(&self, atom_id: u64) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.id == atom_id)
    }

    /// Number of bonds incident to the given atom.
    pub fn bond_count(&self, atom_id: u64) -> usize {
        self.bonds.iter().filter(|b| b.is_incident_to(atom_id)).count()
    }

    /// Whether a bond between the unordered pair already exists.
    pub fn has_bond_between(&self, a: u64, b: u64) -> bool {
        self.bonds.iter().any(|bond| bond.joins(a, b))
    }

    /// Whether the atom exists and is below its element's bond limit.
    pub fn has_valence_headroom(&self, atom_id: u64) -> bool {
        match self.atom(atom_id) {
            Some(atom) => self.bond_count(atom_id) < atom.element.max_bonds(),
            None => false,
        }
    }

    /// Add a bond between two atoms.
    ///
    /// Refused (returning `false`) when the endpoints are equal or missing,
    /// the pair is already bonded, or either endpoint is at its bond limit.
    pub fn add_bond(&mut self, a: u64, b: u64) -> bool {
        if a == b || self.has_bond_between(a, b) {
            return false;
        }
        if !self.has_valence_headroom(a) || !self.has_valence_headroom(b) {
            return false;
        }
        self.bonds.push(Bond { id: next_id(), a, b });
        true
    }

    /// Remove an atom and every bond incident to it.
    pub fn remove_atom(&mut self, atom_id: u64) -> bool {
        let before = self.atoms.len();
        self.atoms.retain(|a| a.id != atom_id);
        if self.atoms.len() == before {
            return false;
        }
        self.bonds.retain(|b| !b.is_incident_to(atom_id));
        true
    }

    /// Remove the oldest-listed bond incident to the given atom.
    pub fn remove_oldest_bond_of(&mut self, atom_id: u64) -> bool {
        match self.bonds.iter().position(|b| b.is_incident_to(atom_id)) {
            Some(idx) => {
                self.bonds.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Sum of atomic masses over all atoms.
    pub fn molecular_weight(&self) -> f64 {
        self.atoms.iter().map(|a| a.element.mass()).sum()
    }

    /// Molecular formula in Hill order (C, H, then remaining alphabetical).
    pub fn formula(&self) -> String {
        let mut carbon = 0usize;
        let mut hydrogen = 0usize;
        let mut nitrogen = 0usize;
        let mut oxygen = 0usize;
        for atom in &self.atoms {
            match atom.element {
                Element::Carbon => carbon += 1,
                Element::Hydrogen => hydrogen += 1,
                Element::Nitrogen => nitrogen += 1,
                Element::Oxygen => oxygen += 1,
            }
        }

        let mut out = String::new();
        for (symbol, count) in [("C", carbon), ("H", hydrogen), ("N", nitrogen), ("O", oxygen)] {
            match count {
                0 => {}
                1 => out.push_str(symbol),
                n => {
                    let _ = write!(out, "{symbol}{n}");
                }
            }
        }
        out
    }

    /// Deep copy with a fresh molecule identity.
    ///
    /// Atoms and bonds keep their ids so the copy is structurally equal to
    /// the original while remaining fully independent.
    pub fn duplicate(&self) -> Self {
        Self {
            id: next_id(),
            atoms: self.atoms.clone(),
            bonds: self.bonds.clone(),
            fitness: self.fitness,
        }
    }

    /// Structural invariant: every bond joins two distinct, existing atoms
    /// and no unordered pair is bonded twice.
    pub fn is_consistent(&self) -> bool {
        for (i, bond) in self.bonds.iter().enumerate() {
            if bond.a == bond.b {
                return false;
            }
            if self.atom(bond.a).is_none() || self.atom(bond.b).is_none() {
                return false;
            }
            if self.bonds[..i].iter().any(|other| other.joins(bond.a, bond.b)) {
                return false;
            }
        }
        true
    }

    /// Whether no atom exceeds its element's bond limit.
    pub fn within_valence_limits(&self) -> bool {
        self.atoms
            .iter()
            .all(|a| self.bond_count(a.id) <= a.element.max_bonds())
    }
}

impl Default for Molecule {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water_like() -> Molecule {
        // H-O-H
        let mut m = Molecule::new();
        let o = m.push_atom(Element::Oxygen);
        let h1 = m.push_atom(Element::Hydrogen);
        let h2 = m.push_atom(Element::Hydrogen);
        assert!(m.add_bond(o, h1));
        assert!(m.add_bond(o, h2));
        m
    }

    #[test]
    fn test_element_catalog() {
        assert_eq!(Element::Carbon.max_bonds(), 4);
        assert_eq!(Element::Hydrogen.max_bonds(), 1);
        assert_eq!(Element::Oxygen.max_bonds(), 2);
        assert_eq!(Element::Nitrogen.max_bonds(), 3);

        assert_eq!(Element::Carbon.mass(), 12.0);
        assert_eq!(Element::Hydrogen.mass(), 1.0);
        assert_eq!(Element::Oxygen.mass(), 16.0);
        assert_eq!(Element::Nitrogen.mass(), 14.0);
    }

    #[test]
    fn test_random_pool_excludes_hydrogen() {
        assert!(!Element::RANDOM_POOL.contains(&Element::Hydrogen));
        assert_eq!(Element::RANDOM_POOL.len(), 3);
    }

    #[test]
    fn test_add_bond_rejects_self_and_duplicates() {
        let mut m = Molecule::new();
        let a = m.push_atom(Element::Carbon);
        let b = m.push_atom(Element::Carbon);

        assert!(!m.add_bond(a, a));
        assert!(m.add_bond(a, b));
        assert!(!m.add_bond(a, b));
        assert!(!m.add_bond(b, a));
        assert_eq!(m.bonds.len(), 1);
    }

    #[test]
    fn test_add_bond_respects_valence() {
        let mut m = Molecule::new();
        let h1 = m.push_atom(Element::Hydrogen);
        let h2 = m.push_atom(Element::Hydrogen);
        let h3 = m.push_atom(Element::Hydrogen);

        assert!(m.add_bond(h1, h2));
        // Both endpoints are now saturated (hydrogen limit is 1).
        assert!(!m.add_bond(h1, h3));
        assert!(!m.add_bond(h2, h3));
    }

    #[test]
    fn test_add_bond_rejects_missing_endpoint() {
        let mut m = Molecule::new();
        let a = m.push_atom(Element::Carbon);
        assert!(!m.add_bond(a, 999_999));
    }

    #[test]
    fn test_remove_atom_cascades_bonds() {
        let mut m = water_like();
        let oxygen_id = m.atoms[0].id;

        assert!(m.remove_atom(oxygen_id));
        assert_eq!(m.atoms.len(), 2);
        assert!(m.bonds.is_empty());
        assert!(m.is_consistent());
    }

    #[test]
    fn test_remove_oldest_bond() {
        let mut m = water_like();
        let oxygen_id = m.atoms[0].id;
        let first_bond_id = m.bonds[0].id;

        assert!(m.remove_oldest_bond_of(oxygen_id));
        assert_eq!(m.bonds.len(), 1);
        assert!(m.bonds.iter().all(|b| b.id != first_bond_id));
        assert!(!m.remove_oldest_bond_of(999_999));
    }

    #[test]
    fn test_weight_and_formula() {
        let m = water_like();
        assert_eq!(m.molecular_weight(), 18.0);
        assert_eq!(m.formula(), "H2O");

        let mut organic = Molecule::new();
        organic.push_atom(Element::Carbon);
        organic.push_atom(Element::Carbon);
        organic.push_atom(Element::Nitrogen);
        organic.push_atom(Element::Oxygen);
        organic.push_atom(Element::Hydrogen);
        assert_eq!(organic.formula(), "C2HNO");
        assert_eq!(organic.molecular_weight(), 12.0 + 12.0 + 14.0 + 16.0 + 1.0);
    }

    #[test]
    fn test_duplicate_is_independent() {
        let original = water_like();
        let mut copy = original.duplicate();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.atoms, original.atoms);
        assert_eq!(copy.bonds, original.bonds);

        copy.remove_atom(copy.atoms[0].id);
        assert_eq!(original.atoms.len(), 3);
    }

    #[test]
    fn test_consistency_checks() {
        let mut m = water_like();
        assert!(m.is_consistent());
        assert!(m.within_valence_limits());

        // Force a dangling endpoint.
        m.bonds.push(Bond {
            id: 0,
            a: m.atoms[0].id,
            b: 424_242,
        });
        assert!(!m.is_consistent());
    }
}
