use crate::*;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use tracing::trace;

/// A mutable molecular graph with the editing operations the generator needs.
#[derive(Debug, Clone, Default)]
pub struct Molecule(MoleculeGraph);

impl Molecule {
    pub fn from_smiles(smiles: &str) -> Result<Self, SmilesError> {
        parse_smiles(smiles).map(Self)
    }

    /// Parse, write canonically, then parse the canonical string again.
    ///
    /// Atom indices of the result follow canonical writing order, which is
    /// what position alphabets refer to.
    pub fn canonical_from_smiles(smiles: &str) -> Result<Self, GenerationError> {
        let raw = Self::from_smiles(smiles)?;
        let canonical = raw.to_smiles()?;
        Self::from_smiles(&canonical).map_err(|e| GenerationError::ReparseMismatch {
            smiles: canonical.clone(),
            reason: e.to_string(),
        })
    }

    pub fn graph(&self) -> &MoleculeGraph {
        &self.0
    }

    pub fn atom_count(&self) -> usize {
        self.0.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.0.edge_count()
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.0.node_weight(NodeIndex::new(index))
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<Bond> {
        self.0
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|edge| self.0[edge])
    }

    /// Append a disjoint copy of `other`, returning the index its atom 0 now has.
    pub fn combine(&mut self, other: &Molecule) -> usize {
        let offset = self.atom_count();
        for node in other.0.node_indices() {
            self.0.add_node(other.0[node]);
        }
        for edge in other.0.edge_references() {
            self.0.add_edge(
                NodeIndex::new(offset + edge.source().index()),
                NodeIndex::new(offset + edge.target().index()),
                *edge.weight(),
            );
        }
        offset
    }

    /// Add a bond between two existing, distinct, not yet bonded atoms.
    pub fn add_bond(&mut self, a: usize, b: usize, bond: Bond) -> Option<EdgeIndex> {
        let n = self.atom_count();
        if a >= n || b >= n || a == b || self.bond_between(a, b).is_some() {
            return None;
        }
        trace!("Adding {:?} bond {} - {}", bond, a, b);
        Some(self.0.add_edge(NodeIndex::new(a), NodeIndex::new(b), bond))
    }

    /// Change the element of an atom in place; everything else about it stays.
    pub fn set_element(&mut self, index: usize, element: Element) -> bool {
        match self.0.node_weight_mut(NodeIndex::new(index)) {
            Some(atom) => {
                atom.element = element;
                true
            }
            None => false,
        }
    }

    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.0)
    }

    pub fn is_connected(&self) -> bool {
        self.component_count() == 1
    }

    /// Valence units taken by bonds and explicit hydrogens, aromatic bonds
    /// counting one.
    fn sigma_valence(&self, node: NodeIndex) -> u16 {
        let bonds: u16 = self
            .0
            .edges(node)
            .map(|edge| u16::from(edge.weight().valence_contribution()))
            .sum();
        bonds + u16::from(self.0[node].explicit_hydrogens())
    }

    /// An aromatic atom needs a pi bond when its lowest fitting valence is
    /// not already filled, like pyridine `n` or any ring `c`. Pyrrole-type
    /// `[nH]`, `o` and `s` give a lone pair instead.
    fn needs_pi(&self, node: NodeIndex) -> bool {
        let atom = &self.0[node];
        if !atom.aromatic {
            return false;
        }
        let sigma = self.sigma_valence(node) as i16;
        atom.element
            .charged_valences(atom.charge)
            .into_iter()
            .find(|&v| v >= sigma)
            .is_some_and(|target| target > sigma)
    }

    /// Valence units an atom uses, counting the pi unit of aromatic atoms
    /// that need one.
    pub fn used_valence(&self, index: usize) -> Option<u16> {
        let node = NodeIndex::new(index);
        self.0.node_weight(node)?;
        Some(self.sigma_valence(node) + u16::from(self.needs_pi(node)))
    }

    /// Reject any atom using more valence than its element allows at its
    /// charge, and aromatic rings whose pi bonds cannot be placed.
    ///
    /// Nitrogen never takes more than its lowest valence in neighbours, and
    /// the expanded valences of nitrogen and phosphorus need a multiple bond.
    pub fn check_valence(&self) -> Result<(), GenerationError> {
        for node in self.0.node_indices() {
            let atom = &self.0[node];
            if atom.element.valences().is_empty() {
                continue;
            }
            let allowed = atom.element.charged_valences(atom.charge);
            let used = self.used_valence(node.index()).unwrap_or_default();
            let invalid = GenerationError::InvalidValence {
                index: node.index(),
                element: atom.element,
                valence: used,
            };
            let (Some(&lowest), Some(&highest)) = (allowed.first(), allowed.last()) else {
                return Err(invalid);
            };
            if used as i16 > highest {
                return Err(invalid);
            }

            if matches!(atom.element, Element::N | Element::P) && used as i16 > lowest {
                let neighbours =
                    self.0.edges(node).count() + usize::from(atom.explicit_hydrogens());
                let multiple = self
                    .0
                    .edges(node)
                    .any(|edge| matches!(edge.weight(), Bond::Double | Bond::Triple));
                if (atom.element == Element::N && neighbours as i16 > lowest) || !multiple {
                    return Err(invalid);
                }
            }
        }
        self.check_aromatic_pairing()
    }

    /// Every aromatic atom that needs a pi bond must pair with an aromatic
    /// neighbour that needs one too.
    fn check_aromatic_pairing(&self) -> Result<(), GenerationError> {
        let mut paired = UnGraph::<NodeIndex, ()>::default();
        let mut positions = HashMap::new();
        for node in self.0.node_indices().filter(|&node| self.needs_pi(node)) {
            positions.insert(node, paired.add_node(node));
        }
        if positions.is_empty() {
            return Ok(());
        }
        for edge in self.0.edge_references() {
            if *edge.weight() != Bond::Aromatic {
                continue;
            }
            let ends = (positions.get(&edge.source()), positions.get(&edge.target()));
            if let (Some(&a), Some(&b)) = ends {
                paired.add_edge(a, b, ());
            }
        }

        let matching = petgraph::algo::maximum_matching(&paired);
        match paired.node_indices().find(|&node| matching.mate(node).is_none()) {
            Some(unpaired) => Err(GenerationError::UnpairedAromatic(paired[unpaired].index())),
            None => Ok(()),
        }
    }

    /// A structure is valid when it is one connected piece with sane valences.
    pub fn validate(&self) -> Result<(), GenerationError> {
        let components = self.component_count();
        if components != 1 {
            return Err(GenerationError::Disconnected(components));
        }
        self.check_valence()
    }

    pub fn to_smiles(&self) -> Result<String, SmilesError> {
        write_smiles(&self.0)
    }

    /// Validate, write canonical SMILES and make sure the string reads back
    /// into a structure of the same size.
    pub fn emit(&self) -> Result<String, GenerationError> {
        self.validate()?;
        let smiles = self.to_smiles()?;
        let reparsed = parse_smiles(&smiles).map_err(|e| GenerationError::ReparseMismatch {
            smiles: smiles.clone(),
            reason: e.to_string(),
        })?;
        if reparsed.node_count() != self.atom_count()
            || reparsed.edge_count() != self.bond_count()
        {
            return Err(GenerationError::ReparseMismatch {
                reason: format!(
                    "read back {} atoms and {} bonds, expected {} and {}",
                    reparsed.node_count(),
                    reparsed.edge_count(),
                    self.atom_count(),
                    self.bond_count()
                ),
                smiles,
            });
        }
        Ok(smiles)
    }

    /// Index and SMILES symbol of every atom, in index order.
    pub fn atom_labels(&self) -> Vec<(usize, String)> {
        self.0
            .node_indices()
            .map(|node| (node.index(), self.0[node].smiles_symbol()))
            .collect()
    }

    /// Are the two molecules the same graph up to renumbering?
    pub fn is_same_as(&self, other: &Self) -> bool {
        petgraph::algo::is_isomorphic_matching(&self.0, &other.0, |a, b| a == b, |a, b| a == b)
    }
}

impl FromStr for Molecule {
    type Err = SmilesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_smiles(s)
    }
}

impl Display for Molecule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.to_smiles() {
            Ok(smiles) => write!(f, "{smiles}"),
            Err(_) => write!(f, "<empty>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAFFOLD: &str = "C1C2C(CCC1)CC3C(C2)CCCC3";

    #[test]
    fn test_canonical_indices_follow_writing_order() {
        let molecule = Molecule::canonical_from_smiles(SCAFFOLD).unwrap();
        assert_eq!(molecule.atom_count(), 14);
        let raw = Molecule::from_smiles(SCAFFOLD).unwrap();
        assert_eq!(molecule.to_smiles().unwrap(), raw.to_smiles().unwrap());
        assert_eq!(molecule.to_string(), raw.to_string());
        assert!(molecule.is_same_as(&Molecule::from_smiles(SCAFFOLD).unwrap()));
    }

    #[test]
    fn test_combine_and_bond() {
        let mut base: Molecule = "C1CCCCC1".parse().unwrap();
        let fragment: Molecule = "OC".parse().unwrap();
        let head = base.combine(&fragment);
        assert_eq!(head, 6);
        assert_eq!(base.atom_count(), 8);
        assert_eq!(base.component_count(), 2);
        assert_eq!(base.atom(6).map(|a| a.element), Some(Element::O));

        assert!(base.add_bond(0, head, Bond::Single).is_some());
        assert!(base.is_connected());
        assert!(base.add_bond(0, head, Bond::Single).is_none());
        assert!(base.add_bond(0, 0, Bond::Single).is_none());
        assert!(base.add_bond(0, 99, Bond::Single).is_none());
        assert!(base.emit().is_ok());
    }

    #[test]
    fn test_valence_checks() {
        let ok: Molecule = "CC(C)(C)C".parse().unwrap();
        assert!(ok.validate().is_ok());

        let mut pentavalent: Molecule = "CC(C)(C)C".parse().unwrap();
        let extra = pentavalent.combine(&"C".parse().unwrap());
        pentavalent.add_bond(1, extra, Bond::Single);
        assert!(matches!(
            pentavalent.validate(),
            Err(GenerationError::InvalidValence { index: 1, element: Element::C, valence: 5 })
        ));

        let mut oxygen: Molecule = "CC(C)C".parse().unwrap();
        assert!(oxygen.set_element(1, Element::O));
        assert!(matches!(oxygen.validate(), Err(GenerationError::InvalidValence { index: 1, .. })));

        // Aromatic carbon with a substituent is fine, a fourth neighbour is not.
        let toluene: Molecule = "Cc1ccccc1".parse().unwrap();
        assert!(toluene.validate().is_ok());
        let ammonium: Molecule = "C[N+](C)(C)C".parse().unwrap();
        assert!(ammonium.validate().is_ok());
        let pyrrole: Molecule = "c1cc[nH]c1".parse().unwrap();
        assert!(pyrrole.validate().is_ok());
    }

    #[test]
    fn test_nitrogen_valence() {
        for smiles in ["CN(C)(C)C", "CN(C)(C)(C)C", "C[NH2](C)C", "CP(C)(C)(C)C"] {
            let molecule: Molecule = smiles.parse().unwrap();
            assert!(
                matches!(molecule.emit(), Err(GenerationError::InvalidValence { index: 1, .. })),
                "{smiles} should be rejected"
            );
        }
        for smiles in ["CN(C)C", "CN(=O)=O", "C[N+](C)(C)C", "CP(=O)(O)O", "C[N+](=O)[O-]"] {
            let molecule: Molecule = smiles.parse().unwrap();
            assert!(molecule.emit().is_ok(), "{smiles} should be accepted");
        }
    }

    #[test]
    fn test_aromatic_pi_bonds() {
        for smiles in [
            "c1ccncc1",
            "Cn1cccc1",
            "c1ccoc1",
            "c1ccsc1",
            "C[n+]1ccccc1",
            "O=c1cccc[nH]1",
            "c1ccc2ccccc2c1",
        ] {
            let molecule: Molecule = smiles.parse().unwrap();
            assert!(molecule.validate().is_ok(), "{smiles} should be accepted");
        }

        let pyridine: Molecule = "c1ccncc1".parse().unwrap();
        assert_eq!(pyridine.used_valence(3), Some(3));
        assert_eq!(pyridine.used_valence(0), Some(3));

        // A substituted pyridine nitrogen has no pi bond left for the ring.
        let methylated: Molecule = "Cn1ccccc1".parse().unwrap();
        assert!(matches!(methylated.validate(), Err(GenerationError::UnpairedAromatic(_))));
        let pyrrole_without_h: Molecule = "c1ccnc1".parse().unwrap();
        assert!(matches!(pyrrole_without_h.emit(), Err(GenerationError::UnpairedAromatic(_))));
    }

    #[test]
    fn test_large_hydrogen_count() {
        let molecule: Molecule = "[CH255]C".parse().unwrap();
        assert_eq!(molecule.used_valence(0), Some(256));
        assert_eq!(
            molecule.validate(),
            Err(GenerationError::InvalidValence { index: 0, element: Element::C, valence: 256 })
        );
        assert!(molecule.emit().is_err());
    }

    #[test]
    fn test_disconnected_is_rejected() {
        let molecule: Molecule = "CC.O".parse().unwrap();
        assert_eq!(molecule.validate(), Err(GenerationError::Disconnected(2)));
        assert_eq!(molecule.emit(), Err(GenerationError::Disconnected(2)));
        assert_eq!(Molecule::default().validate(), Err(GenerationError::Disconnected(0)));
    }

    #[test]
    fn test_set_element_out_of_range() {
        let mut molecule: Molecule = "CC".parse().unwrap();
        assert!(!molecule.set_element(5, Element::N));
        assert!(molecule.set_element(1, Element::N));
        assert_eq!(molecule.atom(1).map(|a| a.element), Some(Element::N));
    }
}
