use crate::*;
use tracing::{debug, trace};

/// Attach fragments to a base structure.
///
/// Every fragment is appended as a disjoint copy, in order, so the head atom of
/// fragment `i` lands at `base.atom_count()` plus the sizes of the fragments
/// before it. Each head is then single-bonded to its base position. Positions
/// outside the base are skipped, which leaves that fragment disconnected and
/// the result is rejected later by [`Molecule::validate`].
pub fn assemble(base: &Molecule, attachments: &[(usize, &Molecule)]) -> Molecule {
    let mut combined = base.clone();
    let heads: Vec<usize> = attachments
        .iter()
        .map(|(_, fragment)| combined.combine(fragment))
        .collect();

    for (&(position, fragment), head) in attachments.iter().zip(heads) {
        if position >= base.atom_count() || fragment.atom_count() == 0 {
            debug!("Skipping attachment at position {} outside the base structure", position);
            continue;
        }
        match combined.add_bond(position, head, Bond::Single) {
            Some(_) => trace!("Attached fragment head {} to position {}", head, position),
            None => debug!("Could not bond position {} to fragment head {}", position, head),
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn molecule(smiles: &str) -> Molecule {
        smiles.parse().expect("Failed to parse SMILES")
    }

    #[test]
    fn test_head_offsets() {
        let base = molecule("C1CCCCC1");
        let methoxy = molecule("OC");
        let amine = molecule("NCC");
        let result = assemble(&base, &[(0, &methoxy), (3, &amine)]);

        assert_eq!(result.atom_count(), 6 + 2 + 3);
        assert_eq!(result.bond_count(), 6 + 1 + 2 + 2);
        assert_eq!(result.bond_between(0, 6), Some(Bond::Single));
        assert_eq!(result.bond_between(3, 8), Some(Bond::Single));
        assert_eq!(result.atom(8).map(|a| a.element), Some(Element::N));
        assert!(result.is_connected());
    }

    #[test]
    fn test_no_attachments() {
        let base = molecule("c1ccccc1");
        let result = assemble(&base, &[]);
        assert!(result.is_same_as(&base));
    }

    #[test]
    fn test_out_of_range_position_is_skipped() {
        let base = molecule("CC");
        let fragment = molecule("O");
        let result = assemble(&base, &[(5, &fragment)]);
        assert_eq!(result.atom_count(), 3);
        assert_eq!(result.bond_count(), 1);
        assert_eq!(result.validate(), Err(GenerationError::Disconnected(2)));
    }

    #[test]
    fn test_pyridine_nitrogen_head() {
        // Bonding through a pyridine nitrogen leaves the ring one pi bond short.
        let base = molecule("C");
        let pyridine = molecule("n1ccccc1");
        let result = assemble(&base, &[(0, &pyridine)]);
        assert!(result.is_connected());
        assert!(matches!(result.emit(), Err(GenerationError::UnpairedAromatic(_))));

        let pyrrole = molecule("n1cccc1");
        assert!(assemble(&base, &[(0, &pyrrole)]).emit().is_ok());
    }

    #[test]
    fn test_same_position_twice() {
        let base = molecule("CC");
        let fragment = molecule("O");
        let result = assemble(&base, &[(0, &fragment), (0, &fragment)]);
        assert_eq!(result.bond_between(0, 2), Some(Bond::Single));
        assert_eq!(result.bond_between(0, 3), Some(Bond::Single));
        assert!(result.validate().is_ok());
    }
}
