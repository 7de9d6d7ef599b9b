use crate::*;
use rand::Rng;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Unparsable structure: {0}")]
    Unparsable(String),
    #[error("Position {0} is not a labelled atom of the structure")]
    UnknownPosition(usize),
    #[error("Structure has {0} connected components, expected 1")]
    Disconnected(usize),
    #[error("Atom {index} ({element}) has valence {valence}, more than allowed")]
    InvalidValence { index: usize, element: Element, valence: u16 },
    #[error("Aromatic atom {0} has no neighbour to share a pi bond with")]
    UnpairedAromatic(usize),
    #[error("Canonical SMILES '{smiles}' does not read back: {reason}")]
    ReparseMismatch { smiles: String, reason: String },
}

impl From<SmilesError> for GenerationError {
    fn from(e: SmilesError) -> Self {
        GenerationError::Unparsable(e.to_string())
    }
}

impl GenerationError {
    pub const REMOVED: (&'static str, &'static str) = ("Error", "Removed");

    /// Every failure kind collapses to the same sentinel pair.
    pub fn sentinel(&self) -> (&'static str, &'static str) {
        Self::REMOVED
    }
}

/// A successfully generated structure and its notation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variant {
    pub smiles: String,
    pub notation: String,
}

impl Variant {
    pub fn new(smiles: impl Into<String>, notation: impl Into<String>) -> Self {
        Self {
            smiles: smiles.into(),
            notation: notation.into(),
        }
    }

    /// The `(structure, notation)` pair, or the sentinel pair on failure.
    pub fn pair_or_sentinel(result: &Result<Variant, GenerationError>) -> (String, String) {
        match result {
            Ok(variant) => (variant.smiles.clone(), variant.notation.clone()),
            Err(e) => {
                let (smiles, notation) = e.sentinel();
                (smiles.to_string(), notation.to_string())
            }
        }
    }
}

/// A scaffold with heteroatoms substituted in, used to seed fragment growth.
#[derive(Debug, Clone)]
pub struct SeedVariant {
    pub molecule: Molecule,
    pub smiles: String,
    pub notation: String,
}

impl SeedVariant {
    pub const IMPOSSIBLE: (&'static str, &'static str, &'static str) =
        ("Impossible", "Impossible", "Impossible");

    /// `(graph, structure, notation)` as text, or the impossible sentinel on failure.
    pub fn triple_or_sentinel(
        result: &Result<SeedVariant, GenerationError>,
    ) -> (String, String, String) {
        match result {
            Ok(seed) => (seed.molecule.to_string(), seed.smiles.clone(), seed.notation.clone()),
            Err(_) => {
                let (graph, smiles, notation) = Self::IMPOSSIBLE;
                (graph.to_string(), smiles.to_string(), notation.to_string())
            }
        }
    }
}

/// Heteroatoms a ring position can be swapped to.
pub const SUBSTITUTION_ELEMENTS: [Element; 3] = [Element::N, Element::O, Element::S];

/// Look up the locant letter of every position in the subset.
pub fn position_letters(
    positions: &PositionIndex,
    subset: &[usize],
) -> Result<Vec<char>, GenerationError> {
    subset
        .iter()
        .map(|&position| {
            positions
                .letter_of(position)
                .ok_or(GenerationError::UnknownPosition(position))
        })
        .collect()
}

/// Join `prefix`, the terms and `suffix` with spaces, except that the suffix is
/// glued onto whatever comes right before it.
///
/// `fuse_notation("L C666", &["LN"], "TJ")` is `"L C666 LNTJ"`; with no terms
/// it is `"L C666TJ"`.
pub fn fuse_notation<S: AsRef<str>>(prefix: &str, terms: &[S], suffix: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(terms.len() + 1);
    parts.push(prefix.to_string());
    parts.extend(terms.iter().map(|term| term.as_ref().to_string()));
    if let Some(last) = parts.last_mut() {
        last.push_str(suffix);
    }
    parts.join(" ")
}

/// Attach one randomly drawn fragment per subset position and extend the
/// notation with `letter + token` for each of them, in subset order.
fn attach_fragments<R: Rng + ?Sized>(
    base: &Molecule,
    notation: &str,
    positions: &PositionIndex,
    subset: &[usize],
    fragments: &FragmentTable,
    rng: &mut R,
) -> Result<Variant, GenerationError> {
    let letters = position_letters(positions, subset)?;
    let drawn = fragments.sample(subset.len(), rng);

    let mut notation = notation.to_string();
    for (letter, record) in letters.iter().zip(&drawn) {
        notation.push(' ');
        notation.push(*letter);
        notation.push_str(&record.token);
    }

    let parsed: Vec<Molecule> = drawn
        .iter()
        .map(|record| record.molecule())
        .collect::<Result<_, _>>()?;
    let attachments: Vec<(usize, &Molecule)> = subset.iter().copied().zip(parsed.iter()).collect();

    let smiles = assemble(base, &attachments).emit()?;
    trace!("Generated {} for {}", smiles, notation);
    Ok(Variant { smiles, notation })
}

/// Grow fragments on a fresh copy of the named scaffold.
pub fn novel_ring_variant<R: Rng + ?Sized>(
    scaffold_notation: &str,
    scaffold_smiles: &str,
    positions: &PositionIndex,
    subset: &[usize],
    fragments: &FragmentTable,
    rng: &mut R,
) -> Result<Variant, GenerationError> {
    let base = Molecule::canonical_from_smiles(scaffold_smiles)?;
    attach_fragments(&base, scaffold_notation, positions, subset, fragments, rng)
}

/// Grow fragments on an already built structure, continuing its notation.
pub fn extend_variant<R: Rng + ?Sized>(
    seed_notation: &str,
    seed: &Molecule,
    positions: &PositionIndex,
    subset: &[usize],
    fragments: &FragmentTable,
    rng: &mut R,
) -> Result<Variant, GenerationError> {
    attach_fragments(seed, seed_notation, positions, subset, fragments, rng)
}

/// Swap every subset position to a uniformly drawn N, O or S.
pub fn substitute_heteroatoms<R: Rng + ?Sized>(
    subset: &[usize],
    scaffold: &Molecule,
    prefix: &str,
    suffix: &str,
    positions: &PositionIndex,
    rng: &mut R,
) -> Result<SeedVariant, GenerationError> {
    let assignments: Vec<(usize, Element)> = subset
        .iter()
        .map(|&position| {
            let element = SUBSTITUTION_ELEMENTS[rng.gen_range(0..SUBSTITUTION_ELEMENTS.len())];
            (position, element)
        })
        .collect();
    substitute_with(&assignments, scaffold, prefix, suffix, positions)
}

/// Swap the given positions to the given elements on a private copy of the scaffold.
pub fn substitute_with(
    assignments: &[(usize, Element)],
    scaffold: &Molecule,
    prefix: &str,
    suffix: &str,
    positions: &PositionIndex,
) -> Result<SeedVariant, GenerationError> {
    let subset: Vec<usize> = assignments.iter().map(|&(position, _)| position).collect();
    let letters = position_letters(positions, &subset)?;

    let mut molecule = scaffold.clone();
    for &(position, element) in assignments {
        if !molecule.set_element(position, element) {
            return Err(GenerationError::UnknownPosition(position));
        }
        trace!("Substituted {} at position {}", element, position);
    }

    let terms: Vec<String> = letters
        .iter()
        .zip(assignments)
        .map(|(letter, (_, element))| format!("{letter}{element}"))
        .collect();
    let notation = fuse_notation(prefix, &terms, suffix);
    let smiles = molecule.emit()?;
    Ok(SeedVariant {
        molecule,
        smiles,
        notation,
    })
}
