use std::fmt::{Display, Formatter, Result as FmtResult};

use tracing::level_filters::LevelFilter;

mod parse;
pub use parse::*;

mod canon;
pub use canon::*;

mod molecule;
pub use molecule::*;

mod positions;
pub use positions::*;

mod fragments;
pub use fragments::*;

mod assemble;
pub use assemble::*;

mod generate;
pub use generate::*;

mod normalize;
pub use normalize::*;

mod driver;
pub use driver::*;

mod config;
pub use config::*;

/// Install a `tracing` subscriber printing to stderr at the given level.
///
/// Calling this more than once is harmless; only the first call installs.
pub fn init_logging(level: &str) {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    H,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Fe,
    Cu,
    Zn,
    Ge,
    As,
    Se,
    Br,
    Sn,
    Te,
    I,
}

const ELEMENTS: [Element; 25] = [
    Element::H,
    Element::B,
    Element::C,
    Element::N,
    Element::O,
    Element::F,
    Element::Na,
    Element::Mg,
    Element::Al,
    Element::Si,
    Element::P,
    Element::S,
    Element::Cl,
    Element::K,
    Element::Ca,
    Element::Fe,
    Element::Cu,
    Element::Zn,
    Element::Ge,
    Element::As,
    Element::Se,
    Element::Br,
    Element::Sn,
    Element::Te,
    Element::I,
];

impl Element {
    pub fn atomic_number(&self) -> u8 {
        match self {
            Element::H => 1,
            Element::B => 5,
            Element::C => 6,
            Element::N => 7,
            Element::O => 8,
            Element::F => 9,
            Element::Na => 11,
            Element::Mg => 12,
            Element::Al => 13,
            Element::Si => 14,
            Element::P => 15,
            Element::S => 16,
            Element::Cl => 17,
            Element::K => 19,
            Element::Ca => 20,
            Element::Fe => 26,
            Element::Cu => 29,
            Element::Zn => 30,
            Element::Ge => 32,
            Element::As => 33,
            Element::Se => 34,
            Element::Br => 35,
            Element::Sn => 50,
            Element::Te => 52,
            Element::I => 53,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::Al => "Al",
            Element::Si => "Si",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Fe => "Fe",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Ge => "Ge",
            Element::As => "As",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::Sn => "Sn",
            Element::Te => "Te",
            Element::I => "I",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        ELEMENTS.iter().copied().find(|e| e.symbol() == symbol)
    }

    pub fn from_atomic_number(number: u8) -> Option<Self> {
        ELEMENTS.iter().copied().find(|e| e.atomic_number() == number)
    }

    /// Atoms that SMILES may write without brackets.
    pub fn is_organic_subset(&self) -> bool {
        matches!(
            self,
            Element::B
                | Element::C
                | Element::N
                | Element::O
                | Element::P
                | Element::S
                | Element::F
                | Element::Cl
                | Element::Br
                | Element::I
        )
    }

    /// Allowed valences of the neutral atom. Empty means the element is not
    /// valence checked.
    pub fn valences(&self) -> &'static [u8] {
        match self {
            Element::H => &[1],
            Element::B => &[3],
            Element::C => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::F => &[1],
            Element::Si => &[4],
            Element::P => &[3, 5],
            Element::S => &[2, 4, 6],
            Element::Cl => &[1],
            Element::Ge => &[4],
            Element::As => &[3, 5],
            Element::Se => &[2, 4, 6],
            Element::Br => &[1],
            Element::Te => &[2, 4, 6],
            Element::I => &[1, 3, 5],
            _ => &[],
        }
    }

    /// Allowed valences once a formal charge is applied.
    pub fn charged_valences(&self, charge: i8) -> Vec<i16> {
        let charge = charge as i16;
        self.valences()
            .iter()
            .map(|&v| {
                let v = v as i16;
                match self {
                    Element::C | Element::Si | Element::Ge => v - charge.abs(),
                    Element::B => v - charge,
                    _ => v + charge,
                }
            })
            .filter(|&v| v >= 0)
            .collect()
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

/// A single atom of a molecular graph.
///
/// `hydrogens` is only set for bracket atoms; organic-subset atoms get their
/// hydrogens implicitly from the default valence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub hydrogens: Option<u8>,
    pub isotope: Option<u16>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            hydrogens: None,
            isotope: None,
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    pub fn atomic_number(&self) -> u8 {
        self.element.atomic_number()
    }

    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }

    pub fn explicit_hydrogens(&self) -> u8 {
        self.hydrogens.unwrap_or(0)
    }

    /// Whether the atom has to be written inside `[...]`.
    pub fn needs_brackets(&self) -> bool {
        !self.element.is_organic_subset()
            || self.charge != 0
            || self.hydrogens.is_some()
            || self.isotope.is_some()
            || (self.aromatic
                && !matches!(
                    self.element,
                    Element::B | Element::C | Element::N | Element::O | Element::P | Element::S
                ))
    }

    pub fn smiles_symbol(&self) -> String {
        let symbol = if self.aromatic {
            self.element.symbol().to_lowercase()
        } else {
            self.element.symbol().to_string()
        };
        if !self.needs_brackets() {
            return symbol;
        }

        let mut out = String::from("[");
        if let Some(isotope) = self.isotope {
            out.push_str(&isotope.to_string());
        }
        out.push_str(&symbol);
        match self.hydrogens {
            Some(0) | None => {}
            Some(1) => out.push('H'),
            Some(n) => out.push_str(&format!("H{n}")),
        }
        match self.charge {
            0 => {}
            1 => out.push('+'),
            -1 => out.push('-'),
            c if c > 0 => out.push_str(&format!("+{c}")),
            c => out.push_str(&format!("-{}", c.abs())),
        }
        out.push(']');
        out
    }
}

impl From<Element> for Atom {
    fn from(element: Element) -> Self {
        Atom::new(element)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bond {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl Bond {
    /// Valence units the bond uses on each end. Aromatic bonds count one; the
    /// extra pi unit is accounted for on the atom.
    pub fn valence_contribution(&self) -> u8 {
        match self {
            Bond::Single | Bond::Aromatic => 1,
            Bond::Double => 2,
            Bond::Triple => 3,
        }
    }
}

pub type MoleculeGraph = petgraph::graph::UnGraph<Atom, Bond>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_lookup() {
        assert_eq!(Element::from_symbol("Cl"), Some(Element::Cl));
        assert_eq!(Element::from_symbol("Xx"), None);
        assert_eq!(Element::from_atomic_number(16), Some(Element::S));
        for element in ELEMENTS {
            assert_eq!(Element::from_atomic_number(element.atomic_number()), Some(element));
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
        }
    }

    #[test]
    fn test_charged_valences() {
        assert_eq!(Element::N.charged_valences(1), vec![4, 6]);
        assert_eq!(Element::O.charged_valences(-1), vec![1]);
        assert_eq!(Element::C.charged_valences(-1), vec![3]);
        assert_eq!(Element::B.charged_valences(-1), vec![4]);
        assert!(Element::Na.charged_valences(1).is_empty());
    }

    #[test]
    fn test_smiles_symbol() {
        assert_eq!(Atom::new(Element::C).smiles_symbol(), "C");
        assert_eq!(Atom::aromatic(Element::N).smiles_symbol(), "n");
        assert_eq!(Atom::new(Element::Na).smiles_symbol(), "[Na]");

        let pyrrole_n = Atom {
            hydrogens: Some(1),
            ..Atom::aromatic(Element::N)
        };
        assert_eq!(pyrrole_n.smiles_symbol(), "[nH]");

        let ammonium = Atom {
            hydrogens: Some(4),
            charge: 1,
            ..Atom::new(Element::N)
        };
        assert_eq!(ammonium.smiles_symbol(), "[NH4+]");

        let carbon13 = Atom {
            isotope: Some(13),
            ..Atom::new(Element::C)
        };
        assert_eq!(carbon13.smiles_symbol(), "[13C]");
    }
}
