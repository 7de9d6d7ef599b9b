use crate::canon::canonical_ranks;
use crate::{Atom, Bond, Element, MoleculeGraph};
use petgraph::graph::NodeIndex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SmilesError {
    #[error("Empty SMILES string")]
    Empty,
    #[error("Branch start '(' at position {0} without a current atom")]
    BranchNoCurrentAtom(usize),
    #[error("Branch end ')' at position {0} without a matching '('")]
    BranchEndNoStart(usize),
    #[error("Unmatched '(' in SMILES")]
    UnclosedBranch,
    #[error("Ring closure '{0}' at position {1} without a current atom")]
    RingClosureNoCurrentAtom(u8, usize),
    #[error("Incomplete ring closure after '%' at position {0}")]
    IncompleteRingNumber(usize),
    #[error("Unclosed ring closures in SMILES: {0:?}")]
    UnclosedRing(Vec<u8>),
    #[error("Ring closure {0} joins atoms that are already bonded")]
    DuplicateBond(u8),
    #[error("Ring closure {0} has conflicting bond symbols")]
    ConflictingRingBond(u8),
    #[error("Unclosed bracket '[' at position {0}")]
    UnclosedBracket(usize),
    #[error("Invalid bracket atom '[{0}]'")]
    InvalidBracketAtom(String),
    #[error("Unknown element symbol '{0}' at position {1}")]
    UnknownElement(String, usize),
    #[error("Bond symbol '{0}' at position {1} is not followed by an atom")]
    DanglingBond(char, usize),
    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
    #[error("Cannot write an empty molecule")]
    EmptyGraph,
    #[error("More than 99 ring closures are open at once")]
    TooManyRings,
}

/// Parses a SMILES string into a MoleculeGraph.
///
/// Atoms are indexed in the order they are read, so the first atom written is
/// node 0. Bracket atoms keep their explicit hydrogen count; organic-subset
/// atoms leave their hydrogens implicit.
///
/// # Arguments
///
/// * `smiles` - The SMILES string to parse.
///
/// # Returns
///
/// * `Result<MoleculeGraph, SmilesError>` - The parsed molecular graph or the reason it was
///   rejected.
pub fn parse_smiles(smiles: &str) -> Result<MoleculeGraph, SmilesError> {
    let smiles = smiles.trim();
    if smiles.is_empty() {
        return Err(SmilesError::Empty);
    }

    let mut graph = MoleculeGraph::new_undirected();
    let mut current_atom: Option<NodeIndex> = None;
    // An explicit bond symbol waiting for the next atom or ring digit.
    let mut pending_bond: Option<(Bond, char, usize)> = None;
    let mut branch_stack: Vec<NodeIndex> = Vec::new();
    let mut ring_map: BTreeMap<u8, (NodeIndex, Option<Bond>)> = BTreeMap::new();

    let chars: Vec<char> = smiles.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '(' => {
                // Start of a branch: push current_atom to stack
                match current_atom {
                    Some(atom) => branch_stack.push(atom),
                    None => return Err(SmilesError::BranchNoCurrentAtom(i)),
                }
                i += 1;
            }
            ')' => {
                if let Some((_, symbol, at)) = pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, at));
                }
                current_atom = Some(branch_stack.pop().ok_or(SmilesError::BranchEndNoStart(i))?);
                i += 1;
            }
            '-' | '=' | '#' | ':' | '/' | '\\' => {
                if let Some((_, symbol, at)) = pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, at));
                }
                let bond = match c {
                    '=' => Bond::Double,
                    '#' => Bond::Triple,
                    ':' => Bond::Aromatic,
                    // Directional bonds only carry stereo, which we drop.
                    _ => Bond::Single,
                };
                pending_bond = Some((bond, c, i));
                i += 1;
            }
            '%' => {
                if i + 2 >= chars.len() {
                    return Err(SmilesError::IncompleteRingNumber(i));
                }
                let (tens, ones) = match (chars[i + 1].to_digit(10), chars[i + 2].to_digit(10)) {
                    (Some(tens), Some(ones)) => (tens, ones),
                    _ => return Err(SmilesError::IncompleteRingNumber(i)),
                };
                let ring_number = (tens * 10 + ones) as u8;
                let bond_here = pending_bond.take().map(|(bond, _, _)| bond);
                close_or_open_ring(
                    &mut graph,
                    &mut ring_map,
                    current_atom,
                    ring_number,
                    bond_here,
                    i,
                )?;
                i += 3;
            }
            '0'..='9' => {
                let ring_number = c.to_digit(10).unwrap_or_default() as u8;
                let bond_here = pending_bond.take().map(|(bond, _, _)| bond);
                close_or_open_ring(
                    &mut graph,
                    &mut ring_map,
                    current_atom,
                    ring_number,
                    bond_here,
                    i,
                )?;
                i += 1;
            }
            '[' => {
                let end_relative = chars[i..]
                    .iter()
                    .position(|&x| x == ']')
                    .ok_or(SmilesError::UnclosedBracket(i))?;
                let end = i + end_relative;
                let content: String = chars[i + 1..end].iter().collect();
                let atom = parse_bracket_atom(&content)?;
                let new_atom = add_atom(&mut graph, current_atom, &mut pending_bond, atom)?;
                current_atom = Some(new_atom);
                i = end + 1;
            }
            '.' => {
                if let Some((_, symbol, at)) = pending_bond {
                    return Err(SmilesError::DanglingBond(symbol, at));
                }
                // The next atom starts a new, disconnected component.
                current_atom = None;
                i += 1;
            }
            c if c.is_ascii_alphabetic() => {
                let (atom, width) = parse_organic_atom(&chars[i..], i)?;
                let new_atom = add_atom(&mut graph, current_atom, &mut pending_bond, atom)?;
                current_atom = Some(new_atom);
                i += width;
            }
            _ => return Err(SmilesError::UnexpectedChar(c, i)),
        }
    }

    if let Some((_, symbol, at)) = pending_bond {
        return Err(SmilesError::DanglingBond(symbol, at));
    }
    if !branch_stack.is_empty() {
        return Err(SmilesError::UnclosedBranch);
    }
    if !ring_map.is_empty() {
        return Err(SmilesError::UnclosedRing(ring_map.keys().copied().collect()));
    }

    Ok(graph)
}

/// The bond implied when no symbol is written between two atoms.
fn implicit_bond(a: &Atom, b: &Atom) -> Bond {
    if a.is_aromatic() && b.is_aromatic() {
        Bond::Aromatic
    } else {
        Bond::Single
    }
}

fn add_atom(
    graph: &mut MoleculeGraph,
    current_atom: Option<NodeIndex>,
    pending_bond: &mut Option<(Bond, char, usize)>,
    atom: Atom,
) -> Result<NodeIndex, SmilesError> {
    let new_atom = graph.add_node(atom);
    match (current_atom, pending_bond.take()) {
        (Some(prev_atom), Some((bond, _, _))) => {
            graph.add_edge(prev_atom, new_atom, bond);
        }
        (Some(prev_atom), None) => {
            let bond = implicit_bond(&graph[prev_atom], &atom);
            graph.add_edge(prev_atom, new_atom, bond);
        }
        (None, Some((_, symbol, at))) => return Err(SmilesError::DanglingBond(symbol, at)),
        (None, None) => {}
    }
    Ok(new_atom)
}

fn close_or_open_ring(
    graph: &mut MoleculeGraph,
    ring_map: &mut BTreeMap<u8, (NodeIndex, Option<Bond>)>,
    current_atom: Option<NodeIndex>,
    ring_number: u8,
    bond_here: Option<Bond>,
    position: usize,
) -> Result<(), SmilesError> {
    let current = current_atom.ok_or(SmilesError::RingClosureNoCurrentAtom(ring_number, position))?;
    match ring_map.remove(&ring_number) {
        Some((start, bond_there)) => {
            if start == current || graph.find_edge(start, current).is_some() {
                return Err(SmilesError::DuplicateBond(ring_number));
            }
            let bond = match (bond_there, bond_here) {
                (Some(a), Some(b)) if a != b => {
                    return Err(SmilesError::ConflictingRingBond(ring_number))
                }
                (Some(bond), _) | (None, Some(bond)) => bond,
                (None, None) => implicit_bond(&graph[start], &graph[current]),
            };
            graph.add_edge(start, current, bond);
        }
        None => {
            ring_map.insert(ring_number, (current, bond_here));
        }
    }
    Ok(())
}

/// Parse an atom outside brackets, returning it and how many characters it used.
fn parse_organic_atom(chars: &[char], position: usize) -> Result<(Atom, usize), SmilesError> {
    let c = chars[0];
    let next = chars.get(1).copied();

    // Only Cl and Br are two-letter symbols in the organic subset.
    match (c, next) {
        ('C', Some('l')) => return Ok((Atom::new(Element::Cl), 2)),
        ('B', Some('r')) => return Ok((Atom::new(Element::Br), 2)),
        _ => {}
    }

    if c.is_ascii_uppercase() {
        match Element::from_symbol(&c.to_string()) {
            Some(element) if element.is_organic_subset() => Ok((element.into(), 1)),
            _ => Err(SmilesError::UnknownElement(c.to_string(), position)),
        }
    } else {
        let element = match c {
            'b' => Element::B,
            'c' => Element::C,
            'n' => Element::N,
            'o' => Element::O,
            'p' => Element::P,
            's' => Element::S,
            _ => return Err(SmilesError::UnknownElement(c.to_string(), position)),
        };
        Ok((Atom::aromatic(element), 1))
    }
}

/// Parse the inside of a bracket atom: `isotope? symbol chirality? hcount? charge? class?`.
fn parse_bracket_atom(content: &str) -> Result<Atom, SmilesError> {
    let invalid = || SmilesError::InvalidBracketAtom(content.to_string());
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;

    // Isotope
    let mut isotope = None;
    let digits: String = chars.iter().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        isotope = Some(digits.parse::<u16>().map_err(|_| invalid())?);
        i += digits.len();
    }

    // Element symbol, possibly aromatic.
    let first = *chars.get(i).ok_or_else(invalid)?;
    let second = chars.get(i + 1).copied();
    let (element, aromatic) = if first.is_ascii_uppercase() {
        let two_letter = second
            .filter(|c| c.is_ascii_lowercase())
            .and_then(|c| Element::from_symbol(&format!("{first}{c}")));
        match two_letter {
            Some(element) => {
                i += 2;
                (element, false)
            }
            None => {
                i += 1;
                (Element::from_symbol(&first.to_string()).ok_or_else(invalid)?, false)
            }
        }
    } else {
        let two_letter = second.and_then(|c| match (first, c) {
            ('s', 'e') => Some(Element::Se),
            ('a', 's') => Some(Element::As),
            ('t', 'e') => Some(Element::Te),
            _ => None,
        });
        match two_letter {
            Some(element) => {
                i += 2;
                (element, true)
            }
            None => {
                i += 1;
                let element = match first {
                    'b' => Element::B,
                    'c' => Element::C,
                    'n' => Element::N,
                    'o' => Element::O,
                    'p' => Element::P,
                    's' => Element::S,
                    _ => return Err(invalid()),
                };
                (element, true)
            }
        }
    };

    // Chirality is not modelled.
    while chars.get(i) == Some(&'@') {
        i += 1;
    }

    // Hydrogen count
    let mut hydrogens = 0u8;
    if chars.get(i) == Some(&'H') {
        i += 1;
        let digits: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        hydrogens = if digits.is_empty() {
            1
        } else {
            i += digits.len();
            digits.parse::<u8>().map_err(|_| invalid())?
        };
    }

    // Charge: '+', '++', '+2', '-', '--', '-3'
    let mut charge = 0i8;
    if let Some(&sign @ ('+' | '-')) = chars.get(i) {
        let unit: i8 = if sign == '+' { 1 } else { -1 };
        i += 1;
        let digits: String = chars[i..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            i += digits.len();
            charge = unit * digits.parse::<i8>().map_err(|_| invalid())?;
        } else {
            charge = unit;
            while chars.get(i) == Some(&sign) {
                charge = charge.checked_add(unit).ok_or_else(invalid)?;
                i += 1;
            }
        }
    }

    // Atom class
    if chars.get(i) == Some(&':') {
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    if i != chars.len() {
        return Err(invalid());
    }

    Ok(Atom {
        element,
        aromatic,
        charge,
        hydrogens: Some(hydrogens),
        isotope,
    })
}

/// A helper structure to record a ring closure edge.
#[derive(Debug, Clone)]
struct RingClosure {
    opening: NodeIndex, // the ancestor where the ring is opened
    closing: NodeIndex, // the descendant where the ring is closed
    bond: Bond,
}

/// A DFS spanning tree of one connected component, with the back edges that
/// become ring closures.
struct SpanningTree {
    root: NodeIndex,
    children: HashMap<NodeIndex, Vec<NodeIndex>>,
    ring_closures: Vec<RingClosure>,
}

/// First pass: walk the component from `root`, always taking the lowest-ranked
/// neighbour first, and record every back edge as a ring closure.
fn compute_spanning_tree(
    graph: &MoleculeGraph,
    root: NodeIndex,
    ranks: &[usize],
    visited: &mut [bool],
) -> SpanningTree {
    let mut tree = SpanningTree {
        root,
        children: HashMap::new(),
        ring_closures: Vec::new(),
    };
    let mut on_path = vec![false; graph.node_count()];

    fn dfs(
        graph: &MoleculeGraph,
        current: NodeIndex,
        parent: Option<NodeIndex>,
        ranks: &[usize],
        visited: &mut [bool],
        on_path: &mut [bool],
        tree: &mut SpanningTree,
    ) {
        visited[current.index()] = true;
        on_path[current.index()] = true;

        let mut nbrs: Vec<NodeIndex> = graph.neighbors(current).collect();
        nbrs.sort_by_key(|n| ranks[n.index()]);
        for nbr in nbrs {
            if Some(nbr) == parent {
                continue;
            }
            if !visited[nbr.index()] {
                tree.children.entry(current).or_default().push(nbr);
                dfs(graph, nbr, Some(current), ranks, visited, on_path, tree);
            } else if on_path[nbr.index()] {
                // Back edge to an ancestor; the finished side sees it again later and skips it.
                if let Some(edge) = graph.find_edge(current, nbr) {
                    tree.ring_closures.push(RingClosure {
                        opening: nbr,
                        closing: current,
                        bond: graph[edge],
                    });
                }
            }
        }
        on_path[current.index()] = false;
    }

    dfs(graph, root, None, ranks, visited, &mut on_path, &mut tree);
    tree
}

/// Returns the bond symbol to write between two atoms, empty when implied.
fn bond_str(graph: &MoleculeGraph, a: NodeIndex, b: NodeIndex, bond: Bond) -> &'static str {
    let both_aromatic = graph[a].is_aromatic() && graph[b].is_aromatic();
    match bond {
        Bond::Single if both_aromatic => "-",
        Bond::Single => "",
        Bond::Double => "=",
        Bond::Triple => "#",
        Bond::Aromatic if both_aromatic => "",
        Bond::Aromatic => ":",
    }
}

/// Formats a ring closure digit according to SMILES rules.
fn format_ring(digit: usize) -> String {
    if digit < 10 {
        digit.to_string()
    } else {
        format!("%{}", digit)
    }
}

/// Second pass: emit the tree, allocating the lowest free ring digit when a
/// ring opens and releasing it once the ring closes.
struct TreeWriter<'a> {
    graph: &'a MoleculeGraph,
    tree: &'a SpanningTree,
    digits_in_use: BTreeSet<usize>,
    open_rings: HashMap<(NodeIndex, NodeIndex), usize>,
    out: String,
}

impl TreeWriter<'_> {
    fn allocate_digit(&mut self) -> Result<usize, SmilesError> {
        let digit = (1..100)
            .find(|d| !self.digits_in_use.contains(d))
            .ok_or(SmilesError::TooManyRings)?;
        self.digits_in_use.insert(digit);
        Ok(digit)
    }

    fn write_atom(&mut self, current: NodeIndex) -> Result<(), SmilesError> {
        let tree = self.tree;
        self.out.push_str(&self.graph[current].smiles_symbol());

        let closings: Vec<usize> = tree
            .ring_closures
            .iter()
            .filter(|rc| rc.closing == current)
            .filter_map(|rc| self.open_rings.remove(&(rc.opening, rc.closing)))
            .collect();

        let openings: Vec<&RingClosure> = tree
            .ring_closures
            .iter()
            .filter(|rc| rc.opening == current)
            .collect();
        let mut opening_marks = String::new();
        for rc in openings {
            let digit = self.allocate_digit()?;
            self.open_rings.insert((rc.opening, rc.closing), digit);
            opening_marks.push_str(bond_str(self.graph, rc.opening, rc.closing, rc.bond));
            opening_marks.push_str(&format_ring(digit));
        }

        for digit in closings {
            self.out.push_str(&format_ring(digit));
            self.digits_in_use.remove(&digit);
        }
        self.out.push_str(&opening_marks);

        let children = tree.children.get(&current).cloned().unwrap_or_default();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let bond = self
                .graph
                .find_edge(current, child)
                .map(|edge| self.graph[edge])
                .unwrap_or(Bond::Single);
            let symbol = bond_str(self.graph, current, child, bond);
            if i < last {
                self.out.push('(');
                self.out.push_str(symbol);
                self.write_atom(child)?;
                self.out.push(')');
            } else {
                self.out.push_str(symbol);
                self.write_atom(child)?;
            }
        }
        Ok(())
    }
}

/// Convert a MoleculeGraph into its canonical SMILES string.
///
/// Each component is written from its lowest-ranked atom; components are
/// joined with `.` in rank order.
pub fn write_smiles(graph: &MoleculeGraph) -> Result<String, SmilesError> {
    if graph.node_count() == 0 {
        return Err(SmilesError::EmptyGraph);
    }

    let ranks = canonical_ranks(graph);
    let mut order: Vec<NodeIndex> = graph.node_indices().collect();
    order.sort_by_key(|n| ranks[n.index()]);

    let mut visited = vec![false; graph.node_count()];
    let mut components = Vec::new();
    for start in order {
        if visited[start.index()] {
            continue;
        }
        let tree = compute_spanning_tree(graph, start, &ranks, &mut visited);
        let mut writer = TreeWriter {
            graph,
            tree: &tree,
            digits_in_use: BTreeSet::new(),
            open_rings: HashMap::new(),
            out: String::new(),
        };
        writer.write_atom(tree.root)?;
        components.push(writer.out);
    }
    Ok(components.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::visit::EdgeRef;

    fn canonical(smiles: &str) -> String {
        let graph = parse_smiles(smiles).expect("Failed to parse SMILES");
        write_smiles(&graph).expect("Failed to write SMILES")
    }

    #[test]
    fn test_parse_ethanol() {
        let molecule = parse_smiles("CCO").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 3);
        assert_eq!(molecule[NodeIndex::new(0)].element, Element::C);
        assert_eq!(molecule[NodeIndex::new(1)].element, Element::C);
        assert_eq!(molecule[NodeIndex::new(2)].element, Element::O);

        let edges: Vec<_> = molecule.edge_references().collect();
        assert_eq!(edges.len(), 2);
        for edge in edges {
            match (edge.source().index(), edge.target().index()) {
                (0, 1) | (1, 0) | (1, 2) | (2, 1) => assert_eq!(edge.weight(), &Bond::Single),
                (a, b) => panic!("Unexpected bond between {a} and {b}"),
            }
        }
    }

    #[test]
    fn test_parse_cyclohexane() {
        let molecule = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 6);
        assert_eq!(molecule.edge_count(), 6);
        for node in molecule.node_indices() {
            assert_eq!(molecule.edges(node).count(), 2, "Node {} is not in the ring", node.index());
        }
    }

    #[test]
    fn test_parse_benzene() {
        let molecule = parse_smiles("c1ccccc1").expect("Failed to parse SMILES");
        assert_eq!(molecule.edge_count(), 6);
        assert!(molecule.node_weights().all(|atom| atom.is_aromatic()));
        assert!(molecule.edge_weights().all(|bond| *bond == Bond::Aromatic));
    }

    #[test]
    fn test_parse_isobutane() {
        let molecule = parse_smiles("CC(C)C").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 4);
        assert_eq!(molecule.edge_count(), 3);
        assert_eq!(molecule.neighbors(NodeIndex::new(1)).count(), 3);
    }

    #[test]
    fn test_parse_ring_scaffold() {
        let molecule = parse_smiles("C1C2C(CCC1)CC3C(C2)CCCC3").expect("Failed to parse SMILES");
        assert_eq!(molecule.node_count(), 14);
        // three fused six-membered rings
        assert_eq!(molecule.edge_count(), 16);
    }

    #[test]
    fn test_parse_bracket_atoms() {
        let molecule =
            parse_smiles("[13CH3][NH3+].[O-]c1cc[nH]c1").expect("Failed to parse SMILES");
        let carbon = molecule[NodeIndex::new(0)];
        assert_eq!(carbon.isotope, Some(13));
        assert_eq!(carbon.hydrogens, Some(3));
        let nitrogen = molecule[NodeIndex::new(1)];
        assert_eq!(nitrogen.charge, 1);
        assert_eq!(nitrogen.hydrogens, Some(3));
        let oxygen = molecule[NodeIndex::new(2)];
        assert_eq!(oxygen.charge, -1);
        let pyrrole_n = molecule[NodeIndex::new(6)];
        assert!(pyrrole_n.is_aromatic());
        assert_eq!(pyrrole_n.element, Element::N);
        assert_eq!(pyrrole_n.hydrogens, Some(1));
        assert_eq!(petgraph::algo::connected_components(&molecule), 2);
    }

    #[test]
    fn test_parse_two_digit_ring_and_bonds() {
        let molecule = parse_smiles("C%10CC=CC%10").expect("Failed to parse SMILES");
        assert_eq!(molecule.edge_count(), 5);
        assert_eq!(molecule.edge_weights().filter(|b| **b == Bond::Double).count(), 1);

        let molecule = parse_smiles("C=1CCCCC1").expect("Failed to parse SMILES");
        let closure = molecule
            .find_edge(NodeIndex::new(0), NodeIndex::new(5))
            .expect("ring closure bond");
        assert_eq!(molecule[closure], Bond::Double);

        let biphenyl = parse_smiles("c1ccccc1-c1ccccc1").expect("Failed to parse SMILES");
        let link = biphenyl
            .find_edge(NodeIndex::new(5), NodeIndex::new(6))
            .expect("biaryl bond");
        assert_eq!(biphenyl[link], Bond::Single);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_smiles("").err(), Some(SmilesError::Empty));
        assert_eq!(parse_smiles("(C)").err(), Some(SmilesError::BranchNoCurrentAtom(0)));
        assert_eq!(parse_smiles("CC)").err(), Some(SmilesError::BranchEndNoStart(2)));
        assert_eq!(parse_smiles("CC(C").err(), Some(SmilesError::UnclosedBranch));
        assert_eq!(parse_smiles("C1CC").err(), Some(SmilesError::UnclosedRing(vec![1])));
        assert_eq!(parse_smiles("C11").err(), Some(SmilesError::DuplicateBond(1)));
        assert_eq!(parse_smiles("C[NH").err(), Some(SmilesError::UnclosedBracket(1)));
        assert_eq!(parse_smiles("CX").err(), Some(SmilesError::UnknownElement("X".to_string(), 1)));
        assert_eq!(parse_smiles("CC=").err(), Some(SmilesError::DanglingBond('=', 2)));
        assert_eq!(parse_smiles("C*").err(), Some(SmilesError::UnexpectedChar('*', 1)));
        assert!(matches!(parse_smiles("[Qq]"), Err(SmilesError::InvalidBracketAtom(_))));
        assert!(matches!(parse_smiles("C%1"), Err(SmilesError::IncompleteRingNumber(1))));

        // Charges that do not fit in a byte are malformed atoms.
        let many_plus = format!("[C{}]", "+".repeat(128));
        assert!(matches!(parse_smiles(&many_plus), Err(SmilesError::InvalidBracketAtom(_))));
        let many_minus = format!("[C{}]", "-".repeat(129));
        assert!(matches!(parse_smiles(&many_minus), Err(SmilesError::InvalidBracketAtom(_))));
        assert_eq!(parse_smiles("[N+++]").map(|g| g[NodeIndex::new(0)].charge), Ok(3));
    }

    #[test]
    fn test_write_simple() {
        assert_eq!(canonical("CCO"), canonical("OCC"));
        assert_eq!(canonical("Oc1ccccc1"), canonical("c1ccc(O)cc1"));
        assert_eq!(canonical("C(C)(C)C"), canonical("CC(C)C"));
        assert_eq!(write_smiles(&MoleculeGraph::default()), Err(SmilesError::EmptyGraph));
    }

    #[test]
    fn test_write_is_fixed_point() {
        for smiles in [
            "CCO",
            "c1ccccc1",
            "C1C2C(CCC1)CC3C(C2)CCCC3",
            "CC(=O)Oc1ccccc1C(=O)O",
            "C1CC2CCC1CC2",
            "[NH4+]",
            "c1ccc2[nH]ccc2c1",
            "C#N",
            "NC(Cc1ccccc1)C(=O)O",
            "CC.O",
            "c1ccccc1-c1ccccc1",
            "C1CCC2(CC1)CCCC2",
        ] {
            let once = canonical(smiles);
            let twice = canonical(&once);
            assert_eq!(once, twice, "canonical form of {smiles} is not stable");

            let original = parse_smiles(smiles).expect("Failed to parse SMILES");
            let reparsed = parse_smiles(&once).expect("Failed to reparse canonical SMILES");
            assert!(
                petgraph::algo::is_isomorphic_matching(
                    &original,
                    &reparsed,
                    |a, b| a == b,
                    |a, b| a == b
                ),
                "{once} is not the same molecule as {smiles}"
            );
        }
    }

    #[test]
    fn test_write_ring_digits_reused() {
        let smiles = canonical("C1CC1C1CC1");
        // Two separate rings never need more than one digit at a time.
        assert!(!smiles.contains('2'), "{smiles}");
    }
}
