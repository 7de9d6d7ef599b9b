use crate::*;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

/// Everything about an atom that does not depend on how the graph was numbered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct AtomInvariant {
    degree: usize,
    atomic_number: u8,
    isotope: u16,
    charge: i8,
    aromatic: bool,
    hydrogens: Option<u8>,
    bonds: [usize; 4],
}

impl AtomInvariant {
    fn of(graph: &MoleculeGraph, node: NodeIndex) -> Self {
        let atom = &graph[node];
        let mut bonds = [0; 4];
        for edge in graph.edges(node) {
            bonds[*edge.weight() as usize] += 1;
        }
        Self {
            degree: graph.edges(node).count(),
            atomic_number: atom.atomic_number(),
            isotope: atom.isotope.unwrap_or(0),
            charge: atom.charge,
            aromatic: atom.aromatic,
            hydrogens: atom.hydrogens,
            bonds,
        }
    }
}

/// Replace each key with its position among the distinct sorted keys.
fn dense_ranks<T: Ord>(keys: &[T]) -> Vec<usize> {
    let mut sorted: Vec<&T> = keys.iter().collect();
    sorted.sort();
    sorted.dedup();
    keys.iter()
        .map(|key| sorted.binary_search(&key).unwrap_or_default())
        .collect()
}

fn class_count(ranks: &[usize]) -> usize {
    let mut distinct = ranks.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len()
}

/// Refine `ranks` by neighbour ranks until the number of classes is stable.
///
/// The previous rank leads each signature, so classes only ever split and the
/// relative order between existing classes is kept.
pub fn morgan_algorithm(graph: &MoleculeGraph, mut ranks: Vec<usize>) -> Vec<usize> {
    let mut classes = class_count(&ranks);
    loop {
        let signatures: Vec<(usize, Vec<(usize, Bond)>)> = graph
            .node_indices()
            .map(|node| {
                let mut neighbours: Vec<(usize, Bond)> = graph
                    .edges(node)
                    .map(|edge| {
                        let other = if edge.source() == node {
                            edge.target()
                        } else {
                            edge.source()
                        };
                        (ranks[other.index()], *edge.weight())
                    })
                    .collect();
                neighbours.sort();
                (ranks[node.index()], neighbours)
            })
            .collect();

        let refined = dense_ranks(&signatures);
        let refined_classes = class_count(&refined);
        if refined_classes == classes {
            return refined;
        }
        classes = refined_classes;
        ranks = refined;
    }
}

/// Edge list and initial atom classes in rank order. Two discrete rankings of
/// isomorphic graphs give equal certificates exactly when they number the
/// atoms the same way.
type Certificate = (Vec<usize>, Vec<(usize, usize, Bond)>);

fn certificate(graph: &MoleculeGraph, classes: &[usize], ranks: &[usize]) -> Certificate {
    let mut atoms = vec![0; ranks.len()];
    for (node, &rank) in ranks.iter().enumerate() {
        atoms[rank] = classes[node];
    }
    let mut edges: Vec<(usize, usize, Bond)> = graph
        .edge_references()
        .map(|edge| {
            let (a, b) = (ranks[edge.source().index()], ranks[edge.target().index()]);
            (a.min(b), a.max(b), *edge.weight())
        })
        .collect();
    edges.sort();
    (atoms, edges)
}

/// Lowest rank shared by more than one atom.
fn first_tied_rank(ranks: &[usize]) -> Option<usize> {
    let mut counts = vec![0usize; ranks.len()];
    for &rank in ranks {
        counts[rank] += 1;
    }
    counts.iter().position(|&count| count > 1)
}

/// Give `chosen` a rank of its own just below its class, then refine.
fn individualize(graph: &MoleculeGraph, ranks: &[usize], chosen: usize) -> Vec<usize> {
    let mut split: Vec<usize> = ranks.iter().map(|&rank| rank * 2 + 1).collect();
    split[chosen] -= 1;
    morgan_algorithm(graph, dense_ranks(&split))
}

/// Search over tie-breaking choices for the ranking with the smallest
/// certificate. Automorphisms found along the way prune choices that lead
/// to the same certificates.
struct TieBreaker<'a> {
    graph: &'a MoleculeGraph,
    classes: Vec<usize>,
    best: Option<(Certificate, Vec<usize>)>,
    automorphisms: Vec<Vec<usize>>,
}

impl TieBreaker<'_> {
    fn search(&mut self, ranks: Vec<usize>, fixed: &mut Vec<usize>) {
        let Some(tied) = first_tied_rank(&ranks) else {
            self.leaf(ranks);
            return;
        };

        let mut tried: Vec<usize> = Vec::new();
        for member in (0..ranks.len()).filter(|&node| ranks[node] == tied) {
            if tried.iter().any(|&seen| self.same_orbit(seen, member, fixed.as_slice())) {
                continue;
            }
            tried.push(member);
            fixed.push(member);
            self.search(individualize(self.graph, &ranks, member), fixed);
            fixed.pop();
        }
    }

    fn leaf(&mut self, ranks: Vec<usize>) {
        let candidate = certificate(self.graph, &self.classes, &ranks);
        let replace = match &self.best {
            None => true,
            Some((best, best_ranks)) => {
                if *best == candidate {
                    // Same numbering reached another way: node -> node of the best ranking.
                    let mut by_rank = vec![0; ranks.len()];
                    for (node, &rank) in best_ranks.iter().enumerate() {
                        by_rank[rank] = node;
                    }
                    self.automorphisms.push(ranks.iter().map(|&rank| by_rank[rank]).collect());
                }
                candidate < *best
            }
        };
        if replace {
            self.best = Some((candidate, ranks));
        }
    }

    /// Are `a` and `b` swapped by some known automorphism that leaves every
    /// atom in `fixed` in place?
    fn same_orbit(&self, a: usize, b: usize, fixed: &[usize]) -> bool {
        fn root(parent: &mut [usize], mut node: usize) -> usize {
            while parent[node] != node {
                parent[node] = parent[parent[node]];
                node = parent[node];
            }
            node
        }

        let mut parent: Vec<usize> = (0..self.classes.len()).collect();
        for automorphism in &self.automorphisms {
            if fixed.iter().any(|&node| automorphism[node] != node) {
                continue;
            }
            for (node, &image) in automorphism.iter().enumerate() {
                let (x, y) = (root(&mut parent, node), root(&mut parent, image));
                parent[x] = y;
            }
        }
        root(&mut parent, a) == root(&mut parent, b)
    }
}

/// Compute a canonical rank for every atom, indexed by node index.
///
/// Ranks start from per-atom invariants and are refined by neighbour ranks.
/// Refinement alone cannot tell apart atoms of regular graphs that are not
/// symmetric, so every remaining tie is broken each possible way and the
/// ranking with the smallest certificate wins. Isomorphic graphs get the same
/// ranks up to their isomorphism, and every rank is distinct.
pub fn canonical_ranks(graph: &MoleculeGraph) -> Vec<usize> {
    if graph.node_count() == 0 {
        return Vec::new();
    }

    let invariants: Vec<AtomInvariant> = graph
        .node_indices()
        .map(|node| AtomInvariant::of(graph, node))
        .collect();
    let classes = dense_ranks(&invariants);
    let refined = morgan_algorithm(graph, classes.clone());

    let mut search = TieBreaker {
        graph,
        classes,
        best: None,
        automorphisms: Vec::new(),
    };
    search.search(refined.clone(), &mut Vec::new());
    search.best.map(|(_, ranks)| ranks).unwrap_or(refined)
}

/// Rebuild the graph with nodes numbered by canonical rank.
///
/// Two isomorphic graphs canonize to graphs with identical node and edge lists.
pub fn canonize(graph: &MoleculeGraph) -> MoleculeGraph {
    let ranks = canonical_ranks(graph);
    let mut order: Vec<NodeIndex> = graph.node_indices().collect();
    order.sort_by_key(|node| ranks[node.index()]);

    let mut canonical = MoleculeGraph::with_capacity(graph.node_count(), graph.edge_count());
    for &node in &order {
        canonical.add_node(graph[node]);
    }

    let mut edges: Vec<(usize, usize, Bond)> = graph
        .edge_references()
        .map(|edge| {
            let (a, b) = (ranks[edge.source().index()], ranks[edge.target().index()]);
            (a.min(b), a.max(b), *edge.weight())
        })
        .collect();
    edges.sort();
    for (a, b, bond) in edges {
        canonical.add_edge(NodeIndex::new(a), NodeIndex::new(b), bond);
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks_of(smiles: &str) -> Vec<usize> {
        canonical_ranks(&parse_smiles(smiles).expect("Failed to parse SMILES"))
    }

    #[test]
    fn test_ranks_are_distinct() {
        for smiles in ["CCO", "c1ccccc1", "C1C2C(CCC1)CC3C(C2)CCCC3", "C1CC2CCC1CC2", "CC.CC"] {
            let ranks = ranks_of(smiles);
            assert_eq!(class_count(&ranks), ranks.len(), "tied ranks for {smiles}");
        }
    }

    #[test]
    fn test_ranks_follow_atoms() {
        // Ethanol read from either end: the oxygen keeps the same rank.
        let forward = ranks_of("CCO");
        let backward = ranks_of("OCC");
        assert_eq!(forward[2], backward[0]);
        assert_eq!(forward[1], backward[1]);
        assert_eq!(forward[0], backward[2]);
    }

    #[test]
    fn test_refinement_separates_environments() {
        // Propanol: the three carbons sit in different environments before any tie-breaking.
        let graph = parse_smiles("CCCO").expect("Failed to parse SMILES");
        let invariants: Vec<AtomInvariant> =
            graph.node_indices().map(|n| AtomInvariant::of(&graph, n)).collect();
        let ranks = morgan_algorithm(&graph, dense_ranks(&invariants));
        assert_eq!(class_count(&ranks), 4);

        // Cyclohexane stays a single class until a tie is broken.
        let graph = parse_smiles("C1CCCCC1").expect("Failed to parse SMILES");
        let invariants: Vec<AtomInvariant> =
            graph.node_indices().map(|n| AtomInvariant::of(&graph, n)).collect();
        let ranks = morgan_algorithm(&graph, dense_ranks(&invariants));
        assert_eq!(class_count(&ranks), 1);
    }

    #[test]
    fn test_canonize_ignores_input_order() {
        let listing = |graph: &MoleculeGraph| {
            let nodes: Vec<Atom> = graph.node_weights().copied().collect();
            let edges: Vec<(usize, usize, Bond)> = graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight()))
                .collect();
            (nodes, edges)
        };
        for (a, b) in [
            ("CCO", "OCC"),
            ("Oc1ccccc1", "c1ccc(O)cc1"),
            ("C1C2C(CCC1)CC3C(C2)CCCC3", "C1CCC2CC3CCCCC3CC2C1"),
        ] {
            let left = canonize(&parse_smiles(a).expect("Failed to parse SMILES"));
            let right = canonize(&parse_smiles(b).expect("Failed to parse SMILES"));
            assert_eq!(listing(&left), listing(&right), "{a} and {b} canonize differently");
        }
    }

    /// Carbon graph with atom `v` of `edges` placed at node `order[v]`.
    fn relabelled(edges: &[(usize, usize)], order: &[usize]) -> MoleculeGraph {
        let mut graph = MoleculeGraph::default();
        for _ in order {
            graph.add_node(Atom::new(Element::C));
        }
        for &(a, b) in edges {
            graph.add_edge(NodeIndex::new(order[a]), NodeIndex::new(order[b]), Bond::Single);
        }
        graph
    }

    fn edge_list(graph: &MoleculeGraph) -> Vec<(usize, usize)> {
        graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect()
    }

    #[test]
    fn test_regular_graph_ties() {
        // Two four-membered units missing one edge each, joined into a cubic
        // graph. Refinement never splits it, but not every atom is alike.
        let edges = [
            (0, 1),
            (0, 2),
            (0, 3),
            (1, 2),
            (1, 3),
            (4, 5),
            (4, 6),
            (4, 7),
            (5, 6),
            (5, 7),
            (2, 6),
            (3, 7),
        ];
        let identity: Vec<usize> = (0..8).collect();
        let graph = relabelled(&edges, &identity);
        let invariants: Vec<AtomInvariant> =
            graph.node_indices().map(|n| AtomInvariant::of(&graph, n)).collect();
        assert_eq!(class_count(&morgan_algorithm(&graph, dense_ranks(&invariants))), 1);

        let expected = write_smiles(&graph).expect("Failed to write SMILES");
        for order in [
            vec![1, 0, 2, 3, 4, 5, 6, 7],
            vec![7, 6, 5, 4, 3, 2, 1, 0],
            vec![3, 4, 5, 6, 7, 0, 1, 2],
            vec![2, 5, 0, 7, 1, 6, 3, 4],
            vec![6, 0, 4, 1, 7, 3, 5, 2],
        ] {
            let shuffled = relabelled(&edges, &order);
            assert_eq!(class_count(&canonical_ranks(&shuffled)), 8);
            let smiles = write_smiles(&shuffled).expect("Failed to write SMILES");
            assert_eq!(smiles, expected, "order {order:?}");
            assert_eq!(edge_list(&canonize(&shuffled)), edge_list(&canonize(&graph)));
        }
    }

    #[test]
    fn test_empty_graph() {
        assert!(canonical_ranks(&MoleculeGraph::default()).is_empty());
    }
}
