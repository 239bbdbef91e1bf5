//! Symmetry graph construction for pseudo-Boolean problems.

use std::collections::HashMap;

use log::info;

use super::problem::{
    compute_canonical_form, CanonicalBooleanLinearProblem, LinearBooleanProblem, LinearTerm,
    ProblemType,
};

/// An undirected graph with dense node equivalence classes.
///
/// Automorphisms of the labelled graph map back to symmetries of the
/// problem it was generated from: any permutation respecting the classes,
/// restricted to the first `2 · num_variables` nodes, permutes literals
/// without changing the constraint set.
#[derive(Debug, Clone, Default)]
pub struct SymmetryGraph {
    adjacency: Vec<Vec<usize>>,
}

impl SymmetryGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Ensures node `node` exists.
    fn ensure_node(&mut self, node: usize) {
        while self.adjacency.len() <= node {
            self.adjacency.push(Vec::new());
        }
    }

    /// Adds an undirected edge.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.ensure_node(a.max(b));
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
    }

    /// Neighbors of a node.
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }
}

// Generates dense equivalence-class ids for (node type, coefficient)
// pairs.
#[derive(Default)]
struct IdGenerator {
    id_map: HashMap<(u8, i64), usize>,
}

impl IdGenerator {
    fn get_id(&mut self, node_type: u8, coefficient: i64) -> usize {
        let next = self.id_map.len();
        *self.id_map.entry((node_type, coefficient)).or_insert(next)
    }
}

const LITERAL_NODE: u8 = 0;
const CONSTRAINT_NODE: u8 = 1;
const CONSTRAINT_COEFFICIENT_NODE: u8 = 2;

/// Builds the symmetry graph of a problem and the initial equivalence
/// class of every node. Classes are dense in `[0, num_classes)`; any
/// automorphism only maps nodes within a class.
///
/// Layout: nodes `[0, 2n)` are the literals in index representation, each
/// literal joined to its negation; one node per canonical constraint
/// classed by its right-hand side; extra nodes group the literals sharing
/// a coefficient inside a constraint.
pub fn generate_symmetry_graph(
    problem: &LinearBooleanProblem,
) -> (SymmetryGraph, Vec<usize>) {
    let num_variables = problem.num_variables;
    let mut canonical_problem = CanonicalBooleanLinearProblem::new();
    for constraint in &problem.constraints {
        canonical_problem.add_linear_constraint(
            constraint.lower_bound,
            constraint.upper_bound,
            &constraint.terms,
        );
    }

    let mut graph = SymmetryGraph::new();
    let mut classes = Vec::new();
    let mut id_generator = IdGenerator::default();

    // One node per literal, joined to its negation.
    for variable in 0..num_variables {
        let literal = super::Literal::positive(variable);
        graph.add_edge(literal.index(), literal.negated().index());
    }
    classes.resize(
        2 * num_variables,
        id_generator.get_id(LITERAL_NODE, 0),
    );

    // Literals with different canonical objective coefficients must not
    // share a class.
    if matches!(
        problem.problem_type,
        ProblemType::Minimization | ProblemType::Maximization
    ) {
        let mut expression: Vec<LinearTerm> = problem.objective.terms.clone();
        compute_canonical_form(&mut expression);
        for term in expression {
            classes[term.literal.index()] =
                id_generator.get_id(LITERAL_NODE, term.coefficient);
        }
    }

    // One node per constraint classed by rhs, plus one grouping node per
    // distinct coefficient; canonical constraints are sorted by ascending
    // coefficient, so groups are contiguous.
    for i in 0..canonical_problem.num_constraints() {
        let constraint_node = classes.len();
        graph.ensure_node(constraint_node);
        classes.push(id_generator.get_id(CONSTRAINT_NODE, canonical_problem.rhs(i)));
        let mut current_node = constraint_node;
        let mut previous_coefficient = 1;
        for term in &canonical_problem.constraint(i).terms {
            if term.coefficient != previous_coefficient {
                current_node = classes.len();
                classes.push(
                    id_generator.get_id(CONSTRAINT_COEFFICIENT_NODE, term.coefficient),
                );
                previous_coefficient = term.coefficient;
                graph.add_edge(constraint_node, current_node);
            }
            graph.add_edge(current_node, term.literal.index());
        }
    }
    graph.ensure_node(classes.len().saturating_sub(1));
    debug_assert_eq!(graph.num_nodes(), classes.len());
    (graph, classes)
}

/// A permutation stored as its disjoint non-trivial cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparsePermutation {
    /// Disjoint cycles.
    pub cycles: Vec<Vec<usize>>,
}

impl SparsePermutation {
    /// Creates a permutation from cycles.
    pub fn new(cycles: Vec<Vec<usize>>) -> Self {
        Self { cycles }
    }

    /// All elements moved by the permutation.
    pub fn support(&self) -> Vec<usize> {
        self.cycles.iter().flatten().copied().collect()
    }

    /// Returns `true` if no element moves.
    pub fn is_identity(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Drops every cycle whose support leaves the first `num_literals`
    /// nodes.
    pub fn restrict_to_literals(&mut self, num_literals: usize) {
        self.cycles.retain(|cycle| {
            let touches_literals = cycle.first().is_some_and(|&node| node < num_literals);
            debug_assert!(
                !touches_literals || cycle.iter().all(|&node| node < num_literals),
                "cycle mixes literal and constraint nodes"
            );
            touches_literals
        });
    }
}

/// A graph-automorphism finder over labelled graphs. The returned
/// permutations must respect the equivalence classes.
pub trait SymmetryFinder {
    /// Generators of the automorphism group of the labelled graph.
    fn find_symmetries(
        &self,
        graph: &SymmetryGraph,
        classes: &[usize],
    ) -> Vec<SparsePermutation>;
}

/// Builds the symmetry graph, runs the finder and restricts the returned
/// generators to their literal-node support, dropping the empty ones.
pub fn find_symmetries(
    problem: &LinearBooleanProblem,
    finder: &dyn SymmetryFinder,
) -> Vec<SparsePermutation> {
    let (graph, classes) = generate_symmetry_graph(problem);
    info!(
        "graph has {} nodes and {} edges",
        graph.num_nodes(),
        graph.num_edges()
    );
    let mut generators = finder.find_symmetries(&graph, &classes);
    let num_literals = 2 * problem.num_variables;
    let mut average_support_size = 0.0;
    generators.retain_mut(|permutation| {
        permutation.restrict_to_literals(num_literals);
        if permutation.is_identity() {
            return false;
        }
        average_support_size += permutation.support().len() as f64;
        true
    });
    if !generators.is_empty() {
        average_support_size /= generators.len() as f64;
    }
    info!("# of generators: {}", generators.len());
    info!("average support size: {average_support_size}");
    generators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::{LinearConstraint, Literal};

    fn cardinality_problem() -> LinearBooleanProblem {
        // x0 + x1 ≤ 1 over two variables: fully symmetric in x0, x1
        let mut problem = LinearBooleanProblem::new("card", 2);
        problem.constraints.push(LinearConstraint {
            terms: vec![
                LinearTerm::new(Literal::positive(0), 1),
                LinearTerm::new(Literal::positive(1), 1),
            ],
            lower_bound: None,
            upper_bound: Some(1),
        });
        problem
    }

    #[test]
    fn test_graph_layout() {
        let problem = cardinality_problem();
        let (graph, classes) = generate_symmetry_graph(&problem);
        // 4 literal nodes + 1 constraint node, no coefficient nodes (all
        // coefficients are 1)
        assert_eq!(graph.num_nodes(), 5);
        assert_eq!(classes.len(), 5);
        // negation edges plus constraint-literal edges
        assert_eq!(graph.num_edges(), 4);
        // literals share a class, the constraint node has its own
        assert_eq!(classes[0], classes[2]);
        assert_ne!(classes[0], classes[4]);
        // the constraint node sees both positive literals
        let mut neighbors = graph.neighbors(4).to_vec();
        neighbors.sort_unstable();
        assert_eq!(neighbors, vec![0, 2]);
    }

    #[test]
    fn test_objective_splits_literal_classes() {
        let mut problem = cardinality_problem();
        problem.problem_type = ProblemType::Minimization;
        problem.objective.terms = vec![
            LinearTerm::new(Literal::positive(0), 1),
            LinearTerm::new(Literal::positive(1), 2),
        ];
        let (_, classes) = generate_symmetry_graph(&problem);
        // different objective coefficients break the x0/x1 symmetry
        assert_ne!(classes[0], classes[2]);
    }

    #[test]
    fn test_coefficient_nodes_group_terms() {
        let mut problem = LinearBooleanProblem::new("mixed", 3);
        problem.constraints.push(LinearConstraint {
            terms: vec![
                LinearTerm::new(Literal::positive(0), 1),
                LinearTerm::new(Literal::positive(1), 2),
                LinearTerm::new(Literal::positive(2), 2),
            ],
            lower_bound: None,
            upper_bound: Some(3),
        });
        let (graph, classes) = generate_symmetry_graph(&problem);
        // 6 literals + constraint + one coefficient node for the 2s
        assert_eq!(graph.num_nodes(), 8);
        let constraint_node = 6;
        let coefficient_node = 7;
        assert_ne!(classes[constraint_node], classes[coefficient_node]);
        let mut grouped = graph.neighbors(coefficient_node).to_vec();
        grouped.sort_unstable();
        // connected to the constraint node and both coefficient-2 literals
        assert_eq!(grouped, vec![Literal::positive(1).index(), Literal::positive(2).index(), constraint_node]);
    }

    struct FixedFinder(Vec<SparsePermutation>);

    impl SymmetryFinder for FixedFinder {
        fn find_symmetries(
            &self,
            _graph: &SymmetryGraph,
            _classes: &[usize],
        ) -> Vec<SparsePermutation> {
            self.0.clone()
        }
    }

    #[test]
    fn test_find_symmetries_restricts_support() {
        let problem = cardinality_problem();
        // swap x0 and x1 (and their negations), plus a constraint-node
        // cycle that must be stripped
        let finder = FixedFinder(vec![
            SparsePermutation::new(vec![vec![0, 2], vec![1, 3], vec![4, 4]]),
            SparsePermutation::new(vec![vec![4, 4]]),
        ]);
        let generators = find_symmetries(&problem, &finder);
        // the all-constraint permutation became empty and was dropped
        assert_eq!(generators.len(), 1);
        assert_eq!(generators[0].cycles, vec![vec![0, 2], vec![1, 3]]);
    }

    #[test]
    fn test_permutation_support() {
        let permutation = SparsePermutation::new(vec![vec![0, 2], vec![1, 3]]);
        let mut support = permutation.support();
        support.sort_unstable();
        assert_eq!(support, vec![0, 1, 2, 3]);
        assert!(!permutation.is_identity());
    }
}
