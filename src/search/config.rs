//! Search configuration.

/// First-solution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstSolutionStrategy {
    /// Sequential route extension assigning the smallest feasible
    /// successor.
    #[default]
    Default,
    /// Static global best arc across all route tails.
    GlobalCheapestArc,
    /// Per-path local cheapest extension, first unbound path first.
    LocalCheapestArc,
    /// Path-by-path cheapest extension; single-vehicle models first try
    /// the fast one-path builder.
    PathCheapestArc,
    /// A user-supplied index evaluator orders extensions.
    EvaluatorStrategy,
    /// Deactivate every non-start index.
    AllUnperformed,
    /// Nested optimisation over insertion moves.
    BestInsertion,
    /// Clarke-Wright savings.
    Savings,
    /// Polar-angle sweep.
    Sweep,
}

impl FirstSolutionStrategy {
    /// The strategy's display name.
    pub fn name(&self) -> &'static str {
        match self {
            FirstSolutionStrategy::Default => "DefaultStrategy",
            FirstSolutionStrategy::GlobalCheapestArc => "GlobalCheapestArc",
            FirstSolutionStrategy::LocalCheapestArc => "LocalCheapestArc",
            FirstSolutionStrategy::PathCheapestArc => "PathCheapestArc",
            FirstSolutionStrategy::EvaluatorStrategy => "EvaluatorStrategy",
            FirstSolutionStrategy::AllUnperformed => "AllUnperformed",
            FirstSolutionStrategy::BestInsertion => "BestInsertion",
            FirstSolutionStrategy::Savings => "Savings",
            FirstSolutionStrategy::Sweep => "Sweep",
        }
    }

    /// Parses a strategy name.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            FirstSolutionStrategy::Default,
            FirstSolutionStrategy::GlobalCheapestArc,
            FirstSolutionStrategy::LocalCheapestArc,
            FirstSolutionStrategy::PathCheapestArc,
            FirstSolutionStrategy::EvaluatorStrategy,
            FirstSolutionStrategy::AllUnperformed,
            FirstSolutionStrategy::BestInsertion,
            FirstSolutionStrategy::Savings,
            FirstSolutionStrategy::Sweep,
        ]
        .into_iter()
        .find(|strategy| strategy.name() == name)
    }
}

/// Metaheuristic guiding the local search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metaheuristic {
    /// Plain minimisation: only improving moves are accepted.
    #[default]
    GreedyDescent,
    /// Guided local search with per-arc penalties.
    GuidedLocalSearch,
    /// Simulated annealing.
    SimulatedAnnealing,
    /// Tabu search.
    TabuSearch,
}

impl Metaheuristic {
    /// The metaheuristic's display name.
    pub fn name(&self) -> &'static str {
        match self {
            Metaheuristic::GreedyDescent => "GreedyDescent",
            Metaheuristic::GuidedLocalSearch => "GuidedLocalSearch",
            Metaheuristic::SimulatedAnnealing => "SimulatedAnnealing",
            Metaheuristic::TabuSearch => "TabuSearch",
        }
    }

    /// Parses a metaheuristic name.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Metaheuristic::GreedyDescent,
            Metaheuristic::GuidedLocalSearch,
            Metaheuristic::SimulatedAnnealing,
            Metaheuristic::TabuSearch,
        ]
        .into_iter()
        .find(|metaheuristic| metaheuristic.name() == name)
    }
}

/// All search tunables, threaded through constructors instead of living in
/// process-wide state.
///
/// # Examples
///
/// ```
/// use cproute::search::{FirstSolutionStrategy, SearchConfig};
///
/// let mut config = SearchConfig::default();
/// config.first_solution = FirstSolutionStrategy::Savings;
/// config.time_limit_ms = 1_000;
/// assert!(!config.no_2opt);
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    // Neighborhood deactivation.
    /// Forbids large neighborhood search operators.
    pub no_lns: bool,
    /// Forbids the Relocate neighborhood.
    pub no_relocate: bool,
    /// Forbids the Exchange neighborhood.
    pub no_exchange: bool,
    /// Forbids the Cross neighborhood.
    pub no_cross: bool,
    /// Forbids the 2-opt neighborhood.
    pub no_2opt: bool,
    /// Forbids the Or-opt neighborhood.
    pub no_oropt: bool,
    /// Forbids MakeActive/SwapActive/MakeInactive neighborhoods.
    pub no_make_active: bool,
    /// Forbids the LKH-style neighborhood.
    pub no_lkh: bool,
    /// Forbids the TSP-opt neighborhood.
    pub no_tsp: bool,
    /// Forbids the TSP-LNS neighborhood.
    pub no_tsplns: bool,
    /// Selects the extended SwapActive variant.
    pub use_extended_swap_active: bool,

    // Search limits.
    /// Number of solutions collected before stopping.
    pub solution_limit: u64,
    /// Global wall-time limit in milliseconds.
    pub time_limit_ms: u64,
    /// Wall-time limit of LNS sub-searches in milliseconds.
    pub lns_time_limit_ms: u64,

    // Metaheuristics (selection precedence: tabu > annealing > GLS).
    /// Enables guided local search.
    pub guided_local_search: bool,
    /// GLS lambda coefficient.
    pub guided_local_search_lambda: f64,
    /// Enables simulated annealing.
    pub simulated_annealing: bool,
    /// Enables tabu search.
    pub tabu_search: bool,

    // Search control.
    /// Replaces local search by a pure first-solution run.
    pub dfs: bool,
    /// First-solution strategy.
    pub first_solution: FirstSolutionStrategy,
    /// Dive (left branch) for the first solution: no fallback builders.
    pub use_first_solution_dive: bool,
    /// Cost improvement granularity.
    pub optimization_step: i64,

    // Filtering control.
    /// Enables the objective filter.
    pub use_objective_filter: bool,
    /// Enables the path-cumul filter.
    pub use_path_cumul_filter: bool,
    /// Enables the pickup-and-delivery precedence filter.
    pub use_pickup_and_delivery_filter: bool,
    /// Enables the node-disjunction filter.
    pub use_disjunction_filter: bool,

    // Heuristic tuning.
    /// Route-shape coefficient of the added arc in the savings value.
    pub savings_route_shape_parameter: f64,
    /// Limits savings candidates to this many neighbors per node
    /// (0 = all).
    pub savings_filter_neighbors: usize,
    /// Limits savings candidates to neighbors within this cost radius
    /// (0 = unlimited).
    pub savings_filter_radius: i64,
    /// Number of sectors the sweep divides the space into.
    pub sweep_sectors: usize,

    // Propagation control.
    /// Opts into light element-constraint variants triggered on bound
    /// events only.
    pub use_light_propagation: bool,

    // Misc.
    /// Caches evaluator calls.
    pub cache_callbacks: bool,
    /// Maximum model size for evaluator caching.
    pub max_cache_size: usize,
    /// Uses a single cost class when all vehicles share an evaluator.
    pub use_homogeneous_costs: bool,
    /// Verifies compacted assignments against the model.
    pub check_compact_assignment: bool,
    /// Seed of the annealing random stream.
    pub random_seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            no_lns: false,
            no_relocate: false,
            no_exchange: false,
            no_cross: false,
            no_2opt: false,
            no_oropt: false,
            no_make_active: false,
            no_lkh: false,
            no_tsp: true,
            no_tsplns: true,
            use_extended_swap_active: false,
            solution_limit: u64::MAX,
            time_limit_ms: u64::MAX,
            lns_time_limit_ms: 100,
            guided_local_search: false,
            guided_local_search_lambda: 0.1,
            simulated_annealing: false,
            tabu_search: false,
            dfs: false,
            first_solution: FirstSolutionStrategy::Default,
            use_first_solution_dive: false,
            optimization_step: 1,
            use_objective_filter: true,
            use_path_cumul_filter: true,
            use_pickup_and_delivery_filter: true,
            use_disjunction_filter: true,
            savings_route_shape_parameter: 1.0,
            savings_filter_neighbors: 0,
            savings_filter_radius: 0,
            sweep_sectors: 1,
            use_light_propagation: false,
            cache_callbacks: false,
            max_cache_size: 1000,
            use_homogeneous_costs: true,
            check_compact_assignment: true,
            random_seed: 42,
        }
    }
}

impl SearchConfig {
    /// Sets the first-solution strategy by name. Returns `false` for an
    /// unknown name, leaving the strategy unchanged.
    pub fn set_first_solution_name(&mut self, name: &str) -> bool {
        match FirstSolutionStrategy::from_name(name) {
            Some(strategy) => {
                self.first_solution = strategy;
                true
            }
            None => false,
        }
    }

    /// The metaheuristic selected by the flags, with precedence
    /// tabu > simulated annealing > guided local search > greedy descent.
    pub fn selected_metaheuristic(&self) -> Metaheuristic {
        if self.tabu_search {
            Metaheuristic::TabuSearch
        } else if self.simulated_annealing {
            Metaheuristic::SimulatedAnnealing
        } else if self.guided_local_search {
            Metaheuristic::GuidedLocalSearch
        } else {
            Metaheuristic::GreedyDescent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in [
            FirstSolutionStrategy::Default,
            FirstSolutionStrategy::Savings,
            FirstSolutionStrategy::Sweep,
            FirstSolutionStrategy::BestInsertion,
        ] {
            assert_eq!(
                FirstSolutionStrategy::from_name(strategy.name()),
                Some(strategy)
            );
        }
        assert_eq!(FirstSolutionStrategy::from_name("Nope"), None);
    }

    #[test]
    fn test_metaheuristic_precedence() {
        let mut config = SearchConfig::default();
        assert_eq!(
            config.selected_metaheuristic(),
            Metaheuristic::GreedyDescent
        );
        config.guided_local_search = true;
        assert_eq!(
            config.selected_metaheuristic(),
            Metaheuristic::GuidedLocalSearch
        );
        config.simulated_annealing = true;
        assert_eq!(
            config.selected_metaheuristic(),
            Metaheuristic::SimulatedAnnealing
        );
        config.tabu_search = true;
        assert_eq!(config.selected_metaheuristic(), Metaheuristic::TabuSearch);
    }

    #[test]
    fn test_set_first_solution_name() {
        let mut config = SearchConfig::default();
        assert!(config.set_first_solution_name("Savings"));
        assert_eq!(config.first_solution, FirstSolutionStrategy::Savings);
        assert!(!config.set_first_solution_name("Unknown"));
        assert_eq!(config.first_solution, FirstSolutionStrategy::Savings);
    }
}
