//! Search orchestration: first solutions, local search, metaheuristics.
//!
//! A solve composes a first-solution builder, the neighborhood operators
//! enabled by the configuration, a conjunctive filter chain and a
//! metaheuristic acceptance rule, all bounded by wall-time and solution
//! limits. Large-neighborhood moves relax part of the solution and are
//! repaired by a bounded cheapest-completion sub-search.

mod config;
mod delta;
mod filters;
mod first_solution;
mod limits;
mod operators;

pub use config::{FirstSolutionStrategy, Metaheuristic, SearchConfig};
pub use delta::{Delta, DeltaElement};
pub use filters::{
    BasePathState, FilterChain, LocalSearchFilter, NodeDisjunctionFilter, NodePrecedenceFilter,
    ObjectiveFilter, PathCumulFilter,
};
pub use first_solution::{
    build_first_solution, Link, RouteBuilder, RouteConstructor, SweepArranger,
};
pub use limits::SearchLimit;
pub use operators::{
    build_operators, inactive_indices, vehicle_paths, CrossOperator, ExchangeOperator,
    ExtendedSwapActiveOperator, LinKernighanOperator, MakeActiveOperator, MakeInactiveOperator,
    MakePairActiveOperator, NeighborhoodOperator, OrOptOperator, PairRelocateOperator,
    PathLnsOperator, RelocateOperator, SwapActiveOperator, TspLnsOperator, TspOptOperator,
    TwoOptOperator, UnactiveLnsOperator,
};

use std::collections::HashMap;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::routing::{RoutingAssignment, RoutingModel};

/// Result of running the search stack over a routing model.
pub struct SolveOutcome {
    /// Best collected assignment, if any.
    pub best: Option<RoutingAssignment>,
    /// Whether a limit fired during the search.
    pub limit_reached: bool,
}

/// Applies a fixed-move delta to a copy of the assignment.
fn apply_delta(assignment: &RoutingAssignment, delta: &Delta) -> RoutingAssignment {
    let mut applied = assignment.clone();
    for &(index, element) in &delta.elements {
        if let DeltaElement::Fixed(value) = element {
            applied.set_next(index, value);
        }
    }
    applied
}

// Repairs an LNS delta: relaxed variables are rebuilt by bounded cheapest
// completion, fixed elements are kept.
fn repair_lns(
    model: &RoutingModel,
    assignment: &RoutingAssignment,
    delta: &Delta,
) -> Option<RoutingAssignment> {
    let mut partial: Vec<Option<usize>> = assignment.nexts.clone();
    for &(index, element) in &delta.elements {
        match element {
            DeltaElement::Fixed(value) => partial[index] = Some(value),
            DeltaElement::Range(..) => partial[index] = None,
        }
    }
    let lns_limit = SearchLimit::time_only(model.config().lns_time_limit_ms.max(1));
    let repaired = first_solution::complete_cheapest(model, partial, &lns_limit)?;
    Some(repaired)
}

// Guided-local-search augmented objective: the true cost plus penalised
// arc costs scaled by lambda.
fn augmented_cost(
    model: &RoutingModel,
    assignment: &RoutingAssignment,
    penalties: &HashMap<(usize, usize), i64>,
    lambda: f64,
) -> i64 {
    let mut extra = 0i64;
    for index in 0..model.size() {
        if let Some(next) = assignment.next(index) {
            if next != index {
                if let Some(&penalty) = penalties.get(&(index, next)) {
                    extra += penalty * model.homogeneous_cost(index, next);
                }
            }
        }
    }
    assignment.cost + (lambda * extra as f64) as i64
}

// Penalises the arcs of the current solution with maximum utility
// cost / (1 + penalty).
fn penalize_arcs(
    model: &RoutingModel,
    assignment: &RoutingAssignment,
    penalties: &mut HashMap<(usize, usize), i64>,
) {
    let mut best_utility = f64::MIN;
    let mut best_arcs = Vec::new();
    for index in 0..model.size() {
        let Some(next) = assignment.next(index) else {
            continue;
        };
        if next == index {
            continue;
        }
        let penalty = penalties.get(&(index, next)).copied().unwrap_or(0);
        let utility = model.homogeneous_cost(index, next) as f64 / (1.0 + penalty as f64);
        if utility > best_utility {
            best_utility = utility;
            best_arcs.clear();
            best_arcs.push((index, next));
        } else if utility == best_utility {
            best_arcs.push((index, next));
        }
    }
    for arc in best_arcs {
        *penalties.entry(arc).or_insert(0) += 1;
    }
}

/// Runs the full search for a routing model: first solution, then local
/// search under the selected metaheuristic, collecting the best
/// assignment.
pub(crate) fn solve_model(
    model: &RoutingModel,
    initial: Option<&RoutingAssignment>,
) -> SolveOutcome {
    let config = model.config().clone();
    let mut limit = SearchLimit::new(config.time_limit_ms, config.solution_limit, u64::MAX);

    let first = match initial {
        Some(seed) => {
            let mut seed = seed.clone();
            if !model.check_assignment(&seed) {
                return SolveOutcome {
                    best: None,
                    limit_reached: false,
                };
            }
            model.finalize_assignment(&mut seed);
            Some(seed)
        }
        None => build_first_solution(model),
    };
    let Some(mut current) = first else {
        return SolveOutcome {
            best: None,
            limit_reached: limit.time_exhausted(),
        };
    };
    limit.record_solution();
    let mut best = current.clone();
    if config.dfs {
        return SolveOutcome {
            best: Some(best),
            limit_reached: limit.check(),
        };
    }

    let metaheuristic = config.selected_metaheuristic();
    debug!("using metaheuristic: {}", metaheuristic.name());
    let locked: std::collections::HashSet<usize> =
        model.locks().iter().map(|&(from, _)| from).collect();
    let mut operators = build_operators(model);
    let mut filters = FilterChain::for_model(model);
    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut penalties: HashMap<(usize, usize), i64> = HashMap::new();
    let mut tabu: Vec<((usize, usize), u64)> = Vec::new();
    let mut iteration: u64 = 0;
    let tabu_tenure: u64 = 10;
    let mut temperature = 100.0f64;

    'search: loop {
        if limit.check() {
            break;
        }
        iteration += 1;
        tabu.retain(|&(_, expires)| expires > iteration);
        filters.synchronize(model, &current);
        let bound = match metaheuristic {
            Metaheuristic::GreedyDescent => {
                current.cost.saturating_sub(config.optimization_step)
            }
            _ => i64::MAX,
        };
        filters.bound.set(bound);

        // Tabu search picks the best candidate of the sweep; the others
        // accept the first eligible move.
        let mut sweep_best: Option<RoutingAssignment> = None;
        let mut sweep_best_arcs: Vec<(usize, usize)> = Vec::new();
        let mut accepted = false;

        for operator in operators.iter_mut() {
            for delta in operator.make_neighbors(model, &current) {
                limit.record_branch();
                if limit.time_exhausted() {
                    break 'search;
                }
                // preassigned arcs stay untouched
                if delta.elements.iter().any(|(index, _)| locked.contains(index)) {
                    continue;
                }
                if !filters.accept(model, &current, &delta) {
                    continue;
                }
                let candidate = if delta.is_lns() {
                    match repair_lns(model, &current, &delta) {
                        Some(candidate) => candidate,
                        None => continue,
                    }
                } else {
                    let applied = apply_delta(&current, &delta);
                    if !model.check_assignment(&applied) {
                        continue;
                    }
                    let mut applied = applied;
                    model.finalize_assignment(&mut applied);
                    applied
                };

                match metaheuristic {
                    Metaheuristic::GreedyDescent => {
                        if candidate.cost <= current.cost - config.optimization_step {
                            current = candidate;
                            accepted = true;
                        }
                    }
                    Metaheuristic::GuidedLocalSearch => {
                        let lambda = config.guided_local_search_lambda;
                        if augmented_cost(model, &candidate, &penalties, lambda)
                            < augmented_cost(model, &current, &penalties, lambda)
                        {
                            current = candidate;
                            accepted = true;
                        }
                    }
                    Metaheuristic::SimulatedAnnealing => {
                        let worsening = candidate.cost.saturating_sub(current.cost);
                        let accept = worsening < 0
                            || rng.gen::<f64>() < (-(worsening as f64) / temperature).exp();
                        if accept {
                            current = candidate;
                            accepted = true;
                            temperature = (temperature * 0.98).max(1e-6);
                        }
                    }
                    Metaheuristic::TabuSearch => {
                        let removed_arcs: Vec<(usize, usize)> = delta
                            .elements
                            .iter()
                            .filter_map(|&(index, _)| {
                                current.next(index).map(|old| (index, old))
                            })
                            .filter(|&(index, old)| index != old)
                            .collect();
                        let reintroduces_tabu = delta.elements.iter().any(|&(index, element)| {
                            matches!(element, DeltaElement::Fixed(value)
                                if tabu.iter().any(|&(arc, _)| arc == (index, value)))
                        });
                        let aspiration = candidate.cost < best.cost;
                        if reintroduces_tabu && !aspiration {
                            continue;
                        }
                        let better = sweep_best
                            .as_ref()
                            .map_or(true, |b| candidate.cost < b.cost);
                        if better {
                            sweep_best = Some(candidate);
                            sweep_best_arcs = removed_arcs;
                        }
                    }
                }
                if accepted {
                    break;
                }
            }
            if accepted {
                break;
            }
        }

        if metaheuristic == Metaheuristic::TabuSearch {
            if let Some(candidate) = sweep_best.take() {
                for arc in sweep_best_arcs.drain(..) {
                    tabu.push((arc, iteration + tabu_tenure));
                }
                current = candidate;
                accepted = true;
            }
        }

        if accepted {
            if current.cost < best.cost {
                best = current.clone();
                limit.record_solution();
            }
            continue;
        }

        // The sweep found no acceptable move: a local optimum.
        match metaheuristic {
            Metaheuristic::GreedyDescent => break,
            Metaheuristic::GuidedLocalSearch => {
                penalize_arcs(model, &current, &mut penalties);
            }
            Metaheuristic::SimulatedAnnealing => {
                temperature *= 0.5;
                if temperature < 1e-3 {
                    break;
                }
            }
            Metaheuristic::TabuSearch => break,
        }
    }

    SolveOutcome {
        best: Some(best),
        limit_reached: limit.check(),
    }
}
