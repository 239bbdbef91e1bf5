//! Local-search filters.
//!
//! Filters accept or reject a candidate [`Delta`] against the synchronized
//! current solution, without applying it. Composition is a conjunctive
//! pipeline: a move survives only if every filter accepts it. Any delta
//! element with a relaxed range is a large-neighborhood move and passes
//! structural filters unconditionally, the deeper search deciding.

use std::cell::Cell;
use std::rc::Rc;

use crate::routing::{RoutingAssignment, RoutingModel, NO_PENALTY};

use super::delta::{Delta, DeltaElement};

/// A local-search filter with per-filter state.
pub trait LocalSearchFilter {
    /// Filter name, for logs.
    fn name(&self) -> &'static str;
    /// Re-reads the synchronized current solution.
    fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment);
    /// Accepts or rejects a candidate delta.
    fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool;
}

/// Conjunctive filter pipeline with the objective bound shared across
/// filters.
pub struct FilterChain {
    filters: Vec<Box<dyn LocalSearchFilter>>,
    /// Upper bound on the objective accepted by the chain.
    pub bound: Rc<Cell<i64>>,
}

impl FilterChain {
    /// Builds the filter set enabled by the model's configuration.
    pub fn for_model(model: &RoutingModel) -> Self {
        let bound = Rc::new(Cell::new(i64::MAX));
        let injected = Rc::new(Cell::new(0));
        let mut filters: Vec<Box<dyn LocalSearchFilter>> = Vec::new();
        let config = model.config();
        if config.use_objective_filter {
            filters.push(Box::new(ObjectiveFilter::new(
                Rc::clone(&injected),
                Rc::clone(&bound),
            )));
        }
        if config.use_disjunction_filter && !model.disjunctions().is_empty() {
            filters.push(Box::new(NodeDisjunctionFilter::new(
                model,
                Rc::clone(&injected),
                Rc::clone(&bound),
            )));
        }
        if config.use_pickup_and_delivery_filter && !model.pickup_delivery_pairs().is_empty() {
            filters.push(Box::new(NodePrecedenceFilter::new(model)));
        }
        if config.use_path_cumul_filter {
            for dimension_index in 0..model.dimensions().len() {
                filters.push(Box::new(PathCumulFilter::new(model, dimension_index)));
            }
        }
        Self { filters, bound }
    }

    /// Synchronizes every filter on the current solution.
    pub fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        for filter in &mut self.filters {
            filter.synchronize(model, assignment);
        }
    }

    /// Conjunction of all filter verdicts.
    pub fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool {
        self.filters
            .iter_mut()
            .all(|filter| filter.accept(model, assignment, delta))
    }
}

// ----- objective filter -----

/// Recomputes the arc-cost part of the objective from the delta and bounds
/// it; the computed value is injected for the disjunction filter to extend
/// with penalty deltas.
pub struct ObjectiveFilter {
    current_cost: i64,
    vehicle_of: Vec<i64>,
    injected: Rc<Cell<i64>>,
    bound: Rc<Cell<i64>>,
}

impl ObjectiveFilter {
    /// Creates the filter with its shared injection and bound cells.
    pub fn new(injected: Rc<Cell<i64>>, bound: Rc<Cell<i64>>) -> Self {
        Self {
            current_cost: 0,
            vehicle_of: Vec::new(),
            injected,
            bound,
        }
    }

    fn arc_vehicle(&self, model: &RoutingModel, from: usize, to: usize) -> i64 {
        if model.is_homogeneous() {
            return 0;
        }
        let from_vehicle = self.vehicle_of.get(from).copied().unwrap_or(-1);
        if from_vehicle >= 0 {
            return from_vehicle;
        }
        self.vehicle_of.get(to).copied().unwrap_or(-1).max(0)
    }

    fn arc_cost(&self, model: &RoutingModel, from: usize, to: usize) -> i64 {
        model.cost(from, to, self.arc_vehicle(model, from, to))
    }
}

impl LocalSearchFilter for ObjectiveFilter {
    fn name(&self) -> &'static str {
        "ObjectiveFilter"
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        self.vehicle_of = assignment.vehicles.clone();
        let mut cost = 0i64;
        for index in 0..model.size() {
            if let Some(next) = assignment.next(index) {
                cost = cost.saturating_add(self.arc_cost(model, index, next));
            }
        }
        self.current_cost = cost;
        self.injected.set(cost);
    }

    fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool {
        if delta.is_lns() {
            self.injected.set(self.current_cost);
            return true;
        }
        let mut cost = self.current_cost;
        for &(index, element) in &delta.elements {
            let DeltaElement::Fixed(new_next) = element else {
                continue;
            };
            if let Some(old_next) = assignment.next(index) {
                cost -= self.arc_cost(model, index, old_next);
            }
            cost = cost.saturating_add(self.arc_cost(model, index, new_next));
        }
        self.injected.set(cost);
        cost <= self.bound.get()
    }
}

// ----- node disjunction filter -----

/// Tracks how many members of each disjunction are active and the summed
/// penalty of fully inactive disjunctions.
pub struct NodeDisjunctionFilter {
    active_per_disjunction: Vec<usize>,
    penalty_value: i64,
    injected: Rc<Cell<i64>>,
    bound: Rc<Cell<i64>>,
}

impl NodeDisjunctionFilter {
    /// Creates the filter.
    pub fn new(model: &RoutingModel, injected: Rc<Cell<i64>>, bound: Rc<Cell<i64>>) -> Self {
        Self {
            active_per_disjunction: vec![0; model.disjunctions().len()],
            penalty_value: 0,
            injected,
            bound,
        }
    }
}

impl LocalSearchFilter for NodeDisjunctionFilter {
    fn name(&self) -> &'static str {
        "NodeDisjunctionFilter"
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        self.penalty_value = 0;
        for (d, disjunction) in model.disjunctions().iter().enumerate() {
            let active = disjunction
                .indices
                .iter()
                .filter(|&&index| assignment.next(index) != Some(index))
                .count();
            self.active_per_disjunction[d] = active;
            if active == 0 && disjunction.penalty > 0 {
                self.penalty_value += disjunction.penalty;
            }
        }
    }

    fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool {
        let mut active_deltas: Vec<(usize, i64)> = Vec::new();
        let mut lns_detected = false;
        for &(index, element) in &delta.elements {
            let Some(d) = model.disjunction_of(index) else {
                continue;
            };
            let was_inactive = assignment.next(index) == Some(index);
            let is_inactive = match element {
                DeltaElement::Fixed(value) => value == index,
                DeltaElement::Range(lo, hi) => {
                    lns_detected = true;
                    lo <= index && index <= hi
                }
            };
            let position = match active_deltas.iter().position(|(key, _)| *key == d) {
                Some(position) => position,
                None => {
                    active_deltas.push((d, 0));
                    active_deltas.len() - 1
                }
            };
            let slot = &mut active_deltas[position].1;
            if was_inactive && !is_inactive {
                *slot += 1;
            } else if !was_inactive && is_inactive {
                *slot -= 1;
            }
        }
        let mut new_objective = self.injected.get().saturating_add(self.penalty_value);
        for &(d, delta_active) in &active_deltas {
            let active = self.active_per_disjunction[d] as i64 + delta_active;
            if active > 1 {
                return false;
            }
            if !lns_detected {
                let penalty = model.disjunctions()[d].penalty;
                if delta_active < 0 {
                    if penalty == NO_PENALTY {
                        // deactivating the last node of a mandatory
                        // disjunction
                        return false;
                    }
                    new_objective = new_objective.saturating_add(penalty);
                } else if delta_active > 0 {
                    new_objective -= penalty.max(0);
                }
            }
        }
        if lns_detected {
            return true;
        }
        new_objective <= self.bound.get()
    }
}

// ----- path-local filter skeleton -----

/// Shared state of path-local filters: which path start every index belongs
/// to, recorded at synchronization.
pub struct BasePathState {
    node_path_starts: Vec<Option<usize>>,
}

impl BasePathState {
    /// Creates an empty state for the model's index space.
    pub fn new(model: &RoutingModel) -> Self {
        Self {
            node_path_starts: vec![None; model.num_indices()],
        }
    }

    /// Re-derives path membership by traversing next pointers from the
    /// detected path starts.
    pub fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        self.node_path_starts.fill(None);
        let size = model.size();
        let mut has_prev = vec![false; size];
        for index in 0..size {
            if let Some(next) = assignment.next(index) {
                if next < size {
                    has_prev[next] = true;
                }
            }
        }
        for start in 0..size {
            if has_prev[start] {
                continue;
            }
            let mut node = start;
            self.node_path_starts[node] = Some(start);
            let mut guard = 0;
            while let Some(next) = assignment.next(node) {
                self.node_path_starts[next] = Some(start);
                if next >= size || next == node {
                    break;
                }
                node = next;
                guard += 1;
                if guard > size {
                    break;
                }
            }
        }
    }

    /// The distinct path starts touched by a delta.
    pub fn touched_paths(&self, delta: &Delta) -> Vec<usize> {
        let mut touched = Vec::new();
        for &(index, _) in &delta.elements {
            if let Some(Some(start)) = self.node_path_starts.get(index) {
                if !touched.contains(start) {
                    touched.push(*start);
                }
            }
        }
        touched
    }

    /// The post-delta successor of `node`, `None` when the delta leaves it
    /// unbound (LNS).
    pub fn get_next(
        &self,
        assignment: &RoutingAssignment,
        delta: &Delta,
        node: usize,
    ) -> Option<usize> {
        match delta.lookup(node) {
            Some(bound) => bound,
            None => assignment.next(node),
        }
    }
}

// ----- path cumul filter -----

/// Forward-propagates one dimension's cumuls along each touched path and
/// rejects when a cumul exceeds its bound.
pub struct PathCumulFilter {
    base: BasePathState,
    dimension_index: usize,
}

impl PathCumulFilter {
    /// Creates the filter for one dimension of the model.
    pub fn new(model: &RoutingModel, dimension_index: usize) -> Self {
        Self {
            base: BasePathState::new(model),
            dimension_index,
        }
    }

    fn accept_path(
        &self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
        path_start: usize,
    ) -> bool {
        let dimension = &model.dimensions()[self.dimension_index];
        let vehicle = model.index_to_vehicle(path_start).unwrap_or(0);
        let mut node = path_start;
        let mut cumul = dimension.cumul_min[node];
        let mut guard = 0;
        while node < model.size() {
            let Some(next) = self.base.get_next(assignment, delta, node) else {
                // LNS detected, the path was fine up to here
                return true;
            };
            if next == node {
                return true;
            }
            cumul += dimension.transit_value(node, next);
            if cumul > dimension.cumul_max_for(next, vehicle) {
                return false;
            }
            cumul = cumul.max(dimension.cumul_min[next]);
            node = next;
            guard += 1;
            if guard > model.size() {
                return false;
            }
        }
        true
    }
}

impl LocalSearchFilter for PathCumulFilter {
    fn name(&self) -> &'static str {
        "PathCumulFilter"
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        self.base.synchronize(model, assignment);
    }

    fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool {
        self.base
            .touched_paths(delta)
            .into_iter()
            .all(|start| self.accept_path(model, assignment, delta, start))
    }
}

// ----- node precedence filter -----

/// Rejects paths where a delivery precedes its pickup, or a pickup follows
/// its delivery.
pub struct NodePrecedenceFilter {
    base: BasePathState,
    pair_firsts: Vec<Option<usize>>,
    pair_seconds: Vec<Option<usize>>,
}

impl NodePrecedenceFilter {
    /// Creates the filter from the model's pickup/delivery pairs.
    pub fn new(model: &RoutingModel) -> Self {
        let mut pair_firsts = vec![None; model.num_indices()];
        let mut pair_seconds = vec![None; model.num_indices()];
        for &(first, second) in model.pickup_delivery_pairs() {
            pair_firsts[first] = Some(second);
            pair_seconds[second] = Some(first);
        }
        Self {
            base: BasePathState::new(model),
            pair_firsts,
            pair_seconds,
        }
    }

    fn accept_path(
        &self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
        path_start: usize,
    ) -> bool {
        let size = model.size();
        let mut visited = vec![false; size];
        let mut node = path_start;
        let mut path_length = 1usize;
        while node < size {
            if path_length > size {
                return false;
            }
            if let Some(second) = self.pair_firsts[node] {
                if second < size && visited[second] {
                    return false;
                }
            }
            if let Some(first) = self.pair_seconds[node] {
                if first < size && !visited[first] {
                    return false;
                }
            }
            visited[node] = true;
            let Some(next) = self.base.get_next(assignment, delta, node) else {
                // LNS detected, the path was fine up to here
                return true;
            };
            if next == node {
                return true;
            }
            node = next;
            path_length += 1;
        }
        true
    }
}

impl LocalSearchFilter for NodePrecedenceFilter {
    fn name(&self) -> &'static str {
        "NodePrecedenceFilter"
    }

    fn synchronize(&mut self, model: &RoutingModel, assignment: &RoutingAssignment) {
        self.base.synchronize(model, assignment);
    }

    fn accept(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
        delta: &Delta,
    ) -> bool {
        self.base
            .touched_paths(delta)
            .into_iter()
            .all(|start| self.accept_path(model, assignment, delta, start))
    }
}
