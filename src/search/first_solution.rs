//! First-solution heuristics.
//!
//! Every builder produces a complete [`RoutingAssignment`] or fails
//! recoverably. Route-extension builders share the [`RouteBuilder`]
//! feasibility machinery; Savings and Sweep share the
//! [`RouteConstructor`] merge kernel.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::routing::{RoutingAssignment, RoutingModel, VehicleClass};

use super::config::FirstSolutionStrategy;
use super::limits::SearchLimit;

/// Builds the first solution selected by the model configuration.
pub fn build_first_solution(model: &RoutingModel) -> Option<RoutingAssignment> {
    let strategy = model.config().first_solution;
    debug!("using first solution strategy: {}", strategy.name());
    match strategy {
        FirstSolutionStrategy::Default => extend_routes(model, Selection::MinIndex),
        FirstSolutionStrategy::GlobalCheapestArc => global_cheapest_arc(model),
        FirstSolutionStrategy::LocalCheapestArc => extend_routes(model, Selection::Cheapest),
        FirstSolutionStrategy::PathCheapestArc => {
            if model.num_vehicles() == 1 {
                // fast one-path first, recoverable fallback on failure
                if let Some(assignment) = fast_one_path(model) {
                    return Some(assignment);
                }
                if model.config().use_first_solution_dive {
                    return None;
                }
            }
            extend_routes(model, Selection::Cheapest)
        }
        FirstSolutionStrategy::EvaluatorStrategy => extend_routes(model, Selection::Evaluator),
        FirstSolutionStrategy::AllUnperformed => all_unperformed(model),
        FirstSolutionStrategy::BestInsertion => best_insertion(model),
        FirstSolutionStrategy::Savings => {
            // unchecked construction first, merge-checked fallback
            savings(model, false).or_else(|| savings(model, true))
        }
        FirstSolutionStrategy::Sweep => sweep(model, false).or_else(|| sweep(model, true)),
    }
}

// ----- shared route-building machinery -----

/// Incremental route construction over the model's feasibility rules:
/// successor domains, activity, disjunction cardinality, pickup/delivery
/// precedence and dimension propagation.
pub struct RouteBuilder<'a> {
    model: &'a RoutingModel,
    nexts: Vec<Option<usize>>,
    has_prev: Vec<bool>,
    route_of: Vec<Option<usize>>,
    disjunction_active: Vec<usize>,
    cumuls: Vec<Vec<i64>>,
}

impl<'a> RouteBuilder<'a> {
    /// Creates a builder with the model's preassigned locks applied.
    pub fn new(model: &'a RoutingModel) -> Self {
        let mut builder = Self::from_partial(model, vec![None; model.size()]);
        for &(from, to) in model.locks() {
            builder.assign_arc(from, to);
        }
        builder
    }

    /// Creates a builder over a partial next assignment (for LNS repair).
    pub fn from_partial(model: &'a RoutingModel, nexts: Vec<Option<usize>>) -> Self {
        let mut builder = Self {
            model,
            nexts: vec![None; model.size()],
            has_prev: vec![false; model.num_indices()],
            route_of: vec![None; model.num_indices()],
            disjunction_active: vec![0; model.disjunctions().len()],
            cumuls: vec![vec![0; model.num_indices()]; model.dimensions().len()],
        };
        for (index, next) in nexts.iter().enumerate() {
            if let Some(next) = next {
                builder.assign_arc(index, *next);
            }
        }
        // propagate route membership and cumuls along chains reachable from
        // the starts
        for vehicle in 0..model.num_vehicles() {
            builder.trace_route(vehicle);
        }
        builder
    }

    fn assign_arc(&mut self, from: usize, to: usize) {
        self.nexts[from] = Some(to);
        if to != from {
            self.has_prev[to] = true;
            if let Some(d) = self.model.disjunction_of(to) {
                self.disjunction_active[d] += 1;
            }
        }
    }

    fn trace_route(&mut self, vehicle: usize) -> usize {
        let start = self.model.start(vehicle);
        self.route_of[start] = Some(vehicle);
        for (d, dimension) in self.model.dimensions().iter().enumerate() {
            self.cumuls[d][start] = if dimension.fix_start_to_zero {
                0
            } else {
                dimension.cumul_min[start]
            };
        }
        let mut tail = start;
        let mut guard = 0;
        while let Some(next) = self.nexts.get(tail).copied().flatten() {
            if next == tail || self.model.is_end(next) {
                break;
            }
            self.route_of[next] = Some(vehicle);
            for (d, dimension) in self.model.dimensions().iter().enumerate() {
                let arrival = self.cumuls[d][tail] + dimension.transit_value(tail, next);
                self.cumuls[d][next] = arrival.max(dimension.cumul_min[next]);
            }
            tail = next;
            guard += 1;
            if guard > self.model.num_indices() {
                break;
            }
        }
        tail
    }

    /// The current extensible tail of a vehicle's route, `None` once the
    /// route is closed.
    pub fn tail(&mut self, vehicle: usize) -> Option<usize> {
        let tail = self.trace_route(vehicle);
        match self.nexts[tail] {
            // tail already points at the end: route closed
            Some(next) if self.model.is_end(next) => None,
            _ => Some(tail),
        }
    }

    /// Whether extending `tail` with `to` keeps the partial solution
    /// feasible.
    pub fn can_extend(&self, vehicle: usize, tail: usize, to: usize) -> bool {
        let model = self.model;
        if to >= model.size() || to == tail {
            return false;
        }
        if self.has_prev[to] || self.nexts[to].is_some() {
            return false;
        }
        if !model.next_domain(tail).contains(to as i64) {
            return false;
        }
        if !model.can_be_active(to) || !model.vehicle_domain(to).contains(vehicle as i64) {
            return false;
        }
        if let Some(d) = model.disjunction_of(to) {
            if self.disjunction_active[d] > 0 {
                return false;
            }
        }
        for &(first, second) in model.pickup_delivery_pairs() {
            if to == second && self.route_of[first] != Some(vehicle) {
                return false;
            }
            if to == first && self.has_prev[second] {
                return false;
            }
        }
        for (d, dimension) in model.dimensions().iter().enumerate() {
            let arrival = self.cumuls[d][tail] + dimension.transit_value(tail, to);
            let lifted = arrival.max(dimension.cumul_min[to]);
            if lifted - arrival > dimension.slack_max {
                return false;
            }
            if lifted > dimension.cumul_max_for(to, vehicle) {
                return false;
            }
        }
        true
    }

    /// Extends the route of `vehicle` from `tail` to `to`.
    pub fn extend(&mut self, vehicle: usize, tail: usize, to: usize) {
        self.assign_arc(tail, to);
        self.route_of[to] = Some(vehicle);
        for (d, dimension) in self.model.dimensions().iter().enumerate() {
            let arrival = self.cumuls[d][tail] + dimension.transit_value(tail, to);
            self.cumuls[d][to] = arrival.max(dimension.cumul_min[to]);
        }
    }

    /// Whether closing the route at `tail` keeps dimensions feasible.
    pub fn can_close(&self, vehicle: usize, tail: usize) -> bool {
        let end = self.model.end(vehicle);
        for (d, dimension) in self.model.dimensions().iter().enumerate() {
            let arrival = self.cumuls[d][tail] + dimension.transit_value(tail, end);
            let lifted = arrival.max(dimension.cumul_min[end]);
            if lifted - arrival > dimension.slack_max {
                return false;
            }
            if lifted > dimension.cumul_max_for(end, vehicle) {
                return false;
            }
        }
        true
    }

    /// Terminates the route of `vehicle`.
    pub fn close_route(&mut self, vehicle: usize, tail: usize) {
        self.assign_arc(tail, self.model.end(vehicle));
    }

    /// Self-assigns every remaining index and validates the result.
    pub fn finish(mut self) -> Option<RoutingAssignment> {
        for vehicle in 0..self.model.num_vehicles() {
            if let Some(tail) = self.tail(vehicle) {
                self.close_route(vehicle, tail);
            }
        }
        let mut assignment = self.model.new_assignment();
        for (index, next) in self.nexts.iter().enumerate() {
            match next {
                Some(next) => assignment.set_next(index, *next),
                None => assignment.set_next(index, index),
            }
        }
        if !self.model.check_assignment(&assignment) {
            return None;
        }
        self.model.finalize_assignment(&mut assignment);
        Some(assignment)
    }
}

/// Selection rule of the route-extension builders.
#[derive(Debug, Clone, Copy)]
enum Selection {
    /// Smallest candidate index first.
    MinIndex,
    /// Cheapest extension by the first-solution cost.
    Cheapest,
    /// Ordered by the user-supplied evaluator.
    Evaluator,
}

fn extension_score(
    model: &RoutingModel,
    selection: Selection,
    from: usize,
    to: usize,
) -> i64 {
    match selection {
        Selection::MinIndex => to as i64,
        Selection::Cheapest => model.first_solution_cost(from, to),
        Selection::Evaluator => match model.first_solution_evaluator() {
            Some(evaluator) => evaluator(from, to),
            None => model.first_solution_cost(from, to),
        },
    }
}

// Builds routes vehicle by vehicle, extending each path greedily.
fn extend_routes(model: &RoutingModel, selection: Selection) -> Option<RoutingAssignment> {
    let mut builder = RouteBuilder::new(model);
    for vehicle in 0..model.num_vehicles() {
        while let Some(tail) = builder.tail(vehicle) {
            let best = (0..model.size())
                .filter(|&to| builder.can_extend(vehicle, tail, to))
                .min_by_key(|&to| (extension_score(model, selection, tail, to), to));
            match best {
                Some(to) => builder.extend(vehicle, tail, to),
                None => {
                    builder.close_route(vehicle, tail);
                    break;
                }
            }
        }
    }
    builder.finish()
}

// Completes a partial next assignment by cheapest route extension,
// bounded by a (sub-search) limit. Used to repair large-neighborhood
// moves.
pub(crate) fn complete_cheapest(
    model: &RoutingModel,
    partial: Vec<Option<usize>>,
    limit: &SearchLimit,
) -> Option<RoutingAssignment> {
    let mut builder = RouteBuilder::from_partial(model, partial);
    for vehicle in 0..model.num_vehicles() {
        while let Some(tail) = builder.tail(vehicle) {
            if limit.check() {
                return None;
            }
            let best = (0..model.size())
                .filter(|&to| builder.can_extend(vehicle, tail, to))
                .min_by_key(|&to| (model.first_solution_cost(tail, to), to));
            match best {
                Some(to) => builder.extend(vehicle, tail, to),
                None => {
                    builder.close_route(vehicle, tail);
                    break;
                }
            }
        }
    }
    builder.finish()
}

// Repeatedly takes the globally cheapest extension arc over all route
// tails.
fn global_cheapest_arc(model: &RoutingModel) -> Option<RoutingAssignment> {
    let mut builder = RouteBuilder::new(model);
    loop {
        let mut best: Option<(i64, usize, usize, usize)> = None;
        for vehicle in 0..model.num_vehicles() {
            let Some(tail) = builder.tail(vehicle) else {
                continue;
            };
            for to in 0..model.size() {
                if !builder.can_extend(vehicle, tail, to) {
                    continue;
                }
                let score = (model.first_solution_cost(tail, to), to, vehicle, tail);
                if best.map_or(true, |b| (score.0, score.1) < (b.0, b.1)) {
                    best = Some(score);
                }
            }
        }
        match best {
            Some((_, to, vehicle, tail)) => builder.extend(vehicle, tail, to),
            None => break,
        }
    }
    builder.finish()
}

// Extends one path with the cheapest feasible arc, self-assigns
// disjunction alternates along the way, and self-loops the rest. Fast but
// fails whenever constraints beyond path structure reject the skeleton;
// the caller treats failure as recoverable.
fn fast_one_path(model: &RoutingModel) -> Option<RoutingAssignment> {
    let mut builder = RouteBuilder::new(model);
    let vehicle = 0;
    while let Some(tail) = builder.tail(vehicle) {
        let best = (0..model.size())
            .filter(|&to| builder.can_extend(vehicle, tail, to))
            .min_by_key(|&to| (model.first_solution_cost(tail, to), to));
        let Some(to) = best else {
            builder.close_route(vehicle, tail);
            break;
        };
        builder.extend(vehicle, tail, to);
        // keep the alternates of the chosen node inactive
        for alternate in model.disjunction_members(to) {
            if alternate != to && builder.nexts[alternate].is_none() {
                builder.assign_arc(alternate, alternate);
            }
        }
    }
    builder.finish()
}

// Deactivates every non-start index. Fails when some index cannot be made
// inactive.
fn all_unperformed(model: &RoutingModel) -> Option<RoutingAssignment> {
    for index in 0..model.size() {
        if !model.is_start(index) && model.must_be_active(index) {
            return None;
        }
    }
    let builder = RouteBuilder::new(model);
    builder.finish()
}

// Nested optimisation: start from the empty solution and repeatedly apply
// the cheapest feasible insertion, within the LNS time budget.
fn best_insertion(model: &RoutingModel) -> Option<RoutingAssignment> {
    let empty = all_unperformed(model);
    let mut assignment = match empty {
        Some(assignment) => assignment,
        // mandatory nodes: fall back to route extension to seed them
        None => extend_routes(model, Selection::Cheapest)?,
    };
    let limit = SearchLimit::time_only(model.config().lns_time_limit_ms.max(1));
    loop {
        if limit.check() {
            break;
        }
        let inactive: Vec<usize> = (0..model.size())
            .filter(|&index| assignment.is_self_assigned(index))
            .filter(|&index| model.can_be_active(index))
            .filter(|&index| model.pickup_delivery_pairs().iter().all(|&(_, s)| s != index))
            .collect();
        if inactive.is_empty() {
            break;
        }
        let mut candidates: Vec<(i64, usize, usize)> = Vec::new();
        for &node in &inactive {
            for from in 0..model.size() {
                if from == node || assignment.is_self_assigned(from) {
                    continue;
                }
                let Some(to) = assignment.next(from) else {
                    continue;
                };
                if to == node {
                    continue;
                }
                let class = model.vehicle_cost_class(0).max(0);
                let delta = model.arc_cost(from, node, class)
                    + model.arc_cost(node, to, class)
                    - model.arc_cost(from, to, class);
                candidates.push((delta, node, from));
            }
        }
        candidates.sort_unstable();
        let mut inserted = false;
        for (_, node, from) in candidates {
            let mut candidate = assignment.clone();
            let to = candidate.next(from).expect("arc exists");
            candidate.set_next(from, node);
            candidate.set_next(node, to);
            // a delivery goes right after its pickup when the pair
            // activates
            if let Some(&(_, second)) = model
                .pickup_delivery_pairs()
                .iter()
                .find(|&&(first, _)| first == node)
            {
                if candidate.is_self_assigned(second) {
                    let after = candidate.next(node).expect("arc exists");
                    candidate.set_next(node, second);
                    candidate.set_next(second, after);
                }
            }
            if model.check_assignment(&candidate) {
                assignment = candidate;
                inserted = true;
                break;
            }
        }
        if !inserted {
            break;
        }
    }
    if !model.check_assignment(&assignment) {
        return None;
    }
    model.finalize_assignment(&mut assignment);
    Some(assignment)
}

// ----- savings and sweep -----

/// A candidate merge arc, in descending order of priority.
#[derive(Debug, Clone)]
pub struct Link {
    /// `(tail candidate, head candidate)` indices.
    pub pair: (usize, usize),
    /// Priority (the savings value).
    pub value: f64,
    /// Vehicle class the merge would commit both routes to.
    pub vehicle_class: usize,
    /// Start depot of the class.
    pub start_depot: usize,
    /// End depot of the class.
    pub end_depot: usize,
}

/// Builds routes by merging one-visit routes along a prioritised arc list,
/// forward-propagating every dimension and respecting vehicle classes.
pub struct RouteConstructor<'a> {
    model: &'a RoutingModel,
    check_merges: bool,
    routes: Vec<Vec<usize>>,
    in_route: Vec<Option<usize>>,
    deleted_routes: HashSet<usize>,
    node_to_vehicle_class: Vec<Option<usize>>,
    cumuls: Vec<Vec<i64>>,
    new_possible_cumuls: Vec<HashMap<usize, i64>>,
}

impl<'a> RouteConstructor<'a> {
    /// Creates a constructor; with `check_merges` every merge is also
    /// verified against disjunction and pair constraints before being
    /// committed.
    pub fn new(model: &'a RoutingModel, check_merges: bool) -> Self {
        let num_indices = model.num_indices();
        let mut routes = Vec::new();
        let mut in_route = vec![None; num_indices];
        for index in 0..model.size() {
            if !model.is_start(index) && model.can_be_active(index) {
                in_route[index] = Some(routes.len());
                routes.push(vec![index]);
            }
        }
        Self {
            model,
            check_merges,
            routes,
            in_route,
            deleted_routes: HashSet::new(),
            node_to_vehicle_class: vec![None; num_indices],
            cumuls: vec![vec![0; num_indices]; model.dimensions().len()],
            new_possible_cumuls: vec![HashMap::new(); model.dimensions().len()],
        }
    }

    fn head(&self, node: usize) -> bool {
        let route = &self.routes[self.in_route[node].expect("node is routed")];
        route.first() == Some(&node)
    }

    fn tail(&self, node: usize) -> bool {
        let route = &self.routes[self.in_route[node].expect("node is routed")];
        route.last() == Some(&node)
    }

    fn init_cumuls(&mut self, node: usize, start_depot: usize) {
        for (d, dimension) in self.model.dimensions().iter().enumerate() {
            self.cumuls[d][node] = dimension
                .transit_value(start_depot, node)
                .max(dimension.cumul_min[node]);
        }
    }

    // Propagates one dimension along `route` starting with `route_cumul`
    // at its head, recording tentative cumuls.
    fn feasible_route(&mut self, route: &[usize], route_cumul: i64, d: usize) -> bool {
        let dimension = &self.model.dimensions()[d];
        let mut cumul = route_cumul;
        for (position, &previous) in route.iter().enumerate() {
            self.new_possible_cumuls[d].insert(previous, cumul);
            let Some(&next) = route.get(position + 1) else {
                return true;
            };
            let available = cumul + dimension.transit_value(previous, next);
            let mut available_next = self.cumuls[d][next].max(available);
            let slack = available_next - available;
            if slack > dimension.slack_max {
                available_next = available + dimension.slack_max;
            }
            if available_next > dimension.cumul_max[next] {
                return false;
            }
            if available_next <= self.cumuls[d][next] {
                return true;
            }
            cumul = available_next;
        }
        true
    }

    fn check_route_connection(
        &mut self,
        route1: usize,
        route2: usize,
        d: usize,
        end_depot: usize,
    ) -> bool {
        let tail1 = *self.routes[route1].last().expect("route not empty");
        let head2 = *self.routes[route2].first().expect("route not empty");
        let tail2 = *self.routes[route2].last().expect("route not empty");
        let dimension = &self.model.dimensions()[d];
        let Some(non_depot) = (0..self.model.size()).find(|&node| !self.model.is_start(node))
        else {
            return false;
        };
        let depot_threshold = dimension
            .slack_max
            .max(dimension.cumul_max[non_depot]);

        let available_from_tail1 =
            self.cumuls[d][tail1] + dimension.transit_value(tail1, head2);
        let mut new_available_head2 = self.cumuls[d][head2].max(available_from_tail1);
        let slack = new_available_head2 - available_from_tail1;
        if slack > dimension.slack_max {
            new_available_head2 = available_from_tail1 + dimension.slack_max;
        }
        if new_available_head2 > dimension.cumul_max[head2] {
            return false;
        }
        if new_available_head2 <= self.cumuls[d][head2] {
            return true;
        }
        let route2_nodes = self.routes[route2].clone();
        let feasible = self.feasible_route(&route2_nodes, new_available_head2, d);
        let new_possible_tail2 = self.new_possible_cumuls[d]
            .get(&tail2)
            .copied()
            .unwrap_or(self.cumuls[d][tail2]);
        let dimension = &self.model.dimensions()[d];
        if !feasible
            || new_possible_tail2 + dimension.transit_value(tail2, end_depot) > depot_threshold
        {
            return false;
        }
        true
    }

    // Verifies the merged route against constraints the dimension
    // propagation does not cover; worked out on temporaries and discarded
    // on failure.
    fn check_merged_route(&self, route1: usize, route2: usize) -> bool {
        let merged: Vec<usize> = self.routes[route1]
            .iter()
            .chain(self.routes[route2].iter())
            .copied()
            .collect();
        let mut seen_disjunctions = HashSet::new();
        for &node in &merged {
            if let Some(d) = self.model.disjunction_of(node) {
                if !seen_disjunctions.insert(d) {
                    return false;
                }
            }
        }
        for &(first, second) in self.model.pickup_delivery_pairs() {
            let first_pos = merged.iter().position(|&n| n == first);
            let second_pos = merged.iter().position(|&n| n == second);
            if let (Some(first_pos), Some(second_pos)) = (first_pos, second_pos) {
                if second_pos < first_pos {
                    return false;
                }
            }
        }
        true
    }

    fn feasible_merge(&mut self, link: &Link) -> bool {
        let (node1, node2) = link.pair;
        let (Some(route1), Some(route2)) = (self.in_route[node1], self.in_route[node2]) else {
            return false;
        };
        if route1 == route2 || !(self.tail(node1) && self.head(node2)) {
            return false;
        }
        // both routes either unassigned or committed to this class
        let class1 = self.node_to_vehicle_class[node1];
        let class2 = self.node_to_vehicle_class[node2];
        if class1.is_some_and(|c| c != link.vehicle_class)
            || class2.is_some_and(|c| c != link.vehicle_class)
        {
            return false;
        }
        for d in 0..self.model.dimensions().len() {
            self.new_possible_cumuls[d].clear();
            if !self.check_route_connection(route1, route2, d, link.end_depot) {
                return false;
            }
        }
        if self.check_merges && !self.check_merged_route(route1, route2) {
            return false;
        }
        true
    }

    fn merge(&mut self, route1: usize, route2: usize) {
        let absorbed = std::mem::take(&mut self.routes[route2]);
        for &node in &absorbed {
            self.in_route[node] = Some(route1);
        }
        self.routes[route1].extend(absorbed);
        for d in 0..self.model.dimensions().len() {
            for (&node, &cumul) in &self.new_possible_cumuls[d] {
                self.cumuls[d][node] = cumul;
            }
        }
        self.deleted_routes.insert(route2);
    }

    /// Processes the links in order and assembles the resulting
    /// assignment.
    pub fn construct(mut self, links: &[Link]) -> Option<RoutingAssignment> {
        for link in links {
            let (node1, node2) = link.pair;
            if self.in_route[node1].is_none() || self.in_route[node2].is_none() {
                continue;
            }
            if self.node_to_vehicle_class[node1].is_none() {
                self.init_cumuls(node1, link.start_depot);
            }
            if self.node_to_vehicle_class[node2].is_none() {
                self.init_cumuls(node2, link.start_depot);
            }
            if self.feasible_merge(link) {
                let route1 = self.in_route[node1].expect("checked above");
                let route2 = self.in_route[node2].expect("checked above");
                self.merge(route1, route2);
                self.node_to_vehicle_class[node1] = Some(link.vehicle_class);
                self.node_to_vehicle_class[node2] = Some(link.vehicle_class);
            }
        }

        // Longer routes grab vehicles first; excess short routes stay
        // unperformed.
        let mut final_routes: Vec<(usize, Vec<usize>)> = self
            .routes
            .iter()
            .enumerate()
            .filter(|(index, route)| !self.deleted_routes.contains(index) && !route.is_empty())
            .map(|(index, route)| (index, route.clone()))
            .collect();
        final_routes.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.1.cmp(&b.1)));

        let classes = self.model.vehicle_classes();
        let mut vehicle_used = vec![false; self.model.num_vehicles()];
        let mut assignment_nexts: Vec<Option<usize>> = vec![None; self.model.size()];
        for (route_index, route) in &final_routes {
            let class = self.routes[*route_index]
                .first()
                .and_then(|&node| self.node_to_vehicle_class[node]);
            let vehicle = (0..self.model.num_vehicles()).find(|&vehicle| {
                if vehicle_used[vehicle] {
                    return false;
                }
                match class {
                    Some(class_index) => class_matches(self.model, &classes, class_index, vehicle),
                    None => true,
                }
            });
            let Some(vehicle) = vehicle else {
                continue;
            };
            vehicle_used[vehicle] = true;
            let mut from = self.model.start(vehicle);
            for &node in route {
                assignment_nexts[from] = Some(node);
                from = node;
            }
            assignment_nexts[from] = Some(self.model.end(vehicle));
        }
        RouteBuilder::from_partial(self.model, assignment_nexts).finish()
    }
}

fn class_matches(
    model: &RoutingModel,
    classes: &[VehicleClass],
    class_index: usize,
    vehicle: usize,
) -> bool {
    classes.get(class_index).is_some_and(|class| {
        model.index_to_node(model.start(vehicle)) == class.start_node
            && model.index_to_node(model.end(vehicle)) == class.end_node
            && model.vehicle_cost_class(vehicle) == class.cost_class
    })
}

// Clarke-Wright savings: one route per order, then merges by decreasing
// savings value.
fn savings(model: &RoutingModel, check_merges: bool) -> Option<RoutingAssignment> {
    let config = model.config();
    let shape = config.savings_route_shape_parameter;
    let classes = model.vehicle_classes();
    let visits: Vec<usize> = (0..model.size())
        .filter(|&index| !model.is_start(index))
        .collect();

    let mut neighbors_of: HashMap<usize, Vec<usize>> = HashMap::new();
    for &node in &visits {
        let mut neighbors: Vec<usize> = visits.iter().copied().filter(|&n| n != node).collect();
        if config.savings_filter_radius > 0 {
            neighbors.retain(|&n| model.homogeneous_cost(node, n) <= config.savings_filter_radius);
        }
        if config.savings_filter_neighbors > 0 {
            neighbors.sort_by_key(|&n| (model.homogeneous_cost(node, n), n));
            neighbors.truncate(config.savings_filter_neighbors);
            neighbors.sort_unstable();
        }
        neighbors_of.insert(node, neighbors);
    }

    let mut links = Vec::new();
    for class in &classes {
        for &node in &visits {
            for &neighbor in &neighbors_of[&node] {
                let saving = model.homogeneous_cost(node, class.start_node) as f64
                    + model.homogeneous_cost(class.end_node, neighbor) as f64
                    - shape * model.homogeneous_cost(node, neighbor) as f64;
                links.push(Link {
                    pair: (node, neighbor),
                    value: saving,
                    vehicle_class: class.class_index,
                    start_depot: class.start_node,
                    end_depot: class.end_node,
                });
            }
        }
    }
    links.sort_by(|a, b| b.value.partial_cmp(&a.value).expect("savings are finite"));
    RouteConstructor::new(model, check_merges).construct(&links)
}

/// Splits the space into sectors around the depot and sorts each sector's
/// nodes by ascending polar angle.
pub struct SweepArranger {
    points: Vec<(f64, f64)>,
    sectors: usize,
}

impl SweepArranger {
    /// Creates an arranger over per-index coordinates.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points, sectors: 1 }
    }

    /// Sets the number of sectors.
    pub fn set_sectors(&mut self, sectors: usize) {
        self.sectors = sectors.max(1);
    }

    /// Returns the visit order: nodes sorted by distance, split into
    /// sectors, each sector sorted by angle.
    pub fn arrange(&self) -> Vec<usize> {
        let (x0, y0) = self.points[0];
        let mut sweep_nodes: Vec<(usize, f64, f64)> = (0..self.points.len())
            .map(|node| {
                let dx = self.points[node].0 - x0;
                let dy = self.points[node].1 - y0;
                let square_distance = dx * dx + dy * dy;
                let mut angle = if square_distance == 0.0 {
                    0.0
                } else {
                    dy.atan2(dx)
                };
                if angle < 0.0 {
                    angle += 2.0 * std::f64::consts::PI;
                }
                (node, angle, square_distance)
            })
            .collect();
        sweep_nodes.sort_by(|a, b| a.2.partial_cmp(&b.2).expect("distances are finite"));
        let chunk = (sweep_nodes.len() / self.sectors).max(1);
        for sector in 0..self.sectors {
            let begin = sector * chunk;
            if begin >= sweep_nodes.len() {
                break;
            }
            let end = if sector == self.sectors - 1 {
                sweep_nodes.len()
            } else {
                ((sector + 1) * chunk).min(sweep_nodes.len())
            };
            sweep_nodes[begin..end]
                .sort_by(|a, b| a.1.partial_cmp(&b.1).expect("angles are finite"));
        }
        sweep_nodes.into_iter().map(|(node, _, _)| node).collect()
    }
}

// Sweep: adjacent nodes in the angular arrangement become candidate merge
// arcs for the route constructor.
fn sweep(model: &RoutingModel, check_merges: bool) -> Option<RoutingAssignment> {
    let Some(coordinates) = model.node_coordinates() else {
        debug!("sweep needs node coordinates, falling back to route extension");
        return extend_routes(model, Selection::Cheapest);
    };
    let depot = model.depot()?;
    let points: Vec<(f64, f64)> = (0..model.size())
        .map(|index| coordinates[model.index_to_node(index)])
        .collect();
    let mut arranger = SweepArranger::new(points);
    let config = model.config();
    if config.sweep_sectors > 0 && config.sweep_sectors < model.size() {
        arranger.set_sectors(config.sweep_sectors);
    }
    let arranged = arranger.arrange();
    let end_depot = model.end(0);
    let mut links = Vec::new();
    for window in arranged.windows(2) {
        let (first, second) = (window[0], window[1]);
        if first != depot && second != depot && !model.is_start(first) && !model.is_start(second)
        {
            links.push(Link {
                pair: (first, second),
                value: 0.0,
                vehicle_class: 0,
                start_depot: depot,
                end_depot,
            });
        }
    }
    RouteConstructor::new(model, check_merges).construct(&links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matrix_evaluator;
    use crate::search::SearchConfig;

    fn line_matrix() -> Vec<Vec<i64>> {
        vec![
            vec![0, 1, 2, 3],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![3, 2, 1, 0],
        ]
    }

    fn strategy_config(strategy: FirstSolutionStrategy) -> SearchConfig {
        SearchConfig {
            first_solution: strategy,
            ..SearchConfig::default()
        }
    }

    fn solve_first(strategy: FirstSolutionStrategy) -> (RoutingModel, RoutingAssignment) {
        let mut model = RoutingModel::with_config(
            4,
            1,
            &[(0, 0)],
            strategy_config(strategy),
        );
        model.set_cost(matrix_evaluator(line_matrix()));
        model.close_model();
        let assignment = build_first_solution(&model).expect("first solution");
        (model, assignment)
    }

    #[test]
    fn test_default_builds_complete_routes() {
        let (model, assignment) = solve_first(FirstSolutionStrategy::Default);
        assert!(model.check_assignment(&assignment));
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        assert_eq!(routes[0].len(), 3);
    }

    #[test]
    fn test_path_cheapest_arc_orders_by_cost() {
        let (model, assignment) = solve_first(FirstSolutionStrategy::PathCheapestArc);
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        // nearest-first extension on the line gives 1, 2, 3
        assert_eq!(routes[0], vec![1, 2, 3]);
    }

    #[test]
    fn test_global_cheapest_arc() {
        let (model, assignment) = solve_first(FirstSolutionStrategy::GlobalCheapestArc);
        assert!(model.check_assignment(&assignment));
        assert_eq!(
            model.assignment_to_routes(&assignment).expect("routes")[0].len(),
            3
        );
    }

    #[test]
    fn test_all_unperformed_requires_optional_nodes() {
        let mut model = RoutingModel::with_config(
            3,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::AllUnperformed),
        );
        model.set_cost(matrix_evaluator(vec![
            vec![0, 1, 2],
            vec![1, 0, 1],
            vec![2, 1, 0],
        ]));
        model
            .add_disjunction_with_penalty(&[1], 5)
            .expect("open model");
        model
            .add_disjunction_with_penalty(&[2], 5)
            .expect("open model");
        model.close_model();
        let assignment = build_first_solution(&model).expect("all unperformed");
        assert!(assignment.is_self_assigned(1));
        assert!(assignment.is_self_assigned(2));
        // penalties for both inactive nodes
        assert_eq!(assignment.cost, 10);
    }

    #[test]
    fn test_all_unperformed_fails_on_mandatory() {
        let mut model = RoutingModel::with_config(
            2,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::AllUnperformed),
        );
        model.set_cost(matrix_evaluator(vec![vec![0, 1], vec![1, 0]]));
        model.close_model();
        // no disjunctions: every node is mandatory
        assert!(build_first_solution(&model).is_none());
    }

    #[test]
    fn test_best_insertion_serves_all() {
        let mut model = RoutingModel::with_config(
            4,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::BestInsertion),
        );
        model.set_cost(matrix_evaluator(line_matrix()));
        for node in 1..4 {
            model
                .add_disjunction_with_penalty(&[node], 1000)
                .expect("open model");
        }
        model.close_model();
        let assignment = build_first_solution(&model).expect("best insertion");
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        // high penalties make serving every node worthwhile
        assert_eq!(routes[0].len(), 3);
    }

    // Savings on the concrete scenario: line distances with expensive
    // depot arcs merge everything into one route.
    #[test]
    fn test_savings_single_vehicle_route() {
        let mut model = RoutingModel::with_config(
            4,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::Savings),
        );
        model.set_cost(matrix_evaluator(vec![
            vec![0, 10, 10, 10],
            vec![10, 0, 1, 3],
            vec![10, 1, 0, 1],
            vec![10, 3, 1, 0],
        ]));
        model.close_model();
        let assignment = build_first_solution(&model).expect("savings");
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        assert!(routes[0] == vec![1, 2, 3] || routes[0] == vec![3, 2, 1]);
        assert_eq!(assignment.cost, 22);
    }

    #[test]
    fn test_savings_respects_capacity() {
        let mut model = RoutingModel::with_config(
            4,
            3,
            &[(0, 0), (0, 0), (0, 0)],
            strategy_config(FirstSolutionStrategy::Savings),
        );
        model.set_cost(matrix_evaluator(line_matrix()));
        model
            .add_constant_dimension(1, 2, true, "count")
            .expect("open model");
        model.close_model();
        let assignment = build_first_solution(&model).expect("savings");
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        // capacity 2 per vehicle (start + one visit) splits the visits
        for route in &routes {
            assert!(route.len() <= 1, "route too long: {route:?}");
        }
        assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 3);
    }

    #[test]
    fn test_sweep_clusters_by_angle() {
        let mut model = RoutingModel::with_config(
            5,
            2,
            &[(0, 0), (0, 0)],
            strategy_config(FirstSolutionStrategy::Sweep),
        );
        model.set_cost(matrix_evaluator(vec![
            vec![0, 2, 2, 2, 2],
            vec![2, 0, 1, 4, 4],
            vec![2, 1, 0, 4, 4],
            vec![2, 4, 4, 0, 1],
            vec![2, 4, 4, 1, 0],
        ]));
        model.set_node_coordinates(vec![
            (0.0, 0.0),
            (1.0, 0.1),
            (1.0, -0.1),
            (-1.0, 0.1),
            (-1.0, -0.1),
        ]);
        model
            .add_constant_dimension(1, 3, true, "count")
            .expect("open model");
        model.close_model();
        let assignment = build_first_solution(&model).expect("sweep");
        assert!(model.check_assignment(&assignment));
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        assert_eq!(routes.iter().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn test_sweep_arranger_orders_by_angle() {
        let arranger = SweepArranger::new(vec![
            (0.0, 0.0),
            (1.0, 0.0),  // 0 degrees
            (0.0, 1.0),  // 90 degrees
            (-1.0, 0.0), // 180 degrees
            (0.0, -1.0), // 270 degrees
        ]);
        let order = arranger.arrange();
        // depot (distance 0) first, then ascending angle
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_fast_one_path_inactivates_alternates() {
        let mut model = RoutingModel::with_config(
            4,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::PathCheapestArc),
        );
        model.set_cost(matrix_evaluator(line_matrix()));
        model
            .add_disjunction_with_penalty(&[1, 2], 100)
            .expect("open model");
        model.close_model();
        let assignment = build_first_solution(&model).expect("fast path");
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        // exactly one of the alternates is served
        let serves_1 = routes[0].contains(&1);
        let serves_2 = routes[0].contains(&2);
        assert!(serves_1 ^ serves_2);
        assert!(routes[0].contains(&3));
    }

    #[test]
    fn test_evaluator_strategy_uses_evaluator() {
        let mut model = RoutingModel::with_config(
            4,
            1,
            &[(0, 0)],
            strategy_config(FirstSolutionStrategy::EvaluatorStrategy),
        );
        model.set_cost(matrix_evaluator(line_matrix()));
        // prefer the farthest node first
        model.set_first_solution_evaluator(std::rc::Rc::new(|_, to| -(to as i64)));
        model.close_model();
        let assignment = build_first_solution(&model).expect("evaluator strategy");
        let routes = model.assignment_to_routes(&assignment).expect("routes");
        assert_eq!(routes[0][0], 3);
    }
}
