//! Neighborhood operators.
//!
//! Every operator enumerates its candidate moves in a deterministic order
//! derived from its base-node iteration scheme and emits them as
//! [`Delta`]s over the next variables. Pair-aware operators keep pickup
//! and delivery nodes on one route and preserve their ordering by
//! construction.

use crate::routing::{RoutingAssignment, RoutingModel};

use super::delta::Delta;

/// A local-search neighborhood.
pub trait NeighborhoodOperator {
    /// Operator name, for logs.
    fn name(&self) -> &'static str;
    /// All candidate moves for the current solution, in enumeration order.
    fn make_neighbors(&mut self, model: &RoutingModel, assignment: &RoutingAssignment)
        -> Vec<Delta>;
}

/// The full route of each vehicle: `[start, visits.., end]`.
pub fn vehicle_paths(model: &RoutingModel, assignment: &RoutingAssignment) -> Vec<Vec<usize>> {
    let mut paths = Vec::with_capacity(model.num_vehicles());
    for vehicle in 0..model.num_vehicles() {
        let mut path = vec![model.start(vehicle)];
        let mut index = model.start(vehicle);
        let mut guard = 0;
        while !model.is_end(index) {
            let Some(next) = assignment.next(index) else {
                break;
            };
            path.push(next);
            index = next;
            guard += 1;
            if guard > model.num_indices() {
                break;
            }
        }
        paths.push(path);
    }
    paths
}

/// The inactive (self-assigned) indices, in index order.
pub fn inactive_indices(model: &RoutingModel, assignment: &RoutingAssignment) -> Vec<usize> {
    (0..model.size())
        .filter(|&index| assignment.is_self_assigned(index))
        .collect()
}

/// Scratch copy of the next/prev pointers on which moves are performed
/// before being emitted as a delta of the touched variables.
struct Rewirer {
    original: Vec<usize>,
    next: Vec<usize>,
    prev: Vec<Option<usize>>,
    touched: Vec<usize>,
}

impl Rewirer {
    fn new(model: &RoutingModel, assignment: &RoutingAssignment) -> Self {
        let size = model.size();
        let mut next = vec![0; size];
        let mut prev = vec![None; model.num_indices()];
        for index in 0..size {
            let value = assignment.next(index).expect("complete assignment");
            next[index] = value;
            if value != index {
                prev[value] = Some(index);
            }
        }
        Self {
            original: next.clone(),
            next,
            prev,
            touched: Vec::new(),
        }
    }

    fn set_next(&mut self, index: usize, value: usize) {
        let old = self.next[index];
        if old != index && self.prev[old] == Some(index) {
            self.prev[old] = None;
        }
        self.next[index] = value;
        if value != index {
            self.prev[value] = Some(index);
        }
        if !self.touched.contains(&index) {
            self.touched.push(index);
        }
    }

    fn next_of(&self, index: usize) -> usize {
        self.next[index]
    }

    fn prev_of(&self, index: usize) -> Option<usize> {
        self.prev[index]
    }

    /// Inserts the inactive `node` right after `after`.
    fn make_active(&mut self, node: usize, after: usize) -> bool {
        if node == after || self.next[node] != node {
            return false;
        }
        let successor = self.next[after];
        self.set_next(after, node);
        self.set_next(node, successor);
        true
    }

    /// Removes `node` from its path, leaving it self-assigned.
    fn make_inactive(&mut self, node: usize) -> bool {
        let Some(previous) = self.prev[node] else {
            return false;
        };
        let successor = self.next[node];
        self.set_next(previous, successor);
        self.set_next(node, node);
        true
    }

    /// Moves the active `node` right after `after`.
    fn relocate(&mut self, node: usize, after: usize) -> bool {
        if node == after || self.prev[node] == Some(after) {
            return false;
        }
        let Some(previous) = self.prev[node] else {
            return false;
        };
        let successor = self.next[node];
        if successor == after {
            // moving a node after its own successor swaps them
            self.set_next(previous, after);
            let after_successor = self.next[after];
            self.set_next(after, node);
            self.set_next(node, after_successor);
            return true;
        }
        self.set_next(previous, successor);
        let after_successor = self.next[after];
        self.set_next(after, node);
        self.set_next(node, after_successor);
        true
    }

    /// Emits the touched variables whose value changed.
    fn finish(self) -> Option<Delta> {
        let mut delta = Delta::new();
        for index in self.touched {
            if self.next[index] != self.original[index] {
                delta.set(index, self.next[index]);
            }
        }
        (!delta.is_empty()).then_some(delta)
    }
}

// ----- basic node operators -----

/// Moves one visit to another position on any route.
pub struct RelocateOperator;

impl NeighborhoodOperator for RelocateOperator {
    fn name(&self) -> &'static str {
        "Relocate"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            for &node in &path[1..path.len().saturating_sub(1)] {
                for target_path in &paths {
                    for &after in &target_path[..target_path.len().saturating_sub(1)] {
                        if after == node {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        if rewirer.relocate(node, after) {
                            if let Some(delta) = rewirer.finish() {
                                neighbors.push(delta);
                            }
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Swaps the positions of two visits.
pub struct ExchangeOperator;

impl NeighborhoodOperator for ExchangeOperator {
    fn name(&self) -> &'static str {
        "Exchange"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let visits: Vec<usize> = paths
            .iter()
            .flat_map(|path| path[1..path.len().saturating_sub(1)].to_vec())
            .collect();
        let mut neighbors = Vec::new();
        for (i, &a) in visits.iter().enumerate() {
            for &b in &visits[i + 1..] {
                let mut rewirer = Rewirer::new(model, assignment);
                let prev_a = rewirer.prev_of(a);
                let ok = if rewirer.next_of(a) == b {
                    rewirer.relocate(a, b)
                } else if rewirer.next_of(b) == a {
                    rewirer.relocate(b, a)
                } else {
                    let prev_b = rewirer.prev_of(b);
                    match (prev_a, prev_b) {
                        (Some(pa), Some(pb)) => {
                            rewirer.relocate(a, pb) && rewirer.relocate(b, pa)
                        }
                        _ => false,
                    }
                };
                if ok {
                    if let Some(delta) = rewirer.finish() {
                        neighbors.push(delta);
                    }
                }
            }
        }
        neighbors
    }
}

/// Exchanges the tails of two routes after a chosen arc on each.
pub struct CrossOperator;

impl NeighborhoodOperator for CrossOperator {
    fn name(&self) -> &'static str {
        "Cross"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for p1 in 0..paths.len() {
            for p2 in (p1 + 1)..paths.len() {
                let path1 = &paths[p1];
                let path2 = &paths[p2];
                // cut after position i on path1 and j on path2 (positions
                // exclude the ends)
                for i in 0..path1.len() - 1 {
                    for j in 0..path2.len() - 1 {
                        let head1 = path1[i + 1];
                        let head2 = path2[j + 1];
                        let tail1 = path1[path1.len() - 2];
                        let tail2 = path2[path2.len() - 2];
                        let end1 = *path1.last().expect("path has an end");
                        let end2 = *path2.last().expect("path has an end");
                        let segment1_empty = model.is_end(head1);
                        let segment2_empty = model.is_end(head2);
                        if segment1_empty && segment2_empty {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        if segment2_empty {
                            rewirer.set_next(path2[j], head1);
                            rewirer.set_next(tail1, end2);
                            rewirer.set_next(path1[i], end1);
                        } else if segment1_empty {
                            rewirer.set_next(path1[i], head2);
                            rewirer.set_next(tail2, end1);
                            rewirer.set_next(path2[j], end2);
                        } else {
                            rewirer.set_next(path1[i], head2);
                            rewirer.set_next(path2[j], head1);
                            rewirer.set_next(tail1, end2);
                            rewirer.set_next(tail2, end1);
                        }
                        if let Some(delta) = rewirer.finish() {
                            neighbors.push(delta);
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Reverses a route segment (edge exchange).
pub struct TwoOptOperator;

impl NeighborhoodOperator for TwoOptOperator {
    fn name(&self) -> &'static str {
        "TwoOpt"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            // arcs (path[i] -> path[i+1]) and (path[j] -> path[j+1]);
            // reverse path[i+1..=j]
            for i in 0..path.len().saturating_sub(3) {
                for j in (i + 2)..path.len() - 1 {
                    let mut rewirer = Rewirer::new(model, assignment);
                    rewirer.set_next(path[i], path[j]);
                    for k in ((i + 1)..j).rev() {
                        rewirer.set_next(path[k + 1], path[k]);
                    }
                    rewirer.set_next(path[i + 1], path[j + 1]);
                    if let Some(delta) = rewirer.finish() {
                        neighbors.push(delta);
                    }
                }
            }
        }
        neighbors
    }
}

/// Moves chains of two or three consecutive visits within their route.
pub struct OrOptOperator;

impl NeighborhoodOperator for OrOptOperator {
    fn name(&self) -> &'static str {
        "OrOpt"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            let visits = path.len().saturating_sub(2);
            for chain_length in 2..=3usize {
                if visits < chain_length + 1 {
                    continue;
                }
                for start_pos in 1..=(path.len() - 1 - chain_length) {
                    let chain: Vec<usize> =
                        path[start_pos..start_pos + chain_length].to_vec();
                    for target_pos in 0..path.len() - 1 {
                        // insertion point outside the chain and not a no-op
                        if target_pos >= start_pos - 1 && target_pos < start_pos + chain_length
                        {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        rewirer.set_next(path[start_pos - 1], path[start_pos + chain_length]);
                        let after = path[target_pos];
                        let successor = rewirer.next_of(after);
                        rewirer.set_next(after, chain[0]);
                        rewirer.set_next(*chain.last().expect("chain not empty"), successor);
                        if let Some(delta) = rewirer.finish() {
                            neighbors.push(delta);
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Reverses and relocates short chains within their route, in the style of
/// Lin-Kernighan sequential edge exchanges.
pub struct LinKernighanOperator;

impl NeighborhoodOperator for LinKernighanOperator {
    fn name(&self) -> &'static str {
        "LinKernighan"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            for chain_length in 2..=3usize {
                if path.len() < chain_length + 3 {
                    continue;
                }
                for start_pos in 1..=(path.len() - 1 - chain_length) {
                    let chain: Vec<usize> =
                        path[start_pos..start_pos + chain_length].to_vec();
                    for target_pos in 0..path.len() - 1 {
                        if target_pos + 1 >= start_pos && target_pos < start_pos + chain_length {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        rewirer.set_next(path[start_pos - 1], path[start_pos + chain_length]);
                        let after = path[target_pos];
                        let successor = rewirer.next_of(after);
                        // reinsert the chain reversed
                        rewirer.set_next(after, *chain.last().expect("chain not empty"));
                        for k in (1..chain_length).rev() {
                            rewirer.set_next(chain[k], chain[k - 1]);
                        }
                        rewirer.set_next(chain[0], successor);
                        if let Some(delta) = rewirer.finish() {
                            neighbors.push(delta);
                        }
                    }
                }
            }
        }
        neighbors
    }
}

// ----- activity operators -----

/// Inserts one inactive node into a route.
pub struct MakeActiveOperator;

impl NeighborhoodOperator for MakeActiveOperator {
    fn name(&self) -> &'static str {
        "MakeActive"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for node in inactive_indices(model, assignment) {
            if !model.can_be_active(node) {
                continue;
            }
            for path in &paths {
                for &after in &path[..path.len().saturating_sub(1)] {
                    let mut rewirer = Rewirer::new(model, assignment);
                    if rewirer.make_active(node, after) {
                        if let Some(delta) = rewirer.finish() {
                            neighbors.push(delta);
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Removes one visit from its route.
pub struct MakeInactiveOperator;

impl NeighborhoodOperator for MakeInactiveOperator {
    fn name(&self) -> &'static str {
        "MakeInactive"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            for &node in &path[1..path.len().saturating_sub(1)] {
                if model.must_be_active(node) {
                    continue;
                }
                let mut rewirer = Rewirer::new(model, assignment);
                if rewirer.make_inactive(node) {
                    if let Some(delta) = rewirer.finish() {
                        neighbors.push(delta);
                    }
                }
            }
        }
        neighbors
    }
}

/// Replaces one visit by an inactive node at the same position.
pub struct SwapActiveOperator;

impl NeighborhoodOperator for SwapActiveOperator {
    fn name(&self) -> &'static str {
        "SwapActive"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let inactive = inactive_indices(model, assignment);
        let mut neighbors = Vec::new();
        for &node in &inactive {
            if !model.can_be_active(node) {
                continue;
            }
            for path in &paths {
                for &active in &path[1..path.len().saturating_sub(1)] {
                    if model.must_be_active(active) {
                        continue;
                    }
                    let mut rewirer = Rewirer::new(model, assignment);
                    let Some(previous) = rewirer.prev_of(active) else {
                        continue;
                    };
                    if rewirer.make_inactive(active) && rewirer.make_active(node, previous) {
                        if let Some(delta) = rewirer.finish() {
                            neighbors.push(delta);
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Replaces one visit by an inactive node, reinserting anywhere on the
/// removed node's former route.
pub struct ExtendedSwapActiveOperator;

impl NeighborhoodOperator for ExtendedSwapActiveOperator {
    fn name(&self) -> &'static str {
        "ExtendedSwapActive"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let inactive = inactive_indices(model, assignment);
        let mut neighbors = Vec::new();
        for &node in &inactive {
            if !model.can_be_active(node) {
                continue;
            }
            for path in &paths {
                for &active in &path[1..path.len().saturating_sub(1)] {
                    if model.must_be_active(active) {
                        continue;
                    }
                    for &after in &path[..path.len().saturating_sub(1)] {
                        if after == active {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        if rewirer.make_inactive(active) && rewirer.make_active(node, after) {
                            if let Some(delta) = rewirer.finish() {
                                neighbors.push(delta);
                            }
                        }
                    }
                }
            }
        }
        neighbors
    }
}

// ----- pair operators -----

/// Inserts both nodes of an inactive pickup/delivery pair on one path.
///
/// The second node is inserted before the first so that the only
/// neighborhoods where the two nodes end up adjacent have the first node
/// before the second; a precedence constraint between them can therefore
/// never be violated by this operator.
pub struct MakePairActiveOperator;

impl MakePairActiveOperator {
    /// Both base nodes must stay on the same path: they are the nodes
    /// after which the two nodes of the pair are inserted.
    pub fn on_same_path_as_previous_base(&self, _base_index: usize) -> bool {
        true
    }
}

impl NeighborhoodOperator for MakePairActiveOperator {
    fn name(&self) -> &'static str {
        "MakePairActive"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for &(first, second) in model.pickup_delivery_pairs() {
            if !assignment.is_self_assigned(first) || !assignment.is_self_assigned(second) {
                continue;
            }
            for path in &paths {
                let positions = &path[..path.len().saturating_sub(1)];
                // base 1 restarts from base 0 when on the same path
                for (pos0, &base0) in positions.iter().enumerate() {
                    for &base1 in &positions[pos0..] {
                        let mut rewirer = Rewirer::new(model, assignment);
                        // second inserted first, before the first node
                        if rewirer.make_active(second, base1)
                            && rewirer.make_active(first, base0)
                        {
                            if let Some(delta) = rewirer.finish() {
                                neighbors.push(delta);
                            }
                        }
                    }
                }
            }
        }
        neighbors
    }
}

/// Moves both nodes of an active pair to new positions.
pub struct PairRelocateOperator {
    is_first: Vec<bool>,
    sibling: Vec<Option<usize>>,
}

impl PairRelocateOperator {
    /// Creates the operator from the model's pairs.
    pub fn new(model: &RoutingModel) -> Self {
        let mut is_first = vec![false; model.num_indices()];
        let mut sibling = vec![None; model.num_indices()];
        for &(first, second) in model.pickup_delivery_pairs() {
            is_first[first] = true;
            sibling[first] = Some(second);
            sibling[second] = Some(first);
        }
        Self { is_first, sibling }
    }

    /// The two insertion base nodes (indices 1 and 2) must lie on the same
    /// path; the moved pair (base index 0) may come from anywhere.
    pub fn on_same_path_as_previous_base(&self, base_index: usize) -> bool {
        base_index == 2
    }
}

impl NeighborhoodOperator for PairRelocateOperator {
    fn name(&self) -> &'static str {
        "PairRelocate"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        let moved: Vec<usize> = (0..model.size())
            .filter(|&node| self.sibling[node].is_some())
            .filter(|&node| !assignment.is_self_assigned(node))
            .collect();
        for &node in &moved {
            let sibling = self.sibling[node].expect("pair member");
            if assignment.is_self_assigned(sibling) {
                continue;
            }
            for path in &paths {
                let positions = &path[..path.len().saturating_sub(1)];
                for (pos1, &base1) in positions.iter().enumerate() {
                    // base 2 restarts at base 1 when moving a "second" node
                    let base2_candidates: &[usize] = if self.is_first[node] {
                        positions
                    } else {
                        &positions[pos1..]
                    };
                    for &base2 in base2_candidates {
                        if base1 == node || base1 == sibling || base2 == node || base2 == sibling
                        {
                            continue;
                        }
                        let mut rewirer = Rewirer::new(model, assignment);
                        if rewirer.relocate(sibling, base1) && rewirer.relocate(node, base2) {
                            if let Some(delta) = rewirer.finish() {
                                neighbors.push(delta);
                            }
                        }
                    }
                }
            }
        }
        neighbors
    }
}

// ----- large-neighborhood operators -----

/// Relaxes whole routes, letting the repair step rebuild them.
pub struct PathLnsOperator;

impl NeighborhoodOperator for PathLnsOperator {
    fn name(&self) -> &'static str {
        "PathLns"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let hi = model.num_indices() - 1;
        let mut neighbors = Vec::new();
        let relax_path = |delta: &mut Delta, path: &[usize]| {
            for &index in &path[..path.len().saturating_sub(1)] {
                delta.relax(index, 0, hi);
            }
        };
        for path in &paths {
            let mut delta = Delta::new();
            relax_path(&mut delta, path);
            neighbors.push(delta);
        }
        for p1 in 0..paths.len() {
            for p2 in (p1 + 1)..paths.len() {
                let mut delta = Delta::new();
                relax_path(&mut delta, &paths[p1]);
                relax_path(&mut delta, &paths[p2]);
                neighbors.push(delta);
            }
        }
        neighbors
    }
}

/// Relaxes all inactive nodes together with one route.
pub struct UnactiveLnsOperator;

impl NeighborhoodOperator for UnactiveLnsOperator {
    fn name(&self) -> &'static str {
        "UnactiveLns"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let inactive = inactive_indices(model, assignment);
        let hi = model.num_indices() - 1;
        let mut neighbors = Vec::new();
        for path in &paths {
            let mut delta = Delta::new();
            for &index in &path[..path.len().saturating_sub(1)] {
                delta.relax(index, 0, hi);
            }
            for &index in &inactive {
                delta.relax(index, 0, hi);
            }
            if !delta.is_empty() {
                neighbors.push(delta);
            }
        }
        neighbors
    }
}

/// Exhaustive intra-route improvement: emits the best 2-opt ordering of
/// each route as a single move.
pub struct TspOptOperator;

impl NeighborhoodOperator for TspOptOperator {
    fn name(&self) -> &'static str {
        "TspOpt"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let mut neighbors = Vec::new();
        for path in &paths {
            if path.len() < 5 {
                continue;
            }
            let mut order = path.clone();
            let mut improved = true;
            while improved {
                improved = false;
                for i in 0..order.len() - 3 {
                    for j in (i + 2)..order.len() - 1 {
                        let removed = model.homogeneous_cost(order[i], order[i + 1])
                            + model.homogeneous_cost(order[j], order[j + 1]);
                        let added = model.homogeneous_cost(order[i], order[j])
                            + model.homogeneous_cost(order[i + 1], order[j + 1]);
                        if added < removed {
                            order[i + 1..=j].reverse();
                            improved = true;
                        }
                    }
                }
            }
            if order != *path {
                let mut rewirer = Rewirer::new(model, assignment);
                for window in order.windows(2) {
                    rewirer.set_next(window[0], window[1]);
                }
                if let Some(delta) = rewirer.finish() {
                    neighbors.push(delta);
                }
            }
        }
        neighbors
    }
}

/// Relaxes one route at a time for a full rebuild by the repair step.
pub struct TspLnsOperator;

impl NeighborhoodOperator for TspLnsOperator {
    fn name(&self) -> &'static str {
        "TspLns"
    }

    fn make_neighbors(
        &mut self,
        model: &RoutingModel,
        assignment: &RoutingAssignment,
    ) -> Vec<Delta> {
        let paths = vehicle_paths(model, assignment);
        let hi = model.num_indices() - 1;
        let mut neighbors = Vec::new();
        for path in &paths {
            // rebuilding needs at least two visits to be useful
            if path.len() < 4 {
                continue;
            }
            let mut delta = Delta::new();
            for &index in &path[..path.len() - 1] {
                delta.relax(index, 0, hi);
            }
            neighbors.push(delta);
        }
        neighbors
    }
}

/// Composes the neighborhoods enabled by the model's configuration, in the
/// order they are tried.
pub fn build_operators(model: &RoutingModel) -> Vec<Box<dyn NeighborhoodOperator>> {
    let config = model.config();
    let mut operators: Vec<Box<dyn NeighborhoodOperator>> = Vec::new();
    let has_pairs = !model.pickup_delivery_pairs().is_empty();
    let annealing_like = config.tabu_search || config.simulated_annealing;
    if has_pairs {
        operators.push(Box::new(PairRelocateOperator::new(model)));
    }
    if model.num_vehicles() > 1 {
        if !config.no_relocate {
            operators.push(Box::new(RelocateOperator));
        }
        if !config.no_exchange {
            operators.push(Box::new(ExchangeOperator));
        }
        if !config.no_cross {
            operators.push(Box::new(CrossOperator));
        }
    }
    if !config.no_lkh && !annealing_like {
        operators.push(Box::new(LinKernighanOperator));
    }
    if !config.no_2opt {
        operators.push(Box::new(TwoOptOperator));
    }
    if !config.no_oropt {
        operators.push(Box::new(OrOptOperator));
    }
    if !config.no_make_active && !model.disjunctions().is_empty() {
        operators.push(Box::new(MakeInactiveOperator));
        if has_pairs {
            operators.push(Box::new(MakePairActiveOperator));
        } else {
            operators.push(Box::new(MakeActiveOperator));
        }
        if config.use_extended_swap_active {
            operators.push(Box::new(ExtendedSwapActiveOperator));
        } else {
            operators.push(Box::new(SwapActiveOperator));
        }
    }
    if !config.no_tsp && !annealing_like {
        operators.push(Box::new(TspOptOperator));
    }
    if !config.no_tsplns && !annealing_like {
        operators.push(Box::new(TspLnsOperator));
    }
    if !config.no_lns {
        operators.push(Box::new(PathLnsOperator));
        if !model.disjunctions().is_empty() {
            operators.push(Box::new(UnactiveLnsOperator));
        }
    }
    operators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matrix_evaluator;
    use crate::search::delta::DeltaElement;

    fn line_model(vehicles: usize) -> RoutingModel {
        let mut model = RoutingModel::with_depot(4, vehicles, 0);
        model.set_cost(matrix_evaluator(vec![
            vec![0, 1, 2, 3],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![3, 2, 1, 0],
        ]));
        model
    }

    fn assignment_from_routes(
        model: &mut RoutingModel,
        routes: &[Vec<usize>],
    ) -> RoutingAssignment {
        model
            .read_assignment_from_routes(routes, false)
            .expect("valid routes")
    }

    fn apply(model: &RoutingModel, assignment: &RoutingAssignment, delta: &Delta) -> RoutingAssignment {
        let mut applied = assignment.clone();
        for &(index, element) in &delta.elements {
            match element {
                DeltaElement::Fixed(value) => applied.set_next(index, value),
                DeltaElement::Range(..) => panic!("fixed move expected"),
            }
        }
        applied
    }

    #[test]
    fn test_relocate_generates_valid_moves() {
        let mut model = line_model(2);
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 2], vec![3]]);
        let neighbors = RelocateOperator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
        }
    }

    #[test]
    fn test_exchange_generates_valid_moves() {
        let mut model = line_model(2);
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 2], vec![3]]);
        let neighbors = ExchangeOperator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
        }
    }

    #[test]
    fn test_two_opt_reverses_segment() {
        let mut model = line_model(1);
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 2, 3]]);
        let neighbors = TwoOptOperator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
        }
    }

    #[test]
    fn test_cross_swaps_tails() {
        let mut model = line_model(2);
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1], vec![2, 3]]);
        let neighbors = CrossOperator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
        }
    }

    #[test]
    fn test_make_pair_active_orders_pair() {
        let mut model = line_model(1);
        model
            .add_disjunction_with_penalty(&[1], 100)
            .expect("open model");
        model
            .add_disjunction_with_penalty(&[2], 100)
            .expect("open model");
        model.add_pickup_and_delivery(1, 2).expect("open model");
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![3]]);
        let pair = model.pickup_delivery_pairs()[0];
        let mut operator = MakePairActiveOperator;
        assert!(operator.on_same_path_as_previous_base(1));
        let neighbors = operator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
            // the pickup always precedes the delivery on the route
            let routes = model.assignment_to_routes(&applied).expect("closed routes");
            let route = &routes[0];
            let pickup_pos = route
                .iter()
                .position(|&n| n == model.index_to_node(pair.0))
                .expect("pickup on route");
            let delivery_pos = route
                .iter()
                .position(|&n| n == model.index_to_node(pair.1))
                .expect("delivery on route");
            assert!(pickup_pos < delivery_pos, "move {delta:?} broke precedence");
        }
    }

    #[test]
    fn test_pair_relocate_same_path_quirk() {
        let model = {
            let mut model = line_model(1);
            model.add_pickup_and_delivery(1, 2).expect("open model");
            model
        };
        let operator = PairRelocateOperator::new(&model);
        // only the third base node is pinned to the previous base's path
        assert!(!operator.on_same_path_as_previous_base(0));
        assert!(!operator.on_same_path_as_previous_base(1));
        assert!(operator.on_same_path_as_previous_base(2));
    }

    #[test]
    fn test_pair_relocate_moves_both() {
        let mut model = line_model(2);
        model.add_pickup_and_delivery(1, 2).expect("open model");
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 2], vec![3]]);
        let mut operator = PairRelocateOperator::new(&model);
        let neighbors = operator.make_neighbors(&model, &assignment);
        assert!(!neighbors.is_empty());
        for delta in &neighbors {
            let applied = apply(&model, &assignment, delta);
            assert!(model.check_assignment(&applied), "invalid move {delta:?}");
            // both pair nodes stay active and on the same route
            let routes = model.assignment_to_routes(&applied).expect("closed routes");
            let on_same_route = routes
                .iter()
                .any(|route| route.contains(&1) && route.contains(&2));
            assert!(on_same_route, "move {delta:?} split the pair");
        }
    }

    #[test]
    fn test_make_inactive_respects_mandatory() {
        let mut model = line_model(1);
        model
            .add_disjunction_with_penalty(&[1, 2], 5)
            .expect("open model");
        model.add_disjunction(&[3]).expect("open model");
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 3]]);
        let neighbors = MakeInactiveOperator.make_neighbors(&model, &assignment);
        // node 3 is mandatory (single-node disjunction), only node 1 moves
        for delta in &neighbors {
            assert_eq!(delta.lookup(3), None);
        }
        assert!(!neighbors.is_empty());
    }

    #[test]
    fn test_path_lns_relaxes() {
        let mut model = line_model(2);
        model.close_model();
        let assignment = assignment_from_routes(&mut model, &[vec![1, 2], vec![3]]);
        let neighbors = PathLnsOperator.make_neighbors(&model, &assignment);
        // two single-route deltas plus the pair
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.iter().all(Delta::is_lns));
    }

    #[test]
    fn test_build_operators_respects_flags() {
        let mut model = line_model(2);
        {
            let model_config = model.config().clone();
            assert!(!model_config.no_relocate);
        }
        model.close_model();
        let names: Vec<&str> = build_operators(&model)
            .iter()
            .map(|operator| operator.name())
            .collect();
        assert!(names.contains(&"Relocate"));
        assert!(names.contains(&"TwoOpt"));
        // no disjunctions: no activity operators
        assert!(!names.contains(&"MakeActive"));
        // TSP neighborhoods are off by default
        assert!(!names.contains(&"TspOpt"));
    }
}
