//! Vehicle routing model.
//!
//! A VRP formulation over a dense integer index space: indices `[0, size)`
//! carry next/active variables, each vehicle contributes a start and an end
//! index, and ends form the contiguous tail of the space. Costs are
//! class-cached per arc, quantities accumulated along routes live in
//! [`Dimension`]s, optional nodes are grouped into [`Disjunction`]s, and
//! pickup/delivery pairs constrain nodes onto shared routes.
//!
//! - [`RoutingModel`] — the model and its lifecycle (open → closed → solved)
//! - [`RoutingAssignment`] — a (partial) assignment of the model variables
//! - [`Dimension`] — a named cumulative quantity with transits and slack
//! - evaluator helpers in [`matrix_evaluator`], [`vector_evaluator`],
//!   [`constant_evaluator`], [`euclidean_evaluator`]

mod assignment;
mod cache;
mod dimension;
mod evaluators;

pub use assignment::RoutingAssignment;
pub use cache::{maybe_cached, CostCacheElement, RoutingCache};
pub use dimension::Dimension;
pub use evaluators::{
    constant_evaluator, euclidean_evaluator, matrix_evaluator, vector_evaluator,
};

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, warn};

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::search::SearchConfig;

/// External node identifier.
pub type NodeIndex = usize;

/// Arc evaluator over external node ids.
pub type NodeEvaluator = Rc<dyn Fn(NodeIndex, NodeIndex) -> i64>;

/// Arc evaluator over internal variable indices.
pub type IndexEvaluator = Rc<dyn Fn(usize, usize) -> i64>;

/// Per-vehicle evaluator (e.g. capacities).
pub type VehicleEvaluator = Rc<dyn Fn(usize) -> i64>;

/// Penalty value marking a mandatory disjunction.
pub const NO_PENALTY: i64 = -1;

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingStatus {
    /// No search has run yet.
    NotSolved,
    /// A solution was collected.
    Success,
    /// Search finished without a feasible solution.
    Fail,
    /// A limit fired before any solution was collected.
    FailTimeout,
}

/// An exclusive-or set of indices with an optional penalty charged when all
/// are inactive. Penalty [`NO_PENALTY`] means exactly one must be active.
#[derive(Debug, Clone)]
pub struct Disjunction {
    /// Member indices.
    pub indices: Vec<usize>,
    /// Penalty, or [`NO_PENALTY`] for a mandatory disjunction.
    pub penalty: i64,
}

/// Vehicles sharing start node, end node and cost class are interchangeable
/// for route-constructing heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleClass {
    /// Start node.
    pub start_node: NodeIndex,
    /// End node.
    pub end_node: NodeIndex,
    /// Cost class shared by the vehicles.
    pub cost_class: i64,
    /// Internal index of the start depot.
    pub start_index: usize,
    /// Internal index of the end depot.
    pub end_index: usize,
    /// Dense class index.
    pub class_index: usize,
}

/// The vehicle routing model.
///
/// # Examples
///
/// ```
/// use cproute::routing::{matrix_evaluator, RoutingModel, RoutingStatus};
///
/// // depot 0 and two visits on a line
/// let mut model = RoutingModel::new(3, 1, &[(0, 0)]);
/// model.set_cost(matrix_evaluator(vec![
///     vec![0, 1, 2],
///     vec![1, 0, 1],
///     vec![2, 1, 0],
/// ]));
/// model.close_model();
/// assert_eq!(model.solve(None), RoutingStatus::Success);
/// let routes = model
///     .assignment_to_routes(model.best_assignment().unwrap())
///     .unwrap();
/// assert_eq!(routes.len(), 1);
/// ```
pub struct RoutingModel {
    nodes: usize,
    vehicles: usize,
    starts: Vec<usize>,
    ends: Vec<usize>,
    index_to_node: Vec<NodeIndex>,
    node_to_index: Vec<Option<usize>>,
    index_to_vehicle: Vec<Option<usize>>,
    size: usize,

    nexts: Vec<Domain>,
    vehicle_vars: Vec<Domain>,
    actives: Vec<Domain>,

    costs: Vec<NodeEvaluator>,
    cost_evaluator_keys: Vec<NodeEvaluator>,
    vehicle_cost_classes: Vec<i64>,
    fixed_costs: Vec<i64>,
    cost_cache: RefCell<Vec<CostCacheElement>>,
    homogeneous: bool,

    dimensions: Vec<Dimension>,
    disjunctions: Vec<Disjunction>,
    node_to_disjunction: Vec<Option<usize>>,
    pickup_delivery_pairs: Vec<(usize, usize)>,
    coordinates: Option<Vec<(f64, f64)>>,

    locks: Vec<(usize, usize)>,
    first_solution_evaluator: Option<IndexEvaluator>,
    config: SearchConfig,
    closed: bool,
    status: RoutingStatus,
    best: Option<RoutingAssignment>,
}

impl RoutingModel {
    /// Creates a model with `nodes` external nodes, `vehicles` vehicles and
    /// one `(start, end)` node pair per vehicle, under the default
    /// [`SearchConfig`].
    pub fn new(nodes: usize, vehicles: usize, start_ends: &[(NodeIndex, NodeIndex)]) -> Self {
        Self::with_config(nodes, vehicles, start_ends, SearchConfig::default())
    }

    /// Creates a model where every vehicle starts and ends at `depot`.
    pub fn with_depot(nodes: usize, vehicles: usize, depot: NodeIndex) -> Self {
        let start_ends = vec![(depot, depot); vehicles];
        Self::new(nodes, vehicles, &start_ends)
    }

    /// Creates a model with an explicit search configuration.
    pub fn with_config(
        nodes: usize,
        vehicles: usize,
        start_ends: &[(NodeIndex, NodeIndex)],
        config: SearchConfig,
    ) -> Self {
        assert_eq!(vehicles, start_ends.len(), "one start/end pair per vehicle");
        let mut depot_set = HashSet::new();
        for &(start, end) in start_ends {
            assert!(start < nodes && end < nodes, "start/end out of node range");
            depot_set.insert(start);
            depot_set.insert(end);
        }
        let size = nodes + vehicles - depot_set.len();

        // Index layout: visit nodes (plus first-use starts) first, duplicate
        // starts next, ends as the contiguous tail.
        let is_start_node: HashSet<NodeIndex> = start_ends.iter().map(|&(s, _)| s).collect();
        let is_end_node: HashSet<NodeIndex> = start_ends.iter().map(|&(_, e)| e).collect();
        let mut index_to_node = vec![0; size + vehicles];
        let mut node_to_index = vec![None; nodes];
        let mut index = 0;
        for node in 0..nodes {
            if is_start_node.contains(&node) || !is_end_node.contains(&node) {
                index_to_node[index] = node;
                node_to_index[node] = Some(index);
                index += 1;
            }
        }
        let mut index_to_vehicle = vec![None; size + vehicles];
        let mut starts = vec![0; vehicles];
        let mut used_start_nodes = HashSet::new();
        for (vehicle, &(start, _)) in start_ends.iter().enumerate() {
            if used_start_nodes.insert(start) {
                let start_index = node_to_index[start].expect("start node is indexed");
                starts[vehicle] = start_index;
                index_to_vehicle[start_index] = Some(vehicle);
            } else {
                starts[vehicle] = index;
                index_to_node[index] = start;
                index_to_vehicle[index] = Some(vehicle);
                index += 1;
            }
        }
        let mut ends = vec![0; vehicles];
        for (vehicle, &(_, end)) in start_ends.iter().enumerate() {
            index_to_node[index] = end;
            ends[vehicle] = index;
            index_to_vehicle[index] = Some(vehicle);
            index += 1;
        }
        debug_assert_eq!(index, size + vehicles);

        // Next domains: all indices except vehicle starts.
        let mut next_domain = Domain::interval(0, (size + vehicles) as i64 - 1);
        for &start in &starts {
            next_domain.remove_value(start as i64);
        }
        let nexts = vec![next_domain; size];
        let vehicle_vars = vec![Domain::interval(-1, vehicles as i64 - 1); size + vehicles];
        let actives = vec![Domain::boolean(); size];

        debug!("routing model: {nodes} nodes, {vehicles} vehicles, {size} next variables");

        Self {
            nodes,
            vehicles,
            starts,
            ends,
            index_to_node,
            node_to_index,
            index_to_vehicle,
            size,
            nexts,
            vehicle_vars,
            actives,
            costs: Vec::new(),
            cost_evaluator_keys: Vec::new(),
            vehicle_cost_classes: vec![-1; vehicles],
            fixed_costs: vec![0; vehicles],
            cost_cache: RefCell::new(vec![CostCacheElement::unset(); size]),
            homogeneous: config.use_homogeneous_costs,
            dimensions: Vec::new(),
            disjunctions: Vec::new(),
            node_to_disjunction: vec![None; size],
            pickup_delivery_pairs: Vec::new(),
            coordinates: None,
            locks: Vec::new(),
            first_solution_evaluator: None,
            config,
            closed: false,
            status: RoutingStatus::NotSolved,
            best: None,
        }
    }

    // ----- index space -----

    /// Number of next variables (visit and start indices).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of indices, vehicle ends included.
    pub fn num_indices(&self) -> usize {
        self.size + self.vehicles
    }

    /// Number of external nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes
    }

    /// Number of vehicles.
    pub fn num_vehicles(&self) -> usize {
        self.vehicles
    }

    /// Start index of `vehicle`.
    pub fn start(&self, vehicle: usize) -> usize {
        self.starts[vehicle]
    }

    /// End index of `vehicle`.
    pub fn end(&self, vehicle: usize) -> usize {
        self.ends[vehicle]
    }

    /// The depot index, taken from the first vehicle.
    pub fn depot(&self) -> Option<usize> {
        (self.vehicles > 0).then(|| self.start(0))
    }

    /// Returns `true` for vehicle start indices.
    pub fn is_start(&self, index: usize) -> bool {
        !self.is_end(index) && self.index_to_vehicle[index].is_some()
    }

    /// Returns `true` for vehicle end indices (the contiguous tail).
    pub fn is_end(&self, index: usize) -> bool {
        index >= self.size
    }

    /// The vehicle owning a start or end index.
    pub fn index_to_vehicle(&self, index: usize) -> Option<usize> {
        self.index_to_vehicle[index]
    }

    /// The external node of an index.
    pub fn index_to_node(&self, index: usize) -> NodeIndex {
        self.index_to_node[index]
    }

    /// The index of a visit node. Start/end indices map back to their node
    /// but the reverse map is only defined on nodes appearing as a visit
    /// index.
    pub fn node_to_index(&self, node: NodeIndex) -> Result<usize> {
        if node >= self.nodes {
            return Err(Error::InvalidNode(node as i64));
        }
        self.node_to_index[node]
            .ok_or(Error::InvalidNode(node as i64))
    }

    // ----- variables -----

    /// Candidate successors of `index`.
    pub fn next_domain(&self, index: usize) -> &Domain {
        &self.nexts[index]
    }

    /// Vehicle domain of `index`.
    pub fn vehicle_domain(&self, index: usize) -> &Domain {
        &self.vehicle_vars[index]
    }

    /// Returns `true` if `index` may be active.
    pub fn can_be_active(&self, index: usize) -> bool {
        self.is_start(index) || self.actives[index].max() != Some(0)
    }

    /// Returns `true` if `index` must be active.
    pub fn must_be_active(&self, index: usize) -> bool {
        self.is_start(index) || self.actives[index].min() == Some(1)
    }

    /// Forbids `vehicle` from serving `index`.
    pub fn forbid_vehicle(&mut self, index: usize, vehicle: usize) -> Result<()> {
        if self.closed {
            return Err(Error::ModelClosed);
        }
        self.vehicle_vars[index].remove_value(vehicle as i64);
        Ok(())
    }

    /// Deactivates `index` permanently.
    pub fn deactivate(&mut self, index: usize) -> Result<()> {
        if self.closed {
            return Err(Error::ModelClosed);
        }
        self.actives[index].fix(0);
        Ok(())
    }

    // ----- costs -----

    /// Sets a homogeneous arc cost evaluator for every vehicle.
    pub fn set_cost(&mut self, evaluator: NodeEvaluator) {
        assert!(self.vehicles > 0, "cost needs at least one vehicle");
        self.homogeneous = self.config.use_homogeneous_costs;
        for vehicle in 0..self.vehicles {
            self.set_vehicle_cost_internal(vehicle, Rc::clone(&evaluator));
        }
    }

    /// Sets a per-vehicle cost evaluator, switching the model to
    /// class-indexed cost lookups.
    pub fn set_vehicle_cost(&mut self, vehicle: usize, evaluator: NodeEvaluator) {
        self.homogeneous = false;
        self.set_vehicle_cost_internal(vehicle, evaluator);
    }

    fn set_vehicle_cost_internal(&mut self, vehicle: usize, evaluator: NodeEvaluator) {
        assert!(vehicle < self.vehicles);
        assert_eq!(
            self.vehicle_cost_classes[vehicle], -1,
            "vehicle cost already set for {vehicle}"
        );
        let existing = self
            .cost_evaluator_keys
            .iter()
            .position(|key| Rc::ptr_eq(key, &evaluator));
        match existing {
            Some(class) => self.vehicle_cost_classes[vehicle] = class as i64,
            None => {
                let class = self.costs.len() as i64;
                self.vehicle_cost_classes[vehicle] = class;
                self.cost_evaluator_keys.push(Rc::clone(&evaluator));
                self.costs.push(maybe_cached(
                    evaluator,
                    self.nodes,
                    self.config.cache_callbacks,
                    self.config.max_cache_size,
                ));
            }
        }
    }

    /// Sets the same fixed cost on every vehicle.
    pub fn set_fixed_cost(&mut self, cost: i64) {
        for vehicle in 0..self.vehicles {
            self.fixed_costs[vehicle] = cost;
        }
    }

    /// Sets the fixed cost of one vehicle.
    pub fn set_vehicle_fixed_cost(&mut self, vehicle: usize, cost: i64) {
        self.fixed_costs[vehicle] = cost;
    }

    /// The fixed cost of a vehicle.
    pub fn vehicle_fixed_cost(&self, vehicle: usize) -> i64 {
        self.fixed_costs[vehicle]
    }

    /// Whether the model uses a single cost class.
    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous
    }

    /// The cost class of a vehicle, −1 when no cost was set.
    pub fn vehicle_cost_class(&self, vehicle: usize) -> i64 {
        self.vehicle_cost_classes[vehicle]
    }

    /// Arc cost for a cost class, memoised in the per-index slot cache.
    ///
    /// The first arc of an occupied route also carries the vehicle fixed
    /// cost; an empty route (start directly to end) costs 0.
    pub fn arc_cost(&self, from: usize, to: usize, cost_class: i64) -> i64 {
        if cost_class < 0 {
            return 0;
        }
        {
            let cache = self.cost_cache.borrow();
            let slot = &cache[from];
            if slot.node == to as i64 && slot.cost_class == cost_class {
                return slot.cost;
            }
        }
        let node_from = self.index_to_node[from];
        let node_to = self.index_to_node[to];
        let cost = if !self.is_start(from) {
            (self.costs[cost_class as usize])(node_from, node_to)
        } else if !self.is_end(to) {
            (self.costs[cost_class as usize])(node_from, node_to)
                + self.fixed_costs[self.index_to_vehicle[from].expect("start has a vehicle")]
        } else {
            0
        };
        let mut cache = self.cost_cache.borrow_mut();
        cache[from] = CostCacheElement {
            node: to as i64,
            cost_class,
            cost,
        };
        cost
    }

    /// Arc cost for a vehicle. Self arcs and unassigned vehicles cost 0.
    pub fn cost(&self, from: usize, to: usize, vehicle: i64) -> i64 {
        if from != to && vehicle >= 0 {
            self.arc_cost(from, to, self.vehicle_cost_classes[vehicle as usize])
        } else {
            0
        }
    }

    /// Arc cost under the first vehicle's cost class.
    pub fn homogeneous_cost(&self, from: usize, to: usize) -> i64 {
        self.cost(from, to, 0)
    }

    /// Arc cost for first-solution heuristics: prohibitive when jumping to
    /// a vehicle end so heuristics fill routes with visits first.
    pub fn first_solution_cost(&self, from: usize, to: usize) -> i64 {
        if to < self.size {
            self.homogeneous_cost(from, to)
        } else {
            i64::MAX
        }
    }

    /// Number of distinct cost classes.
    pub fn cost_class_count(&self) -> usize {
        self.costs.len()
    }

    /// The distinct `(start node, end node, cost class)` classes, in a
    /// deterministic order with dense class indices.
    pub fn vehicle_classes(&self) -> Vec<VehicleClass> {
        let mut all: Vec<VehicleClass> = (0..self.vehicles)
            .map(|vehicle| VehicleClass {
                start_node: self.index_to_node[self.starts[vehicle]],
                end_node: self.index_to_node[self.ends[vehicle]],
                cost_class: self.vehicle_cost_classes[vehicle],
                start_index: self.starts[vehicle],
                end_index: self.ends[vehicle],
                class_index: 0,
            })
            .collect();
        all.sort_by_key(|class| (class.start_node, class.end_node, class.cost_class));
        all.dedup_by(|a, b| {
            a.start_node == b.start_node && a.end_node == b.end_node && a.cost_class == b.cost_class
        });
        for (class_index, class) in all.iter_mut().enumerate() {
            class.class_index = class_index;
        }
        all
    }

    // ----- dimensions -----

    /// Installs a dimension accumulated by `evaluator` with a scalar
    /// capacity.
    pub fn add_dimension(
        &mut self,
        evaluator: NodeEvaluator,
        slack_max: i64,
        capacity: i64,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        self.add_dimension_internal(
            evaluator,
            slack_max,
            capacity,
            None,
            fix_start_to_zero,
            name,
        )
    }

    /// Installs a dimension with a per-vehicle capacity evaluator.
    pub fn add_dimension_with_vehicle_capacity(
        &mut self,
        evaluator: NodeEvaluator,
        slack_max: i64,
        vehicle_capacity: VehicleEvaluator,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        self.add_dimension_internal(
            evaluator,
            slack_max,
            i64::MAX / 4,
            Some(vehicle_capacity),
            fix_start_to_zero,
            name,
        )
    }

    /// Installs a dimension whose every arc transit is `value`.
    pub fn add_constant_dimension(
        &mut self,
        value: i64,
        capacity: i64,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        self.add_dimension(constant_evaluator(value), 0, capacity, fix_start_to_zero, name)
    }

    /// Installs a dimension reading per-node transit values.
    pub fn add_vector_dimension(
        &mut self,
        values: Vec<i64>,
        capacity: i64,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        self.add_dimension(vector_evaluator(values), 0, capacity, fix_start_to_zero, name)
    }

    /// Installs a dimension reading a full transit matrix.
    pub fn add_matrix_dimension(
        &mut self,
        values: Vec<Vec<i64>>,
        capacity: i64,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        self.add_dimension(matrix_evaluator(values), 0, capacity, fix_start_to_zero, name)
    }

    fn add_dimension_internal(
        &mut self,
        evaluator: NodeEvaluator,
        slack_max: i64,
        capacity: i64,
        vehicle_capacity: Option<VehicleEvaluator>,
        fix_start_to_zero: bool,
        name: &str,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ModelClosed);
        }
        if self.dimension(name).is_some() {
            return Err(Error::TypeError(format!("dimension {name} already exists")));
        }
        let cached = maybe_cached(
            evaluator,
            self.nodes,
            self.config.cache_callbacks,
            self.config.max_cache_size,
        );
        let index_to_node = self.index_to_node.clone();
        let transit: IndexEvaluator =
            Rc::new(move |from, to| cached(index_to_node[from], index_to_node[to]));
        self.dimensions.push(Dimension::new(
            name.to_string(),
            transit,
            slack_max,
            capacity,
            vehicle_capacity,
            fix_start_to_zero,
            self.num_indices(),
        ));
        Ok(())
    }

    /// The installed dimensions, in insertion order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Looks a dimension up by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Mutable dimension access (e.g. to set time windows).
    pub fn dimension_mut(&mut self, name: &str) -> Option<&mut Dimension> {
        self.dimensions.iter_mut().find(|d| d.name == name)
    }

    /// The transit of arc `(from, to)` in the named dimension, 0 when the
    /// dimension does not exist.
    pub fn transit_value(&self, name: &str, from: usize, to: usize) -> i64 {
        self.dimension(name)
            .map_or(0, |d| d.transit_value(from, to))
    }

    // ----- disjunctions and pairs -----

    /// Registers a mandatory disjunction: exactly one node must be active.
    pub fn add_disjunction(&mut self, nodes: &[NodeIndex]) -> Result<usize> {
        self.add_disjunction_internal(nodes, NO_PENALTY)
    }

    /// Registers a disjunction with a penalty charged when all nodes end up
    /// inactive.
    pub fn add_disjunction_with_penalty(
        &mut self,
        nodes: &[NodeIndex],
        penalty: i64,
    ) -> Result<usize> {
        assert!(penalty >= 0, "penalty must be positive");
        self.add_disjunction_internal(nodes, penalty)
    }

    fn add_disjunction_internal(&mut self, nodes: &[NodeIndex], penalty: i64) -> Result<usize> {
        if self.closed {
            return Err(Error::ModelClosed);
        }
        let disjunction_index = self.disjunctions.len();
        let mut indices = Vec::with_capacity(nodes.len());
        for &node in nodes {
            let index = self.node_to_index(node)?;
            indices.push(index);
            self.node_to_disjunction[index] = Some(disjunction_index);
        }
        self.disjunctions.push(Disjunction { indices, penalty });
        Ok(disjunction_index)
    }

    /// The registered disjunctions.
    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    /// The disjunction containing `index`, if any.
    pub fn disjunction_of(&self, index: usize) -> Option<usize> {
        if index < self.size {
            self.node_to_disjunction[index]
        } else {
            None
        }
    }

    /// The member indices of the disjunction containing `index`
    /// (`index` included), or empty when it belongs to none.
    pub fn disjunction_members(&self, index: usize) -> Vec<usize> {
        match self.disjunction_of(index) {
            Some(d) => self.disjunctions[d].indices.clone(),
            None => Vec::new(),
        }
    }

    /// Registers a pickup/delivery pair of nodes constrained to the same
    /// route with pickup before delivery.
    pub fn add_pickup_and_delivery(
        &mut self,
        pickup: NodeIndex,
        delivery: NodeIndex,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::ModelClosed);
        }
        let pickup = self.node_to_index(pickup)?;
        let delivery = self.node_to_index(delivery)?;
        self.pickup_delivery_pairs.push((pickup, delivery));
        Ok(())
    }

    /// The registered pickup/delivery index pairs.
    pub fn pickup_delivery_pairs(&self) -> &[(usize, usize)] {
        &self.pickup_delivery_pairs
    }

    /// Sets the index evaluator ordering decisions of the
    /// `EvaluatorStrategy` first-solution heuristic.
    pub fn set_first_solution_evaluator(&mut self, evaluator: IndexEvaluator) {
        self.first_solution_evaluator = Some(evaluator);
    }

    /// The user-supplied first-solution evaluator, if any.
    pub fn first_solution_evaluator(&self) -> Option<&IndexEvaluator> {
        self.first_solution_evaluator.as_ref()
    }

    /// Node coordinates used by the sweep heuristic.
    pub fn set_node_coordinates(&mut self, points: Vec<(f64, f64)>) {
        self.coordinates = Some(points);
    }

    /// The node coordinates, if set.
    pub fn node_coordinates(&self) -> Option<&[(f64, f64)]> {
        self.coordinates.as_deref()
    }

    // ----- lifecycle -----

    /// Whether the model is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rebuilds the global and local-search deadlines in place so running
    /// searches observe the new value.
    pub fn update_time_limit(&mut self, time_limit_ms: u64) {
        self.config.time_limit_ms = time_limit_ms;
    }

    /// Rebuilds the LNS sub-search deadline in place.
    pub fn update_lns_time_limit(&mut self, lns_time_limit_ms: u64) {
        self.config.lns_time_limit_ms = lns_time_limit_ms;
    }

    /// Closes the model: installs the structural constraints and freezes
    /// the variable set. Idempotent.
    pub fn close_model(&mut self) {
        if self.closed {
            warn!("model already closed");
            return;
        }
        self.closed = true;

        // A start never follows another vehicle's route end.
        for vehicle in 0..self.vehicles {
            for other in 0..self.vehicles {
                if vehicle != other {
                    self.nexts[self.starts[vehicle]].remove_value(self.ends[other] as i64);
                }
            }
            // Start and end indices belong to their vehicle.
            self.vehicle_vars[self.starts[vehicle]].fix(vehicle as i64);
            self.vehicle_vars[self.ends[vehicle]].fix(vehicle as i64);
        }

        // Without disjunctions every index is performed.
        if self.disjunctions.is_empty() {
            for index in 0..self.size {
                if self.actives[index].max() != Some(0) {
                    self.actives[index].fix(1);
                }
            }
        }
        // Mandatory single-node disjunctions force the node active.
        for disjunction in &self.disjunctions {
            if disjunction.penalty == NO_PENALTY && disjunction.indices.len() == 1 {
                self.actives[disjunction.indices[0]].fix(1);
            }
        }

        // Permanently inactive indices self-loop.
        for index in 0..self.size {
            if !self.is_start(index) && self.actives[index].max() == Some(0) {
                self.nexts[index].fix(index as i64);
            }
        }

        self.status = RoutingStatus::NotSolved;
    }

    fn quiet_close_model(&mut self) {
        if !self.closed {
            self.close_model();
        }
    }

    /// Runs search and returns the status. The best collected assignment is
    /// available through [`RoutingModel::best_assignment`].
    pub fn solve(&mut self, initial: Option<&RoutingAssignment>) -> RoutingStatus {
        self.quiet_close_model();
        let outcome = crate::search::solve_model(self, initial);
        self.status = match outcome.best {
            Some(assignment) => {
                self.best = Some(assignment);
                RoutingStatus::Success
            }
            None if outcome.limit_reached => RoutingStatus::FailTimeout,
            None => RoutingStatus::Fail,
        };
        self.status
    }

    /// The last solve status.
    pub fn status(&self) -> RoutingStatus {
        self.status
    }

    /// The best assignment collected by the last solve.
    pub fn best_assignment(&self) -> Option<&RoutingAssignment> {
        self.best.as_ref()
    }

    // ----- assignment plumbing -----

    /// Creates an empty assignment sized for this model.
    pub fn new_assignment(&self) -> RoutingAssignment {
        RoutingAssignment::new(self.size, self.vehicles, self.dimensions.len())
    }

    /// Returns `true` if `vehicle` serves at least one visit.
    pub fn is_vehicle_used(&self, assignment: &RoutingAssignment, vehicle: usize) -> bool {
        match assignment.next(self.starts[vehicle]) {
            Some(next) => !self.is_end(next),
            None => false,
        }
    }

    /// The objective value of a complete assignment: arc costs (fixed costs
    /// included on occupied routes) plus the penalties of inactive
    /// disjunctions.
    pub fn objective_value(&self, assignment: &RoutingAssignment) -> i64 {
        let mut total = 0i64;
        for vehicle in 0..self.vehicles {
            let class = self.vehicle_cost_classes[vehicle];
            let mut index = self.starts[vehicle];
            let mut guard = 0;
            while !self.is_end(index) {
                let Some(next) = assignment.next(index) else {
                    break;
                };
                total = total.saturating_add(self.arc_cost(index, next, class));
                index = next;
                guard += 1;
                if guard > self.num_indices() {
                    break;
                }
            }
        }
        for disjunction in &self.disjunctions {
            if disjunction.penalty >= 0 {
                let any_active = disjunction
                    .indices
                    .iter()
                    .any(|&i| !assignment.is_self_assigned(i));
                if !any_active {
                    total = total.saturating_add(disjunction.penalty);
                }
            }
        }
        total
    }

    /// Fills vehicles, cumuls, transits and the cost of an assignment whose
    /// nexts are complete.
    pub fn finalize_assignment(&self, assignment: &mut RoutingAssignment) {
        for value in assignment.vehicles.iter_mut() {
            *value = -1;
        }
        for vehicle in 0..self.vehicles {
            let mut index = self.starts[vehicle];
            assignment.vehicles[index] = vehicle as i64;
            let mut guard = 0;
            while !self.is_end(index) {
                let Some(next) = assignment.next(index) else {
                    break;
                };
                assignment.vehicles[next] = vehicle as i64;
                index = next;
                guard += 1;
                if guard > self.num_indices() {
                    break;
                }
            }
        }
        for (d, dimension) in self.dimensions.iter().enumerate() {
            for value in assignment.cumuls[d].iter_mut() {
                *value = 0;
            }
            for value in assignment.transits[d].iter_mut() {
                *value = 0;
            }
            for vehicle in 0..self.vehicles {
                let start = self.starts[vehicle];
                let mut cumul = if dimension.fix_start_to_zero {
                    0
                } else {
                    dimension.cumul_min[start]
                };
                assignment.cumuls[d][start] = cumul;
                let mut index = start;
                let mut guard = 0;
                while !self.is_end(index) {
                    let Some(next) = assignment.next(index) else {
                        break;
                    };
                    let transit = dimension.transit_value(index, next);
                    assignment.transits[d][index] = transit;
                    cumul = (cumul + transit).max(dimension.cumul_min[next]);
                    assignment.cumuls[d][next] = cumul;
                    index = next;
                    guard += 1;
                    if guard > self.num_indices() {
                        break;
                    }
                }
            }
        }
        assignment.cost = self.objective_value(assignment);
    }

    /// Verifies a complete assignment against the model's constraints.
    pub fn check_assignment(&self, assignment: &RoutingAssignment) -> bool {
        if !assignment.is_complete() {
            return false;
        }
        // Walk all routes, collecting visited indices.
        let mut visited = vec![false; self.num_indices()];
        for vehicle in 0..self.vehicles {
            let mut index = self.starts[vehicle];
            let mut guard = 0;
            visited[index] = true;
            while !self.is_end(index) {
                let Some(next) = assignment.next(index) else {
                    return false;
                };
                if next != index && !self.nexts[index].contains(next as i64) {
                    return false;
                }
                if next == index {
                    // an inactive node inside a route walk means the start
                    // itself self-loops, which is never allowed
                    return false;
                }
                if !self.is_end(next) && visited[next] {
                    return false;
                }
                if !self.is_end(next) && !self.vehicle_vars[next].contains(vehicle as i64) {
                    return false;
                }
                visited[next] = true;
                index = next;
                guard += 1;
                if guard > self.num_indices() {
                    return false;
                }
            }
            if self.index_to_vehicle[index] != Some(vehicle) {
                return false;
            }
        }
        // Unvisited indices must self-loop and be allowed inactive.
        for index in 0..self.size {
            if visited[index] {
                if !self.is_start(index) && self.actives[index].max() == Some(0) {
                    return false;
                }
                continue;
            }
            if assignment.next(index) != Some(index) {
                return false;
            }
            if self.must_be_active(index) {
                return false;
            }
        }
        // Disjunction cardinality.
        for disjunction in &self.disjunctions {
            let active = disjunction
                .indices
                .iter()
                .filter(|&&i| visited[i])
                .count();
            if active > 1 {
                return false;
            }
            if disjunction.penalty == NO_PENALTY && active == 0 {
                return false;
            }
        }
        // Pickup/delivery pairs share a route, pickup first.
        for &(first, second) in &self.pickup_delivery_pairs {
            if visited[first] != visited[second] {
                return false;
            }
            if !visited[first] {
                continue;
            }
            let mut pickup_before_delivery = false;
            for vehicle in 0..self.vehicles {
                let mut index = self.starts[vehicle];
                let mut first_seen = false;
                let mut guard = 0;
                while !self.is_end(index) {
                    if index == first {
                        first_seen = true;
                    }
                    if index == second {
                        pickup_before_delivery = first_seen;
                    }
                    match assignment.next(index) {
                        Some(next) if next != index => index = next,
                        _ => break,
                    }
                    guard += 1;
                    if guard > self.num_indices() {
                        break;
                    }
                }
            }
            if !pickup_before_delivery {
                return false;
            }
        }
        // Dimension feasibility with slack-aware propagation.
        for dimension in &self.dimensions {
            for vehicle in 0..self.vehicles {
                let start = self.starts[vehicle];
                let mut cumul = if dimension.fix_start_to_zero {
                    0
                } else {
                    dimension.cumul_min[start]
                };
                let mut index = start;
                while !self.is_end(index) {
                    let Some(next) = assignment.next(index) else {
                        return false;
                    };
                    let arrival = cumul + dimension.transit_value(index, next);
                    let lifted = arrival.max(dimension.cumul_min[next]);
                    if lifted - arrival > dimension.slack_max {
                        return false;
                    }
                    if lifted > dimension.cumul_max_for(next, vehicle) {
                        return false;
                    }
                    cumul = lifted;
                    index = next;
                }
            }
        }
        true
    }

    // ----- routes <-> assignments -----

    /// Fills `assignment` from one route per vehicle (routes list visit
    /// nodes between, and excluding, the vehicle start and end).
    ///
    /// With `ignore_inactive` nodes whose active domain is `{0}` are
    /// skipped instead of rejected; with `close_routes` every route is
    /// terminated at the vehicle end and unused indices self-loop.
    pub fn routes_to_assignment(
        &self,
        routes: &[Vec<NodeIndex>],
        ignore_inactive: bool,
        close_routes: bool,
        assignment: &mut RoutingAssignment,
    ) -> Result<()> {
        if !self.closed {
            warn!("the model is not closed yet");
            return Err(Error::ModelClosed);
        }
        if routes.len() > self.vehicles {
            warn!(
                "{} routes for {} vehicles",
                routes.len(),
                self.vehicles
            );
            return Err(Error::InvalidIndex(routes.len() as i64));
        }
        let mut visited = HashSet::new();
        for (vehicle, route) in routes.iter().enumerate() {
            let mut from = self.start(vehicle);
            if !visited.insert(from) {
                warn!("index {from} (start of vehicle {vehicle}) already used");
                return Err(Error::DuplicateIndex(from as i64));
            }
            for &node in route {
                if node >= self.nodes {
                    warn!("invalid node {node}");
                    return Err(Error::InvalidNode(node as i64));
                }
                let to = self.node_to_index(node)?;
                if to >= self.size {
                    warn!("invalid index {to} from node {node}");
                    return Err(Error::InvalidIndex(to as i64));
                }
                if self.actives[to].max() == Some(0) {
                    if ignore_inactive {
                        continue;
                    }
                    warn!("index {to} (node {node}) is not active");
                    return Err(Error::InactiveNodeUsed(to as i64));
                }
                if !visited.insert(to) {
                    warn!("index {to} (node {node}) used multiple times");
                    return Err(Error::DuplicateIndex(to as i64));
                }
                if !self.vehicle_vars[to].contains(vehicle as i64) {
                    warn!("vehicle {vehicle} not allowed at index {to} (node {node})");
                    return Err(Error::VehicleNotAllowed { vehicle, index: to });
                }
                assignment.set_next(from, to);
                from = to;
            }
            if close_routes {
                assignment.set_next(from, self.end(vehicle));
            }
        }
        // Remaining vehicles stay empty.
        for vehicle in routes.len()..self.vehicles {
            let start = self.start(vehicle);
            if !visited.insert(start) {
                warn!("index {start} used multiple times");
                return Err(Error::DuplicateIndex(start as i64));
            }
            if close_routes {
                assignment.set_next(start, self.end(vehicle));
            }
        }
        // Deactivate every untouched index.
        if close_routes {
            for index in 0..self.size {
                if !visited.contains(&index) {
                    assignment.set_next(index, index);
                }
            }
        }
        Ok(())
    }

    /// Builds a complete assignment from routes and finalises it.
    pub fn read_assignment_from_routes(
        &mut self,
        routes: &[Vec<NodeIndex>],
        ignore_inactive: bool,
    ) -> Result<RoutingAssignment> {
        self.quiet_close_model();
        let mut assignment = self.new_assignment();
        self.routes_to_assignment(routes, ignore_inactive, true, &mut assignment)?;
        if !self.check_assignment(&assignment) {
            return Err(Error::Infeasible);
        }
        self.finalize_assignment(&mut assignment);
        Ok(assignment)
    }

    /// Converts an assignment into one route per vehicle, in vehicle-index
    /// order; routes list visit nodes and exclude vehicle starts/ends.
    pub fn assignment_to_routes(
        &self,
        assignment: &RoutingAssignment,
    ) -> Result<Vec<Vec<NodeIndex>>> {
        if !self.closed {
            return Err(Error::ModelClosed);
        }
        let mut routes = Vec::with_capacity(self.vehicles);
        for vehicle in 0..self.vehicles {
            let mut route = Vec::new();
            let mut current = assignment
                .next(self.start(vehicle))
                .ok_or(Error::InvalidIndex(self.start(vehicle) as i64))?;
            let mut steps = 0;
            while !self.is_end(current) {
                route.push(self.index_to_node(current));
                current = assignment
                    .next(current)
                    .ok_or(Error::InvalidIndex(current as i64))?;
                steps += 1;
                if steps > self.size {
                    warn!("assignment contains a cycle");
                    return Err(Error::InvalidIndex(current as i64));
                }
            }
            routes.push(route);
        }
        Ok(routes)
    }

    // ----- locks -----

    /// Pins a chain of active indices as the prefix of the single vehicle's
    /// route. Returns the last locked index.
    pub fn apply_locks(&mut self, locks: &[usize]) -> Option<usize> {
        assert_eq!(self.vehicles, 1, "apply_locks expects a single vehicle");
        self.locks.clear();
        let active_locks: Vec<usize> = locks
            .iter()
            .copied()
            .filter(|&index| self.can_be_active(index))
            .collect();
        let mut previous: Option<usize> = None;
        for &index in &active_locks {
            if let Some(from) = previous {
                self.locks.push((from, index));
            }
            previous = Some(index);
        }
        previous
    }

    /// Pins whole routes as preassignments; with `close_routes` the routes
    /// are also terminated.
    pub fn apply_locks_to_all_vehicles(
        &mut self,
        locks: &[Vec<NodeIndex>],
        close_routes: bool,
    ) -> Result<()> {
        let mut assignment = self.new_assignment();
        self.routes_to_assignment(locks, true, close_routes, &mut assignment)?;
        self.locks.clear();
        for (index, next) in assignment.nexts.iter().enumerate() {
            if let Some(next) = next {
                self.locks.push((index, *next));
            }
        }
        Ok(())
    }

    /// The preassigned next arcs.
    pub fn locks(&self) -> &[(usize, usize)] {
        &self.locks
    }

    // ----- compaction -----

    fn route_can_be_used_by_vehicle(
        &self,
        assignment: &RoutingAssignment,
        start_index: usize,
        vehicle: usize,
    ) -> bool {
        let mut current = if self.is_start(start_index) {
            match assignment.next(start_index) {
                Some(next) => next,
                None => return false,
            }
        } else {
            start_index
        };
        while !self.is_end(current) {
            if !self.vehicle_vars[current].contains(vehicle as i64) {
                return false;
            }
            match assignment.next(current) {
                Some(next) if next != current => current = next,
                _ => return false,
            }
        }
        true
    }

    fn replace_unused_vehicle(
        &self,
        unused_vehicle: usize,
        active_vehicle: usize,
        assignment: &mut RoutingAssignment,
    ) {
        let unused_start = self.start(unused_vehicle);
        let unused_end = self.end(unused_vehicle);
        let active_start = self.start(active_vehicle);
        let active_end = self.end(active_vehicle);
        let first = assignment
            .next(active_start)
            .expect("active vehicle has a route");
        assignment.set_next(unused_start, first);
        assignment.set_next(active_start, active_end);

        // Move vehicle values along the route and re-terminate it.
        let mut current = first;
        while !self.is_end(current) {
            assignment.vehicles[current] = unused_vehicle as i64;
            let next = assignment.next(current).expect("route is closed");
            if self.is_end(next) {
                assignment.set_next(current, unused_end);
                break;
            }
            current = next;
        }

        // Swap per-dimension transits at the starts and cumuls at the ends.
        for d in 0..self.dimensions.len() {
            assignment.transits[d].swap(unused_start, active_start);
            assignment.cumuls[d].swap(unused_end, active_end);
        }
        assignment.vehicles[unused_end] = unused_vehicle as i64;
        assignment.vehicles[active_end] = active_vehicle as i64;
    }

    /// Re-orders vehicles so used vehicles occupy a prefix of the vehicle
    /// range, swapping route, cumul and transit variables pairwise.
    ///
    /// Requires homogeneous costs. Returns `None` when compaction is not
    /// possible or the compacted assignment fails verification.
    pub fn compact_assignment(
        &self,
        assignment: &RoutingAssignment,
    ) -> Option<RoutingAssignment> {
        if !self.homogeneous {
            debug!("costs are not homogeneous, routes cannot be rearranged");
            return None;
        }
        let mut compact = assignment.clone();
        for vehicle in 0..self.vehicles.saturating_sub(1) {
            if self.is_vehicle_used(&compact, vehicle) {
                continue;
            }
            let vehicle_start = self.start(vehicle);
            let vehicle_end = self.end(vehicle);
            let mut swap_vehicle = self.vehicles - 1;
            let mut has_more_vehicles_with_route = false;
            while swap_vehicle > vehicle {
                // A vehicle that was already swapped shows up as unused.
                if !self.is_vehicle_used(&compact, swap_vehicle) {
                    swap_vehicle -= 1;
                    continue;
                }
                has_more_vehicles_with_route = true;
                let swap_start = self.start(swap_vehicle);
                let swap_end = self.end(swap_vehicle);
                if self.index_to_node(vehicle_start) != self.index_to_node(swap_start)
                    || self.index_to_node(vehicle_end) != self.index_to_node(swap_end)
                {
                    swap_vehicle -= 1;
                    continue;
                }
                if self.route_can_be_used_by_vehicle(&compact, swap_start, vehicle) {
                    break;
                }
                swap_vehicle -= 1;
            }
            if swap_vehicle == vehicle {
                if has_more_vehicles_with_route {
                    debug!("no vehicle can be swapped with {vehicle}");
                    return None;
                }
                break;
            }
            self.replace_unused_vehicle(vehicle, swap_vehicle, &mut compact);
        }
        if self.config.check_compact_assignment && !self.check_assignment(&compact) {
            debug!("the compacted assignment is not a valid solution");
            return None;
        }
        compact.cost = self.objective_value(&compact);
        Some(compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{FirstSolutionStrategy, SearchConfig};
    use std::cell::Cell;

    fn symmetric(matrix: Vec<Vec<i64>>) -> NodeEvaluator {
        matrix_evaluator(matrix)
    }

    #[test]
    fn test_index_space_shared_depot() {
        let model = RoutingModel::with_depot(3, 2, 0);
        // nodes 0..2, two vehicles at depot 0: 3 + 2 - 1 next variables
        assert_eq!(model.size(), 4);
        assert_eq!(model.num_indices(), 6);
        assert!(model.is_start(model.start(0)));
        assert!(model.is_start(model.start(1)));
        assert!(model.is_end(model.end(0)));
        assert!(model.is_end(model.end(1)));
        // both starts map back to the depot node
        assert_eq!(model.index_to_node(model.start(1)), 0);
        // the reverse map points at a visitable index
        assert_eq!(model.node_to_index(1).unwrap(), 1);
    }

    #[test]
    fn test_is_start_is_end_partition() {
        let model = RoutingModel::new(4, 2, &[(0, 3), (0, 3)]);
        for index in 0..model.num_indices() {
            assert!(!(model.is_start(index) && model.is_end(index)));
            if model.is_end(index) {
                assert!(index >= model.size());
            }
        }
    }

    #[test]
    fn test_empty_route_costs_zero_even_with_fixed_cost() {
        let mut model = RoutingModel::with_depot(3, 2, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 2],
            vec![1, 0, 1],
            vec![2, 1, 0],
        ]));
        model.set_fixed_cost(5);
        model.close_model();
        // start -> end directly: empty route, no fixed cost charged
        assert_eq!(model.arc_cost(model.start(0), model.end(0), 0), 0);
        // first arc of an occupied route carries the fixed cost
        assert_eq!(model.arc_cost(model.start(0), 1, 0), 1 + 5);
    }

    #[test]
    fn test_cost_cache_returns_cached_value() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut model = RoutingModel::with_depot(3, 1, 0);
        model.set_cost(Rc::new(move |from, to| {
            counter.set(counter.get() + 1);
            ((from + 1) * (to + 1)) as i64
        }));
        model.close_model();
        let first = model.arc_cost(1, 2, 0);
        let calls_after_first = calls.get();
        let second = model.arc_cost(1, 2, 0);
        assert_eq!(first, second);
        // the single-slot cache answered the repeat
        assert_eq!(calls.get(), calls_after_first);
        // a different query invalidates the slot
        model.arc_cost(1, 0, 0);
        assert!(calls.get() > calls_after_first);
    }

    #[test]
    fn test_max_cache_size_zero_same_results() {
        let solve_with = |max_cache_size: usize| {
            let config = SearchConfig {
                cache_callbacks: true,
                max_cache_size,
                ..SearchConfig::default()
            };
            let mut model = RoutingModel::with_config(4, 1, &[(0, 0)], config);
            model.set_cost(symmetric(vec![
                vec![0, 2, 4, 6],
                vec![2, 0, 3, 5],
                vec![4, 3, 0, 2],
                vec![6, 5, 2, 0],
            ]));
            model.close_model();
            assert_eq!(model.solve(None), RoutingStatus::Success);
            model.best_assignment().unwrap().cost
        };
        assert_eq!(solve_with(0), solve_with(1000));
    }

    #[test]
    fn test_cost_classes_shared_and_distinct() {
        let mut model = RoutingModel::with_depot(3, 3, 0);
        let shared = symmetric(vec![vec![0, 1, 2], vec![1, 0, 1], vec![2, 1, 0]]);
        model.set_vehicle_cost(0, Rc::clone(&shared));
        model.set_vehicle_cost(1, Rc::clone(&shared));
        model.set_vehicle_cost(2, constant_evaluator(7));
        assert_eq!(model.vehicle_cost_class(0), model.vehicle_cost_class(1));
        assert_ne!(model.vehicle_cost_class(0), model.vehicle_cost_class(2));
        assert_eq!(model.cost_class_count(), 2);
        assert!(!model.is_homogeneous());
        // vehicle classes follow (start, end, cost class)
        assert_eq!(model.vehicle_classes().len(), 2);
    }

    #[test]
    fn test_model_closed_errors() {
        let mut model = RoutingModel::with_depot(3, 1, 0);
        model.set_cost(constant_evaluator(1));
        model.close_model();
        assert_eq!(
            model.add_disjunction(&[1]),
            Err(Error::ModelClosed)
        );
        assert_eq!(
            model.add_constant_dimension(1, 10, true, "late"),
            Err(Error::ModelClosed)
        );
        assert_eq!(model.add_pickup_and_delivery(1, 2), Err(Error::ModelClosed));
        // closing again is a no-op
        model.close_model();
        assert!(model.is_closed());
    }

    // Savings scenario: expensive depot arcs, cheap chain between visits.
    #[test]
    fn test_solve_savings_single_vehicle() {
        let config = SearchConfig {
            first_solution: FirstSolutionStrategy::Savings,
            ..SearchConfig::default()
        };
        let mut model = RoutingModel::with_config(4, 1, &[(0, 0)], config);
        model.set_cost(symmetric(vec![
            vec![0, 10, 10, 10],
            vec![10, 0, 1, 3],
            vec![10, 1, 0, 1],
            vec![10, 3, 1, 0],
        ]));
        model.close_model();
        assert_eq!(model.solve(None), RoutingStatus::Success);
        let best = model.best_assignment().unwrap();
        assert_eq!(best.cost, 22);
        let routes = model.assignment_to_routes(best).unwrap();
        assert!(routes[0] == vec![1, 2, 3] || routes[0] == vec![3, 2, 1]);
    }

    // Mandatory disjunction: exactly one of the two nodes is served.
    #[test]
    fn test_solve_mandatory_disjunction() {
        let mut model = RoutingModel::with_depot(3, 1, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 5],
            vec![1, 0, 1],
            vec![5, 1, 0],
        ]));
        model.add_disjunction(&[1, 2]).unwrap();
        model.close_model();
        assert_eq!(model.solve(None), RoutingStatus::Success);
        let best = model.best_assignment().unwrap();
        assert_eq!(best.cost, 2);
        let routes = model.assignment_to_routes(best).unwrap();
        assert_eq!(routes[0], vec![1]);
        assert!(best.is_self_assigned(model.node_to_index(2).unwrap()));
    }

    // Optional nodes: paying node 2's penalty beats its detour.
    #[test]
    fn test_solve_optional_disjunction_penalty() {
        let mut model = RoutingModel::with_depot(3, 1, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 5],
            vec![1, 0, 1],
            vec![5, 1, 0],
        ]));
        model.add_disjunction_with_penalty(&[1], 3).unwrap();
        model.add_disjunction_with_penalty(&[2], 3).unwrap();
        model.close_model();
        assert_eq!(model.solve(None), RoutingStatus::Success);
        let best = model.best_assignment().unwrap();
        // node 1 served (cost 2), node 2 dropped (penalty 3)
        assert_eq!(best.cost, 5);
        let routes = model.assignment_to_routes(best).unwrap();
        assert_eq!(routes[0], vec![1]);
    }

    // Pickup/delivery: the pair is served in order, never reversed.
    #[test]
    fn test_solve_pickup_delivery_order() {
        let mut model = RoutingModel::with_depot(3, 1, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 100],
            vec![1, 0, 1],
            vec![100, 1, 0],
        ]));
        model.add_pickup_and_delivery(1, 2).unwrap();
        model.close_model();
        assert_eq!(model.solve(None), RoutingStatus::Success);
        let routes = model
            .assignment_to_routes(model.best_assignment().unwrap())
            .unwrap();
        assert_eq!(routes[0], vec![1, 2]);
    }

    #[test]
    fn test_routes_assignment_round_trip() {
        let mut model = RoutingModel::with_depot(5, 3, 0);
        model.set_cost(constant_evaluator(1));
        model.close_model();
        let routes = vec![vec![1], vec![2, 3, 4]];
        let mut assignment = model.new_assignment();
        model
            .routes_to_assignment(&routes, false, true, &mut assignment)
            .unwrap();
        let round_tripped = model.assignment_to_routes(&assignment).unwrap();
        // identical up to trailing empty vehicles
        assert_eq!(round_tripped[0], routes[0]);
        assert_eq!(round_tripped[1], routes[1]);
        assert!(round_tripped[2].is_empty());
    }

    #[test]
    fn test_routes_to_assignment_errors() {
        let mut model = RoutingModel::with_depot(4, 2, 0);
        model.set_cost(constant_evaluator(1));
        model.forbid_vehicle(2, 1).unwrap();
        model.deactivate(3).unwrap();
        model.close_model();

        let mut assignment = model.new_assignment();
        assert_eq!(
            model.routes_to_assignment(&[vec![9]], false, true, &mut assignment),
            Err(Error::InvalidNode(9))
        );
        let mut assignment = model.new_assignment();
        assert_eq!(
            model.routes_to_assignment(&[vec![1], vec![1]], false, true, &mut assignment),
            Err(Error::DuplicateIndex(1))
        );
        let mut assignment = model.new_assignment();
        assert_eq!(
            model.routes_to_assignment(&[vec![1], vec![2]], false, true, &mut assignment),
            Err(Error::VehicleNotAllowed {
                vehicle: 1,
                index: 2
            })
        );
        let mut assignment = model.new_assignment();
        assert_eq!(
            model.routes_to_assignment(&[vec![3]], false, true, &mut assignment),
            Err(Error::InactiveNodeUsed(3))
        );
        // inactive nodes are skipped when ignored
        let mut assignment = model.new_assignment();
        assert!(model
            .routes_to_assignment(&[vec![3, 1]], true, true, &mut assignment)
            .is_ok());
        assert_eq!(assignment.next(model.start(0)), Some(1));
    }

    #[test]
    fn test_compact_assignment_moves_used_vehicles_first() {
        let mut model = RoutingModel::with_depot(4, 3, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 2, 3],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![3, 2, 1, 0],
        ]));
        model.close_model();
        // only the last vehicle is used
        let assignment = model
            .read_assignment_from_routes(&[vec![], vec![], vec![1, 2, 3]], false)
            .unwrap();
        let compact = model.compact_assignment(&assignment).unwrap();
        assert!(model.is_vehicle_used(&compact, 0));
        assert!(!model.is_vehicle_used(&compact, 1));
        assert!(!model.is_vehicle_used(&compact, 2));
        // identical total cost
        assert_eq!(compact.cost, assignment.cost);
    }

    #[test]
    fn test_compact_assignment_needs_homogeneous_costs() {
        let mut model = RoutingModel::with_depot(3, 2, 0);
        model.set_vehicle_cost(0, constant_evaluator(1));
        model.set_vehicle_cost(1, constant_evaluator(2));
        model.close_model();
        let assignment = model
            .read_assignment_from_routes(&[vec![], vec![1, 2]], false)
            .unwrap();
        assert!(model.compact_assignment(&assignment).is_none());
    }

    #[test]
    fn test_solve_status_fail_vs_timeout() {
        let failing_model = |time_limit_ms: u64| {
            let config = SearchConfig {
                first_solution: FirstSolutionStrategy::AllUnperformed,
                time_limit_ms,
                ..SearchConfig::default()
            };
            let mut model = RoutingModel::with_config(2, 1, &[(0, 0)], config);
            model.set_cost(constant_evaluator(1));
            // no disjunction: node 1 is mandatory, AllUnperformed fails
            model.close_model();
            model.solve(None)
        };
        assert_eq!(failing_model(u64::MAX), RoutingStatus::Fail);
        assert_eq!(failing_model(0), RoutingStatus::FailTimeout);
    }

    #[test]
    fn test_solve_with_initial_assignment() {
        let mut model = RoutingModel::with_depot(4, 1, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 2, 3],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![3, 2, 1, 0],
        ]));
        model.close_model();
        let initial = model
            .read_assignment_from_routes(&[vec![3, 2, 1]], false)
            .unwrap();
        assert_eq!(model.solve(Some(&initial)), RoutingStatus::Success);
        // local search cannot do worse than the seed
        assert!(model.best_assignment().unwrap().cost <= initial.cost);
    }

    #[test]
    fn test_dimension_cumul_bounds_enforced() {
        let mut model = RoutingModel::with_depot(4, 2, 0);
        model.set_cost(symmetric(vec![
            vec![0, 1, 2, 3],
            vec![1, 0, 1, 2],
            vec![2, 1, 0, 1],
            vec![3, 2, 1, 0],
        ]));
        model.add_constant_dimension(1, 3, true, "count").unwrap();
        model.close_model();
        // three visits on one vehicle exceed the count capacity
        assert!(model
            .read_assignment_from_routes(&[vec![1, 2, 3]], false)
            .is_err());
        assert!(model
            .read_assignment_from_routes(&[vec![1], vec![2, 3]], false)
            .is_ok());
    }

    #[test]
    fn test_vehicle_capacity_dimension() {
        let mut model = RoutingModel::with_depot(3, 2, 0);
        model.set_cost(constant_evaluator(1));
        model
            .add_dimension_with_vehicle_capacity(
                constant_evaluator(1),
                0,
                Rc::new(|vehicle| if vehicle == 0 { 3 } else { 2 }),
                true,
                "load",
            )
            .unwrap();
        model.close_model();
        // two visits fit vehicle 0 (capacity 3) but not vehicle 1
        assert!(model
            .read_assignment_from_routes(&[vec![1, 2]], false)
            .is_ok());
        assert!(model
            .read_assignment_from_routes(&[vec![], vec![1, 2]], false)
            .is_err());
    }

    #[test]
    fn test_apply_locks_to_all_vehicles() {
        let mut model = RoutingModel::with_depot(4, 2, 0);
        model.set_cost(constant_evaluator(1));
        model.close_model();
        model
            .apply_locks_to_all_vehicles(&[vec![1, 2]], false)
            .unwrap();
        assert!(model
            .locks()
            .contains(&(model.start(0), model.node_to_index(1).unwrap())));
        assert_eq!(model.solve(None), RoutingStatus::Success);
        let routes = model
            .assignment_to_routes(model.best_assignment().unwrap())
            .unwrap();
        // the locked prefix survives the search
        assert_eq!(&routes[0][..2], &[1, 2]);
    }
}
