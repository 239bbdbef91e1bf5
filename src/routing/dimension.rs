//! Dimensions: named quantities accumulated along routes.

use super::{IndexEvaluator, VehicleEvaluator};

/// A dimension: a named cumulative quantity (time, load, distance)
/// accumulated along each vehicle route.
///
/// Cumul bounds are kept per index; the transit evaluator gives the
/// quantity added by each arc, slack is the evaluator-independent play
/// allowed on top of a transit, and capacity bounds every cumul. A
/// per-vehicle capacity evaluator overrides the scalar capacity.
pub struct Dimension {
    /// Dimension name.
    pub name: String,
    /// Arc transit evaluator over internal indices.
    pub transit: IndexEvaluator,
    /// Maximum slack on each arc.
    pub slack_max: i64,
    /// Global cumul capacity.
    pub capacity: i64,
    /// Per-vehicle capacity, overriding `capacity` when present.
    pub vehicle_capacity: Option<VehicleEvaluator>,
    /// Whether start cumuls are fixed to zero.
    pub fix_start_to_zero: bool,
    /// Lower cumul bound per index.
    pub cumul_min: Vec<i64>,
    /// Upper cumul bound per index.
    pub cumul_max: Vec<i64>,
}

impl Dimension {
    /// Creates a dimension with cumul bounds `[0, capacity]` on every
    /// index.
    pub fn new(
        name: String,
        transit: IndexEvaluator,
        slack_max: i64,
        capacity: i64,
        vehicle_capacity: Option<VehicleEvaluator>,
        fix_start_to_zero: bool,
        index_count: usize,
    ) -> Self {
        Self {
            name,
            transit,
            slack_max,
            capacity,
            vehicle_capacity,
            fix_start_to_zero,
            cumul_min: vec![0; index_count],
            cumul_max: vec![capacity; index_count],
        }
    }

    /// The transit of arc `(from, to)`.
    pub fn transit_value(&self, from: usize, to: usize) -> i64 {
        (self.transit)(from, to)
    }

    /// Effective cumul upper bound at `index` for `vehicle`.
    pub fn cumul_max_for(&self, index: usize, vehicle: usize) -> i64 {
        match &self.vehicle_capacity {
            Some(evaluator) => self.cumul_max[index].min(evaluator(vehicle)),
            None => self.cumul_max[index],
        }
    }

    /// Tightens the cumul bounds at `index`, e.g. for time windows.
    pub fn set_cumul_bounds(&mut self, index: usize, min: i64, max: i64) {
        self.cumul_min[index] = min;
        self.cumul_max[index] = max.min(self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn unit_dimension() -> Dimension {
        Dimension::new(
            "load".to_string(),
            Rc::new(|_, _| 1),
            0,
            10,
            None,
            true,
            4,
        )
    }

    #[test]
    fn test_default_bounds() {
        let d = unit_dimension();
        assert_eq!(d.cumul_min, vec![0; 4]);
        assert_eq!(d.cumul_max, vec![10; 4]);
        assert_eq!(d.transit_value(0, 1), 1);
    }

    #[test]
    fn test_set_cumul_bounds_clamps_to_capacity() {
        let mut d = unit_dimension();
        d.set_cumul_bounds(2, 3, 50);
        assert_eq!(d.cumul_min[2], 3);
        assert_eq!(d.cumul_max[2], 10);
    }

    #[test]
    fn test_vehicle_capacity_overrides() {
        let mut d = unit_dimension();
        d.vehicle_capacity = Some(Rc::new(|vehicle| if vehicle == 0 { 5 } else { 20 }));
        assert_eq!(d.cumul_max_for(1, 0), 5);
        assert_eq!(d.cumul_max_for(1, 1), 10);
    }
}
