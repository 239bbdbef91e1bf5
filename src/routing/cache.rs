//! Evaluator and arc-cost caches.

use std::cell::RefCell;
use std::rc::Rc;

use super::NodeEvaluator;

/// Single-slot arc-cost memo per source index: `(successor, cost class,
/// cost)`, invalidated whenever the queried successor or cost class
/// differs from the cached one.
#[derive(Debug, Clone, Copy)]
pub struct CostCacheElement {
    /// Cached successor index.
    pub node: i64,
    /// Cached cost class.
    pub cost_class: i64,
    /// Cached cost value.
    pub cost: i64,
}

impl CostCacheElement {
    /// An empty slot.
    pub fn unset() -> Self {
        Self {
            node: -1,
            cost_class: -1,
            cost: 0,
        }
    }
}

/// Lazy full-matrix cache around a node evaluator.
///
/// The cache owns its evaluator; the evaluator must be repeatable (a pure
/// function of its arguments), which is what makes memoisation sound.
pub struct RoutingCache {
    cache: RefCell<Vec<Vec<Option<i64>>>>,
    evaluator: NodeEvaluator,
}

impl RoutingCache {
    /// Wraps `evaluator` with an `size × size` memo.
    pub fn new(evaluator: NodeEvaluator, size: usize) -> Self {
        Self {
            cache: RefCell::new(vec![vec![None; size]; size]),
            evaluator,
        }
    }

    /// Returns the cached value for `(i, j)`, running the evaluator on a
    /// miss.
    pub fn run(&self, i: usize, j: usize) -> i64 {
        if let Some(value) = self.cache.borrow()[i][j] {
            return value;
        }
        let value = (self.evaluator)(i, j);
        self.cache.borrow_mut()[i][j] = Some(value);
        value
    }
}

/// Wraps a node evaluator in a shared cache when caching is enabled and the
/// model is small enough; otherwise returns the evaluator unchanged.
pub fn maybe_cached(
    evaluator: NodeEvaluator,
    size: usize,
    cache_callbacks: bool,
    max_cache_size: usize,
) -> NodeEvaluator {
    if cache_callbacks && size <= max_cache_size {
        let cache = Rc::new(RoutingCache::new(evaluator, size));
        Rc::new(move |i, j| cache.run(i, j))
    } else {
        evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_cache_runs_evaluator_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let evaluator: NodeEvaluator = Rc::new(move |i, j| {
            counter.set(counter.get() + 1);
            (i * 10 + j) as i64
        });
        let cache = RoutingCache::new(evaluator, 3);
        assert_eq!(cache.run(1, 2), 12);
        assert_eq!(cache.run(1, 2), 12);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.run(2, 1), 21);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_zero_cache_size_disables_caching() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let evaluator: NodeEvaluator = Rc::new(move |i, j| {
            counter.set(counter.get() + 1);
            (i + j) as i64
        });
        let wrapped = maybe_cached(evaluator, 3, true, 0);
        assert_eq!(wrapped(1, 2), 3);
        assert_eq!(wrapped(1, 2), 3);
        // uncached: both calls reach the evaluator, results unchanged
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cached_when_enabled() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let evaluator: NodeEvaluator = Rc::new(move |i, j| {
            counter.set(counter.get() + 1);
            (i + j) as i64
        });
        let wrapped = maybe_cached(evaluator, 3, true, 10);
        assert_eq!(wrapped(0, 1), 1);
        assert_eq!(wrapped(0, 1), 1);
        assert_eq!(calls.get(), 1);
    }
}
