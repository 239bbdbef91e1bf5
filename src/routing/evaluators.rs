//! Ready-made node evaluators.

use std::rc::Rc;

use super::NodeEvaluator;

/// Evaluator over a dense `n × n` cost matrix stored row-major.
///
/// # Examples
///
/// ```
/// use cproute::routing::matrix_evaluator;
///
/// let eval = matrix_evaluator(vec![
///     vec![0, 5, 8],
///     vec![5, 0, 3],
///     vec![8, 3, 0],
/// ]);
/// assert_eq!(eval(0, 2), 8);
/// ```
pub fn matrix_evaluator(values: Vec<Vec<i64>>) -> NodeEvaluator {
    Rc::new(move |from, to| values[from][to])
}

/// Evaluator returning `values[from]` regardless of the destination, e.g.
/// a per-node service demand.
pub fn vector_evaluator(values: Vec<i64>) -> NodeEvaluator {
    Rc::new(move |from, _| values[from])
}

/// Evaluator returning the same value on every arc.
pub fn constant_evaluator(value: i64) -> NodeEvaluator {
    Rc::new(move |_, _| value)
}

/// Symmetric Euclidean evaluator over node coordinates, rounded to i64.
pub fn euclidean_evaluator(points: Vec<(f64, f64)>) -> NodeEvaluator {
    Rc::new(move |from, to| {
        let (x1, y1) = points[from];
        let (x2, y2) = points[to];
        let dx = x1 - x2;
        let dy = y1 - y2;
        (dx * dx + dy * dy).sqrt().round() as i64
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix() {
        let eval = matrix_evaluator(vec![vec![0, 1], vec![2, 0]]);
        assert_eq!(eval(0, 1), 1);
        assert_eq!(eval(1, 0), 2);
    }

    #[test]
    fn test_vector() {
        let eval = vector_evaluator(vec![3, 7]);
        assert_eq!(eval(1, 0), 7);
        assert_eq!(eval(1, 1), 7);
    }

    #[test]
    fn test_constant() {
        let eval = constant_evaluator(4);
        assert_eq!(eval(0, 9), 4);
    }

    #[test]
    fn test_euclidean() {
        let eval = euclidean_evaluator(vec![(0.0, 0.0), (3.0, 4.0)]);
        assert_eq!(eval(0, 1), 5);
        assert_eq!(eval(1, 1), 0);
    }
}
