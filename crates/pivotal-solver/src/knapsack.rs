//! Best-first branch-and-bound for the 0/1 knapsack problem.
//!
//! Items are kept in decreasing profit/weight order. The bound of a node is
//! the greedy fractional fill of the items it leaves undecided, so the first
//! item that does not fit is the one the node branches on.

use binary_heap_plus::BinaryHeap;
use tracing::{debug, info, warn};

use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::problem::{Problem, Relation};
use crate::solution::{SimplexResult, SolutionStatus};
use crate::trace::{emit, NoSteps, Step, StepSink};

#[derive(Debug, Clone, Default)]
pub struct KnapsackBranchAndBound {
    options: SolverOptions,
}

/// Items in branching order
struct Items {
    /// Original index of each sorted item
    order: Vec<usize>,
    profits: Vec<f64>,
    weights: Vec<f64>,
    capacity: f64,
}

#[derive(Debug, Clone)]
struct Node {
    /// `Some(true)` taken, `Some(false)` excluded, `None` undecided
    fixed: Vec<Option<bool>>,
    bound: f64,
    /// Sorted position of the partially taken item, if any
    split: Option<usize>,
    /// Items the greedy fill takes fully
    taken: Vec<bool>,
}

impl Items {
    fn from_problem(problem: &Problem) -> Result<Self, SolveError> {
        if !problem.is_maximize() {
            return Err(SolveError::NotKnapsack("objective must be maximized".to_string()));
        }
        let [row] = problem.constraints.as_slice() else {
            return Err(SolveError::NotKnapsack(format!(
                "expected a single capacity constraint, found {}",
                problem.num_constraints()
            )));
        };
        if row.relation != Relation::Le {
            return Err(SolveError::NotKnapsack(format!("{} must be a <= constraint", row.name)));
        }
        if let Some(j) = problem.objective.iter().position(|&p| p < 0.0) {
            return Err(SolveError::NotKnapsack(format!(
                "profit of {} is negative",
                problem.variable_name(j)
            )));
        }
        if let Some(j) = row.coefficients.iter().position(|&w| w < 0.0) {
            return Err(SolveError::NotKnapsack(format!(
                "weight of {} is negative",
                problem.variable_name(j)
            )));
        }

        let ratio = |j: usize| {
            let w = row.coefficients[j];
            if w == 0.0 { f64::INFINITY } else { problem.objective[j] / w }
        };
        let mut order: Vec<usize> = (0..problem.num_variables()).collect();
        order.sort_by(|&a, &b| {
            ratio(b)
                .total_cmp(&ratio(a))
                .then(problem.objective[b].total_cmp(&problem.objective[a]))
                .then(a.cmp(&b))
        });

        Ok(Self {
            profits: order.iter().map(|&j| problem.objective[j]).collect(),
            weights: order.iter().map(|&j| row.coefficients[j]).collect(),
            order,
            capacity: row.rhs,
        })
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    /// Greedy fractional bound for a partial assignment, `None` when the fixed items overflow.
    fn relax(&self, fixed: Vec<Option<bool>>, tol: f64) -> Option<Node> {
        let mut weight = 0.0;
        let mut bound = 0.0;
        let mut taken = vec![false; self.len()];
        for (k, f) in fixed.iter().enumerate() {
            if *f == Some(true) {
                weight += self.weights[k];
                bound += self.profits[k];
                taken[k] = true;
            }
        }
        if weight > self.capacity + tol {
            return None;
        }

        let mut remaining = self.capacity - weight;
        let mut split = None;
        for k in (0..self.len()).filter(|&k| fixed[k].is_none()) {
            if self.weights[k] <= remaining + tol {
                remaining -= self.weights[k];
                bound += self.profits[k];
                taken[k] = true;
            } else {
                let fraction = remaining.max(0.0) / self.weights[k];
                if fraction > tol {
                    bound += fraction * self.profits[k];
                    split = Some(k);
                }
                break;
            }
        }

        Some(Node { fixed, bound, split, taken })
    }

    /// Maps a sorted selection back to the problem's variable order.
    fn values(&self, taken: &[bool]) -> Vec<f64> {
        let mut values = vec![0.0; self.len()];
        for (k, &t) in taken.iter().enumerate() {
            if t {
                values[self.order[k]] = 1.0;
            }
        }
        values
    }

    fn describe(&self, node: &Node) -> String {
        let decisions: Vec<String> = node
            .fixed
            .iter()
            .map(|f| match f {
                Some(true) => "1".to_string(),
                Some(false) => "0".to_string(),
                None => "-".to_string(),
            })
            .collect();
        format!("fixed [{}]  bound = {:.4}", decisions.join(" "), node.bound)
    }
}

impl KnapsackBranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.options.max_nodes = nodes;
        self
    }

    pub fn solve(&self, problem: &Problem) -> Result<SimplexResult, SolveError> {
        self.solve_traced(problem, &mut NoSteps)
    }

    /// Solve, reporting one step per expanded node.
    pub fn solve_traced(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<SimplexResult, SolveError> {
        problem.validate()?;
        let items = Items::from_problem(problem)?;
        let tol = self.options.tolerance;

        let mut fringe = BinaryHeap::new_by(|a: &Node, b: &Node| a.bound.total_cmp(&b.bound));
        if let Some(root) = items.relax(vec![None; items.len()], tol) {
            fringe.push(root);
        } else {
            debug!(capacity = items.capacity, "capacity is negative");
        }

        let mut best: Option<(f64, Vec<bool>)> = None;
        let mut nodes = 0;
        let mut incomplete = false;

        while let Some(node) = fringe.pop() {
            let best_value = best.as_ref().map_or(f64::NEG_INFINITY, |(v, _)| *v);
            if node.bound <= best_value + tol {
                debug!(bound = node.bound, incumbent = best_value, "remaining nodes cannot improve");
                break;
            }
            if nodes >= self.options.max_nodes {
                warn!(max_nodes = self.options.max_nodes, "node limit reached, search is incomplete");
                incomplete = true;
                break;
            }
            nodes += 1;

            let Some(k) = node.split else {
                info!(node = nodes, value = node.bound, "new incumbent");
                emit(sink, || {
                    Step::new(format!("node {}", nodes), format!("{}\n  new incumbent", items.describe(&node)))
                });
                best = Some((node.bound, node.taken));
                continue;
            };

            let mut snapshot = format!(
                "{}\n  {} is split, branching",
                items.describe(&node),
                problem.variable_name(items.order[k])
            );
            for take in [true, false] {
                let mut fixed = node.fixed.clone();
                fixed[k] = Some(take);
                match items.relax(fixed, tol) {
                    Some(child) if child.bound > best_value + tol => {
                        snapshot.push_str(&format!("\n  push {}", items.describe(&child)));
                        fringe.push(child);
                    }
                    Some(child) => {
                        debug!(bound = child.bound, incumbent = best_value, "child discarded by bound");
                        snapshot.push_str(&format!("\n  discard {}", items.describe(&child)));
                    }
                    None => {
                        debug!(item = items.order[k], "child exceeds capacity");
                        snapshot.push_str("\n  discard overweight child");
                    }
                }
            }
            emit(sink, || Step::new(format!("node {}", nodes), snapshot));
        }

        let result = match best {
            Some((_, taken)) => {
                let values = items.values(&taken);
                let status = if incomplete {
                    SolutionStatus::Incomplete
                } else {
                    SolutionStatus::OptimalInteger
                };
                SimplexResult::without_tableau(
                    status,
                    problem.evaluate(&values),
                    values,
                    problem.variable_names(),
                    nodes,
                )
            }
            None => {
                let result = SimplexResult::infeasible(problem.sense, problem.variable_names(), nodes);
                if incomplete {
                    result.with_status(SolutionStatus::Incomplete)
                } else {
                    result
                }
            }
        };
        info!(
            method = "branch and bound knapsack",
            status = result.status.as_str(),
            objective = result.objective_value,
            nodes,
            "search finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knapsack(profits: Vec<f64>, weights: Vec<f64>, capacity: f64) -> Problem {
        Problem::maximize(profits).subject_to(weights, Relation::Le, capacity)
    }

    #[test]
    fn test_classic_instance() {
        let problem = knapsack(vec![60.0, 100.0, 120.0], vec![10.0, 20.0, 30.0], 50.0);
        let mut steps = Vec::new();
        let result = KnapsackBranchAndBound::new().solve_traced(&problem, &mut steps).unwrap();

        assert_eq!(result.status, SolutionStatus::OptimalInteger);
        assert!((result.objective_value - 220.0).abs() < 1e-9);
        assert_eq!(result.values, vec![0.0, 1.0, 1.0]);
        assert_eq!(result.iterations, 3);
        assert_eq!(steps.len(), 3);
        assert!(result.tableau.is_empty());
    }

    #[test]
    fn test_root_bound() {
        let problem = knapsack(vec![60.0, 100.0, 120.0], vec![10.0, 20.0, 30.0], 50.0);
        let items = Items::from_problem(&problem).unwrap();
        let root = items.relax(vec![None; 3], 1e-9).unwrap();
        assert!((root.bound - 240.0).abs() < 1e-9);
        assert_eq!(root.split, Some(2));
    }

    #[test]
    fn test_ratio_order() {
        // ratios 2, 5, 5 with the larger profit first on the tie, zero weight first overall
        let problem = knapsack(vec![4.0, 10.0, 20.0, 1.0], vec![2.0, 2.0, 4.0, 0.0], 5.0);
        let items = Items::from_problem(&problem).unwrap();
        assert_eq!(items.order, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_rejects_non_knapsack() {
        let min = Problem::minimize(vec![1.0, 2.0]).subject_to(vec![1.0, 1.0], Relation::Le, 3.0);
        let two_rows = knapsack(vec![1.0, 2.0], vec![1.0, 1.0], 3.0).subject_to(vec![1.0, 0.0], Relation::Le, 1.0);
        let ge = Problem::maximize(vec![1.0, 2.0]).subject_to(vec![1.0, 1.0], Relation::Ge, 3.0);
        let negative = knapsack(vec![1.0, 2.0], vec![1.0, -1.0], 3.0);

        for problem in [min, two_rows, ge, negative] {
            let err = KnapsackBranchAndBound::new().solve(&problem).unwrap_err();
            assert!(matches!(err, SolveError::NotKnapsack(_)), "unexpected error {:?}", err);
        }
    }

    #[test]
    fn test_negative_capacity() {
        let problem = knapsack(vec![5.0], vec![1.0], -1.0);
        let result = KnapsackBranchAndBound::new().solve(&problem).unwrap();
        assert_eq!(result.status, SolutionStatus::Infeasible);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_everything_fits() {
        let problem = knapsack(vec![3.0, 4.0], vec![1.0, 2.0], 10.0);
        let result = KnapsackBranchAndBound::new().solve(&problem).unwrap();
        assert_eq!(result.status, SolutionStatus::OptimalInteger);
        assert_eq!(result.values, vec![1.0, 1.0]);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_node_limit() {
        let problem = knapsack(vec![60.0, 100.0, 120.0], vec![10.0, 20.0, 30.0], 50.0);
        let result = KnapsackBranchAndBound::new().with_max_nodes(1).solve(&problem).unwrap();
        assert_eq!(result.status, SolutionStatus::Incomplete);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = |bound: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % bound
        };

        for round in 0..40 {
            let n = 1 + next(12) as usize;
            let profits: Vec<f64> = (0..n).map(|_| (1 + next(50)) as f64).collect();
            let weights: Vec<f64> = (0..n).map(|_| (1 + next(30)) as f64).collect();
            let capacity = (weights.iter().sum::<f64>() / 2.0).floor();
            let problem = knapsack(profits.clone(), weights.clone(), capacity);

            let mut expected = 0.0;
            for mask in 0u32..(1 << n) {
                let pick = |j: usize| mask & (1 << j) != 0;
                let weight: f64 = (0..n).filter(|&j| pick(j)).map(|j| weights[j]).sum();
                if weight <= capacity {
                    let profit: f64 = (0..n).filter(|&j| pick(j)).map(|j| profits[j]).sum();
                    if profit > expected {
                        expected = profit;
                    }
                }
            }

            let result = KnapsackBranchAndBound::new().solve(&problem).unwrap();
            assert_eq!(result.status, SolutionStatus::OptimalInteger);
            assert!(
                (result.objective_value - expected).abs() < 1e-6,
                "round {}: got {}, expected {}",
                round,
                result.objective_value,
                expected
            );
            assert!(problem.is_feasible(&result.values, 1e-9));
        }
    }
}
