//! Depth-first branch-and-bound for pure integer programs.
//!
//! Each node is a clone of its parent's model with one extra unit bound row.
//! The LP relaxation of a node is solved with the dual simplex as soon as the
//! node carries a row the slack basis cannot satisfy, and with the configured
//! primal method otherwise.

use tracing::{debug, info, warn};

use crate::algorithm::LpMethod;
use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::problem::{Problem, Relation};
use crate::solution::{SimplexResult, SolutionStatus};
use crate::trace::{emit, NoSteps, Step, StepSink};

#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    options: SolverOptions,
}

/// State shared by every node of one search
struct Search<'a> {
    original: &'a Problem,
    options: &'a SolverOptions,
    sink: &'a mut dyn StepSink,
    /// Incumbent objective in maximize form
    best_score: f64,
    best: Option<SimplexResult>,
    nodes: usize,
    /// A depth or node cap cut part of the tree
    truncated: bool,
    node_limit_hit: bool,
    unbounded: Option<SimplexResult>,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn with_relaxation(mut self, method: LpMethod) -> Self {
        self.options.relaxation = method;
        self
    }

    pub fn solve(&self, problem: &Problem) -> Result<SimplexResult, SolveError> {
        self.solve_traced(problem, &mut NoSteps)
    }

    /// Solve, reporting one step per explored node.
    pub fn solve_traced(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<SimplexResult, SolveError> {
        problem.validate()?;

        let mut search = Search {
            original: problem,
            options: &self.options,
            sink,
            best_score: f64::NEG_INFINITY,
            best: None,
            nodes: 0,
            truncated: false,
            node_limit_hit: false,
            unbounded: None,
        };
        search.explore(problem, "1".to_string(), 0);

        let nodes = search.nodes;
        if let Some(result) = search.unbounded {
            info!(method = "branch and bound", nodes, "relaxation is unbounded");
            return Ok(result.with_iterations(nodes));
        }

        let result = match search.best {
            Some(best) => {
                let status = if search.node_limit_hit {
                    SolutionStatus::Incomplete
                } else {
                    SolutionStatus::OptimalInteger
                };
                best.with_status(status).with_iterations(nodes)
            }
            None if search.truncated => {
                let mut result = SimplexResult::infeasible(problem.sense, problem.variable_names(), nodes);
                result.status = SolutionStatus::Incomplete;
                result
            }
            None => SimplexResult::infeasible(problem.sense, problem.variable_names(), nodes),
        };
        info!(
            method = "branch and bound",
            status = result.status.as_str(),
            objective = result.objective_value,
            nodes,
            "search finished"
        );
        Ok(result)
    }
}

impl Search<'_> {
    fn explore(&mut self, model: &Problem, label: String, depth: usize) {
        if self.nodes >= self.options.max_nodes {
            if !self.node_limit_hit {
                warn!(max_nodes = self.options.max_nodes, "node limit reached, search is incomplete");
            }
            self.node_limit_hit = true;
            self.truncated = true;
            return;
        }
        if depth > self.options.max_depth {
            warn!(node = %label, depth, "maximum depth exceeded, pruning");
            self.truncated = true;
            self.report(&label, "pruned: maximum depth exceeded", None);
            return;
        }
        self.nodes += 1;

        let method = relaxation_method(model, self.options.relaxation);
        let relaxation = match method.solve(model, self.options, &mut NoSteps) {
            Ok(r) => r,
            Err(e) => {
                warn!(node = %label, error = %e, "relaxation failed, pruning");
                self.report(&label, &format!("pruned: {}", e), None);
                return;
            }
        };

        match relaxation.status {
            SolutionStatus::Optimal => {}
            SolutionStatus::Unbounded if depth == 0 => {
                self.report(&label, "relaxation is unbounded", Some(&relaxation));
                self.unbounded = Some(relaxation);
                return;
            }
            status => {
                debug!(node = %label, status = status.as_str(), "relaxation not optimal, pruning");
                self.report(&label, &format!("pruned: relaxation {}", status.as_str()), Some(&relaxation));
                return;
            }
        }

        let score = max_form(self.original, relaxation.objective_value);
        if score <= self.best_score + self.options.tolerance {
            debug!(node = %label, bound = score, incumbent = self.best_score, "bounded, pruning");
            self.report(
                &label,
                &format!("pruned: bound {:.4} does not beat incumbent {:.4}", score, self.best_score),
                Some(&relaxation),
            );
            return;
        }

        let Some(var) = branching_variable(&relaxation.values, self.options.integrality_tolerance) else {
            self.consider(relaxation, &label, score);
            return;
        };

        let value = relaxation.values[var];
        let name = self.original.variable_name(var);
        let (floor, ceil) = (value.floor(), value.ceil());
        debug!(node = %label, depth, variable = %name, value, "branching");
        self.report(
            &label,
            &format!("{} = {:.4} is fractional, branching on {} >= {} and {} <= {}", name, value, name, ceil, name, floor),
            Some(&relaxation),
        );

        let mut unit = vec![0.0; model.num_variables()];
        unit[var] = 1.0;

        let mut up = model.clone();
        up.add_constraint(format!("{} >= {}", name, ceil), unit.clone(), Relation::Ge, ceil);
        self.explore(&up, format!("{}.1", label), depth + 1);

        let mut down = model.clone();
        down.add_constraint(format!("{} <= {}", name, floor), unit, Relation::Le, floor);
        self.explore(&down, format!("{}.2", label), depth + 1);
    }

    /// An integral relaxation becomes the incumbent if it is feasible and strictly better.
    fn consider(&mut self, mut relaxation: SimplexResult, label: &str, score: f64) {
        let values: Vec<f64> = relaxation.values.iter().map(|v| v.round()).collect();
        let tol = self.options.integrality_tolerance.max(self.options.tolerance);
        let violations = self.original.violations(&values, tol);
        if !violations.is_empty() || values.iter().any(|&v| v < 0.0) {
            warn!(node = %label, violations = violations.len(), "integral point violates the original model");
            self.report(label, "pruned: rounded solution is infeasible", Some(&relaxation));
            return;
        }
        if score > self.best_score + self.options.tolerance {
            info!(node = %label, objective = relaxation.objective_value, "new incumbent");
            relaxation.objective_value = self.original.evaluate(&values);
            relaxation.values = values;
            self.best_score = max_form(self.original, relaxation.objective_value);
            self.report(label, "new incumbent", Some(&relaxation));
            self.best = Some(relaxation);
        } else {
            self.report(label, "integral, not better than incumbent", Some(&relaxation));
        }
    }

    fn report(&mut self, label: &str, message: &str, relaxation: Option<&SimplexResult>) {
        let incumbent = self.best_score;
        emit(self.sink, || {
            let mut snapshot = format!("node {}: {}", label, message);
            if let Some(r) = relaxation {
                let values: Vec<String> = r.values.iter().map(|v| format!("{:.4}", v)).collect();
                snapshot.push_str(&format!("\n  z = {:.4}  x = [{}]", r.objective_value, values.join(", ")));
            }
            if incumbent.is_finite() {
                snapshot.push_str(&format!("\n  incumbent = {:.4}", incumbent));
            }
            Step::new(format!("node {}", label), snapshot)
        });
    }
}

/// Dual simplex when the node has a `>=`, `=` or negative right-hand-side row.
fn relaxation_method(model: &Problem, preferred: LpMethod) -> LpMethod {
    let needs_dual = model
        .constraints
        .iter()
        .any(|c| c.relation != Relation::Le || c.rhs < 0.0);
    if needs_dual {
        LpMethod::Dual
    } else {
        preferred
    }
}

/// Fractional variable whose fractional part is closest to 0.5, lowest index on ties.
fn branching_variable(values: &[f64], eps: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (j, &v) in values.iter().enumerate() {
        let f = v - v.floor();
        if f <= eps || f >= 1.0 - eps {
            continue;
        }
        let distance = (f - 0.5).abs();
        if best.is_none_or(|(_, d)| distance < d - eps) {
            best = Some((j, distance));
        }
    }
    best.map(|(j, _)| j)
}

fn max_form(problem: &Problem, value: f64) -> f64 {
    if problem.is_maximize() { value } else { -value }
}
