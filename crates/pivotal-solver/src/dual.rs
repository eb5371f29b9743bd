use tracing::{debug, info};

use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::primal::{pivot_traced, run_primal, PrimalOutcome};
use crate::problem::Problem;
use crate::solution::{SimplexResult, SolutionStatus};
use crate::standard;
use crate::tableau::Tableau;
use crate::trace::{emit, NoSteps, Step, StepSink};

/// Tableau dual simplex.
///
/// Accepts `>=` and `=` rows and negative right-hand sides. The slack basis
/// is primal infeasible for such rows; the method keeps the objective row
/// non-negative and pivots the negative right-hand sides away.
#[derive(Debug, Clone, Default)]
pub struct DualSimplex {
    options: SolverOptions,
}

impl DualSimplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SolverOptions) -> Self {
        Self { options }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.options.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    pub fn solve(&self, problem: &Problem) -> Result<SimplexResult, SolveError> {
        self.solve_traced(problem, &mut NoSteps)
    }

    pub fn solve_traced(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<SimplexResult, SolveError> {
        let form = standard::dual_form(problem)?;
        let mut tableau = Tableau::from_standard(&form);
        emit(sink, || Step::new("initial tableau", tableau.render()));

        let (status, iterations) = self.run(&mut tableau, sink)?;
        let result = SimplexResult::from_tableau(status, &tableau, problem.sense, iterations);
        info!(
            method = "dual simplex",
            status = status.as_str(),
            objective = result.objective_value,
            iterations,
            "solve finished"
        );
        Ok(result)
    }

    fn run(&self, tableau: &mut Tableau, sink: &mut dyn StepSink) -> Result<(SolutionStatus, usize), SolveError> {
        let tol = self.options.tolerance;
        let mut iterations = 0;

        // Restore dual feasibility first
        if !tableau.is_optimal(tol) {
            debug!("objective row has negative entries, repairing with primal pivots");
            if let PrimalOutcome::Unbounded(col) = run_primal(tableau, &self.options, sink, &mut iterations)? {
                if tableau.is_primal_feasible(tol) {
                    debug!(column = %tableau.var_names[col], "no leaving row, objective is unbounded");
                    return Ok((SolutionStatus::Unbounded, iterations));
                }
                debug!(column = %tableau.var_names[col], "repair stalled on a primal infeasible row");
            }
        }

        while let Some(row) = tableau.dual_leaving_row(tol) {
            let Some(col) = tableau.dual_entering_column(row, tol) else {
                debug!(row, rhs = tableau.rhs(row), "row has no negative entry, model is infeasible");
                emit(sink, || {
                    Step::new(
                        "infeasible",
                        format!("row {} has a negative RHS and no negative entry\n{}", row, tableau.render()),
                    )
                });
                return Ok((SolutionStatus::Infeasible, iterations));
            };
            pivot_traced(tableau, row, col, &self.options, sink, &mut iterations)?;
        }

        // Finish whatever the repair phase left behind
        if !tableau.is_optimal(tol) {
            if let PrimalOutcome::Unbounded(_) = run_primal(tableau, &self.options, sink, &mut iterations)? {
                return Ok((SolutionStatus::Unbounded, iterations));
            }
        }

        Ok((SolutionStatus::Optimal, iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primal::PrimalSimplex;
    use crate::problem::Relation;

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let problem = Problem::minimize(vec![2.0, 3.0])
            .subject_to(vec![1.0, 1.0], Relation::Ge, 4.0)
            .subject_to(vec![1.0, 0.0], Relation::Le, 3.0)
            .subject_to(vec![0.0, 1.0], Relation::Le, 3.0);

        let solution = DualSimplex::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
        assert_eq!(solution.iterations, 2);
    }

    #[test]
    fn test_covering_constraint() {
        let problem = Problem::minimize(vec![2.0, 3.0]).subject_to(vec![1.0, 1.0], Relation::Ge, 10.0);
        let solution = DualSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 20.0).abs() < 1e-6);
        assert!((solution.values[0] - 10.0).abs() < 1e-6);
        assert!(solution.values[1].abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let problem = Problem::minimize(vec![1.0])
            .subject_to(vec![1.0], Relation::Ge, 5.0)
            .subject_to(vec![1.0], Relation::Le, 3.0);

        let solution = DualSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.objective_value, f64::INFINITY);
    }

    #[test]
    fn test_negative_upper_bound_is_infeasible() {
        let problem = Problem::maximize(vec![1.0]).subject_to(vec![1.0], Relation::Le, -5.0);
        let solution = DualSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Infeasible);
    }

    #[test]
    fn test_equality_row() {
        // max x + 2y  s.t. x + y = 5, y <= 3  gives 8 at (2, 3)
        let problem = Problem::maximize(vec![1.0, 2.0])
            .subject_to(vec![1.0, 1.0], Relation::Eq, 5.0)
            .subject_to(vec![0.0, 1.0], Relation::Le, 3.0);
        let solution = DualSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 8.0).abs() < 1e-6);
        assert!((solution.values[0] - 2.0).abs() < 1e-6);
        assert!((solution.values[1] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded_after_repair() {
        let problem = Problem::maximize(vec![1.0, 1.0])
            .subject_to(vec![1.0, -1.0], Relation::Le, 2.0)
            .subject_to(vec![1.0, 0.0], Relation::Ge, 1.0);
        let solution = DualSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_agrees_with_primal_on_le_model() {
        let problem = Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0);
        let dual = DualSimplex::new().solve(&problem).unwrap();
        let primal = PrimalSimplex::new().solve(&problem).unwrap();
        assert_eq!(dual.status, SolutionStatus::Optimal);
        assert!((dual.objective_value - primal.objective_value).abs() < 1e-6);
    }
}
