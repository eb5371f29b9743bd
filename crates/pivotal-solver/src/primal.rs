use tracing::{debug, info};

use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::problem::Problem;
use crate::solution::{SimplexResult, SolutionStatus};
use crate::standard;
use crate::tableau::Tableau;
use crate::trace::{emit, NoSteps, Step, StepSink};

/// Tableau primal simplex for models in `<=` form with non-negative RHS
#[derive(Debug, Clone, Default)]
pub struct PrimalSimplex {
    options: SolverOptions,
}

impl PrimalSimplex {
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

    /// Solve, reporting the initial tableau and every pivot to `sink`.
    pub fn solve_traced(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<SimplexResult, SolveError> {
        let form = standard::primal_form(problem)?;
        let mut tableau = Tableau::from_standard(&form);
        emit(sink, || Step::new("initial tableau", tableau.render()));

        let mut iterations = 0;
        let status = match run_primal(&mut tableau, &self.options, sink, &mut iterations)? {
            PrimalOutcome::Optimal => SolutionStatus::Optimal,
            PrimalOutcome::Unbounded(col) => {
                debug!(column = %tableau.var_names[col], "no leaving row, objective is unbounded");
                SolutionStatus::Unbounded
            }
        };

        let result = SimplexResult::from_tableau(status, &tableau, problem.sense, iterations);
        info!(
            method = "primal simplex",
            status = status.as_str(),
            objective = result.objective_value,
            iterations,
            "solve finished"
        );
        Ok(result)
    }
}

/// How a run of primal pivots stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimalOutcome {
    /// No negative objective-row entry is left
    Optimal,
    /// The entering column has no eligible leaving row
    Unbounded(usize),
}

/// Primal pivots until optimal or no leaving row exists.
///
/// `iterations` is shared with the caller so that several phases draw on one
/// iteration budget.
pub(crate) fn run_primal(
    tableau: &mut Tableau,
    options: &SolverOptions,
    sink: &mut dyn StepSink,
    iterations: &mut usize,
) -> Result<PrimalOutcome, SolveError> {
    let tol = options.tolerance;
    loop {
        let Some(pivot_col) = tableau.entering_column(tol) else {
            return Ok(PrimalOutcome::Optimal);
        };
        let Some(pivot_row) = tableau.leaving_row(pivot_col, tol) else {
            return Ok(PrimalOutcome::Unbounded(pivot_col));
        };
        pivot_traced(tableau, pivot_row, pivot_col, options, sink, iterations)?;
    }
}

/// One counted, logged and reported pivot.
pub(crate) fn pivot_traced(
    tableau: &mut Tableau,
    row: usize,
    col: usize,
    options: &SolverOptions,
    sink: &mut dyn StepSink,
    iterations: &mut usize,
) -> Result<(), SolveError> {
    if *iterations >= options.max_iterations {
        return Err(SolveError::IterationLimit(options.max_iterations));
    }
    *iterations += 1;

    let leaving = tableau.basis[row - 1];
    debug!(
        iteration = *iterations,
        entering = %tableau.var_names[col],
        leaving = %tableau.var_names[leaving],
        row,
        pivot = tableau.rows[row][col],
        "pivot"
    );
    let mask = sink.enabled().then(|| tableau.pivot_mask(row, col));
    tableau.pivot(row, col, options.tolerance)?;

    emit(sink, || {
        let snapshot = format!(
            "{} enters, {} leaves (row {})\n{}",
            tableau.var_names[col],
            tableau.var_names[leaving],
            row,
            tableau.render()
        );
        let step = Step::new(format!("pivot {}", iterations), snapshot);
        match mask {
            Some(mask) => step.with_highlight(mask),
            None => step,
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Relation;

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let problem = Problem::maximize(vec![3.0, 2.0])
            .subject_to(vec![1.0, 1.0], Relation::Le, 4.0)
            .subject_to(vec![1.0, 0.0], Relation::Le, 3.0)
            .subject_to(vec![0.0, 1.0], Relation::Le, 3.0);

        let solution = PrimalSimplex::new().solve(&problem).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_wyndor() {
        let problem = Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0);

        let mut steps = Vec::new();
        let solution = PrimalSimplex::new().solve_traced(&problem, &mut steps).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 36.0).abs() < 1e-6);
        assert!((solution.values[0] - 2.0).abs() < 1e-6);
        assert!((solution.values[1] - 6.0).abs() < 1e-6);
        assert_eq!(solution.iterations, 2);
        // initial tableau plus one step per pivot
        assert_eq!(steps.len(), 3);
        assert!(steps[1].highlight.is_some());
        assert_eq!(solution.tableau.len(), 4);
        assert_eq!(solution.basis.len(), 3);
        assert_eq!(solution.var_names.len(), 5);
    }

    #[test]
    fn test_minimization_of_le_model() {
        // min -x - y  s.t. x + 2y <= 4, 3x + y <= 6 gives -2.8 at (1.6, 1.2)
        let problem = Problem::minimize(vec![-1.0, -1.0])
            .subject_to(vec![1.0, 2.0], Relation::Le, 4.0)
            .subject_to(vec![3.0, 1.0], Relation::Le, 6.0);
        let solution = PrimalSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value + 2.8).abs() < 1e-6);
    }

    #[test]
    fn test_unbounded() {
        // maximize x1 s.t. x1 >= 0
        let problem = Problem::maximize(vec![1.0]).subject_to(vec![1.0], Relation::Ge, 0.0);
        let solution = PrimalSimplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Unbounded);
        assert_eq!(solution.objective_value, f64::INFINITY);
    }

    #[test]
    fn test_rejects_ge_row() {
        let problem = Problem::minimize(vec![2.0, 3.0]).subject_to(vec![1.0, 1.0], Relation::Ge, 10.0);
        let err = PrimalSimplex::new().solve(&problem).unwrap_err();
        assert_eq!(err, SolveError::NotStandardForm("c1".to_string()));
    }

    #[test]
    fn test_iteration_limit_is_an_error() {
        let problem = Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0);
        let err = PrimalSimplex::new().with_max_iterations(1).solve(&problem).unwrap_err();
        assert_eq!(err, SolveError::IterationLimit(1));
    }

    #[test]
    fn test_optimal_tableau_is_fixed_point() {
        let problem = Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0);
        let mut tableau = Tableau::from_standard(&standard::standardize(&problem));
        let options = SolverOptions::default();
        let mut iterations = 0;
        run_primal(&mut tableau, &options, &mut NoSteps, &mut iterations).unwrap();

        let optimal = tableau.clone();
        let mut again = 0;
        let outcome = run_primal(&mut tableau, &options, &mut NoSteps, &mut again).unwrap();
        assert_eq!(outcome, PrimalOutcome::Optimal);
        assert_eq!(again, 0);
        assert_eq!(tableau, optimal);
    }
}
