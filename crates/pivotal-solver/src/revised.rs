//! Revised primal simplex.
//!
//! Works on explicit basis and non-basis index lists over the columns of
//! `[A | I]` instead of a full tableau. The basis inverse is recomputed from
//! scratch with Gauss-Jordan elimination every iteration, which keeps each
//! step easy to inspect; an eta file would avoid the cubic refactorization.

use std::fmt::Write;

use tracing::{debug, info};

use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::problem::Problem;
use crate::solution::{SimplexResult, SolutionStatus};
use crate::standard;
use crate::tableau::Tableau;
use crate::trace::{emit, NoSteps, Step, StepSink};

/// Everything computed in one revised-simplex iteration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevisedIteration {
    pub iteration: usize,
    /// Basic column of each row, before the basis change
    pub basis: Vec<usize>,
    pub non_basis: Vec<usize>,
    pub basis_inverse: Vec<Vec<f64>>,
    /// `x_B = B⁻¹b`
    pub basic_values: Vec<f64>,
    /// `(column, (c_B·B⁻¹)·a_j − c_j)` for every non-basic column, ascending
    pub reduced_costs: Vec<(usize, f64)>,
    pub entering: Option<usize>,
    /// `d = B⁻¹·a_entering`
    pub direction: Vec<f64>,
    /// Ratio `x_B[i] / d[i]` for rows with `d[i] > 0`
    pub ratios: Vec<Option<f64>>,
    pub leaving: Option<usize>,
    pub objective: f64,
}

/// A finished revised-simplex solve and the iterations that led to it
#[derive(Debug, Clone, PartialEq)]
pub struct RevisedRun {
    pub result: SimplexResult,
    pub iterations: Vec<RevisedIteration>,
}

#[derive(Debug, Clone, Default)]
pub struct RevisedSimplex {
    options: SolverOptions,
}

/// Column data of a standardized model with one slack per row
struct Columns {
    /// `[A | I]`, row-major
    matrix: Vec<Vec<f64>>,
    costs: Vec<f64>,
    rhs: Vec<f64>,
    names: Vec<String>,
    n_vars: usize,
}

impl Columns {
    fn new(form: &Problem) -> Self {
        let n = form.num_variables();
        let m = form.num_constraints();
        let matrix = form
            .constraints
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut row = c.coefficients.clone();
                row.extend((0..m).map(|k| if k == i { 1.0 } else { 0.0 }));
                row
            })
            .collect();
        let mut costs = form.objective.clone();
        costs.resize(n + m, 0.0);
        let mut names: Vec<String> = (0..n).map(|j| form.variable_name(j)).collect();
        names.extend((1..=m).map(|i| format!("s{}", i)));
        Self {
            matrix,
            costs,
            rhs: form.constraints.iter().map(|c| c.rhs).collect(),
            names,
            n_vars: n,
        }
    }

    fn column(&self, j: usize) -> Vec<f64> {
        self.matrix.iter().map(|row| row[j]).collect()
    }

    fn num_columns(&self) -> usize {
        self.costs.len()
    }
}

impl RevisedSimplex {
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
        Ok(self.run(problem, sink)?.result)
    }

    /// Solve and keep every iteration for inspection.
    pub fn inspect(&self, problem: &Problem) -> Result<RevisedRun, SolveError> {
        self.run(problem, &mut NoSteps)
    }

    fn run(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<RevisedRun, SolveError> {
        let tol = self.options.tolerance;
        let form = standard::primal_form(problem)?;
        let cols = Columns::new(&form);
        let n = cols.n_vars;
        let m = form.num_constraints();

        let mut basis: Vec<usize> = (n..n + m).collect();
        let mut non_basis: Vec<usize> = (0..n).collect();
        let mut history = Vec::new();
        let mut pivots = 0;

        loop {
            let b_matrix: Vec<Vec<f64>> = (0..m)
                .map(|i| basis.iter().map(|&k| cols.matrix[i][k]).collect())
                .collect();
            let binv = invert(&b_matrix, tol)?;
            let x_b = mat_vec(&binv, &cols.rhs);
            let c_b: Vec<f64> = basis.iter().map(|&k| cols.costs[k]).collect();
            let prices = vec_mat(&c_b, &binv);
            let objective = dot(&c_b, &x_b);

            let mut sorted = non_basis.clone();
            sorted.sort_unstable();
            let reduced_costs: Vec<(usize, f64)> = sorted
                .iter()
                .map(|&j| (j, dot(&prices, &cols.column(j)) - cols.costs[j]))
                .collect();

            let entering = most_negative(&reduced_costs, tol);
            let mut record = RevisedIteration {
                iteration: history.len() + 1,
                basis: basis.clone(),
                non_basis: non_basis.clone(),
                basis_inverse: binv.clone(),
                basic_values: x_b.clone(),
                reduced_costs,
                entering,
                direction: Vec::new(),
                ratios: Vec::new(),
                leaving: None,
                objective,
            };

            let Some(entering) = entering else {
                emit(sink, || Step::new("optimal", record.render(&cols.names)));
                history.push(record);
                let tableau = final_tableau(&cols, &basis, &binv, &prices, &x_b);
                return Ok(self.finish(SolutionStatus::Optimal, &tableau, problem, pivots, history));
            };

            let direction = mat_vec(&binv, &cols.column(entering));
            let ratios: Vec<Option<f64>> = direction
                .iter()
                .zip(&x_b)
                .map(|(&d, &x)| (d > tol).then(|| x.max(0.0) / d))
                .collect();
            let leaving_row = min_ratio_row(&ratios, tol);
            record.direction = direction;
            record.ratios = ratios;

            let Some(row) = leaving_row else {
                debug!(column = %cols.names[entering], "no positive direction entry, objective is unbounded");
                emit(sink, || Step::new("unbounded", record.render(&cols.names)));
                history.push(record);
                let tableau = final_tableau(&cols, &basis, &binv, &prices, &x_b);
                return Ok(self.finish(SolutionStatus::Unbounded, &tableau, problem, pivots, history));
            };

            if pivots >= self.options.max_iterations {
                return Err(SolveError::IterationLimit(self.options.max_iterations));
            }
            pivots += 1;

            let leaving = basis[row];
            record.leaving = Some(leaving);
            debug!(
                iteration = pivots,
                entering = %cols.names[entering],
                leaving = %cols.names[leaving],
                objective,
                "revised pivot"
            );
            emit(sink, || Step::new(format!("iteration {}", record.iteration), record.render(&cols.names)));
            history.push(record);

            basis[row] = entering;
            if let Some(slot) = non_basis.iter_mut().find(|j| **j == entering) {
                *slot = leaving;
            }
        }
    }

    fn finish(
        &self,
        status: SolutionStatus,
        tableau: &Tableau,
        problem: &Problem,
        pivots: usize,
        iterations: Vec<RevisedIteration>,
    ) -> RevisedRun {
        let result = SimplexResult::from_tableau(status, tableau, problem.sense, pivots);
        info!(
            method = "revised simplex",
            status = status.as_str(),
            objective = result.objective_value,
            iterations = pivots,
            "solve finished"
        );
        RevisedRun { result, iterations }
    }
}

impl RevisedIteration {
    pub fn render(&self, names: &[String]) -> String {
        let name = |j: usize| names.get(j).map(String::as_str).unwrap_or("?");
        let mut out = String::new();
        let basis: Vec<&str> = self.basis.iter().map(|&j| name(j)).collect();
        let non_basis: Vec<&str> = self.non_basis.iter().map(|&j| name(j)).collect();
        let _ = writeln!(out, "B = {{{}}}  N = {{{}}}", basis.join(", "), non_basis.join(", "));
        let _ = writeln!(out, "B^-1:");
        for row in &self.basis_inverse {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>10.4}", v)).collect();
            let _ = writeln!(out, "  [{}]", cells.join(""));
        }
        let x_b: Vec<String> = self.basic_values.iter().map(|v| format!("{:.4}", v)).collect();
        let _ = writeln!(out, "x_B = [{}]  z = {:.4}", x_b.join(", "), self.objective);
        let reduced: Vec<String> = self
            .reduced_costs
            .iter()
            .map(|(j, v)| format!("{}: {:.4}", name(*j), v))
            .collect();
        let _ = writeln!(out, "reduced costs: {}", reduced.join(", "));
        match self.entering {
            Some(e) => {
                let d: Vec<String> = self.direction.iter().map(|v| format!("{:.4}", v)).collect();
                let r: Vec<String> = self
                    .ratios
                    .iter()
                    .map(|v| v.map_or("-".to_string(), |v| format!("{:.4}", v)))
                    .collect();
                let _ = writeln!(out, "entering: {}  d = [{}]", name(e), d.join(", "));
                let _ = writeln!(out, "ratios: [{}]", r.join(", "));
                if let Some(l) = self.leaving {
                    let _ = writeln!(out, "leaving: {}", name(l));
                }
            }
            None => {
                let _ = writeln!(out, "no negative reduced cost, basis is optimal");
            }
        }
        out
    }
}

/// Tableau `B⁻¹[A | I | b]` with its priced-out objective row.
fn final_tableau(cols: &Columns, basis: &[usize], binv: &[Vec<f64>], prices: &[f64], x_b: &[f64]) -> Tableau {
    let total = cols.num_columns();
    let m = basis.len();
    let mut rows = Vec::with_capacity(m + 1);

    let mut objective_row: Vec<f64> = (0..total)
        .map(|j| dot(prices, &cols.column(j)) - cols.costs[j])
        .collect();
    for &k in basis {
        objective_row[k] = 0.0;
    }
    let c_b: Vec<f64> = basis.iter().map(|&k| cols.costs[k]).collect();
    objective_row.push(dot(&c_b, x_b));
    rows.push(objective_row);

    for i in 0..m {
        let mut row: Vec<f64> = (0..total)
            .map(|j| (0..m).map(|k| binv[i][k] * cols.matrix[k][j]).sum())
            .collect();
        row.push(x_b[i]);
        rows.push(row);
    }

    Tableau {
        rows,
        basis: basis.to_vec(),
        var_names: cols.names.clone(),
        n_vars: cols.n_vars,
    }
}

fn most_negative(reduced_costs: &[(usize, f64)], tol: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for &(j, value) in reduced_costs {
        let improves = match best {
            None => value < -tol,
            Some((_, current)) => value < current - tol,
        };
        if improves {
            best = Some((j, value));
        }
    }
    best.map(|(j, _)| j)
}

fn min_ratio_row(ratios: &[Option<f64>], tol: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, ratio) in ratios.iter().enumerate() {
        if let Some(ratio) = *ratio {
            if best.is_none_or(|(_, current)| ratio < current - tol) {
                best = Some((i, ratio));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Gauss-Jordan inversion with partial pivoting.
pub(crate) fn invert(matrix: &[Vec<f64>], tol: f64) -> Result<Vec<Vec<f64>>, SolveError> {
    let n = matrix.len();
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|k| if k == i { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .ok_or(SolveError::SingularBasis)?;
        if aug[pivot][col].abs() <= tol {
            return Err(SolveError::SingularBasis);
        }
        aug.swap(col, pivot);

        let p = aug[col][col];
        for value in aug[col].iter_mut() {
            *value /= p;
        }
        let pivot_row = aug[col].clone();
        for (i, row) in aug.iter_mut().enumerate() {
            if i == col {
                continue;
            }
            let factor = row[col];
            if factor != 0.0 {
                for (value, q) in row.iter_mut().zip(&pivot_row) {
                    *value -= factor * q;
                }
            }
        }
    }

    Ok(aug.into_iter().map(|row| row[n..].to_vec()).collect())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn mat_vec(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix.iter().map(|row| dot(row, v)).collect()
}

fn vec_mat(v: &[f64], matrix: &[Vec<f64>]) -> Vec<f64> {
    let cols = matrix.first().map_or(0, Vec::len);
    (0..cols)
        .map(|j| v.iter().zip(matrix).map(|(x, row)| x * row[j]).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primal::PrimalSimplex;
    use crate::problem::Relation;

    fn wyndor() -> Problem {
        Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0)
    }

    #[test]
    fn test_wyndor_iterations() {
        let run = RevisedSimplex::new().inspect(&wyndor()).unwrap();
        assert_eq!(run.result.status, SolutionStatus::Optimal);
        assert!((run.result.objective_value - 36.0).abs() < 1e-6);
        assert!((run.result.values[0] - 2.0).abs() < 1e-6);
        assert!((run.result.values[1] - 6.0).abs() < 1e-6);

        // two pivots plus the final optimality check
        assert_eq!(run.iterations.len(), 3);
        let first = &run.iterations[0];
        assert_eq!(first.entering, Some(1));
        assert_eq!(first.leaving, Some(3));
        assert_eq!(first.reduced_costs, vec![(0, -3.0), (1, -5.0)]);
        assert_eq!(first.ratios, vec![None, Some(6.0), Some(9.0)]);
        assert_eq!(run.iterations[2].entering, None);
        for it in &run.iterations {
            assert_eq!(it.basis.len(), 3);
            assert_eq!(it.basis.len() + it.non_basis.len(), 5);
            assert!(it.basis.iter().all(|b| !it.non_basis.contains(b)));
        }
    }

    #[test]
    fn test_final_tableau_matches_primal() {
        let revised = RevisedSimplex::new().solve(&wyndor()).unwrap();
        let primal = PrimalSimplex::new().solve(&wyndor()).unwrap();
        assert_eq!(revised.basis, primal.basis);
        for (r, p) in revised.tableau.iter().zip(&primal.tableau) {
            for (a, b) in r.iter().zip(p) {
                assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
            }
        }
    }

    #[test]
    fn test_unbounded() {
        let problem = Problem::maximize(vec![1.0, 1.0]).subject_to(vec![1.0, -1.0], Relation::Le, 2.0);
        let result = RevisedSimplex::new().solve(&problem).unwrap();
        assert_eq!(result.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_invert() {
        let m = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&m, 1e-12).unwrap();
        let expected = [[0.6, -0.7], [-0.2, 0.4]];
        for i in 0..2 {
            for j in 0..2 {
                assert!((inv[i][j] - expected[i][j]).abs() < 1e-12);
            }
        }
        let singular = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(invert(&singular, 1e-12), Err(SolveError::SingularBasis));
    }

    #[test]
    fn test_steps_reported_per_iteration() {
        let mut steps = Vec::new();
        RevisedSimplex::new().solve_traced(&wyndor(), &mut steps).unwrap();
        assert_eq!(steps.len(), 3);
        assert!(steps[0].snapshot.contains("entering: x2"));
        assert_eq!(steps[2].label, "optimal");
    }
}
