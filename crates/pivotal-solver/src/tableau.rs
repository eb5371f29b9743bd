//! Dense simplex tableau and the pivot primitives shared by the primal and
//! dual methods.
//!
//! Layout: row 0 is the objective row holding negated reduced costs (its RHS
//! is the current objective value in maximize form), rows `1..=m` are the
//! constraint rows and the last column is the RHS. `basis[i]` is the column
//! that is basic in row `i + 1`.

use std::fmt::Write;

use crate::error::SolveError;
use crate::problem::{Problem, Relation};
use crate::trace::HighlightMask;

#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    pub rows: Vec<Vec<f64>>,
    pub basis: Vec<usize>,
    pub var_names: Vec<String>,
    /// Number of decision variables; columns `n_vars..` are slacks
    pub n_vars: usize,
}

impl Tableau {
    /// Builds the slack-basis tableau of a standardized (maximize, `<=`) model.
    pub fn from_standard(form: &Problem) -> Self {
        debug_assert!(form.is_maximize());
        debug_assert!(form.constraints.iter().all(|c| c.relation == Relation::Le));

        let n_vars = form.num_variables();
        let m = form.num_constraints();
        let total_cols = n_vars + m + 1;

        let mut rows = vec![vec![0.0; total_cols]; m + 1];
        for (j, &c) in form.objective.iter().enumerate() {
            rows[0][j] = -c;
        }
        for (i, c) in form.constraints.iter().enumerate() {
            let row = &mut rows[i + 1];
            row[..n_vars].copy_from_slice(&c.coefficients);
            row[n_vars + i] = 1.0;
            row[total_cols - 1] = c.rhs;
        }

        let mut var_names: Vec<String> = (0..n_vars).map(|j| form.variable_name(j)).collect();
        var_names.extend((1..=m).map(|i| format!("s{}", i)));

        Self {
            rows,
            basis: (n_vars..n_vars + m).collect(),
            var_names,
            n_vars,
        }
    }

    /// Number of constraint rows.
    pub fn num_constraints(&self) -> usize {
        self.rows.len() - 1
    }

    /// Number of variable columns (RHS excluded).
    pub fn num_columns(&self) -> usize {
        self.rows[0].len() - 1
    }

    pub fn rhs_col(&self) -> usize {
        self.rows[0].len() - 1
    }

    pub fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.rhs_col()]
    }

    /// Objective value in maximize form.
    pub fn objective_value(&self) -> f64 {
        self.rhs(0)
    }

    /// Values of the decision variables; non-basic ones are zero.
    pub fn solution(&self) -> Vec<f64> {
        let mut values = vec![0.0; self.n_vars];
        for (i, &basic) in self.basis.iter().enumerate() {
            if basic < self.n_vars {
                values[basic] = self.rhs(i + 1);
            }
        }
        values
    }

    /// Tableau row (1-based) in which `col` is basic.
    pub fn basic_row_of(&self, col: usize) -> Option<usize> {
        self.basis.iter().position(|&b| b == col).map(|i| i + 1)
    }

    /// No objective-row entry below `-tolerance`.
    pub fn is_optimal(&self, tolerance: f64) -> bool {
        self.entering_column(tolerance).is_none()
    }

    /// No RHS below `-tolerance`.
    pub fn is_primal_feasible(&self, tolerance: f64) -> bool {
        self.dual_leaving_row(tolerance).is_none()
    }

    /// Most negative objective-row entry, lowest index on ties.
    pub fn entering_column(&self, tolerance: f64) -> Option<usize> {
        let mut min_val = -tolerance;
        let mut min_col = None;

        for j in 0..self.num_columns() {
            let value = self.rows[0][j];
            if value < min_val - tolerance || (min_col.is_none() && value < min_val) {
                min_val = value;
                min_col = Some(j);
            }
        }

        min_col
    }

    /// Ratio `rhs / entry` of every constraint row eligible for the primal
    /// ratio test in `col`, indexed by tableau row minus one.
    pub fn ratios(&self, col: usize, tolerance: f64) -> Vec<Option<f64>> {
        (1..self.rows.len())
            .map(|i| {
                let value = self.rows[i][col];
                let rhs = self.rhs(i);
                if value > tolerance && rhs >= -tolerance {
                    Some(rhs.max(0.0) / value)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Minimum-ratio row for entering column `col`, first row on ties.
    pub fn leaving_row(&self, col: usize, tolerance: f64) -> Option<usize> {
        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;

        for (i, ratio) in self.ratios(col, tolerance).into_iter().enumerate() {
            if let Some(ratio) = ratio {
                if ratio < min_ratio - tolerance || min_row.is_none() {
                    min_ratio = ratio;
                    min_row = Some(i + 1);
                }
            }
        }

        min_row
    }

    /// Row with the most negative RHS, first row on ties.
    pub fn dual_leaving_row(&self, tolerance: f64) -> Option<usize> {
        let mut min_rhs = -tolerance;
        let mut min_row = None;

        for i in 1..self.rows.len() {
            let rhs = self.rhs(i);
            if rhs < min_rhs - tolerance || (min_row.is_none() && rhs < min_rhs) {
                min_rhs = rhs;
                min_row = Some(i);
            }
        }

        min_row
    }

    /// Dual ratio test: among negative entries of `row`, the column
    /// minimizing `objective / |entry|`, lowest index on ties.
    pub fn dual_entering_column(&self, row: usize, tolerance: f64) -> Option<usize> {
        let mut min_ratio = f64::INFINITY;
        let mut min_col = None;

        for j in 0..self.num_columns() {
            let value = self.rows[row][j];
            if value < -tolerance {
                let ratio = self.rows[0][j] / value.abs();
                if ratio < min_ratio - tolerance || min_col.is_none() {
                    min_ratio = ratio;
                    min_col = Some(j);
                }
            }
        }

        min_col
    }

    /// Gauss-Jordan pivot on (`row`, `col`); `row` is a constraint row.
    pub fn pivot(&mut self, row: usize, col: usize, tolerance: f64) -> Result<(), SolveError> {
        let pivot_val = self.rows[row][col];
        if row == 0 || pivot_val.abs() <= tolerance {
            return Err(SolveError::ZeroPivot { row, column: col });
        }

        self.basis[row - 1] = col;

        // Scale pivot row
        for value in self.rows[row].iter_mut() {
            *value /= pivot_val;
        }
        self.rows[row][col] = 1.0;

        // Eliminate column in other rows
        let pivot_row = self.rows[row].clone();
        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (value, p) in other.iter_mut().zip(&pivot_row) {
                *value -= factor * p;
                if value.abs() < tolerance {
                    *value = 0.0;
                }
            }
            other[col] = 0.0;
        }

        Ok(())
    }

    /// Mask marking the pivot row and column.
    pub fn pivot_mask(&self, row: usize, col: usize) -> HighlightMask {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| (0..r.len()).map(|j| i == row || j == col).collect())
            .collect()
    }

    /// Plain-text rendering, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "{:>8} |", "basis");
        for name in &self.var_names {
            let _ = write!(out, "{:>10}", name);
        }
        let _ = writeln!(out, " |{:>10}", "rhs");

        for (i, row) in self.rows.iter().enumerate() {
            let label = if i == 0 {
                "z".to_string()
            } else {
                self.var_names[self.basis[i - 1]].clone()
            };
            let _ = write!(out, "{:>8} |", label);
            let (cells, rhs) = row.split_at(row.len() - 1);
            for value in cells {
                let _ = write!(out, "{:>10.4}", value);
            }
            let _ = writeln!(out, " |{:>10.4}", rhs[0]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard::standardize;

    fn wyndor() -> Tableau {
        let problem = Problem::maximize(vec![3.0, 5.0])
            .subject_to(vec![1.0, 0.0], Relation::Le, 4.0)
            .subject_to(vec![0.0, 2.0], Relation::Le, 12.0)
            .subject_to(vec![3.0, 2.0], Relation::Le, 18.0);
        Tableau::from_standard(&standardize(&problem))
    }

    #[test]
    fn test_initial_layout() {
        let t = wyndor();
        assert_eq!(t.rows.len(), 4);
        assert_eq!(t.rows[0], vec![-3.0, -5.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(t.rows[3], vec![3.0, 2.0, 0.0, 0.0, 1.0, 18.0]);
        assert_eq!(t.basis, vec![2, 3, 4]);
        assert_eq!(t.var_names, vec!["x1", "x2", "s1", "s2", "s3"]);
    }

    #[test]
    fn test_entering_and_leaving() {
        let t = wyndor();
        assert_eq!(t.entering_column(1e-9), Some(1));
        assert_eq!(t.ratios(1, 1e-9), vec![None, Some(6.0), Some(9.0)]);
        assert_eq!(t.leaving_row(1, 1e-9), Some(2));
    }

    #[test]
    fn test_ties_pick_first() {
        let problem = Problem::maximize(vec![2.0, 2.0])
            .subject_to(vec![1.0, 1.0], Relation::Le, 4.0)
            .subject_to(vec![2.0, 1.0], Relation::Le, 8.0);
        let t = Tableau::from_standard(&standardize(&problem));
        assert_eq!(t.entering_column(1e-9), Some(0));
        assert_eq!(t.leaving_row(0, 1e-9), Some(1));
    }

    #[test]
    fn test_pivot_keeps_identity_basis() {
        let mut t = wyndor();
        t.pivot(2, 1, 1e-9).unwrap();
        assert_eq!(t.basis, vec![2, 1, 4]);
        for (i, &b) in t.basis.iter().enumerate() {
            for r in 0..t.rows.len() {
                let expected = if r == i + 1 { 1.0 } else { 0.0 };
                assert!((t.rows[r][b] - expected).abs() < 1e-12);
            }
        }
        assert!((t.objective_value() - 30.0).abs() < 1e-12);
        assert_eq!(t.solution(), vec![0.0, 6.0]);
    }

    #[test]
    fn test_zero_pivot_is_an_error() {
        let mut t = wyndor();
        assert_eq!(t.pivot(1, 1, 1e-9), Err(SolveError::ZeroPivot { row: 1, column: 1 }));
    }

    #[test]
    fn test_dual_ratio_test() {
        let problem = Problem::minimize(vec![2.0, 3.0]).subject_to(vec![1.0, 1.0], Relation::Ge, 10.0);
        let t = Tableau::from_standard(&standardize(&problem));
        assert_eq!(t.dual_leaving_row(1e-9), Some(1));
        assert_eq!(t.dual_entering_column(1, 1e-9), Some(0));
        assert!(t.is_optimal(1e-9));
        assert!(!t.is_primal_feasible(1e-9));
    }

    #[test]
    fn test_render_has_one_line_per_row() {
        let t = wyndor();
        let text = t.render();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("rhs"));
        let mask = t.pivot_mask(2, 1);
        assert!(mask[2][0] && mask[0][1] && !mask[1][0]);
    }
}
