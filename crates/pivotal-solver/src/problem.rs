use std::fmt;

use crate::error::SolveError;
use crate::solution::ConstraintViolation;

/// A linear (or pure integer) program over non-negative variables
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Problem {
    /// Variable names, one per objective coefficient
    #[cfg_attr(feature = "serde", serde(default))]
    pub variables: Vec<String>,
    /// Whether to minimize or maximize
    pub sense: Sense,
    /// Objective function coefficients
    pub objective: Vec<f64>,
    /// Constraints
    #[cfg_attr(feature = "serde", serde(default))]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constraint {
    /// Name/label for the constraint (for diagnostics)
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: String,
    /// Coefficients for each variable
    pub coefficients: Vec<f64>,
    /// Comparison operator
    pub relation: Relation,
    /// Right-hand side value
    pub rhs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Eq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => write!(f, "<="),
            Relation::Ge => write!(f, ">="),
            Relation::Eq => write!(f, "="),
        }
    }
}

impl Constraint {
    pub fn new(name: impl Into<String>, coefficients: Vec<f64>, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            coefficients,
            relation,
            rhs,
        }
    }

    /// Left-hand side value `a·x`
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.coefficients.iter().zip(values).map(|(a, x)| a * x).sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.relation {
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

impl Problem {
    /// Creates a problem with default variable names `x1..xn` and no constraints.
    pub fn new(sense: Sense, objective: Vec<f64>) -> Self {
        let variables = (1..=objective.len()).map(|j| format!("x{}", j)).collect();
        Self {
            variables,
            sense,
            objective,
            constraints: Vec::new(),
        }
    }

    pub fn maximize(objective: Vec<f64>) -> Self {
        Self::new(Sense::Maximize, objective)
    }

    pub fn minimize(objective: Vec<f64>) -> Self {
        Self::new(Sense::Minimize, objective)
    }

    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = variables;
        self
    }

    /// Builder form of [`Problem::add_constraint`] with an automatic name.
    pub fn subject_to(mut self, coefficients: Vec<f64>, relation: Relation, rhs: f64) -> Self {
        let name = format!("c{}", self.constraints.len() + 1);
        self.add_constraint(name, coefficients, relation, rhs);
        self
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, relation: Relation, rhs: f64) {
        self.constraints.push(Constraint::new(name, coefficients, relation, rhs));
    }

    pub fn push(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_maximize(&self) -> bool {
        self.sense == Sense::Maximize
    }

    /// Display name of variable `j`, falling back to `x{j+1}`.
    pub fn variable_name(&self, j: usize) -> String {
        self.variables
            .get(j)
            .cloned()
            .unwrap_or_else(|| format!("x{}", j + 1))
    }

    pub fn variable_names(&self) -> Vec<String> {
        (0..self.num_variables()).map(|j| self.variable_name(j)).collect()
    }

    /// Checks dimensions and finiteness.
    pub fn validate(&self) -> Result<(), SolveError> {
        let n = self.num_variables();
        if n == 0 {
            return Err(SolveError::EmptyObjective);
        }
        if self.objective.iter().any(|c| !c.is_finite()) {
            return Err(SolveError::NonFiniteCoefficient("objective".to_string()));
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(SolveError::DimensionMismatch {
                    constraint: c.name.clone(),
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if c.coefficients.iter().any(|a| !a.is_finite()) || !c.rhs.is_finite() {
                return Err(SolveError::NonFiniteCoefficient(c.name.clone()));
            }
        }
        Ok(())
    }

    /// Objective value of `values` in the problem's own sense.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, x)| c * x).sum()
    }

    /// True when `values` is non-negative and satisfies every constraint.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.num_variables()
            && values.iter().all(|&x| x >= -tolerance)
            && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }

    /// Find which constraints are violated by a given solution
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for c in &self.constraints {
            let lhs = c.lhs(values);

            let (is_violated, violation_amount, description) = match c.relation {
                Relation::Le => {
                    if lhs > c.rhs + tolerance {
                        let amt = lhs - c.rhs;
                        (true, amt, format!("{} exceeds maximum of {:.4} by {:.4}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                Relation::Ge => {
                    if lhs < c.rhs - tolerance {
                        let amt = c.rhs - lhs;
                        (true, amt, format!("{} is below minimum of {:.4} by {:.4}", c.name, c.rhs, amt))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
                Relation::Eq => {
                    let diff = (lhs - c.rhs).abs();
                    if diff > tolerance {
                        (true, diff, format!("{} requires exactly {:.4} but got {:.4}", c.name, c.rhs, lhs))
                    } else {
                        (false, 0.0, String::new())
                    }
                }
            };

            if is_violated {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Worst first
        violations.sort_by(|a, b| b.violation_amount.total_cmp(&a.violation_amount));

        violations
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sense = match self.sense {
            Sense::Maximize => "maximize",
            Sense::Minimize => "minimize",
        };
        writeln!(f, "{} {}", sense, linear_expr(&self.objective, self))?;
        for c in &self.constraints {
            writeln!(f, "  {}: {} {} {}", c.name, linear_expr(&c.coefficients, self), c.relation, c.rhs)?;
        }
        Ok(())
    }
}

fn linear_expr(coefficients: &[f64], problem: &Problem) -> String {
    let terms: Vec<String> = coefficients
        .iter()
        .enumerate()
        .filter(|(_, a)| **a != 0.0)
        .map(|(j, a)| format!("{}*{}", a, problem.variable_name(j)))
        .collect();
    if terms.is_empty() {
        "0".to_string()
    } else {
        terms.join(" + ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let problem = Problem::maximize(vec![3.0, 5.0]).subject_to(vec![1.0, 0.0], Relation::Le, 4.0);
        assert_eq!(problem.variables, vec!["x1", "x2"]);
        assert_eq!(problem.constraints[0].name, "c1");
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.num_constraints(), 1);
    }

    #[test]
    fn test_validate_dimension_mismatch() {
        let problem = Problem::maximize(vec![1.0, 1.0]).subject_to(vec![1.0], Relation::Le, 4.0);
        assert_eq!(
            problem.validate(),
            Err(SolveError::DimensionMismatch {
                constraint: "c1".to_string(),
                expected: 2,
                found: 1,
            })
        );
        assert_eq!(Problem::maximize(vec![]).validate(), Err(SolveError::EmptyObjective));
    }

    #[test]
    fn test_violations_sorted_worst_first() {
        let problem = Problem::minimize(vec![1.0, 1.0])
            .subject_to(vec![1.0, 1.0], Relation::Ge, 10.0)
            .subject_to(vec![1.0, 0.0], Relation::Le, 1.0)
            .subject_to(vec![0.0, 1.0], Relation::Eq, 2.0);

        let violations = problem.violations(&[3.0, 2.0], 1e-9);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].constraint, "c1");
        assert!((violations[0].violation_amount - 5.0).abs() < 1e-9);
        assert_eq!(violations[1].constraint, "c2");
        assert!(!problem.is_feasible(&[3.0, 2.0], 1e-9));
        assert!(!problem.is_feasible(&[1.0, 9.0], 1e-9));
        assert!(!problem.is_feasible(&[8.0, 2.0], 1e-9));
        assert!(!problem.is_feasible(&[1.0, 2.0], 1e-9));
    }

    #[test]
    fn test_feasible_point() {
        let problem = Problem::maximize(vec![1.0, 1.0])
            .subject_to(vec![1.0, 1.0], Relation::Le, 4.0)
            .subject_to(vec![1.0, -1.0], Relation::Eq, 0.0);
        assert!(problem.is_feasible(&[2.0, 2.0], 1e-9));
        assert!(!problem.is_feasible(&[-1.0, -1.0], 1e-9));
        assert!((problem.evaluate(&[2.0, 2.0]) - 4.0).abs() < 1e-12);
    }
}
