use crate::problem::Sense;
use crate::tableau::Tableau;

/// The result of solving a problem with any of the algorithms
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimplexResult {
    /// Solution status
    pub status: SolutionStatus,
    /// Objective value in the problem's own sense
    pub objective_value: f64,
    /// Values of the decision variables
    pub values: Vec<f64>,
    /// Final tableau, row 0 is the objective row and the last column is the RHS
    pub tableau: Vec<Vec<f64>>,
    /// Column of the basic variable in each constraint row
    pub basis: Vec<usize>,
    /// Column names, decision variables first then slacks
    pub var_names: Vec<String>,
    /// Pivots, cut rounds or search nodes, depending on the algorithm
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution of the LP was found
    Optimal,
    /// An optimal integer solution was found
    OptimalInteger,
    /// The problem is unbounded
    Unbounded,
    /// The problem is infeasible (no solution exists)
    Infeasible,
    /// A cut, node or depth limit stopped the search early
    Incomplete,
}

impl SolutionStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::OptimalInteger)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::OptimalInteger => "OPTIMAL INTEGER",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Incomplete => "INCOMPLETE",
        }
    }
}

/// Information about a violated constraint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintViolation {
    /// Constraint name
    pub constraint: String,
    /// Required value (from constraint RHS)
    pub required: f64,
    /// Actual value achieved
    pub actual: f64,
    /// How much the constraint is violated by
    pub violation_amount: f64,
    /// Human-readable description of what's wrong
    pub description: String,
}

impl SimplexResult {
    /// Reads the solution and objective value off a tableau.
    pub fn from_tableau(status: SolutionStatus, tableau: &Tableau, sense: Sense, iterations: usize) -> Self {
        let objective_value = match status {
            SolutionStatus::Unbounded => unbounded_value(sense),
            SolutionStatus::Infeasible => infeasible_value(sense),
            _ => in_sense(tableau.objective_value(), sense),
        };
        Self {
            status,
            objective_value,
            values: tableau.solution(),
            tableau: tableau.rows.clone(),
            basis: tableau.basis.clone(),
            var_names: tableau.var_names.clone(),
            iterations,
        }
    }

    /// A result without a tableau, as produced by the knapsack search.
    pub fn without_tableau(
        status: SolutionStatus,
        objective_value: f64,
        values: Vec<f64>,
        var_names: Vec<String>,
        iterations: usize,
    ) -> Self {
        Self {
            status,
            objective_value,
            values,
            tableau: Vec::new(),
            basis: Vec::new(),
            var_names,
            iterations,
        }
    }

    pub fn infeasible(sense: Sense, var_names: Vec<String>, iterations: usize) -> Self {
        Self::without_tableau(SolutionStatus::Infeasible, infeasible_value(sense), Vec::new(), var_names, iterations)
    }

    pub fn with_status(mut self, status: SolutionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// True when every decision variable is within `tolerance` of an integer.
    pub fn is_integral(&self, tolerance: f64) -> bool {
        self.values.iter().all(|v| (v - v.round()).abs() <= tolerance)
    }
}

/// Converts a maximize-form value back to the problem's sense.
fn in_sense(max_form_value: f64, sense: Sense) -> f64 {
    match sense {
        Sense::Maximize => max_form_value,
        Sense::Minimize => -max_form_value,
    }
}

fn unbounded_value(sense: Sense) -> f64 {
    match sense {
        Sense::Maximize => f64::INFINITY,
        Sense::Minimize => f64::NEG_INFINITY,
    }
}

fn infeasible_value(sense: Sense) -> f64 {
    match sense {
        Sense::Maximize => f64::NEG_INFINITY,
        Sense::Minimize => f64::INFINITY,
    }
}
