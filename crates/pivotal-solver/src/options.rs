use crate::algorithm::LpMethod;

/// Limits and tolerances shared by every algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverOptions {
    /// Maximum pivots per LP solve before giving up
    pub max_iterations: usize,
    /// Tolerance for pivots, ratio tests and feasibility checks
    pub tolerance: f64,
    /// Distance from an integer below which a value counts as integral
    pub integrality_tolerance: f64,
    /// Maximum branch-and-bound recursion depth
    pub max_depth: usize,
    /// Maximum number of search nodes (branch-and-bound, knapsack)
    pub max_nodes: usize,
    /// Maximum number of Gomory cut rounds
    pub max_cuts: usize,
    /// LP method used for `<=`-only relaxations in branch-and-bound and cutting planes
    pub relaxation: LpMethod,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-9,
            integrality_tolerance: 1e-6,
            max_depth: 64,
            max_nodes: 100_000,
            max_cuts: 200,
            relaxation: LpMethod::Primal,
        }
    }
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn with_integrality_tolerance(mut self, tol: f64) -> Self {
        self.integrality_tolerance = tol;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_nodes(mut self, nodes: usize) -> Self {
        self.max_nodes = nodes;
        self
    }

    pub fn with_max_cuts(mut self, cuts: usize) -> Self {
        self.max_cuts = cuts;
        self
    }

    pub fn with_relaxation(mut self, method: LpMethod) -> Self {
        self.relaxation = method;
        self
    }
}
