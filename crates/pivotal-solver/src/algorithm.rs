use std::fmt;
use std::str::FromStr;

use crate::branch_bound::BranchAndBound;
use crate::cutting_plane::CuttingPlane;
use crate::dual::DualSimplex;
use crate::error::SolveError;
use crate::knapsack::KnapsackBranchAndBound;
use crate::options::SolverOptions;
use crate::primal::PrimalSimplex;
use crate::problem::Problem;
use crate::revised::RevisedSimplex;
use crate::solution::SimplexResult;
use crate::trace::StepSink;

/// The LP methods usable as a relaxation solver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LpMethod {
    Primal,
    RevisedPrimal,
    Dual,
}

impl LpMethod {
    pub fn solve(
        self,
        problem: &Problem,
        options: &SolverOptions,
        sink: &mut dyn StepSink,
    ) -> Result<SimplexResult, SolveError> {
        match self {
            LpMethod::Primal => PrimalSimplex::with_options(*options).solve_traced(problem, sink),
            LpMethod::RevisedPrimal => RevisedSimplex::with_options(*options).solve_traced(problem, sink),
            LpMethod::Dual => DualSimplex::with_options(*options).solve_traced(problem, sink),
        }
    }
}

/// Every solving algorithm the engine offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Primal,
    RevisedPrimal,
    Dual,
    BranchAndBound,
    BranchAndBoundKnapsack,
    CuttingPlane,
    CuttingPlaneRevised,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Primal,
        Algorithm::RevisedPrimal,
        Algorithm::Dual,
        Algorithm::BranchAndBound,
        Algorithm::BranchAndBoundKnapsack,
        Algorithm::CuttingPlane,
        Algorithm::CuttingPlaneRevised,
    ];

    /// Canonical name, accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Primal => "primal simplex",
            Algorithm::RevisedPrimal => "revised primal simplex",
            Algorithm::Dual => "dual simplex",
            Algorithm::BranchAndBound => "branch and bound",
            Algorithm::BranchAndBoundKnapsack => "branch and bound knapsack",
            Algorithm::CuttingPlane => "cutting plane",
            Algorithm::CuttingPlaneRevised => "cutting plane revised",
        }
    }

    /// Whether the algorithm looks for integer solutions.
    pub fn is_integer(self) -> bool {
        !matches!(self, Algorithm::Primal | Algorithm::RevisedPrimal | Algorithm::Dual)
    }

    pub fn solve(
        self,
        problem: &Problem,
        options: &SolverOptions,
        sink: &mut dyn StepSink,
    ) -> Result<SimplexResult, SolveError> {
        match self {
            Algorithm::Primal => LpMethod::Primal.solve(problem, options, sink),
            Algorithm::RevisedPrimal => LpMethod::RevisedPrimal.solve(problem, options, sink),
            Algorithm::Dual => LpMethod::Dual.solve(problem, options, sink),
            Algorithm::BranchAndBound => BranchAndBound::with_options(*options).solve_traced(problem, sink),
            Algorithm::BranchAndBoundKnapsack => {
                KnapsackBranchAndBound::with_options(*options).solve_traced(problem, sink)
            }
            Algorithm::CuttingPlane => CuttingPlane::with_options(*options).solve_traced(problem, sink),
            Algorithm::CuttingPlaneRevised => CuttingPlane::with_options(*options)
                .with_method(LpMethod::RevisedPrimal)
                .solve_traced(problem, sink),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SolveError;

    /// Case-insensitive; runs of whitespace, `-` and `_` count as one space.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let algorithm = match normalized.as_str() {
            "primal" | "simplex" | "primal simplex" | "tableau simplex" => Algorithm::Primal,
            "revised" | "revised simplex" | "revised primal simplex" => Algorithm::RevisedPrimal,
            "dual" | "dual simplex" => Algorithm::Dual,
            "branch and bound" | "bnb" | "b&b" => Algorithm::BranchAndBound,
            "branch and bound knapsack" | "knapsack" | "knapsack branch and bound" => {
                Algorithm::BranchAndBoundKnapsack
            }
            "cutting plane" | "gomory" | "gomory cutting plane" => Algorithm::CuttingPlane,
            "cutting plane revised" | "revised cutting plane" | "gomory revised" => Algorithm::CuttingPlaneRevised,
            _ => return Err(SolveError::UnsupportedAlgorithm(s.trim().to_string())),
        };
        Ok(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Relation;
    use crate::solution::SolutionStatus;
    use crate::trace::NoSteps;

    #[test]
    fn test_parse_names() {
        assert_eq!("Dual Simplex".parse::<Algorithm>(), Ok(Algorithm::Dual));
        assert_eq!("  branch   and\tbound ".parse::<Algorithm>(), Ok(Algorithm::BranchAndBound));
        assert_eq!(
            "BRANCH AND BOUND KNAPSACK".parse::<Algorithm>(),
            Ok(Algorithm::BranchAndBoundKnapsack)
        );
        assert_eq!("cutting-plane_revised".parse::<Algorithm>(), Ok(Algorithm::CuttingPlaneRevised));
        assert_eq!(
            "interior point".parse::<Algorithm>(),
            Err(SolveError::UnsupportedAlgorithm("interior point".to_string()))
        );
    }

    #[test]
    fn test_canonical_names_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>(), Ok(algorithm));
            assert_eq!(algorithm.to_string(), algorithm.name());
        }
    }

    #[test]
    fn test_dispatch() {
        let problem = Problem::maximize(vec![8.0, 5.0])
            .subject_to(vec![1.0, 1.0], Relation::Le, 6.0)
            .subject_to(vec![9.0, 5.0], Relation::Le, 45.0);
        let options = SolverOptions::default();

        let lp = Algorithm::Primal.solve(&problem, &options, &mut NoSteps).unwrap();
        assert_eq!(lp.status, SolutionStatus::Optimal);
        assert!((lp.objective_value - 41.25).abs() < 1e-6);

        let ip = Algorithm::BranchAndBound.solve(&problem, &options, &mut NoSteps).unwrap();
        assert_eq!(ip.status, SolutionStatus::OptimalInteger);
        assert!((ip.objective_value - 40.0).abs() < 1e-6);
    }
}
