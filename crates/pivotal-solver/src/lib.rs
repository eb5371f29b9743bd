mod algorithm;
mod branch_bound;
mod cutting_plane;
mod dual;
mod error;
mod knapsack;
mod options;
mod primal;
mod problem;
mod revised;
mod solution;
pub mod standard;
mod tableau;
mod trace;

pub use algorithm::{Algorithm, LpMethod};
pub use branch_bound::BranchAndBound;
pub use cutting_plane::{gomory_cut, CuttingPlane};
pub use dual::DualSimplex;
pub use error::SolveError;
pub use knapsack::KnapsackBranchAndBound;
pub use options::SolverOptions;
pub use primal::PrimalSimplex;
pub use problem::{Constraint, Problem, Relation, Sense};
pub use revised::{RevisedIteration, RevisedRun, RevisedSimplex};
pub use solution::{ConstraintViolation, SimplexResult, SolutionStatus};
pub use tableau::Tableau;
pub use trace::{HighlightMask, NoSteps, Step, StepSink};
