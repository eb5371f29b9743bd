//! Standard-form transformations.
//!
//! Every tableau method works on a model in *maximize* sense whose rows are
//! all `<=`. The primal methods additionally need `b >= 0` so that the slack
//! basis is feasible; the dual simplex accepts negative right-hand sides.

use crate::error::SolveError;
use crate::problem::{Constraint, Problem, Relation, Sense};

/// Negates the objective of a minimization problem.
pub fn to_maximize(problem: &Problem) -> Problem {
    let mut out = problem.clone();
    if out.sense == Sense::Minimize {
        out.objective.iter_mut().for_each(|c| *c = -*c);
        out.sense = Sense::Maximize;
    }
    out
}

/// Rewrites every row as `<=`.
///
/// `>=` rows are negated, `=` rows are split into two consecutive rows
/// `a·x <= b` and `-a·x <= -b`. Row order is otherwise preserved.
pub fn to_less_equal(problem: &Problem) -> Problem {
    let mut out = problem.clone();
    out.constraints = Vec::with_capacity(problem.num_constraints());
    for c in &problem.constraints {
        match c.relation {
            Relation::Le => out.push(c.clone()),
            Relation::Ge => out.push(negated(c, c.name.clone())),
            Relation::Eq => {
                out.push(Constraint::new(format!("{} (<=)", c.name), c.coefficients.clone(), Relation::Le, c.rhs));
                out.push(negated(c, format!("{} (>=)", c.name)));
            }
        }
    }
    out
}

/// Maximize sense with `<=` rows only; right-hand sides may be negative.
pub fn standardize(problem: &Problem) -> Problem {
    to_less_equal(&to_maximize(problem))
}

/// True when every row is `<=` with a non-negative right-hand side.
pub fn is_primal_ready(problem: &Problem) -> bool {
    first_infeasible_row(problem).is_none()
}

/// Standard form for the primal methods, rejecting rows the slack basis
/// cannot satisfy.
pub fn primal_form(problem: &Problem) -> Result<Problem, SolveError> {
    problem.validate()?;
    let form = standardize(problem);
    match first_infeasible_row(&form) {
        Some(c) => Err(SolveError::NotStandardForm(c.name.clone())),
        None => Ok(form),
    }
}

/// Standard form for the dual simplex.
pub fn dual_form(problem: &Problem) -> Result<Problem, SolveError> {
    problem.validate()?;
    Ok(standardize(problem))
}

fn first_infeasible_row(problem: &Problem) -> Option<&Constraint> {
    problem
        .constraints
        .iter()
        .find(|c| c.relation != Relation::Le || c.rhs < 0.0)
}

fn negated(c: &Constraint, name: String) -> Constraint {
    Constraint::new(
        name,
        c.coefficients.iter().map(|a| -a).collect(),
        Relation::Le,
        -c.rhs,
    )
}
