//! Gomory fractional cutting planes.
//!
//! Each round solves the LP relaxation of the current model, picks the first
//! fractional decision variable and derives a cut from the tableau row in
//! which it is basic. The cut is appended to a clone of the model and the
//! relaxation is solved again until the solution is integral.

use tracing::{debug, info, warn};

use crate::algorithm::LpMethod;
use crate::error::SolveError;
use crate::options::SolverOptions;
use crate::problem::{Constraint, Problem, Relation};
use crate::solution::{SimplexResult, SolutionStatus};
use crate::standard;
use crate::trace::{emit, NoSteps, Step, StepSink};

#[derive(Debug, Clone)]
pub struct CuttingPlane {
    options: SolverOptions,
    method: LpMethod,
}

impl Default for CuttingPlane {
    fn default() -> Self {
        Self {
            options: SolverOptions::default(),
            method: LpMethod::Primal,
        }
    }
}

impl CuttingPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `options.relaxation` as the method for `<=`-form models.
    pub fn with_options(options: SolverOptions) -> Self {
        Self {
            options,
            method: options.relaxation,
        }
    }

    pub fn with_method(mut self, method: LpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_max_cuts(mut self, max: usize) -> Self {
        self.options.max_cuts = max;
        self
    }

    pub fn solve(&self, problem: &Problem) -> Result<SimplexResult, SolveError> {
        self.solve_traced(problem, &mut NoSteps)
    }

    /// Solve, reporting one step per relaxation solved.
    pub fn solve_traced(&self, problem: &Problem, sink: &mut dyn StepSink) -> Result<SimplexResult, SolveError> {
        problem.validate()?;
        if !has_integer_data(&standard::standardize(problem)) {
            warn!("constraint data is not integral, Gomory cuts may remove feasible integer points");
        }

        let eps = self.options.integrality_tolerance;
        let mut model = problem.clone();
        let mut rounds = 0;

        loop {
            let method = self.method_for(&model);
            let relaxation = method.solve(&model, &self.options, &mut NoSteps)?;

            if relaxation.status != SolutionStatus::Optimal {
                debug!(round = rounds, status = relaxation.status.as_str(), "relaxation is not optimal, stopping");
                emit(sink, || {
                    Step::new(
                        format!("round {}", rounds + 1),
                        format!("relaxation is {}", relaxation.status.as_str()),
                    )
                });
                return Ok(relaxation.with_iterations(rounds));
            }

            let Some(var) = first_fractional(&relaxation.values, eps) else {
                emit(sink, || {
                    Step::new(
                        format!("round {}", rounds + 1),
                        format!("integral solution\n{}", render_rows(&relaxation)),
                    )
                });
                info!(
                    method = "cutting plane",
                    cuts = rounds,
                    objective = relaxation.objective_value,
                    "integral solution found"
                );
                return Ok(relaxation
                    .with_status(SolutionStatus::OptimalInteger)
                    .with_iterations(rounds));
            };

            if rounds >= self.options.max_cuts {
                warn!(cuts = rounds, "cut limit reached before an integral solution");
                return Ok(relaxation
                    .with_status(SolutionStatus::Incomplete)
                    .with_iterations(rounds));
            }

            let Some(mut cut) = gomory_cut(&model, &relaxation, var, eps) else {
                warn!(variable = var, "fractional variable is not basic, no cut available");
                return Ok(relaxation
                    .with_status(SolutionStatus::Incomplete)
                    .with_iterations(rounds));
            };
            rounds += 1;
            cut.name = format!("cut {}", rounds);

            debug!(
                round = rounds,
                variable = %model.variable_name(var),
                value = relaxation.values[var],
                rhs = cut.rhs,
                "adding Gomory cut"
            );
            emit(sink, || {
                Step::new(
                    format!("round {}", rounds),
                    format!(
                        "{} = {:.4} is fractional, adding {}: {}\n{}",
                        model.variable_name(var),
                        relaxation.values[var],
                        cut.name,
                        describe(&cut, &model),
                        render_rows(&relaxation)
                    ),
                )
            });
            model.push(cut);
        }
    }

    /// The configured method while the slack basis is feasible, otherwise the dual simplex.
    fn method_for(&self, model: &Problem) -> LpMethod {
        if self.method != LpMethod::Dual && standard::is_primal_ready(&standard::standardize(model)) {
            self.method
        } else {
            LpMethod::Dual
        }
    }
}

/// Gomory fractional cut from the tableau row in which `var` is basic.
///
/// With `f(v) = v - floor(v)` the row yields `Σ f(a_j) x_j + Σ f(a_s) s ≥ f(b)`
/// over all columns. Each slack is replaced by `b_i - a_i·x` of its
/// standardized row, so the returned `>=` constraint only involves decision
/// variables. Returns `None` when `var` is not basic.
pub fn gomory_cut(model: &Problem, relaxation: &SimplexResult, var: usize, eps: f64) -> Option<Constraint> {
    let position = relaxation.basis.iter().position(|&b| b == var)?;
    let row = relaxation.tableau.get(position + 1)?;
    let form = standard::standardize(model);
    let n = model.num_variables();
    let rhs_col = row.len() - 1;

    let mut coefficients: Vec<f64> = (0..n).map(|j| fractional_part(row[j], eps)).collect();
    let mut rhs = fractional_part(row[rhs_col], eps);

    for (i, c) in form.constraints.iter().enumerate() {
        let f = fractional_part(row[n + i], eps);
        if f == 0.0 {
            continue;
        }
        for (a, &coef) in coefficients.iter_mut().zip(&c.coefficients) {
            *a -= f * coef;
        }
        rhs -= f * c.rhs;
    }

    for a in coefficients.iter_mut() {
        if a.abs() < eps {
            *a = 0.0;
        }
    }

    Some(Constraint::new("cut", coefficients, Relation::Ge, rhs))
}

/// `v - floor(v)`, snapped to zero within `eps` of an integer.
fn fractional_part(v: f64, eps: f64) -> f64 {
    let f = v - v.floor();
    if f <= eps || f >= 1.0 - eps {
        0.0
    } else {
        f
    }
}

fn first_fractional(values: &[f64], eps: f64) -> Option<usize> {
    values.iter().position(|&v| fractional_part(v, eps) != 0.0)
}

fn has_integer_data(form: &Problem) -> bool {
    form.constraints
        .iter()
        .all(|c| c.rhs.fract() == 0.0 && c.coefficients.iter().all(|a| a.fract() == 0.0))
}

fn describe(cut: &Constraint, model: &Problem) -> String {
    let terms: Vec<String> = cut
        .coefficients
        .iter()
        .enumerate()
        .filter(|(_, a)| **a != 0.0)
        .map(|(j, a)| format!("{:.4}*{}", a, model.variable_name(j)))
        .collect();
    format!("{} {} {:.4}", terms.join(" + "), cut.relation, cut.rhs)
}

fn render_rows(result: &SimplexResult) -> String {
    result
        .tableau
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| format!("{:>10.4}", v))
                .collect::<Vec<_>>()
                .join("")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
