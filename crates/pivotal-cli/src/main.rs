use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use pivotal_solver::{standard, Algorithm, Problem, Relation, SolutionStatus, SolverOptions, Step};

#[derive(Parser)]
#[command(name = "pivotal")]
#[command(about = "Step-by-step simplex, branch-and-bound and cutting-plane solver", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a problem stored as JSON
    Solve {
        /// The problem file
        file: PathBuf,
        /// Algorithm name, see `pivotal algorithms`
        #[arg(short, long, default_value = "primal simplex")]
        algorithm: String,
        /// Print every recorded step before the result
        #[arg(long)]
        steps: bool,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check a problem file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// List the available algorithms
    Algorithms,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose > 0 {
        let level = match cli.verbose {
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Failed to set tracing subscriber: {}", e);
            std::process::exit(1);
        }
    }

    match cli.command {
        Commands::Solve {
            file,
            algorithm,
            steps,
            format,
        } => {
            let problem = load(&file);
            let algorithm: Algorithm = match algorithm.parse() {
                Ok(a) => a,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!("Run `pivotal algorithms` for the list of names.");
                    std::process::exit(1);
                }
            };

            let mut recorded: Vec<Step> = Vec::new();
            let outcome = if steps {
                algorithm.solve(&problem, &SolverOptions::default(), &mut recorded)
            } else {
                algorithm.solve(&problem, &SolverOptions::default(), &mut pivotal_solver::NoSteps)
            };
            let result = match outcome {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };

            if format == "json" {
                let output = serde_json::json!({
                    "algorithm": algorithm.name(),
                    "steps": recorded,
                    "result": result,
                });
                match serde_json::to_string_pretty(&output) {
                    Ok(s) => println!("{}", s),
                    Err(e) => {
                        eprintln!("Error writing JSON: {}", e);
                        std::process::exit(1);
                    }
                }
            } else {
                for step in &recorded {
                    println!("== {} ==", step.label);
                    println!("{}", step.snapshot);
                    println!();
                }

                println!("Algorithm: {}", algorithm);
                println!("Status: {}", result.status.as_str());
                match result.status {
                    SolutionStatus::Optimal | SolutionStatus::OptimalInteger | SolutionStatus::Incomplete => {
                        if result.status == SolutionStatus::Incomplete {
                            println!("A search limit was reached; the values below are the best found.");
                        }
                        println!("Objective: {:.4}", result.objective_value);
                        println!("Iterations: {}", result.iterations);
                        println!();
                        println!("Values:");
                        for (j, value) in result.values.iter().enumerate() {
                            println!("  {:20} {:12.4}", problem.variable_name(j), value);
                        }
                    }
                    SolutionStatus::Infeasible => {
                        println!("No solution exists that satisfies all constraints.");
                    }
                    SolutionStatus::Unbounded => {
                        println!("The problem has no finite optimal solution.");
                    }
                }
            }

            if !result.is_optimal() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let problem = load(&file);
            if let Err(e) = problem.validate() {
                eprintln!("✗ {} has errors:", file.display());
                eprintln!("  {}", e);
                std::process::exit(1);
            }

            let count = |relation: Relation| problem.constraints.iter().filter(|c| c.relation == relation).count();
            println!("✓ {} is valid", file.display());
            println!("  {} variables", problem.num_variables());
            println!("  {} <= constraints", count(Relation::Le));
            println!("  {} >= constraints", count(Relation::Ge));
            println!("  {} = constraints", count(Relation::Eq));
            if standard::is_primal_ready(&standard::standardize(&problem)) {
                println!("  slack basis is feasible, every algorithm applies");
            } else {
                println!("  slack basis is infeasible, primal methods need the dual simplex");
            }
        }
        Commands::Algorithms => {
            for algorithm in Algorithm::ALL {
                let kind = if algorithm.is_integer() { "integer" } else { "linear" };
                println!("  {:28} {}", algorithm.name(), kind);
            }
        }
    }
}

fn load(file: &Path) -> Problem {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            std::process::exit(1);
        }
    }
}
