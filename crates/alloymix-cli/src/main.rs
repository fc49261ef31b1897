mod error;
mod input;

use std::path::PathBuf;
use std::time::Duration;

use alloymix_blend::{BatchJob, BatchResult, BatchSequencer, BlendSolution, BlendSolver, Element};
use alloymix_solver::Solver;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "alloymix")]
#[command(about = "Least-cost alloy blending from scrap inventory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Material table (Scrap_Type, COST, SI, FE, CU, MN, MG, Available_Amount)
    materials: PathBuf,
    /// Product spec table (Product, Amount, <ELEM>_MIN, <ELEM>_MAX)
    specs: PathBuf,
}

#[derive(Args)]
struct SolverOptions {
    /// Maximum simplex pivots per phase
    #[arg(long, default_value_t = 10000)]
    max_iterations: usize,
    /// Wall-clock budget per product, in milliseconds
    #[arg(long)]
    time_budget_ms: Option<u64>,
}

impl SolverOptions {
    fn blend_solver(&self) -> BlendSolver {
        let mut solver = Solver::new().with_max_iterations(self.max_iterations);
        if let Some(ms) = self.time_budget_ms {
            solver = solver.with_time_budget(Duration::from_millis(ms));
        }
        BlendSolver::new().with_solver(solver)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Pretty,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the material and product spec tables
    Check {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Find the cheapest blend for one product
    Solve {
        #[command(flatten)]
        inputs: Inputs,
        /// The product to blend
        product: String,
        /// Amount to produce (defaults to the spec's Amount)
        #[arg(short, long)]
        amount: Option<f64>,
        #[command(flatten)]
        options: SolverOptions,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
    },
    /// Blend several products in order from one shared inventory
    Batch {
        #[command(flatten)]
        inputs: Inputs,
        /// Run order as Product,Amount rows (defaults to every spec at its Amount)
        #[arg(short, long)]
        jobs: Option<PathBuf>,
        #[command(flatten)]
        options: SolverOptions,
        /// Output format
        #[arg(short, long, value_enum, default_value = "pretty")]
        format: Format,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` overrides the
/// default `warn` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Commands::Check { inputs } => {
            let materials = input::load_materials(&inputs.materials)?;
            let specs = input::load_specs(&inputs.specs)?;

            println!("✓ {} is valid", inputs.materials.display());
            println!("  {} materials", materials.len());
            println!("✓ {} is valid", inputs.specs.display());
            println!("  {} products", specs.len());
            Ok(0)
        }
        Commands::Solve {
            inputs,
            product,
            amount,
            options,
            format,
        } => {
            let materials = input::load_materials(&inputs.materials)?;
            let specs = input::load_specs(&inputs.specs)?;
            tracing::info!(materials = materials.len(), products = specs.len(), "inputs loaded");

            let amount = match amount {
                Some(a) => a,
                None => specs
                    .get(&product)
                    .map(|spec| spec.default_amount)
                    .ok_or_else(|| CliError::UnknownProduct(product.clone()))?,
            };

            let solution = options.blend_solver().solve(&materials, &specs, &product, amount);

            match format {
                Format::Pretty => print_solution(&solution),
                Format::Json => println!("{}", serde_json::to_string_pretty(&solution)?),
                Format::Csv => write_csv(&BatchResult::from_outcomes(vec![solution.clone()]))?,
            }

            Ok(if solution.is_optimal() { 0 } else { 1 })
        }
        Commands::Batch {
            inputs,
            jobs,
            options,
            format,
        } => {
            let materials = input::load_materials(&inputs.materials)?;
            let specs = input::load_specs(&inputs.specs)?;
            let jobs = match jobs {
                Some(path) => input::load_jobs(&path)?,
                None => BatchJob::from_defaults(&specs),
            };
            tracing::info!(
                materials = materials.len(),
                products = specs.len(),
                jobs = jobs.len(),
                "inputs loaded"
            );
            if jobs.is_empty() {
                return Err(CliError::EmptyBatch);
            }

            let sequencer = BatchSequencer::new().with_solver(options.blend_solver());
            let result = sequencer.run(&materials, &specs, &jobs);

            match format {
                Format::Pretty => print_batch(&result),
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                Format::Csv => write_csv(&result)?,
            }
            Ok(0)
        }
    }
}

fn print_solution(solution: &BlendSolution) {
    println!("Product: {}", solution.product);
    println!("Amount: {}", solution.amount);

    let Some(blend) = solution.blend() else {
        println!("Status: {}", solution.status().to_string().to_uppercase());
        if let Some(message) = solution.message() {
            println!("{}", message);
        }
        return;
    };

    println!("Status: OPTIMAL");
    println!("Total cost: {:.2}", blend.total_cost);
    println!("Cost per unit: {:.4}", blend.cost_per_unit);
    println!();
    println!("Materials:");
    for line in &blend.lines {
        let pct = line.quantity / blend.total_amount * 100.0;
        println!(
            "  {:20} {:10.2} ({:5.2}%)  cost {:.2}",
            line.material, line.quantity, pct, line.cost
        );
    }
    println!();
    println!("Composition:");
    for element in Element::ALL {
        let fraction = blend.resulting_composition.get(&element).copied().unwrap_or(0.0);
        println!("  {:4} {:.4}", element, fraction);
    }
}

fn print_batch(result: &BatchResult) {
    for solution in &result.outcomes {
        print_solution(solution);
        println!();
    }

    println!("Total batch cost: {:.2}", result.total_batch_cost);
    println!("Material usage:");
    for (material, quantity) in &result.total_scrap_usage {
        println!("  {:20} {:10.2}", material, quantity);
    }
}

fn write_csv(result: &BatchResult) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for row in result.report_rows() {
        writer
            .serialize(row)
            .map_err(|e| CliError::Output(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
