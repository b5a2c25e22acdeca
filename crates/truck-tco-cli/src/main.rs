mod commands;
mod input;
mod logging;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::compute::ComputeArgs;
use commands::constants::ConstantsArgs;
use commands::normalize::NormalizeArgs;
use commands::reference::ReferenceArgs;

/// Truck total-cost-of-ownership comparisons
#[derive(Parser)]
#[command(
    name = "tco",
    version,
    about = "Truck total-cost-of-ownership comparisons",
    long_about = "Compare the total cost of ownership of diesel, battery-electric, \
                  fuel-cell and catenary trucks with decimal precision. Costs are \
                  itemised per technology, scaled to the holding period and adjusted \
                  for CAPEX subsidies measured against the diesel baseline."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the cost breakdown for a set of technologies
    Compute(ComputeArgs),
    /// Convert a consumption or energy price value to kWh-based units
    Normalize(NormalizeArgs),
    /// Print reference data rows for a year and weight class
    Reference(ReferenceArgs),
    /// Print the active physical constants and input bounds
    Constants(ConstantsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compute(args) => commands::compute::run_compute(args),
        Commands::Normalize(args) => commands::normalize::run_normalize(args),
        Commands::Reference(args) => commands::reference::run_reference(args),
        Commands::Constants(args) => commands::constants::run_constants(args),
        Commands::Version => {
            println!("tco {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
