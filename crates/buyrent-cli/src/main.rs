mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::amortization::AmortizeArgs;
use commands::compare::CompareArgs;
use commands::investing::{BreakevenArgs, DcaArgs, RequiredIrrArgs};

/// Buy-versus-rent housing calculator
#[derive(Parser)]
#[command(
    name = "buyrent",
    version,
    about = "Buy-versus-rent housing calculator",
    long_about = "Compares buying a house with a mortgage against renting and investing, \
                  with decimal precision. Sweeps loan rates and terms, back-solves the \
                  required investment return, and finds the market return at which a \
                  buyer and a renter investing the same monthly budget end up even."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare buying and renting across a grid of loan rates and terms
    Compare(CompareArgs),
    /// Print the monthly amortization table of a single loan
    Amortize(AmortizeArgs),
    /// Annual return renting must earn to match buying
    RequiredIrr(RequiredIrrArgs),
    /// Project a dollar-cost-averaging plan
    Dca(DcaArgs),
    /// Find the market return at which buyer and renter break even
    Breakeven(BreakevenArgs),
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

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("buyrent={default_level},buyrent_core={default_level}"))
    });

    // stdout carries the result document
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Compare(args) => commands::compare::run_compare(args),
        Commands::Amortize(args) => commands::amortization::run_amortize(args),
        Commands::RequiredIrr(args) => commands::investing::run_required_irr(args),
        Commands::Dca(args) => commands::investing::run_dca(args),
        Commands::Breakeven(args) => commands::investing::run_breakeven(args),
        Commands::Version => {
            println!("buyrent {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
