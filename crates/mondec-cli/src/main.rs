mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Suite {
            procedure,
            solver,
            timeout,
            max_classes,
            strategy,
            scenario,
            format,
        } => {
            let options = commands::SuiteOptions {
                procedures: commands::parse_procedures(&procedure)?,
                solver: commands::parse_solver_choice(&solver)?,
                timeout_secs: timeout,
                max_classes,
                strategy: commands::parse_strategy(&strategy)?,
                scenario,
                format: commands::parse_output_format(&format)?,
            };
            commands::run_suite_command(&options)?;
        }
        Commands::List => commands::run_list_command()?,
    }

    Ok(())
}
