//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};

pub(crate) const CLI_LONG_ABOUT: &str =
    "Monadic decomposability checking for quantifier-free formulas.\n\n\
    A formula is monadically decomposable on a variable when it is equivalent\n\
    to a Boolean combination of formulas that each mention that variable alone\n\
    or none of it.\n\n\
    Examples:\n  \
    mondec list\n  \
    mondec suite --procedure both --format json";

#[derive(Parser)]
#[command(name = "mondec")]
#[command(about = "Monadic decomposability checking over an SMT oracle")]
#[command(long_about = CLI_LONG_ABOUT)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the built-in scenario suite
    Suite {
        /// Procedure: presburger | generic | both
        #[arg(long, default_value = "presburger")]
        procedure: String,

        /// Solver: z3 | z3-process | cvc5
        #[arg(long, default_value = "z3")]
        solver: String,

        /// Per-query solver timeout in seconds; also caps each generic search (0 disables)
        #[arg(long, default_value_t = 60)]
        timeout: u64,

        /// Classes the generic search may open before giving up
        #[arg(long, default_value_t = 16)]
        max_classes: usize,

        /// Generic candidate strategy: cegar | enumerate
        #[arg(long, default_value = "cegar")]
        strategy: String,

        /// Only run the named scenario
        #[arg(long)]
        scenario: Option<String>,

        /// Output format: text | json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the built-in scenarios
    List,
}
