//! reagent CLI: the composition root.
//!
//! Commands:
//! - `init`          write a default config file
//! - `solve`         run one task through the ReAct loop
//! - `memory-stats`  summarize the episodic memory
//! - `tools`         list the registered tools

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reagent",
    about = "reagent: a ReAct agent that reasons, calls tools and remembers what worked",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Solve a task, streaming each step as it happens
    Solve {
        /// The task to solve
        task: String,

        /// Print events and the outcome as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show statistics over remembered tasks
    MemoryStats,

    /// List the tools available to the agent
    Tools,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the event stream and the answer.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run()?,
        Commands::Solve { task, json } => commands::solve::run(&task, json).await?,
        Commands::MemoryStats => commands::memory::stats().await?,
        Commands::Tools => commands::tools::run()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_solve_with_json_flag() {
        let cli = Cli::try_parse_from(["reagent", "solve", "compute 12 + 8", "--json"]).unwrap();
        match cli.command {
            Commands::Solve { task, json } => {
                assert_eq!(task, "compute 12 + 8");
                assert!(json);
            }
            _ => panic!("expected solve"),
        }
    }

    #[test]
    fn parses_kebab_case_commands() {
        let cli = Cli::try_parse_from(["reagent", "-v", "memory-stats"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::MemoryStats));
    }

    #[test]
    fn solve_requires_a_task() {
        assert!(Cli::try_parse_from(["reagent", "solve"]).is_err());
    }
}
