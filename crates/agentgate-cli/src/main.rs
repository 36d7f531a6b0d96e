//! agentgate CLI - policy-gated assistants from the terminal
//!
//! Every command sends exactly one request through a dispatch gate and prints
//! either the reply or the rejection.
//!
//! # Quick Start
//!
//! ```bash
//! # Credentials come from the environment or a .env file
//! echo "GEMINI_API_KEY=..." >> .env
//! echo "OPENROUTER_API_KEY=..." >> .env
//!
//! agentgate write
//! agentgate tutor "What is 12 * 7?"
//! agentgate support --name Sara --premium true --query "I need a refund"
//! agentgate bank --trace
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::{assist, bank, support, Session};

/// agentgate - single-turn assistants behind input and output guards
#[derive(Parser)]
#[command(name = "agentgate")]
#[command(version)]
#[command(about = "Policy-gated single-turn LLM assistants", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Inference backend (openrouter, gemini, openai_compat)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model override for the selected backend
    #[arg(long, global = true)]
    model: Option<String>,

    /// Print the dispatch trace as JSON
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a story, poem or essay (OpenRouter by default)
    Write {
        /// What to write
        prompt: Option<String>,
    },

    /// Route a question to the math or English expert
    Tutor {
        query: Option<String>,
    },

    /// Capital, languages and population of a country
    Country {
        query: Option<String>,
    },

    /// Read your mood or suggest an activity
    Mood {
        message: Option<String>,
    },

    /// Suggest a product for a need or symptom
    Store {
        need: Option<String>,
    },

    /// Support desk with billing and technical specialists
    Support {
        /// Customer name
        #[arg(short, long)]
        name: Option<String>,

        /// Premium customer (true/false)
        #[arg(long)]
        premium: Option<bool>,

        /// The support question
        #[arg(short, long)]
        query: Option<String>,
    },

    /// Run the bank scenarios: balance, transfer, off-topic request
    Bank,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let session = Session {
        provider: cli.provider,
        model: cli.model,
        show_trace: cli.trace,
    };

    match cli.command {
        Commands::Write { prompt } => assist::write(&session, prompt).await,
        Commands::Tutor { query } => assist::tutor(&session, query).await,
        Commands::Country { query } => assist::country(&session, query).await,
        Commands::Mood { message } => assist::mood(&session, message).await,
        Commands::Store { need } => assist::store(&session, need).await,
        Commands::Support { name, premium, query } => {
            support::run(&session, name, premium, query).await
        }
        Commands::Bank => bank::run(&session).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "agentgate", "support", "--name", "Sara", "--premium", "true", "--trace", "--provider", "openrouter",
        ])
        .unwrap();

        assert!(cli.trace);
        assert_eq!(cli.provider.as_deref(), Some("openrouter"));
        assert!(matches!(
            cli.command,
            Commands::Support { premium: Some(true), ref name, .. } if name.as_deref() == Some("Sara")
        ));
    }

    #[tokio::test]
    async fn test_execute_returns_command_errors() {
        let cli = Cli::try_parse_from(["agentgate", "--provider", "nope", "write", "a haiku"]).unwrap();
        let err = execute(cli).await.unwrap_err();
        assert!(err.to_string().starts_with("Unknown provider 'nope'"));
    }
}
