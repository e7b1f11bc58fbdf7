use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use crate::config::Config;
use crate::lang;
use crate::service::ScriptExecutionService;

#[derive(Parser)]
#[command(name = "snippet")]
#[command(about = "Snippet - compile once, run many expression snippets", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a snippet against a JSON context
    Eval {
        /// Snippet source, e.g. "Context.Value * 2"
        source: String,

        /// Context as a JSON document
        #[arg(short = 'c', long = "context", default_value = "null")]
        context: String,

        /// Invoke the snippet this many times and report cache statistics
        #[arg(short = 'r', long = "repeat", default_value = "1")]
        repeat: usize,
    },

    /// Compile a snippet without running it
    Check {
        /// Snippet source
        source: String,

        /// Print the parsed AST as JSON
        #[arg(long)]
        ast: bool,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before doing anything so config errors surface first
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(Some(path)),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Eval {
            source,
            context,
            repeat,
        } => {
            if repeat == 0 {
                bail!("--repeat must be at least 1");
            }

            let context: JsonValue =
                serde_json::from_str(&context).context("Context is not valid JSON")?;
            let service = ScriptExecutionService::new(&config);

            let mut result = JsonValue::Null;
            for _ in 0..repeat {
                result = service
                    .invoke::<JsonValue, JsonValue>(&context, &source)
                    .await
                    .with_context(|| format!("Failed to evaluate '{}'", source))?;
            }

            println!("{}", serde_json::to_string_pretty(&result)?);

            if repeat > 1 {
                println!("\nCache:");
                println!("{}", serde_json::to_string_pretty(&service.stats())?);
            }
        }

        Commands::Check { source, ast } => {
            let expr = lang::check(&source)
                .with_context(|| format!("'{}' does not compile", source))?;

            if ast {
                println!("{}", serde_json::to_string_pretty(&expr)?);
            } else {
                println!("ok");
            }
        }
    }

    Ok(())
}
