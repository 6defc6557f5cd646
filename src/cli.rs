//! CLI module
//!
//! This module provides the command-line interface functionality for the stepwise tool.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;

use crate::{
    api::{serve, AppState, Client, ClientConfig, ServerConfig, StepwiseMcpServer},
    models::{Core, StepInput},
    render::{format_step, Renderer},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the stepwise API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },

    /// Serve the record_step tool over MCP stdio
    Mcp,

    /// Record a reasoning step against a running server
    Step {
        /// The content of the step
        text: String,

        /// The step's position, starting at 1
        #[arg(short, long)]
        index: i64,

        /// Estimated total number of steps in the chain
        #[arg(short, long)]
        total: i64,

        /// Mark the chain as finished (no further sequential reasoning needed)
        #[arg(long)]
        done: bool,

        /// Record this step as a revision of the given earlier step
        #[arg(long, value_name = "INDEX")]
        revises: Option<i64>,

        /// Fork a branch from the given earlier step (requires --branch-label)
        #[arg(long, value_name = "INDEX")]
        branch_from: Option<i64>,

        /// Name of the branch this step belongs to
        #[arg(long, value_name = "LABEL")]
        branch_label: Option<String>,

        /// Signal that more steps are expected on this line of reasoning
        #[arg(long)]
        more: bool,
    },

    /// Print the recorded step history
    History,

    /// List the known branch labels
    Branches,

    /// Clear all recorded history
    Reset,

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port } => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "info".into()),
                )
                .init();

            let state = AppState::new(Core::new(), Renderer::from_env());
            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };

            serve(state, config).await?;
            Ok(())
        }

        Commands::Mcp => {
            // Logging to stderr only; stdout belongs to the MCP stdio transport
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .init();

            use rmcp::{transport::stdio, ServiceExt};

            let mcp = StepwiseMcpServer::new(Core::new(), Renderer::from_env());
            let service = mcp.serve(stdio()).await.inspect_err(|e| {
                tracing::error!("MCP serve error: {:?}", e);
            })?;

            service.waiting().await?;
            Ok(())
        }

        Commands::Step {
            text,
            index,
            total,
            done,
            revises,
            branch_from,
            branch_label,
            more,
        } => {
            let client = create_client(&cli.server);

            let input = StepInput {
                text: Some(text.clone()),
                sequence_needed: Some(!done),
                index: Some(*index),
                estimated_total: Some(*total),
                is_revision: revises.map(|_| true),
                revision_of: *revises,
                branch_point: *branch_from,
                branch_label: branch_label.clone(),
                more_steps_needed: more.then_some(true),
            };

            let recorded = client.record_step(&input).await?;
            println!(
                "Recorded step {}/{} ({} in history)",
                recorded.index, recorded.estimated_total, recorded.history_length
            );
            if !recorded.branches.is_empty() {
                println!("Branches: {}", recorded.branches.join(", "));
            }
            Ok(())
        }

        Commands::History => {
            let client = create_client(&cli.server);

            let steps = client.history().await?;
            if steps.is_empty() {
                println!("No steps recorded yet. Add one with 'stepwise step'.");
            } else {
                for step in &steps {
                    println!("{}", format_step(step));
                }
            }
            Ok(())
        }

        Commands::Branches => {
            let client = create_client(&cli.server);

            let branches = client.branches().await?;
            if branches.is_empty() {
                println!("No branches yet.");
            } else {
                for label in &branches {
                    println!("{}", label);
                }
            }
            Ok(())
        }

        Commands::Reset => {
            let client = create_client(&cli.server);

            client.reset().await?;
            println!("History cleared");
            Ok(())
        }

        Commands::Completions { shell } => {
            // Generate completions for the specified shell
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(server_url: &str) -> Client {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    Client::with_config(config)
}
