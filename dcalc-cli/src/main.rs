//! dcalc: distributed arithmetic calculator.
//!
//! `dcalc serve` runs the orchestrator API (with an embedded worker pool by
//! default), `dcalc agent` runs a worker pool against a remote orchestrator,
//! and `dcalc eval` evaluates one expression in-process.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Distributed arithmetic calculator
#[derive(Parser)]
#[command(name = "dcalc")]
#[command(about = "Evaluate arithmetic expressions across a pool of workers", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator HTTP API
    ///
    /// Accepts expressions on /api/v1/calculate and hands atomic tasks to
    /// workers on /internal/task.
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// TOML config file (otherwise read from the environment)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Do not start an embedded worker pool
        #[arg(long)]
        no_agent: bool,

        /// Embedded worker count
        #[arg(long, env = "COMPUTING_POWER")]
        computing_power: Option<usize>,
    },

    /// Run a worker pool against a remote orchestrator
    Agent {
        /// Orchestrator base URL
        #[arg(long, env = "ORCHESTRATOR_URL", default_value = "http://localhost:8080")]
        url: String,

        /// Worker count
        #[arg(long, env = "COMPUTING_POWER")]
        computing_power: Option<usize>,
    },

    /// Evaluate one expression in-process and print the result
    Eval {
        /// Expression such as "3+4*2"
        expression: String,

        /// Skip the simulated operation durations
        #[arg(long)]
        fast: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    dcalc::logging::init_tracing("info");

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            port,
            bind,
            config,
            no_agent,
            computing_power,
        } => {
            commands::serve::execute(bind, port, config, no_agent, computing_power).await?;
        },
        Commands::Agent {
            url,
            computing_power,
        } => {
            commands::agent::execute(url, computing_power).await?;
        },
        Commands::Eval { expression, fast } => {
            commands::eval::execute(expression, fast).await?;
        },
    }
    Ok(())
}
