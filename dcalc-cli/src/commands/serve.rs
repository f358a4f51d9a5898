//! Serve command - orchestrator HTTP API

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use dcalc::{CalcConfig, Orchestrator};
use dcalc_agent::Agent;

pub async fn execute(
    bind: IpAddr,
    port: u16,
    config_path: Option<PathBuf>,
    no_agent: bool,
    computing_power: Option<usize>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => CalcConfig::from_path(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CalcConfig::from_env()?,
    };
    let orchestrator = Orchestrator::new(config)?;

    let agent = if no_agent {
        None
    } else {
        let agent = Agent::new(
            super::agent_config(computing_power)?,
            Arc::new(orchestrator.clone()),
        )?;
        agent.start();
        Some(agent)
    };

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            cancel.cancel();
        }
    });

    let addr = SocketAddr::new(bind, port);
    dcalc::server::serve(orchestrator.clone(), addr, |bound| {
        println!("\n{}", "dcalc orchestrator".bright_cyan().bold());
        println!("  {} API: {}", "→".blue(), format!("http://{bound}").bright_green());
        if no_agent {
            println!("  {} embedded workers: {}", "→".blue(), "off".yellow());
        }
        println!();
    })
    .await
    .context("serving API")?;

    if let Some(agent) = agent {
        agent.shutdown().await;
    }
    orchestrator.shutdown().await;
    Ok(())
}
