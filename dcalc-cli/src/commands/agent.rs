//! Agent command - remote worker pool

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use dcalc_agent::{Agent, HttpTaskSource};

pub async fn execute(url: String, computing_power: Option<usize>) -> Result<()> {
    let config = super::agent_config(computing_power)?;
    println!(
        "{} {} workers polling {}",
        "dcalc agent:".bright_cyan().bold(),
        config.computing_power,
        url.bright_yellow()
    );

    let source = HttpTaskSource::new(url)?;
    let agent = Agent::new(config, Arc::new(source))?;
    agent.start();

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    agent.shutdown().await;

    let stats = agent.stats();
    println!(
        "computed {} tasks ({} rejected, {} errors)",
        stats.computed(),
        stats.rejected(),
        stats.errors()
    );
    Ok(())
}
