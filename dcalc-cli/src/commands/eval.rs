//! Eval command - one-off in-process evaluation

use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;

use dcalc::{CalcConfig, ExpressionStatus, OperationTimes, Orchestrator};
use dcalc_agent::Agent;

pub async fn execute(expression: String, fast: bool) -> Result<()> {
    let mut config = CalcConfig::from_env()?;
    let mut agent_config = super::agent_config(None)?;
    if fast {
        config = config.with_operation_times(OperationTimes::uniform(0));
        agent_config = agent_config.with_simulated_latency(false);
    }

    let orchestrator = Orchestrator::new(config)?;
    let agent = Agent::new(agent_config, Arc::new(orchestrator.clone()))?;
    agent.start();

    let id = orchestrator.submit(expression.as_str());
    let record = orchestrator.wait_for(id).await?;

    agent.shutdown().await;
    orchestrator.shutdown().await;

    match (record.status, record.result) {
        (ExpressionStatus::Completed, Some(value)) => {
            println!("{} = {}", expression, value.to_string().bright_green());
            Ok(())
        },
        _ => {
            let reason = record
                .failure
                .map(|failure| failure.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            bail!("{} failed: {}", expression, reason)
        },
    }
}
