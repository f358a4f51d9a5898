pub mod agent;
pub mod eval;
pub mod serve;

use anyhow::Result;
use dcalc_agent::AgentConfig;

/// Environment-derived agent settings with an optional worker-count override.
pub(crate) fn agent_config(computing_power: Option<usize>) -> Result<AgentConfig> {
    let config = AgentConfig::from_env()?;
    Ok(match computing_power {
        Some(workers) => config.with_computing_power(workers),
        None => config,
    })
}
