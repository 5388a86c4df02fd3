//! Command-line runner for the Verdant simulation.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$VERDANT_CONFIG` or `verdant-config.yaml`,
//!    falling back to defaults when neither exists
//! 2. Initialize structured logging (tracing) on stderr
//! 3. Build the report sink on stdout
//! 4. Run the four agents to completion
//! 5. Log the result
//!
//! Reports go to stdout and logs to stderr, so the report stream can be
//! piped on its own.

mod error;

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;
use verdant_core::config::SimulationConfig;
use verdant_core::report;
use verdant_core::runner::{self, Simulation};

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "verdant-config.yaml";

fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("verdant-engine starting");
    info!(
        config_source = source,
        world_name = config.world.name,
        seed = config.world.seed,
        end_year = config.simulation.end_year,
        report_format = ?config.logging.report_format,
        "Configuration loaded"
    );

    // 3. Build the report sink.
    let mut sink = report::sink_for(config.logging.report_format, std::io::stdout());

    // 4. Run.
    let result = Simulation::new(config)?.run(sink.as_mut())?;

    // 5. Log the result.
    runner::log_simulation_end(&result);
    Ok(())
}

/// Load configuration from `$VERDANT_CONFIG`, then `verdant-config.yaml`.
///
/// If neither file exists, defaults are used. Returns the configuration
/// and a description of where it came from.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let config_path = std::env::var_os("VERDANT_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        let config = SimulationConfig::from_file(&config_path)?;
        Ok((config, config_path.display().to_string()))
    } else {
        let mut config = SimulationConfig::default();
        config.world.apply_env_overrides();
        Ok((config, "defaults".to_owned()))
    }
}
