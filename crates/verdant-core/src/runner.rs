//! Simulation orchestration.
//!
//! [`Simulation::run`] builds the world and the barrier, spawns one named
//! thread per role inside a [`std::thread::scope`], and waits for all of
//! them. The scope guarantees every agent has been joined before `run`
//! returns, so the world and barrier can live on the caller's stack.
//!
//! Failure handling:
//!
//! - An agent that fails or panics poisons the barrier and the others
//!   return [`BarrierError::Poisoned`](verdant_sync::BarrierError::Poisoned).
//!   The runner reports the root cause, not the fallout.
//! - If a thread cannot be spawned, the barrier is poisoned so the agents
//!   already running are released and joined.
//! - After a clean run every agent must report the same tick count.

use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use verdant_sync::{Barrier, BarrierError};
use verdant_types::{Role, RunId, WorldSnapshot};
use verdant_world::{ClimateSampler, WorldState, WriteRecord};

use crate::agent::{Agent, AgentContext, AgentError, AgentOutcome, run_agent};
use crate::config::{ConfigError, SimulationConfig};
use crate::report::ReportSink;
use crate::roles::{PopulationAgent, PressureAgent, ReporterAgent, VegetationAgent};

/// Errors that can occur during a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration is unusable.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The barrier could not be created.
    #[error("barrier error: {source}")]
    Barrier {
        /// The underlying barrier error.
        #[from]
        source: BarrierError,
    },

    /// An agent thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Role whose thread failed to start.
        role: Role,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An agent's control loop failed.
    #[error("{role} agent failed: {source}")]
    Agent {
        /// Role that failed.
        role: Role,
        /// The underlying agent error.
        source: AgentError,
    },

    /// An agent thread panicked.
    #[error("{role} agent panicked")]
    Panicked {
        /// Role whose thread panicked.
        role: Role,
    },

    /// Agents finished with different tick counts.
    #[error("{role} agent ran {ticks} ticks, expected {expected}")]
    Desynchronized {
        /// Role whose count differs.
        role: Role,
        /// Ticks that role completed.
        ticks: u64,
        /// Ticks the first role completed.
        expected: u64,
    },
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// The clock reached the configured end year.
    EndYearReached,
    /// The configured tick limit was hit first.
    MaxTicksReached,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Identifier of this run.
    pub run_id: RunId,
    /// When agents were started.
    pub started_at: DateTime<Utc>,
    /// When the last agent was joined.
    pub finished_at: DateTime<Utc>,
    /// Why the run stopped.
    pub end_reason: SimulationEndReason,
    /// Ticks completed by every agent.
    pub ticks: u64,
    /// Per-agent outcome, in [`Role::ALL`] order.
    pub outcomes: Vec<AgentOutcome>,
    /// World state after the last tick.
    pub final_snapshot: WorldSnapshot,
    /// Commit journal; empty unless journaling was enabled.
    pub journal: Vec<WriteRecord>,
}

/// A configured, runnable simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    journal: bool,
}

impl Simulation {
    /// Validate `config` and prepare a simulation.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Config`] if the configuration is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self, RunnerError> {
        config.validate()?;
        Ok(Self {
            config,
            journal: false,
        })
    }

    /// Record every world commit and return them in the result.
    #[must_use]
    pub const fn with_journal(mut self) -> Self {
        self.journal = true;
        self
    }

    /// The configuration this simulation runs with.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run all four agents to completion, sending each tick's report to
    /// `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if setup fails, an agent fails or panics, or
    /// the agents disagree on the number of ticks.
    pub fn run(&self, sink: &mut dyn ReportSink) -> Result<SimulationResult, RunnerError> {
        let config = &self.config;
        let run_id = RunId::new();

        let mut sampler = ClimateSampler::new(config.climate.clone(), config.world.seed);
        let start = config.initial.date()?;
        let initial = config.initial.snapshot(sampler.sample(start.month))?;

        let mut world = WorldState::new(&initial);
        if self.journal {
            world = world.with_journal();
        }
        let bounds = config.simulation.clone();
        if start.year >= bounds.end_year {
            warn!(
                start = %start,
                end_year = bounds.end_year,
                "start year is not before end year, no ticks will run"
            );
            world.halt();
        }

        let barrier = Barrier::new(Role::ALL.len())?;
        let watchdog = (bounds.watchdog_timeout_ms > 0)
            .then(|| Duration::from_millis(bounds.watchdog_timeout_ms));

        info!(
            %run_id,
            name = %config.world.name,
            seed = config.world.seed,
            start = %start,
            end_year = bounds.end_year,
            max_ticks = bounds.max_ticks,
            watchdog_ms = bounds.watchdog_timeout_ms,
            "Simulation starting"
        );

        let ctx = AgentContext {
            world: &world,
            barrier: &barrier,
            watchdog,
        };

        let mut population = PopulationAgent;
        let mut vegetation = VegetationAgent::new(config.ecology.clone());
        let mut pressure = PressureAgent::new(config.ecology.clone());
        let mut reporter = ReporterAgent::new(sampler, &mut *sink, bounds.clone());
        let agents: [&mut dyn Agent; 4] = [
            &mut population,
            &mut vegetation,
            &mut pressure,
            &mut reporter,
        ];

        let started_at = Utc::now();
        let (joined, spawn_error) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(agents.len());
            let mut spawn_error = None;
            for agent in agents {
                let role = agent.role();
                let spawned = thread::Builder::new()
                    .name(format!("verdant-{}", role.name()))
                    .spawn_scoped(scope, move || run_agent(agent, &ctx));
                match spawned {
                    Ok(handle) => handles.push((role, handle)),
                    Err(source) => {
                        error!(role = role.name(), error = %source, "failed to spawn agent thread");
                        barrier.poison();
                        spawn_error = Some(RunnerError::Spawn { role, source });
                        break;
                    }
                }
            }
            let joined: Vec<_> = handles
                .into_iter()
                .map(|(role, handle)| (role, handle.join()))
                .collect();
            (joined, spawn_error)
        });
        let finished_at = Utc::now();

        let mut root_cause = spawn_error;
        let mut fallout = None;
        let mut outcomes = Vec::with_capacity(joined.len());
        for (role, result) in joined {
            match result {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(source)) if source.is_secondary() => {
                    if fallout.is_none() {
                        fallout = Some(RunnerError::Agent { role, source });
                    }
                }
                Ok(Err(source)) => {
                    if root_cause.is_none() {
                        root_cause = Some(RunnerError::Agent { role, source });
                    }
                }
                Err(_) => {
                    error!(role = role.name(), "agent thread panicked");
                    if root_cause.is_none() {
                        root_cause = Some(RunnerError::Panicked { role });
                    }
                }
            }
        }
        if let Some(err) = root_cause.or(fallout) {
            return Err(err);
        }

        let ticks = outcomes.first().map_or(0, |outcome| outcome.ticks);
        if let Some(outlier) = outcomes.iter().find(|outcome| outcome.ticks != ticks) {
            return Err(RunnerError::Desynchronized {
                role: outlier.role,
                ticks: outlier.ticks,
                expected: ticks,
            });
        }

        let final_snapshot = world.snapshot();
        let end_reason = if final_snapshot.date.year >= bounds.end_year {
            SimulationEndReason::EndYearReached
        } else {
            SimulationEndReason::MaxTicksReached
        };

        Ok(SimulationResult {
            run_id,
            started_at,
            finished_at,
            end_reason,
            ticks,
            outcomes,
            final_snapshot,
            journal: world.journal(),
        })
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    let elapsed_ms = result
        .finished_at
        .signed_duration_since(result.started_at)
        .num_milliseconds();
    info!(
        run_id = %result.run_id,
        reason = ?result.end_reason,
        total_ticks = result.ticks,
        elapsed_ms,
        "Simulation ended"
    );

    if result.ticks > 0 {
        let last = &result.final_snapshot;
        info!(
            date = %last.date,
            vegetation_height = last.vegetation_height,
            population = last.population,
            pressure = last.pressure,
            "Final world state"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::report::{CollectingSink, NoOpSink};

    fn short_config(max_ticks: u64) -> SimulationConfig {
        let mut config = SimulationConfig::default().without_noise();
        config.simulation.max_ticks = max_ticks;
        config
    }

    #[test]
    fn bounded_by_max_ticks() {
        let simulation = Simulation::new(short_config(5)).unwrap();
        let mut sink = CollectingSink::new();
        let result = simulation.run(&mut sink).unwrap();

        assert_eq!(result.ticks, 5);
        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.outcomes.len(), 4);
        assert!(result.outcomes.iter().all(|o| o.ticks == 5));
        assert_eq!(sink.reports().len(), 5);
        assert_eq!(result.final_snapshot.date.month.index(), 5);
    }

    #[test]
    fn runs_until_end_year() {
        let mut config = SimulationConfig::default();
        config.simulation.end_year = 2025;
        let result = Simulation::new(config).unwrap().run(&mut NoOpSink).unwrap();

        assert_eq!(result.ticks, 12);
        assert_eq!(result.end_reason, SimulationEndReason::EndYearReached);
        assert_eq!(result.final_snapshot.date.year, 2025);
    }

    #[test]
    fn start_at_end_year_runs_no_ticks() {
        let mut config = SimulationConfig::default();
        config.simulation.end_year = config.initial.year;
        let mut sink = CollectingSink::new();
        let result = Simulation::new(config).unwrap().run(&mut sink).unwrap();

        assert_eq!(result.ticks, 0);
        assert!(sink.reports().is_empty());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = SimulationConfig::default();
        config.initial.month = 12;
        assert!(matches!(
            Simulation::new(config),
            Err(RunnerError::Config { .. })
        ));
    }

    #[test]
    fn log_simulation_end_accepts_empty_run() {
        let mut config = SimulationConfig::default();
        config.simulation.end_year = 2000;
        let result = Simulation::new(config).unwrap().run(&mut NoOpSink).unwrap();
        log_simulation_end(&result);
        assert_eq!(result.ticks, 0);
    }
}
