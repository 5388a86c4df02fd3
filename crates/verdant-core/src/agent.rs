//! The agent trait and the shared three-phase control loop.
//!
//! Every agent runs the same state machine once per tick:
//!
//! ```text
//! Propose -> (wait 1) -> Commit -> (wait 2) -> [Epilogue] -> (wait 3) -> Propose ...
//! ```
//!
//! - **Propose** reads the world and holds the successor value locally.
//! - **Wait 1** guarantees nobody commits while someone is still reading.
//! - **Commit** writes the proposal into the agent's own field.
//! - **Wait 2** guarantees every commit is visible before the epilogue.
//! - **Epilogue** is a no-op for every role except the reporter.
//! - **Wait 3** guarantees the clock and climate are advanced before the
//!   next tick's reads.
//!
//! The loop condition is read only at the top of a tick, after wait 3, and
//! the flag is written only by the reporter's epilogue. All agents
//! therefore execute the same number of ticks.
//!
//! If an agent fails, or its thread panics, it poisons the barrier so the
//! other agents fail fast instead of hanging.

use std::time::Duration;

use tracing::{debug, error, info_span};
use verdant_sync::{Barrier, BarrierError, BarrierWaitResult};
use verdant_types::Role;
use verdant_world::{FieldWrite, WorldError, WorldState, WriteStamp};

/// Errors that end an agent's control loop.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// A barrier wait failed.
    #[error("barrier error: {source}")]
    Barrier {
        /// The underlying barrier error.
        #[from]
        source: BarrierError,
    },

    /// A world commit was rejected.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },
}

impl AgentError {
    /// Whether this error only reflects another participant's failure.
    pub const fn is_secondary(&self) -> bool {
        matches!(
            self,
            Self::Barrier {
                source: BarrierError::Poisoned
            }
        )
    }
}

/// How an agent's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentOutcome {
    /// The agent's role.
    pub role: Role,
    /// Number of ticks the agent completed.
    pub ticks: u64,
}

/// One participant in the lockstep protocol.
pub trait Agent: Send {
    /// The role this agent plays.
    fn role(&self) -> Role;

    /// Compute the successor value for this agent's field. Must not write
    /// to the world. The reporter proposes nothing.
    fn propose(&mut self, world: &WorldState) -> Option<FieldWrite>;

    /// Post-commit work. Only the reporter does anything here.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if a world write is rejected.
    fn epilogue(&mut self, _world: &WorldState, _stamp: WriteStamp) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Shared handles every agent thread needs.
#[derive(Debug, Clone, Copy)]
pub struct AgentContext<'a> {
    /// The shared world record.
    pub world: &'a WorldState,
    /// The barrier all agents rendezvous on.
    pub barrier: &'a Barrier,
    /// Per-wait timeout; `None` waits forever.
    pub watchdog: Option<Duration>,
}

impl AgentContext<'_> {
    fn rendezvous(&self) -> Result<BarrierWaitResult, BarrierError> {
        match self.watchdog {
            Some(timeout) => self.barrier.arrive_and_wait_timeout(timeout),
            None => self.barrier.arrive_and_wait(),
        }
    }
}

/// Run `agent` until the world stops running.
///
/// On failure the barrier is poisoned before the error is returned, so the
/// remaining agents are released.
///
/// # Errors
///
/// Returns [`AgentError`] if a barrier wait or a commit fails.
pub fn run_agent(agent: &mut dyn Agent, ctx: &AgentContext<'_>) -> Result<AgentOutcome, AgentError> {
    let role = agent.role();
    let span = info_span!("agent", role = role.name());
    let _entered = span.enter();
    let _guard = ctx.barrier.poison_on_panic();

    let result = drive(agent, role, ctx);
    match &result {
        Ok(outcome) => debug!(ticks = outcome.ticks, "agent finished"),
        Err(err) if err.is_secondary() => debug!(error = %err, "agent released by poisoned barrier"),
        Err(err) => {
            error!(error = %err, "agent failed, poisoning barrier");
            ctx.barrier.poison();
        }
    }
    result
}

fn drive(agent: &mut dyn Agent, role: Role, ctx: &AgentContext<'_>) -> Result<AgentOutcome, AgentError> {
    let mut ticks: u64 = 0;

    while ctx.world.is_running() {
        // Phase 1: propose.
        let proposal = agent.propose(ctx.world);
        let proposed = ctx.rendezvous()?;

        // Phase 2: commit.
        if let Some(write) = proposal {
            let stamp = WriteStamp {
                role,
                generation: proposed.generation(),
            };
            ctx.world.commit(write, stamp)?;
            debug!(tick = ticks, ?write, "proposal committed");
        }
        let committed = ctx.rendezvous()?;

        // Epilogue.
        let stamp = WriteStamp {
            role,
            generation: committed.generation(),
        };
        agent.epilogue(ctx.world, stamp)?;
        ctx.rendezvous()?;

        ticks = ticks.saturating_add(1);
    }

    Ok(AgentOutcome { role, ticks })
}
