//! The four concrete agents.
//!
//! Three of them own one ecological field each and only propose. The
//! reporter proposes nothing; its epilogue emits the tick's report,
//! advances the clock, samples the new month's climate, and decides
//! whether another tick runs.

use tracing::{debug, info, warn};
use verdant_types::Role;
use verdant_world::{
    ClimateSampler, EcologyParams, FieldWrite, WorldState, WriteStamp, ecology,
};

use crate::agent::{Agent, AgentError};
use crate::config::SimulationBoundsConfig;
use crate::report::ReportSink;

/// Moves the consumer count one step toward what the grain supports.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopulationAgent;

impl Agent for PopulationAgent {
    fn role(&self) -> Role {
        Role::Population
    }

    fn propose(&mut self, world: &WorldState) -> Option<FieldWrite> {
        let next = ecology::next_population(world.population(), world.vegetation_height());
        Some(FieldWrite::Population(next))
    }
}

/// Grows the grain according to the climate and subtracts grazing.
#[derive(Debug, Clone)]
pub struct VegetationAgent {
    params: EcologyParams,
}

impl VegetationAgent {
    /// Create the agent with the given rules.
    pub const fn new(params: EcologyParams) -> Self {
        Self { params }
    }
}

impl Agent for VegetationAgent {
    fn role(&self) -> Role {
        Role::Vegetation
    }

    fn propose(&mut self, world: &WorldState) -> Option<FieldWrite> {
        let next = ecology::next_vegetation_height(
            world.vegetation_height(),
            world.climate(),
            world.population(),
            &self.params,
        );
        Some(FieldWrite::VegetationHeight(next))
    }
}

/// Adds humans once a year.
#[derive(Debug, Clone)]
pub struct PressureAgent {
    params: EcologyParams,
}

impl PressureAgent {
    /// Create the agent with the given rules.
    pub const fn new(params: EcologyParams) -> Self {
        Self { params }
    }
}

impl Agent for PressureAgent {
    fn role(&self) -> Role {
        Role::Pressure
    }

    fn propose(&mut self, world: &WorldState) -> Option<FieldWrite> {
        let next = ecology::next_pressure(world.pressure(), world.date().month, &self.params);
        Some(FieldWrite::Pressure(next))
    }
}

/// Reports each tick, then advances the clock and the climate.
pub struct ReporterAgent<'s> {
    sampler: ClimateSampler,
    sink: &'s mut dyn ReportSink,
    bounds: SimulationBoundsConfig,
    ticks: u64,
}

impl<'s> ReporterAgent<'s> {
    /// Create the reporter.
    pub fn new(
        sampler: ClimateSampler,
        sink: &'s mut dyn ReportSink,
        bounds: SimulationBoundsConfig,
    ) -> Self {
        Self {
            sampler,
            sink,
            bounds,
            ticks: 0,
        }
    }

    /// Ticks reported so far.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl std::fmt::Debug for ReporterAgent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterAgent")
            .field("sampler", &self.sampler)
            .field("bounds", &self.bounds)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Agent for ReporterAgent<'_> {
    fn role(&self) -> Role {
        Role::Reporter
    }

    fn propose(&mut self, _world: &WorldState) -> Option<FieldWrite> {
        None
    }

    fn epilogue(&mut self, world: &WorldState, stamp: WriteStamp) -> Result<(), AgentError> {
        let snapshot = world.snapshot();
        if let Err(err) = self.sink.report(&snapshot) {
            warn!(error = %err, date = %snapshot.date, "failed to emit report");
        }

        let next = snapshot.date.next();
        world.commit(FieldWrite::Clock(next), stamp)?;
        let climate = self.sampler.sample(next.month);
        world.commit(FieldWrite::Climate(climate), stamp)?;

        self.ticks = self.ticks.saturating_add(1);
        debug!(
            tick = self.ticks,
            date = %next,
            temperature = climate.temperature,
            precipitation = climate.precipitation,
            "clock advanced"
        );

        if self.bounds.is_reached(next, self.ticks) {
            info!(tick = self.ticks, date = %next, "simulation bound reached");
            world.halt();
        }
        Ok(())
    }
}
