//! The shared world record.
//!
//! [`WorldState`] is shared by reference among all agent threads for the
//! whole run. Every field has exactly one designated writer role (see
//! [`Field::writer`]); [`WorldState::commit`] rejects writes from any other
//! role.
//!
//! # Memory ordering
//!
//! Fields live in atomic cells so that shared mutation is possible without
//! per-field locks. The cells use relaxed ordering: visibility between the
//! propose, commit, and epilogue phases is established by the barrier's
//! mutex, not by the cells themselves. Reading a field outside the
//! barrier-delimited phase discipline is memory-safe but may observe a
//! half-updated tick.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::trace;
use verdant_types::{ClimateSample, Field, Month, Role, SimDate, WorldSnapshot};

use crate::error::WorldError;

/// A value proposed for exactly one world field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldWrite {
    /// New consumer count.
    Population(u32),
    /// New grain height.
    VegetationHeight(f64),
    /// New human count.
    Pressure(u32),
    /// New calendar position.
    Clock(SimDate),
    /// New climate sample.
    Climate(ClimateSample),
}

impl FieldWrite {
    /// The field this write targets.
    pub const fn field(&self) -> Field {
        match self {
            Self::Population(_) => Field::Population,
            Self::VegetationHeight(_) => Field::VegetationHeight,
            Self::Pressure(_) => Field::Pressure,
            Self::Clock(_) => Field::Clock,
            Self::Climate(_) => Field::Climate,
        }
    }
}

/// Who is writing, and after which barrier generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStamp {
    /// The committing role.
    pub role: Role,
    /// Index of the barrier generation the writer most recently completed.
    pub generation: u64,
}

/// One journaled commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// The field written.
    pub field: Field,
    /// The role that wrote it.
    pub role: Role,
    /// Barrier generation completed just before the write.
    pub generation: u64,
}

/// `f64` stored as its bit pattern.
#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    const fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// The shared world record.
#[derive(Debug)]
pub struct WorldState {
    year: AtomicI32,
    month: AtomicU8,
    temperature: AtomicF64,
    precipitation: AtomicF64,
    vegetation_height: AtomicF64,
    population: AtomicU32,
    pressure: AtomicU32,
    /// Continuation flag, cleared by the reporter during its epilogue.
    running: AtomicBool,
    /// Commit journal, present only when enabled.
    journal: Option<Mutex<Vec<WriteRecord>>>,
}

impl WorldState {
    /// Create a world from its initial values. The world starts running.
    /// Negative precipitation and height are clamped to zero.
    pub fn new(initial: &WorldSnapshot) -> Self {
        Self {
            year: AtomicI32::new(initial.date.year),
            month: AtomicU8::new(initial.date.month.index()),
            temperature: AtomicF64::new(initial.climate.temperature),
            precipitation: AtomicF64::new(initial.climate.precipitation.max(0.0)),
            vegetation_height: AtomicF64::new(initial.vegetation_height.max(0.0)),
            population: AtomicU32::new(initial.population),
            pressure: AtomicU32::new(initial.pressure),
            running: AtomicBool::new(true),
            journal: None,
        }
    }

    /// Record every subsequent commit in a journal.
    #[must_use]
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(Mutex::new(Vec::new()));
        self
    }

    /// Current calendar position.
    pub fn date(&self) -> SimDate {
        let month = Month::new(self.month.load(Ordering::Relaxed)).unwrap_or(Month::JANUARY);
        SimDate::new(self.year.load(Ordering::Relaxed), month)
    }

    /// Current climate sample.
    pub fn climate(&self) -> ClimateSample {
        ClimateSample {
            temperature: self.temperature.load(),
            precipitation: self.precipitation.load(),
        }
    }

    /// Current grain height.
    pub fn vegetation_height(&self) -> f64 {
        self.vegetation_height.load()
    }

    /// Current consumer count.
    pub fn population(&self) -> u32 {
        self.population.load(Ordering::Relaxed)
    }

    /// Current human count.
    pub fn pressure(&self) -> u32 {
        self.pressure.load(Ordering::Relaxed)
    }

    /// Read every field at once.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            date: self.date(),
            climate: self.climate(),
            vegetation_height: self.vegetation_height(),
            population: self.population(),
            pressure: self.pressure(),
        }
    }

    /// Whether agents should run another tick.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the simulation after the current tick.
    pub fn halt(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Write one field on behalf of `stamp.role`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ForeignWrite`] if the role is not the field's
    /// designated writer, or [`WorldError::NonFinite`] if a real-valued
    /// field would receive NaN or infinity. Nothing is written on error.
    pub fn commit(&self, write: FieldWrite, stamp: WriteStamp) -> Result<(), WorldError> {
        let field = write.field();
        let owner = field.writer();
        if owner != stamp.role {
            return Err(WorldError::ForeignWrite {
                field,
                role: stamp.role,
                owner,
            });
        }

        match write {
            FieldWrite::Population(count) => self.population.store(count, Ordering::Relaxed),
            FieldWrite::VegetationHeight(height) => {
                require_finite_value(field, height)?;
                self.vegetation_height.store(height.max(0.0));
            }
            FieldWrite::Pressure(count) => self.pressure.store(count, Ordering::Relaxed),
            FieldWrite::Clock(date) => {
                self.year.store(date.year, Ordering::Relaxed);
                self.month.store(date.month.index(), Ordering::Relaxed);
            }
            FieldWrite::Climate(sample) => {
                require_finite_value(field, sample.temperature)?;
                require_finite_value(field, sample.precipitation)?;
                self.temperature.store(sample.temperature);
                self.precipitation.store(sample.precipitation.max(0.0));
            }
        }

        trace!(%field, role = %stamp.role, generation = stamp.generation, "field committed");

        if let Some(journal) = &self.journal {
            journal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(WriteRecord {
                    field,
                    role: stamp.role,
                    generation: stamp.generation,
                });
        }
        Ok(())
    }

    /// Copy of the commit journal; empty when journaling is disabled.
    pub fn journal(&self) -> Vec<WriteRecord> {
        self.journal.as_ref().map_or_else(Vec::new, |journal| {
            journal.lock().unwrap_or_else(PoisonError::into_inner).clone()
        })
    }
}

fn require_finite_value(field: Field, value: f64) -> Result<(), WorldError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(WorldError::NonFinite { field, value })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn initial() -> WorldSnapshot {
        WorldSnapshot {
            date: SimDate::new(2024, Month::JANUARY),
            climate: ClimateSample::new(45.0, 6.0),
            vegetation_height: 5.0,
            population: 2,
            pressure: 5,
        }
    }

    fn stamp(role: Role) -> WriteStamp {
        WriteStamp {
            role,
            generation: 0,
        }
    }

    #[test]
    fn new_world_reflects_initial_values() {
        let world = WorldState::new(&initial());
        assert_eq!(world.snapshot(), initial());
        assert!(world.is_running());
    }

    #[test]
    fn owner_can_commit_its_field() {
        let world = WorldState::new(&initial());
        world
            .commit(FieldWrite::Population(3), stamp(Role::Population))
            .unwrap();
        world
            .commit(FieldWrite::VegetationHeight(7.5), stamp(Role::Vegetation))
            .unwrap();
        world
            .commit(FieldWrite::Pressure(6), stamp(Role::Pressure))
            .unwrap();
        let next = SimDate::new(2024, Month::new(1).unwrap());
        world.commit(FieldWrite::Clock(next), stamp(Role::Reporter)).unwrap();

        let snap = world.snapshot();
        assert_eq!(snap.population, 3);
        assert_eq!(snap.vegetation_height, 7.5);
        assert_eq!(snap.pressure, 6);
        assert_eq!(snap.date, next);
    }

    #[test]
    fn foreign_write_is_rejected_and_leaves_field_untouched() {
        let world = WorldState::new(&initial());
        let err = world
            .commit(FieldWrite::Population(99), stamp(Role::Vegetation))
            .unwrap_err();
        assert_eq!(
            err,
            WorldError::ForeignWrite {
                field: Field::Population,
                role: Role::Vegetation,
                owner: Role::Population,
            }
        );
        assert_eq!(world.population(), 2);
    }

    #[test]
    fn non_finite_height_is_rejected() {
        let world = WorldState::new(&initial());
        let result = world.commit(FieldWrite::VegetationHeight(f64::NAN), stamp(Role::Vegetation));
        assert!(matches!(result, Err(WorldError::NonFinite { .. })));
        assert_eq!(world.vegetation_height(), 5.0);
    }

    #[test]
    fn negative_values_are_clamped() {
        let world = WorldState::new(&initial());
        world
            .commit(FieldWrite::VegetationHeight(-2.0), stamp(Role::Vegetation))
            .unwrap();
        world
            .commit(
                FieldWrite::Climate(ClimateSample {
                    temperature: 30.0,
                    precipitation: -1.0,
                }),
                stamp(Role::Reporter),
            )
            .unwrap();
        assert_eq!(world.vegetation_height(), 0.0);
        assert_eq!(world.climate().precipitation, 0.0);
    }

    #[test]
    fn journal_records_commits_only_when_enabled() {
        let plain = WorldState::new(&initial());
        plain
            .commit(FieldWrite::Pressure(6), stamp(Role::Pressure))
            .unwrap();
        assert!(plain.journal().is_empty());

        let journaled = WorldState::new(&initial()).with_journal();
        journaled
            .commit(
                FieldWrite::Pressure(6),
                WriteStamp {
                    role: Role::Pressure,
                    generation: 3,
                },
            )
            .unwrap();
        assert_eq!(
            journaled.journal(),
            vec![WriteRecord {
                field: Field::Pressure,
                role: Role::Pressure,
                generation: 3,
            }]
        );
    }

    #[test]
    fn halt_clears_running_flag() {
        let world = WorldState::new(&initial());
        world.halt();
        assert!(!world.is_running());
    }
}
