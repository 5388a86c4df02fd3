//! Enumeration types for the lockstep protocol.
//!
//! A [`Role`] is one of the four fixed barrier participants. A [`Field`] is
//! one slot of the shared world record. The mapping from field to role is
//! fixed: every field has exactly one designated writer.

use serde::{Deserialize, Serialize};

/// One of the four agent roles taking part in every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Deer-equivalent consumers, pulled toward the carrying capacity.
    Population,
    /// Standing grain, grown by the climate and eaten by the population.
    Vegetation,
    /// Human-equivalent external pressure.
    Pressure,
    /// Clock owner: reports, advances the calendar, resamples the climate.
    Reporter,
}

impl Role {
    /// Every role, in spawn order.
    pub const ALL: [Self; 4] = [Self::Population, Self::Vegetation, Self::Pressure, Self::Reporter];

    /// Lower-case name used for thread names and log fields.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Population => "population",
            Self::Vegetation => "vegetation",
            Self::Pressure => "pressure",
            Self::Reporter => "reporter",
        }
    }

    /// Whether this role owns the post-commit epilogue.
    pub const fn owns_epilogue(self) -> bool {
        matches!(self, Self::Reporter)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single writable slot of the shared world record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Number of consumers.
    Population,
    /// Standing grain height.
    VegetationHeight,
    /// Number of humans.
    Pressure,
    /// Calendar year and month.
    Clock,
    /// Temperature and precipitation sample.
    Climate,
}

impl Field {
    /// Every field of the world record.
    pub const ALL: [Self; 5] = [
        Self::Population,
        Self::VegetationHeight,
        Self::Pressure,
        Self::Clock,
        Self::Climate,
    ];

    /// The only role allowed to write this field.
    pub const fn writer(self) -> Role {
        match self {
            Self::Population => Role::Population,
            Self::VegetationHeight => Role::Vegetation,
            Self::Pressure => Role::Pressure,
            Self::Clock | Self::Climate => Role::Reporter,
        }
    }

    /// Whether the field is written during the epilogue rather than the
    /// commit phase.
    pub const fn written_in_epilogue(self) -> bool {
        self.writer().owns_epilogue()
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Population => "population",
            Self::VegetationHeight => "vegetation_height",
            Self::Pressure => "pressure",
            Self::Clock => "clock",
            Self::Climate => "climate",
        };
        f.write_str(name)
    }
}
