//! Closed-form ecology rules evaluated during the propose phase.
//!
//! All functions here are pure: they take the values an agent read from the
//! world and return the proposed successor, already clamped to the valid
//! range.

use serde::{Deserialize, Serialize};
use verdant_types::{ClimateSample, Month};

use crate::error::{WorldError, require_finite, require_non_negative};

/// Width of the bell curve used for temperature and precipitation
/// suitability.
const SUITABILITY_WIDTH: f64 = 10.0;

/// Growth, consumption, and pressure parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcologyParams {
    /// Grain height gained per month under ideal conditions (inches).
    #[serde(default = "default_growth_per_month")]
    pub growth_per_month: f64,

    /// Grain height eaten per consumer per month (inches).
    #[serde(default = "default_consumption_per_consumer")]
    pub consumption_per_consumer: f64,

    /// Temperature at which growth is best.
    #[serde(default = "default_mid_temperature")]
    pub mid_temperature: f64,

    /// Precipitation at which growth is best.
    #[serde(default = "default_mid_precipitation")]
    pub mid_precipitation: f64,

    /// Month index (0-11) in which the human pressure grows.
    #[serde(default = "default_pressure_growth_month")]
    pub pressure_growth_month: u8,

    /// Humans added in the growth month.
    #[serde(default = "default_pressure_growth")]
    pub pressure_growth: u32,
}

impl Default for EcologyParams {
    fn default() -> Self {
        Self {
            growth_per_month: default_growth_per_month(),
            consumption_per_consumer: default_consumption_per_consumer(),
            mid_temperature: default_mid_temperature(),
            mid_precipitation: default_mid_precipitation(),
            pressure_growth_month: default_pressure_growth_month(),
            pressure_growth: default_pressure_growth(),
        }
    }
}

impl EcologyParams {
    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidParameter`] for negative rates,
    /// non-finite midpoints, or a growth month outside 0-11.
    pub fn validate(&self) -> Result<(), WorldError> {
        require_non_negative("ecology.growth_per_month", self.growth_per_month)?;
        require_non_negative(
            "ecology.consumption_per_consumer",
            self.consumption_per_consumer,
        )?;
        require_finite("ecology.mid_temperature", self.mid_temperature)?;
        require_finite("ecology.mid_precipitation", self.mid_precipitation)?;
        if Month::new(self.pressure_growth_month).is_err() {
            return Err(WorldError::InvalidParameter {
                name: "ecology.pressure_growth_month",
                reason: format!("{} is not a month index (0-11)", self.pressure_growth_month),
            });
        }
        Ok(())
    }
}

/// Bell-shaped suitability in `(0, 1]`, equal to 1 exactly at `midpoint`.
pub fn suitability(value: f64, midpoint: f64) -> f64 {
    let distance = (value - midpoint) / SUITABILITY_WIDTH;
    (-(distance * distance)).exp()
}

/// Successor grain height: growth scaled by climate suitability, minus what
/// the population eats. Never negative.
pub fn next_vegetation_height(
    height: f64,
    climate: ClimateSample,
    population: u32,
    params: &EcologyParams,
) -> f64 {
    let temperature_factor = suitability(climate.temperature, params.mid_temperature);
    let precipitation_factor = suitability(climate.precipitation, params.mid_precipitation);
    let growth = temperature_factor * precipitation_factor * params.growth_per_month;
    let eaten = f64::from(population) * params.consumption_per_consumer;
    (height + growth - eaten).max(0.0)
}

/// Number of consumers the standing grain can support: `floor(height)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn carrying_capacity(height: f64) -> u32 {
    if !height.is_finite() || height <= 0.0 {
        return 0;
    }
    let floored = height.floor();
    if floored >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        // In range [0, u32::MAX) after the checks above.
        floored as u32
    }
}

/// Successor population: one step toward the carrying capacity.
pub fn next_population(population: u32, height: f64) -> u32 {
    let capacity = carrying_capacity(height);
    match population.cmp(&capacity) {
        core::cmp::Ordering::Less => population.saturating_add(1),
        core::cmp::Ordering::Greater => population.saturating_sub(1),
        core::cmp::Ordering::Equal => population,
    }
}

/// Successor human pressure: grows once a year in the configured month.
pub fn next_pressure(pressure: u32, month: Month, params: &EcologyParams) -> u32 {
    if month.index() == params.pressure_growth_month {
        pressure.saturating_add(params.pressure_growth)
    } else {
        pressure
    }
}

const fn default_growth_per_month() -> f64 {
    12.0
}

const fn default_consumption_per_consumer() -> f64 {
    1.0
}

const fn default_mid_temperature() -> f64 {
    40.0
}

const fn default_mid_precipitation() -> f64 {
    10.0
}

const fn default_pressure_growth_month() -> u8 {
    4
}

const fn default_pressure_growth() -> u32 {
    1
}
