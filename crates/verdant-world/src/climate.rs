//! Seasonal climate sampling.
//!
//! Temperature and precipitation follow a 12-month sinusoid. The sample for
//! month `m` uses the angle `(30m + 15)` degrees, so month 0 sits just past
//! the coldest point of the year:
//!
//! ```text
//! temperature   = avg_temperature   - amp_temperature   * cos(angle) + noise
//! precipitation = avg_precipitation + amp_precipitation * sin(angle) + noise
//! ```
//!
//! Each noise term is drawn uniformly from `[-bound, bound]`; a bound of 0
//! disables it. Precipitation is clamped to zero afterwards.
//!
//! # Determinism
//!
//! The sampler owns a seeded [`StdRng`]. The same seed always yields the
//! same sequence of samples. Only the reporter calls the sampler, so the
//! RNG needs no synchronization.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use verdant_types::{ClimateSample, Month};

use crate::error::{WorldError, require_finite, require_non_negative};

/// Degrees of seasonal angle per month.
const DEGREES_PER_MONTH: f64 = 30.0;

/// Offset placing each sample mid-month.
const MID_MONTH_DEGREES: f64 = 15.0;

/// Shape of the seasonal climate curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateParams {
    /// Yearly mean temperature in degrees Fahrenheit.
    #[serde(default = "default_avg_temperature")]
    pub avg_temperature: f64,

    /// Seasonal temperature swing around the mean.
    #[serde(default = "default_amp_temperature")]
    pub amp_temperature: f64,

    /// Bound of the uniform temperature noise.
    #[serde(default = "default_temperature_noise")]
    pub temperature_noise: f64,

    /// Yearly mean monthly precipitation in inches.
    #[serde(default = "default_avg_precipitation")]
    pub avg_precipitation: f64,

    /// Seasonal precipitation swing around the mean.
    #[serde(default = "default_amp_precipitation")]
    pub amp_precipitation: f64,

    /// Bound of the uniform precipitation noise.
    #[serde(default = "default_precipitation_noise")]
    pub precipitation_noise: f64,
}

impl Default for ClimateParams {
    fn default() -> Self {
        Self {
            avg_temperature: default_avg_temperature(),
            amp_temperature: default_amp_temperature(),
            temperature_noise: default_temperature_noise(),
            avg_precipitation: default_avg_precipitation(),
            amp_precipitation: default_amp_precipitation(),
            precipitation_noise: default_precipitation_noise(),
        }
    }
}

impl ClimateParams {
    /// The same curve with both noise terms disabled.
    #[must_use]
    pub fn without_noise(mut self) -> Self {
        self.temperature_noise = 0.0;
        self.precipitation_noise = 0.0;
        self
    }

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidParameter`] for non-finite values or
    /// negative noise bounds.
    pub fn validate(&self) -> Result<(), WorldError> {
        require_finite("climate.avg_temperature", self.avg_temperature)?;
        require_finite("climate.amp_temperature", self.amp_temperature)?;
        require_non_negative("climate.temperature_noise", self.temperature_noise)?;
        require_finite("climate.avg_precipitation", self.avg_precipitation)?;
        require_finite("climate.amp_precipitation", self.amp_precipitation)?;
        require_non_negative("climate.precipitation_noise", self.precipitation_noise)?;
        Ok(())
    }
}

/// Seeded climate generator.
#[derive(Debug, Clone)]
pub struct ClimateSampler {
    params: ClimateParams,
    rng: StdRng,
}

impl ClimateSampler {
    /// Create a sampler with the given curve and RNG seed.
    pub fn new(params: ClimateParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// The curve this sampler draws from.
    pub const fn params(&self) -> &ClimateParams {
        &self.params
    }

    /// Noise-free climate for `month`. Precipitation is still clamped.
    pub fn seasonal(&self, month: Month) -> ClimateSample {
        let angle = seasonal_angle(month);
        ClimateSample::new(
            self.params.avg_temperature - self.params.amp_temperature * angle.cos(),
            self.params.avg_precipitation + self.params.amp_precipitation * angle.sin(),
        )
    }

    /// Draw the climate for `month`.
    pub fn sample(&mut self, month: Month) -> ClimateSample {
        let angle = seasonal_angle(month);
        let temperature = self.params.avg_temperature - self.params.amp_temperature * angle.cos()
            + jitter(&mut self.rng, self.params.temperature_noise);
        let precipitation = self.params.avg_precipitation
            + self.params.amp_precipitation * angle.sin()
            + jitter(&mut self.rng, self.params.precipitation_noise);
        ClimateSample::new(temperature, precipitation)
    }
}

/// Seasonal angle in radians for `month`.
fn seasonal_angle(month: Month) -> f64 {
    DEGREES_PER_MONTH
        .mul_add(f64::from(month.index()), MID_MONTH_DEGREES)
        .to_radians()
}

/// Uniform noise in `[-bound, bound]`, or zero when the bound is zero.
fn jitter(rng: &mut StdRng, bound: f64) -> f64 {
    if bound > 0.0 {
        rng.random_range(-bound..=bound)
    } else {
        0.0
    }
}

const fn default_avg_temperature() -> f64 {
    60.0
}

const fn default_amp_temperature() -> f64 {
    20.0
}

const fn default_temperature_noise() -> f64 {
    10.0
}

const fn default_avg_precipitation() -> f64 {
    7.0
}

const fn default_amp_precipitation() -> f64 {
    6.0
}

const fn default_precipitation_noise() -> f64 {
    2.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn month(index: u8) -> Month {
        Month::new(index).unwrap()
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = ClimateSampler::new(ClimateParams::default(), 7);
        let mut b = ClimateSampler::new(ClimateParams::default(), 7);
        for index in 0..12 {
            assert_eq!(a.sample(month(index)), b.sample(month(index)));
        }
    }

    #[test]
    fn noise_free_sample_matches_curve() {
        let mut sampler = ClimateSampler::new(ClimateParams::default().without_noise(), 1);
        for index in 0..12 {
            let m = month(index);
            assert_eq!(sampler.sample(m), sampler.seasonal(m));
        }
    }

    #[test]
    fn summer_is_warmer_than_winter() {
        let sampler = ClimateSampler::new(ClimateParams::default(), 1);
        let january = sampler.seasonal(month(0));
        let june = sampler.seasonal(month(5));
        assert!(june.temperature > january.temperature);
        // cos(15 deg) ~= 0.966
        assert!((january.temperature - 40.68).abs() < 0.01);
    }

    #[test]
    fn noise_stays_within_bounds() {
        let params = ClimateParams::default();
        let mut sampler = ClimateSampler::new(params.clone(), 99);
        for step in 0..1200_u32 {
            let m = month(u8::try_from(step % 12).unwrap());
            let mean = sampler.seasonal(m);
            let drawn = sampler.sample(m);
            assert!((drawn.temperature - mean.temperature).abs() <= params.temperature_noise);
            assert!(drawn.precipitation >= 0.0);
        }
    }

    #[test]
    fn precipitation_never_negative_in_dry_climate() {
        let params = ClimateParams {
            avg_precipitation: 0.5,
            amp_precipitation: 3.0,
            precipitation_noise: 4.0,
            ..ClimateParams::default()
        };
        let mut sampler = ClimateSampler::new(params, 3);
        for step in 0..600_u32 {
            let m = month(u8::try_from(step % 12).unwrap());
            assert!(sampler.sample(m).precipitation >= 0.0);
        }
    }

    #[test]
    fn validate_rejects_negative_noise() {
        let params = ClimateParams {
            temperature_noise: -1.0,
            ..ClimateParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(WorldError::InvalidParameter {
                name: "climate.temperature_noise",
                ..
            })
        ));
        assert!(ClimateParams::default().validate().is_ok());
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: ClimateParams =
            serde_json::from_str(r#"{"avg_temperature": 50.0}"#).unwrap();
        assert_eq!(params.avg_temperature, 50.0);
        assert_eq!(params.amp_temperature, 20.0);
        assert_eq!(params.precipitation_noise, 2.0);
    }
}
