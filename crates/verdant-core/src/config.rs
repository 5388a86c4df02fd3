//! Configuration loading and typed config structures for the Verdant
//! simulation.
//!
//! The canonical configuration lives in `verdant-config.yaml` at the
//! project root. Every key is optional; the defaults reproduce the classic
//! grain/deer scenario (start 2024-01 with 5 inches of grain, 2 deer, and
//! 5 humans, run until 2030).
//!
//! Configuration is read once at startup and never changes during a run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use verdant_types::{ClimateSample, Month, SimDate, WorldSnapshot};
use verdant_world::{ClimateParams, EcologyParams, WorldError};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A model parameter is out of range.
    #[error("invalid model parameter: {source}")]
    Model {
        /// The underlying validation error.
        #[from]
        source: WorldError,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `verdant-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed).
    #[serde(default)]
    pub world: WorldConfig,

    /// Starting values of the world record.
    #[serde(default)]
    pub initial: InitialConfig,

    /// Seasonal climate curve and noise.
    #[serde(default)]
    pub climate: ClimateParams,

    /// Growth, consumption, and pressure rules.
    #[serde(default)]
    pub ecology: EcologyParams,

    /// When the run ends, and the optional barrier watchdog.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging and report output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// The `VERDANT_SEED` environment variable overrides `world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or a validation
    /// error if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.world.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section for out-of-range values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] or [`ConfigError::Model`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.initial.validate()?;
        self.climate.validate()?;
        self.ecology.validate()?;
        Ok(())
    }

    /// The same configuration with climate noise disabled.
    #[must_use]
    pub fn without_noise(mut self) -> Self {
        self.climate = self.climate.without_noise();
        self
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for the climate sampler.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl WorldConfig {
    /// Override the seed with `VERDANT_SEED` when it is set and parses.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("VERDANT_SEED")
            .ok()
            .and_then(|val| val.trim().parse().ok())
        {
            self.seed = seed;
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

/// Starting values of the world record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialConfig {
    /// Starting year.
    #[serde(default = "default_year")]
    pub year: i32,

    /// Starting month index (0-11).
    #[serde(default)]
    pub month: u8,

    /// Starting grain height in inches.
    #[serde(default = "default_vegetation_height")]
    pub vegetation_height: f64,

    /// Starting consumer count.
    #[serde(default = "default_population")]
    pub population: u32,

    /// Starting human count.
    #[serde(default = "default_pressure")]
    pub pressure: u32,
}

impl InitialConfig {
    /// The starting calendar position.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `month` is not in 0-11.
    pub fn date(&self) -> Result<SimDate, ConfigError> {
        let month = Month::new(self.month).map_err(|err| ConfigError::Invalid {
            reason: format!("initial.month: {err}"),
        })?;
        Ok(SimDate::new(self.year, month))
    }

    /// The starting world record with the given tick-0 climate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `month` is not in 0-11.
    pub fn snapshot(&self, climate: ClimateSample) -> Result<WorldSnapshot, ConfigError> {
        Ok(WorldSnapshot {
            date: self.date()?,
            climate,
            vegetation_height: self.vegetation_height,
            population: self.population,
            pressure: self.pressure,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.date()?;
        if !self.vegetation_height.is_finite() || self.vegetation_height < 0.0 {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "initial.vegetation_height must be a non-negative number, got {}",
                    self.vegetation_height
                ),
            });
        }
        Ok(())
    }
}

impl Default for InitialConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            month: 0,
            vegetation_height: default_vegetation_height(),
            population: default_population(),
            pressure: default_pressure(),
        }
    }
}

/// Simulation boundary configuration.
///
/// The run ends after the tick whose clock advance reaches `end_year`, or
/// after `max_ticks` ticks when that is non-zero, whichever comes first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationBoundsConfig {
    /// First year that is not simulated.
    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Maximum number of ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,

    /// Barrier watchdog in milliseconds (0 = wait forever).
    #[serde(default)]
    pub watchdog_timeout_ms: u64,
}

impl SimulationBoundsConfig {
    /// Whether a run that has reached `date` after `ticks` ticks is over.
    pub const fn is_reached(&self, date: SimDate, ticks: u64) -> bool {
        date.year >= self.end_year || (self.max_ticks > 0 && ticks >= self.max_ticks)
    }
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            end_year: default_end_year(),
            max_ticks: 0,
            watchdog_timeout_ms: 0,
        }
    }
}

/// How per-tick reports are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Multi-line human-readable block.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Report rendering.
    #[serde(default)]
    pub report_format: ReportFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            report_format: ReportFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Verdant Valley".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_year() -> i32 {
    2024
}

const fn default_vegetation_height() -> f64 {
    5.0
}

const fn default_population() -> u32 {
    2
}

const fn default_pressure() -> u32 {
    5
}

const fn default_end_year() -> i32 {
    2030
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.initial.year, 2024);
        assert_eq!(config.initial.population, 2);
        assert_eq!(config.simulation.end_year, 2030);
        assert_eq!(config.climate.avg_temperature, 60.0);
        assert_eq!(config.ecology.growth_per_month, 12.0);
        assert_eq!(config.logging.report_format, ReportFormat::Text);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
world:
  name: "Test Valley"
  seed: 123

initial:
  year: 2000
  month: 6
  vegetation_height: 3.5
  population: 4
  pressure: 1

climate:
  avg_temperature: 55.0
  amp_temperature: 15.0
  temperature_noise: 0.0
  avg_precipitation: 8.0
  amp_precipitation: 4.0
  precipitation_noise: 0.0

ecology:
  growth_per_month: 10.0
  consumption_per_consumer: 0.5
  mid_temperature: 45.0
  mid_precipitation: 9.0
  pressure_growth_month: 2
  pressure_growth: 3

simulation:
  end_year: 2002
  max_ticks: 10
  watchdog_timeout_ms: 5000

logging:
  level: "debug"
  report_format: json
"#;

        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.name, "Test Valley");
        assert_eq!(config.world.seed, 123);
        assert_eq!(config.initial.date().unwrap().month.index(), 6);
        assert_eq!(config.climate.amp_temperature, 15.0);
        assert_eq!(config.ecology.pressure_growth, 3);
        assert_eq!(config.simulation.max_ticks, 10);
        assert_eq!(config.simulation.watchdog_timeout_ms, 5000);
        assert_eq!(config.logging.report_format, ReportFormat::Json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = SimulationConfig::parse("world:\n  seed: 7\n").unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.initial, InitialConfig::default());
        assert_eq!(config.simulation.end_year, 2030);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn invalid_month_rejected() {
        let result = SimulationConfig::parse("initial:\n  month: 12\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn negative_height_rejected() {
        let result = SimulationConfig::parse("initial:\n  vegetation_height: -1.0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn negative_noise_rejected() {
        let result = SimulationConfig::parse("climate:\n  precipitation_noise: -2.0\n");
        assert!(matches!(result, Err(ConfigError::Model { .. })));
    }

    #[test]
    fn malformed_yaml_rejected() {
        let result = SimulationConfig::parse("world: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn bounds_stop_at_end_year_or_tick_limit() {
        let bounds = SimulationBoundsConfig {
            end_year: 2025,
            max_ticks: 0,
            watchdog_timeout_ms: 0,
        };
        let december = SimDate::new(2024, Month::new(11).unwrap());
        assert!(!bounds.is_reached(december, 11));
        assert!(bounds.is_reached(december.next(), 12));

        let limited = SimulationBoundsConfig {
            max_ticks: 3,
            ..bounds
        };
        assert!(!limited.is_reached(december, 2));
        assert!(limited.is_reached(december, 3));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("verdant-config.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
