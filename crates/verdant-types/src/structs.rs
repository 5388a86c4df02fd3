//! Core value types: calendar, climate, and the world snapshot.
//!
//! A [`WorldSnapshot`] is a consistent read of every world field taken
//! between barrier waits. Its [`Display`](core::fmt::Display) impl is the
//! human-readable per-tick report.

use serde::{Deserialize, Serialize};

/// Number of months in one simulated year.
pub const MONTHS_PER_YEAR: u8 = 12;

/// A month index outside `0..=11` was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("month index {0} is out of range (expected 0..=11)")]
pub struct InvalidMonth(pub u8);

/// Zero-based month of the year (`0` = January, `11` = December).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    /// The first month of the year.
    pub const JANUARY: Self = Self(0);

    /// Build a month from a zero-based index.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMonth`] if `index` is 12 or larger.
    pub const fn new(index: u8) -> Result<Self, InvalidMonth> {
        if index < MONTHS_PER_YEAR {
            Ok(Self(index))
        } else {
            Err(InvalidMonth(index))
        }
    }

    /// Zero-based month index.
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The following month, and whether the year wrapped.
    pub const fn succ(self) -> (Self, bool) {
        if self.0 >= MONTHS_PER_YEAR - 1 {
            (Self::JANUARY, true)
        } else {
            (Self(self.0 + 1), false)
        }
    }
}

impl TryFrom<u8> for Month {
    type Error = InvalidMonth;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<Month> for u8 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl core::fmt::Display for Month {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Simulated calendar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimDate {
    /// Calendar year.
    pub year: i32,
    /// Month within the year.
    pub month: Month,
}

impl SimDate {
    /// Create a date from its parts.
    pub const fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The date one tick later. Wrapping from month 11 to 0 increments the
    /// year exactly once.
    pub const fn next(self) -> Self {
        let (month, wrapped) = self.month.succ();
        let year = if wrapped {
            self.year.saturating_add(1)
        } else {
            self.year
        };
        Self { year, month }
    }
}

impl core::fmt::Display for SimDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.year, self.month)
    }
}

/// Climate conditions for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateSample {
    /// Mean temperature in degrees Fahrenheit.
    pub temperature: f64,
    /// Precipitation in inches; never negative.
    pub precipitation: f64,
}

impl ClimateSample {
    /// Build a sample, clamping precipitation to zero.
    pub fn new(temperature: f64, precipitation: f64) -> Self {
        Self {
            temperature,
            precipitation: precipitation.max(0.0),
        }
    }
}

/// A consistent read of the whole world record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Calendar position.
    #[serde(flatten)]
    pub date: SimDate,
    /// Climate for this tick.
    #[serde(flatten)]
    pub climate: ClimateSample,
    /// Standing grain height in inches.
    pub vegetation_height: f64,
    /// Number of consumers.
    pub population: u32,
    /// Number of humans.
    pub pressure: u32,
}

impl core::fmt::Display for WorldSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Year: {}, Month: {}", self.date.year, self.date.month)?;
        writeln!(
            f,
            "Temperature: {:.1} F, Precipitation: {:.2} in",
            self.climate.temperature, self.climate.precipitation
        )?;
        writeln!(
            f,
            "Deer: {}, Grain height: {:.2} in",
            self.population, self.vegetation_height
        )?;
        write!(f, "Humans: {}", self.pressure)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn month_rejects_out_of_range() {
        assert!(Month::new(11).is_ok());
        assert_eq!(Month::new(12), Err(InvalidMonth(12)));
    }

    #[test]
    fn month_cycles_through_the_year() {
        let mut month = Month::JANUARY;
        let mut wraps = 0;
        for expected in 1..=24_u8 {
            let (next, wrapped) = month.succ();
            if wrapped {
                wraps += 1;
            }
            assert_eq!(next.index(), expected % 12);
            month = next;
        }
        assert_eq!(wraps, 2);
    }

    #[test]
    fn date_wraps_year_once_per_twelve_ticks() {
        let mut date = SimDate::new(2024, Month::JANUARY);
        for _ in 0..12 {
            date = date.next();
        }
        assert_eq!(date, SimDate::new(2025, Month::JANUARY));

        let december = SimDate::new(2024, Month::new(11).unwrap());
        assert_eq!(december.next(), SimDate::new(2025, Month::JANUARY));
    }

    #[test]
    fn climate_clamps_precipitation() {
        let sample = ClimateSample::new(50.0, -3.5);
        assert!(sample.precipitation >= 0.0);
        assert!(sample.precipitation <= 0.0);
    }

    #[test]
    fn snapshot_report_lists_fields_in_order() {
        let snapshot = WorldSnapshot {
            date: SimDate::new(2024, Month::new(3).unwrap()),
            climate: ClimateSample::new(55.3, 7.5),
            vegetation_height: 6.0,
            population: 3,
            pressure: 5,
        };
        let text = snapshot.to_string();
        assert_eq!(
            text,
            "Year: 2024, Month: 3\n\
             Temperature: 55.3 F, Precipitation: 7.50 in\n\
             Deer: 3, Grain height: 6.00 in\n\
             Humans: 5"
        );
    }

    #[test]
    fn snapshot_json_is_flat() {
        let snapshot = WorldSnapshot {
            date: SimDate::new(2026, Month::new(7).unwrap()),
            climate: ClimateSample::new(70.0, 2.0),
            vegetation_height: 1.5,
            population: 4,
            pressure: 6,
        };
        let value = serde_json::to_value(snapshot).unwrap();
        assert_eq!(value["year"], 2026);
        assert_eq!(value["month"], 7);
        assert_eq!(value["population"], 4);

        let back: WorldSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn month_deserialization_rejects_out_of_range() {
        let parsed: Result<Month, _> = serde_json::from_str("12");
        assert!(parsed.is_err());
    }
}
