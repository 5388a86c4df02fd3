//! World record, climate, and ecology for the Verdant simulation.
//!
//! This crate models everything the agents read and write: the shared
//! [`WorldState`], the stochastic [`ClimateSampler`] that produces each
//! tick's weather, and the closed-form growth and consumption rules.
//!
//! # Modules
//!
//! - [`climate`] -- Seasonal climate sampling with bounded random noise.
//! - [`ecology`] -- Grain growth, carrying capacity, and population rules.
//! - [`error`] -- Error types for world operations.
//! - [`state`] -- The shared world record with single-writer commits and
//!   an optional write journal.

pub mod climate;
pub mod ecology;
pub mod error;
pub mod state;

// Re-export primary types at crate root.
pub use climate::{ClimateParams, ClimateSampler};
pub use ecology::EcologyParams;
pub use error::WorldError;
pub use state::{FieldWrite, WorldState, WriteRecord, WriteStamp};
