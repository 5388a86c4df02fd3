//! Shared type definitions for the Verdant lockstep simulation.
//!
//! Every crate in the workspace speaks in these types: the roles that take
//! part in the lockstep protocol, the world fields they own, the calendar,
//! the climate sample, and the per-tick world snapshot that doubles as the
//! report payload.
//!
//! # Modules
//!
//! - [`enums`] -- Agent roles and the world fields each role writes
//! - [`ids`] -- Type-safe identifier for a simulation run
//! - [`structs`] -- Calendar, climate sample, and world snapshot

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{Field, Role};
pub use ids::RunId;
pub use structs::{ClimateSample, InvalidMonth, Month, SimDate, WorldSnapshot};
