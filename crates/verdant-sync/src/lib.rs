//! Synchronization primitives for the Verdant lockstep protocol.
//!
//! # Modules
//!
//! - [`barrier`] -- Reusable generational barrier for a fixed number of
//!   participants, with departure-gated reuse, optional timeouts, and
//!   poisoning.
//! - [`error`] -- Error types for barrier operations.

pub mod barrier;
pub mod error;

pub use barrier::{Barrier, BarrierSnapshot, BarrierWaitResult, PanicGuard};
pub use error::BarrierError;
