//! Error types for the `verdant-sync` crate.

use std::time::Duration;

/// Errors returned by [`Barrier`](crate::Barrier) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BarrierError {
    /// A barrier needs at least one participant.
    #[error("a barrier requires at least one participant")]
    NoParticipants,

    /// The wait did not complete before the deadline. The caller's arrival
    /// has been withdrawn.
    #[error("barrier wait timed out after {timeout:?} in generation {generation}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
        /// The generation that was being waited on.
        generation: u64,
    },

    /// Another participant broke the barrier.
    #[error("barrier was poisoned by a failed participant")]
    Poisoned,
}
