//! Reusable generational barrier for a fixed set of participants.
//!
//! Every call to [`Barrier::arrive_and_wait`] belongs to a *generation*.
//! The last participant to arrive releases the whole generation and
//! becomes its leader. The barrier is then immediately reusable.
//!
//! # Reuse without leak-through
//!
//! Resetting the arrival counter as soon as the last participant arrives is
//! not enough on its own: a fast participant can loop around and be counted
//! for generation `g + 1` while slow participants are still leaving
//! generation `g`. This barrier therefore tracks departures as well as
//! arrivals. While a generation is draining, new arrivals are held at an
//! entry gate, and the gate only opens once every participant has
//! departed. Waiters additionally compare against a generation counter, so
//! spurious condition-variable wake-ups are harmless.
//!
//! All transitions (arrive, release, depart, reset) happen under one mutex;
//! a single condition variable signals both the release and the gate.
//!
//! # Failure modes
//!
//! A participant that never arrives hangs everyone else. Two optional
//! hardening tools turn that hang into an error:
//!
//! - [`Barrier::arrive_and_wait_timeout`] gives up after a deadline and
//!   withdraws the caller's arrival.
//! - [`Barrier::poison`] breaks the barrier permanently and wakes every
//!   waiter with [`BarrierError::Poisoned`]. [`Barrier::poison_on_panic`]
//!   does this automatically when a participant thread unwinds.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::BarrierError;

/// Counters protected by the barrier mutex.
#[derive(Debug)]
struct State {
    /// Participants counted for the current generation.
    arrived: usize,
    /// Participants that have left the most recently released generation.
    departed: usize,
    /// Number of generations released so far.
    generation: u64,
    /// A released generation is still draining; arrivals are gated.
    releasing: bool,
    /// The barrier is broken.
    poisoned: bool,
}

/// Point-in-time copy of the barrier counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierSnapshot {
    /// Participants counted for the current generation.
    pub arrived: usize,
    /// Participants that have left the most recently released generation.
    pub departed: usize,
    /// Number of generations released so far.
    pub generation: u64,
    /// Whether the last released generation is still draining.
    pub releasing: bool,
    /// Whether the barrier is broken.
    pub poisoned: bool,
}

/// Outcome of a successful rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    generation: u64,
    leader: bool,
}

impl BarrierWaitResult {
    /// Zero-based index of the generation this rendezvous completed.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this participant was the last to arrive. Exactly one
    /// participant per generation is the leader.
    pub const fn is_leader(&self) -> bool {
        self.leader
    }
}

/// Reusable rendezvous point for exactly `parties` participants.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<State>,
    cvar: Condvar,
}

impl Barrier {
    /// Create a barrier for `parties` participants.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::NoParticipants`] if `parties` is zero.
    pub fn new(parties: usize) -> Result<Self, BarrierError> {
        if parties == 0 {
            return Err(BarrierError::NoParticipants);
        }
        Ok(Self {
            parties,
            state: Mutex::new(State {
                arrived: 0,
                departed: 0,
                generation: 0,
                releasing: false,
                poisoned: false,
            }),
            cvar: Condvar::new(),
        })
    }

    /// Number of participants required per generation.
    pub const fn parties(&self) -> usize {
        self.parties
    }

    /// Number of generations released so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Whether the barrier has been poisoned.
    pub fn is_poisoned(&self) -> bool {
        self.lock().poisoned
    }

    /// Copy the current counters.
    pub fn snapshot(&self) -> BarrierSnapshot {
        let state = self.lock();
        BarrierSnapshot {
            arrived: state.arrived,
            departed: state.departed,
            generation: state.generation,
            releasing: state.releasing,
            poisoned: state.poisoned,
        }
    }

    /// Block until every participant has arrived for the current
    /// generation, then release them all.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::Poisoned`] if the barrier is, or becomes,
    /// poisoned before this generation is released.
    pub fn arrive_and_wait(&self) -> Result<BarrierWaitResult, BarrierError> {
        self.wait_until(None)
    }

    /// Like [`arrive_and_wait`](Self::arrive_and_wait), but give up once
    /// `timeout` has elapsed. A timed-out arrival is withdrawn, so the
    /// barrier still expects `parties` arrivals for the generation.
    ///
    /// # Errors
    ///
    /// Returns [`BarrierError::Timeout`] when the deadline passes, or
    /// [`BarrierError::Poisoned`] as for `arrive_and_wait`.
    pub fn arrive_and_wait_timeout(
        &self,
        timeout: Duration,
    ) -> Result<BarrierWaitResult, BarrierError> {
        let deadline = Instant::now().checked_add(timeout).map(|at| Deadline { at, timeout });
        self.wait_until(deadline)
    }

    /// Break the barrier. Every current and future waiter fails with
    /// [`BarrierError::Poisoned`]; a poisoned barrier never recovers.
    pub fn poison(&self) {
        let mut state = self.lock();
        if !state.poisoned {
            state.poisoned = true;
            warn!(generation = state.generation, "barrier poisoned");
        }
        drop(state);
        self.cvar.notify_all();
    }

    /// Return a guard that poisons the barrier if the current thread
    /// unwinds while the guard is alive.
    pub const fn poison_on_panic(&self) -> PanicGuard<'_> {
        PanicGuard { barrier: self }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Counters are only mutated in short non-panicking sections, so a
        // poisoned std mutex still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep on the condition variable until notified or the deadline
    /// passes. Returns the re-acquired guard and whether the deadline has
    /// passed.
    fn block<'a>(
        &self,
        guard: MutexGuard<'a, State>,
        deadline: Option<Deadline>,
    ) -> (MutexGuard<'a, State>, bool) {
        match deadline {
            None => (
                self.cvar.wait(guard).unwrap_or_else(PoisonError::into_inner),
                false,
            ),
            Some(deadline) => {
                let remaining = deadline.at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return (guard, true);
                }
                let (guard, result) = self
                    .cvar
                    .wait_timeout(guard, remaining)
                    .unwrap_or_else(PoisonError::into_inner);
                (guard, result.timed_out())
            }
        }
    }

    fn wait_until(&self, deadline: Option<Deadline>) -> Result<BarrierWaitResult, BarrierError> {
        let mut state = self.lock();

        // Entry gate: the previous generation has not fully departed yet.
        while state.releasing && !state.poisoned {
            let (guard, expired) = self.block(state, deadline);
            state = guard;
            if expired && state.releasing && !state.poisoned {
                return Err(timeout_error(deadline, state.generation));
            }
        }
        if state.poisoned {
            return Err(BarrierError::Poisoned);
        }

        let generation = state.generation;
        state.arrived = state.arrived.saturating_add(1);

        if state.arrived >= self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            state.departed = 1;
            state.releasing = self.parties > 1;
            drop(state);
            self.cvar.notify_all();
            trace!(generation, "barrier generation released");
            return Ok(BarrierWaitResult {
                generation,
                leader: true,
            });
        }

        while state.generation == generation {
            if state.poisoned {
                state.arrived = state.arrived.saturating_sub(1);
                return Err(BarrierError::Poisoned);
            }
            let (guard, expired) = self.block(state, deadline);
            state = guard;
            if expired && state.generation == generation && !state.poisoned {
                state.arrived = state.arrived.saturating_sub(1);
                debug!(generation, "barrier wait timed out, arrival withdrawn");
                return Err(timeout_error(deadline, generation));
            }
        }

        state.departed = state.departed.saturating_add(1);
        if state.departed >= self.parties {
            state.releasing = false;
            drop(state);
            self.cvar.notify_all();
        }
        Ok(BarrierWaitResult {
            generation,
            leader: false,
        })
    }
}

/// Absolute deadline plus the relative timeout it was built from.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

fn timeout_error(deadline: Option<Deadline>, generation: u64) -> BarrierError {
    BarrierError::Timeout {
        timeout: deadline.map_or(Duration::ZERO, |d| d.timeout),
        generation,
    }
}

/// Poisons its barrier when dropped during a panic.
///
/// Created by [`Barrier::poison_on_panic`].
#[derive(Debug)]
#[must_use = "the guard only protects the barrier while it is alive"]
pub struct PanicGuard<'a> {
    barrier: &'a Barrier,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.barrier.poison();
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn zero_participants_rejected() {
        assert_eq!(Barrier::new(0).err(), Some(BarrierError::NoParticipants));
    }

    #[test]
    fn single_participant_never_blocks() {
        let barrier = Barrier::new(1).unwrap();
        for expected in 0..5 {
            let result = barrier.arrive_and_wait().unwrap();
            assert_eq!(result.generation(), expected);
            assert!(result.is_leader());
        }
        assert_eq!(barrier.generation(), 5);
        assert!(!barrier.snapshot().releasing);
    }

    #[test]
    fn no_early_release_and_no_generation_confusion() {
        const PARTIES: usize = 4;
        const GENERATIONS: usize = 400;

        let barrier = Barrier::new(PARTIES).unwrap();
        let arrivals: Vec<AtomicUsize> = (0..GENERATIONS).map(|_| AtomicUsize::new(0)).collect();
        let departures: Vec<AtomicUsize> =
            (0..GENERATIONS).map(|_| AtomicUsize::new(0)).collect();
        let leaders: Vec<AtomicUsize> = (0..GENERATIONS).map(|_| AtomicUsize::new(0)).collect();

        thread::scope(|s| {
            for id in 0..PARTIES {
                let barrier = &barrier;
                let arrivals = &arrivals;
                let departures = &departures;
                let leaders = &leaders;
                s.spawn(move || {
                    for g in 0..GENERATIONS {
                        if (g + id) % 3 == 0 {
                            thread::yield_now();
                        }
                        arrivals[g].fetch_add(1, Ordering::SeqCst);
                        let result = barrier.arrive_and_wait().unwrap();

                        assert_eq!(result.generation(), g as u64);
                        assert_eq!(arrivals[g].load(Ordering::SeqCst), PARTIES);
                        if g > 0 {
                            assert_eq!(departures[g - 1].load(Ordering::SeqCst), PARTIES);
                        }
                        if result.is_leader() {
                            leaders[g].fetch_add(1, Ordering::SeqCst);
                        }
                        departures[g].fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        for g in 0..GENERATIONS {
            assert_eq!(leaders[g].load(Ordering::SeqCst), 1, "generation {g}");
            assert_eq!(departures[g].load(Ordering::SeqCst), PARTIES);
        }
        assert_eq!(barrier.generation(), GENERATIONS as u64);
    }

    #[test]
    fn next_generation_is_gated_until_previous_departs() {
        const PARTIES: usize = 3;
        const GENERATIONS: usize = 300;

        let barrier = Barrier::new(PARTIES).unwrap();
        let done = AtomicBool::new(false);
        let violations = AtomicUsize::new(0);

        thread::scope(|s| {
            s.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    let snap = barrier.snapshot();
                    if snap.releasing && snap.arrived > 0 {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    if snap.releasing && snap.departed >= PARTIES {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });

            let workers: Vec<_> = (0..PARTIES)
                .map(|_| {
                    s.spawn(|| {
                        for _ in 0..GENERATIONS {
                            barrier.arrive_and_wait().unwrap();
                        }
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        assert_eq!(violations.load(Ordering::SeqCst), 0);
        let snap = barrier.snapshot();
        assert_eq!(snap.arrived, 0);
        assert!(!snap.releasing);
    }

    #[test]
    fn timeout_withdraws_arrival() {
        let barrier = Barrier::new(2).unwrap();

        let err = barrier
            .arrive_and_wait_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(
            err,
            BarrierError::Timeout {
                timeout: Duration::from_millis(20),
                generation: 0,
            }
        );
        assert_eq!(barrier.snapshot().arrived, 0);

        // The barrier is still usable by a full complement.
        thread::scope(|s| {
            let other = s.spawn(|| barrier.arrive_and_wait().unwrap());
            let mine = barrier.arrive_and_wait().unwrap();
            let theirs = other.join().unwrap();
            assert_eq!(mine.generation(), 0);
            assert_eq!(theirs.generation(), 0);
            assert_ne!(mine.is_leader(), theirs.is_leader());
        });
    }

    #[test]
    fn timeout_succeeds_when_everyone_arrives() {
        let barrier = Barrier::new(2).unwrap();
        thread::scope(|s| {
            let other = s.spawn(|| barrier.arrive_and_wait_timeout(Duration::from_secs(5)));
            let mine = barrier.arrive_and_wait_timeout(Duration::from_secs(5));
            assert!(mine.is_ok());
            assert!(other.join().unwrap().is_ok());
        });
    }

    #[test]
    fn poison_wakes_waiters() {
        let barrier = Barrier::new(3).unwrap();
        thread::scope(|s| {
            let waiter = s.spawn(|| barrier.arrive_and_wait());
            while barrier.snapshot().arrived == 0 {
                thread::yield_now();
            }
            barrier.poison();
            assert_eq!(waiter.join().unwrap(), Err(BarrierError::Poisoned));
        });
        assert!(barrier.is_poisoned());
        assert_eq!(barrier.arrive_and_wait(), Err(BarrierError::Poisoned));
    }

    #[test]
    fn panicking_participant_poisons_barrier() {
        let barrier = Barrier::new(2).unwrap();
        thread::scope(|s| {
            let waiter = s.spawn(|| barrier.arrive_and_wait());
            let panicker = s.spawn(|| {
                let _guard = barrier.poison_on_panic();
                panic!("participant failed");
            });
            assert!(panicker.join().is_err());
            assert_eq!(waiter.join().unwrap(), Err(BarrierError::Poisoned));
        });
    }
}
