//! Agents, the lockstep tick protocol, and run orchestration for the
//! Verdant simulation.
//!
//! Four agents run on their own threads and advance the shared world one
//! month per tick. Every tick has three barrier-delimited phases:
//!
//! 1. **Propose** -- each agent reads the world and computes a successor
//!    value for its own field.
//! 2. **Commit** -- each agent writes its proposal into its field.
//! 3. **Epilogue** -- the reporter alone emits the report, advances the
//!    clock, resamples the climate, and decides whether to continue.
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] trait and the shared control loop.
//! - [`config`] -- Configuration loading from `verdant-config.yaml` into
//!   strongly-typed structs.
//! - [`report`] -- [`ReportSink`] trait and the text, JSON, and in-memory
//!   sinks.
//! - [`roles`] -- The four role-specific agents.
//! - [`runner`] -- Builds the world, spawns the agents, and collects the
//!   result.
//!
//! [`Agent`]: agent::Agent
//! [`ReportSink`]: report::ReportSink

pub mod agent;
pub mod config;
pub mod report;
pub mod roles;
pub mod runner;
