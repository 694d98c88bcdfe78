//! # slotwire-engine
//!
//! Reference [`Injector`](slotwire_core::Injector) for slotwire.
//!
//! The engine receives the installations decided by `slotwire-core` and is
//! responsible for everything that happens afterwards: constructing each
//! provider once, threading decorator chains per scope, collecting group
//! contributions, and answering dry-run satisfiability checks without
//! calling any constructor.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
mod scope;

pub use engine::Engine;
