//! # slotwire-core
//!
//! Provider resolution for the slotwire dependency injection toolkit.
//!
//! Declarations ([`Dependency`]) name a constructor together with a kind
//! (provide, replace or decorate) and optional name, group, privacy and
//! interface options. This crate decides, without constructing anything:
//!
//! - **Slot model**: which `(type, name, group)` slots each declaration targets.
//! - **Classification**: whether a declaration's shape and options are valid.
//! - **Resolution**: which declaration wins each slot of a scope.
//! - **Composition**: how module scopes export into the global scope and
//!   shadow it with private bindings.
//! - **Overrides**: which explicit replacements took effect.
//! - **Graphs**: a node/edge view of the result, with decorator chains and
//!   missing requirements, renderable as DOT or JSON.
//!
//! Constructing values is the job of an [`Injector`] implementation that
//! consumes an [`InstallPlan`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod classify;
pub mod compose;
pub mod constructor;
pub mod dependency;
pub mod dot;
pub mod graph;
pub mod inject;
pub mod install;
pub mod overrides;
pub mod resolve;
pub mod runnable;
pub mod signature;
pub mod slot;
pub mod value;

pub use compose::{Composition, compose};
pub use constructor::{Constructor, Consumer, Factory};
pub use dependency::{Dependency, Interface, Kind, Matching, Module};
pub use graph::{Graph, build_graph, graph_modules};
pub use inject::{In, InRecord, Inject, Optional, OutRecord};
pub use install::{InstallPlan, Injector, ScopeId, install};
pub use overrides::{OverrideInfo, ProviderInfo, detect_overrides};
pub use runnable::Runnable;
pub use slot::Slot;

/// Declares a provider for the value returned by `f`.
#[must_use]
#[track_caller]
pub fn provide<F, Args>(f: F) -> Dependency
where
    F: Factory<Args>,
    F::Output: Send + Sync + 'static,
{
    Dependency::new(Constructor::new(f))
}

/// Declares a replacement for the value returned by `f`.
#[must_use]
#[track_caller]
pub fn replace<F, Args>(f: F) -> Dependency
where
    F: Factory<Args>,
    F::Output: Send + Sync + 'static,
{
    Dependency::replace(Constructor::new(f))
}

/// Declares a decorator rewriting the value `f` returns.
#[must_use]
#[track_caller]
pub fn decorate<F, Args>(f: F) -> Dependency
where
    F: Factory<Args>,
    F::Output: Send + Sync + 'static,
{
    Dependency::decorate(Constructor::new(f))
}
