//! # slotwire-sdk
//!
//! Public SDK for using slotwire as a Rust library.
//!
//! Provides two main entry points:
//! - [`ContainerBuilder`](builder::ContainerBuilder): Fluent API for registering
//!   declarations, modules and interface matchings.
//! - [`Container`](container::Container): Resolves values, collects groups and
//!   renders dependency graphs of what was registered.
//!
//! # Example
//!
//! ```rust,no_run
//! use slotwire_sdk::{ContainerBuilder, provide};
//!
//! let mut container = ContainerBuilder::new()
//!     .dependency(provide(|| "world".to_string()).with_name("target"))
//!     .dependency(provide(|| 3_u8))
//!     .build()?;
//! container.validate()?;
//! let greeting = container.invoke(|n: u8| format!("hello x{n}"))?;
//! # Ok::<(), slotwire_sdk::SlotwireError>(())
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod container;
pub mod diagnostics;

pub use builder::ContainerBuilder;
pub use container::{Container, ContainerState};
pub use slotwire_common::config::{EngineConfig, GraphConfig, SlotwireConfig};
pub use slotwire_common::error::{Result, SlotwireError};
pub use slotwire_core::signature::FieldDescriptor;
pub use slotwire_core::value::{FieldReader, FieldWriter};
pub use slotwire_core::{
    Constructor, Dependency, Graph, In, InRecord, Interface, Kind, Matching, Module, Optional,
    OutRecord, OverrideInfo, ProviderInfo, Runnable, decorate, provide, replace,
};
