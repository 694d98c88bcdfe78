//! Fluent API for assembling a container.

use slotwire_common::config::SlotwireConfig;
use slotwire_common::error::Result;
use slotwire_core::{Dependency, Matching, Module};

use crate::container::Container;

/// Builder for registering declarations before the container is created.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    dependencies: Vec<Dependency>,
    modules: Vec<Module>,
    matchings: Vec<Matching>,
    config: SlotwireConfig,
}

impl ContainerBuilder {
    /// Creates an empty builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds root declarations.
    #[must_use]
    pub fn dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Adds one root declaration.
    #[must_use]
    pub fn dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Registers modules.
    #[must_use]
    pub fn modules(mut self, modules: impl IntoIterator<Item = Module>) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Registers one module.
    #[must_use]
    pub fn module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Registers interface matchings applied to every declaration,
    /// including those provided later.
    #[must_use]
    pub fn matchings(mut self, matchings: impl IntoIterator<Item = Matching>) -> Self {
        self.matchings.extend(matchings);
        self
    }

    /// Sets the container configuration.
    #[must_use]
    pub fn config(mut self, config: SlotwireConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves everything registered so far and returns the container.
    ///
    /// # Errors
    ///
    /// Returns an error if a module name is empty or repeated, a
    /// declaration is invalid, or resolution finds a conflict.
    pub fn build(self) -> Result<Container> {
        Container::assemble(self.config, self.dependencies, self.modules, self.matchings)
    }
}

#[cfg(test)]
mod tests {
    use slotwire_core::provide;

    use super::*;

    #[test]
    fn build_rejects_conflicting_declarations() {
        let err = ContainerBuilder::new()
            .dependency(provide(|| "a".to_string()))
            .dependency(provide(|| "b".to_string()))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "duplicate provider for slot String");
    }

    #[test]
    fn build_rejects_unnamed_module() {
        let err = ContainerBuilder::new()
            .module(Module::new("", Vec::new()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("module name is required"), "got: {err}");
    }

    #[test]
    fn builder_accumulates_registrations() {
        let container = ContainerBuilder::new()
            .dependencies([provide(|| 1_u8), provide(|| 2_u16)])
            .modules([Module::new("a", Vec::new())])
            .module(Module::new("b", Vec::new()))
            .build()
            .expect("should build");
        assert_eq!(container.dependencies().len(), 2);
        assert_eq!(container.modules().len(), 2);
    }
}
