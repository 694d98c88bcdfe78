//! The container: registered declarations and their lifecycle.
//!
//! A container starts out assembling. Every addition is resolved against a
//! copy of the current declarations and only committed when resolution
//! succeeds. The first call that resolves a value activates it: the
//! declarations are installed into an [`Engine`] and further additions are
//! rejected.

use std::fmt;

use slotwire_common::config::SlotwireConfig;
use slotwire_common::constants::RUNNABLE_GROUP;
use slotwire_common::error::{Result, SlotwireError};
use slotwire_core::signature::FieldDescriptor;
use slotwire_core::value::{Fetched, downcast};
use slotwire_core::{
    Consumer, Dependency, InstallPlan, Matching, Module, Runnable, ScopeId, Slot, compose,
    install,
};
use slotwire_engine::Engine;

/// Lifecycle state of a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Declarations can still be added.
    Assembling,
    /// Values have been resolved; the declaration set is frozen.
    Active,
}

/// A dependency injection container.
pub struct Container {
    pub(crate) config: SlotwireConfig,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) modules: Vec<Module>,
    matchings: Vec<Matching>,
    engine: Option<Box<Engine>>,
}

impl Container {
    pub(crate) fn assemble(
        config: SlotwireConfig,
        dependencies: Vec<Dependency>,
        mut modules: Vec<Module>,
        matchings: Vec<Matching>,
    ) -> Result<Self> {
        for module in &mut modules {
            apply_matchings(module.dependencies_mut(), &matchings);
        }
        let mut container = Self {
            config,
            dependencies: Vec::new(),
            modules,
            matchings,
            engine: None,
        };
        container.append(dependencies)?;
        tracing::info!(
            dependencies = container.dependencies.len(),
            modules = container.modules.len(),
            "container assembled"
        );
        Ok(container)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContainerState {
        if self.engine.is_some() {
            ContainerState::Active
        } else {
            ContainerState::Assembling
        }
    }

    /// Root declarations, in registration order.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Registered modules.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// The configuration the container was built with.
    #[must_use]
    pub const fn config(&self) -> &SlotwireConfig {
        &self.config
    }

    /// Adds root declarations.
    ///
    /// The addition is transactional: if the combined declarations fail to
    /// resolve, the container is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SlotwireError::ContainerActive`] once the container is
    /// active, or the resolution error of the combined declarations.
    pub fn provide(&mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Result<()> {
        if self.engine.is_some() {
            return Err(SlotwireError::ContainerActive {
                message: "cannot provide after container has been started".to_string(),
            });
        }
        self.append(dependencies.into_iter().collect())
    }

    fn append(&mut self, mut dependencies: Vec<Dependency>) -> Result<()> {
        apply_matchings(&mut dependencies, &self.matchings);
        let added = dependencies.len();
        let mut next = self.dependencies.clone();
        next.extend(dependencies);
        let _ = compose(&next, &self.modules)?;
        self.dependencies = next;
        tracing::debug!(added, total = self.dependencies.len(), "dependencies committed");
        Ok(())
    }

    /// Calls `consumer` with its parameters resolved in the root scope.
    ///
    /// Activates the container.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter cannot be resolved or a constructor
    /// fails.
    pub fn invoke<C, Args>(&mut self, consumer: C) -> Result<C::Output>
    where
        C: Consumer<Args>,
    {
        self.engine()?.invoke(&ScopeId::Root, consumer)
    }

    /// Calls `consumer` with its parameters resolved in a module scope,
    /// where the module's private declarations are visible.
    ///
    /// Activates the container.
    ///
    /// # Errors
    ///
    /// Returns [`SlotwireError::NotFound`] for an unknown module, or any
    /// resolution error.
    pub fn invoke_in<C, Args>(&mut self, module: &str, consumer: C) -> Result<C::Output>
    where
        C: Consumer<Args>,
    {
        if !self.modules.iter().any(|m| m.name() == module) {
            return Err(SlotwireError::NotFound {
                kind: "module",
                id: module.to_string(),
            });
        }
        let scope = ScopeId::Module(module.to_string());
        self.engine()?.invoke(&scope, consumer)
    }

    /// Resolves the unqualified `T` from the root scope.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing provides `T` or constructing it fails.
    pub fn resolve<T: Clone + Send + Sync + 'static>(&mut self) -> Result<T> {
        self.invoke(|value: T| value)
    }

    /// Resolves the `T` registered under `name` from the root scope.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing provides the named slot or constructing
    /// it fails.
    pub fn resolve_named<T: Clone + Send + Sync + 'static>(&mut self, name: &str) -> Result<T> {
        let field = FieldDescriptor::named::<T>(name);
        match self.engine()?.fetch(&ScopeId::Root, &field)? {
            Fetched::One(value) => downcast(&value, &field),
            Fetched::Absent | Fetched::Many(_) => Err(SlotwireError::Missing {
                slot: Slot::from_field(&field).to_string(),
                consumer: "resolve".to_string(),
            }),
        }
    }

    /// Collects every contribution to the group `name` of `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if a contributing constructor fails.
    pub fn group<T: Clone + Send + Sync + 'static>(&mut self, name: &str) -> Result<Vec<T>> {
        let field = FieldDescriptor::grouped::<T>(name);
        match self.engine()?.fetch(&ScopeId::Root, &field)? {
            Fetched::Many(values) => values.iter().map(|v| downcast(v, &field)).collect(),
            Fetched::One(_) | Fetched::Absent => Ok(Vec::new()),
        }
    }

    /// Every registered [`Runnable`], in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if a runnable constructor fails.
    pub fn runnables(&mut self) -> Result<Vec<Runnable>> {
        self.group::<Runnable>(RUNNABLE_GROUP)
    }

    /// Checks that every provider and decorator of every scope could be
    /// constructed, without constructing anything.
    ///
    /// # Errors
    ///
    /// Returns the first unsatisfiable requirement, wrapped with the module
    /// name when it was found in a module scope.
    pub fn validate(&self) -> Result<()> {
        let (plan, engine) = self.installed()?;
        for scope_plan in &plan.scopes {
            let scope = &scope_plan.scope;
            let installations = scope_plan.providers.iter().chain(&scope_plan.decorators);
            for installation in installations {
                let visible_from = if installation.options.export {
                    &ScopeId::Root
                } else {
                    scope
                };
                for slot in installation.slots() {
                    engine.check(visible_from, &slot).map_err(|e| match scope.module() {
                        Some(module) => e.in_module(module),
                        None => e,
                    })?;
                }
            }
            tracing::debug!(scope = %scope, "scope validated");
        }
        tracing::info!("container validated");
        Ok(())
    }

    fn installed(&self) -> Result<(InstallPlan, Engine)> {
        let composition = compose(&self.dependencies, &self.modules)?;
        let plan = InstallPlan::from_composition(&composition)?;
        let mut engine = Engine::new(self.config.engine.clone());
        install(&plan, &mut engine)?;
        Ok((plan, engine))
    }

    fn engine(&mut self) -> Result<&mut Engine> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                let (_, engine) = self.installed()?;
                tracing::info!(
                    dependencies = self.dependencies.len(),
                    modules = self.modules.len(),
                    "container activated"
                );
                Box::new(engine)
            }
        };
        Ok(self.engine.insert(engine))
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("dependencies", &self.dependencies.len())
            .field("modules", &self.modules.len())
            .field("matchings", &self.matchings.len())
            .finish_non_exhaustive()
    }
}

fn apply_matchings(dependencies: &mut [Dependency], matchings: &[Matching]) {
    for dependency in dependencies {
        for matching in matchings {
            if dependency.apply_matching(matching) {
                tracing::debug!(
                    origin = %matching.origin(),
                    interfaces = matching.interfaces().len(),
                    "matching applied"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use slotwire_core::provide;

    use super::*;
    use crate::builder::ContainerBuilder;

    #[test]
    fn starts_assembling_and_activates_once() {
        let mut container = ContainerBuilder::new()
            .dependency(provide(|| 5_u8))
            .build()
            .expect("should build");
        assert_eq!(container.state(), ContainerState::Assembling);
        assert_eq!(container.resolve::<u8>().expect("resolve"), 5);
        assert_eq!(container.state(), ContainerState::Active);
    }

    #[test]
    fn unknown_module_does_not_activate() {
        let mut container = ContainerBuilder::new().build().expect("should build");
        let err = container.invoke_in("ghost", || ()).unwrap_err();
        assert_eq!(err.to_string(), "module not found: ghost");
        assert_eq!(container.state(), ContainerState::Assembling);
    }

    #[test]
    fn debug_shows_state_and_counts() {
        let container = ContainerBuilder::new()
            .dependency(provide(|| 5_u8))
            .build()
            .expect("should build");
        let debug = format!("{container:?}");
        assert!(debug.contains("Assembling"), "got: {debug}");
        assert!(debug.contains("dependencies: 1"), "got: {debug}");
    }
}
