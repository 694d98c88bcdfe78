//! Installation plan and the seam to the construction engine.
//!
//! The composer decides which constructor is authoritative for each slot.
//! [`InstallPlan`] turns that decision into an ordered list of
//! installations per scope, and [`install`] hands them to an [`Injector`].

use std::fmt;

use slotwire_common::constants::ROOT_SCOPE;
use slotwire_common::error::{DeclarationError, Result, SlotwireError};

use crate::compose::Composition;
use crate::constructor::Constructor;
use crate::dependency::{Dependency, Interface, Kind};
use crate::resolve::Entry;
use crate::signature::ReturnItem;
use crate::slot::{self, Slot};

/// A scope of the construction engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeId {
    /// The root scope.
    Root,
    /// A module scope, child of the root.
    Module(String),
}

impl ScopeId {
    /// Module name, or `None` for the root.
    #[must_use]
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Module(name) => Some(name),
        }
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.module().unwrap_or(ROOT_SCOPE))
    }
}

/// Options a constructor is installed with.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Interfaces the result is exposed as.
    pub interfaces: Vec<Interface>,
    /// Collector group of the result.
    pub group: Option<String>,
    /// Name qualifier of the result.
    pub name: Option<String>,
    /// Also make the result visible to the parent scope.
    pub export: bool,
    /// Rewrite the current value of the result slot in place.
    pub decorate: bool,
}

impl InstallOptions {
    fn for_dependency(dep: &Dependency, export: bool) -> Self {
        Self {
            interfaces: dep.interfaces().to_vec(),
            group: dep.effective_group().map(str::to_string),
            name: dep.name().map(str::to_string),
            export,
            decorate: dep.kind() == Kind::Decorate,
        }
    }
}

/// Where one produced output goes.
#[derive(Debug, Clone)]
pub struct OutputBinding {
    /// Index of the output in the constructor's produced list.
    pub position: usize,
    /// Destination slot.
    pub slot: Slot,
    /// Conversion to apply before storing.
    pub cast: Option<Interface>,
    /// The output is a list whose elements each join the collector.
    pub spread: bool,
}

/// One constructor to install.
#[derive(Debug, Clone)]
pub struct Installation {
    /// The resolved entry.
    pub entry: Entry,
    /// Options derived from the declaration.
    pub options: InstallOptions,
    bindings: Vec<OutputBinding>,
}

impl Installation {
    fn new(entry: &Entry, export: bool) -> Result<Self> {
        let options = InstallOptions::for_dependency(&entry.dependency, export);
        let bindings = output_bindings(&entry.dependency)?;
        Ok(Self {
            entry: entry.clone(),
            options,
            bindings,
        })
    }

    /// The constructor to invoke.
    ///
    /// # Errors
    ///
    /// Returns the declaration error if the entry has no constructor.
    pub fn constructor(&self) -> Result<&Constructor> {
        self.entry
            .dependency
            .constructor()
            .ok_or(SlotwireError::Declaration(DeclarationError::MissingConstructor))
    }

    /// Where each produced output goes.
    #[must_use]
    pub fn bindings(&self) -> &[OutputBinding] {
        &self.bindings
    }

    /// Destination slots, deduplicated.
    #[must_use]
    pub fn slots(&self) -> Vec<Slot> {
        slot::dedupe(self.bindings.iter().map(|b| b.slot.clone()))
    }
}

/// Maps the outputs of a declaration onto slots.
///
/// # Errors
///
/// Returns the declaration's classification error, if any.
pub fn output_bindings(dep: &Dependency) -> Result<Vec<OutputBinding>> {
    let record_fields = match dep.constructor().and_then(|c| c.signature().primary()) {
        Some(ReturnItem::Record { fields, .. }) => Some(fields),
        _ => None,
    };

    if let Some(fields) = record_fields {
        if dep.kind() == Kind::Decorate {
            let _ = slot::decorator_slots(dep)?;
        } else {
            let _ = slot::dependency_slots(dep)?;
        }
        return Ok(fields
            .iter()
            .enumerate()
            .map(|(position, field)| OutputBinding {
                position,
                slot: Slot::from_field(field),
                cast: None,
                spread: field.flatten && field.group.is_some(),
            })
            .collect());
    }

    if dep.kind() == Kind::Decorate {
        return Ok(slot::decorator_slots(dep)?
            .into_iter()
            .map(|slot| OutputBinding {
                position: 0,
                slot,
                cast: None,
                spread: false,
            })
            .collect());
    }

    if dep.interfaces().is_empty() {
        return Ok(slot::dependency_slots(dep)?
            .into_iter()
            .map(|slot| OutputBinding {
                position: 0,
                slot,
                cast: None,
                spread: false,
            })
            .collect());
    }

    let _ = slot::dependency_slots(dep)?;
    let group = dep.effective_group();
    let mut seen = std::collections::HashSet::new();
    Ok(dep
        .interfaces()
        .iter()
        .filter(|i| seen.insert(i.target()))
        .map(|interface| OutputBinding {
            position: 0,
            slot: Slot::new(interface.target(), dep.name(), group),
            cast: Some(interface.clone()),
            spread: false,
        })
        .collect())
}

/// Ordered installations of one scope.
#[derive(Debug, Clone)]
pub struct ScopePlan {
    /// The scope.
    pub scope: ScopeId,
    /// Providers in declaration order.
    pub providers: Vec<Installation>,
    /// Decorators in declaration order.
    pub decorators: Vec<Installation>,
}

/// Everything to install, scope by scope, root first.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    /// Root followed by modules in registration order.
    pub scopes: Vec<ScopePlan>,
}

impl InstallPlan {
    /// Derives the plan from a composition.
    ///
    /// Root winners install in the root scope. Private module winners
    /// install in their module. Shared module winners install in their
    /// module with `export` set, but only if they also won globally.
    ///
    /// # Errors
    ///
    /// Returns a classification error for an entry that cannot be bound.
    pub fn from_composition(composition: &Composition) -> Result<Self> {
        let mut root = ScopePlan {
            scope: ScopeId::Root,
            providers: Vec::new(),
            decorators: Vec::new(),
        };
        for entry in composition.global.providers.iter().filter(|e| e.module.is_none()) {
            root.providers.push(Installation::new(entry, false)?);
        }
        for entry in &composition.global.decorators {
            root.decorators.push(Installation::new(entry, false)?);
        }

        let mut scopes = vec![root];
        for module in &composition.modules {
            let scope = ScopeId::Module(module.name.clone());
            let mut plan = ScopePlan {
                scope,
                providers: Vec::new(),
                decorators: Vec::new(),
            };
            for entry in &module.local.providers {
                if entry.dependency.is_private() {
                    plan.providers.push(Installation::new(entry, false)?);
                } else if composition.is_global_winner(entry) {
                    plan.providers.push(Installation::new(entry, true)?);
                } else {
                    tracing::debug!(
                        module = %module.name,
                        index = entry.index,
                        "shared provider lost globally, not installed"
                    );
                }
            }
            for entry in &module.local.decorators {
                plan.decorators.push(Installation::new(entry, false)?);
            }
            scopes.push(plan);
        }

        Ok(Self { scopes })
    }

    /// Looks up a scope plan.
    #[must_use]
    pub fn scope(&self, scope: &ScopeId) -> Option<&ScopePlan> {
        self.scopes.iter().find(|s| &s.scope == scope)
    }
}

/// A construction engine that accepts installations.
pub trait Injector {
    /// Creates a module scope under the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope cannot be created.
    fn open_scope(&mut self, scope: &ScopeId) -> Result<()>;

    /// Registers a provider in a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the provider.
    fn provide(&mut self, scope: &ScopeId, installation: &Installation) -> Result<()>;

    /// Registers a decorator in a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the decorator.
    fn decorate(&mut self, scope: &ScopeId, installation: &Installation) -> Result<()>;
}

/// Installs a plan: scopes first, then every provider, then every decorator.
///
/// # Errors
///
/// Returns the first engine error, wrapped with the module name for module
/// scopes.
pub fn install(plan: &InstallPlan, injector: &mut dyn Injector) -> Result<()> {
    let wrap = |scope: &ScopeId, err: SlotwireError| match scope.module() {
        Some(module) => err.in_module(module),
        None => err,
    };

    for scope_plan in &plan.scopes {
        if scope_plan.scope != ScopeId::Root {
            injector
                .open_scope(&scope_plan.scope)
                .map_err(|e| wrap(&scope_plan.scope, e))?;
        }
    }
    for scope_plan in &plan.scopes {
        for installation in &scope_plan.providers {
            injector
                .provide(&scope_plan.scope, installation)
                .map_err(|e| wrap(&scope_plan.scope, e))?;
        }
    }
    for scope_plan in &plan.scopes {
        for installation in &scope_plan.decorators {
            injector
                .decorate(&scope_plan.scope, installation)
                .map_err(|e| wrap(&scope_plan.scope, e))?;
        }
    }

    tracing::debug!(scopes = plan.scopes.len(), "install plan applied");
    Ok(())
}
