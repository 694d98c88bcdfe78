//! Visibility composer: module scopes folded into the global scope.
//!
//! Composition runs in two passes. Each module is first resolved on its
//! own. The root declarations plus every shared (non-private) module winner
//! then form the global entry set, which is resolved again and is what root
//! consumers and other modules see. Finally each module gets a view of the
//! global winners overlaid with its own private winners, and its decorators
//! are checked against that view.

use std::collections::{BTreeMap, HashSet};

use slotwire_common::error::{Result, SlotwireError};

use crate::dependency::{Dependency, Module};
use crate::resolve::{Entry, EntryKey, ResolvedScope, resolve_entries, resolve_module};
use crate::slot::{self, Slot};

/// Resolution of one module.
#[derive(Debug, Clone)]
pub struct ModuleResolution {
    /// Module name.
    pub name: String,
    /// Result of resolving the module's own declarations.
    pub local: ResolvedScope,
    /// Singular slots visible inside the module and their winners.
    pub view: BTreeMap<Slot, EntryKey>,
}

/// Outcome of composing root and module declarations.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Root declarations, numbered.
    pub root_entries: Vec<Entry>,
    /// Resolution of root declarations plus exported module winners.
    pub global: ResolvedScope,
    /// Per-module resolutions, in registration order.
    pub modules: Vec<ModuleResolution>,
}

impl Composition {
    /// Looks up a module resolution by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleResolution> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Whether a shared module provider won every singular slot it fills in
    /// the global scope.
    #[must_use]
    pub fn is_global_winner(&self, entry: &Entry) -> bool {
        let Ok(slots) = slot::dependency_slots(&entry.dependency) else {
            return false;
        };
        let key = entry.key();
        slots
            .iter()
            .filter(|s| !s.is_collector())
            .all(|s| self.global.winner(s) == Some(&key))
    }
}

/// Composes root declarations and modules into scoped winner tables.
///
/// # Errors
///
/// Returns a configuration error for empty or repeated module names, any
/// resolution conflict, and decorators with nothing to decorate. Errors
/// raised inside a module are wrapped with the module name.
pub fn compose(dependencies: &[Dependency], modules: &[Module]) -> Result<Composition> {
    let Scopes {
        root_entries,
        locals,
        global,
    } = resolve_scopes(dependencies, modules)?;
    validate_decorators(&global.decorators, &global.slots)?;

    let mut resolutions = Vec::with_capacity(locals.len());
    for (name, local) in locals {
        let view = module_view(&global, &local);
        validate_decorators(&local.decorators, &view).map_err(|e| e.in_module(&name))?;
        resolutions.push(ModuleResolution { name, local, view });
    }

    Ok(Composition {
        root_entries,
        global,
        modules: resolutions,
    })
}

/// Scope resolutions before decorator checks.
pub(crate) struct Scopes {
    pub root_entries: Vec<Entry>,
    pub locals: Vec<(String, ResolvedScope)>,
    pub global: ResolvedScope,
}

/// Runs both resolution passes without checking decorators.
pub(crate) fn resolve_scopes(dependencies: &[Dependency], modules: &[Module]) -> Result<Scopes> {
    check_module_names(modules)?;

    let root_entries = Entry::enumerate(dependencies, None);

    let mut locals = Vec::with_capacity(modules.len());
    for module in modules {
        let entries = Entry::enumerate(module.dependencies(), Some(module.name()));
        let local = resolve_module(&entries).map_err(|e| e.in_module(module.name()))?;
        tracing::debug!(
            module = module.name(),
            providers = local.providers.len(),
            decorators = local.decorators.len(),
            "module resolved"
        );
        locals.push((module.name().to_string(), local));
    }

    let global_entries = global_entries(&root_entries, &locals);
    let global = resolve_entries(&global_entries)?;
    tracing::debug!(
        entries = global_entries.len(),
        slots = global.slots.len(),
        groups = global.groups.len(),
        "global scope resolved"
    );

    Ok(Scopes {
        root_entries,
        locals,
        global,
    })
}

fn check_module_names(modules: &[Module]) -> Result<()> {
    let mut seen = HashSet::new();
    for module in modules {
        if module.name().is_empty() {
            return Err(SlotwireError::Config {
                message: "module name is required".into(),
            });
        }
        if !seen.insert(module.name()) {
            return Err(SlotwireError::Config {
                message: format!("module {} is registered twice", module.name()),
            });
        }
    }
    Ok(())
}

/// Root entries followed by every shared winner of every module.
fn global_entries(root: &[Entry], locals: &[(String, ResolvedScope)]) -> Vec<Entry> {
    let mut entries = root.to_vec();
    for (_, local) in locals {
        entries.extend(
            local
                .providers
                .iter()
                .filter(|e| !e.dependency.is_private())
                .cloned(),
        );
    }
    entries
}

/// Global winners overlaid with the module's private winners.
fn module_view(global: &ResolvedScope, local: &ResolvedScope) -> BTreeMap<Slot, EntryKey> {
    let mut view = global.slots.clone();
    for slot in &local.private_slots {
        if let Some(key) = local.winner(slot) {
            let _ = view.insert(slot.clone(), key.clone());
        }
    }
    view
}

/// Checks that every decorator targets a bound singular slot.
///
/// # Errors
///
/// Returns [`SlotwireError::DecorateWithoutBase`] naming the first
/// undecoratable slot.
pub fn validate_decorators(
    decorators: &[Entry],
    available: &BTreeMap<Slot, EntryKey>,
) -> Result<()> {
    for decorator in decorators {
        for target in slot::decorator_slots(&decorator.dependency)? {
            if !available.contains_key(&target) {
                return Err(SlotwireError::DecorateWithoutBase {
                    slot: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::Constructor;

    fn provide_str(value: &'static str) -> Dependency {
        Dependency::new(Constructor::new(move || value.to_string()))
    }

    fn exclaim() -> Dependency {
        Dependency::decorate(Constructor::new(|s: String| s + "!"))
    }

    #[test]
    fn module_names_must_be_unique_and_present() {
        let err = compose(&[], &[Module::new("", Vec::new())]).unwrap_err();
        assert!(err.to_string().contains("module name is required"), "got: {err}");

        let twice = [Module::new("a", Vec::new()), Module::new("a", Vec::new())];
        let err = compose(&[], &twice).unwrap_err();
        assert!(err.to_string().contains("registered twice"), "got: {err}");
    }

    #[test]
    fn shared_module_winner_is_exported() {
        let modules = [Module::new("users", vec![provide_str("u")])];
        let composition = compose(&[], &modules).expect("compose");
        let winner = composition.global.winner(&Slot::of::<String>()).expect("winner");
        assert_eq!(winner.module.as_deref(), Some("users"));
        let module_entry = &composition.modules[0].local.providers[0];
        assert!(composition.is_global_winner(module_entry));
    }

    #[test]
    fn private_module_provider_stays_local() {
        let modules = [Module::new("users", vec![provide_str("secret").private()])];
        let composition = compose(&[], &modules).expect("compose");
        assert!(composition.global.winner(&Slot::of::<String>()).is_none());
        let users = composition.module("users").expect("module");
        assert!(users.view.contains_key(&Slot::of::<String>()));
    }

    #[test]
    fn root_replace_outranks_exported_provide() {
        let modules = [Module::new("users", vec![provide_str("module")])];
        let root = [Dependency::replace(Constructor::new(|| "root".to_string()))];
        let composition = compose(&root, &modules).expect("compose");
        let winner = composition.global.winner(&Slot::of::<String>()).expect("winner");
        assert_eq!(winner.module, None);
        assert!(!composition.is_global_winner(&composition.modules[0].local.providers[0]));
    }

    #[test]
    fn exported_duplicates_conflict_globally() {
        let modules = [
            Module::new("a", vec![provide_str("a")]),
            Module::new("b", vec![provide_str("b")]),
        ];
        let err = compose(&[], &modules).unwrap_err();
        assert!(matches!(err, SlotwireError::DuplicateProvider { .. }), "got: {err}");
    }

    #[test]
    fn root_decorator_needs_global_base() {
        let err = compose(&[exclaim()], &[]).unwrap_err();
        assert_eq!(err.to_string(), "cannot decorate slot String: no provider");

        let modules = [Module::new("m", vec![provide_str("p").private()])];
        assert!(compose(&[exclaim()], &modules).is_err());
    }

    #[test]
    fn module_decorator_sees_private_and_global_slots() {
        let private = [Module::new("m", vec![provide_str("p").private(), exclaim()])];
        assert!(compose(&[], &private).is_ok());

        let inherited = [Module::new("m", vec![exclaim()])];
        assert!(compose(&[provide_str("root")], &inherited).is_ok());

        let err = compose(&[], &inherited).unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("module m: cannot decorate"), "got: {msg}");
    }

    #[test]
    fn module_conflicts_are_wrapped() {
        let modules = [Module::new("m", vec![provide_str("a"), provide_str("b")])];
        let err = compose(&[], &modules).unwrap_err();
        assert_eq!(err.to_string(), "module m: duplicate provider for slot String");
    }
}
