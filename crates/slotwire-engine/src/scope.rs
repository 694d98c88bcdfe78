//! Scope tree and the bindings registered in each scope.

use std::collections::HashMap;

use slotwire_common::error::{Result, SlotwireError};
use slotwire_core::dependency::Interface;
use slotwire_core::install::ScopeId;
use slotwire_core::slot::Slot;

/// Index of the root scope in a [`ScopeTree`].
pub(crate) const ROOT: usize = 0;

/// One output of one installed provider, as bound to a slot.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub provider: usize,
    pub position: usize,
    pub cast: Option<Interface>,
    pub spread: bool,
}

/// A decorator registered against a slot of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub decorator: usize,
    pub position: usize,
}

#[derive(Debug)]
pub(crate) struct Scope {
    pub id: ScopeId,
    pub parent: Option<usize>,
    pub singles: HashMap<Slot, Binding>,
    pub groups: HashMap<Slot, Vec<Binding>>,
    pub decorators: HashMap<Slot, Vec<Step>>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<usize>) -> Self {
        Self {
            id,
            parent,
            singles: HashMap::new(),
            groups: HashMap::new(),
            decorators: HashMap::new(),
        }
    }
}

/// Root scope plus one child per module, addressed by index.
#[derive(Debug)]
pub(crate) struct ScopeTree {
    scopes: Vec<Scope>,
    index: HashMap<ScopeId, usize>,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        let _ = index.insert(ScopeId::Root, ROOT);
        Self {
            scopes: vec![Scope::new(ScopeId::Root, None)],
            index,
        }
    }

    /// Opens a child of the root scope.
    pub fn open(&mut self, id: &ScopeId) -> Result<usize> {
        if self.index.contains_key(id) {
            return Err(SlotwireError::Config {
                message: format!("scope {id} is already open"),
            });
        }
        let position = self.scopes.len();
        self.scopes.push(Scope::new(id.clone(), Some(ROOT)));
        let _ = self.index.insert(id.clone(), position);
        Ok(position)
    }

    pub fn find(&self, id: &ScopeId) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| SlotwireError::NotFound {
                kind: "scope",
                id: id.to_string(),
            })
    }

    pub fn get(&self, position: usize) -> &Scope {
        &self.scopes[position]
    }

    pub fn get_mut(&mut self, position: usize) -> &mut Scope {
        &mut self.scopes[position]
    }

    /// Scopes from the root down to `position`.
    pub fn path(&self, position: usize) -> Vec<usize> {
        let mut path = vec![position];
        let mut current = position;
        while let Some(parent) = self.scopes[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Nearest binding of a singular slot, searching towards the root.
    pub fn lookup(&self, position: usize, slot: &Slot) -> Option<(usize, &Binding)> {
        let mut current = Some(position);
        while let Some(index) = current {
            let scope = &self.scopes[index];
            if let Some(binding) = scope.singles.get(slot) {
                return Some((index, binding));
            }
            current = scope.parent;
        }
        None
    }

    /// Registers every output of one provider, or none of them.
    pub fn bind(&mut self, position: usize, outputs: Vec<(Slot, Binding)>) -> Result<()> {
        let scope = &mut self.scopes[position];
        if let Some((slot, _)) = outputs
            .iter()
            .find(|(slot, _)| !slot.is_collector() && scope.singles.contains_key(slot))
        {
            return Err(SlotwireError::DuplicateProvider {
                slot: slot.to_string(),
            });
        }
        for (slot, binding) in outputs {
            if slot.is_collector() {
                scope.groups.entry(slot).or_default().push(binding);
            } else {
                let _ = scope.singles.insert(slot, binding);
            }
        }
        Ok(())
    }
}
