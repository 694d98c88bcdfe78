//! Scope resolver: conflict rules for one scope's declarations.
//!
//! Each singular slot moves through `empty -> provided -> replaced`. A second
//! `Provide` or a second `Replace` for the same slot is an error, while a
//! `Replace` always out-ranks the `Provide` regardless of order. Collector
//! slots accept every contribution in declaration order. Decorators are set
//! aside for the composer.

use std::collections::{BTreeMap, BTreeSet};

use slotwire_common::error::{Result, SlotwireError};

use crate::classify::classify;
use crate::dependency::{Dependency, Kind};
use crate::slot::Slot;

/// A declaration bound to its position and owning module.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The declaration.
    pub dependency: Dependency,
    /// Position in its declaration list.
    pub index: usize,
    /// Owning module. `None` for root declarations.
    pub module: Option<String>,
}

impl Entry {
    /// Binds a declaration to its position.
    #[must_use]
    pub fn new(dependency: Dependency, index: usize, module: Option<&str>) -> Self {
        Self {
            dependency,
            index,
            module: module.map(str::to_string),
        }
    }

    /// Numbers a declaration list.
    #[must_use]
    pub fn enumerate(dependencies: &[Dependency], module: Option<&str>) -> Vec<Self> {
        dependencies
            .iter()
            .enumerate()
            .map(|(index, dep)| Self::new(dep.clone(), index, module))
            .collect()
    }

    /// Contributor identity: two entries are the same iff their keys match.
    #[must_use]
    pub fn key(&self) -> EntryKey {
        EntryKey {
            module: self.module.clone(),
            index: self.index,
        }
    }

    /// Whether this entry is a decorator.
    #[must_use]
    pub fn is_decorator(&self) -> bool {
        self.dependency.kind() == Kind::Decorate
    }
}

/// Identity of an [`Entry`]: owning module and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    /// Owning module.
    pub module: Option<String>,
    /// Position in the module's (or root) declaration list.
    pub index: usize,
}

/// Winner table of one scope.
#[derive(Debug, Clone, Default)]
pub struct ResolvedScope {
    /// Every provider that won a slot or contributes to a group, in
    /// declaration order.
    pub providers: Vec<Entry>,
    /// Decorators in declaration order.
    pub decorators: Vec<Entry>,
    /// Winner of each singular slot.
    pub slots: BTreeMap<Slot, EntryKey>,
    /// Singular slots whose winner is private to the module.
    pub private_slots: BTreeSet<Slot>,
    /// Contributors of each collector slot, in declaration order.
    pub groups: BTreeMap<Slot, Vec<EntryKey>>,
}

impl ResolvedScope {
    /// Winner of a singular slot.
    #[must_use]
    pub fn winner(&self, slot: &Slot) -> Option<&EntryKey> {
        self.slots.get(slot)
    }

    /// Whether the slot is bound, as a singular or collector slot.
    #[must_use]
    pub fn provides(&self, slot: &Slot) -> bool {
        self.slots.contains_key(slot) || self.groups.contains_key(slot)
    }
}

/// Precedence tier of a singular slot claim. Claims in different tiers never
/// conflict; the higher tier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Shared,
    Private,
}

#[derive(Debug, Default)]
struct SlotState {
    provide: Option<usize>,
    replace: Option<usize>,
}

impl SlotState {
    fn claim(&mut self, slot: &Slot, kind: Kind, position: usize) -> Result<()> {
        match kind {
            Kind::Provide if self.provide.is_some() => Err(SlotwireError::DuplicateProvider {
                slot: slot.to_string(),
            }),
            Kind::Provide => {
                self.provide = Some(position);
                Ok(())
            }
            Kind::Replace if self.replace.is_some() => Err(SlotwireError::DuplicateReplace {
                slot: slot.to_string(),
            }),
            Kind::Replace => {
                self.replace = Some(position);
                Ok(())
            }
            Kind::Decorate => Err(SlotwireError::GroupMisuse {
                slot: slot.to_string(),
            }),
        }
    }

    fn winner(&self) -> Option<usize> {
        self.replace.or(self.provide)
    }
}

/// Resolves a flat scope: root declarations or the merged global set.
///
/// # Errors
///
/// Returns the first conflict or declaration error in declaration order.
pub fn resolve_entries(entries: &[Entry]) -> Result<ResolvedScope> {
    resolve_with(entries, |_| Tier::Shared)
}

/// Resolves one module's own declarations.
///
/// Private declarations claim slots in their own tier, so a private provider
/// may shadow a shared provider of the same slot inside the module while the
/// shared one is still exported.
///
/// # Errors
///
/// Returns the first conflict or declaration error in declaration order.
pub fn resolve_module(entries: &[Entry]) -> Result<ResolvedScope> {
    resolve_with(entries, |entry| {
        if entry.dependency.is_private() {
            Tier::Private
        } else {
            Tier::Shared
        }
    })
}

fn resolve_with(entries: &[Entry], tier_of: impl Fn(&Entry) -> Tier) -> Result<ResolvedScope> {
    let mut states: BTreeMap<(Slot, Tier), SlotState> = BTreeMap::new();
    let mut groups: BTreeMap<Slot, Vec<usize>> = BTreeMap::new();
    let mut decorators = Vec::new();

    for (position, entry) in entries.iter().enumerate() {
        let slots = classify(&entry.dependency)?;
        if entry.is_decorator() {
            decorators.push(entry.clone());
            continue;
        }
        for slot in slots {
            if slot.is_collector() {
                groups.entry(slot).or_default().push(position);
                continue;
            }
            let tier = tier_of(entry);
            states
                .entry((slot.clone(), tier))
                .or_default()
                .claim(&slot, entry.dependency.kind(), position)?;
        }
    }

    let mut selected = BTreeSet::new();
    let mut resolved = ResolvedScope {
        decorators,
        ..ResolvedScope::default()
    };

    for ((slot, tier), state) in &states {
        let Some(position) = state.winner() else {
            continue;
        };
        let _ = selected.insert(position);
        let winner = &entries[position];
        tracing::debug!(
            slot = %slot,
            module = winner.module.as_deref().unwrap_or("root"),
            index = winner.index,
            kind = %winner.dependency.kind(),
            "slot winner selected"
        );
        if *tier == Tier::Private {
            let _ = resolved.private_slots.insert(slot.clone());
        }
        let _ = resolved.slots.insert(slot.clone(), winner.key());
    }

    for (slot, positions) in groups {
        selected.extend(positions.iter().copied());
        let keys = positions.iter().map(|&p| entries[p].key()).collect();
        let _ = resolved.groups.insert(slot, keys);
    }

    resolved.providers = selected.into_iter().map(|p| entries[p].clone()).collect();
    Ok(resolved)
}
