//! Slot model: the bindable destinations of declarations.
//!
//! A slot is `(type, name, group)`. A slot with a group is a collector that
//! accumulates every contribution; any other slot is singular and has
//! exactly one winner per scope.

use std::collections::HashSet;
use std::fmt;

use slotwire_common::error::{DeclarationError, Result, SlotwireError};
use slotwire_common::types::TypeKey;

use crate::classify;
use crate::dependency::Dependency;
use crate::signature::{FieldDescriptor, ReturnItem};

/// A resolvable destination identified by type, name and group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    /// Type stored in the slot. Element type for collectors.
    pub ty: TypeKey,
    /// Name qualifier. Always `None` on collectors.
    pub name: Option<String>,
    /// Group of a collector slot.
    pub group: Option<String>,
}

impl Slot {
    /// Creates a slot. Empty tags are dropped and a group suppresses the name.
    #[must_use]
    pub fn new(ty: TypeKey, name: Option<&str>, group: Option<&str>) -> Self {
        let group = group.filter(|g| !g.is_empty()).map(str::to_string);
        let name = if group.is_some() {
            None
        } else {
            name.filter(|n| !n.is_empty()).map(str::to_string)
        };
        Self { ty, name, group }
    }

    /// The unqualified slot of `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeKey::of::<T>(), None, None)
    }

    /// The slot a record field reads from or writes to.
    #[must_use]
    pub fn from_field(field: &FieldDescriptor) -> Self {
        Self::new(field.ty, field.name.as_deref(), field.group.as_deref())
    }

    /// Whether the slot collects many contributions.
    #[must_use]
    pub const fn is_collector(&self) -> bool {
        self.group.is_some()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.group, &self.name) {
            (Some(group), _) => write!(f, "{}[group={group}]", self.ty),
            (None, Some(name)) => write!(f, "{}[name={name}]", self.ty),
            (None, None) => write!(f, "{}", self.ty),
        }
    }
}

/// Computes the slots a provide or replace declaration fills.
///
/// Output records yield one slot per field. Otherwise the exposed types
/// (interfaces when present, the result type when not) are qualified with
/// the declaration's name and effective group.
///
/// # Errors
///
/// Returns the captured declaration error, or an options error when an
/// output record is combined with a name, group or interface match.
pub fn dependency_slots(dep: &Dependency) -> Result<Vec<Slot>> {
    if let Some(err) = dep.error() {
        return Err(err.clone().into());
    }

    if let Some(ReturnItem::Record { fields, .. }) = dep.primary_result() {
        if dep.name().is_some() || dep.group().is_some() || !dep.interfaces().is_empty() {
            return Err(DeclarationError::InvalidOptions {
                message: "output record cannot be combined with name, group or match".into(),
            }
            .into());
        }
        return Ok(dedupe(fields.iter().map(Slot::from_field)));
    }

    let group = dep.effective_group();
    let slots = dep
        .exposed_types()
        .into_iter()
        .map(|ty| Slot::new(ty, dep.name(), group));
    Ok(dedupe(slots))
}

/// Computes the slots a decorator rewrites.
///
/// # Errors
///
/// Returns the captured declaration error, or a decorator error when the
/// declaration carries options or group outputs decorators cannot use.
pub fn decorator_slots(dep: &Dependency) -> Result<Vec<Slot>> {
    if let Some(err) = dep.error() {
        return Err(err.clone().into());
    }
    classify::validate_decorator(dep)?;

    match dep.primary_result() {
        Some(ReturnItem::Record { fields, .. }) => {
            if fields.iter().any(|f| f.group.is_some()) {
                return Err(DeclarationError::InvalidDecorator {
                    message: "decorators cannot produce group outputs, use provide for groups"
                        .into(),
                }
                .into());
            }
            Ok(dedupe(fields.iter().map(Slot::from_field)))
        }
        Some(ReturnItem::Value(ty)) => Ok(vec![Slot::new(*ty, None, None)]),
        Some(ReturnItem::Error) | None => Err(SlotwireError::NoOutputs {
            provider: dep.to_string(),
        }),
    }
}

/// Removes repeated slots, keeping the first occurrence.
pub(crate) fn dedupe(slots: impl IntoIterator<Item = Slot>) -> Vec<Slot> {
    let mut seen = HashSet::new();
    slots
        .into_iter()
        .filter(|slot| seen.insert(slot.clone()))
        .collect()
}
