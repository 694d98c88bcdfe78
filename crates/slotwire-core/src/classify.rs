//! Entry classifier: shape and option validation for declarations.

use slotwire_common::constants::RUNNABLE_GROUP;
use slotwire_common::error::{DeclarationError, Result, SlotwireError};

use crate::dependency::{Dependency, Kind};
use crate::signature::Signature;
use crate::slot::{self, Slot};

/// Checks that a constructor returns `value` or `(value, error)`.
///
/// # Errors
///
/// Returns [`DeclarationError::InvalidShape`] for any other result list.
pub fn validate_signature(signature: &Signature) -> std::result::Result<(), DeclarationError> {
    let valid = match signature.results.as_slice() {
        [first] => !first.is_error(),
        [first, second] => !first.is_error() && second.is_error(),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DeclarationError::InvalidShape {
            returns: signature.render_results(),
        })
    }
}

/// Checks option combinations that are invalid for any kind.
///
/// # Errors
///
/// Returns [`DeclarationError::InvalidOptions`] naming the conflict.
pub fn validate_options(dep: &Dependency) -> std::result::Result<(), DeclarationError> {
    let invalid = |message: &str| {
        Err(DeclarationError::InvalidOptions {
            message: message.to_string(),
        })
    };
    if dep.name().is_some() && dep.effective_group().is_some() {
        return invalid("name cannot be combined with a group or a runnable");
    }
    if dep.is_runnable() && dep.group().is_some() {
        return invalid("runnable cannot be combined with a group");
    }
    if dep.group() == Some(RUNNABLE_GROUP) {
        return invalid("group name is reserved for runnables");
    }
    if dep.is_private() && dep.kind() != Kind::Provide {
        return invalid("private is only supported for provide");
    }
    Ok(())
}

/// Checks that a decorator carries no slot options of its own.
///
/// # Errors
///
/// Returns [`DeclarationError::InvalidDecorator`] if it sets a name, group,
/// interface match or produces a runnable.
pub fn validate_decorator(dep: &Dependency) -> std::result::Result<(), DeclarationError> {
    if dep.name().is_some() || dep.group().is_some() || dep.is_runnable() {
        return Err(DeclarationError::InvalidDecorator {
            message: "decorators cannot set a name or group, use an output record".into(),
        });
    }
    if !dep.interfaces().is_empty() {
        return Err(DeclarationError::InvalidDecorator {
            message: "decorators cannot match interfaces, use an output record".into(),
        });
    }
    Ok(())
}

/// Classifies one declaration into the slots it targets.
///
/// Provide and replace declarations yield their filled slots; decorators
/// yield the slots they rewrite.
///
/// # Errors
///
/// Returns the captured declaration error, any option or decorator
/// violation, [`SlotwireError::GroupMisuse`] for a replace on a collector,
/// and [`SlotwireError::NoOutputs`] for an empty slot set.
pub fn classify(dep: &Dependency) -> Result<Vec<Slot>> {
    if let Some(err) = dep.error() {
        return Err(err.clone().into());
    }
    validate_options(dep)?;

    let slots = match dep.kind() {
        Kind::Decorate => slot::decorator_slots(dep)?,
        Kind::Provide | Kind::Replace => slot::dependency_slots(dep)?,
    };
    if slots.is_empty() {
        return Err(SlotwireError::NoOutputs {
            provider: dep.to_string(),
        });
    }
    if dep.kind() == Kind::Replace {
        if let Some(collector) = slots.iter().find(|s| s.is_collector()) {
            return Err(SlotwireError::GroupMisuse {
                slot: collector.to_string(),
            });
        }
    }
    Ok(slots)
}
