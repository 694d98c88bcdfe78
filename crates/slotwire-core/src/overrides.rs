//! Override detector: reports explicit replacements.

use std::collections::HashMap;

use serde::Serialize;

use crate::dependency::{Dependency, Kind};
use crate::slot::{self, Slot};

/// Display record of one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Position in the declaration list.
    pub index: usize,
    /// Constructor identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constructor: Option<String>,
    /// Source file of the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Source line of the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Result type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Name qualifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Group, explicit or implied by a runnable result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Describes a declaration for diagnostics.
#[must_use]
pub fn describe_provider(dep: &Dependency, index: usize) -> ProviderInfo {
    let identity = dep.constructor().map(|c| c.identity());
    ProviderInfo {
        index,
        constructor: identity.map(|id| id.name.clone()),
        file: identity.map(|id| id.file.to_string()),
        line: identity.map(|id| id.line),
        type_name: dep.result_type().map(|ty| ty.to_string()),
        name: dep.name().map(str::to_string),
        group: dep.effective_group().map(str::to_string),
    }
}

/// One replacement: the slot and the providers before and after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideInfo {
    /// Label of the replaced slot.
    pub key: String,
    /// Provider that was winning before the replacement.
    pub previous: ProviderInfo,
    /// The replacing provider.
    pub next: ProviderInfo,
}

/// Walks a flat declaration list and reports every replacement of a slot
/// that already had a provider.
///
/// Decorators, collector slots and invalid declarations are ignored. This
/// never fails.
#[must_use]
pub fn detect_overrides(dependencies: &[Dependency]) -> Vec<OverrideInfo> {
    let mut seen: HashMap<Slot, ProviderInfo> = HashMap::new();
    let mut overrides = Vec::new();

    for (index, dep) in dependencies.iter().enumerate() {
        if dep.kind() == Kind::Decorate {
            continue;
        }
        let Ok(slots) = slot::dependency_slots(dep) else {
            continue;
        };

        let info = describe_provider(dep, index);
        for slot in slots.into_iter().filter(|s| !s.is_collector()) {
            if dep.kind() == Kind::Replace {
                if let Some(previous) = seen.get(&slot) {
                    overrides.push(OverrideInfo {
                        key: slot.to_string(),
                        previous: previous.clone(),
                        next: info.clone(),
                    });
                }
                let _ = seen.insert(slot, info.clone());
            } else {
                let _ = seen.entry(slot).or_insert_with(|| info.clone());
            }
        }
    }

    overrides
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constructor::Constructor;

    fn provide_str(value: &'static str) -> Dependency {
        Dependency::new(Constructor::new(move || value.to_string()))
    }

    fn replace_str(value: &'static str) -> Dependency {
        Dependency::replace(Constructor::new(move || value.to_string()))
    }

    #[test]
    fn replace_after_provide_is_reported() {
        let deps = [provide_str("a").with_key("cfg"), replace_str("b").with_key("cfg")];
        let overrides = detect_overrides(&deps);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].key, "String");
        assert_eq!(overrides[0].previous.index, 0);
        assert_eq!(overrides[0].next.index, 1);
        assert_eq!(overrides[0].next.type_name.as_deref(), Some("String"));
    }

    #[test]
    fn replace_without_previous_is_silent() {
        assert!(detect_overrides(&[replace_str("only")]).is_empty());
    }

    #[test]
    fn chained_replacements_track_latest_winner() {
        let deps = [provide_str("a"), replace_str("b"), replace_str("c")];
        let overrides = detect_overrides(&deps);
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[1].previous.index, 1);
    }

    #[test]
    fn groups_and_invalid_declarations_are_ignored() {
        let deps = [
            Dependency::new(Constructor::new(|| 1_i32)).with_group("nums"),
            Dependency::from_parts(Kind::Replace, None),
        ];
        assert!(detect_overrides(&deps).is_empty());
    }

    #[test]
    fn describe_provider_reads_identity() {
        let info = describe_provider(&provide_str("x").with_name("n"), 4);
        assert_eq!(info.index, 4);
        assert_eq!(info.name.as_deref(), Some("n"));
        assert!(info.file.as_deref().is_some_and(|f| f.ends_with("overrides.rs")));
        let json = serde_json::to_value(&info).expect("serialize");
        assert_eq!(json["type"], "String");
    }
}
