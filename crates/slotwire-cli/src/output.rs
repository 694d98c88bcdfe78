//! Formatted output helpers for CLI commands.

use slotwire_common::constants::APP_NAME;
use slotwire_sdk::ProviderInfo;

/// A title followed by a double-line rule of the same width.
#[must_use]
pub fn heading(title: &str) -> String {
    let title = format!("{APP_NAME} \u{2502} {title}");
    let rule = "\u{2550}".repeat(title.chars().count());
    format!("{title}\n{rule}\n")
}

/// One-line description of a provider: index, constructor, type and
/// qualifiers, then its location when known.
#[must_use]
pub fn describe_provider(info: &ProviderInfo) -> String {
    let mut out = format!("#{}", info.index);
    if let Some(constructor) = &info.constructor {
        out.push(' ');
        out.push_str(constructor);
    }
    if let Some(ty) = &info.type_name {
        out.push_str(" -> ");
        out.push_str(ty);
    }
    if let Some(name) = &info.name {
        out.push_str(&format!(" name:{name}"));
    }
    if let Some(group) = &info.group {
        out.push_str(&format!(" group:{group}"));
    }
    if let (Some(file), Some(line)) = (&info.file, info.line) {
        out.push_str(&format!(" ({file}:{line})"));
    }
    out
}
