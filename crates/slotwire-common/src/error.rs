//! Unified error types for the slotwire workspace.
//!
//! [`DeclarationError`] is captured inside a declaration when it is created
//! and only surfaces once that declaration takes part in resolution, so it
//! has to be cheap to clone. Everything else is reported through
//! [`SlotwireError`].

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by user constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A malformed declaration: bad constructor shape or option combination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The declaration carries no constructor at all.
    #[error("constructor is missing")]
    MissingConstructor,

    /// The constructor does not return `value` or `(value, error)`.
    #[error("constructor must return value or (value, error), returns ({returns})")]
    InvalidShape {
        /// Rendered list of declared results.
        returns: String,
    },

    /// Two options that cannot be combined were set together.
    #[error("invalid dependency options: {message}")]
    InvalidOptions {
        /// Description of the conflicting options.
        message: String,
    },

    /// An interface matching cannot apply to this declaration.
    #[error("invalid matching: {message}")]
    InvalidMatching {
        /// Description of the mismatch.
        message: String,
    },

    /// A decorator declaration has a shape or option decorators cannot use.
    #[error("invalid decorator: {message}")]
    InvalidDecorator {
        /// Description of the rejected decorator.
        message: String,
    },
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SlotwireError {
    /// A declaration was invalid when it was created or classified.
    #[error("dependency error: {0}")]
    Declaration(#[from] DeclarationError),

    /// Two `Provide` declarations target the same singular slot.
    #[error("duplicate provider for slot {slot}")]
    DuplicateProvider {
        /// Label of the contested slot.
        slot: String,
    },

    /// Two `Replace` declarations target the same singular slot.
    #[error("duplicate replace for slot {slot}")]
    DuplicateReplace {
        /// Label of the contested slot.
        slot: String,
    },

    /// `Replace` or `Decorate` was used on a collector slot.
    #[error("replace/decorate is not supported for group slot {slot}")]
    GroupMisuse {
        /// Label of the collector slot.
        slot: String,
    },

    /// A declaration resolved to zero output slots.
    #[error("dependency {provider} has no output types")]
    NoOutputs {
        /// Description of the offending declaration.
        provider: String,
    },

    /// A decorator targets a slot nobody provides.
    #[error("cannot decorate slot {slot}: no provider")]
    DecorateWithoutBase {
        /// Label of the undecoratable slot.
        slot: String,
    },

    /// An error raised while resolving or installing a module scope.
    #[error("module {module}: {source}")]
    Module {
        /// Name of the module.
        module: String,
        /// Underlying error.
        #[source]
        source: Box<SlotwireError>,
    },

    /// A required slot has no provider in the requesting scope.
    #[error("missing dependency {slot} (required by {consumer})")]
    Missing {
        /// Label of the unresolved slot.
        slot: String,
        /// Description of whoever asked for it.
        consumer: String,
    },

    /// Construction re-entered a slot that is still being built.
    #[error("cyclic dependency detected: {path}")]
    Cycle {
        /// Rendered chain of slots forming the cycle.
        path: String,
    },

    /// A user constructor returned an error.
    #[error("constructor {constructor} failed: {source}")]
    Constructor {
        /// Identity of the failing constructor.
        constructor: String,
        /// Error returned by the constructor.
        #[source]
        source: BoxError,
    },

    /// A user constructor panicked and the panic was recovered.
    #[error("constructor {constructor} panicked: {message}")]
    Panicked {
        /// Identity of the panicking constructor.
        constructor: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// A stored value did not have the type its slot promised.
    #[error("type mismatch for slot {slot}: expected {expected}")]
    TypeMismatch {
        /// Label of the slot.
        slot: String,
        /// Type the consumer asked for.
        expected: String,
    },

    /// A mutating call reached a container that is already active.
    #[error("container is active: {message}")]
    ContainerActive {
        /// Description of the rejected operation.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl SlotwireError {
    /// Wraps this error with the name of the module it was raised in.
    #[must_use]
    pub fn in_module(self, module: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            source: Box::new(self),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SlotwireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_error_converts_with_prefix() {
        let err: SlotwireError = DeclarationError::MissingConstructor.into();
        assert_eq!(err.to_string(), "dependency error: constructor is missing");
    }

    #[test]
    fn module_wrapper_names_module_and_cause() {
        let err = SlotwireError::DuplicateProvider {
            slot: "String".into(),
        }
        .in_module("users");
        let msg = err.to_string();
        assert!(msg.starts_with("module users:"), "got: {msg}");
        assert!(msg.contains("duplicate provider for slot String"), "got: {msg}");
    }

    #[test]
    fn constructor_error_keeps_source() {
        let source: BoxError = "boom".into();
        let err = SlotwireError::Constructor {
            constructor: "make_db".into(),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("boom"));
    }
}
