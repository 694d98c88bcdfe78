//! Declarations: what to provide, replace or decorate, and how.
//!
//! A [`Dependency`] is created from a [`Constructor`] and refined with
//! builder options. Problems found while building it are captured in the
//! declaration instead of failing the caller, and surface the first time the
//! declaration takes part in resolution.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use slotwire_common::constants::RUNNABLE_GROUP;
use slotwire_common::error::DeclarationError;
use slotwire_common::types::TypeKey;

use crate::classify;
use crate::constructor::Constructor;
use crate::runnable::Runnable;
use crate::signature::ReturnItem;
use crate::value::AnyValue;

/// How a declaration binds to its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Default-priority binding.
    Provide,
    /// Exclusive override that out-ranks `Provide`.
    Replace,
    /// Transformation applied to an already bound value.
    Decorate,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Provide => "provide",
            Self::Replace => "replace",
            Self::Decorate => "decorate",
        })
    }
}

type Cast = Arc<dyn Fn(&AnyValue) -> Option<AnyValue> + Send + Sync>;

/// Exposes a concrete result type as another type, usually a trait object.
#[derive(Clone)]
pub struct Interface {
    origin: TypeKey,
    target: TypeKey,
    cast: Cast,
}

impl Interface {
    /// Exposes values of `C` as `I` through `cast`.
    pub fn new<C, I>(cast: impl Fn(C) -> I + Send + Sync + 'static) -> Self
    where
        C: Clone + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        Self {
            origin: TypeKey::of::<C>(),
            target: TypeKey::of::<I>(),
            cast: Arc::new(move |value| {
                (**value)
                    .downcast_ref::<C>()
                    .cloned()
                    .map(|concrete| Arc::new(cast(concrete)) as AnyValue)
            }),
        }
    }

    /// The concrete type this interface applies to.
    #[must_use]
    pub const fn origin(&self) -> TypeKey {
        self.origin
    }

    /// The exposed type.
    #[must_use]
    pub const fn target(&self) -> TypeKey {
        self.target
    }

    /// Converts a concrete value. Returns `None` if it is not the origin type.
    #[must_use]
    pub fn apply(&self, value: &AnyValue) -> Option<AnyValue> {
        (self.cast)(value)
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface({} as {})", self.origin, self.target)
    }
}

/// Container-wide rule exposing every declaration of `C` through interfaces.
#[derive(Debug, Clone)]
pub struct Matching {
    origin: TypeKey,
    interfaces: Vec<Interface>,
}

impl Matching {
    /// Creates a matching for declarations whose result type is `C`.
    #[must_use]
    pub fn new<C: ?Sized + 'static>(interfaces: Vec<Interface>) -> Self {
        Self {
            origin: TypeKey::of::<C>(),
            interfaces,
        }
    }

    /// The result type this matching applies to.
    #[must_use]
    pub const fn origin(&self) -> TypeKey {
        self.origin
    }

    /// Interfaces added to matching declarations.
    #[must_use]
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }
}

/// One declaration.
#[derive(Debug, Clone)]
pub struct Dependency {
    constructor: Option<Constructor>,
    kind: Kind,
    interfaces: Vec<Interface>,
    key: Option<String>,
    name: Option<String>,
    group: Option<String>,
    private: bool,
    error: Option<DeclarationError>,
}

impl Dependency {
    /// Declares a default provider.
    #[must_use]
    pub fn new(constructor: Constructor) -> Self {
        Self::from_parts(Kind::Provide, Some(constructor))
    }

    /// Declares an explicit replacement.
    #[must_use]
    pub fn replace(constructor: Constructor) -> Self {
        Self::from_parts(Kind::Replace, Some(constructor))
    }

    /// Declares a decorator.
    #[must_use]
    pub fn decorate(constructor: Constructor) -> Self {
        Self::from_parts(Kind::Decorate, Some(constructor))
    }

    /// Declares from raw parts. A missing constructor is captured as an error.
    #[must_use]
    pub fn from_parts(kind: Kind, constructor: Option<Constructor>) -> Self {
        let error = match &constructor {
            None => Some(DeclarationError::MissingConstructor),
            Some(ctor) => classify::validate_signature(ctor.signature()).err(),
        };
        Self {
            constructor,
            kind,
            interfaces: Vec::new(),
            key: None,
            name: None,
            group: None,
            private: false,
            error,
        }
    }

    /// Qualifies the slot with a name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Contributes to a collector group instead of a singular slot.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Attaches a diagnostic key. Has no effect on resolution.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Restricts the declaration to its module scope.
    #[must_use]
    pub const fn private(mut self) -> Self {
        self.private = true;
        self
    }

    /// Exposes the result through `interface` instead of its concrete type.
    #[must_use]
    pub fn with_match(mut self, interface: Interface) -> Self {
        if let Err(err) = self.add_interfaces(std::slice::from_ref(&interface)) {
            if self.error.is_none() {
                self.error = Some(err);
            }
        }
        self
    }

    /// Adds interfaces from a container-wide matching.
    ///
    /// Returns `true` if the matching applied. Decorators are never matched.
    pub fn apply_matching(&mut self, matching: &Matching) -> bool {
        if self.kind == Kind::Decorate || self.result_type() != Some(matching.origin()) {
            return false;
        }
        self.interfaces.extend(matching.interfaces().iter().cloned());
        true
    }

    fn add_interfaces(&mut self, interfaces: &[Interface]) -> Result<(), DeclarationError> {
        let result = self.result_type();
        for interface in interfaces {
            if result.is_some_and(|ty| ty != interface.origin()) {
                return Err(DeclarationError::InvalidMatching {
                    message: format!(
                        "interface {} applies to {}, not {}",
                        interface.target(),
                        interface.origin(),
                        result.map_or_else(String::new, |ty| ty.to_string())
                    ),
                });
            }
        }
        self.interfaces.extend_from_slice(interfaces);
        Ok(())
    }

    /// The constructor, if one was given.
    #[must_use]
    pub const fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    /// The binding kind.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    pub(crate) const fn set_kind(&mut self, kind: Kind) {
        self.kind = kind;
    }

    pub(crate) const fn clear_private(&mut self) {
        self.private = false;
    }

    /// Interfaces the result is exposed as.
    #[must_use]
    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Diagnostic key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Name qualifier.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Explicit group.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Group the declaration contributes to: the explicit group, or the
    /// runnable group for runnables.
    #[must_use]
    pub fn effective_group(&self) -> Option<&str> {
        if self.is_runnable() {
            Some(RUNNABLE_GROUP)
        } else {
            self.group()
        }
    }

    /// Whether the declaration is private to its module.
    #[must_use]
    pub const fn is_private(&self) -> bool {
        self.private
    }

    /// The error captured while building the declaration.
    #[must_use]
    pub const fn error(&self) -> Option<&DeclarationError> {
        self.error.as_ref()
    }

    pub(crate) fn primary_result(&self) -> Option<&ReturnItem> {
        if self.error.is_some() {
            return None;
        }
        self.constructor.as_ref()?.signature().primary()
    }

    /// Type of the first result, or `None` for invalid declarations.
    #[must_use]
    pub fn result_type(&self) -> Option<TypeKey> {
        self.primary_result().and_then(ReturnItem::ty)
    }

    /// Types the declaration is exposed as, deduplicated.
    ///
    /// Interfaces hide the concrete type. Output records expose each
    /// field type.
    #[must_use]
    pub fn exposed_types(&self) -> Vec<TypeKey> {
        let mut types: Vec<TypeKey> = if self.interfaces.is_empty() {
            match self.primary_result() {
                Some(ReturnItem::Record { fields, .. }) => fields.iter().map(|f| f.ty).collect(),
                Some(item) => item.ty().into_iter().collect(),
                None => Vec::new(),
            }
        } else {
            self.interfaces.iter().map(Interface::target).collect()
        };
        let mut seen = std::collections::HashSet::new();
        types.retain(|ty| seen.insert(*ty));
        types
    }

    /// Whether the declaration produces a [`Runnable`].
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        self.result_type() == Some(TypeKey::of::<Runnable>())
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(key) = &self.key {
            write!(f, " {key}")?;
        }
        match &self.constructor {
            Some(ctor) => write!(f, " {}", ctor.identity()),
            None => f.write_str(" <no constructor>"),
        }
    }
}

/// A named scope with its own declarations.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    dependencies: Vec<Dependency>,
}

impl Module {
    /// Creates a module.
    #[must_use]
    pub fn new(name: impl Into<String>, dependencies: Vec<Dependency>) -> Self {
        Self {
            name: name.into(),
            dependencies,
        }
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations in order.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Mutable access for applying container-wide matchings.
    pub fn dependencies_mut(&mut self) -> &mut [Dependency] {
        &mut self.dependencies
    }
}
