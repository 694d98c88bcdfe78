//! Signature descriptors for constructors.
//!
//! A [`Signature`] records everything resolution needs to know about a
//! constructor without calling it: the type of every parameter, the shape
//! of its results, and the tags of any input or output record fields.
//! Descriptors are computed once, when the constructor is declared.

use std::fmt;

use slotwire_common::types::TypeKey;

/// One field of a tagged input or output record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Slot type of the field. For grouped fields this is the element type.
    pub ty: TypeKey,
    /// Name tag. Ignored when `group` is set.
    pub name: Option<String>,
    /// Group tag.
    pub group: Option<String>,
    /// Input fields only: resolve to absent instead of failing.
    pub optional: bool,
    /// Output fields only: the value is a `Vec<ty>` spread into the group.
    pub flatten: bool,
}

impl FieldDescriptor {
    /// An untagged field of type `T`.
    #[must_use]
    pub fn value<T: ?Sized + 'static>() -> Self {
        Self {
            ty: TypeKey::of::<T>(),
            name: None,
            group: None,
            optional: false,
            flatten: false,
        }
    }

    /// A field of type `T` tagged with `name`.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::value::<T>()
        }
    }

    /// A field contributing to, or collecting, the group `group` of `T`.
    #[must_use]
    pub fn grouped<T: ?Sized + 'static>(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Self::value::<T>()
        }
    }

    /// Marks an input field as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks a grouped output field as a `Vec<T>` to spread into the group.
    #[must_use]
    pub const fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// Name tag after group suppression.
    #[must_use]
    pub fn effective_name(&self) -> Option<&str> {
        if self.group.is_some() {
            None
        } else {
            self.name.as_deref()
        }
    }
}

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// A plain value parameter.
    Value(FieldDescriptor),
    /// A tagged input record, unwrapped into one requirement per field.
    Record {
        /// Type of the record itself.
        ty: TypeKey,
        /// Fields in declaration order.
        fields: Vec<FieldDescriptor>,
    },
}

impl Param {
    /// Requirements this parameter contributes, in order.
    #[must_use]
    pub fn requirements(&self) -> &[FieldDescriptor] {
        match self {
            Self::Value(field) => std::slice::from_ref(field),
            Self::Record { fields, .. } => fields,
        }
    }
}

/// One declared result of a constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnItem {
    /// A single value of the given type.
    Value(TypeKey),
    /// A tagged output record filling one slot per field.
    Record {
        /// Type of the record itself.
        ty: TypeKey,
        /// Fields in declaration order.
        fields: Vec<FieldDescriptor>,
    },
    /// The error channel of a fallible constructor.
    Error,
}

impl ReturnItem {
    /// Type of the value, or `None` for the error channel.
    #[must_use]
    pub const fn ty(&self) -> Option<TypeKey> {
        match self {
            Self::Value(ty) | Self::Record { ty, .. } => Some(*ty),
            Self::Error => None,
        }
    }

    /// Whether this is the error channel.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for ReturnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(ty) | Self::Record { ty, .. } => write!(f, "{ty}"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Parameter and result descriptors of a constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    /// Parameters in call order.
    pub params: Vec<Param>,
    /// Results in declaration order.
    pub results: Vec<ReturnItem>,
}

impl Signature {
    /// Creates a signature from its parts.
    #[must_use]
    pub const fn new(params: Vec<Param>, results: Vec<ReturnItem>) -> Self {
        Self { params, results }
    }

    /// The first result, which carries the produced value on valid shapes.
    #[must_use]
    pub fn primary(&self) -> Option<&ReturnItem> {
        self.results.first()
    }

    /// All requirements across parameters, with records unwrapped.
    pub fn requirements(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.params.iter().flat_map(Param::requirements)
    }

    /// Renders the result list, e.g. `String, error`.
    #[must_use]
    pub fn render_results(&self) -> String {
        self.results
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
