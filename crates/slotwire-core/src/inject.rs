//! Parameter extraction and tagged records.
//!
//! Every `T: Clone + Send + Sync + 'static` is a plain value parameter.
//! [`Optional`] and [`In`] are the two wrappers with different semantics;
//! they deliberately do not implement `Clone`, which keeps them apart from
//! the blanket implementation.

use std::ops::Deref;

use slotwire_common::error::{Result, SlotwireError};
use slotwire_common::types::TypeKey;

use crate::signature::{FieldDescriptor, Param};
use crate::slot::Slot;
use crate::value::{Arguments, Fetched, FieldReader, FieldWriter, downcast};

/// A type that can be requested as a constructor or consumer parameter.
pub trait Inject: Sized {
    /// Descriptor of this parameter.
    fn param() -> Param;

    /// Pulls the parameter value out of the injector.
    ///
    /// # Errors
    ///
    /// Returns an error if a requirement is missing or has the wrong type.
    fn extract(args: &mut dyn Arguments) -> Result<Self>;
}

impl<T: Clone + Send + Sync + 'static> Inject for T {
    fn param() -> Param {
        Param::Value(FieldDescriptor::value::<T>())
    }

    fn extract(args: &mut dyn Arguments) -> Result<Self> {
        let field = FieldDescriptor::value::<T>();
        match args.fetch(&field)? {
            Fetched::One(value) => downcast(&value, &field),
            Fetched::Absent | Fetched::Many(_) => Err(SlotwireError::Missing {
                slot: Slot::from_field(&field).to_string(),
                consumer: "parameter".to_string(),
            }),
        }
    }
}

/// A parameter that resolves to `None` when nothing provides `T`.
#[derive(Debug)]
pub struct Optional<T>(Option<T>);

impl<T> Optional<T> {
    /// Returns the value, if one was provided.
    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Whether a value was provided.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Unwraps into the inner option.
    #[must_use]
    pub fn into_inner(self) -> Option<T> {
        self.0
    }
}

impl<T: Clone + Send + Sync + 'static> Inject for Optional<T> {
    fn param() -> Param {
        Param::Value(FieldDescriptor::value::<T>().optional())
    }

    fn extract(args: &mut dyn Arguments) -> Result<Self> {
        let field = FieldDescriptor::value::<T>().optional();
        match args.fetch(&field)? {
            Fetched::One(value) => downcast(&value, &field).map(|v| Self(Some(v))),
            Fetched::Absent | Fetched::Many(_) => Ok(Self(None)),
        }
    }
}

/// A record whose fields are requested individually, with name and group tags.
///
/// Implementors list their fields once in [`InRecord::fields`] and read them
/// back in the same order in [`InRecord::from_fields`].
pub trait InRecord: Sized + 'static {
    /// Field descriptors, in the order [`InRecord::from_fields`] reads them.
    fn fields() -> Vec<FieldDescriptor>;

    /// Builds the record from resolved fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a field has an unexpected type.
    fn from_fields(fields: &mut FieldReader) -> Result<Self>;
}

/// Parameter wrapper that unwraps an [`InRecord`].
#[derive(Debug)]
pub struct In<R>(pub R);

impl<R> In<R> {
    /// Unwraps the record.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R> Deref for In<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.0
    }
}

impl<R: InRecord> Inject for In<R> {
    fn param() -> Param {
        Param::Record {
            ty: TypeKey::of::<R>(),
            fields: R::fields(),
        }
    }

    fn extract(args: &mut dyn Arguments) -> Result<Self> {
        let mut resolved = Vec::new();
        for field in R::fields() {
            let fetched = args.fetch(&field)?;
            resolved.push((field, fetched));
        }
        R::from_fields(&mut FieldReader::new(resolved)).map(In)
    }
}

/// A record that fills several slots at once, one per field.
pub trait OutRecord: Sized + Send + 'static {
    /// Field descriptors, in the order [`OutRecord::into_fields`] writes them.
    fn fields() -> Vec<FieldDescriptor>;

    /// Writes every field.
    fn into_fields(self, out: &mut FieldWriter);
}
