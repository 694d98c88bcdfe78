//! Type-erased values exchanged between constructors and the injector.

use std::any::Any;
use std::sync::Arc;

use slotwire_common::error::{Result, SlotwireError};

use crate::signature::FieldDescriptor;
use crate::slot::Slot;

/// A constructed value with its concrete type erased.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Answer of the injector to a single requirement.
#[derive(Clone, Debug)]
pub enum Fetched {
    /// The value of a singular slot.
    One(AnyValue),
    /// An optional requirement with no provider.
    Absent,
    /// Every contribution to a collector slot.
    Many(Vec<AnyValue>),
}

/// One output of an invoked constructor, aligned with its declared results.
#[derive(Clone, Debug)]
pub enum Produced {
    /// A single value.
    One(AnyValue),
    /// Values to spread into a collector slot.
    Spread(Vec<AnyValue>),
}

/// Source of constructor arguments, implemented by the injector.
pub trait Arguments {
    /// Resolves one requirement of the constructor being invoked.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-optional requirement cannot be satisfied or
    /// constructing it fails.
    fn fetch(&mut self, field: &FieldDescriptor) -> Result<Fetched>;
}

/// Clones the `T` out of an erased value.
///
/// # Errors
///
/// Returns [`SlotwireError::TypeMismatch`] if the value is not a `T`.
pub fn downcast<T: Clone + 'static>(value: &AnyValue, field: &FieldDescriptor) -> Result<T> {
    (**value)
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| mismatch::<T>(field))
}

fn mismatch<T: ?Sized>(field: &FieldDescriptor) -> SlotwireError {
    SlotwireError::TypeMismatch {
        slot: Slot::from_field(field).to_string(),
        expected: std::any::type_name::<T>().to_string(),
    }
}

/// Sequential reader over the resolved fields of an input record.
pub struct FieldReader {
    fields: std::vec::IntoIter<(FieldDescriptor, Fetched)>,
}

impl FieldReader {
    pub(crate) fn new(fields: Vec<(FieldDescriptor, Fetched)>) -> Self {
        Self {
            fields: fields.into_iter(),
        }
    }

    fn next_field(&mut self) -> Result<(FieldDescriptor, Fetched)> {
        self.fields.next().ok_or_else(|| SlotwireError::TypeMismatch {
            slot: "<record>".to_string(),
            expected: "more declared fields".to_string(),
        })
    }

    /// Reads the next field as a required value.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is absent or has another type.
    pub fn value<T: Clone + 'static>(&mut self) -> Result<T> {
        let (field, fetched) = self.next_field()?;
        match fetched {
            Fetched::One(value) => downcast(&value, &field),
            Fetched::Absent | Fetched::Many(_) => Err(mismatch::<T>(&field)),
        }
    }

    /// Reads the next field as an optional value.
    ///
    /// # Errors
    ///
    /// Returns an error if the field has another type.
    pub fn optional<T: Clone + 'static>(&mut self) -> Result<Option<T>> {
        let (field, fetched) = self.next_field()?;
        match fetched {
            Fetched::One(value) => downcast(&value, &field).map(Some),
            Fetched::Absent => Ok(None),
            Fetched::Many(_) => Err(mismatch::<T>(&field)),
        }
    }

    /// Reads the next field as the contributions of a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the field is not a group of `T`.
    pub fn group<T: Clone + 'static>(&mut self) -> Result<Vec<T>> {
        let (field, fetched) = self.next_field()?;
        match fetched {
            Fetched::Many(values) => values.iter().map(|v| downcast(v, &field)).collect(),
            Fetched::Absent => Ok(Vec::new()),
            Fetched::One(_) => Err(mismatch::<Vec<T>>(&field)),
        }
    }
}

/// Sequential writer for the fields of an output record.
#[derive(Default)]
pub struct FieldWriter {
    produced: Vec<Produced>,
}

impl FieldWriter {
    /// Writes the next field.
    pub fn value<T: Send + Sync + 'static>(&mut self, value: T) {
        self.produced.push(Produced::One(Arc::new(value)));
    }

    /// Writes the next field as elements to spread into its group.
    pub fn spread<T: Send + Sync + 'static>(&mut self, values: Vec<T>) {
        self.produced.push(Produced::Spread(
            values
                .into_iter()
                .map(|v| Arc::new(v) as AnyValue)
                .collect(),
        ));
    }

    pub(crate) fn finish(self) -> Vec<Produced> {
        self.produced
    }
}
