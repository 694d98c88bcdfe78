//! Typed constructors with signature descriptors.
//!
//! A [`Constructor`] pairs a type-erased callable body with the
//! [`Signature`] describing it. The descriptor is computed from the Rust
//! function type when the constructor is created, so resolution and graph
//! building never need to call anything.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use serde::Serialize;
use slotwire_common::error::{BoxError, Result, SlotwireError};
use slotwire_common::types::TypeKey;

use crate::inject::{Inject, OutRecord};
use crate::signature::{Param, ReturnItem, Signature};
use crate::value::{Arguments, FieldWriter, Produced};

/// Erased constructor body: pulls arguments, returns one output per result.
pub type Body = Arc<dyn Fn(&mut dyn Arguments) -> Result<Vec<Produced>> + Send + Sync>;

/// Where a constructor came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Type name of the callable, e.g. `app::make_db` or `app::main::{{closure}}`.
    pub name: String,
    /// Source file of the declaration.
    pub file: &'static str,
    /// Source line of the declaration.
    pub line: u32,
}

impl Identity {
    #[track_caller]
    fn here(name: &str) -> Self {
        let location = Location::caller();
        Self {
            name: name.to_string(),
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.file, self.line)
    }
}

/// A callable that can be invoked repeatedly with injected arguments.
///
/// Implemented for every `Fn(A1, .., An) -> T` with up to eight
/// parameters, where each `Ai` implements [`Inject`].
pub trait Factory<Args>: Send + Sync + 'static {
    /// Value returned by the callable.
    type Output;

    /// Descriptors of the parameters, in call order.
    fn params() -> Vec<Param>;

    /// Extracts every argument and calls the function.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be extracted.
    fn call(&self, args: &mut dyn Arguments) -> Result<Self::Output>;
}

/// A callable invoked once with injected arguments.
///
/// Implemented for every `FnOnce(A1, .., An) -> T` with up to eight
/// parameters.
pub trait Consumer<Args> {
    /// Value returned by the callable.
    type Output;

    /// Descriptors of the parameters, in call order.
    fn params() -> Vec<Param>;

    /// Extracts every argument and calls the function.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be extracted.
    fn consume(self, args: &mut dyn Arguments) -> Result<Self::Output>;
}

macro_rules! impl_callables {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Factory<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            $($arg: Inject,)*
        {
            type Output = Out;

            fn params() -> Vec<Param> {
                vec![$(<$arg as Inject>::param()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn call(&self, args: &mut dyn Arguments) -> Result<Out> {
                $(let $arg = <$arg as Inject>::extract(args)?;)*
                Ok((self)($($arg),*))
            }
        }

        impl<Func, Out, $($arg,)*> Consumer<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Out,
            $($arg: Inject,)*
        {
            type Output = Out;

            fn params() -> Vec<Param> {
                vec![$(<$arg as Inject>::param()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn consume(self, args: &mut dyn Arguments) -> Result<Out> {
                $(let $arg = <$arg as Inject>::extract(args)?;)*
                Ok((self)($($arg),*))
            }
        }
    };
}

impl_callables!();
impl_callables!(A1);
impl_callables!(A1, A2);
impl_callables!(A1, A2, A3);
impl_callables!(A1, A2, A3, A4);
impl_callables!(A1, A2, A3, A4, A5);
impl_callables!(A1, A2, A3, A4, A5, A6);
impl_callables!(A1, A2, A3, A4, A5, A6, A7);
impl_callables!(A1, A2, A3, A4, A5, A6, A7, A8);

/// A constructor: signature descriptor, identity and optional callable body.
#[derive(Clone)]
pub struct Constructor {
    signature: Signature,
    identity: Identity,
    body: Option<Body>,
}

impl Constructor {
    /// Wraps an infallible function `Fn(A1, .., An) -> T`.
    #[must_use]
    #[track_caller]
    pub fn new<F, Args>(f: F) -> Self
    where
        F: Factory<Args>,
        F::Output: Send + Sync + 'static,
    {
        let signature = Signature::new(
            F::params(),
            vec![ReturnItem::Value(TypeKey::of::<F::Output>())],
        );
        let body: Body = Arc::new(move |args| {
            let value = f.call(args)?;
            Ok(vec![Produced::One(Arc::new(value))])
        });
        Self::assemble(signature, Some(body), std::any::type_name::<F>())
    }

    /// Wraps a fallible function `Fn(A1, .., An) -> Result<T, E>`.
    #[must_use]
    #[track_caller]
    pub fn fallible<F, Args, T, E>(f: F) -> Self
    where
        F: Factory<Args, Output = std::result::Result<T, E>>,
        T: Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let signature = Signature::new(
            F::params(),
            vec![ReturnItem::Value(TypeKey::of::<T>()), ReturnItem::Error],
        );
        let name = std::any::type_name::<F>();
        let body: Body = Arc::new(move |args| match f.call(args)? {
            Ok(value) => Ok(vec![Produced::One(Arc::new(value))]),
            Err(e) => Err(SlotwireError::Constructor {
                constructor: name.to_string(),
                source: e.into(),
            }),
        });
        Self::assemble(signature, Some(body), name)
    }

    /// Wraps a function returning an output record that fills several slots.
    #[must_use]
    #[track_caller]
    pub fn record<F, Args, R>(f: F) -> Self
    where
        F: Factory<Args, Output = R>,
        R: OutRecord,
    {
        let signature = Signature::new(F::params(), vec![record_result::<R>()]);
        let body: Body = Arc::new(move |args| Ok(write_record(f.call(args)?)));
        Self::assemble(signature, Some(body), std::any::type_name::<F>())
    }

    /// Wraps a fallible function returning an output record.
    #[must_use]
    #[track_caller]
    pub fn fallible_record<F, Args, R, E>(f: F) -> Self
    where
        F: Factory<Args, Output = std::result::Result<R, E>>,
        R: OutRecord,
        E: Into<BoxError>,
    {
        let signature = Signature::new(F::params(), vec![record_result::<R>(), ReturnItem::Error]);
        let name = std::any::type_name::<F>();
        let body: Body = Arc::new(move |args| match f.call(args)? {
            Ok(record) => Ok(write_record(record)),
            Err(e) => Err(SlotwireError::Constructor {
                constructor: name.to_string(),
                source: e.into(),
            }),
        });
        Self::assemble(signature, Some(body), name)
    }

    /// A constructor known only by its descriptor. Invoking it fails.
    #[must_use]
    #[track_caller]
    pub fn from_signature(signature: Signature) -> Self {
        Self::assemble(signature, None, "<signature>")
    }

    #[track_caller]
    fn assemble(signature: Signature, body: Option<Body>, name: &str) -> Self {
        Self {
            signature,
            identity: Identity::here(name),
            body,
        }
    }

    /// Renames the constructor in diagnostics.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.identity.name = name.into();
        self
    }

    /// The signature descriptor.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Where the constructor was declared.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Calls the body, returning one output per declared result.
    ///
    /// # Errors
    ///
    /// Returns an error if an argument cannot be resolved, the function
    /// itself fails, or the constructor has no body.
    pub fn invoke(&self, args: &mut dyn Arguments) -> Result<Vec<Produced>> {
        let body = self.body.as_ref().ok_or_else(|| SlotwireError::Constructor {
            constructor: self.identity.name.clone(),
            source: "constructor has no callable body".into(),
        })?;
        body(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("identity", &self.identity)
            .field("signature", &self.signature)
            .field("callable", &self.body.is_some())
            .finish()
    }
}

fn record_result<R: OutRecord>() -> ReturnItem {
    ReturnItem::Record {
        ty: TypeKey::of::<R>(),
        fields: R::fields(),
    }
}

fn write_record<R: OutRecord>(record: R) -> Vec<Produced> {
    let mut writer = FieldWriter::default();
    record.into_fields(&mut writer);
    writer.finish()
}
