use crate::reflect::class::Introspect;
use std::any::{type_name, Any};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;

/// Why a field could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    VersionMismatch { layout: String, host: String },
    NoMapping,
    UnknownClass(String),
    MissingField(String),
    WrongType {
        symbol: String,
        declared: &'static str,
        expected: &'static str,
    },
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VersionMismatch { layout, host } => {
                write!(f, "layout is for {} but host is {}", layout, host)
            }
            Self::NoMapping => write!(f, "no symbol mapped in layout"),
            Self::UnknownClass(class) => write!(f, "class {} not declared by host", class),
            Self::MissingField(symbol) => write!(f, "field {} not declared by host", symbol),
            Self::WrongType {
                symbol,
                declared,
                expected,
            } => write!(f, "field {} is {}, expected {}", symbol, declared, expected),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AccessError {
    #[error("{owner}.{name} is unavailable: {reason}")]
    HandleUnavailable {
        owner: String,
        name: String,
        reason: Unavailable,
    },

    #[error("instance of {found} is not a {expected}")]
    IncompatibleInstance { expected: String, found: String },

    #[error("field {symbol} is missing from a live {class} instance")]
    FieldMissing { class: String, symbol: String },

    #[error("field {symbol} of {class} no longer holds a {expected}")]
    TypeMismatch {
        class: String,
        symbol: String,
        expected: &'static str,
    },
}

/// Where a resolved field lives.
#[derive(Debug, Clone)]
pub struct Binding {
    pub symbol: String,
    /// Every class name an instance may have for this field to apply.
    pub accepted: Arc<HashSet<String>>,
}

/// A typed handle to one logical field of one logical class.
///
/// Resolution failures are kept inside the handle: an unavailable handle
/// fails every access with `AccessError::HandleUnavailable`.
pub struct FieldHandle<T> {
    owner: String,
    name: String,
    state: Result<Binding, Unavailable>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            name: self.name.clone(),
            state: self.state.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FieldHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("value", &type_name::<T>())
            .field("symbol", &self.state.as_ref().map(|b| b.symbol.as_str()))
            .finish()
    }
}

impl<T: Any + Send + Sync> FieldHandle<T> {
    pub(crate) fn new(owner: &str, name: &str, state: Result<Binding, Unavailable>) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            state,
            _value: PhantomData,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        self.state.is_ok()
    }

    pub fn unavailable_reason(&self) -> Option<&Unavailable> {
        self.state.as_ref().err()
    }

    fn binding(&self) -> Result<&Binding, AccessError> {
        self.state
            .as_ref()
            .map_err(|reason| AccessError::HandleUnavailable {
                owner: self.owner.clone(),
                name: self.name.clone(),
                reason: reason.clone(),
            })
    }

    /// Checks that `instance` is of a class this field belongs to. The
    /// accepted classes are computed once at resolve time, so this is a
    /// single set lookup. Hold on to the `Bound` to access the same instance
    /// repeatedly without repeating it.
    pub fn bind<'a, I>(&'a self, instance: &'a I) -> Result<Bound<'a, I, T>, AccessError>
    where
        I: Introspect + ?Sized,
    {
        let binding = self.binding()?;
        let class = instance.class_name();
        if !binding.accepted.contains(class) {
            return Err(AccessError::IncompatibleInstance {
                expected: self.owner.clone(),
                found: class.to_string(),
            });
        }
        Ok(Bound {
            binding,
            instance,
            _value: PhantomData,
        })
    }

    /// Binds and reads in one step: one accepted-set lookup, then the
    /// liveness and type check on the field.
    pub fn get<I>(&self, instance: &I) -> Result<Arc<T>, AccessError>
    where
        I: Introspect + ?Sized,
    {
        self.bind(instance)?.get()
    }

    pub fn set<I>(&self, instance: &I, value: T) -> Result<(), AccessError>
    where
        I: Introspect + ?Sized,
    {
        self.bind(instance)?.set(value)
    }
}

/// A handle checked against one instance; accesses only verify that the field
/// is still present and still holds a `T`.
pub struct Bound<'a, I: ?Sized, T> {
    binding: &'a Binding,
    instance: &'a I,
    _value: PhantomData<fn() -> T>,
}

impl<'a, I, T> Bound<'a, I, T>
where
    I: Introspect + ?Sized,
    T: Any + Send + Sync,
{
    pub fn get(&self) -> Result<Arc<T>, AccessError> {
        let symbol = &self.binding.symbol;
        let value = self
            .instance
            .field(symbol)
            .ok_or_else(|| AccessError::FieldMissing {
                class: self.instance.class_name().to_string(),
                symbol: symbol.clone(),
            })?;
        value.downcast::<T>().map_err(|_| AccessError::TypeMismatch {
            class: self.instance.class_name().to_string(),
            symbol: symbol.clone(),
            expected: type_name::<T>(),
        })
    }

    pub fn set(&self, value: T) -> Result<(), AccessError> {
        let symbol = &self.binding.symbol;
        if self.instance.replace_field(symbol, Arc::new(value)) {
            Ok(())
        } else {
            Err(AccessError::FieldMissing {
                class: self.instance.class_name().to_string(),
                symbol: symbol.clone(),
            })
        }
    }
}
