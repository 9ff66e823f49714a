//! Type-erased capability handle
//!
//! [`Boxed`] is the currency passed between subsystems that do not know the
//! concrete types they shuttle around: factories, script bridges, event
//! payloads. It is either empty, a shared pointer to an object, or a small
//! enum value carried inline.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::error::CastError;
use crate::interfaces::Interfaces;
use crate::manager::ClassManager;
use crate::shared_ptr::SharedPtr;
use crate::type_id::{Type, TypeId};

#[derive(Clone, Default)]
enum Stub {
    #[default]
    Null,
    Ptr {
        type_id: TypeId,
        /// Always a `SharedPtr<T>` where `Type::<T>::id() == type_id`
        value: Arc<dyn Any + Send + Sync>,
        interfaces: Option<Arc<Interfaces>>,
        addr: usize,
    },
    Enum {
        type_id: TypeId,
        value: i32,
    },
}

/// Copyable, reference-counted handle to any object or enum value
///
/// Cloning bumps the shared count of the underlying object; the object is
/// dropped exactly once, when the last handle of any kind goes away.
#[derive(Clone, Default)]
pub struct Boxed {
    stub: Stub,
}

impl Boxed {
    /// The empty handle
    #[inline]
    pub const fn null() -> Self {
        Self { stub: Stub::Null }
    }

    pub(crate) fn from_ptr<T>(ptr: SharedPtr<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if ptr.is_null() {
            return Self::null();
        }
        let interfaces = ptr.interfaces().cloned();
        let addr = ptr.addr();
        Self {
            stub: Stub::Ptr {
                type_id: Type::<T>::id(),
                value: Arc::new(ptr),
                interfaces,
                addr,
            },
        }
    }

    /// Carry an enum value inline, tagged with the enum's type
    pub fn from_enum<E>(value: E) -> Self
    where
        E: Into<i32> + 'static,
    {
        Self {
            stub: Stub::Enum {
                type_id: Type::<E>::id(),
                value: value.into(),
            },
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.stub, Stub::Null)
    }

    #[inline]
    pub fn is_enum(&self) -> bool {
        matches!(self.stub, Stub::Enum { .. })
    }

    /// Type of the stored value, [`TypeId::NULL`] when empty
    #[inline]
    pub fn type_id(&self) -> TypeId {
        match &self.stub {
            Stub::Null => TypeId::NULL,
            Stub::Ptr { type_id, .. } | Stub::Enum { type_id, .. } => *type_id,
        }
    }

    /// Capability table of the referenced object
    pub fn interfaces(&self) -> Option<&Arc<Interfaces>> {
        match &self.stub {
            Stub::Ptr { interfaces, .. } => interfaces.as_ref(),
            _ => None,
        }
    }

    /// Identity of the referenced object, 0 for enums and null
    ///
    /// Views of one object through different interfaces share the address.
    pub fn addr(&self) -> usize {
        match &self.stub {
            Stub::Ptr { addr, .. } => *addr,
            _ => 0,
        }
    }

    /// Do both handles reference the same object (or carry the same enum)
    pub fn ptr_eq(&self, other: &Boxed) -> bool {
        match (&self.stub, &other.stub) {
            (Stub::Null, Stub::Null) => true,
            (Stub::Ptr { addr: a, .. }, Stub::Ptr { addr: b, .. }) => a == b,
            (
                Stub::Enum { type_id: ta, value: a },
                Stub::Enum { type_id: tb, value: b },
            ) => ta == tb && a == b,
            _ => false,
        }
    }

    /// Exact-type extraction for callers that already know what is stored
    ///
    /// Asking for a type other than the stored one is a programming error:
    /// it panics in debug builds and yields a null pointer otherwise.
    pub fn unpack<T>(&self) -> SharedPtr<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let Stub::Ptr { type_id, value, .. } = &self.stub else {
            return SharedPtr::null();
        };
        debug_assert!(
            *type_id == Type::<T>::id(),
            "unpack::<{}>() on a box holding {:?}",
            Type::<T>::name(),
            type_id
        );
        value
            .downcast_ref::<SharedPtr<T>>()
            .cloned()
            .unwrap_or_default()
    }

    /// Capability query
    ///
    /// Tries an exact match, then the object's declared and attached
    /// interfaces, then a `Duck<T>`, then the registered adapters. Returns a
    /// null pointer when nothing can provide `T`.
    pub fn cast<T>(&self) -> SharedPtr<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = Type::<T>::id();
        if self.type_id() == id {
            return self.unpack::<T>();
        }
        match self.interfaces() {
            Some(interfaces) => interfaces.query::<T>(),
            None => ClassManager::global().adapt(self, id).unpack::<T>(),
        }
    }

    /// Does the box answer to `T`
    ///
    /// For pointer boxes this agrees with [`Boxed::cast`]. An enum box answers
    /// to its own enum type only; recover the value with [`Boxed::to_enum`],
    /// `cast` never yields a pointer for it.
    pub fn is<T>(&self) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = Type::<T>::id();
        if self.type_id() == id {
            return !self.is_null();
        }
        match self.interfaces() {
            Some(interfaces) if interfaces.is(id) => true,
            _ => !self.cast::<T>().is_null(),
        }
    }

    /// [`Boxed::cast`] for callers that cannot continue without `T`
    pub fn require<T>(&self) -> Result<SharedPtr<T>, CastError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.is_null() {
            return Err(CastError::Null {
                target: Type::<T>::short_name(),
            });
        }
        let found = self.cast::<T>();
        if found.is_null() {
            return Err(CastError::unsatisfied(self.type_name(), Type::<T>::short_name()));
        }
        Ok(found)
    }

    /// Raw value of an enum stub
    pub fn enum_value(&self) -> Option<i32> {
        match &self.stub {
            Stub::Enum { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Recover an enum value stored with [`Boxed::from_enum`]
    pub fn to_enum<E>(&self) -> Option<E>
    where
        E: TryFrom<i32> + 'static,
    {
        match &self.stub {
            Stub::Enum { type_id, value } if *type_id == Type::<E>::id() => {
                E::try_from(*value).ok()
            }
            _ => None,
        }
    }

    fn type_name(&self) -> String {
        match self.interfaces() {
            Some(interfaces) => interfaces.class().name().to_string(),
            None => format!("{:?}", self.type_id()),
        }
    }
}

impl<T> From<SharedPtr<T>> for Boxed
where
    T: ?Sized + Send + Sync + 'static,
{
    fn from(ptr: SharedPtr<T>) -> Self {
        Self::from_ptr(ptr)
    }
}

impl fmt::Debug for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stub {
            Stub::Null => write!(f, "Boxed(null)"),
            Stub::Ptr { type_id, addr, .. } => f
                .debug_struct("Boxed")
                .field("type_id", type_id)
                .field("addr", &format_args!("{:#x}", addr))
                .finish(),
            Stub::Enum { type_id, value } => f
                .debug_struct("Boxed")
                .field("type_id", type_id)
                .field("enum", value)
                .finish(),
        }
    }
}
