//! Owning and observing object handles
//!
//! A [`SharedPtr`] pairs the object with its [`Interfaces`] table. Every
//! handle to the same object, whatever interface it is viewed through,
//! shares that one table, so a capability attached through one view is
//! visible through all of them.

use core::fmt;
use core::ops::Deref;
use std::sync::{Arc, Weak};

use crate::boxed::Boxed;
use crate::error::CastError;
use crate::implements::Implements;
use crate::interfaces::{AttachmentTable, Interfaces, Recycler};
use crate::type_id::{Type, TypeId};

/// Reference-counted handle owning an object and its capability table
pub struct SharedPtr<T: ?Sized> {
    ptr: Option<Arc<T>>,
    interfaces: Option<Arc<Interfaces>>,
}

impl<T: Send + Sync + 'static> SharedPtr<T> {
    /// Wrap `value`, resolving its class through the global manager
    ///
    /// Types nobody registered get a placeholder class and only answer to
    /// their own id (plus whatever is attached later).
    pub fn new(value: T) -> Self {
        Self::adopt(Arc::new(value))
    }

    /// Take over an existing allocation
    ///
    /// The handle gets a fresh capability table; other `Arc`s to the object
    /// do not see it.
    pub fn adopt(object: Arc<T>) -> Self {
        let interfaces = Arc::new(Interfaces::for_object(&object));
        Self {
            ptr: Some(object),
            interfaces: Some(interfaces),
        }
    }

    /// Wrap `value` reusing attachment storage from a pool
    ///
    /// When the last handle goes away the cleared table is handed back to
    /// `recycler`.
    pub fn new_recycled(value: T, table: AttachmentTable, recycler: Weak<dyn Recycler>) -> Self {
        let object = Arc::new(value);
        let interfaces = Arc::new(Interfaces::with_storage(&object, table, Some(recycler)));
        Self {
            ptr: Some(object),
            interfaces: Some(interfaces),
        }
    }
}

impl<T: Implements> SharedPtr<T> {
    /// Like [`SharedPtr::new`], registering the class of `T` first if needed
    pub fn make(value: T) -> Self {
        T::class();
        Self::new(value)
    }
}

impl<T: ?Sized + Send + Sync + 'static> SharedPtr<T> {
    #[inline]
    pub const fn null() -> Self {
        Self {
            ptr: None,
            interfaces: None,
        }
    }

    pub(crate) fn from_parts(object: Arc<T>, interfaces: Option<Arc<Interfaces>>) -> Self {
        Self {
            ptr: Some(object),
            interfaces,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        self.ptr.as_deref()
    }

    #[inline]
    pub fn as_arc(&self) -> Option<&Arc<T>> {
        self.ptr.as_ref()
    }

    #[inline]
    pub fn interfaces(&self) -> Option<&Arc<Interfaces>> {
        self.interfaces.as_ref()
    }

    /// Address of the object, shared by every view of it; 0 when null
    pub fn addr(&self) -> usize {
        match &self.ptr {
            Some(object) => Arc::as_ptr(object).cast::<()>() as usize,
            None => 0,
        }
    }

    /// Do both handles point at the same object
    pub fn ptr_eq<U>(&self, other: &SharedPtr<U>) -> bool
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.addr() == other.addr()
    }

    /// Is this the only strong handle to the object
    pub fn unique(&self) -> bool {
        self.ptr
            .as_ref()
            .map(|object| Arc::strong_count(object) == 1)
            .unwrap_or(false)
    }

    /// Erase into a [`Boxed`]
    #[inline]
    pub fn pack(&self) -> Boxed {
        Boxed::from_ptr(self.clone())
    }

    /// View the same object as `U`, keeping the capability table
    ///
    /// The coercion is usually `|p| -> Arc<dyn Trait> { p }`. Handy for
    /// [`Duck`](crate::Duck) implementations handing out an interface the
    /// object's class never declared.
    pub fn upcast<U>(&self, upcast: fn(Arc<T>) -> Arc<U>) -> SharedPtr<U>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        match &self.ptr {
            Some(object) => SharedPtr::from_parts(upcast(Arc::clone(object)), self.interfaces.clone()),
            None => SharedPtr::null(),
        }
    }

    /// Capability query, see [`Boxed::cast`]
    pub fn cast<U>(&self) -> SharedPtr<U>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        if self.is_null() {
            return SharedPtr::null();
        }
        self.pack().cast::<U>()
    }

    pub fn is<U>(&self) -> bool
    where
        U: ?Sized + Send + Sync + 'static,
    {
        !self.is_null() && self.pack().is::<U>()
    }

    /// Checked [`SharedPtr::cast`]
    pub fn require<U>(&self) -> Result<SharedPtr<U>, CastError>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.pack().require::<U>()
    }

    /// Attach `value` so this object answers to `U` through it
    pub fn attach<U>(&self, value: &SharedPtr<U>) -> &Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        if let Some(interfaces) = &self.interfaces {
            interfaces.attach(Type::<U>::id(), value.pack());
        }
        self
    }

    /// Take on every capability of `other` this object does not have yet
    pub fn absorb<U>(&self, other: &SharedPtr<U>) -> &Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        match (&self.interfaces, &other.interfaces) {
            (Some(mine), Some(theirs)) => mine.absorb(theirs, other.pack()),
            (Some(mine), None) if !other.is_null() => {
                mine.attach(Type::<U>::id(), other.pack());
            }
            _ => {}
        }
        self
    }

    /// Every id the object currently answers to
    pub fn type_ids(&self) -> Vec<TypeId> {
        match &self.interfaces {
            Some(interfaces) => interfaces.type_ids(),
            None => Vec::new(),
        }
    }

    pub fn downgrade(&self) -> WeakPtr<T> {
        WeakPtr {
            ptr: self.ptr.as_ref().map(Arc::downgrade),
            interfaces: self.interfaces.as_ref().map(Arc::downgrade),
        }
    }
}

impl<T: ?Sized> Deref for SharedPtr<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.ptr {
            Some(object) => &**object,
            None => panic!("dereferenced a null SharedPtr<{}>", core::any::type_name::<T>()),
        }
    }
}

impl<T: ?Sized> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr.clone(),
            interfaces: self.interfaces.clone(),
        }
    }
}

impl<T: ?Sized> Default for SharedPtr<T> {
    fn default() -> Self {
        Self {
            ptr: None,
            interfaces: None,
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> PartialEq for SharedPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Eq for SharedPtr<T> {}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "SharedPtr<{}>(null)", Type::<T>::short_name());
        }
        f.debug_struct("SharedPtr")
            .field("type", &Type::<T>::short_name())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

/// Non-owning handle; [`WeakPtr::lock`] before use
pub struct WeakPtr<T: ?Sized> {
    ptr: Option<Weak<T>>,
    interfaces: Option<Weak<Interfaces>>,
}

impl<T: ?Sized + Send + Sync + 'static> WeakPtr<T> {
    /// Strong handle, or null once the object is gone
    pub fn lock(&self) -> SharedPtr<T> {
        match self.ptr.as_ref().and_then(Weak::upgrade) {
            Some(object) => {
                SharedPtr::from_parts(object, self.interfaces.as_ref().and_then(Weak::upgrade))
            }
            None => SharedPtr::null(),
        }
    }

    pub fn expired(&self) -> bool {
        self.ptr
            .as_ref()
            .map(|weak| weak.strong_count() == 0)
            .unwrap_or(true)
    }
}

impl<T: ?Sized> Clone for WeakPtr<T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr.clone(),
            interfaces: self.interfaces.clone(),
        }
    }
}

impl<T: ?Sized> Default for WeakPtr<T> {
    fn default() -> Self {
        Self {
            ptr: None,
            interfaces: None,
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> From<&SharedPtr<T>> for WeakPtr<T> {
    fn from(ptr: &SharedPtr<T>) -> Self {
        ptr.downgrade()
    }
}

impl<T: ?Sized + Send + Sync + 'static> fmt::Debug for WeakPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WeakPtr<{}>({})",
            Type::<T>::short_name(),
            if self.expired() { "expired" } else { "live" }
        )
    }
}
