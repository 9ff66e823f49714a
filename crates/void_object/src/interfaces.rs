//! Per-instance capability table
//!
//! Every object built through [`SharedPtr`] carries one `Interfaces` in its
//! control block. It answers capability queries in two tiers: the type's
//! declared [`Class`], then the attachments this particular instance picked
//! up at runtime (`absorb`). Attachments are meant to be added right after
//! construction, before the handle is published to other threads.

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::boxed::Boxed;
use crate::class::Class;
use crate::duck::Duck;
use crate::manager::ClassManager;
use crate::shared_ptr::SharedPtr;
use crate::type_id::{Type, TypeId};

/// Runtime attachments of one instance
pub type AttachmentTable = HashMap<TypeId, Boxed>;

/// Rebuilds the strong concrete handle from the control block
type Origin = Box<dyn Fn(&Arc<Interfaces>) -> Boxed + Send + Sync>;

/// Receives the attachment storage of a dying control block
///
/// Implemented by object pools so the next tenant can reuse the table.
/// Implementations must leave the table empty before handing it out again.
pub trait Recycler: Send + Sync {
    fn recycle(&self, table: AttachmentTable);
}

/// Capability side table owned by an object's control block
pub struct Interfaces {
    class: Arc<Class>,
    origin: Origin,
    attachments: RwLock<AttachmentTable>,
    recycler: Option<Weak<dyn Recycler>>,
}

impl Interfaces {
    /// Table for `object`, resolving its class through the global manager
    pub(crate) fn for_object<T>(object: &Arc<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self::with_storage(object, AttachmentTable::new(), None)
    }

    /// Table for `object` reusing recycled attachment storage
    pub(crate) fn with_storage<T>(
        object: &Arc<T>,
        mut table: AttachmentTable,
        recycler: Option<Weak<dyn Recycler>>,
    ) -> Self
    where
        T: Send + Sync + 'static,
    {
        debug_assert!(table.is_empty(), "recycled attachment table was not reset");
        table.clear();

        let weak = Arc::downgrade(object);
        let origin: Origin = Box::new(move |interfaces: &Arc<Interfaces>| match weak.upgrade() {
            Some(object) => SharedPtr::from_parts(object, Some(Arc::clone(interfaces))).pack(),
            None => Boxed::null(),
        });

        let class = ClassManager::global().obtain_named(Type::<T>::id(), &Type::<T>::short_name());
        Self {
            class,
            origin,
            attachments: RwLock::new(table),
            recycler,
        }
    }

    /// The declared class of the object
    ///
    /// An object constructed before its type was registered holds a
    /// placeholder; it is resolved again so late registration is seen.
    pub fn class(&self) -> Arc<Class> {
        if self.class.is_anonymous() {
            ClassManager::global().obtain_named(self.class.id(), self.class.name())
        } else {
            Arc::clone(&self.class)
        }
    }

    /// Strong handle to the concrete object, null if it is gone
    pub fn origin(self: &Arc<Self>) -> Boxed {
        (self.origin)(self)
    }

    /// Resolve `id` through the class first, then the attachments
    ///
    /// An attachment of another type forwards the query to that object's
    /// table. Absorb chains may loop back on themselves; a table already
    /// visited ends the walk with a null box.
    pub fn cast(self: &Arc<Self>, id: TypeId) -> Boxed {
        let mut current = Arc::clone(self);
        let mut visited: Vec<*const Interfaces> = Vec::new();
        loop {
            visited.push(Arc::as_ptr(&current));

            let found = current.class().cast(&current.origin(), id);
            if !found.is_null() {
                return found;
            }

            let attached = current.attachments.read().get(&id).cloned();
            let next = match attached {
                Some(boxed) if boxed.type_id() == id => return boxed,
                Some(boxed) => match boxed.interfaces() {
                    Some(other) => Arc::clone(other),
                    None => return Boxed::null(),
                },
                None => return Boxed::null(),
            };
            if visited.contains(&Arc::as_ptr(&next)) {
                log::trace!("attachment cycle while resolving {:?}", id);
                return Boxed::null();
            }
            current = next;
        }
    }

    /// Full capability query: declared graph, attachments, ducks, adapters
    pub fn query<U>(self: &Arc<Self>) -> SharedPtr<U>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let id = Type::<U>::id();
        let found = self.cast(id);
        if !found.is_null() {
            return found.unpack::<U>();
        }

        let duck = self.cast(Type::<dyn Duck<U>>::id()).unpack::<dyn Duck<U>>();
        if let Some(duck) = duck.get() {
            let ducked = duck.to();
            if !ducked.is_null() {
                return ducked;
            }
        }

        ClassManager::global().adapt(&self.origin(), id).unpack::<U>()
    }

    /// Does this instance satisfy `id` right now
    pub fn is(&self, id: TypeId) -> bool {
        self.class().is_instance(id) || self.attachments.read().contains_key(&id)
    }

    /// Alias of [`Interfaces::is`]
    #[inline]
    pub fn is_instance(&self, id: TypeId) -> bool {
        self.is(id)
    }

    /// Every id this instance currently answers to
    pub fn type_ids(&self) -> Vec<TypeId> {
        let mut ids = self.class().implements();
        for id in self.attachments.read().keys() {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    /// Attach `boxed` under `id`, replacing a previous attachment
    pub fn attach(&self, id: TypeId, boxed: Boxed) {
        if boxed.is_null() {
            return;
        }
        self.attachments.write().insert(id, boxed);
    }

    /// Remove and return the attachment under `id`
    pub fn detach(&self, id: TypeId) -> Option<Boxed> {
        self.attachments.write().remove(&id)
    }

    /// Take on every capability of `other`, keeping the ones already present
    ///
    /// `boxed` is the handle queries for those capabilities will be routed
    /// to. Absorbing the same control block is a no-op.
    pub fn absorb(self: &Arc<Self>, other: &Arc<Interfaces>, boxed: Boxed) {
        if Arc::ptr_eq(self, other) || boxed.is_null() {
            return;
        }
        let ids = other.type_ids();
        let own = self.class();
        let mut attachments = self.attachments.write();
        for id in ids {
            if !own.is_instance(id) {
                attachments.entry(id).or_insert_with(|| boxed.clone());
            }
        }
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.read().len()
    }

    /// Forget every attachment
    ///
    /// Called before storage is handed to a new tenant so no capability of a
    /// previous object survives.
    pub fn reset(&self) {
        self.attachments.write().clear();
    }
}

impl Drop for Interfaces {
    fn drop(&mut self) {
        let Some(recycler) = self.recycler.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let mut table = std::mem::take(self.attachments.get_mut());
        table.clear();
        recycler.recycle(table);
    }
}

impl fmt::Debug for Interfaces {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interfaces")
            .field("class", &self.class.name())
            .field("attachments", &self.attachments.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lamp {
        watts: u32,
    }

    struct Battery {
        charge: u8,
    }

    struct Fuse;

    #[test]
    fn test_self_type_resolves() {
        let lamp = SharedPtr::new(Lamp { watts: 40 });
        let interfaces = lamp.interfaces().unwrap();

        assert!(interfaces.is(Type::<Lamp>::id()));
        let found = interfaces.cast(Type::<Lamp>::id()).unpack::<Lamp>();
        assert_eq!(found.watts, 40);
        assert!(found.ptr_eq(&lamp));
    }

    #[test]
    fn test_absorb_and_reset() {
        let lamp = SharedPtr::new(Lamp { watts: 60 });
        let battery = SharedPtr::new(Battery { charge: 80 });
        let interfaces = lamp.interfaces().unwrap();

        interfaces.absorb(battery.interfaces().unwrap(), battery.pack());
        assert!(interfaces.is_instance(Type::<Battery>::id()));
        assert_eq!(interfaces.attachment_count(), 1);
        let charge = interfaces.cast(Type::<Battery>::id()).unpack::<Battery>();
        assert_eq!(charge.charge, 80);

        interfaces.reset();
        assert!(!interfaces.is_instance(Type::<Battery>::id()));
        assert!(interfaces.cast(Type::<Battery>::id()).is_null());
        assert!(interfaces.is_instance(Type::<Lamp>::id()));
    }

    #[test]
    fn test_attachment_cycle_yields_null() {
        let lamp = SharedPtr::new(Lamp { watts: 25 });
        let battery = SharedPtr::new(Battery { charge: 50 });
        battery.absorb(&SharedPtr::new(Fuse));
        lamp.absorb(&battery);

        // Lamp now routes Fuse through the battery, which routes it back
        battery.interfaces().unwrap().reset();
        battery.absorb(&lamp);

        assert!(lamp.cast::<Fuse>().is_null());
        assert!(battery.cast::<Fuse>().is_null());
        assert!(lamp.require::<Fuse>().is_err());
        assert_eq!(lamp.cast::<Battery>().charge, 50);
        assert_eq!(battery.cast::<Lamp>().watts, 25);
    }

    #[test]
    fn test_unregistered_class_named_after_type() {
        let lamp = SharedPtr::new(Lamp { watts: 2 });
        let class = lamp.interfaces().unwrap().class();
        assert!(class.is_anonymous());
        assert_eq!(class.name(), "Lamp");
    }

    #[test]
    fn test_absorb_self_is_noop() {
        let lamp = SharedPtr::new(Lamp { watts: 1 });
        let interfaces = lamp.interfaces().unwrap();
        interfaces.absorb(interfaces, lamp.pack());
        assert_eq!(interfaces.attachment_count(), 0);
    }

    #[test]
    fn test_attach_and_detach() {
        let lamp = SharedPtr::new(Lamp { watts: 5 });
        let interfaces = lamp.interfaces().unwrap();
        let label = SharedPtr::new(String::from("desk"));

        interfaces.attach(Type::<String>::id(), label.pack());
        assert_eq!(interfaces.query::<String>().as_str(), "desk");
        assert!(interfaces.type_ids().contains(&Type::<String>::id()));

        assert!(interfaces.detach(Type::<String>::id()).is_some());
        assert!(interfaces.query::<String>().is_null());
    }

    #[test]
    fn test_origin_dies_with_object() {
        let lamp = SharedPtr::new(Lamp { watts: 9 });
        let interfaces = Arc::clone(lamp.interfaces().unwrap());
        assert!(!interfaces.origin().is_null());
        drop(lamp);
        assert!(interfaces.origin().is_null());
        assert!(interfaces.cast(Type::<Lamp>::id()).is_null());
    }
}
