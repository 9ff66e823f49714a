//! Per-type descriptors and the cast engine
//!
//! A [`Class`] knows which interfaces its type declared and how to turn a
//! [`Boxed`] holding the type into a [`Boxed`] holding any of them. Interfaces
//! may themselves have a `Class` (an interface composed of further
//! interfaces), so resolution is a depth-first walk over the declared graph.

use core::fmt;
use std::sync::Arc;

use crate::boxed::Boxed;
use crate::manager::ClassManager;
use crate::shared_ptr::SharedPtr;
use crate::type_id::{Type, TypeId};

type Caster = Box<dyn Fn(&Boxed, TypeId) -> Boxed + Send + Sync>;

/// Immutable descriptor of a type's capability set
pub struct Class {
    id: TypeId,
    name: String,
    /// Declared interfaces, in declaration order
    interfaces: Vec<TypeId>,
    caster: Option<Caster>,
    anonymous: bool,
}

impl Class {
    /// Placeholder for a type nobody registered: answers only to itself
    pub fn anonymous(id: TypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            interfaces: Vec::new(),
            caster: None,
            anonymous: true,
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared interfaces, in declaration order
    #[inline]
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    /// Whether this is a placeholder created for an unregistered id
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Does this type satisfy `id`, directly or through a composed interface
    pub fn is_instance(&self, id: TypeId) -> bool {
        self.is_instance_in(ClassManager::global(), id)
    }

    pub(crate) fn is_instance_in(&self, manager: &ClassManager, id: TypeId) -> bool {
        if id == self.id || self.interfaces.contains(&id) {
            return true;
        }
        self.interfaces
            .iter()
            .filter_map(|iface| manager.get(*iface))
            .any(|class| class.is_instance_in(manager, id))
    }

    /// Every id this type satisfies, itself first, without duplicates
    pub fn implements(&self) -> Vec<TypeId> {
        let mut out = Vec::new();
        self.collect_implements(ClassManager::global(), &mut out);
        out
    }

    fn collect_implements(&self, manager: &ClassManager, out: &mut Vec<TypeId>) {
        if !out.contains(&self.id) {
            out.push(self.id);
        }
        for iface in &self.interfaces {
            match manager.get(*iface) {
                Some(class) => class.collect_implements(manager, out),
                None if !out.contains(iface) => out.push(*iface),
                None => {}
            }
        }
    }

    /// Ids reachable through more than one declared interface
    ///
    /// Casting to one of these resolves through the first interface in
    /// declaration order.
    pub fn ambiguities(&self) -> Vec<TypeId> {
        self.ambiguities_in(ClassManager::global())
    }

    pub(crate) fn ambiguities_in(&self, manager: &ClassManager) -> Vec<TypeId> {
        let mut seen: Vec<TypeId> = Vec::new();
        let mut repeated = Vec::new();
        for iface in &self.interfaces {
            let mut reachable = Vec::new();
            match manager.get(*iface) {
                Some(class) => class.collect_implements(manager, &mut reachable),
                None => reachable.push(*iface),
            }
            for id in reachable {
                if seen.contains(&id) {
                    if !repeated.contains(&id) {
                        repeated.push(id);
                    }
                } else {
                    seen.push(id);
                }
            }
        }
        repeated
    }

    /// Convert `boxed`, which must hold exactly this class's type, to `id`
    ///
    /// Returns a null [`Boxed`] if the box is null, holds another type, or the
    /// type does not satisfy `id`.
    pub fn cast(&self, boxed: &Boxed, id: TypeId) -> Boxed {
        if boxed.is_null() {
            return Boxed::null();
        }
        if boxed.type_id() != self.id {
            log::trace!(
                "class '{}' asked to cast a box of {:?}",
                self.name,
                boxed.type_id()
            );
            return Boxed::null();
        }
        if id == self.id {
            return boxed.clone();
        }
        match &self.caster {
            Some(caster) => caster(boxed, id),
            None => Boxed::null(),
        }
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

struct Declared<T: ?Sized> {
    id: TypeId,
    upcast: Box<dyn Fn(&SharedPtr<T>) -> Boxed + Send + Sync>,
}

/// Builds the [`Class`] of `T` one interface at a time
///
/// Usually driven by [`implements!`](crate::implements); the upcast functions
/// are plain pointer coercions such as `|p: Arc<Node>| -> Arc<dyn Shape> { p }`.
pub struct ClassBuilder<T: ?Sized> {
    name: String,
    declared: Vec<Declared<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            name: Type::<T>::short_name(),
            declared: Vec::new(),
        }
    }

    /// Override the class name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Declare that `T` can be viewed as `U`
    pub fn implements<U>(mut self, upcast: fn(Arc<T>) -> Arc<U>) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
    {
        let id = Type::<U>::id();
        if self.declared.iter().any(|d| d.id == id) {
            return self;
        }
        self.declared.push(Declared {
            id,
            upcast: Box::new(move |ptr: &SharedPtr<T>| match ptr.as_arc() {
                Some(object) => {
                    SharedPtr::from_parts(upcast(Arc::clone(object)), ptr.interfaces().cloned())
                        .pack()
                }
                None => Boxed::null(),
            }),
        });
        self
    }

    pub fn build(self) -> Class {
        let interfaces = self.declared.iter().map(|d| d.id).collect();
        let declared = self.declared;
        let caster: Caster = Box::new(move |boxed: &Boxed, id: TypeId| {
            let ptr = boxed.unpack::<T>();
            if ptr.is_null() {
                return Boxed::null();
            }
            if let Some(direct) = declared.iter().find(|d| d.id == id) {
                return (direct.upcast)(&ptr);
            }
            let manager = ClassManager::global();
            for declared in &declared {
                let Some(class) = manager.get(declared.id) else {
                    continue;
                };
                if class.is_instance_in(manager, id) {
                    let found = class.cast(&(declared.upcast)(&ptr), id);
                    if !found.is_null() {
                        return found;
                    }
                }
            }
            Boxed::null()
        });

        Class {
            id: Type::<T>::id(),
            name: self.name,
            interfaces,
            caster: Some(caster),
            anonymous: false,
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greet: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    trait Count: Send + Sync {
        fn count(&self) -> usize;
    }

    struct Robot;

    impl Greet for Robot {
        fn greet(&self) -> &'static str {
            "beep"
        }
    }

    impl Count for Robot {
        fn count(&self) -> usize {
            3
        }
    }

    fn robot_class() -> Class {
        ClassBuilder::<Robot>::new()
            .implements::<dyn Greet>(|p: Arc<Robot>| -> Arc<dyn Greet> { p })
            .implements::<dyn Count>(|p: Arc<Robot>| -> Arc<dyn Count> { p })
            .build()
    }

    #[test]
    fn test_builder_declares_interfaces() {
        let class = robot_class();
        assert_eq!(class.name(), "Robot");
        assert_eq!(class.interfaces(), &[Type::<dyn Greet>::id(), Type::<dyn Count>::id()]);
        assert!(class.is_instance(Type::<Robot>::id()));
        assert!(class.is_instance(Type::<dyn Greet>::id()));
        assert!(!class.is_instance(Type::<String>::id()));
        assert!(!class.is_anonymous());
    }

    #[test]
    fn test_direct_cast() {
        let class = robot_class();
        let robot = SharedPtr::new(Robot);

        let greet = class.cast(&robot.pack(), Type::<dyn Greet>::id()).unpack::<dyn Greet>();
        assert_eq!(greet.greet(), "beep");

        let count = class.cast(&robot.pack(), Type::<dyn Count>::id()).unpack::<dyn Count>();
        assert_eq!(count.count(), 3);
        assert_eq!(count.addr(), robot.addr());
    }

    #[test]
    fn test_cast_fails_closed() {
        let class = robot_class();
        assert!(class.cast(&Boxed::null(), Type::<dyn Greet>::id()).is_null());
        assert!(class
            .cast(&SharedPtr::new(Robot).pack(), Type::<String>::id())
            .is_null());
        // Wrong source type
        assert!(class
            .cast(&SharedPtr::new(7u32).pack(), Type::<dyn Greet>::id())
            .is_null());
    }

    #[test]
    fn test_anonymous_class() {
        let class = Class::anonymous(Type::<u8>::id(), "u8");
        assert!(class.is_anonymous());
        assert_eq!(class.name(), "u8");
        assert!(class.is_instance(Type::<u8>::id()));
        assert!(class.implements() == vec![Type::<u8>::id()]);

        let boxed = SharedPtr::new(5u8).pack();
        assert!(!class.cast(&boxed, Type::<u8>::id()).is_null());
        assert!(class.cast(&boxed, Type::<u16>::id()).is_null());
    }

    #[test]
    fn test_duplicate_declaration_ignored() {
        let class = ClassBuilder::<Robot>::new()
            .implements::<dyn Greet>(|p: Arc<Robot>| -> Arc<dyn Greet> { p })
            .implements::<dyn Greet>(|p: Arc<Robot>| -> Arc<dyn Greet> { p })
            .build();
        assert_eq!(class.interfaces().len(), 1);
        assert!(class.ambiguities().is_empty());
    }
}
