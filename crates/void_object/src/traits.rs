//! Per-entity component table
//!
//! [`Traits`] maps a [`TypeId`] to one [`Boxed`] value. Entities, activities
//! and resources keep their loosely coupled parts here and look them up by
//! capability rather than by concrete type.

use std::collections::HashMap;

use crate::boxed::Boxed;
use crate::shared_ptr::SharedPtr;
use crate::type_id::{Type, TypeId};

/// `TypeId -> Boxed` table with optional multi-value slots
#[derive(Clone, Default, Debug)]
pub struct Traits {
    table: HashMap<TypeId, Boxed>,
    /// Every value passed to `add`, keyed by the vector id of its slot
    lists: HashMap<TypeId, Vec<Boxed>>,
}

impl Traits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` as the `T` of this table, replacing the previous one
    pub fn put<T>(&mut self, value: SharedPtr<T>) -> Boxed
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.put_boxed(Type::<T>::id(), value.pack())
    }

    pub fn put_boxed(&mut self, id: TypeId, value: Boxed) -> Boxed {
        self.table.insert(id, value.clone());
        value
    }

    /// Like [`Traits::put`], but also remembers every value ever added
    ///
    /// The latest value stays available through `get`; all of them, in
    /// insertion order, through `get_all`.
    pub fn add<T>(&mut self, value: SharedPtr<T>) -> Boxed
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_boxed(Type::<T>::id(), value.pack())
    }

    pub fn add_boxed(&mut self, id: TypeId, value: Boxed) -> Boxed {
        let list = self.lists.entry(id.to_vector()).or_default();
        if list.is_empty() {
            if let Some(previous) = self.table.get(&id) {
                list.push(previous.clone());
            }
        }
        list.push(value.clone());
        self.put_boxed(id, value)
    }

    /// The `T` of this table, cast through the stored value's capabilities
    pub fn get<T>(&self) -> SharedPtr<T>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.table.get(&Type::<T>::id()) {
            Some(boxed) => boxed.cast::<T>(),
            None => SharedPtr::null(),
        }
    }

    pub fn get_boxed(&self, id: TypeId) -> Option<&Boxed> {
        self.table.get(&id)
    }

    /// Every `T` passed to [`Traits::add`], or the single `put` one
    pub fn get_all<T>(&self) -> Vec<SharedPtr<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = Type::<T>::id();
        match self.lists.get(&id.to_vector()) {
            Some(list) => list.iter().map(Boxed::cast::<T>).collect(),
            None => self.table.get(&id).map(Boxed::cast::<T>).into_iter().collect(),
        }
    }

    pub fn has<T>(&self) -> bool
    where
        T: ?Sized + 'static,
    {
        self.has_id(Type::<T>::id())
    }

    /// Is there a value, or a list of values, under `id`
    pub fn has_id(&self, id: TypeId) -> bool {
        self.table.contains_key(&id) || self.lists.contains_key(&id)
    }

    pub fn put_enum<E>(&mut self, value: E) -> Boxed
    where
        E: Into<i32> + 'static,
    {
        self.put_boxed(Type::<E>::id(), Boxed::from_enum(value))
    }

    /// The stored `E`, or `default` when absent or out of range
    pub fn get_enum<E>(&self, default: E) -> E
    where
        E: TryFrom<i32> + 'static,
    {
        self.table
            .get(&Type::<E>::id())
            .and_then(Boxed::to_enum::<E>)
            .unwrap_or(default)
    }

    /// The `T` of this table, creating a default one if missing
    pub fn ensure<T>(&mut self) -> SharedPtr<T>
    where
        T: Default + Send + Sync + 'static,
    {
        let existing = self.get::<T>();
        if !existing.is_null() {
            return existing;
        }
        let created = SharedPtr::new(T::default());
        self.put(created.clone());
        created
    }

    pub fn remove(&mut self, id: TypeId) -> Option<Boxed> {
        self.lists.remove(&id.to_vector());
        self.table.remove(&id)
    }

    /// Number of single-value slots
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Boxed)> {
        self.table.iter().map(|(id, boxed)| (*id, boxed))
    }
}

/// Collect values into a table, each under its own stored type
impl FromIterator<Boxed> for Traits {
    fn from_iter<I: IntoIterator<Item = Boxed>>(iter: I) -> Self {
        let mut traits = Traits::new();
        for boxed in iter.into_iter().filter(|boxed| !boxed.is_null()) {
            traits.put_boxed(boxed.type_id(), boxed);
        }
        traits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Health(u32);

    struct Tag(&'static str);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Layer {
        World,
        Ui,
    }

    impl From<Layer> for i32 {
        fn from(layer: Layer) -> i32 {
            layer as i32
        }
    }

    impl TryFrom<i32> for Layer {
        type Error = i32;

        fn try_from(value: i32) -> Result<Self, i32> {
            match value {
                0 => Ok(Layer::World),
                1 => Ok(Layer::Ui),
                other => Err(other),
            }
        }
    }

    #[test]
    fn test_put_and_get() {
        let mut traits = Traits::new();
        assert!(traits.get::<Health>().is_null());

        traits.put(SharedPtr::new(Health(10)));
        assert!(traits.has::<Health>());
        assert_eq!(traits.get::<Health>().0, 10);

        traits.put(SharedPtr::new(Health(20)));
        assert_eq!(traits.get::<Health>().0, 20);
        assert_eq!(traits.len(), 1);
        assert_eq!(traits.get_all::<Health>().len(), 1);
    }

    #[test]
    fn test_add_keeps_every_value() {
        let mut traits = Traits::new();
        traits.add(SharedPtr::new(Tag("a")));
        traits.add(SharedPtr::new(Tag("b")));
        traits.add(SharedPtr::new(Tag("c")));

        assert_eq!(traits.get::<Tag>().0, "c");
        let all: Vec<_> = traits.get_all::<Tag>().iter().map(|t| t.0).collect();
        assert_eq!(all, vec!["a", "b", "c"]);
        assert!(traits.has_id(Type::<Vec<Tag>>::id()));
        assert_eq!(traits.len(), 1);

        traits.remove(Type::<Tag>::id());
        assert!(!traits.has::<Tag>());
        assert!(traits.get_all::<Tag>().is_empty());
    }

    #[test]
    fn test_enum_slot() {
        let mut traits = Traits::new();
        assert_eq!(traits.get_enum(Layer::World), Layer::World);
        traits.put_enum(Layer::Ui);
        assert_eq!(traits.get_enum(Layer::World), Layer::Ui);
    }

    #[test]
    fn test_ensure_creates_once() {
        let mut traits = Traits::new();
        let first = traits.ensure::<Health>();
        let second = traits.ensure::<Health>();
        assert!(first.ptr_eq(&second));
        assert_eq!(second.0, 0);
    }

    #[test]
    fn test_collect() {
        let traits: Traits = vec![
            SharedPtr::new(Health(1)).pack(),
            SharedPtr::new(Tag("x")).pack(),
            Boxed::null(),
        ]
        .into_iter()
        .collect();
        assert_eq!(traits.len(), 2);
        assert_eq!(traits.get::<Tag>().0, "x");
        assert_eq!(traits.iter().count(), 2);
    }
}
