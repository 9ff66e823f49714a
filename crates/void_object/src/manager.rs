//! Process-wide class registry
//!
//! The only global mutable state of the object model. Registration is meant to
//! finish while the process is still single-threaded (plugin load); after that
//! the registry is almost exclusively read. Lookups take the shared
//! `parking_lot` lock and escalate to the exclusive one only when an unknown
//! id has to be given a placeholder. The read side is not lock-free; an
//! uncontended shared acquire is a single atomic operation, and writers only
//! show up during plugin load.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::boxed::Boxed;
use crate::class::Class;
use crate::implements::Implements;
use crate::shared_ptr::SharedPtr;
use crate::type_id::{Type, TypeId};

/// Fallback conversion from a source type to a capability
pub type Adapter = Arc<dyn Fn(&Boxed) -> Boxed + Send + Sync>;

/// Registry behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Warn when a registered class is replaced by one with another name
    /// (two types hashing to the same id look exactly like this)
    pub warn_on_replace: bool,

    /// Log the ids a new class can reach through more than one interface
    pub report_ambiguity: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            warn_on_replace: true,
            report_ambiguity: cfg!(debug_assertions),
        }
    }
}

impl ManagerConfig {
    /// Report everything, also in release builds
    pub fn strict() -> Self {
        Self {
            warn_on_replace: true,
            report_ambiguity: true,
        }
    }

    /// Report nothing
    pub fn quiet() -> Self {
        Self {
            warn_on_replace: false,
            report_ambiguity: false,
        }
    }
}

static GLOBAL: OnceLock<ClassManager> = OnceLock::new();

/// Registry mapping [`TypeId`] to [`Class`]
pub struct ClassManager {
    classes: RwLock<HashMap<TypeId, Arc<Class>>>,
    adapters: RwLock<HashMap<(TypeId, TypeId), Vec<Adapter>>>,
    config: ManagerConfig,
}

impl ClassManager {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            adapters: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The registry every handle resolves against
    pub fn global() -> &'static ClassManager {
        GLOBAL.get_or_init(ClassManager::new)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Insert or replace a class; the last registration wins
    pub fn add_class(&self, class: Class) -> Arc<Class> {
        let class = Arc::new(class);
        let previous = self.classes.write().insert(class.id(), Arc::clone(&class));

        match previous {
            Some(old) if self.config.warn_on_replace
                && !old.is_anonymous()
                && old.name() != class.name() =>
            {
                log::warn!(
                    "Class '{}' replaced by '{}' under the same id {:?}",
                    old.name(),
                    class.name(),
                    class.id()
                );
            }
            Some(_) => log::debug!("Re-registered class '{}'", class.name()),
            None => log::debug!("Registered class '{}' ({:?})", class.name(), class.id()),
        }

        if self.config.report_ambiguity {
            let ambiguous = class.ambiguities_in(self);
            if !ambiguous.is_empty() {
                log::warn!(
                    "Class '{}' reaches {:?} through several interfaces; the first declared wins",
                    class.name(),
                    ambiguous
                );
            }
        }
        class
    }

    /// Build and register the class of `T`, replacing any previous one
    pub fn install<T: Implements + ?Sized>(&self) -> Arc<Class> {
        self.add_class(T::build_class())
    }

    /// Register the class of `T` unless a real one is already present
    pub fn ensure<T: Implements + ?Sized>(&self) -> Arc<Class> {
        match self.get(Type::<T>::id()) {
            Some(class) if !class.is_anonymous() => class,
            _ => self.install::<T>(),
        }
    }

    /// Look up a class, creating an anonymous placeholder for unknown ids
    ///
    /// The placeholder is named after the id; prefer
    /// [`ClassManager::obtain_named`] when the type name is at hand.
    pub fn obtain(&self, id: TypeId) -> Arc<Class> {
        self.obtain_with(id, || id.to_string())
    }

    /// Like [`ClassManager::obtain`], naming a new placeholder `name`
    pub fn obtain_named(&self, id: TypeId, name: &str) -> Arc<Class> {
        self.obtain_with(id, || name.to_string())
    }

    fn obtain_with(&self, id: TypeId, name: impl FnOnce() -> String) -> Arc<Class> {
        if let Some(class) = self.classes.read().get(&id) {
            return Arc::clone(class);
        }
        // Another thread may have inserted between the two locks
        let mut classes = self.classes.write();
        Arc::clone(
            classes
                .entry(id)
                .or_insert_with(|| Arc::new(Class::anonymous(id, name()))),
        )
    }

    /// Look up a class without creating a placeholder
    pub fn get(&self, id: TypeId) -> Option<Arc<Class>> {
        self.classes.read().get(&id).cloned()
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.classes.read().contains_key(&id)
    }

    /// Number of classes, placeholders included
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// Drop every class and adapter
    ///
    /// Rebuild hook for tests and tools. Live objects keep the classes they
    /// already hold.
    pub fn reset(&self) {
        self.classes.write().clear();
        self.adapters.write().clear();
    }

    /// Register an erased fallback from `source` boxes to `target`
    pub fn add_adapter_raw(&self, source: TypeId, target: TypeId, adapter: Adapter) {
        self.adapters
            .write()
            .entry((source, target))
            .or_default()
            .push(adapter);
    }

    /// Register a fallback that turns an `S` into a `U`
    ///
    /// Adapters run after declared interfaces, attachments and ducks have
    /// all failed, in registration order.
    pub fn add_adapter<S, U>(&self, adapter: fn(&SharedPtr<S>) -> SharedPtr<U>)
    where
        S: ?Sized + Send + Sync + 'static,
        U: ?Sized + Send + Sync + 'static,
    {
        self.add_adapter_raw(
            Type::<S>::id(),
            Type::<U>::id(),
            Arc::new(move |boxed: &Boxed| adapter(&boxed.unpack::<S>()).pack()),
        );
    }

    /// Run the adapters registered for (`boxed`'s type, `target`)
    pub fn adapt(&self, boxed: &Boxed, target: TypeId) -> Boxed {
        if boxed.is_null() {
            return Boxed::null();
        }
        // Clone the list out so adapters may call back into the registry
        let adapters = match self.adapters.read().get(&(boxed.type_id(), target)) {
            Some(list) => list.clone(),
            None => return Boxed::null(),
        };
        adapters
            .iter()
            .map(|adapter| adapter(boxed))
            .find(|result| !result.is_null())
            .unwrap_or_default()
    }
}

impl Default for ClassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ClassManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClassManager")
            .field("classes", &self.classes.read().len())
            .field("adapters", &self.adapters.read().len())
            .field("config", &self.config)
            .finish()
    }
}
