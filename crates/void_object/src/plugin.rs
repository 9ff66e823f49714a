//! Plugin registry - how types enter the capability graph
//!
//! Every subsystem (renderer, physics, audio, scripting) ships as a plugin.
//! Loading a plugin registers its classes and adapters with a
//! [`ClassManager`]; registration happens once per process, before the
//! object graph is used from several threads.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PluginError, Result};
use crate::manager::ClassManager;

/// Unique identifier for a plugin
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PluginId(String);

impl PluginId {
    /// Create a new plugin ID
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Get the plugin name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The current state of a plugin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginStatus {
    /// Plugin is registered but not loaded
    Registered,
    /// Plugin is loaded and its classes are installed
    Active,
    /// Plugin failed to load
    Failed,
}

/// A unit of functionality contributing types to the object model
pub trait Plugin: Send + Sync {
    /// Unique identifier for this plugin
    fn id(&self) -> PluginId;

    /// Plugins that must be loaded first
    fn dependencies(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Install the classes and adapters this plugin provides
    fn register_classes(&self, manager: &ClassManager) {
        let _ = manager;
    }

    /// Called after the classes are registered
    fn on_load(&mut self, manager: &ClassManager) -> Result<()> {
        let _ = manager;
        Ok(())
    }
}

/// Metadata about a registered plugin
#[derive(Clone, Debug)]
pub struct PluginInfo {
    pub id: PluginId,
    pub dependencies: Vec<PluginId>,
    pub status: PluginStatus,
}

/// Central registry for all plugins
pub struct PluginRegistry {
    plugins: BTreeMap<PluginId, Box<dyn Plugin>>,
    info: BTreeMap<PluginId, PluginInfo>,
    load_order: Vec<PluginId>,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
            info: BTreeMap::new(),
            load_order: Vec::new(),
        }
    }

    /// Register a plugin without loading it
    pub fn register<P: Plugin + 'static>(&mut self, plugin: P) -> Result<()> {
        let id = plugin.id();
        if self.plugins.contains_key(&id) {
            return Err(PluginError::AlreadyRegistered(id.name().into()).into());
        }

        let info = PluginInfo {
            id: id.clone(),
            dependencies: plugin.dependencies(),
            status: PluginStatus::Registered,
        };

        self.plugins.insert(id.clone(), Box::new(plugin));
        self.info.insert(id, info);
        Ok(())
    }

    /// Load a registered plugin into `manager`
    ///
    /// Every dependency must already be active. Loading an active plugin
    /// again is a no-op.
    pub fn load(&mut self, id: &PluginId, manager: &ClassManager) -> Result<()> {
        let info = self
            .info
            .get(id)
            .ok_or_else(|| PluginError::NotFound(id.name().into()))?;
        if info.status == PluginStatus::Active {
            return Ok(());
        }

        for dep in &info.dependencies {
            if !self.is_loaded(dep) {
                return Err(PluginError::MissingDependency {
                    plugin: id.name().into(),
                    dependency: dep.name().into(),
                }
                .into());
            }
        }

        let plugin = self
            .plugins
            .get_mut(id)
            .ok_or_else(|| PluginError::NotFound(id.name().into()))?;

        plugin.register_classes(manager);
        let result = plugin.on_load(manager);

        let status = if result.is_ok() {
            PluginStatus::Active
        } else {
            PluginStatus::Failed
        };
        if let Some(info) = self.info.get_mut(id) {
            info.status = status;
        }

        match result {
            Ok(()) => {
                log::info!("Loaded plugin '{}'", id);
                self.load_order.push(id.clone());
                Ok(())
            }
            Err(e) => {
                log::error!("Plugin '{}' failed to load: {}", id, e);
                Err(e)
            }
        }
    }

    /// Load every registered plugin, dependencies first
    ///
    /// Plugins whose dependencies are missing or cyclic are reported
    /// together; nothing is rolled back for the ones already loaded.
    pub fn load_all(&mut self, manager: &ClassManager) -> Result<()> {
        loop {
            let ready: Vec<PluginId> = self
                .info
                .values()
                .filter(|info| info.status == PluginStatus::Registered)
                .filter(|info| info.dependencies.iter().all(|dep| self.is_loaded(dep)))
                .map(|info| info.id.clone())
                .collect();

            if ready.is_empty() {
                break;
            }
            for id in ready {
                self.load(&id, manager)?;
            }
        }

        let stuck: Vec<String> = self
            .info
            .values()
            .filter(|info| info.status == PluginStatus::Registered)
            .map(|info| info.id.name().to_string())
            .collect();

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(PluginError::Unresolvable(stuck).into())
        }
    }

    /// Is the plugin loaded and active
    pub fn is_loaded(&self, id: &PluginId) -> bool {
        self.info
            .get(id)
            .map(|info| info.status == PluginStatus::Active)
            .unwrap_or(false)
    }

    /// Get a plugin by ID
    pub fn get(&self, id: &PluginId) -> Option<&dyn Plugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    /// Get plugin info
    pub fn info(&self, id: &PluginId) -> Option<&PluginInfo> {
        self.info.get(id)
    }

    /// Active plugins in load order
    pub fn load_order(&self) -> &[PluginId] {
        &self.load_order
    }

    /// Get the number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Get the number of active plugins
    pub fn active_count(&self) -> usize {
        self.load_order.len()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::{ClassBuilder, Type};
    use std::sync::Arc;

    trait Body: Send + Sync {}
    struct RigidBody;
    impl Body for RigidBody {}

    struct PhysicsPlugin {
        loaded: bool,
    }

    impl Plugin for PhysicsPlugin {
        fn id(&self) -> PluginId {
            PluginId::new("physics")
        }

        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::new("core")]
        }

        fn register_classes(&self, manager: &ClassManager) {
            manager.add_class(
                ClassBuilder::<RigidBody>::new()
                    .implements::<dyn Body>(|p: Arc<RigidBody>| -> Arc<dyn Body> { p })
                    .build(),
            );
        }

        fn on_load(&mut self, _manager: &ClassManager) -> Result<()> {
            self.loaded = true;
            Ok(())
        }
    }

    struct CorePlugin;

    impl Plugin for CorePlugin {
        fn id(&self) -> PluginId {
            PluginId::new("core")
        }
    }

    struct Broken(&'static str, &'static str);

    impl Plugin for Broken {
        fn id(&self) -> PluginId {
            PluginId::new(self.0)
        }

        fn dependencies(&self) -> Vec<PluginId> {
            vec![PluginId::new(self.1)]
        }
    }

    #[test]
    fn test_plugin_registration() {
        let mut registry = PluginRegistry::new();
        registry.register(CorePlugin).unwrap();
        assert!(registry.info(&PluginId::new("core")).is_some());
        assert!(matches!(
            registry.register(CorePlugin),
            Err(Error::Plugin(PluginError::AlreadyRegistered(_)))
        ));
    }

    #[test]
    fn test_load_requires_dependencies() {
        let manager = ClassManager::new();
        let mut registry = PluginRegistry::new();
        registry.register(PhysicsPlugin { loaded: false }).unwrap();
        registry.register(CorePlugin).unwrap();

        let physics = PluginId::new("physics");
        assert!(matches!(
            registry.load(&physics, &manager),
            Err(Error::Plugin(PluginError::MissingDependency { .. }))
        ));

        registry.load(&PluginId::new("core"), &manager).unwrap();
        registry.load(&physics, &manager).unwrap();
        assert!(registry.is_loaded(&physics));
        assert!(manager.contains(Type::<RigidBody>::id()));
    }

    #[test]
    fn test_load_all_orders_dependencies() {
        let manager = ClassManager::new();
        let mut registry = PluginRegistry::new();
        registry.register(PhysicsPlugin { loaded: false }).unwrap();
        registry.register(CorePlugin).unwrap();

        registry.load_all(&manager).unwrap();
        assert_eq!(registry.active_count(), 2);
        assert_eq!(
            registry.load_order(),
            &[PluginId::new("core"), PluginId::new("physics")]
        );
    }

    #[test]
    fn test_load_all_reports_cycles() {
        let manager = ClassManager::new();
        let mut registry = PluginRegistry::new();
        registry.register(CorePlugin).unwrap();
        registry.register(Broken("a", "b")).unwrap();
        registry.register(Broken("b", "a")).unwrap();

        match registry.load_all(&manager) {
            Err(Error::Plugin(PluginError::Unresolvable(stuck))) => {
                assert_eq!(stuck, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(registry.is_loaded(&PluginId::new("core")));
    }
}
