//! Node type registry
//!
//! Maps `(plugin, type name)` to a factory that builds a node, optionally
//! from a saved [`NodeRecord`]. Registrations may change at any time and from
//! any thread (plugins load and unload); every change is broadcast to
//! subscribed scripts, which reload on their own thread when they drain
//! their receiver.

use crate::eval::ScriptContext;
use crate::node::{Node, NodeBuilder};
use crate::record::NodeRecord;
use crossbeam_channel::{Receiver, Sender};
use lumen_core::{PluginId, SubscriberId};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Identity of a node type
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeTypeKey {
    pub plugin: PluginId,
    pub type_name: String,
}

impl NodeTypeKey {
    pub fn new(plugin: PluginId, type_name: &str) -> Self {
        Self {
            plugin,
            type_name: type_name.to_string(),
        }
    }

    /// A type owned by the runtime itself
    pub fn core(type_name: &str) -> Self {
        Self::new(PluginId::core(), type_name)
    }
}

impl fmt::Display for NodeTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin, self.type_name)
    }
}

/// Node category for organization
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NodeCategory {
    /// Constant values
    #[default]
    Static,
    /// Arithmetic and curves
    Math,
    /// Boolean logic and comparison
    Logic,
    /// String operations
    Text,
    /// Color operations
    Color,
    /// Type conversions
    Conversion,
    /// Custom category
    Custom(String),
}

/// Descriptive data for a registered node type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeTypeInfo {
    pub key: NodeTypeKey,
    pub name: String,
    pub description: String,
    pub category: NodeCategory,
}

impl NodeTypeInfo {
    pub fn new(key: NodeTypeKey, name: &str) -> Self {
        Self {
            key,
            name: name.to_string(),
            description: String::new(),
            category: NodeCategory::default(),
        }
    }

    /// Set description
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set category
    pub fn category(mut self, category: NodeCategory) -> Self {
        self.category = category;
        self
    }
}

/// Creates nodes of one type
pub trait NodeFactory: Send + Sync {
    /// Build a node, declaring its pins on `builder`.
    ///
    /// `record` is the saved node when restoring, `None` when authoring.
    fn create(
        &self,
        context: &ScriptContext,
        record: Option<&NodeRecord>,
        builder: &mut NodeBuilder,
    ) -> Box<dyn Node>;
}

/// Factory wrapping a closure
pub struct FnNodeFactory<F>(pub F);

impl<F> NodeFactory for FnNodeFactory<F>
where
    F: Fn(&ScriptContext, Option<&NodeRecord>, &mut NodeBuilder) -> Box<dyn Node> + Send + Sync,
{
    fn create(
        &self,
        context: &ScriptContext,
        record: Option<&NodeRecord>,
        builder: &mut NodeBuilder,
    ) -> Box<dyn Node> {
        (self.0)(context, record, builder)
    }
}

/// A registered node type
pub struct NodeTypeRegistration {
    pub info: NodeTypeInfo,
    pub factory: Arc<dyn NodeFactory>,
}

impl fmt::Debug for NodeTypeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeRegistration").field("info", &self.info).finish()
    }
}

/// Registry change broadcast to subscribers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTypeEvent {
    Added(NodeTypeKey),
    Removed(NodeTypeKey),
}

impl NodeTypeEvent {
    pub fn key(&self) -> &NodeTypeKey {
        match self {
            NodeTypeEvent::Added(key) | NodeTypeEvent::Removed(key) => key,
        }
    }
}

/// Receiving end of a registry subscription
pub struct NodeTypeSubscription {
    id: SubscriberId,
    receiver: Receiver<NodeTypeEvent>,
}

impl NodeTypeSubscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Take every pending event without blocking
    pub fn drain(&self) -> Vec<NodeTypeEvent> {
        self.receiver.try_iter().collect()
    }
}

struct RegistryInner {
    types: RwLock<BTreeMap<NodeTypeKey, Arc<NodeTypeRegistration>>>,
    subscribers: Mutex<Vec<(SubscriberId, Sender<NodeTypeEvent>)>>,
    next_subscriber_id: AtomicU64,
}

/// Shared catalogue of node types
///
/// Cloning yields another handle to the same catalogue.
#[derive(Clone)]
pub struct NodeTypeRegistry {
    inner: Arc<RegistryInner>,
}

impl NodeTypeRegistry {
    /// Create an isolated registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                types: RwLock::new(BTreeMap::new()),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
            }),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static NodeTypeRegistry {
        static GLOBAL: OnceLock<NodeTypeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(NodeTypeRegistry::new)
    }

    /// Register a node type, replacing any registration with the same key
    pub fn register(&self, info: NodeTypeInfo, factory: Arc<dyn NodeFactory>) {
        let key = info.key.clone();
        let replaced = self
            .inner
            .types
            .write()
            .insert(key.clone(), Arc::new(NodeTypeRegistration { info, factory }))
            .is_some();
        if replaced {
            log::info!("Replaced node type {}", key);
        } else {
            log::info!("Registered node type {}", key);
        }
        self.broadcast(NodeTypeEvent::Added(key));
    }

    /// Register a node type backed by a closure
    pub fn register_fn<F>(&self, info: NodeTypeInfo, factory: F)
    where
        F: Fn(&ScriptContext, Option<&NodeRecord>, &mut NodeBuilder) -> Box<dyn Node> + Send + Sync + 'static,
    {
        self.register(info, Arc::new(FnNodeFactory(factory)));
    }

    /// Remove a node type, returns false if it was not registered
    pub fn unregister(&self, key: &NodeTypeKey) -> bool {
        let removed = self.inner.types.write().remove(key).is_some();
        if removed {
            log::info!("Unregistered node type {}", key);
            self.broadcast(NodeTypeEvent::Removed(key.clone()));
        }
        removed
    }

    /// Remove every node type of one plugin, returns how many were removed
    pub fn unregister_plugin(&self, plugin: &PluginId) -> usize {
        let removed: Vec<NodeTypeKey> = {
            let mut types = self.inner.types.write();
            let keys: Vec<NodeTypeKey> = types.keys().filter(|k| &k.plugin == plugin).cloned().collect();
            for key in &keys {
                types.remove(key);
            }
            keys
        };
        if !removed.is_empty() {
            log::info!("Unregistered {} node types of plugin {}", removed.len(), plugin);
        }
        for key in &removed {
            self.broadcast(NodeTypeEvent::Removed(key.clone()));
        }
        removed.len()
    }

    /// Find the registration for a plugin's type name
    pub fn lookup(&self, plugin: &PluginId, type_name: &str) -> Option<Arc<NodeTypeRegistration>> {
        self.get(&NodeTypeKey::new(plugin.clone(), type_name))
    }

    pub fn get(&self, key: &NodeTypeKey) -> Option<Arc<NodeTypeRegistration>> {
        self.inner.types.read().get(key).cloned()
    }

    pub fn contains(&self, key: &NodeTypeKey) -> bool {
        self.inner.types.read().contains_key(key)
    }

    /// Info of every registered type, ordered by key
    pub fn registrations(&self) -> Vec<NodeTypeInfo> {
        self.inner.types.read().values().map(|r| r.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.types.read().is_empty()
    }

    /// Subscribe to registration changes
    pub fn subscribe(&self) -> NodeTypeSubscription {
        let id = SubscriberId(self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = crossbeam_channel::unbounded();
        self.inner.subscribers.lock().push((id, sender));
        NodeTypeSubscription { id, receiver }
    }

    /// Unsubscribe, returns false if the id was unknown
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    fn broadcast(&self, event: NodeTypeEvent) {
        // Receivers dropped without unsubscribing are pruned here
        self.inner
            .subscribers
            .lock()
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeTypeRegistry")
            .field("types", &self.len())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalContext;

    struct Idle;

    impl Node for Idle {
        fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) {}
    }

    fn info(plugin: &str, type_name: &str) -> NodeTypeInfo {
        NodeTypeInfo::new(NodeTypeKey::new(PluginId::new(plugin), type_name), type_name)
            .description("test node")
            .category(NodeCategory::Custom("Test".into()))
    }

    fn idle_factory(_: &ScriptContext, _: Option<&NodeRecord>, _: &mut NodeBuilder) -> Box<dyn Node> {
        Box::new(Idle)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = NodeTypeRegistry::new();
        registry.register_fn(info("vendor.fx", "Strobe"), idle_factory);

        assert!(registry.lookup(&PluginId::new("vendor.fx"), "Strobe").is_some());
        assert!(registry.lookup(&PluginId::new("vendor.fx"), "Chase").is_none());
        assert!(registry.lookup(&PluginId::new("vendor.other"), "Strobe").is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.registrations()[0].category, NodeCategory::Custom("Test".into()));
    }

    #[test]
    fn test_changes_are_broadcast() {
        let registry = NodeTypeRegistry::new();
        let subscription = registry.subscribe();

        registry.register_fn(info("vendor.fx", "Strobe"), idle_factory);
        registry.register_fn(info("vendor.fx", "Chase"), idle_factory);
        assert!(registry.unregister(&NodeTypeKey::new(PluginId::new("vendor.fx"), "Strobe")));
        assert!(!registry.unregister(&NodeTypeKey::new(PluginId::new("vendor.fx"), "Strobe")));

        let events = subscription.drain();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], NodeTypeEvent::Added(_)));
        assert!(matches!(events[2], NodeTypeEvent::Removed(_)));
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_unregister_plugin() {
        let registry = NodeTypeRegistry::new();
        registry.register_fn(info("vendor.fx", "Strobe"), idle_factory);
        registry.register_fn(info("vendor.fx", "Chase"), idle_factory);
        registry.register_fn(info("vendor.audio", "Beat"), idle_factory);
        let subscription = registry.subscribe();

        assert_eq!(registry.unregister_plugin(&PluginId::new("vendor.fx")), 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(subscription.drain().len(), 2);
        assert_eq!(registry.unregister_plugin(&PluginId::new("vendor.fx")), 0);
    }

    #[test]
    fn test_unsubscribe_and_dropped_receivers() {
        let registry = NodeTypeRegistry::new();
        let kept = registry.subscribe();
        let dropped = registry.subscribe();
        assert_eq!(registry.subscriber_count(), 2);

        drop(dropped);
        registry.register_fn(info("vendor.fx", "Strobe"), idle_factory);
        assert_eq!(registry.subscriber_count(), 1);

        assert!(registry.unsubscribe(kept.id()));
        assert!(!registry.unsubscribe(kept.id()));
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_changes_from_another_thread() {
        let registry = NodeTypeRegistry::new();
        let subscription = registry.subscribe();

        let remote = registry.clone();
        std::thread::spawn(move || {
            remote.register_fn(info("vendor.fx", "Strobe"), idle_factory);
        })
        .join()
        .unwrap();

        assert_eq!(subscription.drain(), vec![NodeTypeEvent::Added(NodeTypeKey::new(
            PluginId::new("vendor.fx"),
            "Strobe"
        ))]);
    }
}
