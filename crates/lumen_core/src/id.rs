//! Named identifiers
//!
//! Plugins are identified by a stable name. The name is hashed once on
//! creation so comparisons in hot lookups stay cheap.

use std::fmt;

/// An identifier backed by a human-readable name and its FNV-1a hash
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamedId {
    name: Box<str>,
    hash: u64,
}

impl NamedId {
    /// Create a new named ID
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            hash: fnv1a(name),
        }
    }

    /// Get the name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the precomputed hash
    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

fn fnv1a(name: &str) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in name.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

impl fmt::Debug for NamedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamedId({:?})", self.name)
    }
}

impl fmt::Display for NamedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for NamedId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NamedId {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

/// Identity of the plugin that owns a node type
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PluginId(NamedId);

impl PluginId {
    /// Name of the plugin that owns the runtime's own node types
    pub const CORE: &'static str = "lumen.core";

    /// Create a new plugin ID
    pub fn new(name: &str) -> Self {
        Self(NamedId::new(name))
    }

    /// The runtime's own plugin
    pub fn core() -> Self {
        Self::new(Self::CORE)
    }

    /// Get the plugin name
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Check if this is the runtime's own plugin
    pub fn is_core(&self) -> bool {
        self.name() == Self::CORE
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PluginId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
