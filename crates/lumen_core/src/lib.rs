//! # lumen_core - Lumen Core
//!
//! Zero-dependency primitives shared by the node-script runtime:
//! - **Identity**: named, hash-backed identifiers for plugins
//! - **Storage**: a generational slot map whose keys resolve only in the map
//!   that issued them
//! - **Observers**: explicit subscribe/unsubscribe handler lists

pub mod id;
pub mod slot_map;
pub mod observer;

pub use id::{NamedId, PluginId};
pub use slot_map::{SlotKey, SlotMap};
pub use observer::{Observers, SubscriberId};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{NamedId, PluginId};
    pub use crate::slot_map::{SlotKey, SlotMap};
    pub use crate::observer::{Observers, SubscriberId};
}
