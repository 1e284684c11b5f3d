//! Extension registry
//!
//! Name-to-handler tables with case-insensitive lookup. Plugins are the one table the
//! gateway consumes directly; other capability loaders reuse `CapabilityRegistry`.

mod handler;
mod registry;

pub use handler::{plugin_fn, FnPlugin, PluginHandler};
pub use registry::{CapabilityEntry, CapabilityRegistry, RegistryError};

use std::sync::Arc;

/// Registry of plugin handlers invoked by `plugin` frames
pub type PluginRegistry = CapabilityRegistry<Arc<dyn PluginHandler>>;

/// A registered plugin handler
pub type PluginHandlerEntry = CapabilityEntry<Arc<dyn PluginHandler>>;
