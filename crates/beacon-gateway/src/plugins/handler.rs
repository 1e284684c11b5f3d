//! Plugin handler trait

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked by a `plugin` frame
///
/// Invocations are fire-and-forget: the gateway spawns the future and never correlates
/// its outcome with the client's request.
#[async_trait]
pub trait PluginHandler: Send + Sync {
    /// Handle the frame's `data` (`Value::Null` when absent)
    async fn invoke(&self, data: Value);
}

/// Adapter turning a synchronous closure into a [`PluginHandler`]
pub struct FnPlugin<F>(pub F);

#[async_trait]
impl<F> PluginHandler for FnPlugin<F>
where
    F: Fn(Value) + Send + Sync,
{
    async fn invoke(&self, data: Value) {
        (self.0)(data);
    }
}

/// Wrap a closure as a shareable plugin handler
pub fn plugin_fn<F>(f: F) -> Arc<dyn PluginHandler>
where
    F: Fn(Value) + Send + Sync + 'static,
{
    Arc::new(FnPlugin(f))
}
