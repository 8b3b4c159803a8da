/// Plugin registry for render backends
///
/// Backend crates register a named factory at startup; the RenderHost facade
/// walks its configured order through this registry and keeps the first
/// backend that constructs. Raw window/display handles are passed through so
/// the registry stays independent of any one windowing type.

use std::collections::HashMap;
use std::sync::Mutex;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::error::{Error, Result};
use super::backend::{Config, RenderBackend};

/// Backend plugin factory function type
///
/// Receives the raw native handles, the initial drawable pixel extent and the
/// configuration; returns a constructed backend or a typed failure. A factory
/// that fails must leave no partial state behind.
pub type BackendFactory = Box<
    dyn Fn(RawDisplayHandle, RawWindowHandle, (u32, u32), &Config) -> Result<Box<dyn RenderBackend>>
        + Send
        + Sync,
>;

/// Plugin registry for render backends
pub struct BackendPluginRegistry {
    plugins: HashMap<&'static str, BackendFactory>,
}

impl BackendPluginRegistry {
    /// Create a new plugin registry
    fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin
    ///
    /// # Arguments
    ///
    /// * `name` - Plugin name (e.g., "vulkan", "gl")
    /// * `factory` - Factory function to create the backend
    pub fn register_plugin<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(RawDisplayHandle, RawWindowHandle, (u32, u32), &Config) -> Result<Box<dyn RenderBackend>>
            + Send
            + Sync
            + 'static,
    {
        self.plugins.insert(name, Box::new(factory));
    }

    /// True if a plugin with this name has been registered
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Create a backend using a registered plugin
    ///
    /// # Arguments
    ///
    /// * `plugin_name` - Name of the plugin to use
    /// * `display` - Raw display handle from the windowing layer
    /// * `window` - Raw window handle from the windowing layer
    /// * `drawable_extent` - Current drawable pixel size
    /// * `config` - Renderer configuration
    pub fn create_backend(
        &self,
        plugin_name: &str,
        display: RawDisplayHandle,
        window: RawWindowHandle,
        drawable_extent: (u32, u32),
        config: &Config,
    ) -> Result<Box<dyn RenderBackend>> {
        self.plugins
            .get(plugin_name)
            .ok_or_else(|| {
                Error::InitializationFailed(format!("Backend plugin '{}' not found", plugin_name))
            })?(display, window, drawable_extent, config)
    }
}

static BACKEND_REGISTRY: Mutex<Option<BackendPluginRegistry>> = Mutex::new(None);

/// Get the global backend plugin registry
pub fn backend_plugin_registry() -> &'static Mutex<Option<BackendPluginRegistry>> {
    // Initialize on first access
    let mut registry = BACKEND_REGISTRY.lock().unwrap();
    if registry.is_none() {
        *registry = Some(BackendPluginRegistry::new());
    }
    drop(registry);
    &BACKEND_REGISTRY
}

/// Register a backend plugin in the global registry
///
/// # Arguments
///
/// * `name` - Plugin name
/// * `factory` - Factory function
pub fn register_backend_plugin<F>(name: &'static str, factory: F)
where
    F: Fn(RawDisplayHandle, RawWindowHandle, (u32, u32), &Config) -> Result<Box<dyn RenderBackend>>
        + Send
        + Sync
        + 'static,
{
    backend_plugin_registry()
        .lock()
        .unwrap()
        .as_mut()
        .unwrap()
        .register_plugin(name, factory);
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
