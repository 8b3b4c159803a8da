/*!
# Pulsar 3D Engine - Vulkan Renderer Backend

Vulkan implementation of the Pulsar 3D rendering engine.

This crate provides the explicit-API backend behind the `RenderBackend` trait,
using the Ash library for Vulkan bindings and gpu-allocator for memory
management. The backend is registered as a plugin and selected at runtime by
the RenderHost facade; when [`probe`] reports the host cannot run Vulkan, the
factory declines and the facade falls back to the next registered backend.
*/

// Vulkan implementation modules
mod probe;
mod context;
mod device;
mod surface;
mod swapchain;
mod render_pass;
mod pipeline;
mod mesh;
mod texture;
mod frame;
mod backend;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use backend::VulkanBackend;
pub use probe::probe;

use pulsar_3d_engine::engine_info;
use pulsar_3d_engine::pulsar3d::render::register_backend_plugin;
use pulsar_3d_engine::pulsar3d::Error;

/// Register the Vulkan backend with the plugin system under the name "vulkan"
///
/// The factory probes first: an unusable host is an expected condition that
/// the facade handles by falling back, so it surfaces as a typed
/// initialization failure logged at Info, never as an error.
pub fn register() {
    register_backend_plugin("vulkan", |display, window, drawable_extent, config| {
        if !probe(display) {
            engine_info!(
                "pulsar3d::vulkan",
                "Host fails the capability probe; declining construction"
            );
            return Err(Error::InitializationFailed(
                "Vulkan is not usable on this host".to_string(),
            ));
        }
        let backend = VulkanBackend::new(display, window, drawable_extent, config)?;
        Ok(Box::new(backend))
    });
}
