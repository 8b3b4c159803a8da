/*!
# Pulsar 3D Engine - Legacy OpenGL Renderer Backend

The fallback backend behind the `RenderBackend` trait, used when the explicit
API is unavailable on the host. Implemented over `glow` with one fixed
built-in program in the spirit of the fixed-function era: pipeline sources
are accepted but ignored, every pipeline key resolves to the same program.

The GL context itself belongs to the windowing layer (which also performs the
buffer swap); this crate receives a ready [`glow::Context`] at registration.
*/

mod backend;

pub use backend::GlBackend;

use std::sync::{Arc, Mutex};

use pulsar_3d_engine::engine_info;
use pulsar_3d_engine::pulsar3d::render::register_backend_plugin;
use pulsar_3d_engine::pulsar3d::Error;

/// Thread-affinity wrapper around the GL context for transfer into the plugin
/// registry.
///
/// The registry keeps factories in a global `Mutex<Option<Registry>>`, so its
/// factory type is `Send + Sync`; `glow::Context` holds raw pointers and is
/// neither. This core is single-threaded by contract (one logical render
/// thread) and the GL context is thread-affine, so asserting the marker traits
/// here is sound: the context is only ever touched from the render thread.
struct ThreadAffineContext(Arc<glow::Context>);

// SAFETY: single logical render thread (DESIGN.md); the context is never
// shared with or moved between threads in practice.
unsafe impl Send for ThreadAffineContext {}
unsafe impl Sync for ThreadAffineContext {}

/// Register the legacy backend with the plugin system under the name "gl"
///
/// # Arguments
///
/// * `gl` - A current GL context created by the windowing layer; consumed by
///   the first (and only) backend construction
pub fn register(gl: glow::Context) {
    let slot = Mutex::new(Some(ThreadAffineContext(Arc::new(gl))));
    register_backend_plugin("gl", move |_display, _window, drawable_extent, _config| {
        let gl = slot
            .lock()
            .map_err(|_| Error::InitializationFailed("GL context slot poisoned".to_string()))?
            .take()
            .map(|ctx| ctx.0)
            .ok_or_else(|| {
                Error::InitializationFailed(
                    "GL context already consumed by a previous backend".to_string(),
                )
            })?;
        engine_info!("pulsar3d::gl", "Constructing legacy OpenGL backend");
        Ok(Box::new(GlBackend::new(gl, drawable_extent)?))
    });
}
