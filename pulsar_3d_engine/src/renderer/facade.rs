/// RenderHost - the backend facade
///
/// Owns the active backend (chosen once at construction, with automatic
/// fallback down the configured order), the asset cache, and the scene
/// delegate. Application code sees exactly three operations: `start_loop`,
/// `render_frame` and `on_surface_resized`; which backend is active is
/// invisible beyond `backend_name()`.

use std::time::Instant;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{Error, Result};
use crate::{engine_debug, engine_error, engine_info};
use super::backend::{Config, FrameStatus, RenderBackend};
use super::cache::{AssetCache, CacheCounters};
use super::draw_list::SceneDelegate;
use super::registry::backend_plugin_registry;
use super::assets::{MeshData, PipelineSource, TextureData};

/// Cooperative main-loop contract
///
/// `start_loop` drives this from a blocking loop; a platform with its own
/// scheduler (e.g. a callback-driven environment) calls `tick` itself.
pub trait MainLoop {
    /// Advance one frame
    ///
    /// # Returns
    ///
    /// `false` when the loop must stop (fatal backend error)
    fn tick(&mut self, delta_seconds: f32) -> bool;
}

/// The backend facade: one owning handle over the active render backend
///
/// Field order is load-bearing: the cache (holding GPU resource Arcs) must
/// drop before the backend that created them; `Drop` waits for the GPU first.
pub struct RenderHost {
    cache: AssetCache,
    backend: Box<dyn RenderBackend>,
    scene: Box<dyn SceneDelegate>,
    /// Last drawable pixel extent reported by the windowing layer
    drawable_extent: (u32, u32),
    /// Swapchain-dependent state must be rebuilt before the next frame
    recreate_pending: bool,
}

impl RenderHost {
    /// Construct the facade, choosing the first usable backend
    ///
    /// Walks `config.backend_order` through the plugin registry inside one
    /// recoverable-failure boundary: a candidate that fails at any stage of
    /// its initialization is discarded whole and the next is tried. An
    /// unavailable backend is an expected condition and logs at Info, never
    /// as an error.
    ///
    /// # Arguments
    ///
    /// * `window` - The native window; the constructed backend's surface must
    ///   not outlive it
    /// * `drawable_extent` - Current drawable pixel size (not logical size)
    /// * `config` - Renderer configuration
    /// * `scene` - Per-frame submission source
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        drawable_extent: (u32, u32),
        config: Config,
        scene: Box<dyn SceneDelegate>,
    ) -> Result<Self> {
        let display = window
            .display_handle()
            .map_err(|e| Error::InitializationFailed(format!("No display handle: {}", e)))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| Error::InitializationFailed(format!("No window handle: {}", e)))?
            .as_raw();

        let registry_lock = backend_plugin_registry().lock().map_err(|_| {
            Error::InitializationFailed("Backend registry lock poisoned".to_string())
        })?;
        let registry = registry_lock
            .as_ref()
            .ok_or_else(|| Error::InitializationFailed("Backend registry empty".to_string()))?;

        for name in &config.backend_order {
            match registry.create_backend(name, display, window_handle, drawable_extent, &config) {
                Ok(backend) => {
                    engine_info!("pulsar3d::RenderHost", "Using '{}' backend", backend.name());
                    return Ok(Self::with_backend(backend, drawable_extent, scene));
                }
                Err(e) => {
                    engine_info!(
                        "pulsar3d::RenderHost",
                        "Backend '{}' unavailable, trying next: {}",
                        name,
                        e
                    );
                }
            }
        }

        Err(Error::InitializationFailed(
            "No registered backend could be constructed".to_string(),
        ))
    }

    /// Construct the facade over an already-built backend
    ///
    /// Used by embedders that perform their own backend selection, and by
    /// tests with a mock backend.
    pub fn with_backend(
        backend: Box<dyn RenderBackend>,
        drawable_extent: (u32, u32),
        scene: Box<dyn SceneDelegate>,
    ) -> Self {
        Self {
            cache: AssetCache::new(),
            backend,
            scene,
            drawable_extent,
            recreate_pending: false,
        }
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    // ===== ASSET REGISTRATION =====

    /// Register a pipeline source under a stable key
    pub fn register_pipeline(&mut self, key: &str, source: PipelineSource) {
        self.cache.register_pipeline(key, source);
    }

    /// Register mesh data under a stable key
    pub fn register_mesh(&mut self, key: &str, data: MeshData) -> Result<()> {
        self.cache.register_mesh(key, data)
    }

    /// Register texture data under a stable key
    pub fn register_texture(&mut self, key: &str, data: TextureData) -> Result<()> {
        self.cache.register_texture(key, data)
    }

    /// Asset construction counters (for stats and tests)
    pub fn cache_counters(&self) -> CacheCounters {
        self.cache.counters()
    }

    // ===== FRAME OPERATIONS =====

    /// Render one frame
    ///
    /// Performs any pending surface-state rebuild first, then asks the scene
    /// for its submission and drives acquire → record → submit → present. A
    /// stale surface at acquire or present drops the frame without error and
    /// schedules a rebuild for the next call; all other failures propagate.
    pub fn render_frame(&mut self, delta_seconds: f32) -> Result<()> {
        if self.recreate_pending {
            self.recreate_surface_state()?;
        }

        let submission = self.scene.frame(delta_seconds);

        match self.backend.begin_frame()? {
            FrameStatus::SurfaceOutOfDate => {
                engine_debug!(
                    "pulsar3d::RenderHost",
                    "Stale surface at acquire; frame dropped"
                );
                self.recreate_pending = true;
                return Ok(());
            }
            FrameStatus::Ready => {}
        }

        for draw in &submission.draws {
            let pipeline = self.cache.pipeline(&mut *self.backend, &submission.pipeline)?;
            let mesh = self.cache.mesh(&mut *self.backend, &draw.mesh)?;
            let binding_set =
                self.cache
                    .binding_set(&mut *self.backend, &submission.pipeline, &draw.texture)?;
            self.backend
                .draw(&pipeline, &mesh, &binding_set, &draw.transform)?;
        }

        match self.backend.end_frame()? {
            FrameStatus::SurfaceOutOfDate => {
                engine_debug!(
                    "pulsar3d::RenderHost",
                    "Stale surface at present; rebuild scheduled"
                );
                self.recreate_pending = true;
            }
            FrameStatus::Ready => {}
        }
        Ok(())
    }

    /// Note a new drawable extent and schedule a surface-state rebuild
    ///
    /// Callable at any point between frames, including when the usable extent
    /// did not actually change (the rebuild is then a no-op by content).
    pub fn on_surface_resized(&mut self, width: u32, height: u32) {
        self.drawable_extent = (width.max(1), height.max(1));
        self.recreate_pending = true;
    }

    /// Run the blocking frame loop until a fatal error stops it
    pub fn start_loop(&mut self) {
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            let delta = now.duration_since(last).as_secs_f32();
            last = now;
            if !self.tick(delta) {
                break;
            }
        }
    }

    fn recreate_surface_state(&mut self) -> Result<()> {
        self.backend.recreate_surface_state(self.drawable_extent)?;
        // Pipelines reference the recreated render pass; binding sets live in
        // pipeline-owned pools. Meshes and textures are untouched.
        self.cache.invalidate_pipelines();
        self.recreate_pending = false;
        Ok(())
    }
}

impl MainLoop for RenderHost {
    fn tick(&mut self, delta_seconds: f32) -> bool {
        match self.render_frame(delta_seconds) {
            Ok(()) => true,
            Err(e) => {
                engine_error!("pulsar3d::RenderHost", "Fatal render error: {}", e);
                false
            }
        }
    }
}

impl Drop for RenderHost {
    fn drop(&mut self) {
        // The cache drops GPU resources next; the GPU must be done with them
        self.backend.wait_idle().ok();
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
