/// RenderBackend trait - the contract every graphics backend implements

use std::sync::Arc;
use glam::Mat4;

use crate::error::Result;
use super::assets::{MeshData, PipelineSource, TextureData};

// ============================================================================
// Configuration
// ============================================================================

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Backend plugin names to try, in order; the first that constructs wins
    pub backend_order: Vec<String>,
    /// Upper bound on distinct binding sets per pipeline; exceeding it is a
    /// fatal configuration error, not a silent drop
    pub max_binding_sets: u32,
    /// Highest multisample count a backend may pick (power of two)
    pub sample_count_ceiling: u32,
    /// Bounded wait for swapchain image acquisition, in nanoseconds.
    /// A timed-out acquire is treated like a stale surface, never a hang.
    pub acquire_timeout_ns: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Pulsar3D Application".to_string(),
            app_version: (1, 0, 0),
            backend_order: vec!["vulkan".to_string(), "gl".to_string()],
            max_binding_sets: 256,
            sample_count_ceiling: 8,
            acquire_timeout_ns: 1_000_000_000,
        }
    }
}

// ============================================================================
// Frame status
// ============================================================================

/// Outcome of a frame boundary operation (acquire or present)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The operation succeeded; the frame proceeds
    Ready,
    /// The surface no longer matches the swapchain (resize, out-of-date
    /// signal, or a timed-out acquire). The current frame is dropped and
    /// swapchain-dependent state must be rebuilt before the next one.
    SurfaceOutOfDate,
}

// ============================================================================
// Backend resource traits
// ============================================================================

/// Compiled, immutable graphics pipeline
///
/// Invalidated and rebuilt when swapchain-dependent state is recreated;
/// meshes and textures are not.
pub trait Pipeline {}

/// GPU-resident mesh (vertex + index buffers), immutable after upload
pub trait Mesh {
    /// Number of indices to draw
    fn index_count(&self) -> u32;
}

/// GPU-resident sampled texture, immutable after upload
pub trait Texture {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Allocation binding one texture onto a pipeline's declared resource slot
///
/// Owned by the pipeline's pool; destroyed en masse with the pipeline.
pub trait BindingSet {}

// ============================================================================
// RenderBackend trait
// ============================================================================

/// Graphics backend contract
///
/// Factory methods create GPU resources from plain CPU-side data; the
/// per-frame methods drive acquire → record → submit → present. The facade
/// is the only caller; application code never sees a backend directly.
pub trait RenderBackend {
    /// Stable backend name as registered with the plugin system
    fn name(&self) -> &'static str;

    /// Compile a draw pipeline against the backend's current frame targets
    fn create_pipeline(&mut self, source: &PipelineSource) -> Result<Arc<dyn Pipeline>>;

    /// Upload a mesh to GPU-local memory
    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<dyn Mesh>>;

    /// Upload a texture to GPU-local memory
    fn create_texture(&mut self, data: &TextureData) -> Result<Arc<dyn Texture>>;

    /// Allocate a binding set from `pipeline`'s pool, pointing at `texture`
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` once the configured per-pipeline bound is hit.
    fn create_binding_set(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        texture: &Arc<dyn Texture>,
    ) -> Result<Arc<dyn BindingSet>>;

    /// Acquire the next presentable image and begin recording
    ///
    /// Returns `FrameStatus::SurfaceOutOfDate` instead of an error when the
    /// surface is stale; any other failure is fatal and propagates.
    fn begin_frame(&mut self) -> Result<FrameStatus>;

    /// Record one draw into the open frame
    ///
    /// Pushes `transform` as per-draw constant data, binds the pipeline, the
    /// mesh's buffers and the binding set, and issues an indexed draw.
    fn draw(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        mesh: &Arc<dyn Mesh>,
        binding_set: &Arc<dyn BindingSet>,
        transform: &Mat4,
    ) -> Result<()>;

    /// Close recording, submit, and present the acquired image
    ///
    /// Same `SurfaceOutOfDate` semantics as [`RenderBackend::begin_frame`].
    fn end_frame(&mut self) -> Result<FrameStatus>;

    /// Destroy and rebuild all swapchain-dependent state
    ///
    /// # Arguments
    ///
    /// * `drawable_extent` - Current drawable pixel size from the windowing
    ///   layer (not the logical size)
    fn recreate_surface_state(&mut self, drawable_extent: (u32, u32)) -> Result<()>;

    /// Block until the GPU has consumed all submitted work
    fn wait_idle(&self) -> Result<()>;
}
