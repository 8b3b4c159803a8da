//! Integration tests for RenderHost construction and fallback
//!
//! These tests verify the complete facade workflow through the global plugin
//! registry, including the probe-negative fallback path. They need a real
//! window (winit), so they are marked #[ignore] for headless CI.
//!
//! Run with: cargo test --test host_integration_tests -- --ignored

use std::sync::Arc;
use pulsar_3d_engine::glam::Mat4;
use pulsar_3d_engine::pulsar3d::render::{
    register_backend_plugin, BindingSet, Config, DrawSubmission, FrameStatus, FrameSubmission,
    Mesh, MeshData, Pipeline, PipelineSource, RenderBackend, RenderHost, SceneDelegate,
    ShaderSource, Texture, TextureData, Vertex,
};
use pulsar_3d_engine::pulsar3d::{Error, Result};
use serial_test::serial;
use winit::event_loop::EventLoop;
use winit::window::Window;

// ============================================================================
// Inline mock backend (the public trait is implementable by embedders)
// ============================================================================

struct StubPipeline;
impl Pipeline for StubPipeline {}

struct StubMesh {
    indices: u32,
}
impl Mesh for StubMesh {
    fn index_count(&self) -> u32 {
        self.indices
    }
}

struct StubTexture {
    width: u32,
    height: u32,
}
impl Texture for StubTexture {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
}

struct StubBindingSet;
impl BindingSet for StubBindingSet {}

/// Minimal fallback backend: accepts every operation, draws nothing visible
struct StubBackend {
    frames_rendered: u32,
}

impl RenderBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub_fallback"
    }

    fn create_pipeline(&mut self, _source: &PipelineSource) -> Result<Arc<dyn Pipeline>> {
        Ok(Arc::new(StubPipeline))
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<dyn Mesh>> {
        Ok(Arc::new(StubMesh { indices: data.indices.len() as u32 }))
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<Arc<dyn Texture>> {
        Ok(Arc::new(StubTexture { width: data.width, height: data.height }))
    }

    fn create_binding_set(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        _texture: &Arc<dyn Texture>,
    ) -> Result<Arc<dyn BindingSet>> {
        Ok(Arc::new(StubBindingSet))
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        Ok(FrameStatus::Ready)
    }

    fn draw(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        _mesh: &Arc<dyn Mesh>,
        _binding_set: &Arc<dyn BindingSet>,
        _transform: &Mat4,
    ) -> Result<()> {
        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameStatus> {
        self.frames_rendered += 1;
        Ok(FrameStatus::Ready)
    }

    fn recreate_surface_state(&mut self, _drawable_extent: (u32, u32)) -> Result<()> {
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct TriangleScene;

impl SceneDelegate for TriangleScene {
    fn frame(&mut self, _delta_seconds: f32) -> FrameSubmission {
        FrameSubmission {
            pipeline: "flat".to_string(),
            draws: vec![DrawSubmission {
                mesh: "tri".to_string(),
                texture: "white".to_string(),
                transform: Mat4::IDENTITY,
            }],
        }
    }
}

#[allow(deprecated)]
fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let window = event_loop
        .create_window(Window::default_attributes().with_visible(false))
        .expect("Failed to create window");
    (window, event_loop)
}

fn register_test_assets(host: &mut RenderHost) {
    host.register_pipeline(
        "flat",
        PipelineSource {
            vertex_shader: ShaderSource { words: vec![0x0723_0203] },
            fragment_shader: ShaderSource { words: vec![0x0723_0203] },
        },
    );
    host.register_mesh(
        "tri",
        MeshData {
            vertices: vec![
                Vertex { position: [0.0, -0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.5, 0.0] },
                Vertex { position: [0.5, 0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 1.0] },
                Vertex { position: [-0.5, 0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 1.0] },
            ],
            indices: vec![0, 1, 2],
        },
    )
    .unwrap();
    host.register_texture(
        "white",
        TextureData { width: 1, height: 1, channels: 4, pixels: vec![255, 255, 255, 255] },
    )
    .unwrap();
}

// ============================================================================
// FALLBACK TESTS
// ============================================================================

#[test]
#[ignore] // Requires a display
#[serial]
fn test_probe_negative_host_falls_back_and_renders() {
    // "integration_unusable" models the explicit backend on a host that fails
    // the probe; "integration_fallback" is the legacy path.
    register_backend_plugin("integration_unusable", |_d, _w, _extent, _config| {
        Err(Error::InitializationFailed(
            "explicit API not usable on this host".to_string(),
        ))
    });
    register_backend_plugin("integration_fallback", |_d, _w, _extent, _config| {
        Ok(Box::new(StubBackend { frames_rendered: 0 }))
    });

    let (window, _event_loop) = create_test_window();
    let config = Config {
        backend_order: vec![
            "integration_unusable".to_string(),
            "integration_fallback".to_string(),
        ],
        ..Config::default()
    };

    let mut host = RenderHost::new(&window, (800, 600), config, Box::new(TriangleScene))
        .expect("fallback backend must be selected");
    assert_eq!(host.backend_name(), "stub_fallback");

    register_test_assets(&mut host);

    // The same three-operation contract must produce a frame immediately
    host.render_frame(0.016).expect("first frame renders");
    host.on_surface_resized(640, 480);
    host.render_frame(0.016).expect("frame after resize renders");

    let counters = host.cache_counters();
    assert_eq!(counters.meshes_built, 1);
    assert_eq!(counters.textures_built, 1);
    assert_eq!(counters.pipelines_built, 2, "resize rebuilds the pipeline");
}

#[test]
#[ignore] // Requires a display
#[serial]
fn test_all_backends_unavailable_is_typed_failure() {
    register_backend_plugin("integration_unusable_only", |_d, _w, _extent, _config| {
        Err(Error::InitializationFailed("still unusable".to_string()))
    });

    let (window, _event_loop) = create_test_window();
    let config = Config {
        backend_order: vec!["integration_unusable_only".to_string()],
        ..Config::default()
    };

    match RenderHost::new(&window, (800, 600), config, Box::new(TriangleScene)) {
        Err(Error::InitializationFailed(_)) => {}
        other => panic!("expected InitializationFailed, got {:?}", other.map(|_| ())),
    }
}
