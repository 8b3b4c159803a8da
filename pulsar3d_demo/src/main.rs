//! Pulsar3D demo - a rotating textured cube
//!
//! Registers the Vulkan plugin, builds the RenderHost facade and drives it
//! from a winit ApplicationHandler loop. Embedders that own a GL context can
//! additionally register the legacy plugin with
//! `pulsar_3d_engine_renderer_gl::register(context)` to get the automatic
//! fallback path.
//!
//! Shaders: the build tooling compiles `shaders/demo.vert` and
//! `shaders/demo.frag` to `.spv` next to them; this binary loads the
//! compiled artifacts at startup.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pulsar_3d_engine::glam::{Mat4, Vec3};
use pulsar_3d_engine::pulsar3d::render::{
    Config, DrawSubmission, FrameSubmission, MeshData, PipelineSource, RenderHost, SceneDelegate,
    ShaderSource, TextureData, Vertex,
};
use pulsar_3d_engine::pulsar3d::Result;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

// ============================================================================
// Scene
// ============================================================================

/// Rotating cube; aspect ratio shared with the windowing side
struct CubeScene {
    angle: f32,
    aspect: Arc<Mutex<f32>>,
}

impl SceneDelegate for CubeScene {
    fn frame(&mut self, delta_seconds: f32) -> FrameSubmission {
        self.angle += delta_seconds * 0.9;

        let aspect = *self.aspect.lock().unwrap();
        let mut projection = Mat4::perspective_rh(45f32.to_radians(), aspect, 0.1, 100.0);
        // Vulkan clip space has Y pointing down
        projection.y_axis.y *= -1.0;
        let view = Mat4::look_at_rh(Vec3::new(0.0, 1.5, 3.5), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_rotation_y(self.angle) * Mat4::from_rotation_x(self.angle * 0.4);

        FrameSubmission {
            pipeline: "demo".to_string(),
            draws: vec![DrawSubmission {
                mesh: "cube".to_string(),
                texture: "checker".to_string(),
                transform: projection * view * model,
            }],
        }
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Unit cube with per-face normals and UVs
fn cube_mesh() -> MeshData {
    let face = |normal: [f32; 3], corners: [[f32; 3]; 4]| -> Vec<Vertex> {
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        corners
            .iter()
            .zip(uvs.iter())
            .map(|(&position, &uv)| Vertex { position, normal, uv })
            .collect()
    };

    let mut vertices = Vec::with_capacity(24);
    vertices.extend(face(
        [0.0, 0.0, 1.0],
        [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]],
    ));
    vertices.extend(face(
        [0.0, 0.0, -1.0],
        [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]],
    ));
    vertices.extend(face(
        [1.0, 0.0, 0.0],
        [[0.5, -0.5, 0.5], [0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5]],
    ));
    vertices.extend(face(
        [-1.0, 0.0, 0.0],
        [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]],
    ));
    vertices.extend(face(
        [0.0, 1.0, 0.0],
        [[-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5]],
    ));
    vertices.extend(face(
        [0.0, -1.0, 0.0],
        [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]],
    ));

    let mut indices = Vec::with_capacity(36);
    for quad in 0..6u32 {
        let base = quad * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData { vertices, indices }
}

/// Procedural checkerboard
fn checker_texture() -> TextureData {
    const SIZE: u32 = 64;
    const CELL: u32 = 8;
    let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);
    for y in 0..SIZE {
        for x in 0..SIZE {
            let even = ((x / CELL) + (y / CELL)) % 2 == 0;
            let value = if even { 230u8 } else { 60u8 };
            pixels.extend_from_slice(&[value, value, value, 255]);
        }
    }
    TextureData { width: SIZE, height: SIZE, channels: 4, pixels }
}

fn shader_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders").join(name)
}

fn load_shader(name: &str) -> Result<ShaderSource> {
    let path = shader_path(name);
    let bytes = std::fs::read(&path).map_err(|e| {
        pulsar_3d_engine::pulsar3d::Error::InvalidResource(format!(
            "Cannot read {} ({}); compile the demo shaders first",
            path.display(),
            e
        ))
    })?;
    ShaderSource::from_spirv_bytes(&bytes)
}

// ============================================================================
// Application
// ============================================================================

struct DemoApp {
    window: Option<Arc<Window>>,
    host: Option<RenderHost>,
    aspect: Arc<Mutex<f32>>,
    last_frame: Instant,
}

impl DemoApp {
    fn new() -> Self {
        Self {
            window: None,
            host: None,
            aspect: Arc::new(Mutex::new(16.0 / 9.0)),
            last_frame: Instant::now(),
        }
    }

    fn build_host(&mut self, window: &Arc<Window>) -> Result<RenderHost> {
        let size = window.inner_size();
        let extent = (size.width.max(1), size.height.max(1));
        *self.aspect.lock().unwrap() = extent.0 as f32 / extent.1 as f32;

        let config = Config {
            app_name: "Pulsar3D Demo".to_string(),
            backend_order: vec!["vulkan".to_string(), "gl".to_string()],
            ..Config::default()
        };
        let scene = CubeScene { angle: 0.0, aspect: Arc::clone(&self.aspect) };
        let mut host = RenderHost::new(window.as_ref(), extent, config, Box::new(scene))?;

        host.register_pipeline(
            "demo",
            PipelineSource {
                vertex_shader: load_shader("demo.vert.spv")?,
                fragment_shader: load_shader("demo.frag.spv")?,
            },
        );
        host.register_mesh("cube", cube_mesh())?;
        host.register_texture("checker", checker_texture())?;
        Ok(host)
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title("Pulsar3D Demo")
                        .with_inner_size(winit::dpi::PhysicalSize::new(1280, 720)),
                )
                .expect("Failed to create window"),
        );

        pulsar_3d_engine_renderer_vulkan::register();

        match self.build_host(&window) {
            Ok(host) => {
                println!("Rendering with the '{}' backend", host.backend_name());
                self.host = Some(host);
                self.window = Some(window);
                self.last_frame = Instant::now();
            }
            Err(e) => {
                eprintln!("Failed to initialize rendering: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(host) = &mut self.host {
                    host.on_surface_resized(size.width, size.height);
                }
                *self.aspect.lock().unwrap() =
                    size.width.max(1) as f32 / size.height.max(1) as f32;
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let delta = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                if let Some(host) = &mut self.host {
                    if let Err(e) = host.render_frame(delta) {
                        eprintln!("Fatal render error: {}", e);
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("Event loop error: {}", e);
    }
}
