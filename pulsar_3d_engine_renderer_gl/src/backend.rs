/// GlBackend - the legacy immediate-style implementation of RenderBackend
///
/// One fixed program (positions transformed by a per-draw MVP uniform, one
/// texture unit), vertex/index buffer objects per mesh, depth test on.
/// There is no swapchain here: begin_frame clears, end_frame flushes, and
/// presentation is the buffer swap owned by the windowing layer's context.
/// Consequently the backend never reports a stale surface; a resize is just
/// a viewport change.

use std::sync::Arc;
use glow::HasContext;

use pulsar_3d_engine::glam::Mat4;
use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::{
    BindingSet as RendererBindingSet, FrameStatus, Mesh as RendererMesh, MeshData,
    Pipeline as RendererPipeline, PipelineSource, RenderBackend, Texture as RendererTexture,
    TextureData, Vertex,
};
use pulsar_3d_engine::{engine_debug, engine_err};

/// Built-in vertex stage: position through the per-draw MVP, pass UV along
const VERTEX_SHADER_SOURCE: &str = r#"
#version 120
attribute vec3 a_position;
attribute vec3 a_normal;
attribute vec2 a_uv;
uniform mat4 u_mvp;
varying vec2 v_uv;
varying vec3 v_normal;
void main() {
    v_uv = a_uv;
    v_normal = a_normal;
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

/// Built-in fragment stage: textured with a fixed headlight-style lambert
const FRAGMENT_SHADER_SOURCE: &str = r#"
#version 120
uniform sampler2D u_texture;
varying vec2 v_uv;
varying vec3 v_normal;
void main() {
    float light = 0.35 + 0.65 * max(dot(normalize(v_normal), vec3(0.0, 0.0, 1.0)), 0.0);
    gl_FragColor = vec4(texture2D(u_texture, v_uv).rgb * light, 1.0);
}
"#;

// ============================================================================
// Resources
// ============================================================================

/// All pipeline keys resolve to the shared built-in program
pub struct GlPipeline {
    program: glow::Program,
}

impl RendererPipeline for GlPipeline {}

pub struct GlMesh {
    gl: Arc<glow::Context>,
    vertex_buffer: glow::Buffer,
    index_buffer: glow::Buffer,
    index_count: u32,
}

impl RendererMesh for GlMesh {
    fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl Drop for GlMesh {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.index_buffer);
            self.gl.delete_buffer(self.vertex_buffer);
        }
    }
}

pub struct GlTexture {
    gl: Arc<glow::Context>,
    texture: glow::Texture,
    width: u32,
    height: u32,
}

impl RendererTexture for GlTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_texture(self.texture);
        }
    }
}

/// Legacy binding is just the texture handle for unit 0
pub struct GlBindingSet {
    texture: glow::Texture,
}

impl RendererBindingSet for GlBindingSet {}

// ============================================================================
// Backend
// ============================================================================

/// Legacy OpenGL render backend
pub struct GlBackend {
    gl: Arc<glow::Context>,
    program: glow::Program,
    mvp_location: glow::UniformLocation,
    texture_location: glow::UniformLocation,
    drawable_extent: (u32, u32),
    frame_open: bool,
}

impl GlBackend {
    /// Compile the fixed program against the provided context
    pub fn new(gl: Arc<glow::Context>, drawable_extent: (u32, u32)) -> Result<Self> {
        unsafe {
            let program = Self::build_program(&gl)?;

            let mvp_location = gl.get_uniform_location(program, "u_mvp").ok_or_else(|| {
                engine_err!("pulsar3d::gl", "Built-in program lost its u_mvp uniform")
            })?;
            let texture_location =
                gl.get_uniform_location(program, "u_texture").ok_or_else(|| {
                    engine_err!("pulsar3d::gl", "Built-in program lost its u_texture uniform")
                })?;

            gl.enable(glow::DEPTH_TEST);

            Ok(Self {
                gl,
                program,
                mvp_location,
                texture_location,
                drawable_extent,
                frame_open: false,
            })
        }
    }

    unsafe fn build_program(gl: &glow::Context) -> Result<glow::Program> {
        let compile = |kind: u32, source: &str, label: &str| -> Result<glow::Shader> {
            let shader = gl
                .create_shader(kind)
                .map_err(|e| engine_err!("pulsar3d::gl", "Failed to create {} shader: {}", label, e))?;
            gl.shader_source(shader, source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                let log = gl.get_shader_info_log(shader);
                gl.delete_shader(shader);
                return Err(engine_err!("pulsar3d::gl", "{} shader failed to compile: {}", label, log));
            }
            Ok(shader)
        };

        let vertex = compile(glow::VERTEX_SHADER, VERTEX_SHADER_SOURCE, "vertex")?;
        let fragment = match compile(glow::FRAGMENT_SHADER, FRAGMENT_SHADER_SOURCE, "fragment") {
            Ok(shader) => shader,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(e);
            }
        };

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(e) => {
                gl.delete_shader(fragment);
                gl.delete_shader(vertex);
                return Err(engine_err!("pulsar3d::gl", "Failed to create program: {}", e));
            }
        };
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            return Err(engine_err!("pulsar3d::gl", "Program failed to link: {}", log));
        }

        Ok(program)
    }
}

impl RenderBackend for GlBackend {
    fn name(&self) -> &'static str {
        "gl"
    }

    fn create_pipeline(&mut self, _source: &PipelineSource) -> Result<Arc<dyn RendererPipeline>> {
        // Fixed-function era: user shader stages are not programmable here
        Ok(Arc::new(GlPipeline { program: self.program }))
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<dyn RendererMesh>> {
        data.validate()?;
        unsafe {
            let vertex_buffer = self
                .gl
                .create_buffer()
                .map_err(|e| engine_err!("pulsar3d::gl", "Failed to create vertex buffer: {}", e))?;
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer));
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&data.vertices),
                glow::STATIC_DRAW,
            );

            let index_buffer = match self.gl.create_buffer() {
                Ok(buffer) => buffer,
                Err(e) => {
                    self.gl.delete_buffer(vertex_buffer);
                    return Err(engine_err!("pulsar3d::gl", "Failed to create index buffer: {}", e));
                }
            };
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&data.indices),
                glow::STATIC_DRAW,
            );

            Ok(Arc::new(GlMesh {
                gl: Arc::clone(&self.gl),
                vertex_buffer,
                index_buffer,
                index_count: data.indices.len() as u32,
            }))
        }
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<Arc<dyn RendererTexture>> {
        data.validate()?;
        unsafe {
            let texture = self
                .gl
                .create_texture()
                .map_err(|e| engine_err!("pulsar3d::gl", "Failed to create texture: {}", e))?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                data.width as i32,
                data.height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                Some(&data.pixels),
            );

            Ok(Arc::new(GlTexture {
                gl: Arc::clone(&self.gl),
                texture,
                width: data.width,
                height: data.height,
            }))
        }
    }

    fn create_binding_set(
        &mut self,
        _pipeline: &Arc<dyn RendererPipeline>,
        texture: &Arc<dyn RendererTexture>,
    ) -> Result<Arc<dyn RendererBindingSet>> {
        let texture = unsafe { &*(Arc::as_ptr(texture) as *const GlTexture) };
        Ok(Arc::new(GlBindingSet { texture: texture.texture }))
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        unsafe {
            let (width, height) = self.drawable_extent;
            self.gl.viewport(0, 0, width as i32, height as i32);
            self.gl.clear_color(0.05, 0.05, 0.08, 1.0);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
        self.frame_open = true;
        Ok(FrameStatus::Ready)
    }

    fn draw(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        mesh: &Arc<dyn RendererMesh>,
        binding_set: &Arc<dyn RendererBindingSet>,
        transform: &Mat4,
    ) -> Result<()> {
        if !self.frame_open {
            return Err(Error::BackendError(
                "draw outside begin_frame/end_frame".to_string(),
            ));
        }

        let gl_pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const GlPipeline) };
        let gl_mesh = unsafe { &*(Arc::as_ptr(mesh) as *const GlMesh) };
        let set = unsafe { &*(Arc::as_ptr(binding_set) as *const GlBindingSet) };

        unsafe {
            self.gl.use_program(Some(gl_pipeline.program));
            self.gl.uniform_matrix_4_f32_slice(
                Some(&self.mvp_location),
                false,
                &transform.to_cols_array(),
            );

            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(set.texture));
            self.gl.uniform_1_i32(Some(&self.texture_location), 0);

            let stride = std::mem::size_of::<Vertex>() as i32;
            self.gl
                .bind_buffer(glow::ARRAY_BUFFER, Some(gl_mesh.vertex_buffer));
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(gl_mesh.index_buffer));
            for location in 0..3u32 {
                self.gl.enable_vertex_attrib_array(location);
            }
            self.gl
                .vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            self.gl
                .vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 12);
            self.gl
                .vertex_attrib_pointer_f32(2, 2, glow::FLOAT, false, stride, 24);

            self.gl.draw_elements(
                glow::TRIANGLES,
                mesh.index_count() as i32,
                glow::UNSIGNED_INT,
                0,
            );

            for location in 0..3u32 {
                self.gl.disable_vertex_attrib_array(location);
            }
        }

        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameStatus> {
        // The windowing layer owns the context and performs the buffer swap
        unsafe {
            self.gl.flush();
        }
        self.frame_open = false;
        Ok(FrameStatus::Ready)
    }

    fn recreate_surface_state(&mut self, drawable_extent: (u32, u32)) -> Result<()> {
        // No swapchain to rebuild; the viewport picks up the new size
        self.drawable_extent = drawable_extent;
        engine_debug!(
            "pulsar3d::gl",
            "Viewport resized to {}x{}",
            drawable_extent.0,
            drawable_extent.1
        );
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gl.finish();
        }
        Ok(())
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_program(self.program);
        }
    }
}
