/// Mock backend for unit tests (no GPU required)
///
/// Implements the RenderBackend contract over shared in-memory state so
/// facade and cache semantics can be verified without a device: construction
/// counts, recorded frame events, scripted acquire/present outcomes and a
/// bounded binding-set pool per pipeline.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use super::assets::{MeshData, PipelineSource, TextureData};
use super::backend::{BindingSet, FrameStatus, Mesh, Pipeline, RenderBackend, Texture};

// ============================================================================
// Mock resources
// ============================================================================

#[derive(Debug)]
pub struct MockPipeline {
    pub id: u64,
}

impl Pipeline for MockPipeline {}

#[derive(Debug)]
pub struct MockMesh {
    pub id: u64,
    pub index_count: u32,
}

impl Mesh for MockMesh {
    fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
}

impl Texture for MockTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug)]
pub struct MockBindingSet {
    pub pipeline_id: u64,
    pub texture_id: u64,
}

impl BindingSet for MockBindingSet {}

// ============================================================================
// Shared observable state
// ============================================================================

/// State shared between a MockBackend (moved into the facade) and the test
#[derive(Default)]
pub struct MockState {
    /// Ordered record of frame operations ("begin", "draw ...", "end", ...)
    pub events: Vec<String>,
    /// Total constructions per resource type
    pub pipelines_created: u64,
    pub meshes_created: u64,
    pub textures_created: u64,
    pub binding_sets_created: u64,
    /// Number of surface-state recreations performed
    pub recreates: u64,
    /// Scripted outcomes for the next acquires; empty means Ready
    pub acquire_script: VecDeque<FrameStatus>,
    /// Scripted outcomes for the next presents; empty means Ready
    pub present_script: VecDeque<FrameStatus>,
    /// When set, the next begin_frame fails fatally with this message
    pub fatal_begin: Option<String>,
}

/// Mock RenderBackend recording into a shared MockState
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    next_id: u64,
    /// Binding sets allocated per live pipeline, against the configured bound
    sets_per_pipeline: FxHashMap<u64, u32>,
    max_binding_sets: u32,
}

impl MockBackend {
    /// Create a mock backend plus the handle tests observe it through
    pub fn new(max_binding_sets: u32) -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
                next_id: 0,
                sets_per_pipeline: FxHashMap::default(),
                max_binding_sets,
            },
            state,
        )
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn create_pipeline(&mut self, _source: &PipelineSource) -> Result<Arc<dyn Pipeline>> {
        let id = self.fresh_id();
        let mut state = self.state.lock().unwrap();
        state.pipelines_created += 1;
        state.events.push(format!("create_pipeline#{}", id));
        self.sets_per_pipeline.insert(id, 0);
        Ok(Arc::new(MockPipeline { id }))
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<dyn Mesh>> {
        let id = self.fresh_id();
        let mut state = self.state.lock().unwrap();
        state.meshes_created += 1;
        state.events.push(format!("create_mesh#{}", id));
        Ok(Arc::new(MockMesh {
            id,
            index_count: data.indices.len() as u32,
        }))
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<Arc<dyn Texture>> {
        let id = self.fresh_id();
        let mut state = self.state.lock().unwrap();
        state.textures_created += 1;
        state.events.push(format!("create_texture#{}", id));
        Ok(Arc::new(MockTexture {
            id,
            width: data.width,
            height: data.height,
        }))
    }

    fn create_binding_set(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        texture: &Arc<dyn Texture>,
    ) -> Result<Arc<dyn BindingSet>> {
        // Downcast to reach the mock identity (backend-internal trait seam)
        let pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const MockPipeline) };
        let texture = unsafe { &*(Arc::as_ptr(texture) as *const MockTexture) };

        let allocated = self.sets_per_pipeline.entry(pipeline.id).or_insert(0);
        if *allocated >= self.max_binding_sets {
            return Err(Error::PoolExhausted(format!(
                "binding sets ({}) for pipeline#{}",
                self.max_binding_sets, pipeline.id
            )));
        }
        *allocated += 1;

        let mut state = self.state.lock().unwrap();
        state.binding_sets_created += 1;
        state
            .events
            .push(format!("create_binding_set p#{} t#{}", pipeline.id, texture.id));
        Ok(Arc::new(MockBindingSet {
            pipeline_id: pipeline.id,
            texture_id: texture.id,
        }))
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fatal_begin.take() {
            state.events.push("begin:fatal".to_string());
            return Err(Error::BackendError(message));
        }
        let status = state.acquire_script.pop_front().unwrap_or(FrameStatus::Ready);
        state.events.push(match status {
            FrameStatus::Ready => "begin".to_string(),
            FrameStatus::SurfaceOutOfDate => "begin:out_of_date".to_string(),
        });
        Ok(status)
    }

    fn draw(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        mesh: &Arc<dyn Mesh>,
        binding_set: &Arc<dyn BindingSet>,
        _transform: &Mat4,
    ) -> Result<()> {
        let pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const MockPipeline) };
        let mesh = unsafe { &*(Arc::as_ptr(mesh) as *const MockMesh) };
        let set = unsafe { &*(Arc::as_ptr(binding_set) as *const MockBindingSet) };
        self.state.lock().unwrap().events.push(format!(
            "draw p#{} m#{} bs(p#{},t#{}) indices={}",
            pipeline.id, mesh.id, set.pipeline_id, set.texture_id, mesh.index_count
        ));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameStatus> {
        let mut state = self.state.lock().unwrap();
        let status = state.present_script.pop_front().unwrap_or(FrameStatus::Ready);
        state.events.push(match status {
            FrameStatus::Ready => "end".to_string(),
            FrameStatus::SurfaceOutOfDate => "end:out_of_date".to_string(),
        });
        Ok(status)
    }

    fn recreate_surface_state(&mut self, drawable_extent: (u32, u32)) -> Result<()> {
        // Pipelines (and their pools) are invalidated by the facade after this
        self.sets_per_pipeline.clear();
        let mut state = self.state.lock().unwrap();
        state.recreates += 1;
        state.events.push(format!(
            "recreate {}x{}",
            drawable_extent.0, drawable_extent.1
        ));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(())
    }
}
