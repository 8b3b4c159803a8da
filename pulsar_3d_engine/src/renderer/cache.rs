/// Asset cache - memoized pipelines, meshes, textures and binding sets
///
/// Sources are registered up front; GPU objects are built lazily through the
/// active backend's factory methods and memoized by key. Pipelines (and the
/// binding sets allocated from their pools) are invalidated whenever
/// swapchain-dependent state is recreated; meshes and textures survive.

use std::sync::Arc;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::engine_debug;
use super::assets::{MeshData, PipelineSource, TextureData};
use super::backend::{BindingSet, Mesh, Pipeline, RenderBackend, Texture};

/// Construction counters, one per asset type
///
/// Counts every build performed through the backend factories. Cache hits do
/// not increment; recreation-driven rebuilds do. Exposed for stats and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub pipelines_built: u64,
    pub meshes_built: u64,
    pub textures_built: u64,
    pub binding_sets_built: u64,
}

/// Memoizing cache over the backend factory methods
pub struct AssetCache {
    // Registered source data, retained across invalidation
    pipeline_sources: FxHashMap<String, PipelineSource>,
    mesh_sources: FxHashMap<String, MeshData>,
    texture_sources: FxHashMap<String, TextureData>,

    // Built GPU objects
    pipelines: FxHashMap<String, Arc<dyn Pipeline>>,
    meshes: FxHashMap<String, Arc<dyn Mesh>>,
    textures: FxHashMap<String, Arc<dyn Texture>>,
    binding_sets: FxHashMap<(String, String), Arc<dyn BindingSet>>,

    counters: CacheCounters,
}

impl AssetCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            pipeline_sources: FxHashMap::default(),
            mesh_sources: FxHashMap::default(),
            texture_sources: FxHashMap::default(),
            pipelines: FxHashMap::default(),
            meshes: FxHashMap::default(),
            textures: FxHashMap::default(),
            binding_sets: FxHashMap::default(),
            counters: CacheCounters::default(),
        }
    }

    // ===== SOURCE REGISTRATION =====

    /// Register a pipeline source under a stable key
    ///
    /// Re-registering an existing key replaces the source; the compiled
    /// pipeline (if any) is dropped and rebuilt on next use.
    pub fn register_pipeline(&mut self, key: &str, source: PipelineSource) {
        if self.pipeline_sources.insert(key.to_string(), source).is_some() {
            self.pipelines.remove(key);
            self.binding_sets.retain(|(pipeline, _), _| pipeline != key);
        }
    }

    /// Register mesh data under a stable key
    pub fn register_mesh(&mut self, key: &str, data: MeshData) -> Result<()> {
        data.validate()?;
        if self.mesh_sources.insert(key.to_string(), data).is_some() {
            self.meshes.remove(key);
        }
        Ok(())
    }

    /// Register texture data under a stable key
    pub fn register_texture(&mut self, key: &str, data: TextureData) -> Result<()> {
        data.validate()?;
        if self.texture_sources.insert(key.to_string(), data).is_some() {
            self.textures.remove(key);
            self.binding_sets.retain(|(_, texture), _| texture != key);
        }
        Ok(())
    }

    // ===== MEMOIZED LOOKUP =====

    /// Get or lazily build the pipeline for `key`
    ///
    /// Idempotent: a second call with the same key returns the same Arc
    /// without reconstruction.
    pub fn pipeline(
        &mut self,
        backend: &mut dyn RenderBackend,
        key: &str,
    ) -> Result<Arc<dyn Pipeline>> {
        if let Some(pipeline) = self.pipelines.get(key) {
            return Ok(Arc::clone(pipeline));
        }
        let built = {
            let source = self
                .pipeline_sources
                .get(key)
                .ok_or_else(|| Self::unknown_key("pipeline", key))?;
            backend.create_pipeline(source)?
        };
        self.counters.pipelines_built += 1;
        self.pipelines.insert(key.to_string(), Arc::clone(&built));
        Ok(built)
    }

    /// Get or lazily upload the mesh for `key`
    pub fn mesh(&mut self, backend: &mut dyn RenderBackend, key: &str) -> Result<Arc<dyn Mesh>> {
        if let Some(mesh) = self.meshes.get(key) {
            return Ok(Arc::clone(mesh));
        }
        let built = {
            let data = self
                .mesh_sources
                .get(key)
                .ok_or_else(|| Self::unknown_key("mesh", key))?;
            backend.create_mesh(data)?
        };
        self.counters.meshes_built += 1;
        self.meshes.insert(key.to_string(), Arc::clone(&built));
        Ok(built)
    }

    /// Get or lazily upload the texture for `key`
    pub fn texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        key: &str,
    ) -> Result<Arc<dyn Texture>> {
        if let Some(texture) = self.textures.get(key) {
            return Ok(Arc::clone(texture));
        }
        let built = {
            let data = self
                .texture_sources
                .get(key)
                .ok_or_else(|| Self::unknown_key("texture", key))?;
            backend.create_texture(data)?
        };
        self.counters.textures_built += 1;
        self.textures.insert(key.to_string(), Arc::clone(&built));
        Ok(built)
    }

    /// Get or lazily allocate the binding set for (pipeline, texture)
    ///
    /// Allocates from the pipeline's pool on first use of the pair; pool
    /// exhaustion propagates as the fatal `Error::PoolExhausted`.
    pub fn binding_set(
        &mut self,
        backend: &mut dyn RenderBackend,
        pipeline_key: &str,
        texture_key: &str,
    ) -> Result<Arc<dyn BindingSet>> {
        let pair = (pipeline_key.to_string(), texture_key.to_string());
        if let Some(set) = self.binding_sets.get(&pair) {
            return Ok(Arc::clone(set));
        }
        let pipeline = self.pipeline(backend, pipeline_key)?;
        let texture = self.texture(backend, texture_key)?;
        let built = backend.create_binding_set(&pipeline, &texture)?;
        self.counters.binding_sets_built += 1;
        self.binding_sets.insert(pair, Arc::clone(&built));
        Ok(built)
    }

    // ===== INVALIDATION =====

    /// Drop compiled pipelines and their binding sets
    ///
    /// Called after every swapchain-dependent recreation: pipelines reference
    /// the recreated render pass and must be rebuilt; binding sets live in
    /// pipeline-owned pools and fall with them. Meshes, textures and all
    /// registered sources are retained.
    pub fn invalidate_pipelines(&mut self) {
        let dropped_pipelines = self.pipelines.len();
        let dropped_sets = self.binding_sets.len();
        self.pipelines.clear();
        self.binding_sets.clear();
        engine_debug!(
            "pulsar3d::AssetCache",
            "Invalidated {} pipelines and {} binding sets; {} meshes and {} textures retained",
            dropped_pipelines,
            dropped_sets,
            self.meshes.len(),
            self.textures.len()
        );
    }

    // ===== INSPECTION =====

    /// Construction counters per asset type
    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Number of currently compiled pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Number of currently uploaded meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of currently uploaded textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of currently allocated binding sets
    pub fn binding_set_count(&self) -> usize {
        self.binding_sets.len()
    }

    fn unknown_key(kind: &str, key: &str) -> Error {
        // An unregistered key is a caller bug, not a runtime condition
        debug_assert!(false, "{} key '{}' was never registered", kind, key);
        crate::engine_error!(
            "pulsar3d::AssetCache",
            "{} key '{}' was never registered",
            kind,
            key
        );
        Error::InvalidResource(format!("{} key '{}' was never registered", kind, key))
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
