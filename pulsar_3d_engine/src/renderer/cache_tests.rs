//! Tests for AssetCache
//!
//! These tests use MockBackend to verify cache semantics without a GPU:
//! memoization, construction counters, recreation invalidation and the
//! binding-set pool bound.

use super::*;
use std::sync::Arc;
use crate::renderer::mock_backend::MockBackend;
use crate::renderer::{MeshData, PipelineSource, ShaderSource, TextureData, Vertex};

// ============================================================================
// Helper Functions
// ============================================================================

fn test_pipeline_source() -> PipelineSource {
    PipelineSource {
        vertex_shader: ShaderSource { words: vec![0x0723_0203] },
        fragment_shader: ShaderSource { words: vec![0x0723_0203] },
    }
}

fn test_mesh() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex { position: [0.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 0.0] },
            Vertex { position: [1.0, 0.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 0.0] },
            Vertex { position: [0.0, 1.0, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 1.0] },
        ],
        indices: vec![0, 1, 2],
    }
}

fn test_texture() -> TextureData {
    TextureData {
        width: 2,
        height: 2,
        channels: 4,
        pixels: vec![128u8; 16],
    }
}

/// Cache with one pipeline, one mesh, two textures registered
fn populated_cache() -> AssetCache {
    let mut cache = AssetCache::new();
    cache.register_pipeline("lit", test_pipeline_source());
    cache.register_mesh("tri", test_mesh()).unwrap();
    cache.register_texture("checker", test_texture()).unwrap();
    cache.register_texture("noise", test_texture()).unwrap();
    cache
}

// ============================================================================
// MEMOIZATION TESTS
// ============================================================================

#[test]
fn test_pipeline_lookup_is_idempotent() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    let first = cache.pipeline(&mut backend, "lit").unwrap();
    let second = cache.pipeline(&mut backend, "lit").unwrap();

    assert!(Arc::ptr_eq(&first, &second), "same key must return the same object");
    assert_eq!(cache.counters().pipelines_built, 1);
}

#[test]
fn test_mesh_and_texture_lookup_are_idempotent() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    let mesh_a = cache.mesh(&mut backend, "tri").unwrap();
    let mesh_b = cache.mesh(&mut backend, "tri").unwrap();
    let tex_a = cache.texture(&mut backend, "checker").unwrap();
    let tex_b = cache.texture(&mut backend, "checker").unwrap();

    assert!(Arc::ptr_eq(&mesh_a, &mesh_b));
    assert!(Arc::ptr_eq(&tex_a, &tex_b));
    assert_eq!(cache.counters().meshes_built, 1);
    assert_eq!(cache.counters().textures_built, 1);
}

#[test]
fn test_binding_set_memoized_per_pipeline_texture_pair() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    let set_a = cache.binding_set(&mut backend, "lit", "checker").unwrap();
    let set_b = cache.binding_set(&mut backend, "lit", "checker").unwrap();
    let set_other = cache.binding_set(&mut backend, "lit", "noise").unwrap();

    assert!(Arc::ptr_eq(&set_a, &set_b));
    assert!(!Arc::ptr_eq(&set_a, &set_other));
    assert_eq!(cache.counters().binding_sets_built, 2);
}

#[test]
fn test_binding_set_builds_dependencies_lazily() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    // Nothing built yet; the pair lookup pulls in pipeline and texture
    cache.binding_set(&mut backend, "lit", "checker").unwrap();

    let counters = cache.counters();
    assert_eq!(counters.pipelines_built, 1);
    assert_eq!(counters.textures_built, 1);
    assert_eq!(counters.binding_sets_built, 1);
}

// ============================================================================
// INVALIDATION TESTS
// ============================================================================

#[test]
fn test_invalidation_rebuilds_pipelines_keeps_assets() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    let pipeline_before = cache.pipeline(&mut backend, "lit").unwrap();
    let mesh_before = cache.mesh(&mut backend, "tri").unwrap();
    let texture_before = cache.texture(&mut backend, "checker").unwrap();
    cache.binding_set(&mut backend, "lit", "checker").unwrap();

    cache.invalidate_pipelines();
    assert_eq!(cache.pipeline_count(), 0);
    assert_eq!(cache.binding_set_count(), 0);
    assert_eq!(cache.mesh_count(), 1);
    assert_eq!(cache.texture_count(), 2);

    let pipeline_after = cache.pipeline(&mut backend, "lit").unwrap();
    let mesh_after = cache.mesh(&mut backend, "tri").unwrap();
    let texture_after = cache.texture(&mut backend, "checker").unwrap();

    // Pipelines are new instances, meshes/textures identity-stable
    assert!(!Arc::ptr_eq(&pipeline_before, &pipeline_after));
    assert!(Arc::ptr_eq(&mesh_before, &mesh_after));
    assert!(Arc::ptr_eq(&texture_before, &texture_after));

    let counters = cache.counters();
    assert_eq!(counters.pipelines_built, 2);
    assert_eq!(counters.meshes_built, 1);
    assert_eq!(counters.textures_built, 1);
}

#[test]
fn test_repeated_invalidation_does_not_accumulate_state() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    // Two recreations in a row without an intervening build
    cache.pipeline(&mut backend, "lit").unwrap();
    cache.invalidate_pipelines();
    cache.invalidate_pipelines();

    assert_eq!(cache.pipeline_count(), 0);
    assert_eq!(cache.binding_set_count(), 0);

    cache.pipeline(&mut backend, "lit").unwrap();
    assert_eq!(cache.pipeline_count(), 1);
}

#[test]
fn test_reregistering_mesh_drops_built_object() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = populated_cache();

    let before = cache.mesh(&mut backend, "tri").unwrap();
    cache.register_mesh("tri", test_mesh()).unwrap();
    let after = cache.mesh(&mut backend, "tri").unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(cache.counters().meshes_built, 2);
}

// ============================================================================
// FAILURE TESTS
// ============================================================================

#[test]
#[should_panic(expected = "never registered")]
fn test_unknown_key_fails_loudly() {
    let (mut backend, _state) = MockBackend::new(8);
    let mut cache = AssetCache::new();
    let _ = cache.mesh(&mut backend, "no_such_mesh");
}

#[test]
fn test_binding_set_pool_exhaustion_is_fatal() {
    let (mut backend, _state) = MockBackend::new(2);
    let mut cache = AssetCache::new();
    cache.register_pipeline("lit", test_pipeline_source());
    for key in ["a", "b", "c"] {
        cache.register_texture(key, test_texture()).unwrap();
    }

    cache.binding_set(&mut backend, "lit", "a").unwrap();
    cache.binding_set(&mut backend, "lit", "b").unwrap();
    let third = cache.binding_set(&mut backend, "lit", "c");

    match third {
        Err(crate::error::Error::PoolExhausted(_)) => {}
        other => panic!("expected PoolExhausted, got {:?}", other.map(|_| ())),
    }
}
