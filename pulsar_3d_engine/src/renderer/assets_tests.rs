//! Unit tests for assets.rs

use super::*;

// ============================================================================
// Helper Functions
// ============================================================================

/// Simple quad: 4 vertices, 6 indices
fn quad() -> MeshData {
    MeshData {
        vertices: vec![
            Vertex { position: [-0.5, -0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 0.0] },
            Vertex { position: [0.5, -0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 0.0] },
            Vertex { position: [0.5, 0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [1.0, 1.0] },
            Vertex { position: [-0.5, 0.5, 0.0], normal: [0.0, 0.0, 1.0], uv: [0.0, 1.0] },
        ],
        indices: vec![0, 1, 2, 2, 3, 0],
    }
}

// ============================================================================
// VERTEX LAYOUT TESTS
// ============================================================================

#[test]
fn test_vertex_is_tightly_packed() {
    // position (12) + normal (12) + uv (8), no padding
    assert_eq!(std::mem::size_of::<Vertex>(), 32);
}

#[test]
fn test_vertex_pod_cast() {
    let mesh = quad();
    let bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
    assert_eq!(bytes.len(), 4 * 32);
    // First float of the first position
    assert_eq!(&bytes[0..4], &(-0.5f32).to_ne_bytes());
}

// ============================================================================
// MESH VALIDATION TESTS
// ============================================================================

#[test]
fn test_mesh_validate_accepts_quad() {
    assert!(quad().validate().is_ok());
}

#[test]
fn test_mesh_validate_rejects_empty() {
    let mesh = MeshData { vertices: vec![], indices: vec![] };
    assert!(mesh.validate().is_err());
}

#[test]
fn test_mesh_validate_rejects_partial_triangle() {
    let mut mesh = quad();
    mesh.indices.pop();
    assert!(mesh.validate().is_err());
}

#[test]
fn test_mesh_validate_rejects_out_of_range_index() {
    let mut mesh = quad();
    mesh.indices[2] = 4; // only 4 vertices, max valid index is 3
    assert!(mesh.validate().is_err());
}

// ============================================================================
// TEXTURE VALIDATION TESTS
// ============================================================================

#[test]
fn test_texture_validate_accepts_rgba() {
    let tex = TextureData {
        width: 2,
        height: 2,
        channels: 4,
        pixels: vec![255u8; 16],
    };
    assert!(tex.validate().is_ok());
}

#[test]
fn test_texture_validate_rejects_zero_extent() {
    let tex = TextureData { width: 0, height: 2, channels: 4, pixels: vec![] };
    assert!(tex.validate().is_err());
}

#[test]
fn test_texture_validate_rejects_non_rgba() {
    let tex = TextureData {
        width: 2,
        height: 2,
        channels: 3,
        pixels: vec![255u8; 12],
    };
    assert!(tex.validate().is_err());
}

#[test]
fn test_texture_validate_rejects_short_buffer() {
    let tex = TextureData {
        width: 2,
        height: 2,
        channels: 4,
        pixels: vec![255u8; 15],
    };
    assert!(tex.validate().is_err());
}

// ============================================================================
// SPIR-V PARSING TESTS
// ============================================================================

#[test]
fn test_spirv_bytes_round_to_words() {
    // magic + version + generator + bound + schema
    let words = [0x0723_0203u32, 0x0001_0000, 0, 8, 0];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

    let shader = ShaderSource::from_spirv_bytes(&bytes).unwrap();
    assert_eq!(shader.words, words);
}

#[test]
fn test_spirv_bytes_rejects_unaligned_length() {
    let bytes = [0x03u8, 0x02, 0x23];
    assert!(ShaderSource::from_spirv_bytes(&bytes).is_err());
}

#[test]
fn test_spirv_bytes_rejects_empty() {
    assert!(ShaderSource::from_spirv_bytes(&[]).is_err());
}

#[test]
fn test_spirv_bytes_rejects_bad_magic() {
    let bytes = 0xdead_beefu32.to_le_bytes();
    assert!(ShaderSource::from_spirv_bytes(&bytes).is_err());
}
