/// Asset source data - the plain-buffer contract with the asset-loading layer
///
/// The engine performs no file parsing. Model and image loaders hand it plain
/// vertex/index/pixel buffers plus pre-compiled shader words; these types are
/// what the loaders produce and what backends upload.

use bytemuck::{Pod, Zeroable};
use crate::error::Result;
use crate::engine_bail;

/// One vertex as submitted by the asset-loading layer
///
/// Interleaved position / normal / texture-coordinate layout, tightly packed.
/// Backends rely on this exact layout for their vertex input descriptions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side mesh data: vertices plus a triangle index list
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Check the mesh describes whole triangles over valid vertex indices
    pub fn validate(&self) -> Result<()> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            engine_bail!("pulsar3d::assets", "Mesh has no vertices or no indices");
        }
        if self.indices.len() % 3 != 0 {
            engine_bail!(
                "pulsar3d::assets",
                "Mesh index count {} is not a multiple of 3",
                self.indices.len()
            );
        }
        let vertex_count = self.vertices.len() as u32;
        if let Some(&out_of_range) = self.indices.iter().find(|&&i| i >= vertex_count) {
            engine_bail!(
                "pulsar3d::assets",
                "Mesh index {} out of range ({} vertices)",
                out_of_range,
                vertex_count
            );
        }
        Ok(())
    }
}

/// CPU-side decoded image data
///
/// `pixels` holds `width * height * channels` bytes, row-major, no padding.
/// Backends currently require 4 channels (RGBA8); loaders expand 3-channel
/// images before submission.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Check dimensions, channel count and byte length agree
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            engine_bail!("pulsar3d::assets", "Texture has zero extent");
        }
        if self.channels != 4 {
            engine_bail!(
                "pulsar3d::assets",
                "Texture has {} channels; backends require 4 (RGBA)",
                self.channels
            );
        }
        let expected = (self.width * self.height * self.channels) as usize;
        if self.pixels.len() != expected {
            engine_bail!(
                "pulsar3d::assets",
                "Texture pixel buffer is {} bytes, expected {}",
                self.pixels.len(),
                expected
            );
        }
        Ok(())
    }
}

/// Compiled shader words (SPIR-V)
///
/// The legacy backend ignores these and uses its fixed built-in program.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub words: Vec<u32>,
}

/// SPIR-V magic number, first word of every module
const SPIRV_MAGIC: u32 = 0x0723_0203;

impl ShaderSource {
    /// Build from raw little-endian SPIR-V bytes (e.g. a `.spv` file's contents)
    pub fn from_spirv_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            engine_bail!(
                "pulsar3d::assets",
                "SPIR-V byte length {} is not a positive multiple of 4",
                bytes.len()
            );
        }
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if words[0] != SPIRV_MAGIC {
            engine_bail!(
                "pulsar3d::assets",
                "SPIR-V magic mismatch: got {:#010x}",
                words[0]
            );
        }
        Ok(Self { words })
    }
}

/// Source description of one draw pipeline
#[derive(Debug, Clone)]
pub struct PipelineSource {
    pub vertex_shader: ShaderSource,
    pub fragment_shader: ShaderSource,
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod tests;
