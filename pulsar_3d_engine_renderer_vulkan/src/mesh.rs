/// Mesh - vertex and index buffers in GPU-local memory
///
/// Uploaded once through a staging buffer at load time, immutable thereafter.
/// Deliberately free of any swapchain-dependent state so recreation never
/// touches meshes.

use std::sync::Arc;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::{Mesh as RendererMesh, MeshData};

use crate::context::GpuContext;

/// Vulkan mesh implementation
pub struct VulkanMesh {
    ctx: Arc<GpuContext>,
    pub(crate) vertex_buffer: vk::Buffer,
    vertex_allocation: Option<Allocation>,
    pub(crate) index_buffer: vk::Buffer,
    index_allocation: Option<Allocation>,
    index_count: u32,
}

impl VulkanMesh {
    /// Upload mesh data to device-local buffers
    pub fn new(ctx: Arc<GpuContext>, data: &MeshData) -> Result<Self> {
        data.validate()?;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&data.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&data.indices);

        let (vertex_buffer, vertex_allocation) = Self::upload(
            &ctx,
            "mesh vertices",
            vertex_bytes,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let (index_buffer, index_allocation) = match Self::upload(
            &ctx,
            "mesh indices",
            index_bytes,
            vk::BufferUsageFlags::INDEX_BUFFER,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { ctx.device.destroy_buffer(vertex_buffer, None) };
                ctx.free(vertex_allocation);
                return Err(e);
            }
        };

        Ok(Self {
            ctx,
            vertex_buffer,
            vertex_allocation: Some(vertex_allocation),
            index_buffer,
            index_allocation: Some(index_allocation),
            index_count: data.indices.len() as u32,
        })
    }

    /// Stage bytes into a fresh device-local buffer
    fn upload(
        ctx: &GpuContext,
        name: &str,
        bytes: &[u8],
        usage: vk::BufferUsageFlags,
    ) -> Result<(vk::Buffer, Allocation)> {
        let size = bytes.len() as u64;

        let (staging_buffer, staging_allocation) = ctx.create_buffer(
            "staging",
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        let result = (|| {
            let mapped = staging_allocation
                .mapped_ptr()
                .ok_or_else(|| Error::BackendError("Staging buffer is not mapped".to_string()))?
                .as_ptr() as *mut u8;
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), mapped, bytes.len());
            }

            let (buffer, allocation) = ctx.create_buffer(
                name,
                size,
                usage | vk::BufferUsageFlags::TRANSFER_DST,
                MemoryLocation::GpuOnly,
            )?;

            let copy = ctx.submit_one_shot(|cmd| unsafe {
                let region = vk::BufferCopy::default().size(size);
                ctx.device
                    .cmd_copy_buffer(cmd, staging_buffer, buffer, &[region]);
            });
            match copy {
                Ok(()) => Ok((buffer, allocation)),
                Err(e) => {
                    unsafe { ctx.device.destroy_buffer(buffer, None) };
                    ctx.free(allocation);
                    Err(e)
                }
            }
        })();

        unsafe { ctx.device.destroy_buffer(staging_buffer, None) };
        ctx.free(staging_allocation);
        result
    }
}

impl RendererMesh for VulkanMesh {
    fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl Drop for VulkanMesh {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_buffer(self.index_buffer, None);
            if let Some(allocation) = self.index_allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_buffer(self.vertex_buffer, None);
            if let Some(allocation) = self.vertex_allocation.take() {
                self.ctx.free(allocation);
            }
        }
    }
}
