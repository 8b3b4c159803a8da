/// Texture - sampled image in GPU-local memory
///
/// Uploaded once via staging with the usual layout transitions
/// (UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY), then immutable. Owns its
/// view and sampler; none of it is swapchain-dependent.

use std::sync::Arc;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::{Texture as RendererTexture, TextureData};
use pulsar_3d_engine::engine_error;

use crate::context::GpuContext;

/// Vulkan texture implementation
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    image: vk::Image,
    allocation: Option<Allocation>,
    pub(crate) view: vk::ImageView,
    pub(crate) sampler: vk::Sampler,
    width: u32,
    height: u32,
}

impl VulkanTexture {
    /// Upload decoded RGBA8 pixels to a device-local sampled image
    pub fn new(ctx: Arc<GpuContext>, data: &TextureData) -> Result<Self> {
        data.validate()?;

        let extent = vk::Extent2D { width: data.width, height: data.height };
        let format = vk::Format::R8G8B8A8_UNORM;

        let (staging_buffer, staging_allocation) = ctx.create_buffer(
            "texture staging",
            data.pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )?;

        let result = (|| {
            let mapped = staging_allocation
                .mapped_ptr()
                .ok_or_else(|| Error::BackendError("Staging buffer is not mapped".to_string()))?
                .as_ptr() as *mut u8;
            unsafe {
                std::ptr::copy_nonoverlapping(data.pixels.as_ptr(), mapped, data.pixels.len());
            }

            let (image, allocation) = ctx.create_image(
                "texture",
                extent,
                format,
                vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
                vk::SampleCountFlags::TYPE_1,
            )?;

            let upload = ctx.submit_one_shot(|cmd| unsafe {
                let subresource = vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                };

                // UNDEFINED -> TRANSFER_DST
                let to_transfer = vk::ImageMemoryBarrier::default()
                    .old_layout(vk::ImageLayout::UNDEFINED)
                    .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(subresource)
                    .src_access_mask(vk::AccessFlags::empty())
                    .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);
                ctx.device.cmd_pipeline_barrier(
                    cmd,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_transfer],
                );

                let region = vk::BufferImageCopy::default()
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D {
                        width: extent.width,
                        height: extent.height,
                        depth: 1,
                    });
                ctx.device.cmd_copy_buffer_to_image(
                    cmd,
                    staging_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );

                // TRANSFER_DST -> SHADER_READ_ONLY
                let to_sampled = vk::ImageMemoryBarrier::default()
                    .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(subresource)
                    .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                    .dst_access_mask(vk::AccessFlags::SHADER_READ);
                ctx.device.cmd_pipeline_barrier(
                    cmd,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_sampled],
                );
            });
            match upload {
                Ok(()) => Ok((image, allocation)),
                Err(e) => {
                    unsafe { ctx.device.destroy_image(image, None) };
                    ctx.free(allocation);
                    Err(e)
                }
            }
        })();

        unsafe { ctx.device.destroy_buffer(staging_buffer, None) };
        ctx.free(staging_allocation);
        let (image, allocation) = result?;

        let view = unsafe {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            match ctx.device.create_image_view(&view_info, None) {
                Ok(view) => view,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    ctx.free(allocation);
                    engine_error!("pulsar3d::vulkan", "Failed to create texture view: {:?}", e);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create texture view: {:?}",
                        e
                    )));
                }
            }
        };

        let sampler = unsafe {
            let sampler_info = vk::SamplerCreateInfo::default()
                .mag_filter(vk::Filter::LINEAR)
                .min_filter(vk::Filter::LINEAR)
                .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
                .address_mode_u(vk::SamplerAddressMode::REPEAT)
                .address_mode_v(vk::SamplerAddressMode::REPEAT)
                .address_mode_w(vk::SamplerAddressMode::REPEAT);
            match ctx.device.create_sampler(&sampler_info, None) {
                Ok(sampler) => sampler,
                Err(e) => {
                    ctx.device.destroy_image_view(view, None);
                    ctx.device.destroy_image(image, None);
                    ctx.free(allocation);
                    engine_error!("pulsar3d::vulkan", "Failed to create sampler: {:?}", e);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create sampler: {:?}",
                        e
                    )));
                }
            }
        };

        Ok(Self {
            ctx,
            image,
            allocation: Some(allocation),
            view,
            sampler,
            width: data.width,
            height: data.height,
        })
    }
}

impl RendererTexture for VulkanTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
            self.ctx.device.destroy_image_view(self.view, None);
            self.ctx.device.destroy_image(self.image, None);
            if let Some(allocation) = self.allocation.take() {
                self.ctx.free(allocation);
            }
        }
    }
}
