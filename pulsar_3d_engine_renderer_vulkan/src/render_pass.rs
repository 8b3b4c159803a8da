/// Render pass and frame targets - the attachment structure of a frame
///
/// One render pass with exactly three attachments (multisampled color,
/// multisampled depth, single-sample resolve), one subpass and one external
/// dependency. Frame targets bind those attachments per swapchain image:
/// a shared msaa color image, a shared depth image, and that image's view.
/// Both are destroyed and rebuilt whenever the swapchain is.

use std::sync::Arc;
use ash::vk;
use gpu_allocator::vulkan::Allocation;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::engine_error;

use crate::context::GpuContext;
use crate::swapchain::Swapchain;

/// Attachment indices; the subpass references below embed these values.
/// Reordering the attachment array without updating the references is a
/// silent rendering bug, which is why both sides use the same constants.
const COLOR_ATTACHMENT: u32 = 0;
const DEPTH_ATTACHMENT: u32 = 1;
const RESOLVE_ATTACHMENT: u32 = 2;

// ============================================================================
// Adapter capability checks (pure parts unit-tested)
// ============================================================================

/// Highest sample count supported by both color and depth, up to `ceiling`
///
/// Ranking 1 < 2 < 4 < 8; the ceiling defaults to 8 but is configurable
/// upward for adapters that support more.
pub(crate) fn pick_sample_count(
    supported: vk::SampleCountFlags,
    ceiling: u32,
) -> vk::SampleCountFlags {
    const RANKED: [(u32, vk::SampleCountFlags); 4] = [
        (8, vk::SampleCountFlags::TYPE_8),
        (4, vk::SampleCountFlags::TYPE_4),
        (2, vk::SampleCountFlags::TYPE_2),
        (1, vk::SampleCountFlags::TYPE_1),
    ];
    for (count, flag) in RANKED {
        if count <= ceiling && supported.contains(flag) {
            return flag;
        }
    }
    vk::SampleCountFlags::TYPE_1
}

/// Sample counts usable for both color and depth attachments
pub(crate) fn framebuffer_sample_counts(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts
}

/// The depth format this renderer requires, validated against the adapter
///
/// D32_SFLOAT with optimal-tiling depth attachment support. Unsupported is a
/// hard failure; silently substituting a different precision is not allowed.
pub(crate) fn require_depth_format(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<vk::Format> {
    let format = vk::Format::D32_SFLOAT;
    let properties =
        unsafe { instance.get_physical_device_format_properties(physical_device, format) };
    if properties
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    {
        Ok(format)
    } else {
        engine_error!(
            "pulsar3d::vulkan",
            "Adapter does not support D32_SFLOAT depth attachments"
        );
        Err(Error::InitializationFailed(
            "Required depth format D32_SFLOAT unsupported".to_string(),
        ))
    }
}

// ============================================================================
// Render pass
// ============================================================================

/// Vulkan render pass for the color + depth + resolve frame layout
pub struct RenderPass {
    device: ash::Device,
    pub(crate) handle: vk::RenderPass,
    pub(crate) samples: vk::SampleCountFlags,
    pub(crate) color_format: vk::Format,
    pub(crate) depth_format: vk::Format,
}

impl RenderPass {
    pub fn new(
        device: &ash::Device,
        color_format: vk::Format,
        depth_format: vk::Format,
        samples: vk::SampleCountFlags,
    ) -> Result<Self> {
        unsafe {
            let attachments = [
                // COLOR_ATTACHMENT: multisampled scene color
                vk::AttachmentDescription::default()
                    .format(color_format)
                    .samples(samples)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
                // DEPTH_ATTACHMENT: multisampled depth
                vk::AttachmentDescription::default()
                    .format(depth_format)
                    .samples(samples)
                    .load_op(vk::AttachmentLoadOp::CLEAR)
                    .store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
                // RESOLVE_ATTACHMENT: single-sample presentable resolve
                vk::AttachmentDescription::default()
                    .format(color_format)
                    .samples(vk::SampleCountFlags::TYPE_1)
                    .load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(vk::ImageLayout::UNDEFINED)
                    .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
            ];

            let color_refs = [vk::AttachmentReference {
                attachment: COLOR_ATTACHMENT,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            }];
            let depth_ref = vk::AttachmentReference {
                attachment: DEPTH_ATTACHMENT,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            };
            let resolve_refs = [vk::AttachmentReference {
                attachment: RESOLVE_ATTACHMENT,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            }];

            // Attachment array order must match the embedded reference indices
            debug_assert_eq!(attachments.len(), 3);
            debug_assert_eq!(color_refs[0].attachment as usize, 0);
            debug_assert_eq!(depth_ref.attachment as usize, 1);
            debug_assert_eq!(resolve_refs[0].attachment as usize, 2);

            let subpass = vk::SubpassDescription::default()
                .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                .color_attachments(&color_refs)
                .resolve_attachments(&resolve_refs)
                .depth_stencil_attachment(&depth_ref);

            let dependency = vk::SubpassDependency::default()
                .src_subpass(vk::SUBPASS_EXTERNAL)
                .dst_subpass(0)
                .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
                .dst_access_mask(
                    vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                );

            let subpasses = [subpass];
            let dependencies = [dependency];
            let create_info = vk::RenderPassCreateInfo::default()
                .attachments(&attachments)
                .subpasses(&subpasses)
                .dependencies(&dependencies);

            let handle = device.create_render_pass(&create_info, None).map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create render pass: {:?}", e);
                Error::InitializationFailed(format!("Failed to create render pass: {:?}", e))
            })?;

            Ok(Self {
                device: device.clone(),
                handle,
                samples,
                color_format,
                depth_format,
            })
        }
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_render_pass(self.handle, None);
        }
    }
}

// ============================================================================
// Frame targets
// ============================================================================

/// Per-swapchain-image framebuffers plus the shared msaa color/depth images
pub struct FrameTargets {
    ctx: Arc<GpuContext>,
    msaa_image: vk::Image,
    msaa_allocation: Option<Allocation>,
    msaa_view: vk::ImageView,
    depth_image: vk::Image,
    depth_allocation: Option<Allocation>,
    depth_view: vk::ImageView,
    pub(crate) framebuffers: Vec<vk::Framebuffer>,
}

impl FrameTargets {
    /// Build one frame target per realized swapchain image
    pub fn new(
        ctx: Arc<GpuContext>,
        render_pass: &RenderPass,
        swapchain: &Swapchain,
    ) -> Result<Self> {
        let extent = swapchain.extent();

        let (msaa_image, msaa_allocation) = ctx.create_image(
            "msaa color target",
            extent,
            render_pass.color_format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSIENT_ATTACHMENT,
            render_pass.samples,
        )?;
        let msaa_view = match Self::create_view(
            &ctx,
            msaa_image,
            render_pass.color_format,
            vk::ImageAspectFlags::COLOR,
        ) {
            Ok(view) => view,
            Err(e) => {
                Self::destroy_image(&ctx, msaa_image, Some(msaa_allocation));
                return Err(e);
            }
        };

        let (depth_image, depth_allocation) = match ctx.create_image(
            "depth target",
            extent,
            render_pass.depth_format,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            render_pass.samples,
        ) {
            Ok(pair) => pair,
            Err(e) => {
                unsafe { ctx.device.destroy_image_view(msaa_view, None) };
                Self::destroy_image(&ctx, msaa_image, Some(msaa_allocation));
                return Err(e);
            }
        };
        let depth_view = match Self::create_view(
            &ctx,
            depth_image,
            render_pass.depth_format,
            vk::ImageAspectFlags::DEPTH,
        ) {
            Ok(view) => view,
            Err(e) => {
                Self::destroy_image(&ctx, depth_image, Some(depth_allocation));
                unsafe { ctx.device.destroy_image_view(msaa_view, None) };
                Self::destroy_image(&ctx, msaa_image, Some(msaa_allocation));
                return Err(e);
            }
        };

        let mut targets = Self {
            ctx,
            msaa_image,
            msaa_allocation: Some(msaa_allocation),
            msaa_view,
            depth_image,
            depth_allocation: Some(depth_allocation),
            depth_view,
            framebuffers: Vec::with_capacity(swapchain.image_count()),
        };

        // One framebuffer per realized image, sized from the realized list
        for &swapchain_view in &swapchain.image_views {
            let attachments = [targets.msaa_view, targets.depth_view, swapchain_view];
            let framebuffer_info = vk::FramebufferCreateInfo::default()
                .render_pass(render_pass.handle)
                .attachments(&attachments)
                .width(extent.width)
                .height(extent.height)
                .layers(1);
            let framebuffer = unsafe {
                targets
                    .ctx
                    .device
                    .create_framebuffer(&framebuffer_info, None)
                    .map_err(|e| {
                        engine_error!("pulsar3d::vulkan", "Failed to create framebuffer: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create framebuffer: {:?}", e))
                    })
            };
            match framebuffer {
                Ok(framebuffer) => targets.framebuffers.push(framebuffer),
                // Partial state unwinds through Drop
                Err(e) => return Err(e),
            }
        }

        Ok(targets)
    }

    /// Number of frame targets; always equals the realized image count
    pub fn target_count(&self) -> usize {
        self.framebuffers.len()
    }

    fn create_view(
        ctx: &GpuContext,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        unsafe {
            ctx.device.create_image_view(&view_info, None).map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create attachment view: {:?}", e);
                Error::InitializationFailed(format!("Failed to create attachment view: {:?}", e))
            })
        }
    }

    fn destroy_image(ctx: &GpuContext, image: vk::Image, allocation: Option<Allocation>) {
        unsafe { ctx.device.destroy_image(image, None) };
        if let Some(allocation) = allocation {
            ctx.free(allocation);
        }
    }
}

impl Drop for FrameTargets {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
            self.ctx.device.destroy_image_view(self.depth_view, None);
            self.ctx.device.destroy_image(self.depth_image, None);
            if let Some(allocation) = self.depth_allocation.take() {
                self.ctx.free(allocation);
            }
            self.ctx.device.destroy_image_view(self.msaa_view, None);
            self.ctx.device.destroy_image(self.msaa_image, None);
            if let Some(allocation) = self.msaa_allocation.take() {
                self.ctx.free(allocation);
            }
        }
    }
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
