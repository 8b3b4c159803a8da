/// VulkanBackend - the explicit-API implementation of RenderBackend
///
/// Owns the full object-dependency chain: entry -> instance -> surface ->
/// adapter -> device -> allocator -> swapchain -> render pass -> frame
/// targets -> frame flight. The swapchain-dependent tail lives in
/// SurfaceState so the recreation protocol can replace it wholesale while
/// the device, surface and uploaded assets stay put. Teardown runs in strict
/// reverse-dependency order, partly by field declaration order and partly by
/// the explicit steps in Drop.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use pulsar_3d_engine::glam::Mat4;
use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::{
    BindingSet as RendererBindingSet, Config, FrameStatus, Mesh as RendererMesh,
    MeshData, Pipeline as RendererPipeline, PipelineSource, RenderBackend,
    Texture as RendererTexture, TextureData,
};
use pulsar_3d_engine::{engine_debug, engine_err, engine_error, engine_info, engine_warn};

use crate::context::GpuContext;
#[cfg(feature = "vulkan-validation")]
use crate::debug::DebugMessenger;
use crate::device::DeviceContext;
use crate::frame::FrameFlight;
use crate::mesh::VulkanMesh;
use crate::pipeline::{VulkanBindingSet, VulkanPipeline};
use crate::render_pass::{
    framebuffer_sample_counts, pick_sample_count, require_depth_format, FrameTargets, RenderPass,
};
use crate::surface::Surface;
use crate::swapchain::Swapchain;
use crate::texture::VulkanTexture;

/// Everything that dies with the swapchain
///
/// Field order is the teardown order: frame flight, then frame targets, then
/// the render pass, then the swapchain itself.
struct SurfaceState {
    frame: FrameFlight,
    targets: FrameTargets,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

impl SurfaceState {
    fn new(
        ctx: &Arc<GpuContext>,
        device_ctx: &DeviceContext,
        surface: &Surface,
        drawable_extent: (u32, u32),
        sample_ceiling: u32,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let swapchain = Swapchain::new(device_ctx, surface, drawable_extent, old_swapchain)?;
        let depth_format = require_depth_format(&device_ctx.instance, device_ctx.physical_device)?;
        let samples =
            pick_sample_count(framebuffer_sample_counts(&device_ctx.limits), sample_ceiling);
        let render_pass =
            RenderPass::new(&device_ctx.device, swapchain.format(), depth_format, samples)?;
        let targets = FrameTargets::new(Arc::clone(ctx), &render_pass, &swapchain)?;
        let frame = FrameFlight::new(
            &device_ctx.device,
            device_ctx.families.graphics,
            swapchain.image_count(),
        )?;

        // One view and one frame target per realized image, always
        debug_assert_eq!(swapchain.image_count(), targets.target_count());

        Ok(Self {
            frame,
            targets,
            render_pass,
            swapchain,
        })
    }
}

/// Groups the core objects so early-return paths drop them in a safe order
/// (surface and messenger before the device context that owns the instance)
struct CoreObjects {
    #[cfg(feature = "vulkan-validation")]
    debug: Option<DebugMessenger>,
    surface: Surface,
    device_ctx: DeviceContext,
}

/// Vulkan render backend
pub struct VulkanBackend {
    /// Swapchain-dependent tail; replaced wholesale on recreation.
    /// ManuallyDrop so Drop can retire it before releasing the allocator.
    surface_state: ManuallyDrop<SurfaceState>,
    /// Shared with meshes, textures and pipelines
    ctx: Arc<GpuContext>,
    #[cfg(feature = "vulkan-validation")]
    debug: Option<DebugMessenger>,
    surface: Surface,
    device_ctx: DeviceContext,

    // Configuration captured at construction
    acquire_timeout_ns: u64,
    binding_set_capacity: u32,
    sample_ceiling: u32,
}

impl VulkanBackend {
    /// Build the full backend, or fail leaving nothing behind
    ///
    /// Every stage of the dependency chain is fallible; a failure at any
    /// stage unwinds the already-created prefix and propagates a typed error
    /// for the facade's fallback decision.
    pub fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        drawable_extent: (u32, u32),
        config: &Config,
    ) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            engine_error!("pulsar3d::vulkan", "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        let instance = DeviceContext::create_instance(&entry, display, config)?;

        #[cfg(feature = "vulkan-validation")]
        let debug = if config.enable_validation {
            match DebugMessenger::new(&entry, &instance) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    engine_warn!("pulsar3d::vulkan", "Continuing without validation: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let surface = match Surface::new(&entry, &instance, display, window) {
            Ok(surface) => surface,
            Err(e) => {
                #[cfg(feature = "vulkan-validation")]
                drop(debug);
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        let (physical_device, families) = match DeviceContext::select_adapter(&instance, &surface)
        {
            Ok(found) => found,
            Err(e) => {
                drop(surface);
                #[cfg(feature = "vulkan-validation")]
                drop(debug);
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        // From here CoreObjects' field order keeps unwinding safe
        let core = CoreObjects {
            #[cfg(feature = "vulkan-validation")]
            debug,
            surface,
            device_ctx: DeviceContext::new(entry, instance, physical_device, families)?,
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: core.device_ctx.instance.clone(),
            device: core.device_ctx.device.clone(),
            physical_device: core.device_ctx.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        })
        .map_err(|e| {
            engine_error!("pulsar3d::vulkan", "Failed to create GPU allocator: {:?}", e);
            Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
        })?;

        let upload_pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(core.device_ctx.families.graphics)
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            );
        let upload_command_pool = unsafe {
            core.device_ctx
                .device
                .create_command_pool(&upload_pool_info, None)
                .map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create upload command pool: {:?}",
                        e
                    ))
                })?
        };

        let mut ctx = Arc::new(GpuContext::new(
            core.device_ctx.device.clone(),
            Arc::new(Mutex::new(allocator)),
            core.device_ctx.graphics_queue,
            core.device_ctx.families.graphics,
            upload_command_pool,
        ));

        let surface_state = match SurfaceState::new(
            &ctx,
            &core.device_ctx,
            &core.surface,
            drawable_extent,
            config.sample_count_ceiling,
            None,
        ) {
            Ok(state) => state,
            Err(e) => {
                unsafe {
                    core.device_ctx.device.destroy_command_pool(upload_command_pool, None);
                    if let Some(ctx_mut) = Arc::get_mut(&mut ctx) {
                        ManuallyDrop::drop(&mut ctx_mut.allocator);
                    }
                }
                return Err(e);
            }
        };

        engine_info!(
            "pulsar3d::vulkan",
            "Backend ready: {} swapchain images, {:?} samples",
            surface_state.swapchain.image_count(),
            surface_state.render_pass.samples
        );

        let CoreObjects {
            #[cfg(feature = "vulkan-validation")]
            debug,
            surface,
            device_ctx,
        } = core;

        Ok(Self {
            surface_state: ManuallyDrop::new(surface_state),
            ctx,
            #[cfg(feature = "vulkan-validation")]
            debug,
            surface,
            device_ctx,
            acquire_timeout_ns: config.acquire_timeout_ns,
            binding_set_capacity: config.max_binding_sets,
            sample_ceiling: config.sample_count_ceiling,
        })
    }

    /// Realized swapchain image count (for tests and stats)
    pub fn image_count(&self) -> usize {
        self.surface_state.swapchain.image_count()
    }

    /// Current frame target count; always equals the image count
    pub fn frame_target_count(&self) -> usize {
        self.surface_state.targets.target_count()
    }
}

impl RenderBackend for VulkanBackend {
    fn name(&self) -> &'static str {
        "vulkan"
    }

    fn create_pipeline(&mut self, source: &PipelineSource) -> Result<Arc<dyn RendererPipeline>> {
        let pipeline = VulkanPipeline::new(
            Arc::clone(&self.ctx),
            &self.surface_state.render_pass,
            source,
            self.binding_set_capacity,
        )?;
        Ok(Arc::new(pipeline))
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Arc<dyn RendererMesh>> {
        Ok(Arc::new(VulkanMesh::new(Arc::clone(&self.ctx), data)?))
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<Arc<dyn RendererTexture>> {
        Ok(Arc::new(VulkanTexture::new(Arc::clone(&self.ctx), data)?))
    }

    fn create_binding_set(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        texture: &Arc<dyn RendererTexture>,
    ) -> Result<Arc<dyn RendererBindingSet>> {
        // Downcast at the trait seam; only this backend hands these Arcs out
        let pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const VulkanPipeline) };
        let texture = unsafe { &*(Arc::as_ptr(texture) as *const VulkanTexture) };

        let set = pipeline.allocate_binding_set(texture.view, texture.sampler)?;
        Ok(Arc::new(VulkanBindingSet { set }))
    }

    fn begin_frame(&mut self) -> Result<FrameStatus> {
        let state = &mut *self.surface_state;
        let (status, image_index) = state
            .frame
            .acquire(&state.swapchain, self.acquire_timeout_ns)?;
        let image_index = match (status, image_index) {
            (FrameStatus::Ready, Some(index)) => index,
            _ => return Ok(FrameStatus::SurfaceOutOfDate),
        };

        unsafe {
            let device = &self.ctx.device;
            let command_buffer = state.frame.current_command_buffer()?;

            // The pool's RESET flag makes begin an implicit reset
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to begin recording: {:?}", e))?;

            let extent = state.swapchain.extent();
            let clear_values = [
                vk::ClearValue {
                    color: vk::ClearColorValue { float32: [0.05, 0.05, 0.08, 1.0] },
                },
                vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
                },
                vk::ClearValue {
                    color: vk::ClearColorValue { float32: [0.0, 0.0, 0.0, 1.0] },
                },
            ];
            let pass_info = vk::RenderPassBeginInfo::default()
                .render_pass(state.render_pass.handle)
                .framebuffer(state.targets.framebuffers[image_index as usize])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(command_buffer, &pass_info, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            device.cmd_set_scissor(
                command_buffer,
                0,
                &[vk::Rect2D { offset: vk::Offset2D { x: 0, y: 0 }, extent }],
            );
        }

        Ok(FrameStatus::Ready)
    }

    fn draw(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        mesh: &Arc<dyn RendererMesh>,
        binding_set: &Arc<dyn RendererBindingSet>,
        transform: &Mat4,
    ) -> Result<()> {
        let command_buffer = self.surface_state.frame.current_command_buffer()?;

        let pipeline = unsafe { &*(Arc::as_ptr(pipeline) as *const VulkanPipeline) };
        let vk_mesh = unsafe { &*(Arc::as_ptr(mesh) as *const VulkanMesh) };
        let set = unsafe { &*(Arc::as_ptr(binding_set) as *const VulkanBindingSet) };

        unsafe {
            let device = &self.ctx.device;
            device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.handle,
            );
            device.cmd_push_constants(
                command_buffer,
                pipeline.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::bytes_of(transform),
            );
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vk_mesh.vertex_buffer], &[0]);
            device.cmd_bind_index_buffer(
                command_buffer,
                vk_mesh.index_buffer,
                0,
                vk::IndexType::UINT32,
            );
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                0,
                &[set.set],
                &[],
            );
            device.cmd_draw_indexed(command_buffer, mesh.index_count(), 1, 0, 0, 0);
        }

        Ok(())
    }

    fn end_frame(&mut self) -> Result<FrameStatus> {
        let state = &mut *self.surface_state;
        let command_buffer = state.frame.current_command_buffer()?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(command_buffer);
            self.ctx
                .device
                .end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to end recording: {:?}", e))?;
        }

        state.frame.submit_and_present(
            &state.swapchain,
            self.ctx.graphics_queue,
            self.device_ctx.present_queue,
        )
    }

    fn recreate_surface_state(&mut self, drawable_extent: (u32, u32)) -> Result<()> {
        unsafe {
            self.device_ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Wait idle before recreate failed: {:?}", e))?;
        }
        self.surface_state.frame.abandon();

        // The old swapchain seeds the new one, then the old tail is torn down
        // frame flight -> frame targets -> render pass -> swapchain
        let new_state = SurfaceState::new(
            &self.ctx,
            &self.device_ctx,
            &self.surface,
            drawable_extent,
            self.sample_ceiling,
            Some(self.surface_state.swapchain.handle),
        )?;
        let old_state = std::mem::replace(&mut *self.surface_state, new_state);
        drop(old_state);

        engine_debug!(
            "pulsar3d::vulkan",
            "Surface state rebuilt at {}x{} with {} images",
            drawable_extent.0,
            drawable_extent.1,
            self.surface_state.swapchain.image_count()
        );
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device_ctx
                .device
                .device_wait_idle()
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Wait idle failed: {:?}", e))
        }
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        unsafe {
            self.device_ctx.device.device_wait_idle().ok();

            // 1. Retire the swapchain-dependent tail while the device lives
            ManuallyDrop::drop(&mut self.surface_state);

            // 2. Destroy the upload command pool
            if let Ok(mut pool) = self.ctx.upload_command_pool.lock() {
                if *pool != vk::CommandPool::null() {
                    self.device_ctx.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 3. Release the allocator's device memory before the device dies.
            //    All resource Arcs must be gone by now; the facade drops its
            //    cache before the backend.
            match Arc::get_mut(&mut self.ctx) {
                Some(ctx) => ManuallyDrop::drop(&mut ctx.allocator),
                None => {
                    engine_warn!(
                        "pulsar3d::vulkan",
                        "GPU resources still referenced at shutdown; allocator leaked"
                    );
                }
            }

            // 4. Remaining fields drop in declaration order:
            //    ctx, debug messenger, surface, then the device context
            //    (device -> instance -> loader entry)
        }
    }
}
