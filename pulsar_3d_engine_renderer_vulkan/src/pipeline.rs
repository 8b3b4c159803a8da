/// Pipeline - compiled graphics state plus its private binding-set pool
///
/// Immutable once built. Referencing the render pass handle makes every
/// pipeline swapchain-dependent in one direction only: recreation invalidates
/// pipelines, but meshes and textures never reference pass state and survive.
/// Each pipeline owns the descriptor pool its binding sets are allocated
/// from, so destroying the pipeline frees all of its sets en masse.

use std::sync::{Arc, Mutex};
use ash::vk;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::{
    BindingSet as RendererBindingSet, Pipeline as RendererPipeline, PipelineSource, Vertex,
};
use pulsar_3d_engine::{engine_err, engine_error};

use crate::context::GpuContext;
use crate::render_pass::RenderPass;

/// Push-constant block: one column-major Mat4 per draw
pub(crate) const PUSH_CONSTANT_SIZE: u32 = 64;

/// Vulkan pipeline implementation
pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) handle: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    descriptor_set_layout: vk::DescriptorSetLayout,
    /// Private pool for this pipeline's binding sets; no FREE flag - sets are
    /// reclaimed only by destroying the pool with the pipeline
    descriptor_pool: vk::DescriptorPool,
    /// Configured upper bound on distinct binding sets
    capacity: u32,
    /// Sets handed out so far (interior mutability: pipelines are shared)
    allocated: Mutex<u32>,
}

impl VulkanPipeline {
    pub fn new(
        ctx: Arc<GpuContext>,
        render_pass: &RenderPass,
        source: &PipelineSource,
        binding_set_capacity: u32,
    ) -> Result<Self> {
        unsafe {
            let device = &ctx.device;

            let vertex_module = Self::create_shader_module(device, &source.vertex_shader.words)?;
            let fragment_module =
                match Self::create_shader_module(device, &source.fragment_shader.words) {
                    Ok(module) => module,
                    Err(e) => {
                        device.destroy_shader_module(vertex_module, None);
                        return Err(e);
                    }
                };

            let result = Self::build(
                &ctx,
                render_pass,
                vertex_module,
                fragment_module,
                binding_set_capacity,
            );

            // Modules are compiled into the pipeline; they are not needed after
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);

            result
        }
    }

    unsafe fn build(
        ctx: &Arc<GpuContext>,
        render_pass: &RenderPass,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
        binding_set_capacity: u32,
    ) -> Result<Self> {
        let device = &ctx.device;

        // One combined image sampler at binding 0 - the texture slot
        let bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)];
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        let descriptor_set_layout = device
            .create_descriptor_set_layout(&layout_info, None)
            .map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create set layout: {:?}", e);
                Error::InitializationFailed(format!("Failed to create set layout: {:?}", e))
            })?;

        let push_constant_ranges = [vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX)
            .offset(0)
            .size(PUSH_CONSTANT_SIZE)];
        let set_layouts = [descriptor_set_layout];
        let pipeline_layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        let layout = match device.create_pipeline_layout(&pipeline_layout_info, None) {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                engine_error!("pulsar3d::vulkan", "Failed to create pipeline layout: {:?}", e);
                return Err(Error::InitializationFailed(format!(
                    "Failed to create pipeline layout: {:?}",
                    e
                )));
            }
        };

        let stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main"),
        ];

        // Vertex layout mirrors assets::Vertex exactly
        let vertex_bindings = [vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }];
        let vertex_attributes = [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
            vk::VertexInputAttributeDescription {
                location: 2,
                binding: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: 24,
            },
        ];
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);

        // Viewport and scissor are dynamic so pipelines survive resizes
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);

        let multisample = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(render_pass.samples);

        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass.handle)
            .subpass(0);

        let handle = match device.create_graphics_pipelines(
            vk::PipelineCache::null(),
            &[pipeline_info],
            None,
        ) {
            Ok(pipelines) => pipelines[0],
            Err((_, e)) => {
                device.destroy_pipeline_layout(layout, None);
                device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                engine_error!("pulsar3d::vulkan", "Failed to create graphics pipeline: {:?}", e);
                return Err(Error::InitializationFailed(format!(
                    "Failed to create graphics pipeline: {:?}",
                    e
                )));
            }
        };

        // Private pool sized exactly to the configured bound
        let pool_sizes = [vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: binding_set_capacity,
        }];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(binding_set_capacity);
        let descriptor_pool = match device.create_descriptor_pool(&pool_info, None) {
            Ok(pool) => pool,
            Err(e) => {
                device.destroy_pipeline(handle, None);
                device.destroy_pipeline_layout(layout, None);
                device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                engine_error!("pulsar3d::vulkan", "Failed to create descriptor pool: {:?}", e);
                return Err(Error::InitializationFailed(format!(
                    "Failed to create descriptor pool: {:?}",
                    e
                )));
            }
        };

        Ok(Self {
            ctx: Arc::clone(ctx),
            handle,
            layout,
            descriptor_set_layout,
            descriptor_pool,
            capacity: binding_set_capacity,
            allocated: Mutex::new(0),
        })
    }

    /// Allocate one binding set from this pipeline's pool
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` once the configured capacity is reached; this
    /// is a fatal configuration error, not a silent drop.
    pub(crate) fn allocate_binding_set(
        &self,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Result<vk::DescriptorSet> {
        unsafe {
            {
                let mut allocated = self
                    .allocated
                    .lock()
                    .map_err(|_| Error::BackendError("Binding count lock poisoned".to_string()))?;
                if *allocated >= self.capacity {
                    engine_error!(
                        "pulsar3d::vulkan",
                        "Binding-set pool exhausted at {} sets; raise max_binding_sets",
                        self.capacity
                    );
                    return Err(Error::PoolExhausted(format!(
                        "binding sets ({})",
                        self.capacity
                    )));
                }
                *allocated += 1;
            }

            let set_layouts = [self.descriptor_set_layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(self.descriptor_pool)
                .set_layouts(&set_layouts);
            let set = self
                .ctx
                .device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to allocate binding set: {:?}", e))?[0];

            let image_info = [vk::DescriptorImageInfo {
                sampler,
                image_view: view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let writes = [vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)];
            self.ctx.device.update_descriptor_sets(&writes, &[]);

            Ok(set)
        }
    }
}

impl RendererPipeline for VulkanPipeline {}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            // The pool reclaims every binding set allocated from it
            self.ctx.device.destroy_descriptor_pool(self.descriptor_pool, None);
            self.ctx.device.destroy_pipeline(self.handle, None);
            self.ctx.device.destroy_pipeline_layout(self.layout, None);
            self.ctx
                .device
                .destroy_descriptor_set_layout(self.descriptor_set_layout, None);
        }
    }
}

/// Vulkan binding set implementation
///
/// Wraps a VkDescriptorSet handle. The set itself is owned by the pipeline's
/// descriptor pool and is reclaimed when that pool is destroyed; no Drop.
/// Immutable after creation - allocate a new set to point at another texture.
pub struct VulkanBindingSet {
    pub(crate) set: vk::DescriptorSet,
}

impl RendererBindingSet for VulkanBindingSet {}

impl VulkanPipeline {
    unsafe fn create_shader_module(
        device: &ash::Device,
        words: &[u32],
    ) -> Result<vk::ShaderModule> {
        if words.is_empty() {
            engine_error!("pulsar3d::vulkan", "Empty shader module");
            return Err(Error::InvalidResource("Empty shader module".to_string()));
        }
        let create_info = vk::ShaderModuleCreateInfo::default().code(words);
        device.create_shader_module(&create_info, None).map_err(|e| {
            engine_error!("pulsar3d::vulkan", "Failed to create shader module: {:?}", e);
            Error::InitializationFailed(format!("Failed to create shader module: {:?}", e))
        })
    }
}
