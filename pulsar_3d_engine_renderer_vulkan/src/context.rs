/// GpuContext - shared GPU resources for all Vulkan objects
///
/// Contains everything resource wrappers need for GPU operations:
/// - Device for Vulkan API calls
/// - Allocator for memory management
/// - Graphics queue + command pool for one-shot upload operations
///
/// Shared (via `Arc`) by meshes, textures and pipelines so each wrapper can
/// free itself on drop. The device itself is owned and destroyed by
/// DeviceContext; this struct only holds a dispatch-table clone.

use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::{engine_err, engine_error};

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Vulkan logical device (dispatch clone; owned by DeviceContext)
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for &self access)
    /// Wrapped in ManuallyDrop so VulkanBackend::drop can release it before
    /// the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_family: u32,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,
}

impl GpuContext {
    pub fn new(
        device: ash::Device,
        allocator: Arc<Mutex<Allocator>>,
        graphics_queue: vk::Queue,
        graphics_family: u32,
        upload_command_pool: vk::CommandPool,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(allocator),
            graphics_queue,
            graphics_family,
            upload_command_pool: Mutex::new(upload_command_pool),
        }
    }

    /// Create a buffer and bind freshly allocated memory to it
    pub(crate) fn create_buffer(
        &self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let buffer_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self
                .device
                .create_buffer(&buffer_info, None)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to create buffer '{}': {:?}", name, e))?;

            let requirements = self.device.get_buffer_memory_requirements(buffer);
            let allocation = match self.allocate(name, requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
            {
                self.free(allocation);
                self.device.destroy_buffer(buffer, None);
                return Err(engine_err!("pulsar3d::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            Ok((buffer, allocation))
        }
    }

    /// Create a 2D image and bind freshly allocated memory to it
    pub(crate) fn create_image(
        &self,
        name: &str,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        samples: vk::SampleCountFlags,
    ) -> Result<(vk::Image, Allocation)> {
        unsafe {
            let image_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .format(format)
                .tiling(vk::ImageTiling::OPTIMAL)
                .initial_layout(vk::ImageLayout::UNDEFINED)
                .usage(usage)
                .samples(samples)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let image = self
                .device
                .create_image(&image_info, None)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to create image '{}': {:?}", name, e))?;

            let requirements = self.device.get_image_memory_requirements(image);
            let allocation = match self.allocate(name, requirements, MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = self
                .device
                .bind_image_memory(image, allocation.memory(), allocation.offset())
            {
                self.free(allocation);
                self.device.destroy_image(image, None);
                return Err(engine_err!("pulsar3d::vulkan", "Failed to bind image memory: {:?}", e));
            }

            Ok((image, allocation))
        }
    }

    /// Return an allocation to the allocator
    pub(crate) fn free(&self, allocation: Allocation) {
        // Don't panic if the lock fails - the wrapper still destroys its handle
        if let Ok(mut allocator) = self.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Record and synchronously execute a one-shot command buffer
    ///
    /// Used for staging uploads and layout transitions at load time. Blocks
    /// until the graphics queue has drained, so it must never run inside the
    /// per-frame path.
    pub(crate) fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(vk::CommandBuffer),
    {
        unsafe {
            let pool = *self
                .upload_command_pool
                .lock()
                .map_err(|_| Error::BackendError("Upload pool lock poisoned".to_string()))?;

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            let result = self
                .device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to begin upload recording: {:?}", e))
                .and_then(|_| {
                    record(command_buffer);
                    self.device
                        .end_command_buffer(command_buffer)
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to end upload recording: {:?}", e))
                })
                .and_then(|_| {
                    let buffers = [command_buffer];
                    let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
                    self.device
                        .queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to submit upload: {:?}", e))
                })
                .and_then(|_| {
                    self.device
                        .queue_wait_idle(self.graphics_queue)
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to wait for upload: {:?}", e))
                });

            self.device.free_command_buffers(pool, &[command_buffer]);
            result
        }
    }

    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self
            .allocator
            .lock()
            .map_err(|_| Error::BackendError("Allocator lock poisoned".to_string()))?;
        allocator
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .map_err(|e| match e {
                gpu_allocator::AllocationError::OutOfMemory => {
                    engine_error!("pulsar3d::vulkan", "GPU allocation '{}' out of memory", name);
                    Error::OutOfMemory
                }
                other => engine_err!("pulsar3d::vulkan", "GPU allocation '{}' failed: {:?}", name, other),
            })
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        // NOTE: allocator release and pool/device destruction are handled by
        // VulkanBackend::drop to keep the teardown order explicit.
    }
}
