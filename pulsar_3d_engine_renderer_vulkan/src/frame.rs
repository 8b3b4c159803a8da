/// Frame flight - per-image command buffers and CPU/GPU synchronization
///
/// The GPU consumes submitted work after the CPU has moved on, so everything
/// the CPU reuses across frames is indexed by the realized swapchain image
/// count: one command buffer per image, one render-finished semaphore per
/// image, and one acquire-semaphore/fence pair per in-flight slot. Acquire
/// waits are bounded; a timeout is handled exactly like an out-of-date
/// surface so a stalled presentation engine can never freeze the loop.

use ash::vk;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::FrameStatus;
use pulsar_3d_engine::{engine_err, engine_error, engine_warn};

use crate::swapchain::Swapchain;

/// CPU frames allowed in flight before acquire blocks on the GPU
const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Command recording and synchronization state for the frame loop
pub struct FrameFlight {
    device: ash::Device,
    command_pool: vk::CommandPool,
    /// One command buffer per realized swapchain image
    command_buffers: Vec<vk::CommandBuffer>,
    /// One acquire semaphore per in-flight slot
    image_available: Vec<vk::Semaphore>,
    /// One present semaphore per realized swapchain image
    render_finished: Vec<vk::Semaphore>,
    /// One fence per in-flight slot
    in_flight: Vec<vk::Fence>,
    current_slot: usize,
    /// Image acquired by the open frame, if recording is in progress
    acquired: Option<u32>,
}

impl FrameFlight {
    /// Build flight state sized from the realized image count
    pub fn new(device: &ash::Device, graphics_family: u32, image_count: usize) -> Result<Self> {
        unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let command_pool = device.create_command_pool(&pool_info, None).map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create command pool: {:?}", e))
            })?;

            let mut flight = Self {
                device: device.clone(),
                command_pool,
                command_buffers: Vec::new(),
                image_available: Vec::new(),
                render_finished: Vec::new(),
                in_flight: Vec::new(),
                current_slot: 0,
                acquired: None,
            };

            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(image_count as u32);
            flight.command_buffers =
                device.allocate_command_buffers(&alloc_info).map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to allocate command buffers: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to allocate command buffers: {:?}",
                        e
                    ))
                })?;

            let semaphore_info = vk::SemaphoreCreateInfo::default();
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                flight.image_available.push(
                    device
                        .create_semaphore(&semaphore_info, None)
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to create semaphore: {:?}", e))?,
                );
            }
            for _ in 0..image_count {
                flight.render_finished.push(
                    device
                        .create_semaphore(&semaphore_info, None)
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to create semaphore: {:?}", e))?,
                );
            }

            // Signaled so the first frame's wait returns immediately
            let fence_info =
                vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                flight.in_flight.push(
                    device
                        .create_fence(&fence_info, None)
                        .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to create fence: {:?}", e))?,
                );
            }

            Ok(flight)
        }
    }

    /// Acquire the next image with a bounded wait
    ///
    /// Returns the image index, or `SurfaceOutOfDate` for stale surfaces AND
    /// timeouts; device loss and other failures are fatal.
    pub fn acquire(
        &mut self,
        swapchain: &Swapchain,
        timeout_ns: u64,
    ) -> Result<(FrameStatus, Option<u32>)> {
        unsafe {
            debug_assert!(self.acquired.is_none(), "acquire called with a frame open");

            let fence = self.in_flight[self.current_slot];
            match self.device.wait_for_fences(&[fence], true, timeout_ns) {
                Ok(()) => {}
                Err(vk::Result::TIMEOUT) => {
                    engine_warn!("pulsar3d::vulkan", "In-flight fence wait timed out");
                    return Ok((FrameStatus::SurfaceOutOfDate, None));
                }
                Err(e) => {
                    return Err(engine_err!("pulsar3d::vulkan", "Fence wait failed: {:?}", e));
                }
            }

            match swapchain.loader.acquire_next_image(
                swapchain.handle,
                timeout_ns,
                self.image_available[self.current_slot],
                vk::Fence::null(),
            ) {
                // A suboptimal acquire still renders this frame
                Ok((image_index, _suboptimal)) => {
                    self.acquired = Some(image_index);
                    Ok((FrameStatus::Ready, Some(image_index)))
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    Ok((FrameStatus::SurfaceOutOfDate, None))
                }
                Err(vk::Result::TIMEOUT) | Err(vk::Result::NOT_READY) => {
                    engine_warn!("pulsar3d::vulkan", "Image acquire timed out");
                    Ok((FrameStatus::SurfaceOutOfDate, None))
                }
                Err(e) => Err(engine_err!("pulsar3d::vulkan", "Failed to acquire image: {:?}", e)),
            }
        }
    }

    /// Command buffer of the open frame
    pub fn current_command_buffer(&self) -> Result<vk::CommandBuffer> {
        let image = self.acquired.ok_or_else(|| {
            Error::BackendError("No frame is open; begin_frame must succeed first".to_string())
        })?;
        Ok(self.command_buffers[image as usize])
    }

    /// Image index of the open frame
    pub fn acquired_image(&self) -> Option<u32> {
        self.acquired
    }

    /// Submit the open frame and present it
    ///
    /// Waits the acquire semaphore at color-attachment output, signals the
    /// image's present semaphore and the slot fence. An out-of-date present
    /// reports `SurfaceOutOfDate`; suboptimal is accepted.
    pub fn submit_and_present(
        &mut self,
        swapchain: &Swapchain,
        graphics_queue: vk::Queue,
        present_queue: vk::Queue,
    ) -> Result<FrameStatus> {
        unsafe {
            let image = self.acquired.take().ok_or_else(|| {
                Error::BackendError("No frame is open; nothing to present".to_string())
            })?;
            let command_buffer = self.command_buffers[image as usize];

            let fence = self.in_flight[self.current_slot];
            self.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to reset fence: {:?}", e))?;

            let wait_semaphores = [self.image_available[self.current_slot]];
            let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
            let signal_semaphores = [self.render_finished[image as usize]];
            let command_buffers = [command_buffer];

            let submit_info = vk::SubmitInfo::default()
                .wait_semaphores(&wait_semaphores)
                .wait_dst_stage_mask(&wait_stages)
                .command_buffers(&command_buffers)
                .signal_semaphores(&signal_semaphores);

            self.device
                .queue_submit(graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to submit frame: {:?}", e))?;

            self.current_slot = (self.current_slot + 1) % MAX_FRAMES_IN_FLIGHT;

            let swapchains = [swapchain.handle];
            let image_indices = [image];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&signal_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            match swapchain.loader.queue_present(present_queue, &present_info) {
                Ok(_) => Ok(FrameStatus::Ready),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                    Ok(FrameStatus::SurfaceOutOfDate)
                }
                Err(e) => Err(engine_err!("pulsar3d::vulkan", "Failed to present: {:?}", e)),
            }
        }
    }

    /// Abandon the open frame without submitting (stale surface mid-record)
    pub fn abandon(&mut self) {
        self.acquired = None;
    }
}

impl Drop for FrameFlight {
    fn drop(&mut self) {
        unsafe {
            for &fence in &self.in_flight {
                self.device.destroy_fence(fence, None);
            }
            for &semaphore in &self.render_finished {
                self.device.destroy_semaphore(semaphore, None);
            }
            for &semaphore in &self.image_available {
                self.device.destroy_semaphore(semaphore, None);
            }
            // Frees every command buffer allocated from it
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
