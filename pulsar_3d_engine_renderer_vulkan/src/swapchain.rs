/// Swapchain - negotiation against surface capabilities plus the image ring
///
/// Handles format/present-mode/count/extent negotiation and owns the
/// presentable images and their views. Destroyed and recreated wholesale
/// (never patched) whenever the surface capabilities change or presentation
/// reports an out-of-date surface.

use ash::vk;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::{engine_debug, engine_error};

use crate::device::DeviceContext;
use crate::surface::Surface;

// ============================================================================
// Negotiation rules (pure, unit-tested)
// ============================================================================

/// Substitute used when the surface reports a single undefined format
const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Choose the swapchain color format
///
/// A single reported entry with format UNDEFINED means "anything goes":
/// substitute the nonlinear 8-bit default. Otherwise prefer an
/// 8-bit-per-channel format from the supported set, else take the first.
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    if formats.is_empty() {
        engine_error!("pulsar3d::vulkan", "Surface reports no formats");
        return Err(Error::InitializationFailed("Surface reports no formats".to_string()));
    }
    if formats.len() == 1 && formats[0].format == vk::Format::UNDEFINED {
        return Ok(DEFAULT_SURFACE_FORMAT);
    }
    Ok(formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_UNORM || f.format == vk::Format::R8G8B8A8_UNORM
        })
        .copied()
        .unwrap_or(formats[0]))
}

/// Choose the presentation mode
///
/// Ranking: MAILBOX (low latency, no tearing) > FIFO > FIFO_RELAXED >
/// IMMEDIATE. A conforming driver always supports FIFO, so an empty result is
/// a hard failure upstream, not a fallback.
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> Option<vk::PresentModeKHR> {
    const RANKED: [vk::PresentModeKHR; 4] = [
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::FIFO_RELAXED,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    RANKED.into_iter().find(|mode| modes.contains(mode))
}

/// Choose how many images to request
///
/// min + 1, clamped to the maximum only when the maximum is nonzero
/// (a reported maximum of zero means "unbounded", not "zero allowed").
/// The realized count may still exceed this request.
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let requested = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        requested.min(capabilities.max_image_count)
    } else {
        requested
    }
}

/// Choose the swapchain extent
///
/// The surface usually dictates the extent; when it reports the sentinel
/// "window manager decides" value the drawable pixel size (never the logical
/// size) is clamped into the supported range.
pub(crate) fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    drawable_extent: (u32, u32),
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: drawable_extent.0.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: drawable_extent.1.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

// ============================================================================
// Swapchain
// ============================================================================

/// The negotiated image ring and its views
pub struct Swapchain {
    device: ash::Device,
    pub(crate) loader: ash::khr::swapchain::Device,
    pub(crate) handle: vk::SwapchainKHR,
    pub(crate) images: Vec<vk::Image>,
    pub(crate) image_views: Vec<vk::ImageView>,
    pub(crate) format: vk::Format,
    pub(crate) extent: vk::Extent2D,
    pub(crate) present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Negotiate and create a swapchain against the current surface state
    ///
    /// # Arguments
    ///
    /// * `drawable_extent` - Current drawable pixel size from the windowing layer
    /// * `old_swapchain` - Handle being replaced during recreation, if any;
    ///   the caller destroys it afterwards
    pub fn new(
        device_ctx: &DeviceContext,
        surface: &Surface,
        drawable_extent: (u32, u32),
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        unsafe {
            let capabilities = surface.capabilities(device_ctx.physical_device)?;
            let formats = surface.formats(device_ctx.physical_device)?;
            let present_modes = surface.present_modes(device_ctx.physical_device)?;

            let surface_format = choose_surface_format(&formats)?;
            let present_mode = choose_present_mode(&present_modes).ok_or_else(|| {
                engine_error!("pulsar3d::vulkan", "No usable presentation mode on this surface");
                Error::InitializationFailed("No usable presentation mode".to_string())
            })?;
            let image_count = choose_image_count(&capabilities);
            let extent = choose_extent(&capabilities, drawable_extent);

            // Identity pre-transform always, regardless of the device's native
            // preference: world-space orientation must not vary with panel
            // rotation. This costs the compositor a transform on some devices.
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(surface.handle)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

            // Distinct graphics/present families share images concurrently
            let family_indices = device_ctx.families.indices();
            create_info = if device_ctx.families.unified() {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            } else {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&family_indices)
            };

            let loader =
                ash::khr::swapchain::Device::new(&device_ctx.instance, &device_ctx.device);
            let handle = loader.create_swapchain(&create_info, None).map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
            })?;

            // The realized count may exceed the request; everything downstream
            // sizes per-image arrays from this list, never from the request
            let images = match loader.get_swapchain_images(handle) {
                Ok(images) => images,
                Err(e) => {
                    loader.destroy_swapchain(handle, None);
                    engine_error!("pulsar3d::vulkan", "Failed to get swapchain images: {:?}", e);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to get swapchain images: {:?}",
                        e
                    )));
                }
            };

            let mut image_views = Vec::with_capacity(images.len());
            for &image in &images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                match device_ctx.device.create_image_view(&view_info, None) {
                    Ok(view) => image_views.push(view),
                    Err(e) => {
                        for view in image_views {
                            device_ctx.device.destroy_image_view(view, None);
                        }
                        loader.destroy_swapchain(handle, None);
                        engine_error!("pulsar3d::vulkan", "Failed to create swapchain image view: {:?}", e);
                        return Err(Error::InitializationFailed(format!(
                            "Failed to create image view: {:?}",
                            e
                        )));
                    }
                }
            }

            engine_debug!(
                "pulsar3d::vulkan",
                "Swapchain: {} images (requested {}), {:?} {:?}, {}x{}",
                images.len(),
                image_count,
                surface_format.format,
                present_mode,
                extent.width,
                extent.height
            );

            Ok(Self {
                device: device_ctx.device.clone(),
                loader,
                handle,
                images,
                image_views,
                format: surface_format.format,
                extent,
                present_mode,
            })
        }
    }

    /// Realized image count (may exceed the requested minimum)
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.handle, None);
        }
    }
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
