/// Presentation surface - the API-side wrapper over the native window
///
/// A surface is meaningless without its originating window and must not
/// outlive it. It has no recreation protocol of its own: resize rebuilds the
/// swapchain, not the surface; only full backend reinitialization makes a
/// new one.

use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::{engine_err, engine_error};

/// Vulkan surface plus the extension functions that operate on it
pub struct Surface {
    pub(crate) loader: ash::khr::surface::Instance,
    pub(crate) handle: vk::SurfaceKHR,
}

impl Surface {
    /// Wrap the native window into a presentable surface
    pub fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self> {
        unsafe {
            let handle = ash_window::create_surface(entry, instance, display, window, None)
                .map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to create surface: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
                })?;
            let loader = ash::khr::surface::Instance::new(entry, instance);
            Ok(Self { loader, handle })
        }
    }

    /// Can this queue family present to the surface?
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, family: u32) -> bool {
        unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, family, self.handle)
                .unwrap_or(false)
        }
    }

    /// Current surface capabilities (re-queried on every swapchain build)
    pub fn capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to get surface capabilities: {:?}", e))
        }
    }

    /// Supported surface formats
    pub fn formats(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.loader
                .get_physical_device_surface_formats(physical_device, self.handle)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to get surface formats: {:?}", e))
        }
    }

    /// Supported presentation modes
    pub fn present_modes(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.loader
                .get_physical_device_surface_present_modes(physical_device, self.handle)
                .map_err(|e| engine_err!("pulsar3d::vulkan", "Failed to get present modes: {:?}", e))
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
    }
}
