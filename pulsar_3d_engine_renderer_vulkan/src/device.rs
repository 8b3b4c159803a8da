/// Device selection - instance creation, adapter validation, logical device
///
/// An adapter is acceptable only if it exposes a graphics-capable queue
/// family AND a family able to present to the target surface (which may or
/// may not be the same family). The first acceptable adapter wins; scoring by
/// device type or memory is deliberately not done here. The logical device
/// requests only the swapchain extension - the minimal set presentation
/// needs.

use std::ffi::CStr;
use ash::vk;
use raw_window_handle::RawDisplayHandle;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::pulsar3d::render::Config;
use pulsar_3d_engine::{engine_error, engine_info};

use crate::surface::Surface;

/// Queue family indices an adapter was validated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family supporting graphics operations
    pub graphics: u32,
    /// Family able to present to the target surface
    pub present: u32,
}

impl QueueFamilies {
    /// True when graphics and present share one family
    pub fn unified(&self) -> bool {
        self.graphics == self.present
    }

    /// Both indices, for concurrent-sharing swapchain creation
    pub fn indices(&self) -> [u32; 2] {
        [self.graphics, self.present]
    }
}

/// Owner of the loader entry, instance, adapter and logical device
///
/// Exactly one exists per running backend; it is destroyed only at backend
/// shutdown and never recreated mid-session. All other components hold
/// non-owning references (device clones / the GpuContext).
pub struct DeviceContext {
    /// Dynamically loaded entry points (kept alive for the instance)
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub physical_device: vk::PhysicalDevice,
    pub families: QueueFamilies,
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
    /// Adapter limits, queried once at selection
    pub limits: vk::PhysicalDeviceLimits,
}

impl DeviceContext {
    /// Create the instance for this display's surface extensions
    pub fn create_instance(
        entry: &ash::Entry,
        display: RawDisplayHandle,
        config: &Config,
    ) -> Result<ash::Instance> {
        unsafe {
            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| std::ffi::CString::new("Pulsar3D Application").unwrap());
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Pulsar3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_1);

            let mut extension_names = ash_window::enumerate_required_extensions(display)
                .map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to get required extensions: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {:?}", e))
                })?
                .to_vec();

            #[cfg(feature = "vulkan-validation")]
            if config.enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            #[cfg(feature = "vulkan-validation")]
            let layer_names = if config.enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };
            #[cfg(not(feature = "vulkan-validation"))]
            let layer_names: Vec<*const std::ffi::c_char> = vec![];

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            entry.create_instance(&create_info, None).map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
            })
        }
    }

    /// Select the first adapter that can draw and present
    pub fn select_adapter(
        instance: &ash::Instance,
        surface: &Surface,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        unsafe {
            let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
                engine_error!("pulsar3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
                Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
            })?;

            for physical_device in physical_devices {
                if let Some(families) = Self::find_queue_families(instance, physical_device, surface) {
                    let properties = instance.get_physical_device_properties(physical_device);
                    let name = CStr::from_ptr(properties.device_name.as_ptr());
                    engine_info!(
                        "pulsar3d::vulkan",
                        "Selected adapter '{}' (graphics family {}, present family {})",
                        name.to_string_lossy(),
                        families.graphics,
                        families.present
                    );
                    return Ok((physical_device, families));
                }
            }

            engine_error!("pulsar3d::vulkan", "No adapter can both draw and present");
            Err(Error::InitializationFailed(
                "No adapter with graphics and presentation support".to_string(),
            ))
        }
    }

    /// Queue families for an adapter, or None if it must be rejected
    fn find_queue_families(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        surface: &Surface,
    ) -> Option<QueueFamilies> {
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        let graphics = queue_families
            .iter()
            .enumerate()
            .find(|(_, qf)| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|(i, _)| i as u32)?;

        let present = (0..queue_families.len() as u32)
            .find(|&i| surface.supports_present(physical_device, i))?;

        Some(QueueFamilies { graphics, present })
    }

    /// Create the logical device and fetch its queues
    ///
    /// Takes ownership of the loader entry and instance; on success they live
    /// exactly as long as the device and are destroyed with it.
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilies,
    ) -> Result<Self> {
        unsafe {
            let queue_priorities = [1.0];
            let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = if families.unified() {
                vec![vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(families.graphics)
                    .queue_priorities(&queue_priorities)]
            } else {
                vec![
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(families.graphics)
                        .queue_priorities(&queue_priorities),
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(families.present)
                        .queue_priorities(&queue_priorities),
                ]
            };

            // Only what swapchain presentation strictly requires
            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names);

            // On failure the instance handle is left to the caller's cleanup;
            // destroying it here would dangle the surface that still exists.
            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(families.graphics, 0);
            let present_queue = device.get_device_queue(families.present, 0);
            let limits = instance.get_physical_device_properties(physical_device).limits;

            Ok(Self {
                entry,
                instance,
                physical_device,
                families,
                device,
                graphics_queue,
                present_queue,
                limits,
            })
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
        // entry drops last, unloading the dynamically linked loader
    }
}
