/// Validation layer support (vulkan-validation feature only)
///
/// Creates a debug-utils messenger whose callback forwards driver and layer
/// messages into the engine logging system. Compiled out entirely when the
/// feature is disabled.

use std::ffi::{c_void, CStr};
use ash::vk;

use pulsar_3d_engine::pulsar3d::{Error, Result};
use pulsar_3d_engine::{engine_debug, engine_error, engine_info, engine_warn};

/// Owns the messenger and the extension functions that destroy it
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    handle: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    pub fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        unsafe {
            let loader = ash::ext::debug_utils::Instance::new(entry, instance);

            let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(vulkan_debug_callback));

            let handle = loader
                .create_debug_utils_messenger(&create_info, None)
                .map_err(|e| {
                    engine_error!("pulsar3d::vulkan", "Failed to create debug messenger: {:?}", e);
                    Error::InitializationFailed(format!(
                        "Failed to create debug messenger: {:?}",
                        e
                    ))
                })?;

            Ok(Self { loader, handle })
        }
    }
}

impl Drop for DebugMessenger {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.handle, None);
        }
    }
}

/// Route validation messages into the engine log
unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }
    let message = (*callback_data).p_message;
    let message = if message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        engine_error!("pulsar3d::vulkan::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        engine_warn!("pulsar3d::vulkan::validation", "{}", message);
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        engine_info!("pulsar3d::vulkan::validation", "{}", message);
    } else {
        engine_debug!("pulsar3d::vulkan::validation", "{}", message);
    }

    vk::FALSE
}
