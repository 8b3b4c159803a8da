/// Capability probe - can the explicit API be used on this host at all?
///
/// Loads the Vulkan loader through dynamic linking (never a static link, so
/// hosts without a driver still start) and checks that every platform surface
/// extension the window system needs is advertised. A negative answer is an
/// expected condition: it is reported at Info severity, never as an error,
/// and leaves no loader state behind - the transient Entry is dropped before
/// returning, so a later legacy-API initialization sees a clean process.

use std::ffi::CStr;
use raw_window_handle::RawDisplayHandle;

use pulsar_3d_engine::engine_info;

/// Probe the host for explicit-API support
///
/// # Arguments
///
/// * `display` - Raw display handle of the target window system
///
/// # Returns
///
/// true only if the loader loads, the platform requires a non-empty surface
/// extension set, and every required extension is advertised by the host.
pub fn probe(display: RawDisplayHandle) -> bool {
    let entry = match unsafe { ash::Entry::load() } {
        Ok(entry) => entry,
        Err(e) => {
            engine_info!("pulsar3d::vulkan", "Probe negative: loader not available: {}", e);
            return false;
        }
    };

    let required = match ash_window::enumerate_required_extensions(display) {
        Ok(required) if !required.is_empty() => required,
        Ok(_) => {
            engine_info!(
                "pulsar3d::vulkan",
                "Probe negative: platform reports no surface extensions"
            );
            return false;
        }
        Err(e) => {
            engine_info!(
                "pulsar3d::vulkan",
                "Probe negative: cannot enumerate surface extensions: {:?}",
                e
            );
            return false;
        }
    };

    let advertised = match unsafe { entry.enumerate_instance_extension_properties(None) } {
        Ok(advertised) => advertised,
        Err(e) => {
            engine_info!(
                "pulsar3d::vulkan",
                "Probe negative: cannot enumerate instance extensions: {:?}",
                e
            );
            return false;
        }
    };

    let advertised_names: Vec<&CStr> = advertised
        .iter()
        .filter_map(|ext| ext.extension_name_as_c_str().ok())
        .collect();
    let required_names: Vec<&CStr> =
        required.iter().map(|&ptr| unsafe { CStr::from_ptr(ptr) }).collect();

    let missing = missing_extensions(&required_names, &advertised_names);
    if !missing.is_empty() {
        engine_info!(
            "pulsar3d::vulkan",
            "Probe negative: host is missing extensions: {:?}",
            missing
        );
        return false;
    }

    true
    // `entry` drops here; a false return above retains nothing either
}

/// Required extension names absent from the advertised set
fn missing_extensions<'a>(required: &[&'a CStr], advertised: &[&CStr]) -> Vec<&'a CStr> {
    required
        .iter()
        .filter(|name| !advertised.contains(name))
        .copied()
        .collect()
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
