//! Unit tests for the probe's extension containment check
//!
//! probe() itself needs a loader and a display; the containment rule is pure
//! and tested here without either.

use super::missing_extensions;
use std::ffi::CString;

fn names(raw: &[&str]) -> Vec<CString> {
    raw.iter().map(|s| CString::new(*s).unwrap()).collect()
}

#[test]
fn test_all_required_present() {
    let required = names(&["VK_KHR_surface", "VK_KHR_xlib_surface"]);
    let advertised = names(&["VK_KHR_surface", "VK_KHR_xlib_surface", "VK_EXT_debug_utils"]);

    let required_refs: Vec<&std::ffi::CStr> = required.iter().map(|c| c.as_c_str()).collect();
    let advertised_refs: Vec<&std::ffi::CStr> = advertised.iter().map(|c| c.as_c_str()).collect();

    assert!(missing_extensions(&required_refs, &advertised_refs).is_empty());
}

#[test]
fn test_one_required_missing() {
    let required = names(&["VK_KHR_surface", "VK_KHR_wayland_surface"]);
    let advertised = names(&["VK_KHR_surface"]);

    let required_refs: Vec<&std::ffi::CStr> = required.iter().map(|c| c.as_c_str()).collect();
    let advertised_refs: Vec<&std::ffi::CStr> = advertised.iter().map(|c| c.as_c_str()).collect();

    let missing = missing_extensions(&required_refs, &advertised_refs);
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].to_str().unwrap(), "VK_KHR_wayland_surface");
}

#[test]
fn test_empty_advertised_set() {
    let required = names(&["VK_KHR_surface"]);
    let required_refs: Vec<&std::ffi::CStr> = required.iter().map(|c| c.as_c_str()).collect();

    assert_eq!(missing_extensions(&required_refs, &[]).len(), 1);
}
