//! Unit tests for the swapchain negotiation rules
//!
//! The rules are pure functions over reported capabilities, so every case
//! from the surface-negotiation contract is covered without a device.

use super::*;

fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
    vk::SurfaceFormatKHR {
        format,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }
}

fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 16384, height: 16384 },
        ..Default::default()
    }
}

// ============================================================================
// COLOR FORMAT TESTS
// ============================================================================

#[test]
fn test_format_single_undefined_substitutes_default() {
    let formats = [surface_format(vk::Format::UNDEFINED)];
    let chosen = choose_surface_format(&formats).unwrap();
    assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn test_format_prefers_8bit_per_channel() {
    let formats = [
        surface_format(vk::Format::R16G16B16A16_SFLOAT),
        surface_format(vk::Format::B8G8R8A8_UNORM),
    ];
    assert_eq!(
        choose_surface_format(&formats).unwrap().format,
        vk::Format::B8G8R8A8_UNORM
    );
}

#[test]
fn test_format_falls_back_to_first_reported() {
    let formats = [
        surface_format(vk::Format::R16G16B16A16_SFLOAT),
        surface_format(vk::Format::A2B10G10R10_UNORM_PACK32),
    ];
    assert_eq!(
        choose_surface_format(&formats).unwrap().format,
        vk::Format::R16G16B16A16_SFLOAT
    );
}

#[test]
fn test_format_empty_set_is_error() {
    assert!(choose_surface_format(&[]).is_err());
}

// ============================================================================
// PRESENT MODE TESTS
// ============================================================================

#[test]
fn test_present_mode_fifo_beats_immediate() {
    let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
    assert_eq!(choose_present_mode(&modes), Some(vk::PresentModeKHR::FIFO));
}

#[test]
fn test_present_mode_mailbox_beats_fifo() {
    let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
    assert_eq!(choose_present_mode(&modes), Some(vk::PresentModeKHR::MAILBOX));
}

#[test]
fn test_present_mode_relaxed_beats_immediate() {
    let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED];
    assert_eq!(
        choose_present_mode(&modes),
        Some(vk::PresentModeKHR::FIFO_RELAXED)
    );
}

#[test]
fn test_present_mode_selection_is_deterministic() {
    let modes = [
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    let first = choose_present_mode(&modes);
    for _ in 0..10 {
        assert_eq!(choose_present_mode(&modes), first);
    }
}

#[test]
fn test_present_mode_none_supported() {
    assert_eq!(choose_present_mode(&[]), None);
    // An exotic-only set also yields no choice and must fail upstream
    assert_eq!(
        choose_present_mode(&[vk::PresentModeKHR::SHARED_DEMAND_REFRESH]),
        None
    );
}

// ============================================================================
// IMAGE COUNT TESTS
// ============================================================================

#[test]
fn test_image_count_requests_min_plus_one() {
    assert_eq!(choose_image_count(&capabilities(2, 8)), 3);
}

#[test]
fn test_image_count_clamped_to_nonzero_max() {
    assert_eq!(choose_image_count(&capabilities(3, 3)), 3);
}

#[test]
fn test_image_count_zero_max_means_unbounded() {
    // min=2, max=0: the request must be 3, not clamped to zero
    assert_eq!(choose_image_count(&capabilities(2, 0)), 3);
}

// ============================================================================
// EXTENT TESTS
// ============================================================================

#[test]
fn test_extent_uses_surface_dictated_size() {
    let mut caps = capabilities(2, 0);
    caps.current_extent = vk::Extent2D { width: 1280, height: 720 };
    let extent = choose_extent(&caps, (640, 480));
    assert_eq!((extent.width, extent.height), (1280, 720));
}

#[test]
fn test_extent_uses_drawable_size_when_unconstrained() {
    let extent = choose_extent(&capabilities(2, 0), (1920, 1080));
    assert_eq!((extent.width, extent.height), (1920, 1080));
}

#[test]
fn test_extent_clamps_drawable_size() {
    let mut caps = capabilities(2, 0);
    caps.min_image_extent = vk::Extent2D { width: 200, height: 200 };
    caps.max_image_extent = vk::Extent2D { width: 1000, height: 1000 };

    let too_small = choose_extent(&caps, (64, 64));
    assert_eq!((too_small.width, too_small.height), (200, 200));

    let too_large = choose_extent(&caps, (4096, 4096));
    assert_eq!((too_large.width, too_large.height), (1000, 1000));
}
