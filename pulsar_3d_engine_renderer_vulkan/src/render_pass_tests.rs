//! Unit tests for multisample selection

use super::*;

#[test]
fn test_picks_highest_supported_up_to_ceiling() {
    let supported = vk::SampleCountFlags::TYPE_1
        | vk::SampleCountFlags::TYPE_2
        | vk::SampleCountFlags::TYPE_4
        | vk::SampleCountFlags::TYPE_8;

    assert_eq!(pick_sample_count(supported, 8), vk::SampleCountFlags::TYPE_8);
    assert_eq!(pick_sample_count(supported, 4), vk::SampleCountFlags::TYPE_4);
    assert_eq!(pick_sample_count(supported, 2), vk::SampleCountFlags::TYPE_2);
    assert_eq!(pick_sample_count(supported, 1), vk::SampleCountFlags::TYPE_1);
}

#[test]
fn test_skips_unsupported_counts() {
    let supported = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4;
    assert_eq!(pick_sample_count(supported, 8), vk::SampleCountFlags::TYPE_4);
}

#[test]
fn test_single_sample_adapter() {
    let supported = vk::SampleCountFlags::TYPE_1;
    assert_eq!(pick_sample_count(supported, 8), vk::SampleCountFlags::TYPE_1);
}

#[test]
fn test_empty_support_falls_back_to_single_sample() {
    assert_eq!(
        pick_sample_count(vk::SampleCountFlags::empty(), 8),
        vk::SampleCountFlags::TYPE_1
    );
}

#[test]
fn test_combined_color_depth_support() {
    let limits = vk::PhysicalDeviceLimits {
        framebuffer_color_sample_counts: vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8,
        framebuffer_depth_sample_counts: vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_4,
        ..Default::default()
    };
    // Both color and depth must support the chosen count
    assert_eq!(
        pick_sample_count(framebuffer_sample_counts(&limits), 8),
        vk::SampleCountFlags::TYPE_4
    );
}
