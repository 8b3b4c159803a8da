/// Draw submission - the once-per-frame contract with the scene layer
///
/// The scene hands the facade a pipeline key and an ordered draw list; the
/// list is consumed once and never retained. Draw order within a frame is
/// submission order; this layer performs no sorting or batching.

use glam::Mat4;

/// One draw: which mesh, which texture, where
#[derive(Debug, Clone)]
pub struct DrawSubmission {
    /// Key of a registered mesh
    pub mesh: String,
    /// Key of a registered texture
    pub texture: String,
    /// Model-view-projection transform for this draw
    pub transform: Mat4,
}

/// Everything the scene submits for one frame
#[derive(Debug, Clone, Default)]
pub struct FrameSubmission {
    /// Key of the registered pipeline all draws in this frame use
    pub pipeline: String,
    /// Ordered draw list, consumed once
    pub draws: Vec<DrawSubmission>,
}

/// Per-frame submission source
///
/// Implemented by the application's scene layer. Called exactly once per
/// rendered frame; receives nothing back (fire-and-forget).
pub trait SceneDelegate {
    /// Produce this frame's submission
    ///
    /// # Arguments
    ///
    /// * `delta_seconds` - Wall-clock time since the previous frame
    fn frame(&mut self, delta_seconds: f32) -> FrameSubmission;
}

#[cfg(test)]
#[path = "draw_list_tests.rs"]
mod tests;
