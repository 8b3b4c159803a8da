/*!
# Pulsar 3D Engine

Core traits and types for the Pulsar 3D rendering engine.

This crate provides the platform-agnostic API for 3D rendering using trait-based
dynamic polymorphism. Backend implementations (Vulkan, legacy OpenGL) are
registered at runtime via the plugin system and selected once at startup by the
[`renderer::RenderHost`] facade, which falls back to the next registered backend
when a preferred one is unavailable on the host.

## Architecture

- **RenderBackend**: factory + per-frame trait implemented by each backend
- **AssetCache**: memoized pipelines, meshes, textures and binding sets
- **RenderHost**: the facade owning the active backend and the cache
- **SceneDelegate**: the per-frame draw-submission contract

Backend crates provide concrete types behind the `RenderBackend` trait; nothing
outside those crates inspects which backend is active.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod renderer;

// Main pulsar3d namespace module
pub mod pulsar3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logging state)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::renderer::*;
    }
}

// Re-export math library at crate root
pub use glam;
