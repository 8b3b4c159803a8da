//! Error types for the Pulsar3D engine
//!
//! This module defines the error types used throughout the engine,
//! including rendering, initialization, and resource management.

use std::fmt;

/// Result type for Pulsar3D engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pulsar3D engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, OpenGL, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// A fixed-capacity pool (e.g. a pipeline's binding-set pool) is exhausted
    PoolExhausted(String),

    /// Invalid resource (texture, mesh, pipeline, unknown asset key, etc.)
    InvalidResource(String),

    /// Initialization failed (backend, device, swapchain, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::PoolExhausted(msg) => write!(f, "Pool exhausted: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
