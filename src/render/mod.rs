//! Rendering module
//!
//! GPU-facing half of the kernel: device/surface ownership, compiled
//! shader identities, material and mesh data, and execution of the draw
//! commands recorded by the scene traversal. The scene side only ever
//! holds opaque ids and handles into this module.

mod camera;
mod context;
mod material;
mod mesh;
mod queue;
mod shader;

pub use camera::Camera;
pub use context::Renderer;
pub use material::{MAX_BONES, Material, MaterialId, MaterialUniform, Materials};
pub use mesh::{Mesh, Vertex};
pub use queue::{DrawCommand, RenderQueue};
pub use shader::{ShaderId, ShaderKey, ShaderLibrary, ShaderStage};

use std::path::PathBuf;

/// Errors raised while acquiring rendering resources.
///
/// All of these are fatal for the failing operation: a missing adapter,
/// device, or shader source has no degraded mode and is never retried.
#[derive(Debug)]
pub enum RenderError {
    /// Surface creation against the window failed
    SurfaceCreation(String),
    /// No compatible GPU adapter was found
    AdapterNotFound,
    /// Logical device request was rejected
    DeviceRequest(String),
    /// Shader source could not be read or compiled
    ShaderLoad {
        /// Path of the offending source file
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SurfaceCreation(e) => write!(f, "failed to create surface: {e}"),
            Self::AdapterNotFound => write!(f, "no compatible GPU adapter found"),
            Self::DeviceRequest(e) => write!(f, "failed to create device: {e}"),
            Self::ShaderLoad { path, reason } => {
                write!(f, "failed to load shader {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for RenderError {}
