//! Error types for the geometry synchronization system.

use thiserror::Error;

/// Errors that can occur while synchronizing geometry with the GPU.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuMeshError {
    /// Failed to create a GPU resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// An attribute name is already bound to a different counterpart.
    #[error("attribute name conflict: cannot bind `{mesh_name}` to `{shader_name}`, one of them is already bound")]
    NameConflict {
        /// Name of the attribute on the CPU geometry side.
        mesh_name: String,
        /// Name of the vertex input on the shader side.
        shader_name: String,
    },
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
}

/// Convenience result alias used throughout the crate.
pub type GpuMeshResult<T> = Result<T, GpuMeshError>;
