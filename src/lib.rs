//! # gpu-mesh
//!
//! GPU-resident geometry synchronization: CPU meshes mirrored into GPU
//! buffers with fine-grained dirty tracking, plus a thread-guarded registry
//! of the renderable objects built from them.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`geometry`] - CPU meshes: named attributes, index layers, dirty masks
//! - [`display`] - [`Displayable`] variants pairing a geometry with its GPU
//!   mirror and keeping the two in sync lazily
//! - [`registry`] - the [`RenderObjectRegistry`] shared store of render
//!   objects
//! - [`GpuContext`] - the recording graphics context buffers, vertex arrays
//!   and draw submissions go through
//! - [`DebugRender`] - immediate-mode line and point batches
//!
//! ## Example
//!
//! ```
//! use glam::Vec3;
//! use gpu_mesh::display::{Displayable, MeshDisplay};
//! use gpu_mesh::geometry::TriangleMesh;
//! use gpu_mesh::{GpuContext, ShaderProgram};
//!
//! let ctx = GpuContext::new();
//! let mesh = TriangleMesh::new(&[Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]]);
//! let mut display = MeshDisplay::new("triangle", mesh);
//!
//! let program = ShaderProgram::new("flat").with_attribute("in_position", 0);
//! // Render synchronizes dirty data before submitting the draw
//! display.render(&ctx, &program).unwrap();
//! assert_eq!(ctx.take_draw_calls().len(), 1);
//! ```

pub mod context;
pub mod debug_draw;
pub mod display;
pub mod error;
pub mod geometry;
pub mod registry;
pub mod resources;
pub mod shader;
pub mod util;

// Re-export main types for convenience
pub use context::{
    BufferHandle, ContextCapabilities, DrawCall, GpuContext, RenderMode, VertexArrayHandle,
};
pub use debug_draw::DebugRender;
pub use display::Displayable;
pub use error::{GpuMeshError, GpuMeshResult};
pub use registry::{RenderObject, RenderObjectRegistry, RenderObjectType, RoIndex};
pub use resources::{BufferDescriptor, BufferUsage, GpuBuffer, VertexArray};
pub use shader::{ShaderProgram, UniformValue};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library.
///
/// Optional; only emits the startup log line.
pub fn init() {
    log::info!("gpu-mesh v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_registry_creation() {
        let registry = RenderObjectRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_context_creation() {
        let ctx = GpuContext::new();
        assert_eq!(ctx.buffer_count(), 0);
        assert_eq!(ctx.name(), "Recording Context");
    }
}
