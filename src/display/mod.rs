//! Displayables: CPU geometry paired with its GPU mirror.
//!
//! Every renderable object in the registry owns exactly one [`Displayable`].
//! The concrete variants differ only in how indices are handled:
//!
//! - [`PointCloudDisplay`] - no indices, non-indexed draws
//! - [`IndexedDisplay`] - one drawable index layer
//!   ([`MeshDisplay`], [`LineMeshDisplay`])
//! - [`MultiIndexedDisplay`] - a keyed set of index layers
//! - [`GeneralMeshDisplay`] - polygonal indices triangulated before upload
//!   ([`QuadMeshDisplay`], [`PolyMeshDisplay`])
//!
//! All of them share [`AttribArrayDisplayable`] for attribute-slot
//! synchronization.

mod attrib_array;
mod general_mesh;
mod indexed;
mod multi_indexed;
mod point_cloud;

use std::sync::Arc;

pub use attrib_array::{AttribArrayDisplayable, AttributeSlot};
pub use general_mesh::{GeneralMeshDisplay, PolyMeshDisplay, QuadMeshDisplay};
pub use indexed::{IndexedDisplay, LineMeshDisplay, MeshDisplay};
pub use multi_indexed::MultiIndexedDisplay;
pub use point_cloud::PointCloudDisplay;

pub(crate) use indexed::IndexBinding;

use crate::context::GpuContext;
use crate::error::GpuMeshResult;
use crate::shader::ShaderProgram;

/// A renderable object: CPU geometry plus the GPU state mirroring it.
///
/// The registry stores displayables behind this trait so heterogeneous
/// variants can live side by side.
pub trait Displayable: Send + 'static {
    /// Displayable name, used for resource labels and diagnostics.
    fn name(&self) -> &str;

    /// Upload the data of every dirty part; clean displayables return
    /// without touching the context.
    fn update_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()>;

    /// Draw with `program`, synchronizing first if anything is dirty.
    ///
    /// Rendering never consumes stale GPU data: a displayable whose
    /// [`update_gpu`](Self::update_gpu) was skipped this frame uploads here
    /// before submitting.
    fn render(&mut self, ctx: &Arc<GpuContext>, program: &ShaderProgram) -> GpuMeshResult<()>;

    /// Vertex count of the wrapped geometry.
    fn num_vertices(&self) -> usize;

    /// Face count for diagnostics. Variants without faces report 0.
    fn num_faces(&self) -> usize {
        0
    }

    /// Release every GPU resource and mark everything dirty.
    fn discard_gpu(&mut self);
}
