//! Non-indexed point cloud displayable.

use std::sync::Arc;

use crate::context::{GpuContext, RenderMode};
use crate::display::{AttribArrayDisplayable, Displayable};
use crate::error::GpuMeshResult;
use crate::geometry::mesh::AttribArrayGeometry;
use crate::geometry::Attrib;
use crate::shader::ShaderProgram;

/// Displayable over attribute-only geometry, drawn without indices.
pub struct PointCloudDisplay {
    base: AttribArrayDisplayable<AttribArrayGeometry>,
}

impl PointCloudDisplay {
    /// Wrap a geometry, defaulting the render mode to points.
    pub fn new(name: impl Into<String>, geometry: AttribArrayGeometry) -> Self {
        Self {
            base: AttribArrayDisplayable::new(name, geometry)
                .with_render_mode(RenderMode::Points),
        }
    }

    /// Attribute and render-mode state shared with the other variants.
    pub fn base(&self) -> &AttribArrayDisplayable<AttribArrayGeometry> {
        &self.base
    }

    /// Mutable attribute and render-mode state.
    pub fn base_mut(&mut self) -> &mut AttribArrayDisplayable<AttribArrayGeometry> {
        &mut self.base
    }

    /// The wrapped geometry.
    pub fn geometry(&self) -> &AttribArrayGeometry {
        self.base.geometry()
    }

    /// Mutable access to the wrapped geometry.
    pub fn geometry_mut(&mut self) -> &mut AttribArrayGeometry {
        self.base.geometry_mut()
    }

    /// Replace the wrapped geometry.
    pub fn load_geometry(&mut self, geometry: AttribArrayGeometry) {
        self.base.load_geometry(geometry);
    }

    /// Add an attribute to the geometry and mirror it with a new slot.
    pub fn add_attrib(&mut self, attrib: Attrib) -> Option<usize> {
        self.base.add_attrib(attrib)
    }

    /// Whether any attribute slot needs an upload.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty()
    }
}

impl Displayable for PointCloudDisplay {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn update_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        self.base.update_attribs_gpu(ctx)
    }

    fn render(&mut self, ctx: &Arc<GpuContext>, program: &ShaderProgram) -> GpuMeshResult<()> {
        if self.base.is_dirty() {
            self.base.update_attribs_gpu(ctx)?;
        }
        self.base.ensure_vao(ctx, program)?;
        let count = self.base.num_vertices();
        if count == 0 {
            log::trace!("Displayable {:?}: no vertices, skipping draw", self.name());
            return Ok(());
        }
        ctx.draw_arrays(self.base.render_mode(), 0, count as u32);
        Ok(())
    }

    fn num_vertices(&self) -> usize {
        self.base.num_vertices()
    }

    fn discard_gpu(&mut self) {
        self.base.discard_gpu();
    }
}

static_assertions::assert_impl_all!(PointCloudDisplay: Send);
