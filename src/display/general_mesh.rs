//! Displayable over polygonal geometry, triangulated before upload.

use std::sync::Arc;

use crate::context::{GpuContext, RenderMode};
use crate::display::{AttribArrayDisplayable, Displayable, IndexBinding};
use crate::error::GpuMeshResult;
use crate::geometry::mesh::{IndexPrimitive, PolyMesh, PolygonalGeometry, QuadMesh};
use crate::geometry::Attrib;
use crate::shader::ShaderProgram;

/// Displayable over a [`PolygonalGeometry`].
///
/// The GPU never sees the source polygons: the displayable keeps a derived
/// triangle cache that is recomputed by fan triangulation whenever the
/// indices are stale, and uploads that. Face diagnostics still report the
/// source polygon count.
pub struct GeneralMeshDisplay<G: PolygonalGeometry> {
    base: AttribArrayDisplayable<G>,
    index: IndexBinding,
    triangles: Vec<[u32; 3]>,
}

/// A quad mesh displayable.
pub type QuadMeshDisplay = GeneralMeshDisplay<QuadMesh>;
/// A polygon mesh displayable.
pub type PolyMeshDisplay = GeneralMeshDisplay<PolyMesh>;

impl<G: PolygonalGeometry> GeneralMeshDisplay<G> {
    /// Wrap a geometry; triangulated output always draws as triangles.
    pub fn new(name: impl Into<String>, geometry: G) -> Self {
        Self {
            base: AttribArrayDisplayable::new(name, geometry)
                .with_render_mode(RenderMode::Triangles),
            index: IndexBinding::new(),
            triangles: Vec::new(),
        }
    }

    /// Attribute and render-mode state shared with the other variants.
    pub fn base(&self) -> &AttribArrayDisplayable<G> {
        &self.base
    }

    /// Mutable attribute and render-mode state.
    pub fn base_mut(&mut self) -> &mut AttribArrayDisplayable<G> {
        &mut self.base
    }

    /// The wrapped geometry.
    pub fn geometry(&self) -> &G {
        self.base.geometry()
    }

    /// Mutable access to the wrapped geometry. After mutating faces, call
    /// [`set_indices_dirty`](Self::set_indices_dirty).
    pub fn geometry_mut(&mut self) -> &mut G {
        self.base.geometry_mut()
    }

    /// Replace the wrapped geometry; attributes and triangulation all
    /// rebuild.
    pub fn load_geometry(&mut self, geometry: G) {
        self.base.load_geometry(geometry);
        self.index.set_dirty();
    }

    /// Mark the triangulation stale after mutating faces.
    pub fn set_indices_dirty(&mut self) {
        self.index.set_dirty();
    }

    /// Add an attribute to the geometry and mirror it with a new slot.
    pub fn add_attrib(&mut self, attrib: Attrib) -> Option<usize> {
        self.base.add_attrib(attrib)
    }

    /// Whether any attribute slot or the triangulation needs an upload.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.index.is_dirty()
    }

    /// The cached triangulation as of the last update.
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }
}

impl<G: PolygonalGeometry> Displayable for GeneralMeshDisplay<G> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn update_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        self.base.update_attribs_gpu(ctx)?;
        if self.index.is_dirty() {
            // Triangulate before upload so the buffer only ever holds the
            // derived triangles.
            self.triangles.clear();
            self.base.geometry().triangulate_into(&mut self.triangles);
            let label = format!("{}::triangles", self.base.name());
            self.index
                .sync(ctx, &label, <[u32; 3]>::as_u32s(&self.triangles))?;
        }
        Ok(())
    }

    fn render(&mut self, ctx: &Arc<GpuContext>, program: &ShaderProgram) -> GpuMeshResult<()> {
        if self.is_dirty() {
            self.update_gpu(ctx)?;
        }
        self.base.ensure_vao(ctx, program)?;
        let count = self.index.element_count();
        let Some(buffer) = self.index.buffer() else {
            log::trace!("Displayable {:?}: no triangles, skipping draw", self.name());
            return Ok(());
        };
        ctx.draw_elements(self.base.render_mode(), count as u32, buffer.handle());
        Ok(())
    }

    fn num_vertices(&self) -> usize {
        self.base.num_vertices()
    }

    fn num_faces(&self) -> usize {
        self.base.geometry().num_polygons()
    }

    fn discard_gpu(&mut self) {
        self.base.discard_gpu();
        self.index.discard();
    }
}

static_assertions::assert_impl_all!(QuadMeshDisplay: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DrawCall;
    use crate::geometry::ATTRIB_POSITION;
    use glam::Vec3;

    fn quad() -> QuadMesh {
        QuadMesh::new(
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![[0, 1, 2, 3]],
        )
    }

    fn prog() -> ShaderProgram {
        ShaderProgram::new("flat").with_attribute(ATTRIB_POSITION, 0)
    }

    #[test]
    fn test_uploads_triangulated_indices() {
        let ctx = GpuContext::new();
        let mut disp = QuadMeshDisplay::new("quad", quad());
        disp.update_gpu(&ctx).unwrap();

        assert_eq!(disp.triangles(), &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(
            disp.index.buffer().unwrap().contents(),
            bytemuck::cast_slice::<u32, u8>(&[0, 1, 2, 0, 2, 3])
        );
    }

    #[test]
    fn test_faces_count_source_polygons() {
        let disp = QuadMeshDisplay::new("quad", quad());
        // One quad, even though it uploads as two triangles
        assert_eq!(disp.num_faces(), 1);
    }

    #[test]
    fn test_render_draws_triangles() {
        let ctx = GpuContext::new();
        let mut disp = QuadMeshDisplay::new("quad", quad());
        disp.render(&ctx, &prog()).unwrap();

        match &ctx.take_draw_calls()[0] {
            DrawCall::Elements { mode, count, .. } => {
                assert_eq!(*mode, RenderMode::Triangles);
                assert_eq!(*count, 6);
            }
            other => panic!("expected indexed draw, got {other:?}"),
        }
    }

    #[test]
    fn test_retriangulates_after_face_edit() {
        let ctx = GpuContext::new();
        let mut disp = PolyMeshDisplay::new(
            "poly",
            PolyMesh::new(&[Vec3::ZERO, Vec3::X, Vec3::Y], vec![vec![0, 1, 2]]),
        );
        disp.update_gpu(&ctx).unwrap();
        assert_eq!(disp.triangles().len(), 1);

        disp.geometry_mut().set_faces(vec![vec![0, 1, 2, 1]]);
        disp.set_indices_dirty();
        disp.update_gpu(&ctx).unwrap();
        assert_eq!(disp.triangles().len(), 2);
    }
}
