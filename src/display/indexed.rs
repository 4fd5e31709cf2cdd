//! Displayables over a single drawable index layer.

use std::sync::Arc;

use crate::context::GpuContext;
use crate::display::{AttribArrayDisplayable, Displayable};
use crate::error::GpuMeshResult;
use crate::geometry::mesh::{DrawableIndex, IndexPrimitive, IndexedGeometry};
use crate::geometry::Attrib;
use crate::resources::{BufferDescriptor, BufferUsage, GpuBuffer};
use crate::shader::ShaderProgram;

/// GPU mirror of one flat index array.
///
/// Index data has no observer; owners flip the dirty flag explicitly after
/// mutating indices. The element count recorded by the last sync is what a
/// subsequent draw consumes.
#[derive(Debug)]
pub(crate) struct IndexBinding {
    buffer: Option<Arc<GpuBuffer>>,
    dirty: bool,
    element_count: usize,
}

impl IndexBinding {
    pub(crate) fn new() -> Self {
        Self {
            buffer: None,
            dirty: true,
            element_count: 0,
        }
    }

    pub(crate) fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Element count as of the last sync.
    pub(crate) fn element_count(&self) -> usize {
        self.element_count
    }

    pub(crate) fn buffer(&self) -> Option<&Arc<GpuBuffer>> {
        self.buffer.as_ref()
    }

    /// Upload `indices` if dirty. An empty array releases the buffer.
    pub(crate) fn sync(
        &mut self,
        ctx: &Arc<GpuContext>,
        label: &str,
        indices: &[u32],
    ) -> GpuMeshResult<()> {
        if !self.dirty {
            return Ok(());
        }
        self.element_count = indices.len();
        if indices.is_empty() {
            self.buffer = None;
            self.dirty = false;
            return Ok(());
        }
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        let buffer = match &self.buffer {
            Some(buffer) => buffer.clone(),
            None => {
                let descriptor = BufferDescriptor::new(bytes.len() as u64, BufferUsage::INDEX)
                    .with_label(label.to_string());
                let buffer = ctx.create_buffer(&descriptor)?;
                self.buffer = Some(buffer.clone());
                buffer
            }
        };
        buffer.upload(bytes);
        self.dirty = false;
        Ok(())
    }

    /// Release the buffer and mark dirty for the next sync.
    pub(crate) fn discard(&mut self) {
        self.buffer = None;
        self.dirty = true;
        self.element_count = 0;
    }
}

/// Displayable over an [`IndexedGeometry`] with one drawable index layer.
pub struct IndexedDisplay<P: DrawableIndex> {
    base: AttribArrayDisplayable<IndexedGeometry<P>>,
    index: IndexBinding,
}

/// A triangle mesh displayable.
pub type MeshDisplay = IndexedDisplay<[u32; 3]>;
/// A line mesh displayable.
pub type LineMeshDisplay = IndexedDisplay<[u32; 2]>;

impl<P: DrawableIndex> IndexedDisplay<P> {
    /// Wrap a geometry, defaulting the render mode to the primitive's.
    pub fn new(name: impl Into<String>, geometry: IndexedGeometry<P>) -> Self {
        Self {
            base: AttribArrayDisplayable::new(name, geometry)
                .with_render_mode(P::DEFAULT_RENDER_MODE),
            index: IndexBinding::new(),
        }
    }

    /// Attribute and render-mode state shared with the other variants.
    pub fn base(&self) -> &AttribArrayDisplayable<IndexedGeometry<P>> {
        &self.base
    }

    /// Mutable attribute and render-mode state.
    pub fn base_mut(&mut self) -> &mut AttribArrayDisplayable<IndexedGeometry<P>> {
        &mut self.base
    }

    /// The wrapped geometry.
    pub fn geometry(&self) -> &IndexedGeometry<P> {
        self.base.geometry()
    }

    /// Mutable access to the wrapped geometry. After mutating indices, call
    /// [`set_indices_dirty`](Self::set_indices_dirty).
    pub fn geometry_mut(&mut self) -> &mut IndexedGeometry<P> {
        self.base.geometry_mut()
    }

    /// Replace the wrapped geometry; attributes and indices all re-upload.
    pub fn load_geometry(&mut self, geometry: IndexedGeometry<P>) {
        self.base.load_geometry(geometry);
        self.index.set_dirty();
    }

    /// Mark the index layer stale after mutating indices.
    pub fn set_indices_dirty(&mut self) {
        self.index.set_dirty();
    }

    /// Add an attribute to the geometry and mirror it with a new slot.
    pub fn add_attrib(&mut self, attrib: Attrib) -> Option<usize> {
        self.base.add_attrib(attrib)
    }

    /// Whether any attribute slot or the index layer needs an upload.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.index.is_dirty()
    }

    fn sync_indices(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        let label = format!("{}::indices", self.base.name());
        let indices = P::as_u32s(self.base.geometry().indices());
        self.index.sync(ctx, &label, indices)
    }
}

impl<P: DrawableIndex> Displayable for IndexedDisplay<P> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn update_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        self.base.update_attribs_gpu(ctx)?;
        self.sync_indices(ctx)
    }

    fn render(&mut self, ctx: &Arc<GpuContext>, program: &ShaderProgram) -> GpuMeshResult<()> {
        if self.is_dirty() {
            self.update_gpu(ctx)?;
        }
        self.base.ensure_vao(ctx, program)?;
        let count = self.index.element_count();
        let Some(buffer) = self.index.buffer() else {
            log::trace!("Displayable {:?}: empty index layer, skipping draw", self.name());
            return Ok(());
        };
        ctx.draw_elements(self.base.render_mode(), count as u32, buffer.handle());
        Ok(())
    }

    fn num_vertices(&self) -> usize {
        self.base.num_vertices()
    }

    fn num_faces(&self) -> usize {
        if P::COUNTS_AS_FACES {
            self.base.geometry().indices().len()
        } else {
            0
        }
    }

    fn discard_gpu(&mut self) {
        self.base.discard_gpu();
        self.index.discard();
    }
}

static_assertions::assert_impl_all!(MeshDisplay: Send);
