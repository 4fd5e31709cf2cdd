//! Attribute slot management and buffer synchronization.
//!
//! [`AttribArrayDisplayable`] is the building block shared by every concrete
//! displayable: it owns a CPU geometry, one buffer slot per attribute, the
//! [`DirtyMask`] those attributes notify, the vertex array, and the
//! CPU-to-shader attribute name translation table.

use std::sync::Arc;

use crate::context::{BufferHandle, GpuContext, RenderMode, VertexArrayHandle};
use crate::error::{GpuMeshError, GpuMeshResult};
use crate::geometry::attrib::{AttribObserver, AttribSemantic, DirtyMask};
use crate::geometry::mesh::CoreGeometry;
use crate::geometry::Attrib;
use crate::resources::{AttributeBinding, BufferDescriptor, BufferUsage, GpuBuffer, VertexArray};
use crate::shader::ShaderProgram;
use crate::util::BijectiveAssociation;

/// One vertex buffer slot, paired by index with an attribute of the geometry.
#[derive(Debug)]
pub struct AttributeSlot {
    name: String,
    buffer: Option<Arc<GpuBuffer>>,
}

impl AttributeSlot {
    /// Name of the CPU attribute feeding this slot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The slot's GPU buffer, absent until the first non-empty upload.
    pub fn buffer(&self) -> Option<&Arc<GpuBuffer>> {
        self.buffer.as_ref()
    }
}

/// Geometry plus its GPU mirror state.
///
/// Slot `i` always mirrors attribute `i` of the geometry, and dirty bit `i`
/// tracks whether that mirror is stale. The mask is shared with the
/// geometry's observer tokens through an `Arc`; replacing the geometry
/// allocates a fresh mask so tokens registered on the old one fall silent.
#[derive(Debug)]
pub struct AttribArrayDisplayable<G: CoreGeometry> {
    name: String,
    render_mode: RenderMode,
    geometry: G,
    slots: Vec<AttributeSlot>,
    dirty: Arc<DirtyMask>,
    vao: Option<Arc<VertexArray>>,
    vao_dirty: bool,
    translation: BijectiveAssociation<String, String>,
}

impl<G: CoreGeometry> AttribArrayDisplayable<G> {
    /// Wrap a geometry, registering one observer per attribute.
    pub fn new(name: impl Into<String>, geometry: G) -> Self {
        let mut displayable = Self {
            name: name.into(),
            render_mode: RenderMode::default(),
            geometry,
            slots: Vec::new(),
            dirty: DirtyMask::new_all_dirty(0),
            vao: None,
            vao_dirty: true,
            translation: BijectiveAssociation::new(),
        };
        displayable.rebuild_slots();
        displayable
    }

    /// Set the render mode (builder form).
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Displayable name, used for resource labels and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current render mode.
    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// Set the render mode. Stored verbatim; not validated against the
    /// geometry shape.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.render_mode = mode;
    }

    /// The wrapped geometry.
    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    /// Mutable access to the wrapped geometry.
    ///
    /// Attribute mutations through
    /// [`Attrib::set_data`](crate::geometry::Attrib::set_data) mark the
    /// matching slot dirty automatically. Structural edits (adding
    /// attributes directly to the manager) are not observed; prefer
    /// [`add_attrib`](Self::add_attrib).
    pub fn geometry_mut(&mut self) -> &mut G {
        &mut self.geometry
    }

    /// Replace the wrapped geometry.
    ///
    /// Slots are rebuilt against the new attribute list with a fresh dirty
    /// mask (everything dirty), and observers registered on the old
    /// geometry become inert.
    pub fn load_geometry(&mut self, geometry: G) {
        log::debug!("Displayable {:?}: loading new geometry", self.name);
        self.geometry = geometry;
        for slot in &mut self.slots {
            slot.buffer = None;
        }
        self.rebuild_slots();
    }

    fn rebuild_slots(&mut self) {
        let count = self.geometry.attribs().len();
        self.dirty = DirtyMask::new_all_dirty(count);
        self.slots = self
            .geometry
            .attribs()
            .iter()
            .map(|attrib| AttributeSlot {
                name: attrib.name().to_string(),
                buffer: None,
            })
            .collect();
        for (i, attrib) in self.geometry.attribs_mut().iter_mut().enumerate() {
            attrib.reset_observers();
            attrib.register_observer(AttribObserver::new(&self.dirty, i));
        }
        self.vao_dirty = true;
    }

    /// Add an attribute to the geometry and mirror it with a new slot.
    ///
    /// Returns the slot index, or `None` if the name already exists.
    pub fn add_attrib(&mut self, attrib: Attrib) -> Option<usize> {
        let index = self.geometry.attribs_mut().add(attrib)?;
        self.dirty.push();
        if let Some(attrib) = self.geometry.attribs_mut().at_mut(index) {
            attrib.register_observer(AttribObserver::new(&self.dirty, index));
            self.slots.push(AttributeSlot {
                name: attrib.name().to_string(),
                buffer: None,
            });
        }
        self.vao_dirty = true;
        Some(index)
    }

    /// The attribute slots in index order.
    pub fn slots(&self) -> &[AttributeSlot] {
        &self.slots
    }

    /// Whether any slot needs an upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty.any()
    }

    /// Mark a slot dirty by index. Out-of-range is a logged no-op.
    pub fn set_dirty_index(&self, slot: usize) {
        self.dirty.mark(slot);
    }

    /// Mark a slot dirty by attribute name. Unknown names are a logged no-op.
    pub fn set_dirty(&self, name: &str) {
        match self.geometry.attribs().index_of(name) {
            Some(index) => self.dirty.mark(index),
            None => log::debug!(
                "Displayable {:?}: set_dirty for unknown attribute {name:?}",
                self.name
            ),
        }
    }

    /// Mark a slot dirty by standard semantic.
    pub fn set_dirty_semantic(&self, semantic: AttribSemantic) {
        self.set_dirty(semantic.name());
    }

    /// Mark every slot dirty, forcing a full re-upload.
    pub fn set_all_dirty(&self) {
        self.dirty.mark_all();
    }

    /// Bind a CPU attribute name to a differing shader input name.
    ///
    /// The table is bijective. Binding either name to a second counterpart
    /// fails with [`GpuMeshError::NameConflict`] and leaves every existing
    /// pair unchanged; re-adding an existing pair succeeds.
    pub fn set_attrib_name_correspondence(
        &mut self,
        mesh_name: impl Into<String>,
        shader_name: impl Into<String>,
    ) -> GpuMeshResult<()> {
        let mesh_name = mesh_name.into();
        let shader_name = shader_name.into();
        if !self.translation.insert(mesh_name.clone(), shader_name.clone()) {
            return Err(GpuMeshError::NameConflict {
                mesh_name,
                shader_name,
            });
        }
        self.vao_dirty = true;
        Ok(())
    }

    /// Upload the data of every dirty slot.
    ///
    /// Clean displayables return without touching the context. A dirty slot
    /// whose CPU array is empty releases its buffer instead of uploading.
    /// Each successful upload clears the slot's dirty bit individually, so a
    /// failure leaves the remaining bits set for the next attempt.
    pub fn update_attribs_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        if !self.dirty.any() {
            return Ok(());
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !self.dirty.is_dirty(i) {
                continue;
            }
            let attrib = match self.geometry.attribs().at(i) {
                Some(attrib) => attrib,
                None => {
                    // Slot/attribute counts can only diverge through a bug in
                    // rebuild_slots; tolerate and clear.
                    log::debug!(
                        "Displayable {:?}: slot {i} has no attribute, skipping",
                        self.name
                    );
                    self.dirty.clear(i);
                    continue;
                }
            };
            let bytes = attrib.bytes();
            if bytes.is_empty() {
                if slot.buffer.take().is_some() {
                    self.vao_dirty = true;
                }
                self.dirty.clear(i);
                continue;
            }
            let buffer = match &slot.buffer {
                Some(buffer) => buffer.clone(),
                None => {
                    let descriptor = BufferDescriptor::new(bytes.len() as u64, BufferUsage::VERTEX)
                        .with_label(format!("{}::{}", self.name, slot.name));
                    let buffer = ctx.create_buffer(&descriptor)?;
                    slot.buffer = Some(buffer.clone());
                    self.vao_dirty = true;
                    buffer
                }
            };
            buffer.upload(bytes);
            self.dirty.clear(i);
        }
        Ok(())
    }

    /// Ensure the vertex array exists and matches `program`'s input
    /// interface.
    ///
    /// Bindings are rebuilt when the program signature changes or when slot
    /// buffers were created or released since the last build. Slots without
    /// a matching shader input (after translation) are skipped with a trace.
    pub fn ensure_vao(
        &mut self,
        ctx: &Arc<GpuContext>,
        program: &ShaderProgram,
    ) -> GpuMeshResult<()> {
        let vao = match &self.vao {
            Some(vao) => vao.clone(),
            None => {
                let vao = ctx.create_vertex_array(self.name.clone())?;
                self.vao = Some(vao.clone());
                self.vao_dirty = true;
                vao
            }
        };
        if !self.vao_dirty && vao.program_signature() == Some(program.signature()) {
            return Ok(());
        }

        let mut bindings = Vec::with_capacity(self.slots.len());
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(buffer) = &slot.buffer else {
                continue;
            };
            let shader_name = self
                .translation
                .get(&slot.name)
                .cloned()
                .unwrap_or_else(|| slot.name.clone());
            match program.attribute_location(&shader_name) {
                Some(location) => bindings.push(AttributeBinding {
                    location,
                    slot: i,
                    buffer: buffer.handle(),
                    name: shader_name,
                }),
                None => log::trace!(
                    "Displayable {:?}: program {:?} has no input {shader_name:?}, skipping slot {i}",
                    self.name,
                    program.name()
                ),
            }
        }
        vao.rebind(program.signature(), bindings);
        self.vao_dirty = false;
        Ok(())
    }

    /// Handle of the buffer backing a named attribute, if uploaded.
    pub fn vbo_handle(&self, name: &str) -> Option<BufferHandle> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.buffer.as_ref())
            .map(|buffer| buffer.handle())
    }

    /// Handle of the vertex array, if created.
    pub fn vao_handle(&self) -> Option<VertexArrayHandle> {
        self.vao.as_ref().map(|vao| vao.handle())
    }

    /// The vertex array, if created.
    pub fn vao(&self) -> Option<&Arc<VertexArray>> {
        self.vao.as_ref()
    }

    /// Vertex count of the wrapped geometry.
    pub fn num_vertices(&self) -> usize {
        self.geometry.num_vertices()
    }

    /// Release every GPU resource and mark everything dirty, so the next
    /// update recreates the mirror from scratch.
    pub fn discard_gpu(&mut self) {
        log::debug!("Displayable {:?}: discarding GPU resources", self.name);
        for slot in &mut self.slots {
            slot.buffer = None;
        }
        self.vao = None;
        self.vao_dirty = true;
        self.dirty.mark_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh::AttribArrayGeometry;
    use crate::geometry::{ATTRIB_COLOR, ATTRIB_NORMAL, ATTRIB_POSITION};
    use glam::Vec3;

    fn triangle() -> AttribArrayGeometry {
        AttribArrayGeometry::from_positions(&[Vec3::ZERO, Vec3::X, Vec3::Y])
    }

    #[test]
    fn test_update_uploads_attrib_bytes() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        assert!(disp.is_dirty());

        disp.update_attribs_gpu(&ctx).unwrap();
        assert!(!disp.is_dirty());

        let expected = disp
            .geometry()
            .attribs()
            .get(ATTRIB_POSITION)
            .unwrap()
            .bytes()
            .to_vec();
        let buffer = disp.slots()[0].buffer().unwrap();
        assert_eq!(buffer.contents(), expected);
    }

    #[test]
    fn test_clean_update_touches_nothing() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();
        let uploads = ctx.upload_count();

        disp.update_attribs_gpu(&ctx).unwrap();
        disp.update_attribs_gpu(&ctx).unwrap();
        assert_eq!(ctx.upload_count(), uploads);
    }

    #[test]
    fn test_geometry_mutation_marks_dirty() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();

        disp.geometry_mut()
            .attribs_mut()
            .get_mut(ATTRIB_POSITION)
            .unwrap()
            .set_data(&[Vec3::ONE, Vec3::ONE, Vec3::ONE]);
        assert!(disp.is_dirty());

        disp.update_attribs_gpu(&ctx).unwrap();
        let buffer = disp.slots()[0].buffer().unwrap();
        assert_eq!(buffer.contents(), bytemuck::cast_slice::<Vec3, u8>(&[Vec3::ONE; 3]));
    }

    #[test]
    fn test_empty_attrib_releases_buffer() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();
        assert!(disp.vbo_handle(ATTRIB_POSITION).is_some());

        disp.geometry_mut()
            .attribs_mut()
            .get_mut(ATTRIB_POSITION)
            .unwrap()
            .set_data::<Vec3>(&[]);
        disp.update_attribs_gpu(&ctx).unwrap();
        assert!(disp.vbo_handle(ATTRIB_POSITION).is_none());
        assert!(!disp.is_dirty());
    }

    #[test]
    fn test_add_attrib_extends_mask() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();

        let index = disp
            .add_attrib(Attrib::vec3(ATTRIB_NORMAL, &[Vec3::Z; 3]))
            .unwrap();
        assert_eq!(index, 1);
        assert!(disp.is_dirty());

        disp.update_attribs_gpu(&ctx).unwrap();
        assert!(disp.vbo_handle(ATTRIB_NORMAL).is_some());

        // New attribute is observed like the original ones
        disp.geometry_mut()
            .attribs_mut()
            .get_mut(ATTRIB_NORMAL)
            .unwrap()
            .set_data(&[Vec3::X; 3]);
        assert!(disp.is_dirty());
    }

    #[test]
    fn test_load_geometry_detaches_old_observers() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();

        disp.load_geometry(AttribArrayGeometry::from_positions(&[Vec3::ONE]));
        assert!(disp.is_dirty());
        disp.update_attribs_gpu(&ctx).unwrap();
        assert!(!disp.is_dirty());
        assert_eq!(disp.num_vertices(), 1);
    }

    #[test]
    fn test_vao_skips_unmatched_inputs() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new(
            "tri",
            triangle().with_attrib(Attrib::vec4(ATTRIB_COLOR, &[glam::Vec4::ONE; 3])),
        );
        disp.update_attribs_gpu(&ctx).unwrap();

        let prog = ShaderProgram::new("pos_only").with_attribute(ATTRIB_POSITION, 0);
        disp.ensure_vao(&ctx, &prog).unwrap();

        // Only the position slot is bound; color has no input in the program.
        let handle = disp.vao_handle().unwrap();
        assert_eq!(disp.vao().unwrap().bindings().len(), 1);

        // Rebinding against a richer program extends the set and reuses the
        // same vertex array.
        let rich = ShaderProgram::new("pos_color")
            .with_attribute(ATTRIB_POSITION, 0)
            .with_attribute(ATTRIB_COLOR, 5);
        disp.ensure_vao(&ctx, &rich).unwrap();
        assert_eq!(disp.vao().unwrap().bindings().len(), 2);
        assert_eq!(disp.vao_handle(), Some(handle));
    }

    #[test]
    fn test_translation_conflict() {
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.set_attrib_name_correspondence(ATTRIB_POSITION, "a_pos")
            .unwrap();
        // Same pair again is fine
        disp.set_attrib_name_correspondence(ATTRIB_POSITION, "a_pos")
            .unwrap();
        // Either side rebound elsewhere is a conflict
        let err = disp
            .set_attrib_name_correspondence(ATTRIB_POSITION, "a_other")
            .unwrap_err();
        assert!(matches!(err, GpuMeshError::NameConflict { .. }));
        let err = disp
            .set_attrib_name_correspondence(ATTRIB_NORMAL, "a_pos")
            .unwrap_err();
        assert!(matches!(err, GpuMeshError::NameConflict { .. }));
    }

    #[test]
    fn test_discard_gpu_forces_full_reupload() {
        let ctx = GpuContext::new();
        let mut disp = AttribArrayDisplayable::new("tri", triangle());
        disp.update_attribs_gpu(&ctx).unwrap();
        let first = disp.vbo_handle(ATTRIB_POSITION).unwrap();

        disp.discard_gpu();
        assert!(disp.is_dirty());
        assert!(disp.vbo_handle(ATTRIB_POSITION).is_none());
        assert!(disp.vao_handle().is_none());

        disp.update_attribs_gpu(&ctx).unwrap();
        let second = disp.vbo_handle(ATTRIB_POSITION).unwrap();
        assert_ne!(first, second);
    }
}
