//! Displayable over a keyed set of index layers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{GpuContext, RenderMode};
use crate::display::{AttribArrayDisplayable, Displayable, IndexBinding};
use crate::error::{GpuMeshError, GpuMeshResult};
use crate::geometry::index_layer::{LayerKey, SEMANTIC_LINE, SEMANTIC_POINT, SEMANTIC_TRIANGLE};
use crate::geometry::mesh::MultiIndexedGeometry;
use crate::geometry::Attrib;
use crate::shader::ShaderProgram;

/// Displayable over a [`MultiIndexedGeometry`], one index binding per layer.
///
/// Each layer carries its own dirty flag and GPU buffer, so re-uploading
/// one layer never touches the others. Plain [`render`](Displayable::render)
/// draws the active layer: the explicitly designated default if one was set,
/// otherwise the first layer registered on the geometry.
pub struct MultiIndexedDisplay {
    base: AttribArrayDisplayable<MultiIndexedGeometry>,
    layers: HashMap<LayerKey, IndexBinding>,
    default_layer: Option<LayerKey>,
}

fn layer_label(name: &str, key: &LayerKey) -> String {
    if key.name().is_empty() {
        match key.semantics().iter().next() {
            Some(tag) => format!("{name}::{tag}"),
            None => format!("{name}::layer"),
        }
    } else {
        format!("{}::{}", name, key.name())
    }
}

impl MultiIndexedDisplay {
    /// Wrap a geometry, creating one binding per existing layer.
    pub fn new(name: impl Into<String>, geometry: MultiIndexedGeometry) -> Self {
        let layers = geometry
            .layer_keys()
            .iter()
            .map(|key| (key.clone(), IndexBinding::new()))
            .collect();
        Self {
            base: AttribArrayDisplayable::new(name, geometry),
            layers,
            default_layer: None,
        }
    }

    /// Attribute and render-mode state shared with the other variants.
    pub fn base(&self) -> &AttribArrayDisplayable<MultiIndexedGeometry> {
        &self.base
    }

    /// Mutable attribute and render-mode state.
    pub fn base_mut(&mut self) -> &mut AttribArrayDisplayable<MultiIndexedGeometry> {
        &mut self.base
    }

    /// The wrapped geometry.
    pub fn geometry(&self) -> &MultiIndexedGeometry {
        self.base.geometry()
    }

    /// Mutable access to the wrapped geometry. After mutating a layer's
    /// indices, call [`set_layer_dirty`](Self::set_layer_dirty).
    pub fn geometry_mut(&mut self) -> &mut MultiIndexedGeometry {
        self.base.geometry_mut()
    }

    /// Replace the wrapped geometry; bindings are rebuilt per the new layer
    /// set and the default designation survives only if its key still
    /// exists.
    pub fn load_geometry(&mut self, geometry: MultiIndexedGeometry) {
        self.layers = geometry
            .layer_keys()
            .iter()
            .map(|key| (key.clone(), IndexBinding::new()))
            .collect();
        if let Some(default) = &self.default_layer {
            if !geometry.contains_layer(default) {
                self.default_layer = None;
            }
        }
        self.base.load_geometry(geometry);
    }

    /// Add an attribute to the geometry and mirror it with a new slot.
    pub fn add_attrib(&mut self, attrib: Attrib) -> Option<usize> {
        self.base.add_attrib(attrib)
    }

    /// Insert or replace an index layer. Returns `true` if the key was new.
    ///
    /// Existing layers are untouched either way; only the addressed layer
    /// is marked for upload.
    pub fn add_layer(&mut self, key: LayerKey, indices: Vec<u32>) -> bool {
        let is_new = self.base.geometry_mut().set_layer(key.clone(), indices);
        self.layers
            .entry(key)
            .or_insert_with(IndexBinding::new)
            .set_dirty();
        is_new
    }

    /// Mark one layer stale after mutating its indices. Unknown keys are a
    /// logged no-op.
    pub fn set_layer_dirty(&mut self, key: &LayerKey) {
        match self.layers.get_mut(key) {
            Some(binding) => binding.set_dirty(),
            None => log::debug!(
                "Displayable {:?}: set_layer_dirty for unknown layer {key:?}",
                self.base.name()
            ),
        }
    }

    /// Designate the layer plain rendering draws.
    ///
    /// # Errors
    ///
    /// Fails with [`GpuMeshError::InvalidParameter`] if no such layer
    /// exists.
    pub fn set_default_layer(&mut self, key: LayerKey) -> GpuMeshResult<()> {
        if !self.base.geometry().contains_layer(&key) {
            return Err(GpuMeshError::InvalidParameter(format!(
                "no index layer {key:?}"
            )));
        }
        self.default_layer = Some(key);
        Ok(())
    }

    /// The key plain rendering resolves to: the designated default, else
    /// the first layer registered on the geometry.
    pub fn active_layer_key(&self) -> Option<LayerKey> {
        self.default_layer
            .clone()
            .or_else(|| self.base.geometry().layer_keys().first().cloned())
    }

    /// Whether any attribute slot or layer needs an upload.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty() || self.layers.values().any(IndexBinding::is_dirty)
    }

    fn mode_for_layer(&self, key: &LayerKey) -> RenderMode {
        let semantics = key.semantics();
        if semantics.contains(SEMANTIC_LINE) {
            RenderMode::Lines
        } else if semantics.contains(SEMANTIC_POINT) {
            RenderMode::Points
        } else if semantics.contains(SEMANTIC_TRIANGLE) {
            RenderMode::Triangles
        } else {
            self.base.render_mode()
        }
    }

    /// Draw one layer with `program`, synchronizing first if anything is
    /// dirty. Empty and unknown layers are skipped.
    pub fn render_layer(
        &mut self,
        ctx: &Arc<GpuContext>,
        program: &ShaderProgram,
        key: &LayerKey,
    ) -> GpuMeshResult<()> {
        if self.is_dirty() {
            self.update_gpu(ctx)?;
        }
        self.base.ensure_vao(ctx, program)?;
        let mode = self.mode_for_layer(key);
        let Some(binding) = self.layers.get(key) else {
            log::debug!(
                "Displayable {:?}: render_layer for unknown layer {key:?}",
                self.base.name()
            );
            return Ok(());
        };
        let Some(buffer) = binding.buffer() else {
            log::trace!(
                "Displayable {:?}: layer {key:?} is empty, skipping draw",
                self.base.name()
            );
            return Ok(());
        };
        ctx.draw_elements(mode, binding.element_count() as u32, buffer.handle());
        Ok(())
    }
}

impl Displayable for MultiIndexedDisplay {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn update_gpu(&mut self, ctx: &Arc<GpuContext>) -> GpuMeshResult<()> {
        self.base.update_attribs_gpu(ctx)?;
        let name = self.base.name().to_string();
        for (key, binding) in self.layers.iter_mut() {
            if !binding.is_dirty() {
                continue;
            }
            let indices = self.base.geometry().layer(key).unwrap_or(&[]);
            binding.sync(ctx, &layer_label(&name, key), indices)?;
        }
        Ok(())
    }

    fn render(&mut self, ctx: &Arc<GpuContext>, program: &ShaderProgram) -> GpuMeshResult<()> {
        let Some(key) = self.active_layer_key() else {
            log::trace!("Displayable {:?}: no index layers, skipping draw", self.name());
            return Ok(());
        };
        self.render_layer(ctx, program, &key)
    }

    fn num_vertices(&self) -> usize {
        self.base.num_vertices()
    }

    fn num_faces(&self) -> usize {
        let Some(key) = self.active_layer_key() else {
            return 0;
        };
        if self.mode_for_layer(&key) != RenderMode::Triangles {
            return 0;
        }
        self.base
            .geometry()
            .layer(&key)
            .map(|indices| indices.len() / 3)
            .unwrap_or(0)
    }

    fn discard_gpu(&mut self) {
        self.base.discard_gpu();
        for binding in self.layers.values_mut() {
            binding.discard();
        }
    }
}

static_assertions::assert_impl_all!(MultiIndexedDisplay: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DrawCall;
    use crate::geometry::ATTRIB_POSITION;
    use glam::Vec3;

    fn geometry() -> MultiIndexedGeometry {
        MultiIndexedGeometry::new(&[Vec3::ZERO, Vec3::X, Vec3::Y])
            .with_layer(LayerKey::triangles(), vec![0, 1, 2])
            .with_layer(
                LayerKey::new([SEMANTIC_LINE, "Wireframe"], ""),
                vec![0, 1, 1, 2, 2, 0],
            )
    }

    fn prog() -> ShaderProgram {
        ShaderProgram::new("flat").with_attribute(ATTRIB_POSITION, 0)
    }

    #[test]
    fn test_default_active_layer_is_first_registered() {
        let disp = MultiIndexedDisplay::new("multi", geometry());
        assert_eq!(disp.active_layer_key(), Some(LayerKey::triangles()));
    }

    #[test]
    fn test_set_default_layer() {
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        let wire = LayerKey::new(["Wireframe", SEMANTIC_LINE], "");
        disp.set_default_layer(wire.clone()).unwrap();
        assert_eq!(disp.active_layer_key(), Some(wire));

        let missing = LayerKey::new([SEMANTIC_TRIANGLE], "absent");
        assert!(disp.set_default_layer(missing).is_err());
    }

    #[test]
    fn test_render_draws_active_layer() {
        let ctx = GpuContext::new();
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        disp.render(&ctx, &prog()).unwrap();

        let calls = ctx.take_draw_calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            DrawCall::Elements { mode, count, .. } => {
                assert_eq!(*mode, RenderMode::Triangles);
                assert_eq!(*count, 3);
            }
            other => panic!("expected indexed draw, got {other:?}"),
        }
    }

    #[test]
    fn test_render_layer_uses_layer_mode() {
        let ctx = GpuContext::new();
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        let wire = LayerKey::new([SEMANTIC_LINE, "Wireframe"], "");
        disp.render_layer(&ctx, &prog(), &wire).unwrap();

        match &ctx.take_draw_calls()[0] {
            DrawCall::Elements { mode, count, .. } => {
                assert_eq!(*mode, RenderMode::Lines);
                assert_eq!(*count, 6);
            }
            other => panic!("expected indexed draw, got {other:?}"),
        }
    }

    #[test]
    fn test_per_layer_dirty_isolation() {
        let ctx = GpuContext::new();
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        disp.update_gpu(&ctx).unwrap();
        let uploads = ctx.upload_count();

        let wire = LayerKey::new([SEMANTIC_LINE, "Wireframe"], "");
        disp.geometry_mut().set_layer(wire.clone(), vec![0, 2]);
        disp.set_layer_dirty(&wire);
        disp.update_gpu(&ctx).unwrap();

        // Exactly one layer re-uploaded
        assert_eq!(ctx.upload_count(), uploads + 1);
    }

    #[test]
    fn test_add_layer_is_additive() {
        let ctx = GpuContext::new();
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        disp.update_gpu(&ctx).unwrap();
        let uploads = ctx.upload_count();

        assert!(disp.add_layer(LayerKey::new([SEMANTIC_POINT], "corners"), vec![0, 2]));
        disp.update_gpu(&ctx).unwrap();
        assert_eq!(ctx.upload_count(), uploads + 1);
        assert_eq!(disp.geometry().num_layers(), 3);
    }

    #[test]
    fn test_num_faces_from_active_triangle_layer() {
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        assert_eq!(disp.num_faces(), 1);

        let wire = LayerKey::new([SEMANTIC_LINE, "Wireframe"], "");
        disp.set_default_layer(wire).unwrap();
        assert_eq!(disp.num_faces(), 0);
    }

    #[test]
    fn test_load_geometry_resets_default_if_missing() {
        let mut disp = MultiIndexedDisplay::new("multi", geometry());
        let wire = LayerKey::new([SEMANTIC_LINE, "Wireframe"], "");
        disp.set_default_layer(wire).unwrap();

        disp.load_geometry(
            MultiIndexedGeometry::new(&[Vec3::ZERO]).with_layer(LayerKey::triangles(), vec![]),
        );
        assert_eq!(disp.active_layer_key(), Some(LayerKey::triangles()));
    }
}
