//! Render objects and their identifiers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::display::Displayable;

/// Registry-assigned index of a render object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoIndex(pub(crate) u64);

impl RoIndex {
    /// Sentinel for an object not (or no longer) registered.
    pub const INVALID: Self = Self(u64::MAX);

    /// Whether this index refers to a registered object.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Raw index value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for RoIndex {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Coarse render object category, used for bucketed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderObjectType {
    /// Scene geometry; the only type counted by scene statistics.
    Geometry,
    /// In-scene UI elements.
    Ui,
    /// Debug visualization.
    Debug,
    /// Decorative overlays (gizmos and the like).
    Fancy,
}

impl RenderObjectType {
    /// Number of categories.
    pub const COUNT: usize = 4;

    /// Dense index for bucket arrays.
    pub fn index(&self) -> usize {
        match self {
            Self::Geometry => 0,
            Self::Ui => 1,
            Self::Debug => 2,
            Self::Fancy => 3,
        }
    }
}

/// Entity the object belongs to, opaque to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId(pub u64);

/// Component the object was emitted by, opaque to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentId(pub u64);

/// Provenance of a render object: entity, component and registry index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemEntry {
    /// Owning entity.
    pub entity: EntityId,
    /// Emitting component.
    pub component: ComponentId,
    /// Registry index, [`RoIndex::INVALID`] while unregistered.
    pub index: RoIndex,
}

/// A registered renderable: one displayable plus bookkeeping.
///
/// Visibility and expiration are atomics so diagnostics never contend with
/// the mesh lock; the displayable itself is behind a [`Mutex`] because
/// updates and draws mutate it.
pub struct RenderObject {
    name: String,
    ty: RenderObjectType,
    entity: EntityId,
    component: ComponentId,
    visible: AtomicBool,
    expired: AtomicBool,
    index: AtomicU64,
    mesh: Mutex<Box<dyn Displayable>>,
}

impl RenderObject {
    /// Create a visible, unregistered render object.
    pub fn new(
        name: impl Into<String>,
        ty: RenderObjectType,
        entity: EntityId,
        component: ComponentId,
        mesh: Box<dyn Displayable>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            entity,
            component,
            visible: AtomicBool::new(true),
            expired: AtomicBool::new(false),
            index: AtomicU64::new(RoIndex::INVALID.0),
            mesh: Mutex::new(mesh),
        }
    }

    /// Object name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object category.
    pub fn ty(&self) -> RenderObjectType {
        self.ty
    }

    /// Whether the object is currently visible.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// Show or hide the object. Hidden objects keep their GPU state.
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }

    /// Registry index, [`RoIndex::INVALID`] while unregistered.
    pub fn index(&self) -> RoIndex {
        RoIndex(self.index.load(Ordering::Relaxed))
    }

    pub(crate) fn set_index(&self, index: RoIndex) {
        self.index.store(index.0, Ordering::Relaxed);
    }

    /// Provenance of this object.
    pub fn item_entry(&self) -> ItemEntry {
        ItemEntry {
            entity: self.entity,
            component: self.component,
            index: self.index(),
        }
    }

    /// Lock and access the displayable.
    pub fn mesh(&self) -> MutexGuard<'_, Box<dyn Displayable>> {
        self.mesh.lock()
    }

    /// Vertex count of the displayable.
    pub fn num_vertices(&self) -> usize {
        self.mesh.lock().num_vertices()
    }

    /// Face count of the displayable.
    pub fn num_faces(&self) -> usize {
        self.mesh.lock().num_faces()
    }

    /// Whether the object was expired out of its registry.
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Relaxed)
    }

    /// Mark the object expired and release its GPU resources.
    ///
    /// Lingering `Arc`s may still read the object afterwards; they observe
    /// the expired flag and a discarded mesh.
    pub(crate) fn has_expired(&self) {
        self.expired.store(true, Ordering::Relaxed);
        self.mesh.lock().discard_gpu();
    }
}

impl std::fmt::Debug for RenderObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderObject")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("index", &self.index())
            .field("visible", &self.is_visible())
            .field("expired", &self.is_expired())
            .finish()
    }
}

static_assertions::assert_impl_all!(RenderObject: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::PointCloudDisplay;
    use crate::geometry::mesh::AttribArrayGeometry;
    use glam::Vec3;

    fn object(name: &str, ty: RenderObjectType) -> RenderObject {
        let geometry = AttribArrayGeometry::from_positions(&[Vec3::ZERO, Vec3::X]);
        RenderObject::new(
            name,
            ty,
            EntityId(1),
            ComponentId(2),
            Box::new(PointCloudDisplay::new(name, geometry)),
        )
    }

    #[test]
    fn test_starts_visible_and_unregistered() {
        let ro = object("a", RenderObjectType::Geometry);
        assert!(ro.is_visible());
        assert!(!ro.is_expired());
        assert!(!ro.index().is_valid());
    }

    #[test]
    fn test_visibility_toggle() {
        let ro = object("a", RenderObjectType::Geometry);
        ro.set_visible(false);
        assert!(!ro.is_visible());
        // Hiding does not touch mesh data
        assert_eq!(ro.num_vertices(), 2);
    }

    #[test]
    fn test_expiration_discards_mesh() {
        let ro = object("a", RenderObjectType::Debug);
        ro.has_expired();
        assert!(ro.is_expired());
        // Mesh is still readable through lingering references
        assert_eq!(ro.num_vertices(), 2);
    }

    #[test]
    fn test_item_entry_tracks_index() {
        let ro = object("a", RenderObjectType::Ui);
        assert_eq!(ro.item_entry().index, RoIndex::INVALID);
        ro.set_index(RoIndex(5));
        assert_eq!(ro.item_entry().entity, EntityId(1));
        assert_eq!(ro.item_entry().component, ComponentId(2));
        assert_eq!(ro.item_entry().index, RoIndex(5));
    }

    #[test]
    fn test_type_indices_are_dense() {
        let all = [
            RenderObjectType::Geometry,
            RenderObjectType::Ui,
            RenderObjectType::Debug,
            RenderObjectType::Fancy,
        ];
        for (i, ty) in all.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
        assert_eq!(all.len(), RenderObjectType::COUNT);
    }
}
