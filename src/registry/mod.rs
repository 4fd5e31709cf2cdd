//! Render object registry.
//!
//! The registry is the shared, thread-guarded store of every render object.
//! A single mutex guards both the index map and the per-type buckets, so the
//! membership invariant - an object is either in both stores or in neither -
//! holds at every observable instant.
//!
//! Listener notifications are always delivered with the lock released.
//! Listeners may therefore call back into the registry; what they cannot get
//! is a torn view of the stores.

mod object;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

pub use object::{
    ComponentId, EntityId, ItemEntry, RenderObject, RenderObjectType, RoIndex,
};

/// Observer of registry membership changes.
///
/// Both hooks default to no-ops so listeners implement only what they need.
pub trait RegistryListener: Send + Sync {
    /// An object was added; its index is already assigned.
    fn render_object_added(&self, _ro: &Arc<RenderObject>) {}

    /// An object is being removed or expired; it is still queryable at the
    /// moment of the call.
    fn render_object_removed(&self, _ro: &Arc<RenderObject>) {}
}

#[derive(Default)]
struct Inner {
    objects: HashMap<RoIndex, Arc<RenderObject>>,
    by_type: [HashSet<RoIndex>; RenderObjectType::COUNT],
    next_index: u64,
}

/// Thread-guarded store of render objects.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use glam::Vec3;
/// use gpu_mesh::display::PointCloudDisplay;
/// use gpu_mesh::geometry::AttribArrayGeometry;
/// use gpu_mesh::registry::{
///     ComponentId, EntityId, RenderObject, RenderObjectRegistry, RenderObjectType,
/// };
///
/// let registry = RenderObjectRegistry::new();
/// let geometry = AttribArrayGeometry::from_positions(&[Vec3::ZERO]);
/// let ro = Arc::new(RenderObject::new(
///     "cloud",
///     RenderObjectType::Geometry,
///     EntityId(1),
///     ComponentId(1),
///     Box::new(PointCloudDisplay::new("cloud", geometry)),
/// ));
/// let index = registry.add(ro);
/// assert!(registry.exists(index));
/// ```
#[derive(Default)]
pub struct RenderObjectRegistry {
    inner: Mutex<Inner>,
    listeners: RwLock<Vec<Arc<dyn RegistryListener>>>,
}

impl RenderObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a membership listener.
    pub fn add_listener(&self, listener: Arc<dyn RegistryListener>) {
        self.listeners.write().push(listener);
    }

    /// Add an object, assigning it a fresh index.
    ///
    /// Listeners observe the object after both stores are updated and the
    /// lock is released.
    pub fn add(&self, ro: Arc<RenderObject>) -> RoIndex {
        let index = {
            let mut inner = self.inner.lock();
            let index = RoIndex(inner.next_index);
            inner.next_index += 1;
            ro.set_index(index);
            inner.objects.insert(index, ro.clone());
            inner.by_type[ro.ty().index()].insert(index);
            index
        };
        log::debug!("Registry: added object {:?} as {index:?}", ro.name());
        for listener in self.listeners.read().iter() {
            listener.render_object_added(&ro);
        }
        index
    }

    /// Whether an object with this index is registered.
    pub fn exists(&self, index: RoIndex) -> bool {
        index.is_valid() && self.inner.lock().objects.contains_key(&index)
    }

    /// Look up an object.
    ///
    /// A missing index is a caller bug; debug builds assert and release
    /// builds return `None`.
    pub fn get(&self, index: RoIndex) -> Option<Arc<RenderObject>> {
        let found = self.inner.lock().objects.get(&index).cloned();
        debug_assert!(found.is_some(), "no render object with index {index:?}");
        found
    }

    /// Remove an object, returning it.
    ///
    /// Listeners are notified before erasure, so they can still query the
    /// object. A missing index is a caller bug; debug builds assert.
    pub fn remove(&self, index: RoIndex) -> Option<Arc<RenderObject>> {
        let Some(ro) = self.get(index) else {
            log::warn!("Registry: remove of unknown index {index:?}");
            return None;
        };
        for listener in self.listeners.read().iter() {
            listener.render_object_removed(&ro);
        }
        {
            let mut inner = self.inner.lock();
            inner.objects.remove(&index);
            inner.by_type[ro.ty().index()].remove(&index);
        }
        ro.set_index(RoIndex::INVALID);
        log::debug!("Registry: removed object {:?}", ro.name());
        Some(ro)
    }

    /// Remove an object and expire it: its GPU resources are released and
    /// lingering references observe the expired flag.
    pub fn expire(&self, index: RoIndex) -> Option<Arc<RenderObject>> {
        let ro = self.remove(index)?;
        ro.has_expired();
        Some(ro)
    }

    /// Snapshot of every object of one type, in unspecified order.
    pub fn get_by_type(&self, ty: RenderObjectType) -> Vec<Arc<RenderObject>> {
        let inner = self.inner.lock();
        inner.by_type[ty.index()]
            .iter()
            .filter_map(|index| inner.objects.get(index).cloned())
            .collect()
    }

    /// Snapshot of every object, in unspecified order.
    pub fn get_all(&self) -> Vec<Arc<RenderObject>> {
        self.inner.lock().objects.values().cloned().collect()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().objects.is_empty()
    }

    /// Total face count of visible geometry objects.
    ///
    /// The snapshot is taken under the registry lock; mesh locks are taken
    /// afterwards so the statistic never holds both at once.
    pub fn num_faces(&self) -> usize {
        self.get_by_type(RenderObjectType::Geometry)
            .iter()
            .filter(|ro| ro.is_visible())
            .map(|ro| ro.num_faces())
            .sum()
    }

    /// Total vertex count of visible geometry objects.
    pub fn num_vertices(&self) -> usize {
        self.get_by_type(RenderObjectType::Geometry)
            .iter()
            .filter(|ro| ro.is_visible())
            .map(|ro| ro.num_vertices())
            .sum()
    }
}

static_assertions::assert_impl_all!(RenderObjectRegistry: Send, Sync);
