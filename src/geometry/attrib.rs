//! Named vertex attributes, dirty mask and observer tokens.
//!
//! Attributes store their data as raw `Pod` bytes plus an element format,
//! mirroring the GPU-agnostic byte storage used for CPU meshes. Each attribute
//! carries a list of observer tokens; mutating the attribute notifies every
//! token, whose only effect is setting the matching bit of the displayable's
//! [`DirtyMask`].
//!
//! Tokens hold a slot index and a weak reference to the mask (not raw
//! pointers), so tearing down or replacing a geometry can never dangle: a
//! stale token simply fails to upgrade and falls silent.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use bytemuck::Pod;
use glam::{Vec2, Vec3, Vec4};
use parking_lot::Mutex;

/// Well-known attribute name for vertex positions.
pub const ATTRIB_POSITION: &str = "in_position";
/// Well-known attribute name for vertex normals.
pub const ATTRIB_NORMAL: &str = "in_normal";
/// Well-known attribute name for vertex colors.
pub const ATTRIB_COLOR: &str = "in_color";
/// Well-known attribute name for texture coordinates.
pub const ATTRIB_TEXCOORD: &str = "in_texcoord";

/// Standard attribute semantics with their conventional names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribSemantic {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Vertex color.
    Color,
    /// Texture coordinates.
    TexCoord,
}

impl AttribSemantic {
    /// The conventional attribute name for this semantic.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => ATTRIB_POSITION,
            Self::Normal => ATTRIB_NORMAL,
            Self::Color => ATTRIB_COLOR,
            Self::TexCoord => ATTRIB_TEXCOORD,
        }
    }
}

/// Element format of an attribute array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttribFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Vec2,
    /// Three 32-bit floats.
    Vec3,
    /// Four 32-bit floats.
    Vec4,
    /// Single 32-bit unsigned integer.
    Uint,
}

impl AttribFormat {
    /// Size in bytes of one element.
    pub fn size(&self) -> usize {
        match self {
            Self::Float | Self::Uint => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
        }
    }

    /// Number of scalar components per element.
    pub fn component_count(&self) -> u32 {
        match self {
            Self::Float | Self::Uint => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }
}

/// Per-slot dirty flags shared between a displayable and its geometry's
/// observer tokens.
///
/// The bit count always equals the displayable's slot count. Marking an
/// out-of-range bit is tolerated and logged: it can only come from a stale
/// observer racing a slot rebuild, and must never crash.
#[derive(Debug)]
pub struct DirtyMask {
    bits: Mutex<Vec<bool>>,
}

impl DirtyMask {
    /// Create a mask of `len` bits, all dirty.
    ///
    /// A fresh mask accompanies a fresh slot array; everything needs its
    /// first upload.
    pub fn new_all_dirty(len: usize) -> Arc<Self> {
        Arc::new(Self {
            bits: Mutex::new(vec![true; len]),
        })
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.bits.lock().len()
    }

    /// Whether the mask has no bits.
    pub fn is_empty(&self) -> bool {
        self.bits.lock().is_empty()
    }

    /// Mark one bit dirty. Out-of-range is a logged no-op.
    pub fn mark(&self, index: usize) {
        let mut bits = self.bits.lock();
        if let Some(bit) = bits.get_mut(index) {
            *bit = true;
        } else {
            log::debug!(
                "DirtyMask: ignoring out-of-range dirty notification (index {index}, len {})",
                bits.len()
            );
        }
    }

    /// Whether one bit is dirty. Out-of-range reads as clean.
    pub fn is_dirty(&self, index: usize) -> bool {
        self.bits.lock().get(index).copied().unwrap_or(false)
    }

    /// Clear one bit after a successful upload.
    pub fn clear(&self, index: usize) {
        if let Some(bit) = self.bits.lock().get_mut(index) {
            *bit = false;
        }
    }

    /// Whether any bit is dirty.
    pub fn any(&self) -> bool {
        self.bits.lock().iter().any(|b| *b)
    }

    /// Mark every bit dirty.
    pub fn mark_all(&self) {
        self.bits.lock().iter_mut().for_each(|b| *b = true);
    }

    /// Append one dirty bit for a newly added slot.
    pub fn push(&self) {
        self.bits.lock().push(true);
    }
}

static_assertions::assert_impl_all!(DirtyMask: Send, Sync);

/// Registration token notifying one slot of one displayable.
#[derive(Debug, Clone)]
pub struct AttribObserver {
    mask: Weak<DirtyMask>,
    slot: usize,
}

impl AttribObserver {
    /// Create a token for `slot` of the given mask.
    pub fn new(mask: &Arc<DirtyMask>, slot: usize) -> Self {
        Self {
            mask: Arc::downgrade(mask),
            slot,
        }
    }

    /// Set the matching dirty bit. Inert if the mask is gone.
    pub fn notify(&self) {
        if let Some(mask) = self.mask.upgrade() {
            mask.mark(self.slot);
        }
    }
}

/// A named vertex attribute array.
#[derive(Debug)]
pub struct Attrib {
    name: String,
    format: AttribFormat,
    data: Vec<u8>,
    observers: Vec<AttribObserver>,
}

impl Attrib {
    /// Create an attribute from raw element data.
    pub fn from_data<T: Pod>(name: impl Into<String>, format: AttribFormat, data: &[T]) -> Self {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        debug_assert_eq!(bytes.len() % format.size(), 0);
        Self {
            name: name.into(),
            format,
            data: bytes.to_vec(),
            observers: Vec::new(),
        }
    }

    /// Create a `Vec2` attribute.
    pub fn vec2(name: impl Into<String>, data: &[Vec2]) -> Self {
        Self::from_data(name, AttribFormat::Vec2, data)
    }

    /// Create a `Vec3` attribute.
    pub fn vec3(name: impl Into<String>, data: &[Vec3]) -> Self {
        Self::from_data(name, AttribFormat::Vec3, data)
    }

    /// Create a `Vec4` attribute.
    pub fn vec4(name: impl Into<String>, data: &[Vec4]) -> Self {
        Self::from_data(name, AttribFormat::Vec4, data)
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element format.
    pub fn format(&self) -> AttribFormat {
        self.format
    }

    /// Raw byte view of the data.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    pub fn element_count(&self) -> usize {
        self.data.len() / self.format.size()
    }

    /// Typed view of the data.
    ///
    /// # Panics
    ///
    /// Panics if `T` does not match the stored element layout.
    pub fn as_slice<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(&self.data)
    }

    /// Replace the data and notify every registered observer.
    pub fn set_data<T: Pod>(&mut self, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        debug_assert_eq!(bytes.len() % self.format.size(), 0);
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.notify_observers();
    }

    /// Register an observer token.
    pub fn register_observer(&mut self, observer: AttribObserver) {
        self.observers.push(observer);
    }

    /// Drop all observer registrations.
    pub fn reset_observers(&mut self) {
        self.observers.clear();
    }

    fn notify_observers(&self) {
        for observer in &self.observers {
            observer.notify();
        }
    }
}

/// Ordered collection of named attributes.
///
/// Attribute order is the slot order of the owning displayable: the attribute
/// at index `i` feeds buffer slot `i`. Names are unique.
#[derive(Debug, Default)]
pub struct AttribManager {
    attribs: Vec<Attrib>,
    names: HashMap<String, usize>,
}

impl AttribManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, returning its index.
    ///
    /// Returns `None` if an attribute with the same name already exists.
    pub fn add(&mut self, attrib: Attrib) -> Option<usize> {
        if self.names.contains_key(attrib.name()) {
            log::debug!("AttribManager: attribute {:?} already exists", attrib.name());
            return None;
        }
        let index = self.attribs.len();
        self.names.insert(attrib.name().to_string(), index);
        self.attribs.push(attrib);
        Some(index)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attribs.len()
    }

    /// Whether the manager holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.attribs.is_empty()
    }

    /// Index of a named attribute.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Attribute at an index.
    pub fn at(&self, index: usize) -> Option<&Attrib> {
        self.attribs.get(index)
    }

    /// Mutable attribute at an index.
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Attrib> {
        self.attribs.get_mut(index)
    }

    /// Named attribute.
    pub fn get(&self, name: &str) -> Option<&Attrib> {
        self.index_of(name).and_then(|i| self.attribs.get(i))
    }

    /// Mutable named attribute.
    ///
    /// Mutations through [`Attrib::set_data`] notify the registered
    /// observers.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attrib> {
        self.index_of(name).and_then(|i| self.attribs.get_mut(i))
    }

    /// Iterate over attributes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Attrib> {
        self.attribs.iter()
    }

    /// Iterate mutably over attributes in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attrib> {
        self.attribs.iter_mut()
    }

    /// Vertex count, taken from the position attribute (0 if absent).
    pub fn num_vertices(&self) -> usize {
        self.get(ATTRIB_POSITION)
            .map(|a| a.element_count())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrib_element_count() {
        let attrib = Attrib::vec3("in_position", &[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(attrib.element_count(), 2);
        assert_eq!(attrib.bytes().len(), 24);
    }

    #[test]
    fn test_set_data_notifies_observer() {
        let mask = DirtyMask::new_all_dirty(2);
        mask.clear(0);
        mask.clear(1);

        let mut attrib = Attrib::vec3("in_position", &[Vec3::ZERO]);
        attrib.register_observer(AttribObserver::new(&mask, 1));
        assert!(!mask.any());

        attrib.set_data(&[Vec3::ONE, Vec3::ONE]);
        assert!(!mask.is_dirty(0));
        assert!(mask.is_dirty(1));
    }

    #[test]
    fn test_stale_observer_is_inert() {
        let mut attrib = Attrib::vec3("in_position", &[Vec3::ZERO]);
        {
            let mask = DirtyMask::new_all_dirty(1);
            attrib.register_observer(AttribObserver::new(&mask, 0));
        }
        // Mask dropped; notification must not panic
        attrib.set_data(&[Vec3::ONE]);
    }

    #[test]
    fn test_out_of_range_mark_is_noop() {
        let mask = DirtyMask::new_all_dirty(1);
        mask.clear(0);
        mask.mark(7);
        assert!(!mask.any());
    }

    #[test]
    fn test_manager_rejects_duplicate_names() {
        let mut mgr = AttribManager::new();
        assert_eq!(mgr.add(Attrib::vec3("in_position", &[])), Some(0));
        assert_eq!(mgr.add(Attrib::vec3("in_position", &[])), None);
        assert_eq!(mgr.len(), 1);
    }

    #[test]
    fn test_manager_num_vertices() {
        let mut mgr = AttribManager::new();
        mgr.add(Attrib::vec3(ATTRIB_POSITION, &[Vec3::ZERO; 5]));
        mgr.add(Attrib::vec3(ATTRIB_NORMAL, &[Vec3::Z; 5]));
        assert_eq!(mgr.num_vertices(), 5);
    }

    #[test]
    fn test_semantic_names() {
        assert_eq!(AttribSemantic::Position.name(), ATTRIB_POSITION);
        assert_eq!(AttribSemantic::Color.name(), ATTRIB_COLOR);
    }
}
