//! CPU-side geometry types wrapped by displayables.
//!
//! The displayable hierarchy owns exactly one of these per object:
//!
//! - [`AttribArrayGeometry`] - attributes only (point clouds)
//! - [`IndexedGeometry<P>`] - attributes plus one index layer
//!   ([`TriangleMesh`], [`LineMesh`], [`QuadMesh`])
//! - [`PolyMesh`] - attributes plus variable-arity polygon faces
//! - [`MultiIndexedGeometry`] - attributes plus a keyed set of index layers

use std::collections::HashMap;

use bytemuck::Pod;
use glam::Vec3;

use crate::context::RenderMode;
use crate::geometry::attrib::{Attrib, AttribManager, ATTRIB_POSITION};
use crate::geometry::index_layer::LayerKey;

/// Capability shared by every CPU geometry a displayable can wrap.
pub trait CoreGeometry: Send + 'static {
    /// The attribute collection.
    fn attribs(&self) -> &AttribManager;

    /// Mutable attribute collection. Mutations through
    /// [`Attrib::set_data`](crate::geometry::Attrib::set_data) notify the
    /// registered observers.
    fn attribs_mut(&mut self) -> &mut AttribManager;

    /// Vertex count, from the position attribute.
    fn num_vertices(&self) -> usize {
        self.attribs().num_vertices()
    }
}

/// Attribute-only geometry (a point cloud).
#[derive(Debug, Default)]
pub struct AttribArrayGeometry {
    attribs: AttribManager,
}

impl AttribArrayGeometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a geometry with vertex positions.
    pub fn from_positions(positions: &[Vec3]) -> Self {
        let mut geo = Self::new();
        geo.attribs.add(Attrib::vec3(ATTRIB_POSITION, positions));
        geo
    }

    /// Add an attribute (builder form). Duplicate names are ignored.
    pub fn with_attrib(mut self, attrib: Attrib) -> Self {
        self.attribs.add(attrib);
        self
    }
}

impl CoreGeometry for AttribArrayGeometry {
    fn attribs(&self) -> &AttribManager {
        &self.attribs
    }

    fn attribs_mut(&mut self) -> &mut AttribManager {
        &mut self.attribs
    }
}

/// Fixed-arity index primitive stored in a single index layer.
pub trait IndexPrimitive: Pod + Send + Sync + 'static {
    /// Vertices per primitive.
    const VERTICES_PER_ELEMENT: usize;

    /// Flat `u32` view of a primitive slice.
    fn as_u32s(primitives: &[Self]) -> &[u32] {
        bytemuck::cast_slice(primitives)
    }
}

impl IndexPrimitive for [u32; 2] {
    const VERTICES_PER_ELEMENT: usize = 2;
}

impl IndexPrimitive for [u32; 3] {
    const VERTICES_PER_ELEMENT: usize = 3;
}

impl IndexPrimitive for [u32; 4] {
    const VERTICES_PER_ELEMENT: usize = 4;
}

/// Index primitives the GPU can draw directly.
///
/// Quads are deliberately not drawable: polygonal geometry goes through
/// [`GeneralMeshDisplay`](crate::display::GeneralMeshDisplay) triangulation
/// instead.
pub trait DrawableIndex: IndexPrimitive {
    /// Render mode used when the caller does not override it.
    const DEFAULT_RENDER_MODE: RenderMode;
    /// Whether primitives of this arity count as faces in diagnostics.
    const COUNTS_AS_FACES: bool;
}

impl DrawableIndex for [u32; 2] {
    const DEFAULT_RENDER_MODE: RenderMode = RenderMode::Lines;
    const COUNTS_AS_FACES: bool = false;
}

impl DrawableIndex for [u32; 3] {
    const DEFAULT_RENDER_MODE: RenderMode = RenderMode::Triangles;
    const COUNTS_AS_FACES: bool = true;
}

/// Attributes plus one fixed-arity index layer.
#[derive(Debug, Default)]
pub struct IndexedGeometry<P: IndexPrimitive> {
    base: AttribArrayGeometry,
    indices: Vec<P>,
}

/// A triangle mesh.
pub type TriangleMesh = IndexedGeometry<[u32; 3]>;
/// A line mesh.
pub type LineMesh = IndexedGeometry<[u32; 2]>;
/// A quad mesh; rendered through triangulation.
pub type QuadMesh = IndexedGeometry<[u32; 4]>;

impl<P: IndexPrimitive> IndexedGeometry<P> {
    /// Create a geometry from positions and indices.
    pub fn new(positions: &[Vec3], indices: Vec<P>) -> Self {
        Self {
            base: AttribArrayGeometry::from_positions(positions),
            indices,
        }
    }

    /// Add an attribute (builder form).
    pub fn with_attrib(mut self, attrib: Attrib) -> Self {
        self.base.attribs.add(attrib);
        self
    }

    /// The index array.
    pub fn indices(&self) -> &[P] {
        &self.indices
    }

    /// Replace the index array.
    ///
    /// Indices have no observer; the owning displayable must be told with
    /// `set_indices_dirty` after mutation.
    pub fn set_indices(&mut self, indices: Vec<P>) {
        self.indices = indices;
    }

    /// Mutable index array; same dirty-marking obligation as
    /// [`set_indices`](Self::set_indices).
    pub fn indices_mut(&mut self) -> &mut Vec<P> {
        &mut self.indices
    }
}

impl<P: IndexPrimitive> CoreGeometry for IndexedGeometry<P> {
    fn attribs(&self) -> &AttribManager {
        &self.base.attribs
    }

    fn attribs_mut(&mut self) -> &mut AttribManager {
        &mut self.base.attribs
    }
}

/// Geometry whose faces are polygons that can be fan-triangulated.
///
/// Faces are assumed planar and convex; triangulation is a simple fan from
/// the first vertex of each face.
pub trait PolygonalGeometry: CoreGeometry {
    /// Number of source polygons.
    fn num_polygons(&self) -> usize;

    /// Append the fan triangulation of every face to `out`.
    fn triangulate_into(&self, out: &mut Vec<[u32; 3]>);
}

impl PolygonalGeometry for QuadMesh {
    fn num_polygons(&self) -> usize {
        self.indices.len()
    }

    fn triangulate_into(&self, out: &mut Vec<[u32; 3]>) {
        out.reserve(self.indices.len() * 2);
        for quad in &self.indices {
            out.push([quad[0], quad[1], quad[2]]);
            out.push([quad[0], quad[2], quad[3]]);
        }
    }
}

/// Attributes plus variable-arity polygon faces.
#[derive(Debug, Default)]
pub struct PolyMesh {
    base: AttribArrayGeometry,
    faces: Vec<Vec<u32>>,
}

impl PolyMesh {
    /// Create a geometry from positions and polygon faces.
    pub fn new(positions: &[Vec3], faces: Vec<Vec<u32>>) -> Self {
        Self {
            base: AttribArrayGeometry::from_positions(positions),
            faces,
        }
    }

    /// Add an attribute (builder form).
    pub fn with_attrib(mut self, attrib: Attrib) -> Self {
        self.base.attribs.add(attrib);
        self
    }

    /// The polygon faces.
    pub fn faces(&self) -> &[Vec<u32>] {
        &self.faces
    }

    /// Replace the polygon faces; the owning displayable must be told with
    /// `set_indices_dirty` after mutation.
    pub fn set_faces(&mut self, faces: Vec<Vec<u32>>) {
        self.faces = faces;
    }
}

impl CoreGeometry for PolyMesh {
    fn attribs(&self) -> &AttribManager {
        &self.base.attribs
    }

    fn attribs_mut(&mut self) -> &mut AttribManager {
        &mut self.base.attribs
    }
}

impl PolygonalGeometry for PolyMesh {
    fn num_polygons(&self) -> usize {
        self.faces.len()
    }

    fn triangulate_into(&self, out: &mut Vec<[u32; 3]>) {
        for face in &self.faces {
            if face.len() < 3 {
                log::debug!("PolyMesh: skipping degenerate face with {} indices", face.len());
                continue;
            }
            for i in 1..face.len() - 1 {
                out.push([face[0], face[i], face[i + 1]]);
            }
        }
    }
}

/// Attributes plus a keyed, open set of flat index layers.
///
/// Layer registration order is tracked so the default-layer policy of
/// [`MultiIndexedDisplay`](crate::display::MultiIndexedDisplay) is
/// deterministic.
#[derive(Debug, Default)]
pub struct MultiIndexedGeometry {
    base: AttribArrayGeometry,
    layers: HashMap<LayerKey, Vec<u32>>,
    order: Vec<LayerKey>,
}

impl MultiIndexedGeometry {
    /// Create a geometry from positions, with no layers.
    pub fn new(positions: &[Vec3]) -> Self {
        Self {
            base: AttribArrayGeometry::from_positions(positions),
            layers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add an attribute (builder form).
    pub fn with_attrib(mut self, attrib: Attrib) -> Self {
        self.base.attribs.add(attrib);
        self
    }

    /// Add a layer (builder form).
    pub fn with_layer(mut self, key: LayerKey, indices: Vec<u32>) -> Self {
        self.set_layer(key, indices);
        self
    }

    /// Insert or replace a layer. Returns `true` if the key was new.
    ///
    /// Adding a new key is additive: existing layers are untouched.
    pub fn set_layer(&mut self, key: LayerKey, indices: Vec<u32>) -> bool {
        let is_new = !self.layers.contains_key(&key);
        if is_new {
            self.order.push(key.clone());
        }
        self.layers.insert(key, indices);
        is_new
    }

    /// Flat indices of a layer.
    pub fn layer(&self, key: &LayerKey) -> Option<&[u32]> {
        self.layers.get(key).map(Vec::as_slice)
    }

    /// Whether a layer exists.
    pub fn contains_layer(&self, key: &LayerKey) -> bool {
        self.layers.contains_key(key)
    }

    /// Layer keys in registration order.
    pub fn layer_keys(&self) -> &[LayerKey] {
        &self.order
    }

    /// Number of layers.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl CoreGeometry for MultiIndexedGeometry {
    fn attribs(&self) -> &AttribManager {
        &self.base.attribs
    }

    fn attribs_mut(&mut self) -> &mut AttribManager {
        &mut self.base.attribs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::index_layer::SEMANTIC_TRIANGLE;

    fn tri_positions() -> Vec<Vec3> {
        vec![Vec3::ZERO, Vec3::X, Vec3::Y]
    }

    #[test]
    fn test_triangle_mesh_basics() {
        let mesh = TriangleMesh::new(&tri_positions(), vec![[0, 1, 2]]);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.indices().len(), 1);
        assert_eq!(<[u32; 3]>::as_u32s(mesh.indices()), &[0, 1, 2]);
    }

    #[test]
    fn test_quad_triangulation() {
        let mesh = QuadMesh::new(
            &[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
            vec![[0, 1, 2, 3]],
        );
        let mut tris = Vec::new();
        mesh.triangulate_into(&mut tris);
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.num_polygons(), 1);
    }

    #[test]
    fn test_poly_triangulation_fan() {
        // One pentagon -> three triangles
        let mesh = PolyMesh::new(&tri_positions(), vec![vec![0, 1, 2, 3, 4]]);
        let mut tris = Vec::new();
        mesh.triangulate_into(&mut tris);
        assert_eq!(tris, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    }

    #[test]
    fn test_poly_skips_degenerate_faces() {
        let mesh = PolyMesh::new(&tri_positions(), vec![vec![0, 1], vec![0, 1, 2]]);
        let mut tris = Vec::new();
        mesh.triangulate_into(&mut tris);
        assert_eq!(tris, vec![[0, 1, 2]]);
        assert_eq!(mesh.num_polygons(), 2);
    }

    #[test]
    fn test_multi_indexed_layers_additive() {
        let mut geo = MultiIndexedGeometry::new(&tri_positions());
        let wire = LayerKey::new(["LineLayer", "Wireframe"], "");
        assert!(geo.set_layer(LayerKey::triangles(), vec![0, 1, 2]));
        assert!(geo.set_layer(wire.clone(), vec![0, 1, 1, 2, 2, 0]));
        assert_eq!(geo.num_layers(), 2);
        assert_eq!(geo.layer_keys()[0], LayerKey::triangles());
        assert_eq!(geo.layer(&wire).unwrap().len(), 6);

        // Replacing keeps registration order
        assert!(!geo.set_layer(LayerKey::triangles(), vec![2, 1, 0]));
        assert_eq!(geo.layer_keys().len(), 2);
        assert_eq!(geo.layer(&LayerKey::triangles()).unwrap(), &[2, 1, 0]);
    }

    #[test]
    fn test_layer_key_permutation_lookup() {
        let mut geo = MultiIndexedGeometry::new(&tri_positions());
        geo.set_layer(
            LayerKey::new([SEMANTIC_TRIANGLE, "Subdivided"], "lod1"),
            vec![0, 1, 2],
        );
        let permuted = LayerKey::new(["Subdivided", SEMANTIC_TRIANGLE], "lod1");
        assert!(geo.contains_layer(&permuted));
    }
}
