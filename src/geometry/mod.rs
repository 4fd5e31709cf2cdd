//! CPU-side geometry: attributes, index layers and mesh containers.

pub mod attrib;
pub mod index_layer;
pub mod mesh;

pub use attrib::{
    Attrib, AttribFormat, AttribManager, AttribObserver, AttribSemantic, DirtyMask,
    ATTRIB_COLOR, ATTRIB_NORMAL, ATTRIB_POSITION, ATTRIB_TEXCOORD,
};
pub use index_layer::{
    LayerKey, SemanticSet, SEMANTIC_LINE, SEMANTIC_POINT, SEMANTIC_POLYGON, SEMANTIC_TRIANGLE,
};
pub use mesh::{
    AttribArrayGeometry, CoreGeometry, DrawableIndex, IndexPrimitive, IndexedGeometry, LineMesh,
    MultiIndexedGeometry, PolyMesh, PolygonalGeometry, QuadMesh, TriangleMesh,
};
