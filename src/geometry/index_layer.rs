//! Index layer keys and semantic sets.
//!
//! Multi-indexed geometry stores several index layers side by side, keyed by
//! a semantic tag set plus a layer name. Two keys are equal iff they carry
//! the same name and identical tag sets regardless of tag insertion order;
//! [`SemanticSet`] canonicalizes (sorts and dedups) its tags at construction
//! so the derived `Hash`/`Eq` are order-insensitive by construction.

/// Semantic tag marking a triangle index layer.
pub const SEMANTIC_TRIANGLE: &str = "TriangleLayer";
/// Semantic tag marking a line index layer.
pub const SEMANTIC_LINE: &str = "LineLayer";
/// Semantic tag marking a polygon index layer.
pub const SEMANTIC_POLYGON: &str = "PolygonLayer";
/// Semantic tag marking a point index layer.
pub const SEMANTIC_POINT: &str = "PointLayer";

/// A canonicalized set of semantic tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SemanticSet(Vec<String>);

impl SemanticSet {
    /// Build a set from tags in any order.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        tags.sort_unstable();
        tags.dedup();
        Self(tags)
    }

    /// Whether the set contains a tag.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }

    /// Iterate over tags in canonical (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Key identifying one index layer: a semantic set plus a layer name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerKey {
    semantics: SemanticSet,
    name: String,
}

impl LayerKey {
    /// Build a key from tags (any order) and a layer name.
    pub fn new<I, S>(tags: I, name: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            semantics: SemanticSet::new(tags),
            name: name.into(),
        }
    }

    /// Key for the unnamed triangle layer.
    pub fn triangles() -> Self {
        Self::new([SEMANTIC_TRIANGLE], "")
    }

    /// Key for the unnamed line layer.
    pub fn lines() -> Self {
        Self::new([SEMANTIC_LINE], "")
    }

    /// Key for the unnamed polygon layer.
    pub fn polygons() -> Self {
        Self::new([SEMANTIC_POLYGON], "")
    }

    /// The semantic set.
    pub fn semantics(&self) -> &SemanticSet {
        &self.semantics
    }

    /// The layer name.
    pub fn name(&self) -> &str {
        &self.name
    }
}
