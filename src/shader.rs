//! Shader program capability.
//!
//! The [`ShaderProgram`] models the opaque shader handle this crate consumes:
//! it can be bound, it accepts uniform values by name, and it resolves vertex
//! input names to attribute locations. Shader compilation itself belongs to
//! the external collaborator; programs here carry only their input interface.
//!
//! By convention debug-draw programs put position at location 0 and color at
//! location 5; everything else is resolved by name through the displayable's
//! translation table.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use glam::{Mat4, Vec2, Vec3, Vec4};
use parking_lot::Mutex;

/// A uniform value accepted by [`ShaderProgram::set_uniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// 32-bit float.
    Float(f32),
    /// Two-component vector.
    Vec2(Vec2),
    /// Three-component vector.
    Vec3(Vec3),
    /// Four-component vector.
    Vec4(Vec4),
    /// 4x4 matrix.
    Mat4(Mat4),
    /// 32-bit signed integer.
    Int(i32),
    /// Boolean.
    Bool(bool),
}

/// An opaque shader program handle.
///
/// # Example
///
/// ```
/// use gpu_mesh::ShaderProgram;
///
/// let prog = ShaderProgram::new("debug_lines")
///     .with_attribute("in_position", 0)
///     .with_attribute("in_color", 5);
/// assert_eq!(prog.attribute_location("in_position"), Some(0));
/// assert_eq!(prog.attribute_location("in_normal"), None);
/// ```
pub struct ShaderProgram {
    name: String,
    signature: u64,
    attributes: HashMap<String, u32>,
    uniforms: Mutex<HashMap<String, UniformValue>>,
}

impl ShaderProgram {
    /// Create a program with no vertex inputs.
    pub fn new(name: impl Into<String>) -> Self {
        let mut prog = Self {
            name: name.into(),
            signature: 0,
            attributes: HashMap::new(),
            uniforms: Mutex::new(HashMap::new()),
        };
        prog.signature = prog.compute_signature();
        prog
    }

    /// Declare a vertex input at an explicit location.
    pub fn with_attribute(mut self, name: impl Into<String>, location: u32) -> Self {
        self.attributes.insert(name.into(), location);
        self.signature = self.compute_signature();
        self
    }

    // The signature identifies the vertex input interface so vertex arrays can
    // be rebuilt only when the bound program actually changes shape.
    fn compute_signature(&self) -> u64 {
        let mut inputs: Vec<(&str, u32)> = self
            .attributes
            .iter()
            .map(|(n, l)| (n.as_str(), *l))
            .collect();
        inputs.sort_unstable();

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name.hash(&mut hasher);
        inputs.hash(&mut hasher);
        hasher.finish()
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature of the vertex input interface.
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// Resolve a vertex input name to its attribute location.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    /// Make this program current.
    pub fn bind(&self) {
        log::trace!("ShaderProgram: bind {:?}", self.name);
    }

    /// Set a uniform value by name.
    pub fn set_uniform(&self, name: &str, value: UniformValue) {
        log::trace!("ShaderProgram: {:?} uniform {name} = {value:?}", self.name);
        self.uniforms.lock().insert(name.to_string(), value);
    }

    /// Read back a recorded uniform value (diagnostics and tests).
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.lock().get(name).copied()
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("attributes", &self.attributes)
            .finish()
    }
}

static_assertions::assert_impl_all!(ShaderProgram: Send, Sync);
