//! Vertex array resource.
//!
//! A [`VertexArray`] records how vertex buffer slots map to shader input
//! locations. Displayables build the binding once per shader program
//! signature and reuse it until the program (or the slot layout) changes.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::context::{BufferHandle, GpuContext, VertexArrayHandle};

/// One attribute binding inside a vertex array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeBinding {
    /// Shader input location.
    pub location: u32,
    /// Buffer slot index inside the owning displayable.
    pub slot: usize,
    /// The bound vertex buffer.
    pub buffer: BufferHandle,
    /// Shader-side attribute name the binding was resolved for.
    pub name: String,
}

/// A vertex array object.
///
/// Created unconfigured by [`GpuContext::create_vertex_array`]; the owning
/// displayable installs bindings with [`rebind`](Self::rebind), tagging them
/// with the shader program signature they were built for.
pub struct VertexArray {
    context: Weak<GpuContext>,
    handle: VertexArrayHandle,
    label: String,
    state: RwLock<VaoState>,
}

#[derive(Debug, Default)]
struct VaoState {
    bindings: Vec<AttributeBinding>,
    program_signature: Option<u64>,
}

impl VertexArray {
    /// Create a new vertex array (called by [`GpuContext`]).
    pub(crate) fn new(context: Weak<GpuContext>, handle: VertexArrayHandle, label: String) -> Self {
        Self {
            context,
            handle,
            label,
            state: RwLock::new(VaoState::default()),
        }
    }

    /// Get the parent context, if it still exists.
    pub fn context(&self) -> Option<Arc<GpuContext>> {
        self.context.upgrade()
    }

    /// Opaque handle of this vertex array.
    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace all attribute bindings, tagging them with the signature of the
    /// shader program they were resolved against.
    pub fn rebind(&self, program_signature: u64, bindings: Vec<AttributeBinding>) {
        log::trace!(
            "VertexArray: rebind {:?} for program {program_signature:#x} ({} attributes)",
            self.label,
            bindings.len()
        );
        let mut state = self.state.write();
        state.bindings = bindings;
        state.program_signature = Some(program_signature);
    }

    /// Signature of the program the current bindings were built for, if any.
    pub fn program_signature(&self) -> Option<u64> {
        self.state.read().program_signature
    }

    /// Snapshot of the current attribute bindings.
    pub fn bindings(&self) -> Vec<AttributeBinding> {
        self.state.read().bindings.clone()
    }
}

impl std::fmt::Debug for VertexArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("VertexArray")
            .field("handle", &self.handle)
            .field("label", &self.label)
            .field("bindings", &state.bindings.len())
            .field("program_signature", &state.program_signature)
            .finish()
    }
}

static_assertions::assert_impl_all!(VertexArray: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unconfigured() {
        let vao = VertexArray::new(Weak::new(), VertexArrayHandle(1), "test".to_string());
        assert!(vao.program_signature().is_none());
        assert!(vao.bindings().is_empty());
    }

    #[test]
    fn test_rebind_replaces_bindings() {
        let vao = VertexArray::new(Weak::new(), VertexArrayHandle(1), "test".to_string());
        vao.rebind(
            0xfeed,
            vec![AttributeBinding {
                location: 0,
                slot: 0,
                buffer: BufferHandle(7),
                name: "in_position".to_string(),
            }],
        );
        assert_eq!(vao.program_signature(), Some(0xfeed));
        assert_eq!(vao.bindings().len(), 1);

        vao.rebind(0xbeef, Vec::new());
        assert_eq!(vao.program_signature(), Some(0xbeef));
        assert!(vao.bindings().is_empty());
    }
}
