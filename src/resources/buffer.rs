//! GPU buffer resource.

use std::sync::{Arc, Weak};

use bitflags::bitflags;
use parking_lot::RwLock;

use crate::context::{BufferHandle, GpuContext};

bitflags! {
    /// Usage flags for buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer can be used as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Buffer can be copied from.
        const COPY_SRC = 1 << 3;
        /// Buffer can be copied to.
        const COPY_DST = 1 << 4;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Initial size in bytes.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A GPU buffer resource.
///
/// Buffers are created by [`GpuContext::create_buffer`] and exclusively owned
/// by the attribute slot or index-layer entry that requested them; the `Arc`
/// exists so opaque handles can be observed without transferring ownership.
/// They hold a weak reference back to their parent context.
///
/// [`upload`](Self::upload) replaces the entire store, reallocating to the new
/// size, the semantics of a full buffer-data upload.
pub struct Buffer {
    context: Weak<GpuContext>,
    handle: BufferHandle,
    label: Option<String>,
    usage: BufferUsage,
    data: RwLock<Vec<u8>>,
}

/// Alias used throughout the crate to distinguish the GPU resource from CPU
/// containers.
pub type GpuBuffer = Buffer;

impl Buffer {
    /// Create a new buffer (called by [`GpuContext`]).
    pub(crate) fn new(
        context: Weak<GpuContext>,
        handle: BufferHandle,
        descriptor: BufferDescriptor,
    ) -> Self {
        Self {
            context,
            handle,
            label: descriptor.label,
            usage: descriptor.usage,
            data: RwLock::new(vec![0; descriptor.size as usize]),
        }
    }

    /// Get the parent context, if it still exists.
    pub fn context(&self) -> Option<Arc<GpuContext>> {
        self.context.upgrade()
    }

    /// Opaque handle of this buffer.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Get the buffer size in bytes.
    pub fn size(&self) -> u64 {
        self.data.read().len() as u64
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the usage flags.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Upload `bytes` to the buffer, reallocating to the new size.
    pub fn upload(&self, bytes: &[u8]) {
        log::trace!(
            "Buffer: upload {:?} ({} bytes)",
            self.label,
            bytes.len()
        );
        let mut data = self.data.write();
        data.clear();
        data.extend_from_slice(bytes);
        if let Some(ctx) = self.context.upgrade() {
            ctx.note_upload(bytes.len());
        }
    }

    /// Read back the buffer contents (diagnostics and tests).
    pub fn contents(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("handle", &self.handle)
            .field("size", &self.size())
            .field("usage", &self.usage)
            .field("label", &self.label)
            .finish()
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn detached(size: u64) -> Buffer {
        Buffer::new(
            Weak::new(),
            BufferHandle(1),
            BufferDescriptor::new(size, BufferUsage::VERTEX).with_label("test"),
        )
    }

    #[test]
    fn test_buffer_size() {
        let buffer = detached(2048);
        assert_eq!(buffer.size(), 2048);
    }

    #[test]
    fn test_upload_reallocates() {
        let buffer = detached(4);
        buffer.upload(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.size(), 6);
        assert_eq!(buffer.contents(), vec![1, 2, 3, 4, 5, 6]);

        buffer.upload(&[9]);
        assert_eq!(buffer.size(), 1);
        assert_eq!(buffer.contents(), vec![9]);
    }

    #[test]
    fn test_buffer_debug() {
        let buffer = detached(1024);
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("Buffer"));
        assert!(debug.contains("1024"));
    }
}
