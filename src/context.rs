//! Graphics context capability.
//!
//! The [`GpuContext`] models the "active graphics context" this crate consumes
//! from the windowing/context collaborator. It is the only way to create GPU
//! buffers and vertex arrays, and it receives the draw submissions produced by
//! the displayables.
//!
//! The context records descriptors, uploaded bytes and submitted draw calls
//! rather than talking to a driver, so the synchronization contract can be
//! exercised byte-for-byte without GPU hardware. Live resources are tracked
//! through weak references for accounting and diagnostics.
//!
//! # Thread Model
//!
//! The context itself is `Send + Sync`, but callers follow the engine's
//! scheduling model: a single graphics thread performs every buffer allocation,
//! upload and draw. Making the context current on that thread is the
//! collaborator's job; the core only relies on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::error::{GpuMeshError, GpuMeshResult};
use crate::resources::{BufferDescriptor, GpuBuffer, VertexArray};

/// Handle to a GPU buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

impl BufferHandle {
    /// Raw handle value, unique per context.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Handle to a vertex array resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub(crate) u64);

impl VertexArrayHandle {
    /// Raw handle value, unique per context.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Primitive topology used when submitting a draw call.
///
/// Stored verbatim on each displayable and used only to select the draw
/// primitive; it is never validated against the geometry shape at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Each vertex is a separate point.
    Points,
    /// Every two vertices form a line.
    Lines,
    /// Vertices form a closed loop of lines.
    LineLoop,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    Triangles,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
    /// Vertices form a fan of triangles.
    TriangleFan,
    /// Lines with adjacency information.
    LinesAdjacency,
    /// Line strip with adjacency information.
    LineStripAdjacency,
    /// Triangles with adjacency information.
    TrianglesAdjacency,
    /// Triangle strip with adjacency information.
    TriangleStripAdjacency,
    /// Tessellation patches.
    Patches,
}

/// A draw call submitted to the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    /// Non-indexed draw over a vertex range.
    Arrays {
        /// Primitive topology.
        mode: RenderMode,
        /// First vertex.
        first: u32,
        /// Number of vertices.
        count: u32,
    },
    /// Indexed draw consuming an index buffer.
    Elements {
        /// Primitive topology.
        mode: RenderMode,
        /// Number of index elements.
        count: u32,
        /// The index buffer consumed by the draw.
        index_buffer: BufferHandle,
    },
}

/// Limits of a graphics context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextCapabilities {
    /// Maximum buffer size in bytes.
    pub max_buffer_size: u64,
    /// Maximum number of vertex attribute bindings.
    pub max_vertex_attributes: u32,
}

impl Default for ContextCapabilities {
    fn default() -> Self {
        Self {
            max_buffer_size: 1 << 30, // 1 GB
            max_vertex_attributes: 16,
        }
    }
}

/// The active graphics context.
///
/// Created by the external windowing/context collaborator and passed to every
/// buffer-synchronization and draw entry point. The core never acquires or
/// releases context currency itself.
///
/// # Example
///
/// ```
/// use gpu_mesh::{BufferDescriptor, BufferUsage, GpuContext};
///
/// let ctx = GpuContext::new();
/// let buffer = ctx
///     .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
///     .unwrap();
/// assert_eq!(buffer.size(), 1024);
/// assert_eq!(ctx.buffer_count(), 1);
/// ```
pub struct GpuContext {
    name: String,
    capabilities: ContextCapabilities,
    next_handle: AtomicU64,
    upload_count: AtomicU64,
    uploaded_bytes: AtomicU64,
    buffers: RwLock<Vec<Weak<GpuBuffer>>>,
    vertex_arrays: RwLock<Vec<Weak<VertexArray>>>,
    draws: Mutex<Vec<DrawCall>>,
}

impl GpuContext {
    /// Create a new context with default capabilities.
    pub fn new() -> Arc<Self> {
        Self::with_capabilities(ContextCapabilities::default())
    }

    /// Create a new context with explicit capabilities.
    pub fn with_capabilities(capabilities: ContextCapabilities) -> Arc<Self> {
        log::debug!("GpuContext: created ({capabilities:?})");
        Arc::new(Self {
            name: "Recording Context".to_string(),
            capabilities,
            next_handle: AtomicU64::new(1),
            upload_count: AtomicU64::new(0),
            uploaded_bytes: AtomicU64::new(0),
            buffers: RwLock::new(Vec::new()),
            vertex_arrays: RwLock::new(Vec::new()),
            draws: Mutex::new(Vec::new()),
        })
    }

    /// Get the context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the context capabilities.
    pub fn capabilities(&self) -> &ContextCapabilities {
        &self.capabilities
    }

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a GPU buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested size is zero or exceeds the context
    /// limits.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> GpuMeshResult<Arc<GpuBuffer>> {
        if descriptor.size == 0 {
            return Err(GpuMeshError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GpuMeshError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        let handle = BufferHandle(self.next_handle());
        let buffer = Arc::new(GpuBuffer::new(
            Arc::downgrade(self),
            handle,
            descriptor.clone(),
        ));

        self.buffers.write().push(Arc::downgrade(&buffer));

        log::trace!(
            "GpuContext: created buffer {:?}, size={}",
            descriptor.label,
            descriptor.size
        );

        Ok(buffer)
    }

    /// Create a vertex array object.
    ///
    /// The returned vertex array starts unconfigured; displayables bind
    /// attribute locations to buffer slots through
    /// [`VertexArray::rebind`](crate::resources::VertexArray::rebind).
    pub fn create_vertex_array(
        self: &Arc<Self>,
        label: impl Into<String>,
    ) -> GpuMeshResult<Arc<VertexArray>> {
        let label = label.into();
        let handle = VertexArrayHandle(self.next_handle());
        let vao = Arc::new(VertexArray::new(Arc::downgrade(self), handle, label));

        self.vertex_arrays.write().push(Arc::downgrade(&vao));

        log::trace!("GpuContext: created vertex array {:?}", vao.label());
        Ok(vao)
    }

    /// Submit a non-indexed draw over `count` vertices starting at `first`.
    pub fn draw_arrays(&self, mode: RenderMode, first: u32, count: u32) {
        log::trace!("GpuContext: draw_arrays {mode:?} first={first} count={count}");
        self.draws.lock().push(DrawCall::Arrays { mode, first, count });
    }

    /// Submit an indexed draw consuming `count` elements of `index_buffer`.
    pub fn draw_elements(&self, mode: RenderMode, count: u32, index_buffer: BufferHandle) {
        log::trace!("GpuContext: draw_elements {mode:?} count={count}");
        self.draws.lock().push(DrawCall::Elements {
            mode,
            count,
            index_buffer,
        });
    }

    /// Drain and return the draw calls submitted since the last call.
    pub fn take_draw_calls(&self) -> Vec<DrawCall> {
        std::mem::take(&mut *self.draws.lock())
    }

    /// Number of buffer uploads performed through this context.
    pub fn upload_count(&self) -> u64 {
        self.upload_count.load(Ordering::Relaxed)
    }

    /// Total bytes uploaded through this context.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes.load(Ordering::Relaxed)
    }

    pub(crate) fn note_upload(&self, bytes: usize) {
        self.upload_count.fetch_add(1, Ordering::Relaxed);
        self.uploaded_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Get the number of live buffers created by this context.
    pub fn buffer_count(&self) -> usize {
        self.buffers
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Get the number of live vertex arrays created by this context.
    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays
            .read()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Clean up dead weak references to released resources.
    pub fn cleanup_dead_resources(&self) {
        self.buffers.write().retain(|w| w.strong_count() > 0);
        self.vertex_arrays.write().retain(|w| w.strong_count() > 0);
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

static_assertions::assert_impl_all!(GpuContext: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::BufferUsage;

    #[test]
    fn test_create_buffer() {
        let ctx = GpuContext::new();
        let buffer = ctx
            .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 1024);
        assert_eq!(ctx.buffer_count(), 1);
    }

    #[test]
    fn test_create_buffer_zero_size() {
        let ctx = GpuContext::new();
        let result = ctx.create_buffer(&BufferDescriptor::new(0, BufferUsage::VERTEX));
        assert!(result.is_err());
    }

    #[test]
    fn test_create_buffer_too_large() {
        let ctx = GpuContext::with_capabilities(ContextCapabilities {
            max_buffer_size: 64,
            ..Default::default()
        });
        let result = ctx.create_buffer(&BufferDescriptor::new(65, BufferUsage::VERTEX));
        assert!(result.is_err());
    }

    #[test]
    fn test_handles_are_unique() {
        let ctx = GpuContext::new();
        let a = ctx
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        let b = ctx
            .create_buffer(&BufferDescriptor::new(16, BufferUsage::VERTEX))
            .unwrap();
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn test_resource_cleanup() {
        let ctx = GpuContext::new();
        {
            let _buffer = ctx
                .create_buffer(&BufferDescriptor::new(1024, BufferUsage::VERTEX))
                .unwrap();
            assert_eq!(ctx.buffer_count(), 1);
        }
        // Buffer dropped
        ctx.cleanup_dead_resources();
        assert_eq!(ctx.buffer_count(), 0);
    }

    #[test]
    fn test_draw_recording() {
        let ctx = GpuContext::new();
        ctx.draw_arrays(RenderMode::Points, 0, 12);
        let calls = ctx.take_draw_calls();
        assert_eq!(
            calls,
            vec![DrawCall::Arrays {
                mode: RenderMode::Points,
                first: 0,
                count: 12
            }]
        );
        assert!(ctx.take_draw_calls().is_empty());
    }
}
