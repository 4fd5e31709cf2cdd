//! Owned GPU resources.
//!
//! This module provides the resources created through a [`GpuContext`]:
//!
//! - [`Buffer`] - a GPU buffer recording its descriptor and uploaded bytes
//! - [`VertexArray`] - attribute-location to buffer-slot bindings
//!
//! [`GpuContext`]: crate::context::GpuContext

mod buffer;
mod vertex_array;

pub use buffer::{Buffer, BufferDescriptor, BufferUsage, GpuBuffer};
pub use vertex_array::{AttributeBinding, VertexArray};
