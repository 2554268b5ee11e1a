//! Geometry pool: the mesh-manager side of buffer lifecycle.
//!
//! Callers never pick a [`GeometryBuffer`] by hand. The pool routes each
//! submission to the first existing buffer whose layout matches and which
//! has spare capacity, creating a new buffer lazily when none can accept
//! it. Buffers live until explicit engine teardown (`dispose`).

use std::sync::Arc;

use crate::context::GraphicsContext;
use crate::error::RenderError;
use crate::material::MaterialId;
use crate::types::IndexFormat;

use super::data::MeshData;
use super::geometry_buffer::GeometryBuffer;
use super::handle::{GeometryBufferId, MeshHandle};

/// Owns every [`GeometryBuffer`] of a rendering context.
#[derive(Debug)]
pub struct GeometryPool {
    buffers: Vec<GeometryBuffer>,
    index_format: IndexFormat,
}

impl GeometryPool {
    /// Create a pool with an explicit index width.
    pub fn new(index_format: IndexFormat) -> Self {
        Self {
            buffers: Vec::new(),
            index_format,
        }
    }

    /// Create a pool using the widest index format the context supports.
    ///
    /// The choice is made once here; every buffer in the pool shares it.
    pub fn for_context(ctx: &dyn GraphicsContext) -> Self {
        let index_format = if ctx.supports_u32_indices() {
            IndexFormat::U32
        } else {
            IndexFormat::U16
        };
        log::info!("GeometryPool: using {:?} indices", index_format);
        Self::new(index_format)
    }

    /// The index width shared by all buffers in this pool.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Number of buffers created so far.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Look up a buffer by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this pool.
    pub fn buffer(&self, id: GeometryBufferId) -> &GeometryBuffer {
        &self.buffers[id.0 as usize]
    }

    /// Bytes of scratch storage across all buffers, for diagnostics.
    pub fn allocated_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.allocated_bytes()).sum()
    }

    /// Route a mesh submission to a compatible buffer, creating one lazily.
    ///
    /// Returns one [`MeshHandle`] per element of the submission. Fails only
    /// when the submission could not fit even a freshly created buffer.
    pub fn add_mesh<F>(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        data: &MeshData,
        resolve: F,
    ) -> Result<Vec<MeshHandle>, RenderError>
    where
        F: Fn(usize) -> Option<MaterialId>,
    {
        if let Err(reason) = data.validate() {
            return Err(RenderError::InvalidMeshData(reason));
        }

        if let Some(buffer) = self.buffers.iter_mut().find(|b| b.can_accept(data)) {
            return Ok(buffer.append(ctx, data, resolve));
        }

        // No existing buffer fits: create one for this layout, unless the
        // submission exceeds what an empty buffer could ever hold.
        if data.vertex_count() > self.index_format.addressable_vertices()
            || data.vertex_count() > self.index_format.max_vertices()
            || data.index_count() > self.index_format.max_indices()
        {
            return Err(RenderError::GeometryTooLarge {
                label: data.label.clone(),
                vertices: data.vertex_count(),
                indices: data.index_count(),
            });
        }

        let id = GeometryBufferId(self.buffers.len() as u32);
        let mut buffer = GeometryBuffer::new(ctx, id, Arc::clone(&data.layout), self.index_format);
        let handles = buffer.append(ctx, data, resolve);
        self.buffers.push(buffer);
        Ok(handles)
    }

    /// Release every GPU buffer. Engine teardown only.
    pub fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        log::info!("GeometryPool: disposing {} buffers", self.buffers.len());
        for buffer in &mut self.buffers {
            buffer.dispose(ctx);
        }
        self.buffers.clear();
    }
}
