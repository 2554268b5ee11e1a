//! Packed geometry storage with sub-buffer index rebasing.
//!
//! A [`GeometryBuffer`] owns one GPU vertex buffer and one GPU index buffer
//! and packs heterogeneous mesh submissions into them. Scratch arrays mirror
//! the GPU contents; they grow geometrically, and growth is the only path
//! that reallocates the GPU-side buffers (`buffer_data`); in-place appends
//! upload just the new sub-range (`buffer_sub_data`).
//!
//! # Sub-buffers
//!
//! With 16-bit indices a draw call can only address 65536 vertex elements.
//! When an append would push the vertex cursor past the addressable range of
//! the current sub-buffer, the buffer starts a new one: the cursor becomes
//! the new origin, and every index appended afterwards is rebased relative
//! to it. Handles record their sub-buffer origin as `vertex_offset`, and
//! attribute pointers are based at that element, so each draw call's indices
//! stay within the index width's range while the physical buffer grows
//! without bound (up to the whole-buffer ceiling).

use std::sync::Arc;

use crate::command::CommandBuffer;
use crate::context::GraphicsContext;
use crate::material::MaterialId;
use crate::types::{BufferId, BufferTarget, IndexFormat};

use super::data::{MaterialRef, MeshData};
use super::handle::{GeometryBufferId, MeshHandle};
use super::layout::VertexLayout;

/// Native index storage matching the buffer's index width.
#[derive(Debug)]
enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    fn new(format: IndexFormat) -> Self {
        match format {
            IndexFormat::U16 => Self::U16(Vec::new()),
            IndexFormat::U32 => Self::U32(Vec::new()),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    /// Resize the backing storage to `new_len` elements, zero-filled.
    fn resize(&mut self, new_len: usize) {
        match self {
            Self::U16(v) => v.resize(new_len, 0),
            Self::U32(v) => v.resize(new_len, 0),
        }
    }

    fn write(&mut self, at: usize, value: u32) {
        match self {
            Self::U16(v) => v[at] = value as u16,
            Self::U32(v) => v[at] = value,
        }
    }

    fn read(&self, at: usize) -> u32 {
        match self {
            Self::U16(v) => v[at] as u32,
            Self::U32(v) => v[at],
        }
    }

    fn bytes(&self, range: std::ops::Range<usize>) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(&v[range]),
            Self::U32(v) => bytemuck::cast_slice(&v[range]),
        }
    }
}

/// One GPU vertex buffer + one GPU index buffer, packing many meshes.
#[derive(Debug)]
pub struct GeometryBuffer {
    id: GeometryBufferId,
    layout: Arc<VertexLayout>,
    index_format: IndexFormat,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    /// Scratch vertex storage; `len()` is the allocated capacity in floats.
    vertex_data: Vec<f32>,
    /// Floats in use.
    vertex_len: usize,
    index_data: IndexData,
    /// Index elements in use.
    index_len: usize,
    /// Vertex element index where the current sub-buffer began.
    sub_buffer_base: usize,
    /// Number of sub-buffer splits performed.
    splits: u32,
}

impl GeometryBuffer {
    /// Create an empty geometry buffer (called by the pool).
    pub(crate) fn new(
        ctx: &mut dyn GraphicsContext,
        id: GeometryBufferId,
        layout: Arc<VertexLayout>,
        index_format: IndexFormat,
    ) -> Self {
        use crate::types::BufferUsage;
        let vertex_buffer = ctx.create_buffer(BufferUsage::VERTEX);
        let index_buffer = ctx.create_buffer(BufferUsage::INDEX);
        log::debug!(
            "GeometryBuffer {:?}: created for layout {:?} ({:?} indices)",
            id,
            layout.label,
            index_format
        );
        Self {
            id,
            layout,
            index_format,
            vertex_buffer,
            index_buffer,
            vertex_data: Vec::new(),
            vertex_len: 0,
            index_data: IndexData::new(index_format),
            index_len: 0,
            sub_buffer_base: 0,
            splits: 0,
        }
    }

    /// This buffer's id within its pool.
    pub fn id(&self) -> GeometryBufferId {
        self.id
    }

    /// The buffer's vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    /// The buffer's index width.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Vertex elements currently stored.
    pub fn vertex_count(&self) -> usize {
        self.vertex_len / self.layout.stride_floats()
    }

    /// Index elements currently stored.
    pub fn index_count(&self) -> usize {
        self.index_len
    }

    /// Vertex element index where the current sub-buffer began.
    pub fn sub_buffer_base(&self) -> usize {
        self.sub_buffer_base
    }

    /// Number of sub-buffer splits performed so far.
    pub fn sub_buffer_splits(&self) -> u32 {
        self.splits
    }

    /// Bytes of scratch storage currently allocated (vertex + index).
    pub fn allocated_bytes(&self) -> usize {
        self.vertex_data.len() * 4 + self.index_data.capacity() * self.index_format.size()
    }

    /// Whether this buffer can take the submission.
    ///
    /// True iff the attribute layout matches exactly and both payloads fit
    /// under the whole-buffer capacity ceilings for the index width.
    pub fn can_accept(&self, data: &MeshData) -> bool {
        if !self.layout.matches(&data.layout) {
            return false;
        }
        let fmt = self.index_format;
        // A single submission must fit one sub-buffer: rebasing cannot help
        // a mesh whose own vertex count exceeds the addressable range.
        data.vertex_count() <= fmt.addressable_vertices()
            && self.vertex_count() + data.vertex_count() <= fmt.max_vertices()
            && self.index_len + data.index_count() <= fmt.max_indices()
    }

    /// Append a mesh submission and emit one handle per element.
    ///
    /// `resolve` maps loader-side material slots ([`MaterialRef::Index`]) to
    /// engine materials; returning `None` leaves the handle material-less so
    /// the draw list skips it until the asset is ready.
    ///
    /// # Panics
    ///
    /// Appending data with a mismatched attribute layout, or past the
    /// capacity ceiling, is a caller contract violation. Route submissions
    /// through [`GeometryPool::add_mesh`] instead of picking buffers by hand.
    ///
    /// [`GeometryPool::add_mesh`]: crate::mesh::GeometryPool::add_mesh
    pub fn append<F>(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        data: &MeshData,
        resolve: F,
    ) -> Vec<MeshHandle>
    where
        F: Fn(usize) -> Option<MaterialId>,
    {
        assert!(
            self.layout.matches(&data.layout),
            "mesh layout {:?} does not match geometry buffer layout {:?}",
            data.layout.label,
            self.layout.label
        );
        assert!(
            self.can_accept(data),
            "geometry buffer {:?} over capacity; submissions must go through the pool",
            self.id
        );

        let stride = self.layout.stride_floats();
        let cursor = self.vertex_len / stride;
        let incoming = data.vertex_count();

        // Start a new sub-buffer when the append would push the cursor past
        // the addressable range of the current one.
        if cursor + incoming - self.sub_buffer_base > self.index_format.addressable_vertices() {
            self.sub_buffer_base = cursor;
            self.splits += 1;
            log::debug!(
                "GeometryBuffer {:?}: sub-buffer split #{} at element {}",
                self.id,
                self.splits,
                cursor
            );
        }
        let element_offset = (cursor - self.sub_buffer_base) as u32;

        self.append_vertices(ctx, &data.vertices);
        self.append_indices(ctx, &data.indices, element_offset);

        let index_base = self.index_len - data.indices.len();
        data.elements
            .iter()
            .map(|element| MeshHandle {
                buffer: self.id,
                vertex_offset: self.sub_buffer_base,
                mode: element.mode,
                index_offset: index_base + element.first_index,
                index_count: element.index_count as u32,
                material: match element.material {
                    MaterialRef::Literal(id) => Some(id),
                    MaterialRef::Index(slot) => resolve(slot),
                    MaterialRef::Unset => None,
                },
                transform: None,
            })
            .collect()
    }

    fn append_vertices(&mut self, ctx: &mut dyn GraphicsContext, vertices: &[f32]) {
        let needed = self.vertex_len + vertices.len();
        let grew = self.grow_vertex_storage(needed);
        let start = self.vertex_len;
        self.vertex_data[start..needed].copy_from_slice(vertices);
        self.vertex_len = needed;

        ctx.bind_buffer(BufferTarget::Vertex, self.vertex_buffer);
        if grew {
            // Growth is the only path allowed to resize the GPU allocation.
            ctx.buffer_data(BufferTarget::Vertex, bytemuck::cast_slice(&self.vertex_data));
        } else {
            ctx.buffer_sub_data(
                BufferTarget::Vertex,
                start * 4,
                bytemuck::cast_slice(&self.vertex_data[start..needed]),
            );
        }
    }

    fn append_indices(&mut self, ctx: &mut dyn GraphicsContext, indices: &[u32], rebase: u32) {
        let needed = self.index_len + indices.len();
        let grew = self.grow_index_storage(needed);
        let start = self.index_len;
        for (i, &index) in indices.iter().enumerate() {
            self.index_data.write(start + i, index + rebase);
        }
        self.index_len = needed;

        ctx.bind_buffer(BufferTarget::Index, self.index_buffer);
        if grew {
            ctx.buffer_data(
                BufferTarget::Index,
                self.index_data.bytes(0..self.index_data.capacity()),
            );
        } else {
            ctx.buffer_sub_data(
                BufferTarget::Index,
                start * self.index_format.size(),
                self.index_data.bytes(start..needed),
            );
        }
    }

    /// Double the vertex scratch array until `needed` floats fit.
    /// Returns true if storage (and therefore the GPU allocation) grew.
    fn grow_vertex_storage(&mut self, needed: usize) -> bool {
        if needed <= self.vertex_data.len() {
            return false;
        }
        let mut capacity = self.vertex_data.len().max(256);
        while capacity < needed {
            capacity *= 2;
        }
        log::debug!(
            "GeometryBuffer {:?}: vertex scratch {} -> {} floats",
            self.id,
            self.vertex_data.len(),
            capacity
        );
        self.vertex_data.resize(capacity, 0.0);
        true
    }

    fn grow_index_storage(&mut self, needed: usize) -> bool {
        if needed <= self.index_data.capacity() {
            return false;
        }
        let mut capacity = self.index_data.capacity().max(256);
        while capacity < needed {
            capacity *= 2;
        }
        log::debug!(
            "GeometryBuffer {:?}: index scratch {} -> {} elements",
            self.id,
            self.index_data.capacity(),
            capacity
        );
        self.index_data.resize(capacity);
        true
    }

    /// Stored index at `at`, for tests and debugging.
    pub fn index_at(&self, at: usize) -> u32 {
        debug_assert!(at < self.index_len);
        self.index_data.read(at)
    }

    // ------------------------------------------------------------------
    // Command writers: record bind/pointer/draw operations. No direct GPU
    // calls happen here; the command buffer owns execution.
    // ------------------------------------------------------------------

    /// Record binding this buffer's vertex and index buffers.
    pub fn buffer_bind_buffers(&self, commands: &mut CommandBuffer) {
        commands.bind_buffer(BufferTarget::Vertex, self.vertex_buffer);
        commands.bind_buffer(BufferTarget::Index, self.index_buffer);
    }

    /// Record attribute pointers based at a sub-buffer origin.
    pub fn buffer_attrib_pointers(&self, commands: &mut CommandBuffer, vertex_offset: usize) {
        let stride = self.layout.stride_bytes();
        let base = vertex_offset * stride;
        for (i, attr) in self.layout.attributes.iter().enumerate() {
            commands.vertex_attrib_pointer(
                attr.semantic.location(),
                attr.format.components(),
                attr.normalized,
                stride as u32,
                base + self.layout.offset_of(i),
            );
        }
    }

    /// Record the draw call for a handle owned by this buffer.
    pub fn buffer_render_elements(&self, commands: &mut CommandBuffer, handle: &MeshHandle) {
        debug_assert_eq!(handle.buffer, self.id);
        commands.draw_elements(
            handle.mode,
            handle.index_count,
            self.index_format,
            handle.index_byte_offset(self.index_format),
        );
    }

    /// Release the GPU buffers. The buffer must not be used afterwards.
    pub(crate) fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        ctx.delete_buffer(self.vertex_buffer);
        ctx.delete_buffer(self.index_buffer);
        self.vertex_data.clear();
        self.vertex_len = 0;
        self.index_len = 0;
    }
}

static_assertions::assert_impl_all!(GeometryBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GpuOp, NullContext};
    use crate::mesh::data::MeshElement;
    use crate::types::PrimitiveMode;

    fn buffer(ctx: &mut NullContext, format: IndexFormat) -> GeometryBuffer {
        GeometryBuffer::new(
            ctx,
            GeometryBufferId(0),
            VertexLayout::position_only(),
            format,
        )
    }

    fn tri_mesh(vertex_count: usize) -> MeshData {
        let mut vertices = Vec::with_capacity(vertex_count * 3);
        for i in 0..vertex_count {
            vertices.extend_from_slice(&[i as f32, 0.0, 0.0]);
        }
        let indices: Vec<u32> = (0..vertex_count as u32).collect();
        MeshData::new(VertexLayout::position_only())
            .with_vertices(vertices)
            .with_indices(indices)
            .with_single_element(MaterialRef::Unset)
    }

    #[test]
    fn test_append_emits_handle_per_element() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U16);

        let data = MeshData::new(VertexLayout::position_only())
            .with_vertices(vec![0.0; 12])
            .with_indices(vec![0, 1, 2, 0, 2, 3])
            .with_element(MeshElement::triangles(0, 3, MaterialRef::Index(0)))
            .with_element(MeshElement::triangles(3, 3, MaterialRef::Index(1)));

        let handles = buf.append(&mut ctx, &data, |slot| {
            Some(crate::material::MaterialId(slot as u32))
        });

        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].index_offset, 0);
        assert_eq!(handles[1].index_offset, 3);
        assert_eq!(handles[0].material, Some(crate::material::MaterialId(0)));
        assert_eq!(handles[1].material, Some(crate::material::MaterialId(1)));
        assert_eq!(handles[0].vertex_offset, 0);
        assert_eq!(buf.vertex_count(), 4);
        assert_eq!(buf.index_count(), 6);
    }

    #[test]
    fn test_growth_reuploads_full_buffer_once() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U16);

        buf.append(&mut ctx, &tri_mesh(16), |_| None);
        ctx.clear_ops();

        // Fits in existing scratch capacity: sub-range upload only.
        buf.append(&mut ctx, &tri_mesh(3), |_| None);
        assert!(ctx
            .ops()
            .iter()
            .any(|op| matches!(op, GpuOp::BufferSubData(BufferTarget::Vertex, ..))));
        assert!(!ctx
            .ops()
            .iter()
            .any(|op| matches!(op, GpuOp::BufferData(BufferTarget::Vertex, _))));

        ctx.clear_ops();
        // Forces scratch growth: full reupload.
        buf.append(&mut ctx, &tri_mesh(2000), |_| None);
        assert!(ctx
            .ops()
            .iter()
            .any(|op| matches!(op, GpuOp::BufferData(BufferTarget::Vertex, _))));
    }

    #[test]
    fn test_sub_buffer_split_rebases_indices() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U16);

        // Fill just under the addressable range, then append across it.
        let first = 60_000;
        let second = 10_000;
        buf.append(&mut ctx, &tri_mesh(first), |_| None);
        assert_eq!(buf.sub_buffer_splits(), 0);

        let handles = buf.append(&mut ctx, &tri_mesh(second), |_| None);
        assert_eq!(buf.sub_buffer_splits(), 1);
        assert_eq!(buf.sub_buffer_base(), first);
        assert_eq!(handles[0].vertex_offset, first);

        // Every stored index, added to its handle's sub-buffer origin, must
        // resolve to the originally submitted vertex.
        for i in 0..second {
            let stored = buf.index_at(first + i);
            assert!(stored < 65536, "index {} escaped the 16-bit range", stored);
            assert_eq!(stored as usize + handles[0].vertex_offset, first + i);
        }
    }

    #[test]
    fn test_scenario_70k_vertices_split_exactly_once() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U16);

        // 70,000 vertices across multiple appends with sequential indices.
        let chunks = [20_000usize, 20_000, 20_000, 10_000];
        let mut origin = 0usize;
        for &n in &chunks {
            let handles = buf.append(&mut ctx, &tri_mesh(n), |_| None);
            let handle = handles[0];
            for i in 0..n {
                let stored = buf.index_at(handle.index_offset + i);
                assert!(stored < 65536);
                assert_eq!(stored as usize + handle.vertex_offset, origin + i);
            }
            origin += n;
        }
        assert_eq!(buf.vertex_count(), 70_000);
        assert_eq!(buf.sub_buffer_splits(), 1);
    }

    #[test]
    #[should_panic(expected = "does not match geometry buffer layout")]
    fn test_layout_mismatch_is_fatal() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U16);
        let data = MeshData::new(VertexLayout::position_normal())
            .with_vertices(vec![0.0; 24])
            .with_indices(vec![0, 1, 2])
            .with_single_element(MaterialRef::Unset);
        buf.append(&mut ctx, &data, |_| None);
    }

    #[test]
    fn test_can_accept_checks_layout_and_capacity() {
        let mut ctx = NullContext::new();
        let buf = buffer(&mut ctx, IndexFormat::U16);

        assert!(buf.can_accept(&tri_mesh(3)));
        assert!(!buf.can_accept(
            &MeshData::new(VertexLayout::position_normal())
                .with_vertices(vec![0.0; 24])
                .with_indices(vec![0, 1, 2])
        ));

        // A single submission larger than the whole-buffer ceiling.
        let ceiling = IndexFormat::U16.max_vertices();
        let too_big = MeshData::new(VertexLayout::position_only())
            .with_vertices(vec![0.0; (ceiling + 1) * 3])
            .with_indices(vec![0]);
        assert!(!buf.can_accept(&too_big));
    }

    #[test]
    fn test_u32_buffers_do_not_split_early() {
        let mut ctx = NullContext::new();
        let mut buf = buffer(&mut ctx, IndexFormat::U32);
        buf.append(&mut ctx, &tri_mesh(70_000), |_| None);
        assert_eq!(buf.sub_buffer_splits(), 0);
        assert_eq!(buf.index_at(69_999), 69_999);
    }
}
