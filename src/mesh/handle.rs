//! Mesh handles: immutable descriptors of drawable geometry sub-ranges.
//!
//! A [`MeshHandle`] is what a draw list collects and sorts. It names the
//! owning geometry buffer, the sub-buffer origin its indices are relative
//! to, an index range, a primitive mode, and optional material/transform
//! references. Handles are plain `Copy` records shared between the owning
//! asset and every draw-list item that instantiates it; cloning a handle
//! with a different transform represents another placement of the same
//! geometry without duplicating vertex data.
//!
//! There is no sentinel "undefined" handle: `Option<&MeshHandle>` is the
//! draw list's "no previous state" marker, and every comparison against
//! `None` reports that everything changed.

use crate::material::{MaterialId, MaterialStore, ShaderRegistry};
use crate::transform::TransformId;
use crate::types::{IndexFormat, PrimitiveMode};

/// Identifier of a [`GeometryBuffer`] within its pool.
///
/// [`GeometryBuffer`]: crate::mesh::GeometryBuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryBufferId(pub u32);

/// Immutable descriptor of a drawable sub-range of geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHandle {
    /// The geometry buffer owning the vertex/index data.
    pub buffer: GeometryBufferId,
    /// Vertex element index of the sub-buffer origin the handle's indices
    /// are relative to. Attribute pointers are based at this element.
    pub vertex_offset: usize,
    /// Primitive assembly mode.
    pub mode: PrimitiveMode,
    /// First index element within the buffer's index data.
    pub index_offset: usize,
    /// Number of index elements.
    pub index_count: u32,
    /// The material to draw with; `None` means not ready, skip at build.
    pub material: Option<MaterialId>,
    /// Optional per-instance transform.
    pub transform: Option<TransformId>,
}

impl MeshHandle {
    /// Clone this handle for another placement of the same geometry.
    pub fn with_transform(mut self, transform: TransformId) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Byte offset of the handle's first index for a given index width.
    pub fn index_byte_offset(&self, format: IndexFormat) -> usize {
        self.index_offset * format.size()
    }

    /// Derive the batching sort key for this handle.
    ///
    /// Key significance, most significant first: shader program (declared
    /// sort order, then registry creation id), transform identity (`None`
    /// sorts first), material creation index, owning buffer, index offset.
    /// Grouping by transform ahead of material matters because the model
    /// matrix is the most expensive per-draw state change after the shader.
    ///
    /// Callers guarantee the handle passed draw-list filtering, so the
    /// material is present and its program registered.
    pub fn sort_key(&self, materials: &MaterialStore, shaders: &ShaderRegistry) -> HandleSortKey {
        let material_id = self
            .material
            .expect("sort_key on a handle without material; filter before sorting");
        let material = materials.get(material_id);
        let program = shaders.get(material.program());
        HandleSortKey {
            program: (program.sort_order(), material.program().index()),
            transform: self.transform.map(|t| t.index()),
            material: material.sort_index(),
            buffer: self.buffer.0,
            index_offset: self.index_offset,
        }
    }
}

/// Strict total order used to batch handles for minimal GPU state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandleSortKey {
    /// (program sort order, program creation id).
    pub program: (i32, u32),
    /// Transform creation id; `None` (no transform) sorts first.
    pub transform: Option<u32>,
    /// Material creation-order index.
    pub material: u32,
    /// Owning buffer id.
    pub buffer: u32,
    /// Index offset, ascending, to maximize draw coalescing.
    pub index_offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_key_ordering() {
        let a = HandleSortKey {
            program: (0, 1),
            transform: None,
            material: 0,
            buffer: 0,
            index_offset: 0,
        };
        // No transform sorts ahead of any transform.
        let b = HandleSortKey {
            transform: Some(0),
            ..a
        };
        assert!(a < b);

        // Program dominates everything else.
        let c = HandleSortKey {
            program: (-1, 7),
            transform: Some(9),
            material: 9,
            buffer: 9,
            index_offset: 9,
        };
        assert!(c < a);

        // Within one (program, transform, material, buffer) run, ascending
        // index offset keeps contiguous ranges adjacent.
        let d = HandleSortKey {
            index_offset: 10,
            ..a
        };
        assert!(a < d);
    }

    #[test]
    fn test_with_transform_clones_placement() {
        let handle = MeshHandle {
            buffer: GeometryBufferId(0),
            vertex_offset: 0,
            mode: PrimitiveMode::Triangles,
            index_offset: 0,
            index_count: 6,
            material: None,
            transform: None,
        };
        let placed = handle.with_transform(TransformId(3));
        assert_eq!(placed.transform, Some(TransformId(3)));
        assert_eq!(handle.transform, None);
        assert_eq!(placed.index_count, handle.index_count);
    }

    #[test]
    fn test_index_byte_offset() {
        let handle = MeshHandle {
            buffer: GeometryBufferId(0),
            vertex_offset: 0,
            mode: PrimitiveMode::Triangles,
            index_offset: 30,
            index_count: 6,
            material: None,
            transform: None,
        };
        assert_eq!(handle.index_byte_offset(IndexFormat::U16), 60);
        assert_eq!(handle.index_byte_offset(IndexFormat::U32), 120);
    }
}
