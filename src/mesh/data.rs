//! CPU-side mesh submissions.
//!
//! [`MeshData`] is what a loader hands to the mesh pool: an interleaved
//! vertex payload, a u32 index payload, and one or more material-grouped
//! [`MeshElement`]s describing sub-ranges of the index data. Indices are
//! converted to the accepting buffer's native width at append time.
//!
//! Element materials are either literal references or loader-side indices
//! resolved through a caller-supplied function when the data is appended,
//! so a model file can name materials before they exist as engine objects.

use std::sync::Arc;

use crate::material::MaterialId;
use crate::types::PrimitiveMode;

use super::layout::VertexLayout;

/// Material reference carried by a mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialRef {
    /// A concrete engine material.
    Literal(MaterialId),
    /// A loader-side material slot, resolved at append time.
    Index(usize),
    /// No material assigned; the resulting handle is skipped at draw time.
    Unset,
}

/// A material-grouped sub-range of a mesh's index data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshElement {
    /// How the element's indices are assembled into primitives.
    pub mode: PrimitiveMode,
    /// First index of this element within the submission's index array.
    pub first_index: usize,
    /// Number of indices in this element.
    pub index_count: usize,
    /// The element's material.
    pub material: MaterialRef,
}

impl MeshElement {
    /// Create a triangle-list element.
    pub fn triangles(first_index: usize, index_count: usize, material: MaterialRef) -> Self {
        Self {
            mode: PrimitiveMode::Triangles,
            first_index,
            index_count,
            material,
        }
    }
}

/// A complete mesh submission.
#[derive(Debug, Clone)]
pub struct MeshData {
    /// Vertex layout of the interleaved payload (shared via `Arc`).
    pub layout: Arc<VertexLayout>,
    /// Interleaved vertex data, `layout.stride_floats()` floats per vertex.
    pub vertices: Vec<f32>,
    /// Mesh-relative vertex indices.
    pub indices: Vec<u32>,
    /// Material-grouped element ranges.
    pub elements: Vec<MeshElement>,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl MeshData {
    /// Create an empty submission with the given layout.
    pub fn new(layout: Arc<VertexLayout>) -> Self {
        Self {
            layout,
            vertices: Vec::new(),
            indices: Vec::new(),
            elements: Vec::new(),
            label: None,
        }
    }

    /// Set the interleaved vertex payload.
    pub fn with_vertices(mut self, vertices: Vec<f32>) -> Self {
        self.vertices = vertices;
        self
    }

    /// Set the index payload.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    /// Add an element range.
    pub fn with_element(mut self, element: MeshElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Add a single triangle-list element covering all indices.
    pub fn with_single_element(mut self, material: MaterialRef) -> Self {
        let count = self.indices.len();
        self.elements.push(MeshElement::triangles(0, count, material));
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of vertices in the payload.
    pub fn vertex_count(&self) -> usize {
        let stride = self.layout.stride_floats();
        if stride == 0 {
            0
        } else {
            self.vertices.len() / stride
        }
    }

    /// Number of indices in the payload.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Validate payload/layout/element consistency.
    pub fn validate(&self) -> Result<(), String> {
        self.layout.validate()?;
        let stride = self.layout.stride_floats();
        if self.vertices.len() % stride != 0 {
            return Err(format!(
                "vertex payload length {} is not a multiple of stride {}",
                self.vertices.len(),
                stride
            ));
        }
        let vertex_count = self.vertex_count() as u32;
        if let Some(&bad) = self.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(format!(
                "index {} out of range for {} vertices",
                bad, vertex_count
            ));
        }
        for element in &self.elements {
            if element.first_index + element.index_count > self.indices.len() {
                return Err(format!(
                    "element range {}..{} exceeds {} indices",
                    element.first_index,
                    element.first_index + element.index_count,
                    self.indices.len()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        MeshData::new(VertexLayout::position_only())
            .with_vertices(vec![
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0,
            ])
            .with_indices(vec![0, 1, 2, 0, 2, 3])
            .with_single_element(MaterialRef::Index(0))
    }

    #[test]
    fn test_mesh_data_counts() {
        let data = quad();
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.index_count(), 6);
        assert_eq!(data.elements.len(), 1);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let mut data = quad();
        data.indices[2] = 9;
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ragged_vertices() {
        let mut data = quad();
        data.vertices.pop();
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_element_range() {
        let data = quad().with_element(MeshElement::triangles(3, 6, MaterialRef::Unset));
        assert!(data.validate().is_err());
    }
}
