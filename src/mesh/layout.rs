//! Vertex layout definitions for geometry buffers.
//!
//! A [`VertexLayout`] is an ordered, fixed list of attribute descriptors
//! defining one interleaved vertex: semantic, component count and a
//! normalization flag per attribute. Attribute byte offsets and the vertex
//! stride are derived from the order.
//!
//! Layouts are shared via `Arc` since there are typically only a few
//! combinations across many meshes. A [`GeometryBuffer`] accepts only mesh
//! data whose layout matches its own exactly (same attribute count,
//! semantics, formats and order), so [`VertexLayout::matches`] is a strict
//! equality check, not a compatibility test.
//!
//! [`GeometryBuffer`]: crate::mesh::GeometryBuffer

use std::sync::Arc;

/// Semantic meaning of a vertex attribute.
///
/// Semantics double as stable shader attribute locations: a program binds
/// its inputs at [`AttributeSemantic::location`] so that attribute pointers
/// can be written without a per-program lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeSemantic {
    /// Vertex position (typically float3).
    Position,
    /// Vertex normal (typically float3).
    Normal,
    /// Vertex tangent (typically float4).
    Tangent,
    /// Texture coordinates set 0 (typically float2).
    TexCoord0,
    /// Texture coordinates set 1 (typically float2).
    TexCoord1,
    /// Vertex color (typically float4).
    Color,
}

impl AttributeSemantic {
    /// Stable attribute location for this semantic.
    pub fn location(&self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::TexCoord0 => 3,
            Self::TexCoord1 => 4,
            Self::Color => 5,
        }
    }
}

/// Component layout of a vertex attribute.
///
/// All attribute data is stored as 32-bit floats in the geometry buffer's
/// scratch arrays; incoming payloads are converted on append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    /// Single float.
    Float,
    /// Two floats.
    Float2,
    /// Three floats.
    Float3,
    /// Four floats.
    Float4,
}

impl AttributeFormat {
    /// Number of components.
    pub fn components(&self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
        }
    }

    /// Size in bytes of this format.
    pub fn size(&self) -> usize {
        self.components() as usize * 4
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: AttributeSemantic,
    /// Component layout.
    pub format: AttributeFormat,
    /// Whether integer-sourced data was normalized into [0, 1].
    pub normalized: bool,
}

impl VertexAttribute {
    /// Create a new vertex attribute.
    pub fn new(semantic: AttributeSemantic, format: AttributeFormat) -> Self {
        Self {
            semantic,
            format,
            normalized: false,
        }
    }

    /// Mark the attribute as normalized.
    pub fn normalized(mut self) -> Self {
        self.normalized = true;
        self
    }

    /// Position attribute (float3).
    pub fn position() -> Self {
        Self::new(AttributeSemantic::Position, AttributeFormat::Float3)
    }

    /// Normal attribute (float3).
    pub fn normal() -> Self {
        Self::new(AttributeSemantic::Normal, AttributeFormat::Float3)
    }

    /// Tangent attribute (float4).
    pub fn tangent() -> Self {
        Self::new(AttributeSemantic::Tangent, AttributeFormat::Float4)
    }

    /// First texture coordinate attribute (float2).
    pub fn texcoord0() -> Self {
        Self::new(AttributeSemantic::TexCoord0, AttributeFormat::Float2)
    }

    /// Second texture coordinate attribute (float2).
    pub fn texcoord1() -> Self {
        Self::new(AttributeSemantic::TexCoord1, AttributeFormat::Float2)
    }

    /// Color attribute (float4).
    pub fn color() -> Self {
        Self::new(AttributeSemantic::Color, AttributeFormat::Float4)
    }
}

/// Ordered attribute list defining one interleaved vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// The vertex attributes, in buffer order.
    pub attributes: Vec<VertexAttribute>,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl VertexLayout {
    /// Create a new empty vertex layout.
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            label: None,
        }
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Vertex stride in bytes.
    pub fn stride_bytes(&self) -> usize {
        self.attributes.iter().map(|a| a.format.size()).sum()
    }

    /// Vertex stride in float elements.
    pub fn stride_floats(&self) -> usize {
        self.stride_bytes() / 4
    }

    /// Byte offset of the attribute at `index` within a vertex.
    pub fn offset_of(&self, index: usize) -> usize {
        self.attributes[..index]
            .iter()
            .map(|a| a.format.size())
            .sum()
    }

    /// Check if this layout has a specific semantic.
    pub fn has_semantic(&self, semantic: AttributeSemantic) -> bool {
        self.attributes.iter().any(|a| a.semantic == semantic)
    }

    /// Strict layout identity: same count, semantics, formats and order.
    ///
    /// This is the acceptance test a [`GeometryBuffer`] applies to incoming
    /// mesh data; labels are ignored.
    ///
    /// [`GeometryBuffer`]: crate::mesh::GeometryBuffer
    pub fn matches(&self, other: &VertexLayout) -> bool {
        self.attributes == other.attributes
    }

    /// Validate the layout (non-empty, no duplicate semantics).
    pub fn validate(&self) -> Result<(), String> {
        if self.attributes.is_empty() {
            return Err("layout has no attributes".to_string());
        }
        for (i, attr) in self.attributes.iter().enumerate() {
            if self.attributes[..i].iter().any(|a| a.semantic == attr.semantic) {
                return Err(format!("duplicate semantic {:?}", attr.semantic));
            }
        }
        Ok(())
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Common Layouts
// ============================================================================

impl VertexLayout {
    /// Position-only layout (12 bytes per vertex).
    pub fn position_only() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_attribute(VertexAttribute::position())
                .with_label("position_only"),
        )
    }

    /// Position + normal layout (24 bytes per vertex).
    pub fn position_normal() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_attribute(VertexAttribute::position())
                .with_attribute(VertexAttribute::normal())
                .with_label("position_normal"),
        )
    }

    /// Position + normal + texcoord layout (32 bytes per vertex).
    pub fn position_normal_uv() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_attribute(VertexAttribute::position())
                .with_attribute(VertexAttribute::normal())
                .with_attribute(VertexAttribute::texcoord0())
                .with_label("position_normal_uv"),
        )
    }

    /// Position + color layout for vertex-colored geometry (28 bytes).
    pub fn position_color() -> Arc<Self> {
        Arc::new(
            Self::new()
                .with_attribute(VertexAttribute::position())
                .with_attribute(VertexAttribute::color())
                .with_label("position_color"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_format_size() {
        assert_eq!(AttributeFormat::Float.size(), 4);
        assert_eq!(AttributeFormat::Float3.size(), 12);
        assert_eq!(AttributeFormat::Float4.size(), 16);
    }

    #[test]
    fn test_layout_stride_and_offsets() {
        let layout = VertexLayout::new()
            .with_attribute(VertexAttribute::position())
            .with_attribute(VertexAttribute::normal())
            .with_attribute(VertexAttribute::texcoord0());

        assert_eq!(layout.stride_bytes(), 32);
        assert_eq!(layout.stride_floats(), 8);
        assert_eq!(layout.offset_of(0), 0);
        assert_eq!(layout.offset_of(1), 12);
        assert_eq!(layout.offset_of(2), 24);
    }

    #[test]
    fn test_layout_matches_is_strict() {
        let a = VertexLayout::new()
            .with_attribute(VertexAttribute::position())
            .with_attribute(VertexAttribute::normal());
        let b = VertexLayout::new()
            .with_attribute(VertexAttribute::position())
            .with_attribute(VertexAttribute::normal())
            .with_label("labelled");
        // Same attributes in a different order are a different layout.
        let c = VertexLayout::new()
            .with_attribute(VertexAttribute::normal())
            .with_attribute(VertexAttribute::position());

        assert!(a.matches(&b)); // labels ignored
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_layout_validation() {
        assert!(VertexLayout::new().validate().is_err());

        let dup = VertexLayout::new()
            .with_attribute(VertexAttribute::position())
            .with_attribute(VertexAttribute::position());
        assert!(dup.validate().is_err());

        assert!(VertexLayout::position_normal_uv().validate().is_ok());
    }

    #[test]
    fn test_common_layouts() {
        assert_eq!(VertexLayout::position_only().stride_bytes(), 12);
        assert_eq!(VertexLayout::position_normal_uv().stride_bytes(), 32);
        assert_eq!(VertexLayout::position_color().stride_bytes(), 28);
    }
}
