//! Shared GPU-facing types: resource ids, binding targets, draw parameters
//! and deferred frame parameters.
//!
//! All ids are opaque newtypes handed out by the [`GraphicsContext`] or by
//! the stores that own the corresponding objects. They are plain integers so
//! they can be freely copied into command records and sort keys.
//!
//! [`GraphicsContext`]: crate::context::GraphicsContext

use bitflags::bitflags;

/// Handle to a GPU buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Handle to a GPU texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle to a linked GPU shader program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Location of a uniform within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Binding target for buffer objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Vertex,
    /// Index (element) data.
    Index,
}

/// Binding target for textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    /// Standard 2D texture.
    #[default]
    D2,
    /// Cube map texture.
    Cube,
}

/// Fixed-function capabilities toggled through the command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing.
    DepthTest,
    /// Writing to the depth buffer.
    DepthWrite,
    /// Alpha blending.
    Blend,
    /// Back-face culling.
    CullFace,
    /// Stencil testing.
    StencilTest,
}

/// How indices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    /// Each index is a separate point.
    Points,
    /// Every two indices form a line.
    Lines,
    /// Indices form a connected strip of lines.
    LineStrip,
    /// Every three indices form a triangle.
    #[default]
    Triangles,
    /// Indices form a connected strip of triangles.
    TriangleStrip,
    /// Indices form a fan of triangles around the first index.
    TriangleFan,
}

/// Index element width, chosen once per geometry buffer at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    #[default]
    U16,
    /// 32-bit unsigned indices (requires context support).
    U32,
}

impl IndexFormat {
    /// Size in bytes of one index element.
    pub fn size(&self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Number of vertex elements addressable within one sub-buffer.
    ///
    /// Indices appended after a sub-buffer split are rebased so they never
    /// exceed this range.
    pub fn addressable_vertices(&self) -> usize {
        match self {
            Self::U16 => 1 << 16,
            // Saturates on 32-bit targets, where 2^32 exceeds usize.
            Self::U32 => 1usize.checked_shl(32).unwrap_or(usize::MAX),
        }
    }

    /// Whole-buffer vertex capacity ceiling for `can_accept`.
    ///
    /// For 16-bit indices this is several sub-buffers' worth of vertices;
    /// sub-buffer rebasing keeps individual draw calls addressable. The
    /// 32-bit ceiling is a practical clamp on scratch-array memory rather
    /// than an addressing limit.
    pub fn max_vertices(&self) -> usize {
        match self {
            Self::U16 => 8 << 16,
            Self::U32 => 1 << 22,
        }
    }

    /// Whole-buffer index capacity ceiling for `can_accept`.
    pub fn max_indices(&self) -> usize {
        self.max_vertices() * 2
    }
}

bitflags! {
    /// Usage flags for buffer creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer can be used as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Buffer can be used as an index buffer.
        const INDEX = 1 << 1;
        /// Buffer contents will be rewritten repeatedly.
        const DYNAMIC = 1 << 2;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// A literal uniform value written at replay time.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Single float.
    Float(f32),
    /// Single integer (also used for sampler units).
    Int(i32),
    /// Packed float vector (vec2/vec3/vec4 by length).
    Floats(Vec<f32>),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
}

/// Identifier of a logical per-frame parameter.
///
/// Parameters let many programs share one late-resolved value: the frame
/// sets "the view matrix" once on the command buffer, and every program that
/// declared interest picks it up at replay without re-pushing per draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterId(pub u16);

impl ParameterId {
    /// World-to-view matrix of the active camera.
    pub const VIEW_MATRIX: Self = Self(0);
    /// View-to-clip projection matrix.
    pub const PROJECTION_MATRIX: Self = Self(1);
    /// Combined view-projection matrix.
    pub const VIEW_PROJECTION_MATRIX: Self = Self(2);
    /// World-space camera position (vec3).
    pub const CAMERA_POSITION: Self = Self(3);
    /// Fog color (vec4).
    pub const FOG_COLOR: Self = Self(4);
    /// Fog density (float).
    pub const FOG_DENSITY: Self = Self(5);
    /// Seconds since engine start (float).
    pub const TIME: Self = Self(6);
    /// Color capture of the opaque pass, for refracting materials.
    pub const CAPTURED_FRAME: Self = Self(7);

    /// First id available for application-defined parameters.
    pub const USER_BASE: u16 = 64;
}

/// Current value bound to a [`ParameterId`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Packed floats (vectors and matrices alike).
    Floats(Vec<f32>),
    /// A texture to be bound when the parameter is consumed.
    Texture(TextureId),
}

impl ParameterValue {
    /// Wrap a column-major matrix.
    pub fn matrix(m: [f32; 16]) -> Self {
        Self::Floats(m.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(IndexFormat::U16, 2)]
    #[case(IndexFormat::U32, 4)]
    fn test_index_format_sizes(#[case] format: IndexFormat, #[case] size: usize) {
        assert_eq!(format.size(), size);
        assert_eq!(format.max_indices(), format.max_vertices() * 2);
    }

    #[test]
    fn test_index_format_ceilings() {
        // The whole-buffer ceiling must exceed one addressable range for
        // 16-bit indices, otherwise sub-buffer splitting would be pointless.
        assert!(IndexFormat::U16.max_vertices() > IndexFormat::U16.addressable_vertices());
        assert!(IndexFormat::U32.max_vertices() > IndexFormat::U16.max_vertices());
        assert_eq!(IndexFormat::U16.addressable_vertices(), 65536);
        // 32-bit buffers never split: one sub-buffer spans the whole ceiling.
        assert!(IndexFormat::U32.addressable_vertices() >= IndexFormat::U32.max_vertices());
    }

    #[test]
    fn test_buffer_usage_flags() {
        let usage = BufferUsage::VERTEX | BufferUsage::DYNAMIC;
        assert!(usage.contains(BufferUsage::VERTEX));
        assert!(!usage.contains(BufferUsage::INDEX));
    }

    #[test]
    fn test_well_known_parameters_distinct() {
        let ids = [
            ParameterId::VIEW_MATRIX,
            ParameterId::PROJECTION_MATRIX,
            ParameterId::VIEW_PROJECTION_MATRIX,
            ParameterId::CAMERA_POSITION,
            ParameterId::FOG_COLOR,
            ParameterId::FOG_DENSITY,
            ParameterId::TIME,
            ParameterId::CAPTURED_FRAME,
        ];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(ParameterId::USER_BASE as usize > ids.len());
    }
}
