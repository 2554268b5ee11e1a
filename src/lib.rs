//! # Cinnabar Graphics
//!
//! Retained-mode render submission pipeline built around packed geometry
//! buffers, deferred command recording and sorted draw lists.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GeometryPool`] - Packed vertex/index storage with sub-buffer index
//!   rebasing for narrow index formats
//! - [`CommandBuffer`] - Deferred GPU commands with redundant-state
//!   elimination and draw coalescing
//! - [`DrawLists`] - Cached render batches sorted to minimize GPU state
//!   transitions
//! - [`SceneRenderer`] - The facade owning every store and the per-frame
//!   driver
//! - [`GraphicsContext`] - Trait for GPU backends, with [`NullContext`]
//!   for testing
//!
//! ## Example
//!
//! ```ignore
//! use cinnabar_graphics::{NullContext, SceneRenderer};
//!
//! let mut ctx = NullContext::new();
//! let mut renderer = SceneRenderer::new(&ctx);
//! renderer.begin_frame();
//! // Submit meshes, build lists, render...
//! renderer.end_frame();
//! ```

pub mod command;
pub mod context;
pub mod draw;
pub mod error;
pub mod material;
pub mod mesh;
pub mod renderer;
pub mod transform;
pub mod types;

// Re-export main types for convenience
pub use command::{Command, CommandBuffer};
pub use context::{GraphicsContext, NullContext};
pub use draw::{DrawList, DrawListId, DrawLists, ItemId, ItemStore, ListStats};
pub use error::RenderError;
pub use material::{
    Material, MaterialId, MaterialProps, MaterialStore, ShaderKey, ShaderProgram, ShaderRegistry,
};
pub use mesh::{
    GeometryBuffer, GeometryBufferId, GeometryPool, MaterialRef, MeshData, MeshElement,
    MeshHandle, VertexAttribute, VertexLayout,
};
pub use renderer::{FrameStats, SceneRenderer};
pub use transform::{Transform, TransformId, TransformStore};
pub use types::{
    BufferUsage, Capability, IndexFormat, ParameterId, ParameterValue, PrimitiveMode,
    UniformValue,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    log::info!("Cinnabar Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_null_context() {
        let ctx = NullContext::new();
        assert_eq!(ctx.name(), "Null");
    }

    #[test]
    fn test_renderer_creation() {
        let ctx = NullContext::new();
        let renderer = SceneRenderer::new(&ctx);
        assert_eq!(renderer.frame_count(), 0);
    }
}
