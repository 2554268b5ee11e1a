//! Graphics context abstraction.
//!
//! The [`GraphicsContext`] trait is the single seam between this crate and a
//! real GPU API. Everything above it (geometry buffers, command buffers,
//! draw lists) records intent as plain data; the context is where intent
//! becomes driver calls.
//!
//! The [`CommandBuffer`] is the sole owner of *when* draw-time operations are
//! invoked: render code writes commands, and only `CommandBuffer::run`
//! touches the context. Load-time geometry uploads go through the context
//! directly since they happen once per asset, not per frame.
//!
//! [`CommandBuffer`]: crate::command::CommandBuffer

pub mod null;

pub use null::{GpuOp, NullContext};

use crate::types::{
    BufferId, BufferTarget, BufferUsage, Capability, IndexFormat, PrimitiveMode, ProgramId,
    TextureId, TextureTarget, UniformLocation, UniformValue,
};

/// Abstraction over a single logical GPU graphics context.
///
/// All calls are fire-and-forget from the caller's perspective: none of them
/// can fail at call time, and the underlying driver's blocking behavior is
/// opaque to this crate. Resource creation and frame-capture operations are
/// configuration-level; everything else is the per-frame hot path.
pub trait GraphicsContext {
    /// Human-readable context name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether 32-bit index buffers are supported.
    ///
    /// Queried once when a geometry pool is created; buffers constructed for
    /// an unsupported width would silently render garbage.
    fn supports_u32_indices(&self) -> bool;

    /// Create a buffer object.
    fn create_buffer(&mut self, usage: BufferUsage) -> BufferId;

    /// Destroy a buffer object.
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Bind a buffer to a target.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId);

    /// Allocate (or reallocate) the currently bound buffer and fill it.
    ///
    /// This is the only operation that may resize the GPU-side allocation.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);

    /// Update a sub-range of the currently bound buffer.
    fn buffer_sub_data(&mut self, target: BufferTarget, byte_offset: usize, data: &[u8]);

    /// Bind a texture (or unbind with `None`) to a texture unit.
    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<TextureId>);

    /// Make a program current.
    fn use_program(&mut self, program: ProgramId);

    /// Write a uniform value for the current program.
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Enable or disable a fixed-function capability.
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Describe a vertex attribute within the currently bound vertex buffer.
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: u32,
        normalized: bool,
        stride: u32,
        byte_offset: usize,
    );

    /// Enable a vertex attribute array.
    fn enable_vertex_attrib(&mut self, location: u32);

    /// Disable a vertex attribute array.
    fn disable_vertex_attrib(&mut self, location: u32);

    /// Issue an indexed draw call against the bound buffers.
    fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        format: IndexFormat,
        byte_offset: usize,
    );

    /// Copy the current color target into the frame-capture texture.
    ///
    /// Used by the refraction bracket so refracting materials can sample the
    /// finished opaque pass.
    fn capture_frame(&mut self);

    /// Switch rendering to a fresh overlay target.
    fn begin_overlay_target(&mut self);

    /// Compose the captured frame into the current target as a background.
    fn compose_captured_frame(&mut self);
}
