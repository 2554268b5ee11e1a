//! Null graphics context for testing and development.
//!
//! This context doesn't perform actual GPU operations but provides a valid
//! implementation of [`GraphicsContext`] without requiring GPU hardware.
//! Every call is logged at trace level and appended to an op log that tests
//! can inspect to assert on the exact sequence the pipeline produced.

use super::GraphicsContext;
use crate::types::{
    BufferId, BufferTarget, BufferUsage, Capability, IndexFormat, PrimitiveMode, ProgramId,
    TextureId, TextureTarget, UniformLocation, UniformValue,
};

/// One recorded context operation.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuOp {
    /// `bind_buffer` call.
    BindBuffer(BufferTarget, BufferId),
    /// `buffer_data` call (full upload; stores the byte length).
    BufferData(BufferTarget, usize),
    /// `buffer_sub_data` call (offset, byte length).
    BufferSubData(BufferTarget, usize, usize),
    /// `bind_texture` call.
    BindTexture(u32, TextureTarget, Option<TextureId>),
    /// `use_program` call.
    UseProgram(ProgramId),
    /// `set_uniform` call.
    SetUniform(UniformLocation, UniformValue),
    /// `set_capability` call.
    SetCapability(Capability, bool),
    /// `vertex_attrib_pointer` call (location, components, stride, offset).
    VertexAttribPointer(u32, u32, u32, usize),
    /// `enable_vertex_attrib` call.
    EnableVertexAttrib(u32),
    /// `disable_vertex_attrib` call.
    DisableVertexAttrib(u32),
    /// `draw_elements` call.
    DrawElements(PrimitiveMode, u32, IndexFormat, usize),
    /// `capture_frame` call.
    CaptureFrame,
    /// `begin_overlay_target` call.
    BeginOverlayTarget,
    /// `compose_captured_frame` call.
    ComposeCapturedFrame,
}

/// No-op recording graphics context.
#[derive(Debug, Default)]
pub struct NullContext {
    u32_indices: bool,
    next_buffer: u32,
    live_buffers: u32,
    ops: Vec<GpuOp>,
}

impl NullContext {
    /// Create a null context with 32-bit index support enabled.
    pub fn new() -> Self {
        Self {
            u32_indices: true,
            ..Self::default()
        }
    }

    /// Create a null context emulating a device without 32-bit indices.
    pub fn without_u32_indices() -> Self {
        Self {
            u32_indices: false,
            ..Self::default()
        }
    }

    /// The recorded operation log, in call order.
    pub fn ops(&self) -> &[GpuOp] {
        &self.ops
    }

    /// Clear the operation log (counters for live resources are kept).
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of buffers created and not yet deleted.
    pub fn live_buffers(&self) -> u32 {
        self.live_buffers
    }

    /// Number of recorded draw calls.
    pub fn draw_calls(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, GpuOp::DrawElements(..)))
            .count()
    }
}

impl GraphicsContext for NullContext {
    fn name(&self) -> &'static str {
        "Null"
    }

    fn supports_u32_indices(&self) -> bool {
        self.u32_indices
    }

    fn create_buffer(&mut self, usage: BufferUsage) -> BufferId {
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.live_buffers += 1;
        log::trace!("NullContext: create_buffer {:?} usage={:?}", id, usage);
        id
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.live_buffers = self.live_buffers.saturating_sub(1);
        log::trace!("NullContext: delete_buffer {:?}", buffer);
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        log::trace!("NullContext: bind_buffer {:?} {:?}", target, buffer);
        self.ops.push(GpuOp::BindBuffer(target, buffer));
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        log::trace!("NullContext: buffer_data {:?} len={}", target, data.len());
        self.ops.push(GpuOp::BufferData(target, data.len()));
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, byte_offset: usize, data: &[u8]) {
        log::trace!(
            "NullContext: buffer_sub_data {:?} offset={} len={}",
            target,
            byte_offset,
            data.len()
        );
        self.ops
            .push(GpuOp::BufferSubData(target, byte_offset, data.len()));
    }

    fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<TextureId>) {
        log::trace!(
            "NullContext: bind_texture unit={} {:?} {:?}",
            unit,
            target,
            texture
        );
        self.ops.push(GpuOp::BindTexture(unit, target, texture));
    }

    fn use_program(&mut self, program: ProgramId) {
        log::trace!("NullContext: use_program {:?}", program);
        self.ops.push(GpuOp::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        log::trace!("NullContext: set_uniform {:?} {:?}", location, value);
        self.ops.push(GpuOp::SetUniform(location, value.clone()));
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        log::trace!("NullContext: set_capability {:?} {}", capability, enabled);
        self.ops.push(GpuOp::SetCapability(capability, enabled));
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: u32,
        _normalized: bool,
        stride: u32,
        byte_offset: usize,
    ) {
        log::trace!(
            "NullContext: vertex_attrib_pointer loc={} comps={} stride={} offset={}",
            location,
            components,
            stride,
            byte_offset
        );
        self.ops
            .push(GpuOp::VertexAttribPointer(location, components, stride, byte_offset));
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        self.ops.push(GpuOp::EnableVertexAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: u32) {
        self.ops.push(GpuOp::DisableVertexAttrib(location));
    }

    fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        format: IndexFormat,
        byte_offset: usize,
    ) {
        log::trace!(
            "NullContext: draw_elements {:?} count={} {:?} offset={}",
            mode,
            count,
            format,
            byte_offset
        );
        self.ops
            .push(GpuOp::DrawElements(mode, count, format, byte_offset));
    }

    fn capture_frame(&mut self) {
        log::trace!("NullContext: capture_frame");
        self.ops.push(GpuOp::CaptureFrame);
    }

    fn begin_overlay_target(&mut self) {
        log::trace!("NullContext: begin_overlay_target");
        self.ops.push(GpuOp::BeginOverlayTarget);
    }

    fn compose_captured_frame(&mut self) {
        log::trace!("NullContext: compose_captured_frame");
        self.ops.push(GpuOp::ComposeCapturedFrame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_context_records_ops() {
        let mut ctx = NullContext::new();
        let vb = ctx.create_buffer(BufferUsage::VERTEX);
        ctx.bind_buffer(BufferTarget::Vertex, vb);
        ctx.draw_elements(PrimitiveMode::Triangles, 3, IndexFormat::U16, 0);

        assert_eq!(ctx.live_buffers(), 1);
        assert_eq!(ctx.draw_calls(), 1);
        assert_eq!(ctx.ops()[0], GpuOp::BindBuffer(BufferTarget::Vertex, vb));

        ctx.delete_buffer(vb);
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn test_index_support_flag() {
        assert!(NullContext::new().supports_u32_indices());
        assert!(!NullContext::without_u32_indices().supports_u32_indices());
    }
}
