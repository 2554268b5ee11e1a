//! Deferred GPU command recording with redundant-state elimination.
//!
//! A [`CommandBuffer`] records state-changing operations and draw calls as
//! plain data and replays them against a [`GraphicsContext`] in strict
//! insertion order. Three things make it cheaper than calling the context
//! directly:
//!
//! - **Record-time dedup**: the buffer shadows the last-known GPU state for
//!   texture units, buffer targets and capability flags, and drops a push
//!   that would be a no-op. Dedup happens when the command is recorded, not
//!   at replay.
//! - **Draw coalescing**: a draw whose index range directly continues the
//!   previously pushed draw (same mode and index width) is merged into it,
//!   so a sorted run of contiguous handles costs one GPU draw call. Only
//!   the single most recent record is inspected, a greedy O(1) check.
//! - **Deferred parameters**: a uniform can be bound to a named per-frame
//!   parameter instead of a literal value; the current value is looked up
//!   at replay. Camera matrices, fog and time are set once per frame and
//!   picked up by every program that declared interest.
//!
//! Commands are a tagged union of plain payload structs dispatched through
//! a match at replay; the buffer never stores callables.

use std::collections::HashMap;

use crate::context::GraphicsContext;
use crate::types::{
    BufferId, BufferTarget, Capability, IndexFormat, ParameterId, ParameterValue, PrimitiveMode,
    ProgramId, TextureId, TextureTarget, UniformLocation, UniformValue,
};

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Bind a buffer to a target.
    BindBuffer {
        /// Binding target.
        target: BufferTarget,
        /// Buffer to bind.
        buffer: BufferId,
    },
    /// Bind a texture (or unbind) on a unit.
    BindTexture {
        /// Texture unit.
        unit: u32,
        /// Texture target.
        target: TextureTarget,
        /// Texture to bind; `None` unbinds.
        texture: Option<TextureId>,
    },
    /// Make a program current.
    UseProgram {
        /// Program to use.
        program: ProgramId,
    },
    /// Write a literal uniform value.
    SetUniform {
        /// Uniform location.
        location: UniformLocation,
        /// Value to write.
        value: UniformValue,
    },
    /// Write a uniform from a late-resolved frame parameter.
    SetUniformParameter {
        /// Uniform location.
        location: UniformLocation,
        /// Parameter to resolve at replay.
        parameter: ParameterId,
    },
    /// Bind a texture-valued frame parameter to a unit.
    BindParameterTexture {
        /// Texture unit.
        unit: u32,
        /// Texture target.
        target: TextureTarget,
        /// Parameter to resolve at replay.
        parameter: ParameterId,
    },
    /// Enable or disable a capability.
    SetCapability {
        /// Capability flag.
        capability: Capability,
        /// Desired state.
        enabled: bool,
    },
    /// Describe a vertex attribute in the bound vertex buffer.
    VertexAttribPointer {
        /// Attribute location.
        location: u32,
        /// Component count.
        components: u32,
        /// Normalization flag.
        normalized: bool,
        /// Vertex stride in bytes.
        stride: u32,
        /// Byte offset of the attribute within the buffer.
        byte_offset: usize,
    },
    /// Enable a vertex attribute array.
    EnableVertexAttrib {
        /// Attribute location.
        location: u32,
    },
    /// Disable a vertex attribute array.
    DisableVertexAttrib {
        /// Attribute location.
        location: u32,
    },
    /// Indexed draw call.
    DrawElements {
        /// Primitive assembly mode.
        mode: PrimitiveMode,
        /// Index element count.
        count: u32,
        /// Index width.
        format: IndexFormat,
        /// Byte offset of the first index.
        byte_offset: usize,
    },
    /// Copy the current color target into the capture texture.
    CaptureFrame,
    /// Switch rendering to a fresh overlay target.
    BeginOverlayTarget,
    /// Compose the captured frame into the current target.
    ComposeCapturedFrame,
}

/// Records, deduplicates and replays GPU state transitions and draw calls.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    parameters: HashMap<ParameterId, ParameterValue>,
    // Shadow of last-known GPU state; survives clear_commands because the
    // GPU retains state between frames.
    bound_textures: HashMap<u32, Option<TextureId>>,
    bound_buffers: HashMap<BufferTarget, BufferId>,
    capabilities: HashMap<Capability, bool>,
    suppressed: u64,
    coalesced: u64,
}

impl CommandBuffer {
    /// Create an empty command buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded commands, in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands currently recorded.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of recorded draw calls (after coalescing).
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawElements { .. }))
            .count()
    }

    /// Pushes dropped by redundant-state elimination since the last
    /// [`clear_commands`](Self::clear_commands).
    pub fn suppressed_count(&self) -> u64 {
        self.suppressed
    }

    /// Draw requests merged into a preceding draw since the last
    /// [`clear_commands`](Self::clear_commands).
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    /// Drop all recorded commands, keeping the GPU state shadow and the
    /// frame parameters. Call once per frame before re-recording.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
        self.suppressed = 0;
        self.coalesced = 0;
    }

    /// Forget the last-known GPU state, forcing every subsequent bind to be
    /// recorded. For context loss, not per-frame use.
    pub fn reset_state(&mut self) {
        self.bound_textures.clear();
        self.bound_buffers.clear();
        self.capabilities.clear();
    }

    // ------------------------------------------------------------------
    // Frame parameters
    // ------------------------------------------------------------------

    /// Set the current value of a frame parameter.
    pub fn set_parameter(&mut self, parameter: ParameterId, value: ParameterValue) {
        self.parameters.insert(parameter, value);
    }

    /// Current value of a frame parameter, if set.
    pub fn parameter(&self, parameter: ParameterId) -> Option<&ParameterValue> {
        self.parameters.get(&parameter)
    }

    // ------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------

    /// Record binding a buffer; suppressed if already bound to the target.
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferId) {
        if self.bound_buffers.get(&target) == Some(&buffer) {
            self.suppressed += 1;
            return;
        }
        self.bound_buffers.insert(target, buffer);
        self.commands.push(Command::BindBuffer { target, buffer });
    }

    /// Record binding a texture; suppressed if the unit already holds it.
    pub fn bind_texture(&mut self, unit: u32, target: TextureTarget, texture: Option<TextureId>) {
        if self.bound_textures.get(&unit) == Some(&texture) {
            self.suppressed += 1;
            return;
        }
        self.bound_textures.insert(unit, texture);
        self.commands.push(Command::BindTexture {
            unit,
            target,
            texture,
        });
    }

    /// Record a capability toggle; suppressed if already in that state.
    pub fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if self.capabilities.get(&capability) == Some(&enabled) {
            self.suppressed += 1;
            return;
        }
        self.capabilities.insert(capability, enabled);
        self.commands.push(Command::SetCapability {
            capability,
            enabled,
        });
    }

    /// Record making a program current.
    ///
    /// Program switches are not shadowed here: the draw list already tracks
    /// the last program and only requests a switch on change.
    pub fn use_program(&mut self, program: ProgramId) {
        self.commands.push(Command::UseProgram { program });
    }

    /// Record a literal uniform write.
    pub fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.commands.push(Command::SetUniform { location, value });
    }

    /// Record a uniform write resolved from a frame parameter at replay.
    pub fn set_uniform_parameter(&mut self, location: UniformLocation, parameter: ParameterId) {
        self.commands.push(Command::SetUniformParameter {
            location,
            parameter,
        });
    }

    /// Record binding a texture-valued frame parameter to a unit.
    ///
    /// The unit's shadow entry is invalidated since the bound texture is
    /// unknown until replay.
    pub fn bind_parameter_texture(
        &mut self,
        unit: u32,
        target: TextureTarget,
        parameter: ParameterId,
    ) {
        self.bound_textures.remove(&unit);
        self.commands.push(Command::BindParameterTexture {
            unit,
            target,
            parameter,
        });
    }

    /// Record a vertex attribute pointer.
    pub fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        components: u32,
        normalized: bool,
        stride: u32,
        byte_offset: usize,
    ) {
        self.commands.push(Command::VertexAttribPointer {
            location,
            components,
            normalized,
            stride,
            byte_offset,
        });
    }

    /// Record enabling a vertex attribute array.
    pub fn enable_vertex_attrib(&mut self, location: u32) {
        self.commands.push(Command::EnableVertexAttrib { location });
    }

    /// Record disabling a vertex attribute array.
    pub fn disable_vertex_attrib(&mut self, location: u32) {
        self.commands.push(Command::DisableVertexAttrib { location });
    }

    /// Record an indexed draw call, merging into the previous record when
    /// it continues the same contiguous index range.
    ///
    /// The merge inspects only the most recently pushed command. After the
    /// draw-list sort, adjacent handles from the same buffer with identical
    /// material and transform arrive here with contiguous ranges, and the
    /// whole run collapses into one GPU draw call.
    pub fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        format: IndexFormat,
        byte_offset: usize,
    ) {
        if let Some(Command::DrawElements {
            mode: last_mode,
            count: last_count,
            format: last_format,
            byte_offset: last_offset,
        }) = self.commands.last_mut()
        {
            if *last_mode == mode
                && *last_format == format
                && *last_offset + *last_count as usize * format.size() == byte_offset
            {
                *last_count += count;
                self.coalesced += 1;
                return;
            }
        }
        self.commands.push(Command::DrawElements {
            mode,
            count,
            format,
            byte_offset,
        });
    }

    /// Record the opaque-capture bracket for refracting materials.
    pub fn capture_opaque_bracket(&mut self) {
        self.commands.push(Command::CaptureFrame);
        self.commands.push(Command::BeginOverlayTarget);
        self.commands.push(Command::ComposeCapturedFrame);
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Execute every recorded command against the context, strictly in
    /// insertion order.
    ///
    /// Replay does not mutate the recorded data: running twice without an
    /// intervening [`clear_commands`](Self::clear_commands) executes the
    /// identical sequence twice.
    pub fn run(&self, ctx: &mut dyn GraphicsContext) {
        log::trace!("CommandBuffer: replaying {} commands", self.commands.len());
        for command in &self.commands {
            match command {
                Command::BindBuffer { target, buffer } => ctx.bind_buffer(*target, *buffer),
                Command::BindTexture {
                    unit,
                    target,
                    texture,
                } => ctx.bind_texture(*unit, *target, *texture),
                Command::UseProgram { program } => ctx.use_program(*program),
                Command::SetUniform { location, value } => ctx.set_uniform(*location, value),
                Command::SetUniformParameter {
                    location,
                    parameter,
                } => match self.parameters.get(parameter) {
                    Some(ParameterValue::Floats(values)) => {
                        ctx.set_uniform(*location, &UniformValue::Floats(values.clone()));
                    }
                    Some(ParameterValue::Texture(_)) => {
                        log::warn!(
                            "CommandBuffer: parameter {:?} holds a texture; use bind_parameter_texture",
                            parameter
                        );
                    }
                    None => {
                        log::debug!(
                            "CommandBuffer: parameter {:?} unset, uniform left unchanged",
                            parameter
                        );
                    }
                },
                Command::BindParameterTexture {
                    unit,
                    target,
                    parameter,
                } => match self.parameters.get(parameter) {
                    Some(ParameterValue::Texture(texture)) => {
                        ctx.bind_texture(*unit, *target, Some(*texture));
                    }
                    Some(ParameterValue::Floats(_)) | None => {
                        log::debug!(
                            "CommandBuffer: texture parameter {:?} unset, unit {} left unchanged",
                            parameter,
                            unit
                        );
                    }
                },
                Command::SetCapability {
                    capability,
                    enabled,
                } => ctx.set_capability(*capability, *enabled),
                Command::VertexAttribPointer {
                    location,
                    components,
                    normalized,
                    stride,
                    byte_offset,
                } => ctx.vertex_attrib_pointer(
                    *location,
                    *components,
                    *normalized,
                    *stride,
                    *byte_offset,
                ),
                Command::EnableVertexAttrib { location } => ctx.enable_vertex_attrib(*location),
                Command::DisableVertexAttrib { location } => ctx.disable_vertex_attrib(*location),
                Command::DrawElements {
                    mode,
                    count,
                    format,
                    byte_offset,
                } => ctx.draw_elements(*mode, *count, *format, *byte_offset),
                Command::CaptureFrame => ctx.capture_frame(),
                Command::BeginOverlayTarget => ctx.begin_overlay_target(),
                Command::ComposeCapturedFrame => ctx.compose_captured_frame(),
            }
        }
    }
}

static_assertions::assert_impl_all!(CommandBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{GpuOp, NullContext};

    #[test]
    fn test_buffer_bind_dedup() {
        let mut cmd = CommandBuffer::new();
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(1));
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(1));
        cmd.bind_buffer(BufferTarget::Index, BufferId(1));
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(2));

        assert_eq!(cmd.len(), 3);
        assert_eq!(cmd.suppressed_count(), 1);
    }

    #[test]
    fn test_texture_bind_dedup_per_unit() {
        let mut cmd = CommandBuffer::new();
        let tex = Some(TextureId(5));
        cmd.bind_texture(0, TextureTarget::D2, tex);
        cmd.bind_texture(0, TextureTarget::D2, tex);
        cmd.bind_texture(1, TextureTarget::D2, tex);
        cmd.bind_texture(0, TextureTarget::D2, None);

        assert_eq!(cmd.len(), 3);
        assert_eq!(cmd.suppressed_count(), 1);
    }

    #[test]
    fn test_capability_dedup() {
        let mut cmd = CommandBuffer::new();
        cmd.set_capability(Capability::Blend, true);
        cmd.set_capability(Capability::Blend, true);
        cmd.set_capability(Capability::Blend, false);
        cmd.set_capability(Capability::DepthTest, true);

        assert_eq!(cmd.len(), 3);
        assert_eq!(cmd.suppressed_count(), 1);
    }

    #[test]
    fn test_shadow_state_survives_clear() {
        let mut cmd = CommandBuffer::new();
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(1));
        cmd.clear_commands();

        // GPU still has buffer 1 bound; rebinding it is a no-op.
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(1));
        assert!(cmd.is_empty());

        cmd.reset_state();
        cmd.bind_buffer(BufferTarget::Vertex, BufferId(1));
        assert_eq!(cmd.len(), 1);
    }

    #[test]
    fn test_draw_coalescing_contiguous_ranges() {
        let mut cmd = CommandBuffer::new();
        // [0,10), [10,10), [20,10): contiguous 16-bit ranges.
        for i in 0..3u32 {
            cmd.draw_elements(
                PrimitiveMode::Triangles,
                10,
                IndexFormat::U16,
                i as usize * 10 * 2,
            );
        }

        assert_eq!(cmd.draw_call_count(), 1);
        assert_eq!(cmd.coalesced_count(), 2);
        assert_eq!(
            cmd.commands()[0],
            Command::DrawElements {
                mode: PrimitiveMode::Triangles,
                count: 30,
                format: IndexFormat::U16,
                byte_offset: 0,
            }
        );
    }

    #[test]
    fn test_draw_coalescing_requires_contiguity_and_mode() {
        let mut cmd = CommandBuffer::new();
        cmd.draw_elements(PrimitiveMode::Triangles, 10, IndexFormat::U16, 0);
        // Gap in the range.
        cmd.draw_elements(PrimitiveMode::Triangles, 10, IndexFormat::U16, 100);
        // Contiguous but different mode.
        cmd.draw_elements(PrimitiveMode::Lines, 10, IndexFormat::U16, 120);

        assert_eq!(cmd.draw_call_count(), 3);
    }

    #[test]
    fn test_draw_coalescing_is_local() {
        let mut cmd = CommandBuffer::new();
        cmd.draw_elements(PrimitiveMode::Triangles, 10, IndexFormat::U16, 0);
        cmd.set_capability(Capability::Blend, true);
        // Contiguous with the first draw, but a command intervened: the
        // greedy check only sees the last record, so no merge.
        cmd.draw_elements(PrimitiveMode::Triangles, 10, IndexFormat::U16, 20);

        assert_eq!(cmd.draw_call_count(), 2);
        assert_eq!(cmd.coalesced_count(), 0);
    }

    #[test]
    fn test_uniform_parameter_resolved_at_replay() {
        let mut cmd = CommandBuffer::new();
        cmd.set_uniform_parameter(UniformLocation(3), ParameterId::TIME);

        // Value set after recording: replay must see it.
        cmd.set_parameter(ParameterId::TIME, ParameterValue::Floats(vec![42.0]));

        let mut ctx = NullContext::new();
        cmd.run(&mut ctx);
        assert_eq!(
            ctx.ops()[0],
            GpuOp::SetUniform(UniformLocation(3), UniformValue::Floats(vec![42.0]))
        );
    }

    #[test]
    fn test_unset_parameter_is_skipped() {
        let mut cmd = CommandBuffer::new();
        cmd.set_uniform_parameter(UniformLocation(0), ParameterId::FOG_COLOR);
        cmd.bind_parameter_texture(2, TextureTarget::D2, ParameterId::CAPTURED_FRAME);

        let mut ctx = NullContext::new();
        cmd.run(&mut ctx);
        assert!(ctx.ops().is_empty());
    }

    #[test]
    fn test_texture_parameter_binding() {
        let mut cmd = CommandBuffer::new();
        cmd.set_parameter(
            ParameterId::CAPTURED_FRAME,
            ParameterValue::Texture(TextureId(9)),
        );
        cmd.bind_parameter_texture(2, TextureTarget::D2, ParameterId::CAPTURED_FRAME);

        let mut ctx = NullContext::new();
        cmd.run(&mut ctx);
        assert_eq!(
            ctx.ops()[0],
            GpuOp::BindTexture(2, TextureTarget::D2, Some(TextureId(9)))
        );
    }

    #[test]
    fn test_replay_is_idempotent() {
        let mut cmd = CommandBuffer::new();
        cmd.use_program(ProgramId(1));
        cmd.draw_elements(PrimitiveMode::Triangles, 6, IndexFormat::U16, 0);
        let recorded: Vec<Command> = cmd.commands().to_vec();

        let mut ctx = NullContext::new();
        cmd.run(&mut ctx);
        cmd.run(&mut ctx);

        assert_eq!(ctx.ops().len(), 4);
        assert_eq!(ctx.ops()[..2], ctx.ops()[2..]);
        assert_eq!(cmd.commands(), recorded.as_slice());
    }

    #[test]
    fn test_capture_bracket_order() {
        let mut cmd = CommandBuffer::new();
        cmd.capture_opaque_bracket();
        assert_eq!(
            cmd.commands(),
            &[
                Command::CaptureFrame,
                Command::BeginOverlayTarget,
                Command::ComposeCapturedFrame,
            ]
        );
    }
}
