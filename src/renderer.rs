//! The scene renderer: owner of every render-side store and the per-frame
//! driver.
//!
//! [`SceneRenderer`] ties the pieces together: shader registry, material
//! and transform stores, items, draw lists, the geometry pool and one
//! shared command buffer. A frame is bracketed by
//! [`begin_frame`](SceneRenderer::begin_frame) and
//! [`end_frame`](SceneRenderer::end_frame); inside the bracket,
//! [`render`](SceneRenderer::render) rebuilds a draw list if needed,
//! records it into the command buffer and replays it against the context.
//!
//! # Example
//!
//! ```ignore
//! let mut ctx = NullContext::new();
//! let mut renderer = SceneRenderer::new(&ctx);
//! let program = renderer.register_program(SolidProgram::new(&mut ctx)?);
//! let material = renderer.create_material(program, MaterialProps::Solid {
//!     color: [1.0, 0.0, 0.0, 1.0],
//! });
//!
//! let handles = renderer.add_mesh(&mut ctx, &mesh, &[material])?;
//! let item = renderer.create_item(handles);
//! let list = renderer.create_list();
//! renderer.add_item_to_list(list, item);
//!
//! renderer.begin_frame();
//! let stats = renderer.render(list, &mut ctx);
//! renderer.end_frame();
//! ```

use crate::command::CommandBuffer;
use crate::context::GraphicsContext;
use crate::draw::{DrawListId, DrawLists, ItemId, ItemStore, ListStats};
use crate::error::RenderError;
use crate::material::{
    MaterialId, MaterialProps, MaterialStore, ShaderKey, ShaderProgram, ShaderRegistry,
};
use crate::mesh::{GeometryPool, MeshData, MeshHandle};
use crate::transform::{Transform, TransformId, TransformStore};
use crate::types::{ParameterId, ParameterValue};

/// Per-frame counters returned by [`SceneRenderer::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// GPU draw calls issued, after coalescing.
    pub draw_calls: usize,
    /// Commands recorded this render.
    pub commands_recorded: usize,
    /// Pushes dropped by redundant-state elimination.
    pub commands_suppressed: u64,
    /// Draw requests merged into a preceding draw.
    pub draws_coalesced: u64,
    /// Bucket sizes of the rendered list.
    pub list: ListStats,
}

/// Owner of all render-side state and the per-frame driver.
#[derive(Debug)]
pub struct SceneRenderer {
    shaders: ShaderRegistry,
    materials: MaterialStore,
    transforms: TransformStore,
    items: ItemStore,
    lists: DrawLists,
    pool: GeometryPool,
    commands: CommandBuffer,
    frame_count: u64,
    in_frame: bool,
}

impl SceneRenderer {
    /// Create a renderer for a context, choosing the widest index format
    /// the context supports.
    pub fn new(ctx: &dyn GraphicsContext) -> Self {
        log::info!("SceneRenderer: starting on context '{}'", ctx.name());
        Self {
            shaders: ShaderRegistry::new(),
            materials: MaterialStore::new(),
            transforms: TransformStore::new(),
            items: ItemStore::new(),
            lists: DrawLists::new(),
            pool: GeometryPool::for_context(ctx),
            commands: CommandBuffer::new(),
            frame_count: 0,
            in_frame: false,
        }
    }

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The geometry pool, for diagnostics.
    pub fn pool(&self) -> &GeometryPool {
        &self.pool
    }

    /// The material store.
    pub fn materials(&self) -> &MaterialStore {
        &self.materials
    }

    /// The material store, mutably. Edits to materials take effect on the
    /// next draw-list rebuild; disable a material, then
    /// [`invalidate_item`](Self::invalidate_item) on the items using it to
    /// hide their geometry.
    pub fn materials_mut(&mut self) -> &mut MaterialStore {
        &mut self.materials
    }

    /// The transform store.
    pub fn transforms(&self) -> &TransformStore {
        &self.transforms
    }

    /// The transform store, mutably. Moving a transform does not
    /// invalidate any list; the new matrix is picked up next render.
    pub fn transforms_mut(&mut self) -> &mut TransformStore {
        &mut self.transforms
    }

    /// Register a shader program singleton.
    pub fn register_program<P: ShaderProgram + 'static>(&mut self, program: P) -> ShaderKey {
        self.shaders.register(program)
    }

    /// Create a material drawing with `program`.
    pub fn create_material(&mut self, program: ShaderKey, props: MaterialProps) -> MaterialId {
        self.materials.create(program, props)
    }

    /// Add a transform to the store.
    pub fn create_transform(&mut self, transform: Transform) -> TransformId {
        self.transforms.create(transform)
    }

    /// Submit mesh data to the geometry pool.
    ///
    /// `slots` resolves loader-side material indices: element `i` of the
    /// slice is the material for [`MaterialRef::Index`]`(i)`. An index past
    /// the slice leaves the handle material-less.
    ///
    /// [`MaterialRef::Index`]: crate::mesh::MaterialRef::Index
    pub fn add_mesh(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        data: &MeshData,
        slots: &[MaterialId],
    ) -> Result<Vec<MeshHandle>, RenderError> {
        self.pool
            .add_mesh(ctx, data, |slot| slots.get(slot).copied())
    }

    /// Create a draw-list item from a set of handles.
    pub fn create_item(&mut self, handles: Vec<MeshHandle>) -> ItemId {
        self.items.create_item(handles)
    }

    /// Replace an item's handles, invalidating every list containing it.
    pub fn set_item_handles(&mut self, item: ItemId, handles: Vec<MeshHandle>) {
        self.items.set_handles(item, handles, &mut self.lists);
    }

    /// Whether an item is currently in at least one draw list.
    pub fn is_item_visible(&self, item: ItemId) -> bool {
        self.items.is_visible(item)
    }

    /// Invalidate every draw list containing an item.
    ///
    /// Needed after editing state the cached buckets depend on but that the
    /// stores cannot observe, such as toggling `enabled` on a material the
    /// item's handles use. A no-op for items in no list.
    pub fn invalidate_item(&mut self, item: ItemId) {
        self.items.invalidate(item, &mut self.lists);
    }

    /// Create an empty draw list.
    pub fn create_list(&mut self) -> DrawListId {
        self.lists.create_list()
    }

    /// Add an item to a draw list.
    ///
    /// # Panics
    ///
    /// Panics if the item is already in the list.
    pub fn add_item_to_list(&mut self, list: DrawListId, item: ItemId) {
        self.lists.add_item(list, item, &mut self.items);
    }

    /// Remove an item from a draw list.
    ///
    /// # Panics
    ///
    /// Panics if the item is not in the list.
    pub fn remove_item_from_list(&mut self, list: DrawListId, item: ItemId) {
        self.lists.remove_item(list, item, &mut self.items);
    }

    /// Set a frame parameter (camera matrix, fog, time, captured frame).
    /// Programs that declared interest pick up the current value at
    /// replay.
    pub fn set_parameter(&mut self, parameter: ParameterId, value: ParameterValue) {
        self.commands.set_parameter(parameter, value);
    }

    /// Start a frame.
    pub fn begin_frame(&mut self) {
        debug_assert!(!self.in_frame, "begin_frame inside an open frame");
        self.in_frame = true;
    }

    /// Finish a frame.
    pub fn end_frame(&mut self) {
        debug_assert!(self.in_frame, "end_frame without begin_frame");
        self.in_frame = false;
        self.frame_count += 1;
    }

    /// Render one draw list: rebuild it if stale, record it with minimal
    /// state transitions, replay against the context.
    pub fn render(&mut self, list: DrawListId, ctx: &mut dyn GraphicsContext) -> FrameStats {
        debug_assert!(self.in_frame, "render outside a frame");

        self.lists
            .rebuild(list, &self.items, &self.materials, &self.shaders);

        let Self {
            shaders,
            materials,
            transforms,
            lists,
            pool,
            commands,
            ..
        } = self;

        commands.clear_commands();
        lists.append_to_buffer(list, commands, pool, materials, shaders, transforms);
        commands.run(ctx);

        let stats = FrameStats {
            draw_calls: commands.draw_call_count(),
            commands_recorded: commands.len(),
            commands_suppressed: commands.suppressed_count(),
            draws_coalesced: commands.coalesced_count(),
            list: lists.get(list).stats(),
        };
        log::trace!(
            "SceneRenderer: frame {} list {:?}: {} draw calls, {} commands",
            self.frame_count,
            list,
            stats.draw_calls,
            stats.commands_recorded
        );
        stats
    }

    /// Release every GPU resource. Engine teardown only.
    pub fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        debug_assert!(!self.in_frame, "dispose inside an open frame");
        self.pool.dispose(ctx);
    }
}

static_assertions::assert_impl_all!(SceneRenderer: Send, Sync);
