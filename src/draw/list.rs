//! Draw lists: sorted, cached render batches.
//!
//! A [`DrawList`] holds item memberships and a cached, sorted pair of
//! handle buckets (opaque, translucent). The cache is rebuilt lazily: any
//! membership change or item edit marks the list invalid, and the next
//! render rebuilds it once. Rendering walks the sorted buckets and records
//! only the state transitions that actually change between consecutive
//! handles, so a well-sorted list costs far fewer GPU calls than it has
//! handles.

use std::sync::Arc;

use crate::command::CommandBuffer;
use crate::draw::item::{ItemId, ItemStore};
use crate::material::{MaterialId, MaterialStore, ShaderKey, ShaderRegistry};
use crate::mesh::layout::VertexLayout;
use crate::mesh::{GeometryBufferId, GeometryPool, MeshHandle};
use crate::transform::{TransformId, TransformStore};
use crate::types::Capability;

/// Identifier of a [`DrawList`] within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawListId(pub u32);

/// Counts from the last rebuild of a draw list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    /// Handles in the opaque bucket.
    pub opaque: usize,
    /// Handles in the translucent bucket.
    pub translucent: usize,
    /// Handles dropped by filtering (no material, disabled, uncompiled
    /// program, empty range).
    pub filtered: usize,
}

/// A cached, sorted batch of drawable handles.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<ItemId>,
    opaque: Vec<MeshHandle>,
    translucent: Vec<MeshHandle>,
    invalid: bool,
    has_refraction: bool,
    stats: ListStats,
}

impl DrawList {
    /// Whether the cached buckets are stale.
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Whether any translucent handle samples the captured opaque frame.
    pub fn has_refraction(&self) -> bool {
        self.has_refraction
    }

    /// Counts from the last rebuild.
    pub fn stats(&self) -> ListStats {
        self.stats
    }

    /// Items currently in this list.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    /// The sorted opaque bucket, as of the last rebuild.
    pub fn opaque_handles(&self) -> &[MeshHandle] {
        &self.opaque
    }

    /// The sorted translucent bucket, as of the last rebuild.
    pub fn translucent_handles(&self) -> &[MeshHandle] {
        &self.translucent
    }
}

/// Arena of draw lists, indexed by [`DrawListId`].
#[derive(Debug, Default)]
pub struct DrawLists {
    lists: Vec<DrawList>,
}

impl DrawLists {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty draw list.
    pub fn create_list(&mut self) -> DrawListId {
        let id = DrawListId(self.lists.len() as u32);
        self.lists.push(DrawList {
            invalid: true,
            ..DrawList::default()
        });
        id
    }

    /// Look up a list.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get(&self, id: DrawListId) -> &DrawList {
        &self.lists[id.0 as usize]
    }

    fn get_mut(&mut self, id: DrawListId) -> &mut DrawList {
        &mut self.lists[id.0 as usize]
    }

    /// Add an item to a list, invalidating the list's cache.
    ///
    /// # Panics
    ///
    /// Panics if the item is already in the list.
    pub fn add_item(&mut self, list: DrawListId, item: ItemId, items: &mut ItemStore) {
        items.get_mut(item).join(list);
        let entry = self.get_mut(list);
        entry.items.push(item);
        entry.invalid = true;
    }

    /// Remove an item from a list, invalidating the list's cache.
    ///
    /// # Panics
    ///
    /// Panics if the item is not in the list.
    pub fn remove_item(&mut self, list: DrawListId, item: ItemId, items: &mut ItemStore) {
        items.get_mut(item).leave(list);
        let entry = self.get_mut(list);
        let position = entry
            .items
            .iter()
            .position(|i| *i == item)
            .unwrap_or_else(|| panic!("item {:?} not in draw list {:?}", item, list));
        entry.items.swap_remove(position);
        entry.invalid = true;
    }

    /// Mark a list's cache stale. Called when a member item's handles
    /// change.
    pub fn invalidate(&mut self, list: DrawListId) {
        self.get_mut(list).invalid = true;
    }

    /// Number of lists created.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Whether no lists exist.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Rebuild a list's sorted buckets from its items.
    ///
    /// Handles are filtered (empty index range, missing or disabled
    /// material, uncompiled program), partitioned into opaque and
    /// translucent, and each bucket is sorted by
    /// [`MeshHandle::sort_key`]. A no-op when the list is not invalid.
    pub fn rebuild(
        &mut self,
        list: DrawListId,
        items: &ItemStore,
        materials: &MaterialStore,
        shaders: &ShaderRegistry,
    ) {
        let entry = &mut self.lists[list.0 as usize];
        if !entry.invalid {
            return;
        }

        entry.opaque.clear();
        entry.translucent.clear();
        let mut filtered = 0usize;

        for item in &entry.items {
            for handle in items.get(*item).handles() {
                let Some(material_id) = handle.material else {
                    filtered += 1;
                    continue;
                };
                let material = materials.get(material_id);
                if handle.index_count == 0
                    || !material.enabled
                    || !shaders.get(material.program()).is_compiled()
                {
                    filtered += 1;
                    continue;
                }
                if material.is_translucent() {
                    entry.translucent.push(*handle);
                } else {
                    entry.opaque.push(*handle);
                }
            }
        }

        entry
            .opaque
            .sort_by_cached_key(|h| h.sort_key(materials, shaders));
        entry
            .translucent
            .sort_by_cached_key(|h| h.sort_key(materials, shaders));
        entry.has_refraction = entry
            .translucent
            .iter()
            .any(|h| h.material.map_or(false, |m| materials.get(m).refracts()));
        entry.stats = ListStats {
            opaque: entry.opaque.len(),
            translucent: entry.translucent.len(),
            filtered,
        };
        entry.invalid = false;

        log::debug!(
            "DrawList {:?}: rebuilt, {} opaque / {} translucent / {} filtered",
            list,
            entry.stats.opaque,
            entry.stats.translucent,
            entry.stats.filtered
        );
    }

    /// Record the whole list into a command buffer with minimal state
    /// transitions.
    ///
    /// Opaque handles draw first with blending off. If any translucent
    /// handle refracts, the opaque result is captured and composed onto a
    /// fresh overlay target before the translucent walk begins. Between
    /// consecutive handles only the state that differs is re-recorded, in
    /// cascade order: program change forces material, transform and buffer
    /// state; the rest are compared independently.
    pub fn append_to_buffer(
        &self,
        list: DrawListId,
        cmd: &mut CommandBuffer,
        pool: &GeometryPool,
        materials: &MaterialStore,
        shaders: &ShaderRegistry,
        transforms: &mut TransformStore,
    ) {
        let entry = &self.lists[list.0 as usize];
        debug_assert!(!entry.invalid, "append_to_buffer on an invalid list");

        let mut walk = SubmissionState::default();

        cmd.set_capability(Capability::DepthTest, true);
        cmd.set_capability(Capability::Blend, false);
        for handle in &entry.opaque {
            walk.submit(handle, cmd, pool, materials, shaders, transforms);
        }

        if entry.translucent.is_empty() {
            return;
        }
        if entry.has_refraction {
            cmd.capture_opaque_bracket();
        }
        cmd.set_capability(Capability::Blend, true);
        for handle in &entry.translucent {
            walk.submit(handle, cmd, pool, materials, shaders, transforms);
        }
        cmd.set_capability(Capability::Blend, false);
    }
}

/// Last-recorded state during a submission walk.
///
/// `transform` is doubly optional: the outer `None` means "no previous
/// handle", the inner `None` means the previous handle had no transform
/// (identity).
#[derive(Default)]
struct SubmissionState {
    program: Option<ShaderKey>,
    material: Option<MaterialId>,
    transform: Option<Option<TransformId>>,
    buffer: Option<(GeometryBufferId, usize)>,
    layout: Option<Arc<VertexLayout>>,
}

impl SubmissionState {
    fn submit(
        &mut self,
        handle: &MeshHandle,
        cmd: &mut CommandBuffer,
        pool: &GeometryPool,
        materials: &MaterialStore,
        shaders: &ShaderRegistry,
        transforms: &mut TransformStore,
    ) {
        let material_id = handle
            .material
            .expect("unfiltered handle reached submission");
        let material = materials.get(material_id);
        let program_key = material.program();
        let program = shaders.get(program_key);
        let buffer = pool.buffer(handle.buffer);

        if self.program != Some(program_key) {
            program.buffer_setup(cmd);
            // New program invalidates everything recorded under the old
            // one.
            self.program = Some(program_key);
            self.material = None;
            self.transform = None;
            self.buffer = None;
        }

        if self.material != Some(material_id) {
            program.buffer_material(cmd, material);
            self.material = Some(material_id);
        }

        if self.transform != Some(handle.transform) {
            let elements = match handle.transform {
                Some(id) => transforms.get_mut(id).elements(),
                None => glam::Mat4::IDENTITY.to_cols_array(),
            };
            program.buffer_model_matrix(cmd, &elements);
            self.transform = Some(handle.transform);
        }

        if self.buffer != Some((handle.buffer, handle.vertex_offset)) {
            buffer.buffer_bind_buffers(cmd);
            match &self.layout {
                Some(previous) if Arc::ptr_eq(previous, buffer.layout()) => {}
                Some(previous) => {
                    program.buffer_disable_attributes(cmd, previous);
                    program.buffer_enable_attributes(cmd, buffer.layout());
                    self.layout = Some(Arc::clone(buffer.layout()));
                }
                None => {
                    program.buffer_enable_attributes(cmd, buffer.layout());
                    self.layout = Some(Arc::clone(buffer.layout()));
                }
            }
            buffer.buffer_attrib_pointers(cmd, handle.vertex_offset);
            self.buffer = Some((handle.buffer, handle.vertex_offset));
        }

        buffer.buffer_render_elements(cmd, handle);
    }
}

static_assertions::assert_impl_all!(DrawLists: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialProps, ShaderProgram};
    use crate::types::{PrimitiveMode, ProgramId};

    struct TestProgram;

    impl ShaderProgram for TestProgram {
        fn program_id(&self) -> ProgramId {
            ProgramId(1)
        }
        fn is_compiled(&self) -> bool {
            true
        }
        fn buffer_setup(&self, cmd: &mut CommandBuffer) {
            cmd.use_program(self.program_id());
        }
        fn buffer_material(&self, _cmd: &mut CommandBuffer, _material: &Material) {}
        fn buffer_model_matrix(&self, _cmd: &mut CommandBuffer, _matrix: &[f32; 16]) {}
    }

    fn handle(index_count: u32, material: MaterialId) -> MeshHandle {
        MeshHandle {
            buffer: crate::mesh::GeometryBufferId(0),
            vertex_offset: 0,
            mode: PrimitiveMode::Triangles,
            index_offset: 0,
            index_count,
            material: Some(material),
            transform: None,
        }
    }

    #[test]
    fn test_rebuild_is_stable_for_equal_sort_keys() {
        let mut shaders = ShaderRegistry::new();
        let program = shaders.register(TestProgram);
        let mut materials = MaterialStore::new();
        let material = materials.create(program, MaterialProps::Solid { color: [1.0; 4] });

        // Same buffer, offset, material and transform: identical sort keys.
        // Distinct index counts make the relative order observable.
        let mut items = ItemStore::new();
        let item = items.create_item(vec![
            handle(3, material),
            handle(6, material),
            handle(9, material),
        ]);

        let mut lists = DrawLists::new();
        let list = lists.create_list();
        lists.add_item(list, item, &mut items);

        lists.rebuild(list, &items, &materials, &shaders);
        let first: Vec<u32> = lists
            .get(list)
            .opaque_handles()
            .iter()
            .map(|h| h.index_count)
            .collect();
        // The stable sort keeps equal-key handles in submission order.
        assert_eq!(first, vec![3, 6, 9]);

        // Repeated invalidate/rebuild cycles must not reorder them.
        for _ in 0..2 {
            lists.invalidate(list);
            lists.rebuild(list, &items, &materials, &shaders);
            let again: Vec<u32> = lists
                .get(list)
                .opaque_handles()
                .iter()
                .map(|h| h.index_count)
                .collect();
            assert_eq!(first, again);
        }
    }
}
