//! Draw-list items: the unit of membership in a draw list.
//!
//! An item owns a set of [`MeshHandle`]s (one object, possibly many
//! elements and placements) and remembers which draw lists it belongs to.
//! The membership records are how handle edits reach the lists: replacing
//! an item's handles invalidates exactly the lists containing it, and an
//! item in no list can be edited for free.

use crate::draw::list::{DrawListId, DrawLists};
use crate::mesh::MeshHandle;

/// Identifier of a [`DrawListItem`] within its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemId(pub u32);

/// A renderable object: a set of mesh handles plus list memberships.
#[derive(Debug, Default)]
pub struct DrawListItem {
    handles: Vec<MeshHandle>,
    lists: Vec<DrawListId>,
}

impl DrawListItem {
    /// The item's current handles.
    pub fn handles(&self) -> &[MeshHandle] {
        &self.handles
    }

    /// Lists this item currently belongs to.
    pub fn lists(&self) -> &[DrawListId] {
        &self.lists
    }

    pub(crate) fn join(&mut self, list: DrawListId) {
        assert!(
            !self.lists.contains(&list),
            "item added to draw list {:?} twice",
            list
        );
        self.lists.push(list);
    }

    pub(crate) fn leave(&mut self, list: DrawListId) {
        let position = self
            .lists
            .iter()
            .position(|l| *l == list)
            .unwrap_or_else(|| panic!("item removed from draw list {:?} it is not in", list));
        self.lists.swap_remove(position);
    }
}

/// Arena of draw-list items, indexed by [`ItemId`].
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<DrawListItem>,
}

impl ItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an item with an initial set of handles.
    pub fn create_item(&mut self, handles: Vec<MeshHandle>) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        self.items.push(DrawListItem {
            handles,
            lists: Vec::new(),
        });
        id
    }

    /// Look up an item.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this store.
    pub fn get(&self, id: ItemId) -> &DrawListItem {
        &self.items[id.0 as usize]
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> &mut DrawListItem {
        &mut self.items[id.0 as usize]
    }

    /// Replace an item's handles, invalidating every list containing it.
    ///
    /// An item in no list is updated without invalidating anything.
    pub fn set_handles(&mut self, id: ItemId, handles: Vec<MeshHandle>, lists: &mut DrawLists) {
        let item = &mut self.items[id.0 as usize];
        item.handles = handles;
        for list in &item.lists {
            lists.invalidate(*list);
        }
    }

    /// Mark every list containing an item stale without touching its
    /// handles.
    ///
    /// Call after editing state the cached buckets were filtered or sorted
    /// by, such as enabling or disabling a material one of the item's
    /// handles uses. A no-op for items in no list.
    pub fn invalidate(&self, id: ItemId, lists: &mut DrawLists) {
        for list in &self.items[id.0 as usize].lists {
            lists.invalidate(*list);
        }
    }

    /// Whether the item is currently in at least one draw list.
    pub fn is_visible(&self, id: ItemId) -> bool {
        !self.items[id.0 as usize].lists.is_empty()
    }

    /// Number of items created.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items exist.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
