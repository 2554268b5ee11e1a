//! Draw lists and their items: membership, lazy rebuilds, and the
//! state-minimizing submission walk.

pub mod item;
pub mod list;

pub use item::{DrawListItem, ItemId, ItemStore};
pub use list::{DrawList, DrawListId, DrawLists, ListStats};
