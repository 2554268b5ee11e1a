//! Mesh storage: vertex layouts, CPU submissions, packed geometry buffers
//! and the handles that describe drawable sub-ranges.

pub mod data;
pub mod geometry_buffer;
pub mod handle;
pub mod layout;
pub mod pool;

pub use data::{MaterialRef, MeshData, MeshElement};
pub use geometry_buffer::GeometryBuffer;
pub use handle::{GeometryBufferId, HandleSortKey, MeshHandle};
pub use layout::{AttributeFormat, AttributeSemantic, VertexAttribute, VertexLayout};
pub use pool::GeometryPool;
