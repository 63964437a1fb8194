pub mod boundary;
pub mod extract;
pub mod tree;
pub mod layers;
pub mod params;
pub mod patch;
pub mod document;

use crate::codec::chunk::Tag;

/// Form type of the outermost group
pub const TERRAIN: Tag = Tag::new(b"PTAT");
pub const LAYER: Tag = Tag::new(b"LAYR");
/// Header group holding a flag and a display name
pub const HEADER: Tag = Tag::new(b"IHDR");

pub use boundary::{Boundary, BoundaryKind, Shape, Vertex, VertexLayout};
pub use document::{ParsedTerrain, TerrainDocument, parse_terrain};
pub use layers::{LayerEntry, index_layers};
pub use params::{FloraParams, FloraTier, ParamsSource, TerrainParams};
pub use patch::EditOutcome;
pub use tree::{FieldValue, NodeFlags, NodeId, PayloadBag, TerrainTree, TreeNode};
