//! Terrain Editor Core
//!
//! Parsing and in-place editing for chunked terrain files: boundary records,
//! a lossless chunk tree, the layer hierarchy, global parameters, and the scene
//! placements stored in a terrain's companion snapshot.

pub mod codec;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod terrain;

pub use error::{Error, Result};
pub use codec::{ChunkHeader, ChunkReader, ChunkVisitor, ChunkWriter, Tag, Walker};
pub use config::{LayoutPreference, ParseOptions, PlacementFilter};
pub use snapshot::{parse_snapshot, Placement, PlacementCategory, Snapshot};
pub use terrain::{
    parse_terrain, Boundary, BoundaryKind, EditOutcome, LayerEntry, NodeFlags, NodeId,
    ParsedTerrain, Shape, TerrainDocument, TerrainParams, TerrainTree, TreeNode, Vertex,
    VertexLayout,
};
