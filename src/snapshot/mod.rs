//! Scene snapshot companion files: object placements for a terrain.

pub mod placement;

pub use placement::{
    extract_placements, parse_name_table, parse_snapshot, Orientation, Placement,
    PlacementCategory, Position, Snapshot,
};
