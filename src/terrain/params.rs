use serde::Serialize;

use crate::codec::chunk::{ChunkHeader, Tag};
use crate::codec::reader::ChunkReader;
use crate::error::Result;

/// Longest string field in the header record
const MAX_STRING_LEN: usize = 256;

/// Decoration placement tiers, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FloraTier {
    Collidable,
    NonCollidable,
    Radial,
    FarRadial,
    SuperFarRadial,
}

impl FloraTier {
    pub const ALL: [Self; 5] = [
        Self::Collidable,
        Self::NonCollidable,
        Self::Radial,
        Self::FarRadial,
        Self::SuperFarRadial,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FloraParams {
    pub tier: FloraTier,
    pub min_distance: f32,
    pub max_distance: f32,
    pub tile_size: f32,
    pub tile_border: f32,
    pub seed: u32,
}

impl FloraParams {
    fn default_for(tier: FloraTier) -> Self {
        let (min_distance, max_distance, tile_size) = match tier {
            FloraTier::Collidable => (0.0, 32.0, 8.0),
            FloraTier::NonCollidable => (0.0, 32.0, 8.0),
            FloraTier::Radial => (0.0, 64.0, 16.0),
            FloraTier::FarRadial => (64.0, 256.0, 32.0),
            FloraTier::SuperFarRadial => (256.0, 1024.0, 64.0),
        };
        Self {
            tier,
            min_distance,
            max_distance,
            tile_size,
            tile_border: 2.0,
            seed: 0,
        }
    }

    fn read(reader: &mut ChunkReader, tier: FloraTier) -> Result<Self> {
        Ok(Self {
            tier,
            min_distance: reader.read_f32_le()?,
            max_distance: reader.read_f32_le()?,
            tile_size: reader.read_f32_le()?,
            tile_border: reader.read_f32_le()?,
            seed: reader.read_u32_le()?,
        })
    }
}

/// Where a [`TerrainParams`] came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamsSource {
    Decoded,
    Default,
}

/// Global terrain settings from the header record.
///
/// Defaults (used whenever the header record is missing or unreadable):
/// empty file name, 16384 m map, 8 m chunks, 4 tiles per chunk, water table off
/// at height 0 with a 2 m shader and no shader name, 3600 s environment cycle,
/// and per-tier flora distances as in [`FloraParams`] with seed 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainParams {
    pub file_name: String,
    pub map_size: f32,
    pub chunk_width: f32,
    pub tiles_per_chunk: u32,
    pub use_global_water_table: bool,
    pub global_water_table_height: f32,
    pub water_shader_size: f32,
    pub water_shader_name: String,
    pub environment_cycle_time: f32,
    pub flora: [FloraParams; 5],
    pub source: ParamsSource,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            map_size: 16384.0,
            chunk_width: 8.0,
            tiles_per_chunk: 4,
            use_global_water_table: false,
            global_water_table_height: 0.0,
            water_shader_size: 2.0,
            water_shader_name: String::new(),
            environment_cycle_time: 3600.0,
            flora: FloraTier::ALL.map(FloraParams::default_for),
            source: ParamsSource::Default,
        }
    }
}

impl TerrainParams {
    pub fn flora(&self, tier: FloraTier) -> &FloraParams {
        &self.flora[tier as usize]
    }

    pub fn read(reader: &mut ChunkReader) -> Result<Self> {
        let file_name = reader.read_cstring(MAX_STRING_LEN)?;
        let map_size = reader.read_f32_le()?;
        let chunk_width = reader.read_f32_le()?;
        let tiles_per_chunk = reader.read_u32_le()?;
        let use_global_water_table = reader.read_bool32()?;
        let global_water_table_height = reader.read_f32_le()?;
        let water_shader_size = reader.read_f32_le()?;
        let water_shader_name = reader.read_cstring(MAX_STRING_LEN)?;
        let environment_cycle_time = reader.read_f32_le()?;

        let mut flora = FloraTier::ALL.map(FloraParams::default_for);
        for (slot, tier) in flora.iter_mut().zip(FloraTier::ALL) {
            *slot = FloraParams::read(reader, tier)?;
        }

        Ok(Self {
            file_name,
            map_size,
            chunk_width,
            tiles_per_chunk,
            use_global_water_table,
            global_water_table_height,
            water_shader_size,
            water_shader_name,
            environment_cycle_time,
            flora,
            source: ParamsSource::Decoded,
        })
    }
}

/// The header record: first `DATA` directly inside the root's first child group.
pub fn locate_params_chunk(data: &[u8], root: &ChunkHeader) -> Option<ChunkHeader> {
    let first = ChunkHeader::read(data, root.body_start(), root.end).ok()?;
    if !first.is_form() {
        return None;
    }
    let mut pos = first.body_start();
    while pos + 8 <= first.end {
        let child = ChunkHeader::read(data, pos, first.end).ok()?;
        if child.tag == Tag::DATA {
            return Some(child);
        }
        pos = child.end;
    }
    None
}

/// Decode the global settings, substituting defaults when anything is off.
pub fn decode_params(data: &[u8], root: &ChunkHeader) -> TerrainParams {
    let Some(chunk) = locate_params_chunk(data, root) else {
        tracing::warn!("terrain header record not found, using default parameters");
        return TerrainParams::default();
    };
    let mut reader = ChunkReader::bounded(data, chunk.body_start(), chunk.end);
    match TerrainParams::read(&mut reader) {
        Ok(params) => params,
        Err(e) => {
            tracing::warn!(
                offset = chunk.offset,
                error = %e,
                "terrain header record unreadable, using default parameters"
            );
            TerrainParams::default()
        }
    }
}
