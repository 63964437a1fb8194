use crc32fast::Hasher;

use super::boundary::Boundary;
use super::extract::RecordExtractor;
use super::layers::{index_layers, LayerEntry};
use super::params::{decode_params, TerrainParams};
use super::patch::{self, EditOutcome};
use super::tree::{TerrainTree, TreeBuilder};
use super::TERRAIN;
use crate::codec::chunk::ChunkHeader;
use crate::codec::walk::{read_root, Walker};
use crate::config::ParseOptions;
use crate::error::{Error, Result};

/// Everything one parse pass produces
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTerrain {
    pub root: ChunkHeader,
    pub boundaries: Vec<Boundary>,
    pub tree: TerrainTree,
    pub layers: Vec<LayerEntry>,
    pub params: TerrainParams,
}

/// Parse a terrain buffer. Only a wrong outer header is an error; anything
/// damaged further in is logged and decoded as zeros or defaults.
pub fn parse_terrain(data: &[u8], options: &ParseOptions) -> Result<ParsedTerrain> {
    let root = read_root(data, TERRAIN)?;

    let mut extractor = RecordExtractor::new(options);
    let mut builder = TreeBuilder::new(options);
    Walker::new(data)
        .with_max_depth(options.max_depth)
        .walk_chunk(0, data.len(), 0, &mut (&mut extractor, &mut builder));

    let tree = builder.finish().ok_or_else(|| Error::NotIff {
        found: root.tag.to_string(),
    })?;
    let boundaries = extractor.finish();
    let layers = index_layers(&tree.root);
    let params = decode_params(data, &root);

    tracing::debug!(
        boundaries = boundaries.len(),
        nodes = tree.node_count,
        layers = layers.len(),
        resync_bytes = tree.resync_bytes,
        "parsed terrain"
    );
    Ok(ParsedTerrain { root, boundaries, tree, layers, params })
}

/// A terrain buffer together with its parsed view.
///
/// Edits write through to both. Callers serialize edits: one `apply_edit`
/// finishes before the next begins.
#[derive(Debug, Clone)]
pub struct TerrainDocument {
    data: Vec<u8>,
    options: ParseOptions,
    parsed: ParsedTerrain,
    modified: bool,
}

impl TerrainDocument {
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        Self::parse_with(data, ParseOptions::default())
    }

    pub fn parse_with(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let parsed = parse_terrain(&data, &options)?;
        Ok(Self { data, options, parsed, modified: false })
    }

    /// Rebuild every record, node and layer from the current bytes.
    /// Ids and indices from before are not carried over.
    pub fn reparse(&mut self) -> Result<()> {
        self.parsed = parse_terrain(&self.data, &self.options)?;
        Ok(())
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parsed(&self) -> &ParsedTerrain {
        &self.parsed
    }

    pub fn boundaries(&self) -> &[Boundary] {
        &self.parsed.boundaries
    }

    pub fn boundary(&self, index: usize) -> Option<&Boundary> {
        self.parsed.boundaries.get(index)
    }

    pub fn tree(&self) -> &TerrainTree {
        &self.parsed.tree
    }

    /// Mutable tree access for validators attaching diagnostics
    pub fn tree_mut(&mut self) -> &mut TerrainTree {
        &mut self.parsed.tree
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.parsed.layers
    }

    pub fn params(&self) -> &TerrainParams {
        &self.parsed.params
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Call once the host has persisted the bytes.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// CRC-32 of the live buffer
    pub fn checksum(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&self.data);
        hasher.finalize()
    }

    pub fn apply_edit(&mut self, index: usize, field: &str, value: f64) -> Result<EditOutcome> {
        let outcome = patch::apply_edit(
            &mut self.data,
            &mut self.parsed.boundaries,
            index,
            field,
            value,
            &self.options,
        )?;
        self.refresh_node(&outcome);
        self.modified = true;
        Ok(outcome)
    }

    /// Undo an edit returned by [`apply_edit`](Self::apply_edit).
    pub fn revert_edit(&mut self, outcome: &EditOutcome) -> Result<()> {
        patch::revert_edit(
            &mut self.data,
            &mut self.parsed.boundaries,
            outcome,
            &self.options,
        )?;
        self.refresh_node(outcome);
        self.modified = true;
        Ok(())
    }

    fn refresh_node(&mut self, outcome: &EditOutcome) {
        let Some(record) = self.parsed.boundaries.get(outcome.index) else { return };
        match self.parsed.tree.find_by_offset_mut(outcome.data_chunk) {
            Some(node) => node.payload = Some(record.data().to_fields()),
            None => tracing::warn!(offset = outcome.data_chunk, "no tree node for patched chunk"),
        }
    }
}
