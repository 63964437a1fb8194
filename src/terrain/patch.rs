//! Fixed-size field writes into a live terrain buffer.
//!
//! A record is addressed only by its group offset and kind. Each write walks the
//! group again to find its data chunk, so nothing here holds on to the tree.

use serde::Serialize;

use super::boundary::{Boundary, BoundaryData, BoundaryKind};
use super::extract::RecordExtractor;
use crate::codec::chunk::ChunkHeader;
use crate::codec::walk::Walker;
use crate::codec::writer::patch_bytes_at;
use crate::config::{LayoutPreference, ParseOptions};
use crate::error::{Error, Result};

/// Result of one accepted edit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOutcome {
    pub index: usize,
    pub field: &'static str,
    /// Offset of the rewritten 4 bytes within the buffer
    pub absolute_offset: usize,
    pub old_value: f64,
    pub new_value: f64,
    /// Offset of the data chunk holding the field
    pub data_chunk: usize,
    #[serde(skip)]
    pub(crate) old_bytes: [u8; 4],
}

/// Find the data chunk of the `kind` record whose group starts at `group_offset`,
/// using the same descent and size rules as extraction.
pub fn locate_data_chunk(
    data: &[u8],
    kind: BoundaryKind,
    group_offset: usize,
    options: &ParseOptions,
) -> Option<ChunkHeader> {
    let group = ChunkHeader::read(data, group_offset, data.len()).ok()?;
    if !group.is_form_of(kind.form_type()) {
        return None;
    }
    let mut extractor = RecordExtractor::new(options);
    Walker::new(data)
        .with_max_depth(options.max_depth)
        .walk_chunk(group_offset, data.len(), 0, &mut extractor)?;
    extractor.data_chunk_of(group_offset)
}

/// Overwrite one field of `records[index]` in `data` and refresh the record.
///
/// Either the 4 bytes are written and the record re-decoded, or nothing changes.
pub fn apply_edit(
    data: &mut [u8],
    records: &mut [Boundary],
    index: usize,
    field: &str,
    value: f64,
    options: &ParseOptions,
) -> Result<EditOutcome> {
    let record = records.get_mut(index).ok_or(Error::UnknownRecord(index))?;
    if record.malformed {
        return Err(Error::MalformedRecord(index));
    }
    let spec = record.field(field).ok_or_else(|| Error::UnsupportedField {
        kind: record.kind.as_str(),
        field: field.to_string(),
    })?;
    let bytes = spec.kind.encode(spec.name, value)?;

    let chunk = locate_data_chunk(data, record.kind, record.offset, options)
        .ok_or(Error::DataChunkNotFound { offset: record.offset })?;
    if spec.offset + 4 > chunk.body_len() {
        return Err(Error::DataChunkTooSmall {
            offset: chunk.offset,
            field: spec.name,
            need: spec.offset + 4,
            have: chunk.body_len(),
        });
    }

    let absolute_offset = chunk.body_start() + spec.offset;
    let mut old_bytes = [0u8; 4];
    old_bytes.copy_from_slice(&data[absolute_offset..absolute_offset + 4]);
    patch_bytes_at(data, absolute_offset, &bytes)?;
    redecode(data, record, &chunk, options);

    tracing::debug!(
        index,
        field = spec.name,
        absolute_offset,
        value,
        "patched boundary field"
    );
    Ok(EditOutcome {
        index,
        field: spec.name,
        absolute_offset,
        old_value: spec.kind.decode(old_bytes),
        new_value: spec.kind.decode(bytes),
        data_chunk: chunk.offset,
        old_bytes,
    })
}

/// Put back the bytes an edit replaced. The slot is taken from the outcome, not
/// recomputed, since a rectangle edit can change which slot backs a field.
pub fn revert_edit(
    data: &mut [u8],
    records: &mut [Boundary],
    outcome: &EditOutcome,
    options: &ParseOptions,
) -> Result<()> {
    let record = records
        .get_mut(outcome.index)
        .ok_or(Error::UnknownRecord(outcome.index))?;
    let chunk = locate_data_chunk(data, record.kind, record.offset, options)
        .filter(|chunk| chunk.offset == outcome.data_chunk)
        .ok_or(Error::DataChunkNotFound { offset: record.offset })?;
    let start = outcome.absolute_offset;
    if start < chunk.body_start() || start + 4 > chunk.end {
        return Err(Error::DataChunkTooSmall {
            offset: chunk.offset,
            field: outcome.field,
            need: start.saturating_sub(chunk.body_start()) + 4,
            have: chunk.body_len(),
        });
    }
    patch_bytes_at(data, start, &outcome.old_bytes)?;
    redecode(data, record, &chunk, options);
    Ok(())
}

/// Decode the patched payload under the layout the record was read with.
fn redecode(data: &[u8], record: &mut Boundary, chunk: &ChunkHeader, options: &ParseOptions) {
    let preference = record
        .layout
        .map(LayoutPreference::from)
        .unwrap_or(options.vertex_layout);
    record.set_data(BoundaryData::decode(
        record.kind,
        chunk.body(data),
        preference,
        options.world_limit,
    ));
}
