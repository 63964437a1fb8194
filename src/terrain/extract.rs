use super::boundary::{Boundary, BoundaryData, BoundaryKind};
use super::layers::fallback_layer_name;
use super::{HEADER, LAYER};
use crate::codec::chunk::{ChunkHeader, Tag};
use crate::codec::name::header_name;
use crate::codec::walk::ChunkVisitor;
use crate::config::ParseOptions;

struct Pending {
    kind: BoundaryKind,
    offset: usize,
    name: Option<String>,
    data: Option<(ChunkHeader, BoundaryData)>,
    short_chunks: usize,
}

enum Frame {
    Layer { ordinal: usize },
    Boundary(Pending),
    Header,
    Version,
    /// Any other group: transparent for paths, but owns its own header
    Other,
}

struct Extracted {
    kind: BoundaryKind,
    offset: usize,
    name: Option<String>,
    layers: Vec<usize>,
    data: Option<(ChunkHeader, BoundaryData)>,
}

/// Collects boundary records from walk events.
///
/// Layer names are resolved when the walk is finished, so a record's path is
/// correct even when a layer's header comes after some of its boundaries.
pub struct RecordExtractor<'o> {
    options: &'o ParseOptions,
    frames: Vec<Frame>,
    layer_names: Vec<Option<String>>,
    records: Vec<Extracted>,
}

impl<'o> RecordExtractor<'o> {
    pub fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            frames: Vec::new(),
            layer_names: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Data chunk the record whose group starts at `group_offset` was decoded from
    pub fn data_chunk_of(&self, group_offset: usize) -> Option<ChunkHeader> {
        let record = self.records.iter().find(|r| r.offset == group_offset)?;
        record.data.as_ref().map(|(header, _)| *header)
    }

    pub fn finish(self) -> Vec<Boundary> {
        let layer_names: Vec<String> = self
            .layer_names
            .into_iter()
            .enumerate()
            .map(|(ordinal, name)| name.unwrap_or_else(|| fallback_layer_name(ordinal)))
            .collect();

        self.records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let path = record.layers.iter().map(|&i| layer_names[i].clone()).collect();
                let data = match record.data {
                    Some((_, data)) => data,
                    None => BoundaryData::zeroed(record.kind),
                };
                Boundary::new(index, record.kind, record.name, path, record.offset, data)
            })
            .collect()
    }

    fn frame_for(&mut self, header: &ChunkHeader) -> Frame {
        let form_type = header.form_type.unwrap_or(Tag::FORM);
        if let Some(kind) = BoundaryKind::from_form_type(form_type) {
            Frame::Boundary(Pending {
                kind,
                offset: header.offset,
                name: None,
                data: None,
                short_chunks: 0,
            })
        } else if form_type == LAYER {
            self.layer_names.push(None);
            Frame::Layer { ordinal: self.layer_names.len() - 1 }
        } else if form_type == HEADER {
            Frame::Header
        } else if form_type.is_version() {
            Frame::Version
        } else {
            Frame::Other
        }
    }

    /// A boundary takes the first header found anywhere below it, including
    /// inside unknown groups. A layer only takes headers that are its own, so
    /// the header of an affector or filter never renames it.
    fn take_header_name(&mut self, header_at: usize, payload: &[u8]) {
        let mut crossed_group = false;
        for frame in self.frames[..header_at].iter_mut().rev() {
            match frame {
                Frame::Version => {}
                Frame::Other => crossed_group = true,
                Frame::Boundary(pending) => {
                    if pending.name.is_none() {
                        pending.name = header_name(payload);
                    }
                    return;
                }
                Frame::Layer { ordinal } => {
                    let slot = &mut self.layer_names[*ordinal];
                    if !crossed_group && slot.is_none() {
                        *slot = header_name(payload);
                    }
                    return;
                }
                Frame::Header => return,
            }
        }
    }
}

impl ChunkVisitor for RecordExtractor<'_> {
    fn enter_form(&mut self, header: &ChunkHeader, _depth: usize) {
        let frame = self.frame_for(header);
        self.frames.push(frame);
    }

    fn leave_form(&mut self, _header: &ChunkHeader, _depth: usize) {
        let Some(Frame::Boundary(pending)) = self.frames.pop() else { return };

        if pending.data.is_none() {
            tracing::warn!(
                offset = pending.offset,
                kind = pending.kind.as_str(),
                short_chunks = pending.short_chunks,
                "boundary without usable data chunk"
            );
        }
        let layers = self
            .frames
            .iter()
            .filter_map(|f| match f {
                Frame::Layer { ordinal } => Some(*ordinal),
                _ => None,
            })
            .collect();
        self.records.push(Extracted {
            kind: pending.kind,
            offset: pending.offset,
            name: pending.name,
            layers,
            data: pending.data,
        });
    }

    fn leaf(&mut self, header: &ChunkHeader, payload: &[u8], _depth: usize) {
        if header.tag != Tag::DATA {
            return;
        }
        if let Some(at) = self.frames.iter().rposition(|f| matches!(f, Frame::Header)) {
            self.take_header_name(at, payload);
            return;
        }

        let options = self.options;
        let pending = self.frames.iter_mut().rev().find_map(|f| match f {
            Frame::Boundary(pending) => Some(pending),
            _ => None,
        });
        let Some(pending) = pending else { return };
        if pending.data.is_some() {
            return;
        }
        if payload.len() < pending.kind.min_data_len() {
            pending.short_chunks += 1;
            return;
        }
        let data = BoundaryData::decode(
            pending.kind,
            payload,
            options.vertex_layout,
            options.world_limit,
        );
        pending.data = Some((*header, data));
    }

    fn depth_limited(&mut self, header: &ChunkHeader, _depth: usize) {
        // Keep layer ordinals in step with the tree, which still records the node.
        if header.is_form_of(LAYER) {
            self.layer_names.push(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::walk::Walker;
    use crate::codec::writer::ChunkWriter;
    use crate::terrain::boundary::Shape;

    fn header(w: &mut ChunkWriter, name: &str) {
        w.form(b"IHDR", |w| {
            w.form(b"0001", |w| {
                w.begin_chunk(b"DATA").write_u32_le(1).write_cstring(name);
                let _ = w.end_chunk();
            });
        });
    }

    fn circle(w: &mut ChunkWriter, name: &str, x: f32, z: f32, r: f32) {
        w.form(b"BCIR", |w| {
            w.form(b"0002", |w| {
                header(w, name);
                w.begin_chunk(b"DATA")
                    .write_f32_le(x)
                    .write_f32_le(z)
                    .write_f32_le(r)
                    .write_u32_le(0)
                    .write_f32_le(0.5);
                let _ = w.end_chunk();
            });
        });
    }

    fn extract(data: &[u8]) -> Vec<Boundary> {
        let options = ParseOptions::default();
        let mut extractor = RecordExtractor::new(&options);
        Walker::new(data).walk_chunk(0, data.len(), 0, &mut extractor);
        extractor.finish()
    }

    #[test]
    fn test_layer_paths() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"LAYR", |w| {
                w.form(b"0003", |w| {
                    header(w, "Outer");
                    circle(w, "first", 1.0, 2.0, 3.0);
                    w.form(b"LAYR", |w| {
                        header(w, "Inner");
                        circle(w, "second", 4.0, 5.0, 6.0);
                    });
                });
            });
            circle(w, "loose", 0.0, 0.0, 1.0);
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "first");
        assert_eq!(records[0].layer_path, vec!["Outer"]);
        assert_eq!(records[1].name, "second");
        assert_eq!(records[1].layer_path, vec!["Outer", "Inner"]);
        assert_eq!(records[1].shape, Shape::Circle { center_x: 4.0, center_z: 5.0, radius: 6.0 });
        assert!(records[2].layer_path.is_empty());
        assert_eq!(records.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_offsets_point_at_group() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            circle(w, "c", 1.0, 1.0, 1.0);
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records[0].offset, 12);
        assert_eq!(&data[12..16], b"FORM");
        assert_eq!(&data[20..24], b"BCIR");
    }

    #[test]
    fn test_short_data_still_emitted() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"BCIR", |w| {
                header(w, "tiny");
                w.chunk(b"DATA", &[0x41; 10]);
            });
            w.form(b"BREC", |w| {
                header(w, "empty");
            });
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "tiny");
        assert!(records[0].malformed);
        assert_eq!(records[0].shape, Shape::Circle { center_x: 0.0, center_z: 0.0, radius: 0.0 });
        assert!(records[1].malformed);
    }

    #[test]
    fn test_unnamed_records_and_layers() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"LAYR", |w| {
                w.form(b"BCIR", |w| {
                    w.chunk(b"DATA", &[0; 20]);
                });
            });
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records[0].name, "Circle");
        assert_eq!(records[0].layer_path, vec![fallback_layer_name(0)]);
    }

    #[test]
    fn test_affector_header_does_not_rename_layer() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"LAYR", |w| {
                w.form(b"AHCN", |w| {
                    header(w, "affector");
                });
                header(w, "Real");
                circle(w, "c", 0.0, 0.0, 1.0);
            });
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records[0].layer_path, vec!["Real"]);
    }

    #[test]
    fn test_boundary_name_inside_unknown_group() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"LAYR", |w| {
                header(w, "Lakes");
                w.form(b"BCIR", |w| {
                    w.form(b"XTRA", |w| {
                        header(w, "pond");
                        w.begin_chunk(b"DATA")
                            .write_f32_le(1.0)
                            .write_f32_le(2.0)
                            .write_f32_le(3.0)
                            .write_u32_le(0)
                            .write_f32_le(0.0);
                    });
                });
            });
        });
        let data = w.into_vec();
        let records = extract(&data);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "pond");
        assert_eq!(records[0].layer_path, vec!["Lakes"]);
        assert_eq!(records[0].shape, Shape::Circle { center_x: 1.0, center_z: 2.0, radius: 3.0 });
    }
}
