use serde::Serialize;

use crate::codec::chunk::{ChunkHeader, Tag, HEADER_LEN};
use crate::codec::reader::ChunkReader;
use crate::config::PlacementFilter;
use crate::error::Result;

/// Name table chunk: u32 count, then that many NUL-terminated template paths
pub const NAME_TABLE: Tag = Tag::new(b"OTNL");

/// Payload size of one placement record
pub const PLACEMENT_LEN: usize = 52;

const MAX_TEMPLATE_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementCategory {
    Building,
    Installation,
    Static,
    Tangible,
    Creature,
    Other,
}

impl PlacementCategory {
    pub fn from_template(template: &str) -> Self {
        let family = template.strip_prefix("object/").unwrap_or("");
        match family.split('/').next() {
            Some("building") => Self::Building,
            Some("installation") => Self::Installation,
            Some("static") => Self::Static,
            Some("tangible") => Self::Tangible,
            Some("creature") | Some("mobile") => Self::Creature,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Orientation {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub object_id: u32,
    pub parent_id: u32,
    pub template_index: u32,
    /// Empty when the index is outside the name table
    pub template: String,
    pub cell_index: u32,
    pub orientation: Orientation,
    pub position: Position,
    pub radius: f32,
    pub portal_crc: u32,
    pub category: PlacementCategory,
    /// Offset of the record's `DATA` tag
    pub offset: usize,
}

impl Placement {
    fn read(reader: &mut ChunkReader, offset: usize, templates: &[String]) -> Result<Self> {
        let object_id = reader.read_u32_le()?;
        let parent_id = reader.read_u32_le()?;
        let template_index = reader.read_u32_le()?;
        let cell_index = reader.read_u32_le()?;
        let orientation = Orientation {
            w: reader.read_f32_le()?,
            x: reader.read_f32_le()?,
            y: reader.read_f32_le()?,
            z: reader.read_f32_le()?,
        };
        let position = Position {
            x: reader.read_f32_le()?,
            y: reader.read_f32_le()?,
            z: reader.read_f32_le()?,
        };
        let radius = reader.read_f32_le()?;
        let portal_crc = reader.read_u32_le()?;

        let template = templates
            .get(template_index as usize)
            .cloned()
            .unwrap_or_default();
        Ok(Self {
            object_id,
            parent_id,
            template_index,
            category: PlacementCategory::from_template(&template),
            template,
            cell_index,
            orientation,
            position,
            radius,
            portal_crc,
            offset,
        })
    }

    fn keep(&self, filter: &PlacementFilter) -> bool {
        if filter.is_excluded(&self.template) {
            return false;
        }
        if self.parent_id != 0 && !filter.is_attached_exception(&self.template) {
            return false;
        }
        !(filter.drop_zero_position && self.position.x == 0.0 && self.position.z == 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub templates: Vec<String>,
    pub placements: Vec<Placement>,
}

fn find_from(data: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    data.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|at| from + at)
}

/// Payload of the name table, either a bare `OTNL` chunk or the first `DATA`
/// inside a `FORM OTNL`.
fn name_table_payload(data: &[u8]) -> Option<&[u8]> {
    let mut from = 0;
    while let Some(at) = find_from(data, from, NAME_TABLE.as_bytes()) {
        from = at + 1;
        if at >= HEADER_LEN && &data[at - HEADER_LEN..at - 4] == Tag::FORM.as_bytes() {
            let Ok(group) = ChunkHeader::read(data, at - HEADER_LEN, data.len()) else { continue };
            let mut pos = group.body_start();
            while pos + HEADER_LEN <= group.end {
                let Ok(child) = ChunkHeader::read(data, pos, group.end) else { break };
                if child.tag == Tag::DATA {
                    return Some(child.body(data));
                }
                pos = child.end;
            }
        } else if let Ok(chunk) = ChunkHeader::read(data, at, data.len()) {
            return Some(chunk.body(data));
        }
    }
    None
}

/// Template paths from the snapshot's name table. A table that ends early
/// yields the names read so far.
pub fn parse_name_table(data: &[u8]) -> Vec<String> {
    let Some(payload) = name_table_payload(data) else {
        tracing::debug!("snapshot has no name table");
        return Vec::new();
    };
    let mut reader = ChunkReader::new(payload);
    let Ok(count) = reader.read_u32_le() else {
        return Vec::new();
    };
    let mut names = Vec::with_capacity((count as usize).min(4096));
    for _ in 0..count {
        if reader.is_empty() {
            tracing::warn!(declared = count, read = names.len(), "name table cut short");
            break;
        }
        match reader.read_cstring(MAX_TEMPLATE_LEN) {
            Ok(name) => names.push(name),
            Err(e) => {
                tracing::warn!(offset = reader.position(), error = %e, "unreadable template name");
                break;
            }
        }
    }
    names
}

/// Scan for `DATA` chunks of exactly [`PLACEMENT_LEN`] bytes and keep the ones
/// placed directly in the world.
pub fn extract_placements(
    data: &[u8],
    templates: &[String],
    filter: &PlacementFilter,
) -> Vec<Placement> {
    let mut signature = [0u8; HEADER_LEN];
    signature[..4].copy_from_slice(Tag::DATA.as_bytes());
    signature[4..].copy_from_slice(&(PLACEMENT_LEN as u32).to_be_bytes());

    let mut placements = Vec::new();
    let mut dropped = 0usize;
    let mut from = 0;
    while let Some(at) = find_from(data, from, &signature) {
        let start = at + HEADER_LEN;
        if start + PLACEMENT_LEN > data.len() {
            break;
        }
        let mut reader = ChunkReader::bounded(data, start, start + PLACEMENT_LEN);
        match Placement::read(&mut reader, at, templates) {
            Ok(placement) if placement.keep(filter) => placements.push(placement),
            Ok(_) => dropped += 1,
            Err(e) => tracing::warn!(offset = at, error = %e, "unreadable placement record"),
        }
        from = start + PLACEMENT_LEN;
    }
    tracing::debug!(kept = placements.len(), dropped, "extracted placements");
    placements
}

pub fn parse_snapshot(data: &[u8], filter: &PlacementFilter) -> Snapshot {
    let templates = parse_name_table(data);
    let placements = extract_placements(data, &templates, filter);
    Snapshot { templates, placements }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::ChunkWriter;

    struct Record {
        object_id: u32,
        parent_id: u32,
        template_index: u32,
        x: f32,
        z: f32,
    }

    fn record(w: &mut ChunkWriter, r: &Record) {
        w.form(b"NODE", |w| {
            w.form(b"0000", |w| {
                w.begin_chunk(b"DATA")
                    .write_u32_le(r.object_id)
                    .write_u32_le(r.parent_id)
                    .write_u32_le(r.template_index)
                    .write_u32_le(0)
                    .write_f32_le(1.0)
                    .write_f32_le(0.0)
                    .write_f32_le(0.0)
                    .write_f32_le(0.0)
                    .write_f32_le(r.x)
                    .write_f32_le(12.0)
                    .write_f32_le(r.z)
                    .write_f32_le(3.5)
                    .write_u32_le(0);
            });
        });
    }

    fn name_table(w: &mut ChunkWriter, names: &[&str]) {
        w.begin_chunk(b"OTNL").write_u32_le(names.len() as u32);
        for name in names {
            w.write_cstring(name);
        }
        let _ = w.end_chunk();
    }

    const TEMPLATES: [&str; 4] = [
        "object/building/tatooine/shared_cantina.iff",
        "object/cell/shared_cell.iff",
        "object/tangible/container/shared_crate.iff",
        "object/tangible/furniture/shared_chair.iff",
    ];

    fn snapshot_bytes() -> Vec<u8> {
        let mut w = ChunkWriter::new();
        w.form(b"WSNP", |w| {
            w.form(b"0001", |w| {
                w.form(b"NODS", |w| {
                    let records = [
                        Record {
                            object_id: 1,
                            parent_id: 0,
                            template_index: 0,
                            x: 100.0,
                            z: -40.0,
                        },
                        Record { object_id: 2, parent_id: 1, template_index: 1, x: 1.0, z: 1.0 },
                        Record { object_id: 3, parent_id: 1, template_index: 2, x: 2.0, z: 2.0 },
                        Record { object_id: 4, parent_id: 1, template_index: 3, x: 3.0, z: 3.0 },
                        Record { object_id: 5, parent_id: 0, template_index: 3, x: 0.0, z: 0.0 },
                        Record { object_id: 6, parent_id: 0, template_index: 99, x: 5.0, z: 5.0 },
                    ];
                    for r in &records {
                        record(w, r);
                    }
                });
                name_table(w, &TEMPLATES);
            });
        });
        w.into_vec()
    }

    #[test]
    fn test_name_table() {
        let data = snapshot_bytes();
        assert_eq!(parse_name_table(&data), TEMPLATES.to_vec());
    }

    #[test]
    fn test_name_table_inside_group() {
        let mut w = ChunkWriter::new();
        w.form(b"WSNP", |w| {
            w.form(b"OTNL", |w| {
                w.begin_chunk(b"DATA").write_u32_le(2).write_cstring("a").write_cstring("b");
            });
        });
        assert_eq!(parse_name_table(&w.into_vec()), vec!["a", "b"]);
    }

    #[test]
    fn test_short_name_table() {
        let mut w = ChunkWriter::new();
        w.begin_chunk(b"OTNL").write_u32_le(5).write_cstring("only");
        let _ = w.end_chunk();
        assert_eq!(parse_name_table(&w.into_vec()), vec!["only"]);
        assert!(parse_name_table(b"nothing here").is_empty());
    }

    #[test]
    fn test_filtered_placements() {
        let data = snapshot_bytes();
        let snapshot = parse_snapshot(&data, &PlacementFilter::default());
        let ids: Vec<u32> = snapshot.placements.iter().map(|p| p.object_id).collect();

        // 2 is a cell, 4 is attached to a parent, 5 sits at the origin.
        assert_eq!(ids, vec![1, 3, 6]);

        let cantina = &snapshot.placements[0];
        assert_eq!(cantina.category, PlacementCategory::Building);
        assert_eq!(cantina.position, Position { x: 100.0, y: 12.0, z: -40.0 });
        assert_eq!(cantina.orientation.w, 1.0);
        assert_eq!(cantina.radius, 3.5);
        assert_eq!(&data[cantina.offset..cantina.offset + 4], b"DATA");

        assert_eq!(snapshot.placements[1].category, PlacementCategory::Tangible);
        let unknown = &snapshot.placements[2];
        assert_eq!(unknown.template, "");
        assert_eq!(unknown.category, PlacementCategory::Other);
    }

    #[test]
    fn test_filter_is_configurable() {
        let data = snapshot_bytes();
        let filter = PlacementFilter {
            excluded_prefixes: Vec::new(),
            attached_exceptions: Vec::new(),
            drop_zero_position: false,
        };
        let placements = extract_placements(&data, &parse_name_table(&data), &filter);
        let ids: Vec<u32> = placements.iter().map(|p| p.object_id).collect();
        assert_eq!(ids, vec![1, 5, 6]);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            PlacementCategory::from_template("object/installation/shared_generator.iff"),
            PlacementCategory::Installation
        );
        assert_eq!(
            PlacementCategory::from_template("object/static/shared_rock.iff"),
            PlacementCategory::Static
        );
        assert_eq!(
            PlacementCategory::from_template("object/mobile/shared_bantha.iff"),
            PlacementCategory::Creature
        );
        assert_eq!(PlacementCategory::from_template("terrain/x.trn"), PlacementCategory::Other);
    }
}
