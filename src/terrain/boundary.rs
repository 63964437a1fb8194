//! Boundary records and their on-disk layouts.
//!
//! | kind      | form   | data payload (little-endian)                                  |
//! |-----------|--------|---------------------------------------------------------------|
//! | circle    | `BCIR` | center_x, center_z, radius, feather_type u32, feather_amount   |
//! | rectangle | `BREC` | x1, z1, x2, z2, feather_type u32, feather_amount               |
//! | polygon   | `BPOL` | count u32, then vertices and feather in [`VertexLayout`] order  |
//! | polyline  | `BPLN` | as polygon, with width after feather_amount                    |

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::tree::{FieldValue, PayloadBag};
use crate::codec::chunk::Tag;
use crate::codec::reader::ChunkReader;
use crate::config::LayoutPreference;
use crate::error::{Error, Result};

pub const CIRCLE: Tag = Tag::new(b"BCIR");
pub const RECTANGLE: Tag = Tag::new(b"BREC");
pub const POLYGON: Tag = Tag::new(b"BPOL");
pub const POLYLINE: Tag = Tag::new(b"BPLN");

/// Feather type codes are small enumerations; anything above this is noise.
const MAX_FEATHER_TYPE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    Circle,
    Rectangle,
    Polygon,
    Polyline,
}

impl BoundaryKind {
    pub const ALL: [Self; 4] = [Self::Circle, Self::Rectangle, Self::Polygon, Self::Polyline];

    pub fn form_type(self) -> Tag {
        match self {
            Self::Circle => CIRCLE,
            Self::Rectangle => RECTANGLE,
            Self::Polygon => POLYGON,
            Self::Polyline => POLYLINE,
        }
    }

    pub fn from_form_type(tag: Tag) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.form_type() == tag)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Circle => "circle",
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::Polyline => "polyline",
        }
    }

    /// Name used when the record carries no readable header name
    pub fn placeholder_name(self) -> &'static str {
        match self {
            Self::Circle => "Circle",
            Self::Rectangle => "Rectangle",
            Self::Polygon => "Polygon",
            Self::Polyline => "Polyline",
        }
    }

    /// Smallest data payload worth decoding
    pub fn min_data_len(self) -> usize {
        match self {
            Self::Circle => 20,
            Self::Rectangle => 24,
            Self::Polygon => 12,
            Self::Polyline => 16,
        }
    }

    pub fn has_vertices(self) -> bool {
        matches!(self, Self::Polygon | Self::Polyline)
    }
}

/// Order of the vertex array relative to the feather fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexLayout {
    /// `count, vertices.., feather_type, feather_amount[, width]`
    VerticesFirst,
    /// `count, feather_type, feather_amount[, width], vertices..`
    FeatherFirst,
}

impl From<VertexLayout> for LayoutPreference {
    fn from(layout: VertexLayout) -> Self {
        match layout {
            VertexLayout::VerticesFirst => Self::VerticesFirst,
            VertexLayout::FeatherFirst => Self::FeatherFirst,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vertex {
    pub x: f32,
    pub z: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Circle { center_x: f32, center_z: f32, radius: f32 },
    Rectangle { x1: f32, z1: f32, x2: f32, z2: f32 },
    Polygon { vertices: Vec<Vertex> },
    Polyline { vertices: Vec<Vertex>, width: f32 },
}

impl Shape {
    pub fn zeroed(kind: BoundaryKind) -> Self {
        match kind {
            BoundaryKind::Circle => Self::Circle { center_x: 0.0, center_z: 0.0, radius: 0.0 },
            BoundaryKind::Rectangle => Self::Rectangle { x1: 0.0, z1: 0.0, x2: 0.0, z2: 0.0 },
            BoundaryKind::Polygon => Self::Polygon { vertices: Vec::new() },
            BoundaryKind::Polyline => Self::Polyline { vertices: Vec::new(), width: 0.0 },
        }
    }

    pub fn kind(&self) -> BoundaryKind {
        match self {
            Self::Circle { .. } => BoundaryKind::Circle,
            Self::Rectangle { .. } => BoundaryKind::Rectangle,
            Self::Polygon { .. } => BoundaryKind::Polygon,
            Self::Polyline { .. } => BoundaryKind::Polyline,
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        match self {
            Self::Polygon { vertices } | Self::Polyline { vertices, .. } => vertices,
            _ => &[],
        }
    }
}

/// Decoded content of one boundary data chunk
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryData {
    pub shape: Shape,
    pub feather_type: u32,
    pub feather_amount: f32,
    pub layout: Option<VertexLayout>,
    /// Rectangle corners that were stored max-first and swapped on decode
    pub swapped_x: bool,
    pub swapped_z: bool,
    pub malformed: bool,
}

fn read_vertices(reader: &mut ChunkReader<'_>, count: usize) -> Result<Vec<Vertex>> {
    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(Vertex { x: reader.read_f32_le()?, z: reader.read_f32_le()? });
    }
    Ok(vertices)
}

struct PolyParts {
    vertices: Vec<Vertex>,
    feather_type: u32,
    feather_amount: f32,
    width: f32,
}

impl PolyParts {
    fn read(payload: &[u8], count: usize, polyline: bool, layout: VertexLayout) -> Result<Self> {
        let mut reader = ChunkReader::new(payload);
        reader.skip(4)?;

        let parts = match layout {
            VertexLayout::VerticesFirst => {
                let vertices = read_vertices(&mut reader, count)?;
                let feather_type = reader.read_u32_le()?;
                let feather_amount = reader.read_f32_le()?;
                let width = if polyline { reader.read_f32_le()? } else { 0.0 };
                Self { vertices, feather_type, feather_amount, width }
            }
            VertexLayout::FeatherFirst => {
                let feather_type = reader.read_u32_le()?;
                let feather_amount = reader.read_f32_le()?;
                let width = if polyline { reader.read_f32_le()? } else { 0.0 };
                let vertices = read_vertices(&mut reader, count)?;
                Self { vertices, feather_type, feather_amount, width }
            }
        };
        Ok(parts)
    }

    fn plausible(&self, world_limit: f32) -> bool {
        let in_world = |v: f32| v.is_finite() && v.abs() <= world_limit;
        self.vertices.iter().all(|v| in_world(v.x) && in_world(v.z))
            && self.feather_type < MAX_FEATHER_TYPE
            && self.feather_amount.is_finite()
            && self.feather_amount >= 0.0
            && self.width.is_finite()
            && self.width >= 0.0
    }
}

impl BoundaryData {
    pub fn zeroed(kind: BoundaryKind) -> Self {
        Self {
            shape: Shape::zeroed(kind),
            feather_type: 0,
            feather_amount: 0.0,
            layout: None,
            swapped_x: false,
            swapped_z: false,
            malformed: true,
        }
    }

    /// Decode a data payload. Never fails: short or inconsistent payloads come
    /// back zeroed and flagged `malformed`.
    pub fn decode(
        kind: BoundaryKind,
        payload: &[u8],
        preference: LayoutPreference,
        world_limit: f32,
    ) -> Self {
        if payload.len() < kind.min_data_len() {
            tracing::warn!(
                kind = kind.as_str(),
                len = payload.len(),
                min = kind.min_data_len(),
                "boundary data too short"
            );
            return Self::zeroed(kind);
        }
        let decoded = match kind {
            BoundaryKind::Circle => Self::decode_circle(payload),
            BoundaryKind::Rectangle => Self::decode_rectangle(payload),
            BoundaryKind::Polygon | BoundaryKind::Polyline => {
                Self::decode_poly(kind, payload, preference, world_limit)
            }
        };
        decoded.unwrap_or_else(|e| {
            tracing::warn!(kind = kind.as_str(), error = %e, "boundary data unreadable");
            Self::zeroed(kind)
        })
    }

    fn decode_circle(payload: &[u8]) -> Result<Self> {
        let mut reader = ChunkReader::new(payload);
        let shape = Shape::Circle {
            center_x: reader.read_f32_le()?,
            center_z: reader.read_f32_le()?,
            radius: reader.read_f32_le()?,
        };
        Ok(Self {
            shape,
            feather_type: reader.read_u32_le()?,
            feather_amount: reader.read_f32_le()?,
            layout: None,
            swapped_x: false,
            swapped_z: false,
            malformed: false,
        })
    }

    fn decode_rectangle(payload: &[u8]) -> Result<Self> {
        let mut reader = ChunkReader::new(payload);
        let (mut x1, mut z1) = (reader.read_f32_le()?, reader.read_f32_le()?);
        let (mut x2, mut z2) = (reader.read_f32_le()?, reader.read_f32_le()?);
        let swapped_x = x1 > x2;
        if swapped_x {
            std::mem::swap(&mut x1, &mut x2);
        }
        let swapped_z = z1 > z2;
        if swapped_z {
            std::mem::swap(&mut z1, &mut z2);
        }
        Ok(Self {
            shape: Shape::Rectangle { x1, z1, x2, z2 },
            feather_type: reader.read_u32_le()?,
            feather_amount: reader.read_f32_le()?,
            layout: None,
            swapped_x,
            swapped_z,
            malformed: false,
        })
    }

    fn decode_poly(
        kind: BoundaryKind,
        payload: &[u8],
        preference: LayoutPreference,
        world_limit: f32,
    ) -> Result<Self> {
        let polyline = kind == BoundaryKind::Polyline;
        let count = LittleEndian::read_u32(&payload[..4]) as usize;
        let needed = count
            .checked_mul(8)
            .and_then(|n| n.checked_add(kind.min_data_len()));
        match needed {
            Some(needed) if needed <= payload.len() => {}
            _ => {
                tracing::warn!(
                    kind = kind.as_str(),
                    count,
                    len = payload.len(),
                    "vertex count does not fit the data chunk"
                );
                return Ok(Self::zeroed(kind));
            }
        }

        let (layout, parts) = match preference.fixed() {
            Some(layout) => (layout, PolyParts::read(payload, count, polyline, layout)?),
            None => {
                let first = PolyParts::read(payload, count, polyline, VertexLayout::VerticesFirst)?;
                if first.plausible(world_limit) {
                    (VertexLayout::VerticesFirst, first)
                } else {
                    let second =
                        PolyParts::read(payload, count, polyline, VertexLayout::FeatherFirst)?;
                    if second.plausible(world_limit) {
                        tracing::debug!(
                            kind = kind.as_str(),
                            count,
                            "detected feather-first layout"
                        );
                        (VertexLayout::FeatherFirst, second)
                    } else {
                        tracing::warn!(
                            kind = kind.as_str(),
                            count,
                            "no plausible vertex layout, assuming vertices first"
                        );
                        (VertexLayout::VerticesFirst, first)
                    }
                }
            }
        };

        let shape = if polyline {
            Shape::Polyline { vertices: parts.vertices, width: parts.width }
        } else {
            Shape::Polygon { vertices: parts.vertices }
        };
        Ok(Self {
            shape,
            feather_type: parts.feather_type,
            feather_amount: parts.feather_amount,
            layout: Some(layout),
            swapped_x: false,
            swapped_z: false,
            malformed: false,
        })
    }

    /// Field bag used by the generic tree
    pub fn to_fields(&self) -> PayloadBag {
        let mut bag = PayloadBag::new();
        match &self.shape {
            Shape::Circle { center_x, center_z, radius } => {
                bag.insert("center_x".into(), FieldValue::F32(*center_x));
                bag.insert("center_z".into(), FieldValue::F32(*center_z));
                bag.insert("radius".into(), FieldValue::F32(*radius));
            }
            Shape::Rectangle { x1, z1, x2, z2 } => {
                bag.insert("x1".into(), FieldValue::F32(*x1));
                bag.insert("z1".into(), FieldValue::F32(*z1));
                bag.insert("x2".into(), FieldValue::F32(*x2));
                bag.insert("z2".into(), FieldValue::F32(*z2));
            }
            Shape::Polygon { vertices } | Shape::Polyline { vertices, .. } => {
                bag.insert("vertex_count".into(), FieldValue::U32(vertices.len() as u32));
                bag.insert("vertices".into(), FieldValue::Vertices(vertices.clone()));
            }
        }
        bag.insert("feather_type".into(), FieldValue::U32(self.feather_type));
        bag.insert("feather_amount".into(), FieldValue::F32(self.feather_amount));
        if let Shape::Polyline { width, .. } = &self.shape {
            bag.insert("width".into(), FieldValue::F32(*width));
        }
        if self.malformed {
            bag.insert("malformed".into(), FieldValue::Bool(true));
        }
        bag
    }
}

/// Encoding of an editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    F32,
    U32,
}

impl FieldKind {
    pub fn encode(self, field: &'static str, value: f64) -> Result<[u8; 4]> {
        match self {
            Self::F32 => {
                if !value.is_finite() || value.abs() > f32::MAX as f64 {
                    return Err(Error::InvalidValue { field, value });
                }
                Ok((value as f32).to_le_bytes())
            }
            Self::U32 => {
                if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
                    return Err(Error::InvalidValue { field, value });
                }
                Ok((value as u32).to_le_bytes())
            }
        }
    }

    pub fn decode(self, bytes: [u8; 4]) -> f64 {
        match self {
            Self::F32 => f32::from_le_bytes(bytes) as f64,
            Self::U32 => u32::from_le_bytes(bytes) as f64,
        }
    }
}

/// Location of an editable field inside a record's data payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

const FIELD_ALIASES: [(&str, &str); 4] = [
    ("centerX", "center_x"),
    ("centerZ", "center_z"),
    ("featherType", "feather_type"),
    ("featherAmount", "feather_amount"),
];

pub fn canonical_field(name: &str) -> &str {
    FIELD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |&(_, canonical)| canonical)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Boundary {
    pub index: usize,
    pub kind: BoundaryKind,
    pub name: String,
    pub shape: Shape,
    pub feather_type: u32,
    pub feather_amount: f32,
    /// Enclosing layer names, outermost first
    pub layer_path: Vec<String>,
    /// Offset of the boundary's group chunk
    pub offset: usize,
    pub layout: Option<VertexLayout>,
    pub malformed: bool,
    #[serde(skip)]
    pub(crate) swapped_x: bool,
    #[serde(skip)]
    pub(crate) swapped_z: bool,
}

impl Boundary {
    pub fn new(
        index: usize,
        kind: BoundaryKind,
        name: Option<String>,
        layer_path: Vec<String>,
        offset: usize,
        data: BoundaryData,
    ) -> Self {
        let mut boundary = Self {
            index,
            kind,
            name: name.unwrap_or_else(|| kind.placeholder_name().to_string()),
            shape: Shape::zeroed(kind),
            feather_type: 0,
            feather_amount: 0.0,
            layer_path,
            offset,
            layout: None,
            malformed: true,
            swapped_x: false,
            swapped_z: false,
        };
        boundary.set_data(data);
        boundary
    }

    /// Replace the geometry with freshly decoded data
    pub fn set_data(&mut self, data: BoundaryData) {
        self.shape = data.shape;
        self.feather_type = data.feather_type;
        self.feather_amount = data.feather_amount;
        self.layout = data.layout;
        self.malformed = data.malformed;
        self.swapped_x = data.swapped_x;
        self.swapped_z = data.swapped_z;
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.shape.vertices()
    }

    pub fn data(&self) -> BoundaryData {
        BoundaryData {
            shape: self.shape.clone(),
            feather_type: self.feather_type,
            feather_amount: self.feather_amount,
            layout: self.layout,
            swapped_x: self.swapped_x,
            swapped_z: self.swapped_z,
            malformed: self.malformed,
        }
    }

    /// Byte location of an editable field. Vertices, names and counts are not
    /// editable since changing them would resize the chunk.
    pub fn field(&self, name: &str) -> Option<FieldSpec> {
        let name = canonical_field(name);
        let tail = 8 * self.vertices().len();
        let vertices_first = self.layout != Some(VertexLayout::FeatherFirst);
        let f32_at = |name: &'static str, offset: usize| FieldSpec {
            name,
            offset,
            kind: FieldKind::F32,
        };

        let spec = match (self.kind, name) {
            (BoundaryKind::Circle, "center_x") => f32_at("center_x", 0),
            (BoundaryKind::Circle, "center_z") => f32_at("center_z", 4),
            (BoundaryKind::Circle, "radius") => f32_at("radius", 8),
            (BoundaryKind::Circle, "feather_type") => {
                FieldSpec { name: "feather_type", offset: 12, kind: FieldKind::U32 }
            }
            (BoundaryKind::Circle, "feather_amount") => f32_at("feather_amount", 16),

            // In-memory corners are min-first; the disk slot may be the other one.
            (BoundaryKind::Rectangle, "x1") => f32_at("x1", if self.swapped_x { 8 } else { 0 }),
            (BoundaryKind::Rectangle, "z1") => f32_at("z1", if self.swapped_z { 12 } else { 4 }),
            (BoundaryKind::Rectangle, "x2") => f32_at("x2", if self.swapped_x { 0 } else { 8 }),
            (BoundaryKind::Rectangle, "z2") => f32_at("z2", if self.swapped_z { 4 } else { 12 }),
            (BoundaryKind::Rectangle, "feather_type") => {
                FieldSpec { name: "feather_type", offset: 16, kind: FieldKind::U32 }
            }
            (BoundaryKind::Rectangle, "feather_amount") => f32_at("feather_amount", 20),

            (BoundaryKind::Polygon | BoundaryKind::Polyline, "feather_type") => FieldSpec {
                name: "feather_type",
                offset: if vertices_first { 4 + tail } else { 4 },
                kind: FieldKind::U32,
            },
            (BoundaryKind::Polygon | BoundaryKind::Polyline, "feather_amount") => {
                f32_at("feather_amount", if vertices_first { 8 + tail } else { 8 })
            }
            (BoundaryKind::Polyline, "width") => {
                f32_at("width", if vertices_first { 12 + tail } else { 12 })
            }
            _ => return None,
        };
        Some(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::ChunkWriter;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn decode(kind: BoundaryKind, payload: &[u8]) -> BoundaryData {
        BoundaryData::decode(kind, payload, LayoutPreference::Auto, 32768.0)
    }

    #[test]
    fn test_circle() {
        let mut w = ChunkWriter::new();
        w.write_f32_le(10.0)
            .write_f32_le(-20.0)
            .write_f32_le(5.0)
            .write_u32_le(2)
            .write_f32_le(0.25);
        let data = decode(BoundaryKind::Circle, w.as_slice());

        assert_eq!(data.shape, Shape::Circle { center_x: 10.0, center_z: -20.0, radius: 5.0 });
        assert_eq!(data.feather_type, 2);
        assert_eq!(data.feather_amount, 0.25);
        assert!(!data.malformed);
    }

    #[test]
    fn test_short_circle_is_zeroed() {
        let data = decode(BoundaryKind::Circle, &[0x41; 10]);
        assert!(data.malformed);
        assert_eq!(data.shape, Shape::Circle { center_x: 0.0, center_z: 0.0, radius: 0.0 });
        assert_eq!(data.feather_amount, 0.0);
    }

    #[test]
    fn test_rectangle_normalized() {
        let mut payload = floats(&[100.0, 5.0, -50.0, 30.0]);
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&0.5f32.to_le_bytes());
        let data = decode(BoundaryKind::Rectangle, &payload);

        assert_eq!(data.shape, Shape::Rectangle { x1: -50.0, z1: 5.0, x2: 100.0, z2: 30.0 });
        assert!(data.swapped_x);
        assert!(!data.swapped_z);
    }

    #[test]
    fn test_polygon_vertices_first() {
        let mut w = ChunkWriter::new();
        w.write_u32_le(3);
        for (x, z) in [(0.0, 0.0), (100.0, 0.0), (100.0, 250.0)] {
            w.write_f32_le(x).write_f32_le(z);
        }
        w.write_u32_le(1).write_f32_le(0.5);
        let data = decode(BoundaryKind::Polygon, w.as_slice());

        assert_eq!(data.layout, Some(VertexLayout::VerticesFirst));
        assert_eq!(data.shape.vertices().len(), 3);
        assert_eq!(data.shape.vertices()[2], Vertex { x: 100.0, z: 250.0 });
        assert_eq!(data.feather_type, 1);
        assert_eq!(data.feather_amount, 0.5);
    }

    #[test]
    fn test_polygon_feather_first_detected() {
        let mut w = ChunkWriter::new();
        w.write_u32_le(3).write_u32_le(1).write_f32_le(0.5);
        for (x, z) in [(1500.0, -200.0), (1600.0, -200.0), (1600.0, -100.0)] {
            w.write_f32_le(x).write_f32_le(z);
        }
        let data = decode(BoundaryKind::Polygon, w.as_slice());

        assert_eq!(data.layout, Some(VertexLayout::FeatherFirst));
        assert_eq!(data.shape.vertices()[0], Vertex { x: 1500.0, z: -200.0 });
        assert_eq!(data.feather_type, 1);
    }

    #[test]
    fn test_polyline_fixed_layout() {
        let mut w = ChunkWriter::new();
        w.write_u32_le(2).write_u32_le(0).write_f32_le(0.1).write_f32_le(8.0);
        w.write_f32_le(1.0).write_f32_le(2.0).write_f32_le(3.0).write_f32_le(4.0);
        let data = BoundaryData::decode(
            BoundaryKind::Polyline,
            w.as_slice(),
            LayoutPreference::FeatherFirst,
            32768.0,
        );

        assert_eq!(
            data.shape,
            Shape::Polyline {
                vertices: vec![Vertex { x: 1.0, z: 2.0 }, Vertex { x: 3.0, z: 4.0 }],
                width: 8.0,
            }
        );
        assert_eq!(data.feather_amount, 0.1);
    }

    #[test]
    fn test_polygon_count_overflow() {
        let mut w = ChunkWriter::new();
        w.write_u32_le(u32::MAX).write_u32_le(0).write_f32_le(0.0);
        let data = decode(BoundaryKind::Polygon, w.as_slice());
        assert!(data.malformed);
        assert!(data.shape.vertices().is_empty());
    }

    #[test]
    fn test_field_table() {
        let circle = Boundary::new(
            0,
            BoundaryKind::Circle,
            None,
            vec![],
            0,
            BoundaryData::zeroed(BoundaryKind::Circle),
        );
        assert_eq!(circle.name, "Circle");
        assert_eq!(circle.field("radius").unwrap().offset, 8);
        assert_eq!(circle.field("centerX").unwrap().offset, 0);
        assert_eq!(circle.field("featherType").unwrap().kind, FieldKind::U32);
        assert!(circle.field("name").is_none());
        assert!(circle.field("width").is_none());

        let mut w = ChunkWriter::new();
        w.write_u32_le(2);
        w.write_f32_le(0.0).write_f32_le(0.0).write_f32_le(10.0).write_f32_le(10.0);
        w.write_u32_le(0).write_f32_le(1.0).write_f32_le(4.0);
        let data = decode(BoundaryKind::Polyline, w.as_slice());
        let line = Boundary::new(1, BoundaryKind::Polyline, Some("road".into()), vec![], 0, data);
        assert_eq!(line.field("feather_type").unwrap().offset, 20);
        assert_eq!(line.field("feather_amount").unwrap().offset, 24);
        assert_eq!(line.field("width").unwrap().offset, 28);
        assert!(line.field("vertex_count").is_none());
    }

    #[test]
    fn test_rectangle_field_follows_swap() {
        let mut payload = floats(&[100.0, 0.0, -50.0, 10.0]);
        payload.extend_from_slice(&[0; 8]);
        let data = decode(BoundaryKind::Rectangle, &payload);
        let rect = Boundary::new(0, BoundaryKind::Rectangle, None, vec![], 0, data);

        assert_eq!(rect.field("x1").unwrap().offset, 8);
        assert_eq!(rect.field("x2").unwrap().offset, 0);
        assert_eq!(rect.field("z1").unwrap().offset, 4);
    }

    #[test]
    fn test_field_encoding() {
        assert_eq!(FieldKind::F32.encode("radius", 42.5).unwrap(), 42.5f32.to_le_bytes());
        assert_eq!(FieldKind::U32.encode("feather_type", 3.0).unwrap(), 3u32.to_le_bytes());
        assert!(FieldKind::U32.encode("feather_type", 1.5).is_err());
        assert!(FieldKind::U32.encode("feather_type", -1.0).is_err());
        assert!(FieldKind::F32.encode("radius", f64::NAN).is_err());
        assert!(FieldKind::F32.encode("radius", 1e300).is_err());
        assert_eq!(FieldKind::F32.decode(42.5f32.to_le_bytes()), 42.5);
    }
}
