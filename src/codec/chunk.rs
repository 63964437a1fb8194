use std::fmt;

use serde::{Serialize, Serializer};

use super::reader::{tag_at, u32_be_at};
use crate::error::Result;

/// Size of a tag + length header
pub const HEADER_LEN: usize = 8;

/// Size of a group header (tag + length + form type)
pub const FORM_HEADER_LEN: usize = 12;

/// Four-character chunk identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const FORM: Tag = Tag(*b"FORM");
    pub const DATA: Tag = Tag(*b"DATA");

    pub const fn new(bytes: &[u8; 4]) -> Self {
        Self(*bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Tags are four characters of `A-Z` or `0-9`.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    }

    /// Anonymous version wrappers use all-digit form types ("0001", "0015").
    pub fn is_version(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_digit())
    }

    pub fn is_form(&self) -> bool {
        *self == Self::FORM
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Header of one chunk as found in the buffer.
///
/// `end` is the end the walk actually honors: the declared end, clamped to the
/// enclosing payload when the declared length runs past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub offset: usize,
    pub tag: Tag,
    pub length: u32,
    pub form_type: Option<Tag>,
    pub end: usize,
    pub truncated: bool,
}

impl ChunkHeader {
    /// Read the header at `offset`, clamping its extent to `limit`.
    pub fn read(data: &[u8], offset: usize, limit: usize) -> Result<Self> {
        let tag = tag_at(data, offset)?;
        let length = u32_be_at(data, offset + 4)?;
        let declared_end = offset
            .saturating_add(HEADER_LEN)
            .saturating_add(length as usize);
        let limit = limit.min(data.len());
        let (end, truncated) = if declared_end > limit {
            (limit, true)
        } else {
            (declared_end, false)
        };

        let form_type = if tag.is_form() && end >= offset + FORM_HEADER_LEN {
            Some(tag_at(data, offset + HEADER_LEN)?)
        } else {
            None
        };

        Ok(Self { offset, tag, length, form_type, end, truncated })
    }

    pub fn is_form(&self) -> bool {
        self.form_type.is_some()
    }

    pub fn is_form_of(&self, form_type: Tag) -> bool {
        self.form_type == Some(form_type)
    }

    /// First byte after the header (after the form type for groups)
    pub fn body_start(&self) -> usize {
        if self.is_form() {
            self.offset + FORM_HEADER_LEN
        } else {
            self.offset + HEADER_LEN
        }
    }

    pub fn body_len(&self) -> usize {
        self.end.saturating_sub(self.body_start())
    }

    /// Header plus payload, as honored by the walk
    pub fn total_len(&self) -> usize {
        self.end - self.offset
    }

    pub fn body<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = self.body_start().min(self.end);
        &data[start..self.end]
    }

    /// Display label, `FORM:LAYR` for groups and the bare tag for leaves
    pub fn label(&self) -> String {
        match self.form_type {
            Some(form_type) => format!("{}:{}", self.tag, form_type),
            None => self.tag.to_string(),
        }
    }
}
