//! Recursive descent over nested chunk streams.
//!
//! One walk feeds any number of visitors, so the record list and the generic
//! tree are always built from the same sequence of chunks. The walk threads an
//! explicit `(offset, end)` pair through every call and each call hands back the
//! offset where its caller continues.

use super::chunk::{ChunkHeader, Tag, FORM_HEADER_LEN, HEADER_LEN};
use crate::error::{Error, Result};

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Receives chunk events in file order.
pub trait ChunkVisitor {
    fn enter_form(&mut self, _header: &ChunkHeader, _depth: usize) {}

    fn leave_form(&mut self, _header: &ChunkHeader, _depth: usize) {}

    /// Leaf chunk; `payload` never extends past the chunk's honored end.
    fn leaf(&mut self, _header: &ChunkHeader, _payload: &[u8], _depth: usize) {}

    /// A byte at `offset` did not start a valid tag and was skipped.
    fn skipped(&mut self, _offset: usize, _depth: usize) {}

    /// A group deeper than the limit was passed over without descending.
    fn depth_limited(&mut self, _header: &ChunkHeader, _depth: usize) {}
}

impl<A: ChunkVisitor, B: ChunkVisitor> ChunkVisitor for (A, B) {
    fn enter_form(&mut self, header: &ChunkHeader, depth: usize) {
        self.0.enter_form(header, depth);
        self.1.enter_form(header, depth);
    }

    fn leave_form(&mut self, header: &ChunkHeader, depth: usize) {
        self.0.leave_form(header, depth);
        self.1.leave_form(header, depth);
    }

    fn leaf(&mut self, header: &ChunkHeader, payload: &[u8], depth: usize) {
        self.0.leaf(header, payload, depth);
        self.1.leaf(header, payload, depth);
    }

    fn skipped(&mut self, offset: usize, depth: usize) {
        self.0.skipped(offset, depth);
        self.1.skipped(offset, depth);
    }

    fn depth_limited(&mut self, header: &ChunkHeader, depth: usize) {
        self.0.depth_limited(header, depth);
        self.1.depth_limited(header, depth);
    }
}

impl<V: ChunkVisitor + ?Sized> ChunkVisitor for &mut V {
    fn enter_form(&mut self, header: &ChunkHeader, depth: usize) {
        (**self).enter_form(header, depth);
    }

    fn leave_form(&mut self, header: &ChunkHeader, depth: usize) {
        (**self).leave_form(header, depth);
    }

    fn leaf(&mut self, header: &ChunkHeader, payload: &[u8], depth: usize) {
        (**self).leaf(header, payload, depth);
    }

    fn skipped(&mut self, offset: usize, depth: usize) {
        (**self).skipped(offset, depth);
    }

    fn depth_limited(&mut self, header: &ChunkHeader, depth: usize) {
        (**self).depth_limited(header, depth);
    }
}

/// Check the 12-byte file header and return the outermost group.
pub fn read_root(data: &[u8], expected: Tag) -> Result<ChunkHeader> {
    if data.len() < FORM_HEADER_LEN {
        return Err(Error::NotIff {
            found: String::from_utf8_lossy(&data[..data.len().min(4)]).into_owned(),
        });
    }
    let root = ChunkHeader::read(data, 0, data.len())?;
    if !root.tag.is_form() {
        return Err(Error::NotIff { found: root.tag.to_string() });
    }
    match root.form_type {
        Some(form_type) if form_type == expected => {}
        Some(form_type) => {
            return Err(Error::WrongFormType {
                expected: expected.to_string(),
                found: form_type.to_string(),
            })
        }
        None => {
            return Err(Error::WrongFormType {
                expected: expected.to_string(),
                found: String::new(),
            })
        }
    }
    if root.truncated {
        tracing::warn!(
            declared = root.length,
            available = data.len() - HEADER_LEN,
            "outer group length runs past end of buffer"
        );
    }
    Ok(root)
}

#[derive(Debug, Clone, Copy)]
pub struct Walker<'a> {
    data: &'a [u8],
    max_depth: usize,
}

impl<'a> Walker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Walk the chunk at `offset` (bounded by `limit`) and everything inside it.
    /// Returns the offset just past the chunk, or `None` when no valid tag starts there.
    pub fn walk_chunk<V: ChunkVisitor>(
        &self,
        offset: usize,
        limit: usize,
        depth: usize,
        visitor: &mut V,
    ) -> Option<usize> {
        if offset.saturating_add(HEADER_LEN) > limit.min(self.data.len()) {
            return None;
        }
        let header = ChunkHeader::read(self.data, offset, limit).ok()?;
        if !header.tag.is_valid() {
            return None;
        }
        if header.truncated {
            tracing::warn!(
                offset,
                tag = %header.tag,
                declared = header.length,
                honored = header.total_len() - HEADER_LEN,
                "chunk length runs past its parent"
            );
        }

        if header.is_form() {
            if depth >= self.max_depth {
                tracing::warn!(offset, depth, "group nesting too deep, not descending");
                visitor.depth_limited(&header, depth);
                return Some(header.end);
            }
            visitor.enter_form(&header, depth);
            self.walk_children(header.body_start(), header.end, depth + 1, visitor);
            visitor.leave_form(&header, depth);
        } else {
            visitor.leaf(&header, header.body(self.data), depth);
        }
        Some(header.end)
    }

    /// Walk sibling chunks in `[start, end)`.
    ///
    /// A position that does not hold a valid tag is skipped one byte at a time
    /// until one does. A valid tag whose length overruns `end` is also skipped
    /// when a later position holds a chunk that fits; only when none does is it
    /// walked as a truncated chunk. Bytes inside a recognised chunk are never
    /// scanned this way.
    pub fn walk_children<V: ChunkVisitor>(
        &self,
        start: usize,
        end: usize,
        depth: usize,
        visitor: &mut V,
    ) -> usize {
        let end = end.min(self.data.len());
        let mut pos = start;
        while pos.saturating_add(HEADER_LEN) <= end {
            if let Some(next) = self.resync_past_overrun(pos, end) {
                tracing::debug!(
                    offset = pos,
                    resumed = next,
                    "chunk length overruns its parent, resyncing"
                );
                for at in pos..next {
                    visitor.skipped(at, depth);
                }
                pos = next;
                continue;
            }
            match self.walk_chunk(pos, end, depth, visitor) {
                Some(next) => pos = next,
                None => {
                    tracing::debug!(offset = pos, "no valid tag, skipping byte");
                    visitor.skipped(pos, depth);
                    pos += 1;
                }
            }
        }
        if pos < end {
            tracing::debug!(
                offset = pos,
                trailing = end - pos,
                "trailing bytes too short for a chunk"
            );
        }
        end
    }

    /// A valid tag at `offset` whose declared end lies past `end` is read as a
    /// shifted stream when some later offset holds a chunk that fits. Returns
    /// that later offset.
    fn resync_past_overrun(&self, offset: usize, end: usize) -> Option<usize> {
        let header = ChunkHeader::read(self.data, offset, end).ok()?;
        if !header.tag.is_valid() || !header.truncated {
            return None;
        }
        let last = end.checked_sub(HEADER_LEN)?;
        (offset + 1..=last).find(|&at| self.fits(at, end))
    }

    fn fits(&self, offset: usize, end: usize) -> bool {
        ChunkHeader::read(self.data, offset, end)
            .map_or(false, |header| header.tag.is_valid() && !header.truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::writer::ChunkWriter;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        skipped: Vec<usize>,
    }

    impl ChunkVisitor for Recorder {
        fn enter_form(&mut self, header: &ChunkHeader, depth: usize) {
            self.events.push(format!("{depth}+{}", header.label()));
        }

        fn leave_form(&mut self, header: &ChunkHeader, depth: usize) {
            self.events.push(format!("{depth}-{}", header.label()));
        }

        fn leaf(&mut self, header: &ChunkHeader, payload: &[u8], depth: usize) {
            self.events.push(format!("{depth}.{}[{}]", header.tag, payload.len()));
        }

        fn skipped(&mut self, offset: usize, _depth: usize) {
            self.skipped.push(offset);
        }
    }

    #[test]
    fn test_walk_order() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"0015", |w| {
                w.chunk(b"DATA", &[0; 4]);
            });
            w.chunk(b"TGEN", &[0; 2]);
        });
        let data = w.into_vec();

        let mut recorder = Recorder::default();
        let next = Walker::new(&data).walk_chunk(0, data.len(), 0, &mut recorder);
        assert_eq!(next, Some(data.len()));
        assert_eq!(
            recorder.events,
            vec![
                "0+FORM:PTAT",
                "1+FORM:0015",
                "2.DATA[4]",
                "1-FORM:0015",
                "1.TGEN[2]",
                "0-FORM:PTAT",
            ]
        );
    }

    #[test]
    fn test_resync_after_garbage_byte() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.chunk(b"AAAA", &[1, 2]);
            w.write_bytes(&[0x00]);
            w.chunk(b"BBBB", &[3]);
        });
        let data = w.into_vec();

        let mut recorder = Recorder::default();
        Walker::new(&data).walk_chunk(0, data.len(), 0, &mut recorder);
        assert_eq!(recorder.skipped, vec![22]);
        assert!(recorder.events.contains(&"1.AAAA[2]".to_string()));
        assert!(recorder.events.contains(&"1.BBBB[1]".to_string()));
    }

    #[test]
    fn test_resync_after_tag_like_garbage_byte() {
        for garbage in [b'A', b'7'] {
            let mut w = ChunkWriter::new();
            w.form(b"PTAT", |w| {
                w.chunk(b"AAAA", &[1, 2]);
                w.write_bytes(&[garbage]);
                w.form(b"BBBB", |w| {
                    w.chunk(b"DATA", &[3]);
                });
                w.chunk(b"CCCC", &[4]);
            });
            let data = w.into_vec();

            let mut recorder = Recorder::default();
            let next = Walker::new(&data).walk_chunk(0, data.len(), 0, &mut recorder);
            assert_eq!(next, Some(data.len()));
            assert_eq!(recorder.skipped, vec![22]);
            assert_eq!(
                recorder.events,
                vec![
                    "0+FORM:PTAT",
                    "1.AAAA[2]",
                    "1+FORM:BBBB",
                    "2.DATA[1]",
                    "1-FORM:BBBB",
                    "1.CCCC[1]",
                    "0-FORM:PTAT",
                ]
            );
        }
    }

    #[test]
    fn test_truncated_child_is_clamped() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.write_tag(b"DATA").write_u32_be(1000).write_bytes(&[9; 6]);
        });
        let data = w.into_vec();

        let mut recorder = Recorder::default();
        Walker::new(&data).walk_chunk(0, data.len(), 0, &mut recorder);
        assert_eq!(recorder.events[1], "1.DATA[6]");
    }

    #[test]
    fn test_depth_limit() {
        let mut w = ChunkWriter::new();
        w.form(b"PTAT", |w| {
            w.form(b"AAAA", |w| {
                w.form(b"BBBB", |w| {
                    w.chunk(b"DATA", &[]);
                });
            });
        });
        let data = w.into_vec();

        let mut recorder = Recorder::default();
        Walker::new(&data)
            .with_max_depth(2)
            .walk_chunk(0, data.len(), 0, &mut recorder);
        assert!(!recorder.events.iter().any(|e| e.contains("BBBB")));
        assert!(!recorder.events.iter().any(|e| e.contains("DATA")));
    }

    #[test]
    fn test_read_root_rejects_other_formats() {
        assert!(matches!(
            read_root(b"RIFF\0\0\0\x04WAVE", Tag::new(b"PTAT")),
            Err(Error::NotIff { .. })
        ));
        assert!(matches!(
            read_root(b"FORM\0\0\0\x04WSNP", Tag::new(b"PTAT")),
            Err(Error::WrongFormType { .. })
        ));
        assert!(matches!(read_root(b"FORM", Tag::new(b"PTAT")), Err(Error::NotIff { .. })));
        assert!(read_root(b"FORM\0\0\0\x04PTAT", Tag::new(b"PTAT")).is_ok());
    }
}
