use byteorder::{ByteOrder, LittleEndian};

use super::chunk::Tag;
use crate::error::{Error, Result};

/// Append writer for tag + big-endian length chunk streams.
///
/// Open chunks are kept on a stack and their length fields are back-patched
/// when they are closed. The chainable builders cannot return errors, so the
/// first length that does not fit a u32 is held until [`ChunkWriter::finish`].
pub struct ChunkWriter {
    data: Vec<u8>,
    open: Vec<usize>,
    failed: Option<Error>,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            open: Vec::new(),
            failed: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// The written bytes, or the first error a chunk builder ran into.
    /// Chunks still open at this point are an error too.
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if !self.open.is_empty() {
            return Err(Error::UnbalancedChunk);
        }
        Ok(self.data)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn write_tag(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.write_bytes(tag)
    }

    pub fn write_u32_be(&mut self, v: u32) -> &mut Self {
        self.write_bytes(&v.to_be_bytes())
    }

    pub fn write_u32_le(&mut self, v: u32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_i32_le(&mut self, v: i32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_f32_le(&mut self, v: f32) -> &mut Self {
        self.write_bytes(&v.to_le_bytes())
    }

    /// String followed by a NUL terminator
    pub fn write_cstring(&mut self, s: &str) -> &mut Self {
        self.write_bytes(s.as_bytes());
        self.data.push(0);
        self
    }

    /// Open a leaf chunk; its payload is whatever is written until `end_chunk`.
    pub fn begin_chunk(&mut self, tag: &[u8; 4]) -> &mut Self {
        self.open.push(self.data.len());
        self.write_tag(tag).write_u32_be(0)
    }

    /// Open a group chunk of the given form type.
    pub fn begin_form(&mut self, form_type: &[u8; 4]) -> &mut Self {
        self.begin_chunk(Tag::FORM.as_bytes()).write_tag(form_type)
    }

    /// Close the most recently opened chunk and patch its length.
    pub fn end_chunk(&mut self) -> Result<&mut Self> {
        let start = self.open.pop().ok_or(Error::UnbalancedChunk)?;
        self.close(start)?;
        Ok(self)
    }

    fn close(&mut self, start: usize) -> Result<()> {
        let len = self.data.len() - start - 8;
        let len32 = u32::try_from(len).map_err(|_| Error::ChunkTooLarge { offset: start, len })?;
        self.data[start + 4..start + 8].copy_from_slice(&len32.to_be_bytes());
        Ok(())
    }

    fn close_or_hold(&mut self, start: usize) {
        if let Err(err) = self.close(start) {
            tracing::warn!(offset = start, error = %err, "chunk length left unpatched");
            if self.failed.is_none() {
                self.failed = Some(err);
            }
        }
    }

    /// Write a complete leaf chunk.
    pub fn chunk(&mut self, tag: &[u8; 4], payload: &[u8]) -> &mut Self {
        let start = self.data.len();
        self.write_tag(tag).write_u32_be(0).write_bytes(payload);
        self.close_or_hold(start);
        self
    }

    /// Write a complete group chunk whose children are produced by `build`.
    pub fn form(&mut self, form_type: &[u8; 4], build: impl FnOnce(&mut Self)) -> &mut Self {
        let depth = self.open.len();
        self.begin_form(form_type);
        build(self);
        // Anything `build` left open is closed along with this group.
        while self.open.len() > depth {
            if let Some(start) = self.open.pop() {
                self.close_or_hold(start);
            }
        }
        self
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChunkWriter> for Vec<u8> {
    fn from(writer: ChunkWriter) -> Self {
        writer.into_vec()
    }
}

/// Overwrite `bytes.len()` bytes at `offset` without resizing the buffer.
/// Nothing is written unless the whole range fits.
pub fn patch_bytes_at(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    match offset.checked_add(bytes.len()) {
        Some(end) if end <= buf.len() => {
            buf[offset..end].copy_from_slice(bytes);
            Ok(())
        }
        _ => Err(Error::OutOfBounds {
            offset,
            need: bytes.len(),
            have: buf.len().saturating_sub(offset),
        }),
    }
}

pub fn patch_u32_le_at(buf: &mut [u8], offset: usize, v: u32) -> Result<()> {
    let mut bytes = [0u8; 4];
    LittleEndian::write_u32(&mut bytes, v);
    patch_bytes_at(buf, offset, &bytes)
}

pub fn patch_f32_le_at(buf: &mut [u8], offset: usize, v: f32) -> Result<()> {
    let mut bytes = [0u8; 4];
    LittleEndian::write_f32(&mut bytes, v);
    patch_bytes_at(buf, offset, &bytes)
}
