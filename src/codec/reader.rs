use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::chunk::Tag;
use crate::error::{Error, Result};

/// Bounded read cursor over a terrain buffer.
///
/// Chunk lengths are big-endian, every payload scalar is little-endian. Reads
/// never cross `end`, which is normally the end of the chunk being decoded.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, end: data.len() }
    }

    /// Cursor over `data[start..end]` that keeps absolute positions
    pub fn bounded(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        Self { data, pos: start.min(end), end }
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(Error::OutOfBounds {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        Ok(&self.data[self.pos..self.pos + n])
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let slice = self.peek_bytes(n)?;
        self.pos += n;
        Ok(slice)
    }

    pub fn read_tag(&mut self) -> Result<Tag> {
        let bytes = self.read_bytes(4)?;
        Ok(Tag([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn peek_tag(&self) -> Result<Tag> {
        let bytes = self.peek_bytes(4)?;
        Ok(Tag([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Chunk length field
    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    /// 32-bit boolean, any non-zero value is true
    pub fn read_bool32(&mut self) -> Result<bool> {
        Ok(self.read_u32_le()? != 0)
    }

    /// Read `n` bytes as text, dropping trailing NULs
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String> {
        let bytes = self.read_bytes(n)?;
        let len = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }

    /// Read a NUL-terminated string of at most `max` bytes.
    ///
    /// Stops at `max` (or the end of the cursor) when no terminator shows up;
    /// the terminator itself is consumed when present.
    pub fn read_cstring(&mut self, max: usize) -> Result<String> {
        let window = max.min(self.remaining());
        let bytes = &self.data[self.pos..self.pos + window];
        match bytes.iter().position(|&b| b == 0) {
            Some(nul) => {
                self.pos += nul + 1;
                Ok(String::from_utf8_lossy(&bytes[..nul]).into_owned())
            }
            None => {
                self.pos += window;
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    /// Everything left before `end`
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..self.end];
        self.pos = self.end;
        slice
    }
}

fn bytes_at(data: &[u8], offset: usize, n: usize) -> Result<&[u8]> {
    match offset.checked_add(n) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(Error::OutOfBounds {
            offset,
            need: n,
            have: data.len().saturating_sub(offset),
        }),
    }
}

pub fn tag_at(data: &[u8], offset: usize) -> Result<Tag> {
    let b = bytes_at(data, offset, 4)?;
    Ok(Tag([b[0], b[1], b[2], b[3]]))
}

pub fn u32_be_at(data: &[u8], offset: usize) -> Result<u32> {
    Ok(BigEndian::read_u32(bytes_at(data, offset, 4)?))
}

pub fn u32_le_at(data: &[u8], offset: usize) -> Result<u32> {
    Ok(LittleEndian::read_u32(bytes_at(data, offset, 4)?))
}

pub fn f32_le_at(data: &[u8], offset: usize) -> Result<f32> {
    Ok(LittleEndian::read_f32(bytes_at(data, offset, 4)?))
}

pub fn cstring_at(data: &[u8], offset: usize, max: usize) -> Result<String> {
    if offset > data.len() {
        return Err(Error::OutOfBounds { offset, need: 1, have: 0 });
    }
    ChunkReader::bounded(data, offset, offset.saturating_add(max)).read_cstring(max)
}
