//! Name recovery from header payloads.
//!
//! Header chunks carry a u32 flag followed by a NUL-terminated name, but older
//! files and hand-edited ones are not always that tidy, so names are guessed
//! from a couple of candidate positions and validated before use.

/// Longest name accepted
pub const MAX_NAME_LEN: usize = 128;

/// Candidate name positions inside a header payload, in preference order
const NAME_OFFSETS: [usize; 2] = [4, 0];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || c == '_' || c == '-'
}

/// Decode a name from raw bytes: everything up to the first NUL, restricted to
/// letters, digits, whitespace, `_` and `-`. Returns `None` for anything else.
pub fn try_decode_name(bytes: &[u8]) -> Option<String> {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    if len == 0 || len > MAX_NAME_LEN {
        return None;
    }
    let text = std::str::from_utf8(&bytes[..len]).ok()?;
    if !text.chars().all(is_name_char) {
        return None;
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Name stored in a header `DATA` payload.
pub fn header_name(payload: &[u8]) -> Option<String> {
    NAME_OFFSETS
        .iter()
        .filter(|&&offset| offset < payload.len())
        .find_map(|&offset| try_decode_name(&payload[offset..]))
}
