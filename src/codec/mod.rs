pub mod chunk;
pub mod name;
pub mod reader;
pub mod walk;
pub mod writer;

pub use chunk::{ChunkHeader, Tag, FORM_HEADER_LEN, HEADER_LEN};
pub use name::{header_name, try_decode_name};
pub use reader::ChunkReader;
pub use walk::{read_root, ChunkVisitor, Walker, DEFAULT_MAX_DEPTH};
pub use writer::{patch_bytes_at, ChunkWriter};
