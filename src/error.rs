#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of data at offset {offset}: need {need} bytes, have {have}")]
    OutOfBounds { offset: usize, need: usize, have: usize },

    #[error("not a terrain file: expected FORM at offset 0, found {found:?}")]
    NotIff { found: String },

    #[error("not a terrain file: expected form type {expected}, found {found}")]
    WrongFormType { expected: String, found: String },

    #[error("end_chunk called with no open chunk")]
    UnbalancedChunk,

    #[error("chunk at offset {offset} is too large: {len} bytes")]
    ChunkTooLarge { offset: usize, len: usize },

    #[error("unknown record index {0}")]
    UnknownRecord(usize),

    #[error("field `{field}` is not editable on {kind} records")]
    UnsupportedField { kind: &'static str, field: String },

    #[error("no data chunk found for record at offset {offset}")]
    DataChunkNotFound { offset: usize },

    #[error("data chunk at offset {offset} holds {have} bytes, field `{field}` needs {need}")]
    DataChunkTooSmall { offset: usize, field: &'static str, need: usize, have: usize },

    #[error("record {0} has malformed data and cannot be edited")]
    MalformedRecord(usize),

    #[error("value {value} is not valid for field `{field}`")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("io error: {0}")]
    Io(String),

    #[error("json error: {0}")]
    Json(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
