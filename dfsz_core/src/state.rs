use serde::{Deserialize, Serialize};

use crate::codec::CodecKind;
use crate::index::{IndexEntry, PositionIndex};

/// Metadata describing one completed compression run.
///
/// Produced only by [`CompressionStateBuilder::freeze`], after the compressed
/// length is known; there are no mutators. This is what the caller persists,
/// usually as JSON via [`to_json`].
///
/// [`to_json`]: CompressionState::to_json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionState {
    source_path: String,
    codec: CodecKind,
    chunk_size: u64,
    original_length: u64,
    compressed_length: u64,
    chunk_count: u64,
    position_index: Vec<IndexEntry>,
}

impl CompressionState {
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn codec(&self) -> CodecKind {
        self.codec
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn original_length(&self) -> u64 {
        self.original_length
    }

    pub fn compressed_length(&self) -> u64 {
        self.compressed_length
    }

    /// Chunks written. Exceeds `position_index().len()` only if the index was
    /// truncated.
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    pub fn position_index(&self) -> &[IndexEntry] {
        &self.position_index
    }

    /// Compression ratio (original / compressed).
    pub fn ratio(&self) -> f64 {
        if self.compressed_length == 0 {
            return 1.0;
        }
        self.original_length as f64 / self.compressed_length as f64
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The in-progress record for a run.
///
/// Everything except the compressed length is fixed at construction; the
/// engine fills the index through [`index_mut`](Self::index_mut).
#[derive(Debug)]
pub struct CompressionStateBuilder {
    source_path: String,
    codec: CodecKind,
    chunk_size: u64,
    original_length: u64,
    chunk_count: u64,
    index: PositionIndex,
}

impl CompressionStateBuilder {
    pub fn new(
        source_path: impl Into<String>,
        codec: CodecKind,
        chunk_size: u64,
        original_length: u64,
        index_capacity: usize,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            codec,
            chunk_size,
            original_length,
            chunk_count: 0,
            index: PositionIndex::with_capacity(index_capacity),
        }
    }

    pub fn index_mut(&mut self) -> &mut PositionIndex {
        &mut self.index
    }

    pub fn set_chunk_count(&mut self, chunk_count: u64) {
        self.chunk_count = chunk_count;
    }

    /// Seal the record once the destination's final length is known.
    pub fn freeze(self, compressed_length: u64) -> CompressionState {
        CompressionState {
            source_path: self.source_path,
            codec: self.codec,
            chunk_size: self.chunk_size,
            original_length: self.original_length,
            compressed_length,
            chunk_count: self.chunk_count,
            position_index: self.index.into_entries(),
        }
    }
}
