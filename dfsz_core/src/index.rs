use serde::{Deserialize, Serialize};

/// Maximum number of entries a position index may hold.
pub const INDEX_CAPACITY: usize = 5000;

/// One checkpoint: where a chunk starts in the original and compressed streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub original_offset: u64,
    /// Offset of the chunk's frame header in the compressed stream.
    pub compressed_offset: u64,
}

/// Bounded, append-only list of [`IndexEntry`] checkpoints.
///
/// Once `capacity` entries are stored, further calls to [`record`] are no-ops:
/// the index is truncated, never resized or re-sampled. The chunk-size policy
/// sizes chunks so this should only happen when the source grows between the
/// length query and the read.
///
/// [`record`]: PositionIndex::record
#[derive(Debug, Clone)]
pub struct PositionIndex {
    entries: Vec<IndexEntry>,
    capacity: usize,
    truncated: bool,
}

impl Default for PositionIndex {
    fn default() -> Self {
        Self::with_capacity(INDEX_CAPACITY)
    }
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            truncated: false,
        }
    }

    /// Append a checkpoint. Returns `true` if it was stored.
    pub fn record(&mut self, original_offset: u64, compressed_offset: u64) -> bool {
        if self.entries.len() >= self.capacity {
            if !self.truncated {
                self.truncated = true;
                tracing::warn!(
                    capacity = self.capacity,
                    original_offset,
                    "position index full; later chunks will not be indexed"
                );
            }
            return false;
        }

        if let Some(last) = self.entries.last() {
            if original_offset <= last.original_offset
                || compressed_offset <= last.compressed_offset
            {
                tracing::warn!(
                    original_offset,
                    compressed_offset,
                    last_original = last.original_offset,
                    last_compressed = last.compressed_offset,
                    "dropping non-increasing index checkpoint"
                );
                return false;
            }
        }

        self.entries.push(IndexEntry {
            original_offset,
            compressed_offset,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether any checkpoint was dropped because the index was full.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let mut index = PositionIndex::new();
        assert!(index.record(0, 0));
        assert!(index.record(100, 40));
        assert!(index.record(200, 90));
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.entries()[1],
            IndexEntry {
                original_offset: 100,
                compressed_offset: 40
            }
        );
        assert!(!index.is_truncated());
    }

    #[test]
    fn full_index_ignores_further_records() {
        let mut index = PositionIndex::with_capacity(2);
        assert!(index.record(0, 0));
        assert!(index.record(10, 5));
        assert!(!index.record(20, 9));
        assert!(!index.record(30, 12));
        assert_eq!(index.len(), 2);
        assert!(index.is_truncated());
        assert_eq!(index.entries().last().unwrap().original_offset, 10);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let index = PositionIndex::with_capacity(0);
        assert_eq!(index.capacity(), 1);
    }

    #[test]
    fn non_increasing_pairs_are_dropped() {
        let mut index = PositionIndex::new();
        index.record(0, 0);
        index.record(100, 50);
        assert!(!index.record(100, 60));
        assert!(!index.record(150, 50));
        assert_eq!(index.len(), 2);
        assert!(!index.is_truncated());
    }

    #[test]
    fn default_capacity_is_5000() {
        let mut index = PositionIndex::default();
        for i in 0..6000u64 {
            index.record(i * 10, i * 3);
        }
        assert_eq!(index.len(), INDEX_CAPACITY);
        assert!(index.is_truncated());
    }
}
