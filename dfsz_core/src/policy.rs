//! Chunk-size policy.
//!
//! The position index holds at most `index_capacity` entries, one per chunk.
//! A fixed chunk size would overflow it for large files, so the chunk size
//! grows with the file: it is never smaller than `ceil(file_length / capacity)`,
//! even when that means ignoring the caller's preferred size.

use serde::{Deserialize, Serialize};

/// Default chunk size: 1 MiB of raw data per chunk.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Which input decided the effective chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkSizeSource {
    /// The configured default was the largest candidate.
    Default,
    /// The caller's preferred size was used as-is.
    User,
    /// The file is large enough that the index capacity forced a bigger size.
    Capacity,
}

/// Outcome of [`plan_chunk_size`]: the size to use and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_size: u64,
    pub source: ChunkSizeSource,
    /// What the caller asked for: their preferred size, or the default when
    /// none was given.
    pub requested: u64,
}

impl ChunkPlan {
    /// True when the effective size differs from what was asked for.
    ///
    /// Operators need to see this, since their requested size was ignored.
    pub fn overrides_request(&self) -> bool {
        self.chunk_size != self.requested
    }

    /// Operator-facing explanation of an override, if there was one.
    pub fn override_note(&self) -> Option<String> {
        if !self.overrides_request() {
            return None;
        }
        let why = match self.source {
            ChunkSizeSource::Capacity => "the index capacity requires",
            ChunkSizeSource::Default => "the default is",
            ChunkSizeSource::User => "the request is",
        };
        Some(format!(
            "requested chunk size {} is too small, {} {}; using {}",
            self.requested, why, self.chunk_size, self.chunk_size
        ))
    }
}

/// Smallest chunk size that keeps `file_length` within `index_capacity` chunks.
pub fn minimum_for_capacity(file_length: u64, index_capacity: u64) -> u64 {
    file_length.div_ceil(index_capacity.max(1))
}

/// `max(user_requested, ceil(file_length / index_capacity), default_size)`.
///
/// A `user_requested` of zero means "no preference". Never returns zero.
pub fn compute_chunk_size(
    file_length: u64,
    user_requested: u64,
    default_size: u64,
    index_capacity: u64,
) -> u64 {
    plan_chunk_size(file_length, user_requested, default_size, index_capacity).chunk_size
}

/// Same as [`compute_chunk_size`], also reporting which input won.
pub fn plan_chunk_size(
    file_length: u64,
    user_requested: u64,
    default_size: u64,
    index_capacity: u64,
) -> ChunkPlan {
    let default_size = default_size.max(1);
    let minimum = minimum_for_capacity(file_length, index_capacity);
    let preferred = user_requested.max(default_size);

    let (chunk_size, source) = if minimum > preferred {
        (minimum, ChunkSizeSource::Capacity)
    } else if user_requested >= default_size {
        (preferred, ChunkSizeSource::User)
    } else {
        (preferred, ChunkSizeSource::Default)
    };

    let requested = if user_requested > 0 {
        user_requested
    } else {
        default_size
    };

    ChunkPlan {
        chunk_size,
        source,
        requested,
    }
}
